//! Print an argon2 PHC hash for `ADMIN_PASSWORD_HASH`
//!
//! ```text
//! hash-password 'correct horse'
//! echo 'correct horse' | hash-password
//! ```

use anyhow::{bail, Context};
use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use std::io::{self, BufRead};

fn main() -> anyhow::Result<()> {
    let password = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if password.is_empty() {
        bail!("Password must not be empty");
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    println!("{}", hash);
    Ok(())
}
