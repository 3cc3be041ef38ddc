//! Data models

pub mod plant;
pub mod image;
pub mod stock;
pub mod category;
pub mod filter;

pub use plant::*;
pub use image::*;
pub use stock::*;
pub use category::*;
pub use filter::*;
