//! Request handlers.

pub mod clip;
pub mod health;
pub mod mix;

pub use clip::*;
pub use health::*;
pub use mix::*;
