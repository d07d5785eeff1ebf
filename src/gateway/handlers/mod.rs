//! Route handlers, grouped by the resource they work on.

pub mod containers;
pub mod health;
pub mod services;
pub mod volumes;

pub use containers::*;
pub use health::*;
pub use services::*;
pub use volumes::*;
