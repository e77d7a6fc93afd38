pub mod app;
pub mod lifecycle;

pub use app::*;
pub use lifecycle::*;
