pub mod lifecycle;
pub mod manifest;
pub mod provider;
pub mod registry;

pub use lifecycle::*;
pub use manifest::*;
pub use provider::*;
pub use registry::*;
