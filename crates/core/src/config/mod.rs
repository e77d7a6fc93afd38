pub mod factory;
pub mod merge;
pub mod path;
pub mod resolver;
pub mod sources;
pub mod validation;

pub use factory::*;
pub use merge::*;
pub use path::*;
pub use resolver::*;
pub use sources::*;
pub use validation::*;
