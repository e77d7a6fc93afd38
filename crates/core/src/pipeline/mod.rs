pub mod continuation;
pub mod runner;

pub use continuation::*;
pub use runner::*;
