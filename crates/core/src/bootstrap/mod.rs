//! Application bootstrap.
//!
//! An [`Architect`] merges configuration fragments, mounts the result on the
//! application and then runs its providers in order.

pub mod architect;

pub use architect::*;
