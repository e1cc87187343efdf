// Pairwise distance engines

pub mod global;
pub mod histogram;

pub use global::*;
pub use histogram::*;
