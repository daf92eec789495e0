//! Utility primitives used throughout the simulation core.

mod arena;
pub use arena::*;
