//! Core types for Strand.

pub mod generation;
pub mod item;
pub mod stream;
pub mod usage;

pub use generation::*;
pub use item::*;
pub use stream::*;
pub use usage::*;
