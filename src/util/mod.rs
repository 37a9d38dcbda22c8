//! Utility modules: text helpers, timeouts.

pub mod text;
pub mod timeout;
