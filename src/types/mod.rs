//! Core conversation types.

pub mod conversation;
pub mod turn;

pub use conversation::*;
pub use turn::*;
