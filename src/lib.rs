//! A CHIP-8 interpreter whose instruction semantics are configured per
//! platform through a set of quirk flags.

pub mod config;
mod nibble;
pub mod vm;

pub use nibble::{Fields, u4};
pub use vm::*;
