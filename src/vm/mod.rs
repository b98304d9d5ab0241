mod display;
mod execute;
mod font;
mod opcode;
mod platform;
mod runner;
mod state;
mod step;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use display::*;
pub use font::*;
pub use opcode::*;
pub use platform::*;
pub use runner::*;
pub use state::*;
pub use step::*;
pub use types::*;
