//! Helpers shared by the unit tests.

use rand::RngCore;

use super::{MachineState, PlatformSpec};

/// A byte source that always produces the same byte.
pub(crate) struct FixedByte(pub u8);

impl RngCore for FixedByte {
    fn next_u32(&mut self) -> u32 {
        u32::from_ne_bytes([self.0; 4])
    }

    fn next_u64(&mut self) -> u64 {
        u64::from_ne_bytes([self.0; 8])
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        dst.fill(self.0);
    }
}

pub(crate) fn boot(spec: &PlatformSpec) -> MachineState {
    MachineState::new(spec)
}
