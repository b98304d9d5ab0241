/// Result of executing a single instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Continue executing instructions in the current frame.
    Continue,
    /// Wait for the next frame before continuing
    /// (a draw on a platform with vertical-blank sync).
    WaitForNextFrame,
    /// The word is not a known instruction. Nothing was mutated, the program
    /// counter included.
    Unrecognized(u16),
}

/// Result of one fetch-decode-execute-timer cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// An instruction ran; the host may keep stepping in this frame.
    Continue,
    /// An instruction ran and asked the host to wait for the next frame.
    WaitForNextFrame,
    /// An unknown word was skipped over.
    Skipped { opcode: u16 },
    /// The program counter has run off the end of the loaded program.
    Finished,
    /// The session is paused or off; nothing happened.
    Idle,
}

/// Power state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Off,
}

/// Error types that can occur during emulation
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VmError {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: usize },

    #[error("Program counter {pc:#06X} is outside of addressable memory")]
    ProgramCounterOutOfRange { pc: u16 },

    #[error("Stack overflow: call at {pc:#06X} with all {depth} stack entries in use")]
    StackOverflow { pc: u16, depth: usize },

    #[error("Stack underflow: return at {pc:#06X} with an empty call stack")]
    StackUnderflow { pc: u16 },
}
