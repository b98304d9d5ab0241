use super::{FONT, FONT_END_ADDRESS, FONT_START_ADDRESS, Framebuffer, PlatformSpec, VmError};
use crate::u4;

// The constants are specified by the CHIP-8 architecture
pub const PROGRAM_START_ADDRESS: usize = 0x200;
pub const MEMORY_SIZE: usize = 4096;
pub const STACK_DEPTH: usize = 16;

/// All mutable data of one CHIP-8 machine.
///
/// A fresh state is built for every program load; there is no reset.
#[derive(Clone, Debug)]
pub struct MachineState {
    /// 4KB memory array
    pub(crate) memory: [u8; MEMORY_SIZE],
    pub(crate) framebuffer: Framebuffer,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    pub(crate) stack: [u16; STACK_DEPTH],
    /// Number of `stack` entries in use
    pub(crate) sp: usize,

    pub(crate) delay_timer: u8,
    pub(crate) sound_timer: u8,

    /// Keypad state: 16 keys mapped as booleans (true = pressed)
    pub(crate) keypad: [bool; 16],

    /// One past the last loaded program byte
    pub(crate) program_size: usize,
}

impl MachineState {
    /// Powers on an empty machine: font loaded, no program.
    pub fn new(spec: &PlatformSpec) -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);

        Self {
            memory,
            framebuffer: Framebuffer::new(
                usize::from(spec.video_width()),
                usize::from(spec.video_height()),
            ),
            pc: PROGRAM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: [0; STACK_DEPTH],
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            keypad: [false; 16],
            program_size: PROGRAM_START_ADDRESS,
        }
    }

    /// Powers on a machine with `rom` copied to the program area.
    pub fn with_program(spec: &PlatformSpec, rom: &[u8]) -> Result<Self, VmError> {
        let mut state = Self::new(spec);

        let rom_end = PROGRAM_START_ADDRESS + rom.len();
        state
            .memory
            .get_mut(PROGRAM_START_ADDRESS..rom_end)
            .ok_or(VmError::RomTooLarge {
                size: rom.len(),
                max_size: MEMORY_SIZE - PROGRAM_START_ADDRESS,
            })?
            .copy_from_slice(rom);
        state.program_size = rom_end;

        log::debug!(
            "Loaded {} byte program at {:#05X}..{:#05X}",
            rom.len(),
            PROGRAM_START_ADDRESS,
            rom_end
        );

        Ok(state)
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.v
    }

    /// The flag register VF.
    pub fn vf(&self) -> u8 {
        self.v[u4::F]
    }

    /// Return addresses currently on the stack, oldest first.
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.sp]
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn keypad(&self) -> &[bool; 16] {
        &self.keypad
    }

    pub fn program_size(&self) -> usize {
        self.program_size
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keypad[key] = pressed;
    }

    /// Releases every key. The core never does this on its own.
    pub fn clear_keys(&mut self) {
        self.keypad = [false; 16];
    }

    /// True once the program counter has run past the loaded program.
    pub fn is_finished(&self) -> bool {
        usize::from(self.pc) >= self.program_size
    }

    /// Fetches the big-endian opcode at the program counter.
    pub(crate) fn fetch(&self) -> Result<u16, VmError> {
        let pc = usize::from(self.pc);

        match self.memory.get(pc..pc + 2) {
            Some(&[high, low]) => Ok(u16::from_be_bytes([high, low])),
            _ => Err(VmError::ProgramCounterOutOfRange { pc: self.pc }),
        }
    }

    pub(crate) fn push(&mut self, address: u16) -> Result<(), VmError> {
        let slot = self.stack.get_mut(self.sp).ok_or(VmError::StackOverflow {
            pc: self.pc,
            depth: STACK_DEPTH,
        })?;
        *slot = address;
        self.sp += 1;
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<u16, VmError> {
        if self.sp == 0 {
            return Err(VmError::StackUnderflow { pc: self.pc });
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    /// Bounds-checked view of `len` bytes starting at `addr`. The error names
    /// the first address that does not exist.
    pub(crate) fn mem_slice(&self, addr: u16, len: usize) -> Result<&[u8], VmError> {
        let start = usize::from(addr);
        self.memory
            .get(start..start + len)
            .ok_or(VmError::MemoryOutOfBounds {
                address: start.max(MEMORY_SIZE),
            })
    }

    /// Bounds-checked mutable view of `len` bytes starting at `addr`.
    pub(crate) fn mem_slice_mut(&mut self, addr: u16, len: usize) -> Result<&mut [u8], VmError> {
        let start = usize::from(addr);
        self.memory
            .get_mut(start..start + len)
            .ok_or(VmError::MemoryOutOfBounds {
                address: start.max(MEMORY_SIZE),
            })
    }

    pub(crate) fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_font_and_start_pc() {
        let state = MachineState::new(&PlatformSpec::cosmac_vip());

        assert_eq!(&state.memory()[..FONT.len()], &FONT[..]);
        assert_eq!(state.pc(), 0x200);
        assert!(state.stack().is_empty());
        assert_eq!(state.framebuffer().width(), 64);
        assert_eq!(state.framebuffer().height(), 32);
        assert!(state.framebuffer().is_blank());
    }

    #[test]
    fn program_is_copied_to_start_address() {
        let state = MachineState::with_program(&PlatformSpec::modern(), &[0x12, 0x34, 0x56])
            .expect("small ROM loads");

        assert_eq!(&state.memory()[0x200..0x203], &[0x12, 0x34, 0x56]);
        assert_eq!(state.program_size(), 0x203);
        assert_eq!(state.fetch(), Ok(0x1234));
    }

    #[test]
    fn largest_rom_fits_exactly() {
        let rom = vec![0xAA; MEMORY_SIZE - PROGRAM_START_ADDRESS];
        let state = MachineState::with_program(&PlatformSpec::modern(), &rom).unwrap();

        assert_eq!(state.program_size(), MEMORY_SIZE);
        assert_eq!(state.memory()[MEMORY_SIZE - 1], 0xAA);
    }

    #[test]
    fn oversized_rom_is_rejected() {
        let rom = vec![0; MEMORY_SIZE - PROGRAM_START_ADDRESS + 1];
        let err = MachineState::with_program(&PlatformSpec::modern(), &rom).unwrap_err();

        assert_eq!(
            err,
            VmError::RomTooLarge {
                size: 3585,
                max_size: 3584
            }
        );
    }

    #[test]
    fn fetch_past_end_of_memory_fails() {
        let mut state = MachineState::new(&PlatformSpec::modern());
        state.pc = (MEMORY_SIZE - 1) as u16;

        assert_eq!(
            state.fetch(),
            Err(VmError::ProgramCounterOutOfRange { pc: 0xFFF })
        );

        state.pc = (MEMORY_SIZE - 2) as u16;
        assert!(state.fetch().is_ok());
    }

    #[test]
    fn stack_refuses_seventeenth_entry() {
        let mut state = MachineState::new(&PlatformSpec::modern());
        for addr in 0..STACK_DEPTH as u16 {
            state.push(addr).unwrap();
        }

        assert!(matches!(
            state.push(0xFFF),
            Err(VmError::StackOverflow { depth: 16, .. })
        ));
        assert_eq!(state.stack().len(), 16);
        assert_eq!(state.pop(), Ok(15));
    }

    #[test]
    fn pop_on_empty_stack_fails() {
        let mut state = MachineState::new(&PlatformSpec::modern());
        assert_eq!(state.pop(), Err(VmError::StackUnderflow { pc: 0x200 }));
        assert_eq!(state.sp, 0);
    }

    #[test]
    fn timers_floor_at_zero() {
        let mut state = MachineState::new(&PlatformSpec::modern());
        state.delay_timer = 1;
        state.sound_timer = 0;

        state.tick_timers();
        state.tick_timers();

        assert_eq!(state.delay_timer(), 0);
        assert_eq!(state.sound_timer(), 0);
    }

    #[test]
    fn keys_are_host_controlled() {
        let mut state = MachineState::new(&PlatformSpec::modern());
        state.set_key(u4::new(0xA), true);
        assert!(state.keypad()[0xA]);

        state.clear_keys();
        assert_eq!(state.keypad(), &[false; 16]);
    }
}
