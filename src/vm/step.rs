use rand::{RngCore, SeedableRng, rngs::StdRng};

use super::{MachineState, Outcome, PlatformSpec, RunState, StepOutcome, VmError};
use crate::u4;

/// One powered-on CHIP-8 session: machine state, its platform and the
/// byte source for `Cxkk`.
pub struct Vm {
    state: MachineState,
    spec: PlatformSpec,
    rng: Box<dyn RngCore + Send>,
    run_state: RunState,
    play_tone: bool,
}

impl Vm {
    /// Builds a fresh machine running `rom`, seeded from OS entropy.
    pub fn power_on(spec: PlatformSpec, rom: &[u8]) -> Result<Self, VmError> {
        Self::with_rng(spec, rom, StdRng::from_os_rng())
    }

    /// Like [`Vm::power_on`] with an explicit random byte source.
    pub fn with_rng(
        spec: PlatformSpec,
        rom: &[u8],
        rng: impl RngCore + Send + 'static,
    ) -> Result<Self, VmError> {
        let state = MachineState::with_program(&spec, rom)?;
        log::info!(
            "Powered on {:?} ({}x{}, {} steps/frame)",
            spec.platform(),
            spec.video_width(),
            spec.video_height(),
            spec.tick_rate()
        );

        Ok(Self {
            state,
            spec,
            rng: Box::new(rng),
            run_state: RunState::Running,
            play_tone: false,
        })
    }

    /// Runs one fetch-decode-execute-timer cycle.
    ///
    /// A failing step powers the session off; the error is returned as is.
    pub fn step(&mut self) -> Result<StepOutcome, VmError> {
        if self.run_state != RunState::Running {
            self.play_tone = false;
            return Ok(StepOutcome::Idle);
        }

        if self.state.is_finished() {
            log::debug!("Program finished at {:#05X}", self.state.pc);
            self.power_off();
            return Ok(StepOutcome::Finished);
        }

        let result = self.cycle();
        if let Err(e) = &result {
            log::error!("Step failed: {e}");
            self.power_off();
        }
        result
    }

    fn cycle(&mut self) -> Result<StepOutcome, VmError> {
        let opcode = self.state.fetch()?;
        self.play_tone = self.state.sound_timer > 0;

        let step = match self
            .state
            .execute(opcode, &self.spec, self.rng.as_mut())?
        {
            Outcome::Continue => StepOutcome::Continue,
            Outcome::WaitForNextFrame => StepOutcome::WaitForNextFrame,
            Outcome::Unrecognized(opcode) => {
                self.state.pc = self.state.pc.wrapping_add(2);
                StepOutcome::Skipped { opcode }
            }
        };

        self.state.tick_timers();
        Ok(step)
    }

    /// Toggles between running and paused. A powered-off session stays off.
    pub fn toggle_pause(&mut self) {
        self.run_state = match self.run_state {
            RunState::Running => RunState::Paused,
            RunState::Paused => RunState::Running,
            RunState::Off => RunState::Off,
        };
    }

    fn power_off(&mut self) {
        self.run_state = RunState::Off;
        self.play_tone = false;
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// True while the sound timer was non-zero at the start of the last step.
    pub fn should_play_tone(&self) -> bool {
        self.play_tone
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn spec(&self) -> &PlatformSpec {
        &self.spec
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.state.set_key(key, pressed);
    }

    pub fn clear_keys(&mut self) {
        self.state.clear_keys();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::testing::FixedByte;

    fn vm(rom: &[u8]) -> Vm {
        Vm::with_rng(PlatformSpec::modern(), rom, FixedByte(0)).unwrap()
    }

    #[test]
    fn step_fetches_big_endian_and_advances() {
        let mut vm = vm(&[0x6A, 0x42, 0x6B, 0x07]);

        assert_eq!(vm.step(), Ok(StepOutcome::Continue));
        assert_eq!(vm.state().registers()[0xA], 0x42);
        assert_eq!(vm.state().pc(), 0x202);

        assert_eq!(vm.step(), Ok(StepOutcome::Continue));
        assert_eq!(vm.state().registers()[0xB], 0x07);
    }

    #[test]
    fn end_of_program_powers_off() {
        let mut vm = vm(&[0x60, 0x01]);

        vm.step().unwrap();
        assert_eq!(vm.step(), Ok(StepOutcome::Finished));
        assert_eq!(vm.run_state(), RunState::Off);
        assert_eq!(vm.step(), Ok(StepOutcome::Idle));
    }

    #[test]
    fn empty_program_is_finished_immediately() {
        let mut vm = vm(&[]);
        assert_eq!(vm.step(), Ok(StepOutcome::Finished));
    }

    #[test]
    fn unknown_opcode_is_skipped_by_the_loop() {
        let mut vm = vm(&[0xFF, 0xFF, 0x60, 0x09]);

        assert_eq!(vm.step(), Ok(StepOutcome::Skipped { opcode: 0xFFFF }));
        assert_eq!(vm.state().pc(), 0x202);
        assert_eq!(vm.run_state(), RunState::Running);

        vm.step().unwrap();
        assert_eq!(vm.state().registers()[0], 0x09);
    }

    #[test]
    fn timers_count_down_once_per_step() {
        // V0 = 3; DT = V0; ST = V0; then idle jumps
        let mut vm = vm(&[0x60, 0x03, 0xF0, 0x15, 0xF0, 0x18, 0x12, 0x06]);

        vm.step().unwrap();
        vm.step().unwrap();
        // DT was set during this step and already ticked once
        assert_eq!(vm.state().delay_timer(), 2);

        vm.step().unwrap();
        assert_eq!(vm.state().sound_timer(), 2);
        assert_eq!(vm.state().delay_timer(), 1);
        assert!(!vm.should_play_tone());

        vm.step().unwrap();
        assert!(vm.should_play_tone());
        assert_eq!(vm.state().sound_timer(), 1);
        assert_eq!(vm.state().delay_timer(), 0);

        vm.step().unwrap();
        assert!(vm.should_play_tone());
        assert_eq!(vm.state().sound_timer(), 0);

        vm.step().unwrap();
        assert!(!vm.should_play_tone());
        assert_eq!(vm.state().delay_timer(), 0);
    }

    #[test]
    fn wait_for_key_spins_across_steps() {
        let mut vm = vm(&[0xF4, 0x0A, 0x12, 0x02]);

        for _ in 0..5 {
            vm.step().unwrap();
            assert_eq!(vm.state().pc(), 0x200);
        }

        vm.set_key(u4::new(0xB), true);
        vm.set_key(u4::new(0x2), true);
        vm.step().unwrap();

        assert_eq!(vm.state().pc(), 0x202);
        assert_eq!(vm.state().registers()[4], 0x2);
    }

    #[test]
    fn stack_underflow_fails_the_step_and_powers_off() {
        let mut vm = vm(&[0x00, 0xEE]);

        assert_eq!(vm.step(), Err(VmError::StackUnderflow { pc: 0x200 }));
        assert_eq!(vm.run_state(), RunState::Off);
    }

    #[test]
    fn runaway_program_counter_is_reported() {
        // A full-size ROM that jumps to the last byte of memory
        let mut rom = vec![0; 0x1000 - 0x200];
        rom[0] = 0x1F;
        rom[1] = 0xFF;
        let mut vm = vm(&rom);

        vm.step().unwrap();
        assert_eq!(
            vm.step(),
            Err(VmError::ProgramCounterOutOfRange { pc: 0xFFF })
        );
    }

    #[test]
    fn pause_suspends_stepping() {
        let mut vm = vm(&[0x60, 0x01, 0x61, 0x02]);

        vm.toggle_pause();
        assert_eq!(vm.run_state(), RunState::Paused);
        assert_eq!(vm.step(), Ok(StepOutcome::Idle));
        assert_eq!(vm.state().pc(), 0x200);

        vm.toggle_pause();
        assert_eq!(vm.step(), Ok(StepOutcome::Continue));
        assert_eq!(vm.state().pc(), 0x202);
    }

    #[test]
    fn program_draws_a_font_digit() {
        // V0 = 7; I = glyph(V0); draw 5 rows at (V0, V0)
        let mut vm = vm(&[0x60, 0x07, 0xF0, 0x29, 0xD0, 0x05]);

        while vm.step().unwrap() != StepOutcome::Finished {}

        let fb = vm.state().framebuffer();
        let lit = fb.pixels().iter().filter(|&&p| p != 0).count();
        assert_eq!(lit, 8);
        assert!((7..11).all(|x| fb.pixel(x, 7)));
        assert!(!fb.pixel(11, 7));
        assert!(fb.pixel(10, 8));
        assert!(fb.pixel(8, 10));
        assert_eq!(vm.state().vf(), 0);
    }

    #[test]
    fn program_calls_a_subroutine_and_returns() {
        // 0x200: call 0x206; V1 = 2; jump to end
        // 0x206: V0 = 1; return
        let rom = [
            0x22, 0x06, 0x61, 0x02, 0x12, 0x0A, 0x60, 0x01, 0x00, 0xEE,
        ];
        let mut vm = vm(&rom);

        vm.step().unwrap();
        assert_eq!(vm.state().pc(), 0x206);
        assert_eq!(vm.state().stack(), &[0x200]);

        vm.step().unwrap();
        vm.step().unwrap();
        assert_eq!(vm.state().pc(), 0x202);
        assert!(vm.state().stack().is_empty());

        vm.step().unwrap();
        vm.step().unwrap();
        assert_eq!(vm.step(), Ok(StepOutcome::Finished));
        assert_eq!(vm.state().registers()[..2], [1, 2]);
    }

    #[test]
    fn program_writes_decimal_digits_and_reads_them_back() {
        // V0 = 254; I = 0x300; BCD V0; V0..V2 = [I..]
        let rom = [0x60, 0xFE, 0xA3, 0x00, 0xF0, 0x33, 0xF2, 0x65];
        let mut vm = vm(&rom);

        while vm.step().unwrap() != StepOutcome::Finished {}

        assert_eq!(vm.state().memory()[0x300..0x303], [2, 5, 4]);
        assert_eq!(vm.state().registers()[..3], [2, 5, 4]);
        // Modern platform leaves the index in place
        assert_eq!(vm.state().index(), 0x300);
    }

    #[test]
    fn oversized_rom_is_rejected() {
        let rom = vec![0; 0x1000 - 0x200 + 1];

        assert!(matches!(
            Vm::with_rng(PlatformSpec::modern(), &rom, FixedByte(0)),
            Err(VmError::RomTooLarge { size: 3585, max_size: 3584 })
        ));
    }

    #[test]
    fn power_off_is_not_undone_by_pause() {
        let mut vm = vm(&[]);
        vm.step().unwrap();

        vm.toggle_pause();
        assert_eq!(vm.run_state(), RunState::Off);
    }
}
