use super::{RunState, StepOutcome, Vm, VmError};
use crate::u4;

const FRAME_HZ: f32 = 60.0;
const FRAME_TIME_STEP: f32 = 1.0 / FRAME_HZ;

/// Frames older than this are dropped instead of being caught up on.
const MAX_CATCH_UP_FRAMES: u32 = 4;

pub const MAX_SPEED: u8 = 10;

/// High-level runner that turns wall-clock time into 60 Hz frames of
/// `tick_rate * speed` steps each.
pub struct Runner {
    vm: Vm,
    frame_dt_accumulator: f32,
    speed: u8,
}

impl Runner {
    pub fn new(vm: Vm) -> Self {
        Self {
            vm,
            frame_dt_accumulator: 0.0,
            speed: 1,
        }
    }

    /// Update emulator by delta time.
    ///
    /// Runs one frame for every 1/60 s that has elapsed in total.
    pub fn update(&mut self, dt: f32) -> Result<(), VmError> {
        self.frame_dt_accumulator += dt;

        let mut frames = 0;
        while self.frame_dt_accumulator >= FRAME_TIME_STEP {
            self.frame_dt_accumulator -= FRAME_TIME_STEP;
            self.run_frame()?;

            frames += 1;
            if frames == MAX_CATCH_UP_FRAMES {
                // We fell behind (e.g. the window was being dragged). Don't try to catch up.
                self.frame_dt_accumulator = 0.0;
                break;
            }
        }

        Ok(())
    }

    /// Runs a single frame and returns how many instructions were executed.
    ///
    /// The frame ends early when a draw waits for vertical blank or the
    /// session stops running.
    pub fn run_frame(&mut self) -> Result<u32, VmError> {
        let budget = u32::from(self.vm.spec().tick_rate()) * u32::from(self.speed);

        let mut executed = 0;
        while executed < budget {
            match self.vm.step()? {
                StepOutcome::Continue | StepOutcome::Skipped { .. } => executed += 1,
                StepOutcome::WaitForNextFrame => {
                    executed += 1;
                    break;
                }
                StepOutcome::Finished | StepOutcome::Idle => break,
            }
        }

        log::trace!("Frame ran {executed}/{budget} instructions");
        Ok(executed)
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Sets the frame multiplier, clamped to `0..=MAX_SPEED`. 0 halts execution.
    pub fn set_speed(&mut self, speed: u8) {
        self.speed = speed.min(MAX_SPEED);
    }

    pub fn faster(&mut self) {
        self.set_speed(self.speed.saturating_add(1));
    }

    pub fn slower(&mut self) {
        self.set_speed(self.speed.saturating_sub(1));
    }

    pub fn toggle_pause(&mut self) {
        self.vm.toggle_pause();
    }

    pub fn run_state(&self) -> RunState {
        self.vm.run_state()
    }

    /// Returns true if the sound timer is active, indicating a tone should be played.
    pub fn should_play_tone(&self) -> bool {
        self.vm.should_play_tone()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.vm.set_key(key, pressed)
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }
}
