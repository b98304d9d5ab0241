use rand::Rng;

use super::{
    AluOp, FONT_START_ADDRESS, MachineState, Opcode, Outcome, PlatformSpec, Quirks, VmError,
};
use crate::u4;

/// Where the program counter goes once an instruction has run.
enum Flow {
    /// Advance by 2.
    Next,
    /// Advance by 2, then by 2 more when the condition held.
    Skip(bool),
    /// Set the program counter.
    Goto(u16),
    /// Leave the program counter on this instruction.
    Hold,
}

impl MachineState {
    /// Decodes and executes a single opcode word.
    ///
    /// On error nothing is mutated. Unknown words are reported through
    /// [`Outcome::Unrecognized`] and leave the program counter in place.
    pub fn execute<R: Rng + ?Sized>(
        &mut self,
        opcode: u16,
        spec: &PlatformSpec,
        rng: &mut R,
    ) -> Result<Outcome, VmError> {
        let decoded = Opcode::decode(opcode);
        log::trace!("{:#05X}: {opcode:04X} {decoded:?}", self.pc);

        let quirks = spec.quirks();
        let mut outcome = Outcome::Continue;

        let flow = match decoded {
            Opcode::ClearDisplay => {
                self.framebuffer.clear();
                Flow::Next
            }
            Opcode::Return => {
                self.pc = self.pop()?;
                Flow::Next
            }
            Opcode::Jump { nnn } => Flow::Goto(nnn),
            Opcode::Call { nnn } => {
                self.push(self.pc)?;
                Flow::Goto(nnn)
            }
            Opcode::JumpWithOffset { nnn } => {
                let offset = if quirks.jump_adds_first_register {
                    self.v[0]
                } else {
                    0
                };
                Flow::Goto(nnn.wrapping_add(offset.into()))
            }
            Opcode::SkipRegEqualImm { x, nn } => Flow::Skip(self.v[x] == nn),
            Opcode::SkipRegNotEqualImm { x, nn } => Flow::Skip(self.v[x] != nn),
            Opcode::SkipRegEqualReg { x, y } => Flow::Skip(self.v[x] == self.v[y]),
            Opcode::SkipRegNotEqualReg { x, y } => Flow::Skip(self.v[x] != self.v[y]),
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
                Flow::Next
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
                Flow::Next
            }
            Opcode::Alu { x, y, op } => {
                self.execute_alu(x, y, op, quirks);
                Flow::Next
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn;
                Flow::Next
            }
            Opcode::AddIndexReg { x } => {
                self.i = self.i.wrapping_add(self.v[x].into());
                Flow::Next
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = rng.random();
                self.v[x] = rand_byte & nn;
                Flow::Next
            }
            Opcode::Draw { x, y, n } => {
                self.execute_draw(x, y, n, quirks)?;
                if quirks.vertical_blank_sync {
                    outcome = Outcome::WaitForNextFrame;
                }
                Flow::Next
            }
            Opcode::SkipIfPressed { x } => Flow::Skip(self.keypad[u4::low(self.v[x])]),
            Opcode::SkipIfNotPressed { x } => Flow::Skip(!self.keypad[u4::low(self.v[x])]),
            Opcode::WaitForKey { x } => match self.keypad.iter().position(|&pressed| pressed) {
                Some(key) => {
                    self.v[x] = key as u8;
                    Flow::Next
                }
                // Re-run this instruction on the next step
                None => Flow::Hold,
            },
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer;
                Flow::Next
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer = self.v[x];
                Flow::Next
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer = self.v[x];
                Flow::Next
            }
            Opcode::FontChar { x } => {
                let glyph = u16::from(spec.glyph_size()) * u16::from(self.v[x]);
                self.i = FONT_START_ADDRESS as u16 + glyph;
                Flow::Next
            }
            Opcode::Bcd { x } => {
                let value = self.v[x];
                self.mem_slice_mut(self.i, 3)?
                    .copy_from_slice(&[value / 100, (value / 10) % 10, value % 10]);
                Flow::Next
            }
            Opcode::StoreRegs { x } => {
                let count = usize::from(x) + 1;
                let regs = self.v;
                self.mem_slice_mut(self.i, count)?
                    .copy_from_slice(&regs[..count]);
                self.advance_index_after_block(count, quirks);
                Flow::Next
            }
            Opcode::LoadRegs { x } => {
                let count = usize::from(x) + 1;
                let mut regs = [0; 16];
                regs[..count].copy_from_slice(self.mem_slice(self.i, count)?);
                self.v[..count].copy_from_slice(&regs[..count]);
                self.advance_index_after_block(count, quirks);
                Flow::Next
            }
            Opcode::Unknown(word) => {
                log::warn!("Unknown opcode {word:#06X} at {:#05X}", self.pc);
                return Ok(Outcome::Unrecognized(word));
            }
        };

        match flow {
            Flow::Next => self.pc = self.pc.wrapping_add(2),
            Flow::Skip(condition) => {
                self.pc = self.pc.wrapping_add(2);
                if condition {
                    self.pc = self.pc.wrapping_add(2);
                }
            }
            Flow::Goto(address) => self.pc = address,
            Flow::Hold => {}
        }

        Ok(outcome)
    }

    fn execute_alu(&mut self, x: u4, y: u4, op: AluOp, quirks: Quirks) {
        // Flags are always derived from the operands as they were before the write.
        let (vx, vy) = (self.v[x], self.v[y]);
        let shift_source = if quirks.shift_uses_second_operand {
            vy
        } else {
            vx
        };

        let (result, flag) = match op {
            AluOp::Set => (vy, None),
            AluOp::Or => (vx | vy, quirks.vf_reset.then_some(0)),
            AluOp::And => (vx & vy, quirks.vf_reset.then_some(0)),
            AluOp::Xor => (vx ^ vy, quirks.vf_reset.then_some(0)),
            AluOp::Add => {
                let (sum, carry) = vx.overflowing_add(vy);
                (sum, Some(u8::from(carry)))
            }
            AluOp::Sub => (vx.wrapping_sub(vy), Some(u8::from(vx > vy))),
            AluOp::SubReverse => (vy.wrapping_sub(vx), Some(u8::from(vx < vy))),
            AluOp::ShiftRight => (shift_source >> 1, Some(shift_source & 1)),
            AluOp::ShiftLeft => (shift_source << 1, Some((shift_source & 0x80) >> 7)),
        };

        self.v[x] = result;
        if let Some(flag) = flag {
            self.v[u4::F] = flag;
        }
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4, quirks: Quirks) -> Result<(), VmError> {
        let rows = usize::from(n);
        let mut sprite = [0; 16];
        sprite[..rows].copy_from_slice(self.mem_slice(self.i, rows)?);

        let width = self.framebuffer.width();
        let height = self.framebuffer.height();

        // The origin always wraps; only the pixels that overflow an edge are subject to the quirk.
        let x_pos = usize::from(self.v[x]) % width;
        let y_pos = usize::from(self.v[y]) % height;

        self.v[u4::F] = 0;
        for (row, sprite_byte) in sprite[..rows].iter().enumerate() {
            for col in 0..8 {
                if sprite_byte & (0x80 >> col) == 0 {
                    continue;
                }

                let target = if quirks.wrap_sprites {
                    Some(((x_pos + col) % width, (y_pos + row) % height))
                } else {
                    Some((x_pos + col, y_pos + row)).filter(|&(px, py)| px < width && py < height)
                };
                let Some((px, py)) = target else {
                    continue;
                };

                self.v[u4::F] |= self.framebuffer.toggle(px, py);
            }
        }

        Ok(())
    }

    fn advance_index_after_block(&mut self, count: usize, quirks: Quirks) {
        if quirks.load_store_increments_index {
            self.i = self.i.wrapping_add(count as u16);
        }
    }
}
