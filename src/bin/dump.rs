use std::{io::Write, path::PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use clap_num::maybe_hex;
use rand::{SeedableRng, rngs::StdRng};

use quirk8::{Framebuffer, StepOutcome, Vm, config::PlatformArgs};

/// Runs a CHIP-8 ROM without a window and prints the final screen.
///
/// Execution stops when the program runs off its end or after the step limit.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    rom_path: PathBuf,

    /// Maximum number of instructions to execute
    #[arg(short = 'n', long, default_value = "100000", value_parser = maybe_hex::<u64>)]
    max_steps: u64,

    /// Seed for the Cxkk random byte source, for reproducible runs
    #[arg(long, value_parser = maybe_hex::<u64>)]
    seed: Option<u64>,

    #[command(flatten)]
    platform: PlatformArgs,
}

fn render(framebuffer: &Framebuffer, out: &mut impl Write) -> std::io::Result<()> {
    for row in framebuffer.rows() {
        let line: String = row
            .iter()
            .map(|&pixel| if pixel != 0 { '█' } else { ' ' })
            .collect();
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rom = std::fs::read(&args.rom_path).context("Failed to read ROM file")?;
    let spec = args.platform.to_spec();
    let mut vm = match args.seed {
        Some(seed) => Vm::with_rng(spec, &rom, StdRng::seed_from_u64(seed)),
        None => Vm::power_on(spec, &rom),
    }
    .context("Failed to load ROM into CHIP-8 memory")?;

    let mut steps = 0;
    while steps < args.max_steps {
        match vm.step().context("CHIP-8 execution error")? {
            StepOutcome::Finished => break,
            StepOutcome::Idle => bail!("Machine stopped unexpectedly"),
            StepOutcome::Skipped { opcode } => {
                log::debug!("Skipped unknown opcode {opcode:#06X}");
            }
            StepOutcome::Continue | StepOutcome::WaitForNextFrame => {}
        }
        steps += 1;
    }

    log::info!(
        "Executed {steps} instructions, stopped at {:#05X}",
        vm.state().pc()
    );

    let mut stdout = std::io::stdout().lock();
    render(vm.state().framebuffer(), &mut stdout).context("Failed to write screen")?;
    Ok(())
}
