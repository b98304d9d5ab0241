//! Command line configuration shared by the binaries.

use clap::{Args, ValueEnum};
use clap_num::maybe_hex;

use crate::vm::{Platform, PlatformSpec, Quirks};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    CosmacVip,
    Modern,
    Chip48,
    SuperChip,
    XoChip,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::CosmacVip => Platform::CosmacVip,
            PlatformArg::Modern => Platform::Modern,
            PlatformArg::Chip48 => Platform::Chip48,
            PlatformArg::SuperChip => Platform::SuperChip,
            PlatformArg::XoChip => Platform::XoChip,
        }
    }
}

/// Platform selection plus per-quirk overrides.
#[derive(Args, Clone, Debug)]
pub struct PlatformArgs {
    /// Platform preset providing video size, speed and default quirks
    #[arg(short, long, value_enum, default_value_t = PlatformArg::CosmacVip)]
    pub platform: PlatformArg,

    /// Instructions per 60 Hz frame, decimal or 0x-prefixed hex [default: from preset]
    #[arg(long, value_parser = maybe_hex::<u16>)]
    pub tick_rate: Option<u16>,

    /// 8xy1/8xy2/8xy3 clear VF
    #[arg(long, value_name = "BOOL")]
    pub vf_reset: Option<bool>,

    /// Fx55/Fx65 advance the index register past the copied block
    #[arg(long, value_name = "BOOL")]
    pub load_store_increment: Option<bool>,

    /// Sprite draws wait for the next frame
    #[arg(long, value_name = "BOOL")]
    pub vblank: Option<bool>,

    /// Sprites wrap around the screen edges instead of being clipped
    #[arg(long, value_name = "BOOL")]
    pub wrap: Option<bool>,

    /// Shifts read Vy instead of Vx
    #[arg(long, value_name = "BOOL")]
    pub shift_vy: Option<bool>,

    /// Bnnn adds V0 to the jump target
    #[arg(long, value_name = "BOOL")]
    pub jump_v0: Option<bool>,
}

impl PlatformArgs {
    /// Builds the platform: the preset first, then every explicit override.
    pub fn to_spec(&self) -> PlatformSpec {
        let preset = PlatformSpec::preset(self.platform.into());
        let defaults = preset.quirks();

        let quirks = Quirks {
            vf_reset: self.vf_reset.unwrap_or(defaults.vf_reset),
            load_store_increments_index: self
                .load_store_increment
                .unwrap_or(defaults.load_store_increments_index),
            vertical_blank_sync: self.vblank.unwrap_or(defaults.vertical_blank_sync),
            wrap_sprites: self.wrap.unwrap_or(defaults.wrap_sprites),
            shift_uses_second_operand: self
                .shift_vy
                .unwrap_or(defaults.shift_uses_second_operand),
            jump_adds_first_register: self.jump_v0.unwrap_or(defaults.jump_adds_first_register),
        };

        let spec = preset.with_quirks(quirks);
        match self.tick_rate {
            Some(tick_rate) => spec.with_tick_rate(tick_rate),
            None => spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        platform: PlatformArgs,
    }

    fn parse(args: &[&str]) -> PlatformSpec {
        Cli::try_parse_from(std::iter::once("test").chain(args.iter().copied()))
            .expect("arguments should parse")
            .platform
            .to_spec()
    }

    #[test]
    fn defaults_to_reference_platform() {
        assert_eq!(parse(&[]), PlatformSpec::cosmac_vip());
    }

    #[test]
    fn selects_preset() {
        assert_eq!(parse(&["--platform", "xo-chip"]), PlatformSpec::xo_chip());
        assert_eq!(parse(&["-p", "super-chip"]), PlatformSpec::super_chip());
    }

    #[test]
    fn overrides_single_quirks() {
        let spec = parse(&["--wrap", "true", "--vf-reset", "false"]);

        assert!(spec.quirks().wrap_sprites);
        assert!(!spec.quirks().vf_reset);
        // Untouched flags keep the preset value
        assert!(spec.quirks().vertical_blank_sync);
    }

    #[test]
    fn tick_rate_accepts_hex() {
        assert_eq!(parse(&["--tick-rate", "0x20"]).tick_rate(), 32);
        assert_eq!(parse(&["--tick-rate", "7"]).tick_rate(), 7);
    }

    #[test]
    fn rejects_unknown_platform() {
        assert!(Cli::try_parse_from(["test", "--platform", "hp48"]).is_err());
    }
}
