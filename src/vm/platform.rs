use super::font::GLYPH_SIZE;

/// Historical CHIP-8 platform a [`PlatformSpec`] models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    CosmacVip,
    Modern,
    Chip48,
    SuperChip,
    XoChip,
}

/// Behavioural toggles that differ between platform variants.
///
/// Every flag is independent. Which instructions consult which flag:
///
/// | flag | instructions |
/// |---|---|
/// | `vf_reset` | `8xy1`, `8xy2`, `8xy3` |
/// | `load_store_increments_index` | `Fx55`, `Fx65` |
/// | `vertical_blank_sync` | `Dxyn` |
/// | `wrap_sprites` | `Dxyn` |
/// | `shift_uses_second_operand` | `8xy6`, `8xyE` |
/// | `jump_adds_first_register` | `Bnnn` |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Quirks {
    /// The logical ops (`8xy1`-`8xy3`) clear VF after computing their result.
    ///
    /// Has no effect on `8xy4`, which always writes its carry, or on `Dxyn`,
    /// which always clears VF before drawing.
    pub vf_reset: bool,
    /// `Fx55`/`Fx65` leave the index register pointing past the copied block.
    pub load_store_increments_index: bool,
    /// A sprite draw ends the current frame.
    pub vertical_blank_sync: bool,
    /// Sprite pixels that run off an edge reappear on the opposite edge
    /// instead of being clipped.
    pub wrap_sprites: bool,
    /// Shifts read `Vy` and store the shifted value into `Vx`.
    pub shift_uses_second_operand: bool,
    /// `Bnnn` jumps to `nnn + V0` rather than plain `nnn`.
    pub jump_adds_first_register: bool,
}

impl Quirks {
    pub const fn with_vf_reset(mut self, enabled: bool) -> Self {
        self.vf_reset = enabled;
        self
    }

    pub const fn with_load_store_increments_index(mut self, enabled: bool) -> Self {
        self.load_store_increments_index = enabled;
        self
    }

    pub const fn with_vertical_blank_sync(mut self, enabled: bool) -> Self {
        self.vertical_blank_sync = enabled;
        self
    }

    pub const fn with_wrap_sprites(mut self, enabled: bool) -> Self {
        self.wrap_sprites = enabled;
        self
    }

    pub const fn with_shift_uses_second_operand(mut self, enabled: bool) -> Self {
        self.shift_uses_second_operand = enabled;
        self
    }

    pub const fn with_jump_adds_first_register(mut self, enabled: bool) -> Self {
        self.jump_adds_first_register = enabled;
        self
    }
}

const NO_QUIRKS: Quirks = Quirks {
    vf_reset: false,
    load_store_increments_index: false,
    vertical_blank_sync: false,
    wrap_sprites: false,
    shift_uses_second_operand: false,
    jump_adds_first_register: true,
};

/// Immutable machine configuration: video geometry, glyph size, speed and
/// quirks. Chosen once when a machine powers on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlatformSpec {
    platform: Platform,
    video_width: u16,
    video_height: u16,
    glyph_size: u8,
    tick_rate: u16,
    quirks: Quirks,
}

impl PlatformSpec {
    /// The reference platform: the original COSMAC VIP interpreter.
    pub const fn cosmac_vip() -> Self {
        Self {
            platform: Platform::CosmacVip,
            video_width: 64,
            video_height: 32,
            glyph_size: GLYPH_SIZE,
            tick_rate: 15,
            quirks: NO_QUIRKS.with_vf_reset(true).with_vertical_blank_sync(true),
        }
    }

    pub const fn modern() -> Self {
        Self {
            platform: Platform::Modern,
            tick_rate: 12,
            quirks: NO_QUIRKS,
            ..Self::cosmac_vip()
        }
    }

    pub const fn chip48() -> Self {
        Self {
            platform: Platform::Chip48,
            tick_rate: 30,
            quirks: NO_QUIRKS,
            ..Self::cosmac_vip()
        }
    }

    pub const fn super_chip() -> Self {
        Self {
            platform: Platform::SuperChip,
            tick_rate: 30,
            quirks: NO_QUIRKS,
            ..Self::cosmac_vip()
        }
    }

    pub const fn xo_chip() -> Self {
        Self {
            platform: Platform::XoChip,
            tick_rate: 1000,
            quirks: NO_QUIRKS
                .with_load_store_increments_index(true)
                .with_wrap_sprites(true)
                .with_shift_uses_second_operand(true),
            ..Self::cosmac_vip()
        }
    }

    pub const fn preset(platform: Platform) -> Self {
        match platform {
            Platform::CosmacVip => Self::cosmac_vip(),
            Platform::Modern => Self::modern(),
            Platform::Chip48 => Self::chip48(),
            Platform::SuperChip => Self::super_chip(),
            Platform::XoChip => Self::xo_chip(),
        }
    }

    /// Returns a copy with the quirk set replaced.
    pub const fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    /// Returns a copy running `tick_rate` instructions per 60 Hz frame.
    pub const fn with_tick_rate(mut self, tick_rate: u16) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Returns a copy with a different framebuffer geometry.
    ///
    /// Panics if either dimension is zero.
    pub const fn with_video_size(mut self, width: u16, height: u16) -> Self {
        assert!(width > 0 && height > 0, "video dimensions must be non-zero");
        self.video_width = width;
        self.video_height = height;
        self
    }

    pub const fn platform(&self) -> Platform {
        self.platform
    }

    pub const fn video_width(&self) -> u16 {
        self.video_width
    }

    pub const fn video_height(&self) -> u16 {
        self.video_height
    }

    pub const fn glyph_size(&self) -> u8 {
        self.glyph_size
    }

    pub const fn tick_rate(&self) -> u16 {
        self.tick_rate
    }

    pub const fn quirks(&self) -> Quirks {
        self.quirks
    }
}

impl Default for PlatformSpec {
    fn default() -> Self {
        Self::cosmac_vip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_preset() {
        let spec = PlatformSpec::cosmac_vip();

        assert_eq!(spec.platform(), Platform::CosmacVip);
        assert_eq!((spec.video_width(), spec.video_height()), (64, 32));
        assert_eq!(spec.glyph_size(), 5);
        assert_eq!(spec.tick_rate(), 15);

        let quirks = spec.quirks();
        assert!(quirks.vf_reset);
        assert!(quirks.vertical_blank_sync);
        assert!(quirks.jump_adds_first_register);
        assert!(!quirks.load_store_increments_index);
        assert!(!quirks.wrap_sprites);
        assert!(!quirks.shift_uses_second_operand);
    }

    #[test]
    fn preset_matches_named_constructor() {
        for platform in [
            Platform::CosmacVip,
            Platform::Modern,
            Platform::Chip48,
            Platform::SuperChip,
            Platform::XoChip,
        ] {
            assert_eq!(PlatformSpec::preset(platform).platform(), platform);
        }
        assert_eq!(PlatformSpec::default(), PlatformSpec::cosmac_vip());
    }

    #[test]
    fn overrides_touch_only_their_flag() {
        let base = PlatformSpec::cosmac_vip();
        let spec = base.with_quirks(base.quirks().with_wrap_sprites(true));

        assert!(spec.quirks().wrap_sprites);
        assert_eq!(spec.quirks().with_wrap_sprites(false), base.quirks());
        assert_eq!(spec.tick_rate(), base.tick_rate());
        // The original value is untouched.
        assert!(!base.quirks().wrap_sprites);
    }

    #[test]
    #[should_panic(expected = "video dimensions")]
    fn zero_sized_video_is_rejected() {
        let _ = PlatformSpec::modern().with_video_size(0, 32);
    }
}
