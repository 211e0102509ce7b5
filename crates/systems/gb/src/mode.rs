//! Ambient machine state the bus consults on every access.
//!
//! The PPU and the mode-management code push these values in; the bus never
//! computes them itself. Resolution takes a [`MachineMode`] snapshot by value
//! so that address decoding stays a pure function of its inputs.

use serde::{Deserialize, Serialize};

/// PPU mode as reported in the low two bits of STAT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoMode {
    /// Horizontal blank
    #[default]
    Mode0,
    /// Vertical blank
    Mode1,
    /// OAM scan
    Mode2,
    /// Pixel transfer
    Mode3,
}

impl VideoMode {
    /// STAT bits 0-1 for this mode
    pub fn stat_bits(self) -> u8 {
        match self {
            VideoMode::Mode0 => 0,
            VideoMode::Mode1 => 1,
            VideoMode::Mode2 => 2,
            VideoMode::Mode3 => 3,
        }
    }

    /// VRAM and the CGB palette data ports belong to the PPU while drawing
    pub fn locks_vram(self) -> bool {
        self == VideoMode::Mode3
    }

    /// OAM belongs to the PPU during OAM scan and drawing
    pub fn locks_oam(self) -> bool {
        matches!(self, VideoMode::Mode2 | VideoMode::Mode3)
    }
}

/// Snapshot of the mode flags that steer address resolution.
///
/// `is_cgb` is a hardware capability (fixed per cartridge) while
/// `in_cgb_mode` says whether the machine currently runs with CGB features
/// enabled. A CGB running a DMG-only game has the first set and not the
/// second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MachineMode {
    pub is_cgb: bool,
    pub in_cgb_mode: bool,
    pub video_mode: VideoMode,
}

impl MachineMode {
    pub fn dmg() -> Self {
        Self::default()
    }

    pub fn cgb() -> Self {
        Self {
            is_cgb: true,
            in_cgb_mode: true,
            video_mode: VideoMode::Mode0,
        }
    }

    pub fn with_video_mode(self, video_mode: VideoMode) -> Self {
        Self { video_mode, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_per_mode() {
        assert!(!VideoMode::Mode0.locks_vram());
        assert!(!VideoMode::Mode1.locks_oam());
        assert!(VideoMode::Mode2.locks_oam());
        assert!(!VideoMode::Mode2.locks_vram());
        assert!(VideoMode::Mode3.locks_oam());
        assert!(VideoMode::Mode3.locks_vram());
    }

    #[test]
    fn test_with_video_mode_keeps_flags() {
        let mode = MachineMode::cgb().with_video_mode(VideoMode::Mode3);
        assert!(mode.is_cgb);
        assert!(mode.in_cgb_mode);
        assert_eq!(mode.video_mode, VideoMode::Mode3);
    }
}
