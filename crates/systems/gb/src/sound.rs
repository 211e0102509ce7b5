//! Sound register file (`$FF10-$FF2F`) and wave pattern RAM (`$FF30-$FF3F`).
//!
//! Only the memory-visible side of the APU lives here: stored register
//! values, the per-register read masks and the NR52 power switch. Synthesis
//! reads the raw values back through [`SoundRegisters::raw`].

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::Addressable;
use serde::{Deserialize, Serialize};

const BASE: u16 = 0xFF10;
const NR52: u16 = 0xFF26;

/// Bits that always read back as 1, indexed from `$FF10`
const READ_MASKS: [u8; 0x20] = [
    0x80, 0x3F, 0x00, 0xFF, 0xBF, // NR10-NR14
    0xFF, 0x3F, 0x00, 0xFF, 0xBF, // unused, NR21-NR24
    0x7F, 0xFF, 0x9F, 0xFF, 0xBF, // NR30-NR34
    0xFF, 0xFF, 0x00, 0x00, 0xBF, // unused, NR41-NR44
    0x00, 0x00, 0x70, // NR50, NR51, NR52
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // unused
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundRegisters {
    regs: Vec<u8>,
    powered: bool,
    /// Channel-on flags reported in NR52 bits 0-3, driven by the synthesizer
    channels_active: u8,
}

impl Default for SoundRegisters {
    fn default() -> Self {
        Self {
            regs: vec![0; READ_MASKS.len()],
            powered: true,
            channels_active: 0,
        }
    }
}

impl SoundRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn powered(&self) -> bool {
        self.powered
    }

    /// Stored value without read masks
    pub fn raw(&self, addr: u16) -> u8 {
        self.regs
            .get(usize::from(addr.wrapping_sub(BASE)))
            .copied()
            .unwrap_or(0xFF)
    }

    pub fn set_channels_active(&mut self, flags: u8) {
        self.channels_active = flags & 0x0F;
    }
}

impl Addressable for SoundRegisters {
    fn name(&self) -> &str {
        "Sound registers"
    }

    fn read(&self, addr: u16) -> u8 {
        let index = usize::from(addr.wrapping_sub(BASE));
        if addr == NR52 {
            return (u8::from(self.powered) << 7) | READ_MASKS[index] | self.channels_active;
        }
        match (self.regs.get(index), READ_MASKS.get(index)) {
            (Some(value), Some(mask)) => value | mask,
            _ => 0xFF,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        let index = usize::from(addr.wrapping_sub(BASE));
        if addr == NR52 {
            let powered = val & 0x80 != 0;
            if self.powered && !powered {
                // Powering off clears every register up to NR51
                self.regs.iter_mut().take(index).for_each(|r| *r = 0);
                self.channels_active = 0;
            }
            if self.powered != powered {
                log(LogCategory::Io, LogLevel::Debug, || {
                    format!("Sound: power {}", if powered { "on" } else { "off" })
                });
            }
            self.powered = powered;
            return;
        }
        if !self.powered {
            return;
        }
        if let Some(reg) = self.regs.get_mut(index) {
            *reg = val;
        }
    }
}

/// 32 4-bit samples, readable regardless of power state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveRam {
    data: Vec<u8>,
}

impl Default for WaveRam {
    fn default() -> Self {
        Self { data: vec![0; 16] }
    }
}

impl WaveRam {
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Addressable for WaveRam {
    fn name(&self) -> &str {
        "Wave Pattern RAM"
    }

    fn read(&self, addr: u16) -> u8 {
        self.data.get(usize::from(addr & 0x0F)).copied().unwrap_or(0xFF)
    }

    fn write(&mut self, addr: u16, val: u8) {
        if let Some(byte) = self.data.get_mut(usize::from(addr & 0x0F)) {
            *byte = val;
        }
    }
}
