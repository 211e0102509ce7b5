//! CGB-only registers: KEY1, RP, SVBK, VBK and the palette ports.

use crate::dma::Hdma;
use crate::memory::Register;
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::Addressable;
use serde::{Deserialize, Serialize};

/// KEY1 (`$FF4D`): prepare bit and current speed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeedRegister {
    prepare: bool,
    double_speed: bool,
}

impl SpeedRegister {
    pub fn double_speed(&self) -> bool {
        self.double_speed
    }

    /// Called by the CPU on STOP. Toggles speed if a switch was armed.
    pub fn perform_speed_switch(&mut self) -> bool {
        if !self.prepare {
            return false;
        }
        self.prepare = false;
        self.double_speed = !self.double_speed;
        log(LogCategory::Io, LogLevel::Debug, || {
            format!(
                "KEY1: switched to {} speed",
                if self.double_speed { "double" } else { "normal" }
            )
        });
        true
    }

    pub fn speed_factor(&self) -> u32 {
        if self.double_speed {
            2
        } else {
            1
        }
    }
}

impl Addressable for SpeedRegister {
    fn name(&self) -> &str {
        "Speed Register"
    }

    fn read(&self, _addr: u16) -> u8 {
        (u8::from(self.double_speed) << 7) | 0x7E | u8::from(self.prepare)
    }

    fn write(&mut self, _addr: u16, val: u8) {
        self.prepare = val & 0x01 != 0;
    }
}

/// Index/data port pair over 64 bytes of palette memory
/// (BCPS/BCPD at `$FF68-$FF69`, OCPS/OCPD at `$FF6A-$FF6B`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteRam {
    name: String,
    index: u8,
    auto_increment: bool,
    data: Vec<u8>,
}

impl PaletteRam {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            index: 0,
            auto_increment: false,
            data: vec![0; 64],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// The even address of each pair is the index port
    fn is_index_port(addr: u16) -> bool {
        addr & 0x01 == 0
    }
}

impl Addressable for PaletteRam {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, addr: u16) -> u8 {
        if Self::is_index_port(addr) {
            (u8::from(self.auto_increment) << 7) | 0x40 | self.index
        } else {
            self.data.get(usize::from(self.index)).copied().unwrap_or(0xFF)
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        if Self::is_index_port(addr) {
            self.auto_increment = val & 0x80 != 0;
            self.index = val & 0x3F;
            return;
        }
        if let Some(byte) = self.data.get_mut(usize::from(self.index)) {
            *byte = val;
        }
        if self.auto_increment {
            self.index = (self.index + 1) & 0x3F;
        }
    }
}

/// Everything the bus only exposes in CGB mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CgbRegisters {
    pub speed: SpeedRegister,
    pub infrared: Register,
    pub wram_select: Register,
    pub vram_select: Register,
    pub bg_palette: PaletteRam,
    pub obj_palette: PaletteRam,
    pub hdma: Hdma,
}

impl Default for CgbRegisters {
    fn default() -> Self {
        Self {
            speed: SpeedRegister::default(),
            // Bit 1 (receiving) reads 1: no signal
            infrared: Register::new("Infrared Register")
                .with_write_mask(0xC1)
                .with_or_on_read(0x3E),
            wram_select: Register::new("WRAM Bank Select")
                .with_write_mask(0x07)
                .with_or_on_read(0xF8),
            vram_select: Register::new("VRAM Bank Select")
                .with_write_mask(0x01)
                .with_or_on_read(0xFE),
            bg_palette: PaletteRam::new("Background Palette"),
            obj_palette: PaletteRam::new("Sprite Palette"),
            hdma: Hdma::new(),
        }
    }
}

impl CgbRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// WRAM bank mapped at `0xD000`; a selection of 0 means bank 1
    pub fn wram_bank(&self) -> usize {
        match self.wram_select.value() & 0x07 {
            0 => 1,
            bank => usize::from(bank),
        }
    }

    pub fn vram_bank(&self) -> usize {
        usize::from(self.vram_select.value() & 0x01)
    }
}
