//! LCD control and status registers (`$FF40-$FF45`, `$FF47-$FF4B`).
//!
//! The PPU owns timing; it pushes LY and the STAT mode bits in through the
//! bus and reads the rest back with [`LcdRegisters::value`].

use crate::memory::Register;
use crate::mode::VideoMode;
use emu_core::memory::Addressable;
use serde::{Deserialize, Serialize};

pub const LCDC: u16 = 0xFF40;
pub const STAT: u16 = 0xFF41;
pub const LY: u16 = 0xFF44;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LcdRegisters {
    /// `$FF40-$FF4B`, with LY and DMA slots kept but unused
    regs: Vec<Register>,
    ly: u8,
}

impl Default for LcdRegisters {
    fn default() -> Self {
        let names = [
            "LCDC", "STAT", "SCY", "SCX", "LY", "LYC", "DMA", "BGP", "OBP0", "OBP1", "WY", "WX",
        ];
        let regs = names
            .iter()
            .map(|&name| {
                let reg = Register::new(name);
                if name == "STAT" {
                    reg.with_or_on_read(0x80)
                } else {
                    reg
                }
            })
            .collect();
        Self { regs, ly: 0 }
    }
}

impl LcdRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(addr: u16) -> usize {
        usize::from(addr.wrapping_sub(LCDC))
    }

    /// Stored value of a register, LY included
    pub fn value(&self, addr: u16) -> u8 {
        if addr == LY {
            return self.ly;
        }
        self.regs
            .get(Self::index(addr))
            .map(|r| r.value())
            .unwrap_or(0xFF)
    }

    pub fn set_ly(&mut self, ly: u8) {
        self.ly = ly;
    }

    /// Mirror the PPU mode into STAT bits 0-1
    pub fn set_mode_bits(&mut self, mode: VideoMode) {
        if let Some(stat) = self.regs.get_mut(Self::index(STAT)) {
            stat.set_value((stat.value() & !0x03) | mode.stat_bits());
        }
    }
}

impl Addressable for LcdRegisters {
    fn name(&self) -> &str {
        "LCD registers"
    }

    fn read(&self, addr: u16) -> u8 {
        if addr == LY {
            return self.ly;
        }
        self.regs
            .get(Self::index(addr))
            .map(|r| r.read(addr))
            .unwrap_or(0xFF)
    }

    fn write(&mut self, addr: u16, val: u8) {
        // LY is read-only
        if addr == LY {
            return;
        }
        if let Some(reg) = self.regs.get_mut(Self::index(addr)) {
            reg.write(addr, val);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_bit_seven() {
        let mut lcd = LcdRegisters::new();
        assert_eq!(lcd.read(STAT), 0x80);
        lcd.write(STAT, 0x40);
        assert_eq!(lcd.read(STAT), 0xC0);
    }

    #[test]
    fn test_ly_read_only() {
        let mut lcd = LcdRegisters::new();
        lcd.set_ly(0x90);
        lcd.write(LY, 0x00);
        assert_eq!(lcd.read(LY), 0x90);
        assert_eq!(lcd.value(LY), 0x90);
    }

    #[test]
    fn test_mode_bits() {
        let mut lcd = LcdRegisters::new();
        lcd.write(STAT, 0x44);
        lcd.set_mode_bits(VideoMode::Mode3);
        assert_eq!(lcd.read(STAT), 0xC7);
        lcd.set_mode_bits(VideoMode::Mode0);
        assert_eq!(lcd.value(STAT), 0x44);
    }

    #[test]
    fn test_plain_registers() {
        let mut lcd = LcdRegisters::new();
        for addr in [0xFF40, 0xFF42, 0xFF43, 0xFF45, 0xFF47, 0xFF48, 0xFF49, 0xFF4A, 0xFF4B] {
            lcd.write(addr, 0x5A);
            assert_eq!(lcd.read(addr), 0x5A, "{:04X}", addr);
        }
    }
}
