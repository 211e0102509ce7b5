//! Game Boy Memory Bank Controllers (MBCs)
//!
//! Controllers only hold banking registers. The cartridge owns the ROM bytes
//! and external RAM banks and hands them in on every access.

mod mbc0;
mod mbc1;

pub use mbc0::Mbc0;
pub use mbc1::{BankingMode, Mbc1};

use crate::cartridge::ExternalRam;
use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

/// Unified mapper enum that dispatches to specific implementations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Mapper {
    Mbc0(Mbc0),
    Mbc1(Mbc1),
}

impl Mapper {
    /// Create a mapper from the cartridge type byte (`0x0147`)
    pub fn from_cart(cart_type: u8, rom_bank_count: usize) -> Self {
        match cart_type {
            0x00 | 0x08 | 0x09 => Mapper::Mbc0(Mbc0::new()), // ROM ONLY (+RAM)
            0x01..=0x03 => Mapper::Mbc1(Mbc1::new(rom_bank_count)), // MBC1 (+RAM+BATTERY)
            _ => {
                log(LogCategory::Cartridge, LogLevel::Warn, || {
                    format!(
                        "Cartridge: unsupported cartridge type {:02X}, falling back to MBC0",
                        cart_type
                    )
                });
                Mapper::Mbc0(Mbc0::new())
            }
        }
    }

    /// Whether the controller claims `addr` for itself
    pub fn accepts(&self, addr: u16) -> bool {
        addr <= 0x8000
    }

    pub fn read(&self, rom: &[u8], addr: u16) -> u8 {
        match self {
            Mapper::Mbc0(m) => m.read(rom, addr),
            Mapper::Mbc1(m) => m.read(rom, addr),
        }
    }

    /// Write to a controller register
    pub fn write(&mut self, addr: u16, val: u8, ram: &mut ExternalRam) {
        match self {
            Mapper::Mbc0(m) => m.write(addr, val),
            Mapper::Mbc1(m) => m.write(addr, val, ram),
        }
    }

    /// Whether external RAM is usable without an enable write first
    pub fn ram_enabled_at_power_on(&self) -> bool {
        matches!(self, Mapper::Mbc0(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mapper::Mbc0(_) => "MBC0",
            Mapper::Mbc1(_) => "MBC1",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapper_from_cart_type() {
        assert_eq!(Mapper::from_cart(0x00, 2).name(), "MBC0");
        assert_eq!(Mapper::from_cart(0x01, 2).name(), "MBC1");
        assert_eq!(Mapper::from_cart(0x02, 2).name(), "MBC1");
        assert_eq!(Mapper::from_cart(0x03, 2).name(), "MBC1");
        assert_eq!(Mapper::from_cart(0x09, 2).name(), "MBC0");

        // Unknown type defaults to MBC0
        assert_eq!(Mapper::from_cart(0x19, 2).name(), "MBC0");
    }

    #[test]
    fn test_mapper_accepts() {
        let mapper = Mapper::from_cart(0x01, 2);
        assert!(mapper.accepts(0x0000));
        assert!(mapper.accepts(0x7FFF));
        assert!(mapper.accepts(0x8000));
        assert!(!mapper.accepts(0xA000));
    }

    #[test]
    fn test_mapper_delegation() {
        let mut rom = vec![0; 0x8000];
        rom[0] = 0xAA;
        rom[0x4000] = 0xBB;

        let mut ram = ExternalRam::new(0, false);
        let mut mapper = Mapper::from_cart(0x01, 2);

        assert_eq!(mapper.read(&rom, 0x0000), 0xAA);
        assert_eq!(mapper.read(&rom, 0x4000), 0xBB);

        mapper.write(0x2000, 0x03, &mut ram);
        // Bank 3 does not exist in a 2-bank ROM
        assert_eq!(mapper.read(&rom, 0x4000), 0xFF);
    }

    #[test]
    fn test_mapper_state_serializes() {
        let mut ram = ExternalRam::new(0, false);
        let mut mapper = Mapper::from_cart(0x01, 8);
        mapper.write(0x2000, 0x05, &mut ram);

        let json = serde_json::to_value(&mapper).unwrap();
        let back: Mapper = serde_json::from_value(json).unwrap();
        match back {
            Mapper::Mbc1(m) => assert_eq!(m.current_rom_bank(), 5),
            other => panic!("unexpected mapper {}", other.name()),
        }
    }
}
