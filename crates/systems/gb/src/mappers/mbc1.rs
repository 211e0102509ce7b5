//! MBC1 (Memory Bank Controller 1)
//!
//! The most common Game Boy mapper. The ROM bank register is one logical
//! 7-bit value whose fragments are written through two different windows.
//!
//! # Banking Modes
//!
//! - `Rom16KRam8K` (default): `0x4000-0x5FFF` writes bits 5-6 of the ROM bank
//! - `Rom4MRam32K`: `0x4000-0x5FFF` selects the external RAM bank instead
//!
//! # Register Map
//!
//! - 0x0000-0x1FFF: RAM Enable (`value & 0x0A != 0` enables the selected bank)
//! - 0x2000-0x3FFF: ROM Bank Number (lower 5 bits, zero selects bank 1)
//! - 0x4000-0x5FFF: RAM Bank Number / ROM Bank Number (upper 2 bits)
//! - 0x6000-0x7FFF: Banking Mode Select (1 = RAM banking, anything else = ROM)
//!
//! `0x0000-0x3FFF` always reads bank 0. Reads from a switchable bank past the
//! end of the ROM return `0xFF`.

use crate::cartridge::ExternalRam;
use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

const ROM_BANK_SIZE: usize = 0x4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BankingMode {
    #[default]
    Rom16KRam8K,
    Rom4MRam32K,
}

/// MBC1 mapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mbc1 {
    mode: BankingMode,
    current_rom_bank: u8,
    rom_bank_count: usize,
}

impl Mbc1 {
    pub fn new(rom_bank_count: usize) -> Self {
        Self {
            mode: BankingMode::Rom16KRam8K,
            current_rom_bank: 1,
            rom_bank_count,
        }
    }

    pub fn mode(&self) -> BankingMode {
        self.mode
    }

    /// Bank visible in the switchable window
    pub fn current_rom_bank(&self) -> u8 {
        self.current_rom_bank
    }

    pub fn read(&self, rom: &[u8], addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => rom.get(usize::from(addr)).copied().unwrap_or(0xFF),
            0x4000..=0x7FFF => {
                let bank = usize::from(self.current_rom_bank);
                if bank >= self.rom_bank_count {
                    return 0xFF;
                }
                let offset = bank * ROM_BANK_SIZE + usize::from(addr - 0x4000);
                rom.get(offset).copied().unwrap_or(0xFF)
            }
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8, ram: &mut ExternalRam) {
        match addr {
            0x0000..=0x1FFF => {
                ram.set_enabled(val & 0x0A != 0);
            }
            0x2000..=0x3FFF => {
                let low = val & 0b1_1111;
                self.current_rom_bank = if low == 0 {
                    1
                } else {
                    (self.current_rom_bank & !0b1_1111) | low
                };
            }
            0x4000..=0x5FFF => match self.mode {
                BankingMode::Rom16KRam8K => {
                    self.current_rom_bank =
                        (self.current_rom_bank & 0b1_1111) | ((val & 0b11) << 5);
                }
                BankingMode::Rom4MRam32K => ram.select(usize::from(val & 0b11)),
            },
            0x6000..=0x7FFF => {
                self.mode = if val == 1 {
                    BankingMode::Rom4MRam32K
                } else {
                    BankingMode::Rom16KRam8K
                };
            }
            _ => {
                log(LogCategory::Cartridge, LogLevel::Error, || {
                    format!("MBC1: ignoring write {:02X} to {:04X}", val, addr)
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banked_rom(banks: usize) -> Vec<u8> {
        let mut rom = vec![0; banks * ROM_BANK_SIZE];
        for bank in 0..banks {
            rom[bank * ROM_BANK_SIZE] = bank as u8;
        }
        rom
    }

    #[test]
    fn test_mbc1_default_banks() {
        let rom = banked_rom(4);
        let mbc = Mbc1::new(4);

        assert_eq!(mbc.read(&rom, 0x0000), 0);
        assert_eq!(mbc.read(&rom, 0x4000), 1);
        assert_eq!(mbc.mode(), BankingMode::Rom16KRam8K);
    }

    #[test]
    fn test_mbc1_rom_banking() {
        let rom = banked_rom(8);
        let mut mbc = Mbc1::new(8);
        let mut ram = ExternalRam::new(0, false);

        mbc.write(0x2000, 0x05, &mut ram);
        assert_eq!(mbc.read(&rom, 0x4000), 5);

        mbc.write(0x3FFF, 0x07, &mut ram);
        assert_eq!(mbc.read(&rom, 0x4000), 7);

        // The fixed window never moves
        assert_eq!(mbc.read(&rom, 0x0000), 0);
    }

    #[test]
    fn test_mbc1_zero_write_selects_bank_one() {
        let rom = banked_rom(4);
        let mut mbc = Mbc1::new(4);
        let mut ram = ExternalRam::new(0, false);

        mbc.write(0x2000, 0x03, &mut ram);
        mbc.write(0x2000, 0x00, &mut ram);
        assert_eq!(mbc.current_rom_bank(), 1);
        assert_eq!(mbc.read(&rom, 0x4000), rom[ROM_BANK_SIZE]);
    }

    #[test]
    fn test_mbc1_upper_rom_bits() {
        let rom = banked_rom(64);
        let mut mbc = Mbc1::new(64);
        let mut ram = ExternalRam::new(0, false);

        // Low five bits of 0x20 are zero, so this still aliases to bank 1
        mbc.write(0x2000, 0x20, &mut ram);
        mbc.write(0x4000, 0b01, &mut ram);
        assert_eq!(mbc.current_rom_bank(), 33);
        assert_eq!(mbc.read(&rom, 0x4000), 33);
    }

    #[test]
    fn test_mbc1_low_write_keeps_upper_bits() {
        let mut mbc = Mbc1::new(128);
        let mut ram = ExternalRam::new(0, false);

        mbc.write(0x4000, 0b10, &mut ram);
        mbc.write(0x2000, 0x04, &mut ram);
        assert_eq!(mbc.current_rom_bank(), 0x44);
    }

    #[test]
    fn test_mbc1_ram_banking_mode() {
        let mut mbc = Mbc1::new(4);
        let mut ram = ExternalRam::new(4, false);

        mbc.write(0x6000, 0x01, &mut ram);
        assert_eq!(mbc.mode(), BankingMode::Rom4MRam32K);

        mbc.write(0x4000, 0b10, &mut ram);
        assert_eq!(ram.selected(), 2);
        // ROM bank register untouched
        assert_eq!(mbc.current_rom_bank(), 1);

        // Only the value 1 selects RAM banking
        mbc.write(0x6000, 0x03, &mut ram);
        assert_eq!(mbc.mode(), BankingMode::Rom16KRam8K);
    }

    #[test]
    fn test_mbc1_ram_enable() {
        let mut mbc = Mbc1::new(2);
        let mut ram = ExternalRam::new(1, false);

        mbc.write(0x0000, 0x0A, &mut ram);
        assert!(ram.bank(0).is_some_and(|b| b.enabled()));

        mbc.write(0x1FFF, 0x00, &mut ram);
        assert!(ram.bank(0).is_some_and(|b| !b.enabled()));

        // Any value sharing a bit with 0x0A enables the bank
        mbc.write(0x0000, 0x02, &mut ram);
        assert!(ram.bank(0).is_some_and(|b| b.enabled()));
    }

    #[test]
    fn test_mbc1_ram_enable_is_per_bank() {
        let mut mbc = Mbc1::new(2);
        let mut ram = ExternalRam::new(4, false);

        mbc.write(0x6000, 0x01, &mut ram);
        mbc.write(0x4000, 0x01, &mut ram);
        mbc.write(0x0000, 0x0A, &mut ram);

        assert!(ram.bank(1).is_some_and(|b| b.enabled()));
        assert!(ram.bank(0).is_some_and(|b| !b.enabled()));
    }

    #[test]
    fn test_mbc1_bank_past_end_reads_ff() {
        let rom = banked_rom(4);
        let mut mbc = Mbc1::new(4);
        let mut ram = ExternalRam::new(0, false);

        mbc.write(0x2000, 0x09, &mut ram);
        assert_eq!(mbc.read(&rom, 0x4000), 0xFF);
        assert_eq!(mbc.read(&rom, 0x7FFF), 0xFF);
    }

    #[test]
    fn test_mbc1_enable_without_ram_is_harmless() {
        let mut mbc = Mbc1::new(2);
        let mut ram = ExternalRam::new(0, false);
        mbc.write(0x0000, 0x0A, &mut ram);
        assert!(ram.bank(0).is_none());
    }
}
