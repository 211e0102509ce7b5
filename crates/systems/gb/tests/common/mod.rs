#![allow(dead_code)]

use emu_gb::{Cartridge, GbBus};

pub const ROM_BANK_SIZE: usize = 0x4000;

/// Cartridge image whose every 16KB bank starts with its own bank number
pub fn rom_image(cart_type: u8, rom_banks: usize, ram_code: u8, cgb_flag: u8) -> Vec<u8> {
    let mut rom = vec![0u8; rom_banks * ROM_BANK_SIZE];
    for bank in 0..rom_banks {
        rom[bank * ROM_BANK_SIZE] = bank as u8;
    }
    rom[0x134..0x13B].copy_from_slice(b"PROBING");
    rom[0x143] = cgb_flag;
    rom[0x147] = cart_type;
    rom[0x148] = (rom_banks.trailing_zeros() - 1) as u8;
    rom[0x149] = ram_code;
    rom
}

/// MBC1 + RAM + battery, 64 ROM banks, 4 RAM banks
pub fn mbc1_bus() -> GbBus {
    let cart = Cartridge::new(rom_image(0x03, 64, 0x03, 0x00), None).unwrap();
    GbBus::new(cart)
}

pub fn dmg_bus_with_boot_rom(boot: Vec<u8>) -> GbBus {
    let cart = Cartridge::new(rom_image(0x01, 4, 0x00, 0x00), Some(boot)).unwrap();
    GbBus::new(cart)
}

pub fn cgb_bus() -> GbBus {
    let cart = Cartridge::new(rom_image(0x03, 8, 0x03, 0x80), None).unwrap();
    GbBus::new(cart)
}
