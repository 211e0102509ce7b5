//! ROM and RAM banking through the MBC1 controller

mod common;

use emu_core::memory::Addressable;
use emu_gb::mappers::{BankingMode, Mapper};

#[test]
fn bank_zero_write_selects_bank_one() {
    let mut bus = common::mbc1_bus();
    bus.write(0x2000, 0x00);
    assert_eq!(bus.read(0x4000), 1);
}

#[test]
fn upper_bits_select_bank_33() {
    let mut bus = common::mbc1_bus();
    bus.write(0x2000, 0x20);
    bus.write(0x4000, 0b01);
    assert_eq!(bus.read(0x4000), 33);
}

#[test]
fn ram_banking_mode_selects_ram_bank_two() {
    let mut bus = common::mbc1_bus();
    bus.write(0x2000, 0x05);
    bus.write(0x6000, 0x01);
    assert!(matches!(
        bus.cartridge().controller(),
        Mapper::Mbc1(mbc) if mbc.mode() == BankingMode::Rom4MRam32K
    ));

    bus.write(0x4000, 0b10);
    assert_eq!(bus.cartridge().ram().selected(), 2);
    // The ROM bank is untouched
    assert_eq!(bus.read(0x4000), 5);

    // Bank 2 is still disabled
    assert_eq!(bus.read(0xA000), 0xFF);
    bus.write(0x0000, 0x0A);
    bus.write(0xA000, 0x77);
    assert_eq!(bus.read(0xA000), 0x77);

    bus.write(0x4000, 0b00);
    bus.write(0x0000, 0x0A);
    assert_ne!(bus.read(0xA000), 0x77);
    bus.write(0x4000, 0b10);
    assert_eq!(bus.read(0xA000), 0x77);
}

#[test]
fn disabled_ram_discards_writes() {
    let mut bus = common::mbc1_bus();
    bus.write(0xA000, 0x55);
    assert_eq!(bus.read(0xA000), 0xFF);

    bus.write(0x0000, 0x0A);
    assert_eq!(bus.read(0xA000), 0x00);
    bus.write(0xA000, 0x55);
    assert_eq!(bus.read(0xA000), 0x55);

    bus.write(0x0000, 0x00);
    bus.write(0xA000, 0x66);
    bus.write(0x0000, 0x0A);
    assert_eq!(bus.read(0xA000), 0x55);
}

#[test]
fn banks_past_the_rom_read_ff() {
    let cart = emu_gb::Cartridge::new(common::rom_image(0x01, 4, 0x00, 0x00), None).unwrap();
    let mut bus = emu_gb::GbBus::new(cart);
    bus.write(0x2000, 0x07);
    assert_eq!(bus.read(0x4000), 0xFF);
    bus.write(0x2000, 0x03);
    assert_eq!(bus.read(0x4000), 3);
}
