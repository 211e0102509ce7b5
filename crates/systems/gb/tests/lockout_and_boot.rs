//! PPU lockout and the boot ROM latch

mod common;

use emu_core::memory::Addressable;
use emu_gb::VideoMode;

#[test]
fn oam_locked_in_modes_two_and_three() {
    let mut bus = common::mbc1_bus();
    bus.write(0xFE00, 0x3C);

    bus.set_video_mode(VideoMode::Mode2);
    assert_eq!(bus.read(0xFE00), 0xFF);
    bus.write(0xFE00, 0x00);
    bus.set_video_mode(VideoMode::Mode3);
    assert_eq!(bus.read(0xFE00), 0xFF);

    bus.set_video_mode(VideoMode::Mode0);
    assert_eq!(bus.read(0xFE00), 0x3C);
    bus.set_video_mode(VideoMode::Mode1);
    assert_eq!(bus.read(0xFE00), 0x3C);
}

#[test]
fn vram_locked_in_mode_three() {
    let mut bus = common::mbc1_bus();
    bus.write(0x8000, 0x12);
    bus.set_video_mode(VideoMode::Mode2);
    assert_eq!(bus.read(0x8000), 0x12);
    bus.set_video_mode(VideoMode::Mode3);
    assert_eq!(bus.read(0x8000), 0xFF);
}

#[test]
fn boot_register_is_a_one_way_latch() {
    let mut bus = common::dmg_bus_with_boot_rom(vec![0xAB; 0x100]);
    assert!(bus.booting());
    assert_eq!(bus.read(0x0000), 0xAB);
    // Header area always comes from the cartridge
    assert_eq!(bus.read(0x0100), 0x00);

    bus.write(0xFF50, 0x00);
    assert!(bus.booting());

    bus.write(0xFF50, 0x01);
    assert!(!bus.booting());
    assert_eq!(bus.read(0x0000), 0x00);

    // Nothing maps the boot ROM back in
    bus.write(0xFF50, 0x00);
    assert!(!bus.booting());
    assert_eq!(bus.read(0x0000), 0x00);
}
