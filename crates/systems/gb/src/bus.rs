//! Game Boy memory bus implementation
//!
//! Every access goes through two steps. [`GbBus::resolve`] maps an address
//! plus a [`MachineMode`] snapshot to exactly one [`Region`], and the bus then
//! forwards the read or write to the component behind that region. Writes
//! to the cartridge window change banking state, which changes what later
//! reads resolve to.
//!
//! # Memory Map
//!
//! ```text
//! $0000-$7FFF  Boot ROM overlay while booting (never over $0100-$01FF),
//!              otherwise cartridge ROM through the bank controller
//! $8000-$9FFF  Video RAM (bank 0/1 in CGB mode), locked in Mode 3
//! $A000-$BFFF  Selected external RAM bank
//! $C000-$CFFF  Work RAM bank 0 (CGB) / internal RAM (DMG)
//! $D000-$DFFF  Work RAM bank 1-7 (CGB, SVBK 0 means 1) / internal RAM (DMG)
//! $E000-$FDFF  Echo of $C000-$DDFF
//! $FE00-$FE9F  OAM, locked in Modes 2 and 3
//! $FEA0-$FEFF  Prohibited area (folded RAM on CGB, 0x00 on DMG)
//! $FF00-$FF4B  I/O port table
//! $FF4C-$FF7F  CGB registers, boot register, undocumented registers
//! $FF80-$FFFE  High RAM
//! $FFFF        Interrupt Enable Register
//! ```
//!
//! In CGB mode a small override table (KEY1, VBK, HDMA, RP, palettes, SVBK
//! and the banked VRAM window) is consulted before the common map.

use crate::cartridge::Cartridge;
use crate::cgb::CgbRegisters;
use crate::dma::VramTransfer;
use crate::interrupts::Interrupt;
use crate::joypad::Button;
use crate::lcd::{LcdRegisters, LCDC};
use crate::memory::{BootRegister, Empty0, Empty1, Ram, Register, Unaccessible};
use crate::mode::{MachineMode, VideoMode};
use crate::ports::{port_for, IoPorts};
use crate::region::{CgbPort, Region};
use crate::sound::SoundRegisters;
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::{Addressable, SystemBus};
use serde::{Deserialize, Serialize};

const WRAM_BANKS: usize = 8;
const VRAM_BANKS: usize = 2;

/// Undocumented CGB registers, in [`Region::Undocumented`] index order
const UNDOCUMENTED_ADDRESSES: [u16; 7] = [0xFF6C, 0xFF72, 0xFF73, 0xFF74, 0xFF75, 0xFF76, 0xFF77];

fn undocumented_registers() -> Vec<Register> {
    UNDOCUMENTED_ADDRESSES
        .iter()
        .map(|&addr| {
            let reg = Register::new(format!("Undocumented {:04X}", addr));
            match addr {
                0xFF6C => reg.with_or_on_read(0xFE),
                0xFF75 => reg.with_or_on_read(0x8F),
                0xFF76 | 0xFF77 => reg.with_fixed_read(0x00),
                _ => reg,
            }
        })
        .collect()
}

/// A contiguous run of addresses resolving to the same region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub start: u16,
    pub end: u16,
    pub region: Region,
    pub name: String,
}

/// Game Boy memory bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbBus {
    mode: MachineMode,
    boot: BootRegister,
    /// Re-attached after loading a save state
    #[serde(skip)]
    cartridge: Cartridge,
    internal_ram: Ram,
    wram: Vec<Ram>,
    vram: Vec<Ram>,
    oam: Ram,
    empty0: Empty0,
    high_ram: Ram,
    interrupt_enable: Register,
    io: IoPorts,
    cgb: CgbRegisters,
    undocumented: Vec<Register>,
    #[serde(skip)]
    unaccessible: Unaccessible,
    #[serde(skip)]
    empty1: Empty1,
}

impl GbBus {
    pub fn new(cartridge: Cartridge) -> Self {
        let is_cgb = cartridge.header().cgb.is_cgb_capable();
        let mode = if is_cgb {
            MachineMode::cgb()
        } else {
            MachineMode::dmg()
        };
        let booting = cartridge.has_boot_rom();

        let mut bus = Self {
            mode,
            boot: BootRegister::new(booting),
            cartridge,
            internal_ram: Ram::new("Internal RAM", 0x2000, 0x1FFF),
            wram: (0..WRAM_BANKS)
                .map(|i| Ram::new(format!("WRAM Bank #{}", i), 0x1000, 0x0FFF))
                .collect(),
            vram: (0..VRAM_BANKS)
                .map(|i| Ram::new(format!("Video RAM #{}", i), 0x2000, 0x1FFF))
                .collect(),
            oam: Ram::new("Sprite Attribute Table", 0xA0, 0x00FF),
            empty0: Empty0::new(is_cgb),
            high_ram: Ram::new("High RAM", 0x7F, 0x007F),
            interrupt_enable: Register::new("Interrupt Enable Register"),
            io: IoPorts::new(is_cgb),
            cgb: CgbRegisters::new(),
            undocumented: undocumented_registers(),
            unaccessible: Unaccessible,
            empty1: Empty1,
        };

        if !booting {
            // What the boot ROM leaves behind
            bus.io.lcd.write(LCDC, 0x91);
            bus.io.lcd.write(0xFF47, 0xFC);
        }
        bus
    }

    /// Map an address to the region that serves it under `mode`.
    ///
    /// Pure apart from reading bank-select latches already held by the bus.
    pub fn resolve(&self, address: u16, mode: MachineMode) -> Region {
        if mode.in_cgb_mode {
            if let Some(region) = self.resolve_cgb(address, mode.video_mode) {
                return region;
            }
        }

        match address {
            0x0000..=0x7FFF => {
                if self.boot_rom_covers(address) {
                    Region::BootRom
                } else {
                    Region::Cartridge
                }
            }
            0x8000..=0x9FFF => {
                if mode.video_mode.locks_vram() {
                    Region::Unaccessible
                } else {
                    Region::Vram(0)
                }
            }
            0xA000..=0xBFFF => {
                if self.cartridge.controller().accepts(address) {
                    Region::Cartridge
                } else if let Some(bank) = self.cartridge.ram().current() {
                    Region::ExternalRam(bank)
                } else {
                    Region::Unaccessible
                }
            }
            0xC000..=0xCFFF | 0xE000..=0xEFFF => {
                if mode.in_cgb_mode {
                    Region::Wram(0)
                } else {
                    Region::InternalRam
                }
            }
            0xD000..=0xDFFF | 0xF000..=0xFDFF => {
                if mode.in_cgb_mode {
                    Region::Wram(self.cgb.wram_bank())
                } else {
                    Region::InternalRam
                }
            }
            0xFE00..=0xFE9F => {
                if mode.video_mode.locks_oam() {
                    Region::Unaccessible
                } else {
                    Region::Oam
                }
            }
            0xFEA0..=0xFEFF => Region::Empty0,
            0xFF00..=0xFF4B => Region::Port(port_for(address)),
            0xFF4C..=0xFF7F => self.resolve_high_io(address, mode),
            0xFF80..=0xFFFE => Region::HighRam,
            0xFFFF => Region::InterruptEnable,
        }
    }

    fn resolve_cgb(&self, address: u16, video_mode: VideoMode) -> Option<Region> {
        let region = match address {
            0x8000..=0x9FFF if video_mode.locks_vram() => Region::Unaccessible,
            0x8000..=0x9FFF => Region::Vram(self.cgb.vram_bank()),
            0xFF4D => Region::Cgb(CgbPort::Speed),
            0xFF4F => Region::Cgb(CgbPort::VramSelect),
            0xFF51..=0xFF55 => Region::Cgb(CgbPort::Hdma),
            0xFF56 => Region::Cgb(CgbPort::Infrared),
            0xFF68 => Region::Cgb(CgbPort::BgPalette),
            0xFF6A => Region::Cgb(CgbPort::ObjPalette),
            0xFF69 | 0xFF6B if video_mode.locks_vram() => Region::Unaccessible,
            0xFF69 => Region::Cgb(CgbPort::BgPalette),
            0xFF6B => Region::Cgb(CgbPort::ObjPalette),
            0xFF70 => Region::Cgb(CgbPort::WramSelect),
            _ => return None,
        };
        Some(region)
    }

    fn resolve_high_io(&self, address: u16, mode: MachineMode) -> Region {
        if address == 0xFF50 && self.boot.booting() {
            return Region::BootRegister;
        }
        if !mode.is_cgb {
            return Region::Empty1;
        }
        match address {
            0xFF6C | 0xFF74 if !mode.in_cgb_mode => Region::Empty1,
            _ => UNDOCUMENTED_ADDRESSES
                .iter()
                .position(|&a| a == address)
                .map_or(Region::Empty1, Region::Undocumented),
        }
    }

    /// The boot ROM never covers the cartridge header at `$0100-$01FF`
    fn boot_rom_covers(&self, address: u16) -> bool {
        self.boot.booting()
            && !(0x0100..=0x01FF).contains(&address)
            && self
                .cartridge
                .boot_rom()
                .is_some_and(|boot| usize::from(address) < boot.len())
    }

    fn region(&self, region: Region) -> &dyn Addressable {
        match region {
            Region::Unaccessible => &self.unaccessible,
            Region::BootRom => match self.cartridge.boot_rom() {
                Some(boot) => boot,
                None => &self.unaccessible,
            },
            Region::Cartridge => &self.cartridge,
            Region::ExternalRam(bank) => match self.cartridge.ram().bank(bank) {
                Some(bank) => bank,
                None => &self.unaccessible,
            },
            Region::Vram(bank) => match self.vram.get(bank) {
                Some(vram) => vram,
                None => &self.unaccessible,
            },
            Region::InternalRam => &self.internal_ram,
            Region::Wram(bank) => match self.wram.get(bank) {
                Some(wram) => wram,
                None => &self.unaccessible,
            },
            Region::Oam => &self.oam,
            Region::Empty0 => &self.empty0,
            Region::Port(port) => self.io.port(port),
            Region::BootRegister => &self.boot,
            Region::Undocumented(index) => match self.undocumented.get(index) {
                Some(reg) => reg,
                None => &self.empty1,
            },
            Region::Empty1 => &self.empty1,
            Region::HighRam => &self.high_ram,
            Region::InterruptEnable => &self.interrupt_enable,
            Region::Cgb(port) => match port {
                CgbPort::Speed => &self.cgb.speed,
                CgbPort::Infrared => &self.cgb.infrared,
                CgbPort::WramSelect => &self.cgb.wram_select,
                CgbPort::BgPalette => &self.cgb.bg_palette,
                CgbPort::ObjPalette => &self.cgb.obj_palette,
                CgbPort::VramSelect => &self.cgb.vram_select,
                CgbPort::Hdma => &self.cgb.hdma,
            },
        }
    }

    fn region_mut(&mut self, region: Region) -> &mut dyn Addressable {
        match region {
            Region::Unaccessible => &mut self.unaccessible,
            Region::BootRom => match self.cartridge.boot_rom_mut() {
                Some(boot) => boot,
                None => &mut self.unaccessible,
            },
            Region::Cartridge => &mut self.cartridge,
            Region::ExternalRam(bank) => match self.cartridge.ram_mut().bank_mut(bank) {
                Some(bank) => bank,
                None => &mut self.unaccessible,
            },
            Region::Vram(bank) => match self.vram.get_mut(bank) {
                Some(vram) => vram,
                None => &mut self.unaccessible,
            },
            Region::InternalRam => &mut self.internal_ram,
            Region::Wram(bank) => match self.wram.get_mut(bank) {
                Some(wram) => wram,
                None => &mut self.unaccessible,
            },
            Region::Oam => &mut self.oam,
            Region::Empty0 => &mut self.empty0,
            Region::Port(port) => self.io.port_mut(port),
            Region::BootRegister => &mut self.boot,
            Region::Undocumented(index) => match self.undocumented.get_mut(index) {
                Some(reg) => reg,
                None => &mut self.empty1,
            },
            Region::Empty1 => &mut self.empty1,
            Region::HighRam => &mut self.high_ram,
            Region::InterruptEnable => &mut self.interrupt_enable,
            Region::Cgb(port) => match port {
                CgbPort::Speed => &mut self.cgb.speed,
                CgbPort::Infrared => &mut self.cgb.infrared,
                CgbPort::WramSelect => &mut self.cgb.wram_select,
                CgbPort::BgPalette => &mut self.cgb.bg_palette,
                CgbPort::ObjPalette => &mut self.cgb.obj_palette,
                CgbPort::VramSelect => &mut self.cgb.vram_select,
                CgbPort::Hdma => &mut self.cgb.hdma,
            },
        }
    }

    /// Name of the component serving `region`
    pub fn region_name(&self, region: Region) -> &str {
        self.region(region).name()
    }

    /// Coalesced view of the whole address space under `mode`
    pub fn memory_map(&self, mode: MachineMode) -> Vec<MapEntry> {
        let mut entries: Vec<MapEntry> = Vec::new();
        for address in 0..=u16::MAX {
            let region = self.resolve(address, mode);
            match entries.last_mut() {
                Some(last) if last.region == region => last.end = address,
                _ => entries.push(MapEntry {
                    start: address,
                    end: address,
                    region,
                    name: self.region_name(region).to_string(),
                }),
            }
        }
        entries
    }

    /// DMA engines see memory without PPU lockout
    fn dma_read(&self, address: u16) -> u8 {
        let mode = self.mode.with_video_mode(VideoMode::Mode0);
        self.region(self.resolve(address, mode)).read(address)
    }

    fn run_vram_transfer(&mut self, transfer: VramTransfer) {
        let bank = self.cgb.vram_bank();
        log(LogCategory::Dma, LogLevel::Trace, || {
            format!(
                "HDMA: {} bytes {:04X} -> {}:{:04X}",
                transfer.length, transfer.source, bank, transfer.destination
            )
        });
        for i in 0..transfer.length {
            let source = transfer.source.wrapping_add(i);
            let byte = if (0x8000..=0x9FFF).contains(&source) {
                0xFF
            } else {
                self.dma_read(source)
            };
            let offset = usize::from(transfer.destination.wrapping_add(i) & 0x1FFF);
            if let Some(vram) = self.vram.get_mut(bank) {
                vram.poke(offset, byte);
            }
        }
    }

    pub fn mode(&self) -> MachineMode {
        self.mode
    }

    /// Pushed by the PPU on every mode change
    pub fn set_video_mode(&mut self, video_mode: VideoMode) {
        self.mode.video_mode = video_mode;
        self.io.lcd.set_mode_bits(video_mode);
    }

    /// Enable or disable CGB features. Only CGB hardware can enable them.
    pub fn set_cgb_mode(&mut self, enabled: bool) {
        self.mode.in_cgb_mode = enabled && self.mode.is_cgb;
        log(LogCategory::Bus, LogLevel::Info, || {
            format!("Bus: CGB mode {}", if self.mode.in_cgb_mode { "on" } else { "off" })
        });
    }

    pub fn booting(&self) -> bool {
        self.boot.booting()
    }

    pub fn request_interrupt(&mut self, interrupt: Interrupt) {
        self.io.interrupt_flag.request(interrupt);
    }

    pub fn acknowledge_interrupt(&mut self, interrupt: Interrupt) {
        self.io.interrupt_flag.acknowledge(interrupt);
    }

    /// Interrupts both requested and enabled
    pub fn pending_interrupts(&self) -> u8 {
        self.io.interrupt_flag.requested() & self.interrupt_enable.value()
    }

    pub fn press(&mut self, button: Button) {
        if self.io.joypad.press(button) {
            self.io.interrupt_flag.fire_pin_pressed();
        }
    }

    pub fn release(&mut self, button: Button) {
        self.io.joypad.release(button);
    }

    pub fn take_serial_output(&mut self) -> Vec<u8> {
        self.io.serial.take_output()
    }

    pub fn perform_speed_switch(&mut self) -> bool {
        self.mode.in_cgb_mode && self.cgb.speed.perform_speed_switch()
    }

    pub fn speed_factor(&self) -> u32 {
        self.cgb.speed.speed_factor()
    }

    pub fn set_ly(&mut self, ly: u8) {
        self.io.lcd.set_ly(ly);
    }

    pub fn lcd(&self) -> &LcdRegisters {
        &self.io.lcd
    }

    pub fn sound(&self) -> &SoundRegisters {
        &self.io.sound
    }

    pub fn wave_ram(&self) -> &[u8] {
        self.io.wave_ram.as_slice()
    }

    pub fn vram(&self, bank: usize) -> Option<&[u8]> {
        self.vram.get(bank).map(Ram::as_slice)
    }

    pub fn oam(&self) -> &[u8] {
        self.oam.as_slice()
    }

    pub fn bg_palette(&self) -> &[u8] {
        self.cgb.bg_palette.as_slice()
    }

    pub fn obj_palette(&self) -> &[u8] {
        self.cgb.obj_palette.as_slice()
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    pub fn cartridge_mut(&mut self) -> &mut Cartridge {
        &mut self.cartridge
    }

    /// Put the cartridge back after deserializing a save state
    pub fn attach_cartridge(&mut self, cartridge: Cartridge) {
        self.cartridge = cartridge;
    }
}

impl Addressable for GbBus {
    fn name(&self) -> &str {
        "Memory mapper"
    }

    fn read(&self, addr: u16) -> u8 {
        self.region(self.resolve(addr, self.mode)).read(addr)
    }

    fn write(&mut self, addr: u16, val: u8) {
        let region = self.resolve(addr, self.mode);
        if region == Region::Cartridge {
            log(LogCategory::Cartridge, LogLevel::Trace, || {
                format!("Bus: controller write {:02X} to {:04X}", val, addr)
            });
        }
        self.region_mut(region).write(addr, val);
    }
}

impl SystemBus for GbBus {
    fn step(&mut self, cycles: u32) {
        let pending = self.io.dma.step(cycles);
        let source = self.io.dma.source();
        for offset in pending {
            let byte = self.dma_read(source.wrapping_add(offset));
            self.oam.poke(usize::from(offset), byte);
        }

        if let Some(transfer) = self.cgb.hdma.step(self.mode.video_mode) {
            self.run_vram_transfer(transfer);
        }

        if self.io.serial.step(cycles) {
            self.io.interrupt_flag.request(Interrupt::Serial);
        }
    }

    fn step_before_timer(&mut self, cycles: u32) {
        if self.io.timer.step(cycles) {
            self.io.interrupt_flag.request(Interrupt::Timer);
        }
    }
}
