//! Cartridge image, header parsing, external RAM and battery saves.

use crate::mappers::Mapper;
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::Addressable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;

const HEADER_END: usize = 0x150;
const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;

#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("header should be at least 336 bytes, was {header_len} bytes")]
    HeaderTooShort { header_len: usize },
    #[error("error reading data from {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Value of the CGB flag at `0x0143`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CgbSupport {
    #[default]
    DmgOnly,
    /// `0x80`: runs on both, with CGB enhancements
    Enhanced,
    /// `0xC0`: refuses to run on a DMG
    CgbOnly,
}

impl CgbSupport {
    pub fn from_flag(flag: u8) -> Self {
        match flag {
            0x80 => CgbSupport::Enhanced,
            0xC0 => CgbSupport::CgbOnly,
            _ => CgbSupport::DmgOnly,
        }
    }

    pub fn is_cgb_capable(self) -> bool {
        self != CgbSupport::DmgOnly
    }
}

/// The fields of the `0x0100-0x014F` header the memory system depends on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartridgeHeader {
    pub title: String,
    pub cgb: CgbSupport,
    pub cartridge_type: u8,
    pub rom_bank_count: usize,
    pub ram_bank_count: usize,
}

impl CartridgeHeader {
    pub fn parse(rom: &[u8]) -> Result<Self, CartridgeError> {
        if rom.len() < HEADER_END {
            return Err(CartridgeError::HeaderTooShort {
                header_len: rom.len(),
            });
        }

        let title = rom[0x134..0x144]
            .iter()
            .take_while(|&&b| b != 0)
            .filter(|b| b.is_ascii_graphic() || **b == b' ')
            .map(|&b| char::from(b))
            .collect::<String>()
            .trim_end()
            .to_string();

        let rom_bank_count = match rom[0x148] {
            code @ 0x00..=0x08 => 2usize << code,
            0x52 => 72,
            0x53 => 80,
            0x54 => 96,
            code => {
                let fallback = rom.len().div_ceil(ROM_BANK_SIZE);
                log(LogCategory::Cartridge, LogLevel::Warn, || {
                    format!(
                        "Cartridge: unknown ROM size code {:02X}, using {} banks from image size",
                        code, fallback
                    )
                });
                fallback
            }
        };

        let ram_bank_count = match rom[0x149] {
            0x00 => 0,
            0x01 | 0x02 => 1,
            0x03 => 4,
            0x04 => 16,
            0x05 => 8,
            code => {
                log(LogCategory::Cartridge, LogLevel::Warn, || {
                    format!("Cartridge: unknown RAM size code {:02X}, assuming no RAM", code)
                });
                0
            }
        };

        Ok(Self {
            title,
            cgb: CgbSupport::from_flag(rom[0x143]),
            cartridge_type: rom[0x147],
            rom_bank_count,
            ram_bank_count,
        })
    }

    pub fn has_battery(&self) -> bool {
        matches!(
            self.cartridge_type,
            0x03 | 0x06 | 0x09 | 0x0D | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E | 0x22 | 0xFF
        )
    }
}

/// Boot ROM overlay mapped over the start of the cartridge while booting
#[derive(Debug, Clone, Default)]
pub struct BootRom {
    data: Vec<u8>,
}

impl BootRom {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Addressable for BootRom {
    fn name(&self) -> &str {
        "Boot ROM"
    }

    fn read(&self, addr: u16) -> u8 {
        self.data.get(usize::from(addr)).copied().unwrap_or(0xFF)
    }

    fn write(&mut self, _addr: u16, _val: u8) {}
}

/// One 8KB external RAM bank with its own enable flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RamBank {
    name: String,
    enabled: bool,
    data: Vec<u8>,
    #[serde(skip)]
    dirty: bool,
}

impl RamBank {
    fn new(index: usize, enabled: bool) -> Self {
        Self {
            name: format!("Cartridge RAM Bank #{}", index),
            enabled,
            data: vec![0; RAM_BANK_SIZE],
            dirty: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Addressable for RamBank {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, addr: u16) -> u8 {
        if !self.enabled {
            return 0xFF;
        }
        self.data
            .get(usize::from(addr) & (RAM_BANK_SIZE - 1))
            .copied()
            .unwrap_or(0xFF)
    }

    fn write(&mut self, addr: u16, val: u8) {
        if !self.enabled {
            return;
        }
        if let Some(byte) = self.data.get_mut(usize::from(addr) & (RAM_BANK_SIZE - 1)) {
            *byte = val;
            self.dirty = true;
        }
    }
}

/// The cartridge's external RAM banks and the bank selection latch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalRam {
    banks: Vec<RamBank>,
    selected: usize,
}

impl ExternalRam {
    pub fn new(bank_count: usize, enabled: bool) -> Self {
        Self {
            banks: (0..bank_count).map(|i| RamBank::new(i, enabled)).collect(),
            selected: 0,
        }
    }

    pub fn bank_count(&self) -> usize {
        self.banks.len()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Latch a bank index. Indices past the last bank are kept as written
    /// and simply resolve to nothing.
    pub fn select(&mut self, index: usize) {
        self.selected = index;
    }

    /// Enable or disable the currently selected bank
    pub fn set_enabled(&mut self, enabled: bool) {
        if let Some(bank) = self.banks.get_mut(self.selected) {
            bank.enabled = enabled;
        }
    }

    pub fn bank(&self, index: usize) -> Option<&RamBank> {
        self.banks.get(index)
    }

    pub fn bank_mut(&mut self, index: usize) -> Option<&mut RamBank> {
        self.banks.get_mut(index)
    }

    /// The selected bank, if it exists
    pub fn current(&self) -> Option<usize> {
        (self.selected < self.banks.len()).then_some(self.selected)
    }

    fn is_dirty(&self) -> bool {
        self.banks.iter().any(|b| b.dirty)
    }

    fn mark_clean(&mut self) {
        for bank in &mut self.banks {
            bank.dirty = false;
        }
    }

    /// Fill banks in order from a save image; a short image leaves the tail untouched
    fn load_image(&mut self, image: &[u8]) {
        for (bank, chunk) in self.banks.iter_mut().zip(image.chunks(RAM_BANK_SIZE)) {
            bank.data[..chunk.len()].copy_from_slice(chunk);
        }
    }

    fn to_image(&self) -> Vec<u8> {
        self.banks
            .iter()
            .flat_map(|b| b.data.iter().copied())
            .collect()
    }

    /// Reset enable flags and selection while keeping contents
    fn power_cycle(&mut self, enabled: bool) {
        self.selected = 0;
        for bank in &mut self.banks {
            bank.enabled = enabled;
        }
    }
}

/// Serializable cartridge state for save states. ROM data is never included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartridgeState {
    pub controller: Mapper,
    pub ram: ExternalRam,
}

/// An inserted cartridge: immutable ROM, optional boot ROM, controller and RAM
#[derive(Debug, Clone)]
pub struct Cartridge {
    rom: Vec<u8>,
    header: CartridgeHeader,
    boot_rom: Option<BootRom>,
    controller: Mapper,
    ram: ExternalRam,
    save_file: Option<PathBuf>,
}

impl Default for Cartridge {
    /// An empty slot: every read returns `0xFF`
    fn default() -> Self {
        Self {
            rom: Vec::new(),
            header: CartridgeHeader::default(),
            boot_rom: None,
            controller: Mapper::from_cart(0x00, 0),
            ram: ExternalRam::default(),
            save_file: None,
        }
    }
}

impl Cartridge {
    /// Parse the header and build the matching controller
    ///
    /// # Errors
    ///
    /// Returns [`CartridgeError::HeaderTooShort`] if `rom` cannot hold a header.
    pub fn new(rom: Vec<u8>, boot_rom: Option<Vec<u8>>) -> Result<Self, CartridgeError> {
        let header = CartridgeHeader::parse(&rom)?;
        let controller = Mapper::from_cart(header.cartridge_type, header.rom_bank_count);
        let ram = ExternalRam::new(header.ram_bank_count, controller.ram_enabled_at_power_on());

        log(LogCategory::Cartridge, LogLevel::Info, || {
            format!(
                "Cartridge: loaded \"{}\" ({}, {} ROM banks, {} RAM banks, {:?})",
                header.title,
                controller.name(),
                header.rom_bank_count,
                header.ram_bank_count,
                header.cgb
            )
        });

        Ok(Self {
            rom,
            header,
            boot_rom: boot_rom.filter(|b| !b.is_empty()).map(BootRom::new),
            controller,
            ram,
            save_file: None,
        })
    }

    /// Attach a battery save file and load it if it exists
    ///
    /// # Errors
    ///
    /// Returns [`CartridgeError::FileRead`] if the file exists but can't be read.
    pub fn with_save_file(mut self, path: impl Into<PathBuf>) -> Result<Self, CartridgeError> {
        let path = path.into();
        if path.is_file() {
            let image = fs::read(&path).map_err(|source| CartridgeError::FileRead {
                path: path.clone(),
                source,
            })?;
            self.ram.load_image(&image);
            log(LogCategory::Cartridge, LogLevel::Info, || {
                format!("Cartridge: loaded external RAM from {}", path.display())
            });
        }
        self.save_file = Some(path);
        Ok(self)
    }

    /// Write external RAM to the save file if it has a battery and changed
    pub fn persist_save(&mut self) -> io::Result<()> {
        let Some(path) = &self.save_file else {
            return Ok(());
        };
        if !self.header.has_battery() || self.ram.bank_count() == 0 || !self.ram.is_dirty() {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_file = path.with_extension("sav.tmp");
        fs::write(&tmp_file, self.ram.to_image())?;
        fs::rename(&tmp_file, path)?;
        self.ram.mark_clean();

        log(LogCategory::Cartridge, LogLevel::Info, || {
            format!("Cartridge: persisted external RAM to {}", path.display())
        });
        Ok(())
    }

    /// Same cartridge after a power cycle: fresh controller, RAM contents kept
    pub fn hard_reset(&self) -> Self {
        let controller = Mapper::from_cart(self.header.cartridge_type, self.header.rom_bank_count);
        let mut ram = self.ram.clone();
        ram.power_cycle(controller.ram_enabled_at_power_on());
        Self {
            rom: self.rom.clone(),
            header: self.header.clone(),
            boot_rom: self.boot_rom.clone(),
            controller,
            ram,
            save_file: self.save_file.clone(),
        }
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn controller(&self) -> &Mapper {
        &self.controller
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    pub fn boot_rom(&self) -> Option<&BootRom> {
        self.boot_rom.as_ref()
    }

    pub fn boot_rom_mut(&mut self) -> Option<&mut BootRom> {
        self.boot_rom.as_mut()
    }

    /// Swap the boot ROM; only a fresh bus picks the change up
    pub fn set_boot_rom(&mut self, boot_rom: Option<Vec<u8>>) {
        self.boot_rom = boot_rom.filter(|b| !b.is_empty()).map(BootRom::new);
    }

    pub fn has_boot_rom(&self) -> bool {
        self.boot_rom.is_some()
    }

    pub fn ram(&self) -> &ExternalRam {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut ExternalRam {
        &mut self.ram
    }

    pub fn save_file(&self) -> Option<&Path> {
        self.save_file.as_deref()
    }

    pub fn state(&self) -> CartridgeState {
        CartridgeState {
            controller: self.controller.clone(),
            ram: self.ram.clone(),
        }
    }

    pub fn restore_state(&mut self, state: CartridgeState) {
        self.controller = state.controller;
        self.ram = state.ram;
    }
}

impl Addressable for Cartridge {
    fn name(&self) -> &str {
        self.controller.name()
    }

    fn read(&self, addr: u16) -> u8 {
        self.controller.read(&self.rom, addr)
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.controller.write(addr, val, &mut self.ram);
    }
}

/// Save file for a ROM: `<save_dir>/<file name up to the first '.'>.sav`
pub fn save_path_for(rom_path: &Path, save_dir: &Path) -> PathBuf {
    let stem = rom_path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .filter(|n| !n.is_empty())
        .unwrap_or("cartridge");
    save_dir.join(format!("{}.sav", stem))
}

pub fn boot_rom_file_name(cgb: bool) -> &'static str {
    if cgb {
        "CGB_ROM.bin"
    } else {
        "DMG_ROM.bin"
    }
}

/// Look up the boot ROM matching the hardware in `dir`. A missing file is
/// not an error: the machine then starts directly in the cartridge.
pub fn find_boot_rom(dir: &Path, cgb: bool) -> Option<Vec<u8>> {
    let path = dir.join(boot_rom_file_name(cgb));
    match fs::read(&path) {
        Ok(data) => Some(data),
        Err(err) => {
            log(LogCategory::Cartridge, LogLevel::Info, || {
                format!("Cartridge: no boot ROM at {} ({})", path.display(), err)
            });
            None
        }
    }
}

#[cfg(test)]
pub(crate) fn test_rom(cart_type: u8, rom_banks: usize, ram_code: u8, cgb_flag: u8) -> Vec<u8> {
    let mut rom = vec![0; rom_banks.max(2) * ROM_BANK_SIZE];
    for bank in 0..rom_banks.max(2) {
        rom[bank * ROM_BANK_SIZE] = bank as u8;
    }
    rom[0x134..0x138].copy_from_slice(b"TEST");
    rom[0x143] = cgb_flag;
    rom[0x147] = cart_type;
    rom[0x148] = rom_banks.max(2).trailing_zeros() as u8 - 1;
    rom[0x149] = ram_code;
    rom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_parse() {
        let rom = test_rom(0x03, 8, 0x03, 0x80);
        let header = CartridgeHeader::parse(&rom).unwrap();

        assert_eq!(header.title, "TEST");
        assert_eq!(header.cgb, CgbSupport::Enhanced);
        assert_eq!(header.cartridge_type, 0x03);
        assert_eq!(header.rom_bank_count, 8);
        assert_eq!(header.ram_bank_count, 4);
        assert!(header.has_battery());
    }

    #[test]
    fn test_header_too_short() {
        let err = CartridgeHeader::parse(&[0; 0x100]).unwrap_err();
        assert!(matches!(
            err,
            CartridgeError::HeaderTooShort { header_len: 0x100 }
        ));
    }

    #[test]
    fn test_ram_size_codes() {
        for (code, banks) in [(0x00, 0), (0x01, 1), (0x02, 1), (0x03, 4), (0x04, 16), (0x05, 8)] {
            let rom = test_rom(0x02, 2, code, 0x00);
            assert_eq!(CartridgeHeader::parse(&rom).unwrap().ram_bank_count, banks);
        }
    }

    #[test]
    fn test_cgb_flag() {
        assert!(!CgbSupport::from_flag(0x00).is_cgb_capable());
        assert!(CgbSupport::from_flag(0x80).is_cgb_capable());
        assert_eq!(CgbSupport::from_flag(0xC0), CgbSupport::CgbOnly);
    }

    #[test]
    fn test_mbc1_cartridge_starts_with_ram_disabled() {
        let cart = Cartridge::new(test_rom(0x03, 4, 0x03, 0x00), None).unwrap();
        assert_eq!(cart.controller().name(), "MBC1");
        assert_eq!(cart.ram().bank_count(), 4);
        assert!(cart.ram().bank(0).is_some_and(|b| !b.enabled()));
    }

    #[test]
    fn test_rom_only_ram_is_always_enabled() {
        let cart = Cartridge::new(test_rom(0x09, 2, 0x02, 0x00), None).unwrap();
        assert!(cart.ram().bank(0).is_some_and(|b| b.enabled()));
    }

    #[test]
    fn test_ram_bank_gate() {
        let mut cart = Cartridge::new(test_rom(0x03, 2, 0x02, 0x00), None).unwrap();
        let bank = cart.ram_mut().bank_mut(0).unwrap();
        bank.write(0xA000, 0x42);
        assert_eq!(bank.read(0xA000), 0xFF);

        // Enable through the controller, then retry
        cart.write(0x0000, 0x0A);
        let bank = cart.ram_mut().bank_mut(0).unwrap();
        bank.write(0xA000, 0x42);
        assert_eq!(bank.read(0xA000), 0x42);
        assert_eq!(bank.read(0xA000 + 0x2000), 0x42);
    }

    #[test]
    fn test_empty_boot_rom_is_ignored() {
        let cart = Cartridge::new(test_rom(0x00, 2, 0x00, 0x00), Some(Vec::new())).unwrap();
        assert!(!cart.has_boot_rom());
    }

    #[test]
    fn test_boot_rom_reads() {
        let boot = BootRom::new(vec![0x31, 0xFE, 0xFF]);
        assert_eq!(boot.read(0x0001), 0xFE);
        assert_eq!(boot.read(0x0010), 0xFF);
    }

    #[test]
    fn test_hard_reset_keeps_ram_contents() {
        let mut cart = Cartridge::new(test_rom(0x03, 4, 0x02, 0x00), None).unwrap();
        cart.write(0x0000, 0x0A);
        cart.write(0x2000, 0x03);
        cart.ram_mut().bank_mut(0).unwrap().write(0xA010, 0x77);

        let fresh = cart.hard_reset();
        assert_eq!(fresh.read(0x4000), 1);
        let bank = fresh.ram().bank(0).unwrap();
        assert!(!bank.enabled());
        assert_eq!(bank.as_slice()[0x10], 0x77);
    }

    #[test]
    fn test_save_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saves").join("game.sav");

        let mut cart = Cartridge::new(test_rom(0x03, 2, 0x03, 0x00), None)
            .unwrap()
            .with_save_file(&path)
            .unwrap();
        cart.write(0x6000, 0x01);
        cart.write(0x4000, 0x02);
        cart.write(0x0000, 0x0A);
        cart.ram_mut().bank_mut(2).unwrap().write(0xA000, 0x5A);
        cart.persist_save().unwrap();

        let image = fs::read(&path).unwrap();
        assert_eq!(image.len(), 4 * RAM_BANK_SIZE);
        assert_eq!(image[2 * RAM_BANK_SIZE], 0x5A);
        assert!(!path.with_extension("sav.tmp").exists());

        let reloaded = Cartridge::new(test_rom(0x03, 2, 0x03, 0x00), None)
            .unwrap()
            .with_save_file(&path)
            .unwrap();
        assert_eq!(reloaded.ram().bank(2).unwrap().as_slice()[0], 0x5A);
    }

    #[test]
    fn test_no_battery_no_save_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.sav");

        let mut cart = Cartridge::new(test_rom(0x02, 2, 0x02, 0x00), None)
            .unwrap()
            .with_save_file(&path)
            .unwrap();
        cart.write(0x0000, 0x0A);
        cart.ram_mut().bank_mut(0).unwrap().write(0xA000, 0x01);
        cart.persist_save().unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn test_save_path_for() {
        let path = save_path_for(Path::new("/roms/Tetris.v1.1.gb"), Path::new("./saves"));
        assert_eq!(path, Path::new("./saves/Tetris.sav"));
    }

    #[test]
    fn test_boot_rom_file_names() {
        assert_eq!(boot_rom_file_name(true), "CGB_ROM.bin");
        assert_eq!(boot_rom_file_name(false), "DMG_ROM.bin");
    }

    #[test]
    fn test_find_boot_rom() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_boot_rom(dir.path(), false).is_none());

        fs::write(dir.path().join("DMG_ROM.bin"), [0x31u8; 0x100]).unwrap();
        assert_eq!(find_boot_rom(dir.path(), false).map(|b| b.len()), Some(0x100));
        assert!(find_boot_rom(dir.path(), true).is_none());
    }
}
