//! Passive storage regions: RAM blocks, plain registers and filler areas.

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::Addressable;
use serde::{Deserialize, Serialize};

/// A block of RAM whose offset is taken from the low bits of the address.
///
/// The mask doubles as the mirroring rule: internal RAM uses `0x1FFF` so the
/// echo area at `0xE000-0xFDFF` lands on the same bytes as `0xC000-0xDDFF`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ram {
    name: String,
    mask: u16,
    data: Vec<u8>,
}

impl Ram {
    pub fn new(name: impl Into<String>, size: usize, mask: u16) -> Self {
        Self {
            name: name.into(),
            mask,
            data: vec![0; size],
        }
    }

    fn offset(&self, addr: u16) -> usize {
        usize::from(addr & self.mask)
    }

    /// Direct access by storage offset, used by DMA engines
    pub fn peek(&self, offset: usize) -> u8 {
        self.data.get(offset).copied().unwrap_or(0xFF)
    }

    pub fn poke(&mut self, offset: usize, val: u8) {
        if let Some(byte) = self.data.get_mut(offset) {
            *byte = val;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Addressable for Ram {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, addr: u16) -> u8 {
        self.peek(self.offset(addr))
    }

    fn write(&mut self, addr: u16, val: u8) {
        let offset = self.offset(addr);
        self.poke(offset, val);
    }
}

/// A one-byte register described by its read/write masks.
///
/// Reads return `value | or_on_read` unless the register has a fixed read
/// value. Writes only touch the bits in `write_mask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Register {
    name: String,
    value: u8,
    write_mask: u8,
    or_on_read: u8,
    fixed_read: Option<u8>,
}

impl Register {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: 0,
            write_mask: 0xFF,
            or_on_read: 0,
            fixed_read: None,
        }
    }

    pub fn with_or_on_read(mut self, mask: u8) -> Self {
        self.or_on_read = mask;
        self
    }

    pub fn with_write_mask(mut self, mask: u8) -> Self {
        self.write_mask = mask;
        self
    }

    pub fn with_fixed_read(mut self, value: u8) -> Self {
        self.fixed_read = Some(value);
        self
    }

    /// Stored value without the read mask applied
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Hardware-side update that bypasses the write mask
    pub fn set_value(&mut self, value: u8) {
        self.value = value;
    }
}

impl Addressable for Register {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, _addr: u16) -> u8 {
        self.fixed_read.unwrap_or(self.value | self.or_on_read)
    }

    fn write(&mut self, _addr: u16, val: u8) {
        self.value = (self.value & !self.write_mask) | (val & self.write_mask);
    }
}

/// Returned for any access the hardware currently blocks (PPU lockout,
/// missing RAM bank). Reads `0xFF`, writes are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unaccessible;

impl Addressable for Unaccessible {
    fn name(&self) -> &str {
        "Unaccessible"
    }

    fn read(&self, _addr: u16) -> u8 {
        0xFF
    }

    fn write(&mut self, _addr: u16, _val: u8) {}
}

/// The unused I/O block between the CGB registers and high RAM
#[derive(Debug, Default, Clone, Copy)]
pub struct Empty1;

impl Addressable for Empty1 {
    fn name(&self) -> &str {
        "Empty"
    }

    fn read(&self, _addr: u16) -> u8 {
        0xFF
    }

    fn write(&mut self, _addr: u16, _val: u8) {}
}

/// Storage offset for an address in `0xFEA0-0xFEFF`.
///
/// The first 32 bytes are backed directly; the rest fold back onto
/// `0x20..0x2F` the same way CGB hardware revisions do.
pub fn empty0_offset(address: u16) -> usize {
    let offset = address.wrapping_sub(0xFEA0);
    let folded = if offset > 0x1F {
        ((offset - 0x20) % 0x0F) + 0x20
    } else {
        offset
    };
    usize::from(folded)
}

/// The prohibited area after OAM.
///
/// DMG hardware reads `0x00` and ignores writes; CGB hardware backs it with
/// a small folded RAM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Empty0 {
    cgb_hardware: bool,
    data: Vec<u8>,
}

impl Empty0 {
    pub fn new(cgb_hardware: bool) -> Self {
        Self {
            cgb_hardware,
            data: vec![0; 0x30],
        }
    }
}

impl Addressable for Empty0 {
    fn name(&self) -> &str {
        "Empty0"
    }

    fn read(&self, addr: u16) -> u8 {
        if !self.cgb_hardware {
            return 0x00;
        }
        self.data.get(empty0_offset(addr)).copied().unwrap_or(0x00)
    }

    fn write(&mut self, addr: u16, val: u8) {
        if !self.cgb_hardware {
            return;
        }
        if let Some(byte) = self.data.get_mut(empty0_offset(addr)) {
            *byte = val;
        }
    }
}

/// `0xFF50`: writing bit 0 unmaps the boot ROM for good
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootRegister {
    booting: bool,
}

impl BootRegister {
    pub fn new(booting: bool) -> Self {
        Self { booting }
    }

    pub fn booting(&self) -> bool {
        self.booting
    }
}

impl Addressable for BootRegister {
    fn name(&self) -> &str {
        "Boot register"
    }

    fn read(&self, _addr: u16) -> u8 {
        0xFF
    }

    fn write(&mut self, addr: u16, val: u8) {
        if val & 0x01 != 0 && self.booting {
            self.booting = false;
            log(LogCategory::Bus, LogLevel::Debug, || {
                format!("Bus: boot ROM unmapped by write {:02X} to {:04X}", val, addr)
            });
        }
    }
}
