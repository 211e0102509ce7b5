//! MBC0 (No Mapper) - Basic ROM with no banking
//!
//! Plain 32KB ROM mapped straight into `0x0000-0x7FFF`. There are no control
//! registers, so writes are dropped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mbc0;

impl Mbc0 {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, rom: &[u8], addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => rom.get(usize::from(addr)).copied().unwrap_or(0xFF),
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, _addr: u16, _val: u8) {
        // No banking commands for MBC0
    }
}
