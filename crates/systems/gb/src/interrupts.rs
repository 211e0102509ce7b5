//! Interrupt request flags (IF, `$FF0F`).

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::Addressable;
use serde::{Deserialize, Serialize};

/// Interrupt sources, valued by their IF/IE bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Interrupt {
    VBlank = 0x01,
    LcdStat = 0x02,
    Timer = 0x04,
    Serial = 0x08,
    Joypad = 0x10,
}

impl Interrupt {
    pub fn bit(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterruptFlags {
    flags: u8,
}

impl InterruptFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, interrupt: Interrupt) {
        self.flags |= interrupt.bit();
        log(LogCategory::Interrupts, LogLevel::Trace, || {
            format!("Interrupts: requested {:?}", interrupt)
        });
    }

    pub fn acknowledge(&mut self, interrupt: Interrupt) {
        self.flags &= !interrupt.bit();
    }

    /// Raised when a joypad line goes from released to pressed
    pub fn fire_pin_pressed(&mut self) {
        self.request(Interrupt::Joypad);
    }

    /// Requested bits, without the unused upper bits
    pub fn requested(&self) -> u8 {
        self.flags & 0x1F
    }
}

impl Addressable for InterruptFlags {
    fn name(&self) -> &str {
        "Interrupt Flag Register"
    }

    fn read(&self, _addr: u16) -> u8 {
        self.flags | 0xE0
    }

    fn write(&mut self, _addr: u16, val: u8) {
        self.flags = val & 0x1F;
    }
}
