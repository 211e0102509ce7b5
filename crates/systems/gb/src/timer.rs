//! Game Boy Timer implementation
//!
//! # Timer Registers
//!
//! - `$FF04 (DIV)`: Divider register - Increments at 16384 Hz, write resets to 0
//! - `$FF05 (TIMA)`: Timer counter - Increments at rate specified by TAC
//! - `$FF06 (TMA)`: Timer modulo - TIMA is loaded with this value on overflow
//! - `$FF07 (TAC)`: Timer control
//!   - Bit 2: Timer enable (0=stop, 1=run)
//!   - Bits 1-0: Clock select
//!     - 00: 4096 Hz (CPU clock / 1024)
//!     - 01: 262144 Hz (CPU clock / 16)
//!     - 10: 65536 Hz (CPU clock / 64)
//!     - 11: 16384 Hz (CPU clock / 256)
//!
//! # Overflow
//!
//! When TIMA overflows it reads `0x00` for 4 cycles. Only then is it reloaded
//! from TMA and the timer interrupt requested. Writing TIMA during that window
//! cancels the reload.
//!
//! The bus steps the timer from `step_before_timer`, ahead of any other
//! register update in the same batch.

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::Addressable;
use serde::{Deserialize, Serialize};

const DIV_PERIOD: u32 = 256;
const RELOAD_DELAY: u32 = 4;

/// Game Boy Timer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timer {
    /// Divider register (FF04) - write resets to 0
    div: u8,

    /// Timer counter (FF05)
    tima: u8,

    /// Timer modulo (FF06)
    tma: u8,

    /// Timer control (FF07), low 3 bits
    tac: u8,

    div_cycles: u32,

    tima_cycles: u32,

    /// Cycles left before an overflowed TIMA is reloaded from TMA
    reload_delay: Option<u32>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    fn period(&self) -> u32 {
        match self.tac & 0x03 {
            0 => 1024, // 4096 Hz
            1 => 16,   // 262144 Hz
            2 => 64,   // 65536 Hz
            _ => 256,  // 16384 Hz
        }
    }

    fn enabled(&self) -> bool {
        self.tac & 0x04 != 0
    }

    /// Advance one CPU cycle, returns true if the interrupt fires
    fn tick(&mut self) -> bool {
        let mut interrupt = false;

        if let Some(left) = self.reload_delay {
            if left <= 1 {
                self.tima = self.tma;
                self.reload_delay = None;
                interrupt = true;
            } else {
                self.reload_delay = Some(left - 1);
            }
        }

        self.div_cycles += 1;
        if self.div_cycles >= DIV_PERIOD {
            self.div = self.div.wrapping_add(1);
            self.div_cycles = 0;
        }

        if self.enabled() {
            self.tima_cycles += 1;
            if self.tima_cycles >= self.period() {
                self.tima_cycles = 0;
                let (new_tima, overflow) = self.tima.overflowing_add(1);
                self.tima = new_tima;
                if overflow {
                    self.reload_delay = Some(RELOAD_DELAY);
                }
            }
        }

        interrupt
    }

    /// Clock the timer by a number of CPU cycles
    ///
    /// Returns true if a timer interrupt should be requested
    pub fn step(&mut self, cycles: u32) -> bool {
        let mut interrupt = false;
        for _ in 0..cycles {
            interrupt |= self.tick();
        }
        interrupt
    }
}

impl Addressable for Timer {
    fn name(&self) -> &str {
        "Timer"
    }

    fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => self.div,
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8, // Upper 5 bits always read as 1
            _ => 0xFF,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF04 => {
                // Writing any value to DIV resets it to 0
                self.div = 0;
                self.div_cycles = 0;
            }
            0xFF05 => {
                self.tima = val;
                if self.reload_delay.take().is_some() {
                    log(LogCategory::Io, LogLevel::Trace, || {
                        "Timer: TIMA write cancelled pending reload".to_string()
                    });
                }
            }
            0xFF06 => self.tma = val,
            0xFF07 => self.tac = val & 0x07, // Only lower 3 bits are writable
            _ => {}
        }
    }
}
