//! Serial port (SB `$FF01`, SC `$FF02`).
//!
//! There is never a link partner: an internally clocked transfer shifts the
//! outgoing byte out, shifts `0xFF` in and raises the serial interrupt. Each
//! byte sent is kept so front ends can print what test ROMs write.

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::Addressable;
use serde::{Deserialize, Serialize};

/// 8 bits at 8192 Hz
const TRANSFER_CYCLES: u32 = 8 * 512;
/// CGB fast clock (SC bit 1) runs 32 times faster
const FAST_TRANSFER_CYCLES: u32 = TRANSFER_CYCLES / 32;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Serial {
    data: u8,
    control: u8,
    cgb_hardware: bool,
    remaining: Option<u32>,
    #[serde(skip)]
    output: Vec<u8>,
}

impl Serial {
    pub fn new(cgb_hardware: bool) -> Self {
        Self {
            cgb_hardware,
            ..Self::default()
        }
    }

    fn control_mask(&self) -> u8 {
        if self.cgb_hardware {
            0x83
        } else {
            0x81
        }
    }

    /// Returns true when a transfer completed and the interrupt should fire
    pub fn step(&mut self, cycles: u32) -> bool {
        let Some(left) = self.remaining else {
            return false;
        };
        if left > cycles {
            self.remaining = Some(left - cycles);
            return false;
        }

        self.output.push(self.data);
        log(LogCategory::Io, LogLevel::Debug, || {
            format!("Serial: sent {:02X}", self.data)
        });
        self.data = 0xFF;
        self.control &= !0x80;
        self.remaining = None;
        true
    }

    /// Bytes sent since the last call
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl Addressable for Serial {
    fn name(&self) -> &str {
        "Serial"
    }

    fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.data,
            0xFF02 => self.control | !self.control_mask(),
            _ => 0xFF,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF01 => self.data = val,
            0xFF02 => {
                self.control = val & self.control_mask();
                // Only the internal clock can drive a transfer without a partner
                if self.control & 0x81 == 0x81 {
                    let fast = self.cgb_hardware && self.control & 0x02 != 0;
                    self.remaining = Some(if fast {
                        FAST_TRANSFER_CYCLES
                    } else {
                        TRANSFER_CYCLES
                    });
                } else {
                    self.remaining = None;
                }
            }
            _ => {}
        }
    }
}
