//! OAM DMA (`$FF46`) and CGB VRAM DMA (`$FF51-$FF55`).
//!
//! Both engines only track progress. They tell the bus which bytes to move
//! and the bus performs the copy, since it alone can read the source.

use crate::memory::Register;
use crate::mode::VideoMode;
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::Addressable;
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const OAM_SIZE: u16 = 0xA0;
const OAM_CYCLES_PER_BYTE: u32 = 4;
const HDMA_BLOCK: u16 = 0x10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OamDma {
    register: u8,
    source: u16,
    /// Next OAM offset to copy while a transfer runs
    next: Option<u16>,
    cycles: u32,
}

impl OamDma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> u16 {
        self.source
    }

    /// OAM offsets whose bytes are due after `cycles` more cycles
    pub fn step(&mut self, cycles: u32) -> Range<u16> {
        let Some(start) = self.next else {
            return 0..0;
        };
        self.cycles += cycles;
        let due = u16::try_from(self.cycles / OAM_CYCLES_PER_BYTE).unwrap_or(OAM_SIZE);
        self.cycles %= OAM_CYCLES_PER_BYTE;

        let end = start.saturating_add(due).min(OAM_SIZE);
        self.next = (end < OAM_SIZE).then_some(end);
        start..end
    }
}

impl Addressable for OamDma {
    fn name(&self) -> &str {
        "DMA"
    }

    fn read(&self, _addr: u16) -> u8 {
        self.register
    }

    fn write(&mut self, _addr: u16, val: u8) {
        self.register = val;
        let source = u16::from(val) << 8;
        // Pages past work RAM read its echo
        self.source = if source >= 0xE000 {
            source - 0x2000
        } else {
            source
        };
        self.next = Some(0);
        self.cycles = 0;
        log(LogCategory::Dma, LogLevel::Debug, || {
            format!("DMA: OAM transfer from {:04X}", self.source)
        });
    }
}

/// One burst the bus must copy into the selected VRAM bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VramTransfer {
    pub source: u16,
    pub destination: u16,
    pub length: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
enum HdmaState {
    #[default]
    Idle,
    /// Whole transfer runs at once on the next step
    General { blocks: u8 },
    /// One block per HBlank
    HBlank { blocks: u8 },
    Cancelled { blocks: u8 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hdma {
    /// HDMA1-HDMA4, write-only
    sources: Vec<Register>,
    state: HdmaState,
    source: u16,
    destination: u16,
    /// Set once the current HBlank got its block
    hblank_served: bool,
}

impl Default for Hdma {
    fn default() -> Self {
        Self {
            sources: ["HDMA1", "HDMA2", "HDMA3", "HDMA4"]
                .into_iter()
                .map(|name| Register::new(name).with_or_on_read(0xFF))
                .collect(),
            state: HdmaState::Idle,
            source: 0,
            destination: 0x8000,
            hblank_served: false,
        }
    }
}

impl Hdma {
    pub fn new() -> Self {
        Self::default()
    }

    fn register_value(&self, index: usize) -> u16 {
        self.sources.get(index).map_or(0, |r| u16::from(r.value()))
    }

    fn latch_addresses(&mut self) {
        self.source = ((self.register_value(0) << 8) | self.register_value(1)) & 0xFFF0;
        self.destination =
            0x8000 | (((self.register_value(2) << 8) | self.register_value(3)) & 0x1FF0);
    }

    fn take(&mut self, blocks: u16) -> VramTransfer {
        let length = blocks * HDMA_BLOCK;
        let transfer = VramTransfer {
            source: self.source,
            destination: self.destination,
            length,
        };
        self.source = self.source.wrapping_add(length);
        self.destination = 0x8000 | (self.destination.wrapping_add(length) & 0x1FFF);
        transfer
    }

    /// Advance with the current PPU mode, returns a burst to copy if one is due
    pub fn step(&mut self, video_mode: VideoMode) -> Option<VramTransfer> {
        if video_mode != VideoMode::Mode0 {
            self.hblank_served = false;
        }
        match self.state {
            HdmaState::General { blocks } => {
                self.state = HdmaState::Idle;
                Some(self.take(u16::from(blocks)))
            }
            HdmaState::HBlank { blocks } if video_mode == VideoMode::Mode0 && !self.hblank_served => {
                self.hblank_served = true;
                self.state = if blocks > 1 {
                    HdmaState::HBlank { blocks: blocks - 1 }
                } else {
                    HdmaState::Idle
                };
                Some(self.take(1))
            }
            _ => None,
        }
    }
}

impl Addressable for Hdma {
    fn name(&self) -> &str {
        "HDMA"
    }

    fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF51..=0xFF54 => self
                .sources
                .get(usize::from(addr - 0xFF51))
                .map_or(0xFF, |r| r.read(addr)),
            0xFF55 => match self.state {
                HdmaState::Idle => 0xFF,
                HdmaState::General { blocks } | HdmaState::HBlank { blocks } => {
                    blocks.wrapping_sub(1) & 0x7F
                }
                HdmaState::Cancelled { blocks } => 0x80 | (blocks.wrapping_sub(1) & 0x7F),
            },
            _ => 0xFF,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF51..=0xFF54 => {
                if let Some(reg) = self.sources.get_mut(usize::from(addr - 0xFF51)) {
                    reg.write(addr, val);
                }
            }
            0xFF55 => {
                let blocks = (val & 0x7F) + 1;
                if let (HdmaState::HBlank { blocks: left }, 0) = (self.state, val & 0x80) {
                    self.state = HdmaState::Cancelled { blocks: left };
                    log(LogCategory::Dma, LogLevel::Debug, || {
                        format!("HDMA: cancelled with {} blocks left", left)
                    });
                    return;
                }
                self.latch_addresses();
                self.hblank_served = false;
                self.state = if val & 0x80 == 0 {
                    HdmaState::General { blocks }
                } else {
                    HdmaState::HBlank { blocks }
                };
                log(LogCategory::Dma, LogLevel::Debug, || {
                    format!(
                        "HDMA: {:?} {:04X} -> {:04X}",
                        self.state, self.source, self.destination
                    )
                });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oam_dma_pacing() {
        let mut dma = OamDma::new();
        dma.write(0xFF46, 0xC1);
        assert_eq!(dma.source(), 0xC100);
        assert_eq!(dma.read(0xFF46), 0xC1);

        assert_eq!(dma.step(3), 0..0);
        assert_eq!(dma.step(1), 0..1);
        assert_eq!(dma.step(8), 1..3);

        assert_eq!(dma.step(10_000), 3..OAM_SIZE);
        // Finished transfers copy nothing more
        assert_eq!(dma.step(4), 0..0);
    }

    #[test]
    fn test_oam_dma_echo_source() {
        let mut dma = OamDma::new();
        dma.write(0xFF46, 0xE0);
        assert_eq!(dma.source(), 0xC000);
    }

    fn program(hdma: &mut Hdma, src: u16, dst: u16) {
        hdma.write(0xFF51, (src >> 8) as u8);
        hdma.write(0xFF52, src as u8);
        hdma.write(0xFF53, (dst >> 8) as u8);
        hdma.write(0xFF54, dst as u8);
    }

    #[test]
    fn test_source_registers_read_ff() {
        let mut hdma = Hdma::new();
        program(&mut hdma, 0xC000, 0x8000);
        for addr in 0xFF51..=0xFF54 {
            assert_eq!(hdma.read(addr), 0xFF);
        }
        assert_eq!(hdma.read(0xFF55), 0xFF);
    }

    #[test]
    fn test_general_dma() {
        let mut hdma = Hdma::new();
        program(&mut hdma, 0xC12F, 0x9A5F);
        hdma.write(0xFF55, 0x03);
        assert_eq!(hdma.read(0xFF55), 0x03);

        let transfer = hdma.step(VideoMode::Mode3);
        assert_eq!(
            transfer,
            Some(VramTransfer {
                source: 0xC120,
                destination: 0x9A50,
                length: 0x40,
            })
        );
        assert_eq!(hdma.read(0xFF55), 0xFF);
        assert_eq!(hdma.step(VideoMode::Mode0), None);
    }

    #[test]
    fn test_hblank_dma_one_block_per_hblank() {
        let mut hdma = Hdma::new();
        program(&mut hdma, 0xC000, 0x8000);
        hdma.write(0xFF55, 0x81);
        assert_eq!(hdma.read(0xFF55), 0x01);

        assert_eq!(hdma.step(VideoMode::Mode3), None);
        let first = hdma.step(VideoMode::Mode0).unwrap();
        assert_eq!((first.source, first.destination, first.length), (0xC000, 0x8000, 0x10));
        // Still the same HBlank
        assert_eq!(hdma.step(VideoMode::Mode0), None);
        assert_eq!(hdma.read(0xFF55), 0x00);

        hdma.step(VideoMode::Mode2);
        let second = hdma.step(VideoMode::Mode0).unwrap();
        assert_eq!((second.source, second.destination), (0xC010, 0x8010));
        hdma.step(VideoMode::Mode2);
        assert_eq!(hdma.step(VideoMode::Mode0), None);
        assert_eq!(hdma.read(0xFF55), 0xFF);
    }

    #[test]
    fn test_hblank_dma_cancel() {
        let mut hdma = Hdma::new();
        program(&mut hdma, 0xC000, 0x8000);
        hdma.write(0xFF55, 0x84);
        hdma.step(VideoMode::Mode0);

        hdma.write(0xFF55, 0x00);
        assert_eq!(hdma.read(0xFF55), 0x80 | 0x03);
        hdma.step(VideoMode::Mode2);
        assert_eq!(hdma.step(VideoMode::Mode0), None);
    }
}
