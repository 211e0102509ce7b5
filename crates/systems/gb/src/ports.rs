//! The fixed I/O port table (`$FF00-$FF4B`) and the components behind it.

use crate::dma::OamDma;
use crate::interrupts::InterruptFlags;
use crate::joypad::Joypad;
use crate::lcd::LcdRegisters;
use crate::serial::Serial;
use crate::sound::{SoundRegisters, WaveRam};
use crate::timer::Timer;
use emu_core::memory::Addressable;
use serde::{Deserialize, Serialize};

pub const PORTS_START: u16 = 0xFF00;
pub const PORT_COUNT: usize = 0x4C;

/// Which component answers a given I/O address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoPort {
    Joypad,
    Serial,
    Timer,
    InterruptFlag,
    Sound,
    WaveRam,
    Lcd,
    Dma,
    Unused,
}

const fn build_port_table() -> [IoPort; PORT_COUNT] {
    let mut table = [IoPort::Unused; PORT_COUNT];
    table[0x00] = IoPort::Joypad;
    table[0x01] = IoPort::Serial;
    table[0x02] = IoPort::Serial;
    let mut i = 0x04;
    while i <= 0x07 {
        table[i] = IoPort::Timer;
        i += 1;
    }
    table[0x0F] = IoPort::InterruptFlag;
    i = 0x10;
    while i <= 0x2F {
        table[i] = IoPort::Sound;
        i += 1;
    }
    while i <= 0x3F {
        table[i] = IoPort::WaveRam;
        i += 1;
    }
    while i < PORT_COUNT {
        table[i] = IoPort::Lcd;
        i += 1;
    }
    table[0x46] = IoPort::Dma;
    table
}

/// One entry per address from `$FF00`
pub const PORT_TABLE: [IoPort; PORT_COUNT] = build_port_table();

pub fn port_for(address: u16) -> IoPort {
    PORT_TABLE
        .get(usize::from(address.wrapping_sub(PORTS_START)))
        .copied()
        .unwrap_or(IoPort::Unused)
}

/// Holes in the port table (`$FF03`, `$FF08-$FF0E`)
#[derive(Debug, Default, Clone, Copy)]
pub struct UnusedPort;

impl Addressable for UnusedPort {
    fn name(&self) -> &str {
        "Unused I/O port"
    }

    fn read(&self, _addr: u16) -> u8 {
        0xFF
    }

    fn write(&mut self, _addr: u16, _val: u8) {}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoPorts {
    pub joypad: Joypad,
    pub serial: Serial,
    pub timer: Timer,
    pub interrupt_flag: InterruptFlags,
    pub sound: SoundRegisters,
    pub wave_ram: WaveRam,
    pub lcd: LcdRegisters,
    pub dma: OamDma,
    #[serde(skip)]
    unused: UnusedPort,
}

impl IoPorts {
    pub fn new(cgb_hardware: bool) -> Self {
        Self {
            joypad: Joypad::new(),
            serial: Serial::new(cgb_hardware),
            timer: Timer::new(),
            interrupt_flag: InterruptFlags::new(),
            sound: SoundRegisters::new(),
            wave_ram: WaveRam::default(),
            lcd: LcdRegisters::new(),
            dma: OamDma::new(),
            unused: UnusedPort,
        }
    }

    pub fn port(&self, port: IoPort) -> &dyn Addressable {
        match port {
            IoPort::Joypad => &self.joypad,
            IoPort::Serial => &self.serial,
            IoPort::Timer => &self.timer,
            IoPort::InterruptFlag => &self.interrupt_flag,
            IoPort::Sound => &self.sound,
            IoPort::WaveRam => &self.wave_ram,
            IoPort::Lcd => &self.lcd,
            IoPort::Dma => &self.dma,
            IoPort::Unused => &self.unused,
        }
    }

    pub fn port_mut(&mut self, port: IoPort) -> &mut dyn Addressable {
        match port {
            IoPort::Joypad => &mut self.joypad,
            IoPort::Serial => &mut self.serial,
            IoPort::Timer => &mut self.timer,
            IoPort::InterruptFlag => &mut self.interrupt_flag,
            IoPort::Sound => &mut self.sound,
            IoPort::WaveRam => &mut self.wave_ram,
            IoPort::Lcd => &mut self.lcd,
            IoPort::Dma => &mut self.dma,
            IoPort::Unused => &mut self.unused,
        }
    }
}
