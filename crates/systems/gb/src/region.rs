//! The closed set of regions an address can resolve to.

use crate::ports::IoPort;

/// CGB registers the bus only maps in CGB mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgbPort {
    Speed,
    Infrared,
    WramSelect,
    BgPalette,
    ObjPalette,
    VramSelect,
    Hdma,
}

/// Result of resolving an address against the current machine mode.
///
/// Carries just enough data (a bank index, a port) for the bus to find the
/// backing component; the component itself does the offset math.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Blocked by the PPU or backed by nothing; reads `0xFF`
    Unaccessible,
    BootRom,
    /// ROM window, served by the bank controller
    Cartridge,
    ExternalRam(usize),
    Vram(usize),
    /// Flat 8KB work RAM used outside CGB mode
    InternalRam,
    Wram(usize),
    Oam,
    Empty0,
    Port(IoPort),
    BootRegister,
    /// Undocumented CGB registers, indexed into the bus's table
    Undocumented(usize),
    Empty1,
    HighRam,
    InterruptEnable,
    Cgb(CgbPort),
}

impl Region {
    /// Whether accesses to this region ever leave a trace
    pub fn is_backed(self) -> bool {
        !matches!(self, Region::Unaccessible | Region::Empty1)
    }
}
