//! Memory-mapped access traits shared by every system bus.
//!
//! A system bus is built out of [`Addressable`] regions: RAM blocks, fixed
//! registers, cartridge banks and the like. The bus itself is also an
//! [`Addressable`], and additionally exposes the cycle-stepping entry points
//! CPU cores drive through [`SystemBus`].

/// A memory-like component that can be read and written by address.
///
/// Implementations receive the full 16-bit bus address and are responsible
/// for translating it into their own storage offset. Every address a bus
/// ever routes to a region must be handled without panicking.
pub trait Addressable {
    /// Human readable name, used by debuggers and memory map dumps
    fn name(&self) -> &str;

    /// Read the byte at `addr`
    fn read(&self, addr: u16) -> u8;

    /// Write `val` to `addr`
    fn write(&mut self, addr: u16, val: u8);
}

/// The full surface a CPU core uses to talk to a machine's memory system.
pub trait SystemBus: Addressable {
    /// Advance bus-owned hardware (DMA engines and friends) by `cycles`
    fn step(&mut self, cycles: u32);

    /// Advance components that must observe the elapsed cycles before any
    /// other register update in the same batch (e.g. a timer reset).
    fn step_before_timer(&mut self, cycles: u32);
}
