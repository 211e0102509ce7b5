//! Core emulator primitives and traits.

pub mod logging;
pub mod memory;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of a mount point (media slot) that a system supports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPointInfo {
    /// Unique identifier for this mount point (e.g., "Cartridge", "BootROM")
    pub id: String,
    /// User-friendly name for display (e.g., "Cartridge Slot", "Boot ROM")
    pub name: String,
    /// File extensions accepted by this mount point (e.g., ["gb", "gbc"])
    pub extensions: Vec<String>,
    /// Whether this mount point is required for the system to function
    pub required: bool,
}

/// A high-level System trait tying components together.
pub trait System {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reset to initial power-on state
    fn reset(&mut self);

    /// Advance the machine's memory-side hardware by `cycles`.
    fn step(&mut self, cycles: u32) -> Result<(), Self::Error>;

    /// Return a JSON-serializable save state.
    /// Note: Save states should NOT include ROM/cartridge data.
    /// Only save emulator state (RAM, registers, banking state, etc.)
    fn save_state(&self) -> Value;

    /// Load a JSON save state.
    /// Returns error if the state is incompatible or requires different mounted media.
    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error>;

    /// Check if this system supports save/load state functionality
    fn supports_save_states(&self) -> bool {
        false // Default: no save state support
    }

    /// Get the list of mount points this system supports
    fn mount_points(&self) -> Vec<MountPointInfo>;

    /// Load media into a specific mount point
    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Unload media from a specific mount point
    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error>;

    /// Check if a mount point has media loaded
    fn is_mounted(&self, mount_point_id: &str) -> bool;
}
