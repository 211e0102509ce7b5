//! Game Boy / Game Boy Color memory system
//!
//! [`GbBus`] resolves every CPU-visible address to the component that serves
//! it, taking the CGB mode, the PPU mode and the boot ROM latch into account.
//! [`GbSystem`] wraps a bus and a mounted cartridge behind the
//! [`emu_core::System`] trait.

pub mod bus;
pub mod cartridge;
pub mod cgb;
pub mod dma;
pub mod interrupts;
pub mod joypad;
pub mod lcd;
pub mod mappers;
pub mod memory;
pub mod mode;
pub mod ports;
pub mod region;
pub mod serial;
pub mod sound;
pub mod timer;

pub use bus::{GbBus, MapEntry};
pub use cartridge::{Cartridge, CartridgeError, CartridgeState};
pub use interrupts::Interrupt;
pub use joypad::Button;
pub use mode::{MachineMode, VideoMode};
pub use region::Region;

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::memory::SystemBus;
use emu_core::{MountPointInfo, System};
use serde::de::Error as _;
use std::path::{Path, PathBuf};
use std::{fs, io};

const STATE_VERSION: u64 = 1;

#[derive(thiserror::Error, Debug)]
pub enum GbError {
    #[error("No cartridge loaded")]
    NoCartridge,
    #[error("Invalid mount point: {0}")]
    InvalidMountPoint(String),
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[error("failed to write save file: {0}")]
    SaveFile(#[from] io::Error),
}

#[derive(Default)]
pub struct GbSystem {
    bus: Option<GbBus>,
    boot_rom: Option<Vec<u8>>,
    /// Battery save used for the next cartridge mounted
    save_file: Option<PathBuf>,
}

impl GbSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bus(&self) -> Option<&GbBus> {
        self.bus.as_ref()
    }

    pub fn bus_mut(&mut self) -> Option<&mut GbBus> {
        self.bus.as_mut()
    }

    pub fn set_save_file(&mut self, path: Option<PathBuf>) {
        self.save_file = path;
    }

    /// Read a ROM image from disk and mount it
    pub fn load_rom_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), GbError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| CartridgeError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        self.mount("Cartridge", &data)
    }

    /// Flush the battery save of the mounted cartridge, if any
    pub fn persist_save(&mut self) -> Result<(), GbError> {
        if let Some(bus) = self.bus.as_mut() {
            bus.cartridge_mut().persist_save()?;
        }
        Ok(())
    }
}

impl System for GbSystem {
    type Error = GbError;

    /// Hard reset: fresh bus and controller around the same cartridge
    fn reset(&mut self) {
        if let Some(bus) = self.bus.take() {
            let mut cartridge = bus.cartridge().hard_reset();
            cartridge.set_boot_rom(self.boot_rom.clone());
            self.bus = Some(GbBus::new(cartridge));
        }
    }

    fn step(&mut self, cycles: u32) -> Result<(), Self::Error> {
        let bus = self.bus.as_mut().ok_or(GbError::NoCartridge)?;
        bus.step_before_timer(cycles);
        bus.step(cycles);
        Ok(())
    }

    fn save_state(&self) -> serde_json::Value {
        match &self.bus {
            Some(bus) => serde_json::json!({
                "system": "gb",
                "version": STATE_VERSION,
                "bus": bus,
                "cartridge": bus.cartridge().state(),
            }),
            None => serde_json::json!({
                "system": "gb",
                "version": STATE_VERSION,
            }),
        }
    }

    fn load_state(&mut self, v: &serde_json::Value) -> Result<(), serde_json::Error> {
        if v.get("system").and_then(|s| s.as_str()) != Some("gb") {
            return Err(serde_json::Error::custom("save state is not for the Game Boy"));
        }
        let version = v.get("version").and_then(|s| s.as_u64());
        if version != Some(STATE_VERSION) {
            return Err(serde_json::Error::custom(format!(
                "unsupported save state version {:?}",
                version
            )));
        }
        let (Some(bus_state), Some(cart_state)) = (v.get("bus"), v.get("cartridge")) else {
            // Nothing was mounted when the state was taken
            return Ok(());
        };
        let Some(current) = self.bus.as_ref() else {
            return Err(serde_json::Error::custom(
                "save state requires a mounted cartridge",
            ));
        };

        let mut bus: GbBus = serde_json::from_value(bus_state.clone())?;
        let cart_state: CartridgeState = serde_json::from_value(cart_state.clone())?;
        let mounted = current.cartridge().controller().name();
        if cart_state.controller.name() != mounted {
            return Err(serde_json::Error::custom(format!(
                "save state is for a {} cartridge, but a {} cartridge is mounted",
                cart_state.controller.name(),
                mounted
            )));
        }
        let mut cartridge = current.cartridge().clone();
        cartridge.restore_state(cart_state);
        bus.attach_cartridge(cartridge);
        self.bus = Some(bus);
        Ok(())
    }

    fn supports_save_states(&self) -> bool {
        true
    }

    fn mount_points(&self) -> Vec<MountPointInfo> {
        vec![
            MountPointInfo {
                id: "Cartridge".to_string(),
                name: "Cartridge Slot".to_string(),
                extensions: vec!["gb".to_string(), "gbc".to_string()],
                required: true,
            },
            MountPointInfo {
                id: "BootROM".to_string(),
                name: "Boot ROM".to_string(),
                extensions: vec!["bin".to_string()],
                required: false,
            },
        ]
    }

    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
        match mount_point_id {
            "Cartridge" => {
                // Flush the outgoing cartridge before the new one reads its save
                self.persist_save()?;
                let mut cartridge = Cartridge::new(data.to_vec(), self.boot_rom.clone())?;
                if let Some(path) = &self.save_file {
                    cartridge = cartridge.with_save_file(path)?;
                }
                self.bus = Some(GbBus::new(cartridge));
                Ok(())
            }
            "BootROM" => {
                self.boot_rom = Some(data.to_vec());
                log(LogCategory::Cartridge, LogLevel::Info, || {
                    format!("Boot ROM: {} bytes, used from the next reset", data.len())
                });
                Ok(())
            }
            other => Err(GbError::InvalidMountPoint(other.to_string())),
        }
    }

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error> {
        match mount_point_id {
            "Cartridge" => {
                self.persist_save()?;
                self.bus = None;
                Ok(())
            }
            "BootROM" => {
                self.boot_rom = None;
                Ok(())
            }
            other => Err(GbError::InvalidMountPoint(other.to_string())),
        }
    }

    fn is_mounted(&self, mount_point_id: &str) -> bool {
        match mount_point_id {
            "Cartridge" => self.bus.is_some(),
            "BootROM" => self.boot_rom.is_some(),
            _ => false,
        }
    }
}
