//! Centralized logging configuration for the emulator.
//!
//! Emulator components log through [`log()`], which filters by
//! [`LogCategory`] and [`LogLevel`] before forwarding the record to the
//! [`log`] crate facade. Front ends decide where records end up by
//! installing a logger (the CLI uses `env_logger`).
//!
//! Each category maps to its own target (`emu::bus`, `emu::cartridge`, ...)
//! so records can also be filtered with the usual `RUST_LOG` syntax.
//!
//! # Usage
//!
//! ```rust
//! use emu_core::logging::{log, LogCategory, LogLevel};
//!
//! // The closure only runs when the record would be emitted
//! log(LogCategory::Bus, LogLevel::Debug, || {
//!     format!("Bus: boot ROM unmapped at {:04X}", 0xFF50)
//! });
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use thiserror::Error;

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log level: {0:?}")]
pub struct ParseLogLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    /// Case-insensitive; numeric levels `0`..=`5` are accepted as well
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(LogLevel::Off),
            "error" | "err" | "1" => Ok(LogLevel::Error),
            "warn" | "warning" | "2" => Ok(LogLevel::Warn),
            "info" | "3" => Ok(LogLevel::Info),
            "debug" | "4" => Ok(LogLevel::Debug),
            "trace" | "5" => Ok(LogLevel::Trace),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

impl LogLevel {
    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }

    /// The matching `log` crate level, `None` for [`LogLevel::Off`]
    pub fn as_log_level(self) -> Option<log::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(log::Level::Error),
            LogLevel::Warn => Some(log::Level::Warn),
            LogLevel::Info => Some(log::Level::Info),
            LogLevel::Debug => Some(log::Level::Debug),
            LogLevel::Trace => Some(log::Level::Trace),
        }
    }

    /// The matching `log` crate filter, used to configure front-end loggers
    pub fn as_level_filter(self) -> log::LevelFilter {
        self.as_log_level()
            .map(|level| level.to_level_filter())
            .unwrap_or(log::LevelFilter::Off)
    }
}

/// Log category for different emulator components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Address decoding and region dispatch
    Bus,
    /// Cartridge loading, bank controllers, save files
    Cartridge,
    /// OAM DMA and CGB HDMA transfers
    Dma,
    /// I/O port side effects (timer, serial, speed switch)
    Io,
    /// Interrupt requests
    Interrupts,
}

impl LogCategory {
    const ALL: [LogCategory; 5] = [
        LogCategory::Bus,
        LogCategory::Cartridge,
        LogCategory::Dma,
        LogCategory::Io,
        LogCategory::Interrupts,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// `log` crate target records of this category are emitted under
    pub fn target(self) -> &'static str {
        match self {
            LogCategory::Bus => "emu::bus",
            LogCategory::Cartridge => "emu::cartridge",
            LogCategory::Dma => "emu::dma",
            LogCategory::Io => "emu::io",
            LogCategory::Interrupts => "emu::interrupts",
        }
    }
}

/// Global logging configuration
///
/// A category-specific level wins over the global one; a category left at
/// [`LogLevel::Off`] falls back to the global level.
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; 5],
}

impl LogConfig {
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: Default::default(),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// Check if a message should be logged for the given category and level
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }
}

/// Log a message with the specified category and level
///
/// The message closure is only evaluated when the category/level pair is
/// enabled here *and* the installed `log` backend accepts the record.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    if !LogConfig::global().should_log(category, level) {
        return;
    }
    let Some(lvl) = level.as_log_level() else {
        return;
    };
    let target = category.target();
    if log::log_enabled!(target: target, lvl) {
        log::log!(target: target, lvl, "{}", message_fn());
    }
}
