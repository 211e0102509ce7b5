mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use emu_core::logging::{LogConfig, LogLevel};
use emu_core::memory::Addressable;
use emu_core::System;
use emu_gb::cartridge::{find_boot_rom, save_path_for, CartridgeHeader};
use emu_gb::{GbSystem, MachineMode, VideoMode};
use settings::Settings;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gbmem", about = "Inspect the Game Boy memory bus of a cartridge")]
struct Args {
    /// Path to the cartridge ROM
    rom: PathBuf,

    /// Boot ROM to overlay while booting (default: looked up in the boot ROM directory)
    #[arg(long)]
    boot_rom: Option<PathBuf>,

    /// Start directly in the cartridge
    #[arg(long, default_value_t = false)]
    no_boot_rom: bool,

    /// Directory for battery save files
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Settings file (default: config.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emulator log level: off, error, warn, info, debug, trace
    #[arg(long, default_value = "warn")]
    log_level: LogLevel,

    /// Print bytes sent over the serial port
    #[arg(long, default_value_t = false)]
    output_serial: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the cartridge header and mapping setup
    Info,
    /// List address ranges and the component behind each
    Map {
        /// PPU mode to resolve under (0-3)
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
        video_mode: u8,
        /// Resolve as a DMG even on CGB hardware
        #[arg(long, default_value_t = false)]
        dmg: bool,
    },
    /// Hex dump of bus reads starting at ADDRESS
    Peek {
        #[arg(value_parser = parse_u16)]
        address: u16,
        #[arg(default_value_t = 16)]
        count: u16,
    },
    /// Write bytes through the bus, then read them back
    Poke {
        #[arg(value_parser = parse_u16)]
        address: u16,
        #[arg(required = true, value_parser = parse_u8)]
        values: Vec<u8>,
    },
    /// Step the bus for a number of cycles and dump the save state
    Run {
        #[arg(long, default_value_t = 70224)]
        cycles: u32,
        /// Dump save-state to this file as JSON
        #[arg(long, default_value = "state.json")]
        save: PathBuf,
    },
}

/// Accepts `0x1234`, `$1234` or decimal
fn parse_number(s: &str) -> Result<u32, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix('$')) {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("invalid number {:?}: {}", s, e))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let n = parse_number(s)?;
    u16::try_from(n).map_err(|_| format!("{:?} does not fit in 16 bits", s))
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let n = parse_number(s)?;
    u8::try_from(n).map_err(|_| format!("{:?} does not fit in 8 bits", s))
}

fn video_mode_from(n: u8) -> VideoMode {
    match n {
        1 => VideoMode::Mode1,
        2 => VideoMode::Mode2,
        3 => VideoMode::Mode3,
        _ => VideoMode::Mode0,
    }
}

fn load_boot_rom(args: &Args, settings: &Settings, cgb: bool) -> Result<Option<Vec<u8>>> {
    if args.no_boot_rom || !settings.use_boot_rom {
        return Ok(None);
    }
    if let Some(path) = &args.boot_rom {
        let data = fs::read(path)
            .with_context(|| format!("failed to read boot ROM {}", path.display()))?;
        return Ok(Some(data));
    }
    if let Some(path) = settings.boot_rom_path(cgb) {
        match fs::read(path) {
            Ok(data) => return Ok(Some(data)),
            Err(e) => log::warn!("Configured boot ROM {} unreadable: {}", path.display(), e),
        }
    }
    Ok(find_boot_rom(&settings.boot_rom_dir, cgb))
}

fn print_info(sys: &GbSystem, header: &CartridgeHeader, rom_path: &Path) -> Result<()> {
    let bus = sys.bus().context("no cartridge mounted")?;
    let cart = bus.cartridge();
    println!("File:        {}", rom_path.display());
    println!("Title:       {}", header.title);
    println!("CGB support: {:?}", header.cgb);
    println!(
        "Controller:  {} (type {:02X})",
        cart.controller().name(),
        header.cartridge_type
    );
    println!("ROM banks:   {}", header.rom_bank_count);
    println!("RAM banks:   {}", header.ram_bank_count);
    println!("Battery:     {}", header.has_battery());
    println!("Boot ROM:    {}", cart.has_boot_rom());
    if let Some(path) = cart.save_file() {
        println!("Save file:   {}", path.display());
    }
    let mode = bus.mode();
    println!(
        "Mode:        {}{}",
        if mode.is_cgb { "CGB hardware" } else { "DMG" },
        if mode.in_cgb_mode { ", CGB mode" } else { "" }
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level.as_level_filter())
        .parse_default_env()
        .init();
    LogConfig::global().set_global_level(args.log_level);

    let settings = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    let rom = fs::read(&args.rom)
        .with_context(|| format!("failed to read ROM {}", args.rom.display()))?;
    let header = CartridgeHeader::parse(&rom)?;
    let boot_rom = load_boot_rom(&args, &settings, header.cgb.is_cgb_capable())?;

    let save_dir = args.save_dir.as_deref().unwrap_or(&settings.save_dir);
    let mut sys = GbSystem::new();
    sys.set_save_file(Some(save_path_for(&args.rom, save_dir)));
    if let Some(boot) = boot_rom {
        sys.mount("BootROM", &boot)?;
    }
    sys.mount("Cartridge", &rom)?;

    match &args.command {
        Command::Info => print_info(&sys, &header, &args.rom)?,
        Command::Map { video_mode, dmg } => {
            let bus = sys.bus().context("no cartridge mounted")?;
            let mode = if *dmg {
                MachineMode::dmg()
            } else {
                bus.mode()
            };
            for entry in bus.memory_map(mode.with_video_mode(video_mode_from(*video_mode))) {
                println!("{:04X}-{:04X}  {}", entry.start, entry.end, entry.name);
            }
        }
        Command::Peek { address, count } => {
            let bus = sys.bus().context("no cartridge mounted")?;
            let mut line = String::new();
            for i in 0..*count {
                let addr = address.wrapping_add(i);
                if i % 16 == 0 {
                    if !line.is_empty() {
                        println!("{}", line.trim_end());
                    }
                    line = format!("{:04X}:", addr);
                }
                line.push_str(&format!(" {:02X}", bus.read(addr)));
            }
            if !line.is_empty() {
                println!("{}", line.trim_end());
            }
        }
        Command::Poke { address, values } => {
            let bus = sys.bus_mut().context("no cartridge mounted")?;
            for (addr, &value) in (*address..=u16::MAX).zip(values) {
                bus.write(addr, value);
            }
            for (addr, &value) in (*address..=u16::MAX).zip(values) {
                println!("{:04X}: wrote {:02X}, reads {:02X}", addr, value, bus.read(addr));
            }
        }
        Command::Run { cycles, save } => {
            sys.step(*cycles)?;
            let state = sys.save_state();
            let mut f = File::create(save)
                .with_context(|| format!("failed to create {}", save.display()))?;
            write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
            println!("Ran {} cycles, state written to {}", cycles, save.display());
        }
    }

    if args.output_serial || settings.output_serial {
        if let Some(bus) = sys.bus_mut() {
            let out = bus.take_serial_output();
            if !out.is_empty() {
                println!("{}", String::from_utf8_lossy(&out));
            }
        }
    }

    sys.persist_save()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_formats() {
        assert_eq!(parse_number("0xFF40"), Ok(0xFF40));
        assert_eq!(parse_number("$C000"), Ok(0xC000));
        assert_eq!(parse_number("42"), Ok(42));
        assert!(parse_number("0xZZ").is_err());
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(parse_u16("0xFFFF"), Ok(0xFFFF));
        assert!(parse_u16("0x10000").is_err());
        assert_eq!(parse_u8("255"), Ok(255));
        assert!(parse_u8("256").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "gbmem",
            "game.gb",
            "--no-boot-rom",
            "--log-level",
            "debug",
            "poke",
            "0xC000",
            "0x12",
            "34",
        ])
        .unwrap();
        assert!(args.no_boot_rom);
        assert_eq!(args.log_level, LogLevel::Debug);
        match args.command {
            Command::Poke { address, values } => {
                assert_eq!(address, 0xC000);
                assert_eq!(values, vec![0x12, 34]);
            }
            _ => panic!("expected poke"),
        }
    }

    #[test]
    fn test_map_video_mode_range() {
        assert!(Args::try_parse_from(["gbmem", "game.gb", "map", "--video-mode", "4"]).is_err());
        let args =
            Args::try_parse_from(["gbmem", "game.gb", "map", "--video-mode", "3", "--dmg"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Map {
                video_mode: 3,
                dmg: true
            }
        ));
        assert_eq!(video_mode_from(3), VideoMode::Mode3);
    }
}
