use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

use crate::timer::DEFAULT_TIMER_HZ;

/// roughly what the COSMAC VIP interpreter managed
pub const DEFAULT_CYCLE_HZ: u32 = 500;

#[derive(Parser, Debug, Clone)]
#[command(name = "octet8")]
#[command(version, about = "Run a CHIP-8 program in the terminal", long_about = None)]
pub struct Config {
    /// Program image, loaded verbatim at 0x200
    pub rom: PathBuf,

    /// Instructions per second
    #[arg(long, default_value_t = DEFAULT_CYCLE_HZ)]
    pub hz: u32,

    /// Delay and sound timer decrements per second
    #[arg(long, default_value_t = DEFAULT_TIMER_HZ)]
    pub timer_hz: u32,

    /// How long a key press counts as held (terminals don't report releases)
    #[arg(long, default_value_t = 150)]
    pub key_hold_ms: u64,

    /// Stop after this many instructions
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Seed for RND, for repeatable runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print a listing of the program and exit
    #[arg(short, long)]
    pub disassemble: bool,

    /// off, error, warn, info, debug or trace; logs go to stderr
    #[arg(long, default_value_t = LevelFilter::Warn)]
    pub log_level: LevelFilter,
}

impl Config {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs(1) / self.hz.max(1)
    }

    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.key_hold_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rom: PathBuf::new(),
            hz: DEFAULT_CYCLE_HZ,
            timer_hz: DEFAULT_TIMER_HZ,
            key_hold_ms: 150,
            cycles: None,
            seed: None,
            disassemble: false,
            log_level: LevelFilter::Warn,
        }
    }
}
