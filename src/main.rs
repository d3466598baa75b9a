use std::error::Error;
use std::fs::File;

use clap::Parser;
use log::info;
use simple_logger::SimpleLogger;

use octet8::display::MonoTermDisplay;
use octet8::input::TermInput;
use octet8::interpreter::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use octet8::memory::PROGRAM_ADDR;
use octet8::{disassemble, Config, Environment, Machine};

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();
    SimpleLogger::new().with_level(config.log_level).init()?;

    if config.disassemble {
        let code = std::fs::read(&config.rom)?;
        for line in disassemble(&code, PROGRAM_ADDR) {
            println!("{}", line);
        }
        return Ok(());
    }

    let mut machine = match config.seed {
        Some(seed) => Machine::with_seed(seed),
        None => Machine::new(),
    };
    let mut f = File::open(&config.rom)?;
    let size = machine.load_program(&mut f)?;
    info!("loaded {} bytes from {}", size, config.rom.display());

    let cycles = {
        let mut display = MonoTermDisplay::new(DISPLAY_WIDTH, DISPLAY_HEIGHT)?;
        let mut input = TermInput::new(config.key_hold())?;
        let mut env = Environment::new(machine, &mut display, &mut input, &config)?;
        env.main_loop()?
    };

    // shove some junk on stdout to stop the shell prompt landing on the last frame
    for _ in 0..(DISPLAY_HEIGHT / 3) {
        println!();
    }
    info!("ran {} cycles", cycles);
    Ok(())
}
