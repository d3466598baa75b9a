//! The environment owns a machine plus the host collaborators and runs the
//! main loop:
//!
//! ```text
//!   loop
//!    |-- keys = input.keys(); machine.set_keys(keys)
//!    |-- machine.step()
//!    |-- timers.tick(machine, now)
//!    |-- if the framebuffer changed: display.draw(framebuffer)
//!    `-- sleep off whatever is left of this cycle's time slice
//! ```
//!
//! Every call into the machine happens on this one thread, in this order.
use crate::config::Config;
use crate::display::Display;
use crate::error::{Error, Result};
use crate::input::Input;
use crate::interpreter::Machine;
use crate::memory::DISPLAY_SIZE_BYTES;
use crate::timer::Timers;
use log::info;
use std::time::{Duration, Instant};

pub struct Environment<'a> {
    pub machine: Machine,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    timers: Timers,
    cycle_period: Duration,
    cycle_limit: Option<u64>,
    cycles: u64,
    last_frame: Vec<u8>,
}

impl<'a> Environment<'a> {
    pub fn new(
        machine: Machine,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        config: &Config,
    ) -> Result<Self> {
        if display.get_display_size_bytes() != DISPLAY_SIZE_BYTES {
            return Err(Error::Terminal(format!(
                "display takes {} byte frames, the machine makes {}",
                display.get_display_size_bytes(),
                DISPLAY_SIZE_BYTES
            )));
        }
        Ok(Environment {
            machine,
            display,
            input,
            timers: Timers::new(config.timer_hz, Instant::now()),
            cycle_period: config.cycle_period(),
            cycle_limit: config.cycles,
            cycles: 0,
            last_frame: Vec::new(),
        })
    }

    /// run until the user quits or the cycle limit is hit
    pub fn main_loop(&mut self) -> Result<u64> {
        self.refresh()?;
        loop {
            if self.input.quit_requested() {
                info!("quit requested after {} cycles", self.cycles);
                break;
            }
            if matches!(self.cycle_limit, Some(limit) if self.cycles >= limit) {
                info!("cycle limit of {} reached", self.cycles);
                break;
            }
            let started = Instant::now();
            self.cycle()?;
            if let Some(left) = self.cycle_period.checked_sub(started.elapsed()) {
                spin_sleep::sleep(left);
            }
        }
        Ok(self.cycles)
    }

    /// one pass round the loop, without the sleep
    pub fn cycle(&mut self) -> Result<()> {
        let keys = self.input.keys()?;
        self.machine.set_keys(keys);
        self.machine.step();
        self.cycles += 1;
        self.timers.tick(&mut self.machine, Instant::now());
        self.refresh()
    }

    /// redraw, but only when the frame differs from the last one drawn
    fn refresh(&mut self) -> Result<()> {
        let frame = self.machine.framebuffer();
        if frame != self.last_frame.as_slice() {
            self.display.draw(frame)?;
            self.last_frame = frame.to_vec();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::DummyInput;
    use crate::memory::MemoryMap;

    fn fast_config(cycles: Option<u64>) -> Config {
        Config {
            hz: 1_000_000,
            cycles,
            ..Config::default()
        }
    }

    fn machine_with(rom: &[u8]) -> Result<Machine> {
        let mut m = Machine::with_seed(1);
        m.load_program(&mut &rom[..])?;
        Ok(m)
    }

    #[test]
    fn test_runs_to_cycle_limit() -> Result<()> {
        // LD V0,5; LD V1,3; ADD V0,V1; JP 206
        let m = machine_with(&[0x60, 0x05, 0x61, 0x03, 0x80, 0x14, 0x12, 0x06])?;
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut env = Environment::new(m, &mut display, &mut input, &fast_config(Some(10)))?;
        assert_eq!(env.main_loop()?, 10);
        assert_eq!(env.machine.v[0], 8);
        assert_eq!(env.machine.pc, 0x206);
        Ok(())
    }

    /// a sink for some other machine's screen size
    struct WideDisplay;

    impl Display for WideDisplay {
        fn draw(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn get_display_size_bytes(&self) -> usize {
            128 * 64 / 8
        }
    }

    #[test]
    fn test_rejects_display_of_wrong_size() -> Result<()> {
        let m = machine_with(&[0x12, 0x00])?;
        let mut display = WideDisplay;
        let mut input = DummyInput::new(&[]);
        let env = Environment::new(m, &mut display, &mut input, &fast_config(None));
        assert!(matches!(env, Err(Error::Terminal(_))));
        Ok(())
    }

    #[test]
    fn test_stops_when_input_quits() -> Result<()> {
        let m = machine_with(&[0x12, 0x00])?;
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]).quit_after(4);
        let mut env = Environment::new(m, &mut display, &mut input, &fast_config(None))?;
        assert_eq!(env.main_loop()?, 4);
        Ok(())
    }

    #[test]
    fn test_redraws_only_on_change() -> Result<()> {
        // LD I,208; DRW V0,V0,1; JP 204; sprite
        let m = machine_with(&[0xa2, 0x08, 0xd0, 0x01, 0x12, 0x04, 0x00, 0x00, 0xff])?;
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        {
            let mut env = Environment::new(m, &mut display, &mut input, &fast_config(Some(6)))?;
            env.main_loop()?;
        }
        // the blank first frame, then the one with the sprite
        assert_eq!(display.frames, 2);
        assert_eq!(display.last[0], 0xff);
        Ok(())
    }

    #[test]
    fn test_key_wait_sees_input_snapshots() -> Result<()> {
        // LD V3,K; JP 202
        let m = machine_with(&[0xf3, 0x0a, 0x12, 0x02])?;
        let mut display = DummyDisplay::new();
        let none = [false; 16];
        let mut input = DummyInput::new(&[none, none, none, DummyInput::pressed(&[0xa])]);
        let mut env = Environment::new(m, &mut display, &mut input, &fast_config(None))?;
        for _ in 0..3 {
            env.cycle()?;
            assert_eq!(env.machine.pc, 0x200);
        }
        env.cycle()?;
        assert_eq!(env.machine.v[3], 0xa);
        assert_eq!(env.machine.pc, 0x202);
        Ok(())
    }

    #[test]
    fn test_timers_count_down_in_the_loop() -> Result<()> {
        let mut m = machine_with(&[0x12, 0x00])?;
        m.dt = 3;
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let config = Config {
            hz: 100,
            timer_hz: 100,
            cycles: Some(10),
            ..Config::default()
        };
        let mut env = Environment::new(m, &mut display, &mut input, &config)?;
        env.main_loop()?;
        // ~100ms of wallclock at 100Hz is plenty to drain 3
        assert_eq!(env.machine.dt, 0);
        Ok(())
    }

    #[test]
    fn test_self_modifying_display_write_is_drawn() -> Result<()> {
        let mut m = machine_with(&[0x12, 0x00])?;
        m.memory.set_byte(0xf80, 0x18);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        {
            let mut env = Environment::new(m, &mut display, &mut input, &fast_config(Some(1)))?;
            env.main_loop()?;
        }
        assert_eq!(display.last[0x80], 0x18);
        Ok(())
    }
}
