//! A CHIP-8 style virtual machine, with a terminal front end.
//!
//! ## Design
//!
//! * the machine is plain state plus `step()`; it knows nothing of wallclock
//!   time, screens or keyboards
//! * everything lives in one 4K memory map, including the call stack (0xEA0)
//!   and the framebuffer (0xF00), so programs can poke at either
//! * no instruction is fatal; unknown words log a warning and fall through
//! * display and input sit behind traits so the terminal can be swapped for
//!   test doubles, or for something else entirely
//! * the environment paces the machine: instructions run as fast as they can,
//!   then the loop sleeps off the rest of each cycle's time slice
//!
//! Model
//!
//! ```text
//! Environment
//!  |-- display, input, timers, config
//!  |-- machine(memory, rng)
//!  |    |-- fetch: big-endian word at PC
//!  |    |-- decode: Instruction -> Operation
//!  |    `-- execute: registers, memory, PC
//!  `-- main loop
//!       |-- machine.set_keys(input.keys())
//!       |-- machine.step()
//!       |-- timers.tick(machine)
//!       |-- display.draw(machine.framebuffer()) if it changed
//!       `-- sleep(rest of cycle period)
//! ```
pub mod config;
pub mod display;
pub mod environment;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod timer;

pub use config::Config;
pub use environment::Environment;
pub use error::{Error, Result};
pub use instruction::{disassemble, Operation};
pub use interpreter::Machine;
