use std::io;

use thiserror::Error;

/// Errors surfaced by the loader and the host collaborators. The engine
/// itself never fails: a bad instruction is a no-op, not an error.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O errors (e.g. reading a ROM file, talking to the terminal)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// program image would run into the stack region
    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    /// terminal could not be set up or torn down
    #[error("terminal error: {0}")]
    Terminal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
