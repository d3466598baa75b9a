use crate::error::Result;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// left-hand side of qwerty keyboard, laid out like the hex keypad
///   1 2 3 C      1 2 3 4
///   4 5 6 D  ->  q w e r
///   7 8 9 E      a s d f
///   A 0 B F      z x c v
const CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// Source of the 16 key snapshot the machine reads.
pub trait Input {
    /// which keys are down right now
    fn keys(&mut self) -> Result<[bool; 16]>;

    /// the user asked to stop
    fn quit_requested(&self) -> bool;
}

/// Keyboard input from the terminal, using crossterm.
///
/// Terminals only report presses (and auto-repeats), never releases, so a key
/// counts as down until `hold` has passed since its last press event.
pub struct TermInput {
    keymap: HashMap<char, u8>,
    last_seen: [Option<Instant>; 16],
    hold: Duration,
    quit: bool,
}

impl TermInput {
    pub fn new(hold: Duration) -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keymap: HashMap::from(CONVENTIONAL_KEYMAP),
            last_seen: [None; 16],
            hold,
            quit: false,
        })
    }

    fn read_events(&mut self) -> Result<()> {
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                self.key_event(evt.code, evt.modifiers, Instant::now());
            }
        }
        Ok(())
    }

    fn key_event(&mut self, code: KeyCode, modifiers: KeyModifiers, now: Instant) {
        match code {
            KeyCode::Esc => self.quit = true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
            KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()) {
                Some(mapped_key) => self.last_seen[*mapped_key as usize] = Some(now),
                None => debug!("can't map {:?} to a keypad key", key),
            },
            other => debug!("ignoring key {:?}", other),
        }
    }

    fn snapshot_at(&self, now: Instant) -> [bool; 16] {
        let mut keys = [false; 16];
        for (down, seen) in keys.iter_mut().zip(self.last_seen.iter()) {
            *down = matches!(seen, Some(t) if now.saturating_duration_since(*t) < self.hold);
        }
        keys
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        // best effort, we may already be unwinding
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for TermInput {
    fn keys(&mut self) -> Result<[bool; 16]> {
        self.read_events()?;
        Ok(self.snapshot_at(Instant::now()))
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

/// scripted Input for testing: hands out each snapshot once, then keeps
/// repeating the last one
#[derive(Debug, Default)]
pub struct DummyInput {
    frames: VecDeque<[bool; 16]>,
    current: [bool; 16],
    polls: usize,
    quit_after: Option<usize>,
}

impl DummyInput {
    pub fn new(frames: &[[bool; 16]]) -> Self {
        DummyInput {
            frames: frames.iter().copied().collect(),
            ..Default::default()
        }
    }

    /// ask to quit once `polls` snapshots have been taken
    pub fn quit_after(mut self, polls: usize) -> Self {
        self.quit_after = Some(polls);
        self
    }

    /// a snapshot with just these keys down
    pub fn pressed(keys: &[u8]) -> [bool; 16] {
        let mut snapshot = [false; 16];
        for k in keys {
            snapshot[(*k & 0xf) as usize] = true;
        }
        snapshot
    }
}

impl Input for DummyInput {
    fn keys(&mut self) -> Result<[bool; 16]> {
        if let Some(next) = self.frames.pop_front() {
            self.current = next;
        }
        self.polls += 1;
        Ok(self.current)
    }

    fn quit_requested(&self) -> bool {
        matches!(self.quit_after, Some(n) if self.polls >= n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term_input(hold_ms: u64) -> TermInput {
        // skip raw mode, there's no terminal under test
        TermInput {
            keymap: HashMap::from(CONVENTIONAL_KEYMAP),
            last_seen: [None; 16],
            hold: Duration::from_millis(hold_ms),
            quit: false,
        }
    }

    #[test]
    fn test_keymap_covers_every_key() {
        let mut seen = [false; 16];
        for (_, k) in CONVENTIONAL_KEYMAP {
            seen[k as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_press_is_held_then_released() {
        let mut input = term_input(100);
        let t = Instant::now();
        input.key_event(KeyCode::Char('w'), KeyModifiers::NONE, t);
        assert_eq!(input.snapshot_at(t + Duration::from_millis(50)), DummyInput::pressed(&[0x5]));
        assert_eq!(input.snapshot_at(t + Duration::from_millis(150)), [false; 16]);
    }

    #[test]
    fn test_uppercase_maps_like_lowercase() {
        let mut input = term_input(100);
        let t = Instant::now();
        input.key_event(KeyCode::Char('V'), KeyModifiers::SHIFT, t);
        assert!(input.snapshot_at(t)[0xf]);
    }

    #[test]
    fn test_unmapped_keys_are_ignored() {
        let mut input = term_input(100);
        let t = Instant::now();
        input.key_event(KeyCode::Char('p'), KeyModifiers::NONE, t);
        input.key_event(KeyCode::Enter, KeyModifiers::NONE, t);
        assert_eq!(input.snapshot_at(t), [false; 16]);
        assert!(!input.quit_requested());
    }

    #[test]
    fn test_escape_and_ctrl_c_quit() {
        let mut input = term_input(100);
        input.key_event(KeyCode::Char('c'), KeyModifiers::CONTROL, Instant::now());
        assert!(input.quit_requested());
        assert!(!input.snapshot_at(Instant::now())[0xb]);

        let mut input = term_input(100);
        input.key_event(KeyCode::Esc, KeyModifiers::NONE, Instant::now());
        assert!(input.quit_requested());
    }

    #[test]
    fn test_dummy_plays_script() -> Result<()> {
        let mut input = DummyInput::new(&[DummyInput::pressed(&[1]), DummyInput::pressed(&[2])])
            .quit_after(3);
        assert!(input.keys()?[1]);
        assert!(input.keys()?[2]);
        assert!(!input.quit_requested());
        assert!(input.keys()?[2]);
        assert!(input.quit_requested());
        Ok(())
    }
}
