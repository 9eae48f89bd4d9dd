pub const KEY_ESC: i32 = 27;

/// Action bound to a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Select,
    /// Zero-based index into the available algorithms (key `1` is index `0`).
    Algorithm(usize),
    Ignore,
}

impl Command {
    pub fn from_key(key: i32) -> Self {
        let key = key & 0xFF;
        if key == KEY_ESC {
            return Command::Quit;
        }

        match key as u8 {
            b'q' => Command::Quit,
            b's' => Command::Select,
            d @ b'1'..=b'9' => Command::Algorithm((d - b'1') as usize),
            _ => Command::Ignore,
        }
    }
}
