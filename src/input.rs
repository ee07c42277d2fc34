//! Key presses accepted by the kiosk.

use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    SizeUp,
    SizeDown,
    ToggleHibernate,
    Preferences,
    Other(char),
}

impl Key {
    /// Maps one typed character to a key press. Whitespace is not a key.
    pub fn from_char(c: char) -> Option<Self> {
        if c.is_whitespace() {
            return None;
        }

        let key = match c {
            '0'..='9' => Key::Digit(c as u8 - b'0'),
            '+' | '=' => Key::SizeUp,
            '-' => Key::SizeDown,
            'q' | 'Q' => Key::ToggleHibernate,
            'p' | 'P' => Key::Preferences,
            other => Key::Other(other),
        };
        Some(key)
    }
}

/// Turns raw key input into key presses as soon as the bytes arrive.
/// Bytes that are not UTF-8 are dropped. A character split across two reads
/// is completed by the second one.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
}

impl KeyDecoder {
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Key> {
        self.pending.extend_from_slice(bytes);

        let mut keys = Vec::new();
        let mut consumed = 0;
        while consumed < self.pending.len() {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    keys.extend(text.chars().filter_map(Key::from_char));
                    consumed = self.pending.len();
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    let text = std::str::from_utf8(&rest[..valid]).unwrap_or_default();
                    keys.extend(text.chars().filter_map(Key::from_char));

                    match err.error_len() {
                        Some(invalid) => {
                            warn!("Dropping {invalid} byte(s) of invalid key input");
                            consumed += valid + invalid;
                        }
                        // Incomplete character; wait for the next read.
                        None => {
                            consumed += valid;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        keys
    }
}
