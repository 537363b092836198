//! Terminal key codes to physical key identifiers.
//!
//! Terminals report characters, not physical keys, so the mapping goes
//! through the character: `a`/`A` → `KeyA`, `7` → `Digit7`, and the
//! US shifted digit row `!@#$%^&*()` back to `Digit1`..`Digit0`. A digit
//! pressed bare and released with Shift held then still finds its key.

use crossterm::event::KeyCode;
use crushkeys::KeyId;

/// US layout: Shift + `1234567890`.
const SHIFTED_DIGITS: [char; 10] = ['!', '@', '#', '$', '%', '^', '&', '*', '(', ')'];

fn unshift_digit(c: char) -> Option<char> {
    let index = SHIFTED_DIGITS.iter().position(|&shifted| shifted == c)?;
    "1234567890".chars().nth(index)
}

pub fn key_id(code: KeyCode) -> Option<KeyId> {
    match code {
        KeyCode::Char(c) if c.is_ascii_alphabetic() => {
            Some(KeyId::new(format!("Key{}", c.to_ascii_uppercase())))
        }
        KeyCode::Char(c) if c.is_ascii_digit() => Some(KeyId::new(format!("Digit{c}"))),
        KeyCode::Char(c) => unshift_digit(c).map(|digit| KeyId::new(format!("Digit{digit}"))),
        _ => None,
    }
}
