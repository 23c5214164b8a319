//! Toolkit-independent input events and their textual script form.
//!
//! Script grammar, one event per line, coordinates in window pixels:
//!
//! | line          | event                         |
//! |---------------|-------------------------------|
//! | `move X Y`    | [`InputEvent::PointerMove`]   |
//! | `press X Y`   | [`InputEvent::PrimaryDown`]   |
//! | `drag X Y`    | [`InputEvent::PrimaryDrag`]   |
//! | `release`     | [`InputEvent::PrimaryUp`]     |
//! | `erase X Y`   | [`InputEvent::SecondaryDown`] |
//! | `undo`        | [`InputEvent::Undo`]          |
//! | `next`        | navigate to next stimulus     |
//! | `prev`        | navigate to previous stimulus |
//! | `exit`        | end the session               |

use std::str::FromStr;

/// Where the session goes after the current stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
    Exit,
}

/// One pointer or keyboard event, positions in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerMove([f64; 2]),
    PrimaryDown([f64; 2]),
    PrimaryDrag([f64; 2]),
    PrimaryUp,
    SecondaryDown([f64; 2]),
    Undo,
    Navigate(Direction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEventError {
    pub line: String,
    pub reason: &'static str,
}

impl std::fmt::Display for ParseEventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid event '{}': {}", self.line, self.reason)
    }
}

impl std::error::Error for ParseEventError {}

impl FromStr for InputEvent {
    type Err = ParseEventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseEventError {
            line: s.trim().to_string(),
            reason,
        };
        let mut tokens = s.split_whitespace();
        let command = tokens.next().ok_or_else(|| err("empty line"))?;
        let args: Vec<&str> = tokens.collect();

        let position = || -> Result<[f64; 2], ParseEventError> {
            match args.as_slice() {
                [x, y] => {
                    let x: f64 = x.parse().map_err(|_| err("x is not a number"))?;
                    let y: f64 = y.parse().map_err(|_| err("y is not a number"))?;
                    if x.is_finite() && y.is_finite() {
                        Ok([x, y])
                    } else {
                        Err(err("coordinates must be finite"))
                    }
                }
                _ => Err(err("expected two coordinates")),
            }
        };
        let bare = |event| {
            if args.is_empty() {
                Ok(event)
            } else {
                Err(err("unexpected arguments"))
            }
        };

        match command.to_ascii_lowercase().as_str() {
            "move" => position().map(InputEvent::PointerMove),
            "press" => position().map(InputEvent::PrimaryDown),
            "drag" => position().map(InputEvent::PrimaryDrag),
            "erase" => position().map(InputEvent::SecondaryDown),
            "release" => bare(InputEvent::PrimaryUp),
            "undo" => bare(InputEvent::Undo),
            "next" => bare(InputEvent::Navigate(Direction::Next)),
            "prev" | "previous" => bare(InputEvent::Navigate(Direction::Previous)),
            "exit" => bare(InputEvent::Navigate(Direction::Exit)),
            _ => Err(err("unknown command")),
        }
    }
}
