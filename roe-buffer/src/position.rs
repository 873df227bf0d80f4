// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::fmt;
use std::ops::{Add, Sub};

/// A buffer offset expressed in both addressing systems.
///
/// Bytes are what I/O and hashing need; code points are what cursor and
/// selection math need. The two advance at different rates because UTF-8 is
/// variable width, so callers carry both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub byte: usize,
    pub codepoint: usize,
}

impl Position {
    pub const ZERO: Position = Position {
        byte: 0,
        codepoint: 0,
    };

    pub fn new(byte: usize, codepoint: usize) -> Self {
        Self { byte, codepoint }
    }

    /// Position just past `text` when starting from the beginning.
    pub fn of_str(text: &str) -> Self {
        Self {
            byte: text.len(),
            codepoint: text.chars().count(),
        }
    }

    pub fn saturating_sub(self, other: Position) -> Position {
        Position {
            byte: self.byte.saturating_sub(other.byte),
            codepoint: self.codepoint.saturating_sub(other.codepoint),
        }
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, other: Position) -> Position {
        Position {
            byte: self.byte + other.byte,
            codepoint: self.codepoint + other.codepoint,
        }
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, other: Position) -> Position {
        Position {
            byte: self.byte - other.byte,
            codepoint: self.codepoint - other.codepoint,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}b/{}cp", self.byte, self.codepoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_str_counts_both_units() {
        let pos = Position::of_str("ウクラ!");
        assert_eq!(pos, Position::new(10, 4));
    }

    #[test]
    fn test_arithmetic() {
        let a = Position::new(10, 4);
        let b = Position::new(3, 3);
        assert_eq!(a + b, Position::new(13, 7));
        assert_eq!(a - b, Position::new(7, 1));
        assert_eq!(b.saturating_sub(a), Position::ZERO);
    }
}
