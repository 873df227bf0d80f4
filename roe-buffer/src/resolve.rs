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

//! Translation between buffer offsets and places in the piece chain.
//!
//! Both walks are linear in the number of pieces. Interactive editing keeps
//! the chain short, and the cached-piece fast path absorbs runs of nearby
//! edits without adding pieces at all.

use crate::error::{BufferError, Result};
use crate::piece::PieceChain;
use crate::position::Position;
use crate::utf8::{advance_codepoints, codepoints_before};
use crate::PieceId;

/// Where a byte offset falls in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub piece: PieceId,
    /// Offset within `piece`.
    pub offset: Position,
    /// Offset of the first byte of `piece` within the buffer.
    pub start: Position,
}

impl Location {
    /// The absolute buffer position this location names.
    pub fn position(&self) -> Position {
        self.start + self.offset
    }
}

impl PieceChain {
    /// Find the piece holding byte offset `byte`.
    ///
    /// An offset on a piece boundary resolves to the earlier piece with an
    /// offset equal to that piece's length, never to the later piece at 0.
    /// Offset 0 therefore always resolves to the begin sentinel. Offsets past
    /// the end, or inside an encoded code point, are errors.
    pub fn locate(&self, byte: usize) -> Result<Location> {
        let mut start = Position::ZERO;
        let mut cursor = Some(self.begin);
        while let Some(id) = cursor {
            let piece = &self[id];
            let len = piece.data.len();
            if byte <= start.byte + len {
                let within = byte - start.byte;
                let codepoints = if within == len {
                    Some(piece.codepoints)
                } else {
                    codepoints_before(&piece.data, within)
                };
                let codepoints =
                    codepoints.ok_or(BufferError::NotCharBoundary { offset: byte })?;
                return Ok(Location {
                    piece: id,
                    offset: Position::new(within, codepoints),
                    start,
                });
            }
            start = start + piece.len();
            cursor = piece.next;
        }
        Err(BufferError::WrongOffset {
            offset: byte,
            size: self.size().byte,
        })
    }

    /// Position of the `n`th code point, decoding inside the final piece.
    pub fn codepoint_to_position(&self, n: usize) -> Option<Position> {
        let mut start = Position::ZERO;
        let mut cursor = Some(self.begin);
        while let Some(id) = cursor {
            let piece = &self[id];
            if n <= start.codepoint + piece.codepoints {
                let (bytes, consumed) = advance_codepoints(&piece.data, n - start.codepoint);
                return Some(start + Position::new(bytes, consumed));
            }
            start = start + piece.len();
            cursor = piece.next;
        }
        None
    }

    /// Full position of byte offset `byte`.
    pub fn byte_to_position(&self, byte: usize) -> Result<Position> {
        self.locate(byte).map(|location| location.position())
    }
}
