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

//! Piece-table text storage with transactional undo/redo.
//!
//! Text lives in a doubly-linked chain of pieces held in a slot arena. Every
//! mutation, including undo and redo, is a single span swap that relinks the
//! neighbours of two runs of pieces. Offsets are tracked both in bytes and in
//! code points; see [`Position`].

use slotmap::new_key_type;

pub mod buffer;
pub mod config;
pub mod error;
pub mod piece;
pub mod position;
pub mod resolve;
pub mod undo;
pub mod utf8;

new_key_type! {
    pub struct PieceId;
}

pub use buffer::{Buffer, SharedBuffer};
pub use config::BufferConfig;
pub use error::{BufferError, Result};
pub use position::Position;
pub use undo::{EditEvent, UndoResult};
