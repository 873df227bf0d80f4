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

use thiserror::Error;

/// Errors returned by buffer edits and offset resolution.
///
/// A failed operation never leaves the buffer partially modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("byte offset {offset} is past the end of the buffer ({size} bytes)")]
    WrongOffset { offset: usize, size: usize },
    #[error("code point {codepoint} is past the end of the buffer ({count} code points)")]
    CodepointOutOfRange { codepoint: usize, count: usize },
    #[error("byte offset {offset} falls inside an encoded code point")]
    NotCharBoundary { offset: usize },
}

pub type Result<T> = std::result::Result<T, BufferError>;
