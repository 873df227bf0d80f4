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
use std::io;
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::config::BufferConfig;
use crate::error::{BufferError, Result};
use crate::piece::{PieceChain, Span};
use crate::position::Position;
use crate::resolve::Location;
use crate::undo::{Action, Change, Dropped, EditEvent, UndoLog, UndoResult};
use crate::utf8::{count_codepoints, is_char_boundary, is_continuation, split_codepoints};
use crate::PieceId;

/// A text buffer backed by a piece chain, with undo/redo.
///
/// Edits take a [`Position`]; only its byte component selects where the edit
/// lands; code point offsets are recomputed from the pieces themselves.
pub struct Buffer {
    chain: PieceChain,
    log: UndoLog,
    /// Piece the open action may keep editing in place.
    cached: Option<PieceId>,
    /// Backing identity (usually a file path)
    name: String,
    config: BufferConfig,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for Buffer {
    fn from(text: &str) -> Self {
        Self::from_bytes(text.as_bytes().to_vec())
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("size", &self.chain.size())
            .field("pieces", &self.chain.piece_count())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes()))
    }
}

impl Buffer {
    pub fn new() -> Self {
        Self::with_config(BufferConfig::default())
    }

    pub fn with_config(config: BufferConfig) -> Self {
        Self {
            chain: PieceChain::new(),
            log: UndoLog::new(config.max_history),
            cached: None,
            name: String::new(),
            config,
        }
    }

    /// Buffer whose initial content is not part of the undo history.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mut buffer = Self::new();
        buffer.chain = PieceChain::with_content(data);
        buffer
    }

    pub fn chain(&self) -> &PieceChain {
        &self.chain
    }

    // === EDITING ===

    /// Insert `data`, which holds `codepoints` code points, at `pos`.
    pub fn insert(&mut self, pos: Position, data: &[u8], codepoints: usize, seq: u64) -> Result<()> {
        let location = self.locate(pos)?;
        if data.is_empty() {
            return Ok(());
        }
        debug_assert_eq!(
            codepoints,
            count_codepoints(data),
            "insert was given a wrong code point count"
        );
        let len = Position::new(data.len(), codepoints);

        if self.cached == Some(location.piece)
            && self.log.open_seq() == Some(seq)
            && self.may_grow(location.piece, data.len())
            && is_char_boundary(&self.chain[location.piece].data, location.offset.byte)
            && !is_continuation(data[0])
        {
            trace!(at = %location.position(), bytes = data.len(), "insert into cached piece");
            self.chain
                .splice_into(location.piece, location.offset.byte, data, codepoints);
            if let Some(change) = self.log.last_change_mut() {
                change.new.len = change.new.len + len;
            }
            self.check_invariants();
            return Ok(());
        }

        let at = location.position();
        let piece = &self.chain[location.piece];
        let (old, new, inserted) = if location.offset.byte == piece.data.len() {
            // Between two pieces: splice in a single new piece.
            let next = piece.next;
            let id = self.chain.alloc(data.to_vec(), codepoints);
            self.chain.pieces[id].prev = Some(location.piece);
            self.chain.pieces[id].next = next;
            (Span::empty(), Span::single(id, len), id)
        } else {
            // Inside a piece: replace it with before + data + after.
            let split = location.offset.byte;
            let (head_cp, tail_cp) = split_codepoints(&piece.data, split, piece.codepoints);
            let head = piece.data[..split].to_vec();
            let tail = piece.data[split..].to_vec();
            let (prev, next, old_len) = (piece.prev, piece.next, piece.len());
            let new_len =
                Position::new(head.len(), head_cp) + len + Position::new(tail.len(), tail_cp);

            let before = self.chain.alloc(head, head_cp);
            let middle = self.chain.alloc(data.to_vec(), codepoints);
            let after = self.chain.alloc(tail, tail_cp);
            self.chain.pieces[before].prev = prev;
            self.chain.link(before, middle);
            self.chain.link(middle, after);
            self.chain.pieces[after].next = next;
            (
                Span::single(location.piece, old_len),
                Span::run(before, after, new_len),
                middle,
            )
        };

        self.apply(Change { old, new, at }, seq);
        self.cached = Some(inserted);
        self.check_invariants();
        Ok(())
    }

    pub fn insert_str(&mut self, pos: Position, text: &str, seq: u64) -> Result<()> {
        self.insert(pos, text.as_bytes(), text.chars().count(), seq)
    }

    /// Remove the text in `[start, end)`.
    ///
    /// An empty or inverted range does nothing, whatever its offsets; an end
    /// past the buffer is clamped to the buffer's end. Both ends must fall
    /// between code points.
    pub fn delete(&mut self, start: Position, end: Position, seq: u64) -> Result<()> {
        if end.byte <= start.byte {
            return Ok(());
        }
        let location = self.locate(start)?;
        let end_byte = end.byte.min(self.chain.size().byte);
        if end_byte <= start.byte {
            return Ok(());
        }
        self.chain.locate(end_byte)?;
        let mut remaining = end_byte - start.byte;

        let piece = &self.chain[location.piece];
        if self.cached == Some(location.piece)
            && self.log.open_seq() == Some(seq)
            && location.offset.byte + remaining <= piece.data.len()
            && is_char_boundary(&piece.data, location.offset.byte)
            && is_char_boundary(&piece.data, location.offset.byte + remaining)
        {
            trace!(at = %location.position(), bytes = remaining, "delete from cached piece");
            let removed = self
                .chain
                .cut_from(location.piece, location.offset.byte, remaining);
            if let Some(change) = self.log.last_change_mut() {
                change.new.len = change.new.len - removed;
            }
            self.check_invariants();
            return Ok(());
        }
        self.cached = None;

        // A cut on a piece boundary starts consuming at the next piece;
        // otherwise the head of the current piece survives as a fragment.
        let (mut cursor, mut skip) = if location.offset.byte == piece.data.len() {
            (piece.next, 0)
        } else {
            (Some(location.piece), location.offset.byte)
        };
        let keep_head = skip;
        let mut first = None;
        let mut last = None;
        let mut keep_tail_from = None;
        let mut old_len = Position::ZERO;
        while let Some(id) = cursor {
            if id == self.chain.end() || remaining == 0 {
                break;
            }
            let piece = &self.chain[id];
            first.get_or_insert(id);
            last = Some(id);
            old_len = old_len + piece.len();
            let available = piece.data.len() - skip;
            if remaining < available {
                keep_tail_from = Some(skip + remaining);
                break;
            }
            remaining -= available;
            skip = 0;
            cursor = piece.next;
        }
        let (Some(first), Some(last)) = (first, last) else {
            return Ok(());
        };

        let head = (keep_head > 0).then(|| {
            let piece = &self.chain[first];
            let (head_cp, _) = split_codepoints(&piece.data, keep_head, piece.codepoints);
            (piece.data[..keep_head].to_vec(), head_cp)
        });
        let tail = keep_tail_from.map(|from| {
            let piece = &self.chain[last];
            let (_, tail_cp) = split_codepoints(&piece.data, from, piece.codepoints);
            (piece.data[from..].to_vec(), tail_cp)
        });
        let (prev, next) = (self.chain[first].prev, self.chain[last].next);
        let before = head.map(|(data, codepoints)| self.chain.alloc(data, codepoints));
        let after = tail.map(|(data, codepoints)| self.chain.alloc(data, codepoints));

        let new_len = before
            .iter()
            .chain(after.iter())
            .fold(Position::ZERO, |len, id| len + self.chain[*id].len());
        let new = match (before, after) {
            (Some(before), Some(after)) => {
                self.chain.pieces[before].prev = prev;
                self.chain.link(before, after);
                self.chain.pieces[after].next = next;
                Span::run(before, after, new_len)
            }
            (Some(fragment), None) | (None, Some(fragment)) => {
                self.chain.pieces[fragment].prev = prev;
                self.chain.pieces[fragment].next = next;
                Span::single(fragment, new_len)
            }
            (None, None) => Span::empty(),
        };
        let old = Span::run(first, last, old_len);

        let at = location.position();
        self.apply(Change { old, new, at }, seq);
        self.check_invariants();
        Ok(())
    }

    /// Record `change` in the undo log and perform its swap.
    fn apply(&mut self, change: Change, seq: u64) {
        let dropped = self.log.record(change, seq);
        self.reclaim(dropped);
        self.chain.swap(&change.old, &change.new);
    }

    fn may_grow(&self, piece: PieceId, by: usize) -> bool {
        let limit = self.config.max_coalesce_bytes;
        limit == 0 || self.chain[piece].data.len() + by <= limit
    }

    /// Return the pieces of dropped actions to the arena.
    fn reclaim(&mut self, dropped: Dropped) {
        if dropped.is_empty() {
            return;
        }
        let before = self.chain.allocated();
        for action in &dropped.redo {
            if let Action::Edit { changes, .. } = action {
                for change in changes {
                    self.chain.free(&change.new);
                }
            }
        }
        for action in &dropped.expired {
            if let Action::Edit { changes, .. } = action {
                for change in changes {
                    self.chain.free(&change.old);
                }
            }
        }
        debug!(
            freed = before - self.chain.allocated(),
            "reclaimed pieces of dropped actions"
        );
    }

    // === UNDO/REDO OPERATIONS ===

    /// Close the open action; the next edit starts a new undo step.
    pub fn set_undo_boundary(&mut self) {
        self.cached = None;
        self.log.close();
    }

    /// Revert the most recent action.
    pub fn undo(&mut self) -> UndoResult {
        self.cached = None;
        let Some(action) = self.log.step_back() else {
            return UndoResult::default();
        };
        let mut result = UndoResult {
            meaningful: true,
            ..UndoResult::default()
        };
        match action {
            Action::Edit { changes, seq } => {
                debug!(seq, changes = changes.len(), "undo");
                for change in changes.iter().rev() {
                    self.chain.swap(&change.new, &change.old);
                    report(&self.chain, change.at, change.new.len, change.old.len, &mut result);
                }
            }
            Action::Rename { previous, seq, .. } => {
                debug!(seq, name = %previous, "undo rename");
                self.name = previous.clone();
                result.events.push(EditEvent::Renamed {
                    name: previous.clone(),
                });
            }
        }
        result.next_seq = self.log.undo_seq();
        self.check_invariants();
        result
    }

    /// Reapply the next undone action.
    pub fn redo(&mut self) -> UndoResult {
        self.cached = None;
        let Some(action) = self.log.step_forward() else {
            return UndoResult::default();
        };
        let mut result = UndoResult {
            meaningful: true,
            ..UndoResult::default()
        };
        match action {
            Action::Edit { changes, seq } => {
                debug!(seq, changes = changes.len(), "redo");
                for change in changes {
                    self.chain.swap(&change.old, &change.new);
                    report(&self.chain, change.at, change.old.len, change.new.len, &mut result);
                }
            }
            Action::Rename { next, seq, .. } => {
                debug!(seq, name = %next, "redo rename");
                self.name = next.clone();
                result.events.push(EditEvent::Renamed { name: next.clone() });
            }
        }
        result.next_seq = self.log.redo_seq();
        self.check_invariants();
        result
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    /// Sequence of the action `undo` would revert.
    pub fn undo_seq(&self) -> Option<u64> {
        self.log.undo_seq()
    }

    /// Sequence of the action `redo` would reapply.
    pub fn redo_seq(&self) -> Option<u64> {
        self.log.redo_seq()
    }

    pub fn undo_count(&self) -> usize {
        self.log.undo_count()
    }

    pub fn redo_count(&self) -> usize {
        self.log.redo_count()
    }

    /// Forget all history, keeping the content.
    pub fn clear_history(&mut self) {
        self.cached = None;
        let dropped = self.log.clear();
        self.reclaim(dropped);
    }

    // === NAME AND CLEAN STATE ===

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change the backing name as an undoable action of its own.
    pub fn rename(&mut self, name: impl Into<String>, seq: u64) {
        self.cached = None;
        let next = name.into();
        let previous = std::mem::replace(&mut self.name, next.clone());
        let dropped = self.log.record_rename(previous, next, seq);
        self.reclaim(dropped);
    }

    /// Record the current state as saved.
    pub fn mark_clean(&mut self) {
        self.cached = None;
        self.log.mark_clean();
    }

    /// Whether the undo position differs from the last clean mark.
    pub fn is_dirty(&self) -> bool {
        self.log.is_dirty()
    }

    // === READING AND OFFSETS ===

    pub fn size(&self) -> usize {
        self.chain.size().byte
    }

    pub fn codepoint_count(&self) -> usize {
        self.chain.size().codepoint
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn piece_count(&self) -> usize {
        self.chain.piece_count()
    }

    /// Copy bytes starting at `offset` into `buf`. Returns `Ok(0)` at the end.
    pub fn read_at(&self, buf: &mut [u8], offset: usize) -> io::Result<usize> {
        Ok(read_chain(&self.chain, buf, offset))
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        for (_, piece) in self.chain.iter() {
            out.extend_from_slice(piece.data());
        }
        out
    }

    /// Resolve `pos` to the piece holding it.
    pub fn locate(&self, pos: Position) -> Result<Location> {
        self.chain.locate(pos.byte)
    }

    pub fn position_for_codepoint(&self, codepoint: usize) -> Result<Position> {
        self.chain
            .codepoint_to_position(codepoint)
            .ok_or(BufferError::CodepointOutOfRange {
                codepoint,
                count: self.codepoint_count(),
            })
    }

    pub fn position_for_byte(&self, byte: usize) -> Result<Position> {
        self.chain.byte_to_position(byte)
    }

    fn check_invariants(&self) {
        #[cfg(debug_assertions)]
        self.chain.validate();
    }
}

/// Describe one replayed swap from its span lengths.
fn report(
    chain: &PieceChain,
    at: Position,
    removed: Position,
    inserted: Position,
    result: &mut UndoResult,
) {
    if inserted.byte > removed.byte {
        let len = inserted.saturating_sub(removed);
        let mut text = vec![0; len.byte];
        let read = read_chain(chain, &mut text, at.byte);
        text.truncate(read);
        result.events.push(EditEvent::Inserted { at, text });
        result.selection_start = at;
        result.selection_end = at + len;
    } else if removed.byte > inserted.byte {
        let len = removed.saturating_sub(inserted);
        result.events.push(EditEvent::Deleted {
            start: at,
            end: at + len,
        });
        result.selection_start = at;
        result.selection_end = at;
    }
}

fn read_chain(chain: &PieceChain, buf: &mut [u8], offset: usize) -> usize {
    let mut start = 0;
    let mut written = 0;
    for (_, piece) in chain.iter() {
        if written == buf.len() {
            break;
        }
        let end = start + piece.data.len();
        let cursor = offset + written;
        if cursor < end {
            let from = cursor - start;
            let n = (piece.data.len() - from).min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&piece.data[from..from + n]);
            written += n;
        }
        start = end;
    }
    written
}

/// Buffer handle that serializes access behind one lock.
/// Cloning shares the same buffer.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<RwLock<Buffer>>,
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer").finish_non_exhaustive()
    }
}

impl From<Buffer> for SharedBuffer {
    fn from(buffer: Buffer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(buffer)),
        }
    }
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a closure with read access to the buffer
    pub fn with_read<R>(&self, f: impl FnOnce(&Buffer) -> R) -> R {
        f(&self
            .inner
            .read()
            .expect("Buffer lock should not be poisoned"))
    }

    /// Execute a closure with write access to the buffer
    pub fn with_write<R>(&self, f: impl FnOnce(&mut Buffer) -> R) -> R {
        f(&mut self
            .inner
            .write()
            .expect("Buffer lock should not be poisoned"))
    }

    pub fn insert_str(&self, pos: Position, text: &str, seq: u64) -> Result<()> {
        self.with_write(|b| b.insert_str(pos, text, seq))
    }

    pub fn delete(&self, start: Position, end: Position, seq: u64) -> Result<()> {
        self.with_write(|b| b.delete(start, end, seq))
    }

    pub fn undo(&self) -> UndoResult {
        self.with_write(|b| b.undo())
    }

    pub fn redo(&self) -> UndoResult {
        self.with_write(|b| b.redo())
    }

    pub fn set_undo_boundary(&self) {
        self.with_write(|b| b.set_undo_boundary())
    }

    pub fn mark_clean(&self) {
        self.with_write(|b| b.mark_clean())
    }

    pub fn is_dirty(&self) -> bool {
        self.with_read(|b| b.is_dirty())
    }

    pub fn position_for_codepoint(&self, codepoint: usize) -> Result<Position> {
        self.with_read(|b| b.position_for_codepoint(codepoint))
    }

    pub fn size(&self) -> usize {
        self.with_read(|b| b.size())
    }

    pub fn codepoint_count(&self) -> usize {
        self.with_read(|b| b.codepoint_count())
    }

    pub fn content(&self) -> String {
        self.with_read(|b| b.to_string())
    }
}
