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

//! The piece chain: an arena of text runs linked between two sentinels.
//!
//! Pieces are never freed when they leave the chain. Undo brings them back by
//! replaying the swap that removed them, so a piece stays in the arena until
//! the undo log drops every action that could resurrect it.

use slotmap::SlotMap;
use std::ops::Index;
use tracing::trace;

use crate::position::Position;
use crate::utf8::count_codepoints;
use crate::PieceId;

/// One contiguous run of buffer content.
#[derive(Debug, Clone)]
pub struct Piece {
    /// Allocation order, for debugging only.
    pub(crate) serial: u64,
    pub(crate) prev: Option<PieceId>,
    pub(crate) next: Option<PieceId>,
    pub(crate) data: Vec<u8>,
    pub(crate) codepoints: usize,
}

impl Piece {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Length in both units.
    pub fn len(&self) -> Position {
        Position::new(self.data.len(), self.codepoints)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// An inclusive run of linked pieces, or nothing at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub(crate) start: Option<PieceId>,
    pub(crate) end: Option<PieceId>,
    /// Total length of the run.
    pub(crate) len: Position,
}

impl Span {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(piece: PieceId, len: Position) -> Self {
        Self::run(piece, piece, len)
    }

    pub fn run(start: PieceId, end: PieceId, len: Position) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    pub fn start(&self) -> Option<PieceId> {
        self.start
    }

    pub fn end(&self) -> Option<PieceId> {
        self.end
    }

    pub fn len(&self) -> Position {
        self.len
    }
}

#[derive(Debug)]
pub struct PieceChain {
    pub(crate) pieces: SlotMap<PieceId, Piece>,
    pub(crate) begin: PieceId,
    pub(crate) end: PieceId,
    next_serial: u64,
    size: Position,
}

impl Default for PieceChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<PieceId> for PieceChain {
    type Output = Piece;

    fn index(&self, id: PieceId) -> &Piece {
        &self.pieces[id]
    }
}

impl PieceChain {
    pub fn new() -> Self {
        let mut chain = Self {
            pieces: SlotMap::with_key(),
            begin: PieceId::default(),
            end: PieceId::default(),
            next_serial: 0,
            size: Position::ZERO,
        };
        chain.begin = chain.alloc(Vec::new(), 0);
        chain.end = chain.alloc(Vec::new(), 0);
        chain.link(chain.begin, chain.end);
        chain
    }

    /// Chain holding `data` as a single piece.
    pub fn with_content(data: Vec<u8>) -> Self {
        let mut chain = Self::new();
        if data.is_empty() {
            return chain;
        }
        let codepoints = count_codepoints(&data);
        let piece = chain.alloc(data, codepoints);
        chain.link(chain.begin, piece);
        chain.link(piece, chain.end);
        chain.size = chain.pieces[piece].len();
        chain
    }

    pub fn begin(&self) -> PieceId {
        self.begin
    }

    pub fn end(&self) -> PieceId {
        self.end
    }

    /// Total length of the live content.
    pub fn size(&self) -> Position {
        self.size
    }

    /// Pieces held by the arena, live or not, excluding the sentinels.
    pub fn allocated(&self) -> usize {
        self.pieces.len() - 2
    }

    pub(crate) fn alloc(&mut self, data: Vec<u8>, codepoints: usize) -> PieceId {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.pieces.insert(Piece {
            serial,
            prev: None,
            next: None,
            data,
            codepoints,
        })
    }

    pub(crate) fn link(&mut self, a: PieceId, b: PieceId) {
        self.pieces[a].next = Some(b);
        self.pieces[b].prev = Some(a);
    }

    fn neighbours(&self, span: &Span) -> Option<(PieceId, PieceId)> {
        let prev = self.pieces[span.start?].prev?;
        let next = self.pieces[span.end?].next?;
        Some((prev, next))
    }

    /// Replace the run `old` with the run `new`.
    ///
    /// This is the only place the chain's topology changes. When `old` is
    /// empty, `new` must already point at its neighbours; that is how pure
    /// insertions and the redo of deletions find their place.
    pub fn swap(&mut self, old: &Span, new: &Span) {
        trace!(?old, ?new, "swap spans");
        match (old.is_empty(), new.start.zip(new.end)) {
            (true, None) => return,
            (true, Some((first, last))) => {
                let (prev, next) = self
                    .neighbours(new)
                    .expect("inserted span must be pre-linked to its neighbours");
                self.pieces[prev].next = Some(first);
                self.pieces[next].prev = Some(last);
            }
            (false, None) => {
                let (prev, next) = self
                    .neighbours(old)
                    .expect("removed span must lie between the sentinels");
                self.link(prev, next);
            }
            (false, Some((first, last))) => {
                let (prev, next) = self
                    .neighbours(old)
                    .expect("removed span must lie between the sentinels");
                self.link(prev, first);
                self.link(last, next);
            }
        }
        self.size = self.size - old.len + new.len;
    }

    /// Insert bytes into a live piece in place.
    pub(crate) fn splice_into(&mut self, id: PieceId, at: usize, data: &[u8], codepoints: usize) {
        let piece = &mut self.pieces[id];
        piece.data.splice(at..at, data.iter().copied());
        piece.codepoints += codepoints;
        self.size = self.size + Position::new(data.len(), codepoints);
    }

    /// Remove `len` bytes from a live piece in place, returning what was removed.
    pub(crate) fn cut_from(&mut self, id: PieceId, at: usize, len: usize) -> Position {
        let piece = &mut self.pieces[id];
        let codepoints = count_codepoints(&piece.data[at..at + len]);
        piece.data.drain(at..at + len);
        piece.codepoints -= codepoints;
        let removed = Position::new(len, codepoints);
        self.size = self.size - removed;
        removed
    }

    /// Drop the pieces of a span that nothing can reach any more.
    pub(crate) fn free(&mut self, span: &Span) {
        let (Some(mut id), Some(last)) = (span.start, span.end) else {
            return;
        };
        loop {
            let Some(piece) = self.pieces.remove(id) else {
                return;
            };
            if id == last {
                return;
            }
            match piece.next {
                Some(next) => id = next,
                None => return,
            }
        }
    }

    /// Live pieces in order, excluding the sentinels.
    pub fn iter(&self) -> PieceIter<'_> {
        PieceIter {
            chain: self,
            cursor: self.pieces[self.begin].next,
        }
    }

    /// Number of live pieces between the sentinels.
    pub fn piece_count(&self) -> usize {
        self.iter().count()
    }

    /// Check the chain's structural invariants, panicking on the first breach.
    ///
    /// A breach means split or merge logic is broken, and continuing would
    /// corrupt later edits. Buffers only run this in debug builds.
    pub fn validate(&self) {
        assert!(self.pieces[self.begin].prev.is_none(), "begin sentinel has a predecessor");
        assert!(self.pieces[self.end].next.is_none(), "end sentinel has a successor");
        assert!(self.pieces[self.begin].data.is_empty(), "begin sentinel holds data");
        assert!(self.pieces[self.end].data.is_empty(), "end sentinel holds data");

        let mut total = Position::ZERO;
        let mut prev = self.begin;
        let mut cursor = self.pieces[self.begin].next;
        while let Some(id) = cursor {
            let piece = &self.pieces[id];
            assert_eq!(piece.prev, Some(prev), "piece #{} has a broken back link", piece.serial);
            assert_eq!(
                piece.codepoints,
                count_codepoints(&piece.data),
                "piece #{} caches the wrong code point count",
                piece.serial
            );
            total = total + piece.len();
            prev = id;
            cursor = piece.next;
        }
        assert_eq!(prev, self.end, "chain does not terminate at the end sentinel");
        assert_eq!(total, self.size, "cached size disagrees with the pieces");
    }
}

pub struct PieceIter<'a> {
    chain: &'a PieceChain,
    cursor: Option<PieceId>,
}

impl<'a> Iterator for PieceIter<'a> {
    type Item = (PieceId, &'a Piece);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        if id == self.chain.end {
            return None;
        }
        let piece = &self.chain.pieces[id];
        self.cursor = piece.next;
        Some((id, piece))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(chain: &PieceChain) -> String {
        let bytes: Vec<u8> = chain.iter().flat_map(|(_, p)| p.data.iter().copied()).collect();
        String::from_utf8(bytes).unwrap()
    }

    fn piece(chain: &mut PieceChain, s: &str) -> (PieceId, Position) {
        let id = chain.alloc(s.as_bytes().to_vec(), s.chars().count());
        (id, Position::of_str(s))
    }

    #[test]
    fn test_new_chain_is_empty() {
        let chain = PieceChain::new();
        assert_eq!(chain.piece_count(), 0);
        assert_eq!(chain.size(), Position::ZERO);
        assert_eq!(chain[chain.begin()].next, Some(chain.end()));
        chain.validate();
    }

    #[test]
    fn test_swap_empty_spans_is_noop() {
        let mut chain = PieceChain::with_content(b"hello".to_vec());
        chain.swap(&Span::empty(), &Span::empty());
        assert_eq!(text(&chain), "hello");
        chain.validate();
    }

    #[test]
    fn test_swap_pure_insert_and_delete() {
        let mut chain = PieceChain::with_content(b"hello".to_vec());
        let (first, _) = chain.iter().next().map(|(id, p)| (id, p.len())).unwrap();

        let (world, len) = piece(&mut chain, " world");
        chain.pieces[world].prev = Some(first);
        chain.pieces[world].next = Some(chain.end());
        let inserted = Span::single(world, len);

        chain.swap(&Span::empty(), &inserted);
        assert_eq!(text(&chain), "hello world");
        assert_eq!(chain.size(), Position::new(11, 11));
        chain.validate();

        chain.swap(&inserted, &Span::empty());
        assert_eq!(text(&chain), "hello");
        chain.validate();

        // The removed piece still knows its neighbours, so it can come back.
        chain.swap(&Span::empty(), &inserted);
        assert_eq!(text(&chain), "hello world");
        chain.validate();
    }

    #[test]
    fn test_swap_replacement_round_trip() {
        let mut chain = PieceChain::with_content("abcウ".as_bytes().to_vec());
        let (original, original_len) = chain.iter().next().map(|(id, p)| (id, p.len())).unwrap();
        let old = Span::single(original, original_len);

        let (a, a_len) = piece(&mut chain, "a");
        let (x, x_len) = piece(&mut chain, "XY");
        let (rest, rest_len) = piece(&mut chain, "bcウ");
        chain.link(a, x);
        chain.link(x, rest);
        let new = Span::run(a, rest, a_len + x_len + rest_len);

        chain.swap(&old, &new);
        assert_eq!(text(&chain), "aXYbcウ");
        assert_eq!(chain.piece_count(), 3);
        chain.validate();

        chain.swap(&new, &old);
        assert_eq!(text(&chain), "abcウ");
        assert_eq!(chain.piece_count(), 1);
        chain.validate();
    }

    #[test]
    fn test_free_removes_span_from_arena() {
        let mut chain = PieceChain::new();
        let (a, a_len) = piece(&mut chain, "a");
        let (b, b_len) = piece(&mut chain, "b");
        chain.link(a, b);
        assert_eq!(chain.allocated(), 2);
        chain.free(&Span::run(a, b, a_len + b_len));
        assert_eq!(chain.allocated(), 0);
    }

    #[test]
    fn test_splice_and_cut_in_place() {
        let mut chain = PieceChain::with_content(b"ac".to_vec());
        let (id, _) = chain.iter().next().map(|(id, p)| (id, p.len())).unwrap();
        chain.splice_into(id, 1, "ウ".as_bytes(), 1);
        assert_eq!(text(&chain), "aウc");
        assert_eq!(chain.size(), Position::new(5, 3));
        let removed = chain.cut_from(id, 1, 3);
        assert_eq!(removed, Position::new(3, 1));
        assert_eq!(text(&chain), "ac");
        chain.validate();
    }
}
