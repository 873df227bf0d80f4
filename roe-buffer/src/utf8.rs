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

//! Code point accounting over raw piece bytes.
//!
//! Pieces hold bytes, not `str`, so these helpers must give an answer for any
//! input. A malformed or truncated sequence counts as one code point per
//! offending byte, which keeps `count_codepoints` and `advance_codepoints`
//! in agreement for every byte string.

/// Width of the sequence introduced by `lead`, or 1 if `lead` cannot start one.
pub fn sequence_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

pub fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

pub fn is_char_boundary(bytes: &[u8], index: usize) -> bool {
    index == 0 || index >= bytes.len() || !is_continuation(bytes[index])
}

/// Length of the code point starting at `bytes[index]`.
fn decode_width(bytes: &[u8], index: usize) -> usize {
    let width = sequence_len(bytes[index]);
    if width == 1 || index + width > bytes.len() {
        return 1;
    }
    if bytes[index + 1..index + width].iter().all(|&b| is_continuation(b)) {
        width
    } else {
        1
    }
}

pub fn count_codepoints(bytes: &[u8]) -> usize {
    let mut index = 0;
    let mut count = 0;
    while index < bytes.len() {
        index += decode_width(bytes, index);
        count += 1;
    }
    count
}

/// Code points decoded before byte `at`, or `None` when `at` falls inside one.
pub fn codepoints_before(bytes: &[u8], at: usize) -> Option<usize> {
    let mut index = 0;
    let mut count = 0;
    while index < at {
        index += decode_width(bytes, index);
        count += 1;
    }
    (index == at).then_some(count)
}

/// Walk forward over at most `n` code points.
/// Returns the byte offset reached and how many code points were consumed.
pub fn advance_codepoints(bytes: &[u8], n: usize) -> (usize, usize) {
    let mut index = 0;
    let mut consumed = 0;
    while consumed < n && index < bytes.len() {
        index += decode_width(bytes, index);
        consumed += 1;
    }
    (index, consumed)
}

/// Code point counts of `bytes[..at]` and `bytes[at..]`, given the total.
///
/// On a character boundary only the shorter side needs scanning.
pub fn split_codepoints(bytes: &[u8], at: usize, total: usize) -> (usize, usize) {
    if !is_char_boundary(bytes, at) {
        return (count_codepoints(&bytes[..at]), count_codepoints(&bytes[at..]));
    }
    if at <= bytes.len() / 2 {
        let head = count_codepoints(&bytes[..at]);
        (head, total - head)
    } else {
        let tail = count_codepoints(&bytes[at..]);
        (total - tail, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_matches_chars_for_valid_text() {
        for text in ["", "abc", "ウクラ", "a€b😀c", "All work ウクラ makes John a dull boy"] {
            assert_eq!(count_codepoints(text.as_bytes()), text.chars().count(), "{text}");
        }
    }

    #[test]
    fn test_malformed_bytes_count_individually() {
        // Truncated three byte sequence followed by ASCII
        assert_eq!(count_codepoints(&[0xE3, 0x82, b'a']), 3);
        // Stray continuation bytes
        assert_eq!(count_codepoints(&[0x80, 0x80]), 2);
    }

    #[test]
    fn test_advance_codepoints() {
        let text = "aウb".as_bytes();
        assert_eq!(advance_codepoints(text, 0), (0, 0));
        assert_eq!(advance_codepoints(text, 1), (1, 1));
        assert_eq!(advance_codepoints(text, 2), (4, 2));
        assert_eq!(advance_codepoints(text, 3), (5, 3));
        // Running off the end stops at the end
        assert_eq!(advance_codepoints(text, 10), (5, 3));
    }

    #[test]
    fn test_split_codepoints() {
        let text = "ウクラ makes".as_bytes();
        let total = count_codepoints(text);
        assert_eq!(split_codepoints(text, 3, total), (1, 8));
        assert_eq!(split_codepoints(text, 10, total), (4, 5));
        // Mid-sequence split falls back to scanning both halves
        assert_eq!(split_codepoints(text, 4, total), (2, 9));
    }

    #[test]
    fn test_char_boundary() {
        let text = "aウ".as_bytes();
        assert!(is_char_boundary(text, 0));
        assert!(is_char_boundary(text, 1));
        assert!(!is_char_boundary(text, 2));
        assert!(is_char_boundary(text, 4));
    }

    #[test]
    fn test_codepoints_before() {
        let text = "aウb".as_bytes();
        assert_eq!(codepoints_before(text, 0), Some(0));
        assert_eq!(codepoints_before(text, 1), Some(1));
        assert_eq!(codepoints_before(text, 2), None);
        assert_eq!(codepoints_before(text, 3), None);
        assert_eq!(codepoints_before(text, 4), Some(2));
        assert_eq!(codepoints_before(text, 5), Some(3));
        // Stray continuation bytes decode one at a time
        assert_eq!(codepoints_before(&[0x80, 0x80], 1), Some(1));
    }
}
