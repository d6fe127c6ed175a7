//! Entity Decoder (C1, §4.2): numeric decimal, numeric hexadecimal and
//! named sub-decoders, selected by the characters following `&`.
//!
//! Grounded on `html5ever/src/tokenizer/char_ref/mod.rs`: a restartable
//! state machine driven one character at a time from the same
//! `BufferQueue` the Tokenizer reads from, so partial entity state
//! survives a `write` boundary exactly the way the teacher's
//! `CharRefTokenizer` does.

pub mod table;
pub mod trie;

use crate::buffer_queue::BufferQueue;
use crate::error::ErrorKind;
use table::EntityDef;

/// One or two decoded code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRef {
    chars: [char; 2],
    num_chars: u8,
}

impl CharRef {
    pub const EMPTY: CharRef = CharRef { chars: ['\0', '\0'], num_chars: 0 };

    pub fn one(c: char) -> Self {
        CharRef { chars: [c, '\0'], num_chars: 1 }
    }

    pub fn two(a: char, b: char) -> Self {
        CharRef { chars: [a, b], num_chars: 2 }
    }

    pub fn push_to(&self, out: &mut String) {
        for &c in &self.chars[..self.num_chars as usize] {
            out.push(c);
        }
    }
}

/// What a finished decode attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharRefResult {
    /// A real character reference was decoded.
    Entity(CharRef),
    /// No entity could be formed; emit a literal `&` followed by this
    /// text (already-consumed lookahead has been returned to the input
    /// queue and will follow as ordinary characters).
    Literal(String),
}

enum State {
    Begin,
    Octothorpe,
    Numeric { radix: u32 },
    Named,
}

/// Status of a single `step` call.
#[derive(Debug, PartialEq, Eq)]
pub enum Status {
    /// Needs more input; call `step` again once more is buffered.
    Stuck,
    /// Finished; call `take_result`.
    Done,
}

/// Drives the three sub-decoders described in §4.2.
pub struct CharRefTokenizer {
    state: State,
    is_in_attribute: bool,
    xml_mode: bool,
    num: u32,
    num_too_big: bool,
    saw_digit: bool,
    had_octothorpe_hex: bool,
    name_buf: String,
    node: usize,
    last_match: Option<(&'static EntityDef, usize)>,
    result: Option<CharRefResult>,
    /// The literal source characters consumed so far and not since
    /// returned to the input queue (excludes the leading `&`, which the
    /// caller consumes before constructing this tokenizer). Used to
    /// advance the position tracker by actual source bytes rather than by
    /// the length of whatever got decoded.
    raw: String,
}

impl CharRefTokenizer {
    pub fn new(is_in_attribute: bool, xml_mode: bool) -> Self {
        CharRefTokenizer {
            state: State::Begin,
            is_in_attribute,
            xml_mode,
            num: 0,
            num_too_big: false,
            saw_digit: false,
            had_octothorpe_hex: false,
            name_buf: String::new(),
            node: trie::trie().root(),
            last_match: None,
            result: None,
            raw: String::new(),
        }
    }

    pub fn take_result(&mut self) -> CharRefResult {
        self.result.take().unwrap_or(CharRefResult::Literal(String::new()))
    }

    /// The net source text consumed for the just-finished decode attempt
    /// (after `take_result`), i.e. what remains once everything returned
    /// to the input queue via lookahead has been un-recorded.
    pub fn take_consumed(&mut self) -> String {
        std::mem::take(&mut self.raw)
    }

    /// Consume and record one character.
    fn advance(&mut self, input: &mut BufferQueue) -> Option<char> {
        let c = input.next()?;
        self.raw.push(c);
        Some(c)
    }

    /// Return previously-consumed lookahead to the input queue, undoing
    /// its effect on `raw`. `text` must be a suffix of what's currently
    /// recorded in `raw`.
    fn restore(&mut self, input: &mut BufferQueue, text: String) {
        let new_len = self.raw.len().saturating_sub(text.len());
        debug_assert!(self.raw[new_len..] == text[..], "restoring text not at the tail of raw");
        self.raw.truncate(new_len);
        input.push_front(text);
    }

    /// Advance the decoder using characters from `input`. `on_error`
    /// receives fixed error kinds; the caller attaches the `Line N`.
    ///
    /// `eof` must be `true` only when the caller knows no further input
    /// will ever arrive (the document's final `end()`); it lets a pending
    /// legacy named-entity match (e.g. a trailing `&timesbar` with
    /// nothing after it) finish instead of blocking forever.
    pub fn step<E: FnMut(ErrorKind)>(
        &mut self,
        input: &mut BufferQueue,
        eof: bool,
        mut on_error: E,
    ) -> Status {
        loop {
            match self.state {
                State::Begin => match input.peek() {
                    None if !eof => return Status::Stuck,
                    None => {
                        self.result = Some(CharRefResult::Literal(String::new()));
                        return Status::Done;
                    },
                    Some('#') => {
                        self.advance(input);
                        self.state = State::Octothorpe;
                    },
                    Some(c) if c.is_ascii_alphanumeric() => {
                        self.state = State::Named;
                    },
                    Some(_) => {
                        self.result = Some(CharRefResult::Literal(String::new()));
                        return Status::Done;
                    },
                },
                State::Octothorpe => match input.peek() {
                    None if !eof => return Status::Stuck,
                    None => return self.numeric_back_out(),
                    Some('x') | Some('X') => {
                        self.advance(input);
                        self.had_octothorpe_hex = true;
                        self.state = State::Numeric { radix: 16 };
                    },
                    Some(_) => {
                        self.state = State::Numeric { radix: 10 };
                    },
                },
                State::Numeric { radix } => {
                    match self.step_numeric(radix, input, eof, &mut on_error) {
                        Some(status) => return status,
                        None => continue,
                    }
                },
                State::Named => return self.step_named(input, eof, &mut on_error),
            }
        }
    }

    fn step_numeric<E: FnMut(ErrorKind)>(
        &mut self,
        radix: u32,
        input: &mut BufferQueue,
        eof: bool,
        on_error: &mut E,
    ) -> Option<Status> {
        match input.peek() {
            None if !eof => Some(Status::Stuck),
            None => {
                if !self.saw_digit {
                    Some(self.numeric_back_out())
                } else {
                    on_error(ErrorKind::MissingSemicolon);
                    self.finish_numeric();
                    Some(Status::Done)
                }
            },
            Some(c) if c.is_digit(radix) => {
                self.advance(input);
                self.saw_digit = true;
                if !self.num_too_big {
                    match self
                        .num
                        .checked_mul(radix)
                        .and_then(|n| n.checked_add(c.to_digit(radix).unwrap()))
                    {
                        Some(n) => self.num = n,
                        None => self.num_too_big = true,
                    }
                }
                None
            },
            Some(';') => {
                if !self.saw_digit {
                    return Some(self.numeric_back_out());
                }
                self.advance(input);
                self.finish_numeric();
                Some(Status::Done)
            },
            Some(_) => {
                if !self.saw_digit {
                    return Some(self.numeric_back_out());
                }
                on_error(ErrorKind::MissingSemicolon);
                self.finish_numeric();
                Some(Status::Done)
            },
        }
    }

    /// Back out of a numeric reference with no digits (`&#;`, `&#x;`,
    /// `&#<eof>`): the `#`/`x` already consumed is emitted as literal text.
    fn numeric_back_out(&mut self) -> Status {
        let mut text = String::from("#");
        if self.had_octothorpe_hex {
            text.push('x');
        }
        self.result = Some(CharRefResult::Literal(text));
        Status::Done
    }

    fn finish_numeric(&mut self) {
        let n = if self.num_too_big { 0x0011_0000 } else { self.num };
        let c = match n {
            0x00 => '\u{FFFD}',
            0xD800..=0xDFFF => '\u{FFFD}',
            0x80..=0x9F => table::c1_replacement(n),
            n if n > 0x10FFFF => '\u{FFFD}',
            n => char::from_u32(n).unwrap_or('\u{FFFD}'),
        };
        self.result = Some(CharRefResult::Entity(CharRef::one(c)));
    }

    fn step_named<E: FnMut(ErrorKind)>(
        &mut self,
        input: &mut BufferQueue,
        eof: bool,
        on_error: &mut E,
    ) -> Status {
        loop {
            let c = match input.peek() {
                None if !eof => return Status::Stuck,
                None => break,
                Some(c) => c,
            };
            if !c.is_ascii_alphanumeric() && c != ';' {
                break;
            }
            if c == ';' {
                // ';' never has a trie edge of its own (names are stored
                // without it); treat it as the terminator below.
                break;
            }
            match trie::trie().child(self.node, c as u8) {
                Some(next) => {
                    self.advance(input);
                    self.name_buf.push(c);
                    self.node = next;
                    if let Some(def) = trie::trie().entity_at(next) {
                        self.last_match = Some((def, self.name_buf.len()));
                    }
                },
                None => break,
            }
        }

        let terminated = matches!(input.peek(), Some(';'));
        if terminated {
            self.advance(input);
        }
        self.finish_named(terminated, input, on_error)
    }

    fn finish_named<E: FnMut(ErrorKind)>(
        &mut self,
        terminated: bool,
        input: &mut BufferQueue,
        on_error: &mut E,
    ) -> Status {
        let Some((def, matched_len)) = self.last_match.take() else {
            // No entity matched at all: the whole speculative run, plus
            // the ';' if one was consumed while looking for a terminator,
            // goes back to the input queue as ordinary text.
            let name_buf = std::mem::take(&mut self.name_buf);
            self.result = Some(CharRefResult::Literal(String::new()));
            if terminated {
                self.restore(input, ";".to_string());
            }
            if !name_buf.is_empty() {
                self.restore(input, name_buf);
            }
            return Status::Done;
        };

        let name_buf = std::mem::take(&mut self.name_buf);
        let matched_name = &name_buf[..matched_len];
        let leftover = name_buf[matched_len..].to_string();

        // A ';' consumed after the full alnum run only terminates the
        // match when nothing of that run was left over; otherwise it
        // follows the leftover text in the source and must be restored
        // alongside it rather than attributed to the entity.
        let matched_terminated = terminated && leftover.is_empty();
        if !leftover.is_empty() {
            if terminated {
                self.restore(input, ";".to_string());
            }
            self.restore(input, leftover.clone());
        }

        if self.xml_mode {
            if !table::is_xml_predefined(matched_name) || !matched_terminated {
                // Not one of the five predefined entities, or missing the
                // mandatory ';': reject, emit literally. Restore anything
                // already consumed (the matched name, and the ';' if it
                // actually terminated this match) so it resurfaces as
                // plain text.
                on_error(ErrorKind::InvalidCharacterEntity);
                if matched_terminated {
                    self.restore(input, ";".to_string());
                }
                self.restore(input, matched_name.to_string());
                self.result = Some(CharRefResult::Literal(String::new()));
                return Status::Done;
            }
            self.result = Some(CharRefResult::Entity(Self::def_to_char_ref(def)));
            return Status::Done;
        }

        if self.is_in_attribute && !matched_terminated {
            let next = leftover.chars().next().or_else(|| input.peek());
            if next.is_some_and(|c| c.is_ascii_alphanumeric() || c == '=') {
                // Ambiguous ampersand: preserve the literal text verbatim.
                self.restore(input, matched_name.to_string());
                self.result = Some(CharRefResult::Literal(String::new()));
                return Status::Done;
            }
        }

        if !matched_terminated && !def.legacy {
            on_error(ErrorKind::MissingSemicolon);
        }
        self.result = Some(CharRefResult::Entity(Self::def_to_char_ref(def)));
        Status::Done
    }

    fn def_to_char_ref(def: &EntityDef) -> CharRef {
        match def.chars {
            (a, Some(b)) => CharRef::two(a, b),
            (a, None) => CharRef::one(a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(s: &str, in_attr: bool, xml: bool) -> (CharRefResult, String) {
        let (result, rest, _consumed) = decode_with_consumed(s, in_attr, xml);
        (result, rest)
    }

    fn decode_with_consumed(s: &str, in_attr: bool, xml: bool) -> (CharRefResult, String, String) {
        let mut input = BufferQueue::new();
        input.push_back(s.to_string());
        let mut tok = CharRefTokenizer::new(in_attr, xml);
        loop {
            match tok.step(&mut input, true, |_| {}) {
                Status::Done => break,
                Status::Stuck => panic!("ran out of input mid-decode"),
            }
        }
        let result = tok.take_result();
        let consumed = tok.take_consumed();
        let mut rest = String::new();
        while let Some(c) = input.next() {
            rest.push(c);
        }
        (result, rest, consumed)
    }

    #[test]
    fn named_with_semicolon() {
        let (r, rest) = decode("amp;rest", false, false);
        assert_eq!(r, CharRefResult::Entity(CharRef::one('&')));
        assert_eq!(rest, "rest");
    }

    #[test]
    fn legacy_named_without_semicolon() {
        let (r, rest) = decode("amp rest", false, false);
        assert_eq!(r, CharRefResult::Entity(CharRef::one('&')));
        assert_eq!(rest, " rest");
    }

    #[test]
    fn timesbar_legacy_no_semicolon_scenario_6() {
        let (r, rest) = decode("timesbar", false, false);
        assert_eq!(r, CharRefResult::Entity(CharRef::one('\u{2A31}')));
        assert_eq!(rest, "");
    }

    #[test]
    fn decimal_numeric() {
        let (r, rest) = decode("#65;x", false, false);
        assert_eq!(r, CharRefResult::Entity(CharRef::one('A')));
        assert_eq!(rest, "x");
    }

    #[test]
    fn hex_numeric() {
        let (r, rest) = decode("#x41;x", false, false);
        assert_eq!(r, CharRefResult::Entity(CharRef::one('A')));
        assert_eq!(rest, "x");
    }

    #[test]
    fn numeric_back_out_scenario_4() {
        // "&#anchor" -- no hex/decimal digits after "#": back out.
        let (r, rest) = decode("#anchor", false, false);
        assert_eq!(r, CharRefResult::Literal("#".to_string()));
        assert_eq!(rest, "anchor");
    }

    #[test]
    fn ambiguous_ampersand_in_attribute_scenario_5() {
        // "&image;=2" -- terminated by ';' but followed by '=': still
        // rejected per the ambiguous-ampersand rule because what matched
        // ("image") is not itself a known entity, so this just exercises
        // the no-match path; use a matched name followed by '=' instead.
        let (r, rest) = decode("amp=2", true, false);
        assert_eq!(r, CharRefResult::Literal(String::new()));
        assert_eq!(rest, "amp=2");
    }

    #[test]
    fn ambiguous_ampersand_allowed_when_not_alnum_or_eq() {
        let (r, rest) = decode("amp!rest", true, false);
        assert_eq!(r, CharRefResult::Entity(CharRef::one('&')));
        assert_eq!(rest, "!rest");
    }

    #[test]
    fn xml_mode_rejects_non_predefined() {
        let (r, rest) = decode("nbsp;x", false, true);
        assert_eq!(r, CharRefResult::Literal(String::new()));
        assert_eq!(rest, "nbsp;x");
    }

    #[test]
    fn xml_mode_accepts_predefined_with_semicolon() {
        let (r, rest) = decode("amp;x", false, true);
        assert_eq!(r, CharRefResult::Entity(CharRef::one('&')));
        assert_eq!(rest, "x");
    }

    #[test]
    fn no_match_preserves_trailing_semicolon() {
        // "time" is a dead end in the trie (a prefix of "times"/"timesbar"
        // but not an entity on its own); the ';' that follows must not be
        // swallowed.
        let (r, rest) = decode("time;rest", false, false);
        assert_eq!(r, CharRefResult::Literal(String::new()));
        assert_eq!(rest, "time;rest");
    }

    #[test]
    fn matched_prefix_leftover_preserves_trailing_semicolon() {
        // "noti" walks through the matched entity "not" (legacy, -> '\u{00AC}')
        // into the "notin" branch, stopping one short; the leftover "i" and
        // the ';' that follows it belong to the surrounding text, not to the
        // "not" match.
        let (r, rest) = decode("noti;rest", false, false);
        assert_eq!(r, CharRefResult::Entity(CharRef::one('\u{00AC}')));
        assert_eq!(rest, "i;rest");
    }

    #[test]
    fn consumed_length_matches_source_not_decoded_output() {
        // "&amp;" decodes to a single '&' but consumes 4 source chars
        // (without the leading '&', which the tokenizer consumes before
        // constructing the CharRefTokenizer).
        let (r, rest, consumed) = decode_with_consumed("amp;x", false, false);
        assert_eq!(r, CharRefResult::Entity(CharRef::one('&')));
        assert_eq!(rest, "x");
        assert_eq!(consumed, "amp;");
    }

    #[test]
    fn consumed_length_is_empty_when_fully_restored() {
        let (r, rest, consumed) = decode_with_consumed("time;rest", false, false);
        assert_eq!(r, CharRefResult::Literal(String::new()));
        assert_eq!(rest, "time;rest");
        assert_eq!(consumed, "");
    }
}
