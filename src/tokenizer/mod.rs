//! Tokenizer FSM (C3, §4.3): a byte-driven, resumable state machine that
//! scans markup without buffering the whole document, emitting lexical
//! tokens into a `TokenSink` (the Parser).
//!
//! Grounded on `html5ever/src/tokenizer/mod.rs`: a `Tokenizer<Sink>`
//! struct holding interior state across `write` calls, a `run` loop that
//! drains the `BufferQueue` until it is empty or `pause()` is set, and a
//! match over the current `State` per step.

pub mod interface;
pub mod states;

use crate::buffer_queue::{BufferQueue, SetResult};
use crate::entity::{CharRefResult, CharRefTokenizer, Status as CharRefStatus};
use crate::error::{Error, ErrorKind};
use crate::pos::PositionTracker;
use crate::small_char_set::small_char_set;
use crate::util::lowercase_ascii;

use interface::{Attribute, Span, Tag, TagKind, Token, TokenSink};
use states::{AttrValueKind, RawKind, State};

/// Construction options (§6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerOpts {
    pub xml_mode: bool,
    pub decode_entities: bool,
    pub lower_case_tags: bool,
    pub lower_case_attribute_names: bool,
    pub recognize_cdata: bool,
    pub recognize_self_closing: bool,
    pub strict_mode: bool,
}

impl Default for TokenizerOpts {
    /// HTML-mode defaults.
    fn default() -> Self {
        TokenizerOpts {
            xml_mode: false,
            decode_entities: true,
            lower_case_tags: true,
            lower_case_attribute_names: true,
            recognize_cdata: false,
            recognize_self_closing: false,
            strict_mode: false,
        }
    }
}

impl TokenizerOpts {
    /// XML-mode defaults (§6.1: each `!xmlMode`/`xmlMode`-keyed default
    /// flipped).
    pub fn xml() -> Self {
        TokenizerOpts {
            xml_mode: true,
            decode_entities: true,
            lower_case_tags: false,
            lower_case_attribute_names: false,
            recognize_cdata: true,
            recognize_self_closing: true,
            strict_mode: false,
        }
    }
}

/// The Tokenizer FSM. `Sink` receives the lexical event stream; in this
/// crate that is always the Parser, but the trait boundary is kept so
/// tests can observe the raw lexical stream directly.
pub struct Tokenizer<Sink> {
    opts: TokenizerOpts,
    sink: Sink,
    state: State,
    input: BufferQueue,
    pos: PositionTracker,

    section_start: usize,
    paused: bool,
    done: bool,
    at_eof: bool,

    current_tag_name: String,
    current_tag_attrs: Vec<Attribute>,
    current_attr_name: String,
    current_attr_value: String,
    current_attr_quote: Option<char>,

    current_comment: String,
    current_pi_target: String,
    current_pi_data: String,
    current_declaration: String,

    raw_kind: Option<RawKind>,
    text_accum: String,

    char_ref_tokenizer: Option<Box<CharRefTokenizer>>,
    char_ref_in_attr: bool,
}

impl<Sink: TokenSink> Tokenizer<Sink> {
    pub fn new(sink: Sink, opts: TokenizerOpts) -> Self {
        Tokenizer {
            opts,
            sink,
            state: State::Text,
            input: BufferQueue::new(),
            pos: PositionTracker::new(),
            section_start: 0,
            paused: false,
            done: false,
            at_eof: false,
            current_tag_name: String::new(),
            current_tag_attrs: Vec::new(),
            current_attr_name: String::new(),
            current_attr_value: String::new(),
            current_attr_quote: None,
            current_comment: String::new(),
            current_pi_target: String::new(),
            current_pi_data: String::new(),
            current_declaration: String::new(),
            raw_kind: None,
            text_accum: String::new(),
            char_ref_tokenizer: None,
            char_ref_in_attr: false,
        }
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut Sink {
        &mut self.sink
    }

    pub fn into_sink(self) -> Sink {
        self.sink
    }

    /// Total bytes ever written (for the `0 <= start <= end <= total`
    /// invariant in §8).
    pub fn total_bytes_written(&self) -> usize {
        self.pos.offset() + self.input.buffered_len()
    }

    /// Append a chunk of input. Does not scan while paused.
    pub fn write(&mut self, chunk: &str) {
        if self.done {
            self.emit_lifecycle_error(ErrorKind::WriteAfterDone);
            return;
        }
        if chunk.is_empty() {
            return;
        }
        log::trace!("write: {} bytes", chunk.len());
        self.input.push_back(chunk.to_string());
        if !self.paused {
            self.run(false);
        }
    }

    /// Signal end of input; drains remaining buffered input and fires a
    /// final flush. `trailer` is an optional final chunk (`end(chunk)`).
    pub fn end(&mut self, trailer: Option<&str>) {
        if self.done {
            self.emit_lifecycle_error(ErrorKind::EndAfterDone);
            return;
        }
        log::trace!("end");
        if let Some(t) = trailer {
            self.input.push_back(t.to_string());
        }
        self.at_eof = true;
        if !self.paused {
            self.run(true);
            self.finish();
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume after `pause()`. A no-op if not paused. After `end()`, drains
    /// remaining buffered input and fires the final flush.
    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.run(self.at_eof);
        if self.at_eof && !self.paused {
            self.finish();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Discard all in-progress state, as if newly constructed.
    pub fn reset(&mut self) {
        self.state = State::Text;
        self.input = BufferQueue::new();
        self.pos = PositionTracker::new();
        self.section_start = 0;
        self.paused = false;
        self.done = false;
        self.at_eof = false;
        self.current_tag_name.clear();
        self.current_tag_attrs.clear();
        self.current_attr_name.clear();
        self.current_attr_value.clear();
        self.current_attr_quote = None;
        self.current_comment.clear();
        self.current_pi_target.clear();
        self.current_pi_data.clear();
        self.current_declaration.clear();
        self.raw_kind = None;
        self.text_accum.clear();
        self.char_ref_tokenizer = None;
        self.char_ref_in_attr = false;
    }

    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.flush_text();
        let end = self.pos.offset();
        self.emit(Token::Eof, Span::collapsed(end));
        self.done = true;
    }

    fn emit(&mut self, token: Token, span: Span) {
        self.sink.process_token(token, span);
    }

    fn emit_error(&mut self, kind: ErrorKind) {
        if !self.opts.strict_mode {
            return;
        }
        log::debug!("parse error at line {}: {}", self.pos.line(), kind.message());
        let err = Error::new(kind, self.pos.line());
        let at = self.pos.offset();
        self.emit(Token::ParseError(err), Span::collapsed(at));
    }

    fn emit_lifecycle_error(&mut self, kind: ErrorKind) {
        let err = Error::lifecycle(kind);
        self.emit(Token::ParseError(err), Span::collapsed(self.pos.offset()));
    }

    fn flush_text(&mut self) {
        if self.text_accum.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text_accum);
        let end = self.pos.offset();
        self.emit(Token::Text(text), Span::new(self.section_start, end));
        self.section_start = end;
    }

    /// Drain the input queue, dispatching on `self.state`, until the
    /// queue is empty, a char-ref sub-machine needs more input, or
    /// `pause()` was called. `eof` is true only on the final drive from
    /// `end()`/`resume()` after `end()`.
    fn run(&mut self, eof: bool) {
        loop {
            if self.paused {
                return;
            }

            if let Some(mut crt) = self.char_ref_tokenizer.take() {
                let status = {
                    let errs = &mut Vec::new();
                    let s = crt.step(&mut self.input, eof, |k| errs.push(k));
                    for k in errs.drain(..) {
                        self.emit_error(k);
                    }
                    s
                };
                match status {
                    CharRefStatus::Stuck => {
                        self.char_ref_tokenizer = Some(crt);
                        return;
                    },
                    CharRefStatus::Done => {
                        let result = crt.take_result();
                        let consumed = crt.take_consumed();
                        self.apply_char_ref_result(consumed, result);
                        continue;
                    },
                }
            }

            log::trace!("processing in state {:?}", self.state);

            let progressed = match self.state {
                State::Text => self.step_text(),
                State::BeforeTagName => self.step_before_tag_name(),
                State::InTagName => self.step_in_tag_name(),
                State::InClosingTagName => self.step_in_closing_tag_name(),
                State::AfterClosingTagName => self.step_after_closing_tag_name(),
                State::BeforeAttributeName => self.step_before_attribute_name(),
                State::InAttributeName => self.step_in_attribute_name(),
                State::AfterAttributeName => self.step_after_attribute_name(),
                State::BeforeAttributeValue => self.step_before_attribute_value(),
                State::InAttributeValue(kind) => self.step_in_attribute_value(kind),
                State::SelfClosingTag => self.step_self_closing_tag(),
                State::InDeclaration => self.step_in_declaration(),
                State::InProcessingInstruction => self.step_in_processing_instruction(),
                State::BeforeComment => self.step_before_comment(),
                State::InComment => self.step_in_comment(),
                State::AfterCommentDash1 => self.step_after_comment_dash(1),
                State::AfterCommentDash2 => self.step_after_comment_dash(2),
                State::InCdata => self.step_in_cdata(),
                State::AfterCdataBracket1 => self.step_after_cdata_bracket(1),
                State::AfterCdataBracket2 => self.step_after_cdata_bracket(2),
                State::InSpecialTag(raw) => self.step_in_special_tag(raw),
            };

            if !progressed {
                return;
            }
        }
    }

    /// `consumed` is the literal source text the char-ref sub-machine
    /// actually consumed and did not return to the input queue (the
    /// leading `&` is not included; the caller already advanced past
    /// it). Position must track `consumed`, not the decoded output --
    /// they can differ in length in either direction (`&amp;` consumes 4
    /// source characters but decodes to 1; `&#65;` consumes 4 but decodes
    /// to 1 as well).
    fn apply_char_ref_result(&mut self, consumed: String, result: CharRefResult) {
        let mut out = String::new();
        match result {
            CharRefResult::Entity(cr) => cr.push_to(&mut out),
            CharRefResult::Literal(lit) => {
                out.push('&');
                out.push_str(&lit);
            },
        }
        self.pos.advance_str(&consumed);
        if self.char_ref_in_attr {
            self.current_attr_value.push_str(&out);
        } else {
            self.text_accum.push_str(&out);
        }
    }

    fn start_char_ref(&mut self, in_attr: bool) {
        self.char_ref_in_attr = in_attr;
        self.char_ref_tokenizer =
            Some(Box::new(CharRefTokenizer::new(in_attr, self.opts.xml_mode)));
    }

    // ---- Text -----------------------------------------------------

    fn step_text(&mut self) -> bool {
        match self.input.pop_except_from(small_char_set!('<', '&')) {
            None => false,
            Some(SetResult::NotFromSet(run)) => {
                self.pos.advance_str(&run);
                self.text_accum.push_str(&run);
                true
            },
            Some(SetResult::FromSet('&')) => {
                self.pos.advance('&');
                if self.opts.decode_entities {
                    self.start_char_ref(false);
                } else {
                    self.text_accum.push('&');
                }
                true
            },
            Some(SetResult::FromSet('<')) => {
                self.pos.advance('<');
                self.flush_text();
                self.section_start = self.pos.offset();
                self.state = State::BeforeTagName;
                true
            },
            Some(SetResult::FromSet(_)) => unreachable!(),
        }
    }

    // ---- Tag open / name -------------------------------------------

    fn step_before_tag_name(&mut self) -> bool {
        match self.input.peek() {
            None => false,
            Some('/') => {
                self.input.next();
                self.pos.advance('/');
                self.current_tag_name.clear();
                self.state = State::InClosingTagName;
                true
            },
            Some('!') => {
                self.input.next();
                self.pos.advance('!');
                self.current_declaration.clear();
                self.state = State::InDeclaration;
                true
            },
            Some('?') => {
                self.input.next();
                self.pos.advance('?');
                self.current_pi_target.clear();
                self.current_pi_data.clear();
                self.state = State::InProcessingInstruction;
                true
            },
            Some(c) if c.is_ascii_alphabetic() => {
                self.current_tag_name.clear();
                self.state = State::InTagName;
                true
            },
            Some(c) => {
                // Not a recognized tag-open form: the '<' was not a tag.
                self.text_accum.push('<');
                self.text_accum.push(c);
                self.input.next();
                self.pos.advance(c);
                self.state = State::Text;
                true
            },
        }
    }

    fn step_in_tag_name(&mut self) -> bool {
        match self.input.peek() {
            None => false,
            Some(c) if c.is_whitespace() => {
                self.input.next();
                self.pos.advance(c);
                self.emit_open_tag_name();
                self.state = State::BeforeAttributeName;
                true
            },
            Some('/') => {
                self.input.next();
                self.pos.advance('/');
                self.emit_open_tag_name();
                self.state = State::SelfClosingTag;
                true
            },
            Some('>') => {
                self.input.next();
                self.pos.advance('>');
                self.emit_open_tag_name();
                self.finish_open_tag(false);
                true
            },
            Some('<') if self.opts.strict_mode => {
                self.emit_error(ErrorKind::ElementNameLt);
                self.input.next();
                self.pos.advance('<');
                self.current_tag_name.push('<');
                true
            },
            Some('&') if self.opts.strict_mode => {
                self.emit_error(ErrorKind::ElementNameAmp);
                self.input.next();
                self.pos.advance('&');
                self.current_tag_name.push('&');
                true
            },
            Some(c) => {
                self.input.next();
                self.pos.advance(c);
                self.current_tag_name.push(c);
                true
            },
        }
    }

    fn emit_open_tag_name(&mut self) {
        let name = if self.opts.lower_case_tags {
            lowercase_ascii(&self.current_tag_name)
        } else {
            self.current_tag_name.clone()
        };
        let at = self.pos.offset();
        self.emit(Token::OpenTagName(name), Span::collapsed(at));
    }

    fn step_in_closing_tag_name(&mut self) -> bool {
        match self.input.peek() {
            None => false,
            Some(c) if c.is_whitespace() => {
                self.input.next();
                self.pos.advance(c);
                self.state = State::AfterClosingTagName;
                true
            },
            Some('>') => {
                self.input.next();
                self.pos.advance('>');
                self.finish_close_tag();
                true
            },
            Some(c) => {
                self.input.next();
                self.pos.advance(c);
                self.current_tag_name.push(c);
                true
            },
        }
    }

    fn step_after_closing_tag_name(&mut self) -> bool {
        match self.input.peek() {
            None => false,
            Some('>') => {
                self.input.next();
                self.pos.advance('>');
                self.finish_close_tag();
                true
            },
            Some(c) => {
                // Lenient: ignore stray content before '>' in a closing tag.
                self.input.next();
                self.pos.advance(c);
                true
            },
        }
    }

    fn finish_close_tag(&mut self) {
        let name = if self.opts.lower_case_tags {
            lowercase_ascii(&self.current_tag_name)
        } else {
            self.current_tag_name.clone()
        };
        self.current_tag_name.clear();
        let end = self.pos.offset();
        let tag = Tag { kind: TagKind::EndTag, name, self_closing: false, attrs: Vec::new() };
        self.emit(Token::Tag(tag), Span::new(self.section_start, end));
        self.raw_kind = None;
        self.state = State::Text;
        self.section_start = end;
    }

    // ---- Attributes --------------------------------------------------

    fn step_before_attribute_name(&mut self) -> bool {
        match self.input.peek() {
            None => false,
            Some(c) if c.is_whitespace() => {
                self.input.next();
                self.pos.advance(c);
                true
            },
            Some('/') => {
                self.input.next();
                self.pos.advance('/');
                self.state = State::SelfClosingTag;
                true
            },
            Some('>') => {
                self.input.next();
                self.pos.advance('>');
                self.finish_open_tag(false);
                true
            },
            Some(_) => {
                self.current_attr_name.clear();
                self.current_attr_value.clear();
                self.current_attr_quote = None;
                self.state = State::InAttributeName;
                true
            },
        }
    }

    fn step_in_attribute_name(&mut self) -> bool {
        match self.input.peek() {
            None => false,
            Some(c) if c.is_whitespace() => {
                self.input.next();
                self.pos.advance(c);
                self.state = State::AfterAttributeName;
                true
            },
            Some('=') => {
                self.input.next();
                self.pos.advance('=');
                self.state = State::BeforeAttributeValue;
                true
            },
            Some('/') => {
                self.input.next();
                self.pos.advance('/');
                self.push_current_attr();
                self.state = State::SelfClosingTag;
                true
            },
            Some('>') => {
                self.input.next();
                self.pos.advance('>');
                self.push_current_attr();
                self.finish_open_tag(false);
                true
            },
            Some('<') if self.opts.strict_mode => {
                self.emit_error(ErrorKind::AttributeNameLt);
                self.input.next();
                self.pos.advance('<');
                self.current_attr_name.push('<');
                true
            },
            Some('&') if self.opts.strict_mode => {
                self.emit_error(ErrorKind::AttributeNameAmp);
                self.input.next();
                self.pos.advance('&');
                self.current_attr_name.push('&');
                true
            },
            Some(c) => {
                self.input.next();
                self.pos.advance(c);
                self.current_attr_name.push(c);
                true
            },
        }
    }

    fn step_after_attribute_name(&mut self) -> bool {
        match self.input.peek() {
            None => false,
            Some(c) if c.is_whitespace() => {
                self.input.next();
                self.pos.advance(c);
                true
            },
            Some('=') => {
                self.input.next();
                self.pos.advance('=');
                self.state = State::BeforeAttributeValue;
                true
            },
            Some('/') => {
                self.input.next();
                self.pos.advance('/');
                self.push_current_attr();
                self.state = State::SelfClosingTag;
                true
            },
            Some('>') => {
                self.input.next();
                self.pos.advance('>');
                self.push_current_attr();
                self.finish_open_tag(false);
                true
            },
            Some(_) => {
                self.push_current_attr();
                self.current_attr_name.clear();
                self.current_attr_value.clear();
                self.current_attr_quote = None;
                self.state = State::InAttributeName;
                true
            },
        }
    }

    fn step_before_attribute_value(&mut self) -> bool {
        match self.input.peek() {
            None => false,
            Some(c) if c.is_whitespace() => {
                self.input.next();
                self.pos.advance(c);
                true
            },
            Some('"') => {
                self.input.next();
                self.pos.advance('"');
                self.current_attr_quote = Some('"');
                self.state = State::InAttributeValue(AttrValueKind::DoubleQuoted);
                true
            },
            Some('\'') => {
                self.input.next();
                self.pos.advance('\'');
                self.current_attr_quote = Some('\'');
                self.state = State::InAttributeValue(AttrValueKind::SingleQuoted);
                true
            },
            Some('>') => {
                self.emit_error(ErrorKind::AttributeValueMissing);
                self.input.next();
                self.pos.advance('>');
                self.push_current_attr();
                self.finish_open_tag(false);
                true
            },
            Some(_) => {
                self.emit_error(ErrorKind::AttributeValueMustBeQuoted);
                self.current_attr_quote = None;
                self.state = State::InAttributeValue(AttrValueKind::Unquoted);
                true
            },
        }
    }

    fn step_in_attribute_value(&mut self, kind: AttrValueKind) -> bool {
        match kind {
            AttrValueKind::Unquoted => {
                self.scan_attribute_value(small_char_set!(' ', '\t', '\n', '\r', '>', '&', '<'))
            },
            AttrValueKind::DoubleQuoted => {
                let set = crate::small_char_set::SmallCharSet::new(
                    (1u64 << (b'"' as u32)) | (1u64 << (b'&' as u32)) | (1u64 << (b'<' as u32)),
                );
                self.scan_attribute_value(set)
            },
            AttrValueKind::SingleQuoted => {
                let set = crate::small_char_set::SmallCharSet::new(
                    (1u64 << (b'\'' as u32)) | (1u64 << (b'&' as u32)) | (1u64 << (b'<' as u32)),
                );
                self.scan_attribute_value(set)
            },
        }
    }

    fn scan_attribute_value(&mut self, set: crate::small_char_set::SmallCharSet) -> bool {
        match self.input.pop_except_from(set) {
            None => false,
            Some(SetResult::NotFromSet(run)) => {
                self.pos.advance_str(&run);
                self.current_attr_value.push_str(&run);
                true
            },
            Some(SetResult::FromSet('&')) => {
                self.pos.advance('&');
                if self.opts.decode_entities {
                    self.start_char_ref(true);
                } else {
                    self.current_attr_value.push('&');
                }
                true
            },
            Some(SetResult::FromSet('<')) => {
                self.pos.advance('<');
                if self.opts.strict_mode {
                    self.emit_error(ErrorKind::UnescapedLtInAttributeValue);
                }
                self.current_attr_value.push('<');
                true
            },
            Some(SetResult::FromSet(c)) if Some(c) == self.current_attr_quote => {
                self.pos.advance(c);
                self.push_current_attr();
                self.state = State::BeforeAttributeName;
                true
            },
            Some(SetResult::FromSet(c)) => {
                // Unquoted value terminated by whitespace or '>'.
                self.pos.advance(c);
                if c == '>' {
                    self.push_current_attr();
                    self.finish_open_tag(false);
                } else {
                    self.push_current_attr();
                    self.state = State::BeforeAttributeName;
                }
                true
            },
        }
    }

    fn push_current_attr(&mut self) {
        if self.current_attr_name.is_empty() {
            return;
        }
        let name = if self.opts.lower_case_attribute_names {
            lowercase_ascii(&self.current_attr_name)
        } else {
            self.current_attr_name.clone()
        };
        let attr = Attribute {
            name,
            value: std::mem::take(&mut self.current_attr_value),
            quote: self.current_attr_quote,
        };
        self.current_attr_name.clear();
        self.current_attr_quote = None;
        let at = self.pos.offset();
        self.emit(Token::TagAttribute(attr.clone()), Span::collapsed(at));
        self.current_tag_attrs.push(attr);
    }

    fn step_self_closing_tag(&mut self) -> bool {
        match self.input.peek() {
            None => false,
            Some('>') => {
                self.input.next();
                self.pos.advance('>');
                self.finish_open_tag(true);
                true
            },
            Some(_) => {
                // Stray '/' not immediately followed by '>': ignore it.
                self.state = State::BeforeAttributeName;
                true
            },
        }
    }

    fn finish_open_tag(&mut self, self_closing: bool) {
        let name = std::mem::take(&mut self.current_tag_name);
        let display_name =
            if self.opts.lower_case_tags { lowercase_ascii(&name) } else { name.clone() };
        let attrs = std::mem::take(&mut self.current_tag_attrs);
        let tag =
            Tag { kind: TagKind::StartTag, name: display_name.clone(), self_closing, attrs };
        let end = self.pos.offset();
        self.emit(Token::Tag(tag), Span::new(self.section_start, end));

        let lower_name = lowercase_ascii(&display_name);
        match RawKind::from_tag_name(&lower_name) {
            Some(_raw) if self_closing && (self.opts.recognize_self_closing || self.opts.xml_mode) => {
                let close = Tag {
                    kind: TagKind::EndTag,
                    name: display_name,
                    self_closing: false,
                    attrs: Vec::new(),
                };
                self.emit(Token::Tag(close), Span::collapsed(end));
                self.state = State::Text;
            },
            Some(raw) => {
                self.raw_kind = Some(raw);
                self.state = State::InSpecialTag(raw);
            },
            None => {
                self.state = State::Text;
            },
        }
        self.section_start = end;
    }

    // ---- Declarations, PIs, comments, CDATA ---------------------------

    fn step_in_declaration(&mut self) -> bool {
        // Disambiguate "<!--" (comment), "<![CDATA[" (maybe CDATA) and
        // "<!DOCTYPE"/anything else (bogus declaration), per the Open
        // Question resolved in SPEC_FULL.md §C.
        match self.input.eat(b"--", crate::util::ascii_eq) {
            Some(true) => {
                self.pos.advance_str("--");
                self.current_comment.clear();
                self.state = State::BeforeComment;
                return true;
            },
            Some(false) => {},
            None => return false,
        }

        if self.opts.recognize_cdata {
            match self.input.eat(b"[CDATA[", crate::util::ascii_eq) {
                Some(true) => {
                    self.pos.advance_str("[CDATA[");
                    let at = self.pos.offset();
                    self.emit(Token::CdataStart, Span::collapsed(at));
                    self.state = State::InCdata;
                    return true;
                },
                Some(false) => {},
                None => return false,
            }
        }

        // Bogus declaration / DOCTYPE: accumulate raw text to the next '>'.
        match self.input.pop_except_from(small_char_set!('>')) {
            None => false,
            Some(SetResult::NotFromSet(run)) => {
                self.pos.advance_str(&run);
                self.current_declaration.push_str(&run);
                true
            },
            Some(SetResult::FromSet('>')) => {
                self.pos.advance('>');
                let data = std::mem::take(&mut self.current_declaration);
                let end = self.pos.offset();
                self.emit(Token::Declaration(data), Span::new(self.section_start, end));
                self.state = State::Text;
                self.section_start = end;
                true
            },
            Some(SetResult::FromSet(_)) => unreachable!(),
        }
    }

    fn step_in_processing_instruction(&mut self) -> bool {
        match self.input.pop_except_from(small_char_set!('?', '>')) {
            None => false,
            Some(SetResult::NotFromSet(run)) => {
                self.pos.advance_str(&run);
                if self.current_pi_target.is_empty() && self.current_pi_data.is_empty() {
                    self.current_pi_target.push_str(&run);
                } else {
                    self.current_pi_data.push_str(&run);
                }
                true
            },
            Some(SetResult::FromSet('?')) => {
                self.pos.advance('?');
                if self.input.peek() == Some('>') {
                    self.input.next();
                    self.pos.advance('>');
                    let target = std::mem::take(&mut self.current_pi_target);
                    let data = std::mem::take(&mut self.current_pi_data);
                    let end = self.pos.offset();
                    self.emit(
                        Token::ProcessingInstruction { target, data },
                        Span::new(self.section_start, end),
                    );
                    self.state = State::Text;
                    self.section_start = end;
                } else {
                    self.current_pi_data.push('?');
                }
                true
            },
            Some(SetResult::FromSet('>')) => {
                // A lone '>' with no preceding '?': lenient parsers treat
                // this as ending the PI anyway.
                self.pos.advance('>');
                let target = std::mem::take(&mut self.current_pi_target);
                let data = std::mem::take(&mut self.current_pi_data);
                let end = self.pos.offset();
                self.emit(
                    Token::ProcessingInstruction { target, data },
                    Span::new(self.section_start, end),
                );
                self.state = State::Text;
                self.section_start = end;
                true
            },
            Some(SetResult::FromSet(_)) => unreachable!(),
        }
    }

    fn step_before_comment(&mut self) -> bool {
        self.step_in_comment()
    }

    fn step_in_comment(&mut self) -> bool {
        match self.input.pop_except_from(small_char_set!('-')) {
            None => false,
            Some(SetResult::NotFromSet(run)) => {
                self.pos.advance_str(&run);
                self.current_comment.push_str(&run);
                true
            },
            Some(SetResult::FromSet('-')) => {
                self.pos.advance('-');
                self.state = State::AfterCommentDash1;
                true
            },
            Some(SetResult::FromSet(_)) => unreachable!(),
        }
    }

    fn step_after_comment_dash(&mut self, which: u8) -> bool {
        match self.input.peek() {
            None => false,
            Some('-') if which == 1 => {
                self.input.next();
                self.pos.advance('-');
                self.state = State::AfterCommentDash2;
                true
            },
            Some('>') if which == 2 => {
                self.input.next();
                self.pos.advance('>');
                let data = std::mem::take(&mut self.current_comment);
                let end = self.pos.offset();
                self.emit(Token::Comment(data), Span::new(self.section_start, end));
                self.emit(Token::CommentEnd, Span::collapsed(end));
                self.state = State::Text;
                self.section_start = end;
                true
            },
            Some(c) => {
                // "--" not followed by '>': the dashes were part of the
                // comment body after all.
                if which == 2 {
                    self.current_comment.push('-');
                }
                self.current_comment.push('-');
                self.input.next();
                self.pos.advance(c);
                self.current_comment.push(c);
                self.state = State::InComment;
                true
            },
        }
    }

    fn step_in_cdata(&mut self) -> bool {
        match self.input.pop_except_from(small_char_set!(']')) {
            None => false,
            Some(SetResult::NotFromSet(run)) => {
                self.pos.advance_str(&run);
                self.text_accum.push_str(&run);
                true
            },
            Some(SetResult::FromSet(']')) => {
                self.pos.advance(']');
                self.state = State::AfterCdataBracket1;
                true
            },
            Some(SetResult::FromSet(_)) => unreachable!(),
        }
    }

    fn step_after_cdata_bracket(&mut self, which: u8) -> bool {
        match self.input.peek() {
            None => false,
            Some(']') if which == 1 => {
                self.input.next();
                self.pos.advance(']');
                self.state = State::AfterCdataBracket2;
                true
            },
            Some('>') if which == 2 => {
                self.input.next();
                self.pos.advance('>');
                self.flush_text();
                let end = self.pos.offset();
                self.emit(Token::CdataEnd, Span::collapsed(end));
                self.state = State::Text;
                self.section_start = end;
                true
            },
            Some(c) => {
                if which == 2 {
                    self.text_accum.push(']');
                }
                self.text_accum.push(']');
                self.input.next();
                self.pos.advance(c);
                self.text_accum.push(c);
                self.state = State::InCdata;
                true
            },
        }
    }

    // ---- Raw-text elements --------------------------------------------

    fn step_in_special_tag(&mut self, raw: RawKind) -> bool {
        match self.input.peek() {
            None => false,
            Some('<') => match self.raw_end_lookahead(raw) {
                None => false,
                Some(true) => {
                    self.flush_text();
                    self.input.next();
                    self.pos.advance('<');
                    self.consume_raw_end_open(raw);
                    true
                },
                Some(false) => {
                    self.input.next();
                    self.pos.advance('<');
                    self.text_accum.push('<');
                    true
                },
            },
            Some('&') if raw.decodes_entities() && self.opts.decode_entities => {
                self.input.next();
                self.pos.advance('&');
                self.start_char_ref(false);
                true
            },
            Some(_) => {
                let set = if raw.decodes_entities() && self.opts.decode_entities {
                    small_char_set!('<', '&')
                } else {
                    small_char_set!('<')
                };
                match self.input.pop_except_from(set) {
                    None => false,
                    Some(SetResult::NotFromSet(run)) => {
                        self.pos.advance_str(&run);
                        self.text_accum.push_str(&run);
                        true
                    },
                    Some(_) => unreachable!(),
                }
            },
        }
    }

    /// Look ahead (without consuming) for `</name` followed by a
    /// whitespace/`/`/`>` boundary (or true EOF, which counts as one).
    /// Returns `None` if not enough input is buffered yet to decide.
    fn raw_end_lookahead(&self, raw: RawKind) -> Option<bool> {
        let name = raw.tag_name();
        if self.input.peek_at(0) != Some('/') {
            return Some(false);
        }
        for (i, expected) in name.chars().enumerate() {
            match self.input.peek_at(1 + i) {
                Some(c) if c.to_ascii_lowercase() == expected => {},
                Some(_) => return Some(false),
                None => return if self.at_eof { Some(false) } else { None },
            }
        }
        match self.input.peek_at(1 + name.len()) {
            Some(c) => Some(c.is_whitespace() || c == '/' || c == '>'),
            None => {
                if self.at_eof {
                    Some(true)
                } else {
                    None
                }
            },
        }
    }

    /// Consume `/` + the raw element's name (lookahead already confirmed
    /// the match) and hand off to the ordinary closing-tag machinery to
    /// consume up to `>`.
    fn consume_raw_end_open(&mut self, raw: RawKind) {
        self.input.next(); // '/'
        self.pos.advance('/');
        for _ in raw.tag_name().chars() {
            if let Some(c) = self.input.next() {
                self.pos.advance(c);
            }
        }
        self.current_tag_name = raw.tag_name().to_string();
        self.raw_kind = None;
        self.state = State::AfterClosingTagName;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interface::{Token as Tok, TokenSink as TSink};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<Tok>>,
    }

    impl TSink for Recorder {
        fn process_token(&mut self, token: Tok, _span: Span) {
            self.events.borrow_mut().push(token);
        }
    }

    fn run_to_completion(input: &str, opts: TokenizerOpts) -> Vec<Tok> {
        let mut tok = Tokenizer::new(Recorder::default(), opts);
        tok.write(input);
        tok.end(None);
        tok.into_sink().events.into_inner()
    }

    #[test]
    fn plain_text() {
        let events = run_to_completion("hello", TokenizerOpts::default());
        assert_eq!(events, vec![Tok::Text("hello".into()), Tok::Eof]);
    }

    #[test]
    fn simple_tag() {
        let events = run_to_completion("<div></div>", TokenizerOpts::default());
        assert!(events.contains(&Tok::OpenTagName("div".into())));
        assert!(events.iter().any(|t| matches!(t,
            Tok::Tag(tag) if tag.kind == TagKind::StartTag && tag.name == "div")));
        assert!(events.iter().any(|t| matches!(t,
            Tok::Tag(tag) if tag.kind == TagKind::EndTag && tag.name == "div")));
    }

    #[test]
    fn entity_in_text() {
        let events = run_to_completion("&amp;", TokenizerOpts::default());
        assert_eq!(events, vec![Tok::Text("&".into()), Tok::Eof]);
    }

    #[test]
    fn raw_text_script_not_decoded() {
        let events =
            run_to_completion("<script><div></div></script>", TokenizerOpts::default());
        assert!(events.contains(&Tok::Text("<div></div>".into())));
    }

    #[test]
    fn self_closing_script_skips_body() {
        let mut opts = TokenizerOpts::default();
        opts.recognize_self_closing = true;
        let events = run_to_completion("<script /><div></div>", opts);
        let tags: Vec<_> = events
            .iter()
            .filter_map(|t| match t {
                Tok::Tag(tag) => Some((tag.kind, tag.name.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            tags,
            vec![
                (TagKind::StartTag, "script".to_string()),
                (TagKind::EndTag, "script".to_string()),
                (TagKind::StartTag, "div".to_string()),
                (TagKind::EndTag, "div".to_string()),
            ]
        );
    }

    #[test]
    fn split_write_across_entity_boundary_scenario_8() {
        let mut tok = Tokenizer::new(Recorder::default(), TokenizerOpts::default());
        tok.write("&am");
        tok.write("p; it up!");
        tok.end(None);
        let events = tok.into_sink().events.into_inner();
        let text: String = events
            .into_iter()
            .filter_map(|t| match t {
                Tok::Text(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(text, "& it up!");
    }

    #[test]
    fn unescaped_lt_in_attribute_value_errors_in_strict_mode() {
        let mut opts = TokenizerOpts::default();
        opts.strict_mode = true;
        let events = run_to_completion(r#"<a href="x<y">"#, opts);
        let attr_value = events.iter().find_map(|t| match t {
            Tok::Tag(tag) => tag.attrs.first().map(|a| a.value.clone()),
            _ => None,
        });
        assert_eq!(attr_value.as_deref(), Some("x<y"));
        assert!(events.iter().any(|t| matches!(
            t,
            Tok::ParseError(e) if e.kind == ErrorKind::UnescapedLtInAttributeValue
        )));
    }

    #[test]
    fn unescaped_lt_in_attribute_value_silent_outside_strict_mode() {
        let events = run_to_completion(r#"<a href="x<y">"#, TokenizerOpts::default());
        assert!(!events
            .iter()
            .any(|t| matches!(t, Tok::ParseError(e) if e.kind == ErrorKind::UnescapedLtInAttributeValue)));
    }

    #[test]
    fn entity_does_not_inflate_bytes_written_past_source_len() {
        // "id=770&#anchor" is 14 source bytes; the numeric back-out must
        // not double-count the already-consumed '&' when computing offsets.
        let input = "id=770&#anchor";
        let mut tok = Tokenizer::new(Recorder::default(), TokenizerOpts::default());
        tok.write(input);
        tok.end(None);
        assert_eq!(tok.total_bytes_written(), input.len());
    }
}
