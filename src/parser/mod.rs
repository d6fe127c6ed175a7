//! The Parser (C4, §4.4): a thin, stateful consumer of Tokenizer events.
//! Maintains the open-element stack, applies void-element and
//! implicit-close rules, normalizes case, and forwards the higher-level
//! callback surface (§6.2) to an external `Handler`.
//!
//! Grounded on `html5ever/src/tree_builder/mod.rs` for the overall shape
//! (a `TokenSink` that owns an open-element stack and reacts to each
//! token), reduced from full HTML5 tree construction to the rules this
//! spec actually names.

pub mod elements;
pub mod stack;

use crate::error::{Error, ErrorKind};
use crate::tokenizer::interface::{Span, Tag, TagKind, Token, TokenSink};
use crate::tokenizer::states::RawKind;
use crate::tokenizer::{Tokenizer, TokenizerOpts};
use crate::util::lowercase_ascii;
use stack::OpenElementStack;

pub use crate::tokenizer::interface::Attribute;

/// Construction options (§6.1). A superset of `TokenizerOpts`: every
/// field here is also read by the Tokenizer, plus the Parser-level
/// self-closing/void-element policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub xml_mode: bool,
    pub decode_entities: bool,
    pub lower_case_tags: bool,
    pub lower_case_attribute_names: bool,
    pub recognize_cdata: bool,
    pub recognize_self_closing: bool,
    pub strict_mode: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        let t = TokenizerOpts::default();
        ParserOptions {
            xml_mode: t.xml_mode,
            decode_entities: t.decode_entities,
            lower_case_tags: t.lower_case_tags,
            lower_case_attribute_names: t.lower_case_attribute_names,
            recognize_cdata: t.recognize_cdata,
            recognize_self_closing: t.recognize_self_closing,
            strict_mode: t.strict_mode,
        }
    }
}

impl ParserOptions {
    pub fn xml() -> Self {
        let t = TokenizerOpts::xml();
        ParserOptions {
            xml_mode: t.xml_mode,
            decode_entities: t.decode_entities,
            lower_case_tags: t.lower_case_tags,
            lower_case_attribute_names: t.lower_case_attribute_names,
            recognize_cdata: t.recognize_cdata,
            recognize_self_closing: t.recognize_self_closing,
            strict_mode: t.strict_mode,
        }
    }

    fn to_tokenizer_opts(self) -> TokenizerOpts {
        TokenizerOpts {
            xml_mode: self.xml_mode,
            decode_entities: self.decode_entities,
            lower_case_tags: self.lower_case_tags,
            lower_case_attribute_names: self.lower_case_attribute_names,
            recognize_cdata: self.recognize_cdata,
            recognize_self_closing: self.recognize_self_closing,
            strict_mode: self.strict_mode,
        }
    }
}

/// Read-only parser position, handed to `Handler::onparserinit` in place
/// of a reference to the Parser itself (which would require a
/// self-referential generic bound). Mirrors the `startIndex`/`endIndex`
/// read-only properties from §6.3.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserInfo {
    pub start_index: usize,
    pub end_index: usize,
}

/// The external handler invoked for each higher-level event (§6.2). Every
/// method has a no-op default, matching "any subset may be omitted;
/// missing callbacks are silently skipped".
pub trait Handler {
    fn onparserinit(&mut self, _info: ParserInfo) {}
    fn onreset(&mut self) {}
    fn onend(&mut self) {}
    fn onerror(&mut self, _err: &Error) {}
    fn onopentagname(&mut self, _name: &str) {}
    fn onopentag(&mut self, _name: &str, _attribs: &[Attribute]) {}
    fn onattribute(&mut self, _name: &str, _value: &str, _quote: Option<char>) {}
    fn onclosetag(&mut self, _name: &str) {}
    fn ontext(&mut self, _text: &str) {}
    fn oncomment(&mut self, _data: &str) {}
    fn oncommentend(&mut self) {}
    fn oncdatastart(&mut self) {}
    fn oncdataend(&mut self) {}
    fn onprocessinginstruction(&mut self, _name: &str, _data: &str) {}
    fn ondeclaration(&mut self, _data: &str) {}
}

/// The `TokenSink` half of the Parser: owns the handler and the
/// open-element stack, reacts to each token.
struct Core<H> {
    handler: H,
    opts: ParserOptions,
    stack: OpenElementStack,
    start_index: usize,
    end_index: usize,
}

impl<H: Handler> Core<H> {
    fn info(&self) -> ParserInfo {
        ParserInfo { start_index: self.start_index, end_index: self.end_index }
    }

    fn open_start_tag(&mut self, tag: Tag) {
        while let Some(top) = self.stack.last() {
            if elements::implicitly_closes(&tag.name, top) {
                let top = top.to_string();
                self.stack.pop();
                self.handler.onclosetag(&top);
            } else {
                break;
            }
        }

        self.handler.onopentag(&tag.name, &tag.attrs);

        let is_raw = RawKind::from_tag_name(&lowercase_ascii(&tag.name)).is_some();
        if is_raw {
            // Raw-text elements are only ever closed by a matching
            // end tag, which the Tokenizer always emits (either the
            // synthetic self-closing pair or a real `</tag>`).
            if !tag.self_closing {
                self.stack.push(tag.name);
            }
            return;
        }

        let effective_self_close = elements::is_void(&tag.name)
            || (tag.self_closing && (self.opts.recognize_self_closing || self.opts.xml_mode));
        if effective_self_close {
            self.handler.onclosetag(&tag.name);
        } else {
            self.stack.push(tag.name);
        }
    }

    fn close_end_tag(&mut self, tag: Tag) {
        if self.stack.contains(&tag.name) {
            for closed in self.stack.pop_through(&tag.name) {
                self.handler.onclosetag(&closed);
            }
        } else {
            // A stray closing tag with no matching open ancestor: still
            // surfaced, but the stack is left untouched.
            if self.opts.strict_mode {
                self.handler.onerror(&Error::lifecycle(ErrorKind::ClosingTagMissing));
            }
            self.handler.onclosetag(&tag.name);
        }
    }

    fn finish(&mut self) {
        let open: Vec<String> = self.stack.iter_top_down().map(str::to_string).collect();
        for name in open {
            if self.opts.strict_mode {
                self.handler.onerror(&Error::lifecycle(ErrorKind::ClosingTagMissing));
            }
            self.handler.onclosetag(&name);
        }
        self.stack = OpenElementStack::new();
        self.handler.onend();
    }
}

impl<H: Handler> TokenSink for Core<H> {
    fn process_token(&mut self, token: Token, span: Span) {
        self.start_index = span.start;
        self.end_index = span.end;

        match token {
            Token::OpenTagName(name) => self.handler.onopentagname(&name),
            Token::TagAttribute(attr) => {
                self.handler.onattribute(&attr.name, &attr.value, attr.quote)
            },
            Token::Tag(tag) => match tag.kind {
                TagKind::StartTag => self.open_start_tag(tag),
                TagKind::EndTag => self.close_end_tag(tag),
            },
            Token::Text(text) => self.handler.ontext(&text),
            Token::Comment(data) => self.handler.oncomment(&data),
            Token::CommentEnd => self.handler.oncommentend(),
            Token::CdataStart => self.handler.oncdatastart(),
            Token::CdataEnd => self.handler.oncdataend(),
            Token::ProcessingInstruction { target, data } => {
                self.handler.onprocessinginstruction(&target, &data)
            },
            Token::Declaration(data) => self.handler.ondeclaration(&data),
            Token::ParseError(err) => self.handler.onerror(&err),
            Token::Eof => self.finish(),
        }
    }
}

/// The Parser: wraps a `Tokenizer` driving a `Core<H>` sink.
pub struct Parser<H: Handler> {
    tokenizer: Tokenizer<Core<H>>,
}

impl<H: Handler> Parser<H> {
    pub fn new(handler: H, opts: ParserOptions) -> Self {
        let core = Core {
            handler,
            opts,
            stack: OpenElementStack::new(),
            start_index: 0,
            end_index: 0,
        };
        let mut tokenizer = Tokenizer::new(core, opts.to_tokenizer_opts());
        let info = tokenizer.sink().info();
        tokenizer.sink_mut().handler.onparserinit(info);
        Parser { tokenizer }
    }

    pub fn write(&mut self, chunk: &str) {
        self.tokenizer.write(chunk);
    }

    pub fn end(&mut self, trailer: Option<&str>) {
        self.tokenizer.end(trailer);
    }

    pub fn pause(&mut self) {
        self.tokenizer.pause();
    }

    pub fn resume(&mut self) {
        self.tokenizer.resume();
    }

    /// Convenience: `reset()` followed by `write(data); end(None)`.
    pub fn parse_complete(&mut self, data: &str) {
        self.reset();
        self.write(data);
        self.end(None);
    }

    /// Discard all in-progress state; fires `onreset` then re-fires
    /// `onparserinit` (SPEC_FULL.md §C).
    pub fn reset(&mut self) {
        self.tokenizer.reset();
        let core = self.tokenizer.sink_mut();
        core.stack = OpenElementStack::new();
        core.start_index = 0;
        core.end_index = 0;
        core.handler.onreset();
        let info = core.info();
        core.handler.onparserinit(info);
    }

    pub fn start_index(&self) -> usize {
        self.tokenizer.sink().start_index
    }

    pub fn end_index(&self) -> usize {
        self.tokenizer.sink().end_index
    }

    pub fn handler(&self) -> &H {
        &self.tokenizer.sink().handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.tokenizer.sink_mut().handler
    }

    pub fn into_handler(self) -> H {
        self.tokenizer.into_sink().handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recording {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl Handler for Recording {
        fn onparserinit(&mut self, _info: ParserInfo) {
            self.events.borrow_mut().push("init".into());
        }
        fn onopentag(&mut self, name: &str, _attribs: &[Attribute]) {
            self.events.borrow_mut().push(format!("open:{name}"));
        }
        fn onclosetag(&mut self, name: &str) {
            self.events.borrow_mut().push(format!("close:{name}"));
        }
        fn ontext(&mut self, text: &str) {
            self.events.borrow_mut().push(format!("text:{text}"));
        }
        fn onend(&mut self) {
            self.events.borrow_mut().push("end".into());
        }
    }

    #[test]
    fn self_closing_script_scenario_1() {
        let mut opts = ParserOptions::default();
        opts.recognize_self_closing = true;
        let mut parser = Parser::new(Recording::default(), opts);
        parser.write("<script /><div></div>");
        parser.end(None);
        let events = parser.into_handler().events;
        assert_eq!(
            *events.borrow(),
            vec![
                "init".to_string(),
                "open:script".to_string(),
                "close:script".to_string(),
                "open:div".to_string(),
                "close:div".to_string(),
                "end".to_string(),
            ]
        );
    }

    #[test]
    fn void_element_auto_closes() {
        let mut parser = Parser::new(Recording::default(), ParserOptions::default());
        parser.write("<br><p>hi</p>");
        parser.end(None);
        let events = parser.into_handler().events;
        assert_eq!(
            *events.borrow(),
            vec![
                "init".to_string(),
                "open:br".to_string(),
                "close:br".to_string(),
                "open:p".to_string(),
                "text:hi".to_string(),
                "close:p".to_string(),
                "end".to_string(),
            ]
        );
    }

    #[test]
    fn implicit_close_of_unclosed_li() {
        let mut parser = Parser::new(Recording::default(), ParserOptions::default());
        parser.write("<ul><li>a<li>b</ul>");
        parser.end(None);
        let events = parser.into_handler().events;
        let seq = events.borrow();
        assert!(seq.contains(&"close:li".to_string()));
        // Two <li> opens but the first is implicitly closed before the second.
        assert_eq!(seq.iter().filter(|e| e.as_str() == "open:li").count(), 2);
    }

    #[test]
    fn p_closes_on_any_block_element_not_just_p() {
        let mut parser = Parser::new(Recording::default(), ParserOptions::default());
        parser.write("<p>x<div>y</div>");
        parser.end(None);
        let events = parser.into_handler().events;
        assert_eq!(
            *events.borrow(),
            vec![
                "init".to_string(),
                "open:p".to_string(),
                "text:x".to_string(),
                "close:p".to_string(),
                "open:div".to_string(),
                "text:y".to_string(),
                "close:div".to_string(),
                "end".to_string(),
            ]
        );
    }
}
