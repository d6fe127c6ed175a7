//! Tokenizer states (§4.3, abridged state set). One variant per named
//! state in `spec.md`; `RawKind` distinguishes which raw-text element is
//! currently open so `InSpecialTag`/`AfterClosingTagName` know what
//! closing sequence to look for.
//!
//! Grounded on `html5ever/src/tokenizer/states.rs`, trimmed to the states
//! this spec actually names (no script-data-escaped sub-states, no
//! doctype public/system identifier machinery beyond a single bogus
//! fallback: full HTML5 doctype parsing is not in scope).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawKind {
    Script,
    Style,
    Title,
    Textarea,
}

impl RawKind {
    pub fn tag_name(self) -> &'static str {
        match self {
            RawKind::Script => "script",
            RawKind::Style => "style",
            RawKind::Title => "title",
            RawKind::Textarea => "textarea",
        }
    }

    /// Entities are decoded in `title`/`textarea` bodies but not in
    /// `script`/`style` (§4.3 "Raw-text elements").
    pub fn decodes_entities(self) -> bool {
        matches!(self, RawKind::Title | RawKind::Textarea)
    }

    pub fn from_tag_name(name: &str) -> Option<RawKind> {
        match name {
            "script" => Some(RawKind::Script),
            "style" => Some(RawKind::Style),
            "title" => Some(RawKind::Title),
            "textarea" => Some(RawKind::Textarea),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValueKind {
    Unquoted,
    SingleQuoted,
    DoubleQuoted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Text,
    BeforeTagName,
    InTagName,
    InClosingTagName,
    AfterClosingTagName,
    BeforeAttributeName,
    InAttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    InAttributeValue(AttrValueKind),
    SelfClosingTag,
    InDeclaration,
    InProcessingInstruction,
    BeforeComment,
    InComment,
    AfterCommentDash1,
    AfterCommentDash2,
    InCdata,
    AfterCdataBracket1,
    AfterCdataBracket2,
    InSpecialTag(RawKind),
}
