//! The fixed error-message set (§7) and the `Error` value delivered to
//! `Handler::onerror`.

use std::fmt;

/// One of the canonical lexical/lifecycle error kinds.
///
/// The message text is fixed; only the `Line N` suffix (added by `Display`)
/// varies per occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    WriteAfterDone,
    EndAfterDone,
    ElementNameLt,
    ElementNameAmp,
    AttributeNameLt,
    AttributeNameAmp,
    AttributeValueMissing,
    AttributeValueMustBeQuoted,
    UnescapedLtInAttributeValue,
    ClosingTagMissing,
    MissingSemicolon,
    InvalidCharacterEntity,
}

impl ErrorKind {
    pub fn message(&self) -> &'static str {
        match *self {
            ErrorKind::WriteAfterDone => ".write() after done!",
            ErrorKind::EndAfterDone => ".end() after done!",
            ErrorKind::ElementNameLt => "Element name cannot include '<'",
            ErrorKind::ElementNameAmp => "Element name cannot include '&'",
            ErrorKind::AttributeNameLt => "Attribute name cannot include '<'",
            ErrorKind::AttributeNameAmp => "Attribute name cannot include '&'",
            ErrorKind::AttributeValueMissing => "Attribute value is missing",
            ErrorKind::AttributeValueMustBeQuoted => "Attribute value must be in quotes",
            ErrorKind::UnescapedLtInAttributeValue => {
                "Unescaped '<' not allowed in attributes values"
            },
            ErrorKind::ClosingTagMissing => "Closing tag is missing",
            ErrorKind::MissingSemicolon => "Character reference does not end with semicolon",
            ErrorKind::InvalidCharacterEntity => "Invalid character entity",
        }
    }
}

/// An error produced during tokenization or parsing.
///
/// Lifecycle errors (`write`/`end` after done) are not tied to a source
/// line; lexical errors always are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub line: Option<u32>,
}

impl Error {
    pub fn new(kind: ErrorKind, line: u32) -> Self {
        Error { kind, line: Some(line) }
    }

    pub fn lifecycle(kind: ErrorKind) -> Self {
        Error { kind, line: None }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(n) => write!(f, "{}. Line {}", self.kind.message(), n),
            None => write!(f, "{}", self.kind.message()),
        }
    }
}

impl std::error::Error for Error {}
