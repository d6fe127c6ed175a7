//! The named-entity data table.
//!
//! Per `spec.md` §1 the concrete named-entity lookup table is an opaque
//! input — only its *shape* and *lookup contract* are specified. This
//! module populates that shape with a representative, explicitly-partial
//! set (the full WHATWG table has ~2,200 entries; reproducing it verbatim
//! adds no design value here).
//!
//! `legacy` marks entities accepted historically without a trailing `;`
//! (WHATWG's "legacy" named character references).

/// A single named-entity definition: one or two resulting code points,
/// plus whether the reference is legacy-allowed without `;`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDef {
    pub chars: (char, Option<char>),
    pub legacy: bool,
}

/// Named entities keyed by name *without* the leading `&` or trailing `;`.
pub static NAMED_ENTITIES: phf::Map<&'static str, EntityDef> = phf::phf_map! {
    "amp" => EntityDef { chars: ('&', None), legacy: true },
    "lt" => EntityDef { chars: ('<', None), legacy: true },
    "gt" => EntityDef { chars: ('>', None), legacy: true },
    "quot" => EntityDef { chars: ('"', None), legacy: true },
    "apos" => EntityDef { chars: ('\'', None), legacy: false },
    "nbsp" => EntityDef { chars: ('\u{00A0}', None), legacy: true },
    "copy" => EntityDef { chars: ('\u{00A9}', None), legacy: true },
    "reg" => EntityDef { chars: ('\u{00AE}', None), legacy: true },
    "AMP" => EntityDef { chars: ('&', None), legacy: true },
    "LT" => EntityDef { chars: ('<', None), legacy: true },
    "GT" => EntityDef { chars: ('>', None), legacy: true },
    "QUOT" => EntityDef { chars: ('"', None), legacy: true },
    "COPY" => EntityDef { chars: ('\u{00A9}', None), legacy: true },
    "REG" => EntityDef { chars: ('\u{00AE}', None), legacy: true },
    "hellip" => EntityDef { chars: ('\u{2026}', None), legacy: false },
    "mdash" => EntityDef { chars: ('\u{2014}', None), legacy: false },
    "ndash" => EntityDef { chars: ('\u{2013}', None), legacy: false },
    "rarr" => EntityDef { chars: ('\u{2192}', None), legacy: false },
    "larr" => EntityDef { chars: ('\u{2190}', None), legacy: false },
    "times" => EntityDef { chars: ('\u{00D7}', None), legacy: false },
    "timesbar" => EntityDef { chars: ('\u{2A31}', None), legacy: true },
    "notin" => EntityDef { chars: ('\u{2209}', None), legacy: false },
    "not" => EntityDef { chars: ('\u{00AC}', None), legacy: true },
    "NotEqualTilde" => EntityDef { chars: ('\u{2242}', Some('\u{0338}')), legacy: false },
};

/// XML mode recognizes only these five predefined entities, always
/// requiring a trailing `;`.
pub fn is_xml_predefined(name: &str) -> bool {
    matches!(name, "amp" | "lt" | "gt" | "quot" | "apos")
}

/// The Windows-1252 replacement table for the C1 control range
/// (0x80-0x9F), used when decoding out-of-range numeric character
/// references (§4.2).
pub const C1_REPLACEMENTS: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}',
    '\u{2021}', '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}',
    '\u{017D}', '\u{008F}', '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
    '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}',
    '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

/// Map a code point in 0x80..=0x9F through the C1 replacement table.
pub fn c1_replacement(codepoint: u32) -> char {
    C1_REPLACEMENTS[(codepoint - 0x80) as usize]
}
