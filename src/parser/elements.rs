//! Element category tables the Parser consults when applying self-closing
//! and implicit-close rules (§4.4).
//!
//! Grounded on `html5ever/src/tree_builder/tag_sets.rs`: small fixed sets
//! of tag names, checked by straight membership rather than a generated
//! tree-construction state machine (full HTML5 tree construction is a
//! declared Non-goal).

use phf::{phf_map, phf_set};

/// Elements with no content model: the Parser always treats these as
/// self-closing, independent of `recognizeSelfClosing`.
pub static VOID_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
};

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(name)
}

/// Opening one of these tag names implicitly closes an open ancestor of
/// the listed tags, without waiting for its own closing tag (§4.4,
/// "Implicit close"). `p` additionally closes on the opening of any
/// block element, per §4.4's "`p` closes on opening of any block
/// element".
pub static IMPLICIT_CLOSE: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "address" => &["p"],
    "article" => &["p"],
    "aside" => &["p"],
    "blockquote" => &["p"],
    "details" => &["p"],
    "div" => &["p"],
    "dl" => &["p"],
    "fieldset" => &["p"],
    "figcaption" => &["p"],
    "figure" => &["p"],
    "footer" => &["p"],
    "form" => &["p"],
    "h1" => &["p"],
    "h2" => &["p"],
    "h3" => &["p"],
    "h4" => &["p"],
    "h5" => &["p"],
    "h6" => &["p"],
    "header" => &["p"],
    "hr" => &["p"],
    "main" => &["p"],
    "menu" => &["p"],
    "nav" => &["p"],
    "ol" => &["p"],
    "p" => &["p"],
    "pre" => &["p"],
    "section" => &["p"],
    "table" => &["p"],
    "ul" => &["p"],
    "li" => &["li"],
    "dd" => &["dd", "dt"],
    "dt" => &["dd", "dt"],
    "tr" => &["tr"],
    "td" => &["td", "th"],
    "th" => &["td", "th"],
    "option" => &["option"],
    "optgroup" => &["optgroup", "option"],
    "thead" => &["thead", "tbody", "tfoot"],
    "tbody" => &["thead", "tbody", "tfoot"],
    "tfoot" => &["thead", "tbody", "tfoot"],
};

pub fn implicitly_closes(opening: &str, open: &str) -> bool {
    IMPLICIT_CLOSE.get(opening).is_some_and(|closes| closes.contains(&open))
}
