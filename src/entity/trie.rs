//! Packed trie + restartable walker over the named-entity table.
//!
//! Grounded on the Design Notes ("Replacing the restartable entity
//! trie"): one node per prefix branch, keyed by byte, each node optionally
//! carrying a matched entity. Built once, lazily, from `table::NAMED_ENTITIES`
//! rather than checked in as generated code, since our table is a small
//! representative subset rather than the full ~2,200-entry WHATWG table.

use super::table::{EntityDef, NAMED_ENTITIES};
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Default)]
pub struct TrieNode {
    children: HashMap<u8, usize>,
    entity: Option<&'static EntityDef>,
}

pub struct Trie {
    nodes: Vec<TrieNode>,
}

impl Trie {
    pub fn root(&self) -> usize {
        0
    }

    /// Step from `node` on `byte`, returning the child node index if the
    /// trie has an edge for it.
    pub fn child(&self, node: usize, byte: u8) -> Option<usize> {
        self.nodes[node].children.get(&byte).copied()
    }

    /// The entity matched exactly at `node`, if any.
    pub fn entity_at(&self, node: usize) -> Option<&'static EntityDef> {
        self.nodes[node].entity
    }
}

fn build() -> Trie {
    let mut nodes = vec![TrieNode::default()];
    for (name, def) in NAMED_ENTITIES.entries() {
        let mut cur = 0usize;
        for b in name.bytes() {
            cur = match nodes[cur].children.get(&b) {
                Some(&n) => n,
                None => {
                    nodes.push(TrieNode::default());
                    let n = nodes.len() - 1;
                    nodes[cur].children.insert(b, n);
                    n
                },
            };
        }
        nodes[cur].entity = Some(def);
    }
    Trie { nodes }
}

/// The process-wide named-entity trie, built on first use.
pub fn trie() -> &'static Trie {
    static TRIE: OnceLock<Trie> = OnceLock::new();
    TRIE.get_or_init(build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_amp() {
        let t = trie();
        let mut node = t.root();
        for b in "amp".bytes() {
            node = t.child(node, b).expect("edge exists");
        }
        let def = t.entity_at(node).expect("amp is a terminal node");
        assert_eq!(def.chars.0, '&');
        assert!(def.legacy);
    }

    #[test]
    fn rejects_unknown_prefix() {
        let t = trie();
        assert!(t.child(t.root(), b'z').is_none());
    }
}
