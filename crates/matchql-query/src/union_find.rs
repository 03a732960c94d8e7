//! Disjoint-set over table aliases

use std::collections::HashMap;

/// Alias → parent alias map with path compression
///
/// `union` hangs the root of `x` under the root of `y` without rank
/// balancing. Alias counts per query block are small, so amortized
/// behaviour is enough.
#[derive(Debug, Clone, Default)]
pub struct DisjointSet {
    parent: HashMap<String, String>,
}

impl DisjointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alias` as its own root if it is not known yet
    pub fn insert(&mut self, alias: &str) {
        if !self.parent.contains_key(alias) {
            self.parent.insert(alias.to_string(), alias.to_string());
        }
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.parent.contains_key(alias)
    }

    /// Root of `alias`, compressing the path on the way back
    ///
    /// Unknown aliases are registered as singletons.
    pub fn find(&mut self, alias: &str) -> String {
        self.insert(alias);

        let mut root = alias.to_string();
        loop {
            let parent = &self.parent[&root];
            if *parent == root {
                break;
            }
            root = parent.clone();
        }

        let mut current = alias.to_string();
        while current != root {
            let next = self.parent[&current].clone();
            self.parent.insert(current, root.clone());
            current = next;
        }

        root
    }

    /// Merge the classes of `x` and `y`; the root of `y` becomes the root
    pub fn union(&mut self, x: &str, y: &str) {
        let x_root = self.find(x);
        let y_root = self.find(y);
        if x_root != y_root {
            self.parent.insert(x_root, y_root);
        }
    }

    /// True when both aliases share a root
    pub fn connected(&mut self, x: &str, y: &str) -> bool {
        self.find(x) == self.find(y)
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}
