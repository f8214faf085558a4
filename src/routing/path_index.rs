//! Segment trie mapping path templates to values.
//!
//! # Responsibilities
//! - Store values under `/`-delimited path templates
//! - Exact lookup with `{placeholder}` wildcard segments
//! - Longest registered prefix lookup for request routing
//!
//! # Design Decisions
//! - Keys are lower-cased segments; the terminal node keeps the original path for display
//! - Placeholder segments share the `*` key at their depth
//! - Removal clears a terminal node in place; structure is never pruned
//! - The root node represents `/`

use std::collections::HashMap;

use super::segments::{self, WILDCARD_KEY};

#[derive(Debug)]
struct Node<V> {
    children: HashMap<String, Node<V>>,
    path: Option<String>,
    value: Option<V>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            path: None,
            value: None,
        }
    }
}

impl<V> Node<V> {
    fn terminal_value(&self) -> Option<&V> {
        self.path.as_ref().and(self.value.as_ref())
    }
}

/// Prefix index over path segments.
#[derive(Debug)]
pub struct PathIndex<V> {
    root: Node<V>,
}

impl<V> Default for PathIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PathIndex<V> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            root: Node::default(),
        }
    }

    /// Store `value` under `path`, replacing any value already there.
    pub fn add(&mut self, path: &str, value: V) {
        let mut node = &mut self.root;
        for segment in segments::split(path) {
            node = node.children.entry(segments::key(segment)).or_default();
        }
        node.path = Some(path.to_string());
        node.value = Some(value);
    }

    /// Clear the entry stored exactly at `path`, returning its value.
    pub fn remove(&mut self, path: &str) -> Option<V> {
        let node = self.node_mut(path)?;
        node.path = None;
        node.value.take()
    }

    /// Look up the value registered for `path`.
    ///
    /// Every segment must be consumed. At each depth a literal child wins over
    /// the wildcard child.
    pub fn find_exact(&self, path: &str) -> Option<&V> {
        let mut node = &self.root;
        for segment in segments::split(path) {
            let current = node;
            node = current
                .children
                .get(&segments::key(segment))
                .or_else(|| current.children.get(WILDCARD_KEY))?;
        }
        node.terminal_value()
    }

    /// Value stored under exactly the same segment keys as `path`.
    ///
    /// Unlike [`PathIndex::find_exact`] this never falls back to a wildcard
    /// child, so `/Items/42` does not see an entry stored at `/Items/{id}`.
    pub fn get(&self, path: &str) -> Option<&V> {
        let mut node = &self.root;
        for segment in segments::split(path) {
            node = node.children.get(&segments::key(segment))?;
        }
        node.terminal_value()
    }

    /// Mutable variant of [`PathIndex::get`].
    pub fn get_mut(&mut self, path: &str) -> Option<&mut V> {
        let node = self.node_mut(path)?;
        if node.path.is_some() {
            node.value.as_mut()
        } else {
            None
        }
    }

    /// Find the value of the deepest registered ancestor of `path`.
    ///
    /// The walk starts at the first segment and advances only on literal
    /// (case-insensitive) segment matches; wildcard children are not followed.
    /// Unlike a plain "last node reached" lookup, an unregistered intermediate
    /// node never ends the search empty-handed: with `/Api` and
    /// `/Api/Foo/Bar/Qux` registered, `/Api/Foo/Bar/Zzz` stops at the
    /// unregistered `/Api/Foo/Bar` node and still answers with `/Api`.
    /// The root entry only answers for `/` itself.
    pub fn find_by_prefix(&self, path: &str) -> Option<&V> {
        let mut parts = segments::split(path).peekable();
        if parts.peek().is_none() {
            return self.root.terminal_value();
        }

        let mut node = &self.root;
        let mut best = None;
        for segment in parts {
            match node.children.get(&segment.to_lowercase()) {
                Some(child) => {
                    node = child;
                    if let Some(value) = node.terminal_value() {
                        best = Some(value);
                    }
                }
                None => break,
            }
        }
        best
    }

    /// All registered paths, in no particular order.
    pub fn paths(&self) -> Vec<String> {
        self.entries().map(|(path, _)| path.to_string()).collect()
    }

    /// Iterate over every registered `(path, value)` pair.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &V)> {
        let mut stack = vec![&self.root];
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                stack.extend(node.children.values());
                if let (Some(path), Some(value)) = (node.path.as_deref(), node.value.as_ref()) {
                    return Some((path, value));
                }
            }
            None
        })
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    fn node_mut(&mut self, path: &str) -> Option<&mut Node<V>> {
        let mut node = &mut self.root;
        for segment in segments::split(path) {
            node = node.children.get_mut(&segments::key(segment))?;
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_find_exact() {
        let mut index = PathIndex::new();
        for (i, path) in ["/", "/Api", "/Api/Foo", "/Shop/Cart/Items"].iter().enumerate() {
            index.add(path, i);
        }
        assert_eq!(index.find_exact("/"), Some(&0));
        assert_eq!(index.find_exact("/Api"), Some(&1));
        assert_eq!(index.find_exact("/api/foo"), Some(&2));
        assert_eq!(index.find_exact("/SHOP/cart/items/"), Some(&3));
        assert_eq!(index.find_exact("/Shop/Cart"), None);
    }

    #[test]
    fn remove_keeps_descendants() {
        let mut index = PathIndex::new();
        index.add("/Api", "api");
        index.add("/Api/Foo", "foo");
        index.add("/Api/Bar", "bar");

        assert_eq!(index.remove("/Api"), Some("api"));
        assert_eq!(index.find_exact("/Api"), None);
        assert_eq!(index.find_exact("/Api/Foo"), Some(&"foo"));
        assert_eq!(index.find_exact("/Api/Bar"), Some(&"bar"));
        assert_eq!(index.remove("/Api"), None);
        assert_eq!(index.remove("/Missing/Path"), None);
    }

    #[test]
    fn wildcard_requires_full_consumption() {
        let mut index = PathIndex::new();
        index.add("/Items/{id}", "item");

        assert_eq!(index.find_exact("/Items/42"), Some(&"item"));
        assert_eq!(index.find_exact("/items/abc"), Some(&"item"));
        assert_eq!(index.find_exact("/Items/42/Extra"), None);
        assert_eq!(index.find_exact("/Items"), None);
    }

    #[test]
    fn literal_wins_over_wildcard() {
        let mut index = PathIndex::new();
        index.add("/Items/{id}", "any");
        index.add("/Items/special", "special");

        assert_eq!(index.find_exact("/Items/Special"), Some(&"special"));
        assert_eq!(index.find_exact("/Items/7"), Some(&"any"));
    }

    #[test]
    fn prefix_returns_closest_registered_ancestor() {
        let mut index = PathIndex::new();
        index.add("/Api/Foo", "foo");

        assert_eq!(index.find_by_prefix("/Api/Foo/Bar/Baz"), Some(&"foo"));
        assert_eq!(index.find_by_prefix("/api/foo"), Some(&"foo"));
        assert_eq!(index.find_by_prefix("/Api"), None);
        assert_eq!(index.find_by_prefix("/Api/Bar"), None);
        assert_eq!(index.find_by_prefix("/Other"), None);
    }

    #[test]
    fn prefix_prefers_most_specific() {
        let mut index = PathIndex::new();
        index.add("/Api", "api");
        index.add("/Api/Foo/Bar/Qux", "qux");

        assert_eq!(index.find_by_prefix("/Api/Foo/Bar/Zzz"), Some(&"api"));
        assert_eq!(index.find_by_prefix("/Api/Foo/Bar"), Some(&"api"));
        assert_eq!(index.find_by_prefix("/Api/Foo/Bar/Qux/1"), Some(&"qux"));
    }

    #[test]
    fn prefix_does_not_follow_wildcards() {
        let mut index = PathIndex::new();
        index.add("/Items/{id}", "item");
        assert_eq!(index.find_by_prefix("/Items/42"), None);
    }

    #[test]
    fn root_entry_only_answers_root() {
        let mut index = PathIndex::new();
        index.add("/", "root");
        assert_eq!(index.find_by_prefix("/"), Some(&"root"));
        assert_eq!(index.find_by_prefix("/Anything"), None);
    }

    #[test]
    fn paths_lists_terminal_nodes_with_original_case() {
        let mut index = PathIndex::new();
        index.add("/Api/Foo", 1);
        index.add("/Shop", 2);
        index.add("/Api/Bar", 3);
        index.remove("/Api/Bar");

        let mut paths = index.paths();
        paths.sort();
        assert_eq!(paths, vec!["/Api/Foo".to_string(), "/Shop".to_string()]);
        assert_eq!(index.len(), 2);
        assert!(!index.is_empty());
    }

    #[test]
    fn get_does_not_fall_back_to_wildcards() {
        let mut index = PathIndex::new();
        index.add("/Items/{id}", 1);
        index.add("/Shop", 2);

        assert_eq!(index.get("/Items/42"), None);
        assert_eq!(index.get("/Items/{key}"), Some(&1));
        if let Some(value) = index.get_mut("/shop") {
            *value = 5;
        }
        assert_eq!(index.get("/Shop"), Some(&5));
        assert!(index.get_mut("/Missing").is_none());
    }
}
