//! The path trie for a single HTTP method.

use crate::pattern::{Pattern, Segment};

/// Segment kind of a trie node. Ordering is lookup precedence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    #[default]
    Static,
    Param,
    Wildcard,
}

/// A single node in the path trie.
#[derive(Debug, Default)]
pub struct Node {
    /// Segment text as written in the pattern (`users`, `:id`, `*rest`).
    /// Empty at the root.
    segment: String,
    kind: Kind,
    /// Set only on nodes that terminate a registered pattern.
    pattern: Option<Pattern>,
    /// Children ordered by kind (static, param, wildcard), then by
    /// insertion.
    children: Vec<Node>,
}

impl Node {
    /// Create an empty root.
    pub fn root() -> Self {
        Self::default()
    }

    fn child(segment: &Segment) -> Self {
        let kind = match segment {
            Segment::Static(_) => Kind::Static,
            Segment::Param(_) => Kind::Param,
            Segment::Wildcard(_) => Kind::Wildcard,
        };
        Node {
            segment: segment.to_string(),
            kind,
            pattern: None,
            children: Vec::new(),
        }
    }

    /// The matched pattern, if this node terminates a route.
    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.pattern.is_some()
    }

    /// Insert a pattern below this node.
    ///
    /// Existing children are reused only when their segment text is
    /// identical. Inserting the same pattern twice replaces the terminal
    /// marker and leaves the shape of the tree unchanged.
    pub fn insert(&mut self, pattern: Pattern) {
        let mut current = self;
        for segment in pattern.segments() {
            let candidate = Node::child(segment);
            let index = match current
                .children
                .iter()
                .position(|c| c.segment == candidate.segment)
            {
                Some(index) => index,
                None => {
                    let at = current
                        .children
                        .iter()
                        .position(|c| c.kind > candidate.kind)
                        .unwrap_or(current.children.len());
                    current.children.insert(at, candidate);
                    at
                }
            };
            current = &mut current.children[index];
        }
        current.pattern = Some(pattern);
    }

    /// Find the terminal node matching the given path segments.
    ///
    /// Every child that can accept the next segment is tried in order,
    /// depth-first; the first subtree that reaches a terminal wins.
    pub fn search(&self, segments: &[&str]) -> Option<&Node> {
        if self.kind == Kind::Wildcard {
            return self.is_terminal().then_some(self);
        }

        let Some((head, rest)) = segments.split_first() else {
            if self.is_terminal() {
                return Some(self);
            }
            // A trailing wildcard also matches an empty remainder.
            return self
                .children
                .iter()
                .find(|c| c.kind == Kind::Wildcard && c.is_terminal());
        };

        self.children
            .iter()
            .filter(|child| match child.kind {
                Kind::Static => child.segment == *head,
                Kind::Param | Kind::Wildcard => true,
            })
            .find_map(|child| child.search(rest))
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::split_path;

    fn trie(patterns: &[&str]) -> Node {
        let mut root = Node::root();
        for p in patterns {
            root.insert(Pattern::parse(p).expect("valid pattern"));
        }
        root
    }

    fn lookup<'a>(root: &'a Node, path: &str) -> Option<&'a str> {
        let segments: Vec<&str> = split_path(path).collect();
        root.search(&segments)
            .and_then(Node::pattern)
            .map(Pattern::as_str)
    }

    #[test]
    fn static_path() {
        let root = trie(&["/health"]);
        assert_eq!(lookup(&root, "/health"), Some("/health"));
        assert_eq!(lookup(&root, "/healthz"), None);
    }

    #[test]
    fn intermediate_nodes_are_not_terminals() {
        let root = trie(&["/a/b/c"]);
        assert_eq!(lookup(&root, "/a/b"), None);
        assert_eq!(lookup(&root, "/a/b/c/d"), None);
    }

    #[test]
    fn root_path() {
        let root = trie(&["/"]);
        assert_eq!(lookup(&root, "/"), Some("/"));
        assert_eq!(lookup(&root, ""), Some("/"));
    }

    #[test]
    fn param_matches_one_segment() {
        let root = trie(&["/hello/:name"]);
        assert_eq!(lookup(&root, "/hello/zero"), Some("/hello/:name"));
        assert_eq!(lookup(&root, "/hello"), None);
        assert_eq!(lookup(&root, "/hello/a/b"), None);
    }

    #[test]
    fn wildcard_matches_remaining_segments() {
        let root = trie(&["/assets/*filepath"]);
        assert_eq!(lookup(&root, "/assets/app.css"), Some("/assets/*filepath"));
        assert_eq!(
            lookup(&root, "/assets/css/vendor/app.css"),
            Some("/assets/*filepath")
        );
    }

    #[test]
    fn wildcard_matches_empty_remainder() {
        let root = trie(&["/assets/*filepath"]);
        assert_eq!(lookup(&root, "/assets"), Some("/assets/*filepath"));
    }

    #[test]
    fn exact_terminal_beats_empty_wildcard() {
        let root = trie(&["/assets/*filepath", "/assets"]);
        assert_eq!(lookup(&root, "/assets"), Some("/assets"));
    }

    #[test]
    fn static_takes_precedence_over_param_regardless_of_order() {
        let root = trie(&["/users/:id", "/users/me"]);
        assert_eq!(lookup(&root, "/users/me"), Some("/users/me"));
        assert_eq!(lookup(&root, "/users/42"), Some("/users/:id"));
    }

    #[test]
    fn param_takes_precedence_over_wildcard() {
        let root = trie(&["/files/*path", "/files/:name"]);
        assert_eq!(lookup(&root, "/files/readme.txt"), Some("/files/:name"));
        assert_eq!(lookup(&root, "/files/a/b.txt"), Some("/files/*path"));
    }

    #[test]
    fn literal_route_is_not_grafted_under_param() {
        let root = trie(&["/hello/:name", "/hello/b/c"]);
        assert_eq!(lookup(&root, "/hello/b/c"), Some("/hello/b/c"));
        assert_eq!(lookup(&root, "/hello/x/c"), None);
        assert_eq!(lookup(&root, "/hello/b"), Some("/hello/:name"));
    }

    #[test]
    fn backtracks_across_siblings() {
        let root = trie(&["/users/:id", "/users/:name/posts", "/users/me/settings"]);
        assert_eq!(lookup(&root, "/users/me/posts"), Some("/users/:name/posts"));
        assert_eq!(lookup(&root, "/users/me/settings"), Some("/users/me/settings"));
        assert_eq!(lookup(&root, "/users/7"), Some("/users/:id"));
    }

    #[test]
    fn reinsert_keeps_tree_shape() {
        let mut root = trie(&["/test/:id/:name"]);
        let before = root.node_count();
        root.insert(Pattern::parse("/test/:id/:name").expect("valid pattern"));
        assert_eq!(root.node_count(), before);
        assert_eq!(lookup(&root, "/test/11/zero"), Some("/test/:id/:name"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let root = trie(&["/Users"]);
        assert_eq!(lookup(&root, "/users"), None);
        assert_eq!(lookup(&root, "/Users"), Some("/Users"));
    }

    #[test]
    fn children_ordered_by_kind() {
        let root = trie(&["/x/*rest", "/x/:id", "/x/lit"]);
        let x = &root.children[0];
        let kinds: Vec<Kind> = x.children.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![Kind::Static, Kind::Param, Kind::Wildcard]);
    }
}
