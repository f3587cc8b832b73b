//! Hierarchy index: validates that a flat issue set forms a single rooted tree
//! and yields the traversal orders the roll-up and the report need.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::models::issue::Issue;
use crate::rollup::HierarchyDefect;

/// Parent/child index over a borrowed issue snapshot.
#[derive(Debug)]
pub struct Hierarchy<'a> {
    root: &'a str,
    index: HashMap<&'a str, &'a Issue>,
    children: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> Hierarchy<'a> {
    /// Builds and validates the index. The whole set is rejected on the first defect.
    pub fn build(issues: &'a [Issue]) -> Result<Self, HierarchyDefect> {
        if issues.is_empty() {
            return Err(HierarchyDefect::Empty);
        }

        let mut index: HashMap<&'a str, &'a Issue> = HashMap::with_capacity(issues.len());
        for issue in issues {
            if index.insert(issue.key.as_str(), issue).is_some() {
                return Err(HierarchyDefect::DuplicateKey(issue.key.clone()));
            }
        }

        let mut children: HashMap<&'a str, Vec<&'a str>> = HashMap::new();
        let mut roots: Vec<&'a str> = Vec::new();
        for issue in issues {
            match issue.parent_key.as_deref() {
                None => roots.push(issue.key.as_str()),
                Some(parent) if parent == issue.key => {
                    return Err(HierarchyDefect::Cycle(vec![issue.key.clone()]));
                }
                Some(parent) => {
                    let Some((&parent_key, _)) = index.get_key_value(parent) else {
                        return Err(HierarchyDefect::DanglingParent {
                            child: issue.key.clone(),
                            parent: parent.to_string(),
                        });
                    };
                    children.entry(parent_key).or_default().push(issue.key.as_str());
                }
            }
        }

        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| compare_keys(a, b));
        }

        if roots.len() > 1 {
            roots.sort_by(|a, b| compare_keys(a, b));
            return Err(HierarchyDefect::MultipleRoots(
                roots.into_iter().map(str::to_string).collect(),
            ));
        }

        let Some(&root) = roots.first() else {
            // Every issue has a resolvable parent, so every issue sits on or below a cycle.
            return Err(HierarchyDefect::Cycle(find_cycle(&index, smallest_key(&index))));
        };

        let hierarchy = Self {
            root,
            index,
            children,
        };

        let reachable: HashSet<&str> = hierarchy.post_order().into_iter().collect();
        if reachable.len() != hierarchy.index.len() {
            let stranded = hierarchy
                .index
                .keys()
                .copied()
                .filter(|k| !reachable.contains(k))
                .min_by(|a, b| compare_keys(a, b))
                .unwrap_or(root);
            return Err(HierarchyDefect::Cycle(find_cycle(&hierarchy.index, stranded)));
        }

        Ok(hierarchy)
    }

    pub fn root(&self) -> &'a str {
        self.root
    }

    pub fn issue(&self, key: &str) -> Option<&'a Issue> {
        self.index.get(key).copied()
    }

    /// Direct children in natural key order.
    pub fn children_of(&self, key: &str) -> &[&'a str] {
        self.children.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every node after all of its children; the root comes last.
    pub fn post_order(&self) -> Vec<&'a str> {
        let mut order = Vec::with_capacity(self.index.len());
        let mut stack: Vec<(&'a str, bool)> = vec![(self.root, false)];
        while let Some((key, expanded)) = stack.pop() {
            if expanded {
                order.push(key);
                continue;
            }
            stack.push((key, true));
            for &child in self.children_of(key).iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Distance from the root for every node.
    pub fn depths(&self) -> HashMap<&'a str, usize> {
        let mut depths = HashMap::with_capacity(self.index.len());
        let mut stack: Vec<(&'a str, usize)> = vec![(self.root, 0)];
        while let Some((key, depth)) = stack.pop() {
            depths.insert(key, depth);
            for &child in self.children_of(key) {
                stack.push((child, depth + 1));
            }
        }
        depths
    }
}

/// Natural ordering for Jira keys: project prefix first, then the numeric suffix,
/// so `OPS-2` sorts before `OPS-10`. Within a prefix, a non-numeric suffix sorts
/// before every numeric one. Total, so sibling order never depends on input order.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

fn sort_key(key: &str) -> (&str, Option<u64>, &str) {
    match key.rsplit_once('-') {
        Some((prefix, suffix)) => (prefix, suffix.parse().ok(), key),
        None => (key, None, key),
    }
}

fn smallest_key<'a>(index: &HashMap<&'a str, &'a Issue>) -> &'a str {
    index
        .keys()
        .copied()
        .min_by(|a, b| compare_keys(a, b))
        .unwrap_or_default()
}

/// Follows parent links from `start` until a key repeats and returns the loop,
/// beginning at the first repeated key.
fn find_cycle(index: &HashMap<&str, &Issue>, start: &str) -> Vec<String> {
    let mut path: Vec<&str> = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut current = Some(start);

    while let Some(key) = current {
        if let Some(&at) = seen.get(key) {
            return path[at..].iter().map(|k| k.to_string()).collect();
        }
        seen.insert(key, path.len());
        path.push(key);
        current = index
            .get(key)
            .and_then(|issue| issue.parent_key.as_deref());
    }

    path.into_iter().map(str::to_string).collect()
}
