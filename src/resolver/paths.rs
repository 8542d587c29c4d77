//! Search path lists shared by both resolution strategies.

use std::path::{Path, PathBuf};

use crate::resolver::strategy::StrategyResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SearchPathKind {
    Pre,
    Post,
}

/// A view over one search path list of an [`AssemblyResolver`](super::AssemblyResolver).
///
/// Reads come from the exact strategy. Writes go to both strategies, so the two lists
/// never drift apart.
pub struct SearchPathList<'a> {
    strategies: [&'a StrategyResolver; 2],
    kind: SearchPathKind,
}

impl<'a> SearchPathList<'a> {
    pub(crate) fn new(strategies: [&'a StrategyResolver; 2], kind: SearchPathKind) -> Self {
        SearchPathList { strategies, kind }
    }

    fn update(&self, mut apply: impl FnMut(&mut Vec<PathBuf>)) {
        for strategy in self.strategies {
            let list = match self.kind {
                SearchPathKind::Pre => &strategy.pre_search_paths,
                SearchPathKind::Post => &strategy.post_search_paths,
            };
            apply(&mut write_lock!(list));
        }
    }

    fn read<T>(&self, inspect: impl FnOnce(&Vec<PathBuf>) -> T) -> T {
        let primary = self.strategies[0];
        let list = match self.kind {
            SearchPathKind::Pre => &primary.pre_search_paths,
            SearchPathKind::Post => &primary.post_search_paths,
        };
        inspect(&read_lock!(list))
    }

    /// Appends a directory.
    pub fn push(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.update(|list| list.push(path.clone()));
    }

    /// Inserts a directory at `index`, or appends it if `index` is past the end.
    pub fn insert(&self, index: usize, path: impl Into<PathBuf>) {
        let path = path.into();
        self.update(|list| list.insert(index.min(list.len()), path.clone()));
    }

    /// Removes the first occurrence of `path`. Returns true if it was present.
    pub fn remove(&self, path: &Path) -> bool {
        let present = self.contains(path);
        self.update(|list| {
            if let Some(position) = list.iter().position(|entry| entry == path) {
                list.remove(position);
            }
        });
        present
    }

    /// Removes and returns the directory at `index`.
    pub fn remove_at(&self, index: usize) -> Option<PathBuf> {
        let removed = self.get(index)?;
        self.update(|list| {
            if index < list.len() {
                list.remove(index);
            }
        });
        Some(removed)
    }

    /// Removes every directory.
    pub fn clear(&self) {
        self.update(Vec::clear);
    }

    /// Returns true if `path` is listed.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.read(|list| list.iter().any(|entry| entry == path))
    }

    /// Number of directories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read(Vec::len)
    }

    /// Returns true if no directory is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The directory at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<PathBuf> {
        self.read(|list| list.get(index).cloned())
    }

    /// Snapshot of the list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<PathBuf> {
        self.read(Clone::clone)
    }
}
