//! File selection with keyboard-style navigation.
//!
//! The browser keeps at most one file selected. Toggling a different id
//! replaces the selection instead of adding to it.

use filebox_common::FileId;

use crate::models::FileEntry;

/// Selected file ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<FileId>,
}

impl Selection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if `id` is selected.
    pub fn contains(&self, id: &FileId) -> bool {
        self.ids.contains(id)
    }

    /// Deselect `id` if selected, otherwise make it the only selection.
    pub fn toggle(&mut self, id: &FileId) {
        if self.contains(id) {
            self.ids.retain(|selected| selected != id);
        } else {
            self.ids = vec![id.clone()];
        }
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Selected ids.
    pub fn ids(&self) -> &[FileId] {
        &self.ids
    }

    /// The single selected id.
    pub fn current(&self) -> Option<&FileId> {
        self.ids.first()
    }

    /// Check if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Move the selection to the next entry of `files`.
    ///
    /// Returns whether the selection changed. No-op when nothing is
    /// selected, when the selection is not in `files`, or at the end.
    pub fn select_next(&mut self, files: &[FileEntry]) -> bool {
        self.step(files, 1)
    }

    /// Move the selection to the previous entry of `files`.
    pub fn select_previous(&mut self, files: &[FileEntry]) -> bool {
        self.step(files, -1)
    }

    fn step(&mut self, files: &[FileEntry], offset: isize) -> bool {
        let Some(current) = self.current() else {
            return false;
        };
        let Some(position) = files.iter().position(|f| &f.id == current) else {
            return false;
        };
        let Some(target) = position.checked_add_signed(offset) else {
            return false;
        };
        match files.get(target) {
            Some(next) => {
                self.ids = vec![next.id.clone()];
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(s: &str) -> FileId {
        FileId::new(s).unwrap()
    }

    fn files(ids: &[&str]) -> Vec<FileEntry> {
        ids.iter()
            .map(|s| FileEntry::new(id(s), format!("{}.txt", s), false))
            .collect()
    }

    #[test]
    fn test_toggle_selects_then_clears() {
        let mut selection = Selection::new();
        selection.toggle(&id("a"));
        assert_eq!(selection.ids(), &[id("a")]);

        selection.toggle(&id("a"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle_other_replaces() {
        let mut selection = Selection::new();
        selection.toggle(&id("a"));
        selection.toggle(&id("b"));
        assert_eq!(selection.ids(), &[id("b")]);
        assert!(!selection.contains(&id("a")));
    }

    #[test]
    fn test_next_and_previous() {
        let list = files(&["a", "b", "c"]);
        let mut selection = Selection::new();
        selection.toggle(&id("b"));

        assert!(selection.select_next(&list));
        assert_eq!(selection.current(), Some(&id("c")));

        assert!(selection.select_previous(&list));
        assert!(selection.select_previous(&list));
        assert_eq!(selection.current(), Some(&id("a")));
    }

    #[test]
    fn test_boundaries_are_noops() {
        let list = files(&["a", "b"]);
        let mut selection = Selection::new();

        selection.toggle(&id("a"));
        assert!(!selection.select_previous(&list));
        assert_eq!(selection.current(), Some(&id("a")));

        selection.toggle(&id("b"));
        assert!(!selection.select_next(&list));
        assert_eq!(selection.current(), Some(&id("b")));
    }

    #[test]
    fn test_empty_or_stale_selection_is_noop() {
        let list = files(&["a", "b"]);
        let mut selection = Selection::new();
        assert!(!selection.select_next(&list));
        assert!(selection.is_empty());

        selection.toggle(&id("gone"));
        assert!(!selection.select_next(&list));
        assert!(!selection.select_previous(&list));
        assert_eq!(selection.current(), Some(&id("gone")));
    }

    proptest! {
        #[test]
        fn prop_toggles_never_select_more_than_one(
            toggles in proptest::collection::vec(0usize..5, 0..50)
        ) {
            let mut selection = Selection::new();
            for t in toggles {
                selection.toggle(&id(&format!("f{}", t)));
                prop_assert!(selection.ids().len() <= 1);
            }
        }

        #[test]
        fn prop_navigation_stays_in_list(
            len in 1usize..10,
            start in 0usize..10,
            moves in proptest::collection::vec(any::<bool>(), 0..30)
        ) {
            let names: Vec<String> = (0..len).map(|i| format!("f{}", i)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let list = files(&refs);

            let mut selection = Selection::new();
            selection.toggle(&list[start % len].id);
            for forward in moves {
                if forward {
                    selection.select_next(&list);
                } else {
                    selection.select_previous(&list);
                }
                let current = selection.current().unwrap();
                prop_assert!(list.iter().any(|f| &f.id == current));
            }
        }
    }
}
