//! The user's chosen genre tags.

use crate::models::{SearchRequest, Tag};

/// Upper bound on simultaneously selected tags.
pub const MAX_SELECTED_TAGS: usize = 6;

/// Ordered set of selected tags, unique by id and capped at [`MAX_SELECTED_TAGS`].
///
/// Every operation is total: invalid requests are silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSelection {
    tags: Vec<Tag>,
}

impl TagSelection {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `tag` unless the selection is full or already holds its id.
    ///
    /// Returns whether the tag was added.
    pub fn add_tag(&mut self, tag: Tag) -> bool {
        if self.is_full() || self.contains(&tag.id) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Remove the tag with `tag_id`, if present. Returns whether anything changed.
    pub fn remove_tag(&mut self, tag_id: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|tag| tag.id != tag_id);
        self.tags.len() != before
    }

    /// Add the tag if absent, remove it if present.
    pub fn toggle(&mut self, tag: Tag) -> bool {
        if self.contains(&tag.id) {
            self.remove_tag(&tag.id)
        } else {
            self.add_tag(tag)
        }
    }

    /// Drop every selected tag.
    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }

    /// Whether a tag with `tag_id` is selected.
    pub fn contains(&self, tag_id: &str) -> bool {
        self.tags.iter().any(|tag| tag.id == tag_id)
    }

    /// Whether no further tag can be added.
    pub fn is_full(&self) -> bool {
        self.tags.len() >= MAX_SELECTED_TAGS
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Number of selected tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// How many more tags may be selected.
    pub fn remaining(&self) -> usize {
        MAX_SELECTED_TAGS.saturating_sub(self.tags.len())
    }

    /// Selected tags in insertion order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Snapshot the selection as a search request.
    pub fn to_request(&self) -> SearchRequest {
        SearchRequest::from_tags(&self.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: usize) -> Tag {
        Tag::new(id.to_string(), format!("Genre {id}"))
    }

    #[test]
    fn caps_at_six_and_ignores_duplicates() {
        let mut selection = TagSelection::new();
        // Interleave duplicates with fresh ids in a scrambled order.
        let ids = [3, 1, 3, 4, 1, 9, 2, 2, 7, 8, 5, 6];
        for id in ids {
            selection.add_tag(tag(id));
            assert!(selection.len() <= MAX_SELECTED_TAGS);
            let mut seen: Vec<&str> = selection.tags().iter().map(|t| t.id.as_str()).collect();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), selection.len(), "duplicate id in selection");
        }

        let order: Vec<&str> = selection.tags().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["3", "1", "4", "9", "2", "7"]);
        assert!(selection.is_full());
        assert_eq!(selection.remaining(), 0);
        assert!(!selection.add_tag(tag(42)));
    }

    #[test]
    fn remove_then_add_restores_tag() {
        let mut selection = TagSelection::new();
        for id in 0..MAX_SELECTED_TAGS {
            selection.add_tag(tag(id));
        }

        assert!(selection.remove_tag("2"));
        assert!(!selection.contains("2"));
        assert!(selection.add_tag(tag(2)));
        assert!(selection.contains("2"));
        assert_eq!(selection.len(), MAX_SELECTED_TAGS);
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let mut selection = TagSelection::new();
        selection.add_tag(tag(1));
        assert!(!selection.remove_tag("missing"));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn toggle_and_clear() {
        let mut selection = TagSelection::new();
        assert!(selection.toggle(tag(1)));
        assert!(selection.toggle(tag(2)));
        assert!(selection.toggle(tag(1)));
        assert_eq!(selection.to_request().tags, vec!["Genre 2"]);

        selection.clear_tags();
        assert!(selection.is_empty());
        assert_eq!(selection.remaining(), MAX_SELECTED_TAGS);
    }
}
