//! In-process bidirectional tag index (tag ↔ keys) with atomic replace.
//!
//! Implemented with two independently-guarded `DashMap`s, no cache-wide lock,
//! consistent with the concurrency model (§5) -- mirroring the owned,
//! narrow-method-surface style of the teacher's bidirectional index types
//! rather than exposing the raw maps.

use dashmap::{DashMap, DashSet};

/// Bidirectional tag index: `tag -> keys` and `key -> tags`.
#[derive(Default)]
pub struct TagIndex {
    tag_to_keys: DashMap<String, DashSet<String>>,
    key_to_tags: DashMap<String, Vec<String>>,
}

impl TagIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the tag set for `key` with `tags` (which may be empty),
    /// detaching any prior association first.
    pub fn associate(&self, key: &str, tags: &[String]) {
        self.detach(key);
        if tags.is_empty() {
            return;
        }
        for tag in tags {
            self.tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        self.key_to_tags.insert(key.to_string(), tags.to_vec());
    }

    /// Removes all tag associations for `key`. Idempotent; a no-op if untagged.
    pub fn detach(&self, key: &str) {
        let Some((_, tags)) = self.key_to_tags.remove(key) else {
            return;
        };
        for tag in tags {
            let mut drop_bucket = false;
            if let Some(bucket) = self.tag_to_keys.get(&tag) {
                bucket.remove(key);
                drop_bucket = bucket.is_empty();
            }
            if drop_bucket {
                self.tag_to_keys.remove(&tag);
            }
        }
    }

    /// Returns a point-in-time snapshot of the keys currently associated with `tag`.
    #[must_use]
    pub fn keys_for(&self, tag: &str) -> Vec<String> {
        self.tag_to_keys
            .get(tag)
            .map(|bucket| bucket.iter().map(|k| k.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of distinct tags currently holding at least one key.
    #[must_use]
    pub fn tag_count(&self) -> usize {
        self.tag_to_keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn associate_then_keys_for_returns_key() {
        let idx = TagIndex::new();
        idx.associate("k1", &["products".to_string()]);
        assert_eq!(idx.keys_for("products"), vec!["k1".to_string()]);
    }

    #[test]
    fn detach_removes_from_tag_bucket() {
        let idx = TagIndex::new();
        idx.associate("k1", &["products".to_string()]);
        idx.detach("k1");
        assert!(idx.keys_for("products").is_empty());
        assert_eq!(idx.tag_count(), 0);
    }

    #[test]
    fn re_associate_replaces_prior_set() {
        let idx = TagIndex::new();
        idx.associate("k1", &["a".to_string(), "b".to_string()]);
        idx.associate("k1", &["c".to_string()]);
        assert!(idx.keys_for("a").is_empty());
        assert!(idx.keys_for("b").is_empty());
        assert_eq!(idx.keys_for("c"), vec!["k1".to_string()]);
    }

    #[test]
    fn associate_with_empty_tags_detaches_only() {
        let idx = TagIndex::new();
        idx.associate("k1", &["a".to_string()]);
        idx.associate("k1", &[]);
        assert!(idx.keys_for("a").is_empty());
    }

    #[test]
    fn empty_tag_buckets_are_removed() {
        let idx = TagIndex::new();
        idx.associate("k1", &["a".to_string()]);
        idx.associate("k2", &["a".to_string()]);
        idx.detach("k1");
        assert_eq!(idx.tag_count(), 1);
        idx.detach("k2");
        assert_eq!(idx.tag_count(), 0);
    }

    #[test]
    fn detach_on_untagged_key_is_a_no_op() {
        let idx = TagIndex::new();
        idx.detach("never-associated");
        assert_eq!(idx.tag_count(), 0);
    }

    #[test]
    fn one_key_can_carry_multiple_tags() {
        let idx = TagIndex::new();
        idx.associate("k1", &["a".to_string(), "b".to_string()]);
        assert_eq!(idx.keys_for("a"), vec!["k1".to_string()]);
        assert_eq!(idx.keys_for("b"), vec!["k1".to_string()]);
    }

    #[test]
    fn one_tag_can_carry_multiple_keys() {
        let idx = TagIndex::new();
        idx.associate("k1", &["a".to_string()]);
        idx.associate("k2", &["a".to_string()]);
        let mut keys = idx.keys_for("a");
        keys.sort();
        assert_eq!(keys, vec!["k1".to_string(), "k2".to_string()]);
    }
}
