// src/ingest/tags.rs
use std::collections::HashSet;

/// Canonicalizes provider tags: trim, lowercase, drop blanks, dedup in
/// first-seen order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagNormalizer;

impl TagNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize<S: AsRef<str>>(&self, raw: &[S]) -> Vec<String> {
        let mut seen = HashSet::with_capacity(raw.len());
        let mut out = Vec::with_capacity(raw.len());
        for tag in raw {
            let cleaned = tag.as_ref().trim().to_lowercase();
            if cleaned.is_empty() {
                continue;
            }
            if seen.insert(cleaned.clone()) {
                out.push(cleaned);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_lowercases() {
        let n = TagNormalizer::new();
        assert_eq!(n.normalize(&[" Go ", "python", "JAVA "]), vec!["go", "python", "java"]);
    }

    #[test]
    fn dedups_case_variants() {
        assert_eq!(TagNormalizer.normalize(&["go", "Go", "GO"]), vec!["go"]);
    }

    #[test]
    fn drops_blank_entries() {
        assert_eq!(TagNormalizer.normalize(&["", "  ", "valid"]), vec!["valid"]);
        assert!(TagNormalizer.normalize::<&str>(&[]).is_empty());
    }

    #[test]
    fn keeps_first_seen_order() {
        assert_eq!(
            TagNormalizer.normalize(&["b", "a", " B", "c", "a"]),
            vec!["b", "a", "c"]
        );
    }
}
