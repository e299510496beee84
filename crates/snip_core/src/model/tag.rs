//! Tag records and tag-list parsing.

use serde::{Deserialize, Serialize};

/// Store-assigned tag identity (`tags.id`).
pub type TagId = i64;

/// Named label attachable to many notes. `name` is unique in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// Splits a space-separated tag string into distinct names.
///
/// Empty fragments are skipped and first-seen order is kept.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for fragment in raw.split_whitespace() {
        if !names.iter().any(|existing| existing == fragment) {
            names.push(fragment.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::parse_tag_list;

    #[test]
    fn parse_tag_list_skips_blanks_and_duplicates() {
        assert_eq!(
            parse_tag_list("  work home  work urgent "),
            vec!["work", "home", "urgent"]
        );
    }

    #[test]
    fn parse_tag_list_of_blank_input_is_empty() {
        assert!(parse_tag_list("   ").is_empty());
    }
}
