//! Tag normalization.

use domains::TagList;

/// Turns `"a, b,,a"` or `["a", " b"]` into `["a", "b"]`: trimmed, empty
/// entries dropped, duplicates removed keeping first occurrence.
pub fn normalize(input: TagList) -> Vec<String> {
    let raw: Vec<String> = match input {
        TagList::Delimited(joined) => joined.split(',').map(str::to_string).collect(),
        TagList::List(list) => list,
    };

    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}
