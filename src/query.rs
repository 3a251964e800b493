//! Path-based navigation of a materialized tag tree.
//!
//! A path is a sequence of segments separated by `\` or `/`. A plain
//! segment looks up a compound member; an integer segment indexes into a
//! list; a `[field=value]` segment scans a list of compounds for the first
//! element whose `field` child holds the string `value`. Matching is
//! literal, with no wildcards and no escaping. Any segment that cannot be
//! resolved ends the walk with `None`; resolution never fails.

use crate::tag::Tag;
use crate::TagType;

const DELIMITERS: &[char] = &['\\', '/'];

pub(crate) fn resolve(root: &Tag, path: &str) -> Option<Tag> {
    let mut current = root.clone();
    for segment in path.split(DELIMITERS) {
        current = resolve_segment(&current, segment)?;
    }
    Some(current)
}

fn resolve_segment(current: &Tag, segment: &str) -> Option<Tag> {
    if segment.contains('[') {
        return resolve_predicate(current, segment);
    }

    match current.tag_type() {
        // Inside a list only a non-negative index resolves.
        TagType::List => {
            let index: usize = segment.parse().ok()?;
            current.get_at(index)
        }
        // Inside a compound every segment, numeric or not, is a name.
        TagType::Compound => current.get(segment),
        _ => None,
    }
}

/// `[field=value]`: the first compound element of the current list whose
/// `field` child is a String tag holding exactly `value`.
fn resolve_predicate(current: &Tag, segment: &str) -> Option<Tag> {
    if !segment.starts_with('[') || !segment.ends_with(']') || segment.len() < 2 {
        return None;
    }
    let eq = segment.find('=')?;
    let field = segment.get(1..eq)?;
    let value = segment.get(eq + 1..segment.len() - 1)?;

    if current.tag_type() != TagType::List {
        return None;
    }

    current.children().into_iter().find(|child| {
        child.tag_type() == TagType::Compound
            && child
                .get(field)
                .and_then(|tag| tag.as_string())
                .map(|s| s == value)
                .unwrap_or(false)
    })
}
