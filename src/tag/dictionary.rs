//! Backing store for Compound tags.

use std::collections::HashMap;

use crate::error::{Error, Result};

use super::{Tag, TagLink};

/// An insertion-ordered collection of tags keyed by their names.
///
/// Iteration and serialization follow insertion order; lookup by name goes
/// through an auxiliary name-to-position index that is kept in sync across
/// inserts, removals, and renames. Names are unique within one dictionary.
pub struct TagDictionary {
    items: Vec<Tag>,
    index: HashMap<String, usize>,
}

impl TagDictionary {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when a tag with the given name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Looks up a tag by name. Absence is not an error.
    pub fn get(&self, name: &str) -> Option<Tag> {
        self.index
            .get(name)
            .and_then(|&position| self.items.get(position))
            .cloned()
    }

    /// The tag at the given insertion position, if any.
    pub fn get_at(&self, index: usize) -> Option<Tag> {
        self.items.get(index).cloned()
    }

    /// A snapshot of the tags, in insertion order.
    pub fn tags(&self) -> Vec<Tag> {
        self.items.clone()
    }

    pub(crate) fn insert_item(&mut self, owner: &TagLink, tag: Tag) -> Result<()> {
        let name = tag.name();
        if self.index.contains_key(&name) {
            return Err(Error::usage(format!(
                "a tag named {:?} already exists in this compound",
                name
            )));
        }
        tag.set_parent(owner.clone());
        self.index.insert(name, self.items.len());
        self.items.push(tag);
        Ok(())
    }

    /// Moves the lookup key of an attached tag. Invoked by `Tag::set_name`;
    /// the position index stays aligned with the actual tag order.
    pub(crate) fn change_key(&mut self, old: &str, new: &str) -> Result<()> {
        if self.index.contains_key(new) {
            return Err(Error::usage(format!(
                "a tag named {:?} already exists in this compound",
                new
            )));
        }
        match self.index.remove(old) {
            Some(position) => {
                self.index.insert(new.to_owned(), position);
                Ok(())
            }
            None => Err(Error::usage(format!(
                "no tag named {:?} in this compound",
                old
            ))),
        }
    }

    pub(crate) fn remove_named(&mut self, name: &str) -> Option<Tag> {
        let position = self.index.get(name).copied()?;
        let tag = self.items.remove(position);
        tag.clear_parent();
        self.rebuild_index();
        Some(tag)
    }

    pub(crate) fn remove_item(&mut self, tag: &Tag) -> bool {
        match self.items.iter().position(|item| item.ptr_eq(tag)) {
            Some(position) => {
                let removed = self.items.remove(position);
                removed.clear_parent();
                self.rebuild_index();
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear_items(&mut self) {
        for item in &self.items {
            item.clear_parent();
        }
        self.items.clear();
        self.index.clear();
    }

    /// Inserts a tag the codecs assembled, before the owning compound tag
    /// exists. Duplicate names are still rejected; parent links are fixed
    /// when the payload is installed into a tag.
    pub(crate) fn insert_orphan(&mut self, tag: Tag) -> Result<()> {
        let name = tag.name();
        if self.index.contains_key(&name) {
            return Err(Error::usage(format!(
                "a tag named {:?} already exists in this compound",
                name
            )));
        }
        self.index.insert(name, self.items.len());
        self.items.push(tag);
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(position, tag)| (tag.name(), position))
            .collect();
    }
}

impl Default for TagDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TagDictionary {
    /// Children compare pairwise in insertion order.
    fn eq(&self, other: &TagDictionary) -> bool {
        self.items == other.items
    }
}
