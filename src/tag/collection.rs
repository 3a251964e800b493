//! Backing store for List tags.

use crate::error::{Error, Result};
use crate::TagType;

use super::{Tag, TagLink};

/// An ordered sequence of unnamed tags that all share one element type.
///
/// The element type is frozen by the first successful insertion (or declared
/// up front via [`TagCollection::with_limit`]) and never changes for the
/// collection's lifetime. Mutation happens through the owning [`Tag`], which
/// supplies the parent link for inserted children.
pub struct TagCollection {
    limit: Option<TagType>,
    items: Vec<Tag>,
}

impl TagCollection {
    /// An empty sequence with no declared element type yet.
    pub fn new() -> Self {
        Self {
            limit: None,
            items: Vec::new(),
        }
    }

    /// An empty sequence whose element type is declared up front.
    pub fn with_limit(limit: TagType) -> Self {
        Self {
            limit: Some(limit),
            items: Vec::new(),
        }
    }

    /// The declared element type, or `None` if nothing was ever inserted.
    pub fn limit_type(&self) -> Option<TagType> {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The element at `index`, if any.
    pub fn get(&self, index: usize) -> Option<Tag> {
        self.items.get(index).cloned()
    }

    /// A snapshot of the elements, in order.
    pub fn tags(&self) -> Vec<Tag> {
        self.items.clone()
    }

    fn check_type(&self, tag: &Tag) -> Result<()> {
        match self.limit {
            Some(limit) if tag.tag_type() != limit => Err(Error::usage(format!(
                "only {} tags can be added to this list, got {}",
                limit,
                tag.tag_type()
            ))),
            _ => Ok(()),
        }
    }

    pub(crate) fn insert_item(&mut self, owner: &TagLink, tag: Tag) -> Result<()> {
        if !tag.name().is_empty() {
            return Err(Error::usage("only unnamed tags can be added to a list"));
        }
        self.check_type(&tag)?;
        if self.limit.is_none() {
            self.limit = Some(tag.tag_type());
        }
        tag.set_parent(owner.clone());
        self.items.push(tag);
        Ok(())
    }

    pub(crate) fn set_item(&mut self, owner: &TagLink, index: usize, tag: Tag) -> Result<()> {
        if index >= self.items.len() {
            return Err(Error::usage(format!(
                "index {} out of range for a list of {} elements",
                index,
                self.items.len()
            )));
        }
        if !tag.name().is_empty() {
            return Err(Error::usage("only unnamed tags can be added to a list"));
        }
        self.check_type(&tag)?;
        self.items[index].clear_parent();
        tag.set_parent(owner.clone());
        self.items[index] = tag;
        Ok(())
    }

    pub(crate) fn remove_index(&mut self, index: usize) -> Option<Tag> {
        if index >= self.items.len() {
            return None;
        }
        let tag = self.items.remove(index);
        tag.clear_parent();
        Some(tag)
    }

    pub(crate) fn remove_item(&mut self, tag: &Tag) -> bool {
        match self.items.iter().position(|item| item.ptr_eq(tag)) {
            Some(index) => {
                self.remove_index(index);
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
    }

    /// Appends a tag the codecs have already validated, before the owning
    /// list tag exists. Parent links are fixed when the payload is installed
    /// into a tag.
    pub(crate) fn push_orphan(&mut self, tag: Tag) {
        if self.limit.is_none() {
            self.limit = Some(tag.tag_type());
        }
        self.items.push(tag);
    }
}

impl Default for TagCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TagCollection {
    /// Elements compare pairwise in order. The declared element type of an
    /// empty collection is not part of equality.
    fn eq(&self, other: &TagCollection) -> bool {
        self.items == other.items
    }
}
