//! The materialized tag tree.
//!
//! A [`Tag`] is a cheap-to-clone handle onto one node of a document tree.
//! Containers own their children; each child keeps a non-owning back
//! reference to its parent, which is how [`Tag::full_path`] and compound key
//! renames work. The tree is strictly single-threaded: handles are neither
//! `Send` nor `Sync`.

mod collection;
mod dictionary;

pub use collection::TagCollection;
pub use dictionary::TagDictionary;

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{Error, Result};
use crate::{query, TagType};

pub(crate) type TagCell = RefCell<TagInner>;

/// Non-owning link from a child back to its enclosing container.
pub(crate) type TagLink = Weak<TagCell>;

pub(crate) struct TagInner {
    name: String,
    parent: TagLink,
    value: TagValue,
}

/// The payload of a single tag, one variant per [`TagType`].
pub enum TagValue {
    End,
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    String(String),
    List(TagCollection),
    Compound(TagDictionary),
    IntArray(Vec<i32>),
}

impl TagValue {
    /// The tag type this payload belongs to.
    pub fn tag_type(&self) -> TagType {
        match self {
            TagValue::End => TagType::End,
            TagValue::Byte(_) => TagType::Byte,
            TagValue::Short(_) => TagType::Short,
            TagValue::Int(_) => TagType::Int,
            TagValue::Long(_) => TagType::Long,
            TagValue::Float(_) => TagType::Float,
            TagValue::Double(_) => TagType::Double,
            TagValue::ByteArray(_) => TagType::ByteArray,
            TagValue::String(_) => TagType::String,
            TagValue::List(_) => TagType::List,
            TagValue::Compound(_) => TagType::Compound,
            TagValue::IntArray(_) => TagType::IntArray,
        }
    }

    fn default_for(kind: TagType) -> TagValue {
        match kind {
            TagType::End => TagValue::End,
            TagType::Byte => TagValue::Byte(0),
            TagType::Short => TagValue::Short(0),
            TagType::Int => TagValue::Int(0),
            TagType::Long => TagValue::Long(0),
            TagType::Float => TagValue::Float(0.0),
            TagType::Double => TagValue::Double(0.0),
            TagType::ByteArray => TagValue::ByteArray(Vec::new()),
            TagType::String => TagValue::String(String::new()),
            TagType::List => TagValue::List(TagCollection::new()),
            TagType::Compound => TagValue::Compound(TagDictionary::new()),
            TagType::IntArray => TagValue::IntArray(Vec::new()),
        }
    }
}

impl PartialEq for TagValue {
    fn eq(&self, other: &TagValue) -> bool {
        use TagValue::*;
        match (self, other) {
            (End, End) => true,
            (Byte(a), Byte(b)) => a == b,
            (Short(a), Short(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            // NaN payloads must round-trip, so NaN compares equal to NaN.
            (Float(a), Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Double(a), Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            (ByteArray(a), ByteArray(b)) => a == b,
            (String(a), String(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Compound(a), Compound(b)) => a == b,
            (IntArray(a), IntArray(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tag_type(), self.value_string())
    }
}

macro_rules! from {
    ($type:ty, $variant:ident $(, $($part:tt)+)?) => {
        impl From<$type> for TagValue {
            fn from(val: $type) -> Self {
                Self::$variant(val$($($part)+)?)
            }
        }
    };
}
from!(u8, Byte);
from!(i16, Short);
from!(i32, Int);
from!(i64, Long);
from!(f32, Float);
from!(f64, Double);
from!(String, String);
from!(&str, String, .to_owned());
from!(Vec<u8>, ByteArray);
from!(&[u8], ByteArray, .to_vec());
from!(Vec<i32>, IntArray);
from!(&[i32], IntArray, .to_vec());
from!(TagCollection, List);
from!(TagDictionary, Compound);

impl From<bool> for TagValue {
    fn from(val: bool) -> Self {
        Self::Byte(u8::from(val))
    }
}

/// One node of a document tree.
///
/// A `Tag` is a handle: cloning it clones the handle, not the node, so a tag
/// obtained from a lookup or a query is the node in the tree, and mutating
/// it mutates the document. Two tags compare equal when their names, types,
/// and values are deep-equal, in order, regardless of which handles point at
/// them.
#[derive(Clone)]
pub struct Tag {
    inner: Rc<TagCell>,
}

impl Tag {
    // ---- construction ----

    /// Creates an unnamed tag of the given type with a default value: zero
    /// for numerics, empty for strings, arrays and containers.
    pub fn new(kind: TagType) -> Tag {
        Tag::with_name_value(String::new(), TagValue::default_for(kind))
    }

    /// Creates a named tag from any supported raw value or payload.
    pub fn named(name: impl Into<String>, value: impl Into<TagValue>) -> Tag {
        Tag::with_name_value(name.into(), value.into())
    }

    /// Creates an unnamed tag from any supported raw value or payload.
    pub fn unnamed(value: impl Into<TagValue>) -> Tag {
        Tag::with_name_value(String::new(), value.into())
    }

    pub fn byte(name: impl Into<String>, value: u8) -> Tag {
        Tag::named(name, value)
    }

    pub fn short(name: impl Into<String>, value: i16) -> Tag {
        Tag::named(name, value)
    }

    pub fn int(name: impl Into<String>, value: i32) -> Tag {
        Tag::named(name, value)
    }

    pub fn long(name: impl Into<String>, value: i64) -> Tag {
        Tag::named(name, value)
    }

    pub fn float(name: impl Into<String>, value: f32) -> Tag {
        Tag::named(name, value)
    }

    pub fn double(name: impl Into<String>, value: f64) -> Tag {
        Tag::named(name, value)
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Tag {
        Tag::named(name, value.into())
    }

    pub fn byte_array(name: impl Into<String>, value: Vec<u8>) -> Tag {
        Tag::named(name, value)
    }

    pub fn int_array(name: impl Into<String>, value: Vec<i32>) -> Tag {
        Tag::named(name, value)
    }

    /// Creates an empty compound tag.
    pub fn compound(name: impl Into<String>) -> Tag {
        Tag::named(name, TagDictionary::new())
    }

    /// Creates an empty list tag with no declared element type; the first
    /// push freezes the type.
    pub fn list(name: impl Into<String>) -> Tag {
        Tag::named(name, TagCollection::new())
    }

    /// Creates an empty list tag whose element type is declared up front.
    pub fn list_of(name: impl Into<String>, element: TagType) -> Tag {
        Tag::named(name, TagCollection::with_limit(element))
    }

    pub(crate) fn with_name_value(name: String, value: TagValue) -> Tag {
        let tag = Tag {
            inner: Rc::new(RefCell::new(TagInner {
                name,
                parent: Weak::new(),
                value,
            })),
        };
        tag.adopt_children();
        tag
    }

    // ---- identity and naming ----

    /// The type of this tag. Fixed at construction.
    pub fn tag_type(&self) -> TagType {
        self.inner.borrow().value.tag_type()
    }

    /// The tag's name. Empty for unnamed tags; never absent.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Renames the tag. When the tag is attached to a compound the lookup
    /// key moves with it; a collision with a sibling's name is a usage error
    /// and leaves the tag unrenamed. A tag attached to a list cannot take a
    /// non-empty name.
    pub fn set_name(&self, name: &str) -> Result<()> {
        let old = self.name();
        if old == name {
            return Ok(());
        }

        if let Some(parent) = self.parent() {
            let mut parent_inner = parent.inner.borrow_mut();
            match &mut parent_inner.value {
                TagValue::Compound(children) => children.change_key(&old, name)?,
                TagValue::List(_) => {
                    if !name.is_empty() {
                        return Err(Error::usage("tags inside a list cannot be named"));
                    }
                }
                _ => {}
            }
        }

        self.inner.borrow_mut().name = name.to_owned();
        Ok(())
    }

    /// The enclosing container tag, or `None` for a root.
    pub fn parent(&self) -> Option<Tag> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| Tag { inner })
    }

    /// Every ancestor of this tag, root first.
    pub fn ancestors(&self) -> Vec<Tag> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(tag) = current {
            current = tag.parent();
            out.push(tag);
        }
        out.reverse();
        out
    }

    /// The `\`-delimited path from the root down to this tag. A component
    /// whose parent is a list renders as its position in that list rather
    /// than its (empty) name.
    pub fn full_path(&self) -> String {
        let mut parts = Vec::new();
        let mut node = self.clone();
        loop {
            let parent = node.parent();
            let part = match &parent {
                Some(p) if p.tag_type() == TagType::List => p
                    .children()
                    .iter()
                    .position(|c| c.ptr_eq(&node))
                    .map(|i| i.to_string())
                    .unwrap_or_default(),
                _ => node.name(),
            };
            parts.push(part);
            match parent {
                Some(p) => node = p,
                None => break,
            }
        }
        parts.reverse();
        parts.join("\\")
    }

    /// This tag and every descendant, depth first.
    pub fn flatten(&self) -> Vec<Tag> {
        fn walk(tag: &Tag, out: &mut Vec<Tag>) {
            out.push(tag.clone());
            for child in tag.children() {
                walk(&child, out);
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    // ---- values ----

    /// Borrows the payload. The guard must be dropped before this tag is
    /// mutated again.
    pub fn value(&self) -> Ref<'_, TagValue> {
        Ref::map(self.inner.borrow(), |inner| &inner.value)
    }

    /// Replaces the payload with one of the same type; assigning a payload
    /// of a different type is a usage error. Replacing a container payload
    /// detaches the previous children.
    pub fn set_value(&self, value: impl Into<TagValue>) -> Result<()> {
        let value = value.into();
        if value.tag_type() != self.tag_type() {
            return Err(Error::usage(format!(
                "cannot assign a {} value to a {} tag",
                value.tag_type(),
                self.tag_type()
            )));
        }
        self.detach_children();
        self.inner.borrow_mut().value = value;
        self.adopt_children();
        Ok(())
    }

    pub fn as_byte(&self) -> Option<u8> {
        match &*self.value() {
            TagValue::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_short(&self) -> Option<i16> {
        match &*self.value() {
            TagValue::Short(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match &*self.value() {
            TagValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match &*self.value() {
            TagValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match &*self.value() {
            TagValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match &*self.value() {
            TagValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match &*self.value() {
            TagValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<Vec<u8>> {
        match &*self.value() {
            TagValue::ByteArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<Vec<i32>> {
        match &*self.value() {
            TagValue::IntArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// The payload rendered as a string: scalars as decimals, arrays and
    /// lists bracketed, compounds braced.
    pub fn value_string(&self) -> String {
        self.value().value_string()
    }

    // ---- container access ----

    /// Number of children; zero for non-container tags.
    pub fn len(&self) -> usize {
        match &*self.value() {
            TagValue::List(items) => items.len(),
            TagValue::Compound(children) => children.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the children, in order; empty for non-container tags.
    pub fn children(&self) -> Vec<Tag> {
        match &*self.value() {
            TagValue::List(items) => items.tags(),
            TagValue::Compound(children) => children.tags(),
            _ => Vec::new(),
        }
    }

    /// The declared element type of a list tag; `None` for a list that has
    /// never held an element, and for non-list tags.
    pub fn list_type(&self) -> Option<TagType> {
        match &*self.value() {
            TagValue::List(items) => items.limit_type(),
            _ => None,
        }
    }

    /// Appends an unnamed tag to a list. The first push freezes the list's
    /// element type; a named tag or a mismatched type is a usage error.
    pub fn push(&self, tag: Tag) -> Result<()> {
        if self.ptr_eq(&tag) {
            return Err(Error::usage("cannot add a tag to itself"));
        }
        let owner = Rc::downgrade(&self.inner);
        let mut inner = self.inner.borrow_mut();
        match &mut inner.value {
            TagValue::List(items) => items.insert_item(&owner, tag),
            _ => Err(Error::usage("push is only valid on a list tag")),
        }
    }

    /// Wraps a raw value into an unnamed tag and appends it, returning the
    /// new tag.
    pub fn push_value(&self, value: impl Into<TagValue>) -> Result<Tag> {
        let tag = Tag::unnamed(value);
        self.push(tag.clone())?;
        Ok(tag)
    }

    /// Appends several raw values in order, with the same per-item rules as
    /// [`Tag::push_value`].
    pub fn push_all<I>(&self, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<TagValue>,
    {
        for value in values {
            self.push_value(value)?;
        }
        Ok(())
    }

    /// Replaces the list element at `index`, re-parenting the replacement
    /// and detaching the old element.
    pub fn set_at(&self, index: usize, tag: Tag) -> Result<()> {
        if self.ptr_eq(&tag) {
            return Err(Error::usage("cannot add a tag to itself"));
        }
        let owner = Rc::downgrade(&self.inner);
        let mut inner = self.inner.borrow_mut();
        match &mut inner.value {
            TagValue::List(items) => items.set_item(&owner, index, tag),
            _ => Err(Error::usage("set_at is only valid on a list tag")),
        }
    }

    /// The child at `index`, for either container kind.
    pub fn get_at(&self, index: usize) -> Option<Tag> {
        match &*self.value() {
            TagValue::List(items) => items.get(index),
            TagValue::Compound(children) => children.get_at(index),
            _ => None,
        }
    }

    /// Removes and returns the list element at `index`, severing its parent
    /// link.
    pub fn remove_at(&self, index: usize) -> Option<Tag> {
        let mut inner = self.inner.borrow_mut();
        match &mut inner.value {
            TagValue::List(items) => items.remove_index(index),
            _ => None,
        }
    }

    /// Adds a pre-named tag to a compound, keyed by its current name. A
    /// duplicate name is a usage error.
    pub fn add(&self, tag: Tag) -> Result<()> {
        if self.ptr_eq(&tag) {
            return Err(Error::usage("cannot add a tag to itself"));
        }
        let owner = Rc::downgrade(&self.inner);
        let mut inner = self.inner.borrow_mut();
        match &mut inner.value {
            TagValue::Compound(children) => children.insert_item(&owner, tag),
            _ => Err(Error::usage("add is only valid on a compound tag")),
        }
    }

    /// Wraps a raw value into a tag named `name` and adds it to a compound,
    /// returning the new tag.
    pub fn insert(&self, name: &str, value: impl Into<TagValue>) -> Result<Tag> {
        let tag = Tag::with_name_value(name.to_owned(), value.into());
        self.add(tag.clone())?;
        Ok(tag)
    }

    /// Looks up a compound child by name. Absence is not an error.
    pub fn get(&self, name: &str) -> Option<Tag> {
        match &*self.value() {
            TagValue::Compound(children) => children.get(name),
            _ => None,
        }
    }

    /// True when this compound holds a child with the given name.
    pub fn contains(&self, name: &str) -> bool {
        match &*self.value() {
            TagValue::Compound(children) => children.contains(name),
            _ => false,
        }
    }

    /// Removes and returns the compound child with the given name, severing
    /// its parent link.
    pub fn remove(&self, name: &str) -> Option<Tag> {
        let mut inner = self.inner.borrow_mut();
        match &mut inner.value {
            TagValue::Compound(children) => children.remove_named(name),
            _ => None,
        }
    }

    /// Removes the given child from either container kind. Returns whether
    /// it was present.
    pub fn remove_tag(&self, tag: &Tag) -> bool {
        let mut inner = self.inner.borrow_mut();
        match &mut inner.value {
            TagValue::List(items) => items.remove_item(tag),
            TagValue::Compound(children) => children.remove_item(tag),
            _ => false,
        }
    }

    /// Detaches and drops every child of a container tag.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        match &mut inner.value {
            TagValue::List(items) => {
                items.clear_items();
                Ok(())
            }
            TagValue::Compound(children) => {
                children.clear_items();
                Ok(())
            }
            _ => Err(Error::usage("clear is only valid on a container tag")),
        }
    }

    // ---- queries ----

    /// Resolves a `\`- or `/`-delimited path from this tag. Any segment that
    /// cannot be resolved yields `None`; queries never fail.
    pub fn query(&self, path: &str) -> Option<Tag> {
        query::resolve(self, path)
    }

    /// Like [`Tag::query`], but additionally requires the final tag to be of
    /// the expected type, yielding `None` on a mismatch.
    pub fn query_as(&self, path: &str, kind: TagType) -> Option<Tag> {
        self.query(path).filter(|tag| tag.tag_type() == kind)
    }

    // ---- internals ----

    /// True when both handles point at the same node.
    pub fn ptr_eq(&self, other: &Tag) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn set_parent(&self, parent: TagLink) {
        self.inner.borrow_mut().parent = parent;
    }

    pub(crate) fn clear_parent(&self) {
        self.inner.borrow_mut().parent = Weak::new();
    }

    /// Points every child of a container payload back at this tag. Called
    /// whenever a payload is installed wholesale (construction, `set_value`,
    /// codec assembly).
    fn adopt_children(&self) {
        let link = Rc::downgrade(&self.inner);
        for child in self.children() {
            child.set_parent(link.clone());
        }
    }

    fn detach_children(&self) {
        for child in self.children() {
            child.clear_parent();
        }
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Tag) -> bool {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        let a = self.inner.borrow();
        let b = other.inner.borrow();
        a.name == b.name && a.value == b.value
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.tag_type();
        if kind.is_container() {
            write!(f, "[{}: {}] ({} items)", kind, self.name(), self.len())
        } else {
            write!(f, "[{}: {}={}]", kind, self.name(), self.value_string())
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}: {}={}]",
            self.tag_type(),
            self.name(),
            self.value_string()
        )
    }
}

impl TagValue {
    fn value_string(&self) -> String {
        fn join<T: ToString>(items: &[T]) -> String {
            items
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }

        match self {
            TagValue::End => String::new(),
            TagValue::Byte(v) => v.to_string(),
            TagValue::Short(v) => v.to_string(),
            TagValue::Int(v) => v.to_string(),
            TagValue::Long(v) => v.to_string(),
            TagValue::Float(v) => v.to_string(),
            TagValue::Double(v) => v.to_string(),
            TagValue::ByteArray(v) => format!("[{}]", join(v)),
            TagValue::String(v) => v.clone(),
            TagValue::List(items) => format!(
                "[{}]",
                items
                    .tags()
                    .iter()
                    .map(|t| t.value_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            TagValue::Compound(children) => format!(
                "{{{}}}",
                children
                    .tags()
                    .iter()
                    .map(|t| format!("{}={}", t.name(), t.value_string()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            TagValue::IntArray(v) => format!("[{}]", join(v)),
        }
    }
}
