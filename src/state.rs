//! Nesting-context bookkeeping shared by every reader and writer pass.
//!
//! A reader or writer owns exactly one [`TagState`]. The machine is the
//! single source of truth for two structural questions that both codecs must
//! answer identically: does the current tag carry an explicit name on the
//! wire, and what type must the children of the current list be. It also
//! guarantees termination: a document is only complete once every opened
//! frame has been closed.

use crate::error::{Error, Result};
use crate::TagType;

/// One open frame of a reader or writer pass.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Context {
    /// An open tag of the given type.
    Tag(TagType),
    /// An open list whose children must all be `element`. `remaining` is the
    /// declared element count when it is known up front (binary), or `None`
    /// when children are discovered as they come (XML).
    List {
        element: TagType,
        remaining: Option<usize>,
    },
}

impl Context {
    pub(crate) fn is_list(&self) -> bool {
        matches!(self, Context::List { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    NotStarted,
    InProgress,
    Complete,
}

/// The nesting-context state machine of a single reader or writer pass.
#[derive(Debug)]
pub(crate) struct TagState {
    status: Status,
    stack: Vec<Context>,
}

impl TagState {
    pub(crate) fn new() -> Self {
        Self {
            status: Status::NotStarted,
            stack: Vec::new(),
        }
    }

    /// Begins the document. Calling this twice is a usage error.
    pub(crate) fn start(&mut self) -> Result<()> {
        match self.status {
            Status::NotStarted => {
                self.status = Status::InProgress;
                Ok(())
            }
            _ => Err(Error::usage("document already started")),
        }
    }

    /// Begins the document if it has not begun yet. Used by readers, which
    /// have no explicit start call. A completed pass cannot be restarted.
    pub(crate) fn ensure_started(&mut self) -> Result<()> {
        match self.status {
            Status::NotStarted => self.start(),
            Status::InProgress => Ok(()),
            Status::Complete => Err(Error::usage("document already complete")),
        }
    }

    /// Opens a tag frame and returns the frame that was on top before the
    /// push, which tells the caller whether this tag carries an explicit
    /// name on the wire (it does not inside a list). Inside a list the tag
    /// must match the declared element type, and no more elements may be
    /// opened than the list declared.
    pub(crate) fn start_tag(&mut self, kind: TagType) -> Result<Option<Context>> {
        if self.status != Status::InProgress {
            return Err(Error::usage("no document in progress"));
        }

        let prev = self.stack.last().copied();

        if let Some(Context::List { element, remaining }) = prev {
            if kind != element {
                return Err(Error::usage(format!(
                    "list holds {} elements, cannot add {}",
                    element, kind
                )));
            }
            if remaining == Some(0) {
                return Err(Error::usage(
                    "list already holds its declared element count",
                ));
            }
            if let Some(Context::List {
                remaining: Some(n), ..
            }) = self.stack.last_mut()
            {
                *n -= 1;
            }
        }

        self.stack.push(Context::Tag(kind));
        Ok(prev)
    }

    /// Marks the just-opened List frame as a list context carrying its
    /// declared element type, so children opened beneath it are unnamed and
    /// type-checked.
    pub(crate) fn start_list(&mut self, element: TagType, len: Option<usize>) -> Result<()> {
        match self.stack.last_mut() {
            Some(frame) if matches!(frame, Context::Tag(TagType::List)) => {
                *frame = Context::List {
                    element,
                    remaining: len,
                };
                Ok(())
            }
            _ => Err(Error::usage("start_list called outside an open list tag")),
        }
    }

    /// Closes the current frame and returns it.
    pub(crate) fn end_tag(&mut self) -> Result<Context> {
        if self.status != Status::InProgress {
            return Err(Error::usage("no document in progress"));
        }
        self.stack
            .pop()
            .ok_or_else(|| Error::usage("no open tag to end"))
    }

    /// Finishes the document. Only legal once every frame has been closed.
    pub(crate) fn set_complete(&mut self) -> Result<()> {
        if self.status != Status::InProgress {
            return Err(Error::usage("no document in progress"));
        }
        if !self.stack.is_empty() {
            return Err(Error::usage("document ended with open tags"));
        }
        self.status = Status::Complete;
        Ok(())
    }
}
