//! The types of nodes that can appear in a document tree.
use std::borrow::Cow;

mod name;
pub use name::*;

mod element;
pub use element::*;

mod comment;
pub use comment::*;

/// A node below the root of the document tree. Can be any of:
/// - `Element` - a tag with attributes, text and children
/// - `Comment` - a comment node
///
/// Both variants can carry tail text; the character data that follows the node
/// inside its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<'src> {
    /// An element node.
    Element(ElementNode<'src>),

    /// A comment node.
    Comment(CommentNode<'src>),
}
impl<'src> Node<'src> {
    /// Returns the tail text of the node, if any.
    #[must_use]
    pub fn tail(&self) -> Option<&str> {
        match self {
            Self::Element(node) => node.tail.as_deref(),
            Self::Comment(node) => node.tail.as_deref(),
        }
    }

    /// Returns the slot holding the tail text of the node.
    pub fn tail_mut(&mut self) -> &mut Option<Cow<'src, str>> {
        match self {
            Self::Element(node) => &mut node.tail,
            Self::Comment(node) => &mut node.tail,
        }
    }
}
impl<'src> From<ElementNode<'src>> for Node<'src> {
    fn from(node: ElementNode<'src>) -> Self {
        Self::Element(node)
    }
}
impl<'src> From<CommentNode<'src>> for Node<'src> {
    fn from(node: CommentNode<'src>) -> Self {
        Self::Comment(node)
    }
}

/// Appends a run of character data to a text slot, joining it to any text already there.
pub(crate) fn append_text<'src>(slot: &mut Option<Cow<'src, str>>, text: Cow<'src, str>) {
    match slot {
        Some(existing) => existing.to_mut().push_str(&text),
        None => *slot = Some(text),
    }
}
