use super::{CommentNode, Node};
use std::borrow::Cow;

/// An element in the document tree, with a name, attributes, text and children:
/// `<name attr="value">text<child/>...</name>tail`
///
/// Names may be in `{namespace-uri}local` form; the namespace is dropped when encoding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementNode<'src> {
    /// The name of the element.
    pub name: Cow<'src, str>,

    /// The attributes of the element, in document order.
    pub attributes: Vec<Attribute<'src>>,

    /// Character data before the first child.
    pub text: Option<Cow<'src, str>>,

    /// The children of the element.
    pub children: Vec<Node<'src>>,

    /// Character data after the closing tag, inside the parent.
    pub tail: Option<Cow<'src, str>>,
}
impl<'src> ElementNode<'src> {
    /// Create a new element with no attributes, text or children.
    #[must_use]
    pub fn new(name: impl Into<Cow<'src, str>>) -> Self {
        Self {
            name: name.into(),
            attributes: vec![],
            text: None,
            children: vec![],
            tail: None,
        }
    }

    /// Adds an attribute after any existing ones.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<Cow<'src, str>>,
        value: impl Into<Cow<'src, str>>,
    ) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Sets the leading text of the element.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<Cow<'src, str>>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the tail text of the element.
    #[must_use]
    pub fn with_tail(mut self, tail: impl Into<Cow<'src, str>>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    /// Adds a child element or comment after any existing children.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node<'src>>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Adds a child element or comment after any existing children.
    pub fn push_child(&mut self, child: impl Into<Node<'src>>) {
        self.children.push(child.into());
    }

    /// Get an attribute value by name.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_ref())
    }

    /// Returns the element's name with any namespace removed.
    #[must_use]
    pub fn local_name(&self) -> &str {
        super::local_name(&self.name)
    }

    /// Iterates over the child elements, skipping comments.
    pub fn elements(&self) -> impl Iterator<Item = &ElementNode<'src>> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Comment(_) => None,
        })
    }

    /// Iterates over the child comments, skipping elements.
    pub fn comments(&self) -> impl Iterator<Item = &CommentNode<'src>> {
        self.children.iter().filter_map(|child| match child {
            Node::Comment(comment) => Some(comment),
            Node::Element(_) => None,
        })
    }

    /// Returns the slot that the next run of character data belongs to.
    ///
    /// This is the element's own text until a child appears, then the tail of the last child.
    pub(crate) fn text_slot(&mut self) -> &mut Option<Cow<'src, str>> {
        match self.children.last_mut() {
            Some(child) => child.tail_mut(),
            None => &mut self.text,
        }
    }
}

/// Descendants are released from a heap work-list, so dropping a deep tree
/// does not grow the call stack.
impl Drop for ElementNode<'_> {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Node::Element(mut element) = node {
                pending.append(&mut element.children);
            }
        }
    }
}

/// An attribute of an element:
/// `name="value"`
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute<'src> {
    /// The name of the attribute, possibly in `{namespace-uri}local` form.
    pub name: Cow<'src, str>,

    /// The decoded value of the attribute.
    pub value: Cow<'src, str>,
}
impl<'src> Attribute<'src> {
    /// Create a new attribute.
    pub fn new(name: impl Into<Cow<'src, str>>, value: impl Into<Cow<'src, str>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the attribute's name with any namespace removed.
    #[must_use]
    pub fn local_name(&self) -> &str {
        super::local_name(&self.name)
    }
}
