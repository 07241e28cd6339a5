use std::borrow::Cow;

/// A comment node:
/// `<!--text-->tail`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommentNode<'src> {
    /// The raw body of the comment.
    pub text: Cow<'src, str>,

    /// Character data after the comment, inside the parent.
    pub tail: Option<Cow<'src, str>>,
}
impl<'src> CommentNode<'src> {
    /// Create a new comment node with no tail.
    #[must_use]
    pub fn new(text: impl Into<Cow<'src, str>>) -> Self {
        Self {
            text: text.into(),
            tail: None,
        }
    }

    /// Sets the tail text of the comment.
    #[must_use]
    pub fn with_tail(mut self, tail: impl Into<Cow<'src, str>>) -> Self {
        self.tail = Some(tail.into());
        self
    }
}
