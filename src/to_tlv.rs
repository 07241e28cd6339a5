//! Module for compiling a document tree into a flat tag-length-value stream.
//!
//! Every record is a one-byte [`RecordTag`], then one or two fields each made of a one-byte
//! length and that many UTF-8 bytes. The stream ends with a single [`RecordTag::EndOfStream`].
//!
//! ```text
//! <r><c a="1">x</c></r>
//!
//! 01 01 'r'               element start
//! 01 01 'c'               element start
//! 03 01 'a' 01 '1'        attribute
//! 04 01 'x'               text
//! 02 01 'c'               element end
//! 02 01 'r'               element end
//! FF                      end of stream
//! ```
use crate::{
    error::{EncodeError, FieldKind},
    node::{CommentNode, ElementNode, Node},
};
use tracing::{debug, trace};

/// Largest payload a one-byte length can describe.
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Default limit on element nesting, counting the root as depth 1.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// The type byte at the start of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordTag {
    /// Start of an element; one field with the local name.
    ElementStart = 0x01,

    /// End of an element; one field repeating the local name.
    ElementEnd = 0x02,

    /// An attribute; two fields, the local name then the value.
    Attribute = 0x03,

    /// Trimmed character data; one field.
    Text = 0x04,

    /// A comment; one field with the raw body.
    Comment = 0x05,

    /// Terminator; no fields.
    EndOfStream = 0xFF,
}
impl From<RecordTag> for u8 {
    fn from(tag: RecordTag) -> Self {
        tag as u8
    }
}

/// Options controlling how a tree is encoded.
///
/// # Example
/// ```rust
/// use xmltlv::EncodeOptions;
/// let options = EncodeOptions::default().max_depth(64);
/// assert_eq!(options.max_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Deepest element nesting the encoder will walk.
    pub max_depth: usize,
}
impl EncodeOptions {
    /// Sets the deepest element nesting the encoder will walk.
    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Record writer over an owned byte buffer.
///
/// Every method checks all of its fields before appending anything,
/// so a failed record never leaves a partial record in the buffer.
#[derive(Debug, Default)]
pub struct Encoder {
    buffer: Vec<u8>,
}
impl Encoder {
    /// Creates a new `Encoder` with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Writes an element start record for the local part of `name`.
    ///
    /// # Errors
    /// Returns an error if the local name is longer than [`MAX_FIELD_LEN`] bytes.
    pub fn element_start(&mut self, name: &str) -> Result<(), EncodeError> {
        self.single(RecordTag::ElementStart, FieldKind::ElementName, crate::local_name(name))
    }

    /// Writes an element end record for the local part of `name`.
    ///
    /// # Errors
    /// Returns an error if the local name is longer than [`MAX_FIELD_LEN`] bytes.
    pub fn element_end(&mut self, name: &str) -> Result<(), EncodeError> {
        self.single(RecordTag::ElementEnd, FieldKind::ElementName, crate::local_name(name))
    }

    /// Writes an attribute record with the local part of `name` and the raw value.
    ///
    /// # Errors
    /// Returns an error if either field is longer than [`MAX_FIELD_LEN`] bytes.
    pub fn attribute(&mut self, name: &str, value: &str) -> Result<(), EncodeError> {
        let name = crate::local_name(name).as_bytes();
        let value = value.as_bytes();
        let name_len = field_len(FieldKind::AttributeName, name)?;
        let value_len = field_len(FieldKind::AttributeValue, value)?;

        self.buffer.reserve(3 + name.len() + value.len());
        self.buffer.push(RecordTag::Attribute.into());
        self.buffer.push(name_len);
        self.buffer.extend_from_slice(name);
        self.buffer.push(value_len);
        self.buffer.extend_from_slice(value);
        Ok(())
    }

    /// Writes a text record for `text` with surrounding whitespace removed.
    /// Nothing is written if the text is absent or only whitespace.
    ///
    /// # Errors
    /// Returns an error if the trimmed text is longer than [`MAX_FIELD_LEN`] bytes.
    pub fn text(&mut self, text: Option<&str>) -> Result<(), EncodeError> {
        let Some(text) = text.map(trim_xml_whitespace) else {
            return Ok(());
        };
        if text.is_empty() {
            return Ok(());
        }

        self.single(RecordTag::Text, FieldKind::Text, text)
    }

    /// Writes a comment record with the untrimmed body.
    ///
    /// # Errors
    /// Returns an error if the body is longer than [`MAX_FIELD_LEN`] bytes.
    pub fn comment(&mut self, body: &str) -> Result<(), EncodeError> {
        self.single(RecordTag::Comment, FieldKind::Comment, body)
    }

    /// Appends the terminator and returns the finished stream.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.buffer.push(RecordTag::EndOfStream.into());
        self.buffer
    }

    fn single(&mut self, tag: RecordTag, field: FieldKind, value: &str) -> Result<(), EncodeError> {
        let value = value.as_bytes();
        let len = field_len(field, value)?;

        self.buffer.reserve(2 + value.len());
        self.buffer.push(tag.into());
        self.buffer.push(len);
        self.buffer.extend_from_slice(value);
        Ok(())
    }
}

/// Encodes a tree into a terminated TLV stream.
///
/// The root's own tail text is not part of the document and is never written.
///
/// # Errors
/// Returns an error if any field is too long for its length byte,
/// or if elements are nested deeper than `options.max_depth`.
/// No partial stream is returned in either case.
///
/// # Example
/// ```rust
/// use xmltlv::{ElementNode, EncodeOptions, to_tlv::encode};
///
/// let root = ElementNode::new("r").with_text("x");
/// let bytes = encode(&root, &EncodeOptions::default()).unwrap();
/// assert_eq!(bytes, [0x01, 1, b'r', 0x04, 1, b'x', 0x02, 1, b'r', 0xFF]);
/// ```
pub fn encode(root: &ElementNode<'_>, options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = Encoder::new();
    let mut elements = 0usize;

    let mut stack = vec![Task::Open(root, 1)];
    while let Some(task) = stack.pop() {
        match task {
            Task::Comment(comment) => {
                encoder.comment(&comment.text)?;
                encoder.text(comment.tail.as_deref())?;
            }

            Task::Open(element, depth) => {
                if depth > options.max_depth {
                    return Err(EncodeError::DepthLimitExceeded {
                        limit: options.max_depth,
                    });
                }
                elements += 1;
                trace!(name = %element.name, depth, "element");

                encoder.element_start(&element.name)?;
                for attribute in &element.attributes {
                    encoder.attribute(&attribute.name, &attribute.value)?;
                }
                encoder.text(element.text.as_deref())?;

                //
                // Children are popped in document order, so push them last-first
                stack.push(Task::Close(element, depth));
                for child in element.children.iter().rev() {
                    stack.push(match child {
                        Node::Element(child) => Task::Open(child, depth + 1),
                        Node::Comment(child) => Task::Comment(child),
                    });
                }
            }

            Task::Close(element, depth) => {
                encoder.element_end(&element.name)?;
                if depth > 1 {
                    encoder.text(element.tail.as_deref())?;
                }
            }
        }
    }

    let bytes = encoder.finish();
    debug!(elements, bytes = bytes.len(), "encoded document");
    Ok(bytes)
}

/// Pending work for the traversal; depth counts the root as 1.
enum Task<'a, 'src> {
    Open(&'a ElementNode<'src>, usize),
    Close(&'a ElementNode<'src>, usize),
    Comment(&'a CommentNode<'src>),
}

fn field_len(field: FieldKind, value: &[u8]) -> Result<u8, EncodeError> {
    u8::try_from(value.len()).map_err(|_| EncodeError::FieldTooLarge {
        field,
        len: value.len(),
    })
}

/// Removes leading and trailing space, tab, newline and carriage return.
#[must_use]
pub fn trim_xml_whitespace(text: &str) -> &str {
    text.trim_matches([' ', '\t', '\n', '\r'])
}
