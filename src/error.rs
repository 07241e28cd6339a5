//! Error handling for reading, encoding and writing documents
use std::path::PathBuf;

/// A result type for XML parsing, which can be either a successful value or an error.
pub type XmlResult<T> = std::result::Result<T, XmlError>;

/// A result type for the whole conversion pipeline.
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure of a single conversion.
///
/// The three classes stay distinct so a caller can tell a bad input document
/// from a document that does not fit the TLV format from an unwritable output.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input could not be read or parsed into a tree.
    #[error("{0}")]
    Source(#[from] XmlError),

    /// The tree could not be represented as a TLV stream.
    #[error("{0}")]
    Encode(#[from] EncodeError),

    /// The encoded stream could not be written to its destination.
    #[error("Could not write output: {0}")]
    Sink(#[source] std::io::Error),
}

/// An error that occurred while parsing a document.
#[derive(Debug)]
pub struct XmlError {
    /// The context of the error
    pub context: Box<ErrorContext>,

    /// The kind of error that occurred while parsing a document
    pub kind: XmlErrorKind,
}
impl XmlError {
    /// Creates a new `XmlError`
    #[must_use]
    pub fn new(kind: XmlErrorKind, context: ErrorContext) -> Self {
        Self {
            context: Box::new(context),
            kind,
        }
    }

    /// Adds a path to the error context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.context.path = Some(path.into());
        self
    }
}
impl std::fmt::Display for XmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.context)?;

        for line in self.kind.to_string().lines() {
            writeln!(f, "= {line}")?;
        }
        Ok(())
    }
}
impl std::error::Error for XmlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}
impl From<std::io::Error> for XmlError {
    fn from(err: std::io::Error) -> Self {
        Self::new(XmlErrorKind::Io(err), ErrorContext::default())
    }
}

/// The kind of error that occurred while parsing a document.
#[derive(Debug, thiserror::Error)]
pub enum XmlErrorKind {
    /// Another error occurred while parsing the document
    #[error("{0}")]
    Custom(String),

    /// A tag in the document was not closed properly
    #[error("Unclosed tag: {0}")]
    UnclosedTag(String),

    /// File ended unexpectedly
    #[error("End of file reached unexpectedly")]
    UnexpectedEof,

    /// A name used a prefix with no `xmlns:` declaration in scope
    #[error("Unbound namespace prefix: {0}")]
    UnboundPrefix(String),

    /// An `xmlns:prefix=""` declaration tried to remove a prefix binding
    #[error("Cannot undeclare namespace prefix: {0}")]
    UndeclaredPrefix(String),

    /// The same attribute appeared twice on one element
    #[error("Duplicate attribute: {0}")]
    DuplicateAttribute(String),

    /// Elements were nested deeper than the parser accepts
    #[error("Element nesting exceeds the maximum depth of {0}")]
    TooDeep(usize),

    /// An entity or character reference could not be decoded
    #[error("Invalid entity reference: {0}")]
    Entity(String),

    /// XML parsing failed
    #[error("XML parser error: {0}")]
    Xml(#[from] xmlparser::Error),

    /// IO error occurred while reading a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Context describing the error location in the source code.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The path to the file that was parsed, if available.
    pub path: Option<PathBuf>,

    /// The source line containing the error, if any.
    pub line: String,

    /// Byte offset of the error in the source.
    pub offset: usize,

    /// 1-based row and column of the error.
    pub position: (usize, usize),
}
impl ErrorContext {
    /// Creates a new `ErrorContext` pointing at the given byte offset of `source`.
    #[must_use]
    pub fn new(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
        let line_end = source[offset..]
            .find('\n')
            .map_or(source.len(), |i| offset + i);

        Self {
            path: None,
            line: source[line_start..line_end].trim_end().to_string(),
            offset,
            position: position_in_text(offset, source),
        }
    }

    /// Returns the row and column of the error in the source code.
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        self.position
    }
}
impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = self.path.as_ref().map(|p| p.display());
        let (row, col) = self.position;

        if !self.line.is_empty() {
            writeln!(f, "| {}", self.line)?;
        }

        if self.offset > 0 {
            write!(f, "= At ")?;

            if let Some(path) = path {
                write!(f, "{path}:")?;
            }

            writeln!(f, "{row}:{col}")?;
        } else if let Some(path) = path {
            writeln!(f, "= In {path}")?;
        }
        Ok(())
    }
}

fn position_in_text(offset: usize, source: &str) -> (usize, usize) {
    let mut row = 1;
    let mut col = 1;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            row += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (row, col)
}

/// The part of a record whose payload did not fit a one-byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Local name of an element
    ElementName,

    /// Local name of an attribute
    AttributeName,

    /// Value of an attribute
    AttributeValue,

    /// Trimmed leading or tail text
    Text,

    /// Comment body
    Comment,
}
impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ElementName => "element name",
            Self::AttributeName => "attribute name",
            Self::AttributeValue => "attribute value",
            Self::Text => "text",
            Self::Comment => "comment",
        };
        f.write_str(name)
    }
}

/// Error occurred while encoding a tree into a TLV stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A payload is longer than a one-byte length field can describe.
    #[error("The {field} is {len} bytes long; at most {max} bytes fit in a record", max = crate::to_tlv::MAX_FIELD_LEN)]
    FieldTooLarge {
        /// Which payload overflowed
        field: FieldKind,

        /// Its UTF-8 length in bytes
        len: usize,
    },

    /// The tree is nested deeper than the encoder was configured to walk.
    #[error("Element nesting exceeds the maximum depth of {limit}")]
    DepthLimitExceeded {
        /// The configured limit
        limit: usize,
    },
}

/// Return early from the parser with an error pointing into the source
macro_rules! bail {
    ($src:expr, $offset:expr, msg = $($msg:tt)+) => {
        $crate::error::bail!($src, $offset, $crate::error::XmlErrorKind::Custom(format!($($msg)+)))
    };

    ($src:expr, $offset:expr, $kind:expr) => {
        return Err($crate::error::XmlError::new(
            $kind,
            $crate::error::ErrorContext::new($src, $offset),
        ))
    };
}
pub(crate) use bail;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_position() {
        let src = "<a>\n  <b>\n</a>";
        let offset = src.find("</a>").unwrap();
        let context = ErrorContext::new(src, offset);
        assert_eq!(context.position(), (3, 1));
        assert_eq!(context.line, "</a>");
    }

    #[test]
    fn test_error_display() {
        let src = "<root>\n<child>\n</root>";
        let offset = src.rfind("</root>").unwrap();
        let err = XmlError::new(
            XmlErrorKind::UnclosedTag("child".to_string()),
            ErrorContext::new(src, offset),
        )
        .with_path("input.xml");

        let text = err.to_string();
        assert!(text.contains("| </root>"));
        assert!(text.contains("= At input.xml:3:1"));
        assert!(text.contains("= Unclosed tag: child"));
    }

    #[test]
    fn test_field_too_large_display() {
        let err = EncodeError::FieldTooLarge {
            field: FieldKind::AttributeValue,
            len: 256,
        };
        assert_eq!(
            err.to_string(),
            "The attribute value is 256 bytes long; at most 255 bytes fit in a record"
        );
    }
}
