//! Compact tag-length-value encoding for XML document trees.
//!
//! A document is parsed into a tree of [`ElementNode`]s and [`CommentNode`]s, then flattened
//! depth-first into typed records, each a tag byte followed by length-prefixed UTF-8 fields.
//! See [`to_tlv`] for the record layout.
//!
//! ```rust
//! use xmltlv::{Document, EncodeOptions};
//!
//! let doc = Document::parse_str(r#"<r><c a="1">x</c></r>"#).unwrap();
//! let bytes = doc.to_tlv_with_options(&EncodeOptions::default()).unwrap();
//! assert_eq!(
//!     bytes,
//!     [
//!         0x01, 1, b'r', 0x01, 1, b'c', 0x03, 1, b'a', 1, b'1', 0x04, 1, b'x',
//!         0x02, 1, b'c', 0x02, 1, b'r', 0xFF,
//!     ]
//! );
//! ```
//!
//! Fields are limited to 255 bytes, and a tree that does not fit is rejected as a whole;
//! the format never truncates.
#![warn(missing_docs)]
use std::path::Path;
use tracing::info;

mod document;
pub use document::Document;

mod node;
pub use node::*;

pub mod error;
pub use error::{EncodeError, Error, FieldKind, Result, XmlError, XmlErrorKind, XmlResult};

pub mod sink;
pub mod to_tlv;
pub use to_tlv::{EncodeOptions, RecordTag};

/// Parses a source string and encodes it.
///
/// The same depth limit applies to parsing and encoding.
///
/// # Errors
/// Returns [`Error::Source`] if the XML is invalid, or [`Error::Encode`] if it does not fit the format.
pub fn convert_str(src: &str, options: &EncodeOptions) -> Result<Vec<u8>> {
    let document = Document::parse_str_with_depth(src, options.max_depth)?;
    Ok(document.to_tlv_with_options(options)?)
}

/// Reads the XML file at `input`, encodes it, and writes the stream to `output`.
///
/// Nothing is written to `output` unless encoding succeeded. Returns the number of bytes written.
///
/// # Errors
/// Returns [`Error::Source`] if the input cannot be read or parsed, [`Error::Encode`] if it does not fit
/// the format, or [`Error::Sink`] if the output cannot be written.
pub fn convert_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &EncodeOptions,
) -> Result<usize> {
    let (input, output) = (input.as_ref(), output.as_ref());

    let src = Document::read_source(input)?;
    let bytes = convert_str(&src, options).map_err(|e| match e {
        Error::Source(e) => Error::Source(e.with_path(input)),
        e => e,
    })?;

    sink::write_file(output, &bytes).map_err(Error::Sink)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        bytes = bytes.len(),
        "converted document"
    );
    Ok(bytes.len())
}
