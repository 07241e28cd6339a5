use crate::{
    error::{ErrorContext, XmlError, XmlErrorKind, XmlResult, bail},
    node::{Attribute, CommentNode, ElementNode, NamespaceScope, append_text, qualified_name},
    to_tlv::{self, DEFAULT_MAX_DEPTH, EncodeOptions},
    EncodeError,
};
use std::{borrow::Cow, collections::HashMap, path::Path};
use tracing::{debug, trace};
use xmlparser::{ElementEnd, EntityDefinition, Reference, Stream, Token};

/// Entity references may expand into other entities at most this deep.
const MAX_ENTITY_NESTING: usize = 16;

/// Upper bound on the bytes a single run of character data may gain from entity expansion.
const MAX_ENTITY_EXPANSION: usize = 1 << 20;

/// Internal entities declared in the DTD, by name.
type Entities<'src> = HashMap<&'src str, &'src str>;

/// An XML document that has been parsed into a tree of elements and comments.
///
/// Strings in the tree borrow from the source where possible, and are owned
/// where entity decoding, newline normalization or namespace resolution changed them.
///
/// Parsing follows the usual element-tree conventions:
/// - Element and attribute names are resolved to `{namespace-uri}local` when they have a namespace
/// - `xmlns` declarations are consumed and do not appear as attributes
/// - Character data before the first child is the element's `text`; after a child it is that child's `tail`
/// - CDATA sections are merged into the surrounding character data
/// - Comments inside the root are kept as nodes; anything outside the root is dropped
/// - Only the predefined entities, character references and internal entities
///   declared in the DTD are decoded; anything else is an error
/// - Processing instructions and the rest of the DTD are skipped
#[derive(Debug, Clone, PartialEq)]
pub struct Document<'src> {
    /// The root of the tree.
    pub root: ElementNode<'src>,
}
impl<'src> Document<'src> {
    /// Creates a document around an existing tree.
    #[must_use]
    pub fn new(root: ElementNode<'src>) -> Self {
        Self { root }
    }

    /// Parses a document from the given source string, with the default nesting limit.
    ///
    /// # Errors
    /// Returns errors if the XML is invalid
    ///
    /// # Example
    /// ```rust
    /// use xmltlv::Document;
    ///
    /// let doc = Document::parse_str("<test><test2>test</test2></test>").unwrap();
    /// assert_eq!(doc.root.name, "test");
    /// ```
    pub fn parse_str(src: &'src str) -> XmlResult<Self> {
        Self::parse_str_with_depth(src, DEFAULT_MAX_DEPTH)
    }

    /// Parses a document from the given source string.
    /// Elements nested deeper than `max_depth` are rejected.
    ///
    /// # Errors
    /// Returns errors if the XML is invalid or too deeply nested
    pub fn parse_str_with_depth(src: &'src str, max_depth: usize) -> XmlResult<Self> {
        Parser::new(src, max_depth).parse().map(Self::new)
    }

    /// Reads a source file into memory, ready for [`Document::parse_str`].
    ///
    /// # Errors
    /// Returns an error tagged with the path if the file cannot be read.
    pub fn read_source(path: impl AsRef<Path>) -> XmlResult<String> {
        let path = path.as_ref();
        std::fs::read_to_string(path).map_err(|e| XmlError::from(e).with_path(path))
    }

    /// Encode this document as a TLV stream with the default options.
    ///
    /// # Errors
    /// Returns errors if a field does not fit the format, or the tree is too deep.
    ///
    /// # Example
    /// ```rust
    /// use xmltlv::Document;
    ///
    /// let doc = Document::parse_str(r#"<r><c a="1">x</c></r>"#).unwrap();
    /// let bin = doc.to_tlv().unwrap();
    /// assert_eq!(bin.last(), Some(&0xFF));
    /// ```
    pub fn to_tlv(&self) -> Result<Vec<u8>, EncodeError> {
        self.to_tlv_with_options(&EncodeOptions::default())
    }

    /// Encode this document as a TLV stream.
    ///
    /// # Errors
    /// Returns errors if a field does not fit the format, or the tree is too deep.
    pub fn to_tlv_with_options(&self, options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
        to_tlv::encode(&self.root, options)
    }
}

#[derive(PartialEq, Debug, Clone, Copy)]
enum ParserState {
    Prolog,
    TagAttributes,
    TagChildren,
    Epilog,
}

/// An element whose closing tag has not been seen yet.
struct OpenElement<'src> {
    element: ElementNode<'src>,
    prefix: &'src str,
    local: &'src str,
    start: usize,
    scope_mark: usize,
}

/// An attribute as written, before namespaces are resolved.
struct RawAttribute<'src> {
    prefix: &'src str,
    local: &'src str,
    value: xmlparser::StrSpan<'src>,
    start: usize,
}
impl<'src> RawAttribute<'src> {
    /// Returns the prefix bound by this attribute, if it is a namespace declaration.
    fn declared_prefix(&self) -> Option<&'src str> {
        match (self.prefix, self.local) {
            ("", "xmlns") => Some(""),
            ("xmlns", prefix) => Some(prefix),
            _ => None,
        }
    }
}

struct Parser<'src> {
    src: &'src str,
    max_depth: usize,
    stack: Vec<OpenElement<'src>>,
    pending: Vec<RawAttribute<'src>>,
    scope: NamespaceScope<'src>,
    entities: Entities<'src>,
    root: Option<ElementNode<'src>>,
    elements: usize,
}
impl<'src> Parser<'src> {
    fn new(src: &'src str, max_depth: usize) -> Self {
        Self {
            src,
            max_depth,
            stack: vec![],
            pending: vec![],
            scope: NamespaceScope::default(),
            entities: Entities::new(),
            root: None,
            elements: 0,
        }
    }

    fn parse(mut self) -> XmlResult<ElementNode<'src>> {
        let src = self.src;
        let mut tokenizer = xmlparser::Tokenizer::from(src);
        let mut state = ParserState::Prolog;

        loop {
            // Get the next token
            let Some(next) = tokenizer.next() else {
                return self.finish();
            };
            let next = match next {
                Ok(token) => token,
                Err(e) => {
                    let offset = offset_of(src, e.pos());
                    bail!(src, offset, XmlErrorKind::Xml(e));
                }
            };

            state = match state {
                ParserState::Prolog => match next {
                    Token::ElementStart {
                        prefix,
                        local,
                        span,
                    } => {
                        self.open(prefix.as_str(), local.as_str(), span.start())?;
                        ParserState::TagAttributes
                    }

                    Token::EntityDeclaration {
                        name,
                        definition: EntityDefinition::EntityValue(value),
                        span,
                    } if !is_parameter_entity(span.as_str()) => {
                        // The first declaration of a name is binding
                        trace!(name = name.as_str(), "entity declared");
                        self.entities.entry(name.as_str()).or_insert(value.as_str());
                        state
                    }

                    Token::Declaration { .. }
                    | Token::ProcessingInstruction { .. }
                    | Token::Comment { .. }
                    | Token::DtdStart { .. }
                    | Token::EmptyDtd { .. }
                    | Token::EntityDeclaration { .. }
                    | Token::DtdEnd { .. } => {
                        trace!(token = token_name(&next), "skipped in prolog");
                        state
                    }

                    Token::Text { text } if is_xml_whitespace(text.as_str()) => state,

                    _ => {
                        let offset = token_start(&next);
                        bail!(
                            src,
                            offset,
                            msg = "Unexpected {} in prolog section",
                            token_name(&next)
                        );
                    }
                },

                ParserState::TagAttributes => match next {
                    Token::Attribute {
                        prefix,
                        local,
                        value,
                        span,
                        ..
                    } => {
                        self.pending.push(RawAttribute {
                            prefix: prefix.as_str(),
                            local: local.as_str(),
                            value,
                            start: span.start(),
                        });
                        state
                    }

                    Token::ElementEnd {
                        end: ElementEnd::Open,
                        ..
                    } => {
                        self.resolve_start_tag()?;
                        ParserState::TagChildren
                    }

                    Token::ElementEnd {
                        end: ElementEnd::Empty,
                        ..
                    } => {
                        self.resolve_start_tag()?;
                        self.close()
                    }

                    _ => {
                        let offset = token_start(&next);
                        bail!(
                            src,
                            offset,
                            msg = "Unexpected {} in tag attributes",
                            token_name(&next)
                        );
                    }
                },

                ParserState::TagChildren => match next {
                    Token::ElementStart {
                        prefix,
                        local,
                        span,
                    } => {
                        self.open(prefix.as_str(), local.as_str(), span.start())?;
                        ParserState::TagAttributes
                    }

                    Token::Text { text } => {
                        let decoded = decode_text(text.as_str(), &self.entities)
                            .map_err(|e| entity_error(src, text.start(), e))?;
                        self.push_text(decoded, text.start())?;
                        state
                    }

                    Token::Cdata { text, .. } => {
                        self.push_text(normalize_newlines(text.as_str()), text.start())?;
                        state
                    }

                    Token::Comment { text, span } => {
                        let Some(parent) = self.stack.last_mut() else {
                            bail!(
                                src,
                                span.start(),
                                msg = "Bug; Cannot apply comment; stack is empty!"
                            );
                        };

                        let comment = CommentNode::new(normalize_newlines(text.as_str()));
                        parent.element.push_child(comment);
                        state
                    }

                    Token::ProcessingInstruction { .. } => state,

                    Token::ElementEnd {
                        end: ElementEnd::Close(prefix, local),
                        span,
                    } => {
                        let Some(open) = self.stack.last() else {
                            bail!(src, span.start(), msg = "Bug; Cannot close tag; stack is empty!");
                        };

                        if open.prefix != prefix.as_str() || open.local != local.as_str() {
                            let name = display_name(open.prefix, open.local);
                            bail!(src, span.start(), XmlErrorKind::UnclosedTag(name));
                        }

                        self.close()
                    }

                    _ => {
                        let offset = token_start(&next);
                        bail!(
                            src,
                            offset,
                            msg = "Unexpected {} inside tag",
                            token_name(&next)
                        );
                    }
                },

                ParserState::Epilog => match next {
                    Token::Comment { .. } | Token::ProcessingInstruction { .. } => {
                        trace!(token = token_name(&next), "skipped after root");
                        state
                    }

                    Token::Text { text } if is_xml_whitespace(text.as_str()) => state,

                    _ => {
                        let offset = token_start(&next);
                        bail!(
                            src,
                            offset,
                            msg = "Unexpected {} after root",
                            token_name(&next)
                        );
                    }
                },
            };
        }
    }

    fn finish(mut self) -> XmlResult<ElementNode<'src>> {
        if let Some(open) = self.stack.pop() {
            let name = display_name(open.prefix, open.local);
            bail!(self.src, open.start, XmlErrorKind::UnclosedTag(name));
        }

        let Some(root) = self.root else {
            bail!(self.src, self.src.len(), XmlErrorKind::UnexpectedEof);
        };

        debug!(elements = self.elements, "parsed document");
        Ok(root)
    }

    fn open(&mut self, prefix: &'src str, local: &'src str, start: usize) -> XmlResult<()> {
        if self.stack.len() >= self.max_depth {
            bail!(self.src, start, XmlErrorKind::TooDeep(self.max_depth));
        }

        self.elements += 1;
        self.stack.push(OpenElement {
            element: ElementNode::new(local),
            prefix,
            local,
            start,
            scope_mark: self.scope.mark(),
        });
        Ok(())
    }

    /// Applies the attributes of the start tag just read to the innermost open element.
    ///
    /// Namespace declarations are bound first, since they apply to the tag that declares them.
    fn resolve_start_tag(&mut self) -> XmlResult<()> {
        let src = self.src;
        let attributes = std::mem::take(&mut self.pending);

        for attribute in &attributes {
            if let Some(prefix) = attribute.declared_prefix() {
                let uri = decode_attribute_value(attribute.value.as_str(), &self.entities)
                    .map_err(|e| entity_error(src, attribute.value.start(), e))?;
                if !prefix.is_empty() && uri.is_empty() {
                    let name = display_name(attribute.prefix, attribute.local);
                    bail!(src, attribute.start, XmlErrorKind::UndeclaredPrefix(name));
                }
                self.scope.bind(prefix, uri);
            }
        }

        let Some(open) = self.stack.last_mut() else {
            bail!(src, src.len(), msg = "Bug; Cannot apply attributes; stack is empty!");
        };

        //
        // Unprefixed elements take the default namespace, unprefixed attributes take none
        let namespace = match (open.prefix, self.scope.resolve(open.prefix)) {
            ("", namespace) => namespace,
            (_, Some(namespace)) => Some(namespace),
            (prefix, None) => bail!(src, open.start, XmlErrorKind::UnboundPrefix(prefix.to_string())),
        };
        open.element.name = qualified_name(namespace, open.local);

        for attribute in attributes {
            if attribute.declared_prefix().is_some() {
                continue;
            }

            let name = match attribute.prefix {
                "" => Cow::Borrowed(attribute.local),
                prefix => match self.scope.resolve(prefix) {
                    Some(namespace) => qualified_name(Some(namespace), attribute.local),
                    None => bail!(
                        src,
                        attribute.start,
                        XmlErrorKind::UnboundPrefix(prefix.to_string())
                    ),
                },
            };

            if open.element.attributes.iter().any(|a| a.name == name) {
                let name = display_name(attribute.prefix, attribute.local);
                bail!(src, attribute.start, XmlErrorKind::DuplicateAttribute(name));
            }

            let value = decode_attribute_value(attribute.value.as_str(), &self.entities)
                .map_err(|e| entity_error(src, attribute.value.start(), e))?;
            open.element.attributes.push(Attribute::new(name, value));
        }

        Ok(())
    }

    /// Closes the innermost open element and returns the state to continue in.
    fn close(&mut self) -> ParserState {
        let Some(open) = self.stack.pop() else {
            return ParserState::Epilog;
        };
        self.scope.truncate(open.scope_mark);

        match self.stack.last_mut() {
            Some(parent) => {
                parent.element.push_child(open.element);
                ParserState::TagChildren
            }
            None => {
                self.root = Some(open.element);
                ParserState::Epilog
            }
        }
    }

    fn push_text(&mut self, text: Cow<'src, str>, start: usize) -> XmlResult<()> {
        let Some(open) = self.stack.last_mut() else {
            bail!(self.src, start, msg = "Bug; Cannot apply text; stack is empty!");
        };

        append_text(open.element.text_slot(), text);
        Ok(())
    }
}

fn display_name(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{prefix}:{local}")
    }
}

fn is_xml_whitespace(text: &str) -> bool {
    to_tlv::trim_xml_whitespace(text).is_empty()
}

fn entity_error(src: &str, offset: usize, message: String) -> XmlError {
    XmlError::new(XmlErrorKind::Entity(message), ErrorContext::new(src, offset))
}

/// Line endings in parsed character data are reported as a single `\n`.
fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

fn decode_text<'t>(text: &'t str, entities: &Entities<'_>) -> Result<Cow<'t, str>, String> {
    decode_references(normalize_newlines(text), entities, false)
}

/// Literal whitespace in attribute values becomes a space; references are decoded after,
/// so `&#10;` still yields a newline.
fn decode_attribute_value<'t>(
    value: &'t str,
    entities: &Entities<'_>,
) -> Result<Cow<'t, str>, String> {
    let value = if value.contains(['\t', '\n', '\r']) {
        Cow::Owned(value.replace("\r\n", " ").replace(['\t', '\n', '\r'], " "))
    } else {
        Cow::Borrowed(value)
    };
    decode_references(value, entities, true)
}

fn decode_references<'t>(
    text: Cow<'t, str>,
    entities: &Entities<'_>,
    in_attribute: bool,
) -> Result<Cow<'t, str>, String> {
    if !text.contains('&') {
        return Ok(text);
    }

    let mut decoded = String::with_capacity(text.len());
    let mut budget = MAX_ENTITY_EXPANSION;
    expand_references(&text, entities, in_attribute, 0, &mut budget, &mut decoded)?;
    Ok(Cow::Owned(decoded))
}

/// Appends `text` to `out` with every reference replaced.
///
/// Character references must name an XML `Char`, and entity references must be one of
/// the five predefined entities or declared in the DTD.
fn expand_references(
    text: &str,
    entities: &Entities<'_>,
    in_attribute: bool,
    nesting: usize,
    budget: &mut usize,
    out: &mut String,
) -> Result<(), String> {
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        push_literal(out, &rest[..amp], in_attribute);

        let mut stream = Stream::from(&rest[amp..]);
        let Ok(reference) = stream.consume_reference() else {
            let near: String = rest[amp..].chars().take(12).collect();
            return Err(format!("Malformed reference near `{near}`"));
        };
        rest = &rest[amp + stream.pos()..];

        match reference {
            Reference::Char(c) => out.push(c),
            Reference::Entity(name) => {
                let Some(value) = entities.get(name) else {
                    return Err(format!("Undefined entity `&{name};`"));
                };
                if nesting >= MAX_ENTITY_NESTING {
                    return Err(format!("Entity `&{name};` nests too deeply"));
                }
                if value.contains('<') {
                    return Err(format!("Entity `&{name};` contains markup"));
                }
                *budget = budget
                    .checked_sub(value.len())
                    .ok_or_else(|| format!("Entity `&{name};` expands past {MAX_ENTITY_EXPANSION} bytes"))?;

                expand_references(value, entities, in_attribute, nesting + 1, budget, out)?;
            }
        }
    }

    push_literal(out, rest, in_attribute);
    Ok(())
}

fn push_literal(out: &mut String, text: &str, in_attribute: bool) {
    if in_attribute {
        out.extend(text.chars().map(|c| match c {
            '\t' | '\n' | '\r' => ' ',
            c => c,
        }));
    } else {
        out.push_str(text);
    }
}

/// `<!ENTITY % name ...>` declares a parameter entity, which only applies inside the DTD.
fn is_parameter_entity(declaration: &str) -> bool {
    declaration
        .strip_prefix("<!ENTITY")
        .is_some_and(|rest| rest.trim_start().starts_with('%'))
}

/// Converts a tokenizer row/column back into a byte offset.
fn offset_of(src: &str, pos: xmlparser::TextPos) -> usize {
    let row = usize::try_from(pos.row).unwrap_or(1).max(1);
    let col = usize::try_from(pos.col).unwrap_or(1).max(1);

    let line_start: usize = src.split_inclusive('\n').take(row - 1).map(str::len).sum();
    let line = &src[line_start..];
    let col_offset = line
        .char_indices()
        .nth(col - 1)
        .map_or(line.len(), |(i, _)| i);

    line_start + col_offset
}

fn token_start(token: &Token<'_>) -> usize {
    match *token {
        Token::Declaration { span, .. }
        | Token::ProcessingInstruction { span, .. }
        | Token::Comment { span, .. }
        | Token::DtdStart { span, .. }
        | Token::EmptyDtd { span, .. }
        | Token::EntityDeclaration { span, .. }
        | Token::DtdEnd { span }
        | Token::ElementStart { span, .. }
        | Token::Attribute { span, .. }
        | Token::ElementEnd { span, .. }
        | Token::Cdata { span, .. } => span.start(),
        Token::Text { text } => text.start(),
    }
}

fn token_name(token: &Token<'_>) -> &'static str {
    match token {
        Token::Declaration { .. } => "XML declaration",
        Token::ProcessingInstruction { .. } => "processing instruction",
        Token::Comment { .. } => "comment",
        Token::DtdStart { .. }
        | Token::EmptyDtd { .. }
        | Token::EntityDeclaration { .. }
        | Token::DtdEnd { .. } => "DTD",
        Token::ElementStart { .. } => "element start",
        Token::Attribute { .. } => "attribute",
        Token::ElementEnd { .. } => "element end",
        Token::Text { .. } => "text",
        Token::Cdata { .. } => "CDATA section",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;

    #[test]
    fn test_parse_document() {
        let doc = Document::parse_str("<test><test2>test</test2></test>").unwrap();
        assert_eq!(doc.root.name, "test");
        assert_eq!(doc.root.children.len(), 1);
        assert_eq!(doc.root.elements().next().unwrap().text.as_deref(), Some("test"));
    }

    #[test]
    fn test_text_and_tail() {
        let doc = Document::parse_str("<p>lead<b>bold</b> tail <!--c-->after</p>").unwrap();
        let root = &doc.root;
        assert_eq!(root.text.as_deref(), Some("lead"));

        let Node::Element(b) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(b.text.as_deref(), Some("bold"));
        assert_eq!(b.tail.as_deref(), Some(" tail "));

        let Node::Comment(c) = &root.children[1] else {
            panic!("expected comment");
        };
        assert_eq!(c.text, "c");
        assert_eq!(c.tail.as_deref(), Some("after"));
    }

    #[test]
    fn test_text_borrows_source() {
        let doc = Document::parse_str("<a>plain</a>").unwrap();
        assert!(matches!(doc.root.text, Some(Cow::Borrowed("plain"))));
    }

    #[test]
    fn test_entities_decoded() {
        let doc = Document::parse_str(r#"<a k="&lt;&amp;&#65;">x &gt; y &#x263A;</a>"#).unwrap();
        assert_eq!(doc.root.get_attribute("k"), Some("<&A"));
        assert_eq!(doc.root.text.as_deref(), Some("x > y \u{263A}"));
    }

    #[test]
    fn test_cdata_merges_with_text() {
        let doc = Document::parse_str("<a>one <![CDATA[<two>]]> three</a>").unwrap();
        assert_eq!(doc.root.text.as_deref(), Some("one <two> three"));
    }

    #[test]
    fn test_processing_instruction_skipped() {
        let doc = Document::parse_str("<a>x<?pi data?>y</a>").unwrap();
        assert!(doc.root.children.is_empty());
        assert_eq!(doc.root.text.as_deref(), Some("xy"));
    }

    #[test]
    fn test_newlines_normalized() {
        let doc = Document::parse_str("<a k=\"1\r\n2\">x\r\ny\rz</a>").unwrap();
        assert_eq!(doc.root.text.as_deref(), Some("x\ny\nz"));
        assert_eq!(doc.root.get_attribute("k"), Some("1 2"));
    }

    #[test]
    fn test_attribute_order_preserved() {
        let doc = Document::parse_str(r#"<a z="1" b="2" m="3"/>"#).unwrap();
        let names: Vec<_> = doc.root.attributes.iter().map(|a| a.name.as_ref()).collect();
        assert_eq!(names, ["z", "b", "m"]);
    }

    #[test]
    fn test_namespaces_resolved() {
        let src = r#"<root xmlns="urn:d" xmlns:p="urn:p"><p:child p:k="v" k="w"/><plain/></root>"#;
        let doc = Document::parse_str(src).unwrap();
        assert_eq!(doc.root.name, "{urn:d}root");
        assert!(doc.root.attributes.is_empty());

        let mut children = doc.root.elements();
        let child = children.next().unwrap();
        assert_eq!(child.name, "{urn:p}child");
        assert_eq!(child.get_attribute("{urn:p}k"), Some("v"));
        assert_eq!(child.get_attribute("k"), Some("w"));
        assert_eq!(children.next().unwrap().name, "{urn:d}plain");
    }

    #[test]
    fn test_namespace_scope_ends_with_element() {
        let src = r#"<a><b xmlns:p="urn:p"/><p:c/></a>"#;
        let err = Document::parse_str(src).unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::UnboundPrefix(ref p) if p == "p"));
    }

    #[test]
    fn test_xml_prefix_bound() {
        let doc = Document::parse_str(r#"<a xml:lang="en"/>"#).unwrap();
        assert_eq!(
            doc.root.attributes[0].name,
            "{http://www.w3.org/XML/1998/namespace}lang"
        );
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = Document::parse_str(r#"<a k="1" k="2"/>"#).unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::DuplicateAttribute(_)));

        let src = r#"<a xmlns:p="urn:x" xmlns:q="urn:x" p:k="1" q:k="2"/>"#;
        let err = Document::parse_str(src).unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::DuplicateAttribute(ref n) if n == "q:k"));
    }

    #[test]
    fn test_undeclaring_prefix_rejected() {
        let err = Document::parse_str(r#"<a xmlns:p="urn:p"><b xmlns:p=""><p:c/></b></a>"#).unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::UndeclaredPrefix(ref n) if n == "xmlns:p"));

        let doc = Document::parse_str(r#"<a xmlns="urn:d"><b xmlns=""/></a>"#).unwrap();
        assert_eq!(doc.root.elements().next().unwrap().name, "b");
    }

    #[test]
    fn test_undefined_entity_rejected() {
        for src in ["<a>&foo;</a>", "<a>&nbsp;x</a>", r#"<a k="&foo;"/>"#] {
            let err = Document::parse_str(src).unwrap_err();
            assert!(matches!(err.kind, XmlErrorKind::Entity(ref m) if m.contains("Undefined")), "{src}");
        }
    }

    #[test]
    fn test_malformed_reference_rejected() {
        for src in ["<a>a &amp b</a>", "<a>&#0;</a>", "<a>& b</a>", "<a>&#;</a>"] {
            let err = Document::parse_str(src).unwrap_err();
            assert!(matches!(err.kind, XmlErrorKind::Entity(ref m) if m.contains("Malformed")), "{src}");
        }
    }

    #[test]
    fn test_internal_entities_expanded() {
        let src = r#"<!DOCTYPE a [
            <!ENTITY e "hello">
            <!ENTITY both "&e; &amp; &#65;">
            <!ENTITY e "ignored">
            <!ENTITY % p "parameter">
        ]><a k="&both;">&e;</a>"#;
        let doc = Document::parse_str(src).unwrap();
        assert_eq!(doc.root.text.as_deref(), Some("hello"));
        assert_eq!(doc.root.get_attribute("k"), Some("hello & A"));

        let err = Document::parse_str(r#"<!DOCTYPE a [<!ENTITY % p "x">]><a>&p;</a>"#).unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::Entity(_)));
    }

    #[test]
    fn test_entity_expansion_bounded() {
        let err = Document::parse_str(r#"<!DOCTYPE a [<!ENTITY e "&e;">]><a>&e;</a>"#).unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::Entity(ref m) if m.contains("nests too deeply")));

        let err = Document::parse_str(r#"<!DOCTYPE a [<!ENTITY e "<b/>">]><a>&e;</a>"#).unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::Entity(ref m) if m.contains("markup")));

        let mut dtd = String::from(r#"<!ENTITY l0 "0123456789">"#);
        for i in 1..8 {
            let refs = format!("&l{};", i - 1).repeat(10);
            dtd.push_str(&format!(r#"<!ENTITY l{i} "{refs}">"#));
        }
        let src = format!("<!DOCTYPE a [{dtd}]><a>&l7;</a>");
        let err = Document::parse_str(&src).unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::Entity(ref m) if m.contains("expands past")));
    }

    #[test]
    fn test_outside_root_ignored() {
        let src = "<?xml version=\"1.0\"?>\n<!DOCTYPE a>\n<!-- before -->\n<a/>\n<!-- after -->\n<?pi?>\n";
        let doc = Document::parse_str(src).unwrap();
        assert_eq!(doc.root.name, "a");
        assert!(doc.root.children.is_empty());
        assert!(doc.root.tail.is_none());
    }

    #[test]
    fn test_parse_invalid_xml() {
        let err = Document::parse_str("<test><test2>test</test>").unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::UnclosedTag(ref n) if n == "test2"));
        assert_eq!(err.context.position(), (1, 18));

        let err = Document::parse_str("<test>").unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::UnclosedTag(_)));

        assert!(Document::parse_str("").is_err());
        assert!(Document::parse_str("<a></a><b></b>").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let src = "<a><a><a></a></a></a>";
        assert!(Document::parse_str_with_depth(src, 3).is_ok());

        let err = Document::parse_str_with_depth(src, 2).unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::TooDeep(2)));
    }

    #[test]
    fn test_read_source_missing() {
        let err = Document::read_source("/definitely/not/here.xml").unwrap_err();
        assert!(matches!(err.kind, XmlErrorKind::Io(_)));
        assert!(err.to_string().contains("here.xml"));
    }

    #[test]
    fn test_offset_of() {
        let src = "ab\ncd\nef";
        let pos = xmlparser::TextPos::new(2, 2);
        assert_eq!(offset_of(src, pos), 4);
    }
}
