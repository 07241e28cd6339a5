use std::borrow::Cow;

/// The namespace permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Reduces a `{namespace-uri}local` name to `local`.
///
/// Everything up to and including the first `}` is dropped. Names that do not start with `{`,
/// or that never close the brace, are returned unchanged.
///
/// ```rust
/// use xmltlv::local_name;
/// assert_eq!(local_name("{urn:example}foo"), "foo");
/// assert_eq!(local_name("foo"), "foo");
/// ```
#[must_use]
pub fn local_name(name: &str) -> &str {
    if !name.starts_with('{') {
        return name;
    }

    match name.split_once('}') {
        Some((_, local)) => local,
        None => name,
    }
}

/// Joins a namespace and a local name into `{namespace-uri}local`.
/// A missing or empty namespace leaves the local name as-is.
#[must_use]
pub fn qualified_name<'src>(namespace: Option<&str>, local: &'src str) -> Cow<'src, str> {
    match namespace {
        Some(uri) if !uri.is_empty() => Cow::Owned(format!("{{{uri}}}{local}")),
        _ => Cow::Borrowed(local),
    }
}

/// Prefix-to-namespace bindings in scope at one point of a document.
///
/// Bindings are pushed as elements open and truncated as they close,
/// so lookups always see the innermost declaration first.
#[derive(Debug, Clone, Default)]
pub(crate) struct NamespaceScope<'src> {
    bindings: Vec<(&'src str, Cow<'src, str>)>,
}
impl<'src> NamespaceScope<'src> {
    /// Returns a marker to restore the scope to with [`NamespaceScope::truncate`].
    pub fn mark(&self) -> usize {
        self.bindings.len()
    }

    /// Drops every binding declared after `mark`.
    pub fn truncate(&mut self, mark: usize) {
        self.bindings.truncate(mark);
    }

    /// Binds a prefix; the empty prefix is the default namespace.
    pub fn bind(&mut self, prefix: &'src str, uri: Cow<'src, str>) {
        self.bindings.push((prefix, uri));
    }

    /// Finds the namespace for a prefix.
    ///
    /// Returns `None` if the prefix is unbound. The default namespace may be bound to `""`,
    /// which means "no namespace".
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }

        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| *p == prefix)
            .map(|(_, uri)| uri.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("{urn:example}foo"), "foo");
        assert_eq!(local_name("{urn:a}b}c"), "b}c");
        assert_eq!(local_name("plain"), "plain");
        assert_eq!(local_name("{unterminated"), "{unterminated");
        assert_eq!(local_name("a}b"), "a}b");
        assert_eq!(local_name("{}x"), "x");
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name(Some("urn:x"), "a"), "{urn:x}a");
        assert_eq!(qualified_name(Some(""), "a"), "a");
        assert_eq!(qualified_name(None, "a"), "a");
    }

    #[test]
    fn test_scope() {
        let mut scope = NamespaceScope::default();
        assert_eq!(scope.resolve("p"), None);
        assert_eq!(scope.resolve("xml"), Some(XML_NAMESPACE));

        scope.bind("p", "urn:outer".into());
        let mark = scope.mark();
        scope.bind("p", "urn:inner".into());
        scope.bind("", "urn:default".into());
        assert_eq!(scope.resolve("p"), Some("urn:inner"));
        assert_eq!(scope.resolve(""), Some("urn:default"));

        scope.truncate(mark);
        assert_eq!(scope.resolve("p"), Some("urn:outer"));
        assert_eq!(scope.resolve(""), None);
    }
}
