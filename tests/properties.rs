use proptest::prelude::*;
use xmltlv::{CommentNode, ElementNode, EncodeOptions, Node, RecordTag, to_tlv::encode};

fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-z][a-z0-9_]{0,8}",
        1 => "\\{urn:[a-z]{1,6}\\}[a-z][a-z0-9]{0,6}",
    ]
}

fn text_strategy() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[ a-z\t\n\u{e9}]{0,24}")
}

fn comment_strategy() -> impl Strategy<Value = CommentNode<'static>> {
    ("[ a-z]{0,16}", text_strategy()).prop_map(|(text, tail)| CommentNode {
        text: text.into(),
        tail: tail.map(Into::into),
    })
}

fn element_strategy() -> impl Strategy<Value = ElementNode<'static>> {
    let attributes = prop::collection::btree_map("[a-z]{1,6}", "[ -~]{0,12}", 0..3);
    let leaf = (name_strategy(), attributes, text_strategy(), text_strategy()).prop_map(
        |(name, attributes, text, tail)| {
            let mut element = ElementNode::new(name);
            for (k, v) in attributes {
                element = element.with_attribute(k, v);
            }
            element.text = text.map(Into::into);
            element.tail = tail.map(Into::into);
            element
        },
    );

    leaf.prop_recursive(5, 48, 4, move |inner| {
        let child = prop_oneof![
            3 => inner.prop_map(Node::Element),
            1 => comment_strategy().prop_map(Node::Comment),
        ];
        (inner_base(), prop::collection::vec(child, 0..4)).prop_map(|(mut element, children)| {
            element.children = children;
            element
        })
    })
}

fn inner_base() -> impl Strategy<Value = ElementNode<'static>> {
    (name_strategy(), text_strategy(), text_strategy()).prop_map(|(name, text, tail)| {
        let mut element = ElementNode::new(name);
        element.text = text.map(Into::into);
        element.tail = tail.map(Into::into);
        element
    })
}

fn count_elements(root: &ElementNode<'_>) -> usize {
    let mut count = 0;
    let mut stack = vec![root];
    while let Some(element) = stack.pop() {
        count += 1;
        stack.extend(element.elements());
    }
    count
}

fn read_field<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<&'a [u8], String> {
    let len = usize::from(*bytes.get(*pos).ok_or("missing length")?);
    let value = bytes
        .get(*pos + 1..*pos + 1 + len)
        .ok_or("truncated field")?;
    *pos += 1 + len;
    Ok(value)
}

/// Walks a stream record by record, checking start/end nesting along the way.
/// Returns the number of element start records.
fn check_stream(bytes: &[u8]) -> Result<usize, String> {
    let mut open: Vec<&[u8]> = vec![];
    let mut starts = 0;
    let mut pos = 0;

    loop {
        let tag = *bytes.get(pos).ok_or("missing terminator")?;
        pos += 1;
        match tag {
            0x01 => {
                open.push(read_field(bytes, &mut pos)?);
                starts += 1;
            }
            0x02 => {
                let name = read_field(bytes, &mut pos)?;
                if open.pop() != Some(name) {
                    return Err(format!("unmatched end record at byte {pos}"));
                }
            }
            0x03 => {
                read_field(bytes, &mut pos)?;
                read_field(bytes, &mut pos)?;
            }
            0x04 => {
                let text = read_field(bytes, &mut pos)?;
                let text = std::str::from_utf8(text).map_err(|e| e.to_string())?;
                if text.is_empty() || text.trim_matches([' ', '\t', '\n', '\r']) != text {
                    return Err(format!("untrimmed text record {text:?}"));
                }
            }
            0x05 => {
                read_field(bytes, &mut pos)?;
            }
            0xFF => break,
            other => return Err(format!("unknown tag {other:#04x}")),
        }
    }

    if pos != bytes.len() {
        return Err(format!("{} bytes after terminator", bytes.len() - pos));
    }
    if !open.is_empty() {
        return Err("unclosed element at end of stream".to_string());
    }
    Ok(starts)
}

proptest! {
    #[test]
    fn encoding_is_deterministic(root in element_strategy()) {
        let options = EncodeOptions::default();
        let first = encode(&root, &options).unwrap();
        let second = encode(&root.clone(), &options).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn stream_is_well_bracketed(root in element_strategy()) {
        let bytes = encode(&root, &EncodeOptions::default()).unwrap();
        let starts = check_stream(&bytes).map_err(TestCaseError::fail)?;
        prop_assert_eq!(starts, count_elements(&root));
    }

    #[test]
    fn terminator_is_last_and_unique(root in element_strategy()) {
        let bytes = encode(&root, &EncodeOptions::default()).unwrap();
        prop_assert_eq!(bytes.last().copied(), Some(u8::from(RecordTag::EndOfStream)));

        // 0xFF never appears inside UTF-8 payloads or length bytes of short fields
        prop_assert_eq!(bytes.iter().filter(|b| **b == 0xFF).count(), 1);
    }

    #[test]
    fn oversized_text_is_rejected(len in 256usize..600) {
        let root = ElementNode::new("a").with_child(ElementNode::new("b").with_tail("t".repeat(len)));
        prop_assert!(encode(&root, &EncodeOptions::default()).is_err());
    }
}
