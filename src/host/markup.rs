//! Minimal HTML-subset parser for template markup.
//!
//! Supports elements with quoted, unquoted and bare attributes, self-closing
//! tags, void elements, comments and the basic character entities. Unclosed
//! elements are closed at end of input; a stray or mismatched closing tag is
//! an error.

use crate::error::HostError;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Parsed markup node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
    Comment(String),
}

struct Open {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<MarkupNode>,
}

/// Parse markup into top-level nodes.
pub fn parse(input: &str) -> Result<Vec<MarkupNode>, HostError> {
    let mut stack: Vec<Open> = Vec::new();
    let mut roots: Vec<MarkupNode> = Vec::new();
    let mut pos = 0;

    fn push(stack: &mut [Open], roots: &mut Vec<MarkupNode>, node: MarkupNode) {
        match stack.last_mut() {
            Some(open) => open.children.push(node),
            None => roots.push(node),
        }
    }

    while pos < input.len() {
        let rest = &input[pos..];
        if let Some(body) = rest.strip_prefix("<!--") {
            let end = body.find("-->").ok_or_else(|| error(pos, "unterminated comment"))?;
            push(&mut stack, &mut roots, MarkupNode::Comment(body[..end].to_string()));
            pos += 4 + end + 3;
        } else if let Some(body) = rest.strip_prefix("</") {
            let end = body.find('>').ok_or_else(|| error(pos, "unterminated closing tag"))?;
            let tag = body[..end].trim().to_ascii_lowercase();
            let open = stack.pop().ok_or_else(|| error(pos, "closing tag without open element"))?;
            if open.tag != tag {
                return Err(error(pos, &format!("expected </{}>, found </{tag}>", open.tag)));
            }
            let node = MarkupNode::Element {
                tag: open.tag,
                attrs: open.attrs,
                children: open.children,
            };
            push(&mut stack, &mut roots, node);
            pos += 2 + end + 1;
        } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let (consumed, tag, attrs, self_closing) = parse_open_tag(rest, pos)?;
            pos += consumed;
            if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
                push(
                    &mut stack,
                    &mut roots,
                    MarkupNode::Element {
                        tag,
                        attrs,
                        children: Vec::new(),
                    },
                );
            } else {
                stack.push(Open {
                    tag,
                    attrs,
                    children: Vec::new(),
                });
            }
        } else {
            let first = rest.chars().next().map_or(1, char::len_utf8);
            let end = rest[first..].find('<').map_or(rest.len(), |i| i + first);
            push(&mut stack, &mut roots, MarkupNode::Text(decode_entities(&rest[..end])));
            pos += end;
        }
    }

    while let Some(open) = stack.pop() {
        let node = MarkupNode::Element {
            tag: open.tag,
            attrs: open.attrs,
            children: open.children,
        };
        push(&mut stack, &mut roots, node);
    }
    Ok(roots)
}

fn error(offset: usize, reason: &str) -> HostError {
    HostError::Markup {
        offset,
        reason: reason.to_string(),
    }
}

type OpenTag = (usize, String, Vec<(String, String)>, bool);

/// Parse `<tag attr=...>` at the start of `input`.
fn parse_open_tag(input: &str, offset: usize) -> Result<OpenTag, HostError> {
    let bytes = input.as_bytes();
    let mut i = 1;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/' {
        i += 1;
    }
    let tag = input[1..i].to_ascii_lowercase();
    let mut attrs = Vec::new();

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return Err(error(offset, "unterminated tag")),
            Some(b'>') => return Ok((i + 1, tag, attrs, false)),
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => return Ok((i + 2, tag, attrs, true)),
            Some(b'/') => i += 1,
            Some(_) => {
                let start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'=' | b'>' | b'/')
                {
                    i += 1;
                }
                let name = input[start..i].to_ascii_lowercase();
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                if bytes.get(i) != Some(&b'=') {
                    attrs.push((name, String::new()));
                    continue;
                }
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                let value = match bytes.get(i) {
                    Some(&quote) if quote == b'"' || quote == b'\'' => {
                        let body = &input[i + 1..];
                        let end = body
                            .find(quote as char)
                            .ok_or_else(|| error(offset + i, "unterminated attribute value"))?;
                        i += 1 + end + 1;
                        &body[..end]
                    }
                    _ => {
                        let start = i;
                        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                            i += 1;
                        }
                        &input[start..i]
                    }
                };
                attrs.push((name, decode_entities(value)));
            }
        }
    }
}

/// Decode `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&#39;` and numeric references.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix('#')
                    .and_then(|n| match n.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => n.parse().ok(),
                    })
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
