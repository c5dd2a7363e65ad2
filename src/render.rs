//! Template Renderer - `{{marker}}` Interpreter
//!
//! Three passes, each over the output of the previous one:
//! 1. `{{path}}` interpolation against the root of the content tree
//! 2. `{{#name}}...{{/name}}` iteration over sequences
//! 3. `{{#socialLinks.field}}...{{/socialLinks.field}}` conditionals
//!
//! Rendering never fails. Markers that do not resolve are copied through
//! verbatim so broken templates stay visible in the output.

use crate::tree::Node;

/// The only scope whose dotted blocks are treated as conditionals.
pub const CONDITIONAL_SCOPE: &str = "socialLinks";

/// Loop-local marker for the 1-based position of the current element.
pub const INDEX_MARKER: &str = "@index";

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

pub fn render(template: &str, data: &Node) -> String {
    let interpolated = interpolate(template, data, None);
    let iterated = expand_loops(&interpolated, data);
    apply_conditionals(&iterated, data)
}

/// A `{{body}}` token. `body` never contains `}`.
struct Marker<'a> {
    body: &'a str,
    end: usize,
}

/// A matched `{{#name}}body{{/name}}` region, closed by the nearest close tag.
struct Block<'a> {
    name: &'a str,
    body: &'a str,
    end: usize,
}

fn marker_at(src: &str, start: usize) -> Option<Marker<'_>> {
    let inner = src.get(start..)?.strip_prefix(OPEN)?;
    let len = inner.find('}').unwrap_or(inner.len());
    let body = &inner[..len];
    if body.is_empty() || !inner[len..].starts_with(CLOSE) {
        return None;
    }
    Some(Marker {
        body,
        end: start + OPEN.len() + len + CLOSE.len(),
    })
}

fn block_at<'a, P>(src: &'a str, start: usize, accept: P) -> Option<Block<'a>>
where
    P: Fn(&str) -> bool,
{
    let open = marker_at(src, start)?;
    let name = open.body.strip_prefix('#')?;
    if !accept(name) {
        return None;
    }

    let close_tag = format!("{}/{}{}", OPEN, name, CLOSE);
    let body_len = src[open.end..].find(&close_tag)?;
    Some(Block {
        name,
        body: &src[open.end..open.end + body_len],
        end: open.end + body_len + close_tag.len(),
    })
}

/// Walk every `{{` in `src`. When `at` returns a replacement, the text up to
/// `end` is swapped for it and scanning resumes at `end`; otherwise scanning
/// resumes one byte further.
fn scan<F>(src: &str, mut at: F) -> String
where
    F: FnMut(&str, usize) -> Option<(String, usize)>,
{
    let mut out = String::with_capacity(src.len());
    let mut copied = 0;
    let mut cursor = 0;

    while let Some(offset) = src[cursor..].find(OPEN) {
        let start = cursor + offset;
        match at(src, start) {
            Some((replacement, end)) => {
                out.push_str(&src[copied..start]);
                out.push_str(&replacement);
                copied = end;
                cursor = end;
            }
            None => cursor = start + 1,
        }
    }

    out.push_str(&src[copied..]);
    out
}

fn interpolate(src: &str, scope: &Node, index: Option<usize>) -> String {
    scan(src, |src, start| {
        let marker = marker_at(src, start)?;
        if marker.body.starts_with('#') || marker.body.starts_with('/') {
            return None;
        }

        let value = match (marker.body, index) {
            (INDEX_MARKER, Some(position)) => Some(position.to_string()),
            (path, _) => scope.lookup(path).and_then(Node::text),
        };
        let replacement = value.unwrap_or_else(|| src[start..marker.end].to_string());
        Some((replacement, marker.end))
    })
}

fn expand_loops(src: &str, data: &Node) -> String {
    scan(src, |src, start| {
        let block = block_at(src, start, is_word)?;
        let expanded = match data.lookup(block.name) {
            Some(Node::Sequence(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| interpolate(block.body, item, Some(i + 1)))
                .collect(),
            _ => String::new(),
        };
        Some((expanded, block.end))
    })
}

fn apply_conditionals(src: &str, data: &Node) -> String {
    scan(src, |src, start| {
        let block = block_at(src, start, is_conditional_name)?;
        let keep = data
            .lookup(block.name)
            .and_then(Node::text)
            .map_or(false, |value| !value.trim().is_empty());
        let kept = if keep { block.body.to_string() } else { String::new() };
        Some((kept, block.end))
    })
}

fn is_word(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn is_conditional_name(name: &str) -> bool {
    name.strip_prefix(CONDITIONAL_SCOPE)
        .and_then(|rest| rest.strip_prefix('.'))
        .map_or(false, is_word)
}
