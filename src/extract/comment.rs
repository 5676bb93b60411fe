//! Documentation comment attachment and tokenization
//!
//! A declaration's comment is the run of comment nodes sitting directly
//! above it at the top level. Neighbouring comments merge when they are at
//! most one line apart; a comment that starts on the line where the previous
//! item ends is a trailing comment of that item and attaches to nothing below.

use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z0-9]+").unwrap());

/// Split comment text into maximal ASCII-alphanumeric runs
pub fn tokenize_comment(text: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Raw bytes of the comment attached to a top-level node, markers included
pub fn attached_comment<'a>(node: Node, source: &'a [u8]) -> Option<&'a [u8]> {
    let mut first: Option<Node> = None;
    let mut last: Option<Node> = None;
    let mut next_start = node.start_byte();
    let mut current = node.prev_sibling();

    while let Some(sibling) = current {
        if sibling.kind() != "comment" {
            break;
        }

        let gap = &source[sibling.end_byte()..next_start];
        if !gap.iter().all(u8::is_ascii_whitespace) {
            break;
        }
        if last.is_some() && gap.iter().filter(|&&b| b == b'\n').count() > 1 {
            break;
        }
        if is_trailing(sibling) {
            break;
        }

        if last.is_none() {
            last = Some(sibling);
        }
        first = Some(sibling);
        next_start = sibling.start_byte();
        current = sibling.prev_sibling();
    }

    let (first, last) = (first?, last?);
    Some(&source[first.start_byte()..last.end_byte()])
}

/// Comment tokens for a declaration; undecodable text counts as no comment
pub fn comment_tokens(node: Node, source: &[u8]) -> Vec<String> {
    attached_comment(node, source)
        .and_then(|raw| std::str::from_utf8(raw).ok())
        .map(tokenize_comment)
        .unwrap_or_default()
}

fn is_trailing(comment: Node) -> bool {
    comment
        .prev_sibling()
        .filter(|prev| prev.kind() != "comment")
        .is_some_and(|prev| last_row(prev) == comment.start_position().row)
}

/// Row of the last character of a node. Preprocessor lines own their
/// newline, so they end at column 0 of the following row.
fn last_row(node: Node) -> usize {
    let end = node.end_position();
    if end.column == 0 && end.row > node.start_position().row {
        end.row - 1
    } else {
        end.row
    }
}
