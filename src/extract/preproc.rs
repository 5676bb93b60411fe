//! Preprocessor structure the front end sees but a compiler would not
//!
//! tree-sitter keeps `#if`/`#ifdef` blocks as nodes with the guarded items
//! as their children, and it parses every branch. Two consequences:
//! - declarations inside conditionals are not direct children of the root
//! - the `#ifdef __cplusplus` / `extern "C" {` / `#endif` idiom leaves an
//!   unbalanced brace in each branch and turns the file into a syntax error

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::borrow::Cow;

/// Node kinds whose named children are walked as if the directive lines
/// were not there. All branches are visited; conditions are not evaluated.
pub const TRANSPARENT_KINDS: &[&str] = &[
    "preproc_if",
    "preproc_ifdef",
    "preproc_elif",
    "preproc_elifdef",
    "preproc_else",
    "declaration_list",
];

/// A `__cplusplus` conditional whose only line opens or closes a linkage block
static LINKAGE_GUARD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?m)^[ \t]*#[ \t]*if(?:def[ \t]+__cplusplus|[ \t]+defined[ \t]*\(?[ \t]*__cplusplus[ \t]*\)?)",
        r"[ \t]*(?://[^\r\n]*|/\*[^\r\n]*\*/)?[ \t]*\r?\n",
        r#"([ \t]*(?:extern[ \t]+"C(?:\+\+)?"[ \t]*\{|\})[ \t]*(?://[^\r\n]*|/\*[^\r\n]*\*/)?[ \t]*)\r?\n"#,
        r"[ \t]*#[ \t]*endif",
    ))
    .unwrap()
});

/// Blank the `extern "C" {` and `}` lines of `__cplusplus` guards.
///
/// Byte offsets and line numbers are unchanged, so comment attachment and
/// positions still line up with the file on disk.
pub fn mask_linkage_guards(source: &[u8]) -> Cow<'_, [u8]> {
    let ranges: Vec<_> = LINKAGE_GUARD_RE
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.range())
        .collect();

    if ranges.is_empty() {
        return Cow::Borrowed(source);
    }

    let mut masked = source.to_vec();
    for range in ranges {
        masked[range].fill(b' ');
    }
    Cow::Owned(masked)
}
