//! Text interpolation
//!
//! `%name`, `%@name`, `%@@name` and `%$name` inside a text literal are
//! replaced by the referenced value's `to_string`. `\%name` yields a literal
//! `%name`. A `%` not followed by a name is kept as written.

use super::env::Context;
use super::error::InterpResult;
use super::eval::Interpreter;
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Marker {
    #[regex(r"\\%(@@|@|\$)?[A-Za-z0-9_]+")]
    Escaped,
    #[regex(r"%(@@|@|\$)?[A-Za-z0-9_]+")]
    Reference,
    #[regex(r"[^%\\]+")]
    Text,
    #[regex(r"[%\\]")]
    Stray,
}

/// Piece of a scanned text literal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// Name to resolve, sigil included, `%` stripped
    Reference(&'a str),
}

/// Split `text` into literal runs and references, left to right
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut lexer = Marker::lexer(text);
    while let Some(marker) = lexer.next() {
        let slice = lexer.slice();
        match marker {
            Ok(Marker::Reference) => out.push(Segment::Reference(&slice[1..])),
            Ok(Marker::Escaped) => out.push(Segment::Literal(&slice[1..])),
            Ok(Marker::Text) => out.push(Segment::Literal(slice)),
            Ok(Marker::Stray) | Err(()) => {
                tracing::trace!(marker = slice, "keeping bare interpolation marker");
                out.push(Segment::Literal(slice));
            }
        }
    }
    out
}

/// Whether `text` needs any rewriting at all
pub fn has_markers(text: &str) -> bool {
    text.contains('%')
}

/// Interpolate `text` against `ctx`
pub fn interpolate(interp: &mut Interpreter, text: &str, ctx: &Context) -> InterpResult<String> {
    if !has_markers(text) {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::Reference(name) => {
                let value = ctx.get(name, interp.classes());
                out.push_str(&interp.stringify(&value)?);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Segment::{Literal, Reference};

    #[test]
    fn test_plain_text_is_one_literal() {
        assert_eq!(segments("hello world"), vec![Literal("hello world")]);
        assert!(segments("").is_empty());
    }

    #[test]
    fn test_reference_forms() {
        assert_eq!(segments("Hi %name!"), vec![Literal("Hi "), Reference("name"), Literal("!")]);
        assert_eq!(segments("%@x"), vec![Reference("@x")]);
        assert_eq!(segments("%@@count"), vec![Reference("@@count")]);
        assert_eq!(segments("%$debug"), vec![Reference("$debug")]);
    }

    #[test]
    fn test_escape_yields_literal_marker() {
        assert_eq!(segments(r"\%name"), vec![Literal("%name")]);
        assert_eq!(segments(r"a \%@b c"), vec![Literal("a "), Literal("%@b"), Literal(" c")]);
    }

    #[test]
    fn test_bare_markers_are_kept() {
        let joined: String = segments("100%% done")
            .iter()
            .map(|s| match s {
                Literal(s) => *s,
                Reference(_) => "?",
            })
            .collect();
        assert_eq!(joined, "100%% done");
        assert_eq!(segments("%@"), vec![Literal("%"), Literal("@")]);
        assert_eq!(segments(r"trailing \"), vec![Literal("trailing "), Literal("\\")]);
    }

    #[test]
    fn test_adjacent_references() {
        assert_eq!(segments("%a%b"), vec![Reference("a"), Reference("b")]);
    }

    #[test]
    fn test_has_markers() {
        assert!(has_markers("50%"));
        assert!(!has_markers("plain"));
    }
}
