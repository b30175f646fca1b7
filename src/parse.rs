//! Annotation text → `Ty`.
//!
//! Accepts the `typing` spellings (`Optional[int]`, `t.Union[a, b]`,
//! `typing.List[str]`) and the operator form (`int | None`). Both union forms
//! land in the same canonical `Ty::Union`, so nothing downstream can tell
//! them apart.
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::ir::Ty;

static NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{XID_Start}_]\p{XID_Continue}*(?:\s*\.\s*[\p{XID_Start}_]\p{XID_Continue}*)*")
        .expect("static regex")
});

static INT_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9][0-9_]*").expect("static regex"));

/// Nesting limit for brackets, parentheses and forward references.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty annotation")]
    Empty,
    #[error("unexpected end of annotation")]
    UnexpectedEnd,
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("expected {expected} at offset {offset}, found {found:?}")]
    UnexpectedToken { expected: &'static str, found: String, offset: usize },
    #[error("`{name}` takes {expected} type argument(s), got {found} (offset {offset})")]
    Arity { name: String, expected: &'static str, found: usize, offset: usize },
    #[error("`{name}[]` needs at least one type argument (offset {offset})")]
    EmptyArguments { name: String, offset: usize },
    #[error("unexpected trailing input at offset {offset}")]
    TrailingInput { offset: usize },
    #[error("annotation nested deeper than {} levels at offset {offset}", MAX_DEPTH)]
    TooDeep { offset: usize },
}

impl ParseError {
    // Errors from a quoted forward reference are reported against the outer text.
    fn shifted(self, by: usize) -> Self {
        use ParseError::*;
        match self {
            UnexpectedChar { found, offset } => UnexpectedChar { found, offset: offset + by },
            UnexpectedToken { expected, found, offset } => UnexpectedToken { expected, found, offset: offset + by },
            Arity { name, expected, found, offset } => Arity { name, expected, found, offset: offset + by },
            EmptyArguments { name, offset } => EmptyArguments { name, offset: offset + by },
            TrailingInput { offset } => TrailingInput { offset: offset + by },
            TooDeep { offset } => TooDeep { offset: offset + by },
            other => other,
        }
    }
}

pub fn parse_annotation(src: &str) -> Result<Ty, ParseError> {
    parse_nested(src, 0)
}

fn parse_nested(src: &str, depth: usize) -> Result<Ty, ParseError> {
    if src.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut p = Parser { src, pos: 0, depth };
    let ty = p.annotation()?;
    p.skip_ws();
    if p.pos < src.len() {
        return Err(ParseError::TrailingInput { offset: p.pos });
    }
    tracing::trace!(%src, ty = %ty, "parsed annotation");
    Ok(ty)
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL
// ————————————————————————————————————————————————————————————————————————————

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char, expected: &'static str) -> Result<(), ParseError> {
        match self.peek() {
            Some(x) if x == c => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(x) => Err(ParseError::UnexpectedToken { expected, found: x.to_string(), offset: self.pos }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    /// annotation := term ('|' term)*
    fn annotation(&mut self) -> Result<Ty, ParseError> {
        let first = self.term()?;
        if self.peek() != Some('|') {
            return Ok(first);
        }
        let mut arms = vec![first];
        while self.eat('|') {
            arms.push(self.term()?);
        }
        Ok(Ty::union(arms))
    }

    fn term(&mut self) -> Result<Ty, ParseError> {
        let offset = {
            self.skip_ws();
            self.pos
        };
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep { offset });
        }
        self.depth += 1;
        let ty = self.term_at(offset);
        self.depth -= 1;
        ty
    }

    fn term_at(&mut self, offset: usize) -> Result<Ty, ParseError> {
        match self.peek() {
            None => Err(ParseError::UnexpectedEnd),
            Some('(') => {
                self.pos += 1;
                let inner = self.annotation()?;
                self.expect(')', "`)`")?;
                Ok(inner)
            }
            Some(q @ ('"' | '\'')) => self.forward_ref(q, offset),
            Some('.') if self.rest().starts_with("...") => {
                self.pos += 3;
                Ok(Ty::plain("..."))
            }
            Some(c) if c.is_ascii_digit() || c == '-' => {
                let lit = INT_LITERAL.find(self.rest()).map(|m| m.as_str());
                let lit = lit.ok_or(ParseError::UnexpectedChar { found: c, offset })?;
                self.pos += lit.len();
                Ok(Ty::plain(lit))
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                let name = self.name().ok_or(ParseError::UnexpectedChar { found: c, offset })?;
                let args = if self.eat('[') { Some(self.arglist(&name, offset)?) } else { None };
                resolve(name, args, offset)
            }
            Some(found) => Err(ParseError::UnexpectedChar { found, offset }),
        }
    }

    /// Dotted name; only the last segment is kept (`typing.List` → `List`).
    fn name(&mut self) -> Option<String> {
        let m = NAME.find(self.rest())?.as_str();
        self.pos += m.len();
        Some(m.rsplit('.').next().unwrap_or(m).trim().to_string())
    }

    fn arglist(&mut self, name: &str, offset: usize) -> Result<Vec<Ty>, ParseError> {
        if self.eat(']') {
            return Err(ParseError::EmptyArguments { name: name.to_string(), offset });
        }
        let mut args = vec![self.annotation()?];
        loop {
            if self.eat(']') {
                return Ok(args);
            }
            self.expect(',', "`,` or `]`")?;
            // trailing comma
            if self.eat(']') {
                return Ok(args);
            }
            args.push(self.annotation()?);
        }
    }

    fn forward_ref(&mut self, quote: char, offset: usize) -> Result<Ty, ParseError> {
        let body_start = offset + 1;
        let body_len = self.src[body_start..].find(quote).ok_or(ParseError::UnexpectedEnd)?;
        let body = &self.src[body_start..body_start + body_len];
        self.pos = body_start + body_len + 1;
        parse_nested(body, self.depth).map_err(|e| e.shifted(body_start))
    }
}

fn resolve(name: String, args: Option<Vec<Ty>>, offset: usize) -> Result<Ty, ParseError> {
    let arity = |expected: &'static str, found: usize| ParseError::Arity {
        name: name.clone(),
        expected,
        found,
        offset,
    };
    match (name.as_str(), args) {
        ("None" | "NoneType", None) => Ok(Ty::None),
        ("Optional", Some(mut args)) if args.len() == 1 => Ok(Ty::optional(args.remove(0))),
        ("Optional", args) => Err(arity("exactly 1", args.map_or(0, |a| a.len()))),
        ("Union", Some(args)) => Ok(Ty::union(args)),
        ("Union", None) => Err(ParseError::EmptyArguments { name: name.clone(), offset }),
        ("list" | "List", None) => Ok(Ty::BareList),
        ("list" | "List", Some(mut args)) if args.len() == 1 => Ok(Ty::list(args.remove(0))),
        ("list" | "List", Some(args)) => Err(arity("exactly 1", args.len())),
        (_, None) => Ok(Ty::plain(builtin_alias(&name))),
        (_, Some(args)) => Ok(Ty::generic(builtin_alias(&name), args)),
    }
}

fn builtin_alias(name: &str) -> &str {
    match name {
        "Dict" => "dict",
        "Set" => "set",
        "FrozenSet" => "frozenset",
        "Tuple" => "tuple",
        "Type" => "type",
        other => other,
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> Ty { Ty::plain("int") }

    #[test]
    fn both_union_spellings_are_one_variant() {
        let a = parse_annotation("Optional[int]").unwrap();
        let b = parse_annotation("int | None").unwrap();
        let c = parse_annotation("typing.Union[int, None]").unwrap();
        let d = parse_annotation("t.Optional[ int ]").unwrap();
        assert_eq!(a, Ty::Union { members: vec![int(), Ty::None] });
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
    }

    #[test]
    fn union_order_is_kept() {
        let t = parse_annotation("None | int").unwrap();
        assert_eq!(t, Ty::Union { members: vec![Ty::None, int()] });
    }

    #[test]
    fn nested_unions_flatten() {
        let t = parse_annotation("Union[int, Optional[str]]").unwrap();
        assert_eq!(t.to_string(), "int | str | None");
        let t = parse_annotation("(int | str) | None").unwrap();
        assert_eq!(t.to_string(), "int | str | None");
    }

    #[test]
    fn list_spellings() {
        let want = Ty::list(Ty::list(Ty::plain("str")));
        for src in ["list[list[str]]", "List[List[str]]", "typing.List[t.List[str]]"] {
            assert_eq!(parse_annotation(src).unwrap(), want, "{src}");
        }
        assert_eq!(parse_annotation("list").unwrap(), Ty::BareList);
        assert_eq!(parse_annotation("t.List").unwrap(), Ty::BareList);
    }

    #[test]
    fn generics_and_aliases() {
        let t = parse_annotation("Dict[str, List[int]]").unwrap();
        assert_eq!(t, Ty::generic("dict", vec![Ty::plain("str"), Ty::list(int())]));
        let t = parse_annotation("tuple[int, ...]").unwrap();
        assert_eq!(t.to_string(), "tuple[int, ...]");
        assert_eq!(parse_annotation("NoneType").unwrap(), Ty::None);
        assert_eq!(parse_annotation("Union[int]").unwrap(), int());
    }

    #[test]
    fn trailing_comma_and_whitespace() {
        let t = parse_annotation("  dict[ str , int , ]  ").unwrap();
        assert_eq!(t.to_string(), "dict[str, int]");
    }

    #[test]
    fn forward_references() {
        let t = parse_annotation("Optional['Band']").unwrap();
        assert_eq!(t, Ty::optional(Ty::plain("Band")));
        let t = parse_annotation("\"list[Band]\"").unwrap();
        assert_eq!(t, Ty::list(Ty::plain("Band")));
    }

    #[test]
    fn errors() {
        assert_eq!(parse_annotation("   "), Err(ParseError::Empty));
        assert_eq!(parse_annotation("list[int"), Err(ParseError::UnexpectedEnd));
        assert_eq!(parse_annotation("int |"), Err(ParseError::UnexpectedEnd));
        assert!(matches!(
            parse_annotation("list[int, str]"),
            Err(ParseError::Arity { found: 2, .. })
        ));
        assert!(matches!(
            parse_annotation("Optional"),
            Err(ParseError::Arity { found: 0, .. })
        ));
        assert!(matches!(
            parse_annotation("Union[]"),
            Err(ParseError::EmptyArguments { offset: 0, .. })
        ));
        assert_eq!(
            parse_annotation("int str"),
            Err(ParseError::TrailingInput { offset: 4 })
        );
        assert_eq!(
            parse_annotation("list[$]"),
            Err(ParseError::UnexpectedChar { found: '$', offset: 5 })
        );
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        let src = format!("{}int{}", "list[".repeat(50_000), "]".repeat(50_000));
        assert_eq!(
            parse_annotation(&src),
            Err(ParseError::TooDeep { offset: MAX_DEPTH * "list[".len() })
        );

        let parens = format!("{}int{}", "(".repeat(50_000), ")".repeat(50_000));
        assert!(matches!(parse_annotation(&parens), Err(ParseError::TooDeep { .. })));

        let at_limit = format!("{}int{}", "list[".repeat(MAX_DEPTH - 1), "]".repeat(MAX_DEPTH - 1));
        assert!(parse_annotation(&at_limit).is_ok());
    }

    #[test]
    fn forward_references_share_the_depth_budget() {
        let inner = format!("{}int{}", "list[".repeat(MAX_DEPTH - 1), "]".repeat(MAX_DEPTH - 1));
        let src = format!("list['{inner}']");
        assert!(matches!(parse_annotation(&src), Err(ParseError::TooDeep { .. })));
    }

    #[test]
    fn unicode_names_and_integer_literals() {
        assert_eq!(parse_annotation("Optional[Straße]").unwrap(), Ty::optional(Ty::plain("Straße")));
        assert_eq!(
            parse_annotation("Literal[1, -2]").unwrap(),
            Ty::generic("Literal", vec![Ty::plain("1"), Ty::plain("-2")])
        );
        assert_eq!(parse_annotation("Annotated[int, 5]").unwrap().to_string(), "Annotated[int, 5]");
        assert_eq!(
            parse_annotation("list[-x]"),
            Err(ParseError::UnexpectedChar { found: '-', offset: 5 })
        );
    }

    #[test]
    fn forward_reference_errors_point_into_outer_text() {
        assert_eq!(
            parse_annotation("Optional['$']"),
            Err(ParseError::UnexpectedChar { found: '$', offset: 10 })
        );
    }
}
