//! Parser for Scena composition source text.
//!
//! This module transforms source text directly into the document tree
//! defined in [`scena_core::document`]. The grammar is the markup-in-code
//! hybrid of the composition language: elements with typed attributes,
//! nested children, literal text runs, expression containers, and
//! declarations. The public entry point is [`crate::parse`].

use indexmap::IndexMap;
use winnow::{
    Parser as _,
    ascii::multispace0,
    combinator::{alt, cut_err, not, peek, preceded, repeat, terminated},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{any, literal, none_of, one_of, take_while},
};

use scena_core::{
    diagnostic::{Diagnostic, DiagnosticKind},
    document::{AttrValue, Child, Document, Node},
    identifier::Id,
    span::{Span, line_col},
};

use crate::{error::ParseError, expression};

/// Rich diagnostic information for parser errors.
///
/// Attached to winnow errors via `.context()` to provide detailed error
/// messages with help text and precise span information. The error span
/// covers from `start` to the error position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParserContext {
    pub message: &'static str,
    pub help: Option<&'static str>,
    pub start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<ParserContext>>;

/// Convert a winnow top-level parse failure into a [`ParseError`].
pub(crate) fn into_parse_error(
    err: winnow::error::ParseError<Input<'_>, ContextError<ParserContext>>,
    source: &str,
) -> ParseError {
    let offset = err.offset();
    let context = err.into_inner().context().next().cloned();
    let (message, help, start) = match context {
        Some(ctx) => (ctx.message, ctx.help, ctx.start.min(offset)),
        // The only uncontexted failure is leftover input after the root
        // element was consumed.
        None => (
            "unexpected content after the root element",
            Some("a composition document contains exactly one root element"),
            offset,
        ),
    };
    let (line, column) = line_col(source, start);
    let mut diag = Diagnostic::critical(DiagnosticKind::SyntaxError, message)
        .with_span(Span::new(start..offset.max(start)))
        .at(line, column);
    if let Some(help) = help {
        diag = diag.with_help(help);
    }
    ParseError::from(diag)
}

/// Build a committed error with diagnostic context at the current position.
fn cut_with(
    input: &mut Input<'_>,
    message: &'static str,
    help: Option<&'static str>,
    start: usize,
) -> ErrMode<ContextError<ParserContext>> {
    ErrMode::Cut(ContextError::new().add_context(
        input,
        &input.checkpoint(),
        ParserContext {
            message,
            help,
            start,
        },
    ))
}

/// Parse zero or more whitespace characters.
fn ws(input: &mut Input<'_>) -> IResult<()> {
    multispace0.void().parse_next(input)
}

/// Parse a tag, attribute, or object-key name.
///
/// Names start with a letter or underscore and continue with letters,
/// digits, underscores, and dashes (`particle-field`).
fn ident(input: &mut Input<'_>) -> IResult<String> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    })
    .verify(|s: &str| {
        s.chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    })
    .map(|s: &str| s.to_string())
    .parse_next(input)
}

/// Parse a standard escape character in a string after the backslash.
fn escape_char(input: &mut Input<'_>) -> IResult<char> {
    one_of(['n', 'r', 't', '\\', '/', '\'', '"', '0'])
        .map(|c| match c {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            other => other,
        })
        .parse_next(input)
}

/// Parse a complete string literal with double quotes.
fn string_literal(input: &mut Input<'_>) -> IResult<String> {
    let start = input.current_token_start();

    '"'.parse_next(input)?;

    let content = repeat(
        0..,
        alt((
            preceded('\\', escape_char),
            none_of(['"', '\\', '\n', '\r']),
        )),
    )
    .fold(String::new, |mut acc, ch| {
        acc.push(ch);
        acc
    });

    // Commit after the opening quote so a missing closer reports from it.
    cut_err(terminated(content, '"'))
        .context(ParserContext {
            message: "unterminated string literal",
            help: Some("add closing `\"`"),
            start,
        })
        .parse_next(input)
}

/// Capture raw expression text up to an enclosing delimiter.
///
/// Consumes until a `}` at nesting depth zero (left unconsumed for the
/// caller), or a top-level `,` when `stop_on_comma` is set. Nested
/// braces, brackets, parens, and string literals are honored.
fn balanced_text(input: &mut Input<'_>, stop_on_comma: bool) -> IResult<String> {
    let start = input.current_token_start();
    let mut depth = 0usize;
    let mut out = String::new();
    loop {
        let checkpoint = input.checkpoint();
        let next: IResult<char> = any.parse_next(input);
        let c = match next {
            Ok(c) => c,
            Err(ErrMode::Backtrack(_)) => {
                return Err(cut_with(
                    input,
                    "unbalanced expression container",
                    Some("add closing `}`"),
                    start,
                ));
            }
            Err(e) => return Err(e),
        };
        match c {
            '{' | '[' | '(' => {
                depth += 1;
                out.push(c);
            }
            ']' | ')' => {
                depth = depth.saturating_sub(1);
                out.push(c);
            }
            '}' => {
                if depth == 0 {
                    input.reset(&checkpoint);
                    return Ok(out);
                }
                depth -= 1;
                out.push(c);
            }
            ',' if stop_on_comma && depth == 0 => {
                input.reset(&checkpoint);
                return Ok(out);
            }
            '"' => {
                out.push('"');
                loop {
                    let sc: IResult<char> = any.parse_next(input);
                    match sc {
                        Ok('\\') => {
                            out.push('\\');
                            let esc: IResult<char> = any.parse_next(input);
                            match esc {
                                Ok(e) => out.push(e),
                                Err(_) => {
                                    return Err(cut_with(
                                        input,
                                        "unterminated string literal",
                                        Some("add closing `\"`"),
                                        start,
                                    ));
                                }
                            }
                        }
                        Ok('"') => {
                            out.push('"');
                            break;
                        }
                        Ok(other) => out.push(other),
                        Err(_) => {
                            return Err(cut_with(
                                input,
                                "unterminated string literal",
                                Some("add closing `\"`"),
                                start,
                            ));
                        }
                    }
                }
            }
            other => out.push(other),
        }
    }
}

/// Classify captured braced text into its attribute value variant.
///
/// The literal type is decided once, here: booleans, numbers, everything
/// else an analyzed expression container.
fn classify_braced(text: &str) -> AttrValue {
    let t = text.trim();
    if t == "true" {
        return AttrValue::Bool(true);
    }
    if t == "false" {
        return AttrValue::Bool(false);
    }
    if let Some(n) = expression::parse_numeric(t) {
        return AttrValue::Number(n);
    }
    AttrValue::Expression(expression::analyze_expression(t))
}

/// Parse an object literal: `{key: value, ...}` with normalized keys.
fn object_literal(input: &mut Input<'_>) -> IResult<IndexMap<Id, AttrValue>> {
    let start = input.current_token_start();
    '{'.parse_next(input)?;
    let mut map = IndexMap::new();
    ws.parse_next(input)?;

    let empty: IResult<char> = '}'.parse_next(input);
    match empty {
        Ok(_) => return Ok(map),
        Err(ErrMode::Backtrack(_)) => {}
        Err(e) => return Err(e),
    }

    loop {
        ws.parse_next(input)?;
        let key_start = input.current_token_start();
        let key = cut_err(ident)
            .context(ParserContext {
                message: "expected object key",
                help: None,
                start: key_start,
            })
            .parse_next(input)?;
        ws.parse_next(input)?;
        cut_err(':')
            .context(ParserContext {
                message: "expected `:` after object key",
                help: None,
                start: key_start,
            })
            .parse_next(input)?;
        ws.parse_next(input)?;
        let value = object_value(input)?;
        map.insert(Id::normalized(&key), value);
        ws.parse_next(input)?;

        let comma: IResult<char> = ','.parse_next(input);
        match comma {
            Ok(_) => {
                ws.parse_next(input)?;
                // Tolerate a trailing comma.
                let done: IResult<char> = '}'.parse_next(input);
                match done {
                    Ok(_) => return Ok(map),
                    Err(ErrMode::Backtrack(_)) => continue,
                    Err(e) => return Err(e),
                }
            }
            Err(ErrMode::Backtrack(_)) => {}
            Err(e) => return Err(e),
        }

        cut_err('}')
            .context(ParserContext {
                message: "expected `,` or `}` in object literal",
                help: None,
                start,
            })
            .parse_next(input)?;
        return Ok(map);
    }
}

/// Parse one object-literal value: string, nested object, or expression
/// text up to the next top-level `,` or `}`.
fn object_value(input: &mut Input<'_>) -> IResult<AttrValue> {
    let checkpoint = input.checkpoint();
    match string_literal(input) {
        Ok(s) => return Ok(AttrValue::Str(s)),
        Err(ErrMode::Backtrack(_)) => input.reset(&checkpoint),
        Err(e) => return Err(e),
    }

    let nested: IResult<char> = peek('{').parse_next(input);
    match nested {
        Ok(_) => return object_literal(input).map(AttrValue::Object),
        Err(ErrMode::Backtrack(_)) => {}
        Err(e) => return Err(e),
    }

    let text = balanced_text(input, true)?;
    Ok(classify_braced(&text))
}

/// Parse a braced attribute value: `{number}`, `{true}`, `{{object}}`, or
/// `{expression}`.
fn braced_value(input: &mut Input<'_>) -> IResult<AttrValue> {
    let start = input.current_token_start();
    '{'.parse_next(input)?;
    ws.parse_next(input)?;

    let object_ahead: IResult<char> = peek('{').parse_next(input);
    match object_ahead {
        Ok(_) => {
            let map = object_literal(input)?;
            ws.parse_next(input)?;
            cut_err('}')
                .context(ParserContext {
                    message: "expected `}` after object literal",
                    help: None,
                    start,
                })
                .parse_next(input)?;
            Ok(AttrValue::Object(map))
        }
        Err(ErrMode::Backtrack(_)) => {
            let text = balanced_text(input, false)?;
            cut_err('}')
                .context(ParserContext {
                    message: "unbalanced expression container",
                    help: Some("add closing `}`"),
                    start,
                })
                .parse_next(input)?;
            Ok(classify_braced(&text))
        }
        Err(e) => Err(e),
    }
}

/// Parse a single attribute: `name="str"`, `name={...}`, or a valueless
/// flag (boolean `true`).
fn attribute(input: &mut Input<'_>) -> IResult<(Id, AttrValue)> {
    let start = input.current_token_start();
    let name = ident.parse_next(input)?;

    let checkpoint = input.checkpoint();
    ws.parse_next(input)?;
    let eq: IResult<char> = '='.parse_next(input);
    match eq {
        Ok(_) => {
            ws.parse_next(input)?;
            let value = cut_err(alt((string_literal.map(AttrValue::Str), braced_value)))
                .context(ParserContext {
                    message: "expected attribute value",
                    help: Some("use \"text\", {number}, {expression}, or {{key: value}}"),
                    start,
                })
                .parse_next(input)?;
            Ok((Id::new(&name), value))
        }
        Err(ErrMode::Backtrack(_)) => {
            input.reset(&checkpoint);
            Ok((Id::new(&name), AttrValue::Bool(true)))
        }
        Err(e) => Err(e),
    }
}

/// Parse an inline container child: `{expression}` or `{let name = expr}`.
fn container(input: &mut Input<'_>) -> IResult<Child> {
    let start = input.current_token_start();
    '{'.parse_next(input)?;
    let text = balanced_text(input, false)?;
    cut_err('}')
        .context(ParserContext {
            message: "unbalanced expression container",
            help: Some("add closing `}`"),
            start,
        })
        .parse_next(input)?;

    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("let") {
        if rest.starts_with(|c: char| c.is_whitespace()) {
            let rest = rest.trim_start();
            let Some(eq) = rest.find('=') else {
                return Err(cut_with(
                    input,
                    "malformed declaration",
                    Some("declarations take the form `{let name = expression}`"),
                    start,
                ));
            };
            let name = rest[..eq].trim();
            let value = rest[eq + 1..].trim();
            if !expression::is_ident(name) || value.is_empty() {
                return Err(cut_with(
                    input,
                    "malformed declaration",
                    Some("declarations take the form `{let name = expression}`"),
                    start,
                ));
            }
            return Ok(Child::Declaration {
                name: Id::new(name),
                value: expression::analyze_expression(value),
            });
        }
    }
    Ok(Child::Expression(expression::analyze_expression(trimmed)))
}

/// Parse children into `node` until a closing tag or end of input.
fn children_into(input: &mut Input<'_>, node: &mut Node) -> IResult<()> {
    loop {
        let closing: IResult<&str> = peek(literal("</")).parse_next(input);
        match closing {
            Ok(_) => break,
            Err(ErrMode::Backtrack(_)) => {}
            Err(e) => return Err(e),
        }
        if input.eof_offset() == 0 {
            // The enclosing element reports the missing closing tag.
            break;
        }

        let checkpoint = input.checkpoint();
        match element(input) {
            Ok(child) => {
                node.push_child(Child::Element(child));
                continue;
            }
            Err(ErrMode::Backtrack(_)) => input.reset(&checkpoint),
            Err(e) => return Err(e),
        }
        match container(input) {
            Ok(child) => {
                node.push_child(child);
                continue;
            }
            Err(ErrMode::Backtrack(_)) => input.reset(&checkpoint),
            Err(e) => return Err(e),
        }

        let start = input.current_token_start();
        let text: IResult<&str> =
            winnow::token::take_till(1.., ['<', '{']).parse_next(input);
        match text {
            Ok(run) => {
                let trimmed = run.trim();
                if !trimmed.is_empty() {
                    node.push_child(Child::Text(trimmed.to_string()));
                }
            }
            Err(ErrMode::Backtrack(_)) => {
                return Err(cut_with(input, "unexpected character", None, start));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Parse one element: `<tag attrs.../>` or `<tag attrs...>children</tag>`.
fn element(input: &mut Input<'_>) -> IResult<Node> {
    let start = input.current_token_start();
    ('<', peek(not('/'))).parse_next(input)?;

    // Committed: everything past `<` cuts on failure.
    let tag = cut_err(ident)
        .context(ParserContext {
            message: "expected element tag name",
            help: None,
            start,
        })
        .parse_next(input)?;
    let mut node = Node::new(Id::new(&tag));

    loop {
        ws.parse_next(input)?;
        let checkpoint = input.checkpoint();
        match attribute(input) {
            Ok((name, value)) => {
                node.set_attribute(name, value);
            }
            Err(ErrMode::Backtrack(_)) => {
                input.reset(&checkpoint);
                break;
            }
            Err(e) => return Err(e),
        }
    }
    ws.parse_next(input)?;

    let self_close: IResult<&str> = literal("/>").parse_next(input);
    match self_close {
        Ok(_) => return Ok(node),
        Err(ErrMode::Backtrack(_)) => {}
        Err(e) => return Err(e),
    }

    cut_err('>')
        .context(ParserContext {
            message: "expected `>` or `/>` to close the element tag",
            help: None,
            start,
        })
        .parse_next(input)?;

    children_into(input, &mut node)?;

    cut_err(literal("</"))
        .context(ParserContext {
            message: "missing closing tag",
            help: Some("close the element with `</tag>`"),
            start,
        })
        .parse_next(input)?;
    ws.parse_next(input)?;
    let close_start = input.current_token_start();
    let closing = cut_err(ident)
        .context(ParserContext {
            message: "expected closing tag name",
            help: None,
            start: close_start,
        })
        .parse_next(input)?;
    if closing != tag {
        return Err(cut_with(
            input,
            "mismatched closing tag",
            Some("the closing tag must match the opening tag"),
            close_start,
        ));
    }
    ws.parse_next(input)?;
    cut_err('>')
        .context(ParserContext {
            message: "expected `>` after closing tag name",
            help: None,
            start: close_start,
        })
        .parse_next(input)?;
    Ok(node)
}

/// Parse a whole document: exactly one root element.
pub(crate) fn document(input: &mut Input<'_>) -> IResult<Document> {
    ws.parse_next(input)?;
    let start = input.current_token_start();
    let root = match element(input) {
        Ok(node) => node,
        Err(ErrMode::Backtrack(_)) => {
            return Err(cut_with(
                input,
                "expected a single root element",
                Some("a composition document starts with `<tag ...>`"),
                start,
            ));
        }
        Err(e) => return Err(e),
    };
    ws.parse_next(input)?;
    Ok(Document::new(root))
}
