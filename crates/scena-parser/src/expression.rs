//! Expression analysis: referenced identifiers and call signatures.
//!
//! Expression containers are opaque to the tree model, but two derived
//! facts are needed downstream: the set of identifiers an expression
//! references (reference-completeness validation) and, when the whole
//! expression is a single call, its parsed signature (timing validation
//! and transition rewriting). Both are derived here, once, at
//! construction time.

use scena_core::{
    document::{CallArg, CallSignature, Expression},
    identifier::Id,
};

/// Words that look like identifiers but never count as references.
const KEYWORDS: [&str; 5] = ["let", "true", "false", "null", "undefined"];

/// Analyze expression text into an [`Expression`] with derived facts.
pub fn analyze_expression(text: &str) -> Expression {
    let referenced = referenced_identifiers(text);
    let call = parse_call(text);
    Expression::with_analysis(text, referenced, call)
}

/// Extract the identifiers referenced by expression text, in
/// first-occurrence order.
///
/// String literal contents, object keys, property names after `.`, and
/// arrow-function parameters are not references.
pub fn referenced_identifiers(text: &str) -> Vec<Id> {
    let chars: Vec<char> = text.chars().collect();
    let bound = arrow_parameters(&chars);
    let mut out: Vec<Id> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            i = skip_string(&chars, i);
        } else if c.is_ascii_digit() {
            // Consume the whole literal so a suffix never reads as an
            // identifier.
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                i += 1;
            }
        } else if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let prev = prev_non_ws(&chars, start);
            let next = next_non_ws(&chars, i);

            let is_property = prev == Some('.');
            let is_object_key =
                next == Some(':') && matches!(prev, Some('{') | Some(',') | None);
            if !is_property
                && !is_object_key
                && !KEYWORDS.contains(&word.as_str())
                && !bound.contains(&word)
                && !seen.contains(&word)
            {
                seen.push(word.clone());
                out.push(Id::new(&word));
            }
        } else {
            i += 1;
        }
    }
    out
}

/// Parse the whole expression as a single call, when it is one.
///
/// Recognizes `name(args...)` and dotted callees such as
/// `particles.push({...})`. Arguments are classified as numbers, numeric
/// lists, object literals, or kept verbatim.
pub fn parse_call(text: &str) -> Option<CallSignature> {
    let text = text.trim();
    let open = text.find('(')?;
    let name = &text[..open];
    if name.is_empty() || !name.split('.').all(is_ident) {
        return None;
    }
    if !text.ends_with(')') {
        return None;
    }
    // The opening paren must match the final closing paren, otherwise this
    // is a larger expression like `a(1) + b(2)`.
    let chars: Vec<char> = text.chars().collect();
    if matching_close(&chars, text_char_index(text, open)?)? != chars.len() - 1 {
        return None;
    }
    let inner = &text[open + 1..text.len() - 1];
    let args = split_top_level(inner)
        .into_iter()
        .map(|raw| parse_arg(&raw))
        .collect();
    Some(CallSignature::new(name, args))
}

fn parse_arg(raw: &str) -> CallArg {
    let t = raw.trim();
    if let Some(n) = parse_numeric(t) {
        return CallArg::Number(n);
    }
    if t.starts_with('[') && t.ends_with(']') {
        let elements = split_top_level(&t[1..t.len() - 1]);
        let numbers: Option<Vec<f64>> = elements
            .iter()
            .map(|e| parse_numeric(e.trim()))
            .collect();
        if let Some(values) = numbers {
            if !values.is_empty() {
                return CallArg::NumberList(values);
            }
        }
        return CallArg::Raw(t.to_string());
    }
    if t.starts_with('{') && t.ends_with('}') {
        let mut pairs = Vec::new();
        for entry in split_top_level(&t[1..t.len() - 1]) {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match top_level_colon(entry) {
                Some(colon) => {
                    let key = entry[..colon].trim();
                    let value = entry[colon + 1..].trim();
                    if !is_ident(key) {
                        return CallArg::Raw(t.to_string());
                    }
                    pairs.push((Id::new(key), value.to_string()));
                }
                None => return CallArg::Raw(t.to_string()),
            }
        }
        return CallArg::Object(pairs);
    }
    CallArg::Raw(t.to_string())
}

/// Parse a bare numeric literal, rejecting words like `inf` that `f64`
/// would otherwise accept.
pub(crate) fn parse_numeric(t: &str) -> Option<f64> {
    if t.is_empty() {
        return None;
    }
    let valid = t
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    let starts_ok = t
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
    if valid && starts_ok {
        t.parse::<f64>().ok()
    } else {
        None
    }
}

/// Split at top-level commas, honoring nesting and string literals.
fn split_top_level(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = skip_string(&chars, i);
                for ch in &chars[i..end] {
                    current.push(*ch);
                }
                i = end;
                continue;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                i += 1;
                continue;
            }
            _ => {}
        }
        current.push(c);
        i += 1;
    }
    let last = current.trim().to_string();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// Find the first `:` at nesting depth zero, skipping string literals.
fn top_level_colon(text: &str) -> Option<usize> {
    let chars: Vec<char> = text.chars().collect();
    let mut depth = 0usize;
    let mut i = 0;
    let mut byte = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = skip_string(&chars, i);
                byte += chars[i..end].iter().map(|ch| ch.len_utf8()).sum::<usize>();
                i = end;
                continue;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return Some(byte),
            _ => {}
        }
        byte += c.len_utf8();
        i += 1;
    }
    None
}

/// Collect parameter names bound by arrow functions in the text.
fn arrow_parameters(chars: &[char]) -> Vec<String> {
    let mut bound = Vec::new();
    let mut i = 0;
    while i + 1 < chars.len() {
        if chars[i] == '=' && chars[i + 1] == '>' {
            let mut j = i;
            while j > 0 && chars[j - 1].is_whitespace() {
                j -= 1;
            }
            if j > 0 && chars[j - 1] == ')' {
                // (a, b) => ...
                let close = j - 1;
                let mut depth = 1;
                let mut open = close;
                while open > 0 && depth > 0 {
                    open -= 1;
                    match chars[open] {
                        ')' => depth += 1,
                        '(' => depth -= 1,
                        _ => {}
                    }
                }
                let inside: String = chars[open + 1..close].iter().collect();
                for name in inside.split(',') {
                    let name = name.trim();
                    if is_ident(name) {
                        bound.push(name.to_string());
                    }
                }
            } else if j > 0 && is_ident_continue(chars[j - 1]) {
                // i => ...
                let end = j;
                let mut start = j;
                while start > 0 && is_ident_continue(chars[start - 1]) {
                    start -= 1;
                }
                let name: String = chars[start..end].iter().collect();
                if is_ident(&name) {
                    bound.push(name);
                }
            }
        }
        i += 1;
    }
    bound
}

/// Index of the closing delimiter matching the opener at `open`.
fn matching_close(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '"' => {
                i = skip_string(chars, i);
                continue;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Map a byte index into `text` to a char index.
fn text_char_index(text: &str, byte: usize) -> Option<usize> {
    text.char_indices().position(|(b, _)| b == byte)
}

/// Skip past a string literal starting at `start` (a `"`), returning the
/// index just after the closing quote (or the end of input).
fn skip_string(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    i
}

/// The closest non-whitespace char strictly before `index`.
fn prev_non_ws(chars: &[char], index: usize) -> Option<char> {
    chars[..index].iter().rev().find(|c| !c.is_whitespace()).copied()
}

/// The closest non-whitespace char at or after `index`.
fn next_non_ws(chars: &[char], index: usize) -> Option<char> {
    chars[index..].iter().find(|c| !c.is_whitespace()).copied()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub(crate) fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(is_ident_start)
        && s.chars().all(is_ident_continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        referenced_identifiers(text)
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }

    #[test]
    fn test_referenced_identifiers_basic() {
        assert_eq!(names("clock() + offset"), vec!["clock", "offset"]);
        assert_eq!(names("interpolate(clock(), frames, outs)"), vec![
            "interpolate",
            "clock",
            "frames",
            "outs"
        ]);
    }

    #[test]
    fn test_referenced_identifiers_dedupe() {
        assert_eq!(names("clock() * clock()"), vec!["clock"]);
    }

    #[test]
    fn test_object_keys_are_not_references() {
        assert_eq!(names("{ x: dx, color: tint }"), vec!["dx", "tint"]);
    }

    #[test]
    fn test_property_access_is_not_a_reference() {
        assert_eq!(names("particles.push(item)"), vec!["particles", "item"]);
    }

    #[test]
    fn test_string_contents_ignored() {
        assert_eq!(names("hsl(\"hue value\", sat, 60)"), vec!["hsl", "sat"]);
    }

    #[test]
    fn test_arrow_parameters_are_bound() {
        assert_eq!(names("range(12, (i) => i * gap)"), vec!["range", "gap"]);
        assert_eq!(names("items.map(v => v + base)"), vec!["items", "base"]);
    }

    #[test]
    fn test_keywords_and_numbers_ignored() {
        assert_eq!(names("true || 42 && null"), Vec::<String>::new());
        assert_eq!(names("let total = 1e3"), vec!["total"]);
    }

    #[test]
    fn test_parse_call_simple() {
        let call = parse_call("interpolate(clock(), [0, 30], [0, 1])").unwrap();
        assert_eq!(call.name(), "interpolate");
        assert_eq!(call.args().len(), 3);
        assert_eq!(call.args()[0], CallArg::Raw("clock()".to_string()));
        assert_eq!(call.args()[1], CallArg::NumberList(vec![0.0, 30.0]));
        assert_eq!(call.args()[2], CallArg::NumberList(vec![0.0, 1.0]));
    }

    #[test]
    fn test_parse_call_dotted_with_object() {
        let call = parse_call("particles.push({ x: 12, color: \"red\" })").unwrap();
        assert_eq!(call.name(), "particles.push");
        assert_eq!(call.base_name(), "push");
        match &call.args()[0] {
            CallArg::Object(pairs) => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[0].0, "x");
                assert_eq!(pairs[0].1, "12");
                assert_eq!(pairs[1].1, "\"red\"");
            }
            other => panic!("expected object argument, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_call_rejects_compound_expressions() {
        assert!(parse_call("a(1) + b(2)").is_none());
        assert!(parse_call("40 * sin(clock())").is_none());
        assert!(parse_call("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_parse_call_nested_args_stay_raw() {
        let call = parse_call("min(max(a, 1), floor(b))").unwrap();
        assert_eq!(call.args()[0], CallArg::Raw("max(a, 1)".to_string()));
        assert_eq!(call.args()[1], CallArg::Raw("floor(b)".to_string()));
    }

    #[test]
    fn test_analyze_expression_combines_facts() {
        let expr = analyze_expression("interpolate(clock(), [90, 120], [1, 0])");
        assert!(expr.call().is_some());
        assert_eq!(expr.referenced().len(), 2);
        assert_eq!(expr.text(), "interpolate(clock(), [90, 120], [1, 0])");
    }
}
