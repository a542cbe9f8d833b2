//! Layer 3: permissive static typing over expression containers.
//!
//! A small structural type checker with an implicit-any configuration:
//! unknown identifiers and unknown calls type as `Any` and unify with
//! everything. Only structurally certain problems are reported —
//! unparseable expressions and operations whose operand types are both
//! concrete and incompatible rate high severity; softer oddities are
//! advisories.

use scena_core::{
    diagnostic::{Diagnostic, DiagnosticKind},
    document::Document,
};

pub(crate) fn check(doc: &Document) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    doc.for_each_expression(&mut |expr| {
        let text = expr.text().trim();
        if !text.is_empty() {
            diagnostics.extend(check_expression(text));
        }
    });
    diagnostics
}

/// Type-check one expression's text.
pub(crate) fn check_expression(text: &str) -> Vec<Diagnostic> {
    let tokens = match tokenize(text) {
        Ok(tokens) => tokens,
        Err(message) => {
            return vec![Diagnostic::high(
                DiagnosticKind::TypeSyntax,
                format!("{message} in `{text}`"),
            )];
        }
    };
    let mut checker = Checker {
        tokens,
        pos: 0,
        diagnostics: Vec::new(),
    };
    let _ = checker.expression();
    if checker.pos < checker.tokens.len() && checker.diagnostics.is_empty() {
        checker.diagnostics.push(Diagnostic::high(
            DiagnosticKind::TypeSyntax,
            format!("could not parse expression `{text}`"),
        ));
    }
    checker.diagnostics
}

/// The permissive type lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ty {
    Num,
    Str,
    Bool,
    List,
    Obj,
    Fn,
    Null,
    Any,
}

impl Ty {
    fn is_numeric_like(self) -> bool {
        matches!(self, Ty::Num | Ty::Any | Ty::Null)
    }

    fn name(self) -> &'static str {
        match self {
            Ty::Num => "number",
            Ty::Str => "string",
            Ty::Bool => "boolean",
            Ty::List => "list",
            Ty::Obj => "object",
            Ty::Fn => "function",
            Ty::Null => "null",
            Ty::Any => "any",
        }
    }
}

/// Known builtin signatures: (name, min arity, max arity, argument type).
///
/// `None` for the argument type means any argument is accepted.
const SIGNATURES: [(&str, usize, usize, Option<Ty>); 16] = [
    ("clock", 0, 0, None),
    ("sin", 1, 1, Some(Ty::Num)),
    ("cos", 1, 1, Some(Ty::Num)),
    ("abs", 1, 1, Some(Ty::Num)),
    ("floor", 1, 1, Some(Ty::Num)),
    ("round", 1, 1, Some(Ty::Num)),
    ("sqrt", 1, 1, Some(Ty::Num)),
    ("min", 2, usize::MAX, Some(Ty::Num)),
    ("max", 2, usize::MAX, Some(Ty::Num)),
    ("hsl", 3, 3, Some(Ty::Num)),
    ("interpolate", 3, 4, None),
    ("range", 1, 2, Some(Ty::Num)),
    ("push", 2, 2, None),
    ("concat", 2, usize::MAX, None),
    ("len", 1, 1, None),
    ("map", 2, 2, None),
];

fn return_type(name: &str) -> Ty {
    match name {
        "clock" | "sin" | "cos" | "abs" | "floor" | "round" | "sqrt" | "min" | "max"
        | "interpolate" | "len" => Ty::Num,
        "hsl" => Ty::Str,
        "range" | "push" | "concat" | "map" => Ty::List,
        _ => Ty::Any,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num,
    Str,
    Bool,
    Null,
    Ident(String),
    Punct(char),
    Op(&'static str),
    Arrow,
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '"' {
            i += 1;
            loop {
                match chars.get(i) {
                    Some('\\') => i += 2,
                    Some('"') => {
                        i += 1;
                        break;
                    }
                    Some(_) => i += 1,
                    None => return Err("unterminated string literal".to_string()),
                }
            }
            tokens.push(Token::Str);
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()))
        {
            while i < chars.len()
                && (chars[i].is_ascii_digit() || matches!(chars[i], '.' | 'e' | 'E'))
            {
                i += 1;
            }
            tokens.push(Token::Num);
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(match word.as_str() {
                "true" | "false" => Token::Bool,
                "null" | "undefined" => Token::Null,
                _ => Token::Ident(word),
            });
        } else if c == '=' && chars.get(i + 1) == Some(&'>') {
            tokens.push(Token::Arrow);
            i += 2;
        } else {
            let two: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let op2 = ["==", "!=", "<=", ">=", "&&", "||"]
                .iter()
                .find(|op| two.starts_with(**op));
            if let Some(op) = op2 {
                tokens.push(Token::Op(op));
                i += 2;
            } else if "+-*/%<>!?".contains(c) {
                tokens.push(Token::Op(match c {
                    '+' => "+",
                    '-' => "-",
                    '*' => "*",
                    '/' => "/",
                    '%' => "%",
                    '<' => "<",
                    '>' => ">",
                    '!' => "!",
                    _ => "?",
                }));
                i += 1;
            } else if "()[]{},.:".contains(c) {
                tokens.push(Token::Punct(c));
                i += 1;
            } else {
                return Err(format!("unexpected character `{c}`"));
            }
        }
    }
    Ok(tokens)
}

struct Checker {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Checker {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn syntax_error(&mut self, what: &str) -> Ty {
        if self.diagnostics.is_empty() {
            self.diagnostics.push(Diagnostic::high(
                DiagnosticKind::TypeSyntax,
                format!("expected {what} in expression"),
            ));
        }
        // Skip the offending token to avoid re-reporting.
        self.pos = self.tokens.len();
        Ty::Any
    }

    fn mismatch(&mut self, message: String) {
        self.diagnostics
            .push(Diagnostic::high(DiagnosticKind::TypeMismatch, message));
    }

    fn advisory(&mut self, message: String) {
        self.diagnostics
            .push(Diagnostic::low(DiagnosticKind::TypeAdvisory, message));
    }

    fn expression(&mut self) -> Ty {
        let condition = self.or_expr();
        if matches!(self.peek(), Some(Token::Op("?"))) {
            self.pos += 1;
            let then_ty = self.expression();
            if !self.eat_punct(':') {
                return self.syntax_error("`:` in conditional");
            }
            let else_ty = self.expression();
            let _ = condition;
            if then_ty != else_ty && then_ty != Ty::Any && else_ty != Ty::Any {
                self.advisory(format!(
                    "conditional branches have different types ({} vs {})",
                    then_ty.name(),
                    else_ty.name()
                ));
            }
            return if then_ty == else_ty { then_ty } else { Ty::Any };
        }
        condition
    }

    fn or_expr(&mut self) -> Ty {
        let mut ty = self.cmp_expr();
        while matches!(self.peek(), Some(Token::Op("&&")) | Some(Token::Op("||"))) {
            self.pos += 1;
            let _ = self.cmp_expr();
            ty = Ty::Any;
        }
        ty
    }

    fn cmp_expr(&mut self) -> Ty {
        let left = self.add_expr();
        if let Some(Token::Op(op @ ("==" | "!=" | "<" | "<=" | ">" | ">="))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.add_expr();
            if matches!(op, "<" | "<=" | ">" | ">=") {
                for side in [left, right] {
                    if matches!(side, Ty::List | Ty::Obj | Ty::Fn) {
                        self.advisory(format!("ordering comparison on a {}", side.name()));
                    }
                }
            }
            return Ty::Bool;
        }
        left
    }

    fn add_expr(&mut self) -> Ty {
        let mut ty = self.mul_expr();
        while let Some(Token::Op(op @ ("+" | "-"))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.mul_expr();
            ty = if op == "+" && (ty == Ty::Str || rhs == Ty::Str) {
                // String concatenation tolerates mixed operands.
                Ty::Str
            } else if ty.is_numeric_like() && rhs.is_numeric_like() {
                Ty::Num
            } else {
                self.mismatch(format!(
                    "`{op}` applied to {} and {}",
                    ty.name(),
                    rhs.name()
                ));
                Ty::Any
            };
        }
        ty
    }

    fn mul_expr(&mut self) -> Ty {
        let mut ty = self.unary_expr();
        while let Some(Token::Op(op @ ("*" | "/" | "%"))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.unary_expr();
            if ty.is_numeric_like() && rhs.is_numeric_like() {
                ty = Ty::Num;
            } else {
                self.mismatch(format!(
                    "`{op}` applied to {} and {}",
                    ty.name(),
                    rhs.name()
                ));
                ty = Ty::Any;
            }
        }
        ty
    }

    fn unary_expr(&mut self) -> Ty {
        match self.peek() {
            Some(Token::Op("-")) => {
                self.pos += 1;
                let ty = self.unary_expr();
                if !ty.is_numeric_like() {
                    self.mismatch(format!("unary `-` applied to {}", ty.name()));
                }
                Ty::Num
            }
            Some(Token::Op("!")) => {
                self.pos += 1;
                let _ = self.unary_expr();
                Ty::Bool
            }
            _ => self.postfix_expr(),
        }
    }

    fn postfix_expr(&mut self) -> Ty {
        let (mut ty, mut callee) = self.primary();
        loop {
            match self.peek() {
                Some(Token::Punct('(')) => {
                    self.pos += 1;
                    let args = self.call_args();
                    ty = self.check_call(callee.take(), ty, &args);
                }
                Some(Token::Punct('.')) => {
                    self.pos += 1;
                    match self.bump() {
                        Some(Token::Ident(_)) => {
                            ty = Ty::Any;
                            callee = None;
                        }
                        _ => return self.syntax_error("property name after `.`"),
                    }
                }
                Some(Token::Punct('[')) => {
                    self.pos += 1;
                    let _index = self.expression();
                    if !self.eat_punct(']') {
                        return self.syntax_error("closing `]`");
                    }
                    if matches!(ty, Ty::Num | Ty::Str | Ty::Bool) {
                        self.mismatch(format!("indexing into a {}", ty.name()));
                    }
                    ty = Ty::Any;
                    callee = None;
                }
                _ => break,
            }
        }
        ty
    }

    fn call_args(&mut self) -> Vec<Ty> {
        let mut args = Vec::new();
        if self.eat_punct(')') {
            return args;
        }
        loop {
            args.push(self.expression());
            if self.eat_punct(',') {
                continue;
            }
            if self.eat_punct(')') {
                return args;
            }
            self.syntax_error("`,` or `)` in call arguments");
            return args;
        }
    }

    fn check_call(&mut self, callee: Option<String>, callee_ty: Ty, args: &[Ty]) -> Ty {
        if matches!(callee_ty, Ty::Num | Ty::Str | Ty::Bool | Ty::List | Ty::Obj) {
            self.mismatch(format!("calling a {}", callee_ty.name()));
            return Ty::Any;
        }
        let Some(name) = callee else {
            return Ty::Any;
        };
        let Some((_, min, max, arg_ty)) = SIGNATURES.iter().find(|(n, ..)| *n == name) else {
            // Unknown function: implicit any.
            return Ty::Any;
        };
        if args.len() < *min || args.len() > *max {
            let expected = if min == max {
                format!("{min}")
            } else if *max == usize::MAX {
                format!("at least {min}")
            } else {
                format!("{min} to {max}")
            };
            self.mismatch(format!(
                "`{name}` expects {expected} argument(s), found {}",
                args.len()
            ));
            return return_type(&name);
        }
        if let Some(expected) = arg_ty {
            for (position, arg) in args.iter().enumerate() {
                if *arg != Ty::Any && arg != expected {
                    self.mismatch(format!(
                        "argument {} of `{name}` is a {}, expected {}",
                        position + 1,
                        arg.name(),
                        expected.name()
                    ));
                }
            }
        }
        return_type(&name)
    }

    fn primary(&mut self) -> (Ty, Option<String>) {
        // Arrow functions: `ident => body` or `(params) => body`.
        if let Some(Token::Ident(_)) = self.peek() {
            if self.tokens.get(self.pos + 1) == Some(&Token::Arrow) {
                self.pos += 2;
                let _ = self.expression();
                return (Ty::Fn, None);
            }
        }
        if self.peek() == Some(&Token::Punct('(')) {
            if let Some(close) = self.find_matching_paren(self.pos) {
                if self.tokens.get(close + 1) == Some(&Token::Arrow) {
                    self.pos = close + 2;
                    let _ = self.expression();
                    return (Ty::Fn, None);
                }
            }
        }

        match self.bump() {
            Some(Token::Num) => (Ty::Num, None),
            Some(Token::Str) => (Ty::Str, None),
            Some(Token::Bool) => (Ty::Bool, None),
            Some(Token::Null) => (Ty::Null, None),
            Some(Token::Ident(name)) => (Ty::Any, Some(name)),
            Some(Token::Punct('(')) => {
                let ty = self.expression();
                if !self.eat_punct(')') {
                    return (self.syntax_error("closing `)`"), None);
                }
                (ty, None)
            }
            Some(Token::Punct('[')) => {
                if self.eat_punct(']') {
                    return (Ty::List, None);
                }
                loop {
                    let _ = self.expression();
                    if self.eat_punct(',') {
                        continue;
                    }
                    if self.eat_punct(']') {
                        return (Ty::List, None);
                    }
                    return (self.syntax_error("`,` or `]` in list literal"), None);
                }
            }
            Some(Token::Punct('{')) => {
                if self.eat_punct('}') {
                    return (Ty::Obj, None);
                }
                loop {
                    match self.bump() {
                        Some(Token::Ident(_)) | Some(Token::Str) => {}
                        _ => return (self.syntax_error("object key"), None),
                    }
                    if !self.eat_punct(':') {
                        return (self.syntax_error("`:` after object key"), None);
                    }
                    let _ = self.expression();
                    if self.eat_punct(',') {
                        continue;
                    }
                    if self.eat_punct('}') {
                        return (Ty::Obj, None);
                    }
                    return (self.syntax_error("`,` or `}` in object literal"), None);
                }
            }
            _ => (self.syntax_error("a value"), None),
        }
    }

    /// Token index of the `)` matching the `(` at `open`.
    fn find_matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (index, token) in self.tokens.iter().enumerate().skip(open) {
            match token {
                Token::Punct('(') => depth += 1,
                Token::Punct(')') => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(index);
                    }
                }
                _ => {}
            }
        }
        None
    }
}
