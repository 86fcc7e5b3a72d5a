//! Template expressions
//!
//! ```text
//! pipe    := sum ( "|" ident )*
//! sum     := unary ( "+" unary )*
//! unary   := "!" unary | primary
//! primary := number | string | "true" | "false" | "null" | path | "(" pipe ")"
//! path    := ident ( "." ( ident | digits ) )*
//! ```

use serde_json::{Number, Value};
use vireo_core::{display_value, RenderScope};

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Dotted state path, e.g. `user.name`
    Path(String),
    Not(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Filter(Box<Expr>, String),
}

impl Expr {
    /// Whether evaluation touches instance state
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Literal(_) => true,
            Expr::Path(_) | Expr::Filter(..) => false,
            Expr::Not(inner) => inner.is_constant(),
            Expr::Add(a, b) => a.is_constant() && b.is_constant(),
        }
    }

    pub fn eval(&self, scope: &mut RenderScope<'_>) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Path(path) => scope.path(path),
            Expr::Not(inner) => Value::Bool(!truthy(&inner.eval(scope))),
            Expr::Add(a, b) => {
                let a = a.eval(scope);
                let b = b.eval(scope);
                add(&a, &b)
            }
            Expr::Filter(inner, name) => {
                let value = inner.eval(scope);
                scope.filter(name, &value)
            }
        }
    }
}

/// Truthiness used by `v-if`, `v-show` and `!`
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numbers add, anything else concatenates
fn add(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                if let Some(sum) = x.checked_add(y) {
                    return Value::Number(sum.into());
                }
            }
            let sum = x.as_f64().unwrap_or(0.0) + y.as_f64().unwrap_or(0.0);
            Number::from_f64(sum).map(Value::Number).unwrap_or(Value::Null)
        }
        _ => Value::String(display_value(a) + &display_value(b)),
    }
}

pub fn parse(source: &str) -> Result<Expr, String> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = ExprParser { tokens, pos: 0 };
    let expr = parser.pipe()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected `{}` in expression `{}`", token, source.trim())),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Number(Value),
    Str(String),
    Plus,
    Pipe,
    Bang,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(name) => f.write_str(name),
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Plus => f.write_str("+"),
            Token::Pipe => f.write_str("|"),
            Token::Bang => f.write_str("!"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '|' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '|'))) {
                    return Err(format!("`||` is not supported in expression `{}`", source.trim()));
                }
                tokens.push(Token::Pipe);
            }
            '!' => {
                chars.next();
                tokens.push(Token::Bang);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '\'' | '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                for (_, ch) in chars.by_ref() {
                    if ch == c {
                        closed = true;
                        break;
                    }
                    text.push(ch);
                }
                if !closed {
                    return Err(format!("unterminated string in expression `{}`", source.trim()));
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' {
                        end = i + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &source[start..end];
                let value = match text.parse::<i64>() {
                    Ok(n) => Value::Number(n.into()),
                    Err(_) => text
                        .parse::<f64>()
                        .ok()
                        .and_then(Number::from_f64)
                        .map(Value::Number)
                        .ok_or_else(|| format!("invalid number `{}`", text))?,
                };
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '.' {
                        end = i + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let path = &source[start..end];
                if path.ends_with('.') || path.contains("..") {
                    return Err(format!("invalid property path `{}`", path));
                }
                tokens.push(Token::Ident(path.to_string()));
            }
            other => return Err(format!("unexpected character `{}` in expression `{}`", other, source.trim())),
        }
    }
    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.tokens.get(self.pos) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn pipe(&mut self) -> Result<Expr, String> {
        let mut expr = self.sum()?;
        while self.eat(&Token::Pipe) {
            match self.next() {
                Some(Token::Ident(name)) if !name.contains('.') => {
                    expr = Expr::Filter(Box::new(expr), name);
                }
                Some(token) => return Err(format!("expected filter name after `|`, found `{}`", token)),
                None => return Err("expected filter name after `|`".to_string()),
            }
        }
        Ok(expr)
    }

    fn sum(&mut self) -> Result<Expr, String> {
        let mut expr = self.unary()?;
        while self.eat(&Token::Plus) {
            let rhs = self.unary()?;
            expr = Expr::Add(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Literal(n)),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" => Expr::Literal(Value::Null),
                _ => Expr::Path(name),
            }),
            Some(Token::LParen) => {
                let inner = self.pipe()?;
                if !self.eat(&Token::RParen) {
                    return Err("missing `)`".to_string());
                }
                Ok(inner)
            }
            Some(token) => Err(format!("unexpected `{}`", token)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}
