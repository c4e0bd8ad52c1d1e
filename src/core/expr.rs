//! Typed update-rule expressions
//!
//! A formula such as `k * x + offset` describes how every y-value of a curve
//! is recomputed from its abscissa `x` and the current slider values. The same
//! parsed expression is evaluated natively by the headless runtime and
//! compiled to JavaScript for rendered pages, so both sides agree on the
//! physics.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Identifier bound to the abscissa of the sample being computed
pub const SAMPLE_IDENT: &str = "x";

/// Parse error with the offending span in the formula text
#[derive(Debug, Error, Diagnostic)]
#[error("Invalid formula: {message}")]
#[diagnostic(code(heatlab::expr::syntax))]
pub struct ExprError {
    #[source_code]
    src: NamedSource<String>,

    #[label("{}", self.hint)]
    span: SourceSpan,

    message: String,
    hint: String,

    #[help]
    help: Option<String>,
}

impl ExprError {
    fn new(source: &str, offset: usize, len: usize, message: impl Into<String>, hint: &str) -> Self {
        Self {
            src: NamedSource::new("formula", source.to_string()),
            span: SourceSpan::from(offset..offset + len.max(1)),
            message: message.into(),
            hint: hint.to_string(),
            help: None,
        }
    }

    fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Short description of the problem (without source context)
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
        }
    }
}

/// Comparison operators, evaluating to 1.0 or 0.0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    If,
    Sqrt,
    Abs,
    Min,
    Max,
    Exp,
    Ln,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "if" => Some(Func::If),
            "sqrt" => Some(Func::Sqrt),
            "abs" => Some(Func::Abs),
            "min" => Some(Func::Min),
            "max" => Some(Func::Max),
            "exp" => Some(Func::Exp),
            "ln" => Some(Func::Ln),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Func::If => "if",
            Func::Sqrt => "sqrt",
            Func::Abs => "abs",
            Func::Min => "min",
            Func::Max => "max",
            Func::Exp => "exp",
            Func::Ln => "ln",
        }
    }

    fn arity(self) -> usize {
        match self {
            Func::If => 3,
            Func::Min | Func::Max => 2,
            Func::Sqrt | Func::Abs | Func::Exp | Func::Ln => 1,
        }
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    /// The abscissa `x` of the sample being computed
    Sample,
    /// A slider value, by identifier
    Param(String),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Func,
        args: Vec<Expr>,
    },
}

/// Source of parameter values during native evaluation
pub trait ParamLookup {
    fn param(&self, name: &str) -> Option<f64>;
}

impl ParamLookup for std::collections::HashMap<String, f64> {
    fn param(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl ParamLookup for std::collections::BTreeMap<String, f64> {
    fn param(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Expr {
    /// Parse a formula
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let expr = parser.comparison()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(ExprError::new(
                source,
                tok.offset,
                tok.len,
                format!("unexpected '{}'", &source[tok.offset..tok.offset + tok.len]),
                "expected end of formula",
            )),
        }
    }

    /// Evaluate at abscissa `x`. Unknown parameters evaluate to NaN.
    pub fn eval(&self, x: f64, params: &impl ParamLookup) -> f64 {
        match self {
            Expr::Num(n) => *n,
            Expr::Sample => x,
            Expr::Param(name) => params.param(name).unwrap_or(f64::NAN),
            Expr::Neg(inner) => -inner.eval(x, params),
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.eval(x, params);
                let b = rhs.eval(x, params);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Pow => a.powf(b),
                }
            }
            Expr::Compare { op, lhs, rhs } => {
                if op.holds(lhs.eval(x, params), rhs.eval(x, params)) {
                    1.0
                } else {
                    0.0
                }
            }
            Expr::Call { func, args } => {
                let arg = |i: usize| args[i].eval(x, params);
                match func {
                    // Only the selected branch is evaluated, as in JavaScript.
                    Func::If => {
                        if arg(0) != 0.0 {
                            arg(1)
                        } else {
                            arg(2)
                        }
                    }
                    Func::Sqrt => arg(0).sqrt(),
                    Func::Abs => arg(0).abs(),
                    Func::Min => arg(0).min(arg(1)),
                    Func::Max => arg(0).max(arg(1)),
                    Func::Exp => arg(0).exp(),
                    Func::Ln => arg(0).ln(),
                }
            }
        }
    }

    /// Parameter identifiers referenced by this expression
    pub fn params(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Num(_) | Expr::Sample => {}
            Expr::Param(name) => {
                out.insert(name.as_str());
            }
            Expr::Neg(inner) => inner.collect_params(out),
            Expr::Binary { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } => {
                lhs.collect_params(out);
                rhs.collect_params(out);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_params(out);
                }
            }
        }
    }

    /// Compile to a JavaScript expression.
    ///
    /// `sample` is the JS expression for the abscissa (e.g. `x[i]`); parameters
    /// are read from their slider objects as `<name>.value`.
    pub fn to_js(&self, sample: &str) -> String {
        match self {
            Expr::Num(n) => js_number(*n),
            Expr::Sample => sample.to_string(),
            Expr::Param(name) => format!("{}.value", name),
            Expr::Neg(inner) => format!("(-{})", inner.to_js(sample)),
            Expr::Binary {
                op: BinOp::Pow,
                lhs,
                rhs,
            } => format!("Math.pow({}, {})", lhs.to_js(sample), rhs.to_js(sample)),
            Expr::Binary { op, lhs, rhs } => format!(
                "({} {} {})",
                lhs.to_js(sample),
                op.symbol(),
                rhs.to_js(sample)
            ),
            Expr::Compare { op, lhs, rhs } => format!(
                "(({} {} {}) ? 1 : 0)",
                lhs.to_js(sample),
                op.symbol(),
                rhs.to_js(sample)
            ),
            Expr::Call { func, args } => {
                let js: Vec<String> = args.iter().map(|a| a.to_js(sample)).collect();
                match func {
                    Func::If => format!("(({}) !== 0 ? {} : {})", js[0], js[1], js[2]),
                    Func::Sqrt => format!("Math.sqrt({})", js[0]),
                    Func::Abs => format!("Math.abs({})", js[0]),
                    Func::Min => format!("Math.min({}, {})", js[0], js[1]),
                    Func::Max => format!("Math.max({}, {})", js[0], js[1]),
                    Func::Exp => format!("Math.exp({})", js[0]),
                    Func::Ln => format!("Math.log({})", js[0]),
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{}", n),
            Expr::Sample => write!(f, "{}", SAMPLE_IDENT),
            Expr::Param(name) => write!(f, "{}", name),
            Expr::Neg(inner) => write!(f, "-({})", inner),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Compare { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Call { func, args } => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn js_number(n: f64) -> String {
    if n.is_finite() {
        // Debug keeps the exponent form for tiny constants like 5.6704e-8
        format!("{:?}", n)
    } else if n.is_nan() {
        "NaN".to_string()
    } else if n > 0.0 {
        "Infinity".to_string()
    } else {
        "(-Infinity)".to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Num(f64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
    len: usize,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit())) {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            // Exponent part: 5.6704e-8
            if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                let mut j = i + 1;
                if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                    j += 1;
                }
                if j < bytes.len() && bytes[j].is_ascii_digit() {
                    i = j;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text = &source[start..i];
            let value: f64 = text.parse().map_err(|_| {
                ExprError::new(source, start, i - start, format!("bad number '{}'", text), "not a number")
            })?;
            tokens.push(Token {
                kind: TokenKind::Num(value),
                offset: start,
                len: i - start,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(source[start..i].to_string()),
                offset: start,
                len: i - start,
            });
            continue;
        }

        let two = source.get(i..i + 2);
        let (kind, len) = match (c, two) {
            (_, Some("<=")) => (TokenKind::Op("<="), 2),
            (_, Some(">=")) => (TokenKind::Op(">="), 2),
            (_, Some("**")) => (TokenKind::Op("^"), 2),
            (b'<', _) => (TokenKind::Op("<"), 1),
            (b'>', _) => (TokenKind::Op(">"), 1),
            (b'+', _) => (TokenKind::Op("+"), 1),
            (b'-', _) => (TokenKind::Op("-"), 1),
            (b'*', _) => (TokenKind::Op("*"), 1),
            (b'/', _) => (TokenKind::Op("/"), 1),
            (b'^', _) => (TokenKind::Op("^"), 1),
            (b'(', _) => (TokenKind::LParen, 1),
            (b')', _) => (TokenKind::RParen, 1),
            (b',', _) => (TokenKind::Comma, 1),
            _ => {
                let ch_len = source[i..].chars().next().map(char::len_utf8).unwrap_or(1);
                return Err(ExprError::new(
                    source,
                    i,
                    ch_len,
                    format!("unexpected character '{}'", &source[i..i + ch_len]),
                    "not part of the formula language",
                )
                .with_help("Formulas use numbers, identifiers, + - * / ^, comparisons and function calls"));
            }
        };
        tokens.push(Token {
            kind,
            offset: start,
            len,
        });
        i += len;
    }

    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn peek_op(&self) -> Option<&'static str> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Op(op),
                ..
            }) => Some(op),
            _ => None,
        }
    }

    fn end_error(&self, hint: &str) -> ExprError {
        let len = self.source.len();
        ExprError::new(self.source, len.saturating_sub(1), 1, "formula ends too early", hint)
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.sum()?;
        let op = match self.peek_op() {
            Some("<") => CmpOp::Lt,
            Some("<=") => CmpOp::Le,
            Some(">") => CmpOp::Gt,
            Some(">=") => CmpOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.sum()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn sum(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek_op() {
                Some("+") => BinOp::Add,
                Some("-") => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_op() {
                Some("*") => BinOp::Mul,
                Some("/") => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek_op() {
            Some("-") => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some("+") => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // Right associative: 2^3^2 == 2^(3^2); -x^2 == -(x^2)
    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.atom()?;
        if self.peek_op() == Some("^") {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ExprError> {
        let tok = self
            .next()
            .ok_or_else(|| self.end_error("expected a number, identifier or '('"))?;

        match tok.kind {
            TokenKind::Num(n) => Ok(Expr::Num(n)),
            TokenKind::LParen => {
                let inner = self.comparison()?;
                self.expect_rparen(tok.offset)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                let is_call = matches!(
                    self.peek(),
                    Some(Token {
                        kind: TokenKind::LParen,
                        ..
                    })
                );
                if is_call {
                    self.call(&name, tok.offset, tok.len)
                } else if name == SAMPLE_IDENT {
                    Ok(Expr::Sample)
                } else {
                    Ok(Expr::Param(name))
                }
            }
            _ => Err(ExprError::new(
                self.source,
                tok.offset,
                tok.len,
                format!("unexpected '{}'", &self.source[tok.offset..tok.offset + tok.len]),
                "expected a number, identifier or '('",
            )),
        }
    }

    fn call(&mut self, name: &str, offset: usize, len: usize) -> Result<Expr, ExprError> {
        let func = Func::from_name(name).ok_or_else(|| {
            ExprError::new(self.source, offset, len, format!("unknown function '{}'", name), "unknown function")
                .with_help("Available functions: if, sqrt, abs, min, max, exp, ln")
        })?;

        // consume '('
        let open = self.next().map(|t| t.offset).unwrap_or(offset);
        let mut args = Vec::new();
        let closes_immediately = matches!(
            self.peek(),
            Some(Token {
                kind: TokenKind::RParen,
                ..
            })
        );
        if !closes_immediately {
            loop {
                args.push(self.comparison()?);
                match self.peek() {
                    Some(Token {
                        kind: TokenKind::Comma,
                        ..
                    }) => {
                        self.pos += 1;
                    }
                    _ => break,
                }
            }
        }
        self.expect_rparen(open)?;

        if args.len() != func.arity() {
            return Err(ExprError::new(
                self.source,
                offset,
                len,
                format!(
                    "{}() takes {} argument(s), got {}",
                    func.name(),
                    func.arity(),
                    args.len()
                ),
                "wrong number of arguments",
            ));
        }

        Ok(Expr::Call { func, args })
    }

    fn expect_rparen(&mut self, open: usize) -> Result<(), ExprError> {
        match self.next() {
            Some(Token {
                kind: TokenKind::RParen,
                ..
            }) => Ok(()),
            _ => Err(ExprError::new(self.source, open, 1, "unclosed parenthesis", "opened here")),
        }
    }
}
