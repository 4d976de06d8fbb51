//! Symbolic arithmetic expressions.
//!
//! Memlet volumes, data shapes and overlay metrics carry expressions over
//! free symbols (`"N * 2"`, `"int_ceil(M, 32)"`). This module parses them
//! with a small hand-written lexer + precedence-climbing parser and evaluates
//! them against a [`SymbolMap`]. Evaluation is total: any unresolved symbol,
//! non-finite or non-integral result yields `None` rather than an error, so
//! callers can render an "unknown" state instead of failing.

use indexmap::IndexMap;

/// Symbol name to value. `None` marks a symbol the user has not supplied yet;
/// insertion order is the deterministic prompt order.
pub type SymbolMap = IndexMap<String, Option<f64>>;

pub type Result<T> = std::result::Result<T, ExprError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("Unexpected character `{ch}` at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("Unexpected token `{token}` at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unknown function `{name}`")]
    UnknownFunction { name: String },

    #[error("Function `{name}` expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Min,
    Max,
    Ceil,
    Floor,
    Abs,
    IntCeil,
    IntFloor,
    Sqrt,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "min" | "Min" => Func::Min,
            "max" | "Max" => Func::Max,
            "ceil" | "ceiling" => Func::Ceil,
            "floor" => Func::Floor,
            "abs" | "Abs" => Func::Abs,
            "int_ceil" => Func::IntCeil,
            "int_floor" => Func::IntFloor,
            "sqrt" => Func::Sqrt,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Func::Min | Func::Max | Func::IntCeil | Func::IntFloor => 2,
            Func::Ceil | Func::Floor | Func::Abs | Func::Sqrt => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Sym(String),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call { func: Func, args: Vec<Expr> },
}

impl Expr {
    pub fn parse(text: &str) -> Result<Self> {
        Parser::new(text)?.parse_all()
    }

    /// Evaluates against `symbols`. `None` on any unresolved free symbol,
    /// non-finite or non-integral result.
    pub fn evaluate(&self, symbols: &SymbolMap) -> Option<f64> {
        let v = self.eval_inner(symbols)?;
        if !v.is_finite() || v.fract() != 0.0 {
            return None;
        }
        Some(v)
    }

    fn eval_inner(&self, symbols: &SymbolMap) -> Option<f64> {
        match self {
            Expr::Num(n) => Some(*n),
            Expr::Sym(name) => symbols.get(name).copied().flatten(),
            Expr::Neg(e) => Some(-e.eval_inner(symbols)?),
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.eval_inner(symbols)?;
                let b = rhs.eval_inner(symbols)?;
                Some(match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Mod => a.rem_euclid(b),
                    BinOp::Pow => a.powf(b),
                })
            }
            Expr::Call { func, args } => {
                let mut vals = Vec::with_capacity(args.len());
                for a in args {
                    vals.push(a.eval_inner(symbols)?);
                }
                Some(match func {
                    Func::Min => vals[0].min(vals[1]),
                    Func::Max => vals[0].max(vals[1]),
                    Func::Ceil => vals[0].ceil(),
                    Func::Floor => vals[0].floor(),
                    Func::Abs => vals[0].abs(),
                    Func::IntCeil => (vals[0] / vals[1]).ceil(),
                    Func::IntFloor => (vals[0] / vals[1]).floor(),
                    Func::Sqrt => vals[0].sqrt(),
                })
            }
        }
    }

    /// Free symbols in discovery order (left-to-right recursive walk), each
    /// reported once. This order drives serialized symbol prompting.
    pub fn free_symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut Vec<String>) {
        match self {
            Expr::Num(_) => {}
            Expr::Sym(name) => {
                if !out.iter().any(|s| s == name) {
                    out.push(name.clone());
                }
            }
            Expr::Neg(e) => e.collect_symbols(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_symbols(out);
                rhs.collect_symbols(out);
            }
            Expr::Call { args, .. } => {
                for a in args {
                    a.collect_symbols(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(char),
    /// `**`
    Pow,
    LParen,
    RParen,
    Comma,
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self> {
        let mut tokens = Vec::new();
        let bytes: Vec<char> = text.chars().collect();
        let mut i = 0usize;
        while i < bytes.len() {
            let ch = bytes[i];
            match ch {
                c if c.is_whitespace() => i += 1,
                c if c.is_ascii_digit() || c == '.' => {
                    let start = i;
                    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == '.') {
                        i += 1;
                    }
                    let text: String = bytes[start..i].iter().collect();
                    let value = text.parse::<f64>().map_err(|_| ExprError::UnexpectedChar {
                        ch: c,
                        offset: start,
                    })?;
                    tokens.push((Token::Num(value), start));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let start = i;
                    while i < bytes.len() && (bytes[i].is_alphanumeric() || bytes[i] == '_') {
                        i += 1;
                    }
                    tokens.push((Token::Ident(bytes[start..i].iter().collect()), start));
                }
                '*' => {
                    if bytes.get(i + 1) == Some(&'*') {
                        tokens.push((Token::Pow, i));
                        i += 2;
                    } else {
                        tokens.push((Token::Op('*'), i));
                        i += 1;
                    }
                }
                '+' | '-' | '/' | '%' => {
                    tokens.push((Token::Op(ch), i));
                    i += 1;
                }
                '(' => {
                    tokens.push((Token::LParen, i));
                    i += 1;
                }
                ')' => {
                    tokens.push((Token::RParen, i));
                    i += 1;
                }
                ',' => {
                    tokens.push((Token::Comma, i));
                    i += 1;
                }
                other => return Err(ExprError::UnexpectedChar { ch: other, offset: i }),
            }
        }
        Ok(Self { tokens, pos: 0 })
    }

    fn parse_all(mut self) -> Result<Expr> {
        let expr = self.parse_binary(0)?;
        match self.peek() {
            None => Ok(expr),
            Some((tok, offset)) => Err(ExprError::UnexpectedToken {
                token: format!("{tok:?}"),
                offset: *offset,
            }),
        }
    }

    fn peek(&self) -> Option<&(Token, usize)> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn binding_power(tok: &Token) -> Option<(BinOp, u8, u8)> {
        // (op, left bp, right bp); `**` is right-associative.
        match tok {
            Token::Op('+') => Some((BinOp::Add, 1, 2)),
            Token::Op('-') => Some((BinOp::Sub, 1, 2)),
            Token::Op('*') => Some((BinOp::Mul, 3, 4)),
            Token::Op('/') => Some((BinOp::Div, 3, 4)),
            Token::Op('%') => Some((BinOp::Mod, 3, 4)),
            Token::Pow => Some((BinOp::Pow, 6, 5)),
            _ => None,
        }
    }

    fn parse_binary(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let Some((tok, _)) = self.peek() else { break };
            let Some((op, left_bp, right_bp)) = Self::binding_power(tok) else {
                break;
            };
            if left_bp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.parse_binary(right_bp)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.bump().ok_or(ExprError::UnexpectedEnd)? {
            Token::Op('-') => Ok(Expr::Neg(Box::new(self.parse_unary()?))),
            Token::Op('+') => self.parse_unary(),
            Token::Num(n) => Ok(Expr::Num(n)),
            Token::Ident(name) => {
                if matches!(self.peek(), Some((Token::LParen, _))) {
                    self.bump();
                    let func = Func::from_name(&name)
                        .ok_or_else(|| ExprError::UnknownFunction { name: name.clone() })?;
                    let args = self.parse_args()?;
                    if args.len() != func.arity() {
                        return Err(ExprError::Arity {
                            name,
                            expected: func.arity(),
                            got: args.len(),
                        });
                    }
                    Ok(Expr::Call { func, args })
                } else {
                    Ok(Expr::Sym(name))
                }
            }
            Token::LParen => {
                let inner = self.parse_binary(0)?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    Some(tok) => Err(ExprError::UnexpectedToken {
                        token: format!("{tok:?}"),
                        offset: self.pos,
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            tok => Err(ExprError::UnexpectedToken {
                token: format!("{tok:?}"),
                offset: self.pos,
            }),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some((Token::RParen, _))) {
            self.bump();
            return Ok(args);
        }
        loop {
            args.push(self.parse_binary(0)?);
            match self.bump() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(tok) => {
                    return Err(ExprError::UnexpectedToken {
                        token: format!("{tok:?}"),
                        offset: self.pos,
                    });
                }
                None => return Err(ExprError::UnexpectedEnd),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(pairs: &[(&str, Option<f64>)]) -> SymbolMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn evaluates_simple_arithmetic() {
        let e = Expr::parse("N * 2").unwrap();
        assert_eq!(e.evaluate(&symbols(&[("N", Some(5.0))])), Some(10.0));
    }

    #[test]
    fn unresolved_symbol_yields_none() {
        let e = Expr::parse("N * 2").unwrap();
        assert_eq!(e.evaluate(&symbols(&[("N", None)])), None);
        assert_eq!(e.evaluate(&SymbolMap::default()), None);
    }

    #[test]
    fn non_integral_results_yield_none() {
        let e = Expr::parse("5 / 2").unwrap();
        assert_eq!(e.evaluate(&SymbolMap::default()), None);
        let e = Expr::parse("sqrt(2)").unwrap();
        assert_eq!(e.evaluate(&SymbolMap::default()), None);
    }

    #[test]
    fn division_by_zero_yields_none() {
        let e = Expr::parse("1 / 0").unwrap();
        assert_eq!(e.evaluate(&SymbolMap::default()), None);
    }

    #[test]
    fn respects_precedence_and_associativity() {
        let e = Expr::parse("2 + 3 * 4").unwrap();
        assert_eq!(e.evaluate(&SymbolMap::default()), Some(14.0));
        let e = Expr::parse("(2 + 3) * 4").unwrap();
        assert_eq!(e.evaluate(&SymbolMap::default()), Some(20.0));
        // Right-associative power: 2 ** 3 ** 2 = 2 ** 9.
        let e = Expr::parse("2 ** 3 ** 2").unwrap();
        assert_eq!(e.evaluate(&SymbolMap::default()), Some(512.0));
    }

    #[test]
    fn functions_evaluate() {
        let m = symbols(&[("M", Some(70.0))]);
        assert_eq!(Expr::parse("int_ceil(M, 32)").unwrap().evaluate(&m), Some(3.0));
        assert_eq!(Expr::parse("min(3, 9)").unwrap().evaluate(&m), Some(3.0));
        assert_eq!(Expr::parse("abs(-4)").unwrap().evaluate(&m), Some(4.0));
    }

    #[test]
    fn unknown_function_is_a_parse_error() {
        assert!(matches!(
            Expr::parse("frobnicate(1)"),
            Err(ExprError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn free_symbols_in_discovery_order_once_each() {
        let e = Expr::parse("N * M + min(N, K)").unwrap();
        assert_eq!(e.free_symbols(), vec!["N", "M", "K"]);
    }

    #[test]
    fn unary_minus_binds_tighter_than_addition() {
        let e = Expr::parse("-N + 3").unwrap();
        assert_eq!(e.evaluate(&symbols(&[("N", Some(1.0))])), Some(2.0));
    }
}
