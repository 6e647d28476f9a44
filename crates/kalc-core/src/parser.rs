//! Recursive-descent parser producing a restricted expression tree:
//! literals, the fixed operator set, and calls into the evaluator's closed
//! function table. Precedence, low to high: additive, multiplicative,
//! unary minus, power (right-associative, so `-2^2 == -4` and
//! `2^3^2 == 512`).

use crate::error::{KalcError, KalcResult};
use crate::token::{tokenize, Tok};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Ident(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Rem,
    Pow,
}

/// Tokenize and parse a normalized expression.
pub fn parse_expression(input: &str) -> KalcResult<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(KalcError::Calculation("empty expression".into()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.additive()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(KalcError::Calculation(format!(
            "unexpected token {tok:?} after expression"
        ))),
    }
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, tok: &Tok, what: &str) -> KalcResult<()> {
        match self.bump() {
            Some(ref t) if t == tok => Ok(()),
            Some(t) => Err(KalcError::Calculation(format!(
                "expected {what}, found {t:?}"
            ))),
            None => Err(KalcError::Calculation(format!(
                "expected {what}, found end of expression"
            ))),
        }
    }

    fn additive(&mut self) -> KalcResult<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> KalcResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => BinOp::Mul,
                Some(Tok::Slash) => BinOp::Div,
                Some(Tok::SlashSlash) => BinOp::FloorDiv,
                Some(Tok::Percent) => BinOp::Rem,
                _ => break,
            };
            self.bump();
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> KalcResult<Expr> {
        match self.peek() {
            Some(Tok::Minus) => {
                self.bump();
                let inner = self.unary()?;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)))
            }
            Some(Tok::Plus) => {
                self.bump();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> KalcResult<Expr> {
        let base = self.primary()?;
        if let Some(Tok::Caret) = self.peek() {
            self.bump();
            // Exponent re-enters at unary so `2^-3` parses, and stays
            // right-associative.
            let exponent = self.unary()?;
            return Ok(Expr::Binary(
                BinOp::Pow,
                Box::new(base),
                Box::new(exponent),
            ));
        }
        Ok(base)
    }

    fn primary(&mut self) -> KalcResult<Expr> {
        match self.bump() {
            Some(Tok::Num(v)) => Ok(Expr::Num(v)),
            Some(Tok::Ident(name)) => {
                if let Some(Tok::LPar) = self.peek() {
                    self.bump();
                    let args = self.call_args()?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(Tok::LPar) => {
                let inner = self.additive()?;
                self.expect(&Tok::RPar, "')'")?;
                Ok(inner)
            }
            Some(tok) => Err(KalcError::Calculation(format!("unexpected token {tok:?}"))),
            None => Err(KalcError::Calculation(
                "unexpected end of expression".into(),
            )),
        }
    }

    fn call_args(&mut self) -> KalcResult<Vec<Expr>> {
        let mut args = Vec::new();
        if let Some(Tok::RPar) = self.peek() {
            self.bump();
            return Ok(args);
        }
        loop {
            args.push(self.additive()?);
            match self.bump() {
                Some(Tok::Comma) => continue,
                Some(Tok::RPar) => return Ok(args),
                Some(tok) => {
                    return Err(KalcError::Calculation(format!(
                        "expected ',' or ')', found {tok:?}"
                    )))
                }
                None => {
                    return Err(KalcError::Calculation(
                        "unclosed function call".into(),
                    ))
                }
            }
        }
    }
}
