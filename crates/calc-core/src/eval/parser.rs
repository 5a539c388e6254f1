//! Recursive-descent parser producing an expression tree.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('**' unary)?
//! primary := NUMBER | IDENT | IDENT '(' args? ')' | '(' expr ')'
//! args    := expr (',' expr)*
//! ```
//!
//! Left-associative chains are stored flat so neither evaluation nor drop
//! recurses once per operand. Every nested operand passes through `unary`,
//! so counting depth there caps parentheses, sign runs, `**` chains and call
//! arguments alike at [`MAX_DEPTH`].

use super::errors::EvalError;
use super::lexer::Token;
use crate::number::Number;

/// Maximum nesting depth accepted by the parser.
pub const MAX_DEPTH: usize = 256;

/// Additive operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOp {
    Add,
    Sub,
}

/// Multiplicative operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MulOp {
    Mul,
    Div,
    Rem,
}

/// Parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Literal.
    Num(Number),
    /// Bare name (constant lookup).
    Name(String),
    /// Function call.
    Call(String, Vec<Expr>),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Unary plus.
    Pos(Box<Expr>),
    /// `base ** exponent`.
    Pow(Box<Expr>, Box<Expr>),
    /// `first (op operand)*` for `+`/`-`.
    Sum(Box<Expr>, Vec<(AddOp, Expr)>),
    /// `first (op operand)*` for `*`/`/`/`%`.
    Product(Box<Expr>, Vec<(MulOp, Expr)>),
}

/// Parse a token stream into a single expression.
pub fn parse(tokens: &[Token]) -> Result<Expr, EvalError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(EvalError::syntax(format!(
            "unexpected {tok:?} at token {}",
            parser.pos
        ))),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), EvalError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(EvalError::syntax(format!(
                "expected {expected:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::other("expression is nested too deeply"));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn expr(&mut self) -> Result<Expr, EvalError> {
        let first = self.term()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => AddOp::Add,
                Some(Token::Minus) => AddOp::Sub,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.term()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Sum(Box::new(first), rest))
        }
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let first = self.unary()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Star) => MulOp::Mul,
                Some(Token::Slash) => MulOp::Div,
                Some(Token::Percent) => MulOp::Rem,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.unary()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Product(Box::new(first), rest))
        }
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        self.descend()?;
        let expr = if self.eat(&Token::Minus) {
            Expr::Neg(Box::new(self.unary()?))
        } else if self.eat(&Token::Plus) {
            Expr::Pos(Box::new(self.unary()?))
        } else {
            self.power()?
        };
        self.ascend();
        Ok(expr)
    }

    fn power(&mut self) -> Result<Expr, EvalError> {
        let base = self.primary()?;
        if self.eat(&Token::DoubleStar) {
            let exponent = self.unary()?;
            Ok(Expr::Pow(Box::new(base), Box::new(exponent)))
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(Expr::Num(*n)),
            Some(Token::Ident(name)) => {
                let name = name.clone();
                if self.eat(&Token::LParen) {
                    let args = self.args()?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(tok) => Err(EvalError::syntax(format!("unexpected {tok:?}"))),
            None => Err(EvalError::syntax("unexpected end of expression")),
        }
    }

    fn args(&mut self) -> Result<Vec<Expr>, EvalError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&Token::Comma) {
                // Trailing comma before ')' is accepted.
                if self.eat(&Token::RParen) {
                    break;
                }
                continue;
            }
            self.expect(&Token::RParen)?;
            break;
        }
        Ok(args)
    }
}
