//! Tokenizer for calculator expressions.

use std::iter::Peekable;
use std::str::CharIndices;

use super::errors::EvalError;
use crate::number::Number;

/// A lexical token.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// Numeric literal.
    Number(Number),
    /// Identifier (function or constant name).
    Ident(String),
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    DoubleStar,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
}

/// Split an expression into tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                let _ = chars.next();
            }
            '0'..='9' | '.' => tokens.push(Token::Number(lex_number(input, &mut chars)?)),
            c if c.is_ascii_alphabetic() || c == '_' => {
                tokens.push(Token::Ident(lex_ident(input, &mut chars)));
            }
            '*' => {
                let _ = chars.next();
                if chars.next_if(|&(_, c)| c == '*').is_some() {
                    tokens.push(Token::DoubleStar);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '+' | '-' | '/' | '%' | '(' | ')' | ',' => {
                let _ = chars.next();
                tokens.push(match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                });
            }
            other => {
                return Err(EvalError::syntax(format!(
                    "unexpected character {other:?} at {pos}"
                )));
            }
        }
    }

    Ok(tokens)
}

fn lex_number(input: &str, chars: &mut Peekable<CharIndices<'_>>) -> Result<Number, EvalError> {
    let start = chars.peek().map_or(input.len(), |&(i, _)| i);
    let mut end = start;
    let mut is_float = false;

    while let Some((i, c)) = chars.next_if(|&(_, c)| c.is_ascii_digit()) {
        end = i + c.len_utf8();
    }
    if let Some((i, _)) = chars.next_if(|&(_, c)| c == '.') {
        is_float = true;
        end = i + 1;
        while let Some((i, c)) = chars.next_if(|&(_, c)| c.is_ascii_digit()) {
            end = i + c.len_utf8();
        }
    }

    // Exponent part: only consumed when followed by digits, so `2e` stays `2` `e`.
    let rest = &input[end..];
    let exp_len = exponent_len(rest);
    if exp_len > 0 {
        is_float = true;
        end += exp_len;
        while chars.next_if(|&(i, _)| i < end).is_some() {}
    }

    let literal = &input[start..end];
    if literal == "." {
        return Err(EvalError::syntax("lone '.'"));
    }
    if is_float {
        literal
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|e| EvalError::syntax(format!("bad number {literal:?}: {e}")))
    } else {
        match literal.parse::<i64>() {
            Ok(i) => Ok(Number::Int(i)),
            Err(_) => literal
                .parse::<f64>()
                .map(Number::Float)
                .map_err(|e| EvalError::syntax(format!("bad number {literal:?}: {e}"))),
        }
    }
}

/// Length in bytes of a valid exponent suffix (`e5`, `E-3`, `e+10`) at the start of `rest`.
fn exponent_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    if !matches!(bytes.first(), Some(b'e' | b'E')) {
        return 0;
    }
    let mut i = 1;
    if matches!(bytes.get(i), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return 0;
    }
    // `1e5x` is a number followed by garbage; `1e5e` too. Either way the parser rejects it.
    i + digits
}

fn lex_ident(input: &str, chars: &mut Peekable<CharIndices<'_>>) -> String {
    let start = chars.peek().map_or(input.len(), |&(i, _)| i);
    let mut end = start;
    while let Some((i, c)) = chars.next_if(|&(_, c)| c.is_ascii_alphanumeric() || c == '_') {
        end = i + c.len_utf8();
    }
    input[start..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_expression() {
        let tokens = tokenize("2 + 3 * 4").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(Number::Int(2)),
                Token::Plus,
                Token::Number(Number::Int(3)),
                Token::Star,
                Token::Number(Number::Int(4)),
            ]
        );
    }

    #[test]
    fn double_star_is_one_token() {
        let tokens = tokenize("2**8").unwrap();
        assert_eq!(tokens[1], Token::DoubleStar);
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn float_literals() {
        assert_eq!(tokenize("2.5").unwrap(), vec![Token::Number(Number::Float(2.5))]);
        assert_eq!(tokenize(".5").unwrap(), vec![Token::Number(Number::Float(0.5))]);
        assert_eq!(tokenize("1.").unwrap(), vec![Token::Number(Number::Float(1.0))]);
    }

    #[test]
    fn exponent_literals() {
        assert_eq!(tokenize("1e5").unwrap(), vec![Token::Number(Number::Float(1e5))]);
        assert_eq!(
            tokenize("2.5E-3").unwrap(),
            vec![Token::Number(Number::Float(2.5e-3))]
        );
        assert_eq!(tokenize("1e+2").unwrap(), vec![Token::Number(Number::Float(100.0))]);
    }

    #[test]
    fn dangling_exponent_is_identifier() {
        let tokens = tokenize("2e").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Number(Number::Int(2)), Token::Ident("e".into())]
        );
    }

    #[test]
    fn identifiers_and_calls() {
        let tokens = tokenize("log10(x_1, 2)").unwrap();
        assert_eq!(tokens[0], Token::Ident("log10".into()));
        assert_eq!(tokens[1], Token::LParen);
        assert_eq!(tokens[2], Token::Ident("x_1".into()));
        assert_eq!(tokens[3], Token::Comma);
        assert_eq!(tokens[5], Token::RParen);
    }

    #[test]
    fn unknown_character_is_syntax_error() {
        assert!(matches!(tokenize("2 $ 3"), Err(EvalError::Syntax(_))));
        assert!(matches!(tokenize("2 ^ 3"), Err(EvalError::Syntax(_))));
        assert!(matches!(tokenize("__import__('os')"), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn lone_dot_is_syntax_error() {
        assert!(matches!(tokenize("."), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn huge_integer_literal_becomes_float() {
        let tokens = tokenize("99999999999999999999").unwrap();
        assert!(matches!(tokens[0], Token::Number(Number::Float(_))));
    }

    #[test]
    fn whitespace_is_ignored() {
        assert_eq!(tokenize(" \t1\n").unwrap(), vec![Token::Number(Number::Int(1))]);
        assert!(tokenize("   ").unwrap().is_empty());
    }
}
