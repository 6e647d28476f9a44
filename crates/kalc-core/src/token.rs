//! Tokenizer for normalized expressions.

use crate::error::{KalcError, KalcResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Num(f64),
    /// Function or constant name, lowercased.
    Ident(String),

    Plus,
    Minus,
    Star,
    Slash,
    /// `//` floor division
    SlashSlash,
    Percent,
    /// `^` or `**`
    Caret,

    Comma,
    LPar,
    RPar,
}

/// Tokenize a normalized expression. Supports integer, decimal and
/// scientific literals, the operator set `+ - * / // % ^ **`, parentheses,
/// commas, and `[a-zA-Z_][a-zA-Z0-9_]*` identifiers.
pub fn tokenize(s: &str) -> KalcResult<Vec<Tok>> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '(' => {
                out.push(Tok::LPar);
                i += 1;
                continue;
            }
            ')' => {
                out.push(Tok::RPar);
                i += 1;
                continue;
            }
            ',' => {
                out.push(Tok::Comma);
                i += 1;
                continue;
            }
            '+' => {
                out.push(Tok::Plus);
                i += 1;
                continue;
            }
            '-' => {
                out.push(Tok::Minus);
                i += 1;
                continue;
            }
            '%' => {
                out.push(Tok::Percent);
                i += 1;
                continue;
            }
            '^' => {
                out.push(Tok::Caret);
                i += 1;
                continue;
            }
            '*' => {
                // `**` is an exponentiation alias
                if chars.get(i + 1) == Some(&'*') {
                    out.push(Tok::Caret);
                    i += 2;
                } else {
                    out.push(Tok::Star);
                    i += 1;
                }
                continue;
            }
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    out.push(Tok::SlashSlash);
                    i += 2;
                } else {
                    out.push(Tok::Slash);
                    i += 1;
                }
                continue;
            }
            _ => {}
        }

        // Number: digits, optional fraction, optional exponent
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()))
        {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i < chars.len() && chars[i] == '.' {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            // Exponent only when it is actually followed by digits,
            // so `2*e` still tokenizes `e` as the constant.
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value: f64 = text
                .parse()
                .map_err(|_| KalcError::Calculation(format!("invalid number literal: {text}")))?;
            out.push(Tok::Num(value));
            continue;
        }

        // Identifier
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            out.push(Tok::Ident(word.to_lowercase()));
            continue;
        }

        return Err(KalcError::Calculation(format!(
            "unexpected character '{c}' at position {i}"
        )));
    }

    Ok(out)
}
