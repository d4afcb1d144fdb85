//! Tokenizer for custom validation expressions

use super::errors::{SandboxError, SandboxResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    If,
    Else,
    Typeof,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Semicolon,
    Question,
    Colon,
    Assign,
    Eq,
    StrictEq,
    NotEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

/// Splits source text into tokens.
pub fn tokenize(source: &str) -> SandboxResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Line and block comments
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            loop {
                if i + 1 >= chars.len() {
                    return Err(SandboxError::Syntax("unterminated comment".into()));
                }
                if chars[i] == '*' && chars[i + 1] == '/' {
                    i += 2;
                    break;
                }
                i += 1;
            }
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).map_or(false, |d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                i += 1;
                if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let number = text
                .parse::<f64>()
                .map_err(|_| SandboxError::Syntax(format!("invalid number '{}'", text)))?;
            tokens.push(Token::Number(number));
            continue;
        }

        if c == '"' || c == '\'' {
            let (literal, next) = read_string(&chars, i)?;
            tokens.push(Token::Str(literal));
            i = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(match word.as_str() {
                "true" => Token::True,
                "false" => Token::False,
                "null" => Token::Null,
                "if" => Token::If,
                "else" => Token::Else,
                "typeof" => Token::Typeof,
                _ => Token::Ident(word),
            });
            continue;
        }

        let rest = |n: usize| -> String { chars[i..(i + n).min(chars.len())].iter().collect() };
        let (token, width) = if rest(3) == "===" {
            (Token::StrictEq, 3)
        } else if rest(3) == "!==" {
            (Token::StrictNotEq, 3)
        } else {
            match rest(2).as_str() {
                "==" => (Token::Eq, 2),
                "!=" => (Token::NotEq, 2),
                "<=" => (Token::Le, 2),
                ">=" => (Token::Ge, 2),
                "&&" => (Token::And, 2),
                "||" => (Token::Or, 2),
                _ => (single(c)?, 1),
            }
        };
        tokens.push(token);
        i += width;
    }

    Ok(tokens)
}

fn single(c: char) -> SandboxResult<Token> {
    Ok(match c {
        '(' => Token::LParen,
        ')' => Token::RParen,
        '[' => Token::LBracket,
        ']' => Token::RBracket,
        '{' => Token::LBrace,
        '}' => Token::RBrace,
        '.' => Token::Dot,
        ',' => Token::Comma,
        ';' => Token::Semicolon,
        '?' => Token::Question,
        ':' => Token::Colon,
        '=' => Token::Assign,
        '<' => Token::Lt,
        '>' => Token::Gt,
        '!' => Token::Not,
        '+' => Token::Plus,
        '-' => Token::Minus,
        '*' => Token::Star,
        '/' => Token::Slash,
        '%' => Token::Percent,
        other => return Err(SandboxError::Syntax(format!("Unexpected character '{}'", other))),
    })
}

fn read_string(chars: &[char], start: usize) -> SandboxResult<(String, usize)> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i] {
            c if c == quote => return Ok((out, i + 1)),
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or_else(|| SandboxError::Syntax("Invalid or unexpected token".into()))?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => *other,
                });
                i += 2;
            }
            '\n' => break,
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    Err(SandboxError::Syntax("Invalid or unexpected token".into()))
}
