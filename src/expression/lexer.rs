// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::iter::Peekable;
use std::str::CharIndices;

use crate::errors::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    /// f-string split into literal text and raw expression source.
    FStr(Vec<FStrPart>),
    Name(String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    In,
    Is,
    If,
    Else,
    For,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    /// Statement separator: `;` or a newline outside brackets.
    Separator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStrPart {
    Text(String),
    Expr { source: String, offset: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>, EvalError> {
    let mut lexer = Lexer {
        chars: input.char_indices().peekable(),
        tokens: Vec::new(),
        depth: 0,
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Spanned>,
    depth: usize,
}

impl Lexer<'_> {
    fn run(&mut self) -> Result<(), EvalError> {
        while let Some(&(position, ch)) = self.chars.peek() {
            match ch {
                '\n' | ';' => {
                    self.chars.next();
                    if ch == ';' || self.depth == 0 {
                        self.separator(position);
                    }
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '\\' => {
                    // explicit line continuation
                    self.chars.next();
                    if let Some(&(_, '\r')) = self.chars.peek() {
                        self.chars.next();
                    }
                    if let Some(&(_, '\n')) = self.chars.peek() {
                        self.chars.next();
                    } else {
                        return Err(EvalError::syntax("unexpected '\\'", position));
                    }
                }
                '#' => {
                    while let Some(&(_, next)) = self.chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                '(' | '[' | '{' => {
                    self.chars.next();
                    self.depth += 1;
                    let token = match ch {
                        '(' => Token::LParen,
                        '[' => Token::LBracket,
                        _ => Token::LBrace,
                    };
                    self.push(token, position);
                }
                ')' | ']' | '}' => {
                    self.chars.next();
                    self.depth = self.depth.saturating_sub(1);
                    let token = match ch {
                        ')' => Token::RParen,
                        ']' => Token::RBracket,
                        _ => Token::RBrace,
                    };
                    self.push(token, position);
                }
                ',' => self.single(Token::Comma, position),
                ':' => self.single(Token::Colon, position),
                '+' => self.single(Token::Plus, position),
                '-' => self.single(Token::Minus, position),
                '*' => self.single(Token::Star, position),
                '%' => self.single(Token::Percent, position),
                '.' => {
                    self.chars.next();
                    if matches!(self.chars.peek(), Some(&(_, c)) if c.is_ascii_digit()) {
                        let number = self.number(position, String::from("0."))?;
                        self.push(number, position);
                    } else {
                        self.push(Token::Dot, position);
                    }
                }
                '/' => {
                    self.chars.next();
                    let token = if self.eat('/') { Token::SlashSlash } else { Token::Slash };
                    self.push(token, position);
                }
                '=' => {
                    self.chars.next();
                    let token = if self.eat('=') { Token::Eq } else { Token::Assign };
                    self.push(token, position);
                }
                '!' => {
                    self.chars.next();
                    if !self.eat('=') {
                        return Err(EvalError::syntax("unexpected '!'", position));
                    }
                    self.push(Token::Ne, position);
                }
                '<' => {
                    self.chars.next();
                    let token = if self.eat('=') { Token::Le } else { Token::Lt };
                    self.push(token, position);
                }
                '>' => {
                    self.chars.next();
                    let token = if self.eat('=') { Token::Ge } else { Token::Gt };
                    self.push(token, position);
                }
                '"' | '\'' => {
                    let text = self.string()?;
                    self.push(Token::Str(text), position);
                }
                c if c.is_ascii_digit() => {
                    let number = self.number(position, String::new())?;
                    self.push(number, position);
                }
                c if is_ident_start(c) => {
                    let ident = self.ident();
                    if (ident == "f" || ident == "F")
                        && matches!(self.chars.peek(), Some(&(_, '"')) | Some(&(_, '\'')))
                    {
                        let body_start = self.chars.peek().map(|&(p, _)| p + 1).unwrap_or(position);
                        let text = self.string()?;
                        let parts = split_fstring(&text, body_start)?;
                        self.push(Token::FStr(parts), position);
                        continue;
                    }
                    let token = match ident.as_str() {
                        "True" | "true" => Token::True,
                        "False" | "false" => Token::False,
                        "None" | "null" => Token::None,
                        "and" => Token::And,
                        "or" => Token::Or,
                        "not" => Token::Not,
                        "in" => Token::In,
                        "is" => Token::Is,
                        "if" => Token::If,
                        "else" => Token::Else,
                        "for" => Token::For,
                        _ => Token::Name(ident),
                    };
                    self.push(token, position);
                }
                other => {
                    return Err(EvalError::syntax(format!("unexpected character '{}'", other), position));
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, token: Token, position: usize) {
        self.tokens.push(Spanned { token, position });
    }

    fn single(&mut self, token: Token, position: usize) {
        self.chars.next();
        self.push(token, position);
    }

    fn separator(&mut self, position: usize) {
        let redundant = matches!(
            self.tokens.last(),
            None | Some(Spanned {
                token: Token::Separator,
                ..
            })
        );
        if !redundant {
            self.push(Token::Separator, position);
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some(&(_, c)) if c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> String {
        let mut result = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if is_ident_part(ch) {
                result.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }
        result
    }

    fn number(&mut self, position: usize, mut text: String) -> Result<Token, EvalError> {
        let mut is_float = !text.is_empty();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_ascii_digit() || ch == '_' {
                if ch != '_' {
                    text.push(ch);
                }
                self.chars.next();
            } else if ch == '.' && !is_float {
                is_float = true;
                text.push(ch);
                self.chars.next();
            } else if (ch == 'e' || ch == 'E') && !text.contains(['e', 'E']) {
                is_float = true;
                text.push(ch);
                self.chars.next();
                if let Some(&(_, sign)) = self.chars.peek() {
                    if sign == '+' || sign == '-' {
                        text.push(sign);
                        self.chars.next();
                    }
                }
            } else {
                break;
            }
        }
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| EvalError::syntax(format!("invalid number literal '{}'", text), position))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| EvalError::syntax(format!("invalid number literal '{}'", text), position))
        }
    }

    fn string(&mut self) -> Result<String, EvalError> {
        let (start, quote) = match self.chars.next() {
            Some(pair) => pair,
            None => return Err(EvalError::syntax("unterminated string", 0)),
        };
        let mut result = String::new();
        while let Some((_, ch)) = self.chars.next() {
            if ch == quote {
                return Ok(result);
            }
            if ch == '\\' {
                let (_, escaped) = self
                    .chars
                    .next()
                    .ok_or_else(|| EvalError::syntax("unterminated escape sequence", start))?;
                match escaped {
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    'r' => result.push('\r'),
                    '0' => result.push('\0'),
                    other => result.push(other),
                }
            } else {
                result.push(ch);
            }
        }
        Err(EvalError::syntax("unterminated string", start))
    }
}

/// Split an f-string body into text and `{expression}` parts.
/// `{{` and `}}` are literal braces.
fn split_fstring(body: &str, offset: usize) -> Result<Vec<FStrPart>, EvalError> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = body.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '{' if matches!(chars.peek(), Some(&(_, '{'))) => {
                chars.next();
                text.push('{');
            }
            '}' if matches!(chars.peek(), Some(&(_, '}'))) => {
                chars.next();
                text.push('}');
            }
            '{' => {
                if !text.is_empty() {
                    parts.push(FStrPart::Text(std::mem::take(&mut text)));
                }
                let mut depth = 1;
                let mut quote: Option<char> = None;
                let mut source = String::new();
                loop {
                    let (_, next) = chars
                        .next()
                        .ok_or_else(|| EvalError::syntax("unterminated '{' in f-string", offset + index))?;
                    match (quote, next) {
                        (Some(q), c) if c == q => quote = None,
                        (Some(_), _) => {}
                        (None, '\'') | (None, '"') => quote = Some(next),
                        (None, '{') | (None, '[') | (None, '(') => depth += 1,
                        (None, ']') | (None, ')') => depth -= 1,
                        (None, '}') => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    source.push(next);
                }
                if source.trim().is_empty() {
                    return Err(EvalError::syntax("empty expression in f-string", offset + index));
                }
                parts.push(FStrPart::Expr {
                    source,
                    offset: offset + index + 1,
                });
            }
            '}' => {
                return Err(EvalError::syntax("single '}' is not allowed in f-string", offset + index));
            }
            other => text.push(other),
        }
    }
    if !text.is_empty() {
        parts.push(FStrPart::Text(text));
    }
    Ok(parts)
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_operators_and_keywords() {
        assert_eq!(
            kinds("a == 1 and not b // 2 is None"),
            vec![
                Token::Name("a".into()),
                Token::Eq,
                Token::Int(1),
                Token::And,
                Token::Not,
                Token::Name("b".into()),
                Token::SlashSlash,
                Token::Int(2),
                Token::Is,
                Token::None,
            ]
        );
    }

    #[test]
    fn test_newlines_inside_brackets_are_not_separators() {
        let tokens = kinds("x = [\n 1,\n 2\n]\ny = x");
        let separators = tokens.iter().filter(|t| **t == Token::Separator).count();
        assert_eq!(separators, 1);
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let tokens = kinds("# leading comment\n\n\na = 1 # trailing\n\n");
        assert_eq!(tokens.first(), Some(&Token::Name("a".into())));
        assert_eq!(tokens.iter().filter(|t| **t == Token::Separator).count(), 1);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("42 4.5 1e3 .5"), vec![
            Token::Int(42),
            Token::Float(4.5),
            Token::Float(1000.0),
            Token::Float(0.5),
        ]);
    }

    #[test]
    fn test_fstring_parts() {
        let tokens = kinds("f\"urn:{item['kind']}/{{x}}\"");
        match &tokens[0] {
            Token::FStr(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], FStrPart::Text("urn:".into()));
                assert!(matches!(&parts[1], FStrPart::Expr { source, .. } if source == "item['kind']"));
                assert_eq!(parts[2], FStrPart::Text("/{x}".into()));
            }
            other => panic!("expected f-string, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_string_reports_position() {
        let err = tokenize("x = 'abc").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { position: 4, .. }));
    }
}
