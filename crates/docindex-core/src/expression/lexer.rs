//! Tokenizer for index expressions.

use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Int(n) => n.to_string(),
            Token::Float(f) => f.to_string(),
            Token::Str(s) => format!("{:?}", s),
            Token::Ident(s) => s.clone(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::LBracket => "[".into(),
            Token::RBracket => "]".into(),
            Token::Comma => ",".into(),
            Token::Dot => ".".into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Percent => "%".into(),
            Token::EqEq => "==".into(),
            Token::NotEq => "!=".into(),
            Token::Lt => "<".into(),
            Token::Le => "<=".into(),
            Token::Gt => ">".into(),
            Token::Ge => ">=".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LexError {
    UnexpectedChar(char, usize),
    UnterminatedString(usize),
    InvalidNumber(String),
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::UnexpectedChar(c, pos) => {
                write!(f, "unexpected character '{}' at position {}", c, pos)
            }
            LexError::UnterminatedString(pos) => {
                write!(f, "unterminated string starting at position {}", pos)
            }
            LexError::InvalidNumber(s) => write!(f, "invalid number literal '{}'", s),
        }
    }
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer {
        chars: input.char_indices().peekable(),
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl Lexer<'_> {
    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        while self.chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}

        let (pos, c) = match self.chars.next() {
            Some(pair) => pair,
            None => return Ok(None),
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '.' => Token::Dot,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '=' => {
                if self.chars.next_if(|&(_, nc)| nc == '=').is_some() {
                    Token::EqEq
                } else {
                    return Err(LexError::UnexpectedChar('=', pos));
                }
            }
            '!' => {
                if self.chars.next_if(|&(_, nc)| nc == '=').is_some() {
                    Token::NotEq
                } else {
                    return Err(LexError::UnexpectedChar('!', pos));
                }
            }
            '<' => {
                if self.chars.next_if(|&(_, nc)| nc == '=').is_some() {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.chars.next_if(|&(_, nc)| nc == '=').is_some() {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '\'' | '"' => self.string(c, pos)?,
            _ if c.is_ascii_digit() => self.number(c)?,
            _ if c.is_alphabetic() || c == '_' => {
                let mut s = c.to_string();
                while let Some((_, nc)) = self.chars.next_if(|&(_, nc)| nc.is_alphanumeric() || nc == '_') {
                    s.push(nc);
                }
                Token::Ident(s)
            }
            _ => return Err(LexError::UnexpectedChar(c, pos)),
        };
        Ok(Some(token))
    }

    fn string(&mut self, quote: char, start: usize) -> Result<Token, LexError> {
        let mut s = String::new();
        let mut escaped = false;
        for (_, nc) in self.chars.by_ref() {
            if escaped {
                s.push(match nc {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
                escaped = false;
            } else if nc == '\\' {
                escaped = true;
            } else if nc == quote {
                return Ok(Token::Str(s));
            } else {
                s.push(nc);
            }
        }
        Err(LexError::UnterminatedString(start))
    }

    fn number(&mut self, first: char) -> Result<Token, LexError> {
        let mut s = first.to_string();
        while let Some((_, nc)) = self.chars.next_if(|&(_, nc)| nc.is_ascii_digit() || nc == '_') {
            if nc != '_' {
                s.push(nc);
            }
        }

        // Only treat '.' as a decimal point when a digit follows it.
        let mut lookahead = self.chars.clone();
        let is_float = matches!(lookahead.next(), Some((_, '.')))
            && matches!(lookahead.next(), Some((_, d)) if d.is_ascii_digit());

        if !is_float {
            return s
                .parse::<i64>()
                .map(Token::Int)
                .map_err(|_| LexError::InvalidNumber(s));
        }

        self.chars.next();
        s.push('.');
        while let Some((_, nc)) = self.chars.next_if(|&(_, nc)| nc.is_ascii_digit()) {
            s.push(nc);
        }
        s.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| LexError::InvalidNumber(s))
    }
}
