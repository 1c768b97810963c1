//! Tokenizer for unit source.

use std::fmt;

use unicode_ident::{is_xid_continue, is_xid_start};

use super::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    /// Rest of a `package` line, verbatim.
    Raw(String),
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
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
    Percent,
    Bang,
    AndAnd,
    OrOr,
    /// Newline or `;`.
    End,
    Eof,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Ident(name) => write!(f, "'{}'", name),
            Tok::Int(i) => write!(f, "{}", i),
            Tok::Float(x) => write!(f, "{}", x),
            Tok::Str(s) => write!(f, "{:?}", s),
            Tok::Raw(s) => write!(f, "'{}'", s),
            Tok::End => f.write_str("end of statement"),
            Tok::Eof => f.write_str("end of input"),
            other => {
                let symbol = match other {
                    Tok::LBrace => "{",
                    Tok::RBrace => "}",
                    Tok::LParen => "(",
                    Tok::RParen => ")",
                    Tok::LBracket => "[",
                    Tok::RBracket => "]",
                    Tok::Comma => ",",
                    Tok::Dot => ".",
                    Tok::Assign => "=",
                    Tok::Eq => "==",
                    Tok::Ne => "!=",
                    Tok::Lt => "<",
                    Tok::Le => "<=",
                    Tok::Gt => ">",
                    Tok::Ge => ">=",
                    Tok::Plus => "+",
                    Tok::Minus => "-",
                    Tok::Star => "*",
                    Tok::Slash => "/",
                    Tok::Percent => "%",
                    Tok::Bang => "!",
                    Tok::AndAnd => "&&",
                    _ => "||",
                };
                write!(f, "'{}'", symbol)
            }
        }
    }
}

/// A token and the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        tokens: Vec::new(),
    }
    .run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn push(&mut self, tok: Tok) {
        self.tokens.push(Token {
            tok,
            line: self.line,
        });
    }

    fn at_line_start(&self) -> bool {
        matches!(
            self.tokens.last(),
            None | Some(Token { tok: Tok::End, .. })
        )
    }

    fn run(mut self) -> Result<Vec<Token>, CompileError> {
        while let Some(c) = self.peek() {
            match c {
                '\n' => {
                    self.push(Tok::End);
                    self.pos += 1;
                    self.line += 1;
                }
                ';' => {
                    self.push(Tok::End);
                    self.pos += 1;
                }
                c if c.is_whitespace() => self.pos += 1,
                '/' if self.peek_next() == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                }
                '"' => self.string()?,
                c if c.is_ascii_digit() => self.number()?,
                c if c == '_' || is_xid_start(c) => self.ident(),
                _ => self.symbol(c)?,
            }
        }
        self.push(Tok::End);
        self.push(Tok::Eof);
        Ok(self.tokens)
    }

    fn ident(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(is_xid_continue) {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        if name == "package" && self.at_line_start() {
            self.push(Tok::Ident(name));
            let rest_start = self.pos;
            while self.peek().is_some_and(|c| c != '\n') {
                self.pos += 1;
            }
            let raw: String = self.chars[rest_start..self.pos].iter().collect();
            self.push(Tok::Raw(raw.trim().to_string()));
        } else {
            self.push(Tok::Ident(name));
        }
    }

    fn number(&mut self) -> Result<(), CompileError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let is_float =
            self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        let tok = if is_float {
            text.parse().map(Tok::Float).ok()
        } else {
            text.parse().map(Tok::Int).ok()
        };
        match tok {
            Some(tok) => {
                self.push(tok);
                Ok(())
            }
            None => Err(CompileError::new(
                self.line,
                format!("number '{}' is out of range", text),
            )),
        }
    }

    fn string(&mut self) -> Result<(), CompileError> {
        let line = self.line;
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(CompileError::new(line, "unterminated string literal"))
                }
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    let escaped = match self.peek_next() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(other) => {
                            return Err(CompileError::new(
                                line,
                                format!("unknown escape '\\{}'", other),
                            ))
                        }
                        None => return Err(CompileError::new(line, "unterminated string literal")),
                    };
                    text.push(escaped);
                    self.pos += 2;
                }
                Some(c) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
        self.push(Tok::Str(text));
        Ok(())
    }

    fn symbol(&mut self, c: char) -> Result<(), CompileError> {
        let next = self.peek_next();
        let (tok, width) = match (c, next) {
            ('=', Some('=')) => (Tok::Eq, 2),
            ('!', Some('=')) => (Tok::Ne, 2),
            ('<', Some('=')) => (Tok::Le, 2),
            ('>', Some('=')) => (Tok::Ge, 2),
            ('&', Some('&')) => (Tok::AndAnd, 2),
            ('|', Some('|')) => (Tok::OrOr, 2),
            ('{', _) => (Tok::LBrace, 1),
            ('}', _) => (Tok::RBrace, 1),
            ('(', _) => (Tok::LParen, 1),
            (')', _) => (Tok::RParen, 1),
            ('[', _) => (Tok::LBracket, 1),
            (']', _) => (Tok::RBracket, 1),
            (',', _) => (Tok::Comma, 1),
            ('.', _) => (Tok::Dot, 1),
            ('=', _) => (Tok::Assign, 1),
            ('<', _) => (Tok::Lt, 1),
            ('>', _) => (Tok::Gt, 1),
            ('+', _) => (Tok::Plus, 1),
            ('-', _) => (Tok::Minus, 1),
            ('*', _) => (Tok::Star, 1),
            ('/', _) => (Tok::Slash, 1),
            ('%', _) => (Tok::Percent, 1),
            ('!', _) => (Tok::Bang, 1),
            _ => {
                return Err(CompileError::new(
                    self.line,
                    format!("unexpected character '{}'", c),
                ))
            }
        };
        self.push(tok);
        self.pos += width;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(source: &str) -> Vec<Tok> {
        tokenize(source).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn package_line_is_raw() {
        assert_eq!(
            toks("package gen.my-reports\n"),
            vec![
                Tok::Ident("package".into()),
                Tok::Raw("gen.my-reports".into()),
                Tok::End,
                Tok::End,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn operators_and_literals() {
        assert_eq!(
            toks("x >= 1.5 && y != \"a\\\"b\" // trailing"),
            vec![
                Tok::Ident("x".into()),
                Tok::Ge,
                Tok::Float(1.5),
                Tok::AndAnd,
                Tok::Ident("y".into()),
                Tok::Ne,
                Tok::Str("a\"b".into()),
                Tok::End,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn unicode_identifiers() {
        assert_eq!(toks("größe")[0], Tok::Ident("größe".into()));
    }

    #[test]
    fn member_access_on_integer_is_not_a_float() {
        assert_eq!(
            toks("1.x")[..3],
            [Tok::Int(1), Tok::Dot, Tok::Ident("x".into())]
        );
    }

    #[test]
    fn lines_are_tracked() {
        let tokens = tokenize("a\n\nb").unwrap();
        let b = tokens.iter().find(|t| t.tok == Tok::Ident("b".into())).unwrap();
        assert_eq!(b.line, 3);
    }

    #[test]
    fn errors_carry_line() {
        let err = tokenize("ok\n\"open").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(tokenize("a # b").is_err());
    }
}
