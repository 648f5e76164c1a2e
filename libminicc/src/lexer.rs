// Copyright 2025-2026 Neil Henderson
//
//! The `lexer` module handles the lexical analysis of MiniC source code and produces a vector of
//! tokens for the parser.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::compiler_driver::diagnostics::{Diagnostic, DiagnosticKind};
use crate::compiler_driver::Driver;
use crate::core::SourceLocation;

/// The type of a token, including any payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenType {
    // Keywords
    KeywordInt,
    KeywordVoid,
    KeywordIf,
    KeywordElse,
    KeywordWhile,
    KeywordBreak,
    KeywordContinue,
    KeywordReturn,

    // Leaves with payloads
    Identifier(String),
    IntegerLiteral { value: i32, radix: u32 },

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LogicalAnd,
    LogicalOr,
    LogicalNot,

    // Punctuation
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Comma,
    Semicolon,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenType::KeywordInt => "int",
            TokenType::KeywordVoid => "void",
            TokenType::KeywordIf => "if",
            TokenType::KeywordElse => "else",
            TokenType::KeywordWhile => "while",
            TokenType::KeywordBreak => "break",
            TokenType::KeywordContinue => "continue",
            TokenType::KeywordReturn => "return",
            TokenType::Identifier(name) => return write!(f, "{name}"),
            TokenType::IntegerLiteral { value, .. } => return write!(f, "{value}"),
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Star => "*",
            TokenType::Slash => "/",
            TokenType::Percent => "%",
            TokenType::Assign => "=",
            TokenType::EqualTo => "==",
            TokenType::NotEqualTo => "!=",
            TokenType::LessThan => "<",
            TokenType::LessThanOrEqualTo => "<=",
            TokenType::GreaterThan => ">",
            TokenType::GreaterThanOrEqualTo => ">=",
            TokenType::LogicalAnd => "&&",
            TokenType::LogicalOr => "||",
            TokenType::LogicalNot => "!",
            TokenType::OpenParen => "(",
            TokenType::CloseParen => ")",
            TokenType::OpenBrace => "{",
            TokenType::CloseBrace => "}",
            TokenType::OpenBracket => "[",
            TokenType::CloseBracket => "]",
            TokenType::Comma => ",",
            TokenType::Semicolon => ";",
        };
        write!(f, "{text}")
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub loc: SourceLocation,
}

impl Token {
    fn new(token_type: TokenType, line: u32) -> Self {
        Self { token_type, loc: SourceLocation::new(line) }
    }
}

/// Performs lexical analysis of the given source text and produces a token stream.
///
/// Lexical errors are recorded as diagnostics on the driver; the returned stream contains the
/// tokens that were recognised up to each error.
pub fn lex(driver: &mut Driver, source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    loop {
        match lexer.next_token() {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => break,
            Err(diagnostic) => driver.add_diagnostic(diagnostic),
        }
    }

    tokens
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: u32,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self { chars: source.chars().peekable(), line: 1 }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Returns the next token, `None` at the end of input, or a diagnostic for a lexical error.
    fn next_token(&mut self) -> Result<Option<Token>, Diagnostic> {
        self.skip_whitespace_and_comments()?;

        let line = self.line;

        let Some(&c) = self.chars.peek() else {
            return Ok(None);
        };

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(Some(self.lex_identifier_or_keyword(line)));
        }

        if c.is_ascii_digit() {
            return self.lex_integer_literal(line).map(Some);
        }

        self.bump();

        let token_type = match c {
            '+' => TokenType::Plus,
            '-' => TokenType::Minus,
            '*' => TokenType::Star,
            '/' => TokenType::Slash,
            '%' => TokenType::Percent,
            '(' => TokenType::OpenParen,
            ')' => TokenType::CloseParen,
            '{' => TokenType::OpenBrace,
            '}' => TokenType::CloseBrace,
            '[' => TokenType::OpenBracket,
            ']' => TokenType::CloseBracket,
            ',' => TokenType::Comma,
            ';' => TokenType::Semicolon,

            '=' => {
                if self.eat('=') {
                    TokenType::EqualTo
                } else {
                    TokenType::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenType::NotEqualTo
                } else {
                    TokenType::LogicalNot
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenType::LessThanOrEqualTo
                } else {
                    TokenType::LessThan
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenType::GreaterThanOrEqualTo
                } else {
                    TokenType::GreaterThan
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenType::LogicalAnd
                } else {
                    return Err(Diagnostic::error_at_line(
                        DiagnosticKind::Syntax,
                        "Unexpected character '&'; did you mean '&&'?".to_string(),
                        line,
                    ));
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenType::LogicalOr
                } else {
                    return Err(Diagnostic::error_at_line(
                        DiagnosticKind::Syntax,
                        "Unexpected character '|'; did you mean '||'?".to_string(),
                        line,
                    ));
                }
            }

            _ => {
                return Err(Diagnostic::error_at_line(
                    DiagnosticKind::Syntax,
                    format!("Unexpected character '{c}'"),
                    line,
                ));
            }
        };

        Ok(Some(Token::new(token_type, line)))
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), Diagnostic> {
        loop {
            while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
                self.bump();
            }

            if self.chars.peek() != Some(&'/') {
                return Ok(());
            }

            // A '/' is either a comment opener or the division operator; only consume it here if a
            // comment follows.
            let mut lookahead = self.chars.clone();
            lookahead.next();
            match lookahead.next() {
                Some('/') => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('*') => {
                    let start_line = self.line;
                    self.bump(); // '/'
                    self.bump(); // '*'
                    loop {
                        match self.bump() {
                            Some('*') if self.eat('/') => break,
                            Some(_) => (),
                            None => {
                                return Err(Diagnostic::error_at_line(
                                    DiagnosticKind::Syntax,
                                    "Unterminated block comment".to_string(),
                                    start_line,
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_identifier_or_keyword(&mut self, line: u32) -> Token {
        let mut name = String::new();
        while matches!(self.chars.peek(), Some(&c) if c.is_ascii_alphanumeric() || c == '_') {
            name.push(self.bump().unwrap());
        }

        let token_type = match name.as_str() {
            "int" => TokenType::KeywordInt,
            "void" => TokenType::KeywordVoid,
            "if" => TokenType::KeywordIf,
            "else" => TokenType::KeywordElse,
            "while" => TokenType::KeywordWhile,
            "break" => TokenType::KeywordBreak,
            "continue" => TokenType::KeywordContinue,
            "return" => TokenType::KeywordReturn,
            _ => TokenType::Identifier(name),
        };

        Token::new(token_type, line)
    }

    fn lex_integer_literal(&mut self, line: u32) -> Result<Token, Diagnostic> {
        let mut digits = String::new();
        let mut radix = 10;

        if self.chars.peek() == Some(&'0') {
            self.bump();
            if self.eat('x') || self.eat('X') {
                radix = 16;
            } else if matches!(self.chars.peek(), Some(c) if c.is_ascii_digit()) {
                radix = 8;
            } else {
                // A bare zero.
                return Ok(Token::new(TokenType::IntegerLiteral { value: 0, radix: 10 }, line));
            }
        }

        while matches!(self.chars.peek(), Some(&c) if c.is_ascii_alphanumeric()) {
            digits.push(self.bump().unwrap());
        }

        match u64::from_str_radix(&digits, radix) {
            // Values are 32-bit; larger literals wrap, matching the target's integer model.
            Ok(value) => {
                Ok(Token::new(TokenType::IntegerLiteral { value: value as u32 as i32, radix }, line))
            }
            Err(_) => Err(Diagnostic::error_at_line(
                DiagnosticKind::Syntax,
                format!("Invalid integer literal '{digits}'"),
                line,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler_driver::Driver;

    fn lex_ok(source: &str) -> Vec<TokenType> {
        let mut driver = Driver::for_testing();
        let tokens = lex(&mut driver, source);
        assert!(!driver.has_error_diagnostics());
        tokens.into_iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        let tokens = lex_ok("int main while whilex _x1");
        assert_eq!(
            tokens,
            vec![
                TokenType::KeywordInt,
                TokenType::Identifier("main".to_string()),
                TokenType::KeywordWhile,
                TokenType::Identifier("whilex".to_string()),
                TokenType::Identifier("_x1".to_string()),
            ]
        );
    }

    #[test]
    fn integer_literals_record_radix() {
        let tokens = lex_ok("42 0 017 0x1F");
        assert_eq!(
            tokens,
            vec![
                TokenType::IntegerLiteral { value: 42, radix: 10 },
                TokenType::IntegerLiteral { value: 0, radix: 10 },
                TokenType::IntegerLiteral { value: 15, radix: 8 },
                TokenType::IntegerLiteral { value: 31, radix: 16 },
            ]
        );
    }

    #[test]
    fn two_character_operators() {
        let tokens = lex_ok("<= >= == != && || < > = !");
        assert_eq!(
            tokens,
            vec![
                TokenType::LessThanOrEqualTo,
                TokenType::GreaterThanOrEqualTo,
                TokenType::EqualTo,
                TokenType::NotEqualTo,
                TokenType::LogicalAnd,
                TokenType::LogicalOr,
                TokenType::LessThan,
                TokenType::GreaterThan,
                TokenType::Assign,
                TokenType::LogicalNot,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = lex_ok("a // line comment\n/* block\n comment */ b");
        assert_eq!(
            tokens,
            vec![TokenType::Identifier("a".to_string()), TokenType::Identifier("b".to_string())]
        );
    }

    #[test]
    fn tokens_carry_line_numbers() {
        let mut driver = Driver::for_testing();
        let tokens = lex(&mut driver, "a\nb\n\nc");
        let lines: Vec<u32> = tokens.iter().map(|t| t.loc.line).collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let mut driver = Driver::for_testing();
        lex(&mut driver, "int a; /* no end");
        assert!(driver.has_error_diagnostics());
    }

    #[test]
    fn stray_character_is_an_error() {
        let mut driver = Driver::for_testing();
        lex(&mut driver, "int a @ b;");
        assert!(driver.has_error_diagnostics());
    }
}
