//! Query lexer using logos

use logos::Logos;
use matchql_core::SyntaxError;
use std::ops::Range;

/// Query tokens
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Keywords
    #[token("SELECT", ignore(ascii_case))]
    Select,

    #[token("FROM", ignore(ascii_case))]
    From,

    #[token("MATCH", ignore(ascii_case))]
    Match,

    #[token("WHERE", ignore(ascii_case))]
    Where,

    #[token("AS", ignore(ascii_case))]
    As,

    #[token("INSERT", ignore(ascii_case))]
    Insert,

    #[token("INTO", ignore(ascii_case))]
    Into,

    #[token("VALUES", ignore(ascii_case))]
    Values,

    #[token("DELETE", ignore(ascii_case))]
    Delete,

    #[token("EXISTS", ignore(ascii_case))]
    Exists,

    #[token("IN", ignore(ascii_case))]
    In,

    #[token("IS", ignore(ascii_case))]
    Is,

    #[token("GO", ignore(ascii_case))]
    Go,

    // Boolean keywords
    #[token("AND", ignore(ascii_case))]
    And,

    #[token("OR", ignore(ascii_case))]
    Or,

    #[token("NOT", ignore(ascii_case))]
    Not,

    #[token("TRUE", ignore(ascii_case))]
    True,

    #[token("FALSE", ignore(ascii_case))]
    False,

    #[token("NULL", ignore(ascii_case))]
    Null,

    // Symbols
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[token(".")]
    Dot,

    #[token("..")]
    DoubleDot,

    #[token("=")]
    Equals,

    #[token("<>")]
    NotEquals,

    #[token("!=")]
    NotEquals2,

    #[token("<")]
    LessThan,

    #[token("<=")]
    LessEquals,

    #[token(">")]
    GreaterThan,

    #[token(">=")]
    GreaterEquals,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    // Path connectors
    #[token("->")]
    DashArrowRight,

    #[token("<-")]
    ArrowLeftDash,

    // Literals
    #[regex(r"[0-9]+", |lex| lex.slice().to_string())]
    Integer(String),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    Float(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    StringDouble(String),

    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    StringSingle(String),

    // Identifiers
    #[regex(r"[a-zA-Z_|][a-zA-Z0-9_|]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"`[^`]+`", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    EscapedIdentifier(String),

    // Variable table reference
    #[regex(r"@[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_string())]
    Variable(String),

    // Comment (skip)
    #[regex(r"--[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/", logos::skip)]
    BlockComment,
}

fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl Token {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Select
                | Token::From
                | Token::Match
                | Token::Where
                | Token::As
                | Token::Insert
                | Token::Into
                | Token::Values
                | Token::Delete
                | Token::Exists
                | Token::In
                | Token::Is
                | Token::Go
                | Token::And
                | Token::Or
                | Token::Not
                | Token::True
                | Token::False
                | Token::Null
        )
    }

    /// Check if this token is a literal
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Token::Integer(_)
                | Token::Float(_)
                | Token::StringDouble(_)
                | Token::StringSingle(_)
                | Token::True
                | Token::False
                | Token::Null
        )
    }
}

/// A token with its byte span in the source
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Range<usize>,
}

/// 1-based (line, column) of a byte offset
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let prefix = &source[..offset.min(source.len())];
    let line = prefix.matches('\n').count() + 1;
    let column = match prefix.rfind('\n') {
        Some(nl) => prefix[nl + 1..].chars().count() + 1,
        None => prefix.chars().count() + 1,
    };
    (line, column)
}

/// Tokenize a query string, dropping anything that does not lex
pub fn tokenize(input: &str) -> Vec<Token> {
    Token::lexer(input).filter_map(|r| r.ok()).collect()
}

/// Tokenize a query string keeping spans; every unlexable character is
/// reported, and lexing continues after it
pub fn tokenize_spanned(input: &str) -> (Vec<SpannedToken>, Vec<SyntaxError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            Err(()) => {
                let (line, column) = line_col(input, span.start);
                errors.push(SyntaxError::new(
                    line,
                    column,
                    format!("unexpected character '{}'", &input[span]),
                ));
            }
        }
    }
    (tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_query() {
        let tokens = tokenize("SELECT N_0.name FROM Node AS N_0");

        assert!(tokens.contains(&Token::Select));
        assert!(tokens.contains(&Token::From));
        assert!(tokens.contains(&Token::As));
        assert!(tokens.contains(&Token::Dot));
    }

    #[test]
    fn test_path_tokens() {
        let tokens = tokenize("MATCH A-[E*1..3]->B<-[F]-C");

        assert!(tokens.contains(&Token::Minus));
        assert!(tokens.contains(&Token::LBracket));
        assert!(tokens.contains(&Token::Star));
        assert!(tokens.contains(&Token::DoubleDot));
        assert!(tokens.contains(&Token::DashArrowRight));
        assert!(tokens.contains(&Token::ArrowLeftDash));
        assert!(tokens.contains(&Token::Integer("3".to_string())));
    }

    #[test]
    fn test_literals_keep_source_text() {
        let tokens = tokenize("WHERE A.age = 27 AND A.height = 1.75 AND A.flag = TRUE");

        assert!(tokens.contains(&Token::Integer("27".to_string())));
        assert!(tokens.contains(&Token::Float("1.75".to_string())));
        assert!(tokens.contains(&Token::True));
    }

    #[test]
    fn test_strings() {
        let tokens = tokenize(r#"WHERE A.name = "Alice" OR A.name = 'O\'Brien'"#);

        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::StringDouble(s) if s == "Alice")));
        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::StringSingle(s) if s == "O'Brien")));
    }

    #[test]
    fn test_case_insensitive_keywords() {
        let tokens = tokenize("select * from Node as n match n");

        assert!(tokens.contains(&Token::Select));
        assert!(tokens.contains(&Token::From));
        assert!(tokens.contains(&Token::Match));
    }

    #[test]
    fn test_variable_and_comment() {
        let tokens = tokenize("FROM @v AS T -- trailing comment");

        assert!(tokens.contains(&Token::Variable("v".to_string())));
        assert!(!tokens.iter().any(|t| matches!(t, Token::Identifier(s) if s == "trailing")));
    }

    #[test]
    fn test_unlexable_character_is_reported() {
        let (tokens, errors) = tokenize_spanned("SELECT A.x\nFROM Node AS A WHERE A.x = #");

        assert!(!tokens.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
        assert!(errors[0].message.contains('#'));
    }
}
