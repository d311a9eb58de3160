//! Lexical units produced by the [`Tokenizer`](super::tokenizer::Tokenizer).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Br,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Eq,
    Comma,
    Colon,
    /// Single word literal.
    Word,
    /// Single word literal written without escape sequences; the only kind keywords are read from.
    PlainWord,
    Key,
    ParamName,
    MacroName,
    QuotedPrimitive,
    Value,
    Operator,
    Keyword,
    Number,
    /// Emitted in place of anything unexpected while reading structure only.
    Error,
}

impl TokenKind {
    pub const fn friendly_name(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of file",
            TokenKind::Br => "line break",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Eq => "'='",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Word => "word",
            TokenKind::PlainWord => "plain word",
            TokenKind::Key => "key",
            TokenKind::ParamName => "parameter name",
            TokenKind::MacroName => "macro name",
            TokenKind::QuotedPrimitive => "quoted primitive",
            TokenKind::Value => "value",
            TokenKind::Operator => "operator",
            TokenKind::Keyword => "keyword",
            TokenKind::Number => "number",
            TokenKind::Error => "error",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.friendly_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Code-point position of the first character.
    pub start: usize,
    pub literal: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize) -> Self {
        Self {
            kind,
            start,
            literal: None,
        }
    }

    pub fn literal(kind: TokenKind, start: usize, literal: impl Into<String>) -> Self {
        Self {
            kind,
            start,
            literal: Some(literal.into()),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_literal(&self) -> bool {
        self.literal.is_some()
    }

    pub fn literal_or_empty(&self) -> &str {
        self.literal.as_deref().unwrap_or("")
    }

    /// The literal of a plain word, which is the only form a keyword may take.
    pub fn keyword_or_empty(&self) -> &str {
        match self.kind {
            TokenKind::PlainWord => self.literal_or_empty(),
            _ => "",
        }
    }

    /// A literal that can name a macro call or parameter; quoted primitives never do.
    pub fn is_simple_literal(&self) -> bool {
        self.is_literal() && !self.is(TokenKind::QuotedPrimitive)
    }

    /// Numeric value of a `Value` token, if it parses as one.
    pub fn as_number(&self) -> Option<f64> {
        if !self.is(TokenKind::Value) {
            return None;
        }
        self.literal.as_deref()?.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
    }

    pub fn is_operator_or_keyword(&self) -> bool {
        matches!(self.kind, TokenKind::Operator | TokenKind::Keyword)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.start)?;
        if let Some(literal) = &self.literal {
            write!(f, "({literal})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_only_come_from_plain_words() {
        assert_eq!(Token::literal(TokenKind::PlainWord, 0, "macro").keyword_or_empty(), "macro");
        assert_eq!(Token::literal(TokenKind::Word, 0, "macro").keyword_or_empty(), "");
    }

    #[test]
    fn numbers_are_read_from_values() {
        assert_eq!(Token::literal(TokenKind::Value, 0, "2.5").as_number(), Some(2.5));
        assert_eq!(Token::literal(TokenKind::Value, 0, "x").as_number(), None);
        assert_eq!(Token::literal(TokenKind::Word, 0, "1").as_number(), None);
    }
}
