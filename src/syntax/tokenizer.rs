//! Mode-driven tokenizer.
//!
//! Among has no context-free token grammar: whether `:` ends a key or belongs to a value, whether
//! `(` opens an operation or is part of a property key, and whether `-` is an operator depends on
//! what the parser expects next. The parser therefore asks for each token in a
//! [`TokenizationMode`], and the tokenizer reads the next lexeme under that mode's rules.
//!
//! Tokens not yet committed with [`Tokenizer::discard`] are buffered. [`Tokenizer::reset`] either
//! replays them or throws them away and rewinds the source so they are read again in another mode.
//!
//! Lexical problems (unterminated primitives and block comments, invalid unicode escapes) never
//! stop tokenization. They are queued and collected by the parser with
//! [`Tokenizer::take_reports`]. A problem is queued once per position, no matter how many times
//! the text around it is re-read.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::source::Source;
use super::token::{Token, TokenKind};
use crate::diagnostics::{Report, ReportKind};
use crate::operators::OperatorRegistry;

/// How to read the next token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenizationMode {
    /// Single word; yields [`TokenKind::PlainWord`] when written without escapes.
    PlainWord,
    /// Single word, stops at `:`.
    Word,
    /// Property key; may contain spaces and brackets, stops at `:`.
    Key,
    /// Macro parameter name, stops at `=`.
    ParamName,
    /// Macro name, stops at `:`.
    MacroName,
    /// Value; may contain spaces and `:`.
    Value,
    /// Term of an operation; splits words at registered operators.
    Operation,
    /// Structural characters only; anything else becomes [`TokenKind::Error`].
    Unexpected,
}

/// What to do with a `\u`/`\U` escape that is not a valid code point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidUnicodeHandling {
    #[default]
    Error,
    Warn,
    Ignore,
}

pub struct Tokenizer<'s> {
    source: &'s Source,
    invalid_unicode: InvalidUnicodeHandling,
    /// Tokens read since the last discard, each with the position its read began at.
    tokens: Vec<(Token, usize)>,
    token_index: usize,
    src_index: usize,
    last_token_start: usize,
    reports: Vec<Report>,
    reported: HashSet<(usize, String)>,
}

struct WordRules {
    stop_at_whitespace: bool,
    stop_at_colon: bool,
    stop_at_eq: bool,
    stop_at_brackets: bool,
}

impl<'s> Tokenizer<'s> {
    pub fn new(source: &'s Source, invalid_unicode: InvalidUnicodeHandling) -> Self {
        Self {
            source,
            invalid_unicode,
            tokens: Vec::new(),
            token_index: 0,
            src_index: 0,
            last_token_start: 0,
            reports: Vec::new(),
            reported: HashSet::new(),
        }
    }

    pub fn source(&self) -> &'s Source {
        self.source
    }

    /// Start of the token returned last.
    pub fn last_token_start(&self) -> usize {
        self.last_token_start
    }

    /// Next token, replaying buffered tokens first. With `skip_br`, line breaks are skipped.
    pub fn next(
        &mut self,
        skip_br: bool,
        mode: TokenizationMode,
        operators: &OperatorRegistry,
    ) -> Token {
        loop {
            let token = self.advance(mode, operators);
            self.last_token_start = token.start;
            if !(skip_br && token.is(TokenKind::Br)) {
                return token;
            }
        }
    }

    fn advance(&mut self, mode: TokenizationMode, operators: &OperatorRegistry) -> Token {
        if let Some((token, _)) = self.tokens.get(self.token_index) {
            self.token_index += 1;
            return token.clone();
        }
        let read_start = self.src_index;
        let token = self.read(mode, operators);
        self.tokens.push((token.clone(), read_start));
        self.token_index += 1;
        token
    }

    /// Drops the tokens consumed so far. Tokens rewound by [`reset`](Self::reset) but not read
    /// again stay buffered.
    pub fn discard(&mut self) {
        self.tokens.drain(..self.token_index);
        self.token_index = 0;
    }

    /// Rewinds to the first buffered token. With `discard_tokens`, the buffer is dropped and the
    /// text is read again, possibly in another mode; otherwise the same tokens are replayed.
    pub fn reset(&mut self, discard_tokens: bool) {
        self.token_index = 0;
        if discard_tokens {
            if let Some((_, read_start)) = self.tokens.first() {
                self.src_index = *read_start;
            }
            self.tokens.clear();
        }
    }

    /// Lexical reports queued since the last call.
    pub fn take_reports(&mut self) -> Vec<Report> {
        std::mem::take(&mut self.reports)
    }

    fn report(&mut self, kind: ReportKind, message: &str, position: usize) {
        if self.reported.insert((position, message.to_string())) {
            self.reports.push(Report::new(kind, message, Some(position)));
        }
    }

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    fn peek(&self, offset: usize) -> Option<char> {
        self.source.code_point_at(self.src_index + offset)
    }

    fn read(&mut self, mode: TokenizationMode, operators: &OperatorRegistry) -> Token {
        use TokenizationMode as M;

        self.skip_blank();
        let start = self.src_index;
        let Some(c) = self.peek(0) else {
            return Token::new(TokenKind::Eof, start);
        };
        let structural = match c {
            '\n' => Some(TokenKind::Br),
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            ',' => Some(TokenKind::Comma),
            '(' if mode != M::Key => Some(TokenKind::LParen),
            ')' if mode != M::Key => Some(TokenKind::RParen),
            '[' if mode != M::Key => Some(TokenKind::LBracket),
            ']' if mode != M::Key => Some(TokenKind::RBracket),
            ':' if mode != M::Value => Some(TokenKind::Colon),
            '=' if mode == M::ParamName => Some(TokenKind::Eq),
            _ => None,
        };
        if let Some(kind) = structural {
            self.src_index += 1;
            return Token::new(kind, start);
        }
        if c == '"' || c == '\'' {
            let token = self.primitive(c, start);
            return match mode {
                M::Unexpected => Token::new(TokenKind::Error, start),
                _ => token,
            };
        }

        match mode {
            M::PlainWord | M::Word | M::MacroName | M::ParamName => {
                let rules = WordRules {
                    stop_at_whitespace: true,
                    stop_at_colon: mode != M::ParamName,
                    stop_at_eq: mode == M::ParamName,
                    stop_at_brackets: true,
                };
                let (word, escaped) = self.word(&rules, None);
                let kind = match mode {
                    M::PlainWord if !escaped => TokenKind::PlainWord,
                    M::PlainWord | M::Word => TokenKind::Word,
                    M::MacroName => TokenKind::MacroName,
                    _ => TokenKind::ParamName,
                };
                Token::literal(kind, start, word)
            }
            M::Key | M::Value => {
                let key = mode == M::Key;
                let rules = WordRules {
                    stop_at_whitespace: false,
                    stop_at_colon: key,
                    stop_at_eq: false,
                    stop_at_brackets: !key,
                };
                let (text, _) = self.word(&rules, None);
                Token::literal(if key { TokenKind::Key } else { TokenKind::Value }, start, text)
            }
            M::Operation => self.operation_term(start, operators),
            M::Unexpected => {
                let rules = WordRules {
                    stop_at_whitespace: true,
                    stop_at_colon: true,
                    stop_at_eq: true,
                    stop_at_brackets: true,
                };
                self.word(&rules, None);
                if self.src_index == start {
                    self.src_index += 1;
                }
                Token::new(TokenKind::Error, start)
            }
        }
    }

    fn operation_term(&mut self, start: usize, operators: &OperatorRegistry) -> Token {
        if let Some(len) = operators.match_operator(self.source.code_points_from(start)) {
            self.src_index += len;
            let name: String = self.source.code_points_from(start)[..len].iter().collect();
            return Token::literal(TokenKind::Operator, start, name);
        }
        if let Some(len) = self.number_at(start, operators) {
            self.src_index += len;
            let number: String = self.source.code_points_from(start)[..len].iter().collect();
            return Token::literal(TokenKind::Number, start, number);
        }
        let rules = WordRules {
            stop_at_whitespace: true,
            stop_at_colon: true,
            stop_at_eq: false,
            stop_at_brackets: true,
        };
        let (word, escaped) = self.word(&rules, Some(operators));
        let kind = if !escaped && operators.is_keyword(&word) {
            TokenKind::Keyword
        } else {
            TokenKind::Word
        };
        Token::literal(kind, start, word)
    }

    /// Length of a number literal (`12`, `1.5`, `3e-4`) at `start`, if one ends cleanly there.
    fn number_at(&self, start: usize, operators: &OperatorRegistry) -> Option<usize> {
        let text = self.source.code_points_from(start);
        let digits = |from: usize| text[from..].iter().take_while(|c| c.is_ascii_digit()).count();

        let mut len = digits(0);
        if len == 0 {
            return None;
        }
        if text.get(len) == Some(&'.') {
            let fraction = digits(len + 1);
            if fraction > 0 {
                len += 1 + fraction;
            }
        }
        if matches!(text.get(len), Some('e' | 'E')) {
            let sign = usize::from(matches!(text.get(len + 1), Some('+' | '-')));
            let exponent = digits(len + 1 + sign);
            if exponent > 0 {
                len += 1 + sign + exponent;
            }
        }
        let ends_cleanly = match text.get(len) {
            None => true,
            Some(&c) => {
                is_blank(c)
                    || matches!(c, '\n' | '{' | '}' | ',' | '(' | ')' | '[' | ']' | ':')
                    || operators.match_operator(&text[len..]).is_some()
                    || (c == '/' && matches!(text.get(len + 1), Some('/' | '*')))
            }
        };
        ends_cleanly.then_some(len)
    }

    /// Reads literal text under `rules`. With `operators`, also stops where an operator starts.
    ///
    /// Returns the text and whether any escape sequence was used. When whitespace is allowed
    /// inside the text, trailing whitespace is dropped and comments count as nothing.
    fn word(&mut self, rules: &WordRules, operators: Option<&OperatorRegistry>) -> (String, bool) {
        let mut out = String::new();
        let mut pending_blank = String::new();
        let mut escaped = false;
        loop {
            let Some(c) = self.peek(0) else { break };
            match c {
                ' ' | '\t' => {
                    if rules.stop_at_whitespace {
                        break;
                    }
                    pending_blank.push(c);
                    self.src_index += 1;
                    continue;
                }
                '\\' if self.peek(1) == Some('\n') => {
                    self.src_index += 2;
                    continue;
                }
                '/' if matches!(self.peek(1), Some('/' | '*')) => {
                    if rules.stop_at_whitespace {
                        break;
                    }
                    self.skip_comment();
                    continue;
                }
                '\n' | '{' | '}' | ',' => break,
                '(' | ')' | '[' | ']' if rules.stop_at_brackets => break,
                ':' if rules.stop_at_colon => break,
                '=' if rules.stop_at_eq => break,
                _ => {}
            }
            if let Some(operators) = operators {
                let rest = self.source.code_points_from(self.src_index);
                if c != '\\' && operators.match_operator(rest).is_some() {
                    break;
                }
            }
            out.push_str(&pending_blank);
            pending_blank.clear();
            self.src_index += 1;
            if c == '\\' {
                escaped = true;
                self.escape(&mut out);
            } else {
                out.push(c);
            }
        }
        (out, escaped)
    }

    /// Reads a quoted primitive starting at the opening `quote`.
    ///
    /// A line break is kept; when the next line starts with blanks followed by `|`, the blanks
    /// and the bar are skipped so multi-line text can be indented.
    fn primitive(&mut self, quote: char, start: usize) -> Token {
        self.src_index += 1;
        let mut out = String::new();
        loop {
            let Some(c) = self.peek(0) else {
                self.report(ReportKind::Error, "Unterminated primitive", start);
                break;
            };
            self.src_index += 1;
            match c {
                c if c == quote => break,
                '\\' if self.peek(0) == Some('\n') => self.src_index += 1,
                '\\' => self.escape(&mut out),
                '\n' => {
                    out.push('\n');
                    let line_start = self.src_index;
                    while self.peek(0).is_some_and(is_blank) {
                        self.src_index += 1;
                    }
                    if self.peek(0) == Some('|') {
                        self.src_index += 1;
                    } else {
                        self.src_index = line_start;
                    }
                }
                c => out.push(c),
            }
        }
        Token::literal(TokenKind::QuotedPrimitive, start, out)
    }

    /// Decodes the escape after a consumed backslash into `out`.
    fn escape(&mut self, out: &mut String) {
        let backslash = self.src_index - 1;
        let Some(c) = self.peek(0) else {
            out.push('\\');
            return;
        };
        self.src_index += 1;
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'u' | 'U' => {
                let digits = if c == 'u' { 4 } else { 8 };
                match self.hex_code_point(digits) {
                    Some(decoded) => {
                        self.src_index += digits;
                        out.push(decoded);
                    }
                    None => {
                        // The raw text after the letter is read as ordinary characters.
                        let message = format!("Invalid unicode escape '\\{c}'");
                        match self.invalid_unicode {
                            InvalidUnicodeHandling::Error => {
                                self.report(ReportKind::Error, &message, backslash)
                            }
                            InvalidUnicodeHandling::Warn => {
                                self.report(ReportKind::Warn, &message, backslash)
                            }
                            InvalidUnicodeHandling::Ignore => {}
                        }
                        out.push(c);
                    }
                }
            }
            c => out.push(c),
        }
    }

    fn hex_code_point(&self, digits: usize) -> Option<char> {
        let mut value: u32 = 0;
        for i in 0..digits {
            let digit = self.peek(i)?.to_digit(16)?;
            value = value.checked_mul(16)?.checked_add(digit)?;
        }
        char::from_u32(value)
    }

    /// Skips blanks, line continuations and comments, stopping at a line break.
    fn skip_blank(&mut self) {
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(c), _) if is_blank(c) => self.src_index += 1,
                (Some('\\'), Some('\n')) => self.src_index += 2,
                (Some('/'), Some('/' | '*')) => self.skip_comment(),
                _ => return,
            }
        }
    }

    /// Skips a `//` or `/* */` comment at the current position. Line comments leave the line
    /// break in place.
    fn skip_comment(&mut self) {
        let start = self.src_index;
        let block = self.peek(1) == Some('*');
        self.src_index += 2;
        loop {
            match self.peek(0) {
                None => {
                    if block {
                        self.report(ReportKind::Error, "Unterminated block comment", start);
                    }
                    return;
                }
                Some('\n') if !block => return,
                Some('*') if block && self.peek(1) == Some('/') => {
                    self.src_index += 2;
                    return;
                }
                Some(_) => self.src_index += 1,
            }
        }
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{priority, OperatorProperty, OperatorType};

    fn read_all(text: &str, mode: TokenizationMode, operators: &OperatorRegistry) -> Vec<Token> {
        let source = Source::of(text);
        let mut tokenizer = Tokenizer::new(&source, InvalidUnicodeHandling::Error);
        let mut tokens = Vec::new();
        loop {
            let token = tokenizer.next(false, mode, operators);
            tokenizer.discard();
            let eof = token.is(TokenKind::Eof);
            tokens.push(token);
            if eof {
                return tokens;
            }
        }
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn values_keep_inner_spaces_and_colons() {
        let tokens = read_all("a b:c  , d", TokenizationMode::Value, &OperatorRegistry::new());
        assert_eq!(tokens[0].literal.as_deref(), Some("a b:c"));
        assert_eq!(
            kinds(&tokens),
            [TokenKind::Value, TokenKind::Comma, TokenKind::Value, TokenKind::Eof]
        );
    }

    #[test]
    fn keys_allow_brackets() {
        let tokens = read_all("a[0] b: x", TokenizationMode::Key, &OperatorRegistry::new());
        assert_eq!(tokens[0].literal.as_deref(), Some("a[0] b"));
        assert!(tokens[1].is(TokenKind::Colon));
    }

    #[test]
    fn operators_split_words() {
        let mut operators = OperatorRegistry::new();
        operators
            .add_operator("+", OperatorType::Binary, Default::default(), None, priority::ADDITION)
            .unwrap();
        operators
            .add_operator("++", OperatorType::Postfix, Default::default(), None, priority::POSTFIX)
            .unwrap();
        operators.add_keyword("and", OperatorType::Binary, None).unwrap();
        let tokens = read_all("a+b++ and android", TokenizationMode::Operation, &operators);
        let literals: Vec<_> = tokens.iter().map(|t| (t.kind, t.literal_or_empty())).collect();
        assert_eq!(
            literals,
            [
                (TokenKind::Word, "a"),
                (TokenKind::Operator, "+"),
                (TokenKind::Word, "b"),
                (TokenKind::Operator, "++"),
                (TokenKind::Keyword, "and"),
                (TokenKind::Word, "android"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn numbers_are_not_split_by_operators() {
        let mut operators = OperatorRegistry::new();
        for name in [".", "-"] {
            let property = OperatorProperty::None;
            operators
                .add_operator(name, OperatorType::Binary, property, None, priority::ADDITION)
                .unwrap();
        }
        let tokens = read_all("1.5 2e-3 a.b", TokenizationMode::Operation, &operators);
        assert_eq!(tokens[0].literal.as_deref(), Some("1.5"));
        assert!(tokens[0].is(TokenKind::Number));
        assert_eq!(tokens[1].literal.as_deref(), Some("2e-3"));
        assert_eq!(tokens[3].literal.as_deref(), Some("."));
    }

    #[test]
    fn comments_and_continuations_are_skipped() {
        let tokens = read_all(
            "a // c\n/* b */ x\\\ny",
            TokenizationMode::Word,
            &OperatorRegistry::new(),
        );
        let literals: Vec<_> = tokens.iter().map(|t| t.literal_or_empty()).collect();
        assert_eq!(literals, ["a", "", "xy", ""]);
        assert!(tokens[1].is(TokenKind::Br));
    }

    #[test]
    fn quoted_primitives_join_barred_lines() {
        let tokens = read_all("'a\n   |b\\tc'", TokenizationMode::Value, &OperatorRegistry::new());
        assert_eq!(tokens[0].literal.as_deref(), Some("a\nb\tc"));
        assert!(tokens[0].is(TokenKind::QuotedPrimitive));
    }

    #[test]
    fn reset_rereads_in_another_mode() {
        let source = Source::of("a b: c");
        let operators = OperatorRegistry::new();
        let mut tokenizer = Tokenizer::new(&source, InvalidUnicodeHandling::Error);
        let word = tokenizer.next(true, TokenizationMode::PlainWord, &operators);
        assert_eq!(word.literal.as_deref(), Some("a"));
        tokenizer.reset(false);
        assert_eq!(tokenizer.next(true, TokenizationMode::Value, &operators), word);
        tokenizer.reset(true);
        let value = tokenizer.next(true, TokenizationMode::Value, &operators);
        assert_eq!(value.literal.as_deref(), Some("a b: c"));
    }

    #[test]
    fn invalid_unicode_keeps_raw_text_and_reports_once() {
        let source = Source::of("\\uZZZZ");
        let operators = OperatorRegistry::new();
        let mut tokenizer = Tokenizer::new(&source, InvalidUnicodeHandling::Error);
        let token = tokenizer.next(true, TokenizationMode::Value, &operators);
        assert_eq!(token.literal.as_deref(), Some("uZZZZ"));
        tokenizer.reset(true);
        tokenizer.next(true, TokenizationMode::Value, &operators);
        let reports = tokenizer.take_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].source_position, Some(0));
    }

    #[test]
    fn unterminated_block_comment_is_reported() {
        let source = Source::of("a /* b");
        let operators = OperatorRegistry::new();
        let mut tokenizer = Tokenizer::new(&source, InvalidUnicodeHandling::Ignore);
        tokenizer.next(true, TokenizationMode::Word, &operators);
        assert!(tokenizer.next(true, TokenizationMode::Word, &operators).is(TokenKind::Eof));
        assert_eq!(tokenizer.take_reports()[0].message, "Unterminated block comment");
    }
}
