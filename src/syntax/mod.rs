//! Turning source text into an [`AmongRoot`](crate::ast::AmongRoot).

pub mod parser;
pub mod source;
pub(crate) mod template;
pub mod token;
pub mod tokenizer;

pub use parser::{ImportResolver, ParseOutput, Parser};
pub use source::{LineColumn, Source};
pub use token::{Token, TokenKind};
pub use tokenizer::{InvalidUnicodeHandling, TokenizationMode, Tokenizer};
