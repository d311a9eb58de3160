//! Recursive-descent parser with inline macro expansion.
//!
//! The parser reads a script statement by statement:
//!
//! - `macro`/`fn` definitions are built by a [`TemplateBuilder`] and registered as soon as the
//!   statement ends, so later statements can use them.
//! - `operator`/`keyword` definitions change how later operations are split into terms.
//! - `use` and `undef` statements import and remove definitions.
//! - Anything else is a value appended to the root.
//!
//! Every primitive, named collection and operator application is passed through the macro
//! registry as soon as it is read. Inside a macro body, calls are recorded instead and run when
//! the macro is applied.
//!
//! Syntax errors are reported and followed by [`Parser::try_to_recover`], which skips tokens up to
//! a synchronization point. Reports raised while skipping are suppressed.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, trace};

use super::source::Source;
use super::template::TemplateBuilder;
use super::token::{Token, TokenKind};
use super::tokenizer::{TokenizationMode as Mode, Tokenizer};
use crate::ast::{Among, AmongList, AmongObject, AmongRoot};
use crate::definition::AmongDefinition;
use crate::diagnostics::{ReportAt, ReportHandler, ReportKind, ReportList, Silent};
use crate::engine::EngineConfig;
use crate::errors::AmongError;
use crate::macros::MacroKind;
use crate::operators::{OperatorDefinition, OperatorProperty, OperatorType, PriorityGroup};

/// Supplies the definitions of other compilation units to `use` statements.
pub trait ImportResolver {
    /// Definitions exported by the unit at `path`, or `None` after reporting why there are none.
    fn resolve_definition(
        &mut self,
        path: &str,
        reports: &mut dyn ReportHandler,
    ) -> Option<AmongDefinition>;
}

/// What a single parse produces.
#[derive(Debug)]
pub struct ParseOutput {
    pub root: AmongRoot,
    /// Definitions made by the script, plus those imported with `use public`.
    pub definition: AmongDefinition,
    pub reports: ReportList,
}

/// Report sink that drops reports while recovering and defaults positions to the last token.
struct ParserReports {
    list: ReportList,
    recovering: bool,
    last_token_start: usize,
}

impl ReportHandler for ParserReports {
    fn report(&mut self, kind: ReportKind, message: &str, position: Option<usize>, hints: &[&str]) {
        if !self.recovering {
            self.list
                .report(kind, message, position.or(Some(self.last_token_start)), hints);
        }
    }
}

/// One operator line such as `binary right-associative (3)`.
struct OperatorSpec {
    operator_type: OperatorType,
    property: OperatorProperty,
    priority: Option<f64>,
}

pub struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    config: &'a EngineConfig,
    imports: &'a mut dyn ImportResolver,
    root: AmongRoot,
    definition: AmongDefinition,
    /// Everything visible to the script: imports plus its own definitions.
    import_definition: AmongDefinition,
    reports: ParserReports,
}

impl<'a> Parser<'a> {
    pub fn new(
        source: &'a Source,
        config: &'a EngineConfig,
        import_definition: AmongDefinition,
        imports: &'a mut dyn ImportResolver,
    ) -> Self {
        Self {
            tokenizer: Tokenizer::new(source, config.invalid_unicode_handling),
            config,
            imports,
            root: AmongRoot::new(),
            definition: AmongDefinition::new(),
            import_definition,
            reports: ParserReports {
                list: ReportList::new(),
                recovering: false,
                last_token_start: 0,
            },
        }
    }

    pub fn parse(mut self) -> ParseOutput {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.among()));
        if outcome.is_err() {
            self.reports.recovering = false;
            self.reports.error("Unexpected error");
        }
        ParseOutput {
            root: self.root,
            definition: self.definition,
            reports: self.reports.list,
        }
    }

    // ------------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------------

    fn next(&mut self, skip_br: bool, mode: Mode) -> Token {
        let token = self
            .tokenizer
            .next(skip_br, mode, &self.import_definition.operators);
        self.reports.last_token_start = token.start;
        for report in self.tokenizer.take_reports() {
            self.reports
                .report(report.kind, &report.message, report.source_position, &[]);
        }
        token
    }

    fn discard(&mut self) {
        self.tokenizer.discard();
    }

    fn reset(&mut self, discard_tokens: bool) {
        self.tokenizer.reset(discard_tokens);
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn among(&mut self) {
        loop {
            self.discard();
            let next = self.next(true, Mode::PlainWord);
            if next.is(TokenKind::Eof) {
                return;
            }
            match next.keyword_or_empty() {
                "macro" => self.macro_definition(false, next.start),
                "fn" => self.macro_definition(true, next.start),
                "operator" => self.operator_definition(next.start, false),
                "keyword" => self.operator_definition(next.start, true),
                "undef" => self.undef(next.start),
                "use" => self.use_statement(next.start),
                _ => self.value_statement(&next),
            }
        }
    }

    fn value_statement(&mut self, first: &Token) {
        self.reset(first.is_simple_literal());
        let value = match self.nameable(false, &mut None) {
            Some(value) => value,
            None => {
                let next = self.next(true, Mode::Value);
                let Some(literal) = next.literal.clone() else {
                    if next.is(TokenKind::Comma) {
                        self.reports.error("Redundant comma");
                    } else {
                        self.reports.error(
                            "Top level statements can only be macro/operator/keyword definition, \
                             undef statement, or values.",
                        );
                        self.try_to_recover(Mode::Unexpected, None, true, true);
                    }
                    return;
                };
                Among::value(literal).with_source_position(next.start)
            }
        };
        self.root.push(value);
        self.stmt_end();
    }

    /// Consumes a statement end (line break, `,` or end of file) if there is one.
    fn stmt_end(&mut self) -> bool {
        self.discard();
        let next = self.next(false, Mode::Unexpected);
        match next.kind {
            TokenKind::Br => {
                self.discard();
                let next = self.next(true, Mode::Unexpected);
                if !next.is(TokenKind::Comma) {
                    self.reset(next.is(TokenKind::Error));
                }
                true
            }
            TokenKind::Eof | TokenKind::Comma => true,
            _ => {
                self.reset(next.is(TokenKind::Error));
                false
            }
        }
    }

    fn expect_stmt_end(&mut self, message: &str) {
        if !self.stmt_end() {
            self.reports.error(message);
            self.try_to_recover(Mode::Unexpected, None, true, true);
        }
    }

    fn definition_name(&mut self, mode: Mode) -> Option<String> {
        self.discard();
        let next = self.next(true, mode);
        if next.literal.is_none() {
            self.reports.error("Expected name");
            self.reset(false);
            self.recover(mode);
        }
        next.literal
    }

    fn macro_definition(&mut self, function: bool, start: usize) {
        let Some(name) = self.definition_name(Mode::MacroName) else {
            return;
        };
        self.discard();
        let kind = match self.next(true, Mode::PlainWord).kind {
            TokenKind::Colon => MacroKind::Const,
            TokenKind::LBrace => MacroKind::Object,
            TokenKind::LBracket => MacroKind::List,
            TokenKind::LParen => MacroKind::Operation,
            _ => {
                self.reports
                    .error("Invalid macro statement; expected '{', '[', '(' or ':'");
                self.reset(false);
                self.recover(Mode::PlainWord);
                return;
            }
        };
        let kind = if function { kind.as_function() } else { kind };
        self.macro_body(start, name, kind);
    }

    fn macro_body(&mut self, start: usize, name: String, kind: MacroKind) {
        let mut builder = TemplateBuilder::new(start, &name, kind);
        if let Some(closer) = closing_bracket(kind) {
            self.macro_params(&mut builder, closer);
            self.discard();
            if !self.next(true, Mode::Unexpected).is(TokenKind::Colon) {
                self.reports.error("Expected ':' after parameter definition");
                self.reset(false);
                self.recover(Mode::Word);
                return;
            }
        }

        let mut template = Some(builder);
        let body = self.expr_or_error(&mut template);
        self.discard();
        self.expect_stmt_end("Expected ',' or newline after macro statement");
        let Some(builder) = template else {
            return;
        };
        if let Some(m) = builder.finish(body, &mut self.reports) {
            debug!(signature = %m.signature(), "macro defined");
            let m = Arc::new(m);
            self.import_definition
                .macros
                .add(m.clone(), &mut ReportAt::new(&mut self.reports, Some(start)));
            self.definition.macros.add(m, &mut Silent);
        }
    }

    fn macro_params(&mut self, builder: &mut TemplateBuilder, closer: TokenKind) {
        loop {
            let next = self.next(true, Mode::ParamName);
            if next.is(closer) || next.is(TokenKind::Eof) {
                break;
            }
            if !next.is(TokenKind::ParamName) {
                self.reports.error("Expected parameter name");
                builder.mark_invalid();
                if self.try_to_recover(Mode::ParamName, Some(closer), true, true) {
                    break;
                }
                continue;
            }
            let name = next.literal_or_empty().to_string();
            let name_start = next.start;

            let mut next = self.next(true, Mode::ParamName);
            let default_value = if next.is(TokenKind::Eq) {
                let value = self.expr_or_error(&mut None);
                next = self.next(true, Mode::ParamName);
                Some(value)
            } else {
                None
            };
            builder.new_param(&name, default_value, name_start, &mut self.reports);

            if next.is(closer) {
                break;
            }
            if !next.is(TokenKind::Comma) {
                self.reports
                    .error(&format!("Expected ',' or {}", closer.friendly_name()));
                builder.mark_invalid();
                if self.try_to_recover(Mode::ParamName, Some(closer), true, true) {
                    break;
                }
            }
        }
    }

    fn operator_definition(&mut self, start: usize, keyword: bool) {
        let Some(name) = self.definition_name(Mode::Word) else {
            return;
        };
        let next = self.next(true, Mode::PlainWord);
        if !(next.is(TokenKind::PlainWord) && next.literal_or_empty() == "as") {
            self.reports.error("Expected 'as'");
            self.try_to_recover(Mode::Unexpected, None, true, true);
            return;
        }

        let mut specs = Vec::new();
        let mut invalid = false;
        loop {
            match self.operator_property() {
                Some(spec) => specs.push(spec),
                None => invalid = true,
            }
            self.discard();
            let next = self.next(true, Mode::PlainWord);
            if next.is(TokenKind::PlainWord) && next.literal_or_empty() == "and" {
                continue;
            }
            let alias = if next.is(TokenKind::Colon) {
                let next = self.next(true, Mode::Value);
                if next.literal.is_none() {
                    self.reports.error("Expected literal");
                    self.try_to_recover(Mode::Unexpected, None, true, true);
                    return;
                }
                next.literal
            } else {
                self.reset(next.is_literal());
                None
            };
            if !invalid {
                for spec in &specs {
                    self.register_operator(&name, keyword, spec, alias.clone(), start);
                }
            }
            self.expect_stmt_end("Expected ',' or newline after operator statement");
            return;
        }
    }

    fn register_operator(
        &mut self,
        name: &str,
        keyword: bool,
        spec: &OperatorSpec,
        alias: Option<String>,
        start: usize,
    ) {
        let operator = match OperatorDefinition::new(
            name,
            keyword,
            spec.operator_type,
            alias,
            spec.property,
            spec.priority,
        ) {
            Ok(operator) => operator,
            Err(err) => {
                self.reports.error_at(&err.to_string(), Some(start));
                return;
            }
        };
        let result = self.import_definition.operators.add(operator.clone());
        if result.is_accepted() {
            self.definition.operators.add(operator);
            return;
        }
        let message = result.message(&operator);
        if self.config.allow_invalid_operator_registration {
            self.reports.warn_at(&message, Some(start));
            self.import_definition.operators.replace(operator.clone());
            self.definition.operators.replace(operator);
        } else {
            self.reports.error_at(&message, Some(start));
        }
    }

    fn operator_property(&mut self) -> Option<OperatorSpec> {
        let mut operator_type: Option<OperatorType> = None;
        let mut properties: Vec<&'static str> = Vec::new();
        let mut priority = None;
        let mut invalid = false;
        loop {
            self.discard();
            let next = self.next(false, Mode::PlainWord);
            let word = next.keyword_or_empty();
            let new_type = match word {
                "binary" => Some(OperatorType::Binary),
                "prefix" => Some(OperatorType::Prefix),
                "postfix" => Some(OperatorType::Postfix),
                _ => None,
            };
            let new_property = match word {
                "left-associative" => Some("left-associative"),
                "right-associative" => Some("right-associative"),
                "accessor" => Some("accessor"),
                _ => None,
            };
            if let Some(t) = new_type {
                match operator_type {
                    Some(existing) => {
                        self.reports
                            .error(&format!("Operator type defined twice: '{existing}' and '{t}'"));
                        invalid = true;
                    }
                    None => operator_type = Some(t),
                }
                continue;
            }
            if let Some(p) = new_property {
                if properties.contains(&p) {
                    self.reports.error(&format!("'{p}' defined twice"));
                    invalid = true;
                } else {
                    properties.push(p);
                }
                continue;
            }
            match word {
                "and" => {
                    self.reset(false);
                    break;
                }
                "" => {}
                _ => {
                    self.reports.error(
                        "Unknown operator property; 'binary', 'prefix', 'postfix', \
                         'left-associative', 'right-associative' or 'accessor' expected",
                    );
                    continue;
                }
            }
            match next.kind {
                TokenKind::LParen => {
                    self.discard();
                    match self.next(true, Mode::Value).as_number() {
                        Some(n) => {
                            priority = Some(n);
                            self.expect_next(TokenKind::RParen);
                        }
                        None => {
                            self.reports.error("Number expected");
                            self.reset(false);
                            self.try_to_recover(
                                Mode::Unexpected,
                                Some(TokenKind::RParen),
                                false,
                                false,
                            );
                            invalid = true;
                        }
                    }
                    break;
                }
                TokenKind::Colon | TokenKind::Br | TokenKind::Comma => {
                    self.reset(false);
                    break;
                }
                TokenKind::Eof => break,
                _ => {
                    self.reports.error("Expected keyword");
                    self.try_to_recover(Mode::Unexpected, None, true, true);
                    break;
                }
            }
        }
        if invalid {
            return None;
        }

        let has = |p: &str| properties.contains(&p);
        let Some(operator_type) = operator_type else {
            self.reports
                .error("Missing operator type; needs either 'binary', 'prefix' or 'postfix'");
            return None;
        };
        let message = if !properties.is_empty() && operator_type != OperatorType::Binary {
            Some("Prefix and postfix operators cannot have additional properties")
        } else if has("left-associative") && has("right-associative") {
            Some("'left-associative' and 'right-associative' at the same place")
        } else if has("right-associative") && has("accessor") {
            Some("Cannot be 'right-associative' and 'accessor' at the same time")
        } else {
            None
        };
        if let Some(message) = message {
            self.reports.error(message);
            return None;
        }
        let property = if has("right-associative") {
            OperatorProperty::RightAssociative
        } else if has("accessor") {
            OperatorProperty::Accessor
        } else {
            OperatorProperty::None
        };
        Some(OperatorSpec {
            operator_type,
            property,
            priority,
        })
    }

    fn undef(&mut self, start: usize) {
        let next = self.next(true, Mode::PlainWord);
        match next.keyword_or_empty() {
            "macro" => self.undef_macro(false),
            "fn" => self.undef_macro(true),
            "operator" => self.undef_operator(false),
            "keyword" => self.undef_operator(true),
            "use" => self.undef_use(start),
            _ => {
                self.reports.error("Expected 'macro', 'operator' or 'keyword'");
                self.try_to_recover(Mode::Unexpected, None, true, true);
                return;
            }
        }
        self.expect_stmt_end("Expected ',' or newline after undef statement");
    }

    fn undef_macro(&mut self, function: bool) {
        let Some(name) = self.definition_name(Mode::MacroName) else {
            return;
        };
        self.discard();
        let next = self.next(false, Mode::PlainWord);
        let kind = match next.kind {
            TokenKind::Br | TokenKind::Eof | TokenKind::Comma => {
                self.reset(false);
                MacroKind::Const
            }
            TokenKind::LBrace => {
                self.expect_next(TokenKind::RBrace);
                MacroKind::Object
            }
            TokenKind::LBracket => {
                self.expect_next(TokenKind::RBracket);
                MacroKind::List
            }
            TokenKind::LParen => {
                self.expect_next(TokenKind::RParen);
                MacroKind::Operation
            }
            _ => {
                self.reports.error("Expected '{', '[', '(' or end of statement");
                self.skip_until_line_break();
                return;
            }
        };
        let kind = if function { kind.as_function() } else { kind };
        self.definition.macros.remove_named(&name, kind);
        self.import_definition.macros.remove_named(&name, kind);
    }

    fn undef_operator(&mut self, keyword: bool) {
        let Some(name) = self.definition_name(Mode::Word) else {
            return;
        };
        self.definition.operators.remove(&name, keyword);
        self.import_definition.operators.remove(&name, keyword);
    }

    fn undef_use(&mut self, start: usize) {
        let next = self.next(false, Mode::Value);
        let Some(path) = next.literal else {
            self.reports.error("Expected path");
            self.try_to_recover(Mode::Unexpected, None, true, true);
            return;
        };
        let Some(imported) = self
            .imports
            .resolve_definition(&path, &mut ReportAt::new(&mut self.reports, Some(start)))
        else {
            return;
        };
        debug!(%path, "removing imported definitions");
        for signature in imported.macros.all_signatures() {
            self.import_definition.macros.remove(signature);
            self.definition.macros.remove(signature);
        }
        for name in imported.operators.all_operator_names() {
            self.import_definition
                .operators
                .remove(name.name(), name.is_keyword());
            self.definition.operators.remove(name.name(), name.is_keyword());
        }
    }

    fn use_statement(&mut self, start: usize) {
        self.discard();
        let next = self.next(false, Mode::PlainWord);
        let public = next.keyword_or_empty() == "public";
        if !public {
            self.reset(true);
        }
        let next = self.next(false, Mode::Value);
        let Some(path) = next.literal else {
            self.reports.error("Expected path");
            self.skip_until_line_break();
            return;
        };
        let Some(imported) = self
            .imports
            .resolve_definition(&path, &mut ReportAt::new(&mut self.reports, Some(start)))
        else {
            return;
        };
        debug!(%path, public, "importing definitions");
        copy_definitions(
            &imported,
            &mut self.import_definition,
            &mut ReportAt::new(&mut self.reports, Some(start)),
            true,
        );
        if public {
            copy_definitions(&imported, &mut self.definition, &mut Silent, false);
        }
        self.expect_stmt_end("Expected ',' or newline after use statement");
    }

    fn expect_next(&mut self, kind: TokenKind) {
        if !self.next(true, Mode::Unexpected).is(kind) {
            self.reports.error(&format!("Expected {}", kind.friendly_name()));
            self.try_to_recover(Mode::Unexpected, Some(kind), false, false);
        }
    }

    // ------------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------------

    fn expr_or_error(&mut self, template: &mut Option<TemplateBuilder>) -> Among {
        self.expr(template).unwrap_or_else(Among::error_sentinel)
    }

    fn expr(&mut self, template: &mut Option<TemplateBuilder>) -> Option<Among> {
        self.discard();
        if let Some(value) = self.nameable(false, template) {
            return Some(value);
        }
        self.reset(true);
        let next = self.next(true, Mode::Value);
        let Some(literal) = next.literal.clone() else {
            self.reports.error("Expected value");
            self.reset(true);
            return None;
        };
        Some(self.primitive(literal, &next, template))
    }

    fn primitive(
        &mut self,
        literal: String,
        token: &Token,
        template: &mut Option<TemplateBuilder>,
    ) -> Among {
        let mut value = Among::value(literal).with_source_position(token.start);
        if token.is(TokenKind::QuotedPrimitive) || self.resolve_param_ref(&mut value, template) {
            value
        } else {
            self.macro_call(value, MacroKind::Const, token.start, template)
        }
    }

    fn resolve_param_ref(
        &mut self,
        target: &mut Among,
        template: &mut Option<TemplateBuilder>,
    ) -> bool {
        match template {
            Some(template) => template.resolve_param_ref(target, &mut self.reports),
            None => false,
        }
    }

    /// Reads a collection, named or not, or returns `None` with the tokens rewound.
    fn nameable(
        &mut self,
        operation: bool,
        template: &mut Option<TemplateBuilder>,
    ) -> Option<Among> {
        self.discard();
        let next = self.next(true, if operation { Mode::Operation } else { Mode::Value });
        match next.kind {
            TokenKind::LBrace => return Some(self.obj(None, next.start, template).into()),
            TokenKind::LBracket => return Some(self.list(None, next.start, template).into()),
            TokenKind::LParen => {
                let operation = self.oper(None, next.start, template);
                return if operation.len() == 1 {
                    operation.into_elements().into_iter().next()
                } else {
                    Some(operation.into())
                };
            }
            _ => {}
        }
        let Some(name) = next.literal.clone() else {
            self.reset(false);
            return None;
        };
        let (mut value, kind): (Among, _) = match self.next(operation, Mode::Unexpected).kind {
            TokenKind::LBrace => {
                (self.obj(Some(name), next.start, template).into(), MacroKind::Object)
            }
            TokenKind::LBracket => {
                (self.list(Some(name), next.start, template).into(), MacroKind::List)
            }
            TokenKind::LParen => {
                (self.oper(Some(name), next.start, template).into(), MacroKind::Operation)
            }
            _ => {
                self.reset(true);
                return None;
            }
        };
        if next.is(TokenKind::QuotedPrimitive) || self.resolve_param_ref(&mut value, template) {
            Some(value)
        } else {
            Some(self.macro_call(value, kind, next.start, template))
        }
    }

    fn obj(
        &mut self,
        name: Option<String>,
        start: usize,
        template: &mut Option<TemplateBuilder>,
    ) -> AmongObject {
        let mut object = Among::named_object(name.unwrap_or_default());
        object.set_source_position(Some(start));
        loop {
            let key_token = self.next(true, Mode::Key);
            match key_token.kind {
                TokenKind::Eof => {
                    self.reports.error("Unterminated object");
                    break;
                }
                TokenKind::RBrace => break,
                TokenKind::Comma => {
                    self.reports.error("Redundant comma");
                    continue;
                }
                _ => {}
            }
            let Some(key) = key_token.literal.clone() else {
                self.reports.error("Expected property key");
                if self.try_to_recover(Mode::Key, Some(TokenKind::RBrace), true, true) {
                    break;
                }
                continue;
            };

            self.discard();
            if !self.next(true, Mode::Unexpected).is(TokenKind::Colon) {
                self.reports.error("Expected ':' after property key");
                self.reset(false);
                if self.try_to_recover(Mode::Unexpected, Some(TokenKind::RBrace), true, true) {
                    break;
                }
                continue;
            }
            let duplicate = object.has_property(&key);
            if duplicate {
                let kind = if self.config.allow_duplicate_object_property {
                    ReportKind::Warn
                } else {
                    ReportKind::Error
                };
                self.reports.report(
                    kind,
                    &format!("Property '{key}' is already defined"),
                    Some(key_token.start),
                    &[],
                );
            }

            let value = self.expr_or_error(template);
            if !duplicate {
                object.set(key, value);
            }
            let next = self.next(false, Mode::Unexpected);
            match next.kind {
                TokenKind::Br => {
                    self.discard();
                    if !self.next(true, Mode::Key).is(TokenKind::Comma) {
                        self.reset(false);
                    }
                }
                TokenKind::Comma => {}
                TokenKind::Eof => {
                    self.reports.error("Unterminated object");
                    break;
                }
                TokenKind::RBrace => break,
                _ => {
                    self.reports.error(
                        "Each object property should be separated with either line breaks or ','",
                    );
                    if self.try_to_recover(Mode::Key, Some(TokenKind::RBrace), true, true) {
                        break;
                    }
                }
            }
        }
        object
    }

    fn list(
        &mut self,
        name: Option<String>,
        start: usize,
        template: &mut Option<TemplateBuilder>,
    ) -> AmongList {
        let mut list = Among::named_list(name.unwrap_or_default());
        list.set_source_position(Some(start));
        loop {
            self.discard();
            let next = self.next(true, Mode::Unexpected);
            match next.kind {
                TokenKind::Eof => {
                    self.reports.error("Unterminated list");
                    break;
                }
                TokenKind::RBracket => break,
                TokenKind::Comma => {
                    self.reports.error("Redundant comma");
                    continue;
                }
                _ => {}
            }
            self.reset(next.is(TokenKind::Error));
            if let Some(value) = self.expr(template) {
                list.push(value);
            }
            let next = self.next(false, Mode::Unexpected);
            match next.kind {
                TokenKind::Br => {
                    self.discard();
                    let next = self.next(true, Mode::Unexpected);
                    if !next.is(TokenKind::Comma) {
                        self.reset(next.is(TokenKind::Error));
                    }
                }
                TokenKind::Comma => {}
                TokenKind::Eof => {
                    self.reports.error("Unterminated list");
                    break;
                }
                TokenKind::RBracket => break,
                _ => {
                    self.reports
                        .error("Each value should be separated with either line breaks or ','");
                    if self.try_to_recover(Mode::Value, Some(TokenKind::RBracket), true, true) {
                        break;
                    }
                }
            }
        }
        list
    }

    fn oper(
        &mut self,
        name: Option<String>,
        start: usize,
        template: &mut Option<TemplateBuilder>,
    ) -> AmongList {
        let mut list = Among::named_operation(name.unwrap_or_default());
        list.set_source_position(Some(start));
        let groups = self.import_definition.operators.priority_groups();
        loop {
            self.discard();
            match self.next(true, Mode::Operation).kind {
                TokenKind::Eof => {
                    self.reports.error("Unterminated operation");
                    break;
                }
                TokenKind::RParen => break,
                TokenKind::Comma => {
                    self.reports.error("Redundant comma");
                    continue;
                }
                _ => {}
            }
            self.reset(false);
            let term = self.operation_expression(&groups, 0, template);
            list.push(term);
            self.discard();
            match self.next(false, Mode::Operation).kind {
                TokenKind::Br => {
                    self.discard();
                    if !self.next(true, Mode::Operation).is(TokenKind::Comma) {
                        self.reset(false);
                    }
                }
                TokenKind::Comma => {}
                TokenKind::Eof => {
                    self.reports.error("Unterminated operation");
                    break;
                }
                TokenKind::RParen => break,
                _ => {
                    self.reports
                        .error("Each term should be separated with either line breaks or ','");
                    self.reset(false);
                }
            }
        }
        list
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    fn operation_expression(
        &mut self,
        groups: &[PriorityGroup],
        i: usize,
        template: &mut Option<TemplateBuilder>,
    ) -> Among {
        if let Some(group) = groups.get(i) {
            return match group.operator_type() {
                OperatorType::Binary if group.is_right_associative() => {
                    self.right_associative_binary(groups, i, template)
                }
                OperatorType::Binary => self.binary(groups, i, template),
                OperatorType::Postfix => self.postfix(groups, i, template),
                OperatorType::Prefix => self.prefix(groups, i, template),
            };
        }

        self.discard();
        if let Some(value) = self.nameable(true, template) {
            return value;
        }
        self.reset(false);
        let next = self.next(true, Mode::Operation);
        let Some(literal) = next.literal.clone() else {
            self.reports.error("Expected value");
            self.reset(false);
            if self.try_to_recover(Mode::Unexpected, Some(TokenKind::RParen), true, true) {
                self.reset(false);
            }
            return Among::error_sentinel();
        };
        self.primitive(literal, &next, template)
    }

    fn binary(
        &mut self,
        groups: &[PriorityGroup],
        i: usize,
        template: &mut Option<TemplateBuilder>,
    ) -> Among {
        let mut a = self.operation_expression(groups, i + 1, template);
        loop {
            self.discard();
            let next = self.next(false, Mode::Operation);
            let Some(op) = operator_in(&groups[i], &next) else {
                self.reset(false);
                return a;
            };
            let b = self.operation_expression(groups, i + 1, template);
            a = if op.is_accessor() {
                self.accessor_call(a, b, &op, next.start, template)
            } else {
                let mut operation = Among::named_operation(op.alias_or_name()).with(a).with(b);
                operation.set_source_position(Some(next.start));
                self.macro_call(operation.into(), MacroKind::Operation, next.start, template)
            };
        }
    }

    /// `a.b` becomes an access call `b[a]`; `a.f[x]` becomes a function call `f[a, [x]]`.
    fn accessor_call(
        &mut self,
        a: Among,
        b: Among,
        op: &OperatorDefinition,
        position: usize,
        template: &mut Option<TemplateBuilder>,
    ) -> Among {
        let (call, kind) = match b {
            Among::Primitive(p) => {
                let name = format!("{}{}", op.alias_or_name(), p.value());
                let call = Among::named_list(name).with(a);
                (call, MacroKind::Access)
            }
            mut args => {
                let name = format!("{}{}", op.alias_or_name(), args.name().unwrap_or_default());
                let kind = if args.is_object() {
                    MacroKind::ObjectFn
                } else if args.is_operation() {
                    MacroKind::OperationFn
                } else {
                    MacroKind::ListFn
                };
                args.set_name("");
                args.set_mark(None);
                (Among::named_list(name).with(a).with(args), kind)
            }
        };
        let mut call: Among = call.into();
        call.set_source_position(Some(position));
        self.macro_call(call, kind, position, template)
    }

    fn right_associative_binary(
        &mut self,
        groups: &[PriorityGroup],
        i: usize,
        template: &mut Option<TemplateBuilder>,
    ) -> Among {
        let a = self.operation_expression(groups, i + 1, template);
        self.discard();
        let next = self.next(false, Mode::Operation);
        let Some(op) = operator_in(&groups[i], &next) else {
            self.reset(false);
            return a;
        };
        let b = self.right_associative_binary(groups, i, template);
        let mut operation = Among::named_operation(op.alias_or_name()).with(a).with(b);
        operation.set_source_position(Some(next.start));
        self.macro_call(operation.into(), MacroKind::Operation, next.start, template)
    }

    fn postfix(
        &mut self,
        groups: &[PriorityGroup],
        i: usize,
        template: &mut Option<TemplateBuilder>,
    ) -> Among {
        let mut a = self.operation_expression(groups, i + 1, template);
        loop {
            self.discard();
            let next = self.next(false, Mode::Operation);
            let Some(op) = operator_in(&groups[i], &next) else {
                self.reset(false);
                return a;
            };
            let mut operation = Among::named_operation(op.alias_or_name()).with(a);
            operation.set_source_position(Some(next.start));
            a = self.macro_call(operation.into(), MacroKind::Operation, next.start, template);
        }
    }

    fn prefix(
        &mut self,
        groups: &[PriorityGroup],
        i: usize,
        template: &mut Option<TemplateBuilder>,
    ) -> Among {
        self.discard();
        let next = self.next(true, Mode::Operation);
        if let Some(op) = operator_in(&groups[i], &next) {
            let operand = self.prefix(groups, i, template);
            let mut operation = Among::named_operation(op.alias_or_name()).with(operand);
            operation.set_source_position(Some(next.start));
            return self.macro_call(operation.into(), MacroKind::Operation, next.start, template);
        }
        self.reset(false);
        self.operation_expression(groups, i + 1, template)
    }

    // ------------------------------------------------------------------------
    // Macro expansion
    // ------------------------------------------------------------------------

    /// Expands `target` with the matching macro, or records the call inside a macro body.
    ///
    /// Returns `target` unchanged when no macro of that name and kind exists, and the error
    /// sentinel when one exists but cannot be applied.
    fn macro_call(
        &mut self,
        mut target: Among,
        kind: MacroKind,
        position: usize,
        template: &mut Option<TemplateBuilder>,
    ) -> Among {
        let name = match &target {
            Among::Primitive(p) => p.value().to_string(),
            other => other.name().unwrap_or_default().to_string(),
        };
        let Some(group) = self.import_definition.macros.group_for(&name, kind).cloned() else {
            return target;
        };
        let found = group.search(&target, &mut ReportAt::new(&mut self.reports, Some(position)));
        let Some(m) = found else {
            return Among::error_sentinel();
        };
        if let Some(template) = template {
            template.resolve_macro_call(m, &mut target);
            return target;
        }
        trace!(signature = %m.signature(), position, "expanding macro");
        let copy_constant = self.config.copy_macro_constant;
        let reports = &mut self.reports;
        let applied = panic::catch_unwind(AssertUnwindSafe(|| {
            m.apply(&target, copy_constant, &mut ReportAt::new(reports, Some(position)))
        }))
        .unwrap_or_else(|payload| {
            Err(AmongError::macro_fault(&name, panic_message(payload.as_ref())))
        });
        match applied {
            Ok(Some(mut value)) => {
                if value.source_position().is_none() {
                    value.set_source_position(Some(position));
                }
                value
            }
            Ok(None) => Among::error_sentinel(),
            Err(err) => {
                let detail = err.to_string();
                self.reports.report(
                    ReportKind::Error,
                    "Unexpected error on macro processing",
                    Some(position),
                    &[detail.as_str()],
                );
                Among::error_sentinel()
            }
        }
    }

    // ------------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------------

    fn recover(&mut self, mode: Mode) {
        self.try_to_recover(mode, None, false, true);
    }

    /// Skips tokens until `closure` (returns `true`), or until a comma or line break when asked
    /// to stop there, or end of file (returns `false`). Collections met on the way are parsed and
    /// thrown away so their brackets stay balanced.
    fn try_to_recover(
        &mut self,
        mode: Mode,
        closure: Option<TokenKind>,
        return_on_comma: bool,
        return_on_line_break: bool,
    ) -> bool {
        let previous = std::mem::replace(&mut self.reports.recovering, true);
        let found = loop {
            self.discard();
            let kind = self.next(false, mode).kind;
            match kind {
                TokenKind::Br if !return_on_line_break => continue,
                TokenKind::Br | TokenKind::Eof => break false,
                TokenKind::Comma if return_on_comma => break false,
                TokenKind::Comma => continue,
                TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => {
                    self.reset(false);
                    self.nameable(false, &mut None);
                }
                kind if Some(kind) == closure => break true,
                _ => {}
            }
        };
        self.reports.recovering = previous;
        found
    }

    fn skip_until_line_break(&mut self) {
        while !matches!(self.next(false, Mode::Word).kind, TokenKind::Br | TokenKind::Eof) {}
    }
}

fn closing_bracket(kind: MacroKind) -> Option<TokenKind> {
    match kind.brackets()? {
        ('{', _) => Some(TokenKind::RBrace),
        ('[', _) => Some(TokenKind::RBracket),
        _ => Some(TokenKind::RParen),
    }
}

fn operator_in(group: &PriorityGroup, token: &Token) -> Option<OperatorDefinition> {
    if !token.is_operator_or_keyword() {
        return None;
    }
    group
        .get(token.literal_or_empty(), token.is(TokenKind::Keyword))
        .cloned()
}

fn copy_definitions(
    from: &AmongDefinition,
    to: &mut AmongDefinition,
    reports: &mut dyn ReportHandler,
    warn: bool,
) {
    for m in from.macros.all_macros() {
        to.macros.add(m, reports);
    }
    for operator in from.operators.all_operators() {
        let result = to.operators.add(operator.clone());
        if warn && !result.is_accepted() {
            reports.warn(&format!(
                "Cannot import operator definition '{operator}':\n  {}",
                result.message(operator)
            ));
        }
    }
}

/// Text of a caught panic payload, when it carries one.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "panicked".to_string()
    }
}
