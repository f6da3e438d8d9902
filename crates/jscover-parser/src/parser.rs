//! Recursive descent parser implementation

use jscover_ast::*;
use jscover_lexer::{parse_number, string_value, unescape, Token, TokenKind};

use crate::{ParseError, ParseOptions};

/// What the enclosing code allows
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    top_level: bool,
    in_function: bool,
    in_async: bool,
    in_generator: bool,
    in_method: bool,
    allow_in: bool,
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    comments: Vec<Comment>,
    options: &'a ParseOptions,
    pos: usize,
    prev_end: usize,
    next_node_id: u32,
    ctx: Context,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<Token>, options: &'a ParseOptions) -> Self {
        let mut significant = Vec::with_capacity(tokens.len());
        let mut comments = Vec::new();
        for token in tokens {
            match token.kind {
                TokenKind::LineComment => comments.push(Comment {
                    kind: CommentKind::Line,
                    text: token.text(source)[2..].to_string(),
                    span: token.span,
                }),
                TokenKind::BlockComment => {
                    let text = token.text(source);
                    comments.push(Comment {
                        kind: CommentKind::Block,
                        text: text[2..text.len() - 2].to_string(),
                        span: token.span,
                    });
                }
                _ => significant.push(token),
            }
        }

        Self {
            source,
            tokens: significant,
            comments,
            options,
            pos: 0,
            prev_end: 0,
            next_node_id: 0,
            ctx: Context {
                top_level: true,
                allow_in: true,
                ..Context::default()
            },
        }
    }

    // === Utilities ===

    fn current(&self) -> &Token {
        // `tokenize` always ends with EOF, so `last()` only fails on an empty vector
        static EOF: Token = Token {
            kind: TokenKind::Eof,
            span: Span { start: 0, end: 0 },
            newline_before: false,
        };
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_ahead(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len().saturating_sub(1) {
            self.pos += 1;
        }
        self.prev_end = token.span.end;
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.peek())
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::unexpected(expected, self.peek(), self.span())
    }

    fn text(&self, token: &Token) -> &'a str {
        token.text(self.source)
    }

    fn span(&self) -> Span {
        self.current().span
    }

    fn start(&self) -> usize {
        self.current().span.start
    }

    /// Span from `start` to the end of the last consumed token
    fn finish(&self, start: usize) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    fn newline_before(&self) -> bool {
        self.current().newline_before
    }

    /// Is the current token the contextual keyword `word`?
    fn at_word(&self, word: &str) -> bool {
        self.at(TokenKind::Ident) && self.text(self.current()) == word
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", word)))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        let token = self.consume(TokenKind::Ident)?;
        Ok(self.text(&token).to_string())
    }

    /// Identifier or keyword, as allowed after `.` and in property keys
    fn expect_ident_name(&mut self) -> Result<String, ParseError> {
        if self.peek().is_identifier_name() {
            let token = self.advance();
            Ok(self.text(&token).to_string())
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    /// Statement terminator with automatic semicolon insertion
    fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat(TokenKind::Semicolon)
            || self.at_any(&[TokenKind::RBrace, TokenKind::Eof])
            || self.newline_before()
        {
            Ok(())
        } else {
            Err(self.unexpected("';'"))
        }
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn with_context<T>(
        &mut self,
        ctx: Context,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.ctx, ctx);
        let result = f(self);
        self.ctx = saved;
        result
    }

    /// Run `f` with `in` allowed or forbidden as a binary operator
    fn with_in<T>(
        &mut self,
        allow_in: bool,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let ctx = Context {
            allow_in,
            ..self.ctx
        };
        self.with_context(ctx, f)
    }

    fn nested(&self) -> Context {
        Context {
            top_level: false,
            ..self.ctx
        }
    }

    fn require_plugin(&self, plugin: &str, span: Span) -> Result<(), ParseError> {
        if self.options.has_plugin(plugin) {
            Ok(())
        } else {
            Err(ParseError::PluginRequired {
                plugin: plugin.to_string(),
                span,
            })
        }
    }

    // === Program ===

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();

        while !self.at(TokenKind::Eof) {
            body.push(self.parse_statement_list_item()?);
        }

        Ok(Program {
            body,
            comments: std::mem::take(&mut self.comments),
            source_type: self.options.source_type,
            span: Span::new(0, self.source.len()),
        })
    }

    fn parse_statement_list_item(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::Class | TokenKind::At => self.parse_class_declaration(),
            TokenKind::Const => self.parse_var_statement(),
            TokenKind::Import
                if !matches!(self.peek_ahead(1), TokenKind::LParen | TokenKind::Dot) =>
            {
                self.parse_import()
            }
            TokenKind::Export => self.parse_export(),
            TokenKind::Ident if self.at_let_declaration() => self.parse_var_statement(),
            TokenKind::Ident if self.at_async_function() => self.parse_function_declaration(),
            _ => self.parse_statement(),
        }
    }

    fn at_let_declaration(&self) -> bool {
        self.at_word("let")
            && matches!(
                self.peek_ahead(1),
                TokenKind::Ident | TokenKind::LBracket | TokenKind::LBrace
            )
    }

    fn at_async_function(&self) -> bool {
        self.at_word("async")
            && self.peek_ahead(1) == TokenKind::Function
            && !self.tokens.get(self.pos + 1).map_or(false, |t| t.newline_before)
    }

    fn check_module_item(&self, span: Span) -> Result<(), ParseError> {
        let in_module = self.options.source_type == SourceType::Module && self.ctx.top_level;
        if in_module || self.options.allow_import_export_everywhere {
            Ok(())
        } else {
            Err(ParseError::ModuleItemNotAllowed { span })
        }
    }

    // === Statements ===

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        let ctx = self.nested();
        let kind = self.with_context(ctx, |p| p.parse_statement_kind())?;
        Ok(Stmt::new(kind, self.finish(start)))
    }

    fn parse_statement_kind(&mut self) -> Result<StmtKind, ParseError> {
        match self.peek() {
            TokenKind::LBrace => Ok(StmtKind::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                self.advance();
                Ok(StmtKind::Empty)
            }
            TokenKind::Var => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon()?;
                Ok(StmtKind::Var(decl))
            }
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => {
                self.advance();
                let test = self.parse_paren_expr()?;
                let body = Box::new(self.parse_statement()?);
                Ok(StmtKind::While { test, body })
            }
            TokenKind::Do => {
                self.advance();
                let body = Box::new(self.parse_statement()?);
                self.consume(TokenKind::While)?;
                let test = self.parse_paren_expr()?;
                // `do ... while (x)` never needs a semicolon after it
                self.eat(TokenKind::Semicolon);
                Ok(StmtKind::DoWhile { body, test })
            }
            TokenKind::Break | TokenKind::Continue => {
                let keyword = self.advance();
                let label = if self.at(TokenKind::Ident) && !self.newline_before() {
                    Some(self.expect_ident()?)
                } else {
                    None
                };
                self.consume_semicolon()?;
                Ok(if keyword.kind == TokenKind::Break {
                    StmtKind::Break(label)
                } else {
                    StmtKind::Continue(label)
                })
            }
            TokenKind::Return => self.parse_return(),
            TokenKind::Throw => {
                self.advance();
                if self.newline_before() {
                    return Err(ParseError::InvalidExpression { span: self.span() });
                }
                let arg = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(StmtKind::Throw(arg))
            }
            TokenKind::Try => self.parse_try(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Debugger => {
                self.advance();
                self.consume_semicolon()?;
                Ok(StmtKind::Debugger)
            }
            TokenKind::Function => {
                let function = self.parse_function(self.start(), false, true)?;
                Ok(StmtKind::Function(Box::new(function)))
            }
            TokenKind::Class | TokenKind::At => {
                let class = self.parse_class(true)?;
                Ok(StmtKind::Class(Box::new(class)))
            }
            TokenKind::Const => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon()?;
                Ok(StmtKind::Var(decl))
            }
            TokenKind::Import
                if !matches!(self.peek_ahead(1), TokenKind::LParen | TokenKind::Dot) =>
            {
                Ok(self.parse_import()?.kind)
            }
            TokenKind::Export => Ok(self.parse_export()?.kind),
            TokenKind::Ident if self.at_let_declaration() => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon()?;
                Ok(StmtKind::Var(decl))
            }
            TokenKind::Ident if self.at_async_function() => {
                let start = self.advance().span.start;
                let function = self.parse_function(start, true, true)?;
                Ok(StmtKind::Function(Box::new(function)))
            }
            TokenKind::Ident if self.peek_ahead(1) == TokenKind::Colon => {
                let label = self.expect_ident()?;
                self.advance();
                let body = Box::new(self.parse_statement()?);
                Ok(StmtKind::Labeled { label, body })
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(StmtKind::Expr(expr))
            }
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.consume(TokenKind::LBrace)?;
        let ctx = self.nested();
        let stmts = self.with_context(ctx, |p| {
            let mut stmts = Vec::new();
            while !p.at_any(&[TokenKind::RBrace, TokenKind::Eof]) {
                stmts.push(p.parse_statement_list_item()?);
            }
            Ok(stmts)
        })?;
        self.consume(TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_paren_expr(&mut self) -> Result<Expr, ParseError> {
        self.consume(TokenKind::LParen)?;
        let expr = self.with_in(true, |p| p.parse_expression())?;
        self.consume(TokenKind::RParen)?;
        Ok(expr)
    }

    fn parse_var_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        let decl = self.parse_var_decl()?;
        self.consume_semicolon()?;
        Ok(Stmt::new(StmtKind::Var(decl), self.finish(start)))
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl, ParseError> {
        let start = self.start();
        let kind = match self.peek() {
            TokenKind::Var => VarKind::Var,
            TokenKind::Const => VarKind::Const,
            _ if self.at_word("let") => VarKind::Let,
            _ => return Err(self.unexpected("declaration")),
        };
        self.advance();

        let mut declarations = Vec::new();
        loop {
            let decl_start = self.start();
            let id = self.parse_binding_target()?;
            let init = if self.eat(TokenKind::Eq) {
                Some(self.parse_assign()?)
            } else {
                None
            };
            declarations.push(VarDeclarator {
                id,
                init,
                span: self.finish(decl_start),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        Ok(VarDecl {
            kind,
            declarations,
            span: self.finish(start),
        })
    }

    fn parse_if(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenKind::If)?;
        let test = self.parse_paren_expr()?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_for(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenKind::For)?;
        let is_await = self.eat_word("await");
        self.consume(TokenKind::LParen)?;

        let init = if self.at(TokenKind::Semicolon) {
            None
        } else if self.at_any(&[TokenKind::Var, TokenKind::Const]) || self.at_let_declaration() {
            let decl = self.with_in(false, |p| p.parse_var_decl())?;
            if decl.declarations.len() == 1 && (self.at(TokenKind::In) || self.at_word("of")) {
                return self.parse_for_in_of(ForHead::Var(decl), is_await);
            }
            Some(ForInit::Var(decl))
        } else {
            let expr = self.with_in(false, |p| p.parse_expression())?;
            if self.at(TokenKind::In) || self.at_word("of") {
                check_assign_target(&expr, true)?;
                return self.parse_for_in_of(ForHead::Target(expr), is_await);
            }
            Some(ForInit::Expr(expr))
        };

        self.consume(TokenKind::Semicolon)?;
        let test = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.with_in(true, |p| p.parse_expression())?)
        };
        self.consume(TokenKind::Semicolon)?;
        let update = if self.at(TokenKind::RParen) {
            None
        } else {
            Some(self.with_in(true, |p| p.parse_expression())?)
        };
        self.consume(TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(StmtKind::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_for_in_of(&mut self, left: ForHead, is_await: bool) -> Result<StmtKind, ParseError> {
        if self.eat(TokenKind::In) {
            let right = self.with_in(true, |p| p.parse_expression())?;
            self.consume(TokenKind::RParen)?;
            let body = Box::new(self.parse_statement()?);
            return Ok(StmtKind::ForIn { left, right, body });
        }
        self.expect_word("of")?;
        let right = self.with_in(true, |p| p.parse_assign())?;
        self.consume(TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::ForOf {
            left,
            right,
            body,
            is_await,
        })
    }

    fn parse_return(&mut self) -> Result<StmtKind, ParseError> {
        let keyword = self.consume(TokenKind::Return)?;
        if !self.ctx.in_function && !self.options.allow_return_outside_function {
            return Err(ParseError::ReturnOutsideFunction { span: keyword.span });
        }

        let value = if self.at_any(&[TokenKind::Semicolon, TokenKind::RBrace, TokenKind::Eof])
            || self.newline_before()
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;

        Ok(StmtKind::Return(value))
    }

    fn parse_try(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenKind::Try)?;
        let block = self.parse_block()?;

        let handler = if self.at(TokenKind::Catch) {
            let start = self.start();
            self.advance();
            let param = if self.eat(TokenKind::LParen) {
                let param = self.parse_binding_target()?;
                self.consume(TokenKind::RParen)?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause {
                param,
                body,
                span: self.finish(start),
            })
        } else {
            None
        };

        let finalizer = if self.eat(TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected("'catch' or 'finally'"));
        }

        Ok(StmtKind::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_switch(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenKind::Switch)?;
        let discriminant = self.parse_paren_expr()?;
        self.consume(TokenKind::LBrace)?;

        let mut cases = Vec::new();
        while !self.at_any(&[TokenKind::RBrace, TokenKind::Eof]) {
            let start = self.start();
            let test = if self.eat(TokenKind::Default) {
                None
            } else {
                self.consume(TokenKind::Case)?;
                Some(self.with_in(true, |p| p.parse_expression())?)
            };
            self.consume(TokenKind::Colon)?;

            let mut consequent = Vec::new();
            while !self.at_any(&[
                TokenKind::Case,
                TokenKind::Default,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]) {
                let ctx = self.nested();
                consequent.push(self.with_context(ctx, |p| p.parse_statement_list_item())?);
            }
            cases.push(SwitchCase {
                test,
                consequent,
                span: self.finish(start),
            });
        }
        self.consume(TokenKind::RBrace)?;

        Ok(StmtKind::Switch {
            discriminant,
            cases,
        })
    }

    // === Modules ===

    fn parse_import(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        let keyword = self.consume(TokenKind::Import)?;
        self.check_module_item(keyword.span)?;

        let mut specifiers = Vec::new();
        if !self.at(TokenKind::String) {
            if self.at(TokenKind::Ident) {
                specifiers.push(ImportSpecifier::Default(self.expect_ident()?));
                if !self.eat(TokenKind::Comma) {
                    return self.finish_import(start, specifiers);
                }
            }
            if self.eat(TokenKind::Star) {
                self.expect_word("as")?;
                specifiers.push(ImportSpecifier::Namespace(self.expect_ident()?));
            } else if self.eat(TokenKind::LBrace) {
                while !self.at(TokenKind::RBrace) {
                    let imported = self.parse_module_export_name()?;
                    let local = if self.eat_word("as") {
                        self.expect_ident()?
                    } else {
                        imported.clone()
                    };
                    specifiers.push(ImportSpecifier::Named { imported, local });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(TokenKind::RBrace)?;
            }
        }

        self.finish_import(start, specifiers)
    }

    fn finish_import(
        &mut self,
        start: usize,
        specifiers: Vec<ImportSpecifier>,
    ) -> Result<Stmt, ParseError> {
        if !specifiers.is_empty() {
            self.expect_word("from")?;
        }
        let source = self.parse_module_source()?;
        self.consume_semicolon()?;
        Ok(Stmt::new(
            StmtKind::Import(ImportDecl { specifiers, source }),
            self.finish(start),
        ))
    }

    fn parse_module_source(&mut self) -> Result<String, ParseError> {
        let token = self.consume(TokenKind::String)?;
        string_value(self.text(&token)).ok_or(ParseError::InvalidString { span: token.span })
    }

    /// Name in an import/export list: any identifier name or a string
    fn parse_module_export_name(&mut self) -> Result<String, ParseError> {
        if self.at(TokenKind::String) {
            self.parse_module_source()
        } else {
            self.expect_ident_name()
        }
    }

    fn parse_export(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        let keyword = self.consume(TokenKind::Export)?;
        self.check_module_item(keyword.span)?;

        let decl = match self.peek() {
            TokenKind::Default => {
                self.advance();
                if self.at(TokenKind::Function) {
                    let function = self.parse_function(self.start(), false, false)?;
                    ExportDecl::DefaultFunction(Box::new(function))
                } else if self.at_async_function() {
                    let start = self.advance().span.start;
                    ExportDecl::DefaultFunction(Box::new(self.parse_function(start, true, false)?))
                } else if self.at_any(&[TokenKind::Class, TokenKind::At]) {
                    ExportDecl::DefaultClass(Box::new(self.parse_class(false)?))
                } else {
                    let expr = self.parse_assign()?;
                    self.consume_semicolon()?;
                    ExportDecl::DefaultExpr(expr)
                }
            }
            TokenKind::Star => {
                self.advance();
                let exported = if self.eat_word("as") {
                    Some(self.parse_module_export_name()?)
                } else {
                    None
                };
                self.expect_word("from")?;
                let source = self.parse_module_source()?;
                self.consume_semicolon()?;
                ExportDecl::All { exported, source }
            }
            TokenKind::LBrace => {
                self.advance();
                let mut specifiers = Vec::new();
                while !self.at(TokenKind::RBrace) {
                    let local = self.parse_module_export_name()?;
                    let exported = if self.eat_word("as") {
                        self.parse_module_export_name()?
                    } else {
                        local.clone()
                    };
                    specifiers.push(ExportSpecifier { local, exported });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(TokenKind::RBrace)?;
                let source = if self.eat_word("from") {
                    Some(self.parse_module_source()?)
                } else {
                    None
                };
                self.consume_semicolon()?;
                ExportDecl::Named { specifiers, source }
            }
            TokenKind::Var | TokenKind::Const => {
                ExportDecl::Declaration(Box::new(self.parse_var_statement()?))
            }
            TokenKind::Function => {
                ExportDecl::Declaration(Box::new(self.parse_function_declaration()?))
            }
            TokenKind::Class | TokenKind::At => {
                ExportDecl::Declaration(Box::new(self.parse_class_declaration()?))
            }
            TokenKind::Ident if self.at_let_declaration() => {
                ExportDecl::Declaration(Box::new(self.parse_var_statement()?))
            }
            TokenKind::Ident if self.at_async_function() => {
                ExportDecl::Declaration(Box::new(self.parse_function_declaration()?))
            }
            _ => return Err(self.unexpected("declaration")),
        };

        Ok(Stmt::new(StmtKind::Export(decl), self.finish(start)))
    }

    // === Functions ===

    fn parse_function_declaration(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        let is_async = self.eat_word("async");
        let function = self.parse_function(start, is_async, true)?;
        Ok(Stmt::new(
            StmtKind::Function(Box::new(function)),
            self.finish(start),
        ))
    }

    /// `function [*] name? (params) { body }`; the `async` prefix, if any,
    /// has already been consumed and `start` points at it
    fn parse_function(
        &mut self,
        start: usize,
        is_async: bool,
        name_required: bool,
    ) -> Result<Function, ParseError> {
        self.consume(TokenKind::Function)?;
        let is_generator = self.eat(TokenKind::Star);
        let name = if self.at(TokenKind::Ident) {
            Some(self.expect_ident()?)
        } else if name_required {
            return Err(self.unexpected("function name"));
        } else {
            None
        };

        let ctx = Context {
            top_level: false,
            in_function: true,
            in_async: is_async,
            in_generator: is_generator,
            in_method: false,
            allow_in: true,
        };
        self.parse_function_rest(start, name, is_async, is_generator, ctx)
    }

    fn parse_function_rest(
        &mut self,
        start: usize,
        name: Option<String>,
        is_async: bool,
        is_generator: bool,
        ctx: Context,
    ) -> Result<Function, ParseError> {
        let id = self.next_id();
        let (params, body) = self.with_context(ctx, |p| {
            let params = p.parse_params()?;
            let body = p.parse_block()?;
            Ok((params, body))
        })?;

        Ok(Function {
            id,
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            is_async,
            is_generator,
            span: self.finish(start),
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Pattern>, ParseError> {
        self.consume(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            if self.at(TokenKind::Ellipsis) {
                let start = self.start();
                self.advance();
                let inner = self.parse_binding_target()?;
                params.push(Pattern {
                    kind: PatternKind::Rest(Box::new(inner)),
                    span: self.finish(start),
                });
                break;
            }
            params.push(self.parse_binding_element()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RParen)?;
        Ok(params)
    }

    /// Does an arrow function start at the current token?
    fn at_arrow(&self) -> bool {
        let offset = if self.at_word("async")
            && !self
                .tokens
                .get(self.pos + 1)
                .map_or(true, |t| t.newline_before)
            && matches!(self.peek_ahead(1), TokenKind::Ident | TokenKind::LParen)
        {
            1
        } else {
            0
        };

        match self.peek_ahead(offset) {
            TokenKind::Ident => self.peek_ahead(offset + 1) == TokenKind::FatArrow,
            TokenKind::LParen => {
                let mut depth = 0usize;
                let mut i = self.pos + offset;
                while let Some(token) = self.tokens.get(i) {
                    match token.kind {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return self.tokens.get(i + 1).map_or(false, |t| {
                                    t.kind == TokenKind::FatArrow && !t.newline_before
                                });
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                    i += 1;
                }
                false
            }
            _ => false,
        }
    }

    fn parse_arrow(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let is_async = self.at_word("async") && self.peek_ahead(1) != TokenKind::FatArrow && {
            self.advance();
            true
        };

        let id = self.next_id();
        let ctx = Context {
            top_level: false,
            in_function: true,
            in_async: is_async,
            in_generator: false,
            in_method: self.ctx.in_method,
            allow_in: true,
        };

        let (params, body) = self.with_context(ctx, |p| {
            let params = if p.at(TokenKind::Ident) {
                let token = p.advance();
                vec![Pattern {
                    kind: PatternKind::Ident(p.text(&token).to_string()),
                    span: token.span,
                }]
            } else {
                p.parse_params()?
            };
            p.consume(TokenKind::FatArrow)?;
            let body = if p.at(TokenKind::LBrace) {
                FunctionBody::Block(p.parse_block()?)
            } else {
                FunctionBody::Expr(Box::new(p.parse_assign()?))
            };
            Ok((params, body))
        })?;

        let span = self.finish(start);
        Ok(Expr::new(
            ExprKind::Arrow(Box::new(Function {
                id,
                name: None,
                params,
                body,
                is_arrow: true,
                is_async,
                is_generator: false,
                span,
            })),
            span,
        ))
    }

    // === Classes ===

    fn parse_class_declaration(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        let class = self.parse_class(true)?;
        Ok(Stmt::new(StmtKind::Class(Box::new(class)), self.finish(start)))
    }

    fn parse_decorators(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut decorators = Vec::new();
        while self.at(TokenKind::At) {
            let at = self.advance();
            if !self.options.has_plugin("decorators-legacy") {
                self.require_plugin("decorators", at.span)?;
            }
            decorators.push(self.parse_decorator()?);
        }
        Ok(decorators)
    }

    /// `@name`, `@a.b.c`, `@name(args)` or `@(expr)`
    fn parse_decorator(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        if self.at(TokenKind::LParen) {
            return self.parse_paren_expr();
        }
        let name = self.expect_ident()?;
        let mut expr = Expr::new(ExprKind::Ident(name), self.finish(start));
        while self.eat(TokenKind::Dot) {
            let property = self.expect_ident_name()?;
            expr = Expr::new(
                ExprKind::Member {
                    object: Box::new(expr),
                    property: MemberProp::Ident(property),
                    optional: false,
                },
                self.finish(start),
            );
        }
        if self.at(TokenKind::LParen) {
            let args = self.parse_arguments()?;
            expr = Expr::new(
                ExprKind::Call {
                    callee: Box::new(expr),
                    args,
                    optional: false,
                },
                self.finish(start),
            );
        }
        Ok(expr)
    }

    fn parse_class(&mut self, name_required: bool) -> Result<Class, ParseError> {
        let start = self.start();
        let decorators = self.parse_decorators()?;
        self.consume(TokenKind::Class)?;

        let name = if self.at(TokenKind::Ident) {
            Some(self.expect_ident()?)
        } else if name_required {
            return Err(self.unexpected("class name"));
        } else {
            None
        };

        let super_class = if self.eat(TokenKind::Extends) {
            Some(Box::new(self.parse_lhs()?))
        } else {
            None
        };

        self.consume(TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.at_any(&[TokenKind::RBrace, TokenKind::Eof]) {
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            members.push(self.parse_class_member()?);
        }
        self.consume(TokenKind::RBrace)?;

        Ok(Class {
            name,
            super_class,
            members,
            decorators,
            span: self.finish(start),
        })
    }

    /// Is the token after the current one the start of a key, so that the
    /// current word is a modifier rather than the key itself?
    fn modifier_applies(&self) -> bool {
        let Some(next) = self.tokens.get(self.pos + 1) else {
            return false;
        };
        // Only `async` forbids a line break before the key
        if next.newline_before && self.at_word("async") {
            return false;
        }
        !matches!(
            next.kind,
            TokenKind::LParen
                | TokenKind::Eq
                | TokenKind::Semicolon
                | TokenKind::RBrace
                | TokenKind::Comma
                | TokenKind::Colon
                | TokenKind::Eof
        )
    }

    fn parse_class_member(&mut self) -> Result<ClassMember, ParseError> {
        let start = self.start();
        let decorators = self.parse_decorators()?;

        let is_static = self.at_word("static") && self.modifier_applies() && {
            self.advance();
            true
        };
        let (kind, is_async, is_generator) = self.parse_method_modifiers();
        let key = self.parse_prop_key()?;

        let member = if self.at(TokenKind::LParen) {
            let kind = match (&key, kind) {
                (PropKey::Ident(name), MethodKind::Method) if name == "constructor" && !is_static => {
                    MethodKind::Constructor
                }
                _ => kind,
            };
            let function = self.parse_method(start, is_async, is_generator)?;
            ClassMemberKind::Method {
                key,
                kind,
                is_static,
                function: Box::new(function),
            }
        } else {
            let value = if self.eat(TokenKind::Eq) {
                let ctx = Context {
                    top_level: false,
                    in_function: true,
                    in_async: false,
                    in_generator: false,
                    in_method: true,
                    allow_in: true,
                };
                Some(self.with_context(ctx, |p| p.parse_assign())?)
            } else {
                None
            };
            self.consume_semicolon()?;
            ClassMemberKind::Field {
                key,
                value,
                is_static,
            }
        };

        Ok(ClassMember {
            kind: member,
            decorators,
            span: self.finish(start),
        })
    }

    /// `async`, `*`, `get`, `set` in front of a method key
    fn parse_method_modifiers(&mut self) -> (MethodKind, bool, bool) {
        let is_async = self.at_word("async") && self.modifier_applies() && {
            self.advance();
            true
        };
        let is_generator = self.eat(TokenKind::Star);
        let kind = if !is_async && !is_generator && self.modifier_applies() {
            if self.eat_word("get") {
                MethodKind::Get
            } else if self.eat_word("set") {
                MethodKind::Set
            } else {
                MethodKind::Method
            }
        } else {
            MethodKind::Method
        };
        (kind, is_async, is_generator)
    }

    fn parse_method(
        &mut self,
        start: usize,
        is_async: bool,
        is_generator: bool,
    ) -> Result<Function, ParseError> {
        let ctx = Context {
            top_level: false,
            in_function: true,
            in_async: is_async,
            in_generator: is_generator,
            in_method: true,
            allow_in: true,
        };
        self.parse_function_rest(start, None, is_async, is_generator, ctx)
    }

    fn parse_prop_key(&mut self) -> Result<PropKey, ParseError> {
        match self.peek() {
            TokenKind::String => {
                let token = self.advance();
                let value = string_value(self.text(&token))
                    .ok_or(ParseError::InvalidString { span: token.span })?;
                Ok(PropKey::String(value))
            }
            TokenKind::Number => {
                let token = self.advance();
                let value = parse_number(self.text(&token))
                    .ok_or(ParseError::InvalidNumber { span: token.span })?;
                Ok(PropKey::Number(value))
            }
            TokenKind::PrivateName => {
                let token = self.advance();
                Ok(PropKey::Private(self.text(&token)[1..].to_string()))
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = self.with_in(true, |p| p.parse_assign())?;
                self.consume(TokenKind::RBracket)?;
                Ok(PropKey::Computed(Box::new(expr)))
            }
            kind if kind.is_identifier_name() => Ok(PropKey::Ident(self.expect_ident_name()?)),
            _ => Err(self.unexpected("property name")),
        }
    }

    // === Patterns ===

    fn parse_binding_target(&mut self) -> Result<Pattern, ParseError> {
        let start = self.start();
        let kind = match self.peek() {
            TokenKind::Ident => PatternKind::Ident(self.expect_ident()?),
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.at(TokenKind::RBracket) {
                    if self.eat(TokenKind::Comma) {
                        elements.push(None);
                        continue;
                    }
                    if self.at(TokenKind::Ellipsis) {
                        let rest_start = self.start();
                        self.advance();
                        let inner = self.parse_binding_target()?;
                        elements.push(Some(Pattern {
                            kind: PatternKind::Rest(Box::new(inner)),
                            span: self.finish(rest_start),
                        }));
                        break;
                    }
                    elements.push(Some(self.parse_binding_element()?));
                    if !self.at(TokenKind::RBracket) {
                        self.consume(TokenKind::Comma)?;
                    }
                }
                self.consume(TokenKind::RBracket)?;
                PatternKind::Array(elements)
            }
            TokenKind::LBrace => {
                self.advance();
                let mut props = Vec::new();
                while !self.at(TokenKind::RBrace) {
                    if self.eat(TokenKind::Ellipsis) {
                        props.push(ObjectPatternProp::Rest(self.parse_binding_target()?));
                        break;
                    }
                    let key_start = self.start();
                    let key = self.parse_prop_key()?;
                    let prop = if self.eat(TokenKind::Colon) {
                        ObjectPatternProp::KeyValue {
                            key,
                            value: self.parse_binding_element()?,
                            shorthand: false,
                        }
                    } else {
                        let PropKey::Ident(name) = &key else {
                            return Err(ParseError::InvalidPattern { span: self.span() });
                        };
                        let target = Pattern {
                            kind: PatternKind::Ident(name.clone()),
                            span: self.finish(key_start),
                        };
                        let value = self.parse_default(key_start, target)?;
                        ObjectPatternProp::KeyValue {
                            key,
                            value,
                            shorthand: true,
                        }
                    };
                    props.push(prop);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(TokenKind::RBrace)?;
                PatternKind::Object(props)
            }
            _ => return Err(ParseError::InvalidPattern { span: self.span() }),
        };

        Ok(Pattern {
            kind,
            span: self.finish(start),
        })
    }

    /// Binding target with an optional `= default`
    fn parse_binding_element(&mut self) -> Result<Pattern, ParseError> {
        let start = self.start();
        let target = self.parse_binding_target()?;
        self.parse_default(start, target)
    }

    fn parse_default(&mut self, start: usize, target: Pattern) -> Result<Pattern, ParseError> {
        if !self.eat(TokenKind::Eq) {
            return Ok(target);
        }
        let default = self.with_in(true, |p| p.parse_assign())?;
        Ok(Pattern {
            kind: PatternKind::Assign {
                target: Box::new(target),
                default: Box::new(default),
            },
            span: self.finish(start),
        })
    }

    // === Expressions ===

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let first = self.parse_assign()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }

        let mut exprs = vec![first];
        while self.eat(TokenKind::Comma) {
            exprs.push(self.parse_assign()?);
        }
        Ok(Expr::new(ExprKind::Sequence(exprs), self.finish(start)))
    }

    fn parse_assign(&mut self) -> Result<Expr, ParseError> {
        if self.at_arrow() {
            return self.parse_arrow();
        }
        if self.ctx.in_generator && self.at_word("yield") {
            return self.parse_yield();
        }

        let start = self.start();
        let target = self.parse_conditional()?;

        let op = match self.peek() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::Add,
            TokenKind::MinusEq => AssignOp::Sub,
            TokenKind::StarEq => AssignOp::Mul,
            TokenKind::SlashEq => AssignOp::Div,
            TokenKind::PercentEq => AssignOp::Mod,
            TokenKind::StarStarEq => AssignOp::Exp,
            TokenKind::ShlEq => AssignOp::Shl,
            TokenKind::ShrEq => AssignOp::Shr,
            TokenKind::UShrEq => AssignOp::UShr,
            TokenKind::AmpEq => AssignOp::BitAnd,
            TokenKind::PipeEq => AssignOp::BitOr,
            TokenKind::CaretEq => AssignOp::BitXor,
            TokenKind::AndAndEq => AssignOp::And,
            TokenKind::OrOrEq => AssignOp::Or,
            TokenKind::QuestionQuestionEq => AssignOp::Nullish,
            _ => return Ok(target),
        };
        check_assign_target(&target, op == AssignOp::Assign)?;
        self.advance();
        let value = self.parse_assign()?;

        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            self.finish(start),
        ))
    }

    fn parse_yield(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.advance();
        let delegate = !self.newline_before() && self.eat(TokenKind::Star);
        let has_argument = delegate
            || !(self.newline_before()
                || self.at_any(&[
                    TokenKind::RParen,
                    TokenKind::RBracket,
                    TokenKind::RBrace,
                    TokenKind::Comma,
                    TokenKind::Semicolon,
                    TokenKind::Colon,
                    TokenKind::Eof,
                ]));
        let argument = if has_argument {
            Some(Box::new(self.parse_assign()?))
        } else {
            None
        };
        Ok(Expr::new(
            ExprKind::Yield { argument, delegate },
            self.finish(start),
        ))
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let test = self.parse_binary(1)?;
        if !self.eat(TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.with_in(true, |p| p.parse_assign())?;
        self.consume(TokenKind::Colon)?;
        let alternate = self.parse_assign()?;
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            self.finish(start),
        ))
    }

    fn binary_operator(&self) -> Option<Operator> {
        let op = match self.peek() {
            TokenKind::QuestionQuestion => Operator::Logical(LogicalOp::Nullish),
            TokenKind::OrOr => Operator::Logical(LogicalOp::Or),
            TokenKind::AndAnd => Operator::Logical(LogicalOp::And),
            TokenKind::Pipe => Operator::Binary(BinaryOp::BitOr),
            TokenKind::Caret => Operator::Binary(BinaryOp::BitXor),
            TokenKind::Amp => Operator::Binary(BinaryOp::BitAnd),
            TokenKind::EqEq => Operator::Binary(BinaryOp::Eq),
            TokenKind::Ne => Operator::Binary(BinaryOp::Ne),
            TokenKind::EqEqEq => Operator::Binary(BinaryOp::StrictEq),
            TokenKind::NeEq => Operator::Binary(BinaryOp::StrictNe),
            TokenKind::Lt => Operator::Binary(BinaryOp::Lt),
            TokenKind::Le => Operator::Binary(BinaryOp::Le),
            TokenKind::Gt => Operator::Binary(BinaryOp::Gt),
            TokenKind::Ge => Operator::Binary(BinaryOp::Ge),
            TokenKind::InstanceOf => Operator::Binary(BinaryOp::InstanceOf),
            TokenKind::In if self.ctx.allow_in => Operator::Binary(BinaryOp::In),
            TokenKind::Shl => Operator::Binary(BinaryOp::Shl),
            TokenKind::Shr => Operator::Binary(BinaryOp::Shr),
            TokenKind::UShr => Operator::Binary(BinaryOp::UShr),
            TokenKind::Plus => Operator::Binary(BinaryOp::Add),
            TokenKind::Minus => Operator::Binary(BinaryOp::Sub),
            TokenKind::Star => Operator::Binary(BinaryOp::Mul),
            TokenKind::Slash => Operator::Binary(BinaryOp::Div),
            TokenKind::Percent => Operator::Binary(BinaryOp::Mod),
            TokenKind::StarStar => Operator::Binary(BinaryOp::Exp),
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing over logical and binary operators
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut left = self.parse_unary()?;

        while let Some(op) = self.binary_operator() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            let next_min = if op == Operator::Binary(BinaryOp::Exp) {
                prec
            } else {
                prec + 1
            };
            let right = self.parse_binary(next_min)?;
            let kind = match op {
                Operator::Binary(op) => ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Operator::Logical(op) => ExprKind::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
            left = Expr::new(kind, self.finish(start));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let op = match self.peek() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::TypeOf => Some(UnaryOp::TypeOf),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                self.finish(start),
            ));
        }

        if self.at_any(&[TokenKind::PlusPlus, TokenKind::MinusMinus]) {
            let op = if self.advance().kind == TokenKind::PlusPlus {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            let target = self.parse_unary()?;
            check_simple_target(&target)?;
            return Ok(Expr::new(
                ExprKind::Update {
                    op,
                    prefix: true,
                    target: Box::new(target),
                },
                self.finish(start),
            ));
        }

        if self.at_word("await") && self.await_allowed() {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Await(Box::new(operand)),
                self.finish(start),
            ));
        }

        self.parse_postfix()
    }

    fn await_allowed(&self) -> bool {
        self.ctx.in_async
            || (!self.ctx.in_function && self.options.source_type == SourceType::Module)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let expr = self.parse_lhs()?;

        if self.at_any(&[TokenKind::PlusPlus, TokenKind::MinusMinus]) && !self.newline_before() {
            check_simple_target(&expr)?;
            let op = if self.advance().kind == TokenKind::PlusPlus {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            return Ok(Expr::new(
                ExprKind::Update {
                    op,
                    prefix: false,
                    target: Box::new(expr),
                },
                self.finish(start),
            ));
        }

        Ok(expr)
    }

    /// Member accesses, calls, `new` and tagged templates
    fn parse_lhs(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut expr = if self.at(TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };

        loop {
            let kind = match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    ExprKind::Member {
                        object: Box::new(expr),
                        property: self.parse_member_name()?,
                        optional: false,
                    }
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    match self.peek() {
                        TokenKind::LParen => ExprKind::Call {
                            callee: Box::new(expr),
                            args: self.parse_arguments()?,
                            optional: true,
                        },
                        TokenKind::LBracket => ExprKind::Member {
                            object: Box::new(expr),
                            property: self.parse_computed_member()?,
                            optional: true,
                        },
                        _ => ExprKind::Member {
                            object: Box::new(expr),
                            property: self.parse_member_name()?,
                            optional: true,
                        },
                    }
                }
                TokenKind::LBracket => ExprKind::Member {
                    object: Box::new(expr),
                    property: self.parse_computed_member()?,
                    optional: false,
                },
                TokenKind::LParen => ExprKind::Call {
                    callee: Box::new(expr),
                    args: self.parse_arguments()?,
                    optional: false,
                },
                TokenKind::TemplateFull | TokenKind::TemplateHead => ExprKind::TaggedTemplate {
                    tag: Box::new(expr),
                    quasi: Box::new(self.parse_template(true)?),
                },
                _ => break,
            };
            expr = Expr::new(kind, self.finish(start));
        }

        Ok(expr)
    }

    fn parse_member_name(&mut self) -> Result<MemberProp, ParseError> {
        if self.at(TokenKind::PrivateName) {
            let token = self.advance();
            return Ok(MemberProp::Private(self.text(&token)[1..].to_string()));
        }
        Ok(MemberProp::Ident(self.expect_ident_name()?))
    }

    fn parse_computed_member(&mut self) -> Result<MemberProp, ParseError> {
        self.consume(TokenKind::LBracket)?;
        let prop = self.with_in(true, |p| p.parse_expression())?;
        self.consume(TokenKind::RBracket)?;
        Ok(MemberProp::Computed(Box::new(prop)))
    }

    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.consume(TokenKind::New)?;

        // `new.target`
        if self.eat(TokenKind::Dot) {
            let property = self.expect_ident_name()?;
            return Ok(Expr::new(
                ExprKind::Member {
                    object: Box::new(Expr::new(ExprKind::Ident("new".to_string()), Span::new(start, start + 3))),
                    property: MemberProp::Ident(property),
                    optional: false,
                },
                self.finish(start),
            ));
        }

        let callee_start = self.start();
        let mut callee = if self.at(TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        // Member accesses bind to the callee, the first argument list to `new`
        loop {
            let property = match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    self.parse_member_name()?
                }
                TokenKind::LBracket => self.parse_computed_member()?,
                _ => break,
            };
            callee = Expr::new(
                ExprKind::Member {
                    object: Box::new(callee),
                    property,
                    optional: false,
                },
                self.finish(callee_start),
            );
        }

        let args = if self.at(TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            self.finish(start),
        ))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.consume(TokenKind::LParen)?;
        let args = self.with_in(true, |p| {
            let mut args = Vec::new();
            while !p.at(TokenKind::RParen) {
                args.push(p.parse_spread_or_assign()?);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            Ok(args)
        })?;
        self.consume(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_spread_or_assign(&mut self) -> Result<Expr, ParseError> {
        if !self.at(TokenKind::Ellipsis) {
            return self.parse_assign();
        }
        let start = self.start();
        self.advance();
        let inner = self.parse_assign()?;
        Ok(Expr::new(ExprKind::Spread(Box::new(inner)), self.finish(start)))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();

        let kind = match self.peek() {
            TokenKind::Number => {
                let token = self.advance();
                let value = parse_number(self.text(&token))
                    .ok_or(ParseError::InvalidNumber { span: token.span })?;
                ExprKind::Literal(Literal::Number(value))
            }
            TokenKind::String => {
                let token = self.advance();
                let value = string_value(self.text(&token))
                    .ok_or(ParseError::InvalidString { span: token.span })?;
                ExprKind::Literal(Literal::String(value))
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Literal(Literal::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Literal(Literal::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                ExprKind::Literal(Literal::Null)
            }
            TokenKind::This => {
                self.advance();
                ExprKind::This
            }
            TokenKind::Super => {
                let token = self.advance();
                if !self.ctx.in_method && !self.options.allow_super_outside_method {
                    return Err(ParseError::SuperOutsideMethod { span: token.span });
                }
                if !self.at_any(&[TokenKind::LParen, TokenKind::Dot, TokenKind::LBracket]) {
                    return Err(self.unexpected("'(', '.' or '['"));
                }
                ExprKind::Super
            }
            TokenKind::Import => {
                // Dynamic `import(...)` and `import.meta`
                self.advance();
                if !self.at_any(&[TokenKind::LParen, TokenKind::Dot]) {
                    return Err(self.unexpected("'(' or '.'"));
                }
                ExprKind::Ident("import".to_string())
            }
            TokenKind::Ident if self.at_async_function() => {
                self.advance();
                ExprKind::Function(Box::new(self.parse_function(start, true, false)?))
            }
            TokenKind::Ident => ExprKind::Ident(self.expect_ident()?),
            TokenKind::Function => {
                ExprKind::Function(Box::new(self.parse_function(start, false, false)?))
            }
            TokenKind::Class | TokenKind::At => ExprKind::Class(Box::new(self.parse_class(false)?)),
            TokenKind::TemplateFull | TokenKind::TemplateHead => {
                return self.parse_template(false);
            }
            TokenKind::LParen => {
                // Parentheses only group; the printer re-derives them
                return self.parse_paren_expr();
            }
            TokenKind::LBracket => self.parse_array()?,
            TokenKind::LBrace => self.parse_object()?,
            _ => return Err(self.unexpected("expression")),
        };

        Ok(Expr::new(kind, self.finish(start)))
    }

    fn parse_template(&mut self, tagged: bool) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();

        let mut token = self.advance();
        loop {
            let raw = token.template_raw(self.source).to_string();
            let cooked = unescape(&raw);
            if cooked.is_none() && !tagged {
                return Err(ParseError::InvalidString { span: token.span });
            }
            quasis.push(TemplateQuasi { raw, cooked });

            if matches!(token.kind, TokenKind::TemplateFull | TokenKind::TemplateTail) {
                break;
            }
            exprs.push(self.with_in(true, |p| p.parse_expression())?);
            if !self.at_any(&[TokenKind::TemplateMiddle, TokenKind::TemplateTail]) {
                return Err(self.unexpected("'}'"));
            }
            token = self.advance();
        }

        Ok(Expr::new(
            ExprKind::Template { quasis, exprs },
            self.finish(start),
        ))
    }

    fn parse_array(&mut self) -> Result<ExprKind, ParseError> {
        self.consume(TokenKind::LBracket)?;
        let elements = self.with_in(true, |p| {
            let mut elements = Vec::new();
            while !p.at(TokenKind::RBracket) {
                if p.eat(TokenKind::Comma) {
                    elements.push(None);
                    continue;
                }
                elements.push(Some(p.parse_spread_or_assign()?));
                if !p.at(TokenKind::RBracket) {
                    p.consume(TokenKind::Comma)?;
                }
            }
            Ok(elements)
        })?;
        self.consume(TokenKind::RBracket)?;
        Ok(ExprKind::Array(elements))
    }

    fn parse_object(&mut self) -> Result<ExprKind, ParseError> {
        self.consume(TokenKind::LBrace)?;
        let props = self.with_in(true, |p| {
            let mut props = Vec::new();
            while !p.at(TokenKind::RBrace) {
                props.push(p.parse_property()?);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            Ok(props)
        })?;
        self.consume(TokenKind::RBrace)?;
        Ok(ExprKind::Object(props))
    }

    fn parse_property(&mut self) -> Result<Property, ParseError> {
        let start = self.start();

        if self.eat(TokenKind::Ellipsis) {
            let expr = self.parse_assign()?;
            return Ok(Property {
                kind: PropertyKind::Spread(expr),
                span: self.finish(start),
            });
        }

        let (kind, is_async, is_generator) = self.parse_method_modifiers();
        let key_start = self.start();
        let key = self.parse_prop_key()?;

        let prop = if self.at(TokenKind::LParen) {
            let function = self.parse_method(start, is_async, is_generator)?;
            PropertyKind::Method {
                key,
                kind,
                function: Box::new(function),
            }
        } else if self.eat(TokenKind::Colon) {
            PropertyKind::KeyValue {
                key,
                value: self.parse_assign()?,
                shorthand: false,
            }
        } else {
            let PropKey::Ident(name) = &key else {
                return Err(self.unexpected("':'"));
            };
            let ident = Expr::new(ExprKind::Ident(name.clone()), self.finish(key_start));
            // `{ a = 1 }` is only meaningful as a destructuring target
            let value = if self.eat(TokenKind::Eq) {
                let default = self.parse_assign()?;
                Expr::new(
                    ExprKind::Assign {
                        op: AssignOp::Assign,
                        target: Box::new(ident),
                        value: Box::new(default),
                    },
                    self.finish(key_start),
                )
            } else {
                ident
            };
            PropertyKind::KeyValue {
                key,
                value,
                shorthand: true,
            }
        };

        Ok(Property {
            kind: prop,
            span: self.finish(start),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

impl Operator {
    fn precedence(self) -> u8 {
        match self {
            Operator::Binary(op) => op.precedence(),
            Operator::Logical(op) => op.precedence(),
        }
    }
}

/// Targets of `++`/`--`
fn check_simple_target(expr: &Expr) -> Result<(), ParseError> {
    match expr.kind {
        ExprKind::Ident(_) | ExprKind::Member { .. } => Ok(()),
        _ => Err(ParseError::InvalidAssignmentTarget { span: expr.span }),
    }
}

/// Targets of assignment operators; object and array literals are allowed
/// as destructuring targets of plain `=`
fn check_assign_target(expr: &Expr, allow_pattern: bool) -> Result<(), ParseError> {
    match expr.kind {
        ExprKind::Ident(_) | ExprKind::Member { .. } => Ok(()),
        ExprKind::Object(_) | ExprKind::Array(_) if allow_pattern => Ok(()),
        _ => Err(ParseError::InvalidAssignmentTarget { span: expr.span }),
    }
}
