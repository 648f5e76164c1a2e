// Copyright 2025-2026 Neil Henderson
//
//! The `recursive_descent` module implements the MiniC parser: one function per grammar
//! production, with a single token of lookahead.

use crate::compiler_driver::diagnostics::{Diagnostic, DiagnosticKind};
use crate::compiler_driver::Driver;
use crate::lexer::{Token, TokenType};

use super::abstract_syntax_tree::*;

/// Marker for an abandoned parse. The diagnostic has already been recorded on the driver.
struct ParseAbort;

type ParseResult<T> = Result<T, ParseAbort>;

/// Parses the token stream into an AST.
///
/// Returns `None` when a syntax error was found; the error has been recorded on the driver.
pub fn parse(driver: &mut Driver, tokens: Vec<Token>) -> Option<AstCompileUnit> {
    let mut parser = Parser { driver, tokens, pos: 0 };
    parser.parse_compile_unit().ok()
}

struct Parser<'a> {
    driver: &'a mut Driver,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&TokenType> {
        self.tokens.get(self.pos).map(|t| &t.token_type)
    }

    fn peek_second(&self) -> Option<&TokenType> {
        self.tokens.get(self.pos + 1).map(|t| &t.token_type)
    }

    fn current_line(&self) -> u32 {
        match self.tokens.get(self.pos) {
            Some(token) => token.loc.line,
            None => self.tokens.last().map_or(0, |t| t.loc.line),
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &TokenType) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: TokenType) -> ParseResult<()> {
        if self.eat(&expected) {
            return Ok(());
        }
        let found = match self.peek() {
            Some(token_type) => format!("'{token_type}'"),
            None => "end of file".to_string(),
        };
        Err(self.syntax_error(format!("Expected '{expected}' but found {found}")))
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(TokenType::Identifier(_)) => {
                let Some(Token { token_type: TokenType::Identifier(name), .. }) = self.advance()
                else {
                    unreachable!();
                };
                Ok(name)
            }
            Some(token_type) => {
                let message = format!("Expected an identifier but found '{token_type}'");
                Err(self.syntax_error(message))
            }
            None => Err(self.syntax_error("Expected an identifier but found end of file".to_string())),
        }
    }

    fn syntax_error(&mut self, message: String) -> ParseAbort {
        let line = self.current_line();
        self.driver.add_diagnostic(Diagnostic::error_at_line(DiagnosticKind::Syntax, message, line));
        ParseAbort
    }

    // compile_unit := (func_def | global_decl)* EOF
    fn parse_compile_unit(&mut self) -> ParseResult<AstCompileUnit> {
        let mut items = Vec::new();

        while self.peek().is_some() {
            let return_type = self.parse_primitive_type()?;
            let line = self.current_line();
            let name = self.expect_identifier()?;

            if self.peek() == Some(&TokenType::OpenParen) {
                items.push(AstTopLevel::Function(self.parse_function(return_type, name, line)?));
            } else {
                if return_type == AstType::Void {
                    return Err(self.syntax_error("Variables cannot have type 'void'".to_string()));
                }
                items.push(AstTopLevel::GlobalVars(self.parse_global_var_defs(name, line)?));
            }
        }

        Ok(AstCompileUnit { items })
    }

    fn parse_primitive_type(&mut self) -> ParseResult<AstType> {
        if self.eat(&TokenType::KeywordInt) {
            Ok(AstType::Int)
        } else if self.eat(&TokenType::KeywordVoid) {
            Ok(AstType::Void)
        } else {
            let found = match self.peek() {
                Some(token_type) => format!("'{token_type}'"),
                None => "end of file".to_string(),
            };
            Err(self.syntax_error(format!("Expected 'int' or 'void' but found {found}")))
        }
    }

    // func_def := type ident "(" formal_params? ")" (block | ";")
    fn parse_function(&mut self, return_type: AstType, name: String, line: u32) -> ParseResult<AstFunction> {
        self.expect(TokenType::OpenParen)?;

        let mut params = Vec::new();
        if self.peek() != Some(&TokenType::CloseParen) {
            loop {
                params.push(self.parse_formal_param()?);
                if !self.eat(&TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::CloseParen)?;

        let body = if self.eat(&TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_block()?)
        };

        Ok(AstFunction { return_type, name, params, body, line })
    }

    // formal_param := "int" ident? ("[" int_literal? "]" ("[" int_literal "]")*)?
    fn parse_formal_param(&mut self) -> ParseResult<AstParam> {
        let line = self.current_line();
        self.expect(TokenType::KeywordInt)?;

        let name = match self.peek() {
            Some(TokenType::Identifier(_)) => Some(self.expect_identifier()?),
            _ => None,
        };

        let mut dims = Vec::new();
        if self.eat(&TokenType::OpenBracket) {
            // The outermost dimension decays to a pointer; its extent, if written, is ignored.
            if !matches!(self.peek(), Some(TokenType::CloseBracket)) {
                self.parse_array_dimension()?;
            }
            self.expect(TokenType::CloseBracket)?;
            dims.push(0);

            while self.eat(&TokenType::OpenBracket) {
                dims.push(self.parse_array_dimension()?);
                self.expect(TokenType::CloseBracket)?;
            }
        }

        Ok(AstParam { name, dims, line })
    }

    fn parse_array_dimension(&mut self) -> ParseResult<u32> {
        let line = self.current_line();
        match self.peek() {
            Some(&TokenType::IntegerLiteral { value, .. }) => {
                self.advance();
                if value <= 0 {
                    self.driver.add_diagnostic(Diagnostic::error_at_line(
                        DiagnosticKind::ArrayShape,
                        format!("Array dimension must be a positive constant, not '{value}'"),
                        line,
                    ));
                    return Err(ParseAbort);
                }
                Ok(value as u32)
            }
            _ => {
                let message = "Array dimensions must be integer constants".to_string();
                let line = self.current_line();
                self.driver.add_diagnostic(Diagnostic::error_at_line(
                    DiagnosticKind::ArrayShape,
                    message,
                    line,
                ));
                Err(ParseAbort)
            }
        }
    }

    // global_decl := "int" global_def ("," global_def)* ";" where the first name is already parsed.
    // Globals are zero-initialised; an initialiser is a syntax error.
    fn parse_global_var_defs(&mut self, first_name: String, first_line: u32) -> ParseResult<Vec<AstVarDef>> {
        let mut defs = Vec::new();
        let mut name = first_name;
        let mut line = first_line;

        loop {
            let dims = self.parse_optional_dimensions()?;
            if self.peek() == Some(&TokenType::Assign) {
                return Err(self.syntax_error(
                    "Global variables are zero-initialised and cannot take an initialiser".to_string(),
                ));
            }
            defs.push(AstVarDef { name, dims, init: None, line });

            if !self.eat(&TokenType::Comma) {
                break;
            }
            line = self.current_line();
            name = self.expect_identifier()?;
        }

        self.expect(TokenType::Semicolon)?;
        Ok(defs)
    }

    fn parse_optional_dimensions(&mut self) -> ParseResult<Vec<u32>> {
        let mut dims = Vec::new();
        while self.eat(&TokenType::OpenBracket) {
            dims.push(self.parse_array_dimension()?);
            self.expect(TokenType::CloseBracket)?;
        }
        Ok(dims)
    }

    // block := "{" block_item* "}"
    fn parse_block(&mut self) -> ParseResult<AstBlock> {
        self.expect(TokenType::OpenBrace)?;

        let mut items = Vec::new();
        while self.peek() != Some(&TokenType::CloseBrace) {
            if self.peek().is_none() {
                return Err(self.syntax_error("Expected '}' but found end of file".to_string()));
            }
            items.push(self.parse_block_item()?);
        }

        self.expect(TokenType::CloseBrace)?;
        Ok(AstBlock { items })
    }

    fn parse_block_item(&mut self) -> ParseResult<AstBlockItem> {
        if self.peek() == Some(&TokenType::KeywordInt) {
            Ok(AstBlockItem::Decl(self.parse_local_decl()?))
        } else {
            Ok(AstBlockItem::Stmt(self.parse_statement()?))
        }
    }

    // decl_stmt := "int" var_def ("," var_def)* ";"
    fn parse_local_decl(&mut self) -> ParseResult<Vec<AstVarDef>> {
        self.expect(TokenType::KeywordInt)?;

        let mut defs = Vec::new();
        loop {
            let line = self.current_line();
            let name = self.expect_identifier()?;
            let dims = self.parse_optional_dimensions()?;

            let init = if self.eat(&TokenType::Assign) {
                if !dims.is_empty() {
                    return Err(self.syntax_error(
                        "Array variables cannot take an initialiser".to_string(),
                    ));
                }
                Some(self.parse_expression()?)
            } else {
                None
            };

            defs.push(AstVarDef { name, dims, init, line });

            if !self.eat(&TokenType::Comma) {
                break;
            }
        }

        self.expect(TokenType::Semicolon)?;
        Ok(defs)
    }

    fn parse_statement(&mut self) -> ParseResult<AstStatement> {
        match self.peek() {
            Some(TokenType::OpenBrace) => Ok(AstStatement::Block(self.parse_block()?)),

            Some(TokenType::KeywordIf) => {
                self.advance();
                self.expect(TokenType::OpenParen)?;
                let cond = self.parse_expression()?;
                self.expect(TokenType::CloseParen)?;
                let then_stmt = Box::new(self.parse_statement()?);
                let else_stmt = if self.eat(&TokenType::KeywordElse) {
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(AstStatement::If { cond, then_stmt, else_stmt })
            }

            Some(TokenType::KeywordWhile) => {
                self.advance();
                self.expect(TokenType::OpenParen)?;
                let cond = self.parse_expression()?;
                self.expect(TokenType::CloseParen)?;
                let body = Box::new(self.parse_statement()?);
                Ok(AstStatement::While { cond, body })
            }

            Some(TokenType::KeywordBreak) => {
                let line = self.current_line();
                self.advance();
                self.expect(TokenType::Semicolon)?;
                Ok(AstStatement::Break { line })
            }

            Some(TokenType::KeywordContinue) => {
                let line = self.current_line();
                self.advance();
                self.expect(TokenType::Semicolon)?;
                Ok(AstStatement::Continue { line })
            }

            Some(TokenType::KeywordReturn) => {
                let line = self.current_line();
                self.advance();
                let value = if self.peek() == Some(&TokenType::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(TokenType::Semicolon)?;
                Ok(AstStatement::Return { value, line })
            }

            Some(TokenType::Semicolon) => {
                self.advance();
                Ok(AstStatement::Expression(None))
            }

            _ => self.parse_assignment_or_expression_statement(),
        }
    }

    // The parser cannot tell an assignment from an expression statement without parsing the
    // left-hand side first, so parse an expression and promote it to an assignment target when an
    // '=' follows.
    fn parse_assignment_or_expression_statement(&mut self) -> ParseResult<AstStatement> {
        let expr = self.parse_expression()?;

        if self.eat(&TokenType::Assign) {
            let AstExpression::LValue(target) = expr else {
                return Err(self.syntax_error("The target of an assignment must be a variable or an array element".to_string()));
            };
            let value = self.parse_expression()?;
            self.expect(TokenType::Semicolon)?;
            return Ok(AstStatement::Assign { target, value });
        }

        self.expect(TokenType::Semicolon)?;
        Ok(AstStatement::Expression(Some(expr)))
    }

    // expr := lor_expr
    fn parse_expression(&mut self) -> ParseResult<AstExpression> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> ParseResult<AstExpression> {
        let mut lhs = self.parse_logical_and()?;
        while self.peek() == Some(&TokenType::LogicalOr) {
            let line = self.current_line();
            self.advance();
            let rhs = self.parse_logical_and()?;
            lhs = binary(AstBinaryOp::LogicalOr, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> ParseResult<AstExpression> {
        let mut lhs = self.parse_equality()?;
        while self.peek() == Some(&TokenType::LogicalAnd) {
            let line = self.current_line();
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = binary(AstBinaryOp::LogicalAnd, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> ParseResult<AstExpression> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(TokenType::EqualTo) => AstBinaryOp::EqualTo,
                Some(TokenType::NotEqualTo) => AstBinaryOp::NotEqualTo,
                _ => break,
            };
            let line = self.current_line();
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> ParseResult<AstExpression> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(TokenType::LessThan) => AstBinaryOp::LessThan,
                Some(TokenType::LessThanOrEqualTo) => AstBinaryOp::LessThanOrEqualTo,
                Some(TokenType::GreaterThan) => AstBinaryOp::GreaterThan,
                Some(TokenType::GreaterThanOrEqualTo) => AstBinaryOp::GreaterThanOrEqualTo,
                _ => break,
            };
            let line = self.current_line();
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> ParseResult<AstExpression> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(TokenType::Plus) => AstBinaryOp::Add,
                Some(TokenType::Minus) => AstBinaryOp::Subtract,
                _ => break,
            };
            let line = self.current_line();
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<AstExpression> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenType::Star) => AstBinaryOp::Multiply,
                Some(TokenType::Slash) => AstBinaryOp::Divide,
                Some(TokenType::Percent) => AstBinaryOp::Remainder,
                _ => break,
            };
            let line = self.current_line();
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<AstExpression> {
        let op = match self.peek() {
            Some(TokenType::Minus) => AstUnaryOp::Negate,
            Some(TokenType::LogicalNot) => AstUnaryOp::LogicalNot,
            _ => return self.parse_primary(),
        };
        let line = self.current_line();
        self.advance();
        let operand = Box::new(self.parse_unary()?);
        Ok(AstExpression::Unary { op, operand, line })
    }

    // primary := "(" expr ")" | int_literal | ident "(" args? ")" | ident ("[" expr "]")*
    fn parse_primary(&mut self) -> ParseResult<AstExpression> {
        match self.peek() {
            Some(TokenType::OpenParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenType::CloseParen)?;
                Ok(expr)
            }

            Some(&TokenType::IntegerLiteral { value, radix }) => {
                let line = self.current_line();
                self.advance();
                Ok(AstExpression::Literal { value, radix, line })
            }

            Some(TokenType::Identifier(_)) => {
                if self.peek_second() == Some(&TokenType::OpenParen) {
                    self.parse_call()
                } else {
                    let line = self.current_line();
                    let name = self.expect_identifier()?;
                    let mut indices = Vec::new();
                    while self.eat(&TokenType::OpenBracket) {
                        indices.push(self.parse_expression()?);
                        self.expect(TokenType::CloseBracket)?;
                    }
                    Ok(AstExpression::LValue(AstLValue { name, indices, line }))
                }
            }

            Some(token_type) => {
                let message = format!("Expected an expression but found '{token_type}'");
                Err(self.syntax_error(message))
            }
            None => Err(self.syntax_error("Expected an expression but found end of file".to_string())),
        }
    }

    fn parse_call(&mut self) -> ParseResult<AstExpression> {
        let line = self.current_line();
        let name = self.expect_identifier()?;
        self.expect(TokenType::OpenParen)?;

        let mut args = Vec::new();
        if self.peek() != Some(&TokenType::CloseParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(&TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::CloseParen)?;

        Ok(AstExpression::Call { name, args, line })
    }
}

fn binary(op: AstBinaryOp, lhs: AstExpression, rhs: AstExpression, line: u32) -> AstExpression {
    AstExpression::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), line }
}
