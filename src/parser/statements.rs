//! Statement parsing: let, return, expression statements, blocks.

use crate::ast::{Block, Stmt, StmtKind};
use crate::lexer::TokenKind;
use crate::parser::core::{ParseResult, Parser};
use crate::parser::precedence::Precedence;

impl Parser {
    pub(crate) fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::Let => self.let_statement(),
            TokenKind::Return => self.return_statement(),
            _ => self.expression_statement(),
        }
    }

    fn let_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.advance(); // let

        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Equal)?;
        let value = self.parse_expression(Precedence::Lowest)?;

        self.match_token(&TokenKind::Semicolon);
        let span = start.merge(self.previous_span());
        Ok(Stmt::new(StmtKind::Let { name, value }, span))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.advance(); // return

        let value = self.parse_expression(Precedence::Lowest)?;

        self.match_token(&TokenKind::Semicolon);
        let span = start.merge(self.previous_span());
        Ok(Stmt::new(StmtKind::Return(value), span))
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        let expr = self.parse_expression(Precedence::Lowest)?;

        self.match_token(&TokenKind::Semicolon);
        let span = start.merge(self.previous_span());
        Ok(Stmt::new(StmtKind::Expression(expr), span))
    }

    /// Parse a braced statement list.
    pub(crate) fn parse_block(&mut self) -> ParseResult<Block> {
        let start = self.expect(&TokenKind::LeftBrace)?.span;

        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        let end = self.expect(&TokenKind::RightBrace)?.span;
        Ok(Block::new(statements, start.merge(end)))
    }
}
