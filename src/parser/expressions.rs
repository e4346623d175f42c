//! Expression parsing using Pratt precedence.

use crate::ast::{Expr, ExprKind, InfixOp, PrefixOp};
use crate::error::ParserError;
use crate::lexer::TokenKind;
use crate::parser::core::{ParseResult, Parser};
use crate::parser::precedence::{get_precedence, Precedence};

impl Parser {
    pub(crate) fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;

        while !self.check(&TokenKind::Semicolon) && precedence < self.peek_precedence() {
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    fn peek_precedence(&self) -> Precedence {
        get_precedence(&self.peek().kind)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let span = self.current_span();

        match self.peek().kind.clone() {
            TokenKind::IntLiteral(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::IntLiteral(value), span))
            }
            TokenKind::StringLiteral(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::StringLiteral(value), span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLiteral(true), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLiteral(false), span))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Identifier(name), span))
            }
            TokenKind::Bang => self.parse_prefix_op(PrefixOp::Bang),
            TokenKind::Minus => self.parse_prefix_op(PrefixOp::Minus),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression(Precedence::Lowest)?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::If => self.parse_if(),
            TokenKind::Fn => self.parse_function(),
            TokenKind::LeftBracket => {
                self.advance();
                let elements = self.parse_expression_list(&TokenKind::RightBracket)?;
                let span = span.merge(self.previous_span());
                Ok(Expr::new(ExprKind::Array(elements), span))
            }
            TokenKind::LeftBrace => self.parse_hash(),
            kind => Err(ParserError::ExpectedExpression {
                found: format!("{}", kind),
                span,
            }),
        }
    }

    fn parse_prefix_op(&mut self, operator: PrefixOp) -> ParseResult<Expr> {
        let start = self.current_span();
        self.advance();
        let right = self.parse_expression(Precedence::Prefix)?;
        let span = start.merge(right.span);
        Ok(Expr::new(
            ExprKind::Prefix {
                operator,
                right: Box::new(right),
            },
            span,
        ))
    }

    fn parse_infix(&mut self, left: Expr) -> ParseResult<Expr> {
        match self.peek().kind {
            TokenKind::Plus => self.parse_binary(left, InfixOp::Add),
            TokenKind::Minus => self.parse_binary(left, InfixOp::Sub),
            TokenKind::Star => self.parse_binary(left, InfixOp::Mul),
            TokenKind::Slash => self.parse_binary(left, InfixOp::Div),
            TokenKind::Less => self.parse_binary(left, InfixOp::Less),
            TokenKind::Greater => self.parse_binary(left, InfixOp::Greater),
            TokenKind::EqualEqual => self.parse_binary(left, InfixOp::Equal),
            TokenKind::BangEqual => self.parse_binary(left, InfixOp::NotEqual),
            TokenKind::LeftParen => self.parse_call(left),
            TokenKind::LeftBracket => self.parse_index(left),
            _ => Ok(left),
        }
    }

    fn parse_binary(&mut self, left: Expr, operator: InfixOp) -> ParseResult<Expr> {
        let precedence = self.peek_precedence();
        self.advance();
        let right = self.parse_expression(precedence)?;
        let span = left.span.merge(right.span);
        Ok(Expr::new(
            ExprKind::Infix {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            span,
        ))
    }

    fn parse_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        self.advance(); // (
        let arguments = self.parse_expression_list(&TokenKind::RightParen)?;
        let span = callee.span.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                arguments,
            },
            span,
        ))
    }

    fn parse_index(&mut self, object: Expr) -> ParseResult<Expr> {
        self.advance(); // [
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect(&TokenKind::RightBracket)?;
        let span = object.span.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::Index {
                object: Box::new(object),
                index: Box::new(index),
            },
            span,
        ))
    }

    fn parse_if(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        self.advance(); // if

        self.expect(&TokenKind::LeftParen)?;
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(&TokenKind::RightParen)?;

        let consequence = self.parse_block()?;
        let alternative = if self.match_token(&TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };

        let span = start.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                consequence,
                alternative,
            },
            span,
        ))
    }

    fn parse_function(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        self.advance(); // fn

        self.expect(&TokenKind::LeftParen)?;
        let mut parameters = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                parameters.push(self.expect_identifier()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen)?;

        let body = self.parse_block()?;
        let span = start.merge(self.previous_span());
        Ok(Expr::new(ExprKind::Function { parameters, body }, span))
    }

    fn parse_hash(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        self.advance(); // {

        let mut pairs = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace)?;

        let span = start.merge(self.previous_span());
        Ok(Expr::new(ExprKind::Hash(pairs), span))
    }

    fn parse_expression_list(&mut self, end: &TokenKind) -> ParseResult<Vec<Expr>> {
        let mut list = Vec::new();

        if !self.check(end) {
            loop {
                list.push(self.parse_expression(Precedence::Lowest)?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(end)?;

        Ok(list)
    }
}
