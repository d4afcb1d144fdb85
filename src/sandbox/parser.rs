//! Parser for the restricted expression grammar
//!
//! ```text
//! program    := statement (';' statement)* ';'?
//! statement  := 'if' '(' expr ')' block ('else' block)?
//!             | IDENT '=' expr
//!             | expr
//! block      := '{' program '}' | statement
//! expr       := or ('?' expr ':' expr)?
//! or         := and ('||' and)*
//! and        := equality ('&&' equality)*
//! equality   := relational (('==' | '!=' | '===' | '!==') relational)*
//! relational := additive (('<' | '<=' | '>' | '>=') additive)*
//! additive   := term (('+' | '-') term)*
//! term       := unary (('*' | '/' | '%') unary)*
//! unary      := ('!' | '-' | '+' | 'typeof') unary | postfix
//! postfix    := primary ('.' IDENT | '[' expr ']')*
//! primary    := NUMBER | STRING | 'true' | 'false' | 'null' | IDENT | '(' expr ')'
//! ```

use super::errors::{SandboxError, SandboxResult};
use super::lexer::{tokenize, Token};
use super::value::ScriptValue;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(ScriptValue),
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign(String, Expr),
    Expr(Expr),
    If(Expr, Vec<Stmt>, Vec<Stmt>),
}

/// Parses source text into a statement list.
pub fn parse(source: &str) -> SandboxResult<Vec<Stmt>> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let program = parser.program(None)?;
    if let Some(token) = parser.peek() {
        return Err(unexpected(token));
    }
    Ok(program)
}

fn unexpected(token: &Token) -> SandboxError {
    SandboxError::Syntax(format!("Unexpected token {:?}", token))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> SandboxResult<()> {
        match self.advance() {
            Some(ref token) if *token == expected => Ok(()),
            Some(token) => Err(unexpected(&token)),
            None => Err(SandboxError::Syntax("Unexpected end of input".into())),
        }
    }

    fn enter(&mut self) -> SandboxResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(SandboxError::Syntax("expression nested too deeply".into()));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Parses statements until end of input or the given closing token.
    fn program(&mut self, close: Option<&Token>) -> SandboxResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            while self.eat(&Token::Semicolon) {}
            match self.peek() {
                None => break,
                Some(token) if Some(token) == close => break,
                _ => {}
            }
            statements.push(self.statement()?);
            match self.peek() {
                Some(Token::Semicolon) | None => {}
                Some(token) if Some(token) == close => {}
                // An if-block ends without a separator
                _ if matches!(statements.last(), Some(Stmt::If(..))) => {}
                Some(token) => return Err(unexpected(token)),
            }
        }
        Ok(statements)
    }

    fn statement(&mut self) -> SandboxResult<Stmt> {
        if self.eat(&Token::If) {
            self.expect(Token::LParen)?;
            let condition = self.expr()?;
            self.expect(Token::RParen)?;
            let then = self.block()?;
            let otherwise = if self.eat(&Token::Else) {
                self.block()?
            } else {
                Vec::new()
            };
            return Ok(Stmt::If(condition, then, otherwise));
        }

        if let (Some(Token::Ident(name)), Some(Token::Assign)) = (self.peek(), self.peek_at(1)) {
            let name = name.clone();
            self.pos += 2;
            return Ok(Stmt::Assign(name, self.expr()?));
        }

        let expr = self.expr()?;
        if self.peek() == Some(&Token::Assign) {
            return Err(SandboxError::Syntax(
                "Invalid left-hand side in assignment".into(),
            ));
        }
        Ok(Stmt::Expr(expr))
    }

    fn block(&mut self) -> SandboxResult<Vec<Stmt>> {
        self.enter()?;
        let result = if self.eat(&Token::LBrace) {
            let body = self.program(Some(&Token::RBrace))?;
            self.expect(Token::RBrace)?;
            Ok(body)
        } else {
            self.statement().map(|s| vec![s])
        };
        self.leave();
        result
    }

    fn expr(&mut self) -> SandboxResult<Expr> {
        self.enter()?;
        let result = self.conditional();
        self.leave();
        result
    }

    fn conditional(&mut self) -> SandboxResult<Expr> {
        let condition = self.binary_level(0)?;
        if self.eat(&Token::Question) {
            let then = self.expr()?;
            self.expect(Token::Colon)?;
            let otherwise = self.expr()?;
            return Ok(Expr::Conditional(
                Box::new(condition),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(condition)
    }

    /// Precedence climbing over the binary operator levels, loosest first.
    fn binary_level(&mut self, level: usize) -> SandboxResult<Expr> {
        const LEVELS: usize = 6;
        if level == LEVELS {
            return self.unary();
        }

        let mut left = self.binary_level(level + 1)?;
        while let Some(op) = self.peek().and_then(|t| binary_op(t, level)) {
            self.pos += 1;
            let right = self.binary_level(level + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> SandboxResult<Expr> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Negate,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Typeof) => UnaryOp::Typeof,
            _ => return self.postfix(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.unary();
        self.leave();
        Ok(Expr::Unary(op, Box::new(operand?)))
    }

    fn postfix(&mut self) -> SandboxResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                match self.advance() {
                    Some(Token::Ident(name)) => expr = Expr::Member(Box::new(expr), name),
                    Some(token) => return Err(unexpected(&token)),
                    None => return Err(SandboxError::Syntax("Unexpected end of input".into())),
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.expr()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> SandboxResult<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(ScriptValue::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(ScriptValue::String(s))),
            Some(Token::True) => Ok(Expr::Literal(ScriptValue::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(ScriptValue::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(ScriptValue::Null)),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(unexpected(&token)),
            None => Err(SandboxError::Syntax("Unexpected end of input".into())),
        }
    }
}

fn binary_op(token: &Token, level: usize) -> Option<BinaryOp> {
    let op = match (level, token) {
        (0, Token::Or) => BinaryOp::Or,
        (1, Token::And) => BinaryOp::And,
        (2, Token::Eq) => BinaryOp::Eq,
        (2, Token::NotEq) => BinaryOp::NotEq,
        (2, Token::StrictEq) => BinaryOp::StrictEq,
        (2, Token::StrictNotEq) => BinaryOp::StrictNotEq,
        (3, Token::Lt) => BinaryOp::Lt,
        (3, Token::Le) => BinaryOp::Le,
        (3, Token::Gt) => BinaryOp::Gt,
        (3, Token::Ge) => BinaryOp::Ge,
        (4, Token::Plus) => BinaryOp::Add,
        (4, Token::Minus) => BinaryOp::Sub,
        (5, Token::Star) => BinaryOp::Mul,
        (5, Token::Slash) => BinaryOp::Div,
        (5, Token::Percent) => BinaryOp::Rem,
        _ => return None,
    };
    Some(op)
}
