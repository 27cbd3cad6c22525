use std::rc::Rc;

use log::{debug, info};

use crate::ast::{next_expr_id, Expr, FunctionDecl, Literal, Method, Stmt};
use crate::error::Reporter;
use crate::token::{Token, TokenType};

/// Sentinel raised after a syntax error has been reported; it unwinds to the
/// nearest declaration boundary, where `synchronize` resumes parsing.
struct ParseError;

type PResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    reporter: &'a mut Reporter,
}

impl<'a> Parser<'a> {
    pub fn new(mut tokens: Vec<Token>, reporter: &'a mut Reporter) -> Self {
        // The grammar relies on a trailing EOF token.
        if tokens.last().map_or(true, |t| t.token_type != TokenType::EOF) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenType::EOF, String::new(), line));
        }

        Parser {
            tokens,
            current: 0,
            reporter,
        }
    }

    /// Parse the whole token stream. Statements lost to panic-mode recovery
    /// are dropped; the reporter's error flag gates the later phases.
    pub fn parse(&mut self, repl: bool) -> Vec<Stmt> {
        info!("Parsing {} token(s), repl={}", self.tokens.len(), repl);

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(statement) = self.declaration(repl) {
                statements.push(statement);
            }
        }

        statements
    }

    // ─────────────────────────────────────────────────────────────────────
    // Declarations and statements
    // ─────────────────────────────────────────────────────────────────────

    fn declaration(&mut self, repl: bool) -> Option<Stmt> {
        let result = if self.match_token(&TokenType::CLASS) {
            self.class_declaration()
        } else if self.check(&TokenType::FUN) && self.check_next(&TokenType::IDENTIFIER) {
            self.advance();
            self.function_declaration()
        } else if self.match_token(&TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement(repl)
        };

        match result {
            Ok(statement) => Some(statement),

            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(&TokenType::IDENTIFIER, "Expect class name.")?.clone();

        let superclass = if self.match_token(&TokenType::LESS) {
            let superclass_name = self
                .consume(&TokenType::IDENTIFIER, "Expect superclass name.")?
                .clone();

            Some(Expr::Variable {
                id: next_expr_id(),
                name: superclass_name,
            })
        } else {
            None
        };

        self.consume(&TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Method> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            // A leading 'class' marks a static method.
            let is_class = self.match_token(&TokenType::CLASS);

            let method_name = self
                .consume(&TokenType::IDENTIFIER, "Expect method name.")?
                .clone();

            let function = self.function_body("method")?;

            methods.push(Method {
                name: method_name,
                function,
                is_class,
            });
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function_declaration(&mut self) -> PResult<Stmt> {
        let name = self
            .consume(&TokenType::IDENTIFIER, "Expect function name.")?
            .clone();

        let function = self.function_body("function")?;

        Ok(Stmt::Function { name, function })
    }

    fn function_body(&mut self, kind: &str) -> PResult<Rc<FunctionDecl>> {
        self.consume(
            &TokenType::LEFT_PAREN,
            &format!("Expect '(' after {kind} name."),
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    self.reporter
                        .error_at(&token, "Can't have more than 255 parameters.");
                }

                params.push(
                    self.consume(&TokenType::IDENTIFIER, "Expect parameter name.")?
                        .clone(),
                );

                if !self.match_token(&TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;
        self.consume(
            &TokenType::LEFT_BRACE,
            &format!("Expect '{{' before {kind} body."),
        )?;

        let body = self.block()?;

        Ok(Rc::new(FunctionDecl { params, body }))
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name = self
            .consume(&TokenType::IDENTIFIER, "Expect variable name.")?
            .clone();

        let initializer = if self.match_token(&TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            &TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self, repl: bool) -> PResult<Stmt> {
        if self.match_token(&TokenType::IF) {
            return self.if_statement();
        }

        if self.match_token(&TokenType::WHILE) {
            return self.while_statement();
        }

        if self.match_token(&TokenType::FOR) {
            return self.for_statement();
        }

        if self.match_token(&TokenType::PRINT) {
            return self.print_statement();
        }

        if self.match_token(&TokenType::RETURN) {
            return self.return_statement();
        }

        if self.match_token(&TokenType::BREAK) {
            return self.break_statement();
        }

        if self.match_token(&TokenType::LEFT_BRACE) {
            return Ok(Stmt::Block(self.block()?));
        }

        self.expression_statement(repl)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement(false)?);

        let else_branch = if self.match_token(&TokenType::ELSE) {
            Some(Box::new(self.statement(false)?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;

        let body = Box::new(self.statement(false)?);

        Ok(Stmt::While { condition, body })
    }

    /// `for` has no AST of its own; it desugars to blocks around a while.
    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer: Option<Stmt> = if self.match_token(&TokenType::SEMICOLON) {
            None
        } else if self.match_token(&TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement(false)?)
        };

        let condition: Option<Expr> = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(&TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let mut body = self.statement(false)?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal(Literal::Bool(true)));
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn print_statement(&mut self) -> PResult<Stmt> {
        let value = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "Expect ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();

        let value = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(&TokenType::SEMICOLON, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn break_statement(&mut self) -> PResult<Stmt> {
        let token = self.previous().clone();
        self.consume(&TokenType::SEMICOLON, "Expect ';' after 'break'.")?;

        Ok(Stmt::Break(token))
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(statement) = self.declaration(false) {
                statements.push(statement);
            }
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expect '}' after block.")?;

        Ok(statements)
    }

    fn expression_statement(&mut self, repl: bool) -> PResult<Stmt> {
        let expr = self.expression()?;

        if self.match_token(&TokenType::SEMICOLON) {
            return Ok(Stmt::Expression(expr));
        }

        if !repl {
            return Err(self.error_at_current("Expect ';' after expression."));
        }

        // At the prompt, a trailing expression is echoed back.
        if self.is_at_end() {
            return Ok(Stmt::Print(expr));
        }

        Err(self.error_at_current("Unexpected token after expression."))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions, lowest precedence first
    // ─────────────────────────────────────────────────────────────────────

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.ternary()?;

        if self.match_token(&TokenType::EQUAL) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    id: next_expr_id(),
                    name,
                    value: Box::new(value),
                }),

                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value: Box::new(value),
                }),

                other => {
                    // Reported without unwinding; the left side stands.
                    self.reporter.error_at(&equals, "Invalid assignment target.");
                    Ok(other)
                }
            };
        }

        Ok(expr)
    }

    fn ternary(&mut self) -> PResult<Expr> {
        let expr = self.or()?;

        if self.match_token(&TokenType::QUESTION) {
            let if_true = self.expression()?;
            self.consume(&TokenType::COLON, "Expect ':' between expressions.")?;
            let if_false = self.ternary()?;

            return Ok(Expr::Ternary {
                condition: Box::new(expr),
                if_true: Box::new(if_true),
                if_false: Box::new(if_false),
            });
        }

        Ok(expr)
    }

    fn or(&mut self) -> PResult<Expr> {
        let mut expr = self.and()?;

        while self.match_token(&TokenType::OR) {
            let operator = self.previous().clone();
            let right = self.and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> PResult<Expr> {
        let mut expr = self.equality()?;

        while self.match_token(&TokenType::AND) {
            let operator = self.previous().clone();
            let right = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        self.binary(
            Self::comparison,
            &[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL],
        )
    }

    fn comparison(&mut self) -> PResult<Expr> {
        self.binary(
            Self::term,
            &[
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
                TokenType::LESS,
                TokenType::LESS_EQUAL,
            ],
        )
    }

    fn term(&mut self) -> PResult<Expr> {
        // Lox has no unary '+'; report it and carry on with the operand.
        if self.match_token(&TokenType::PLUS) {
            let token = self.previous().clone();
            self.reporter
                .error_at(&token, "Lox does not support unary '+'.");
        }

        let mut expr = self.factor()?;

        while self.match_tokens(&[TokenType::MINUS, TokenType::PLUS]) {
            let operator = self.previous().clone();
            let right = self.factor()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        self.binary(Self::unary, &[TokenType::SLASH, TokenType::STAR])
    }

    /// One left-associative binary level. A leading operator is reported but
    /// the right operand is still parsed, suppressing cascade errors.
    fn binary(
        &mut self,
        operand: fn(&mut Self) -> PResult<Expr>,
        operators: &[TokenType],
    ) -> PResult<Expr> {
        if self.match_tokens(operators) {
            let token = self.previous().clone();
            self.reporter
                .error_at(&token, "Is a binary operation, left operand missing.");
        }

        let mut expr = operand(self)?;

        while self.match_tokens(operators) {
            let operator = self.previous().clone();
            let right = operand(self)?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.match_tokens(&[TokenType::BANG, TokenType::MINUS]) {
            let operator = self.previous().clone();
            let right = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(&TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(&TokenType::DOT) {
                let name = self
                    .consume(&TokenType::IDENTIFIER, "Expect property name after '.'.")?
                    .clone();

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= 255 {
                    let token = self.peek().clone();
                    self.reporter
                        .error_at(&token, "Can't have more than 255 arguments.");
                }

                arguments.push(self.expression()?);

                if !self.match_token(&TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren = self
            .consume(&TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> PResult<Expr> {
        if self.match_token(&TokenType::FALSE) {
            return Ok(Expr::Literal(Literal::Bool(false)));
        }

        if self.match_token(&TokenType::TRUE) {
            return Ok(Expr::Literal(Literal::Bool(true)));
        }

        if self.match_token(&TokenType::NIL) {
            return Ok(Expr::Literal(Literal::Nil));
        }

        match &self.peek().token_type {
            TokenType::NUMBER(n) => {
                let n = *n;
                self.advance();

                return Ok(Expr::Literal(Literal::Number(n)));
            }

            TokenType::STRING(s) => {
                let s = s.clone();
                self.advance();

                return Ok(Expr::Literal(Literal::String(s)));
            }

            _ => {}
        }

        if self.match_token(&TokenType::THIS) {
            return Ok(Expr::This {
                id: next_expr_id(),
                keyword: self.previous().clone(),
            });
        }

        if self.match_token(&TokenType::SUPER) {
            let keyword = self.previous().clone();
            self.consume(&TokenType::DOT, "Expect '.' after 'super'.")?;
            let method = self
                .consume(&TokenType::IDENTIFIER, "Expect superclass method name.")?
                .clone();

            return Ok(Expr::Super {
                id: next_expr_id(),
                keyword,
                method,
            });
        }

        if self.match_token(&TokenType::IDENTIFIER) {
            return Ok(Expr::Variable {
                id: next_expr_id(),
                name: self.previous().clone(),
            });
        }

        if self.match_token(&TokenType::LEFT_PAREN) {
            let expr = self.expression()?;
            self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        if self.match_token(&TokenType::FUN) {
            return Ok(Expr::Function(self.function_body("function")?));
        }

        Err(self.error_at_current("Expect expression."))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Token plumbing
    // ─────────────────────────────────────────────────────────────────────

    fn match_token(&mut self, token_type: &TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            return true;
        }

        false
    }

    fn match_tokens(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }

        false
    }

    fn consume(&mut self, token_type: &TokenType, message: &str) -> PResult<&Token> {
        if self.check(token_type) {
            return Ok(self.advance());
        }

        Err(self.error_at_current(message))
    }

    fn check(&self, token_type: &TokenType) -> bool {
        !self.is_at_end() && &self.peek().token_type == token_type
    }

    fn check_next(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        match self.tokens.get(self.current + 1) {
            Some(token) => &token.token_type == token_type,
            None => false,
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn error_at_current(&mut self, message: &str) -> ParseError {
        let token = self.peek().clone();
        self.reporter.error_at(&token, message);

        ParseError
    }

    /// Discard tokens until a statement boundary so one syntax error does
    /// not drown the rest of the file in diagnostics.
    fn synchronize(&mut self) {
        debug!("Synchronizing at token {}", self.current);

        while !self.is_at_end() {
            if self.peek().token_type == TokenType::SEMICOLON {
                self.advance();
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::RIGHT_BRACE => return,

                _ => {}
            }

            self.advance();
        }
    }
}
