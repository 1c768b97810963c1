//! Recursive-descent parser for unit source.

use loadstone_entity::Value;

use super::ast::{BinaryOp, Const, Expr, Import, Stmt, StmtKind, UnaryOp, UnitDecl};
use super::lexer::{tokenize, Tok, Token};
use super::CompileError;

const KEYWORDS: &[&str] = &[
    "const", "else", "false", "if", "import", "invoke", "let", "null", "package", "return", "set",
    "true", "unit",
];

/// Parse a complete unit source.
pub fn parse(source: &str) -> Result<UnitDecl, CompileError> {
    let tokens = tokenize(source)?;
    Parser { tokens, pos: 0 }.unit_file()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, CompileError>;

impl Parser {
    fn peek(&self) -> &Tok {
        // tokenize always ends with Eof, and nothing advances past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)].tok
    }

    fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if tok != Tok::Eof {
            self.pos += 1;
        }
        tok
    }

    fn error<T>(&self, message: impl Into<String>) -> PResult<T> {
        Err(CompileError::new(self.line(), message))
    }

    fn unexpected<T>(&self, wanted: &str) -> PResult<T> {
        self.error(format!("expected {}, found {}", wanted, self.peek()))
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Tok::Ident(name) if name == keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Tok, wanted: &str) -> PResult<()> {
        if *self.peek() == tok {
            self.advance();
            Ok(())
        } else {
            self.unexpected(wanted)
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> PResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            self.unexpected(&format!("'{}'", keyword))
        }
    }

    fn identifier(&mut self) -> PResult<String> {
        match self.peek().clone() {
            Tok::Ident(name) if !KEYWORDS.contains(&name.as_str()) => {
                self.advance();
                Ok(name)
            }
            _ => self.unexpected("an identifier"),
        }
    }

    fn skip_ends(&mut self) {
        while *self.peek() == Tok::End {
            self.advance();
        }
    }

    /// A statement ends at a line break, `;`, or the closing brace.
    fn end_of_statement(&mut self) -> PResult<()> {
        match self.peek() {
            Tok::End => {
                self.advance();
                Ok(())
            }
            Tok::RBrace => Ok(()),
            _ => self.unexpected("end of statement"),
        }
    }

    fn unit_file(mut self) -> PResult<UnitDecl> {
        self.skip_ends();

        let mut package = String::new();
        if self.eat_keyword("package") {
            match self.advance() {
                Tok::Raw(raw) if !raw.is_empty() => package = raw,
                _ => return self.error("package name is empty"),
            }
            self.end_of_statement()?;
        }

        let mut imports = Vec::new();
        loop {
            self.skip_ends();
            if !self.at_keyword("import") {
                break;
            }
            let line = self.line();
            self.advance();
            let module = self.identifier()?;
            self.end_of_statement()?;
            imports.push(Import { module, line });
        }

        self.expect_keyword("unit")?;
        let name = self.identifier()?;
        self.expect(Tok::LBrace, "'{'")?;

        let mut consts = Vec::new();
        let mut invoke = None;
        loop {
            self.skip_ends();
            if *self.peek() == Tok::RBrace {
                self.advance();
                break;
            }
            let line = self.line();
            if self.eat_keyword("const") {
                let name = self.identifier()?;
                self.expect(Tok::Assign, "'='")?;
                let value = self.expr()?;
                self.end_of_statement()?;
                consts.push(Const { name, value, line });
            } else if self.eat_keyword("invoke") {
                if invoke.is_some() {
                    return Err(CompileError::new(line, "duplicate invoke block"));
                }
                invoke = Some(self.block()?);
            } else {
                return self.unexpected("'const', 'invoke' or '}'");
            }
        }

        self.skip_ends();
        if *self.peek() != Tok::Eof {
            return self.unexpected("end of input");
        }

        Ok(UnitDecl {
            package,
            imports,
            name,
            consts,
            invoke,
        })
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(Tok::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        loop {
            self.skip_ends();
            match self.peek() {
                Tok::RBrace => {
                    self.advance();
                    return Ok(stmts);
                }
                Tok::Eof => return self.unexpected("'}'"),
                _ => stmts.push(self.statement()?),
            }
        }
    }

    fn statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        let kind = if self.eat_keyword("let") {
            let name = self.identifier()?;
            if name == "ctx" {
                return Err(CompileError::new(line, "'ctx' cannot be rebound"));
            }
            self.expect(Tok::Assign, "'='")?;
            let value = self.expr()?;
            self.end_of_statement()?;
            StmtKind::Let(name, value)
        } else if self.eat_keyword("set") {
            let mut path = self.identifier()?;
            while *self.peek() == Tok::Dot {
                self.advance();
                path.push('.');
                path.push_str(&self.identifier()?);
            }
            self.expect(Tok::Assign, "'='")?;
            let value = self.expr()?;
            self.end_of_statement()?;
            StmtKind::Set(path, value)
        } else if self.eat_keyword("return") {
            let value = match self.peek() {
                Tok::End | Tok::RBrace => None,
                _ => Some(self.expr()?),
            };
            self.end_of_statement()?;
            StmtKind::Return(value)
        } else if self.at_keyword("if") {
            return self.if_statement();
        } else {
            let expr = self.expr()?;
            self.end_of_statement()?;
            StmtKind::Expr(expr)
        };
        Ok(Stmt { kind, line })
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.expect_keyword("if")?;
        let cond = self.expr()?;
        let then = self.block()?;
        let otherwise = if self.eat_keyword("else") {
            if self.at_keyword("if") {
                vec![self.if_statement()?]
            } else {
                self.block()?
            }
        } else {
            self.end_of_statement()?;
            Vec::new()
        };
        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then,
                otherwise,
            },
            line,
        })
    }

    fn expr(&mut self) -> PResult<Expr> {
        self.or()
    }

    fn binary_level(
        &mut self,
        ops: &[(Tok, BinaryOp)],
        next: fn(&mut Self) -> PResult<Expr>,
    ) -> PResult<Expr> {
        let mut left = next(self)?;
        'outer: loop {
            for (tok, op) in ops {
                if self.peek() == tok {
                    self.advance();
                    let right = next(self)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn or(&mut self) -> PResult<Expr> {
        self.binary_level(&[(Tok::OrOr, BinaryOp::Or)], Self::and)
    }

    fn and(&mut self) -> PResult<Expr> {
        self.binary_level(&[(Tok::AndAnd, BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[(Tok::Eq, BinaryOp::Eq), (Tok::Ne, BinaryOp::Ne)],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[
                (Tok::Lt, BinaryOp::Lt),
                (Tok::Le, BinaryOp::Le),
                (Tok::Gt, BinaryOp::Gt),
                (Tok::Ge, BinaryOp::Ge),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[(Tok::Plus, BinaryOp::Add), (Tok::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[
                (Tok::Star, BinaryOp::Mul),
                (Tok::Slash, BinaryOp::Div),
                (Tok::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> PResult<Expr> {
        let op = match self.peek() {
            Tok::Minus => UnaryOp::Neg,
            Tok::Bang => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.advance();
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Tok::Dot => {
                    self.advance();
                    let name = self.identifier()?;
                    expr = Expr::Member(Box::new(expr), name);
                }
                Tok::LBracket => {
                    self.advance();
                    let index = self.expr()?;
                    self.expect(Tok::RBracket, "']'")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Tok::LParen => {
                    let line = self.line();
                    self.advance();
                    let args = self.list(Tok::RParen, "')'")?;
                    let (module, function) = match expr {
                        Expr::Var(function) => (None, function),
                        Expr::Member(target, function) => match *target {
                            Expr::Var(module) => (Some(module), function),
                            _ => return Err(CompileError::new(line, "only named functions can be called")),
                        },
                        _ => return Err(CompileError::new(line, "only named functions can be called")),
                    };
                    expr = Expr::Call {
                        module,
                        function,
                        args,
                        line,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Comma-separated expressions up to `close`, which is consumed.
    fn list(&mut self, close: Tok, wanted: &str) -> PResult<Vec<Expr>> {
        let mut items = Vec::new();
        if *self.peek() == close {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.expr()?);
            match self.advance() {
                Tok::Comma => continue,
                tok if tok == close => return Ok(items),
                _ => return self.error(format!("expected ',' or {}", wanted)),
            }
        }
    }

    fn primary(&mut self) -> PResult<Expr> {
        match self.peek().clone() {
            Tok::Int(i) => {
                self.advance();
                Ok(Expr::Literal(Value::Integer(i)))
            }
            Tok::Float(x) => {
                self.advance();
                Ok(Expr::Literal(Value::Float(x)))
            }
            Tok::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            Tok::Ident(word) if word == "true" || word == "false" => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(word == "true")))
            }
            Tok::Ident(word) if word == "null" => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            Tok::Ident(_) => Ok(Expr::Var(self.identifier()?)),
            Tok::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(Tok::RParen, "')'")?;
                Ok(inner)
            }
            Tok::LBracket => {
                self.advance();
                Ok(Expr::Array(self.list(Tok::RBracket, "']'")?))
            }
            _ => self.unexpected("an expression"),
        }
    }
}
