//! Recursive descent parser for the path-aware query language
//!
//! Supports SELECT (FROM / MATCH / WHERE), INSERT INTO ... VALUES | SELECT,
//! DELETE FROM and DELETE EDGE, with batches separated by `GO`. The parser
//! keeps going after an error: it skips to the next statement boundary and
//! reports every error it found.

use crate::ast::*;
use crate::lexer::{line_col, tokenize_spanned, SpannedToken, Token};
use matchql_core::{Error, Result, SyntaxError};
use std::collections::BTreeMap;

type ParseResult<T> = std::result::Result<T, SyntaxError>;

/// Parse a query script into a syntax tree
pub fn parse(query: &str) -> Result<Script> {
    let (tokens, mut errors) = tokenize_spanned(query);
    let mut parser = Parser::new(query, tokens);
    let script = parser.parse_script();
    errors.append(&mut parser.errors);

    if !errors.is_empty() {
        tracing::debug!("Parse failed with {} error(s)", errors.len());
        return Err(Error::Syntax(errors));
    }
    Ok(script)
}

/// Parse a single statement
pub fn parse_statement(query: &str) -> Result<Statement> {
    let script = parse(query)?;
    let mut statements = script.batches.into_iter().flat_map(|b| b.statements);
    match (statements.next(), statements.next()) {
        (Some(statement), None) => Ok(statement),
        (None, _) => Err(Error::Syntax(vec![SyntaxError::new(1, 1, "expected a statement")])),
        (Some(_), Some(_)) => Err(Error::Syntax(vec![SyntaxError::new(
            1,
            1,
            "expected exactly one statement",
        )])),
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<SpannedToken>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<SpannedToken>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    // ========== Token helpers ==========

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    fn consume(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> ParseResult<()> {
        if self.consume(&expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    /// Source text of the token at `index`
    fn slice(&self, index: usize) -> &'a str {
        let span = self.tokens[index].span.clone();
        &self.source[span]
    }

    fn error(&self, message: String) -> SyntaxError {
        let offset = match self.tokens.get(self.pos) {
            Some(t) => t.span.start,
            None => self.source.len(),
        };
        let (line, column) = line_col(self.source, offset);
        let found = match self.tokens.get(self.pos) {
            Some(_) => format!("'{}'", self.slice(self.pos)),
            None => "end of input".to_string(),
        };
        SyntaxError::new(line, column, format!("{}, found {}", message, found))
    }

    fn identifier(&mut self, what: &str) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Identifier(name)) | Some(Token::EscapedIdentifier(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error(format!("expected {}", what))),
        }
    }

    fn at_identifier(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Identifier(_)) | Some(Token::EscapedIdentifier(_))
        )
    }

    fn at_statement_boundary(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(Token::Semicolon)
                | Some(Token::Go)
                | Some(Token::Select)
                | Some(Token::Insert)
                | Some(Token::Delete)
        )
    }

    /// Skip to the next `;`, `GO` or statement keyword
    fn synchronize(&mut self) {
        while let Some(token) = self.peek() {
            match token {
                Token::Semicolon => {
                    self.pos += 1;
                    return;
                }
                Token::Go | Token::Insert | Token::Delete => return,
                Token::Select if self.pos > 0 && self.tokens[self.pos - 1].token != Token::LParen => return,
                _ => self.pos += 1,
            }
        }
    }

    // ========== Script ==========

    fn parse_script(&mut self) -> Script {
        let mut script = Script::default();
        let mut batch = Batch::default();

        while let Some(token) = self.peek() {
            match token {
                Token::Semicolon => {
                    self.pos += 1;
                }
                Token::Go => {
                    self.pos += 1;
                    if !batch.statements.is_empty() {
                        script.batches.push(std::mem::take(&mut batch));
                    }
                }
                _ => {
                    let start = self.pos;
                    match self.parse_statement() {
                        Ok(statement) if self.at_statement_boundary() => batch.statements.push(statement),
                        Ok(_) => {
                            let err = self.error("expected ';' or end of statement".to_string());
                            self.errors.push(err);
                            self.synchronize();
                        }
                        Err(err) => {
                            self.errors.push(err);
                            if self.pos == start {
                                self.pos += 1;
                            }
                            self.synchronize();
                        }
                    }
                }
            }
        }

        if !batch.statements.is_empty() {
            script.batches.push(batch);
        }
        script
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.peek() {
            Some(Token::Select) => Ok(Statement::Select(self.parse_select()?)),
            Some(Token::Insert) => Ok(Statement::Insert(self.parse_insert()?)),
            Some(Token::Delete) => Ok(Statement::Delete(self.parse_delete()?)),
            _ => Err(self.error("expected SELECT, INSERT or DELETE".to_string())),
        }
    }

    // ========== SELECT ==========

    fn parse_select(&mut self) -> ParseResult<SelectStatement> {
        self.expect(Token::Select, "SELECT")?;

        let mut elements = vec![self.parse_select_element()?];
        while self.consume(&Token::Comma) {
            elements.push(self.parse_select_element()?);
        }

        let from = if self.consume(&Token::From) {
            Some(self.parse_from()?)
        } else {
            None
        };

        let match_clause = if self.consume(&Token::Match) {
            let mut paths = vec![self.parse_path()?];
            while self.consume(&Token::Comma) {
                paths.push(self.parse_path()?);
            }
            Some(MatchClause { paths })
        } else {
            None
        };

        let where_clause = if self.consume(&Token::Where) {
            Some(self.parse_boolean()?)
        } else {
            None
        };

        Ok(SelectStatement {
            elements,
            from,
            match_clause,
            where_clause,
        })
    }

    fn parse_select_element(&mut self) -> ParseResult<SelectElement> {
        let expr = self.parse_scalar()?;
        let alias = if self.consume(&Token::As) {
            Some(self.identifier("alias after AS")?)
        } else if self.at_identifier() {
            Some(self.identifier("alias")?)
        } else {
            None
        };
        Ok(SelectElement { expr, alias })
    }

    fn parse_from(&mut self) -> ParseResult<FromClause> {
        let mut tables = vec![self.parse_table_reference()?];
        while self.consume(&Token::Comma) {
            tables.push(self.parse_table_reference()?);
        }
        Ok(FromClause { tables })
    }

    fn parse_table_alias(&mut self) -> ParseResult<String> {
        self.consume(&Token::As);
        self.identifier("table alias")
    }

    fn parse_table_reference(&mut self) -> ParseResult<TableReference> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let query = self.parse_select()?;
                self.expect(Token::RParen, "')' after derived table")?;
                let alias = self.parse_table_alias()?;
                Ok(TableReference::Derived(DerivedTable {
                    query: Box::new(query),
                    alias,
                }))
            }
            Some(Token::Variable(name)) => {
                let variable = name.clone();
                self.pos += 1;
                let alias = self.parse_table_alias()?;
                Ok(TableReference::Variable(VariableTable { variable, alias }))
            }
            _ => {
                let name = self.identifier("table name")?;
                if self.consume(&Token::LParen) {
                    let args = self.parse_argument_list()?;
                    let alias = self.parse_table_alias()?;
                    Ok(TableReference::Function(FunctionTable { name, args, alias }))
                } else {
                    let alias = self.parse_table_alias()?;
                    Ok(TableReference::Vertex(VertexTable {
                        collection: name,
                        alias,
                    }))
                }
            }
        }
    }

    /// Arguments after an already consumed '('
    fn parse_argument_list(&mut self) -> ParseResult<Vec<ScalarExpr>> {
        let mut args = Vec::new();
        if self.consume(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_scalar()?);
            if self.consume(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen, "')' after arguments")?;
            return Ok(args);
        }
    }

    // ========== MATCH ==========

    fn parse_path(&mut self) -> ParseResult<MatchPath> {
        let first = self.identifier("node alias")?;

        if self.check(&Token::ArrowLeftDash) {
            // Right-to-left: n0 <-[e0]- n1 <-[e1]- n2 is stored as n2 -e1-> n1 -e0-> n0
            let mut nodes = vec![first];
            let mut edges = Vec::new();
            while self.consume(&Token::ArrowLeftDash) {
                edges.push(self.parse_edge_body(EdgeType::Out)?);
                self.expect(Token::Minus, "'-' closing a reversed edge")?;
                nodes.push(self.identifier("node alias")?);
            }
            if matches!(self.peek(), Some(Token::Minus)) {
                return Err(self.error("cannot mix directions within one path".to_string()));
            }
            let steps = (0..edges.len())
                .rev()
                .map(|i| PathStep {
                    node: nodes[i + 1].clone(),
                    edge: edges[i].clone(),
                })
                .collect();
            return Ok(MatchPath {
                steps,
                tail: Some(nodes[0].clone()),
                is_reversed: true,
            });
        }

        let mut steps = Vec::new();
        let mut current = first;
        let mut tail = None;
        loop {
            if !self.consume(&Token::Minus) {
                tail = Some(current);
                break;
            }
            let mut edge = self.parse_edge_body(EdgeType::Out)?;
            edge.edge_type = match self.advance() {
                Some(Token::DashArrowRight) => EdgeType::Out,
                Some(Token::ArrowLeftDash) => EdgeType::In,
                Some(Token::Minus) => EdgeType::Both,
                _ => {
                    self.pos -= 1;
                    return Err(self.error("expected '->', '<-' or '-' after edge".to_string()));
                }
            };
            steps.push(PathStep { node: current, edge });

            if !self.at_identifier() {
                // Dangling edge: the path ends without a sink
                break;
            }
            current = self.identifier("node alias")?;
        }

        Ok(MatchPath {
            steps,
            tail,
            is_reversed: false,
        })
    }

    fn parse_edge_body(&mut self, edge_type: EdgeType) -> ParseResult<EdgeReference> {
        self.expect(Token::LBracket, "'[' opening an edge")?;
        let alias = self.identifier("edge alias")?;
        let mut edge = EdgeReference::single(&alias, edge_type);

        if self.consume(&Token::Star) {
            let min = self.parse_optional_bound()?;
            edge.min_length = min.unwrap_or(1);
            edge.max_length = if self.consume(&Token::DoubleDot) {
                self.parse_optional_bound()?
            } else {
                min
            };
        }

        if self.consume(&Token::LBrace) {
            edge.attributes = self.parse_attributes()?;
        }

        self.expect(Token::RBracket, "']' closing an edge")?;
        Ok(edge)
    }

    fn parse_optional_bound(&mut self) -> ParseResult<Option<u32>> {
        if let Some(Token::Integer(text)) = self.peek() {
            let bound = text
                .parse::<u32>()
                .map_err(|_| self.error("hop bound out of range".to_string()))?;
            self.pos += 1;
            return Ok(Some(bound));
        }
        Ok(None)
    }

    fn parse_attributes(&mut self) -> ParseResult<BTreeMap<String, ValueExpr>> {
        let mut attributes = BTreeMap::new();
        if self.consume(&Token::RBrace) {
            return Ok(attributes);
        }
        loop {
            let key = self.identifier("attribute name")?;
            self.expect(Token::Colon, "':' after attribute name")?;
            let value = match self.peek() {
                Some(Token::StringSingle(s)) | Some(Token::StringDouble(s)) => ValueExpr {
                    value: s.clone(),
                    single_quoted: true,
                },
                Some(t) if t.is_literal() => ValueExpr {
                    value: self.slice(self.pos).to_string(),
                    single_quoted: false,
                },
                _ => return Err(self.error("expected attribute value".to_string())),
            };
            self.pos += 1;
            attributes.insert(key, value);

            if self.consume(&Token::Comma) {
                continue;
            }
            self.expect(Token::RBrace, "'}' closing attributes")?;
            return Ok(attributes);
        }
    }

    // ========== INSERT / DELETE ==========

    fn parse_insert(&mut self) -> ParseResult<InsertStatement> {
        self.expect(Token::Insert, "INSERT")?;
        self.expect(Token::Into, "INTO")?;
        let target = self.identifier("insert target")?;

        let mut columns = Vec::new();
        if self.consume(&Token::LParen) {
            columns.push(self.identifier("column name")?);
            while self.consume(&Token::Comma) {
                columns.push(self.identifier("column name")?);
            }
            self.expect(Token::RParen, "')' after column list")?;
        }

        let source = if self.consume(&Token::Values) {
            self.expect(Token::LParen, "'(' after VALUES")?;
            InsertSource::Values(self.parse_argument_list()?)
        } else if self.check(&Token::Select) {
            InsertSource::Select(Box::new(self.parse_select()?))
        } else {
            return Err(self.error("expected VALUES or SELECT".to_string()));
        };

        Ok(InsertStatement {
            target,
            columns,
            source,
        })
    }

    fn parse_delete(&mut self) -> ParseResult<DeleteStatement> {
        self.expect(Token::Delete, "DELETE")?;

        if self.consume(&Token::From) {
            let target = self.identifier("delete target")?;
            let where_clause = if self.consume(&Token::Where) {
                Some(self.parse_boolean()?)
            } else {
                None
            };
            return Ok(DeleteStatement::Table(DeleteTable { target, where_clause }));
        }

        match self.peek() {
            Some(Token::Identifier(word)) if word.eq_ignore_ascii_case("EDGE") => {
                self.pos += 1;
            }
            _ => return Err(self.error("expected FROM or EDGE after DELETE".to_string())),
        }

        let source = self.identifier("source node alias")?;
        self.expect(Token::Minus, "'-' before edge")?;
        let mut edge = self.parse_edge_body(EdgeType::Out)?;
        edge.edge_type = match self.advance() {
            Some(Token::DashArrowRight) => EdgeType::Out,
            Some(Token::ArrowLeftDash) => EdgeType::In,
            Some(Token::Minus) => EdgeType::Both,
            _ => {
                self.pos -= 1;
                return Err(self.error("expected '->', '<-' or '-' after edge".to_string()));
            }
        };
        let sink = self.identifier("sink node alias")?;

        let from = if self.consume(&Token::From) {
            Some(self.parse_from()?)
        } else {
            None
        };
        let where_clause = if self.consume(&Token::Where) {
            Some(self.parse_boolean()?)
        } else {
            None
        };

        Ok(DeleteStatement::Edge(DeleteEdge {
            source,
            edge,
            sink,
            from,
            where_clause,
        }))
    }

    // ========== Boolean expressions ==========

    fn parse_boolean(&mut self) -> ParseResult<BooleanExpr> {
        let mut left = self.parse_and()?;
        while self.consume(&Token::Or) {
            let right = self.parse_and()?;
            left = BooleanExpr::Binary {
                left: Box::new(left),
                op: BooleanOp::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<BooleanExpr> {
        let mut left = self.parse_not()?;
        while self.consume(&Token::And) {
            let right = self.parse_not()?;
            left = BooleanExpr::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<BooleanExpr> {
        if self.consume(&Token::Not) {
            return Ok(BooleanExpr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_predicate()
    }

    fn followed_by_scalar_operator(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Equals)
                | Some(Token::NotEquals)
                | Some(Token::NotEquals2)
                | Some(Token::LessThan)
                | Some(Token::LessEquals)
                | Some(Token::GreaterThan)
                | Some(Token::GreaterEquals)
                | Some(Token::ArrowLeftDash)
                | Some(Token::Plus)
                | Some(Token::Minus)
                | Some(Token::Star)
                | Some(Token::Slash)
                | Some(Token::Percent)
                | Some(Token::Is)
                | Some(Token::In)
        )
    }

    fn parse_predicate(&mut self) -> ParseResult<BooleanExpr> {
        if self.consume(&Token::Exists) {
            self.expect(Token::LParen, "'(' after EXISTS")?;
            let query = self.parse_select()?;
            self.expect(Token::RParen, "')' closing EXISTS")?;
            return Ok(BooleanExpr::Exists(Box::new(query)));
        }

        // '(' is either a nested boolean or the start of a scalar operand
        if self.check(&Token::LParen) && self.peek_at(1) != Some(&Token::Select) {
            let saved = self.pos;
            self.pos += 1;
            if let Ok(inner) = self.parse_boolean() {
                if self.consume(&Token::RParen) && !self.followed_by_scalar_operator() {
                    return Ok(BooleanExpr::Paren(Box::new(inner)));
                }
            }
            self.pos = saved;
        }

        let left = self.parse_scalar()?;

        if let Some(op) = self.comparison_operator() {
            let negate_right = self.peek() == Some(&Token::ArrowLeftDash);
            self.pos += 1;
            let mut right = self.parse_scalar()?;
            if negate_right {
                // `a<-1` lexes as a path connector
                right = ScalarExpr::Negate(Box::new(right));
            }
            return Ok(BooleanExpr::Comparison { left, op, right });
        }

        if self.consume(&Token::Is) {
            let negated = self.consume(&Token::Not);
            self.expect(Token::Null, "NULL after IS")?;
            return Ok(BooleanExpr::IsNull { expr: left, negated });
        }

        let negated = self.check(&Token::Not) && self.peek_at(1) == Some(&Token::In);
        if negated {
            self.pos += 1;
        }
        if self.consume(&Token::In) {
            self.expect(Token::LParen, "'(' after IN")?;
            let list = self.parse_argument_list()?;
            return Ok(BooleanExpr::InList {
                expr: left,
                list,
                negated,
            });
        }

        match left {
            ScalarExpr::Function(call) => Ok(BooleanExpr::Function(call)),
            _ => Err(self.error("expected comparison operator".to_string())),
        }
    }

    fn comparison_operator(&self) -> Option<ComparisonOp> {
        match self.peek()? {
            Token::Equals => Some(ComparisonOp::Equals),
            Token::NotEquals | Token::NotEquals2 => Some(ComparisonOp::NotEquals),
            Token::LessThan | Token::ArrowLeftDash => Some(ComparisonOp::LessThan),
            Token::LessEquals => Some(ComparisonOp::LessEquals),
            Token::GreaterThan => Some(ComparisonOp::GreaterThan),
            Token::GreaterEquals => Some(ComparisonOp::GreaterEquals),
            _ => None,
        }
    }

    // ========== Scalar expressions ==========

    fn parse_scalar(&mut self) -> ParseResult<ScalarExpr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithmeticOp::Add,
                Some(Token::Minus) => ArithmeticOp::Subtract,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = ScalarExpr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
    }

    fn parse_term(&mut self) -> ParseResult<ScalarExpr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithmeticOp::Multiply,
                Some(Token::Slash) => ArithmeticOp::Divide,
                Some(Token::Percent) => ArithmeticOp::Modulo,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = ScalarExpr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> ParseResult<ScalarExpr> {
        if self.consume(&Token::Minus) {
            return Ok(ScalarExpr::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<ScalarExpr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error("expected expression".to_string()));
        };

        match token {
            Token::Integer(_) | Token::Float(_) | Token::True | Token::False | Token::Null => {
                let text = self.slice(self.pos).to_string();
                self.pos += 1;
                Ok(ScalarExpr::literal(&text))
            }
            Token::StringSingle(s) | Token::StringDouble(s) => {
                self.pos += 1;
                Ok(ScalarExpr::string(&s))
            }
            Token::Star => {
                self.pos += 1;
                Ok(ScalarExpr::Column(ColumnReference::wildcard(None)))
            }
            Token::LParen => {
                self.pos += 1;
                let expr = if self.check(&Token::Select) {
                    ScalarExpr::Subquery(Box::new(self.parse_select()?))
                } else {
                    ScalarExpr::Paren(Box::new(self.parse_scalar()?))
                };
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::Identifier(_) | Token::EscapedIdentifier(_) => {
                let first = self.identifier("identifier")?;
                if self.consume(&Token::LParen) {
                    let args = self.parse_argument_list()?;
                    return Ok(ScalarExpr::Function(FunctionCall { name: first, args }));
                }

                let mut parts = vec![first];
                while self.consume(&Token::Dot) {
                    if self.consume(&Token::Star) {
                        let qualifier = parts.join(".");
                        return Ok(ScalarExpr::Column(ColumnReference::wildcard(Some(&qualifier))));
                    }
                    parts.push(self.identifier("identifier after '.'")?);
                }
                let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
                Ok(ScalarExpr::column(&parts))
            }
            _ => Err(self.error("expected expression".to_string())),
        }
    }
}
