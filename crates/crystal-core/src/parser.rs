use std::sync::Arc;

use crate::ast::*;
use crate::error::{ParseError, Position, ScriptError};
use crate::lexer::{tokenize, Keyword, Located, Token};

struct Parser {
    tokens: Vec<Located>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Located>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current_position(&self) -> Position {
        self.tokens.get(self.pos).map_or_else(
            || {
                self.tokens
                    .last()
                    .map_or(Position::new(1, 1), |t| t.position)
            },
            |t| t.position,
        )
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.peek() {
            Some(Token::Keyword(k)) => Some(*k),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos).map(|t| &t.token);
        self.pos += 1;
        t
    }

    fn found(&self) -> String {
        self.peek()
            .map_or_else(|| "end of input".to_string(), |t| t.to_string())
    }

    fn error(&self, expected: impl Into<String>) -> ParseError {
        ParseError::new(expected, self.found(), self.current_position())
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.peek_keyword() == Some(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("'{}'", keyword)))
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(expected.to_string()))
        }
    }

    fn at_separator(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Newline) | Some(Token::Semicolon))
    }

    /// True where a statement may end: a separator, end of input, or a block
    /// terminator sharing the line (`…; end if`).
    fn at_statement_end(&self) -> bool {
        self.at_separator()
            || matches!(self.peek_keyword(), Some(Keyword::End) | Some(Keyword::Catch))
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(Token::Newline) | Some(Token::Semicolon)) {
            self.advance();
        }
    }

    /// The separator between a block header and its body.
    fn expect_separator(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Some(Token::Newline) | Some(Token::Semicolon) => {
                self.skip_separators();
                Ok(())
            }
            _ => Err(self.error("end of line or ';'")),
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        self.skip_separators();

        while self.pos < self.tokens.len() {
            statements.push(self.parse_line()?);
            self.skip_separators();
        }

        Ok(Program { statements })
    }

    /// One statement, or several chained with `;` into a [`StatementKind::Block`].
    fn parse_line(&mut self) -> Result<Statement, ParseError> {
        let first = self.parse_statement()?;
        let line = first.line;
        let mut chain = vec![first];

        while self.peek() == Some(&Token::Semicolon) {
            self.skip_separators_on_line();
            if self.at_statement_end() {
                break;
            }
            chain.push(self.parse_statement()?);
        }

        if !self.at_statement_end() {
            return Err(self.error("end of statement"));
        }

        if chain.len() == 1 {
            Ok(chain.remove(0))
        } else {
            Ok(Statement::new(StatementKind::Block(chain), line))
        }
    }

    fn skip_separators_on_line(&mut self) {
        while self.peek() == Some(&Token::Semicolon) {
            self.advance();
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let line = self.current_position().line;
        let kind = match self.peek() {
            Some(Token::Keyword(keyword)) => {
                let keyword = *keyword;
                self.parse_keyword_statement(keyword)?
            }
            Some(Token::Word(_)) => match self.advance() {
                Some(Token::Word(name)) => StatementKind::Call(name.clone()),
                _ => unreachable!(),
            },
            _ => return Err(self.error("statement")),
        };
        Ok(Statement::new(kind, line))
    }

    fn parse_keyword_statement(&mut self, keyword: Keyword) -> Result<StatementKind, ParseError> {
        let start = self.current_position();
        match keyword {
            Keyword::Say => {
                self.advance();
                Ok(StatementKind::Say(self.parse_expression()?))
            }
            Keyword::Ask => {
                self.advance();
                let prompt = self.parse_expression()?;
                let scope = self.parse_scope()?;
                let variable = self.parse_variable_name()?;
                Ok(StatementKind::Ask { prompt, scope, variable })
            }
            Keyword::Pause => {
                self.advance();
                if self.at_statement_end() {
                    Ok(StatementKind::Pause(None))
                } else {
                    Ok(StatementKind::Pause(Some(self.parse_expression()?)))
                }
            }
            Keyword::Set => {
                self.advance();
                let scope = self.parse_scope()?;
                let variable = self.parse_variable_name()?;
                self.expect(&Token::Equals)?;
                let value = self.parse_expression()?;
                Ok(StatementKind::Assign { scope, variable, value })
            }
            Keyword::If => {
                self.advance();
                let condition = self.parse_condition()?;
                self.expect_separator()?;
                let body = self.parse_block(Keyword::If, start)?;
                Ok(StatementKind::If { condition, body })
            }
            Keyword::Repeat => {
                self.advance();
                self.parse_repeat(start)
            }
            Keyword::Function => {
                self.advance();
                let name = match self.peek() {
                    Some(Token::Word(name)) => name.clone(),
                    _ => return Err(self.error("function name")),
                };
                self.advance();
                self.expect_separator()?;
                let body = self.parse_block(Keyword::Function, start)?;
                Ok(StatementKind::FunctionDef { name, body: Arc::from(body) })
            }
            Keyword::Include => {
                self.advance();
                Ok(StatementKind::Include(self.parse_expression()?))
            }
            Keyword::Try => {
                self.advance();
                self.expect_separator()?;
                let try_body = self.parse_try_body(start)?;
                self.skip_separators();
                let catch_body = self.parse_block(Keyword::Try, start)?;
                Ok(StatementKind::TryCatch { try_body, catch_body })
            }
            Keyword::Copy | Keyword::Move => {
                self.advance();
                let source = self.parse_expression()?;
                self.expect_keyword(Keyword::To)?;
                let destination = self.parse_expression()?;
                if keyword == Keyword::Copy {
                    Ok(StatementKind::Copy { source, destination })
                } else {
                    Ok(StatementKind::Move { source, destination })
                }
            }
            Keyword::Delete => {
                self.advance();
                Ok(StatementKind::Delete(self.parse_expression()?))
            }
            Keyword::List => {
                self.advance();
                let filter = match self.peek_keyword() {
                    Some(Keyword::Files) => ListFilter::Files,
                    Some(Keyword::Folders) => ListFilter::Folders,
                    Some(Keyword::All) => ListFilter::All,
                    _ => ListFilter::default(),
                };
                if matches!(
                    self.peek_keyword(),
                    Some(Keyword::Files) | Some(Keyword::Folders) | Some(Keyword::All)
                ) {
                    self.advance();
                }
                let path = if self.peek_keyword() == Some(Keyword::In) {
                    self.advance();
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(StatementKind::List { filter, path })
            }
            Keyword::Create => {
                self.advance();
                match self.peek_keyword() {
                    Some(Keyword::File) => {
                        self.advance();
                        Ok(StatementKind::CreateFile(self.parse_expression()?))
                    }
                    Some(Keyword::Folder) => {
                        self.advance();
                        Ok(StatementKind::CreateFolder(self.parse_expression()?))
                    }
                    _ => Err(self.error("'file' or 'folder'")),
                }
            }
            Keyword::Make => {
                self.advance();
                match self.peek_keyword() {
                    Some(Keyword::File) => {
                        self.advance();
                        let path = self.parse_expression()?;
                        let content = self.parse_expression()?;
                        Ok(StatementKind::MakeFile { path, content })
                    }
                    Some(Keyword::Folder) => {
                        self.advance();
                        let mut paths = vec![self.parse_expression()?];
                        while !self.at_statement_end() {
                            paths.push(self.parse_expression()?);
                        }
                        Ok(StatementKind::MakeFolders(paths))
                    }
                    _ => Err(self.error("'file' or 'folder'")),
                }
            }
            Keyword::Ping => {
                self.advance();
                Ok(StatementKind::Ping(self.parse_expression()?))
            }
            Keyword::Download => {
                self.advance();
                let url = self.parse_expression()?;
                self.expect_keyword(Keyword::To)?;
                let destination = self.parse_expression()?;
                Ok(StatementKind::Download { url, destination })
            }
            _ => Err(self.error("statement")),
        }
    }

    fn parse_repeat(&mut self, start: Position) -> Result<StatementKind, ParseError> {
        let kind = match self.peek_keyword() {
            Some(Keyword::Infinite) => {
                self.advance();
                self.expect_separator()?;
                let body = self.parse_block(Keyword::Repeat, start)?;
                StatementKind::RepeatInfinite { body }
            }
            Some(Keyword::While) => {
                self.advance();
                let condition = self.parse_condition()?;
                self.expect_separator()?;
                let body = self.parse_block(Keyword::Repeat, start)?;
                StatementKind::RepeatWhile { condition, body }
            }
            Some(Keyword::Until) => {
                self.advance();
                let condition = self.parse_condition()?;
                self.expect_separator()?;
                let body = self.parse_block(Keyword::Repeat, start)?;
                StatementKind::RepeatUntil { condition, body }
            }
            Some(Keyword::For) => {
                self.advance();
                self.expect_keyword(Keyword::Each)?;
                let variable = self.parse_variable_name()?;
                self.expect_keyword(Keyword::In)?;
                let path = self.parse_expression()?;
                self.expect_separator()?;
                let body = self.parse_block(Keyword::Repeat, start)?;
                StatementKind::RepeatForEach { variable, path, body }
            }
            _ => {
                let count = self.parse_expression().map_err(|_| {
                    self.error("repeat count, 'infinite', 'while', 'until' or 'for each'")
                })?;
                self.expect_separator()?;
                let body = self.parse_block(Keyword::Repeat, start)?;
                StatementKind::RepeatCount { count, body }
            }
        };
        Ok(kind)
    }

    /// Statements up to `end <construct>`. A missing or mismatched terminator
    /// is reported against the position the block was opened at.
    fn parse_block(&mut self, construct: Keyword, start: Position) -> Result<Vec<Statement>, ParseError> {
        let mut body = Vec::new();
        loop {
            self.skip_separators();
            match self.peek_keyword() {
                _ if self.pos >= self.tokens.len() => {
                    return Err(self.unterminated(construct, start));
                }
                Some(Keyword::End) => {
                    self.advance();
                    if self.peek_keyword() == Some(construct) {
                        self.advance();
                        return Ok(body);
                    }
                    return Err(self.unterminated(construct, start));
                }
                Some(Keyword::Catch) => return Err(self.unterminated(construct, start)),
                _ => body.push(self.parse_line()?),
            }
        }
    }

    /// Statements up to `catch`.
    fn parse_try_body(&mut self, start: Position) -> Result<Vec<Statement>, ParseError> {
        let mut body = Vec::new();
        loop {
            self.skip_separators();
            match self.peek_keyword() {
                _ if self.pos >= self.tokens.len() => {
                    return Err(ParseError::unterminated(
                        format!("'catch' for 'try' block opened at line {}", start.line),
                        self.current_position(),
                    ));
                }
                Some(Keyword::Catch) => {
                    self.advance();
                    return Ok(body);
                }
                Some(Keyword::End) => {
                    return Err(self.error(format!(
                        "'catch' for 'try' block opened at line {}",
                        start.line
                    )));
                }
                _ => body.push(self.parse_line()?),
            }
        }
    }

    fn unterminated(&self, construct: Keyword, start: Position) -> ParseError {
        let expected = format!("'end {}' to close '{}' block opened at line {}", construct, construct, start.line);
        let found = match self.peek() {
            None => return ParseError::unterminated(expected, self.current_position()),
            Some(Token::Keyword(k)) if self.pos > 0 && self.previous_is_end() => format!("'end {}'", k),
            _ => self.found(),
        };
        ParseError::new(expected, found, self.current_position())
    }

    fn previous_is_end(&self) -> bool {
        self.tokens
            .get(self.pos - 1)
            .map_or(false, |t| t.token == Token::Keyword(Keyword::End))
    }

    fn parse_scope(&mut self) -> Result<Scope, ParseError> {
        match self.peek_keyword() {
            Some(Keyword::Local) => {
                self.advance();
                Ok(Scope::Local)
            }
            Some(Keyword::Global) => {
                self.advance();
                Ok(Scope::Global)
            }
            _ => Err(self.error("'local' or 'global'")),
        }
    }

    fn parse_variable_name(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Variable(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("quoted variable name")),
        }
    }

    fn parse_condition(&mut self) -> Result<Expression, ParseError> {
        if self.peek() == Some(&Token::LBrace) {
            self.advance();
            let path = self.parse_expression()?;
            self.expect(&Token::RBrace)?;
            self.expect_keyword(Keyword::Exists)?;
            return Ok(Expression::PathExists(Box::new(path)));
        }

        let left = self.parse_expression()?;
        let comparator = self.parse_comparator()?;
        let right = self.parse_expression()?;
        Ok(Expression::BinaryOp {
            op: BinOp::Compare(comparator),
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_comparator(&mut self) -> Result<Comparator, ParseError> {
        let comparator = match self.peek() {
            Some(Token::Greater) => Comparator::Greater,
            Some(Token::Less) => Comparator::Less,
            Some(Token::Equals) | Some(Token::Keyword(Keyword::Equals)) | Some(Token::Keyword(Keyword::Is)) => {
                Comparator::Equal
            }
            Some(Token::Keyword(Keyword::Greater)) | Some(Token::Keyword(Keyword::Less)) => {
                let comparator = if self.peek_keyword() == Some(Keyword::Greater) {
                    Comparator::Greater
                } else {
                    Comparator::Less
                };
                if self.peek_at(1) != Some(&Token::Keyword(Keyword::Than)) {
                    self.advance();
                    return Err(self.error("'than'"));
                }
                self.advance();
                comparator
            }
            _ => return Err(self.error("comparator")),
        };
        self.advance();
        Ok(comparator)
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Subtract,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expression::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_term(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_primary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Multiply,
                Some(Token::Slash) => BinOp::Divide,
                Some(Token::Percent) => BinOp::Modulo,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_primary()?;
            left = Expression::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let expr = match self.peek() {
            Some(Token::Number(n)) => Expression::Number(*n),
            Some(Token::String(parts)) => Expression::String(parts.clone()),
            Some(Token::Variable(name)) => Expression::Variable(name.clone()),
            Some(Token::Word(word)) | Some(Token::Path(word)) => Expression::Word(word.clone()),
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                return Ok(Expression::Grouping(Box::new(inner)));
            }
            _ => return Err(self.error("expression")),
        };
        self.advance();
        Ok(expr)
    }
}

/// Parses a whole script into a [`Program`].
pub fn parse(source: &str) -> Result<Program, ScriptError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    Ok(parser.parse_program()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(source: &str) -> StatementKind {
        let program = parse(source).unwrap();
        assert_eq!(program.statements.len(), 1, "expected one statement in {:?}", source);
        program.statements.into_iter().next().unwrap().kind
    }

    fn parse_err(source: &str) -> ParseError {
        match parse(source) {
            Err(ScriptError::Parse(e)) => e,
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_say_string() {
        match single(r#"say "Hello""#) {
            StatementKind::Say(Expression::String(parts)) => {
                assert_eq!(parts, vec![StringPart::Literal("Hello".to_string())]);
            }
            other => panic!("Expected Say, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_precedence() {
        match single("set local 'x' = 5 + 3 * 2") {
            StatementKind::Assign { scope, variable, value } => {
                assert_eq!(scope, Scope::Local);
                assert_eq!(variable, "x");
                match value {
                    Expression::BinaryOp { op: BinOp::Add, left, right } => {
                        assert!(matches!(*left, Expression::Number(n) if n == 5.0));
                        assert!(matches!(*right, Expression::BinaryOp { op: BinOp::Multiply, .. }));
                    }
                    other => panic!("Expected Add at the root, got {:?}", other),
                }
            }
            other => panic!("Expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_grouping_overrides_precedence() {
        match single("set global 'y' = (5 + 3) * 2") {
            StatementKind::Assign { scope, value, .. } => {
                assert_eq!(scope, Scope::Global);
                match value {
                    Expression::BinaryOp { op: BinOp::Multiply, left, .. } => {
                        assert!(matches!(*left, Expression::Grouping(_)));
                    }
                    other => panic!("Expected Multiply at the root, got {:?}", other),
                }
            }
            other => panic!("Expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_subtraction_is_left_associative() {
        match single("say 10 - 4 - 3") {
            StatementKind::Say(Expression::BinaryOp { op: BinOp::Subtract, left, right }) => {
                assert!(matches!(*left, Expression::BinaryOp { op: BinOp::Subtract, .. }));
                assert!(matches!(*right, Expression::Number(n) if n == 3.0));
            }
            other => panic!("Expected Subtract, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ask() {
        match single(r#"ask "Name?" global 'name'"#) {
            StatementKind::Ask { scope, variable, .. } => {
                assert_eq!(scope, Scope::Global);
                assert_eq!(variable, "name");
            }
            other => panic!("Expected Ask, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_pause_with_and_without_message() {
        assert!(matches!(single("pause"), StatementKind::Pause(None)));
        assert!(matches!(single(r#"pause "Hit enter""#), StatementKind::Pause(Some(_))));
    }

    #[test]
    fn test_comparator_synonyms_normalize() {
        let cases = [
            ("'a' > 1", Comparator::Greater),
            ("'a' greater than 1", Comparator::Greater),
            ("'a' < 1", Comparator::Less),
            ("'a' less than 1", Comparator::Less),
            ("'a' = 1", Comparator::Equal),
            ("'a' equals 1", Comparator::Equal),
            ("'a' is 1", Comparator::Equal),
        ];
        for (condition, expected) in cases {
            let source = format!("if {}\nsay 1\nend if", condition);
            match single(&source) {
                StatementKind::If { condition, body } => {
                    assert!(
                        matches!(condition, Expression::BinaryOp { op: BinOp::Compare(c), .. } if c == expected),
                        "condition {:?}",
                        condition
                    );
                    assert_eq!(body.len(), 1);
                }
                other => panic!("Expected If, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_parse_path_exists_condition() {
        match single("if {./data.txt} exists\nsay \"yes\"\nend if") {
            StatementKind::If { condition: Expression::PathExists(path), .. } => {
                assert!(matches!(*path, Expression::Word(ref p) if p == "./data.txt"));
            }
            other => panic!("Expected If with PathExists, got {:?}", other),
        }
    }

    #[test]
    fn test_repeat_variants_disambiguated() {
        assert!(matches!(single("repeat 5\nsay 1\nend repeat"), StatementKind::RepeatCount { .. }));
        assert!(matches!(single("repeat 'n'\nsay 1\nend repeat"), StatementKind::RepeatCount { .. }));
        assert!(matches!(single("repeat infinite\nsay 1\nend repeat"), StatementKind::RepeatInfinite { .. }));
        assert!(matches!(
            single("repeat while 'i' less than 5\nsay 1\nend repeat"),
            StatementKind::RepeatWhile { .. }
        ));
        assert!(matches!(
            single("repeat until 'i' = 5\nsay 1\nend repeat"),
            StatementKind::RepeatUntil { .. }
        ));
        match single("repeat for each 'f' in ./docs\nsay 'f'\nend repeat") {
            StatementKind::RepeatForEach { variable, path, body } => {
                assert_eq!(variable, "f");
                assert!(matches!(path, Expression::Word(ref p) if p == "./docs"));
                assert_eq!(body.len(), 1);
            }
            other => panic!("Expected RepeatForEach, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_blocks() {
        let source = r#"
repeat 3
    if 'i' > 1
        say "big"
    end if
end repeat
"#;
        match single(source) {
            StatementKind::RepeatCount { body, .. } => {
                assert!(matches!(body[0].kind, StatementKind::If { .. }));
            }
            other => panic!("Expected RepeatCount, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_and_call() {
        let program = parse("function greet\nsay \"hi\"\nend function\ngreet").unwrap();
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0].kind {
            StatementKind::FunctionDef { name, body } => {
                assert_eq!(name, "greet");
                assert_eq!(body.len(), 1);
            }
            other => panic!("Expected FunctionDef, got {:?}", other),
        }
        assert!(matches!(&program.statements[1].kind, StatementKind::Call(n) if n == "greet"));
    }

    #[test]
    fn test_call_before_definition_parses() {
        let program = parse("greet\nfunction greet\nsay 1\nend function").unwrap();
        assert!(matches!(&program.statements[0].kind, StatementKind::Call(n) if n == "greet"));
    }

    #[test]
    fn test_parse_try_catch() {
        match single("try\ndelete ./x\ncatch\nsay \"failed\"\nend try") {
            StatementKind::TryCatch { try_body, catch_body } => {
                assert_eq!(try_body.len(), 1);
                assert_eq!(catch_body.len(), 1);
            }
            other => panic!("Expected TryCatch, got {:?}", other),
        }
    }

    #[test]
    fn test_semicolon_chain_becomes_block() {
        let program = parse("say 1; say 2; say 3\nsay 4").unwrap();
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0].kind {
            StatementKind::Block(stmts) => assert_eq!(stmts.len(), 3),
            other => panic!("Expected Block, got {:?}", other),
        }
    }

    #[test]
    fn test_block_on_one_line() {
        match single("if 1 = 1; say 1; say 2; end if") {
            StatementKind::If { body, .. } => {
                assert_eq!(body.len(), 1);
                assert!(matches!(&body[0].kind, StatementKind::Block(stmts) if stmts.len() == 2));
            }
            other => panic!("Expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_file_and_network_statements() {
        assert!(matches!(single("copy a.txt to b.txt"), StatementKind::Copy { .. }));
        assert!(matches!(single("move a.txt to b.txt"), StatementKind::Move { .. }));
        assert!(matches!(single("delete a.txt"), StatementKind::Delete(_)));
        assert!(matches!(single("create file a.txt"), StatementKind::CreateFile(_)));
        assert!(matches!(single("create folder logs"), StatementKind::CreateFolder(_)));
        assert!(matches!(
            single(r#"make file notes.txt "hello""#),
            StatementKind::MakeFile { .. }
        ));
        match single("make folder a ./b/c \"d e\"") {
            StatementKind::MakeFolders(paths) => assert_eq!(paths.len(), 3),
            other => panic!("Expected MakeFolders, got {:?}", other),
        }
        assert!(matches!(single("ping example.com"), StatementKind::Ping(_)));
        assert!(matches!(
            single(r#"download "https://example.com/a.zip" to ./a.zip"#),
            StatementKind::Download { .. }
        ));
    }

    #[test]
    fn test_list_forms() {
        assert!(matches!(
            single("list"),
            StatementKind::List { filter: ListFilter::All, path: None }
        ));
        assert!(matches!(
            single("list folders"),
            StatementKind::List { filter: ListFilter::Folders, path: None }
        ));
        assert!(matches!(
            single("list files in ./src"),
            StatementKind::List { filter: ListFilter::Files, path: Some(_) }
        ));
    }

    #[test]
    fn test_line_numbers_tracked() {
        let program = parse("say 1\n\nsay 2").unwrap();
        assert_eq!(program.statements[0].line, 1);
        assert_eq!(program.statements[1].line, 3);
    }

    #[test]
    fn test_missing_end_reports_block_start() {
        let err = parse_err("say 0\nif 1 = 1\nsay 1\n");
        assert!(err.expected.contains("'end if'"), "{}", err);
        assert!(err.expected.contains("line 2"), "{}", err);
        assert_eq!(err.found, "end of input");
        assert!(err.unterminated);
    }

    #[test]
    fn test_mismatched_end() {
        let err = parse_err("repeat 2\nsay 1\nend if");
        assert!(err.expected.contains("'end repeat'"), "{}", err);
        assert_eq!(err.found, "'end if'");
        assert!(!err.unterminated);
    }

    #[test]
    fn test_try_without_catch() {
        let err = parse_err("try\nsay 1\nend try");
        assert!(err.expected.contains("'catch'"), "{}", err);
        assert!(!err.unterminated);
        assert!(parse_err("try\nsay 1\n").unterminated);
        assert!(parse_err("try\nsay 1\ncatch\nsay 2\n").unterminated);
    }

    #[test]
    fn test_incomplete_expression_is_not_an_open_block() {
        let err = parse_err("say (1 +");
        assert!(!err.unterminated);
    }

    #[test]
    fn test_missing_comparator() {
        let err = parse_err("if 'x' 5\nend if");
        assert_eq!(err.expected, "comparator");
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse_err("greet loudly");
        assert_eq!(err.expected, "end of statement");
    }

    #[test]
    fn test_stray_end_rejected() {
        assert!(matches!(parse("end if"), Err(ScriptError::Parse(_))));
    }

    #[test]
    fn test_lex_error_surfaces() {
        assert!(matches!(parse("say \"open"), Err(ScriptError::Lex(_))));
    }

    #[test]
    fn test_empty_program() {
        assert!(parse("# only a comment\n\n").unwrap().statements.is_empty());
    }
}
