//! Tokenizer for Crystal source text.
//!
//! Produces a flat token stream with source positions. Comments (`#` to end of
//! line) and insignificant whitespace are dropped; newlines and `;` survive as
//! statement separators. Inside double-quoted strings, `'name'` spans become
//! [`StringPart::Variable`] interpolation points.

use std::fmt;

use crate::ast::StringPart;
use crate::error::{LexError, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Say,
    Ask,
    Set,
    Local,
    Global,
    If,
    End,
    Repeat,
    Infinite,
    While,
    Until,
    For,
    Each,
    In,
    Function,
    Include,
    Try,
    Catch,
    Pause,
    Copy,
    Move,
    Delete,
    List,
    Create,
    Make,
    File,
    Folder,
    Files,
    Folders,
    All,
    To,
    Ping,
    Download,
    Exists,
    Greater,
    Less,
    Than,
    Equals,
    Is,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("say", Keyword::Say),
    ("ask", Keyword::Ask),
    ("set", Keyword::Set),
    ("local", Keyword::Local),
    ("global", Keyword::Global),
    ("if", Keyword::If),
    ("end", Keyword::End),
    ("repeat", Keyword::Repeat),
    ("infinite", Keyword::Infinite),
    ("while", Keyword::While),
    ("until", Keyword::Until),
    ("for", Keyword::For),
    ("each", Keyword::Each),
    ("in", Keyword::In),
    ("function", Keyword::Function),
    ("include", Keyword::Include),
    ("try", Keyword::Try),
    ("catch", Keyword::Catch),
    ("pause", Keyword::Pause),
    ("copy", Keyword::Copy),
    ("move", Keyword::Move),
    ("delete", Keyword::Delete),
    ("list", Keyword::List),
    ("create", Keyword::Create),
    ("make", Keyword::Make),
    ("file", Keyword::File),
    ("folder", Keyword::Folder),
    ("files", Keyword::Files),
    ("folders", Keyword::Folders),
    ("all", Keyword::All),
    ("to", Keyword::To),
    ("ping", Keyword::Ping),
    ("download", Keyword::Download),
    ("exists", Keyword::Exists),
    ("greater", Keyword::Greater),
    ("less", Keyword::Less),
    ("than", Keyword::Than),
    ("equals", Keyword::Equals),
    ("is", Keyword::Is),
];

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(text, _)| *text == word)
            .map(|(_, keyword)| *keyword)
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, keyword)| *keyword == self)
            .map(|(text, _)| *text)
            .unwrap_or("?")
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    Word(String),
    Number(f64),
    String(Vec<StringPart>),
    Variable(String),
    Path(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Greater,
    Less,
    Equals,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semicolon,
    Newline,
}

impl Token {
    /// Tokens that can end an operand, after which `/` means division.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Word(_)
                | Token::Number(_)
                | Token::String(_)
                | Token::Variable(_)
                | Token::Path(_)
                | Token::RParen
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => write!(f, "'{}'", k),
            Token::Word(w) => write!(f, "word '{}'", w),
            Token::Number(n) => write!(f, "number {}", n),
            Token::String(_) => write!(f, "string literal"),
            Token::Variable(name) => write!(f, "variable '{}'", name),
            Token::Path(p) => write!(f, "path {}", p),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Percent => write!(f, "'%'"),
            Token::Greater => write!(f, "'>'"),
            Token::Less => write!(f, "'<'"),
            Token::Equals => write!(f, "'='"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::Semicolon => write!(f, "';'"),
            Token::Newline => write!(f, "end of line"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub token: Token,
    pub position: Position,
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ends_path(c: char) -> bool {
    c.is_whitespace() || matches!(c, ';' | '}' | ')')
}

pub fn tokenize(source: &str) -> Result<Vec<Located>, LexError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Located>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn push(&mut self, token: Token, position: Position) {
        self.tokens.push(Located { token, position });
    }

    fn single(&mut self, token: Token, position: Position) {
        self.bump();
        self.push(token, position);
    }

    fn after_operand(&self) -> bool {
        self.tokens.last().map_or(false, |t| t.token.ends_operand())
    }

    fn run(mut self) -> Result<Vec<Located>, LexError> {
        while let Some(ch) = self.peek() {
            let start = self.position();
            match ch {
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '\n' => {
                    self.bump();
                    if self.tokens.last().map_or(true, |t| t.token != Token::Newline) {
                        self.push(Token::Newline, start);
                    }
                }
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '"' => self.lex_string(start)?,
                '\'' => self.lex_variable(start)?,
                '(' => self.single(Token::LParen, start),
                ')' => self.single(Token::RParen, start),
                '{' => self.single(Token::LBrace, start),
                '}' => self.single(Token::RBrace, start),
                ';' => self.single(Token::Semicolon, start),
                '+' => self.single(Token::Plus, start),
                '-' => self.single(Token::Minus, start),
                '*' => self.single(Token::Star, start),
                '%' => self.single(Token::Percent, start),
                '>' => self.single(Token::Greater, start),
                '<' => self.single(Token::Less, start),
                '=' => self.single(Token::Equals, start),
                '/' if !self.after_operand() && self.peek_at(1).map_or(false, |c| !ends_path(c)) => {
                    self.lex_path(start)
                }
                '/' => self.single(Token::Slash, start),
                '.' => self.lex_path(start),
                '~' if matches!(self.peek_at(1), Some('/') | Some('\\')) => self.lex_path(start),
                c if c.is_ascii_alphabetic()
                    && self.peek_at(1) == Some(':')
                    && matches!(self.peek_at(2), Some('/') | Some('\\')) =>
                {
                    self.lex_path(start)
                }
                c if c.is_ascii_digit() => self.lex_number(start),
                c if is_name_start(c) => self.lex_word(start),
                other => {
                    return Err(LexError::UnexpectedCharacter {
                        character: other,
                        position: start,
                    });
                }
            }
        }

        Ok(self.tokens)
    }

    fn lex_string(&mut self, start: Position) -> Result<(), LexError> {
        self.bump();
        let mut parts = Vec::new();
        let mut text = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => return Err(LexError::UnterminatedString { position: start }),
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\'') => match self.scan_interpolation() {
                    Some(name) => {
                        if !text.is_empty() {
                            parts.push(StringPart::Literal(std::mem::take(&mut text)));
                        }
                        parts.push(StringPart::Variable(name));
                    }
                    None => {
                        self.bump();
                        text.push('\'');
                    }
                },
                Some(c) => {
                    self.bump();
                    text.push(c);
                }
            }
        }

        if !text.is_empty() {
            parts.push(StringPart::Literal(text));
        }
        self.push(Token::String(parts), start);
        Ok(())
    }

    /// At a `'` inside a string: consumes `'name'` and returns the name, or
    /// consumes nothing when the span is not a well-formed reference.
    fn scan_interpolation(&mut self) -> Option<String> {
        let mut end = self.pos + 1;
        if !self.chars.get(end).copied().map_or(false, is_name_start) {
            return None;
        }
        while self.chars.get(end).copied().map_or(false, is_name_char) {
            end += 1;
        }
        if self.chars.get(end) != Some(&'\'') {
            return None;
        }

        let name: String = self.chars[self.pos + 1..end].iter().collect();
        while self.pos <= end {
            self.bump();
        }
        Some(name)
    }

    fn lex_variable(&mut self, start: Position) -> Result<(), LexError> {
        self.bump();
        let mut name = String::new();
        loop {
            match self.peek() {
                Some(c) if is_name_char(c) => {
                    self.bump();
                    name.push(c);
                }
                Some('\'') if !name.is_empty() => {
                    self.bump();
                    break;
                }
                _ => return Err(LexError::UnterminatedVariable { position: start }),
            }
        }
        self.push(Token::Variable(name), start);
        Ok(())
    }

    fn lex_path(&mut self, start: Position) {
        let mut path = String::new();
        while let Some(c) = self.peek() {
            if ends_path(c) {
                break;
            }
            self.bump();
            path.push(c);
        }
        self.push(Token::Path(path), start);
    }

    fn lex_number(&mut self, start: Position) {
        let mut run = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) || c == '.' {
                self.bump();
                run.push(c);
            } else {
                break;
            }
        }

        let numeric = run.chars().all(|c| c.is_ascii_digit() || c == '.');
        match run.parse::<f64>() {
            Ok(n) if numeric => self.push(Token::Number(n), start),
            _ => self.push(Token::Word(run), start),
        }
    }

    fn lex_word(&mut self, start: Position) {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) || c == '.' || c == '-' {
                self.bump();
                word.push(c);
            } else {
                break;
            }
        }

        let token = match Keyword::from_word(&word) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Word(word),
        };
        self.push(token, start);
    }
}
