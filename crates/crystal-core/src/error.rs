//! Error taxonomy for the Crystal language.
//!
//! Syntax errors ([`LexError`], [`ParseError`]) are found before a program
//! runs. Everything else surfaces as a [`ScriptError`] raised by the
//! evaluator, most of which a `try … catch` block can intercept.

use std::fmt;

use thiserror::Error;

/// A 1-based location in script source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors produced while turning source text into tokens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("Unterminated string starting at {position}")]
    UnterminatedString { position: Position },

    #[error("Unterminated variable reference starting at {position}")]
    UnterminatedVariable { position: Position },

    #[error("Unexpected character '{character}' at {position}")]
    UnexpectedCharacter { character: char, position: Position },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnterminatedString { position }
            | LexError::UnterminatedVariable { position }
            | LexError::UnexpectedCharacter { position, .. } => *position,
        }
    }
}

/// A grammar violation: what the parser wanted versus what it saw.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Parse error at {position}: expected {expected}, found {found}")]
pub struct ParseError {
    pub expected: String,
    pub found: String,
    pub position: Position,
    /// Input ended while a block was still open; more lines could complete it.
    pub unterminated: bool,
}

impl ParseError {
    pub fn new(expected: impl Into<String>, found: impl Into<String>, position: Position) -> Self {
        Self {
            expected: expected.into(),
            found: found.into(),
            position,
            unterminated: false,
        }
    }

    /// Input ran out inside an open block.
    pub fn unterminated(expected: impl Into<String>, position: Position) -> Self {
        Self {
            unterminated: true,
            ..Self::new(expected, "end of input", position)
        }
    }
}

/// Failures reported by a [`FileSystem`](crate::collab::FileSystem) collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FileSystemError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Failed to {operation} {path}: {reason}")]
    Io {
        operation: &'static str,
        path: String,
        reason: String,
    },
}

/// Failures reported by a [`Network`](crate::collab::Network) collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("{0} is unreachable")]
    Unreachable(String),

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },
}

/// Failures reported by a [`Console`](crate::collab::Console) collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsoleError {
    #[error("Console input closed")]
    Closed,

    #[error("Console I/O error: {0}")]
    Io(String),
}

/// Failures reported by a [`ScriptLoader`](crate::collab::ScriptLoader) collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Script not found: {0}")]
    NotFound(String),

    #[error("Cannot read script {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Any failure that ends or interrupts a script run.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Undefined variable '{name}' at line {line}")]
    UndefinedVariable { name: String, line: usize },

    #[error("Undefined function '{name}' at line {line}")]
    UndefinedFunction { name: String, line: usize },

    #[error("Type mismatch at line {line}: {message}")]
    TypeMismatch { message: String, line: usize },

    #[error("Division by zero at line {line}")]
    DivisionByZero { line: usize },

    #[error("Call depth exceeded {limit} at line {line} (calling '{name}')")]
    RecursionLimit { name: String, limit: usize, line: usize },

    #[error("File system error at line {line}: {source}")]
    FileSystem {
        #[source]
        source: FileSystemError,
        line: usize,
    },

    #[error("Network error at line {line}: {source}")]
    Network {
        #[source]
        source: NetworkError,
        line: usize,
    },

    #[error("Console error at line {line}: {source}")]
    Console {
        #[source]
        source: ConsoleError,
        line: usize,
    },

    #[error("Included script not found at line {line}: {path}")]
    IncludeNotFound { path: String, line: usize },

    #[error("Cannot include '{path}' at line {line}: {reason}")]
    IncludeFailed { path: String, reason: String, line: usize },

    #[error("Circular include detected at line {line}: {path}")]
    IncludeCycle { path: String, line: usize },

    #[error("In included script '{path}': {source}")]
    IncludeSyntax {
        path: String,
        #[source]
        source: Box<ScriptError>,
    },

    #[error("Script cancelled")]
    Cancelled,
}

impl ScriptError {
    /// Whether a `try` block may intercept this error.
    ///
    /// Syntax errors (including those of included scripts) and cancellation
    /// always end the run.
    pub fn is_catchable(&self) -> bool {
        !matches!(
            self,
            ScriptError::Lex(_)
                | ScriptError::Parse(_)
                | ScriptError::IncludeSyntax { .. }
                | ScriptError::Cancelled
        )
    }

    /// The source line the error was raised at, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            ScriptError::Lex(e) => Some(e.position().line),
            ScriptError::Parse(e) => Some(e.position.line),
            ScriptError::UndefinedVariable { line, .. }
            | ScriptError::UndefinedFunction { line, .. }
            | ScriptError::TypeMismatch { line, .. }
            | ScriptError::DivisionByZero { line }
            | ScriptError::RecursionLimit { line, .. }
            | ScriptError::FileSystem { line, .. }
            | ScriptError::Network { line, .. }
            | ScriptError::Console { line, .. }
            | ScriptError::IncludeNotFound { line, .. }
            | ScriptError::IncludeFailed { line, .. }
            | ScriptError::IncludeCycle { line, .. } => Some(*line),
            ScriptError::IncludeSyntax { source, .. } => source.line(),
            ScriptError::Cancelled => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ScriptError::Lex(_) | ScriptError::Parse(_) | ScriptError::IncludeSyntax { .. } => 2,
            ScriptError::Cancelled => 130,
            _ => 1,
        }
    }

    pub(crate) fn type_mismatch(message: impl Into<String>, line: usize) -> Self {
        ScriptError::TypeMismatch {
            message: message.into(),
            line,
        }
    }
}
