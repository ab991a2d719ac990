use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub line: usize,
}

impl Statement {
    pub fn new(kind: StatementKind, line: usize) -> Self {
        Self { kind, line }
    }
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Say(Expression),
    Ask {
        prompt: Expression,
        scope: Scope,
        variable: String,
    },
    Pause(Option<Expression>),
    Assign {
        scope: Scope,
        variable: String,
        value: Expression,
    },
    If {
        condition: Expression,
        body: Vec<Statement>,
    },
    RepeatCount {
        count: Expression,
        body: Vec<Statement>,
    },
    RepeatInfinite {
        body: Vec<Statement>,
    },
    RepeatWhile {
        condition: Expression,
        body: Vec<Statement>,
    },
    RepeatUntil {
        condition: Expression,
        body: Vec<Statement>,
    },
    RepeatForEach {
        variable: String,
        path: Expression,
        body: Vec<Statement>,
    },
    FunctionDef {
        name: String,
        body: Arc<[Statement]>,
    },
    Call(String),
    Include(Expression),
    TryCatch {
        try_body: Vec<Statement>,
        catch_body: Vec<Statement>,
    },
    Copy {
        source: Expression,
        destination: Expression,
    },
    Move {
        source: Expression,
        destination: Expression,
    },
    Delete(Expression),
    List {
        filter: ListFilter,
        path: Option<Expression>,
    },
    CreateFile(Expression),
    CreateFolder(Expression),
    MakeFile {
        path: Expression,
        content: Expression,
    },
    MakeFolders(Vec<Expression>),
    Ping(Expression),
    Download {
        url: Expression,
        destination: Expression,
    },
    /// Statements chained with `;` on one line.
    Block(Vec<Statement>),
}

#[derive(Debug, Clone)]
pub enum Expression {
    Number(f64),
    /// Bare word or path, taken literally.
    Word(String),
    /// Double-quoted string with interpolation points.
    String(Vec<StringPart>),
    Variable(String),
    BinaryOp {
        op: BinOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Grouping(Box<Expression>),
    PathExists(Box<Expression>),
}

/// A segment of a string literal: either literal text or a `'name'` reference.
#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    Literal(String),
    Variable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Compare(Comparator),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Greater,
    Less,
    Equal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    #[default]
    All,
    Files,
    Folders,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Modulo => "%",
            BinOp::Compare(Comparator::Greater) => ">",
            BinOp::Compare(Comparator::Less) => "<",
            BinOp::Compare(Comparator::Equal) => "=",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for ListFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListFilter::All => "all",
            ListFilter::Files => "files",
            ListFilter::Folders => "folders",
        })
    }
}
