//! # crystal-core
//!
//! Core library for the Crystal scripting language: a line-oriented shell
//! language whose statements read like plain English commands.
//!
//! Source text is tokenized and parsed into a [`Program`] once, then an
//! [`Evaluator`] walks it against a mutable [`Environment`]. Everything that
//! touches the outside world goes through the collaborator traits in
//! [`collab`], so the whole engine runs against in-memory fakes in tests.
//!
//! ## Modules
//!
//! - [`lexer`] - Source text to tokens, with string interpolation points
//! - [`parser`] - Tokens to a statement tree
//! - [`ast`] - Statement and expression types
//! - [`value`] - Runtime values and arithmetic
//! - [`environment`] - Local and global variables plus function table
//! - [`evaluator`] - Statement execution, includes and error recovery
//! - [`collab`] - Console, file system, network and script loader traits
//! - [`config`] - Persistent settings in `~/.crystal/config.json`
//! - [`testing`] - In-memory collaborators
//!
//! ## Example
//!
//! ```no_run
//! use crystal_core::testing::TestBed;
//!
//! # async fn demo() -> Result<(), crystal_core::ScriptError> {
//! let bed = TestBed::new();
//! let mut evaluator = bed.evaluator();
//! evaluator.run_source("set local 'x' = 5 + 3\nsay \"Value: 'x'\"").await?;
//! assert_eq!(bed.console.output(), vec!["Value: 8"]);
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod collab;
pub mod config;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod testing;
pub mod value;

pub use ast::Program;
pub use collab::Collaborators;
pub use environment::Environment;
pub use error::ScriptError;
pub use evaluator::{EvalOptions, Evaluator};
pub use parser::parse;
pub use value::Value;
