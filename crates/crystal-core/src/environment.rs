use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::ast::{Scope, Statement, StringPart};
use crate::error::ScriptError;
use crate::value::Value;

/// Variable and function storage shared by every nested execution of a run.
///
/// There are no call frames: a function body sees and mutates the same
/// local namespace as its caller, and locals it sets remain after it returns.
#[derive(Debug, Default)]
pub struct Environment {
    locals: HashMap<String, Value>,
    globals: HashMap<String, Value>,
    functions: HashMap<String, Arc<[Statement]>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a name, local namespace first.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }

    pub fn lookup(&self, name: &str, line: usize) -> Result<Value, ScriptError> {
        self.get(name).cloned().ok_or_else(|| ScriptError::UndefinedVariable {
            name: name.to_string(),
            line,
        })
    }

    pub fn set(&mut self, scope: Scope, name: impl Into<String>, value: Value) {
        let name = name.into();
        match scope {
            Scope::Local => self.locals.insert(name, value),
            Scope::Global => self.globals.insert(name, value),
        };
    }

    /// Registers a function body, replacing any previous definition.
    pub fn define_function(&mut self, name: impl Into<String>, body: Arc<[Statement]>) {
        self.functions.insert(name.into(), body);
    }

    pub fn function(&self, name: &str) -> Option<Arc<[Statement]>> {
        self.functions.get(name).cloned()
    }

    /// Renders string parts, substituting each `'name'` with the variable's
    /// display text. Unknown names render as nothing.
    pub fn interpolate(&self, parts: &[StringPart]) -> String {
        let mut out = String::new();
        for part in parts {
            match part {
                StringPart::Literal(text) => out.push_str(text),
                StringPart::Variable(name) => match self.get(name) {
                    Some(value) => out.push_str(&value.as_string()),
                    None => warn!(name = %name, "undefined variable in string"),
                },
            }
        }
        out
    }
}
