use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ast::*;
use crate::collab::{Collaborators, LoadedScript};
use crate::config::CrystalConfig;
use crate::environment::Environment;
use crate::error::{ConsoleError, LoadError, ScriptError};
use crate::parser;
use crate::value::Value;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

const DEFAULT_PAUSE_MESSAGE: &str = "Press Enter to continue...";
const LIST_RULE_WIDTH: usize = 50;

/// Behavior switches for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    /// Ask on the console before deleting or overwriting.
    pub confirm_destructive: bool,
    /// Print a `[SUCCESS]` line after each file or network action.
    pub report_actions: bool,
    /// Deepest allowed nesting of function calls.
    pub max_call_depth: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            confirm_destructive: true,
            report_actions: true,
            max_call_depth: 100,
        }
    }
}

impl From<&CrystalConfig> for EvalOptions {
    fn from(config: &CrystalConfig) -> Self {
        Self {
            confirm_destructive: config.confirm_destructive,
            report_actions: config.report_actions,
            ..Self::default()
        }
    }
}

/// Walks parsed programs against one long-lived [`Environment`].
///
/// An evaluator can run many programs in turn (the interactive shell feeds it
/// one line at a time); variables and functions carry over between runs.
pub struct Evaluator {
    env: Environment,
    io: Collaborators,
    options: EvalOptions,
    cancel: CancellationToken,
    base_dir: PathBuf,
    include_stack: Vec<PathBuf>,
    depth: usize,
}

impl Evaluator {
    pub fn new(io: Collaborators) -> Self {
        Self {
            env: Environment::new(),
            io,
            options: EvalOptions::default(),
            cancel: CancellationToken::new(),
            base_dir: PathBuf::new(),
            include_stack: Vec::new(),
            depth: 0,
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Directory that relative `include` paths resolve against.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Replaces the cancellation token, e.g. with a fresh one per shell line.
    pub fn set_cancellation(&mut self, cancel: CancellationToken) {
        self.cancel = cancel;
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Runs a parsed program: top-level functions are registered first, then
    /// statements execute in order.
    pub async fn run(&mut self, program: &Program) -> Result<(), ScriptError> {
        self.hoist(&program.statements);
        self.execute_block(&program.statements).await
    }

    pub async fn run_source(&mut self, source: &str) -> Result<(), ScriptError> {
        let program = parser::parse(source)?;
        self.run(&program).await
    }

    /// Runs an entry script. Its directory becomes the include base and the
    /// script counts as active for include cycle detection.
    pub async fn run_script(&mut self, script: &LoadedScript) -> Result<(), ScriptError> {
        let program = parser::parse(&script.source)?;
        info!(path = %script.path.display(), "running script");
        let previous = self.enter_script(&script.path);
        let result = self.run(&program).await;
        self.leave_script(previous);
        result
    }

    fn hoist(&mut self, statements: &[Statement]) {
        for stmt in statements {
            match &stmt.kind {
                StatementKind::FunctionDef { name, body } => {
                    self.env.define_function(name.clone(), body.clone());
                }
                StatementKind::Block(inner) => self.hoist(inner),
                _ => {}
            }
        }
    }

    fn enter_script(&mut self, path: &Path) -> PathBuf {
        self.include_stack.push(path.to_path_buf());
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        std::mem::replace(&mut self.base_dir, parent)
    }

    fn leave_script(&mut self, previous_base: PathBuf) {
        self.include_stack.pop();
        self.base_dir = previous_base;
    }

    fn checkpoint(&self) -> Result<(), ScriptError> {
        if self.cancel.is_cancelled() {
            return Err(ScriptError::Cancelled);
        }
        Ok(())
    }

    /// Start of every loop iteration: honor cancellation and let other tasks
    /// (such as a Ctrl-C listener) run.
    async fn loop_checkpoint(&self) -> Result<(), ScriptError> {
        self.checkpoint()?;
        tokio::task::yield_now().await;
        self.checkpoint()
    }

    fn execute_block<'a>(&'a mut self, statements: &'a [Statement]) -> BoxFuture<'a, Result<(), ScriptError>> {
        Box::pin(async move {
            for stmt in statements {
                self.execute_statement(stmt).await?;
            }
            Ok(())
        })
    }

    fn execute_statement<'a>(&'a mut self, stmt: &'a Statement) -> BoxFuture<'a, Result<(), ScriptError>> {
        Box::pin(async move {
            self.checkpoint()?;
            let line = stmt.line;
            match &stmt.kind {
                StatementKind::Say(expr) => {
                    let value = self.eval_expression(expr, line).await?;
                    self.write(&value.as_string(), line).await
                }
                StatementKind::Ask { prompt, scope, variable } => {
                    let prompt = self.eval_expression(prompt, line).await?.as_string();
                    let answer = self
                        .io
                        .console
                        .read_line(&format!("{} ", prompt))
                        .await
                        .map_err(|source| ScriptError::Console { source, line })?;
                    self.env.set(*scope, variable.clone(), Value::Text(answer));
                    Ok(())
                }
                StatementKind::Pause(message) => {
                    let message = match message {
                        Some(expr) => self.eval_expression(expr, line).await?.as_string(),
                        None => DEFAULT_PAUSE_MESSAGE.to_string(),
                    };
                    match self.io.console.read_line(&message).await {
                        Ok(_) | Err(ConsoleError::Closed) => Ok(()),
                        Err(source) => Err(ScriptError::Console { source, line }),
                    }
                }
                StatementKind::Assign { scope, variable, value } => {
                    let value = self.eval_expression(value, line).await?;
                    debug!(line, variable = %variable, ?scope, "assigned");
                    self.env.set(*scope, variable.clone(), value);
                    Ok(())
                }
                StatementKind::If { condition, body } => {
                    if self.eval_condition(condition, line).await? {
                        self.execute_block(body).await?;
                    }
                    Ok(())
                }
                StatementKind::RepeatCount { count, body } => {
                    let value = self.eval_expression(count, line).await?;
                    let count = value.as_number().ok_or_else(|| {
                        ScriptError::type_mismatch(format!("repeat count \"{}\" is not a number", value), line)
                    })?;
                    let times = if count >= 1.0 { count.floor() as u64 } else { 0 };
                    for _ in 0..times {
                        self.loop_checkpoint().await?;
                        self.execute_block(body).await?;
                    }
                    Ok(())
                }
                StatementKind::RepeatInfinite { body } => loop {
                    self.loop_checkpoint().await?;
                    self.execute_block(body).await?;
                },
                StatementKind::RepeatWhile { condition, body } => {
                    loop {
                        self.loop_checkpoint().await?;
                        if !self.eval_condition(condition, line).await? {
                            break;
                        }
                        self.execute_block(body).await?;
                    }
                    Ok(())
                }
                StatementKind::RepeatUntil { condition, body } => {
                    loop {
                        self.loop_checkpoint().await?;
                        if self.eval_condition(condition, line).await? {
                            break;
                        }
                        self.execute_block(body).await?;
                    }
                    Ok(())
                }
                StatementKind::RepeatForEach { variable, path, body } => {
                    let path = self.eval_path(path, line).await?;
                    let entries = self
                        .io
                        .fs
                        .list_entries(&path, ListFilter::All)
                        .await
                        .map_err(|source| ScriptError::FileSystem { source, line })?;
                    for entry in entries {
                        self.loop_checkpoint().await?;
                        self.env.set(Scope::Local, variable.clone(), Value::Text(entry.name));
                        self.execute_block(body).await?;
                    }
                    Ok(())
                }
                StatementKind::FunctionDef { name, body } => {
                    debug!(line, function = %name, "function defined");
                    self.env.define_function(name.clone(), body.clone());
                    Ok(())
                }
                StatementKind::Call(name) => self.call_function(name, line).await,
                StatementKind::Include(path) => self.include(path, line).await,
                StatementKind::TryCatch { try_body, catch_body } => {
                    match self.execute_block(try_body).await {
                        Ok(()) => Ok(()),
                        Err(err) if err.is_catchable() => {
                            warn!(line, error = %err, "error caught");
                            self.execute_block(catch_body).await
                        }
                        Err(err) => Err(err),
                    }
                }
                StatementKind::Copy { source, destination } => {
                    let source = self.eval_path(source, line).await?;
                    let destination = self.eval_path(destination, line).await?;
                    if !self.confirm_overwrite(&destination, line).await? {
                        return self.write("[CANCELLED] Copy operation cancelled", line).await;
                    }
                    self.io
                        .fs
                        .copy(&source, &destination)
                        .await
                        .map_err(|source| ScriptError::FileSystem { source, line })?;
                    info!(line, from = %source.display(), to = %destination.display(), "copied");
                    self.report(&format!("[SUCCESS] Copied: {} -> {}", source.display(), destination.display()), line)
                        .await
                }
                StatementKind::Move { source, destination } => {
                    let source = self.eval_path(source, line).await?;
                    let destination = self.eval_path(destination, line).await?;
                    if !self.confirm_overwrite(&destination, line).await? {
                        return self.write("[CANCELLED] Move operation cancelled", line).await;
                    }
                    self.io
                        .fs
                        .move_path(&source, &destination)
                        .await
                        .map_err(|source| ScriptError::FileSystem { source, line })?;
                    info!(line, from = %source.display(), to = %destination.display(), "moved");
                    self.report(&format!("[SUCCESS] Moved: {} -> {}", source.display(), destination.display()), line)
                        .await
                }
                StatementKind::Delete(path) => {
                    let path = self.eval_path(path, line).await?;
                    if self.options.confirm_destructive && self.io.fs.exists(&path).await {
                        self.write(&format!("[WARNING] About to delete {}", path.display()), line)
                            .await?;
                        if !self.confirm("Are you sure? (yes/no)", line).await? {
                            return self.write("[CANCELLED] Delete operation cancelled", line).await;
                        }
                    }
                    self.io
                        .fs
                        .delete(&path)
                        .await
                        .map_err(|source| ScriptError::FileSystem { source, line })?;
                    info!(line, path = %path.display(), "deleted");
                    self.report(&format!("[SUCCESS] Deleted: {}", path.display()), line).await
                }
                StatementKind::List { filter, path } => {
                    let path = match path {
                        Some(expr) => self.eval_path(expr, line).await?,
                        None => PathBuf::from("."),
                    };
                    self.list(*filter, &path, line).await
                }
                StatementKind::CreateFile(path) => {
                    let path = self.eval_path(path, line).await?;
                    self.io
                        .fs
                        .create_file(&path)
                        .await
                        .map_err(|source| ScriptError::FileSystem { source, line })?;
                    info!(line, path = %path.display(), "created file");
                    self.report(&format!("[SUCCESS] Created file: {}", path.display()), line).await
                }
                StatementKind::CreateFolder(path) => {
                    let path = self.eval_path(path, line).await?;
                    self.io
                        .fs
                        .create_folder(&path)
                        .await
                        .map_err(|source| ScriptError::FileSystem { source, line })?;
                    info!(line, path = %path.display(), "created folder");
                    self.report(&format!("[SUCCESS] Created folder: {}", path.display()), line).await
                }
                StatementKind::MakeFile { path, content } => {
                    let path = self.eval_path(path, line).await?;
                    let content = self.eval_expression(content, line).await?.as_string();
                    if !self.confirm_overwrite(&path, line).await? {
                        return self.write("[CANCELLED] Make file operation cancelled", line).await;
                    }
                    self.io
                        .fs
                        .write_file(&path, &content)
                        .await
                        .map_err(|source| ScriptError::FileSystem { source, line })?;
                    info!(line, path = %path.display(), bytes = content.len(), "wrote file");
                    self.report(&format!("[SUCCESS] Created file: {}", path.display()), line).await
                }
                StatementKind::MakeFolders(paths) => {
                    let mut folders = Vec::with_capacity(paths.len());
                    for expr in paths {
                        folders.push(self.eval_path(expr, line).await?);
                    }
                    self.io
                        .fs
                        .create_folders(&folders)
                        .await
                        .map_err(|source| ScriptError::FileSystem { source, line })?;
                    info!(line, count = folders.len(), "created folders");
                    self.report(&format!("[SUCCESS] Created {} folder(s):", folders.len()), line)
                        .await?;
                    for folder in &folders {
                        self.report(&format!("  - {}", folder.display()), line).await?;
                    }
                    Ok(())
                }
                StatementKind::Ping(host) => {
                    let host = self.eval_expression(host, line).await?.as_string();
                    self.report(&format!("Pinging {}...", host), line).await?;
                    self.io
                        .network
                        .ping(&host)
                        .await
                        .map_err(|source| ScriptError::Network { source, line })?;
                    info!(line, host = %host, "host reachable");
                    self.report(&format!("[SUCCESS] {} is reachable", host), line).await
                }
                StatementKind::Download { url, destination } => {
                    let url = self.eval_expression(url, line).await?.as_string();
                    let destination = self.eval_path(destination, line).await?;
                    self.report(&format!("Downloading {}...", url), line).await?;
                    if !self.confirm_overwrite(&destination, line).await? {
                        return self.write("[CANCELLED] Download cancelled", line).await;
                    }
                    let bytes = self
                        .io
                        .network
                        .download(&url, &destination)
                        .await
                        .map_err(|source| ScriptError::Network { source, line })?;
                    info!(line, url = %url, bytes, "downloaded");
                    self.report(
                        &format!(
                            "[SUCCESS] Downloaded to {} ({:.2} KB)",
                            destination.display(),
                            bytes as f64 / 1024.0
                        ),
                        line,
                    )
                    .await
                }
                StatementKind::Block(statements) => self.execute_block(statements).await,
            }
        })
    }

    async fn call_function(&mut self, name: &str, line: usize) -> Result<(), ScriptError> {
        let body = self.env.function(name).ok_or_else(|| ScriptError::UndefinedFunction {
            name: name.to_string(),
            line,
        })?;
        if self.depth >= self.options.max_call_depth {
            return Err(ScriptError::RecursionLimit {
                name: name.to_string(),
                limit: self.options.max_call_depth,
                line,
            });
        }

        debug!(line, function = %name, depth = self.depth, "calling function");
        self.depth += 1;
        let result = self.execute_block(&body).await;
        self.depth -= 1;
        result
    }

    async fn include(&mut self, path: &Expression, line: usize) -> Result<(), ScriptError> {
        let raw_path = self.eval_expression(path, line).await?.as_string();
        let resolved = self.resolve_include_path(&raw_path);

        let script = self.io.loader.load(&resolved).await.map_err(|e| match e {
            LoadError::NotFound(_) => ScriptError::IncludeNotFound {
                path: raw_path.clone(),
                line,
            },
            LoadError::Io { reason, .. } => ScriptError::IncludeFailed {
                path: raw_path.clone(),
                reason,
                line,
            },
        })?;

        if self.include_stack.contains(&script.path) {
            return Err(ScriptError::IncludeCycle {
                path: script.path.display().to_string(),
                line,
            });
        }

        let program = parser::parse(&script.source).map_err(|e| ScriptError::IncludeSyntax {
            path: raw_path.clone(),
            source: Box::new(e),
        })?;

        info!(line, path = %script.path.display(), "including script");
        let previous = self.enter_script(&script.path);
        let result = self.run(&program).await;
        self.leave_script(previous);
        result
    }

    fn resolve_include_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() || path.starts_with('~') {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    async fn list(&self, filter: ListFilter, path: &Path, line: usize) -> Result<(), ScriptError> {
        let entries = self
            .io
            .fs
            .list_entries(path, filter)
            .await
            .map_err(|source| ScriptError::FileSystem { source, line })?;

        if entries.is_empty() {
            return self
                .write(&format!("No {} found in: {}", filter, path.display()), line)
                .await;
        }

        let mut names: Vec<String> = entries
            .iter()
            .map(|entry| {
                if entry.is_folder() {
                    format!("{}/", entry.name)
                } else {
                    entry.name.clone()
                }
            })
            .collect();
        names.sort();

        self.write(&format!("Listing {} in: {}", filter, path.display()), line)
            .await?;
        self.write(&"-".repeat(LIST_RULE_WIDTH), line).await?;
        for name in &names {
            self.write(&format!("  {}", name), line).await?;
        }
        self.write(&format!("Total: {} item(s)", names.len()), line).await
    }

    fn eval_expression<'a>(&'a self, expr: &'a Expression, line: usize) -> BoxFuture<'a, Result<Value, ScriptError>> {
        Box::pin(async move {
            match expr {
                Expression::Number(n) => Ok(Value::Number(*n)),
                Expression::Word(word) => Ok(Value::Text(word.clone())),
                Expression::String(parts) => Ok(Value::Text(self.env.interpolate(parts))),
                Expression::Variable(name) => self.env.lookup(name, line),
                Expression::BinaryOp { op, left, right } => {
                    let lhs = self.eval_expression(left, line).await?;
                    let rhs = self.eval_expression(right, line).await?;
                    Value::binary(*op, &lhs, &rhs, line)
                }
                Expression::Grouping(inner) => self.eval_expression(inner, line).await,
                Expression::PathExists(path) => {
                    let path = self.eval_path(path, line).await?;
                    Ok(Value::Bool(self.io.fs.exists(&path).await))
                }
            }
        })
    }

    async fn eval_condition(&self, condition: &Expression, line: usize) -> Result<bool, ScriptError> {
        match self.eval_expression(condition, line).await? {
            Value::Bool(b) => Ok(b),
            other => Err(ScriptError::type_mismatch(
                format!("\"{}\" is not a condition", other),
                line,
            )),
        }
    }

    async fn eval_path(&self, expr: &Expression, line: usize) -> Result<PathBuf, ScriptError> {
        Ok(PathBuf::from(self.eval_expression(expr, line).await?.as_string()))
    }

    async fn write(&self, text: &str, line: usize) -> Result<(), ScriptError> {
        self.io
            .console
            .write_line(text)
            .await
            .map_err(|source| ScriptError::Console { source, line })
    }

    async fn report(&self, text: &str, line: usize) -> Result<(), ScriptError> {
        if self.options.report_actions {
            self.write(text, line).await?;
        }
        Ok(())
    }

    /// Asks a yes/no question. Closed input counts as "no".
    async fn confirm(&self, question: &str, line: usize) -> Result<bool, ScriptError> {
        match self.io.console.read_line(&format!("{} ", question)).await {
            Ok(answer) => Ok(matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")),
            Err(ConsoleError::Closed) => Ok(false),
            Err(source) => Err(ScriptError::Console { source, line }),
        }
    }

    async fn confirm_overwrite(&self, destination: &Path, line: usize) -> Result<bool, ScriptError> {
        if !self.options.confirm_destructive || !self.io.fs.exists(destination).await {
            return Ok(true);
        }
        self.confirm(
            &format!("'{}' already exists. Overwrite? (yes/no)", destination.display()),
            line,
        )
        .await
    }
}
