//! The work behind each subcommand. Output goes to the writer passed in.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use loadstone::{
    ByteSource, ExecutorConfig, FileSystemSource, NativeCompiler, ScriptCell, ScriptExecutor,
    SourceChain, TemplateExec, UnitConverter, Value,
};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Loadstone(#[from] loadstone::Error),

    #[error("invalid --context: {0}")]
    Context(#[source] serde_json::Error),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type CliResult<T> = std::result::Result<T, CliError>;

fn io_error(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> CliError {
    let path = path.as_ref().display().to_string();
    move |source| CliError::Io { path, source }
}

/// Parse a JSON context argument. No argument is an empty map.
pub fn parse_context(json: Option<&str>) -> CliResult<Value> {
    match json {
        None => Ok(Value::map()),
        Some(text) => serde_json::from_str(text)
            .map(Value::from_json)
            .map_err(CliError::Context),
    }
}

/// A fallback chain over `roots`, earliest first.
pub fn chain(roots: &[PathBuf], suffix: &str) -> CliResult<SourceChain> {
    let children = roots
        .iter()
        .map(|root| {
            Arc::new(FileSystemSource::in_dir(root, suffix).with_name(root.display().to_string()))
                as Arc<dyn ByteSource>
        })
        .collect();
    Ok(SourceChain::new("roots", children)?)
}

pub fn cat(roots: &[PathBuf], suffix: &str, key: &str, out: &mut dyn Write) -> CliResult<()> {
    let bytes = chain(roots, suffix)?.read_bytes(key)?;
    out.write_all(&bytes).map_err(io_error("<stdout>"))
}

pub fn path(roots: &[PathBuf], suffix: &str, key: &str, out: &mut dyn Write) -> CliResult<()> {
    for path in chain(roots, suffix)?.effective_paths(key)? {
        writeln!(out, "{}", path).map_err(io_error("<stdout>"))?;
    }
    Ok(())
}

pub fn list(root: &Path, suffix: &str, out: &mut dyn Write) -> CliResult<()> {
    for key in FileSystemSource::in_dir(root, suffix).keys()? {
        writeln!(out, "{}", key).map_err(io_error("<stdout>"))?;
    }
    Ok(())
}

/// Options for [`run`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub file: PathBuf,
    pub work_dir: PathBuf,
    pub id: Option<String>,
    pub root_package: String,
    pub context: Option<String>,
    pub show_context: bool,
}

/// Compile the snippet in `options.file` and run it once.
///
/// The unit id defaults to the file stem.
pub fn run(options: &RunOptions, out: &mut dyn Write) -> CliResult<()> {
    let snippet = std::fs::read_to_string(&options.file).map_err(io_error(&options.file))?;
    let work_dir = std::fs::canonicalize(&options.work_dir).map_err(io_error(&options.work_dir))?;
    let id = match &options.id {
        Some(id) => id.clone(),
        None => options
            .file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let executor = ScriptExecutor::new(
        ExecutorConfig::new(work_dir, options.root_package.as_str()),
        UnitConverter::new(),
        NativeCompiler,
    )?;

    let mut context = parse_context(options.context.as_deref())?;
    let cell = ScriptCell::new(snippet);
    let result = executor.execute(&id, &cell, &mut context)?;
    tracing::info!(id = %id, unit = ?cell.bound().map(|unit| unit.qualified_name()), "ran unit");

    writeln!(out, "{}", result.to_json()).map_err(io_error("<stdout>"))?;
    if options.show_context {
        writeln!(out, "{}", context.to_json()).map_err(io_error("<stdout>"))?;
    }
    Ok(())
}

pub fn render(
    roots: &[PathBuf],
    suffix: &str,
    key: &str,
    context: Option<&str>,
    out: &mut dyn Write,
) -> CliResult<()> {
    let context = parse_context(context)?;
    let exec = TemplateExec::cached("render", Arc::new(chain(roots, "")?), 0)?
        .with_affixes("", suffix);
    exec.execute(key, &context, out)?;
    Ok(())
}
