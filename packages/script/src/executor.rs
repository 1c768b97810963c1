//! ScriptExecutor: synthesize, persist, compile and bind snippets on first use.
//!
//! A call site keeps a [`ScriptCell`] with its snippet. The first `execute`
//! on a cell wraps the snippet into a full unit (via the
//! [`ScriptConverter`]), writes it to the unit store, compiles it back
//! through an [`InstanceLoader`] and binds the instance to the cell. Later
//! calls invoke the bound unit directly.

use std::path::PathBuf;
use std::sync::Arc;

use lazy_static::lazy_static;
use loadstone_entity::{EntityLoader, Value};
use loadstone_source::{BindStage, ByteSink, ByteSource, ByteStore, Error, FileSystemSource, Result};
use regex::Regex;

use crate::cell::ScriptCell;
use crate::compiler::{qualify, CompiledUnit, Compiler};
use crate::converter::ScriptConverter;
use crate::instance::InstanceLoader;

/// Settings for a filesystem-backed [`ScriptExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Where synthesized units are written. Must be an absolute path to an
    /// existing, writable directory.
    pub work_dir: PathBuf,
    /// Package every synthesized unit lives under, e.g. `gen`.
    pub root_package: String,
    /// File suffix for synthesized units.
    pub unit_suffix: String,
}

impl ExecutorConfig {
    pub fn new(work_dir: impl Into<PathBuf>, root_package: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            root_package: root_package.into(),
            unit_suffix: ".unit".to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_root_package(&self.root_package)?;

        let dir = &self.work_dir;
        if !dir.is_absolute() {
            return Err(Error::config(format!(
                "'{}' is not an absolute path",
                dir.display()
            )));
        }
        let metadata = std::fs::metadata(dir)
            .map_err(|e| Error::config(format!("'{}' is not accessible: {}", dir.display(), e)))?;
        if !metadata.is_dir() {
            return Err(Error::config(format!("'{}' is not a directory", dir.display())));
        }
        if metadata.permissions().readonly() {
            return Err(Error::config(format!("'{}' is not writable", dir.display())));
        }
        Ok(())
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::new(std::env::temp_dir(), "units")
    }
}

fn check_root_package(root_package: &str) -> Result<()> {
    if root_package.trim().is_empty() {
        return Err(Error::config("root package is empty"));
    }
    Ok(())
}

/// Reject ids that would escape or collide in the unit store.
fn check_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::invalid_argument("unit id is empty"));
    }
    let malformed = id.contains('\\')
        || id
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if malformed {
        return Err(Error::invalid_argument(format!("malformed unit id '{}'", id)));
    }
    Ok(())
}

/// Package for `id`: the root package plus the directory part of the id.
///
/// `derive_package("gen", "reports/monthly")` is `gen.reports`.
pub fn derive_package(root_package: &str, id: &str) -> String {
    let mut package = root_package.to_string();
    if let Some((dirs, _)) = id.rsplit_once('/') {
        package.push('.');
        package.push_str(dirs);
    }
    package.replace('/', ".").replace("..", ".")
}

/// Unit name for `id`: its last segment with every character outside
/// `[A-Za-z0-9_]` replaced by `_`. A leading digit gets a `_` prefix.
pub fn derive_name(id: &str) -> String {
    lazy_static! {
        static ref NOT_NAME_CHAR: Regex = Regex::new(r"[^A-Za-z0-9_/]").unwrap();
    }
    let sanitized = NOT_NAME_CHAR.replace_all(id, "_");
    let last = sanitized.rsplit('/').next().unwrap_or_default();
    if last.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", last)
    } else {
        last.to_string()
    }
}

/// Compiles snippets into units on first use and invokes them.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use loadstone_entity::Value;
/// use loadstone_script::{NativeCompiler, ScriptCell, ScriptExecutor, UnitConverter};
/// use loadstone_source::MemorySource;
///
/// let executor = ScriptExecutor::with_store(
///     "gen",
///     Arc::new(MemorySource::new("units")),
///     UnitConverter::new(),
///     NativeCompiler,
/// )
/// .unwrap();
///
/// let cell = ScriptCell::new("set doubled = ctx.n * 2\nreturn ctx.doubled");
/// let mut ctx = Value::from_json(serde_json::json!({"n": 21}));
/// assert_eq!(executor.execute("reports/answer", &cell, &mut ctx).unwrap(), Value::Integer(42));
/// ```
pub struct ScriptExecutor {
    root_package: String,
    unit_suffix: String,
    store: Arc<dyn ByteStore>,
    converter: Arc<dyn ScriptConverter>,
    loader: InstanceLoader,
}

impl ScriptExecutor {
    /// An executor writing synthesized units under `config.work_dir`.
    pub fn new(
        config: ExecutorConfig,
        converter: impl ScriptConverter + 'static,
        compiler: impl Compiler + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(FileSystemSource::in_dir(&config.work_dir, "").with_name("unit store"));
        Ok(Self::with_store(&config.root_package, store, converter, compiler)?
            .with_unit_suffix(&config.unit_suffix))
    }

    /// An executor over any byte store, e.g. a
    /// [`MemorySource`](loadstone_source::MemorySource).
    pub fn with_store<S>(
        root_package: &str,
        store: Arc<S>,
        converter: impl ScriptConverter + 'static,
        compiler: impl Compiler + 'static,
    ) -> Result<Self>
    where
        S: ByteStore + 'static,
    {
        check_root_package(root_package)?;
        let root_package = root_package.trim().to_string();

        let source: Arc<dyn ByteSource> = store.clone();
        let loader = InstanceLoader::new("ScriptExecutor", source, Arc::new(compiler));

        tracing::info!(root_package = %root_package, store = %store.name(), "script executor created");
        Ok(Self {
            root_package,
            unit_suffix: String::new(),
            store,
            converter: Arc::new(converter),
            loader,
        })
    }

    /// Append `suffix` to every unit key. The suffix is always added, so
    /// an id that already ends with it still gets its own key.
    pub fn with_unit_suffix(mut self, suffix: &str) -> Self {
        self.unit_suffix = suffix.trim().to_string();
        self
    }

    pub fn root_package(&self) -> &str {
        &self.root_package
    }

    pub fn store(&self) -> &Arc<dyn ByteStore> {
        &self.store
    }

    pub fn converter(&self) -> &Arc<dyn ScriptConverter> {
        &self.converter
    }

    /// Store key the unit for `id` is written under, unit suffix included.
    pub fn unit_key(&self, id: &str) -> String {
        format!("{}/{}{}", self.root_package.replace('.', "/"), id, self.unit_suffix)
    }

    /// Run the snippet in `cell` against `context`, binding it first if
    /// this is the cell's first use.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a malformed `id`
    /// - `BindingFailure` when the synthesized unit does not compile, cannot
    ///   be constructed or declares no invoke block; the cell stays unbound
    /// - `ExecutionFailure` when the unit fails while running
    pub fn execute(&self, id: &str, cell: &ScriptCell, context: &mut Value) -> Result<Value> {
        check_id(id)?;
        let unit = cell.bind_with(|snippet| self.bind(id, snippet, context))?;
        unit.invoke(context)
    }

    fn bind(&self, id: &str, snippet: &str, context: &Value) -> Result<Arc<dyn CompiledUnit>> {
        let package = derive_package(&self.root_package, id);
        let name = derive_name(id);
        let key = self.unit_key(id);

        let source = self.converter.convert(context, &package, &name, snippet);
        self.store.write(&key, source.as_bytes())?;
        tracing::debug!(id, key = %key, "synthesized unit written");

        let unit = self.loader.load(&key).map_err(compile_failure)?;
        if unit.package() != package || unit.name() != name {
            let path = self.loader.effective_path(&key).unwrap_or(key);
            return Err(Error::binding(
                path,
                BindStage::Capability,
                format!(
                    "expected unit '{}', found '{}'",
                    qualify(&package, &name),
                    unit.qualified_name()
                ),
            ));
        }
        tracing::info!(id, unit = %unit.qualified_name(), "unit bound");
        Ok(unit)
    }
}

/// Parse failures from the instance loader are compile-stage binding errors.
fn compile_failure(error: Error) -> Error {
    match error {
        Error::Parse {
            path,
            message,
            source,
        } => Error::Binding {
            path,
            stage: BindStage::Compile,
            message,
            source,
        },
        other => other,
    }
}

impl std::fmt::Debug for ScriptExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptExecutor")
            .field("root_package", &self.root_package)
            .field("unit_suffix", &self.unit_suffix)
            .field("store", &self.store.name())
            .field("loader", &self.loader)
            .finish()
    }
}
