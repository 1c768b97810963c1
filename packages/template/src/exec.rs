//! TemplateExec: look up a template by id and merge it into an output.

use std::borrow::Borrow;
use std::io::Write;
use std::sync::Arc;

use loadstone_entity::{CachingLoader, EntityLoader, SourceLoader, Value};
use loadstone_source::{check_key, Affixes, ByteSource, Error, ErrorKind, Result};

use crate::decoder::TemplateDecoder;
use crate::template::Template;

/// Loads templates straight from a source.
pub type TemplateLoader = SourceLoader<TemplateDecoder>;

/// Keeps parsed templates for a lifetime.
pub type TemplateCache = CachingLoader<TemplateLoader>;

/// Suffix applied to template ids unless configured otherwise.
pub const DEFAULT_SUFFIX: &str = ".tpl";

/// Executes templates loaded through `L`.
///
/// Ids are turned into loader keys with the executor's affixes. The loader
/// may produce templates directly or shared ones (`Arc<Template>`, as a
/// [`CachingLoader`] does).
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use loadstone_entity::Value;
/// use loadstone_source::MemorySource;
/// use loadstone_template::TemplateExec;
///
/// let source = Arc::new(MemorySource::new("mail"));
/// source.insert("welcome.tpl", "Welcome, ${name}!");
///
/// let exec = TemplateExec::cached("mail", source, 60_000).unwrap();
/// let mut out = Vec::new();
/// let context = Value::from_json(serde_json::json!({"name": "Ada"}));
/// exec.execute("welcome", &context, &mut out).unwrap();
/// assert_eq!(out, b"Welcome, Ada!");
/// ```
#[derive(Debug)]
pub struct TemplateExec<L> {
    name: String,
    affixes: Affixes,
    loader: L,
}

impl TemplateExec<TemplateCache> {
    /// An executor over `source` that keeps parsed templates for
    /// `lifetime_ms` (zero or less keeps them until invalidated).
    pub fn cached(name: &str, source: Arc<dyn ByteSource>, lifetime_ms: i64) -> Result<Self> {
        let loader = SourceLoader::new(source, TemplateDecoder).with_name(name);
        Self::new(name, CachingLoader::new(lifetime_ms, loader))
    }
}

impl<L> TemplateExec<L>
where
    L: EntityLoader,
    L::Entity: Borrow<Template>,
{
    pub fn new(name: &str, loader: L) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::config("template executor name is empty"));
        }
        Ok(Self {
            name: name.to_string(),
            affixes: Affixes::new("", DEFAULT_SUFFIX),
            loader,
        })
    }

    pub fn with_affixes(mut self, prefix: &str, suffix: &str) -> Self {
        self.affixes = Affixes::new(prefix, suffix);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn affixes(&self) -> &Affixes {
        &self.affixes
    }

    pub fn set_prefix(&mut self, prefix: &str) {
        self.affixes.set_prefix(prefix);
    }

    pub fn set_suffix(&mut self, suffix: &str) {
        self.affixes.set_suffix(suffix);
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Where the template for `template_id` is read from.
    pub fn effective_path(&self, template_id: &str) -> Result<String> {
        check_key("template id", template_id)?;
        self.loader.effective_path(&self.affixes.apply(template_id)?)
    }

    /// Merge the template `template_id` with `context`, appending to `output`.
    ///
    /// # Errors
    ///
    /// An empty id is an `InvalidArgument`. `NotFound` and `ReadFailure`
    /// from the loader pass through unchanged. Every other failure,
    /// including template syntax errors and failed writes, is an
    /// `ExecutionFailure` naming the template's effective path.
    pub fn execute(&self, template_id: &str, context: &Value, output: &mut dyn Write) -> Result<()> {
        check_key("template id", template_id)?;
        let key = self.affixes.apply(template_id)?;
        tracing::debug!(exec = %self.name, template = %key, "executing template");

        self.merge(&key, context, output)
            .map_err(|e| self.failure(&key, e))
    }

    fn merge(&self, key: &str, context: &Value, output: &mut dyn Write) -> Result<()> {
        let template = self.loader.load(key)?;
        let path = self.loader.effective_path(key)?;
        template
            .borrow()
            .merge(context, output)
            .map_err(|e| Error::execution(path, format!("error writing output: {}", e)))
    }

    fn failure(&self, key: &str, error: Error) -> Error {
        match error.kind() {
            ErrorKind::NotFound | ErrorKind::ReadFailure | ErrorKind::ExecutionFailure => error,
            _ => {
                let path = self
                    .loader
                    .effective_path(key)
                    .unwrap_or_else(|_| key.to_string());
                Error::execution(path, error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadstone_source::MemorySource;
    use std::io;

    fn exec() -> (Arc<MemorySource>, TemplateExec<TemplateLoader>) {
        let source = Arc::new(MemorySource::new("mem"));
        let loader = SourceLoader::new(source.clone(), TemplateDecoder);
        (source, TemplateExec::new("test", loader).unwrap())
    }

    fn ctx() -> Value {
        Value::from_json(serde_json::json!({"who": "world"}))
    }

    #[test]
    fn default_suffix_applies() {
        let (source, exec) = exec();
        source.insert("hello.tpl", "hello ${who}");

        let mut out = Vec::new();
        exec.execute("hello", &ctx(), &mut out).unwrap();
        exec.execute("hello.tpl", &ctx(), &mut out).unwrap();
        assert_eq!(out, b"hello worldhello world");
        assert_eq!(exec.effective_path("hello").unwrap(), "mem:hello.tpl");
    }

    #[test]
    fn affixes_are_configurable() {
        let (source, mut exec) = exec();
        source.insert("mail/welcome.txt", "hi ${who}");
        exec.set_prefix(" mail/ ");
        exec.set_suffix(".txt");

        let mut out = Vec::new();
        exec.execute("welcome", &ctx(), &mut out).unwrap();
        assert_eq!(out, b"hi world");
        assert_eq!(exec.affixes(), &Affixes::new("mail/", ".txt"));
    }

    #[test]
    fn not_found_passes_through() {
        let (_source, exec) = exec();
        let err = exec.execute("absent", &ctx(), &mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn syntax_errors_become_execution_failures() {
        let (source, exec) = exec();
        source.insert("bad.tpl", "${unclosed");
        let err = exec.execute("bad", &ctx(), &mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
        assert!(err.to_string().contains("'mem:bad.tpl'"));
        assert!(err.to_string().contains("unclosed placeholder"));
    }

    #[test]
    fn write_failures_name_the_template() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let (source, exec) = exec();
        source.insert("out.tpl", "text");
        let err = exec.execute("out", &ctx(), &mut Closed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
        assert!(err.to_string().contains("mem:out.tpl"));
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn empty_arguments_rejected() {
        let (_source, exec) = exec();
        assert_eq!(
            exec.execute("", &ctx(), &mut Vec::new()).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );

        let loader = SourceLoader::new(Arc::new(MemorySource::new("m")), TemplateDecoder);
        assert_eq!(
            TemplateExec::new(" ", loader).unwrap_err().kind(),
            ErrorKind::ConfigurationError
        );
    }

    #[test]
    fn cached_executor_reuses_parsed_templates() {
        let source = Arc::new(MemorySource::new("mem"));
        source.insert("a.tpl", "A=${who}");
        let exec = TemplateExec::cached("cached", source.clone(), 0).unwrap();

        let mut out = Vec::new();
        exec.execute("a", &ctx(), &mut out).unwrap();
        source.insert("a.tpl", "changed");
        exec.execute("a", &ctx(), &mut out).unwrap();
        assert_eq!(out, b"A=worldA=world");
        assert_eq!(exec.loader().stats().loads, 1);
    }
}
