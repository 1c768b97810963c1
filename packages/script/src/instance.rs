//! InstanceLoader: compile unit source from a byte source into live units.

use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use loadstone_entity::{Decoder, EntityLoader, SourceLoader, TextDecoder};
use loadstone_source::{Affixes, BindStage, ByteSource, Error, Result};

use crate::compiler::{CompiledUnit, Compiler, UnitFactory};

/// Decodes unit source into a [`UnitFactory`]. Compile errors become
/// parse failures naming the source path.
#[derive(Debug, Clone, Default)]
pub struct CompilerDecoder<C> {
    compiler: C,
}

impl<C: Compiler> CompilerDecoder<C> {
    pub fn new(compiler: C) -> Self {
        Self { compiler }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }
}

impl<C: Compiler> Decoder for CompilerDecoder<C> {
    type Output = Arc<dyn UnitFactory>;

    fn decode(&self, path: &str, reader: &mut dyn Read) -> Result<Arc<dyn UnitFactory>> {
        let source = TextDecoder.decode(path, reader)?;
        self.compiler
            .compile(path, &source)
            .map_err(|e| Error::parse(path, e))
    }
}

/// Loads compiled, instantiated units by key.
///
/// Each `load` reads the source, compiles it, checks that it is invokable
/// and constructs a fresh instance. Wrap it in a
/// [`CachingLoader`](loadstone_entity::CachingLoader) to keep instances
/// between calls and pick up edits when the lifetime runs out.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use loadstone_entity::{CachingLoader, EntityLoader, Value};
/// use loadstone_script::{CompiledUnit, InstanceLoader, NativeCompiler};
/// use loadstone_source::MemorySource;
///
/// let source = Arc::new(MemorySource::new("lib"));
/// source.insert("greet.unit", "unit greet { invoke { return \"hi \" + ctx.who } }");
///
/// let loader = InstanceLoader::new("library", source, Arc::new(NativeCompiler))
///     .with_affixes("", ".unit");
/// let units = CachingLoader::new(30_000, loader);
///
/// let mut ctx = Value::from_json(serde_json::json!({"who": "ada"}));
/// let unit = units.load("greet").unwrap();
/// assert_eq!(unit.invoke(&mut ctx).unwrap(), Value::from("hi ada"));
/// ```
pub struct InstanceLoader {
    inner: SourceLoader<CompilerDecoder<Arc<dyn Compiler>>>,
}

impl InstanceLoader {
    pub fn new(name: &str, source: Arc<dyn ByteSource>, compiler: Arc<dyn Compiler>) -> Self {
        Self {
            inner: SourceLoader::new(source, CompilerDecoder::new(compiler)).with_name(name),
        }
    }

    pub fn with_affixes(mut self, prefix: &str, suffix: &str) -> Self {
        self.inner = self.inner.with_affixes(prefix, suffix);
        self
    }

    pub fn affixes(&self) -> &Affixes {
        self.inner.affixes()
    }

    pub fn set_prefix(&mut self, prefix: &str) {
        self.inner.set_prefix(prefix);
    }

    pub fn set_suffix(&mut self, suffix: &str) {
        self.inner.set_suffix(suffix);
    }

    pub fn source(&self) -> &Arc<dyn ByteSource> {
        self.inner.source()
    }

    /// Compile `key` without instantiating it.
    pub fn compile(&self, key: &str) -> Result<Arc<dyn UnitFactory>> {
        self.inner.load(key)
    }
}

impl EntityLoader for InstanceLoader {
    type Entity = Arc<dyn CompiledUnit>;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        self.inner.effective_path(key)
    }

    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        self.inner.last_modified(key)
    }

    fn load(&self, key: &str) -> Result<Arc<dyn CompiledUnit>> {
        let factory = self.compile(key)?;
        let path = self.inner.effective_path(key)?;

        if !factory.is_invokable() {
            return Err(Error::binding(
                path,
                BindStage::Capability,
                format!("unit '{}' declares no invoke block", factory.name()),
            ));
        }

        let unit = factory
            .instantiate()
            .map_err(|e| Error::binding(path.as_str(), BindStage::Instantiate, e))?;
        tracing::debug!(loader = %self.name(), key, unit = %unit.qualified_name(), "instantiated");
        Ok(unit)
    }
}

impl std::fmt::Debug for InstanceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceLoader")
            .field("name", &self.inner.name())
            .field("affixes", self.inner.affixes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::NativeCompiler;
    use loadstone_entity::Value;
    use loadstone_source::{ErrorKind, MemorySource};

    fn loader(files: &[(&str, &str)]) -> InstanceLoader {
        let source = Arc::new(MemorySource::new("lib"));
        for (key, text) in files {
            source.insert(key, text.to_string());
        }
        InstanceLoader::new("units", source, Arc::new(NativeCompiler)).with_affixes(" ", " .unit ")
    }

    #[test]
    fn loads_invokable_units() {
        let loader = loader(&[("sum.unit", "unit sum { invoke { return 1 + 2 } }")]);
        let unit = loader.load("sum").unwrap();
        assert_eq!(unit.invoke(&mut Value::Null).unwrap(), Value::Integer(3));
        assert_eq!(loader.affixes().suffix(), ".unit");
    }

    #[test]
    fn syntax_errors_are_parse_failures() {
        let loader = loader(&[("bad.unit", "unit bad { invoke { let } }")]);
        let err = loader.load("bad").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(err.to_string().contains("lib:bad.unit"));
    }

    #[test]
    fn missing_invoke_is_a_capability_failure() {
        let loader = loader(&[("lib.unit", "unit lib { const A = 1 }")]);
        let err = loader.load("lib").err().unwrap();
        assert!(matches!(
            err,
            Error::Binding {
                stage: BindStage::Capability,
                ..
            }
        ));
    }

    #[test]
    fn const_failure_is_an_instantiate_failure() {
        let loader = loader(&[("c.unit", "unit c { const A = int(\"x\")\n invoke { } }")]);
        let err = loader.load("c").err().unwrap();
        assert!(matches!(
            err,
            Error::Binding {
                stage: BindStage::Instantiate,
                ..
            }
        ));
    }

    #[test]
    fn missing_source_is_not_found() {
        let loader = loader(&[]);
        assert_eq!(loader.load("nope").err().unwrap().kind(), ErrorKind::NotFound);
    }
}
