//! Compilers turn unit source into factories of invokable units.

use std::collections::BTreeMap;
use std::sync::Arc;

use loadstone_entity::Value;
use loadstone_source::{BoxError, Error, Result};

use crate::lang::{self, ast::Const, ast::Stmt};

/// An executable unit bound from synthesized or stored source.
pub trait CompiledUnit: Send + Sync {
    fn package(&self) -> &str;

    fn name(&self) -> &str;

    /// Run the unit. The unit may read and write `context`.
    fn invoke(&self, context: &mut Value) -> Result<Value>;

    /// `package.name`, or just the name for units without a package.
    fn qualified_name(&self) -> String {
        qualify(self.package(), self.name())
    }
}

/// The product of a compile: knows how to construct unit instances.
pub trait UnitFactory: Send + Sync {
    fn package(&self) -> &str;

    fn name(&self) -> &str;

    /// Whether instances expose the [`CompiledUnit`] capability.
    fn is_invokable(&self) -> bool;

    /// Construct an instance with no arguments.
    fn instantiate(&self) -> std::result::Result<Arc<dyn CompiledUnit>, BoxError>;
}

/// Compiles unit source.
///
/// `path` identifies the source in diagnostics only.
pub trait Compiler: Send + Sync {
    fn compile(&self, path: &str, source: &str) -> std::result::Result<Arc<dyn UnitFactory>, BoxError>;
}

impl<C: Compiler + ?Sized> Compiler for Arc<C> {
    fn compile(&self, path: &str, source: &str) -> std::result::Result<Arc<dyn UnitFactory>, BoxError> {
        (**self).compile(path, source)
    }
}

pub(crate) fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

/// Compiles the built-in unit language.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCompiler;

impl Compiler for NativeCompiler {
    fn compile(&self, path: &str, source: &str) -> std::result::Result<Arc<dyn UnitFactory>, BoxError> {
        let unit = lang::compile(source)?;
        tracing::debug!(path, unit = %qualify(&unit.package, &unit.name), "compiled");

        Ok(Arc::new(NativeFactory {
            package: unit.package,
            name: unit.name,
            consts: unit.consts,
            body: unit.invoke.map(Arc::new),
        }))
    }
}

#[derive(Debug)]
struct NativeFactory {
    package: String,
    name: String,
    consts: Vec<Const>,
    body: Option<Arc<Vec<Stmt>>>,
}

impl UnitFactory for NativeFactory {
    fn package(&self) -> &str {
        &self.package
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_invokable(&self) -> bool {
        self.body.is_some()
    }

    fn instantiate(&self) -> std::result::Result<Arc<dyn CompiledUnit>, BoxError> {
        let body = self
            .body
            .clone()
            .ok_or("unit declares no invoke block")?;
        let consts = lang::eval_consts(&self.consts)?;

        Ok(Arc::new(NativeUnit {
            package: self.package.clone(),
            name: self.name.clone(),
            consts,
            body,
        }))
    }
}

#[derive(Debug)]
struct NativeUnit {
    package: String,
    name: String,
    consts: BTreeMap<String, Value>,
    body: Arc<Vec<Stmt>>,
}

impl CompiledUnit for NativeUnit {
    fn package(&self) -> &str {
        &self.package
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, context: &mut Value) -> Result<Value> {
        lang::run(&self.body, &self.consts, context)
            .map_err(|e| Error::execution(self.qualified_name(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadstone_source::ErrorKind;

    const MONTHLY: &str = "\
package gen.reports
import text
unit monthly {
  const RATE = 3
  invoke {
    let x = ctx.amount * RATE
    set total = x
    return text.upper(\"done\")
  }
}
";

    #[test]
    fn compile_instantiate_invoke() {
        let factory = NativeCompiler.compile("monthly", MONTHLY).unwrap();
        assert_eq!(factory.package(), "gen.reports");
        assert_eq!(factory.name(), "monthly");
        assert!(factory.is_invokable());

        let unit = factory.instantiate().unwrap();
        assert_eq!(unit.qualified_name(), "gen.reports.monthly");

        let mut ctx = Value::map();
        ctx.set("amount", Value::Integer(4)).unwrap();
        assert_eq!(unit.invoke(&mut ctx).unwrap(), Value::from("DONE"));
        assert_eq!(ctx.get("total"), Some(&Value::Integer(12)));
    }

    #[test]
    fn syntax_errors_fail_compile() {
        let err = NativeCompiler.compile("broken", "unit {").err().unwrap();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn missing_invoke_is_not_invokable() {
        let factory = NativeCompiler.compile("bare", "unit bare { }").unwrap();
        assert!(!factory.is_invokable());
        assert!(factory.instantiate().is_err());
    }

    #[test]
    fn const_failures_fail_instantiation() {
        let factory = NativeCompiler
            .compile("div", "unit div {\n const X = 1 / 0\n invoke { return X }\n}")
            .unwrap();
        let err = factory.instantiate().err().unwrap();
        assert!(err.to_string().contains("division by zero"));
    }

    #[test]
    fn runtime_errors_are_execution_failures() {
        let unit = NativeCompiler
            .compile("u", "package p\nunit u { invoke { return ctx.a.b + 1 - \"x\" } }")
            .unwrap()
            .instantiate()
            .unwrap();
        let err = unit.invoke(&mut Value::map()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
        assert!(err.to_string().contains("p.u"));
    }

    #[test]
    fn instances_are_independent() {
        let factory = NativeCompiler
            .compile("c", "unit c { const BASE = 10\n invoke { return BASE + ctx.n } }")
            .unwrap();
        let a = factory.instantiate().unwrap();
        let b = factory.instantiate().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        let mut ctx = Value::from_json(serde_json::json!({"n": 1}));
        assert_eq!(a.invoke(&mut ctx).unwrap(), Value::Integer(11));
    }
}
