//! End-to-end behavior of ScriptExecutor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use loadstone_entity::Value;
use loadstone_script::{
    CodeFragment, CompiledUnit, Compiler, ExecutorConfig, NativeCompiler, Scope, ScriptCell,
    ScriptExecutor, TextFragment, UnitConverter, UnitFactory,
};
use loadstone_source::{BindStage, BoxError, ByteSource, Error, ErrorKind, MemorySource};

/// Counts compiles and delegates to the native compiler.
#[derive(Default)]
struct CountingCompiler {
    compiles: AtomicUsize,
}

impl Compiler for CountingCompiler {
    fn compile(&self, path: &str, source: &str) -> Result<Arc<dyn UnitFactory>, BoxError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(20));
        NativeCompiler.compile(path, source)
    }
}

fn memory_executor(converter: UnitConverter, compiler: impl Compiler + 'static) -> ScriptExecutor {
    ScriptExecutor::with_store("gen", Arc::new(MemorySource::new("units")), converter, compiler)
        .unwrap()
}

fn ctx(json: serde_json::Value) -> Value {
    Value::from_json(json)
}

#[test]
fn concurrent_first_use_binds_once() {
    const THREADS: usize = 12;

    let compiler = Arc::new(CountingCompiler::default());
    let executor = Arc::new(memory_executor(UnitConverter::new(), Arc::clone(&compiler)));
    let cell = Arc::new(ScriptCell::new("return ctx.n + 1"));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS as i64)
        .map(|n| {
            let executor = Arc::clone(&executor);
            let cell = Arc::clone(&cell);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut context = ctx(serde_json::json!({ "n": n }));
                let result = executor.execute("calc/inc", &cell, &mut context).unwrap();
                (n, result, Arc::clone(cell.bound().unwrap()))
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(compiler.compiles.load(Ordering::SeqCst), 1);
    for (n, result, unit) in &outcomes {
        assert_eq!(*result, Value::Integer(n + 1));
        assert!(Arc::ptr_eq(unit, &outcomes[0].2));
    }
}

#[test]
fn distinct_cells_bind_independently() {
    let compiler = Arc::new(CountingCompiler::default());
    let executor = memory_executor(UnitConverter::new(), Arc::clone(&compiler));

    let double = ScriptCell::new("return ctx.n * 2");
    let square = ScriptCell::new("return ctx.n * ctx.n");
    let mut context = ctx(serde_json::json!({"n": 5}));

    assert_eq!(executor.execute("m/double", &double, &mut context).unwrap(), Value::Integer(10));
    assert_eq!(executor.execute("m/square", &square, &mut context).unwrap(), Value::Integer(25));
    assert_eq!(executor.execute("m/double", &double, &mut context).unwrap(), Value::Integer(10));
    assert_eq!(compiler.compiles.load(Ordering::SeqCst), 2);
}

#[test]
fn filesystem_store_layout() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ScriptExecutor::new(
        ExecutorConfig::new(dir.path(), "gen"),
        UnitConverter::new(),
        NativeCompiler,
    )
    .unwrap();

    let cell = ScriptCell::new("set total = ctx.amount * 3");
    let mut context = ctx(serde_json::json!({"amount": 4}));
    let result = executor.execute("reports/monthly", &cell, &mut context).unwrap();

    assert_eq!(result, Value::Null);
    assert_eq!(context.get("total"), Some(&Value::Integer(12)));

    let written = dir.path().join("gen/reports/monthly.unit");
    let source = std::fs::read_to_string(written).unwrap();
    assert!(source.contains("package gen.reports"));
    assert!(source.contains("unit monthly {"));
    assert!(source.trim_end().ends_with("return null\n  }\n}"));
}

#[test]
fn fragments_contribute_to_every_unit() {
    let mut converter = UnitConverter::new();
    converter.add_fragment(TextFragment::new([Scope::UnitStart], "import math"));
    converter.add_fragment(TextFragment::new([Scope::BodyStart], "const LIMIT = 10"));
    converter.add_fragment(TextFragment::new(
        [Scope::BodyPrelude],
        "set calls = int(ctx.calls) + 1",
    ));
    converter.add_fragment(TextFragment::new([Scope::BodyEpilogue], "set finished = true"));
    let executor = memory_executor(converter, NativeCompiler);

    let cell = ScriptCell::new("return math.min(ctx.value, LIMIT)");
    let mut context = ctx(serde_json::json!({"value": 42, "calls": 0}));
    assert_eq!(
        executor.execute("limits/clamp", &cell, &mut context).unwrap(),
        Value::Integer(10)
    );
    assert_eq!(context.get("calls"), Some(&Value::Integer(1)));
    // The snippet returned before the epilogue ran.
    assert_eq!(context.get("finished"), None);

    let cell = ScriptCell::new("let unused = 0");
    executor.execute("limits/noop", &cell, &mut context).unwrap();
    assert_eq!(context.get("finished"), Some(&Value::Bool(true)));
}

/// Adds a comment describing the context it was generated for.
struct ContextNote;

impl CodeFragment for ContextNote {
    fn applies_to(&self, scope: Scope) -> bool {
        scope == Scope::UnitStart
    }

    fn emit(&self, context: &Value, _scope: Scope, out: &mut String) {
        let user = context.get("user").cloned().unwrap_or_default();
        out.push_str(&format!("// generated for user {}\n", user));
    }
}

#[test]
fn fragments_see_the_first_context() {
    let store = Arc::new(MemorySource::new("units"));
    let executor = ScriptExecutor::with_store(
        "gen",
        store.clone(),
        UnitConverter::new().with_fragment(ContextNote),
        NativeCompiler,
    )
    .unwrap();

    let cell = ScriptCell::new("return 1");
    executor
        .execute("who", &cell, &mut ctx(serde_json::json!({"user": "ada"})))
        .unwrap();

    let source = String::from_utf8(store.read_bytes("gen/who").unwrap().to_vec()).unwrap();
    assert!(source.contains("// generated for user ada"));
}

#[test]
fn instantiate_failures_are_binding_failures() {
    let mut converter = UnitConverter::new();
    converter.add_fragment(TextFragment::new([Scope::BodyStart], "const BROKEN = 1 / 0"));
    let executor = memory_executor(converter, NativeCompiler);

    let cell = ScriptCell::new("return 1");
    let err = executor.execute("x", &cell, &mut Value::Null).unwrap_err();
    assert!(matches!(
        err,
        Error::Binding {
            stage: BindStage::Instantiate,
            ..
        }
    ));
    assert!(!cell.is_bound());
}

/// A compiler whose output never exposes the unit capability.
struct OpaqueCompiler;

struct Opaque;

impl UnitFactory for Opaque {
    fn package(&self) -> &str {
        "opaque"
    }

    fn name(&self) -> &str {
        "opaque"
    }

    fn is_invokable(&self) -> bool {
        false
    }

    fn instantiate(&self) -> Result<Arc<dyn CompiledUnit>, BoxError> {
        Err("not a unit".into())
    }
}

impl Compiler for OpaqueCompiler {
    fn compile(&self, _path: &str, _source: &str) -> Result<Arc<dyn UnitFactory>, BoxError> {
        Ok(Arc::new(Opaque))
    }
}

#[test]
fn capability_failures_are_binding_failures() {
    let executor = memory_executor(UnitConverter::new(), OpaqueCompiler);
    let cell = ScriptCell::new("return 1");
    let err = executor.execute("x", &cell, &mut Value::Null).unwrap_err();
    assert!(matches!(
        err,
        Error::Binding {
            stage: BindStage::Capability,
            ..
        }
    ));
}

#[test]
fn runtime_failures_leave_the_cell_bound() {
    let executor = memory_executor(UnitConverter::new(), NativeCompiler);
    let cell = ScriptCell::new("return 10 / ctx.d");

    let err = executor
        .execute("div", &cell, &mut ctx(serde_json::json!({"d": 0})))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
    assert!(cell.is_bound());

    assert_eq!(
        executor
            .execute("div", &cell, &mut ctx(serde_json::json!({"d": 5})))
            .unwrap(),
        Value::Integer(2)
    );
}

#[test]
fn malformed_ids_rejected_before_binding() {
    let executor = memory_executor(UnitConverter::new(), NativeCompiler);
    let cell = ScriptCell::new("return 1");
    for id in ["", "../escape", "a//b"] {
        let err = executor.execute(id, &cell, &mut Value::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
    assert!(!cell.is_bound());
}

#[test]
fn ids_ending_in_the_unit_suffix_get_their_own_file() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Arc::new(
        ScriptExecutor::new(
            ExecutorConfig::new(dir.path(), "gen"),
            UnitConverter::new(),
            NativeCompiler,
        )
        .unwrap(),
    );
    assert_eq!(executor.unit_key("a"), "gen/a.unit");
    assert_eq!(executor.unit_key("a.unit"), "gen/a.unit.unit");

    for _ in 0..50 {
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [("a", 1), ("a.unit", 2)]
            .into_iter()
            .map(|(id, n)| {
                let executor = Arc::clone(&executor);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let cell = ScriptCell::new(format!("return {}", n));
                    barrier.wait();
                    let result = executor.execute(id, &cell, &mut Value::Null).unwrap();
                    assert_eq!(result, Value::Integer(n), "id {}", id);
                    assert_eq!(cell.bound().unwrap().name(), if n == 1 { "a" } else { "a_unit" });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    assert!(dir.path().join("gen/a.unit").is_file());
    assert!(dir.path().join("gen/a.unit.unit").is_file());
}

/// Compiles every unit under a different name than the one it was written as.
struct RenamingCompiler;

impl Compiler for RenamingCompiler {
    fn compile(&self, path: &str, source: &str) -> Result<Arc<dyn UnitFactory>, BoxError> {
        NativeCompiler.compile(path, &source.replace("\nunit ", "\nunit other_"))
    }
}

#[test]
fn unit_with_unexpected_identity_is_not_bound() {
    let executor = memory_executor(UnitConverter::new(), RenamingCompiler);
    let cell = ScriptCell::new("return 1");

    let err = executor.execute("reports/monthly", &cell, &mut Value::Null).unwrap_err();
    assert!(matches!(
        err,
        Error::Binding {
            stage: BindStage::Capability,
            ..
        }
    ));
    assert!(err.to_string().contains("gen.reports.monthly"));
    assert!(err.to_string().contains("other_monthly"));
    assert!(!cell.is_bound());
}
