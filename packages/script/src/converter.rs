//! Script converters: wrap a bare snippet into a complete unit source.

use std::sync::Arc;

use lazy_static::lazy_static;
use loadstone_entity::Value;
use regex::Regex;

use crate::fragment::CodeFragment;
use crate::scope::Scope;

/// Turns snippet text into the source of a compilable unit.
pub trait ScriptConverter: Send + Sync {
    /// The generators consulted at each scope, in order.
    fn fragments(&self) -> &[Arc<dyn CodeFragment>];

    /// Produce unit source declaring `package` and unit `name`.
    fn convert(&self, context: &Value, package: &str, name: &str, snippet: &str) -> String;
}

impl<C: ScriptConverter + ?Sized> ScriptConverter for Arc<C> {
    fn fragments(&self) -> &[Arc<dyn CodeFragment>] {
        (**self).fragments()
    }

    fn convert(&self, context: &Value, package: &str, name: &str, snippet: &str) -> String {
        (**self).convert(context, package, name, snippet)
    }
}

/// True for lines like `import text`.
pub(crate) fn is_import_line(line: &str) -> bool {
    lazy_static! {
        static ref IMPORT_LINE: Regex = Regex::new(r"^import\s+\S").unwrap();
    }
    IMPORT_LINE.is_match(line)
}

const BODY_INDENT: &str = "    ";

/// The standard converter.
///
/// The synthesized unit looks like:
///
/// ```text
/// package <package>
/// <leading import lines of the snippet>
/// <unit-start fragments>
/// unit <name> {
/// <body-start fragments>
///   invoke {
/// <body-prelude fragments>
///     <rest of the snippet>
/// <body-epilogue fragments>
///     return null
///   }
/// <unit-end fragments>
/// }
/// ```
///
/// Leading empty lines and `import` lines of the snippet are hoisted; the
/// first other line starts the body.
#[derive(Clone)]
pub struct UnitConverter {
    fragments: Vec<Arc<dyn CodeFragment>>,
    final_return: String,
}

impl UnitConverter {
    pub fn new() -> Self {
        Self {
            fragments: Vec::new(),
            final_return: "return null".to_string(),
        }
    }

    pub fn with_fragment(mut self, fragment: impl CodeFragment + 'static) -> Self {
        self.add_fragment(fragment);
        self
    }

    pub fn add_fragment(&mut self, fragment: impl CodeFragment + 'static) {
        self.fragments.push(Arc::new(fragment));
    }

    pub fn add_fragments(&mut self, fragments: impl IntoIterator<Item = Arc<dyn CodeFragment>>) {
        self.fragments.extend(fragments);
    }

    /// Replace the generator list.
    pub fn set_fragments(&mut self, fragments: Vec<Arc<dyn CodeFragment>>) {
        self.fragments = fragments;
    }

    /// The statement closing every invoke block.
    pub fn final_return(&self) -> &str {
        &self.final_return
    }

    /// Override the closing statement. Blank input keeps the default.
    pub fn set_final_return(&mut self, statement: &str) {
        let statement = statement.trim();
        if !statement.is_empty() {
            self.final_return = statement.to_string();
        }
    }

    fn emit_scope(&self, context: &Value, scope: Scope, out: &mut String) {
        for fragment in &self.fragments {
            if fragment.applies_to(scope) {
                fragment.emit(context, scope, out);
            }
        }
    }
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UnitConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitConverter")
            .field("fragments", &self.fragments.len())
            .field("final_return", &self.final_return)
            .finish()
    }
}

impl ScriptConverter for UnitConverter {
    fn fragments(&self) -> &[Arc<dyn CodeFragment>] {
        &self.fragments
    }

    fn convert(&self, context: &Value, package: &str, name: &str, snippet: &str) -> String {
        let mut out = String::with_capacity(snippet.len() + 256);
        out.push_str("// synthesized by UnitConverter\n");
        out.push_str(&format!("package {}\n", package));

        let mut lines = snippet.lines().peekable();
        while let Some(line) = lines.next_if(|l| l.is_empty() || is_import_line(l)) {
            if !line.is_empty() {
                out.push_str(line);
                out.push('\n');
            }
        }

        self.emit_scope(context, Scope::UnitStart, &mut out);
        out.push_str(&format!("\nunit {} {{\n", name));
        self.emit_scope(context, Scope::BodyStart, &mut out);
        out.push_str("  invoke {\n");
        self.emit_scope(context, Scope::BodyPrelude, &mut out);

        for line in lines {
            if !line.trim().is_empty() {
                out.push_str(BODY_INDENT);
                out.push_str(line);
            }
            out.push('\n');
        }

        self.emit_scope(context, Scope::BodyEpilogue, &mut out);
        out.push_str(BODY_INDENT);
        out.push_str(&self.final_return);
        out.push_str("\n  }\n");
        self.emit_scope(context, Scope::UnitEnd, &mut out);
        out.push_str("}\n");
        out
    }
}
