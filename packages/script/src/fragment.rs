//! Code fragments: generators that contribute text to a synthesized unit.

use loadstone_entity::Value;

use crate::scope::Scope;

/// Contributes source text at one or more [`Scope`]s.
///
/// `context` is the value the unit is about to be invoked with, so a
/// fragment can tailor what it emits.
pub trait CodeFragment: Send + Sync {
    fn applies_to(&self, scope: Scope) -> bool;

    fn emit(&self, context: &Value, scope: Scope, out: &mut String);
}

impl<F: CodeFragment + ?Sized> CodeFragment for std::sync::Arc<F> {
    fn applies_to(&self, scope: Scope) -> bool {
        (**self).applies_to(scope)
    }

    fn emit(&self, context: &Value, scope: Scope, out: &mut String) {
        (**self).emit(context, scope, out)
    }
}

/// Emits a fixed line of text.
///
/// With no scopes given the fragment applies everywhere.
///
/// # Example
///
/// ```rust
/// use loadstone_script::{CodeFragment, Scope, TextFragment};
/// use loadstone_entity::Value;
///
/// let fragment = TextFragment::new([Scope::BodyPrelude], "let started = true");
/// let mut out = String::new();
/// fragment.emit(&Value::Null, Scope::BodyPrelude, &mut out);
/// assert_eq!(out, "let started = true\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFragment {
    scopes: Vec<Scope>,
    text: String,
}

impl TextFragment {
    pub fn new(scopes: impl IntoIterator<Item = Scope>, text: impl Into<String>) -> Self {
        Self {
            scopes: scopes.into_iter().collect(),
            text: text.into(),
        }
    }

    /// A fragment emitted in every scope.
    pub fn everywhere(text: impl Into<String>) -> Self {
        Self {
            scopes: Vec::new(),
            text: text.into(),
        }
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl CodeFragment for TextFragment {
    fn applies_to(&self, scope: Scope) -> bool {
        self.scopes.is_empty() || self.scopes.contains(&scope)
    }

    fn emit(&self, _context: &Value, scope: Scope, out: &mut String) {
        if self.applies_to(scope) {
            out.push_str(&self.text);
            out.push('\n');
        }
    }
}
