//! loadstone scripts: turn snippets into invokable units on demand.
//!
//! - [`ScriptConverter`] / [`UnitConverter`]: wrap a snippet into unit source,
//!   with [`CodeFragment`]s contributing text at each [`Scope`]
//! - [`Compiler`] / [`UnitFactory`] / [`CompiledUnit`]: the compile seam;
//!   [`NativeCompiler`] implements it for the built-in [`lang`]
//! - [`InstanceLoader`]: an entity loader producing live units from source
//! - [`ScriptExecutor`] + [`ScriptCell`]: bind-once execution per call site

mod cell;
mod compiler;
mod converter;
mod executor;
mod fragment;
mod instance;
pub mod lang;
mod scope;

pub use cell::ScriptCell;
pub use compiler::{CompiledUnit, Compiler, NativeCompiler, UnitFactory};
pub use converter::{ScriptConverter, UnitConverter};
pub use executor::{derive_name, derive_package, ExecutorConfig, ScriptExecutor};
pub use fragment::{CodeFragment, TextFragment};
pub use instance::{CompilerDecoder, InstanceLoader};
pub use scope::{Scope, UnknownScope};
