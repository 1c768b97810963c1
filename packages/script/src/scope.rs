//! Generation scopes: the points in a synthesized unit where fragments go.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A position in the synthesized unit source.
///
/// Scopes are visited in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// After the package line and copied imports, before the unit opens.
    UnitStart,
    /// Inside the unit, before the invoke block.
    BodyStart,
    /// Inside the invoke block, before the snippet body.
    BodyPrelude,
    /// Inside the invoke block, after the snippet body.
    BodyEpilogue,
    /// Inside the unit, after the invoke block.
    UnitEnd,
}

impl Scope {
    pub const ALL: [Scope; 5] = [
        Scope::UnitStart,
        Scope::BodyStart,
        Scope::BodyPrelude,
        Scope::BodyEpilogue,
        Scope::UnitEnd,
    ];

    /// The external name, e.g. `body-prelude`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::UnitStart => "unit-start",
            Scope::BodyStart => "body-start",
            Scope::BodyPrelude => "body-prelude",
            Scope::BodyEpilogue => "body-epilogue",
            Scope::UnitEnd => "unit-end",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scope '{0}'")]
pub struct UnknownScope(pub String);

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| UnknownScope(s.to_string()))
    }
}
