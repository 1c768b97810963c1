//! Error types shared by every loadstone layer.

use std::fmt;

use thiserror::Error;

/// Boxed cause carried by parse, binding and execution errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The resource does not exist at any configured source.
    NotFound,
    /// An I/O error while opening or reading a resource that exists.
    ReadFailure,
    /// Bytes were read but could not be turned into the target artifact.
    ParseFailure,
    /// Invalid construction-time settings.
    ConfigurationError,
    /// A synthesized unit could not be compiled, instantiated or invoked.
    BindingFailure,
    /// An invalid argument at call time (empty key, malformed id).
    InvalidArgument,
    /// A loaded artifact failed while running.
    ExecutionFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::ReadFailure => "read failure",
            ErrorKind::ParseFailure => "parse failure",
            ErrorKind::ConfigurationError => "configuration error",
            ErrorKind::BindingFailure => "binding failure",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::ExecutionFailure => "execution failure",
        };
        f.write_str(name)
    }
}

/// Where in the compile pipeline a binding failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindStage {
    /// The synthesized source did not compile.
    Compile,
    /// The compiled unit could not be constructed.
    Instantiate,
    /// The compiled unit does not expose the invokable unit capability.
    Capability,
}

impl fmt::Display for BindStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindStage::Compile => f.write_str("compile"),
            BindStage::Instantiate => f.write_str("instantiate"),
            BindStage::Capability => f.write_str("capability"),
        }
    }
}

/// Errors raised while locating, reading, decoding or binding resources.
#[derive(Debug, Error)]
pub enum Error {
    /// The key did not resolve to a resource.
    #[error("resource '{key}' not found: {message}")]
    NotFound { key: String, message: String },

    /// Reading a resource that exists failed.
    #[error("error reading '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Decoding the bytes of a resource failed.
    #[error("error parsing '{path}': {message}")]
    Parse {
        path: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A loader or executor was configured with invalid settings.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// A synthesized unit could not be bound.
    #[error("error binding '{path}' ({stage}): {message}")]
    Binding {
        path: String,
        stage: BindStage,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// An argument passed at call time was rejected.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A loaded unit failed while executing.
    #[error("error executing '{unit}': {message}")]
    Execution { unit: String, message: String },
}

impl Error {
    /// The kind discriminator for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Read { .. } => ErrorKind::ReadFailure,
            Error::Parse { .. } => ErrorKind::ParseFailure,
            Error::Config { .. } => ErrorKind::ConfigurationError,
            Error::Binding { .. } => ErrorKind::BindingFailure,
            Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Error::Execution { .. } => ErrorKind::ExecutionFailure,
        }
    }

    /// True for [`ErrorKind::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn not_found(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::NotFound {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn read(path: impl Into<String>, source: std::io::Error) -> Self {
        Error::Read {
            path: path.into(),
            source,
        }
    }

    /// A parse failure that carries its cause.
    pub fn parse<E>(path: impl Into<String>, cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = cause.into();
        Error::Parse {
            path: path.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// A parse failure described only by a message.
    pub fn parse_msg(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub fn binding<E>(path: impl Into<String>, stage: BindStage, cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = cause.into();
        Error::Binding {
            path: path.into(),
            stage,
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn execution(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Execution {
            unit: unit.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for loadstone operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reject empty keys.
pub fn check_key(ident: &str, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_argument(format!("{} is empty", ident)));
    }
    Ok(())
}
