use std::fmt;

/// Broad classification of a [`PluginError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NullInput,
    FileIo,
    IllegalInput,
    IllegalOutput,
    TypeMismatch,
    UnsupportedMode,
    DataNotFound,
}

impl ErrorKind {
    /// Integer code used by natively implemented plugins for this kind.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::FileIo => 6,
            ErrorKind::DataNotFound => 11,
            ErrorKind::NullInput => 13,
            ErrorKind::IllegalInput => 15,
            ErrorKind::IllegalOutput => 16,
            ErrorKind::UnsupportedMode => 17,
            ErrorKind::TypeMismatch => 20,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NullInput => "null input",
            ErrorKind::FileIo => "file I/O error",
            ErrorKind::IllegalInput => "illegal input",
            ErrorKind::IllegalOutput => "illegal output",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::UnsupportedMode => "unsupported mode",
            ErrorKind::DataNotFound => "data not found",
        };
        f.write_str(name)
    }
}

/// Failure raised by the bridge or reported by a remote recipe.
///
/// Transport and protocol problems use one variant per [`ErrorKind`]. A
/// recipe that ran to completion but returned a non-zero status is reported
/// as [`PluginError::Recipe`]; its [`code`](PluginError::code) is the status
/// the recipe returned rather than a bridge error code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    #[error("{0}")]
    NullInput(String),
    #[error("{0}")]
    FileIo(String),
    #[error("{0}")]
    IllegalInput(String),
    #[error("{0}")]
    IllegalOutput(String),
    #[error("{0}")]
    TypeMismatch(String),
    #[error("{0}")]
    UnsupportedMode(String),
    #[error("{0}")]
    DataNotFound(String),
    #[error("{message}")]
    Recipe { code: i32, message: String },
}

impl PluginError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PluginError::NullInput(_) => ErrorKind::NullInput,
            PluginError::FileIo(_) => ErrorKind::FileIo,
            PluginError::IllegalInput(_) => ErrorKind::IllegalInput,
            PluginError::IllegalOutput(_) | PluginError::Recipe { .. } => ErrorKind::IllegalOutput,
            PluginError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            PluginError::UnsupportedMode(_) => ErrorKind::UnsupportedMode,
            PluginError::DataNotFound(_) => ErrorKind::DataNotFound,
        }
    }

    /// Status code returned through the plugin interface.
    pub fn code(&self) -> i32 {
        match self {
            PluginError::Recipe { code, .. } => *code,
            other => other.kind().code(),
        }
    }

    /// True when the remote recipe itself reported the failure.
    pub fn is_recipe_failure(&self) -> bool {
        matches!(self, PluginError::Recipe { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            PluginError::NullInput(m)
            | PluginError::FileIo(m)
            | PluginError::IllegalInput(m)
            | PluginError::IllegalOutput(m)
            | PluginError::TypeMismatch(m)
            | PluginError::UnsupportedMode(m)
            | PluginError::DataNotFound(m) => m,
            PluginError::Recipe { message, .. } => message,
        }
    }
}

pub type Result<T, E = PluginError> = std::result::Result<T, E>;
