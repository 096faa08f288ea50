use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocError {
    /// A module, class, function or property that must be documented has no docstring.
    #[error("'{0}' doesn't have a docstring")]
    NoDocstring(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Module '{module}' has no member '{name}'")]
    MissingMember { module: String, name: String },

    #[error("Config error: {0}")]
    Config(String),

    /// No registered handler accepted a value. The data handler accepts
    /// everything, so this only happens with a misconfigured registry.
    #[error("Internal error: no handler documented {0}")]
    Unhandled(String),

    /// A section reached serialization without a title or content.
    #[error("Internal error: {0}")]
    Incomplete(String),
}

impl DocError {
    /// Build a `NoDocstring` error from dotted path components.
    pub fn no_docstring<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path: Vec<String> = parts.into_iter().map(|p| p.as_ref().to_string()).collect();
        DocError::NoDocstring(path.join("."))
    }
}

pub type Result<T> = std::result::Result<T, DocError>;
