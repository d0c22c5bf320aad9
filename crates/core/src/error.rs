/// Result alias that carries the custom [`VisError`] type.
pub type Result<T> = std::result::Result<T, VisError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum VisError {
    /// Free-form failure message.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration that could not be parsed.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// Input rejected before it reached a plugin.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A lock guarding shared state was poisoned by a panicking holder.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
    /// A plugin callback failed or panicked.
    #[error("plugin fault: {0}")]
    PluginFault(String),
}

impl VisError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates a plugin fault from anything printable.
    pub fn plugin<T: Into<String>>(msg: T) -> Self {
        Self::PluginFault(msg.into())
    }
}
