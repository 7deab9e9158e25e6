//! Error types for callkey
//!
//! All fallible operations return `Result<T, Error>`.
//! Nothing is recovered locally: the caller (usually the cache layer)
//! decides whether to skip caching or propagate.

/// Boxed error raised by a caller-defined object's own introspection.
pub type ObjectError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// callkey error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The encoder met a value it cannot represent
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An object's mapping, sequence or raw-bytes capability failed
    #[error("Introspection error in {type_name}: {source}")]
    Introspection {
        type_name: String,
        #[source]
        source: ObjectError,
    },

    /// Two mapping keys have no natural ordering between them
    #[error("Unorderable mapping keys: {left} and {right}")]
    UnorderableKeys { left: String, right: String },

    /// Invalid key configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid JSON for `KeyConfig`
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn introspection(type_name: &str, source: ObjectError) -> Self {
        Error::Introspection {
            type_name: type_name.to_string(),
            source,
        }
    }
}

/// Result type alias for callkey operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::Serialization("object Widget has no stable encoding".into());
        assert_eq!(
            err.to_string(),
            "Serialization error: object Widget has no stable encoding"
        );

        let err = Error::UnorderableKeys {
            left: "Int".into(),
            right: "Str".into(),
        };
        assert_eq!(err.to_string(), "Unorderable mapping keys: Int and Str");
    }

    #[test]
    fn test_introspection_keeps_source() {
        let err = Error::introspection("Tensor", "device lost".into());
        assert_eq!(err.to_string(), "Introspection error in Tensor: device lost");
        assert!(std::error::Error::source(&err).is_some());
    }
}
