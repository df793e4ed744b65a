use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid key path: {0}")]
    InvalidPath(String),

    #[error("Malformed key: {0}")]
    MalformedKey(String),

    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    #[error("Malformed entity: {0}")]
    MalformedEntity(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Mutation buffer already drained")]
    MutationDrained,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Returns a stable error code for this error variant.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidPath(_) => "INVALID_PATH",
            Error::MalformedKey(_) => "MALFORMED_KEY",
            Error::InvalidProperty(_) => "INVALID_PROPERTY",
            Error::MalformedEntity(_) => "MALFORMED_ENTITY",
            Error::InvalidQuery(_) => "INVALID_QUERY",
            Error::MutationDrained => "MUTATION_DRAINED",
            Error::Configuration(_) => "CONFIGURATION",
        }
    }

    /// Prefixes the message with `context`, keeping the variant.
    pub fn with_context(self, context: &str) -> Error {
        match self {
            Error::InvalidPath(m) => Error::InvalidPath(format!("{}: {}", context, m)),
            Error::MalformedKey(m) => Error::MalformedKey(format!("{}: {}", context, m)),
            Error::InvalidProperty(m) => Error::InvalidProperty(format!("{}: {}", context, m)),
            Error::MalformedEntity(m) => Error::MalformedEntity(format!("{}: {}", context, m)),
            Error::InvalidQuery(m) => Error::InvalidQuery(format!("{}: {}", context, m)),
            Error::Configuration(m) => Error::Configuration(format!("{}: {}", context, m)),
            Error::MutationDrained => Error::MutationDrained,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Error::InvalidPath("x".into()).code(), "INVALID_PATH");
        assert_eq!(Error::MutationDrained.code(), "MUTATION_DRAINED");
        assert_eq!(Error::Configuration("x".into()).code(), "CONFIGURATION");
    }

    #[test]
    fn test_with_context_keeps_variant() {
        let err = Error::MalformedKey("bad base64".into()).with_context("decode");
        assert_eq!(err, Error::MalformedKey("decode: bad base64".into()));
        assert_eq!(err.to_string(), "Malformed key: decode: bad base64");
    }
}
