use thiserror::Error as ThisError;

/// Boxed error type used at the transport boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Mapping or construction problem, raised at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller used the API in a way it does not support.
    #[error("invalid api usage: {0}")]
    InvalidApiUsage(String),

    #[error("parameter index {index} out of range, {count} parameter(s) supplied")]
    ParameterOutOfRange { index: usize, count: usize },

    /// Failure reported by the underlying Solr client.
    #[error("execution error: {message}")]
    Execution {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn invalid_usage(message: impl Into<String>) -> Self {
        Error::InvalidApiUsage(message.into())
    }

    /// Wraps a client failure, keeping the original cause.
    pub fn execution(source: BoxError) -> Self {
        Error::Execution {
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn is_invalid_usage(&self) -> bool {
        matches!(self, Error::InvalidApiUsage(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn execution_keeps_source() {
        let err = Error::execution("connection refused".into());
        assert_eq!(err.to_string(), "execution error: connection refused");
        assert!(err.source().is_some());
    }

    #[test]
    fn out_of_range_message() {
        let err = Error::ParameterOutOfRange { index: 3, count: 2 };
        assert_eq!(
            err.to_string(),
            "parameter index 3 out of range, 2 parameter(s) supplied"
        );
    }
}
