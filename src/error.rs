//! Error type shared by the client, the sniffer and the reporters.
//!
//! Everything fallible in the crate returns [`Result<T>`], whose error is
//! [`MongodogError`].
//!
//! Errors raised by an intercepted operation are returned to the caller exactly as the
//! operation produced them; the sniffer never recovers or rewrites them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MongodogError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid arguments for {method}: {message}")]
    InvalidArguments { method: String, message: String },

    #[error("No method bound at {0}")]
    MethodNotBound(String),

    #[error("Operation failure: {0}")]
    OperationFailure(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment error: {0}")]
    EnvError(#[from] dotenv::Error),
}

impl MongodogError {
    pub(crate) fn invalid_arguments(method: impl Into<String>, message: impl Into<String>) -> Self {
        MongodogError::InvalidArguments {
            method: method.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MongodogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = MongodogError::ConfigError("unknown reporter".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: unknown reporter");
    }

    #[test]
    fn test_not_implemented_display() {
        let err = MongodogError::NotImplemented("accept was not implemented in Foo".to_string());
        assert_eq!(err.to_string(), "Not implemented: accept was not implemented in Foo");
    }

    #[test]
    fn test_invalid_arguments_display() {
        let err = MongodogError::invalid_arguments("find", "got an unexpected keyword argument 'x'");
        assert_eq!(err.to_string(), "Invalid arguments for find: got an unexpected keyword argument 'x'");
    }

    #[test]
    fn test_method_not_bound_display() {
        let err = MongodogError::MethodNotBound("client.Collection.find".to_string());
        assert_eq!(err.to_string(), "No method bound at client.Collection.find");
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: MongodogError = json_err.into();

        match err {
            MongodogError::SerializationError(_) => {}
            _ => panic!("Expected SerializationError"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MongodogError = io_err.into();

        match err {
            MongodogError::IoError(_) => {}
            _ => panic!("Expected IoError"),
        }
    }

    #[test]
    fn test_result_type() {
        let ok_result: Result<i32> = Ok(42);
        assert!(ok_result.is_ok());

        let err_result: Result<i32> = Err(MongodogError::Unsupported("group".to_string()));
        assert!(err_result.is_err());
    }
}
