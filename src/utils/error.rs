use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing secret: {name}")]
    MissingSecretError { name: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Storage,
    Configuration,
}

impl EtlError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => ErrorCategory::Network,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::XmlError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) => ErrorCategory::Storage,
            EtlError::ConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingSecretError { .. } => ErrorCategory::Configuration,
        }
    }

    /// 是否屬於單筆記錄層級、可略過的錯誤
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            EtlError::SerializationError(_)
                | EtlError::XmlError(_)
                | EtlError::ProcessingError { .. }
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            _ => 1,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ApiError(e) if e.is_timeout() => {
                "The remote API did not answer in time".to_string()
            }
            EtlError::ApiError(_) => "Could not reach the remote API".to_string(),
            EtlError::HttpStatusError { status, .. } => {
                format!("The remote API answered with HTTP {}", status)
            }
            EtlError::MissingSecretError { name } => {
                format!("The secret '{}' is not set", name)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network access and API status, then run the job again",
            ErrorCategory::Data => "Inspect the API response; the upstream format may have changed",
            ErrorCategory::Storage => "Check that the output directory exists and is writable",
            ErrorCategory::Configuration => {
                "Check the config file and the SI_OPENACCESS_API_KEY / OER_ACCESS_TOKEN variables"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_exit_with_two() {
        let err = EtlError::MissingSecretError {
            name: "OER_ACCESS_TOKEN".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.exit_code(), 2);
        assert!(err.user_friendly_message().contains("OER_ACCESS_TOKEN"));
    }

    #[test]
    fn test_other_errors_exit_with_one() {
        let err = EtlError::HttpStatusError {
            status: 503,
            url: "https://example.com".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.exit_code(), 1);
        assert!(!err.is_record_level());

        assert!(EtlError::processing("bad record").is_record_level());
    }
}
