use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {endpoint}")]
    HttpStatusError { endpoint: String, status: u16 },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid coordinate ({latitude}, {longitude}): {reason}")]
    InvalidCoordinateError {
        latitude: f64,
        longitude: f64,
        reason: String,
    },

    #[error("Authentication required: {message}")]
    AuthError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, ScoutError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ScoutError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::HttpStatusError { .. } | Self::AuthError { .. } => {
                ErrorCategory::Network
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::InvalidCoordinateError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::ProcessingError { .. }
            | Self::ValidationError { .. } => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路錯誤通常重試即可
            Self::ApiError(_) | Self::HttpStatusError { .. } => ErrorSeverity::Medium,
            Self::AuthError { .. } => ErrorSeverity::Medium,
            Self::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check network connectivity and the --api-base URL, then retry"
            }
            ErrorCategory::Configuration => {
                "Review the configuration file and command line flags"
            }
            ErrorCategory::Data => "The API returned unexpected data; retry later or report it",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ApiError(e) if e.is_timeout() => "The performance API timed out".to_string(),
            Self::ApiError(_) => "Could not reach the performance API".to_string(),
            Self::HttpStatusError { status, .. } => {
                format!("The performance API answered with HTTP {}", status)
            }
            Self::InvalidCoordinateError { .. } => {
                "Latitude must be within -90..90 and longitude within -180..180".to_string()
            }
            other => other.to_string(),
        }
    }
}
