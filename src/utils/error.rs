use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("Resource not found: {resource}")]
    NotFoundError { resource: String },

    #[error("Unexpected payload from {endpoint}: {message}")]
    PayloadError { endpoint: String, message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Backend,
    Configuration,
    Output,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MetricsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MetricsError::ApiError(_) => ErrorCategory::Network,
            MetricsError::HttpStatusError { .. }
            | MetricsError::NotFoundError { .. }
            | MetricsError::PayloadError { .. } => ErrorCategory::Backend,
            MetricsError::ConfigValidationError { .. }
            | MetricsError::InvalidConfigValueError { .. }
            | MetricsError::MissingConfigError { .. } => ErrorCategory::Configuration,
            MetricsError::ZipError(_) | MetricsError::IoError(_) => ErrorCategory::Output,
            MetricsError::CsvError(_) | MetricsError::SerializationError(_) => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路與 5xx 錯誤通常可重試
            MetricsError::ApiError(_) => ErrorSeverity::Medium,
            MetricsError::HttpStatusError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            MetricsError::HttpStatusError { .. }
            | MetricsError::NotFoundError { .. }
            | MetricsError::PayloadError { .. } => ErrorSeverity::High,
            MetricsError::ConfigValidationError { .. }
            | MetricsError::InvalidConfigValueError { .. }
            | MetricsError::MissingConfigError { .. } => ErrorSeverity::High,
            MetricsError::CsvError(_) | MetricsError::SerializationError(_) => ErrorSeverity::High,
            MetricsError::ZipError(_) | MetricsError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.severity() == ErrorSeverity::Medium
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            MetricsError::ApiError(_) => {
                "Check network connectivity and that the backend is reachable".to_string()
            }
            MetricsError::HttpStatusError { status, .. } if *status == 401 || *status == 403 => {
                "Check the Authorization header configured under [source.headers]".to_string()
            }
            MetricsError::HttpStatusError { .. } => {
                "Retry later or inspect the backend logs".to_string()
            }
            MetricsError::NotFoundError { .. } => {
                "Verify the sprint id exists in the backend".to_string()
            }
            MetricsError::PayloadError { .. } => {
                "Run backlog-probe against the endpoint to inspect the payload shape".to_string()
            }
            MetricsError::ConfigValidationError { field, .. }
            | MetricsError::InvalidConfigValueError { field, .. } => {
                format!("Fix the '{}' entry in the configuration", field)
            }
            MetricsError::MissingConfigError { field } => {
                format!("Add '{}' to the configuration or pass it on the command line", field)
            }
            MetricsError::IoError(_) | MetricsError::ZipError(_) => {
                "Make sure the output path exists and is writable".to_string()
            }
            MetricsError::CsvError(_) | MetricsError::SerializationError(_) => {
                "Report this as a bug together with the input data".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the Scrum backend: {}", self),
            ErrorCategory::Backend => format!("The Scrum backend rejected the request: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Output => format!("Could not write the report: {}", self),
            ErrorCategory::Data => format!("Could not render the report: {}", self),
        }
    }

    /// CLI 結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
