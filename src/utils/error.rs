use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Malformed mapping file '{path}': {reason}")]
    MappingFileError { path: String, reason: String },

    #[error("Script '{script}' could not be loaded: {message}")]
    ScriptLoadError { script: String, message: String },

    #[error("Script '{script}' failed at row {row}: {message}")]
    ScriptError {
        script: String,
        row: usize,
        message: String,
    },

    #[error("Script '{script}' returned an invalid record at row {row}: {reason}")]
    ScriptContractError {
        script: String,
        row: usize,
        reason: String,
    },

    #[error("Invalid value for '{field}' at row {row}: {reason}")]
    InvalidRecordError {
        row: usize,
        field: String,
        reason: String,
    },

    #[error("Authentication failed: {message}")]
    AuthenticationError { message: String },

    #[error("Remote call '{operation}' failed: {message}")]
    RemoteCallError {
        operation: String,
        row: Option<usize>,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Script,
    Authentication,
    Network,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit status; never zero, a failed run always fails the process.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl CheckoutError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn remote(operation: &str, message: impl Into<String>) -> Self {
        Self::RemoteCallError {
            operation: operation.to_string(),
            row: None,
            message: message.into(),
        }
    }

    /// Attaches the input row index to a remote call failure.
    pub fn at_row(self, index: usize) -> Self {
        match self {
            Self::RemoteCallError {
                operation, message, ..
            } => Self::RemoteCallError {
                operation,
                row: Some(index),
                message,
            },
            other => other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MappingFileError { .. } => ErrorCategory::Configuration,
            Self::ScriptLoadError { .. }
            | Self::ScriptError { .. }
            | Self::ScriptContractError { .. } => ErrorCategory::Script,
            Self::AuthenticationError { .. } => ErrorCategory::Authentication,
            Self::RemoteCallError { .. } => ErrorCategory::Network,
            Self::CsvError(_) | Self::SerializationError(_) | Self::InvalidRecordError { .. } => {
                ErrorCategory::Data
            }
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration
            | ErrorCategory::Script
            | ErrorCategory::Authentication
            | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingConfigError { field } => {
                format!("The required setting '{}' was not provided", field)
            }
            Self::ScriptContractError { script, row, reason } => format!(
                "The script '{}' produced an unusable record for row {}: {}",
                script, row, reason
            ),
            Self::RemoteCallError {
                operation,
                row: Some(row),
                message,
            } => format!(
                "The payment platform rejected '{}' for row {}: {}",
                operation, row, message
            ),
            Self::AuthenticationError { .. } => {
                "Could not authenticate against the payment platform".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the command line flags, environment variables and the mapping file"
            }
            ErrorCategory::Script => "Make sure the script returns amount, creditor_iban, vat_code, expire_date and remittance for every row",
            ErrorCategory::Authentication => "Verify the client id and client secret",
            ErrorCategory::Network => {
                "Check connectivity to the payment platform and run the batch again"
            }
            ErrorCategory::Data => "Fix the offending row in the input spreadsheet",
            ErrorCategory::System => "Check file paths and permissions",
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
