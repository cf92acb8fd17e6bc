use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(String),

    #[error("Invalid scoring table: {0}")]
    Scoring(String),

    #[error("Invalid pattern '{pattern}' in {level} risk patterns: {message}")]
    InvalidPattern {
        level: String,
        pattern: String,
        message: String,
    },

    #[error("Invalid policy document: {0}")]
    Policy(String),

    #[error("No IAM Identity Center instance found")]
    NoInstance,

    #[error("AWS credentials not usable: {0}")]
    Credentials(String),

    #[error("AWS call {operation} failed: {message}")]
    Aws { operation: String, message: String },

    #[error("Unknown permission set {0}")]
    UnknownPermissionSet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl AuditError {
    pub(crate) fn aws(operation: &str, message: impl Into<String>) -> Self {
        Self::Aws {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
