use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Resource Graph query failed (HTTP {status}): {message}")]
    GraphQueryError { status: u16, message: String },

    #[error("ARM request failed (HTTP {status}) for {resource_id}: {message}")]
    ArmError {
        status: u16,
        resource_id: String,
        message: String,
    },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Invalid resource id: {id}")]
    InvalidResourceId { id: String },

    #[error("AI classification failed: {message}")]
    ClassificationError { message: String },

    #[error("Upgrade failed at stage '{stage}': {details}")]
    UpgradeError { stage: String, details: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid config value in '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required config field: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Azure,
    Ai,
    Config,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OptimizerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            OptimizerError::ApiError(_) => ErrorCategory::Network,
            OptimizerError::GraphQueryError { .. }
            | OptimizerError::ArmError { .. }
            | OptimizerError::AuthError { .. }
            | OptimizerError::InvalidResourceId { .. }
            | OptimizerError::UpgradeError { .. } => ErrorCategory::Azure,
            OptimizerError::ClassificationError { .. } => ErrorCategory::Ai,
            OptimizerError::ConfigError { .. }
            | OptimizerError::ConfigValidationError { .. }
            | OptimizerError::InvalidConfigValueError { .. }
            | OptimizerError::MissingConfigError { .. } => ErrorCategory::Config,
            OptimizerError::IoError(_) | OptimizerError::SerializationError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 分類失敗可降級為知識庫結果，不影響掃描
            OptimizerError::ClassificationError { .. } => ErrorSeverity::Low,
            OptimizerError::ApiError(_) | OptimizerError::GraphQueryError { .. } => {
                ErrorSeverity::Medium
            }
            OptimizerError::ArmError { .. }
            | OptimizerError::UpgradeError { .. }
            | OptimizerError::InvalidResourceId { .. } => ErrorSeverity::High,
            OptimizerError::AuthError { .. }
            | OptimizerError::ConfigError { .. }
            | OptimizerError::ConfigValidationError { .. }
            | OptimizerError::InvalidConfigValueError { .. }
            | OptimizerError::MissingConfigError { .. }
            | OptimizerError::IoError(_)
            | OptimizerError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            OptimizerError::ApiError(_) => {
                "Check network connectivity and the management endpoint".to_string()
            }
            OptimizerError::GraphQueryError { status, .. } if *status == 429 => {
                "Resource Graph is throttling; increase retry_delay_seconds or reduce scan scope"
                    .to_string()
            }
            OptimizerError::GraphQueryError { .. } => {
                "Verify the KQL query and that the token has Reader access on the subscriptions"
                    .to_string()
            }
            OptimizerError::ArmError { status, .. } if *status == 403 => {
                "The token lacks permissions on the resource; delete/upgrade actions need \
                 Contributor role"
                    .to_string()
            }
            OptimizerError::ArmError { .. } => {
                "Check the resource id and api-version against the ARM provider".to_string()
            }
            OptimizerError::AuthError { .. } => {
                "Refresh the bearer token (AZURE_TOKEN) and retry".to_string()
            }
            OptimizerError::InvalidResourceId { .. } => {
                "Resource ids must look like /subscriptions/<sub>/resourceGroups/<rg>/providers/..."
                    .to_string()
            }
            OptimizerError::ClassificationError { .. } => {
                "Check OPENAI_KEY and the AI endpoint; scans fall back to knowledge-base results"
                    .to_string()
            }
            OptimizerError::UpgradeError { stage, .. } => format!(
                "Upgrade stopped at '{}'; verify the resource state in the portal before retrying",
                stage
            ),
            OptimizerError::ConfigError { .. }
            | OptimizerError::ConfigValidationError { .. }
            | OptimizerError::InvalidConfigValueError { .. }
            | OptimizerError::MissingConfigError { .. } => {
                "Fix the configuration file and re-run".to_string()
            }
            OptimizerError::IoError(_) => {
                "Check that the output path exists and is writable".to_string()
            }
            OptimizerError::SerializationError(_) => {
                "The payload did not match the expected JSON shape".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Azure => format!("Azure operation failed: {}", self),
            ErrorCategory::Ai => format!("AI analysis failed: {}", self),
            ErrorCategory::Config => format!("Configuration problem: {}", self),
            ErrorCategory::Io => format!("Local IO problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_errors_are_low_severity() {
        let e = OptimizerError::ClassificationError {
            message: "model returned prose".to_string(),
        };
        assert_eq!(e.severity(), ErrorSeverity::Low);
        assert_eq!(e.category(), ErrorCategory::Ai);
    }

    #[test]
    fn throttling_suggestion_mentions_retry_delay() {
        let e = OptimizerError::GraphQueryError {
            status: 429,
            message: "too many requests".to_string(),
        };
        assert!(e.recovery_suggestion().contains("retry_delay_seconds"));
    }

    #[test]
    fn config_errors_are_critical() {
        let e = OptimizerError::MissingConfigError {
            field: "azure.token".to_string(),
        };
        assert_eq!(e.severity(), ErrorSeverity::Critical);
    }
}
