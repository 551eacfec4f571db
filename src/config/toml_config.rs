use crate::azure::{RetryPolicy, DEFAULT_MANAGEMENT_ENDPOINT};
use crate::utils::error::{OptimizerError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub azure: AzureConfig,
    pub ai: Option<AiConfig>,
    pub scan: Option<ScanConfig>,
    pub actions: Option<ActionsConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    pub endpoint: Option<String>,
    /// Bearer token, usually `${AZURE_TOKEN}` substituted from the
    /// environment at load time.
    pub token: String,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub subscriptions: Option<Vec<String>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    pub throttle_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OptimizerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| OptimizerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AZURE_TOKEN})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        // 使用正規表達式匹配 ${VAR_NAME} 格式
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("azure.endpoint", self.management_endpoint())?;
        validation::validate_token("azure.token", &self.azure.token)?;

        if let Some(limit) = self.scan.as_ref().and_then(|s| s.limit) {
            validation::validate_positive_number("scan.limit", limit, 1)?;
        }

        validation::validate_path("output.path", self.output_path())?;

        if self.ai_enabled() {
            let ai = validation::validate_required_field("ai", &self.ai)?;
            let endpoint = validation::validate_required_field("ai.endpoint", &ai.endpoint)?;
            validation::validate_url("ai.endpoint", endpoint)?;
            let api_key = validation::validate_required_field("ai.api_key", &ai.api_key)?;
            validation::validate_token("ai.api_key", api_key)?;
        }

        Ok(())
    }

    pub fn management_endpoint(&self) -> &str {
        self.azure
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_MANAGEMENT_ENDPOINT)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.azure.timeout_seconds.unwrap_or(60))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy::new(
            self.azure.retry_attempts.unwrap_or(defaults.attempts),
            self.azure
                .retry_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.base_delay),
        )
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai.as_ref().map(|a| a.enabled).unwrap_or(false)
    }

    pub fn ai_model(&self) -> &str {
        self.ai
            .as_ref()
            .and_then(|a| a.model.as_deref())
            .unwrap_or("gpt-4o")
    }

    pub fn subscriptions(&self) -> &[String] {
        self.scan
            .as_ref()
            .and_then(|s| s.subscriptions.as_deref())
            .unwrap_or(&[])
    }

    pub fn scan_limit(&self) -> usize {
        self.scan.as_ref().and_then(|s| s.limit).unwrap_or(200)
    }

    pub fn throttle_delay(&self) -> Duration {
        Duration::from_secs(
            self.actions
                .as_ref()
                .and_then(|a| a.throttle_delay_seconds)
                .unwrap_or(2),
        )
    }

    pub fn output_path(&self) -> &str {
        self.output
            .as_ref()
            .and_then(|o| o.path.as_deref())
            .unwrap_or("./reports")
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
