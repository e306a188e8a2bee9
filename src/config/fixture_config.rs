use crate::utils::error::{FixtureError, Result};
use crate::utils::validation::{validate_epoch_seconds, validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_SHARED_ACCESS_KEY: &str = "Zm9vYmFy";
pub const DEFAULT_HOSTNAME: &str = "beauxbatons.academy-net";
pub const DEFAULT_DEVICE_ID: &str = "MyPensieve";
pub const DEFAULT_MODULE_ID: &str = "Divination";
pub const DEFAULT_GATEWAY_HOSTNAME: &str = "EnchantedCeiling";
pub const DEFAULT_SIGNATURE: &str = "IsolemnlySwearThatIamuUptoNogood";
pub const DEFAULT_EXPIRY: &str = "1539043658";

/// Values every fixture string is built from.
///
/// Passed explicitly into test setup; `Default` yields the canonical values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureValues {
    pub hostname: String,
    pub device_id: String,
    pub module_id: String,
    pub gateway_hostname: String,
    pub shared_access_key: String,
    pub signature: String,
    pub expiry: String,
    pub shared_access_key_name: Option<String>,
}

impl Default for FixtureValues {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            device_id: DEFAULT_DEVICE_ID.to_string(),
            module_id: DEFAULT_MODULE_ID.to_string(),
            gateway_hostname: DEFAULT_GATEWAY_HOSTNAME.to_string(),
            shared_access_key: DEFAULT_SHARED_ACCESS_KEY.to_string(),
            signature: DEFAULT_SIGNATURE.to_string(),
            expiry: DEFAULT_EXPIRY.to_string(),
            shared_access_key_name: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureConfig {
    #[serde(default)]
    pub fixtures: FixtureValues,
    /// 覆寫 Edge 環境變數
    pub edge: Option<HashMap<String, String>>,
}

impl FixtureConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FixtureError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FixtureError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DEVICE_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FixtureError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for FixtureValues {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("fixtures.hostname", &self.hostname)?;
        validate_non_empty_string("fixtures.device_id", &self.device_id)?;
        validate_non_empty_string("fixtures.module_id", &self.module_id)?;
        validate_non_empty_string("fixtures.shared_access_key", &self.shared_access_key)?;
        validate_epoch_seconds("fixtures.expiry", &self.expiry)?;
        Ok(())
    }
}

impl Validate for FixtureConfig {
    fn validate(&self) -> Result<()> {
        self.fixtures.validate()?;

        if let Some(edge) = &self.edge {
            for name in edge.keys() {
                if !name.starts_with("IOTEDGE_") {
                    return Err(FixtureError::InvalidConfigValueError {
                        field: "edge".to_string(),
                        value: name.clone(),
                        reason: "Edge overrides must be IOTEDGE_* variables".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
