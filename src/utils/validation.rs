use crate::utils::error::{FixtureError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str, allowed_schemes: &[&str]) -> Result<Url> {
    if url_str.is_empty() {
        return Err(FixtureError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => {
            if allowed_schemes.contains(&url.scheme()) {
                Ok(url)
            } else {
                Err(FixtureError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: url_str.to_string(),
                    reason: format!("Unsupported URL scheme: {}", url.scheme()),
                })
            }
        }
        Err(e) => Err(FixtureError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FixtureError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 驗證字串為非負整數 (例如 SAS 的 se 欄位)
pub fn validate_epoch_seconds(field_name: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|e| FixtureError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Expected seconds since epoch: {}", e),
        })
}
