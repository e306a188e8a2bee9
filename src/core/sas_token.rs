use crate::domain::model::SasToken;
use crate::utils::error::{FixtureError, Result};
use crate::utils::validation::validate_epoch_seconds;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

pub const SAS_PREFIX: &str = "SharedAccessSignature ";

const RESOURCE_URI: &str = "sr";
const SIGNATURE: &str = "sig";
const EXPIRY: &str = "se";
const POLICY_NAME: &str = "skn";

/// `SharedAccessSignature sr={uri}&sig={sig}&se={exp}`
pub fn sas_token(uri: &str, signature: &str, expiry: &str) -> String {
    SasToken::new(uri, signature, expiry).to_string()
}

/// `SharedAccessSignature sr={uri}&sig={sig}&se={exp}&skn={policy}`
pub fn sas_token_with_policy(uri: &str, signature: &str, expiry: &str, policy_name: &str) -> String {
    SasToken::new(uri, signature, expiry)
        .with_policy_name(policy_name)
        .to_string()
}

pub fn device_resource_uri(hostname: &str, device_id: &str) -> String {
    format!("{}/devices/{}", hostname, device_id)
}

pub fn module_resource_uri(hostname: &str, device_id: &str, module_id: &str) -> String {
    format!("{}/devices/{}/modules/{}", hostname, device_id, module_id)
}

impl SasToken {
    pub fn new(resource_uri: &str, signature: &str, expiry: &str) -> Self {
        Self {
            resource_uri: resource_uri.to_string(),
            signature: signature.to_string(),
            expiry: expiry.to_string(),
            policy_name: None,
        }
    }

    pub fn with_policy_name(mut self, policy_name: &str) -> Self {
        self.policy_name = Some(policy_name.to_string());
        self
    }

    /// 解析 SAS token
    ///
    /// Fields may come in any order. Values are kept verbatim (no URI
    /// decoding) and `se` must be whole seconds since the epoch.
    pub fn parse(input: &str) -> Result<Self> {
        let body = input
            .strip_prefix(SAS_PREFIX)
            .ok_or_else(|| FixtureError::sas_token("missing 'SharedAccessSignature' prefix"))?;

        let mut resource_uri = None;
        let mut signature = None;
        let mut expiry = None;
        let mut policy_name = None;

        for field in body.split('&') {
            let (key, value) = field.split_once('=').ok_or_else(|| {
                FixtureError::sas_token(format!("field '{}' is not key=value", field))
            })?;

            let slot = match key {
                RESOURCE_URI => &mut resource_uri,
                SIGNATURE => &mut signature,
                EXPIRY => &mut expiry,
                POLICY_NAME => &mut policy_name,
                other => {
                    return Err(FixtureError::sas_token(format!("unknown field '{}'", other)));
                }
            };
            if slot.replace(value.to_string()).is_some() {
                return Err(FixtureError::sas_token(format!("duplicate field '{}'", key)));
            }
        }

        let required = |value: Option<String>, key: &str| {
            value.ok_or_else(|| FixtureError::sas_token(format!("missing '{}'", key)))
        };

        let expiry = required(expiry, EXPIRY)?;
        validate_epoch_seconds(EXPIRY, &expiry)
            .map_err(|e| FixtureError::sas_token(e.to_string()))?;

        Ok(Self {
            resource_uri: required(resource_uri, RESOURCE_URI)?,
            signature: required(signature, SIGNATURE)?,
            expiry,
            policy_name,
        })
    }

    /// 過期時間；`se` 不是合法秒數時回傳 None
    pub fn expiry_time(&self) -> Option<DateTime<Utc>> {
        let seconds = self.expiry.parse::<i64>().ok()?;
        DateTime::from_timestamp(seconds, 0)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_time().map(|expiry| expiry <= now).unwrap_or(true)
    }
}

impl fmt::Display for SasToken {
    // TODO: resource URI is written as-is; decide whether sr should be URL-encoded
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}={}&{}={}&{}={}",
            SAS_PREFIX,
            RESOURCE_URI,
            self.resource_uri,
            SIGNATURE,
            self.signature,
            EXPIRY,
            self.expiry
        )?;
        if let Some(policy_name) = &self.policy_name {
            write!(f, "&{}={}", POLICY_NAME, policy_name)?;
        }
        Ok(())
    }
}

impl FromStr for SasToken {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sas_token_format() {
        assert_eq!(
            sas_token(
                "beauxbatons.academy-net/devices/MyPensieve",
                "IsolemnlySwearThatIamuUptoNogood",
                "1539043658"
            ),
            "SharedAccessSignature sr=beauxbatons.academy-net/devices/MyPensieve&sig=IsolemnlySwearThatIamuUptoNogood&se=1539043658"
        );
    }

    #[test]
    fn test_sas_token_with_policy_appends_skn_last() {
        let token = sas_token_with_policy("h/devices/d", "sig", "1", "alohomora");
        assert!(token.ends_with("&se=1&skn=alohomora"));
    }

    #[test]
    fn test_resource_uris() {
        assert_eq!(
            device_resource_uri("beauxbatons.academy-net", "MyPensieve"),
            "beauxbatons.academy-net/devices/MyPensieve"
        );
        assert_eq!(
            module_resource_uri("beauxbatons.academy-net", "MyPensieve", "Divination"),
            "beauxbatons.academy-net/devices/MyPensieve/modules/Divination"
        );
    }

    #[test]
    fn test_parse_accepts_alternate_field_order() {
        let token =
            SasToken::parse("SharedAccessSignature sig=abc&se=1539043658&skn=policy&sr=h%2Fdevices%2Fd")
                .unwrap();
        assert_eq!(token.resource_uri, "h%2Fdevices%2Fd");
        assert_eq!(token.policy_name.as_deref(), Some("policy"));
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        assert!(SasToken::parse("").is_err());
        assert!(SasToken::parse("not-a-sas-token").is_err());
        assert!(SasToken::parse("SharedAccessSignature sr=Invalid&sig=Invalid&se=Invalid").is_err());
        assert!(SasToken::parse("SharedAccessSignature sr=a&sig=b").is_err());
        assert!(SasToken::parse("SharedAccessSignature sr=a&sig=b&se=1&foo=x").is_err());
        assert!(SasToken::parse("SharedAccessSignature sr=a&sr=a&sig=b&se=1").is_err());
    }

    #[test]
    fn test_expiry_time() {
        let token = SasToken::new("h/devices/d", "sig", "1539043658");
        let expiry = token.expiry_time().unwrap();
        assert_eq!(expiry.timestamp(), 1539043658);
        assert!(token.is_expired_at(Utc::now()));
        assert!(SasToken::new("u", "s", "soon").is_expired_at(Utc::now()));
    }
}
