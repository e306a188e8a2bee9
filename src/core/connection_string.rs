use crate::domain::model::ConnectionString;
use crate::utils::error::{FixtureError, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const HOST_NAME: &str = "HostName";
pub const DEVICE_ID: &str = "DeviceId";
pub const MODULE_ID: &str = "ModuleId";
pub const SHARED_ACCESS_KEY: &str = "SharedAccessKey";
pub const GATEWAY_HOST_NAME: &str = "GatewayHostName";

const VALID_KEYS: [&str; 5] = [
    HOST_NAME,
    DEVICE_ID,
    MODULE_ID,
    SHARED_ACCESS_KEY,
    GATEWAY_HOST_NAME,
];

/// `HostName={h};DeviceId={d};SharedAccessKey={k}`
pub fn device_connection_string(hostname: &str, device_id: &str, shared_access_key: &str) -> String {
    ConnectionString::new(hostname, device_id, shared_access_key).to_string()
}

/// `HostName={h};DeviceId={d};SharedAccessKey={k};GatewayHostName={g}`
pub fn device_connection_string_with_gateway(
    hostname: &str,
    device_id: &str,
    shared_access_key: &str,
    gateway_hostname: &str,
) -> String {
    ConnectionString::new(hostname, device_id, shared_access_key)
        .with_gateway_hostname(gateway_hostname)
        .to_string()
}

/// `HostName={h};DeviceId={d};ModuleId={m};SharedAccessKey={k}`
pub fn module_connection_string(
    hostname: &str,
    device_id: &str,
    module_id: &str,
    shared_access_key: &str,
) -> String {
    ConnectionString::new(hostname, device_id, shared_access_key)
        .with_module_id(module_id)
        .to_string()
}

/// `HostName={h};DeviceId={d};ModuleId={m};SharedAccessKey={k};GatewayHostName={g}`
pub fn module_connection_string_with_gateway(
    hostname: &str,
    device_id: &str,
    module_id: &str,
    shared_access_key: &str,
    gateway_hostname: &str,
) -> String {
    ConnectionString::new(hostname, device_id, shared_access_key)
        .with_module_id(module_id)
        .with_gateway_hostname(gateway_hostname)
        .to_string()
}

impl ConnectionString {
    pub fn new(hostname: &str, device_id: &str, shared_access_key: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            device_id: device_id.to_string(),
            module_id: None,
            shared_access_key: shared_access_key.to_string(),
            gateway_hostname: None,
        }
    }

    pub fn with_module_id(mut self, module_id: &str) -> Self {
        self.module_id = Some(module_id.to_string());
        self
    }

    pub fn with_gateway_hostname(mut self, gateway_hostname: &str) -> Self {
        self.gateway_hostname = Some(gateway_hostname.to_string());
        self
    }

    pub fn is_module(&self) -> bool {
        self.module_id.is_some()
    }

    /// 解析連線字串
    ///
    /// Each `;`-separated segment is split on its first `=`, so base64 padding
    /// in `SharedAccessKey` survives. Unknown or repeated keys are rejected.
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(FixtureError::connection_string("connection string is empty"));
        }

        let mut fields: HashMap<&str, &str> = HashMap::new();
        for segment in input.split(';') {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                FixtureError::connection_string(format!("segment '{}' is not key=value", segment))
            })?;

            if !VALID_KEYS.contains(&key) {
                return Err(FixtureError::connection_string(format!(
                    "unknown key '{}'",
                    key
                )));
            }
            if fields.insert(key, value).is_some() {
                return Err(FixtureError::connection_string(format!(
                    "duplicate key '{}'",
                    key
                )));
            }
        }

        let required = |key: &str| -> Result<String> {
            fields
                .get(key)
                .map(|v| v.to_string())
                .ok_or_else(|| FixtureError::connection_string(format!("missing '{}'", key)))
        };

        let parsed = Self {
            hostname: required(HOST_NAME)?,
            device_id: required(DEVICE_ID)?,
            module_id: fields.get(MODULE_ID).map(|v| v.to_string()),
            shared_access_key: required(SHARED_ACCESS_KEY)?,
            gateway_hostname: fields.get(GATEWAY_HOST_NAME).map(|v| v.to_string()),
        };

        tracing::debug!(
            "Parsed connection string for device '{}' on '{}'",
            parsed.device_id,
            parsed.hostname
        );
        Ok(parsed)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={};{}={}", HOST_NAME, self.hostname, DEVICE_ID, self.device_id)?;
        if let Some(module_id) = &self.module_id {
            write!(f, ";{}={}", MODULE_ID, module_id)?;
        }
        write!(f, ";{}={}", SHARED_ACCESS_KEY, self.shared_access_key)?;
        if let Some(gateway) = &self.gateway_hostname {
            write!(f, ";{}={}", GATEWAY_HOST_NAME, gateway)?;
        }
        Ok(())
    }
}

impl FromStr for ConnectionString {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
