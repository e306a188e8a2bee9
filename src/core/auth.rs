use crate::domain::model::{ConnectionString, EdgeEnvironment, SasToken};
use crate::domain::ports::EnvironmentSource;
use crate::utils::error::{FixtureError, Result};
use percent_encoding::percent_decode_str;

/// Identity handed to a pipeline factory when a client is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationProvider {
    SymmetricKey(ConnectionString),
    SharedAccessSignature {
        hostname: String,
        device_id: String,
        module_id: Option<String>,
        token: SasToken,
    },
    IotEdge(EdgeEnvironment),
}

impl AuthenticationProvider {
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        ConnectionString::parse(connection_string).map(AuthenticationProvider::SymmetricKey)
    }

    /// The identity is read from `sr`: `{hostname}/devices/{device}[/modules/{module}]`.
    /// A URL-encoded `sr` is accepted; the token itself keeps the value as given.
    pub fn from_shared_access_signature(sas_token: &str) -> Result<Self> {
        let token = SasToken::parse(sas_token)?;
        let resource_uri = percent_decode_str(&token.resource_uri)
            .decode_utf8()
            .map_err(|e| FixtureError::sas_token(format!("resource URI is not valid UTF-8: {}", e)))?
            .into_owned();
        let segments: Vec<&str> = resource_uri.split('/').collect();

        let (hostname, device_id, module_id) = match segments.as_slice() {
            [hostname, "devices", device_id] => (*hostname, *device_id, None),
            [hostname, "devices", device_id, "modules", module_id] => {
                (*hostname, *device_id, Some(module_id.to_string()))
            }
            _ => {
                return Err(FixtureError::sas_token(format!(
                    "resource URI '{}' does not name a device or module",
                    token.resource_uri
                )));
            }
        };

        if hostname.is_empty() || device_id.is_empty() {
            return Err(FixtureError::sas_token("resource URI has empty segments"));
        }

        Ok(AuthenticationProvider::SharedAccessSignature {
            hostname: hostname.to_string(),
            device_id: device_id.to_string(),
            module_id,
            token,
        })
    }

    pub fn from_edge_environment<E: EnvironmentSource>(source: &E) -> Result<Self> {
        EdgeEnvironment::from_source(source).map(AuthenticationProvider::IotEdge)
    }

    pub fn hostname(&self) -> &str {
        match self {
            AuthenticationProvider::SymmetricKey(cs) => &cs.hostname,
            AuthenticationProvider::SharedAccessSignature { hostname, .. } => hostname,
            AuthenticationProvider::IotEdge(env) => &env.hostname,
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            AuthenticationProvider::SymmetricKey(cs) => &cs.device_id,
            AuthenticationProvider::SharedAccessSignature { device_id, .. } => device_id,
            AuthenticationProvider::IotEdge(env) => &env.device_id,
        }
    }

    pub fn module_id(&self) -> Option<&str> {
        match self {
            AuthenticationProvider::SymmetricKey(cs) => cs.module_id.as_deref(),
            AuthenticationProvider::SharedAccessSignature { module_id, .. } => module_id.as_deref(),
            AuthenticationProvider::IotEdge(env) => Some(&env.module_id),
        }
    }

    pub fn gateway_hostname(&self) -> Option<&str> {
        match self {
            AuthenticationProvider::SymmetricKey(cs) => cs.gateway_hostname.as_deref(),
            AuthenticationProvider::SharedAccessSignature { .. } => None,
            AuthenticationProvider::IotEdge(env) => Some(&env.gateway_hostname),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_key_identity() {
        let auth = AuthenticationProvider::from_connection_string(
            "HostName=h.net;DeviceId=dev;ModuleId=mod;SharedAccessKey=a2V5;GatewayHostName=gw",
        )
        .unwrap();
        assert_eq!(auth.hostname(), "h.net");
        assert_eq!(auth.device_id(), "dev");
        assert_eq!(auth.module_id(), Some("mod"));
        assert_eq!(auth.gateway_hostname(), Some("gw"));
    }

    #[test]
    fn test_sas_identity_from_resource_uri() {
        let auth = AuthenticationProvider::from_shared_access_signature(
            "SharedAccessSignature sr=h.net/devices/dev/modules/mod&sig=s&se=1",
        )
        .unwrap();
        assert_eq!(auth.device_id(), "dev");
        assert_eq!(auth.module_id(), Some("mod"));
    }

    /// sig&se&skn&sr 排列，sr 經過 URL 編碼
    #[test]
    fn test_sas_identity_from_encoded_resource_uri() {
        let sas = "SharedAccessSignature sig=abc&se=1539043658&skn=policy&sr=beauxbatons.academy-net%2Fdevices%2FMyPensieve";
        let auth = AuthenticationProvider::from_shared_access_signature(sas).unwrap();
        assert_eq!(auth.hostname(), "beauxbatons.academy-net");
        assert_eq!(auth.device_id(), "MyPensieve");
        assert_eq!(auth.module_id(), None);

        match auth {
            AuthenticationProvider::SharedAccessSignature { token, .. } => {
                assert_eq!(token.resource_uri, "beauxbatons.academy-net%2Fdevices%2FMyPensieve");
                assert_eq!(token.policy_name.as_deref(), Some("policy"));
            }
            other => panic!("unexpected provider {:?}", other),
        }
    }

    #[test]
    fn test_sas_with_unrecognised_resource_uri() {
        assert!(AuthenticationProvider::from_shared_access_signature(
            "SharedAccessSignature sr=Invalid&sig=s&se=1"
        )
        .is_err());
    }
}
