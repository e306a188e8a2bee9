use crate::domain::model::EdgeEnvironment;
use crate::domain::ports::{EnvironmentSource, ProcessEnvironment};
use crate::utils::error::{FixtureError, Result};
use crate::utils::validation::validate_url;
use std::collections::HashMap;

pub const IOTEDGE_MODULEID: &str = "IOTEDGE_MODULEID";
pub const IOTEDGE_DEVICEID: &str = "IOTEDGE_DEVICEID";
pub const IOTEDGE_IOTHUBHOSTNAME: &str = "IOTEDGE_IOTHUBHOSTNAME";
pub const IOTEDGE_GATEWAYHOSTNAME: &str = "IOTEDGE_GATEWAYHOSTNAME";
pub const IOTEDGE_APIVERSION: &str = "IOTEDGE_APIVERSION";
pub const IOTEDGE_MODULEGENERATIONID: &str = "IOTEDGE_MODULEGENERATIONID";
pub const IOTEDGE_WORKLOADURI: &str = "IOTEDGE_WORKLOADURI";

pub const EDGE_ENV_VARS: [&str; 7] = [
    IOTEDGE_MODULEID,
    IOTEDGE_DEVICEID,
    IOTEDGE_IOTHUBHOSTNAME,
    IOTEDGE_GATEWAYHOSTNAME,
    IOTEDGE_APIVERSION,
    IOTEDGE_MODULEGENERATIONID,
    IOTEDGE_WORKLOADURI,
];

const WORKLOAD_URI_SCHEMES: [&str; 3] = ["http", "https", "unix"];

impl EdgeEnvironment {
    /// 從目前行程的環境變數載入
    pub fn from_env() -> Result<Self> {
        Self::from_source(&ProcessEnvironment)
    }

    pub fn from_source<E: EnvironmentSource>(source: &E) -> Result<Self> {
        let read = |name: &str| -> Result<String> {
            source.var(name).ok_or_else(|| {
                tracing::warn!("Edge environment variable {} is not set", name);
                FixtureError::edge(format!("environment variable {} is not set", name))
            })
        };

        let environment = Self {
            module_id: read(IOTEDGE_MODULEID)?,
            device_id: read(IOTEDGE_DEVICEID)?,
            hostname: read(IOTEDGE_IOTHUBHOSTNAME)?,
            gateway_hostname: read(IOTEDGE_GATEWAYHOSTNAME)?,
            api_version: read(IOTEDGE_APIVERSION)?,
            module_generation_id: read(IOTEDGE_MODULEGENERATIONID)?,
            workload_uri: read(IOTEDGE_WORKLOADURI)?,
        };

        validate_url(IOTEDGE_WORKLOADURI, &environment.workload_uri, &WORKLOAD_URI_SCHEMES)
            .map_err(|e| FixtureError::edge(e.to_string()))?;

        tracing::debug!(
            "Loaded Edge environment for module '{}' on device '{}'",
            environment.module_id,
            environment.device_id
        );
        Ok(environment)
    }

    pub fn to_env_vars(&self) -> HashMap<String, String> {
        [
            (IOTEDGE_MODULEID, &self.module_id),
            (IOTEDGE_DEVICEID, &self.device_id),
            (IOTEDGE_IOTHUBHOSTNAME, &self.hostname),
            (IOTEDGE_GATEWAYHOSTNAME, &self.gateway_hostname),
            (IOTEDGE_APIVERSION, &self.api_version),
            (IOTEDGE_MODULEGENERATIONID, &self.module_generation_id),
            (IOTEDGE_WORKLOADURI, &self.workload_uri),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
    }
}
