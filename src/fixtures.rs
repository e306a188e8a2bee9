//! Ready-made values for client tests.
//!
//! Every builder takes a [`FixtureValues`] so a test can override any field;
//! `FixtureValues::default()` gives the canonical set.

use crate::config::fixture_config::FixtureValues;
use crate::core::connection_string::{
    device_connection_string as format_device, device_connection_string_with_gateway,
    module_connection_string as format_module, module_connection_string_with_gateway,
};
use crate::core::edge_environment::{
    IOTEDGE_APIVERSION, IOTEDGE_DEVICEID, IOTEDGE_GATEWAYHOSTNAME, IOTEDGE_IOTHUBHOSTNAME,
    IOTEDGE_MODULEGENERATIONID, IOTEDGE_MODULEID, IOTEDGE_WORKLOADURI,
};
use crate::core::fake_pipeline::{CompletionStrategy, FakePipelineAdapter};
use crate::core::sas_token::{
    device_resource_uri, module_resource_uri, sas_token, sas_token_with_policy,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Edge HSM 的假憑證與 digest，給下游的 HSM mock 使用，不屬於容器環境變數
pub const FAKE_CA_CERT: &str = "__FAKE_CA_CERTIFICATE__";
pub const FAKE_DIGEST: &str = "__FAKE_DIGEST__";

/// Plain string or the protocol-gateway variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStringVariant {
    Direct,
    ProtocolGateway,
}

impl ConnectionStringVariant {
    pub const ALL: [ConnectionStringVariant; 2] = [
        ConnectionStringVariant::Direct,
        ConnectionStringVariant::ProtocolGateway,
    ];
}

pub fn device_connection_string(values: &FixtureValues, variant: ConnectionStringVariant) -> String {
    match variant {
        ConnectionStringVariant::Direct => {
            format_device(&values.hostname, &values.device_id, &values.shared_access_key)
        }
        ConnectionStringVariant::ProtocolGateway => device_connection_string_with_gateway(
            &values.hostname,
            &values.device_id,
            &values.shared_access_key,
            &values.gateway_hostname,
        ),
    }
}

pub fn module_connection_string(values: &FixtureValues, variant: ConnectionStringVariant) -> String {
    match variant {
        ConnectionStringVariant::Direct => format_module(
            &values.hostname,
            &values.device_id,
            &values.module_id,
            &values.shared_access_key,
        ),
        ConnectionStringVariant::ProtocolGateway => module_connection_string_with_gateway(
            &values.hostname,
            &values.device_id,
            &values.module_id,
            &values.shared_access_key,
            &values.gateway_hostname,
        ),
    }
}

pub fn device_sas_token_string(values: &FixtureValues) -> String {
    sas_token(
        &device_resource_uri(&values.hostname, &values.device_id),
        &values.signature,
        &values.expiry,
    )
}

pub fn module_sas_token_string(values: &FixtureValues) -> String {
    sas_token(
        &module_resource_uri(&values.hostname, &values.device_id, &values.module_id),
        &values.signature,
        &values.expiry,
    )
}

/// SAS token with `skn`, or `None` when no key name is configured.
pub fn sas_token_skn_string(values: &FixtureValues, uri: &str) -> Option<String> {
    values
        .shared_access_key_name
        .as_deref()
        .map(|policy| sas_token_with_policy(uri, &values.signature, &values.expiry, policy))
}

pub fn edge_container_env_vars() -> HashMap<String, String> {
    [
        (IOTEDGE_MODULEID, "__FAKE_MODULE_ID__"),
        (IOTEDGE_DEVICEID, "__FAKE_DEVICE_ID__"),
        (IOTEDGE_IOTHUBHOSTNAME, "__FAKE_HOSTNAME__"),
        (IOTEDGE_GATEWAYHOSTNAME, "__FAKE_GATEWAY_HOSTNAME__"),
        (IOTEDGE_APIVERSION, "__FAKE_API_VERSION__"),
        (IOTEDGE_MODULEGENERATIONID, "__FAKE_MODULE_GENERATION_ID__"),
        (IOTEDGE_WORKLOADURI, "http://__FAKE_WORKLOAD_URI__/"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

/// Fake map with `overrides` applied on top.
pub fn edge_container_env_vars_with(overrides: &HashMap<String, String>) -> HashMap<String, String> {
    let mut vars = edge_container_env_vars();
    vars.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    vars
}

/// Pipeline that completes every operation as soon as it is called.
pub fn pipeline() -> Arc<FakePipelineAdapter> {
    Arc::new(FakePipelineAdapter::new(CompletionStrategy::AutoInvoke))
}

/// Pipeline whose callbacks the test triggers itself.
pub fn pipeline_manual_cb() -> Arc<FakePipelineAdapter> {
    Arc::new(FakePipelineAdapter::new(CompletionStrategy::Manual))
}
