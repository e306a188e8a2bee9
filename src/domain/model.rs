use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionString {
    pub hostname: String,
    pub device_id: String,
    pub module_id: Option<String>,
    pub shared_access_key: String,
    pub gateway_hostname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SasToken {
    pub resource_uri: String,
    pub signature: String,
    pub expiry: String,
    pub policy_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEnvironment {
    pub module_id: String,
    pub device_id: String,
    pub hostname: String,
    pub gateway_hostname: String,
    pub api_version: String,
    pub module_generation_id: String,
    pub workload_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    pub data: Vec<u8>,
    pub message_id: Option<String>,
    pub output_name: Option<String>,
    pub input_name: Option<String>,
}

impl Message {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}

// 非 Message 的資料會被包成 Message
impl From<&str> for Message {
    fn from(data: &str) -> Self {
        Message::new(data)
    }
}

impl From<String> for Message {
    fn from(data: String) -> Self {
        Message::new(data)
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Message::new(data)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRequest {
    pub request_id: String,
    pub name: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResponse {
    pub request_id: String,
    pub status: i32,
    pub payload: Option<serde_json::Value>,
}

impl MethodResponse {
    pub fn create_from_method_request(
        request: &MethodRequest,
        status: i32,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            request_id: request.request_id.clone(),
            status,
            payload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "c2d")]
    C2dMessages,
    #[serde(rename = "input")]
    InputMessages,
    #[serde(rename = "methods")]
    Methods,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::C2dMessages => "c2d",
            Feature::InputMessages => "input",
            Feature::Methods => "methods",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 假 pipeline 記錄的一次呼叫
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOp {
    Connect,
    Disconnect,
    EnableFeature(Feature),
    DisableFeature(Feature),
    SendEvent(Message),
    SendOutputEvent(Message),
    SendMethodResponse(MethodResponse),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineOpKind {
    Connect,
    Disconnect,
    EnableFeature,
    DisableFeature,
    SendEvent,
    SendOutputEvent,
    SendMethodResponse,
}

impl PipelineOp {
    pub fn kind(&self) -> PipelineOpKind {
        match self {
            PipelineOp::Connect => PipelineOpKind::Connect,
            PipelineOp::Disconnect => PipelineOpKind::Disconnect,
            PipelineOp::EnableFeature(_) => PipelineOpKind::EnableFeature,
            PipelineOp::DisableFeature(_) => PipelineOpKind::DisableFeature,
            PipelineOp::SendEvent(_) => PipelineOpKind::SendEvent,
            PipelineOp::SendOutputEvent(_) => PipelineOpKind::SendOutputEvent,
            PipelineOp::SendMethodResponse(_) => PipelineOpKind::SendMethodResponse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}
