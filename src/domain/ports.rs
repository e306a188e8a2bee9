use crate::domain::model::{ConnectionState, Feature, Message, MethodRequest, MethodResponse};
use std::collections::HashMap;
use std::sync::Arc;

/// 操作完成時呼叫的 callback
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

pub type StateChangeHandler = Arc<dyn Fn(ConnectionState) + Send + Sync>;
pub type MessageHandler = Arc<dyn Fn(Message) + Send + Sync>;
pub type InputMessageHandler = Arc<dyn Fn(String, Message) + Send + Sync>;
pub type MethodRequestHandler = Arc<dyn Fn(MethodRequest) + Send + Sync>;

/// Handlers a client installs on its pipeline.
#[derive(Clone, Default)]
pub struct PipelineHandlers {
    pub on_connected: Option<StateChangeHandler>,
    pub on_disconnected: Option<StateChangeHandler>,
    pub on_c2d_message_received: Option<MessageHandler>,
    pub on_input_message_received: Option<InputMessageHandler>,
    pub on_method_request_received: Option<MethodRequestHandler>,
}

/// Callback-driven pipeline operations.
///
/// Every operation starts work and reports completion by invoking `callback`
/// at most once. Implementations use interior mutability so a client and a
/// test can share one instance behind an `Arc`.
pub trait PipelineAdapter: Send + Sync {
    fn connect(&self, callback: Option<Callback>);
    fn disconnect(&self, callback: Option<Callback>);
    fn enable_feature(&self, feature: Feature, callback: Option<Callback>);
    fn disable_feature(&self, feature: Feature, callback: Option<Callback>);
    fn send_event(&self, event: Message, callback: Option<Callback>);
    fn send_output_event(&self, event: Message, callback: Option<Callback>);
    fn send_method_response(&self, response: MethodResponse, callback: Option<Callback>);

    fn is_feature_enabled(&self, feature: Feature) -> bool;
    fn set_handlers(&self, handlers: PipelineHandlers);
}

pub trait EnvironmentSource {
    fn var(&self, name: &str) -> Option<String>;
}

impl EnvironmentSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// 讀取目前行程的環境變數
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentSource for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}
