use crate::core::auth::AuthenticationProvider;
use crate::core::inbox::InboxManager;
use crate::domain::model::{ConnectionState, Feature, Message, MethodRequest, MethodResponse};
use crate::domain::ports::{
    Callback, EnvironmentSource, PipelineAdapter, PipelineHandlers, StateChangeHandler,
};
use crate::utils::error::{FixtureError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

/// How a `receive_*` call waits on its inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveMode {
    pub block: bool,
    pub timeout: Option<Duration>,
}

impl ReceiveMode {
    pub fn non_blocking() -> Self {
        Self {
            block: false,
            timeout: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            block: true,
            timeout: Some(timeout),
        }
    }
}

impl Default for ReceiveMode {
    fn default() -> Self {
        Self {
            block: true,
            timeout: None,
        }
    }
}

/// 同步 client 的共用部分
struct ClientCore<P: PipelineAdapter> {
    pipeline: Arc<P>,
    inbox_manager: Arc<InboxManager>,
    connected: Arc<AtomicBool>,
}

impl<P: PipelineAdapter> ClientCore<P> {
    fn new(pipeline: Arc<P>, inbox_manager: Arc<InboxManager>, mut handlers: PipelineHandlers) -> Self {
        let connected = Arc::new(AtomicBool::new(false));

        let on_state_change: StateChangeHandler = {
            let inbox_manager = Arc::clone(&inbox_manager);
            let connected = Arc::clone(&connected);
            Arc::new(move |state: ConnectionState| {
                tracing::info!("Connection state changed: {:?}", state);
                connected.store(state == ConnectionState::Connected, Ordering::SeqCst);
                if state == ConnectionState::Disconnected {
                    inbox_manager.clear_all_method_requests();
                }
            })
        };
        handlers.on_connected = Some(on_state_change.clone());
        handlers.on_disconnected = Some(on_state_change);

        let router = Arc::clone(&inbox_manager);
        handlers.on_method_request_received = Some(Arc::new(move |request: MethodRequest| {
            router.route_method_request(request)
        }));

        pipeline.set_handlers(handlers);

        Self {
            pipeline,
            inbox_manager,
            connected,
        }
    }

    /// Start an operation and block until the pipeline invokes its callback.
    fn run_op<F>(&self, operation: &str, start: F) -> Result<()>
    where
        F: FnOnce(Callback),
    {
        let (done_tx, done_rx) = mpsc::channel();
        start(Box::new(move || {
            let _ = done_tx.send(());
        }));

        tracing::debug!("Waiting for '{}' to complete", operation);
        done_rx.recv().map_err(|_| FixtureError::PipelineError {
            operation: operation.to_string(),
        })?;
        tracing::debug!("'{}' complete", operation);
        Ok(())
    }

    fn ensure_feature(&self, feature: Feature) -> Result<()> {
        if self.pipeline.is_feature_enabled(feature) {
            return Ok(());
        }
        tracing::debug!("Enabling feature '{}'", feature);
        self.run_op("enable_feature", |callback| {
            self.pipeline.enable_feature(feature, Some(callback))
        })
    }

    fn connect(&self) -> Result<()> {
        self.run_op("connect", |callback| self.pipeline.connect(Some(callback)))
    }

    fn disconnect(&self) -> Result<()> {
        self.run_op("disconnect", |callback| self.pipeline.disconnect(Some(callback)))
    }

    fn send_event(&self, message: Message) -> Result<()> {
        self.run_op("send_event", |callback| {
            self.pipeline.send_event(message, Some(callback))
        })
    }

    fn receive_method_request(
        &self,
        method_name: Option<&str>,
        mode: ReceiveMode,
    ) -> Result<MethodRequest> {
        self.ensure_feature(Feature::Methods)?;
        self.inbox_manager
            .get_method_request_inbox(method_name)
            .get(mode.block, mode.timeout)
    }

    fn send_method_response(&self, response: MethodResponse) -> Result<()> {
        self.run_op("send_method_response", |callback| {
            self.pipeline.send_method_response(response, Some(callback))
        })
    }
}

pub struct DeviceClient<P: PipelineAdapter> {
    core: ClientCore<P>,
}

impl<P: PipelineAdapter> DeviceClient<P> {
    pub fn new(pipeline: Arc<P>) -> Self {
        let inbox_manager = Arc::new(InboxManager::new());
        let router = Arc::clone(&inbox_manager);
        let handlers = PipelineHandlers {
            on_c2d_message_received: Some(Arc::new(move |message: Message| {
                router.route_c2d_message(message)
            })),
            ..Default::default()
        };

        Self {
            core: ClientCore::new(pipeline, inbox_manager, handlers),
        }
    }

    pub fn create_from_connection_string<F>(connection_string: &str, pipeline_factory: F) -> Result<Self>
    where
        F: FnOnce(AuthenticationProvider) -> Arc<P>,
    {
        let auth = AuthenticationProvider::from_connection_string(connection_string)?;
        Ok(Self::new(pipeline_factory(auth)))
    }

    pub fn create_from_shared_access_signature<F>(sas_token: &str, pipeline_factory: F) -> Result<Self>
    where
        F: FnOnce(AuthenticationProvider) -> Arc<P>,
    {
        let auth = AuthenticationProvider::from_shared_access_signature(sas_token)?;
        Ok(Self::new(pipeline_factory(auth)))
    }

    pub fn pipeline(&self) -> &Arc<P> {
        &self.core.pipeline
    }

    pub fn inbox_manager(&self) -> &InboxManager {
        &self.core.inbox_manager
    }

    pub fn is_connected(&self) -> bool {
        self.core.connected.load(Ordering::SeqCst)
    }

    pub fn connect(&self) -> Result<()> {
        self.core.connect()
    }

    pub fn disconnect(&self) -> Result<()> {
        self.core.disconnect()
    }

    pub fn send_event(&self, message: impl Into<Message>) -> Result<()> {
        self.core.send_event(message.into())
    }

    pub fn receive_c2d_message(&self, mode: ReceiveMode) -> Result<Message> {
        self.core.ensure_feature(Feature::C2dMessages)?;
        self.core
            .inbox_manager
            .get_c2d_message_inbox()
            .get(mode.block, mode.timeout)
    }

    pub fn receive_method_request(
        &self,
        method_name: Option<&str>,
        mode: ReceiveMode,
    ) -> Result<MethodRequest> {
        self.core.receive_method_request(method_name, mode)
    }

    pub fn send_method_response(&self, response: MethodResponse) -> Result<()> {
        self.core.send_method_response(response)
    }
}

pub struct ModuleClient<P: PipelineAdapter> {
    core: ClientCore<P>,
}

impl<P: PipelineAdapter> ModuleClient<P> {
    pub fn new(pipeline: Arc<P>) -> Self {
        let inbox_manager = Arc::new(InboxManager::new());
        let router = Arc::clone(&inbox_manager);
        let handlers = PipelineHandlers {
            on_input_message_received: Some(Arc::new(move |input_name: String, message: Message| {
                router.route_input_message(input_name, message)
            })),
            ..Default::default()
        };

        Self {
            core: ClientCore::new(pipeline, inbox_manager, handlers),
        }
    }

    pub fn create_from_connection_string<F>(connection_string: &str, pipeline_factory: F) -> Result<Self>
    where
        F: FnOnce(AuthenticationProvider) -> Arc<P>,
    {
        let auth = AuthenticationProvider::from_connection_string(connection_string)?;
        Ok(Self::new(pipeline_factory(auth)))
    }

    pub fn create_from_shared_access_signature<F>(sas_token: &str, pipeline_factory: F) -> Result<Self>
    where
        F: FnOnce(AuthenticationProvider) -> Arc<P>,
    {
        let auth = AuthenticationProvider::from_shared_access_signature(sas_token)?;
        Ok(Self::new(pipeline_factory(auth)))
    }

    pub fn create_from_edge_environment<E, F>(source: &E, pipeline_factory: F) -> Result<Self>
    where
        E: EnvironmentSource,
        F: FnOnce(AuthenticationProvider) -> Arc<P>,
    {
        let auth = AuthenticationProvider::from_edge_environment(source)?;
        Ok(Self::new(pipeline_factory(auth)))
    }

    pub fn pipeline(&self) -> &Arc<P> {
        &self.core.pipeline
    }

    pub fn inbox_manager(&self) -> &InboxManager {
        &self.core.inbox_manager
    }

    pub fn is_connected(&self) -> bool {
        self.core.connected.load(Ordering::SeqCst)
    }

    pub fn connect(&self) -> Result<()> {
        self.core.connect()
    }

    pub fn disconnect(&self) -> Result<()> {
        self.core.disconnect()
    }

    pub fn send_event(&self, message: impl Into<Message>) -> Result<()> {
        self.core.send_event(message.into())
    }

    pub fn send_to_output(&self, message: impl Into<Message>, output_name: &str) -> Result<()> {
        let mut message = message.into();
        message.output_name = Some(output_name.to_string());
        self.core.run_op("send_output_event", |callback| {
            self.core.pipeline.send_output_event(message, Some(callback))
        })
    }

    pub fn receive_input_message(&self, input_name: &str, mode: ReceiveMode) -> Result<Message> {
        self.core.ensure_feature(Feature::InputMessages)?;
        self.core
            .inbox_manager
            .get_input_message_inbox(input_name)
            .get(mode.block, mode.timeout)
    }

    pub fn receive_method_request(
        &self,
        method_name: Option<&str>,
        mode: ReceiveMode,
    ) -> Result<MethodRequest> {
        self.core.receive_method_request(method_name, mode)
    }

    pub fn send_method_response(&self, response: MethodResponse) -> Result<()> {
        self.core.send_method_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fake_pipeline::FakePipelineAdapter;
    use crate::domain::model::{PipelineOp, PipelineOpKind};
    use std::thread;

    #[test]
    fn test_client_installs_handlers() {
        let fake = Arc::new(FakePipelineAdapter::auto());
        let _client = DeviceClient::new(Arc::clone(&fake));
        assert!(fake.has_handlers());
    }

    #[test]
    fn test_connect_begins_pipeline_op() {
        let fake = Arc::new(FakePipelineAdapter::auto());
        let client = DeviceClient::new(Arc::clone(&fake));
        client.connect().unwrap();
        assert_eq!(fake.call_count(PipelineOpKind::Connect), 1);
    }

    #[test]
    fn test_connect_waits_for_manual_completion() {
        let fake = Arc::new(FakePipelineAdapter::manual());
        let client = Arc::new(DeviceClient::new(Arc::clone(&fake)));

        let worker = {
            let client = Arc::clone(&client);
            thread::spawn(move || client.connect())
        };

        assert!(fake.wait_for_pending(1, Duration::from_secs(5)));
        assert!(!worker.is_finished());
        assert_eq!(fake.complete_next(), Some(PipelineOpKind::Connect));
        worker.join().unwrap().unwrap();
    }

    #[test]
    fn test_send_event_wraps_data() {
        let fake = Arc::new(FakePipelineAdapter::auto());
        let client = DeviceClient::new(Arc::clone(&fake));
        client.send_event("some data").unwrap();
        assert_eq!(
            fake.last_call(PipelineOpKind::SendEvent),
            Some(PipelineOp::SendEvent(Message::new("some data")))
        );
    }

    #[test]
    fn test_state_change_tracks_connection() {
        let fake = Arc::new(FakePipelineAdapter::auto());
        let client = ModuleClient::new(Arc::clone(&fake));
        fake.fire_connected();
        assert!(client.is_connected());
        fake.fire_disconnected();
        assert!(!client.is_connected());
    }

    #[test]
    fn test_receive_c2d_message_enables_feature_once() {
        let fake = Arc::new(FakePipelineAdapter::auto());
        let client = DeviceClient::new(Arc::clone(&fake));

        assert!(fake.deliver_c2d_message(Message::new("one")));
        assert!(fake.deliver_c2d_message(Message::new("two")));
        client.receive_c2d_message(ReceiveMode::non_blocking()).unwrap();
        client.receive_c2d_message(ReceiveMode::non_blocking()).unwrap();

        assert_eq!(fake.call_count(PipelineOpKind::EnableFeature), 1);
        assert!(fake.is_feature_enabled(Feature::C2dMessages));
    }
}
