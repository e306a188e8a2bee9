use crate::domain::model::{
    ConnectionState, Feature, Message, MethodRequest, MethodResponse, PipelineOp, PipelineOpKind,
};
use crate::domain::ports::{Callback, PipelineAdapter, PipelineHandlers};
use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// How the fake completes the operations it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionStrategy {
    /// Invoke the callback synchronously, before the operation returns.
    #[default]
    AutoInvoke,
    /// Park the callback until the test calls `complete_next`/`complete_all`.
    Manual,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<PipelineOp>,
    pending: VecDeque<(PipelineOpKind, Callback)>,
    feature_enabled: HashMap<Feature, bool>,
    handlers: PipelineHandlers,
}

/// In-memory `PipelineAdapter` that records every call and never fails.
pub struct FakePipelineAdapter {
    strategy: CompletionStrategy,
    state: Mutex<FakeState>,
    pending_changed: Condvar,
}

impl FakePipelineAdapter {
    pub fn new(strategy: CompletionStrategy) -> Self {
        Self {
            strategy,
            state: Mutex::new(FakeState::default()),
            pending_changed: Condvar::new(),
        }
    }

    pub fn auto() -> Self {
        Self::new(CompletionStrategy::AutoInvoke)
    }

    pub fn manual() -> Self {
        Self::new(CompletionStrategy::Manual)
    }

    pub fn strategy(&self) -> CompletionStrategy {
        self.strategy
    }

    // 測試中的 panic 不應連帶讓其他斷言失敗
    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, op: PipelineOp, callback: Option<Callback>) {
        let kind = op.kind();
        tracing::debug!("Fake pipeline received {:?}", kind);

        let callback = {
            let mut state = self.lock();
            match &op {
                PipelineOp::EnableFeature(feature) => {
                    state.feature_enabled.insert(*feature, true);
                }
                PipelineOp::DisableFeature(feature) => {
                    state.feature_enabled.insert(*feature, false);
                }
                _ => {}
            }
            state.calls.push(op);

            match (self.strategy, callback) {
                (CompletionStrategy::Manual, Some(callback)) => {
                    state.pending.push_back((kind, callback));
                    self.pending_changed.notify_all();
                    None
                }
                (_, callback) => callback,
            }
        };

        // callback 在鎖外執行
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn calls(&self) -> Vec<PipelineOp> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, kind: PipelineOpKind) -> usize {
        self.lock().calls.iter().filter(|op| op.kind() == kind).count()
    }

    pub fn last_call(&self, kind: PipelineOpKind) -> Option<PipelineOp> {
        self.lock()
            .calls
            .iter()
            .rev()
            .find(|op| op.kind() == kind)
            .cloned()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn pending_ops(&self) -> Vec<PipelineOpKind> {
        self.lock().pending.iter().map(|(kind, _)| *kind).collect()
    }

    /// Block until at least `count` callbacks are parked or `timeout` elapses.
    pub fn wait_for_pending(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        while state.pending.len() < count {
            state = match deadline {
                None => self
                    .pending_changed
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    match self.pending_changed.wait_timeout(state, deadline - now) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
            };
        }
        true
    }

    /// Invoke the oldest parked callback. Returns the op it completed.
    pub fn complete_next(&self) -> Option<PipelineOpKind> {
        let (kind, callback) = self.lock().pending.pop_front()?;
        tracing::debug!("Fake pipeline completing {:?}", kind);
        callback();
        Some(kind)
    }

    pub fn complete_all(&self) -> usize {
        let mut completed = 0;
        while self.complete_next().is_some() {
            completed += 1;
        }
        completed
    }

    pub fn fire_connected(&self) {
        let handler = self.lock().handlers.on_connected.clone();
        if let Some(handler) = handler {
            handler(ConnectionState::Connected);
        }
    }

    pub fn fire_disconnected(&self) {
        let handler = self.lock().handlers.on_disconnected.clone();
        if let Some(handler) = handler {
            handler(ConnectionState::Disconnected);
        }
    }

    pub fn deliver_c2d_message(&self, message: Message) -> bool {
        let handler = self.lock().handlers.on_c2d_message_received.clone();
        handler.map(|handler| handler(message)).is_some()
    }

    pub fn deliver_input_message(&self, input_name: &str, message: Message) -> bool {
        let handler = self.lock().handlers.on_input_message_received.clone();
        handler
            .map(|handler| handler(input_name.to_string(), message))
            .is_some()
    }

    pub fn deliver_method_request(&self, request: MethodRequest) -> bool {
        let handler = self.lock().handlers.on_method_request_received.clone();
        handler.map(|handler| handler(request)).is_some()
    }

    pub fn has_handlers(&self) -> bool {
        let state = self.lock();
        state.handlers.on_connected.is_some() && state.handlers.on_method_request_received.is_some()
    }
}

impl Default for FakePipelineAdapter {
    fn default() -> Self {
        Self::auto()
    }
}

impl PipelineAdapter for FakePipelineAdapter {
    fn connect(&self, callback: Option<Callback>) {
        self.record(PipelineOp::Connect, callback);
    }

    fn disconnect(&self, callback: Option<Callback>) {
        self.record(PipelineOp::Disconnect, callback);
    }

    fn enable_feature(&self, feature: Feature, callback: Option<Callback>) {
        self.record(PipelineOp::EnableFeature(feature), callback);
    }

    fn disable_feature(&self, feature: Feature, callback: Option<Callback>) {
        self.record(PipelineOp::DisableFeature(feature), callback);
    }

    fn send_event(&self, event: Message, callback: Option<Callback>) {
        self.record(PipelineOp::SendEvent(event), callback);
    }

    fn send_output_event(&self, event: Message, callback: Option<Callback>) {
        self.record(PipelineOp::SendOutputEvent(event), callback);
    }

    fn send_method_response(&self, response: MethodResponse, callback: Option<Callback>) {
        self.record(PipelineOp::SendMethodResponse(response), callback);
    }

    fn is_feature_enabled(&self, feature: Feature) -> bool {
        self.lock()
            .feature_enabled
            .get(&feature)
            .copied()
            .unwrap_or(false)
    }

    fn set_handlers(&self, handlers: PipelineHandlers) {
        self.lock().handlers = handlers;
    }
}
