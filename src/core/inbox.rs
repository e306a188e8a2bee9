use crate::domain::model::{Message, MethodRequest};
use crate::utils::error::{FixtureError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Thread-safe FIFO that a client reads with blocking or non-blocking gets.
pub struct SyncInbox<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> SyncInbox<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn put(&self, item: T) {
        self.lock().push_back(item);
        self.available.notify_one();
    }

    /// 取出一筆資料
    ///
    /// `block = false` returns `InboxEmpty` right away when nothing is queued.
    /// With `block = true` it waits, up to `timeout` when one is given.
    pub fn get(&self, block: bool, timeout: Option<Duration>) -> Result<T> {
        let mut items = self.lock();
        if !block {
            return items.pop_front().ok_or(FixtureError::InboxEmpty);
        }

        if let Some(item) = items.pop_front() {
            return Ok(item);
        }

        // 超出 Instant 範圍的 timeout 視為無期限
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        loop {
            if let Some(item) = items.pop_front() {
                return Ok(item);
            }
            items = match deadline {
                None => self
                    .available
                    .wait(items)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(FixtureError::InboxEmpty);
                    }
                    match self.available.wait_timeout(items, deadline - now) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
            };
        }
    }

    pub fn empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl<T> Default for SyncInbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes incoming messages and method requests to per-kind inboxes.
#[derive(Default)]
pub struct InboxManager {
    c2d_message_inbox: Arc<SyncInbox<Message>>,
    input_message_inboxes: Mutex<HashMap<String, Arc<SyncInbox<Message>>>>,
    // None 為通用 method inbox
    method_request_inboxes: Mutex<HashMap<Option<String>, Arc<SyncInbox<MethodRequest>>>>,
}

impl InboxManager {
    pub fn new() -> Self {
        let manager = Self::default();
        manager
            .method_request_inboxes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(None, Arc::new(SyncInbox::new()));
        manager
    }

    pub fn get_c2d_message_inbox(&self) -> Arc<SyncInbox<Message>> {
        Arc::clone(&self.c2d_message_inbox)
    }

    /// Returns the inbox for `input_name`, creating it on first use.
    pub fn get_input_message_inbox(&self, input_name: &str) -> Arc<SyncInbox<Message>> {
        let mut inboxes = self
            .input_message_inboxes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            inboxes
                .entry(input_name.to_string())
                .or_insert_with(|| Arc::new(SyncInbox::new())),
        )
    }

    /// Returns the inbox for `method_name` (generic inbox for `None`),
    /// creating a named inbox on first use.
    pub fn get_method_request_inbox(&self, method_name: Option<&str>) -> Arc<SyncInbox<MethodRequest>> {
        let mut inboxes = self
            .method_request_inboxes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            inboxes
                .entry(method_name.map(str::to_string))
                .or_insert_with(|| Arc::new(SyncInbox::new())),
        )
    }

    pub fn route_c2d_message(&self, message: Message) {
        self.c2d_message_inbox.put(message);
    }

    pub fn route_input_message(&self, input_name: String, mut message: Message) {
        tracing::debug!("Routing input message to inbox '{}'", input_name);
        let inbox = self.get_input_message_inbox(&input_name);
        message.input_name = Some(input_name);
        inbox.put(message);
    }

    /// Named inbox if one has been requested, otherwise the generic inbox.
    pub fn route_method_request(&self, request: MethodRequest) {
        let inbox = {
            let inboxes = self
                .method_request_inboxes
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            inboxes
                .get(&Some(request.name.clone()))
                .or_else(|| inboxes.get(&None))
                .cloned()
        };

        match inbox {
            Some(inbox) => {
                tracing::debug!("Routing method request '{}'", request.name);
                inbox.put(request);
            }
            None => tracing::warn!("No inbox for method request '{}'", request.name),
        }
    }

    pub fn clear_all_method_requests(&self) {
        let inboxes = self
            .method_request_inboxes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for inbox in inboxes.values() {
            inbox.clear();
        }
    }
}
