//! Scripted avatar source for tests

use crate::error::{Result, SyncError};
use crate::source::AvatarSource;
use async_trait::async_trait;
use avatar_protocol::AvatarResponse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
pub(crate) struct FakeSource {
    responses: Mutex<HashMap<String, AvatarResponse>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    gate: Option<Arc<Notify>>,
    delay: Option<Duration>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Hold every fetch until the returned gate is notified
    pub(crate) fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let source = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (source, gate)
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn respond(&self, avatar_id: &str, response: AvatarResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(avatar_id.to_string(), response);
    }

    pub(crate) fn calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub(crate) fn calls_for(&self, avatar_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(avatar_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl AvatarSource for FakeSource {
    async fn fetch_avatar(&self, avatar_id: &str) -> Result<AvatarResponse> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .unwrap()
            .entry(avatar_id.to_string())
            .or_default() += 1;

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.lock().unwrap().get(avatar_id).cloned();
        response.ok_or_else(|| SyncError::Source(format!("no route to {}", avatar_id)))
    }
}
