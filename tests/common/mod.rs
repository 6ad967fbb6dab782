//! Scripted transport shared by the integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use mnk_client::{Action, Envelope, Params, Transport, TransportError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{Duration, sleep};

/// Initializes test logging once; respects `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// One scripted transport outcome, consumed per call in FIFO order.
pub enum Script {
    /// Deliver this envelope.
    Reply(Envelope),
    /// Simulate a transport-level failure (no response).
    Fail,
}

/// In-memory transport that replays a script and records every call.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Script>>,
    log: Mutex<Vec<(Action, Params)>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            replies: Mutex::new(scripts.into()),
            log: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Like [`ScriptedTransport::new`], but every call takes `latency` to
    /// complete. Useful for overlap detection under a paused clock.
    pub fn with_latency(scripts: Vec<Script>, latency: Duration) -> Self {
        Self {
            latency,
            ..Self::new(scripts)
        }
    }

    /// Appends another scripted outcome.
    pub fn push(&self, script: Script) {
        self.replies.lock().unwrap().push_back(script);
    }

    /// Actions sent so far, in order.
    pub fn actions(&self) -> Vec<Action> {
        self.log.lock().unwrap().iter().map(|(a, _)| *a).collect()
    }

    /// Full call log, in order.
    pub fn calls(&self) -> Vec<(Action, Params)> {
        self.log.lock().unwrap().clone()
    }

    /// Highest number of concurrently executing calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// A transport error constructed without a network stack.
fn connection_lost() -> TransportError {
    serde_json::from_str::<Value>("").unwrap_err().into()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, action: Action, params: &Params) -> Result<Envelope, TransportError> {
        self.log.lock().unwrap().push((action, params.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.replies.lock().unwrap().pop_front() {
            Some(Script::Reply(envelope)) => Ok(envelope),
            Some(Script::Fail) => Err(connection_lost()),
            None => Ok(Envelope::success(Value::Null)),
        }
    }
}
