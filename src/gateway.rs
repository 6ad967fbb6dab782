//! Single-flight request gateway with bounded retry.
//!
//! All traffic to the game service funnels through one gateway task. The
//! task drains a FIFO queue one call at a time, so callers never observe
//! interleaved or out-of-order responses, and retries transport failures
//! with a fixed delay before giving up.
//!
//! Completion is a single-shot contract: every call yields a [`CallTicket`]
//! that resolves at most once, to the success payload, to an application
//! error, or to nothing at all when the call was abandoned.

use crate::protocol::{Action, ApiError, Envelope, Params, ResponseStatus};
use crate::render::Notice;
use crate::transport::Transport;
use derive_more::{Display, Error, From};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, sleep};
use tracing::{debug, error, info, instrument, warn};

/// Total attempts per call, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Fixed delay between attempts.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Where the gateway is in its dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No call in flight.
    Idle,
    /// Executing the numbered attempt for the call at the head of the
    /// queue. Resets to [`Phase::Idle`] when the call completes, so the
    /// attempt count never leaks into the next call.
    InFlight {
        attempt: u32,
    },
}

/// Terminal outcome delivered through a [`CallTicket`].
#[derive(Debug)]
enum Reply {
    Success(Value),
    Error(ApiError),
}

/// How a call ultimately failed, from the caller's point of view.
#[derive(Debug, Display, Error, From)]
pub enum CallError {
    /// The service reported an application error for this call.
    Api(ApiError),
    /// The call completed without reaching this caller: the transport gave
    /// up, the status was unrecognized, or the error completion was shed
    /// while the call sat in the queue.
    #[display("call dropped before completion")]
    Dropped,
    /// The success payload did not decode into the expected type.
    Decode(serde_json::Error),
}

/// Single-shot completion for one gateway call.
#[derive(Debug)]
pub struct CallTicket {
    rx: oneshot::Receiver<Reply>,
}

impl CallTicket {
    /// Waits for the call to complete and returns its payload.
    pub async fn outcome(self) -> Result<Value, CallError> {
        match self.rx.await {
            Ok(Reply::Success(value)) => Ok(value),
            Ok(Reply::Error(err)) => Err(CallError::Api(err)),
            Err(_) => Err(CallError::Dropped),
        }
    }
}

struct PendingCall {
    action: Action,
    params: Params,
    reply: oneshot::Sender<Reply>,
    /// False when the call was queued behind another: only the success path
    /// survives queuing, so an application error is shed to a notice instead
    /// of this caller.
    error_preserved: bool,
}

/// Handle used to issue calls against a running gateway task.
///
/// Cheap to clone; all clones feed the same queue.
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    queue: mpsc::UnboundedSender<PendingCall>,
    outstanding: Arc<AtomicUsize>,
}

impl GatewayHandle {
    /// Issues a call. Returns immediately with the completion ticket.
    ///
    /// If another call is outstanding the new call is queued FIFO, and —
    /// matching the documented service contract — its error completion is
    /// dropped: an application error for a queued call surfaces as a
    /// [`Notice`], not through the ticket.
    #[instrument(skip(self, params), fields(action = %action))]
    pub fn call(&self, action: Action, params: Params) -> CallTicket {
        let (tx, rx) = oneshot::channel();
        let busy = self.outstanding.fetch_add(1, Ordering::SeqCst) > 0;
        if busy {
            debug!("Gateway busy; queueing call without its error completion");
        }
        let call = PendingCall {
            action,
            params,
            reply: tx,
            error_preserved: !busy,
        };
        if self.queue.send(call).is_err() {
            // Gateway task is gone; the ticket resolves to Dropped.
            warn!("Gateway task has shut down; call dropped");
        }
        CallTicket { rx }
    }
}

/// The gateway task: owns the transport and drains the call queue.
pub struct RequestGateway {
    transport: Arc<dyn Transport>,
    queue: mpsc::UnboundedReceiver<PendingCall>,
    outstanding: Arc<AtomicUsize>,
    notices: mpsc::UnboundedSender<Notice>,
    phase: Phase,
}

impl RequestGateway {
    /// Spawns the gateway task and returns a handle for issuing calls.
    ///
    /// User-visible alerts (fatal transport failures, unhandled application
    /// errors, protocol violations) are pushed to `notices`.
    pub fn spawn(
        transport: Arc<dyn Transport>,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> GatewayHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let outstanding = Arc::new(AtomicUsize::new(0));
        let gateway = Self {
            transport,
            queue: rx,
            outstanding: Arc::clone(&outstanding),
            notices,
            phase: Phase::Idle,
        };
        tokio::spawn(gateway.run());
        GatewayHandle {
            queue: tx,
            outstanding,
        }
    }

    #[instrument(skip(self))]
    async fn run(mut self) {
        info!("Gateway task started");
        while let Some(call) = self.queue.recv().await {
            self.dispatch(call).await;
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
        }
        info!("Gateway task finished; all handles dropped");
    }

    /// Executes one call to completion: up to [`MAX_ATTEMPTS`] transport
    /// attempts, then response dispatch or a fatal notice.
    #[instrument(skip(self, call), fields(action = %call.action))]
    async fn dispatch(&mut self, call: PendingCall) {
        let envelope = loop {
            let attempt = match self.phase {
                Phase::Idle => 1,
                Phase::InFlight { attempt } => attempt + 1,
            };
            self.phase = Phase::InFlight { attempt };
            debug!(attempt, "Sending attempt");
            match self.transport.send(call.action, &call.params).await {
                Ok(envelope) => break Some(envelope),
                Err(e) => {
                    warn!(attempt, error = %e, "Transport attempt failed");
                    if attempt >= MAX_ATTEMPTS {
                        break None;
                    }
                    sleep(RETRY_DELAY).await;
                }
            }
        };
        self.phase = Phase::Idle;

        match envelope {
            Some(envelope) => self.deliver(call, envelope),
            None => {
                // Fatal: neither completion fires; dropping the sender
                // resolves the ticket to Dropped.
                error!(
                    action = %call.action,
                    attempts = MAX_ATTEMPTS,
                    "Giving up after repeated transport failures"
                );
                let _ = self.notices.send(Notice::TransportFailure {
                    action: call.action,
                    attempts: MAX_ATTEMPTS,
                });
            }
        }
    }

    /// Routes a received envelope to the caller or to a notice.
    fn deliver(&self, call: PendingCall, envelope: Envelope) {
        match envelope.status {
            ResponseStatus::Success => {
                let _ = call.reply.send(Reply::Success(envelope.response));
            }
            ResponseStatus::Error => {
                let err = ApiError::from_payload(envelope.response);
                if call.error_preserved {
                    let _ = call.reply.send(Reply::Error(err));
                } else {
                    warn!(action = %call.action, error = %err, "Error for a queued call; raising notice");
                    let _ = self.notices.send(Notice::ApplicationError {
                        action: call.action,
                        error: err,
                    });
                }
            }
            other => {
                warn!(action = %call.action, status = %other, "Unrecognized response status");
                let _ = self.notices.send(Notice::UnknownStatus {
                    action: call.action,
                    status: other.to_string(),
                });
            }
        }
    }
}
