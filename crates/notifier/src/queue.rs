//! Dispatch queue with pacing, a concurrency cap and retries.
//!
//! Every `submit` enqueues a [`SendRequest`] and wakes the pump. The pump is a
//! single task that admits waiting requests while `active_count` is below the
//! concurrency limit, sleeping between starts as the pacing policy demands.
//! Each admitted request runs on its own task; its outcome either settles the
//! caller or, for a retryable failure, goes straight back into the waiting
//! list ahead of all fresh work, stamped with the instant its backoff ends.
//! The pump holds the head of the list until that instant.
//!
//! State lives behind one `std::sync::Mutex` that is never held across an
//! `.await`: pacing sleeps, backoff sleeps and transport I/O all happen with
//! the lock released.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::error::{ConfigError, DispatchError, ProviderFailure};
use crate::pacing::PacingPolicy;
use crate::transport::{Classification, Transport};

type Responder = oneshot::Sender<Result<Delivery, DispatchError>>;

/// Successful delivery receipt handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub request_id: Uuid,
    /// Transport invocations made, including the successful one.
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    pub delivered_at: DateTime<Utc>,
}

/// Point-in-time view of the queue, read under its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// Requests waiting for a dispatch slot, retries included.
    pub waiting: usize,
    /// Retries either waiting at the head or still sleeping out their backoff.
    pub retrying: usize,
    /// Dispatches currently in flight.
    pub active: usize,
    pub concurrent_limit: usize,
}

/// One unit of work, owned by the queue from submission until it settles.
struct SendRequest<P> {
    id: Uuid,
    /// Shared with the task running the transport call.
    payload: Arc<P>,
    responder: Responder,
    /// Failed attempts so far.
    attempt: u32,
    enqueued_at: DateTime<Utc>,
    /// End of the current backoff; `None` for fresh work.
    ready_at: Option<Instant>,
}

impl<P> SendRequest<P> {
    fn settle(self, result: Result<Delivery, DispatchError>) {
        // A dropped receiver only means the caller stopped listening.
        let _ = self.responder.send(result);
    }
}

/// Waiting requests: retries at the head in FIFO order, fresh work behind them.
struct WaitingList<P> {
    items: VecDeque<SendRequest<P>>,
    /// Number of retries at the front of `items`.
    retries: usize,
}

impl<P> WaitingList<P> {
    fn new() -> Self {
        Self {
            items: VecDeque::new(),
            retries: 0,
        }
    }

    fn push_fresh(&mut self, request: SendRequest<P>) {
        self.items.push_back(request);
    }

    /// Insert behind earlier retries but ahead of every fresh request.
    fn push_retry(&mut self, request: SendRequest<P>) {
        if self.retries == 0 {
            self.items.push_front(request);
        } else {
            self.items.insert(self.retries, request);
        }
        self.retries += 1;
    }

    /// How long the head request must still sleep out its backoff.
    fn head_backoff(&self, now: Instant) -> Duration {
        self.items
            .front()
            .and_then(|request| request.ready_at)
            .map_or(Duration::ZERO, |at| at.saturating_duration_since(now))
    }

    fn pop_front(&mut self) -> Option<SendRequest<P>> {
        let request = self.items.pop_front()?;
        self.retries = self.retries.saturating_sub(1);
        Some(request)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

struct QueueState<P> {
    waiting: WaitingList<P>,
    active_count: usize,
    last_dispatch: Option<Instant>,
    /// Whether a pump task is currently running.
    pumping: bool,
}

impl<P> QueueState<P> {
    fn new() -> Self {
        Self {
            waiting: WaitingList::new(),
            active_count: 0,
            last_dispatch: None,
            pumping: false,
        }
    }

    fn can_dispatch(&self, concurrent_limit: usize) -> bool {
        !self.waiting.is_empty() && self.active_count < concurrent_limit
    }
}

struct Shared<T: Transport> {
    transport: T,
    config: DispatchConfig,
    pacing: PacingPolicy,
    state: Mutex<QueueState<T::Payload>>,
}

impl<T: Transport> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, QueueState<T::Payload>> {
        // Critical sections never panic midway, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn concurrent_limit(&self) -> usize {
        self.config.rate_limit.concurrent_limit
    }
}

enum Step<P> {
    Dispatch(SendRequest<P>),
    Wait(Duration),
    Idle,
}

/// Rate-limited, retrying dispatch queue over a [`Transport`].
///
/// Cloning is cheap and every clone feeds the same queue, sharing one pacing
/// and concurrency budget.
pub struct DispatchQueue<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for DispatchQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> DispatchQueue<T> {
    pub fn new(transport: T, config: DispatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let pacing = PacingPolicy::new(&config.rate_limit);
        Ok(Self {
            shared: Arc::new(Shared {
                transport,
                config,
                pacing,
                state: Mutex::new(QueueState::new()),
            }),
        })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.shared.config
    }

    /// Enqueue `payload` and return a handle that settles exactly once.
    ///
    /// Never waits on the provider. Must be called from within a Tokio runtime.
    pub fn submit(&self, payload: T::Payload) -> Submission {
        let (responder, receiver) = oneshot::channel();
        let request = SendRequest {
            id: Uuid::new_v4(),
            payload: Arc::new(payload),
            responder,
            attempt: 0,
            enqueued_at: Utc::now(),
            ready_at: None,
        };
        let request_id = request.id;

        let waiting = {
            let mut state = self.shared.lock();
            state.waiting.push_fresh(request);
            state.waiting.len()
        };
        debug!(request_id = %request_id, waiting, "Notification enqueued");

        wake(&self.shared);

        Submission {
            request_id,
            receiver,
        }
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.shared.lock();
        QueueStats {
            waiting: state.waiting.len(),
            retrying: state.waiting.retries,
            active: state.active_count,
            concurrent_limit: self.shared.concurrent_limit(),
        }
    }
}

/// Start a pump task unless one is already running or there is nothing to admit.
fn wake<T: Transport>(shared: &Arc<Shared<T>>) {
    {
        let mut state = shared.lock();
        if state.pumping || !state.can_dispatch(shared.concurrent_limit()) {
            return;
        }
        state.pumping = true;
    }
    tokio::spawn(pump(Arc::clone(shared)));
}

/// Admit waiting requests until the list is empty or every slot is taken.
async fn pump<T: Transport>(shared: Arc<Shared<T>>) {
    loop {
        let step = {
            let mut state = shared.lock();
            if !state.can_dispatch(shared.concurrent_limit()) {
                state.pumping = false;
                Step::Idle
            } else {
                let now = Instant::now();
                let wait = shared
                    .pacing
                    .wait_before(state.last_dispatch, now)
                    .max(state.waiting.head_backoff(now));
                if !wait.is_zero() {
                    Step::Wait(wait)
                } else {
                    match state.waiting.pop_front() {
                        Some(request) => {
                            state.active_count += 1;
                            state.last_dispatch = Some(now);
                            Step::Dispatch(request)
                        }
                        None => {
                            state.pumping = false;
                            Step::Idle
                        }
                    }
                }
            }
        };

        match step {
            Step::Dispatch(request) => {
                tokio::spawn(dispatch(Arc::clone(&shared), request));
            }
            Step::Wait(wait) => tokio::time::sleep(wait).await,
            Step::Idle => return,
        }
    }
}

/// Run one transport call and route its outcome.
async fn dispatch<T: Transport>(shared: Arc<Shared<T>>, mut request: SendRequest<T::Payload>) {
    debug!(request_id = %request.id, attempt = request.attempt, "Dispatching notification");

    // The call runs on its own task so a panicking transport still frees its slot.
    let call = {
        let shared = Arc::clone(&shared);
        let payload = Arc::clone(&request.payload);
        tokio::spawn(async move { shared.transport.dispatch(&payload).await })
    };
    let outcome = match call.await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(request_id = %request.id, error = %e, "Transport call aborted");
            Classification::TerminalFailure(ProviderFailure::new(
                None,
                format!("Transport call aborted: {}", e),
            ))
        }
    };
    let attempts = request.attempt + 1;

    match outcome {
        Classification::Success => {
            release(&shared);
            info!(request_id = %request.id, attempts, "Notification delivered");
            let delivery = Delivery {
                request_id: request.id,
                attempts,
                enqueued_at: request.enqueued_at,
                delivered_at: Utc::now(),
            };
            request.settle(Ok(delivery));
        }
        Classification::RetryableFailure(failure)
            if shared.config.retry.should_retry(request.attempt) =>
        {
            let delay = shared.config.retry.delay(request.attempt);
            request.attempt += 1;
            request.ready_at = Some(Instant::now() + delay);
            warn!(
                request_id = %request.id,
                attempt = request.attempt,
                delay = ?delay,
                error = %failure,
                "Transient provider error, retry scheduled"
            );

            // Reserve the head position now so later fresh work cannot overtake it.
            {
                let mut state = shared.lock();
                state.active_count -= 1;
                state.waiting.push_retry(request);
            }
            wake(&shared);
        }
        Classification::RetryableFailure(last) => {
            release(&shared);
            reject(request, DispatchError::RetriesExhausted { last, attempts });
        }
        Classification::TerminalFailure(failure) => {
            release(&shared);
            reject(request, DispatchError::Permanent { failure, attempts });
        }
    }
}

/// Free the caller's concurrency slot and let the pump admit the next request.
fn release<T: Transport>(shared: &Arc<Shared<T>>) {
    shared.lock().active_count -= 1;
    wake(shared);
}

fn reject<P>(request: SendRequest<P>, err: DispatchError) {
    let status = err.provider_failure().and_then(|f: &ProviderFailure| f.status);
    error!(
        request_id = %request.id,
        attempts = err.attempts(),
        status,
        error = %err,
        "Notification rejected"
    );
    request.settle(Err(err));
}

/// Handle for one submitted payload; resolves when the request settles.
#[derive(Debug)]
pub struct Submission {
    request_id: Uuid,
    receiver: oneshot::Receiver<Result<Delivery, DispatchError>>,
}

impl Submission {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }
}

impl Future for Submission {
    type Output = Result<Delivery, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(DispatchError::QueueClosed)))
    }
}
