//! Shared helpers for dispatch queue integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use shopdesk_notifier::{
    Classification, DispatchConfig, ProviderFailure, RateLimit, RetryPolicy, Transport,
};

#[derive(Default)]
struct Inner {
    /// Outcomes per payload, consumed front to back; an empty script succeeds.
    scripts: Mutex<HashMap<u32, VecDeque<Classification>>>,
    /// Payload and start time of every call, in start order.
    calls: Mutex<Vec<(u32, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Mutex<Duration>,
}

/// Transport replaying scripted outcomes and recording every call.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps `latency` before answering.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.inner.latency.lock().unwrap() = latency;
        self
    }

    pub fn script(&self, payload: u32, outcomes: Vec<Classification>) {
        self.inner
            .scripts
            .lock()
            .unwrap()
            .insert(payload, outcomes.into());
    }

    /// Make `payload` fail with `status` on every call.
    pub fn always(&self, payload: u32, status: u16, calls: usize) {
        let outcomes = (0..calls)
            .map(|_| Classification::from_status(status, "scripted"))
            .collect();
        self.script(payload, outcomes);
    }

    pub fn calls(&self) -> Vec<(u32, Instant)> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn call_order(&self) -> Vec<u32> {
        self.calls().into_iter().map(|(p, _)| p).collect()
    }

    pub fn call_count(&self, payload: u32) -> usize {
        self.calls().iter().filter(|(p, _)| *p == payload).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    type Payload = u32;

    async fn dispatch(&self, payload: &u32) -> Classification {
        let now = Instant::now();
        self.inner.calls.lock().unwrap().push((*payload, now));

        let current = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let outcome = self
            .inner
            .scripts
            .lock()
            .unwrap()
            .get_mut(payload)
            .and_then(|script| script.pop_front())
            .unwrap_or(Classification::Success);

        let latency = *self.inner.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Config with fast pacing and deterministic (jitter-free) backoff.
pub fn config(max_requests: u32, concurrent_limit: usize, max_retries: u32) -> DispatchConfig {
    DispatchConfig::new(
        RateLimit {
            max_requests,
            interval_duration: Duration::from_secs(1),
            concurrent_limit,
        },
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
            jitter_factor: 0.0,
        },
    )
}

pub fn transient(status: u16) -> Classification {
    Classification::RetryableFailure(ProviderFailure::http(status, "scripted"))
}

pub fn terminal(status: u16) -> Classification {
    Classification::TerminalFailure(ProviderFailure::http(status, "scripted"))
}
