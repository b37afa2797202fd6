//! Fixture-backed source with scripted responses

use crate::{error::FetchError, source::MarketDataSource, types::Coin};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type Scripted = (Duration, Result<Vec<Coin>, FetchError>);

/// Deterministic source for tests and offline demos
///
/// Scripted responses are served first, in push order; once the script is
/// exhausted every call returns the fallback response.
pub struct FixtureSource {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Result<Vec<Coin>, FetchError>>,
    call_count: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FixtureSource {
    /// Creates a source that always returns `coins`
    pub fn new(coins: Vec<Coin>) -> Self {
        Self::with_fallback(Ok(coins))
    }

    /// Creates a source that always fails with `error`
    pub fn failing(error: FetchError) -> Self {
        Self::with_fallback(Err(error))
    }

    fn with_fallback(fallback: Result<Vec<Coin>, FetchError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Replaces the fallback with a successful response
    pub fn set_coins(&self, coins: Vec<Coin>) {
        *lock(&self.fallback) = Ok(coins);
    }

    /// Replaces the fallback with a failure
    pub fn set_error(&self, error: FetchError) {
        *lock(&self.fallback) = Err(error);
    }

    /// Queues a one-shot response served after `delay`
    pub fn push_delayed(&self, delay: Duration, response: Result<Vec<Coin>, FetchError>) {
        lock(&self.script).push_back((delay, response));
    }

    /// Queues a one-shot response served immediately
    pub fn push(&self, response: Result<Vec<Coin>, FetchError>) {
        self.push_delayed(Duration::ZERO, response);
    }

    fn next_response(&self) -> Scripted {
        let scripted = lock(&self.script).pop_front();
        scripted.unwrap_or_else(|| (Duration::ZERO, lock(&self.fallback).clone()))
    }

    /// Number of fetches served so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for FixtureSource {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl MarketDataSource for FixtureSource {
    async fn fetch_coins(&self) -> Result<Vec<Coin>, FetchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let (delay, response) = self.next_response();

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        response
    }

    fn source_name(&self) -> &'static str {
        "fixture"
    }
}
