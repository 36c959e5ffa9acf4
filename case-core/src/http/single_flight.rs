//! Single-flight execution: one caller starts an operation, every caller that
//! arrives while it is running waits for and shares its result.
//!
//! Lifecycle is `Idle -> InFlight -> Idle`. The operation runs on its own
//! task, so cancelling any caller (the one that started it included) never
//! cancels the shared work. Callers are queued in arrival order and woken in
//! that order once the operation settles.

use crate::error::Abandoned;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    Idle,
    /// `waiters` counts the callers queued behind the one that started the run.
    InFlight { waiters: usize },
}

type Waiter<T, E> = oneshot::Sender<Result<T, E>>;

enum State<T, E> {
    Idle,
    InFlight(Vec<Waiter<T, E>>),
}

type Shared<T, E> = Arc<Mutex<State<T, E>>>;

pub struct SingleFlight<T, E> {
    state: Shared<T, E>,
}

impl<T, E> Default for SingleFlight<T, E> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Idle)),
        }
    }
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + From<Abandoned> + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FlightPhase {
        match &*lock(&self.state) {
            State::Idle => FlightPhase::Idle,
            State::InFlight(waiters) => FlightPhase::InFlight {
                waiters: waiters.len().saturating_sub(1),
            },
        }
    }

    /// Start `operation` unless a run is already in flight, then wait for
    /// the run's result. `operation` is not called when joining a run.
    pub async fn run<F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let starts_run = {
            let mut state = lock(&self.state);
            match &mut *state {
                State::InFlight(waiters) => {
                    waiters.push(tx);
                    false
                }
                State::Idle => {
                    *state = State::InFlight(vec![tx]);
                    true
                }
            }
        };

        if starts_run {
            let work = operation();
            let settle = Settle {
                state: self.state.clone(),
                settled: false,
            };
            tokio::spawn(async move {
                let result = work.await;
                settle.finish(result);
            });
        }

        // The sender is dropped unanswered only when the run itself died.
        rx.await.unwrap_or_else(|_| Err(E::from(Abandoned)))
    }
}

fn lock<T, E>(state: &Shared<T, E>) -> MutexGuard<'_, State<T, E>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn take_waiters<T, E>(state: &Shared<T, E>) -> Vec<Waiter<T, E>> {
    match std::mem::replace(&mut *lock(state), State::Idle) {
        State::InFlight(waiters) => waiters,
        State::Idle => Vec::new(),
    }
}

/// Hands the result to every waiter. If the run panics, dropping this
/// returns the flight to idle and waiters observe [`Abandoned`].
struct Settle<T, E> {
    state: Shared<T, E>,
    settled: bool,
}

impl<T: Clone, E: Clone> Settle<T, E> {
    fn finish(mut self, result: Result<T, E>) {
        self.settled = true;
        let waiters = take_waiters(&self.state);
        tracing::debug!(waiters = waiters.len(), "Single flight settled");
        for waiter in waiters {
            // A cancelled caller has dropped its receiver; nothing to do.
            let _ = waiter.send(result.clone());
        }
    }
}

impl<T, E> Drop for Settle<T, E> {
    fn drop(&mut self) {
        if !self.settled {
            let abandoned = take_waiters(&self.state);
            tracing::warn!(waiters = abandoned.len(), "Single flight run died before settling");
        }
    }
}
