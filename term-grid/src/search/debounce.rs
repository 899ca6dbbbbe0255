//! Coalescing of rapidly repeated search requests.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// What to do with a request after debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceDecision {
    /// Run the request now
    Proceed,
    /// A later request replaced this one; drop it
    Superseded,
}

#[derive(Debug, Default)]
struct DebounceState {
    generation: u64,
    last_term: Option<String>,
}

/// Latest-wins debouncer keyed on the previous term.
///
/// A request repeating the previous term waits `delay` and then runs only if
/// no other request arrived meanwhile. A request with a new term runs at once,
/// becomes the baseline and supersedes anything still waiting.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    state: Mutex<DebounceState>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Mutex::new(DebounceState::default()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Registers a request for `term` and resolves once it may run or has
    /// been superseded.
    pub async fn admit(&self, term: &str) -> DebounceDecision {
        let (generation, repeated) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.generation += 1;
            let repeated = state.last_term.as_deref() == Some(term);
            if !repeated {
                state.last_term = Some(term.to_string());
            }
            (state.generation, repeated)
        };

        if !repeated {
            return DebounceDecision::Proceed;
        }

        tokio::time::sleep(self.delay).await;
        let current = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation;
        if current == generation {
            DebounceDecision::Proceed
        } else {
            debug!(search.generation = generation, "Search request superseded");
            DebounceDecision::Superseded
        }
    }

    /// Forgets the baseline and supersedes every waiting request.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        state.last_term = None;
    }
}
