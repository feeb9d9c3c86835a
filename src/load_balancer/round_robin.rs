//! Round-robin load balancing strategy.

use std::sync::{Mutex, PoisonError};

use crate::load_balancer::{backend::BackendConnection, Balancer, BalancerError};

/// Round-robin selector over a fixed set of backends.
///
/// The cursor is guarded by a mutex held only for the read-and-advance step,
/// never across a backend round trip.
#[derive(Debug)]
pub struct RoundRobinBalancer<T = BackendConnection> {
    backends: Vec<T>,
    cursor: Mutex<usize>,
}

impl<T: Clone> RoundRobinBalancer<T> {
    /// Build a balancer. Fails when `backends` is empty.
    pub fn new(backends: Vec<T>) -> Result<Self, BalancerError> {
        if backends.is_empty() {
            return Err(BalancerError::NoBackends);
        }
        Ok(Self {
            backends,
            cursor: Mutex::new(0),
        })
    }

    /// Return the backend under the cursor and advance it.
    pub fn next(&self) -> T {
        // The cursor is always a valid index, so a poisoned lock is still usable.
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let backend = self.backends[*cursor].clone();
        *cursor = (*cursor + 1) % self.backends.len();
        backend
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl RoundRobinBalancer<BackendConnection> {
    /// Dial every address in order. Any failure aborts; there is no
    /// partial start with a reduced backend set.
    pub async fn connect<S: AsRef<str>>(targets: &[S]) -> Result<Self, BalancerError> {
        let mut backends = Vec::with_capacity(targets.len());
        for target in targets {
            backends.push(BackendConnection::connect(target.as_ref()).await?);
        }
        Self::new(backends)
    }
}

impl Balancer for RoundRobinBalancer<BackendConnection> {
    fn select(&self) -> BackendConnection {
        self.next()
    }
}
