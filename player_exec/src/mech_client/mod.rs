//! # Mechanisms Client
//!
//! Bounded hand-off queue between the gait thread, which produces one joint demand frame per
//! control tick, and the actuator dispatcher which consumes them at the motor period.
//!
//! The producer blocks while the queue is full, which paces the gait thread to the actuators
//! without it having to keep its own clock. Closing the queue releases every blocked producer
//! and consumer so that shutdown can never deadlock.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::mech::MechDems;
use log::{debug, info};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Bounded, closable queue of demand frames.
pub struct DemsQueue {
    inner: Mutex<QueueInner>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

struct QueueInner {
    frames: VecDeque<MechDems>,
    closed: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MechClientError {
    #[error("The demands queue has been closed")]
    Closed,

    #[error("The demands queue lock was poisoned")]
    LockPoisoned,

    #[error("Could not spawn the actuator drain thread: {0}")]
    SpawnError(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DemsQueue {
    /// Create a queue holding at most `capacity` frames (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                frames: VecDeque::with_capacity(capacity.max(1)),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Push a frame, blocking while the queue is full.
    pub fn push(&self, dems: MechDems) -> Result<(), MechClientError> {
        let mut inner = self.lock()?;

        while !inner.closed && inner.frames.len() >= self.capacity {
            inner = self
                .not_full
                .wait(inner)
                .map_err(|_| MechClientError::LockPoisoned)?;
        }

        if inner.closed {
            return Err(MechClientError::Closed);
        }

        inner.frames.push_back(dems);
        self.not_empty.notify_one();

        Ok(())
    }

    /// Pop the oldest frame, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `Ok(None)` on timeout. Frames still queued when the queue is closed are drained
    /// before `MechClientError::Closed` is returned.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<Option<MechDems>, MechClientError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock()?;

        loop {
            if let Some(dems) = inner.frames.pop_front() {
                self.not_full.notify_one();
                return Ok(Some(dems));
            }

            if inner.closed {
                return Err(MechClientError::Closed);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            inner = self
                .not_empty
                .wait_timeout(inner, deadline - now)
                .map_err(|_| MechClientError::LockPoisoned)?
                .0;
        }
    }

    /// Close the queue, waking all waiters.
    pub fn close(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.closed = true;
        }
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().map(|i| i.closed).unwrap_or(true)
    }

    /// Number of frames waiting.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|i| i.frames.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueInner>, MechClientError> {
        self.inner.lock().map_err(|_| MechClientError::LockPoisoned)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Spawn the actuator side consumer.
///
/// Frames are handed to `sink` no faster than one per `period`. The thread exits once the queue
/// is closed and empty, returning the number of frames consumed.
pub fn spawn_drain<F>(
    queue: Arc<DemsQueue>,
    period: Duration,
    mut sink: F,
) -> Result<JoinHandle<u64>, MechClientError>
where
    F: FnMut(MechDems) + Send + 'static,
{
    thread::Builder::new()
        .name("mech_drain".into())
        .spawn(move || {
            let mut num_frames = 0u64;

            loop {
                let tick_start = Instant::now();

                match queue.pop_timeout(period) {
                    Ok(Some(dems)) => {
                        sink(dems);
                        num_frames += 1;
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        debug!("Drain stopping: {}", e);
                        break;
                    }
                }

                if let Some(d) = period.checked_sub(tick_start.elapsed()) {
                    thread::sleep(d);
                }
            }

            info!("Actuator drain consumed {} frames", num_frames);
            num_frames
        })
        .map_err(|e| MechClientError::SpawnError(e.to_string()))
}
