//! Thread helpers shared by the arrival generator and the consultants.
//!
//! `std::thread::JoinHandle` cannot be joined with a timeout, so every role thread reports its
//! result through a one-slot channel. Waiting on that channel gives the bounded join, and a
//! successful receive is the happens-before edge that makes the role's private counters safe to
//! read.

use crate::error::{FacilityError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::warn;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle on a running role thread producing a `T` when it exits.
pub struct RoleHandle<T> {
    role: String,
    done: Receiver<T>,
    thread: Option<JoinHandle<()>>,
}

/// Spawn `body` on a thread named `role`.
pub fn spawn_role<T, F>(role: impl Into<String>, body: F) -> Result<RoleHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let role = role.into();
    let (done_tx, done_rx) = bounded(1);
    let thread = thread::Builder::new()
        .name(role.clone())
        .spawn(move || {
            let output = body();
            // The receiver is gone only if the handle was dropped; nothing left to report to.
            let _ = done_tx.send(output);
        })
        .map_err(|source| FacilityError::Spawn {
            role: role.clone(),
            source,
        })?;

    Ok(RoleHandle {
        role,
        done: done_rx,
        thread: Some(thread),
    })
}

impl<T> RoleHandle<T> {
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Wait up to `grace` for the thread to finish and return what it produced.
    ///
    /// On timeout the thread is detached and left to finish on its own.
    pub fn join_timeout(mut self, grace: Duration) -> Result<T> {
        match self.done.recv_timeout(grace) {
            Ok(output) => {
                if let Some(thread) = self.thread.take() {
                    let _ = thread.join();
                }
                Ok(output)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("{} still running after {:?}, detaching", self.role, grace);
                Err(FacilityError::JoinTimeout {
                    role: self.role,
                    grace,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                if let Some(thread) = self.thread.take() {
                    let _ = thread.join();
                }
                Err(FacilityError::RolePanicked { role: self.role })
            }
        }
    }
}
