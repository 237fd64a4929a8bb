//! Per-specialty patient queue.
//!
//! Each queue wraps an unbounded crossbeam channel and keeps both ends alive for the whole run, so
//! it never disconnects and survives every shift boundary. Removal only happens through
//! [`PatientQueue::dequeue_blocking`], which hands a patient out atomically or not at all.

use crate::error::{FacilityError, Result};
use crate::patient::Patient;
use crate::shutdown::ShutdownSignal;
use crate::specialty::Specialty;
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use std::time::Instant;

/// Result of a blocking dequeue.
#[derive(Debug)]
pub enum Dequeued {
    /// The head of the queue, already removed.
    Patient(Patient),
    /// The shutdown signal fired while waiting.
    Cancelled,
    /// The optional deadline passed with the queue still empty.
    TimedOut,
}

/// Unbounded FIFO of patients waiting for one specialty.
///
/// Shared through an `Arc` by the arrival generator and whichever consultant is on duty.
pub struct PatientQueue {
    specialty: Specialty,
    sender: Sender<Patient>,
    receiver: Receiver<Patient>,
}

impl PatientQueue {
    /// Create an empty queue for `specialty`.
    pub fn new(specialty: Specialty) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            specialty,
            sender,
            receiver,
        }
    }

    pub fn specialty(&self) -> Specialty {
        self.specialty
    }

    /// Append a patient at the tail. Never blocks.
    ///
    /// The queue does not check the patient's specialty: routing is the caller's job and a
    /// mismatch is caught by the consuming consultant.
    pub fn enqueue(&self, patient: Patient) -> Result<()> {
        self.sender
            .send(patient)
            .map_err(|_| FacilityError::QueueClosed {
                specialty: self.specialty,
            })
    }

    /// Remove the head, parking the caller while the queue is empty.
    ///
    /// The wait ends when a patient becomes available, when `shutdown` fires, or when `deadline`
    /// (if any) passes. If a patient and the signal are ready together either may win, but a
    /// returned patient has always been fully removed from the queue.
    pub fn dequeue_blocking(
        &self,
        shutdown: &ShutdownSignal,
        deadline: Option<Instant>,
    ) -> Dequeued {
        match deadline {
            None => select! {
                recv(self.receiver) -> msg => match msg {
                    Ok(patient) => Dequeued::Patient(patient),
                    Err(_) => Dequeued::Cancelled,
                },
                recv(shutdown.receiver()) -> _ => Dequeued::Cancelled,
            },
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                select! {
                    recv(self.receiver) -> msg => match msg {
                        Ok(patient) => Dequeued::Patient(patient),
                        Err(_) => Dequeued::Cancelled,
                    },
                    recv(shutdown.receiver()) -> _ => Dequeued::Cancelled,
                    default(timeout) => Dequeued::TimedOut,
                }
            }
        }
    }

    /// Approximate number of waiting patients; exact once producers and consumers are idle.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
