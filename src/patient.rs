//! Patient representation shared by the arrival generator, queues and consultants.

use crate::specialty::Specialty;
use std::fmt;
use std::time::{Duration, Instant, SystemTime};

/// Immutable work unit travelling from the arrival generator to exactly one consultant.
///
/// The id is assigned by the generator and is unique within a run. Both timestamps are captured
/// at construction: `arrived_at` drives wait-time measurements, `arrived_wall` is only for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: u64,
    pub specialty: Specialty,
    pub arrived_at: Instant,
    pub arrived_wall: SystemTime,
}

impl Patient {
    pub fn new(id: u64, specialty: Specialty) -> Patient {
        Patient {
            id,
            specialty,
            arrived_at: Instant::now(),
            arrived_wall: SystemTime::now(),
        }
    }

    /// Time spent since arrival.
    pub fn waited(&self) -> Duration {
        self.arrived_at.elapsed()
    }
}

impl fmt::Display for Patient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Patient #{} ({})",
            self.id,
            self.specialty.display_name()
        )
    }
}
