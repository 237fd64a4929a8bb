//! Error type shared by every facility component.

use std::time::Duration;
use thiserror::Error;

use crate::specialty::Specialty;

/// Everything that can go wrong while configuring or running the facility.
#[derive(Error, Debug)]
pub enum FacilityError {
    /// The OS refused to start a role thread.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        role: String,
        #[source]
        source: std::io::Error,
    },

    /// A role thread was still running after its grace period and has been detached.
    #[error("{role} did not stop within {grace:?}")]
    JoinTimeout { role: String, grace: Duration },

    /// A role thread ended without handing back its result.
    #[error("{role} panicked before reporting")]
    RolePanicked { role: String },

    /// A consultant was handed a patient of another specialty.
    #[error(
        "routing invariant violated: {consultant} ({expected}) received patient #{patient_id} ({actual})"
    )]
    Misrouted {
        consultant: String,
        expected: Specialty,
        actual: Specialty,
        patient_id: u64,
    },

    /// The queue can no longer accept patients.
    #[error("{specialty} queue is closed")]
    QueueClosed { specialty: Specialty },

    /// Configuration values that parse but cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The TOML configuration could not be parsed.
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Reading the configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// [`crate::Facility::start`] was called twice.
    #[error("arrivals already started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, FacilityError>;
