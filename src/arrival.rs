//! Patient arrival generator.
//!
//! The generator runs on its own thread for the whole run, independent of shifts. Each iteration
//! draws a specialty, builds the next patient, routes it to that specialty's queue and then
//! sleeps a random interval. The sleep waits on the same [`ShutdownSignal`] used to stop the
//! generator, so a stop request cuts the pause short instead of waiting it out.

use crate::config::ArrivalConfig;
use crate::error::Result;
use crate::patient::Patient;
use crate::queue::PatientQueue;
use crate::shutdown::ShutdownSignal;
use crate::specialty::{Specialty, SpecialtyTable};
use crate::stats::StatsAggregator;
use crate::threading::{spawn_role, RoleHandle};
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of the generator thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ArrivalState {
    Running = 0,
    Stopping = 1,
    Stopped = 2,
}

impl ArrivalState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ArrivalState::Running,
            1 => ArrivalState::Stopping,
            _ => ArrivalState::Stopped,
        }
    }
}

/// What the generator produced before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArrivalReport {
    pub generated: u64,
    /// Id of the last patient enqueued, `None` if nothing arrived.
    pub last_id: Option<u64>,
}

pub struct ArrivalGenerator {
    queues: SpecialtyTable<Arc<PatientQueue>>,
    stats: Arc<StatsAggregator>,
    config: ArrivalConfig,
    rng: StdRng,
    next_id: u64,
}

impl ArrivalGenerator {
    pub fn new(
        queues: SpecialtyTable<Arc<PatientQueue>>,
        stats: Arc<StatsAggregator>,
        config: ArrivalConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            queues,
            stats,
            config,
            rng,
            next_id: 1,
        }
    }

    /// Create, route and record one patient.
    fn admit_next(&mut self) -> Result<Patient> {
        let specialty = Specialty::random(&mut self.rng);
        let patient = Patient::new(self.next_id, specialty);
        self.next_id += 1;

        let queue = &self.queues[specialty];
        queue.enqueue(patient.clone())?;
        self.stats.record_arrival();
        debug!("new arrival: {} | {} queue size {}", patient, specialty, queue.len());
        Ok(patient)
    }

    /// Run until `shutdown` fires, publishing lifecycle transitions into `state`.
    fn run(mut self, shutdown: ShutdownSignal, state: Arc<AtomicU8>) -> ArrivalReport {
        info!("patient arrivals started");
        let mut report = ArrivalReport {
            generated: 0,
            last_id: None,
        };

        while !shutdown.is_triggered() {
            match self.admit_next() {
                Ok(patient) => {
                    report.generated += 1;
                    report.last_id = Some(patient.id);
                }
                Err(err) => {
                    error!("arrival generator stopping: {err}");
                    break;
                }
            }

            let pause = self.config.next_interval(&mut self.rng);
            if !shutdown.sleep(pause) {
                break;
            }
        }

        state.store(ArrivalState::Stopping as u8, Ordering::Release);
        info!("patient arrivals stopped after {} patients", report.generated);
        state.store(ArrivalState::Stopped as u8, Ordering::Release);
        report
    }

    /// Start the generator on its own thread.
    pub fn spawn(self) -> Result<ArrivalHandle> {
        let shutdown = ShutdownSignal::new();
        let state = Arc::new(AtomicU8::new(ArrivalState::Running as u8));

        let thread_shutdown = shutdown.clone();
        let thread_state = state.clone();
        let role = spawn_role("patient-arrivals", move || {
            self.run(thread_shutdown, thread_state)
        })?;

        Ok(ArrivalHandle {
            shutdown,
            state,
            role,
        })
    }
}

/// Controller-side handle on a running generator.
pub struct ArrivalHandle {
    shutdown: ShutdownSignal,
    state: Arc<AtomicU8>,
    role: RoleHandle<ArrivalReport>,
}

impl ArrivalHandle {
    pub fn state(&self) -> ArrivalState {
        ArrivalState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Signal the generator and wait up to `grace` for its thread to end.
    pub fn stop(self, grace: Duration) -> Result<ArrivalReport> {
        if self.state() == ArrivalState::Running {
            self.state
                .store(ArrivalState::Stopping as u8, Ordering::Release);
        }
        self.shutdown.trigger();
        self.role.join_timeout(grace)
    }
}
