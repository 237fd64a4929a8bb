//! Consultants: the per-specialty consumers.
//!
//! A consultant is bound to exactly one [`PatientQueue`] for the length of one shift. It blocks on
//! that queue, treats whatever it receives, and keeps a private tally that nothing else writes.
//! The tally travels back to the shift manager inside [`ConsultantReport`] when the thread ends,
//! which is the only point at which it is read.
//!
//! A patient of the wrong specialty is never treated and never dropped silently: the consultant
//! logs it at `error`, keeps it in [`ConsultantReport::misrouted`] and carries on.

use crate::config::ServiceConfig;
use crate::error::{FacilityError, Result};
use crate::patient::Patient;
use crate::queue::{Dequeued, PatientQueue};
use crate::shutdown::ShutdownSignal;
use crate::specialty::Specialty;
use crate::stats::StatsAggregator;
use crate::threading::{spawn_role, RoleHandle};
use log::{debug, error, info};
use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Result of treating one patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// The service step a consultant performs on each patient.
///
/// Implementations must not hand the patient back: once `treat` is called the patient counts as
/// seen, whatever the outcome.
pub trait Treatment: Send + Sync {
    fn treat(&self, consultant: &str, patient: &Patient) -> Outcome;
}

/// Sleeps for the configured treatment time and fails with the configured probability.
#[derive(Debug, Clone)]
pub struct SimulatedTreatment {
    duration: Duration,
    failure_rate: f64,
}

impl SimulatedTreatment {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            duration: config.treatment_time(),
            failure_rate: config.failure_rate,
        }
    }
}

impl Treatment for SimulatedTreatment {
    fn treat(&self, _consultant: &str, _patient: &Patient) -> Outcome {
        thread::sleep(self.duration);
        if self.failure_rate > 0.0 && rand::thread_rng().gen_bool(self.failure_rate) {
            Outcome::Failure
        } else {
            Outcome::Success
        }
    }
}

/// A patient that reached a consultant of another specialty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Misroute {
    pub patient_id: u64,
    /// The patient's own specialty.
    pub specialty: Specialty,
}

/// Private tally returned when a consultant's thread ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsultantReport {
    pub name: String,
    pub specialty: Specialty,
    /// Patients taken off the queue and treated, whatever the outcome.
    pub seen: u64,
    /// Subset of `seen` whose treatment failed.
    pub failed: u64,
    /// Patients taken off the queue but refused because their specialty did not match.
    pub misrouted: Vec<Misroute>,
}

impl ConsultantReport {
    /// The routing error for every refused patient.
    pub fn misroute_errors(&self) -> impl Iterator<Item = FacilityError> + '_ {
        self.misrouted.iter().map(|misroute| FacilityError::Misrouted {
            consultant: self.name.clone(),
            expected: self.specialty,
            actual: misroute.specialty,
            patient_id: misroute.patient_id,
        })
    }
}

/// Consumer bound to one specialty queue for a single shift.
///
/// Built by the shift manager and moved onto its own thread by [`Consultant::start`].
pub struct Consultant {
    name: String,
    specialty: Specialty,
    queue: Arc<PatientQueue>,
    treatment: Arc<dyn Treatment>,
    stats: Arc<StatsAggregator>,
    working: Arc<AtomicBool>,
    seen: u64,
    failed: u64,
    misrouted: Vec<Misroute>,
}

impl Consultant {
    pub fn new(
        name: impl Into<String>,
        specialty: Specialty,
        queue: Arc<PatientQueue>,
        treatment: Arc<dyn Treatment>,
        stats: Arc<StatsAggregator>,
    ) -> Self {
        Self {
            name: name.into(),
            specialty,
            queue,
            treatment,
            stats,
            working: Arc::new(AtomicBool::new(true)),
            seen: 0,
            failed: 0,
            misrouted: Vec::new(),
        }
    }

    fn treat(&mut self, patient: Patient) {
        if patient.specialty != self.specialty {
            error!(
                "{} ({}) refused {} from the {} queue",
                self.name,
                self.specialty,
                patient,
                self.queue.specialty()
            );
            self.misrouted.push(Misroute {
                patient_id: patient.id,
                specialty: patient.specialty,
            });
            return;
        }

        debug!(
            "[{}] treating {} (waited {:?})",
            self.name,
            patient,
            patient.waited()
        );
        match self.treatment.treat(&self.name, &patient) {
            Outcome::Success => self.stats.record_success(),
            Outcome::Failure => {
                self.failed += 1;
                self.stats.record_failure();
            }
        }
        self.seen += 1;
        debug!("[{}] finished patient #{}", self.name, patient.id);
    }

    /// Consume patients until stopped.
    ///
    /// A patient that has left the queue is always treated before the loop re-checks the working
    /// flag, so stopping never drops a dequeued patient.
    fn run(mut self, shutdown: ShutdownSignal) -> ConsultantReport {
        info!("{} ({}) started shift", self.name, self.specialty.display_name());

        while self.working.load(Ordering::Acquire) {
            match self.queue.dequeue_blocking(&shutdown, None) {
                Dequeued::Patient(patient) => self.treat(patient),
                Dequeued::Cancelled => break,
                Dequeued::TimedOut => continue,
            }
        }

        info!("{} ended shift, patients seen: {}", self.name, self.seen);
        ConsultantReport {
            name: self.name,
            specialty: self.specialty,
            seen: self.seen,
            failed: self.failed,
            misrouted: self.misrouted,
        }
    }

    /// Start the consultant on its own thread, parked on its queue until `shutdown` fires.
    pub fn start(self, shutdown: ShutdownSignal) -> Result<ConsultantHandle> {
        let name = self.name.clone();
        let specialty = self.specialty;
        let working = self.working.clone();
        let role = spawn_role(format!("consultant-{specialty}"), move || self.run(shutdown))?;
        Ok(ConsultantHandle {
            name,
            specialty,
            working,
            role,
        })
    }
}

/// Shift-manager side of a running consultant.
pub struct ConsultantHandle {
    name: String,
    specialty: Specialty,
    working: Arc<AtomicBool>,
    role: RoleHandle<ConsultantReport>,
}

impl ConsultantHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn specialty(&self) -> Specialty {
        self.specialty
    }

    /// Ask the consultant to finish after the current patient.
    ///
    /// This only clears the working flag. A consultant parked on an empty queue also needs the
    /// shift's shutdown signal to fire before it notices.
    pub fn stop_working(&self) {
        self.working.store(false, Ordering::Release);
    }

    /// Wait up to `grace` for the consultant's thread and collect its tally.
    pub fn join(self, grace: Duration) -> Result<ConsultantReport> {
        self.role.join_timeout(grace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct Immediate;

    impl Treatment for Immediate {
        fn treat(&self, _consultant: &str, _patient: &Patient) -> Outcome {
            Outcome::Success
        }
    }

    struct AlwaysFails;

    impl Treatment for AlwaysFails {
        fn treat(&self, _consultant: &str, _patient: &Patient) -> Outcome {
            Outcome::Failure
        }
    }

    fn consultant(
        specialty: Specialty,
        queue: Arc<PatientQueue>,
        treatment: Arc<dyn Treatment>,
        stats: Arc<StatsAggregator>,
    ) -> Consultant {
        Consultant::new("Dr. Test", specialty, queue, treatment, stats)
    }

    #[test]
    fn idle_consultant_stops_promptly() {
        let queue = Arc::new(PatientQueue::new(Specialty::Surgery));
        let stats = Arc::new(StatsAggregator::new());
        let shutdown = ShutdownSignal::new();
        let handle = consultant(Specialty::Surgery, queue, Arc::new(Immediate), stats)
            .start(shutdown.clone())
            .unwrap();
        assert_eq!(handle.name(), "Dr. Test");
        assert_eq!(handle.specialty(), Specialty::Surgery);

        std::thread::sleep(Duration::from_millis(50));
        let start = Instant::now();
        handle.stop_working();
        shutdown.trigger();
        let report = handle.join(Duration::from_secs(2)).unwrap();
        assert!(start.elapsed() < Duration::from_millis(2_500));
        assert_eq!(report.seen, 0);
    }

    #[test]
    fn consultant_drains_its_queue_and_counts() {
        let queue = Arc::new(PatientQueue::new(Specialty::Cardiology));
        for id in 1..=5 {
            queue.enqueue(Patient::new(id, Specialty::Cardiology)).unwrap();
        }
        let stats = Arc::new(StatsAggregator::new());
        let shutdown = ShutdownSignal::new();
        let handle = consultant(
            Specialty::Cardiology,
            queue.clone(),
            Arc::new(Immediate),
            stats.clone(),
        )
        .start(shutdown.clone())
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !queue.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        handle.stop_working();
        shutdown.trigger();
        let report = handle.join(Duration::from_secs(2)).unwrap();
        assert_eq!(report.seen, 5);
        assert_eq!(report.failed, 0);
        assert_eq!(stats.successful(), 5);
    }

    #[test]
    fn failed_treatments_are_counted_not_retried() {
        let queue = Arc::new(PatientQueue::new(Specialty::Paediatrics));
        for id in 1..=3 {
            queue.enqueue(Patient::new(id, Specialty::Paediatrics)).unwrap();
        }
        let stats = Arc::new(StatsAggregator::new());
        let shutdown = ShutdownSignal::new();
        let handle = consultant(
            Specialty::Paediatrics,
            queue.clone(),
            Arc::new(AlwaysFails),
            stats.clone(),
        )
        .start(shutdown.clone())
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !queue.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        handle.stop_working();
        shutdown.trigger();
        let report = handle.join(Duration::from_secs(2)).unwrap();
        assert_eq!(report.seen, 3);
        assert_eq!(report.failed, 3);
        assert_eq!(stats.failed(), 3);
        assert_eq!(stats.success_rate(), 0.0);
        assert!(queue.is_empty());
    }

    #[test]
    fn misrouted_patient_is_refused_and_kept_in_the_report() {
        let queue = Arc::new(PatientQueue::new(Specialty::Surgery));
        queue.enqueue(Patient::new(1, Specialty::Surgery)).unwrap();
        queue.enqueue(Patient::new(7, Specialty::Cardiology)).unwrap();
        queue.enqueue(Patient::new(8, Specialty::Surgery)).unwrap();
        let stats = Arc::new(StatsAggregator::new());
        let shutdown = ShutdownSignal::new();
        let handle = consultant(
            Specialty::Surgery,
            queue.clone(),
            Arc::new(Immediate),
            stats.clone(),
        )
        .start(shutdown.clone())
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !queue.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        handle.stop_working();
        shutdown.trigger();
        let report = handle.join(Duration::from_secs(2)).unwrap();

        assert_eq!(report.seen, 2);
        assert_eq!(stats.total_processed(), 2);
        assert_eq!(
            report.misrouted,
            vec![Misroute {
                patient_id: 7,
                specialty: Specialty::Cardiology,
            }]
        );
        let errors: Vec<FacilityError> = report.misroute_errors().collect();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            FacilityError::Misrouted {
                consultant,
                expected,
                actual,
                patient_id,
            } => {
                assert_eq!(consultant, "Dr. Test");
                assert_eq!(*expected, Specialty::Surgery);
                assert_eq!(*actual, Specialty::Cardiology);
                assert_eq!(*patient_id, 7);
            }
            other => panic!("expected misroute, got {other}"),
        }
    }

    #[test]
    fn simulated_treatment_takes_configured_time() {
        let treatment = SimulatedTreatment::new(&ServiceConfig {
            treatment_ms: 20,
            failure_rate: 0.0,
        });
        let start = Instant::now();
        let outcome = treatment.treat("Dr. Test", &Patient::new(1, Specialty::Surgery));
        assert_eq!(outcome, Outcome::Success);
        assert!(start.elapsed() >= Duration::from_millis(20));

        let always = SimulatedTreatment::new(&ServiceConfig {
            treatment_ms: 0,
            failure_rate: 1.0,
        });
        assert_eq!(
            always.treat("Dr. Test", &Patient::new(2, Specialty::Surgery)),
            Outcome::Failure
        );
    }
}
