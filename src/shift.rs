//! Shift orchestration.
//!
//! The [`ShiftManager`] owns the consultants of the current shift and nothing else: the queues it
//! hands them are shared with the arrival generator and outlive every shift, so patients left
//! waiting at the end of one shift are the first ones seen in the next.
//!
//! Ending a shift is always the same three steps, in order:
//! 1. clear every consultant's working flag;
//! 2. fire the shift's shutdown signal, which releases consultants parked on empty queues;
//! 3. join each consultant with a grace period, recording stragglers as faults.

use crate::config::ShiftSpec;
use crate::consultant::{Consultant, ConsultantHandle, ConsultantReport, Treatment};
use crate::queue::PatientQueue;
use crate::shutdown::ShutdownSignal;
use crate::specialty::{Specialty, SpecialtyTable};
use crate::stats::StatsAggregator;
use log::{error, info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of one shift.
#[derive(Debug, Clone, Serialize)]
pub struct ShiftSummary {
    pub name: String,
    pub planned_ms: u64,
    pub elapsed_ms: u64,
    /// Consultants that reported back, in specialty order.
    pub consultants: Vec<ConsultantReport>,
    /// Patients seen during this shift.
    pub treated: u64,
    /// Patients seen across every shift run by this manager so far.
    pub cumulative_treated: u64,
    /// Patients refused this shift because they sat in the wrong queue.
    pub misrouted: u64,
    /// Patients still waiting per specialty once every consultant has stopped.
    pub backlog: SpecialtyTable<usize>,
    pub faults: Vec<String>,
}

impl ShiftSummary {
    pub fn total_waiting(&self) -> usize {
        self.backlog.iter().map(|(_, waiting)| *waiting).sum()
    }
}

impl fmt::Display for ShiftSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} summary ({} ms):", self.name, self.elapsed_ms)?;
        for report in &self.consultants {
            writeln!(
                f,
                "  {} ({}): {} patients ({} failed)",
                report.name,
                report.specialty.display_name(),
                report.seen,
                report.failed
            )?;
        }
        writeln!(f, "  Total patients treated: {}", self.treated)?;
        writeln!(f, "  Treated across all shifts: {}", self.cumulative_treated)?;
        if self.misrouted > 0 {
            writeln!(f, "  Misrouted patients: {}", self.misrouted)?;
        }
        writeln!(f, "  Patients still waiting by specialty:")?;
        for (specialty, waiting) in self.backlog.iter() {
            writeln!(f, "    {}: {}", specialty.display_name(), waiting)?;
        }
        for fault in &self.faults {
            writeln!(f, "  FAULT: {fault}")?;
        }
        Ok(())
    }
}

pub struct ShiftManager {
    queues: SpecialtyTable<Arc<PatientQueue>>,
    stats: Arc<StatsAggregator>,
    treatment: Arc<dyn Treatment>,
    join_timeout: Duration,
    cancel: ShutdownSignal,
    cumulative_treated: u64,
    cumulative_misrouted: u64,
}

impl ShiftManager {
    /// Create a manager for the given persistent queues.
    ///
    /// `cancel` is the run-level signal: it can cut the wait of a shift short and stops
    /// [`ShiftManager::run_shifts`] from starting further shifts. Consultants never see it.
    pub fn new(
        queues: SpecialtyTable<Arc<PatientQueue>>,
        stats: Arc<StatsAggregator>,
        treatment: Arc<dyn Treatment>,
        join_timeout: Duration,
        cancel: ShutdownSignal,
    ) -> Self {
        Self {
            queues,
            stats,
            treatment,
            join_timeout,
            cancel,
            cumulative_treated: 0,
            cumulative_misrouted: 0,
        }
    }

    pub fn cumulative_treated(&self) -> u64 {
        self.cumulative_treated
    }

    /// Patients refused for a specialty mismatch across every shift so far.
    pub fn cumulative_misrouted(&self) -> u64 {
        self.cumulative_misrouted
    }

    /// Current waiting count of every queue.
    pub fn backlog(&self) -> SpecialtyTable<usize> {
        self.queues.map(|_, queue| queue.len())
    }

    /// Run one shift to completion and summarize it.
    pub fn run_shift(&mut self, spec: &ShiftSpec) -> ShiftSummary {
        info!(
            "{} starting, runs for {:?}",
            spec.name,
            spec.duration()
        );
        let started = Instant::now();
        let shift_stop = ShutdownSignal::new();
        let mut faults = Vec::new();

        let mut on_duty: Vec<ConsultantHandle> = Vec::with_capacity(Specialty::ALL.len());
        for specialty in Specialty::ALL {
            let consultant = Consultant::new(
                spec.consultants[specialty].clone(),
                specialty,
                self.queues[specialty].clone(),
                self.treatment.clone(),
                self.stats.clone(),
            );
            match consultant.start(shift_stop.clone()) {
                Ok(handle) => on_duty.push(handle),
                Err(err) => {
                    error!("{}: {err}", spec.name);
                    faults.push(err.to_string());
                }
            }
        }

        if !self.cancel.sleep(spec.duration()) {
            warn!("{} cut short by run shutdown", spec.name);
        }

        info!("{} ending", spec.name);
        for handle in &on_duty {
            handle.stop_working();
        }
        shift_stop.trigger();

        let mut consultants = Vec::with_capacity(on_duty.len());
        for handle in on_duty {
            let name = handle.name().to_string();
            match handle.join(self.join_timeout) {
                Ok(report) => consultants.push(report),
                Err(err) => {
                    error!("{}: {name}: {err}", spec.name);
                    faults.push(format!("{name}: {err}"));
                }
            }
        }

        for report in &consultants {
            for err in report.misroute_errors() {
                faults.push(format!("{}: {err}", report.name));
            }
        }
        let treated: u64 = consultants.iter().map(|report| report.seen).sum();
        let misrouted: u64 = consultants
            .iter()
            .map(|report| report.misrouted.len() as u64)
            .sum();
        self.cumulative_treated += treated;
        self.cumulative_misrouted += misrouted;

        let summary = ShiftSummary {
            name: spec.name.clone(),
            planned_ms: spec.duration_ms,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            consultants,
            treated,
            cumulative_treated: self.cumulative_treated,
            misrouted,
            backlog: self.backlog(),
            faults,
        };
        info!("{} ended\n{}", summary.name, summary);
        summary
    }

    /// Run shifts one after another, never overlapping.
    ///
    /// Stops early, without starting the next shift, once the run-level signal has fired.
    pub fn run_shifts(&mut self, specs: &[ShiftSpec]) -> Vec<ShiftSummary> {
        let mut summaries = Vec::with_capacity(specs.len());
        for spec in specs {
            if self.cancel.is_triggered() {
                warn!("skipping {}: run is shutting down", spec.name);
                break;
            }
            summaries.push(self.run_shift(spec));
        }
        summaries
    }
}
