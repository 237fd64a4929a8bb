//! Facility orchestration.
//!
//! This module wires the persistent specialty queues, the arrival generator and the shift manager
//! together. The arrival generator lives for the whole run; shifts come and go underneath it.

use crate::arrival::{ArrivalGenerator, ArrivalHandle, ArrivalReport};
use crate::config::FacilityConfig;
use crate::consultant::{SimulatedTreatment, Treatment};
use crate::error::{FacilityError, Result};
use crate::queue::PatientQueue;
use crate::shift::{ShiftManager, ShiftSummary};
use crate::shutdown::ShutdownSignal;
use crate::specialty::SpecialtyTable;
use crate::stats::{StatsAggregator, StatsSnapshot};
use log::{error, info};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Final account of a run, produced by [`Facility::shutdown`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub shifts: Vec<ShiftSummary>,
    /// Generator tally; `None` if it was never started or failed to stop in time.
    pub arrivals: Option<ArrivalReport>,
    pub treated: u64,
    /// Patients refused for a specialty mismatch; accounted for but never treated.
    pub misrouted: u64,
    pub backlog: SpecialtyTable<usize>,
    pub total_waiting: usize,
    pub stats: StatsSnapshot,
    pub faults: Vec<String>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Final report:")?;
        if let Some(arrivals) = &self.arrivals {
            writeln!(f, "  Patients arrived: {}", arrivals.generated)?;
        }
        writeln!(f, "  Patients treated: {}", self.treated)?;
        if self.misrouted > 0 {
            writeln!(f, "  Patients misrouted: {}", self.misrouted)?;
        }
        writeln!(
            f,
            "  Outcomes: {} successful, {} failed ({:.2}% success)",
            self.stats.successful, self.stats.failed, self.stats.success_rate
        )?;
        writeln!(
            f,
            "  Elapsed: {} ms ({:.2} patients/s)",
            self.stats.elapsed_ms, self.stats.throughput_per_sec
        )?;
        writeln!(f, "  Final queue status:")?;
        for (specialty, waiting) in self.backlog.iter() {
            writeln!(f, "    {}: {} waiting", specialty.display_name(), waiting)?;
        }
        writeln!(f, "  Total waiting: {}", self.total_waiting)?;
        let shift_faults = self.shifts.iter().flat_map(|shift| shift.faults.iter());
        for fault in shift_faults.chain(self.faults.iter()) {
            writeln!(f, "  FAULT: {fault}")?;
        }
        Ok(())
    }
}

/// Complete facility: queues, statistics, the arrival generator and the shift manager.
pub struct Facility {
    config: FacilityConfig,
    queues: SpecialtyTable<Arc<PatientQueue>>,
    stats: Arc<StatsAggregator>,
    cancel: ShutdownSignal,
    arrivals: Option<ArrivalHandle>,
    shifts: ShiftManager,
    summaries: Vec<ShiftSummary>,
}

impl Facility {
    /// Build the facility with simulated treatment; nothing runs until [`Facility::start`].
    pub fn new(config: FacilityConfig) -> Result<Self> {
        let treatment = Arc::new(SimulatedTreatment::new(&config.service));
        Self::with_treatment(config, treatment)
    }

    /// Build the facility around a custom treatment step.
    pub fn with_treatment(config: FacilityConfig, treatment: Arc<dyn Treatment>) -> Result<Self> {
        config.validate()?;

        let queues = SpecialtyTable::from_fn(|specialty| Arc::new(PatientQueue::new(specialty)));
        let stats = Arc::new(StatsAggregator::new());
        let cancel = ShutdownSignal::new();
        let shifts = ShiftManager::new(
            queues.clone(),
            stats.clone(),
            treatment,
            config.timeouts.consultant_join(),
            cancel.clone(),
        );

        Ok(Self {
            config,
            queues,
            stats,
            cancel,
            arrivals: None,
            shifts,
            summaries: Vec::new(),
        })
    }

    pub fn config(&self) -> &FacilityConfig {
        &self.config
    }

    pub fn queues(&self) -> &SpecialtyTable<Arc<PatientQueue>> {
        &self.queues
    }

    pub fn stats(&self) -> Arc<StatsAggregator> {
        self.stats.clone()
    }

    /// Run-level signal; triggering it ends the current shift early and skips the rest.
    pub fn cancel_signal(&self) -> ShutdownSignal {
        self.cancel.clone()
    }

    /// Start the arrival generator.
    pub fn start(&mut self) -> Result<()> {
        if self.arrivals.is_some() {
            return Err(FacilityError::AlreadyStarted);
        }
        let generator = ArrivalGenerator::new(
            self.queues.clone(),
            self.stats.clone(),
            self.config.arrivals.clone(),
        );
        self.arrivals = Some(generator.spawn()?);
        info!("facility started with {} queues", self.queues.iter().count());
        Ok(())
    }

    /// Run every configured shift in order and keep their summaries for the final report.
    pub fn run_shifts(&mut self) -> &[ShiftSummary] {
        let first_new = self.summaries.len();
        let summaries = self.shifts.run_shifts(&self.config.shifts);
        self.summaries.extend(summaries);
        &self.summaries[first_new..]
    }

    /// Stop the arrival generator and produce the final report.
    ///
    /// The report's backlog is read after the generator has stopped and every shift has ended,
    /// so it is exact.
    pub fn shutdown(mut self) -> RunReport {
        info!("facility shutting down");
        self.cancel.trigger();

        let mut faults = Vec::new();
        let arrivals = match self.arrivals.take() {
            Some(handle) => match handle.stop(self.config.timeouts.arrival_join()) {
                Ok(report) => Some(report),
                Err(err) => {
                    error!("arrival generator: {err}");
                    faults.push(format!("arrival generator: {err}"));
                    None
                }
            },
            None => None,
        };

        let backlog = self.shifts.backlog();
        let total_waiting = backlog.iter().map(|(_, waiting)| *waiting).sum();
        let report = RunReport {
            shifts: self.summaries,
            arrivals,
            treated: self.shifts.cumulative_treated(),
            misrouted: self.shifts.cumulative_misrouted(),
            backlog,
            total_waiting,
            stats: self.stats.snapshot(),
            faults,
        };
        info!(
            "facility stopped: {} treated, {} waiting",
            report.treated, report.total_waiting
        );
        report
    }

    /// Start arrivals, run every configured shift, then shut down.
    pub fn run(mut self) -> Result<RunReport> {
        self.start()?;
        self.run_shifts();
        Ok(self.shutdown())
    }
}
