//! Tunables for the facility.
//!
//! Every timing the pipeline depends on lives here rather than in the code that uses it. All
//! sections deserialize with `#[serde(default)]`, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! [arrivals]
//! min_interval_ms = 50
//! max_interval_ms = 50
//!
//! [[shifts]]
//! name = "Short shift"
//! duration_ms = 1000
//! consultants = { paediatrics = "Dr. A", surgery = "Dr. B", cardiology = "Dr. C" }
//! ```

use crate::error::{FacilityError, Result};
use crate::specialty::SpecialtyTable;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Inter-arrival timing of the patient generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrivalConfig {
    /// Shortest pause between two arrivals, inclusive.
    pub min_interval_ms: u64,
    /// Longest pause between two arrivals, inclusive.
    pub max_interval_ms: u64,
    /// Seed for reproducible specialty draws and intervals; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 300,
            max_interval_ms: 700,
            seed: None,
        }
    }
}

impl ArrivalConfig {
    /// Draw the next inter-arrival pause from `[min, max]`.
    pub fn next_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let lo = self.min_interval_ms.min(self.max_interval_ms);
        let hi = self.min_interval_ms.max(self.max_interval_ms);
        Duration::from_millis(rng.gen_range(lo..=hi))
    }
}

/// Simulated treatment performed by consultants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Fixed treatment time per patient.
    pub treatment_ms: u64,
    /// Probability in `[0, 1]` that a treatment is recorded as failed.
    pub failure_rate: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            treatment_ms: 100,
            failure_rate: 0.0,
        }
    }
}

impl ServiceConfig {
    pub fn treatment_time(&self) -> Duration {
        Duration::from_millis(self.treatment_ms)
    }
}

/// Grace periods granted to signalled threads before they are reported as faulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub consultant_join_ms: u64,
    pub arrival_join_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            consultant_join_ms: 3_000,
            arrival_join_ms: 2_000,
        }
    }
}

impl TimeoutConfig {
    pub fn consultant_join(&self) -> Duration {
        Duration::from_millis(self.consultant_join_ms)
    }

    pub fn arrival_join(&self) -> Duration {
        Duration::from_millis(self.arrival_join_ms)
    }
}

/// One shift: a name, a duration and the consultant on duty for each specialty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSpec {
    pub name: String,
    pub duration_ms: u64,
    pub consultants: SpecialtyTable<String>,
}

impl ShiftSpec {
    pub fn new(
        name: impl Into<String>,
        duration: Duration,
        consultants: SpecialtyTable<String>,
    ) -> Self {
        Self {
            name: name.into(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            consultants,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    fn roster(names: [&str; 3]) -> SpecialtyTable<String> {
        SpecialtyTable::from_fn(|specialty| names[specialty.index()].to_string())
    }

    pub fn day() -> Self {
        Self::new(
            "Day shift",
            Duration::from_secs(12),
            Self::roster(["Dr. Smith", "Dr. Johnson", "Dr. Williams"]),
        )
    }

    pub fn night() -> Self {
        Self::new(
            "Night shift",
            Duration::from_secs(12),
            Self::roster(["Dr. Brown", "Dr. Davis", "Dr. Miller"]),
        )
    }

    fn validate(&self) -> Result<()> {
        if self.duration_ms == 0 {
            return Err(FacilityError::InvalidConfig(format!(
                "shift `{}` must last longer than 0 ms",
                self.name
            )));
        }
        for (specialty, name) in self.consultants.iter() {
            if name.trim().is_empty() {
                return Err(FacilityError::InvalidConfig(format!(
                    "shift `{}` has no consultant name for {specialty}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Top-level configuration used by [`crate::Facility`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityConfig {
    pub arrivals: ArrivalConfig,
    pub service: ServiceConfig,
    pub timeouts: TimeoutConfig,
    pub shifts: Vec<ShiftSpec>,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            arrivals: ArrivalConfig::default(),
            service: ServiceConfig::default(),
            timeouts: TimeoutConfig::default(),
            shifts: vec![ShiftSpec::day(), ShiftSpec::night()],
        }
    }
}

impl FacilityConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: FacilityConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Override every shift's duration, keeping names and rosters.
    pub fn with_shift_duration(mut self, duration: Duration) -> Self {
        for shift in &mut self.shifts {
            shift.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.arrivals.min_interval_ms > self.arrivals.max_interval_ms {
            return Err(FacilityError::InvalidConfig(format!(
                "arrival interval minimum ({} ms) exceeds maximum ({} ms)",
                self.arrivals.min_interval_ms, self.arrivals.max_interval_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.service.failure_rate) {
            return Err(FacilityError::InvalidConfig(format!(
                "failure rate {} is outside [0, 1]",
                self.service.failure_rate
            )));
        }
        if self.shifts.is_empty() {
            return Err(FacilityError::InvalidConfig(
                "at least one shift is required".to_string(),
            ));
        }
        for shift in &self.shifts {
            shift.validate()?;
        }
        Ok(())
    }
}
