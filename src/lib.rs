pub mod arrival;
pub mod config;
pub mod consultant;
pub mod error;
pub mod facility;
pub mod patient;
pub mod queue;
pub mod shift;
pub mod shutdown;
pub mod specialty;
pub mod stats;
pub mod threading;

// Re-export for easier testing
pub use config::{ArrivalConfig, FacilityConfig, ServiceConfig, ShiftSpec, TimeoutConfig};
pub use consultant::{ConsultantReport, Misroute, Outcome, Treatment};
pub use error::{FacilityError, Result};
pub use facility::{Facility, RunReport};
pub use patient::Patient;
pub use queue::{Dequeued, PatientQueue};
pub use shift::{ShiftManager, ShiftSummary};
pub use shutdown::ShutdownSignal;
pub use specialty::{Specialty, SpecialtyTable};
pub use stats::{StatsAggregator, StatsSnapshot};
