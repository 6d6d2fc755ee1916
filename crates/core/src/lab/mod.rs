//! Virtual lab sessions backed by pluggable EHR systems

pub mod manager;
pub mod performance;
pub mod ports;
pub mod scenario;
pub mod session;
pub mod simulator;

pub use manager::{HistoryFilter, LabManager, SharedSession};
pub use performance::{ActionKind, ActionRecord, CodeRecord, PerformanceSummary};
pub use ports::{EhrConnector, EhrConnectorFactory, PatientCriteria};
pub use scenario::{scenario_for, EncounterData, LabScenario, ScenarioPatient};
pub use session::{
    ActionOutcome, CodeEntryOutcome, LabEvent, LabSession, LabSessionConfig, LabSessionDeps,
    SessionReport,
};
pub use simulator::{InMemoryEhr, SimulatorFactory};
