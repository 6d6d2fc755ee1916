//! # MedCode Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The synchronous event bus used by connectors and sessions
//! - The clock abstraction
//! - Code format checks and the code validation port
//! - Virtual lab sessions, the lab manager and the in-memory EHR simulator
//!
//! ## Architecture Principles
//! - Only depends on `medcode-domain`
//! - No HTTP code; remote EHR backends live in `medcode-infra`
//! - All external systems via traits

pub mod coding;
pub mod events;
pub mod lab;
pub mod time;

// Re-export specific items to avoid ambiguity
pub use coding::{CodeValidationService, CodeValidator, InternalCodeValidator};
pub use events::{Event, EventBus, SubscriptionId};
pub use lab::{
    EhrConnector, EhrConnectorFactory, LabEvent, LabManager, LabSession, LabSessionConfig,
    LabSessionDeps, PatientCriteria, SessionReport,
};
pub use time::{Clock, MockClock, SystemClock};
