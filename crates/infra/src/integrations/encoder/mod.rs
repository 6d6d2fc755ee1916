//! Coding encoder and AR-DRG grouper integration
//!
//! # Architecture
//!
//! - **Connector**: [`EncoderConnector`] owns the token cache and a retrying
//!   request executor, and hands both to the domain services
//! - **Services**: encoding and code validation, DRG grouping and comparison,
//!   coding guidance, clinical indicator extraction, reimbursement and
//!   education
//! - **Builders**: every request body comes from a pure `build_*` function
//!
//! Requests carry `X-3M-API-Key` and `X-3M-Locale`. Transport failures and
//! 5xx answers are retried `retry_attempts` times (three by default) with
//! waits of 2, 4, 8, ... seconds.

pub mod assist;
pub mod clinical;
pub mod coding;
pub mod connector;
pub mod drg;
pub mod education;
pub mod reimbursement;

pub use assist::{AssistQuery, CodeAssistService, CodingHelp, ModifierGuidance, SequencingAdvice};
pub use clinical::{detect_language, ClinicalFinderService, ClinicalFindings};
pub use coding::{
    CodeCheck, CodeSuggestion, CodeValidationReport, EncoderService, EncodingInput, EncodingResult,
};
pub use connector::EncoderConnector;
pub use drg::{DrgAlternative, DrgComparisonReport, DrgInput, DrgResult, DrgService};
pub use education::{EducationService, StudentProgress};
pub use reimbursement::{ReimbursementClaim, ReimbursementEstimate, ReimbursementService};
