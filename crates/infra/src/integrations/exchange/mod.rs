//! National health-information exchange integration
//!
//! FHIR R4 resources over the gateway's REST surface:
//!
//! - **Eligibility** (`taameen`): coverage checks and pre-authorization
//! - **Clinical** (`sehey`): transaction bundles of patient, encounter,
//!   condition and procedure resources
//! - **Billing**: claims and claim status
//! - **Validation**: Minimum Data Set rules, the remote profile check and
//!   ICD-10-AM / SCHI coding checks
//! - **Education**: synthetic practice cases and student submission scoring
//!
//! Bodies are sent as `application/fhir+json` with `X-NPHIES-Version`.

pub mod billing;
pub mod clinical;
pub mod connector;
pub mod education;
pub mod eligibility;
pub mod validation;

pub use billing::{BillingService, ClaimResult, ClaimStatus, ClaimSubmission};
pub use clinical::{ClinicalService, ClinicalSubmission, ClinicalSubmissionResult};
pub use connector::ExchangeConnector;
pub use education::{PracticeCase, PracticeScenario, StudentSubmission, SubmissionReview};
pub use eligibility::{EligibilityPatient, EligibilityResult, EligibilityService};
pub use validation::{check_mds, has_field, ResourceValidation, ValidationService};
