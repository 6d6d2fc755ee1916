//! Platform connectors
//!
//! - [`encoder`]: coding encoder, DRG grouper and reimbursement
//! - [`lms`]: bilingual courses, assessments and gradebook
//! - [`exchange`]: national health information exchange (FHIR)

pub mod encoder;
pub mod exchange;
pub mod lms;

pub use encoder::EncoderConnector;
pub use exchange::ExchangeConnector;
pub use lms::LmsConnector;
