//! Platform constants
//!
//! Centralized location for endpoint defaults, OAuth scopes, jurisdiction tags
//! and coding-system identifiers shared by the connectors.

// Encoder / DRG platform
pub const ENCODER_BASE_URL: &str = "https://api.3mhis.com/v2";
pub const ENCODER_SANDBOX_URL: &str = "https://sandbox.3mhis.com/v2";
pub const ENCODER_SCOPE: &str = "encoder drg coding reimbursement education";
pub const ENCODER_SYSTEM_NAME: &str = "3M Healthcare";
pub const SAUDI_LOCALE: &str = "en-SA";

// Jurisdiction tags carried on encoder requests
pub const COUNTRY_CODE: &str = "SA";
pub const DRG_VERSION: &str = "11.0";
pub const DRG_GROUPER: &str = "AR-DRG";
pub const COST_WEIGHTS: &str = "saudi_2024";
pub const CURRENCY: &str = "SAR";

// National exchange
pub const EXCHANGE_SANDBOX_URL: &str = "https://sandbox.nphies.sa/api/v1";
pub const EXCHANGE_PRODUCTION_URL: &str = "https://api.nphies.sa/v1";
pub const EXCHANGE_SCOPE: &str =
    "taameen.read taameen.write sehey.read sehey.write validation.execute";
pub const FHIR_VERSION: &str = "R4.0.1";
pub const FHIR_CONTENT_TYPE: &str = "application/fhir+json";
pub const MDS_VERSION: &str = "3.1";
pub const PATIENT_IDENTIFIER_SYSTEM: &str = "https://nphies.sa/identifier/patient-id";
pub const PROVIDER_IDENTIFIER_SYSTEM: &str = "https://nphies.sa/identifier/provider-id";
pub const ICD10AM_SYSTEM: &str = "https://nphies.sa/terminology/CodeSystem/icd-10-am";
pub const SCHI_SYSTEM: &str = "https://nphies.sa/terminology/CodeSystem/schi";
pub const STRUCTURE_DEFINITION_BASE: &str = "https://nphies.sa/fhir/StructureDefinition";

// Learning management system
pub const LMS_BASE_URL: &str = "https://saudiuniversity.blackboard.com";
pub const LMS_SCOPE: &str = "read write delete";

// Virtual lab EHR sandboxes
pub const MEDITECH_ENDPOINT: &str = "https://sandbox.meditech.com/api/v1";
pub const EPIC_ENDPOINT: &str = "https://fhir.epic.com/interconnect-fhir-oauth";
pub const ORACLE_ENDPOINT: &str = "https://sandbox.oracle.com/health/api";
pub const CODE_VALIDATOR_ENDPOINT: &str = "https://api.solventum.com/encoder/v2";

/// Tokens are refreshed when they expire within this many seconds.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Accuracy reported by the internal validator for a well-formed code.
pub const INTERNAL_VALID_ACCURACY: f64 = 0.95;

/// Share of valid codes needed for a student submission to count as compliant.
pub const SUBMISSION_COMPLIANCE_THRESHOLD: f64 = 0.95;
