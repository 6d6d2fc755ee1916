//! Code format patterns per coding system.

use medcode_domain::CodeSystem;
use once_cell::sync::Lazy;
use regex::Regex;

static ICD10_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]\d{2}(\.\d{1,3})?$").expect("ICD10_REGEX should compile - this is a bug")
});

static CPT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{5}$").expect("CPT_REGEX should compile - this is a bug"));

static HCPCS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]\d{4}$").expect("HCPCS_REGEX should compile - this is a bug"));

static SCHI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^SCHI-\d{4,6}$").expect("SCHI_REGEX should compile - this is a bug")
});

/// ICD-10 / ICD-10-AM diagnosis code, e.g. `I21.9`.
pub fn is_valid_icd10(code: &str) -> bool {
    ICD10_REGEX.is_match(code)
}

/// Saudi Classification of Health Interventions code, e.g. `SCHI-12345`.
pub fn is_valid_schi(code: &str) -> bool {
    SCHI_REGEX.is_match(code)
}

pub fn is_valid_cpt(code: &str) -> bool {
    CPT_REGEX.is_match(code)
}

pub fn is_valid_hcpcs(code: &str) -> bool {
    HCPCS_REGEX.is_match(code)
}

/// Check `code` against the pattern of `system`. Systems without a known
/// pattern never match.
pub fn matches_system(system: &CodeSystem, code: &str) -> bool {
    match system {
        CodeSystem::Icd10 => is_valid_icd10(code),
        CodeSystem::Cpt => is_valid_cpt(code),
        CodeSystem::Hcpcs => is_valid_hcpcs(code),
        CodeSystem::Schi => is_valid_schi(code),
        CodeSystem::Other(_) => false,
    }
}
