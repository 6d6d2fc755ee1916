//! Domain types shared by the connectors and the virtual lab

pub mod coding;
pub mod lab;

pub use coding::{CodeEntry, CodeSystem, CodeValidation, ValidationOutcome, ValidationSource};
pub use lab::{EhrSystem, LabState, LabType, PatientRecord};
