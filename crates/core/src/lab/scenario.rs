//! Built-in lab scenarios.

use medcode_domain::LabType;
use serde::{Deserialize, Serialize};

/// Patient fixture a scenario loads into the EHR backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioPatient {
    pub id: String,
    pub name: String,
    pub dob: String,
    pub mrn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub procedures: Vec<String>,
}

/// Encounter fixture a scenario creates in the EHR backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterData {
    #[serde(rename = "type")]
    pub encounter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub procedures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examination_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mdm_complexity: Option<String>,
}

impl EncounterData {
    pub fn is_inpatient(&self) -> bool {
        self.encounter_type == "inpatient"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabScenario {
    pub title: String,
    pub patient: ScenarioPatient,
    pub encounter: Option<EncounterData>,
    pub learning_objectives: Vec<String>,
}

/// Scenario for a lab type. Unknown lab types get the EHR navigation scenario.
pub fn scenario_for(lab_type: &LabType) -> LabScenario {
    match lab_type {
        LabType::InpatientCoding => inpatient_coding(),
        LabType::OutpatientEm => outpatient_em(),
        LabType::EhrNavigation | LabType::Custom(_) => ehr_navigation(),
    }
}

fn objectives(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn ehr_navigation() -> LabScenario {
    LabScenario {
        title: "EHR Navigation and Patient Lookup".into(),
        patient: ScenarioPatient {
            id: "PT001".into(),
            name: "John Doe".into(),
            dob: "1975-03-15".into(),
            mrn: "MRN123456".into(),
            admission_diagnosis: None,
            procedures: Vec::new(),
        },
        encounter: None,
        learning_objectives: objectives(&[
            "Navigate EHR interface efficiently",
            "Locate patient information",
            "Access clinical documentation",
        ]),
    }
}

fn inpatient_coding() -> LabScenario {
    LabScenario {
        title: "Inpatient Coding Scenario".into(),
        patient: ScenarioPatient {
            id: "PT002".into(),
            name: "Jane Smith".into(),
            dob: "1968-07-22".into(),
            mrn: "MRN789012".into(),
            admission_diagnosis: Some("Chest pain".into()),
            procedures: vec!["Cardiac catheterization".into(), "Angioplasty".into()],
        },
        encounter: Some(EncounterData {
            encounter_type: "inpatient".into(),
            admission_date: Some("2024-01-15".into()),
            discharge_date: Some("2024-01-18".into()),
            primary_diagnosis: Some("I21.9".into()),
            procedures: vec!["02703ZZ".into(), "02713ZZ".into()],
            ..EncounterData::default()
        }),
        learning_objectives: objectives(&[
            "Code complex inpatient scenarios",
            "Apply ICD-10-PCS guidelines",
            "Calculate DRG assignments",
        ]),
    }
}

fn outpatient_em() -> LabScenario {
    LabScenario {
        title: "Outpatient E/M Coding".into(),
        patient: ScenarioPatient {
            id: "PT003".into(),
            name: "Ahmed Al-Rashid".into(),
            dob: "1982-11-08".into(),
            mrn: "MRN345678".into(),
            admission_diagnosis: None,
            procedures: Vec::new(),
        },
        encounter: Some(EncounterData {
            encounter_type: "outpatient".into(),
            visit_date: Some("2024-01-20".into()),
            chief_complaint: Some("Follow-up diabetes management".into()),
            examination_level: Some("detailed".into()),
            mdm_complexity: Some("moderate".into()),
            ..EncounterData::default()
        }),
        learning_objectives: objectives(&[
            "Determine appropriate E/M level",
            "Apply 2021 E/M guidelines",
            "Document medical decision making",
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inpatient_scenario_loads_jane_smith_with_encounter() {
        let scenario = scenario_for(&LabType::InpatientCoding);
        assert_eq!(scenario.patient.id, "PT002");
        assert_eq!(scenario.patient.name, "Jane Smith");
        let encounter = scenario.encounter.expect("inpatient encounter");
        assert!(encounter.is_inpatient());
        assert_eq!(encounter.primary_diagnosis.as_deref(), Some("I21.9"));
    }

    #[test]
    fn unknown_lab_type_falls_back_to_navigation() {
        let scenario = scenario_for(&LabType::from("oncology_abstracting"));
        assert_eq!(scenario.patient.id, "PT001");
        assert!(scenario.encounter.is_none());
    }

    #[test]
    fn encounter_serializes_type_key_and_skips_empty_fields() {
        let encounter = scenario_for(&LabType::OutpatientEm).encounter.expect("encounter");
        let json = serde_json::to_value(&encounter).expect("serialize");
        assert_eq!(json["type"], "outpatient");
        assert!(json.get("admission_date").is_none());
        assert!(json.get("procedures").is_none());
    }
}
