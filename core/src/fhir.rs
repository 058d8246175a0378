//! Readers for the gzip-compressed FHIR NDJSON exports (`MimicPatient`,
//! `MimicCondition`). Only demographics and condition labels are extracted.

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub const PATIENT_FILE: &str = "MimicPatient.ndjson.gz";
pub const CONDITION_FILE: &str = "MimicCondition.ndjson.gz";
pub const UNKNOWN: &str = "unknown";
pub const UNKNOWN_CONDITION: &str = "Unknown condition";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: String,
    pub gender: String,
    pub birth_date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PatientResource {
    id: Option<String>,
    gender: Option<String>,
    #[serde(rename = "birthDate")]
    birth_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConditionResource {
    subject: Option<Reference>,
    code: Option<CodeableConcept>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Reference {
    reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CodeableConcept {
    coding: Vec<Coding>,
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Coding {
    code: Option<String>,
    display: Option<String>,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

impl CodeableConcept {
    /// First non-empty display, then text, then the first coding's code.
    fn label(&self) -> Option<&str> {
        self.coding
            .iter()
            .find_map(|c| non_empty(&c.display))
            .or_else(|| non_empty(&self.text))
            .or_else(|| self.coding.first().and_then(|c| non_empty(&c.code)))
    }
}

/// Parse every line of a `.ndjson.gz` file, across all concatenated gzip
/// members. Blank lines and lines that do not decode as `T` are skipped; I/O
/// and gzip errors are returned.
pub fn read_ndjson_gz<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let f = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(MultiGzDecoder::new(f));
    let mut out = Vec::new();
    let mut skipped = 0usize;
    for line in reader.lines() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(v) => out.push(v),
            Err(err) => {
                skipped += 1;
                tracing::debug!(path = %path.display(), %err, "skipping malformed line");
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "skipped malformed NDJSON lines");
    }
    Ok(out)
}

/// Patients in file order. A repeated id replaces the earlier record in place.
pub fn load_patients(fhir_dir: &Path) -> Result<Vec<Patient>> {
    let resources: Vec<PatientResource> = read_ndjson_gz(&fhir_dir.join(PATIENT_FILE))?;
    let mut patients: Vec<Patient> = Vec::with_capacity(resources.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for r in resources {
        let Some(id) = r.id.filter(|id| !id.is_empty()) else { continue };
        let patient = Patient {
            id: id.clone(),
            gender: r.gender.unwrap_or_else(|| UNKNOWN.to_string()),
            birth_date: r.birth_date.unwrap_or_else(|| UNKNOWN.to_string()),
        };
        match positions.get(&id) {
            Some(&pos) => patients[pos] = patient,
            None => {
                positions.insert(id, patients.len());
                patients.push(patient);
            }
        }
    }
    Ok(patients)
}

/// Condition labels grouped by patient id, in file order.
pub fn load_conditions(fhir_dir: &Path) -> Result<HashMap<String, Vec<String>>> {
    let resources: Vec<ConditionResource> = read_ndjson_gz(&fhir_dir.join(CONDITION_FILE))?;
    let mut by_patient: HashMap<String, Vec<String>> = HashMap::new();
    for r in resources {
        let subject = r.subject.as_ref().and_then(|s| s.reference.as_deref());
        let Some(patient_id) = subject.and_then(|s| s.strip_prefix("Patient/")) else { continue };
        let label = r
            .code
            .as_ref()
            .and_then(CodeableConcept::label)
            .unwrap_or(UNKNOWN_CONDITION);
        by_patient.entry(patient_id.to_string()).or_default().push(label.to_string());
    }
    Ok(by_patient)
}
