use crate::fhir::Patient;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::create_dir_all;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub patient_id: String,
    pub summary: String,
}

/// Flatten one patient into free text. Conditions are de-duplicated and sorted.
pub fn summarize_patient(patient: &Patient, conditions: &[String]) -> String {
    let unique: BTreeSet<&str> = conditions.iter().map(String::as_str).collect();
    let cond_str = if unique.is_empty() {
        "None recorded".to_string()
    } else {
        unique.into_iter().collect::<Vec<_>>().join(", ")
    };
    format!(
        "Patient {}: gender={}, birthDate={}. Diagnosed conditions include: {}.",
        patient.id, patient.gender, patient.birth_date, cond_str
    )
}

pub fn build_patient_summaries(patients: &[Patient], conditions: &HashMap<String, Vec<String>>) -> SummaryStore {
    let mut store = SummaryStore::default();
    for p in patients {
        let conds = conditions.get(&p.id).map(Vec::as_slice).unwrap_or(&[]);
        store.insert(p.id.clone(), summarize_patient(p, conds));
    }
    store
}

/// Ordered patient id → summary table. Positions are stable and match the
/// document order handed to a `RetrievalIndex`.
#[derive(Debug, Clone, Default)]
pub struct SummaryStore {
    entries: Vec<PatientSummary>,
    positions: HashMap<String, usize>,
}

impl SummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced id keeps its original position.
    pub fn insert(&mut self, patient_id: String, summary: String) {
        match self.positions.get(&patient_id) {
            Some(&pos) => self.entries[pos].summary = summary,
            None => {
                self.positions.insert(patient_id.clone(), self.entries.len());
                self.entries.push(PatientSummary { patient_id, summary });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, patient_id: &str) -> Option<&str> {
        self.positions.get(patient_id).map(|&pos| self.entries[pos].summary.as_str())
    }

    pub fn at(&self, position: usize) -> Option<&PatientSummary> {
        self.entries.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatientSummary> {
        self.entries.iter()
    }

    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.summary.as_str())
    }

    pub fn save_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))?;
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "expected summary CSV at {}, run `indexer build` to generate it",
                path.display()
            );
        }
        let mut reader = csv::Reader::from_path(path).with_context(|| format!("failed to open {}", path.display()))?;
        let mut store = SummaryStore::default();
        for row in reader.deserialize::<PatientSummary>() {
            let row = row.with_context(|| format!("malformed row in {}", path.display()))?;
            store.insert(row.patient_id, row.summary);
        }
        Ok(store)
    }
}

impl FromIterator<(String, String)> for SummaryStore {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut store = SummaryStore::default();
        for (id, summary) in iter {
            store.insert(id, summary);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(id: &str) -> Patient {
        Patient { id: id.into(), gender: "female".into(), birth_date: "2080-02-29".into() }
    }

    #[test]
    fn summary_sorts_and_dedups_conditions() {
        let conds = vec!["Pneumonia".to_string(), "Asthma".to_string(), "Pneumonia".to_string()];
        assert_eq!(
            summarize_patient(&patient("p1"), &conds),
            "Patient p1: gender=female, birthDate=2080-02-29. Diagnosed conditions include: Asthma, Pneumonia."
        );
    }

    #[test]
    fn summary_without_conditions() {
        let store = build_patient_summaries(&[patient("p2")], &HashMap::new());
        assert_eq!(
            store.get("p2"),
            Some("Patient p2: gender=female, birthDate=2080-02-29. Diagnosed conditions include: None recorded.")
        );
    }

    #[test]
    fn csv_keeps_order_and_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("patient_summaries.csv");
        let store: SummaryStore = vec![
            ("b".to_string(), "has, commas and \"quotes\"".to_string()),
            ("a".to_string(), "plain".to_string()),
        ]
        .into_iter()
        .collect();
        store.save_csv(&path).unwrap();

        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("patient_id,summary\n"));

        let loaded = SummaryStore::load_csv(&path).unwrap();
        let ids: Vec<&str> = loaded.iter().map(|e| e.patient_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(loaded.get("b"), Some("has, commas and \"quotes\""));
    }

    #[test]
    fn duplicate_ids_replace_in_place() {
        let mut store = SummaryStore::new();
        store.insert("x".into(), "one".into());
        store.insert("y".into(), "two".into());
        store.insert("x".into(), "three".into());
        assert_eq!(store.len(), 2);
        assert_eq!(store.at(0).map(|e| e.summary.as_str()), Some("three"));
    }

    #[test]
    fn missing_csv_explains_how_to_generate() {
        let dir = tempfile::tempdir().unwrap();
        let err = SummaryStore::load_csv(&dir.path().join("nope.csv")).unwrap_err();
        assert!(err.to_string().contains("indexer build"));
    }
}
