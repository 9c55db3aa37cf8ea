use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use study_core::model::{ProgressMap, ProgressRecord, SetId};

/// A set's progress as a downloadable JSON document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressExport {
    #[serde(rename = "set")]
    set_id: SetId,
    exported_at: DateTime<Utc>,
    /// Keyed by question number, in ascending order.
    progress: BTreeMap<u64, ProgressRecord>,
}

impl ProgressExport {
    #[must_use]
    pub fn new(set_id: SetId, progress: &ProgressMap, exported_at: DateTime<Utc>) -> Self {
        Self {
            set_id,
            exported_at,
            progress: progress
                .iter()
                .map(|(id, record)| (id.value(), record.clone()))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.progress.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.progress.is_empty()
    }

    /// `progreso_<set>_<YYYY-MM-DD>.json`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "progreso_{}_{}.json",
            self.set_id,
            self.exported_at.format("%Y-%m-%d")
        )
    }

    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{Confidence, ProgressUpdate, QuestionId};
    use study_core::time::fixed_now;

    #[test]
    fn export_uses_canonical_field_names() {
        let mut progress = ProgressMap::new();
        progress.insert(
            QuestionId::new(12),
            ProgressRecord::default()
                .apply_update(ProgressUpdate::confidence(Confidence::new(4).unwrap()), fixed_now())
                .apply_update(ProgressUpdate::marked(true), fixed_now()),
        );
        progress.insert(QuestionId::new(3), ProgressRecord::default());

        let export = ProgressExport::new(SetId::new("modulos"), &progress, fixed_now());
        assert_eq!(export.file_name(), "progreso_modulos_2023-11-14.json");
        assert_eq!(export.len(), 2);

        let json = export.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["set"], "modulos");
        let record = &value["progress"]["12"];
        assert_eq!(record["veces_mostrada"], 1);
        assert_eq!(record["ultima_confianza"], 4);
        assert_eq!(record["confianza_promedio"], 4.0);
        assert_eq!(record["marcada_para_repaso"], true);
        assert!(json.find("\"3\"").unwrap() < json.find("\"12\"").unwrap());
    }
}
