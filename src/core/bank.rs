//! Question bank - the registry of quiz questions

use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::core::quiz::{QuestionError, QuestionRecord};

#[derive(Debug, Error)]
pub enum BankError {
    #[error("Failed to read question bank {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid question bank {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Question id '{0}' is defined more than once")]
    DuplicateId(String),

    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Ordered table of question records, unique by id
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    records: Vec<QuestionRecord>,
}

impl QuestionBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Questions that ship with heatlab
    pub fn builtin() -> Self {
        let view_factor_choices = ["0", "0.25", "0.5", "0.75", "1"];
        let records = vec![
            QuestionRecord::new(
                "favorite-color",
                "What is your favorite color?",
                &["Grey", "White", "Black", "Red"],
                "Red",
            ),
            QuestionRecord::new(
                "napoleon-horse",
                "What is The color of Napoleon's white horse?",
                &["Grey", "Brown"],
                "Grey",
            ),
            QuestionRecord::new(
                "chewbacca-age",
                "How old is Chewbaka?",
                &["20", "50", "75", "102", "1032", "42", "No one knows"],
                "No one knows",
            ),
            QuestionRecord::new("view-factor-11", "What is the F1_1?", &view_factor_choices, "0"),
            QuestionRecord::new("view-factor-12", "What is the F1_2?", &view_factor_choices, "1"),
            QuestionRecord::new("view-factor-21", "What is the F2_1?", &view_factor_choices, "0.5"),
            QuestionRecord::new("view-factor-22", "What is the F2_2?", &view_factor_choices, "0.5")
                .with_explanation(VIEW_FACTOR_EXPLANATION),
        ];
        Self { records }
    }

    /// Add a record, rejecting invalid records and duplicate ids
    pub fn insert(&mut self, record: QuestionRecord) -> Result<(), BankError> {
        record.validate()?;
        if self.get(&record.id).is_some() {
            return Err(BankError::DuplicateId(record.id));
        }
        self.records.push(record);
        Ok(())
    }

    /// Parse a YAML list of question records and add them.
    ///
    /// The whole list is checked first; on error the bank is unchanged.
    pub fn extend_from_yaml(&mut self, content: &str, origin: &str) -> Result<usize, BankError> {
        let records: Vec<QuestionRecord> =
            serde_yml::from_str(content).map_err(|e| BankError::Parse {
                path: origin.to_string(),
                message: e.to_string(),
            })?;
        for (i, record) in records.iter().enumerate() {
            record.validate()?;
            let seen_earlier = records[..i].iter().any(|r| r.id == record.id);
            if seen_earlier || self.get(&record.id).is_some() {
                return Err(BankError::DuplicateId(record.id.clone()));
            }
        }
        let count = records.len();
        self.records.extend(records);
        debug!(origin, count, "Loaded questions");
        Ok(count)
    }

    /// Read a YAML bank file and add its records
    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize, BankError> {
        let content = std::fs::read_to_string(path).map_err(|e| BankError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.extend_from_yaml(&content, &path.display().to_string())
    }

    pub fn get(&self, id: &str) -> Option<&QuestionRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

const VIEW_FACTOR_EXPLANATION: &str = r"Explanation:

$$F_{1-1}=0, F_{1-2}=1$$ Because the energy leaving the surface 1 can be totally absorbed by the surface 2.

$$F_{2-1}=\frac{A_1}{A_2}$$ due to the reciprocity property. $$F_{2-2}=1-\frac{A_1}{A_2}$$ due to the closeness property.
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_records_are_valid() {
        let bank = QuestionBank::builtin();
        assert_eq!(bank.len(), 7);
        for record in bank.iter() {
            record.validate().unwrap();
        }
    }

    #[test]
    fn test_view_factor_answers() {
        let bank = QuestionBank::builtin();
        assert_eq!(bank.get("view-factor-11").unwrap().correct, "0");
        assert_eq!(bank.get("view-factor-12").unwrap().correct, "1");
        assert_eq!(bank.get("view-factor-21").unwrap().correct, "0.5");

        let f22 = bank.get("view-factor-22").unwrap();
        assert_eq!(f22.correct, "0.5");
        assert!(f22.explanation.as_deref().unwrap().contains("reciprocity"));
    }

    #[test]
    fn test_extend_from_yaml() {
        let mut bank = QuestionBank::builtin();
        let yaml = r#"
- id: sigma
  question: "Which constant appears in radiative exchange?"
  choices: ["Boltzmann", "Stefan-Boltzmann", "Planck"]
  correct: Stefan-Boltzmann
"#;
        assert_eq!(bank.extend_from_yaml(yaml, "extra.yaml").unwrap(), 1);
        assert_eq!(bank.len(), 8);
        assert!(bank.get("sigma").unwrap().explanation.is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut bank = QuestionBank::builtin();
        let record = QuestionRecord::new("view-factor-11", "again?", &["a"], "a");
        assert!(matches!(bank.insert(record), Err(BankError::DuplicateId(_))));
    }

    #[test]
    fn test_failed_load_leaves_bank_unchanged() {
        let mut bank = QuestionBank::builtin();
        let yaml = r#"
- id: first
  question: "?"
  choices: [a, b]
  correct: a
- id: second
  question: "?"
  choices: [a, b]
  correct: c
"#;
        assert!(bank.extend_from_yaml(yaml, "partial.yaml").is_err());
        assert_eq!(bank.len(), 7);
        assert!(bank.get("first").is_none());
    }

    #[test]
    fn test_duplicate_id_within_file_rejected() {
        let mut bank = QuestionBank::new();
        let yaml = "- { id: q, question: \"?\", choices: [a], correct: a }\n\
                    - { id: q, question: \"again?\", choices: [a], correct: a }\n";
        assert!(matches!(
            bank.extend_from_yaml(yaml, "twice.yaml"),
            Err(BankError::DuplicateId(id)) if id == "q"
        ));
        assert!(bank.is_empty());
    }

    #[test]
    fn test_invalid_record_rejected() {
        let mut bank = QuestionBank::new();
        let yaml = "- id: broken\n  question: \"?\"\n  choices: [a, b]\n  correct: c\n";
        assert!(matches!(
            bank.extend_from_yaml(yaml, "broken.yaml"),
            Err(BankError::Question(_))
        ));
    }
}
