/// Maturity question bank: topics with ordered questions and a shared 1–5 scale.
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CommonError;

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;

const DEFAULT_TOPIC_DESCRIPTION: &str = "Assess your organization's maturity in this area.";

/// A single assessment question. Ids are unique across the whole bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "question")]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub questions: Vec<Question>,
}

impl Topic {
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(DEFAULT_TOPIC_DESCRIPTION)
    }

    pub fn contains_question(&self, question_id: &str) -> bool {
        self.questions.iter().any(|q| q.id == question_id)
    }
}

#[derive(Debug, Deserialize)]
struct RawQuestionBank {
    topics: Vec<Topic>,
    scale: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct QuestionBank {
    topics: Vec<Topic>,
    scale: BTreeMap<u8, String>,
}

impl QuestionBank {
    pub fn load(path: &Path) -> Result<Self, CommonError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CommonError::InvalidQuestionBank(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CommonError> {
        let raw: RawQuestionBank = serde_json::from_str(content)?;

        let mut scale = BTreeMap::new();
        for (key, description) in raw.scale {
            let level: u8 = key.trim().parse().map_err(|_| {
                CommonError::InvalidQuestionBank(format!("scale key '{key}' is not a level"))
            })?;
            if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
                return Err(CommonError::InvalidQuestionBank(format!(
                    "scale level {level} outside {MIN_LEVEL}..={MAX_LEVEL}"
                )));
            }
            scale.insert(level, description);
        }
        for level in MIN_LEVEL..=MAX_LEVEL {
            if !scale.contains_key(&level) {
                return Err(CommonError::InvalidQuestionBank(format!(
                    "scale is missing level {level}"
                )));
            }
        }

        let mut topic_names = HashSet::new();
        let mut question_ids = HashSet::new();
        for topic in &raw.topics {
            if !topic_names.insert(topic.name.as_str()) {
                return Err(CommonError::InvalidQuestionBank(format!(
                    "duplicate topic '{}'",
                    topic.name
                )));
            }
            for question in &topic.questions {
                if !question_ids.insert(question.id.as_str()) {
                    return Err(CommonError::InvalidQuestionBank(format!(
                        "duplicate question id '{}'",
                        question.id
                    )));
                }
            }
        }

        Ok(Self {
            topics: raw.topics,
            scale,
        })
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.name == name)
    }

    /// All question ids in bank order (topic order, then question order).
    pub fn question_ids(&self) -> impl Iterator<Item = &str> {
        self.topics
            .iter()
            .flat_map(|t| t.questions.iter().map(|q| q.id.as_str()))
    }

    pub fn scale_description(&self, level: u8) -> Option<&str> {
        self.scale.get(&level).map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_BANK: &str = r#"{
    "topics": [
        {
            "name": "Process Maturity",
            "description": "How well processes are documented and followed.",
            "questions": [
                {"id": "Q_a", "question": "Processes are documented."},
                {"id": "Q_b", "question": "Processes are followed across regions."}
            ]
        },
        {
            "name": "KPI Management",
            "questions": [
                {"id": "K1", "question": "KPIs are defined for each department."}
            ]
        }
    ],
    "scale": {
        "1": "Initial",
        "2": "Managed",
        "3": "Defined",
        "4": "Quantitatively Managed",
        "5": "Optimizing"
    }
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sample_bank() {
        let bank = QuestionBank::from_json(SAMPLE_BANK).unwrap();
        assert_eq!(bank.topics().len(), 2);
        let topic = bank.topic("Process Maturity").unwrap();
        assert_eq!(topic.questions[1].text, "Processes are followed across regions.");
        assert_eq!(bank.scale_description(4), Some("Quantitatively Managed"));
        assert_eq!(
            bank.question_ids().collect::<Vec<_>>(),
            vec!["Q_a", "Q_b", "K1"]
        );
    }

    #[test]
    fn topic_description_defaults() {
        let bank = QuestionBank::from_json(SAMPLE_BANK).unwrap();
        assert_eq!(
            bank.topic("KPI Management").unwrap().description(),
            DEFAULT_TOPIC_DESCRIPTION
        );
    }

    #[test]
    fn duplicate_question_ids_across_topics_are_rejected() {
        let json = r#"{
            "topics": [
                {"name": "A", "questions": [{"id": "X", "question": "a"}]},
                {"name": "B", "questions": [{"id": "X", "question": "b"}]}
            ],
            "scale": {"1": "a", "2": "b", "3": "c", "4": "d", "5": "e"}
        }"#;
        let err = QuestionBank::from_json(json).unwrap_err();
        assert!(err.to_string().contains("duplicate question id"), "{err}");
    }

    #[test]
    fn incomplete_scale_is_rejected() {
        let json = r#"{"topics": [], "scale": {"1": "a", "2": "b", "3": "c", "4": "d"}}"#;
        let err = QuestionBank::from_json(json).unwrap_err();
        assert!(err.to_string().contains("missing level 5"), "{err}");
    }
}
