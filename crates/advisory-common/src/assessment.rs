/// Assessment navigation state machine and response bookkeeping.
///
/// Pages: topic selection → single-topic questionnaire → contact form → report ready.
/// Answers are recorded as soon as they are given; completing a topic is a separate,
/// explicit transition.
use std::collections::{BTreeSet, HashMap};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contact::ContactInfo;
use crate::error::CommonError;
use crate::question_bank::{QuestionBank, MAX_LEVEL, MIN_LEVEL};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum AssessmentPage {
    TopicSelection,
    TopicAssessment { topic: String },
    ContactInfo,
    ReportReady,
}

/// Question id → chosen level. Last write wins.
#[derive(Debug, Clone, Default)]
pub struct Responses {
    levels: HashMap<String, u8>,
}

impl Responses {
    pub fn set(&mut self, question_id: &str, level: u8) {
        self.levels.insert(question_id.to_string(), level);
    }

    pub fn get(&self, question_id: &str) -> Option<u8> {
        self.levels.get(question_id).copied()
    }

    /// Level used for charts: unanswered questions count as 0.
    pub fn level_or_zero(&self, question_id: &str) -> u8 {
        self.get(question_id).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Everything needed to compose and persist an assessment report.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub contact: ContactInfo,
    pub responses: Responses,
    pub completed_topics: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct AssessmentFlow {
    page: AssessmentPage,
    responses: Responses,
    completed: BTreeSet<String>,
    contact: Option<ContactInfo>,
}

impl Default for AssessmentFlow {
    fn default() -> Self {
        Self {
            page: AssessmentPage::TopicSelection,
            responses: Responses::default(),
            completed: BTreeSet::new(),
            contact: None,
        }
    }
}

impl AssessmentFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> &AssessmentPage {
        &self.page
    }

    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    pub fn completed_topics(&self) -> &BTreeSet<String> {
        &self.completed
    }

    pub fn contact(&self) -> Option<&ContactInfo> {
        self.contact.as_ref()
    }

    pub fn select_topic(&mut self, bank: &QuestionBank, topic: &str) -> Result<(), CommonError> {
        self.expect_page(&AssessmentPage::TopicSelection, "select a topic")?;
        if bank.topic(topic).is_none() {
            return Err(CommonError::NotFound(format!("No questions found for topic: {topic}")));
        }
        self.page = AssessmentPage::TopicAssessment {
            topic: topic.to_string(),
        };
        Ok(())
    }

    pub fn answer(
        &mut self,
        bank: &QuestionBank,
        question_id: &str,
        level: u8,
    ) -> Result<(), CommonError> {
        let topic_name = self.current_topic()?.to_string();
        let in_topic = bank
            .topic(&topic_name)
            .is_some_and(|t| t.contains_question(question_id));
        if !in_topic {
            return Err(CommonError::NotFound(format!(
                "Question '{question_id}' is not part of topic '{topic_name}'."
            )));
        }
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(CommonError::Validation(format!(
                "maturity level must be between {MIN_LEVEL} and {MAX_LEVEL}"
            )));
        }
        self.responses.set(question_id, level);
        Ok(())
    }

    /// Mark the current topic completed and return to topic selection.
    pub fn submit_topic(&mut self) -> Result<String, CommonError> {
        let topic = self.current_topic()?.to_string();
        self.completed.insert(topic.clone());
        self.page = AssessmentPage::TopicSelection;
        Ok(topic)
    }

    pub fn back_to_topics(&mut self) -> Result<(), CommonError> {
        match self.page {
            AssessmentPage::TopicAssessment { .. } | AssessmentPage::ContactInfo => {
                self.page = AssessmentPage::TopicSelection;
                Ok(())
            }
            AssessmentPage::TopicSelection => Ok(()),
            AssessmentPage::ReportReady => Err(CommonError::Validation(
                "The report has already been generated.".to_string(),
            )),
        }
    }

    pub fn generate_report(&mut self) -> Result<(), CommonError> {
        self.expect_page(&AssessmentPage::TopicSelection, "generate the report")?;
        if self.completed.is_empty() {
            return Err(CommonError::EmptyPrerequisite(
                "Please complete at least one topic assessment before generating the report."
                    .to_string(),
            ));
        }
        self.page = AssessmentPage::ContactInfo;
        Ok(())
    }

    /// Validate the contact form. The page stays at `ContactInfo` until `mark_ready`
    /// is called after the report has been composed and persisted.
    pub fn submit_contact(&mut self, contact: ContactInfo) -> Result<ReportRequest, CommonError> {
        self.expect_page(&AssessmentPage::ContactInfo, "submit contact information")?;
        let contact = contact.validated()?;
        self.contact = Some(contact.clone());
        Ok(ReportRequest {
            contact,
            responses: self.responses.clone(),
            completed_topics: self.completed.clone(),
        })
    }

    pub fn mark_ready(&mut self) -> Result<(), CommonError> {
        self.expect_page(&AssessmentPage::ContactInfo, "finish the report")?;
        if self.contact.is_none() {
            return Err(CommonError::IncompleteContact);
        }
        self.page = AssessmentPage::ReportReady;
        Ok(())
    }

    fn current_topic(&self) -> Result<&str, CommonError> {
        match &self.page {
            AssessmentPage::TopicAssessment { topic } => Ok(topic),
            _ => Err(CommonError::Validation("No topic is being assessed.".to_string())),
        }
    }

    fn expect_page(&self, expected: &AssessmentPage, action: &str) -> Result<(), CommonError> {
        if &self.page == expected {
            Ok(())
        } else {
            Err(CommonError::Validation(format!("Cannot {action} from this page.")))
        }
    }
}
