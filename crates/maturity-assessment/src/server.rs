use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use advisory_common::api::{ContactParams, OkResponse, ReportDownload, SessionParams};
use advisory_common::assessment::{AssessmentFlow, AssessmentPage};
use advisory_common::canvas::Assets;
use advisory_common::gateway::Gateway;
use advisory_common::question_bank::{QuestionBank, MAX_LEVEL, MIN_LEVEL};
use advisory_common::report::{self, RenderedReport, ReportProfile};
use advisory_common::session::{SessionId, SessionStore};

use crate::error::AppError;

#[derive(Debug, Default)]
pub struct AssessmentSession {
    flow: AssessmentFlow,
    report: Option<RenderedReport>,
}

#[derive(Clone)]
pub struct AssessmentServer {
    bank: Arc<QuestionBank>,
    profile: Arc<ReportProfile>,
    assets: Arc<Assets>,
    gateway: Arc<Gateway>,
    sessions: SessionStore<AssessmentSession>,
    tool_router: ToolRouter<AssessmentServer>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SelectTopicParams {
    session_id: SessionId,
    topic: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AnswerQuestionParams {
    session_id: SessionId,
    question_id: String,
    /// Maturity level from 1 (lowest) to 5 (highest).
    level: u8,
}

#[derive(Debug, Serialize, JsonSchema)]
struct TopicTile {
    name: String,
    description: String,
    completed: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
struct QuestionView {
    id: String,
    /// `Q{number}` label used on the report chart.
    number: usize,
    text: String,
    level: Option<u8>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct TopicQuestions {
    name: String,
    description: String,
    questions: Vec<QuestionView>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ScaleLevel {
    level: u8,
    description: String,
}

/// What the client should render after an interaction.
#[derive(Debug, Serialize, JsonSchema)]
pub struct AssessmentView {
    session_id: SessionId,
    title: String,
    page: AssessmentPage,
    topics: Vec<TopicTile>,
    current_topic: Option<TopicQuestions>,
    scale: Vec<ScaleLevel>,
    completed_topics: Vec<String>,
    message: Option<String>,
    report_ready: bool,
}

impl AssessmentServer {
    pub fn new(bank: QuestionBank, profile: ReportProfile, assets: Assets, gateway: Gateway) -> Self {
        Self {
            bank: Arc::new(bank),
            profile: Arc::new(profile),
            assets: Arc::new(assets),
            gateway: Arc::new(gateway),
            sessions: SessionStore::new(),
            tool_router: Self::tool_router(),
        }
    }

    fn render_view(
        &self,
        session_id: &str,
        session: &AssessmentSession,
        message: Option<&str>,
    ) -> AssessmentView {
        let flow = &session.flow;
        let completed = flow.completed_topics();
        let topics = self
            .bank
            .topics()
            .iter()
            .map(|t| TopicTile {
                name: t.name.clone(),
                description: t.description().to_string(),
                completed: completed.contains(&t.name),
            })
            .collect();

        let current_topic = match flow.page() {
            AssessmentPage::TopicAssessment { topic } => self.bank.topic(topic).map(|t| TopicQuestions {
                name: t.name.clone(),
                description: t.description().to_string(),
                questions: t
                    .questions
                    .iter()
                    .enumerate()
                    .map(|(i, q)| QuestionView {
                        id: q.id.clone(),
                        number: i + 1,
                        text: q.text.clone(),
                        level: flow.responses().get(&q.id),
                    })
                    .collect(),
            }),
            _ => None,
        };

        let scale = (MIN_LEVEL..=MAX_LEVEL)
            .filter_map(|level| {
                self.bank.scale_description(level).map(|d| ScaleLevel {
                    level,
                    description: d.to_string(),
                })
            })
            .collect();

        AssessmentView {
            session_id: session_id.to_string(),
            title: self.profile.title.clone(),
            page: flow.page().clone(),
            topics,
            current_topic,
            scale,
            completed_topics: completed.iter().cloned().collect(),
            message: message.map(str::to_string),
            report_ready: session.report.is_some(),
        }
    }

    /// Run one synchronous flow transition and return the resulting view.
    async fn transition(
        &self,
        session_id: &str,
        message: Option<&str>,
        f: impl FnOnce(&QuestionBank, &mut AssessmentFlow) -> Result<(), AppError>,
    ) -> Result<Json<AssessmentView>, String> {
        self.sessions
            .with_session(session_id, |session| -> Result<AssessmentView, AppError> {
                f(&self.bank, &mut session.flow)?;
                Ok(self.render_view(session_id, session, message))
            })
            .await
            .map_err(AppError::from)
            .and_then(|outcome| outcome)
            .map(Json)
            .map_err(|e| e.user_message())
    }

    async fn submit(&self, params: ContactParams) -> Result<AssessmentView, AppError> {
        let session = self.sessions.session(&params.session_id).await?;
        let mut session = session.lock().await;
        let request = session.flow.submit_contact(params.contact)?;

        let rendered = report::finalize_assessment_report(
            &self.bank,
            &self.profile,
            &request,
            &self.assets,
            &self.gateway,
        )
        .await?;
        session.flow.mark_ready()?;
        session.report = Some(rendered);
        Ok(self.render_view(
            &params.session_id,
            &session,
            Some("Assessment completed! You can now download your report."),
        ))
    }
}

#[tool_router]
impl AssessmentServer {
    #[tool(description = "Start an assessment session and return its id with the topic tiles.")]
    async fn start_session(&self) -> Result<Json<AssessmentView>, String> {
        let id = self.sessions.start().await;
        info!(session_id = %id, "assessment session started");
        self.transition(&id, None, |_, _| Ok(())).await
    }

    #[tool(description = "End an assessment session and discard its answers and report.")]
    async fn end_session(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<OkResponse>, String> {
        let ok = self.sessions.end(&params.session_id).await;
        Ok(Json(OkResponse { ok }))
    }

    #[tool(description = "Return the current page of an assessment session without changing it.")]
    async fn view(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<AssessmentView>, String> {
        self.transition(&params.session_id, None, |_, _| Ok(())).await
    }

    #[tool(description = "Open a topic's questionnaire from the topic selection page.")]
    async fn select_topic(
        &self,
        Parameters(params): Parameters<SelectTopicParams>,
    ) -> Result<Json<AssessmentView>, String> {
        self.transition(&params.session_id, None, |bank, flow| {
            flow.select_topic(bank, &params.topic)?;
            Ok(())
        })
        .await
    }

    #[tool(description = "Answer a question of the open topic with a maturity level from 1 to 5. Answering again overwrites the previous level.")]
    async fn answer_question(
        &self,
        Parameters(params): Parameters<AnswerQuestionParams>,
    ) -> Result<Json<AssessmentView>, String> {
        self.transition(&params.session_id, None, |bank, flow| {
            flow.answer(bank, &params.question_id, params.level)?;
            Ok(())
        })
        .await
    }

    #[tool(description = "Mark the open topic as completed and return to topic selection.")]
    async fn submit_topic(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<AssessmentView>, String> {
        self.transition(
            &params.session_id,
            Some("Your assessment has been submitted."),
            |_, flow| {
                let topic = flow.submit_topic()?;
                info!(topic = %topic, "topic completed");
                Ok(())
            },
        )
        .await
    }

    #[tool(description = "Return to topic selection without completing the open topic.")]
    async fn back_to_topics(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<AssessmentView>, String> {
        self.transition(&params.session_id, None, |_, flow| {
            flow.back_to_topics()?;
            Ok(())
        })
        .await
    }

    #[tool(description = "Move to the contact form. Requires at least one completed topic.")]
    async fn generate_report(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<AssessmentView>, String> {
        self.transition(&params.session_id, None, |_, flow| {
            flow.generate_report()?;
            Ok(())
        })
        .await
    }

    #[tool(description = "Submit contact information (name, email, company, phone). Saves the answers and prepares the report PDF.")]
    async fn submit_contact(
        &self,
        Parameters(params): Parameters<ContactParams>,
    ) -> Result<Json<AssessmentView>, String> {
        self.submit(params).await.map(Json).map_err(|e| {
            warn!(error = %e, "assessment submission rejected");
            e.user_message()
        })
    }

    #[tool(description = "Download the assessment report PDF (base64) once it is ready.")]
    async fn download_report(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<ReportDownload>, String> {
        self.sessions
            .with_session(&params.session_id, |session| {
                session.report.as_ref().map(ReportDownload::from)
            })
            .await
            .map_err(|e| AppError::from(e).user_message())?
            .map(Json)
            .ok_or_else(|| "No report available for download.".to_string())
    }
}

#[tool_handler]
impl ServerHandler for AssessmentServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "maturity-assessment".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "{}. Call start_session, then select_topic, answer_question for each question \
                 (levels 1-5) and submit_topic. Repeat for other topics, then generate_report \
                 and submit_contact. download_report returns the PDF as base64.",
                self.profile.title
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use advisory_common::contact::ContactInfo;
    use advisory_common::gateway::{CsvSink, GatewayConfig};
    use base64::Engine;

    use super::*;

    const BANK: &str = r#"{
        "topics": [
            {
                "name": "Process Maturity",
                "description": "How well processes are defined.",
                "questions": [
                    {"id": "Q_a", "question": "Processes are documented."},
                    {"id": "Q_b", "question": "Processes are followed across regions."}
                ]
            },
            {
                "name": "KPI Management",
                "questions": [{"id": "K1", "question": "KPIs are reviewed monthly."}]
            }
        ],
        "scale": {
            "1": "Initial", "2": "Managed", "3": "Defined",
            "4": "Quantitatively Managed", "5": "Optimizing"
        }
    }"#;

    fn profile() -> ReportProfile {
        ReportProfile {
            title: "ERP Maturity Assessment Report".to_string(),
            file_name: "erp_assessment_report.pdf".to_string(),
        }
    }

    fn server_with(gateway: Gateway) -> AssessmentServer {
        AssessmentServer::new(
            QuestionBank::from_json(BANK).unwrap(),
            profile(),
            Assets::default(),
            gateway,
        )
    }

    fn csv_server(path: &std::path::Path) -> AssessmentServer {
        server_with(
            Gateway::new(GatewayConfig::Csv {
                path: path.to_path_buf(),
            })
            .unwrap(),
        )
    }

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            company: "Analytical Engines".to_string(),
            phone: "555-0100".to_string(),
        }
    }

    fn session(id: &str) -> Parameters<SessionParams> {
        Parameters(SessionParams {
            session_id: id.to_string(),
        })
    }

    async fn complete_process_maturity(server: &AssessmentServer, id: &str) {
        server
            .select_topic(Parameters(SelectTopicParams {
                session_id: id.to_string(),
                topic: "Process Maturity".to_string(),
            }))
            .await
            .unwrap();
        server
            .answer_question(Parameters(AnswerQuestionParams {
                session_id: id.to_string(),
                question_id: "Q_a".to_string(),
                level: 4,
            }))
            .await
            .unwrap();
        server.submit_topic(session(id)).await.unwrap();
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = AssessmentServer::tool_router().list_all();
        for name in [
            "start_session",
            "end_session",
            "view",
            "select_topic",
            "answer_question",
            "submit_topic",
            "back_to_topics",
            "generate_report",
            "submit_contact",
            "download_report",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn one_topic_then_report() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("assessments.csv");
        let server = csv_server(&csv);

        let Json(view) = server.start_session().await.unwrap();
        assert_eq!(view.page, AssessmentPage::TopicSelection);
        assert_eq!(view.topics.len(), 2);
        assert_eq!(view.topics[1].description, "Assess your organization's maturity in this area.");
        assert_eq!(view.scale.len(), 5);
        let id = view.session_id;

        let Json(view) = server
            .select_topic(Parameters(SelectTopicParams {
                session_id: id.clone(),
                topic: "Process Maturity".to_string(),
            }))
            .await
            .unwrap();
        let topic = view.current_topic.unwrap();
        assert_eq!(topic.questions.len(), 2);
        assert!(topic.questions.iter().all(|q| q.level.is_none()));

        let Json(view) = server
            .answer_question(Parameters(AnswerQuestionParams {
                session_id: id.clone(),
                question_id: "Q_a".to_string(),
                level: 4,
            }))
            .await
            .unwrap();
        assert_eq!(view.current_topic.unwrap().questions[0].level, Some(4));

        let Json(view) = server.submit_topic(session(&id)).await.unwrap();
        assert_eq!(view.completed_topics, vec!["Process Maturity"]);
        assert!(view.topics[0].completed);
        assert_eq!(view.message.as_deref(), Some("Your assessment has been submitted."));

        let Json(view) = server.generate_report(session(&id)).await.unwrap();
        assert_eq!(view.page, AssessmentPage::ContactInfo);

        let Json(view) = server
            .submit_contact(Parameters(ContactParams {
                session_id: id.clone(),
                contact: contact(),
            }))
            .await
            .unwrap();
        assert_eq!(view.page, AssessmentPage::ReportReady);
        assert!(view.report_ready);

        let Json(download) = server.download_report(session(&id)).await.unwrap();
        assert_eq!(download.file_name, "erp_assessment_report.pdf");
        let pdf = base64::engine::general_purpose::STANDARD
            .decode(download.pdf_base64)
            .unwrap();
        assert_eq!(lopdf::Document::load_mem(&pdf).unwrap().get_pages().len(), 2);

        let saved = std::fs::read_to_string(&csv).unwrap();
        let lines: Vec<&str> = saved.lines().collect();
        assert_eq!(lines[0], "Timestamp,Name,Email,Company,Phone,Q_a,Q_b,K1");
        assert!(lines[1].ends_with(",4,,"));
    }

    #[tokio::test]
    async fn report_requires_a_completed_topic() {
        let dir = tempfile::tempdir().unwrap();
        let server = csv_server(&dir.path().join("assessments.csv"));
        let Json(view) = server.start_session().await.unwrap();
        let err = server.generate_report(session(&view.session_id)).await.err().unwrap();
        assert_eq!(
            err,
            "Please complete at least one topic assessment before generating the report."
        );
    }

    #[tokio::test]
    async fn unknown_topic_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let server = csv_server(&dir.path().join("assessments.csv"));
        let Json(view) = server.start_session().await.unwrap();
        let err = server
            .select_topic(Parameters(SelectTopicParams {
                session_id: view.session_id.clone(),
                topic: "Procss Maturity".to_string(),
            }))
            .await
            .err()
            .unwrap();
        assert_eq!(err, "No questions found for topic: Procss Maturity");

        let Json(view) = server.view(session(&view.session_id)).await.unwrap();
        assert_eq!(view.page, AssessmentPage::TopicSelection);
    }

    #[tokio::test]
    async fn missing_contact_field_keeps_form_open() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("assessments.csv");
        let server = csv_server(&csv);
        let Json(view) = server.start_session().await.unwrap();
        let id = view.session_id;
        complete_process_maturity(&server, &id).await;
        server.generate_report(session(&id)).await.unwrap();

        let mut partial = contact();
        partial.company.clear();
        let err = server
            .submit_contact(Parameters(ContactParams {
                session_id: id.clone(),
                contact: partial,
            }))
            .await
            .err()
            .unwrap();
        assert_eq!(err, "Please fill in all fields.");

        let Json(view) = server.view(session(&id)).await.unwrap();
        assert_eq!(view.page, AssessmentPage::ContactInfo);
        assert!(!csv.exists());
    }

    #[tokio::test]
    async fn omitted_contact_field_keeps_form_open() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("assessments.csv");
        let server = csv_server(&csv);
        let Json(view) = server.start_session().await.unwrap();
        let id = view.session_id;
        complete_process_maturity(&server, &id).await;
        server.generate_report(session(&id)).await.unwrap();

        let params: ContactParams = serde_json::from_value(serde_json::json!({
            "session_id": id,
            "contact": {"name": "Ada", "email": "ada@example.com", "company": "Analytical Engines"}
        }))
        .unwrap();
        let err = server.submit_contact(Parameters(params)).await.err().unwrap();
        assert_eq!(err, "Please fill in all fields.");

        let Json(view) = server.view(session(&id)).await.unwrap();
        assert_eq!(view.page, AssessmentPage::ContactInfo);
        assert!(!view.report_ready);
        assert!(!csv.exists());
    }

    #[tokio::test]
    async fn persistence_failure_keeps_contact_page() {
        let dir = tempfile::tempdir().unwrap();
        // Appending to a directory fails.
        let server = server_with(Gateway::Csv(CsvSink::new(dir.path())));
        let Json(view) = server.start_session().await.unwrap();
        let id = view.session_id;
        complete_process_maturity(&server, &id).await;
        server.generate_report(session(&id)).await.unwrap();

        let err = server
            .submit_contact(Parameters(ContactParams {
                session_id: id.clone(),
                contact: contact(),
            }))
            .await
            .err()
            .unwrap();
        assert_eq!(err, "Failed to save assessment data.");

        let Json(view) = server.view(session(&id)).await.unwrap();
        assert_eq!(view.page, AssessmentPage::ContactInfo);
        assert!(!view.report_ready);
        assert_eq!(
            server.download_report(session(&id)).await.err().unwrap(),
            "No report available for download."
        );
    }

    #[tokio::test]
    async fn back_to_topics_leaves_topic_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let server = csv_server(&dir.path().join("assessments.csv"));
        let Json(view) = server.start_session().await.unwrap();
        let id = view.session_id;
        server
            .select_topic(Parameters(SelectTopicParams {
                session_id: id.clone(),
                topic: "KPI Management".to_string(),
            }))
            .await
            .unwrap();
        let Json(view) = server.back_to_topics(session(&id)).await.unwrap();
        assert_eq!(view.page, AssessmentPage::TopicSelection);
        assert!(view.completed_topics.is_empty());

        let Json(ok) = server.end_session(session(&id)).await.unwrap();
        assert!(ok.ok);
        assert!(server.view(session(&id)).await.is_err());
    }
}
