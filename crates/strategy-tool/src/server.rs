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
use advisory_common::canvas::Assets;
use advisory_common::catalog::Catalog;
use advisory_common::compose;
use advisory_common::gateway::Gateway;
use advisory_common::report::{self, RenderedReport};
use advisory_common::session::{SessionId, SessionStore};
use advisory_common::strategy::{StrategySelection, StrategyStage};

use crate::error::AppError;

/// Per-user context: the current selection and the last finished report.
#[derive(Debug, Default)]
pub struct StrategySession {
    selection: StrategySelection,
    report: Option<RenderedReport>,
}

#[derive(Clone)]
pub struct StrategyServer {
    catalog: Arc<Catalog>,
    assets: Arc<Assets>,
    gateway: Arc<Gateway>,
    sessions: SessionStore<StrategySession>,
    tool_router: ToolRouter<StrategyServer>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ChooseGoalParams {
    session_id: SessionId,
    goal: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ChooseMethodParams {
    session_id: SessionId,
    method: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ChooseToolParams {
    session_id: SessionId,
    tool: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ChooseKpiParams {
    session_id: SessionId,
    kpi: String,
}

/// What the client should render after an interaction.
#[derive(Debug, Serialize, JsonSchema)]
pub struct StrategyView {
    session_id: SessionId,
    stage: StrategyStage,
    goals: Vec<String>,
    goal: Option<String>,
    methods: Vec<String>,
    method: Option<String>,
    tools: Vec<String>,
    tool: Option<String>,
    kpis: Vec<String>,
    kpi: Option<String>,
    use_cases: Vec<String>,
    partners: Vec<String>,
    /// Full strategy sentence once every dropdown has a value.
    statement: Option<String>,
    /// Next thing the user has to do.
    prompt: String,
    report_ready: bool,
}

impl StrategyServer {
    pub fn new(catalog: Catalog, assets: Assets, gateway: Gateway) -> Self {
        Self {
            catalog: Arc::new(catalog),
            assets: Arc::new(assets),
            gateway: Arc::new(gateway),
            sessions: SessionStore::new(),
            tool_router: Self::tool_router(),
        }
    }

    fn view(&self, session_id: &str, session: &StrategySession) -> StrategyView {
        let selection = &session.selection;
        let stage = selection.stage();
        let tool_set = selection.tool_set();
        let prompt = match stage {
            StrategyStage::Start => "Please select a goal.",
            StrategyStage::GoalChosen => "Please select a method.",
            StrategyStage::MethodChosen => "Please select a tool.",
            StrategyStage::ToolChosen => "Please select a KPI.",
            StrategyStage::KpiChosen if session.report.is_some() => {
                "Your report is ready for download."
            }
            StrategyStage::KpiChosen => {
                "Please provide your contact information to download the report."
            }
        };
        StrategyView {
            session_id: session_id.to_string(),
            stage,
            goals: self.catalog.goals(),
            goal: selection.goal().map(str::to_string),
            methods: selection.method_options().to_vec(),
            method: selection.method().map(str::to_string),
            tools: tool_set.tools.clone(),
            tool: selection.tool().map(str::to_string),
            kpis: selection.kpi_options().to_vec(),
            kpi: selection.kpi().map(str::to_string),
            use_cases: tool_set.use_cases.clone(),
            partners: tool_set.partners.clone(),
            statement: selection
                .summary()
                .ok()
                .map(|summary| compose::statement_text(&summary)),
            prompt: prompt.to_string(),
            report_ready: session.report.is_some(),
        }
    }

    /// Run a synchronous selection change and return the resulting view. Any change
    /// invalidates a previously generated report.
    async fn update(
        &self,
        session_id: &str,
        f: impl FnOnce(&Catalog, &mut StrategySelection) -> Result<(), AppError>,
    ) -> Result<StrategyView, AppError> {
        self.sessions
            .with_session(session_id, |session| -> Result<StrategyView, AppError> {
                f(&self.catalog, &mut session.selection)?;
                session.report = None;
                Ok(self.view(session_id, session))
            })
            .await?
    }

    async fn submit(&self, params: ContactParams) -> Result<StrategyView, AppError> {
        let session = self.sessions.session(&params.session_id).await?;
        let mut session = session.lock().await;
        let summary = session.selection.summary()?;
        let contact = params.contact.validated()?;

        let rendered =
            report::finalize_strategy_report(&summary, &contact, &self.assets, &self.gateway).await?;
        session.report = Some(rendered);
        Ok(self.view(&params.session_id, &session))
    }
}

#[tool_router]
impl StrategyServer {
    #[tool(description = "Start a strategy session and return its id with the list of goals.")]
    async fn start_session(&self) -> Result<Json<StrategyView>, String> {
        let id = self.sessions.start().await;
        info!(session_id = %id, "strategy session started");
        self.sessions
            .with_session(&id, |session| self.view(&id, session))
            .await
            .map(Json)
            .map_err(|e| AppError::from(e).user_message())
    }

    #[tool(description = "End a strategy session and discard its selections and report.")]
    async fn end_session(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<OkResponse>, String> {
        let ok = self.sessions.end(&params.session_id).await;
        Ok(Json(OkResponse { ok }))
    }

    #[tool(description = "Choose the transformation goal. Resets method, tool and KPI and returns the goal's methods.")]
    async fn choose_goal(
        &self,
        Parameters(params): Parameters<ChooseGoalParams>,
    ) -> Result<Json<StrategyView>, String> {
        self.update(&params.session_id, |catalog, selection| {
            selection.choose_goal(catalog, &params.goal);
            Ok(())
        })
        .await
        .map(Json)
        .map_err(|e| e.user_message())
    }

    #[tool(description = "Choose a method for the current goal. Returns its tools, recommended use cases and partners.")]
    async fn choose_method(
        &self,
        Parameters(params): Parameters<ChooseMethodParams>,
    ) -> Result<Json<StrategyView>, String> {
        self.update(&params.session_id, |catalog, selection| {
            selection.choose_method(catalog, &params.method)?;
            Ok(())
        })
        .await
        .map(Json)
        .map_err(|e| e.user_message())
    }

    #[tool(description = "Choose one of the tools offered for the current method. Returns the goal's KPIs.")]
    async fn choose_tool(
        &self,
        Parameters(params): Parameters<ChooseToolParams>,
    ) -> Result<Json<StrategyView>, String> {
        self.update(&params.session_id, |catalog, selection| {
            selection.choose_tool(catalog, &params.tool)?;
            Ok(())
        })
        .await
        .map(Json)
        .map_err(|e| e.user_message())
    }

    #[tool(description = "Choose the KPI success will be evaluated by. Completes the strategy statement.")]
    async fn choose_kpi(
        &self,
        Parameters(params): Parameters<ChooseKpiParams>,
    ) -> Result<Json<StrategyView>, String> {
        self.update(&params.session_id, |_, selection| {
            selection.choose_kpi(&params.kpi)?;
            Ok(())
        })
        .await
        .map(Json)
        .map_err(|e| e.user_message())
    }

    #[tool(description = "Submit contact information (name, email, company, phone). Saves the submission and prepares the strategy report PDF.")]
    async fn submit_contact(
        &self,
        Parameters(params): Parameters<ContactParams>,
    ) -> Result<Json<StrategyView>, String> {
        self.submit(params).await.map(Json).map_err(|e| {
            warn!(error = %e, "strategy submission rejected");
            e.user_message()
        })
    }

    #[tool(description = "Download the strategy report PDF (base64) once contact information has been submitted.")]
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
impl ServerHandler for StrategyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "strategy-tool".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tailored AI Strategy Tool. Call start_session, then choose_goal, choose_method, \
                 choose_tool and choose_kpi in order; each returns the options for the next step. \
                 submit_contact saves the submission and prepares the report, which \
                 download_report returns as a base64 PDF."
                    .to_string(),
            ),
        }
    }
}
