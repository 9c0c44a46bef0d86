/// Strategy selection state machine: goal → method → tool → KPI.
///
/// Choosing a value resets every selection below it. Lookup misses leave the
/// selection blocked at the previous stage and return empty option lists.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{Catalog, ToolSet};
use crate::error::CommonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StrategyStage {
    Start,
    GoalChosen,
    MethodChosen,
    ToolChosen,
    KpiChosen,
}

#[derive(Debug, Clone, Default)]
pub struct StrategySelection {
    goal: Option<String>,
    methods: Vec<String>,
    method: Option<String>,
    tool_set: ToolSet,
    tool: Option<String>,
    kpis: Vec<String>,
    kpi: Option<String>,
}

/// A complete selection, ready for composition and persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategySummary {
    pub goal: String,
    pub method: String,
    pub tool: String,
    pub kpi: String,
    pub use_cases: Vec<String>,
    pub partners: Vec<String>,
}

impl StrategySelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> StrategyStage {
        match (&self.goal, &self.method, &self.tool, &self.kpi) {
            (None, ..) => StrategyStage::Start,
            (Some(_), None, ..) => StrategyStage::GoalChosen,
            (Some(_), Some(_), None, _) => StrategyStage::MethodChosen,
            (Some(_), Some(_), Some(_), None) => StrategyStage::ToolChosen,
            (Some(_), Some(_), Some(_), Some(_)) => StrategyStage::KpiChosen,
        }
    }

    /// Select a goal and return its methods. An unknown goal clears the selection
    /// and yields an empty list.
    pub fn choose_goal(&mut self, catalog: &Catalog, goal: &str) -> Vec<String> {
        *self = Self::default();
        if !catalog.contains_goal(goal) {
            warn!(goal, "goal not found, selection blocked");
            return Vec::new();
        }
        self.methods = catalog.methods_for(goal);
        self.goal = Some(goal.to_string());
        self.methods.clone()
    }

    /// Select a method under the current goal and return its tool set. An absent
    /// (goal, method) pair leaves the method unselected and yields three empty lists.
    pub fn choose_method(&mut self, catalog: &Catalog, method: &str) -> Result<ToolSet, CommonError> {
        let goal = self
            .goal
            .clone()
            .ok_or_else(|| CommonError::Validation("Please select a goal.".to_string()))?;

        self.clear_from_method();
        let tool_set = catalog.tools_for(&goal, method);
        if tool_set.is_empty() {
            return Ok(tool_set);
        }
        self.method = Some(method.to_string());
        self.tool_set = tool_set.clone();
        Ok(tool_set)
    }

    /// Select a tool among the options offered for the current method and return
    /// the goal's KPIs.
    pub fn choose_tool(&mut self, catalog: &Catalog, tool: &str) -> Result<Vec<String>, CommonError> {
        let goal = match (&self.goal, &self.method) {
            (Some(goal), Some(_)) => goal.clone(),
            _ => return Err(CommonError::Validation("Please select a method.".to_string())),
        };
        if !self.tool_set.tools.iter().any(|t| t == tool) {
            return Err(CommonError::Validation(format!(
                "'{tool}' is not one of the offered tools"
            )));
        }
        self.tool = Some(tool.to_string());
        self.kpi = None;
        self.kpis = catalog.kpis_for(&goal);
        Ok(self.kpis.clone())
    }

    pub fn choose_kpi(&mut self, kpi: &str) -> Result<(), CommonError> {
        if self.tool.is_none() {
            return Err(CommonError::Validation("Please select a tool.".to_string()));
        }
        if !self.kpis.iter().any(|k| k == kpi) {
            return Err(CommonError::Validation(format!(
                "'{kpi}' is not one of the offered KPIs"
            )));
        }
        self.kpi = Some(kpi.to_string());
        Ok(())
    }

    fn clear_from_method(&mut self) {
        self.method = None;
        self.tool_set = ToolSet::default();
        self.tool = None;
        self.kpis.clear();
        self.kpi = None;
    }

    pub fn goal(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn tool(&self) -> Option<&str> {
        self.tool.as_deref()
    }

    pub fn kpi(&self) -> Option<&str> {
        self.kpi.as_deref()
    }

    /// Methods offered for the current goal.
    pub fn method_options(&self) -> &[String] {
        &self.methods
    }

    pub fn tool_set(&self) -> &ToolSet {
        &self.tool_set
    }

    /// KPIs offered once a tool is chosen.
    pub fn kpi_options(&self) -> &[String] {
        &self.kpis
    }

    pub fn summary(&self) -> Result<StrategySummary, CommonError> {
        match (&self.goal, &self.method, &self.tool, &self.kpi) {
            (Some(goal), Some(method), Some(tool), Some(kpi)) => Ok(StrategySummary {
                goal: goal.clone(),
                method: method.clone(),
                tool: tool.clone(),
                kpi: kpi.clone(),
                use_cases: self.tool_set.use_cases.clone(),
                partners: self.tool_set.partners.clone(),
            }),
            _ => Err(CommonError::Validation(
                "Please complete the goal, method, tool and KPI selection.".to_string(),
            )),
        }
    }
}
