/// Strategy catalog: goal → methods, (goal, method) → tools / use cases / partners,
/// goal → KPIs.
///
/// The catalog is parsed and validated once at load time; afterwards it is immutable and
/// every lookup fails closed (empty result plus a log line) instead of panicking.
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::CommonError;

/// Tools, use cases and partners recommended for one (goal, method) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSet {
    pub tools: Vec<String>,
    pub use_cases: Vec<String>,
    pub partners: Vec<String>,
}

impl ToolSet {
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.use_cases.is_empty() && self.partners.is_empty()
    }
}

/// One goal entry as stored in the catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct GoalEntry {
    pub methods: Vec<String>,
    pub kpis: Vec<String>,
    /// Keyed by method name.
    pub tools: IndexMap<String, ToolSet>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    goals: IndexMap<String, GoalEntry>,
}

impl Catalog {
    /// Read and validate a catalog file.
    pub fn load(path: &Path) -> Result<Self, CommonError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CommonError::InvalidCatalog(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CommonError> {
        let goals: IndexMap<String, GoalEntry> = serde_json::from_str(content)?;
        let catalog = Self { goals };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CommonError> {
        if self.goals.is_empty() {
            return Err(CommonError::InvalidCatalog("catalog has no goals".to_string()));
        }
        for (goal, entry) in &self.goals {
            if goal.trim().is_empty() {
                return Err(CommonError::InvalidCatalog("empty goal name".to_string()));
            }
            for method in &entry.methods {
                if !entry.tools.contains_key(method) {
                    return Err(CommonError::InvalidCatalog(format!(
                        "method '{method}' under goal '{goal}' has no tools entry"
                    )));
                }
            }
            for method in entry.tools.keys() {
                if !entry.methods.contains(method) {
                    warn!(goal, method, "tools entry for a method not listed under the goal");
                }
            }
        }
        Ok(())
    }

    /// Goal labels in file order.
    pub fn goals(&self) -> Vec<String> {
        self.goals.keys().cloned().collect()
    }

    pub fn contains_goal(&self, goal: &str) -> bool {
        self.goals.contains_key(goal)
    }

    /// Methods available under `goal`. Unknown goals yield an empty list.
    pub fn methods_for(&self, goal: &str) -> Vec<String> {
        match self.goals.get(goal) {
            Some(entry) => entry.methods.clone(),
            None => {
                warn!(goal, "goal not found in catalog");
                Vec::new()
            }
        }
    }

    /// Tool set for a (goal, method) pair. Absent pairs yield three empty lists.
    pub fn tools_for(&self, goal: &str, method: &str) -> ToolSet {
        match self.goals.get(goal).and_then(|entry| entry.tools.get(method)) {
            Some(set) => set.clone(),
            None => {
                error!(goal, method, "method not found under goal");
                ToolSet::default()
            }
        }
    }

    /// KPIs available under `goal`. Unknown goals yield an empty list.
    pub fn kpis_for(&self, goal: &str) -> Vec<String> {
        match self.goals.get(goal) {
            Some(entry) => entry.kpis.clone(),
            None => {
                warn!(goal, "goal not found in catalog");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_CATALOG: &str = r#"{
    "Increase Efficiency": {
        "methods": ["Automate Processes", "Lean Engineering"],
        "kpis": ["Cycle Time", "Cost per Unit"],
        "tools": {
            "Automate Processes": {
                "tools": ["RPA", "Workflow Engine"],
                "use_cases": ["Invoice Processing"],
                "partners": ["VendorX"]
            },
            "Lean Engineering": {
                "tools": ["Value Stream Mapping"],
                "use_cases": ["Design Reviews", "Test Planning"],
                "partners": ["VendorY", "VendorZ"]
            }
        }
    },
    "Accelerate Innovation": {
        "methods": ["Generative Design"],
        "kpis": ["Time to Market"],
        "tools": {
            "Generative Design": {
                "tools": ["CAD Copilot"],
                "use_cases": ["Concept Exploration"],
                "partners": ["VendorQ"]
            }
        }
    }
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        Catalog::from_json(SAMPLE_CATALOG).expect("sample catalog is valid")
    }

    #[test]
    fn goals_keep_file_order() {
        assert_eq!(
            sample().goals(),
            vec!["Increase Efficiency".to_string(), "Accelerate Innovation".to_string()]
        );
    }

    #[test]
    fn methods_for_known_and_unknown_goals() {
        let catalog = sample();
        assert_eq!(
            catalog.methods_for("Increase Efficiency"),
            vec!["Automate Processes".to_string(), "Lean Engineering".to_string()]
        );
        assert!(catalog.methods_for("Reduce Headcount").is_empty());
    }

    #[test]
    fn tools_for_present_pair_matches_source() {
        let set = sample().tools_for("Increase Efficiency", "Automate Processes");
        assert_eq!(set.tools, vec!["RPA", "Workflow Engine"]);
        assert_eq!(set.use_cases, vec!["Invoice Processing"]);
        assert_eq!(set.partners, vec!["VendorX"]);
    }

    #[test]
    fn tools_for_absent_pair_is_empty() {
        let catalog = sample();
        assert!(catalog.tools_for("Increase Efficiency", "Generative Design").is_empty());
        assert!(catalog.tools_for("Unknown", "Automate Processes").is_empty());
    }

    #[test]
    fn kpis_belong_to_goal() {
        let catalog = sample();
        assert_eq!(catalog.kpis_for("Increase Efficiency"), vec!["Cycle Time", "Cost per Unit"]);
        assert!(catalog.kpis_for("nope").is_empty());
    }

    #[test]
    fn method_without_tools_entry_is_rejected() {
        let json = r#"{"G": {"methods": ["M"], "kpis": [], "tools": {}}}"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CommonError::InvalidCatalog(_)), "{err}");
    }

    #[test]
    fn missing_keys_fail_at_load() {
        let json = r#"{"G": {"methods": ["M"], "tools": {"M": {"tools": [], "use_cases": [], "partners": []}}}}"#;
        assert!(matches!(Catalog::from_json(json), Err(CommonError::Json(_))));
    }
}
