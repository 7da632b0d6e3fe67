//! Tool registry - the immutable name -> tool mapping advertised to the model

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::{ArithmeticOp, ArithmeticTool, NewsTool, PriceTool, Tool, ToolHttp, ToolName, WeatherTool};
use crate::error::{ChatError, Result};
use crate::llm::FunctionDeclaration;

/// Holds one executor per tool; read-only once built, shared without locking
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry (for custom tool sets)
    pub fn new() -> Self {
        Self { tools: BTreeMap::new() }
    }

    /// Registry with every standard tool
    pub fn standard(http: Arc<ToolHttp>) -> Self {
        let mut registry = Self::new();

        for op in ArithmeticOp::ALL {
            registry.insert(Arc::new(ArithmeticTool::new(op)));
        }
        registry.insert(Arc::new(PriceTool::new(http.clone())));
        registry.insert(Arc::new(WeatherTool::new(http.clone())));
        registry.insert(Arc::new(NewsTool::new(http)));

        registry
    }

    /// Add a tool, keyed by its descriptor name; a repeated name replaces the earlier tool
    pub fn insert(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.descriptor().name, tool);
    }

    /// Resolve a model-supplied name
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let name: ToolName = name.parse().ok()?;
        self.tools.get(&name).cloned()
    }

    /// Manifest advertised to the model, in `ToolName::ALL` order
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools.values().map(|t| t.descriptor().declaration()).collect()
    }

    /// Check that the manifest covers every tool and each schema is well formed
    ///
    /// Tools are keyed by their own descriptor name, so a registered tool can
    /// never disagree with its manifest entry.
    pub fn verify(&self) -> Result<()> {
        let missing: Vec<&str> = ToolName::ALL
            .iter()
            .filter(|name| !self.tools.contains_key(*name))
            .map(|name| name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(ChatError::Config(format!(
                "tools advertised but not registered: {}",
                missing.join(", ")
            )));
        }

        for (name, tool) in &self.tools {
            let descriptor = tool.descriptor();
            let mut seen = HashSet::new();
            if let Some(dup) = descriptor.params.iter().find(|p| !seen.insert(p.name)) {
                return Err(ChatError::Config(format!(
                    "tool {} declares parameter '{}' twice",
                    name, dup.name
                )));
            }
        }

        Ok(())
    }

    /// Get the list of tool names
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.keys().map(|name| name.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
