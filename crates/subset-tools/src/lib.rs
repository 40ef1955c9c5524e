pub mod analytics;
pub mod link;
pub mod query;

pub use analytics::{AnalyticsResult, AnalyticsTool, LinkReporter};
pub use query::{AnalyticsQuery, Sort};

use std::sync::Arc;
use subset_core::config::AppConfig;
use subset_core::error::AgentError;
use subset_core::tool_registry::ToolRegistry;

/// Register the analytics tool, the only capability bound to the model.
pub fn register_all(
    registry: &mut ToolRegistry,
    config: &AppConfig,
    reporter: LinkReporter,
) -> Result<(), AgentError> {
    registry.register(Arc::new(AnalyticsTool::new(&config.analytics, reporter)?));
    Ok(())
}
