//! Built-in tool implementations for threadclaw.
//!
//! Tools give the agent the ability to act on a request: do math, read
//! the clock, and query the local reference index. Agent profiles pick
//! which of these are advertised to the model on a given run.

pub mod calculator;
pub mod clock;
pub mod lookup;

use threadclaw_core::tool::ToolCatalog;

pub use calculator::CalculatorTool;
pub use clock::ClockTool;
pub use lookup::LookupTool;

/// Create a default tool catalog with all built-in tools.
pub fn default_catalog() -> ToolCatalog {
    let mut catalog = ToolCatalog::new();
    catalog.register(Box::new(CalculatorTool));
    catalog.register(Box::new(ClockTool));
    catalog.register(Box::new(LookupTool));
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_builtins() {
        let catalog = default_catalog();
        assert!(catalog.get("calculator").is_some());
        assert!(catalog.get("clock").is_some());
        assert!(catalog.get("lookup").is_some());
        assert_eq!(catalog.len(), 3);
    }
}
