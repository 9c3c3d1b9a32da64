//! Resolved agent profiles.
//!
//! An [`AgentProfile`] is the merge of a named profile from configuration
//! with the run defaults: the model falls back to the backend default and
//! the iteration budget to the configured run default.

use threadclaw_config::AppConfig;
use threadclaw_core::error::{Error, Result};

/// A fully resolved profile, ready to drive a run.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    /// Profile name as configured
    pub id: String,

    /// System prompt seeded into new threads
    pub system_prompt: String,

    /// Model sent with every chat request
    pub model: String,

    /// Tool names this profile may call; empty disables tool use
    pub tools: Vec<String>,

    /// Iteration budget per run
    pub max_iterations: u32,
}

impl AgentProfile {
    /// Look up `agent_id` in the config and merge in the defaults.
    pub fn resolve(config: &AppConfig, agent_id: &str) -> Result<Self> {
        let profile = config
            .agents
            .get(agent_id)
            .ok_or_else(|| Error::UnknownAgent(agent_id.to_string()))?;

        Ok(Self {
            id: agent_id.to_string(),
            system_prompt: profile.system_prompt.clone(),
            model: profile
                .model
                .clone()
                .unwrap_or_else(|| config.backend.model.clone()),
            tools: profile.tools.clone(),
            max_iterations: profile.max_iterations.unwrap_or(config.agent.max_iterations),
        })
    }
}
