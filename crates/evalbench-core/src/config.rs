use crate::judge::{GradingConfig, GradingPolicy};
use crate::providers::llm::fake::FakeClient;
use crate::providers::llm::openrouter::{self, OpenRouterClient};
use crate::providers::llm::LlmClient;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

pub mod seed;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct EvalbenchConfig {
    /// `None` selects mock grading.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// `None` means persistence is not configured.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Canned model reply for offline runs. Takes precedence over the API key.
    pub fake_reply: Option<String>,
}

impl Default for EvalbenchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: openrouter::DEFAULT_MODEL.to_string(),
            base_url: openrouter::DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            db_path: None,
            log_level: "warn".to_string(),
            fake_reply: None,
        }
    }
}

impl EvalbenchConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Defaults, then overrides from `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        let mut cfg = Self::default();
        if let Some(v) = get(openrouter::API_KEY_VAR) {
            cfg.api_key = Some(v.trim().to_string());
        }
        if let Some(v) = get("OPENROUTER_MODEL") {
            cfg.model = v;
        }
        if let Some(v) = get("OPENROUTER_BASE_URL") {
            cfg.base_url = v;
        }
        if let Some(v) = get("EVALBENCH_TIMEOUT_SECS") {
            match v.trim().parse() {
                Ok(n) if n > 0 => cfg.timeout_secs = n,
                _ => tracing::warn!(event = "config_ignored", key = "EVALBENCH_TIMEOUT_SECS", value = %v),
            }
        }
        if let Some(v) = get("EVALBENCH_DB") {
            cfg.db_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("EVALBENCH_LOG") {
            cfg.log_level = v;
        }
        if let Some(v) = get("EVALBENCH_FAKE_REPLY") {
            cfg.fake_reply = Some(v);
        }
        cfg
    }

    pub fn generator(&self) -> Option<Arc<dyn LlmClient>> {
        if let Some(reply) = &self.fake_reply {
            return Some(Arc::new(FakeClient::new(reply.clone())));
        }
        let key = self.api_key.as_deref().filter(|k| !k.is_empty())?;
        let client = OpenRouterClient::new(self.model.clone(), key.to_string())
            .with_base_url(self.base_url.clone());
        Some(Arc::new(client))
    }

    /// Grading policy for this configuration: AI mode when a key or a fake
    /// reply is present, mock mode otherwise.
    pub fn build_policy(&self) -> GradingPolicy {
        let generator = self.generator();
        let provider = generator.as_ref().map(|g| g.provider_name()).unwrap_or("none");
        let policy = GradingPolicy::new(
            GradingConfig {
                timeout_secs: self.timeout_secs,
            },
            generator,
        );
        tracing::info!(event = "grading_mode", mode = ?policy.mode(), provider, model = %self.model);
        policy
    }
}
