//! Provider router — selects the correct LLM provider based on config.
//!
//! Handles provider creation and resolves the provider the pipeline talks
//! to: either the default provider alone, or a [`FallbackProvider`] walking
//! the configured `fallback_chain`.

use crate::fallback::FallbackProvider;
use crate::openai_compat::OpenAiCompatProvider;
use ragraph_config::{AppConfig, ProviderConfig};
use ragraph_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, (Arc<dyn Provider>, Duration)>,
    default_provider: String,
    fallback_chain: Vec<String>,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
            fallback_chain: Vec::new(),
        }
    }

    /// Register a provider along with its per-call timeout.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn Provider>,
        timeout: Duration,
    ) {
        self.providers.insert(name.into(), (provider, timeout));
    }

    /// Providers to try after the default one, in order.
    pub fn with_fallback_chain(mut self, chain: Vec<String>) -> Self {
        self.fallback_chain = chain;
        self
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.get(&self.default_provider)
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).map(|(p, _)| p.clone())
    }

    /// The provider the pipeline should use.
    ///
    /// With an empty fallback chain this is just the default provider.
    /// Otherwise the default provider heads a [`FallbackProvider`] followed
    /// by every chained provider that is registered; unknown names are skipped.
    pub fn primary(&self) -> Option<Arc<dyn Provider>> {
        if self.fallback_chain.is_empty() {
            return self.default();
        }

        let mut order = vec![self.default_provider.as_str()];
        for name in &self.fallback_chain {
            if !order.contains(&name.as_str()) {
                order.push(name);
            }
        }

        let mut fallback = FallbackProvider::new("fallback");
        for name in order {
            match self.providers.get(name) {
                Some((provider, timeout)) => {
                    fallback = fallback.add(provider.clone(), *timeout);
                }
                None => debug!(provider = name, "Skipping unregistered provider in fallback chain"),
            }
        }

        if fallback.is_empty() {
            None
        } else {
            Some(Arc::new(fallback))
        }
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider)
        .with_fallback_chain(config.fallback_chain.clone());

    for (name, provider_config) in &config.providers {
        let (provider, timeout) = build_provider(name, provider_config, config);
        router.register(name.clone(), provider, timeout);
    }

    // Ensure the default provider and every chained provider exist,
    // even if not explicitly configured
    let implicit: Vec<String> = std::iter::once(config.default_provider.clone())
        .chain(config.fallback_chain.iter().cloned())
        .collect();
    for name in implicit {
        if router.get(&name).is_none() {
            let (provider, timeout) = build_provider(&name, &ProviderConfig::default(), config);
            router.register(name, provider, timeout);
        }
    }

    router
}

fn build_provider(
    name: &str,
    provider_config: &ProviderConfig,
    config: &AppConfig,
) -> (Arc<dyn Provider>, Duration) {
    let api_key = provider_config
        .api_key
        .clone()
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();

    let base_url = provider_config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(name));

    let timeout = Duration::from_secs(provider_config.timeout_secs);
    let provider = OpenAiCompatProvider::with_timeout(name, base_url, api_key, timeout);
    (Arc::new(provider), timeout)
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
