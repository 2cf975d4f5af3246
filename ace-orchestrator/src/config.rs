//! Configuration resolution for ace-orchestrator
//!
//! Backend URL: CLI → ENV → TOML → default.
//! Provider settings: TOML override → backend `/api/config` → defaults.

use ace_common::api::{BackendConfig, ModelVariant};
use ace_common::config::{TomlConfig, BACKEND_URL_ENV, DEFAULT_BACKEND_URL};
use serde::Serialize;
use tracing::{info, warn};

use crate::types::BackendConfigSource;

/// Resolve the backend base URL from 4 tiers
///
/// **Priority:** CLI → ENV → TOML → default
pub fn resolve_backend_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> String {
    let env_url = std::env::var(BACKEND_URL_ENV).ok();
    resolve_backend_url_from(cli_arg, env_url.as_deref(), toml_config.backend_url.as_deref())
}

fn resolve_backend_url_from(
    cli_arg: Option<&str>,
    env_url: Option<&str>,
    toml_url: Option<&str>,
) -> String {
    fn non_empty(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    let tiers = [
        ("command line", non_empty(cli_arg)),
        ("environment", non_empty(env_url)),
        ("TOML", non_empty(toml_url)),
    ];

    let sources: Vec<&str> = tiers
        .iter()
        .filter(|(_, value)| value.is_some())
        .map(|(name, _)| *name)
        .collect();
    if sources.len() > 1 {
        warn!(
            "Backend URL found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    match tiers.into_iter().find_map(|(name, value)| value.map(|v| (name, v))) {
        Some((name, url)) => {
            info!("Backend URL loaded from {}: {}", name, url);
            url.trim_end_matches('/').to_string()
        }
        None => {
            info!("Backend URL not configured, using default {}", DEFAULT_BACKEND_URL);
            DEFAULT_BACKEND_URL.to_string()
        }
    }
}

/// Effective image provider and preferred model variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSettings {
    /// "none" disables the image-prompt step
    pub image_generation_provider: String,
    pub preferred_variant: ModelVariant,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            image_generation_provider: "none".to_string(),
            preferred_variant: ModelVariant::Turbo,
        }
    }
}

impl ProviderSettings {
    /// Merge TOML overrides over the backend's own configuration
    pub fn merge(toml_config: &TomlConfig, backend: Option<&BackendConfig>) -> Self {
        let defaults = Self::default();

        let toml_variant = toml_config.default_model_variant.as_deref().and_then(|v| {
            v.parse::<ModelVariant>()
                .map_err(|e| warn!("Ignoring TOML default_model_variant: {}", e))
                .ok()
        });

        let image_generation_provider = toml_config
            .image_generation_provider
            .clone()
            .or_else(|| backend.map(|b| b.image_generation_provider.clone()))
            .unwrap_or(defaults.image_generation_provider);

        let preferred_variant = toml_variant
            .or_else(|| backend.and_then(BackendConfig::preferred_variant))
            .unwrap_or(defaults.preferred_variant);

        Self {
            image_generation_provider,
            preferred_variant,
        }
    }

    /// Fetch the backend configuration and merge; fetch failure is not fatal
    pub async fn resolve(toml_config: &TomlConfig, source: &dyn BackendConfigSource) -> Self {
        let backend = match source.fetch_config().await {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "Backend config unavailable; image prompt generation disabled unless overridden");
                None
            }
        };

        let settings = Self::merge(toml_config, backend.as_ref());
        info!(
            provider = %settings.image_generation_provider,
            variant = %settings.preferred_variant,
            "Provider settings resolved"
        );
        settings
    }
}
