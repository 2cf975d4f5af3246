//! Model inventory polling and default-variant selection

use ace_common::api::{ModelInventoryEntry, ModelVariant};
use ace_common::events::{EventBus, StudioEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::BackendError;
use crate::types::ModelInventorySource;

/// Which DiT variants are installed and ready
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VariantAvailability {
    pub base: bool,
    pub turbo: bool,
    pub shift: bool,
}

impl VariantAvailability {
    /// A variant is available when `dit-<variant>` reports status "available"
    pub fn from_inventory(entries: &[ModelInventoryEntry]) -> Self {
        let available = |variant: ModelVariant| {
            let id = variant.checkpoint_id();
            entries
                .iter()
                .any(|entry| entry.id == id && entry.is_available())
        };

        Self {
            base: available(ModelVariant::Base),
            turbo: available(ModelVariant::Turbo),
            shift: available(ModelVariant::Shift),
        }
    }

    pub fn is_available(&self, variant: ModelVariant) -> bool {
        match variant {
            ModelVariant::Base => self.base,
            ModelVariant::Turbo => self.turbo,
            ModelVariant::Shift => self.shift,
        }
    }
}

/// Preferred if available, else first available in preference order, else preferred
pub fn pick_default_variant(preferred: ModelVariant, availability: VariantAvailability) -> ModelVariant {
    if availability.is_available(preferred) {
        return preferred;
    }
    ModelVariant::PREFERENCE_ORDER
        .into_iter()
        .find(|variant| availability.is_available(*variant))
        .unwrap_or(preferred)
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryStatus {
    pub availability: VariantAvailability,
    pub default_variant: ModelVariant,
    pub preferred_variant: ModelVariant,
    pub last_polled_at: Option<DateTime<Utc>>,
}

pub struct ModelInventoryPoller {
    source: Arc<dyn ModelInventorySource>,
    event_bus: EventBus,
    preferred: ModelVariant,
    status: RwLock<InventoryStatus>,
}

impl ModelInventoryPoller {
    pub fn new(
        source: Arc<dyn ModelInventorySource>,
        event_bus: EventBus,
        preferred: ModelVariant,
    ) -> Self {
        Self {
            source,
            event_bus,
            preferred,
            status: RwLock::new(InventoryStatus {
                availability: VariantAvailability::default(),
                default_variant: preferred,
                preferred_variant: preferred,
                last_polled_at: None,
            }),
        }
    }

    /// Poll once; on failure the previous availability is kept
    pub async fn tick(&self) -> Result<ModelVariant, BackendError> {
        let entries = self.source.list_model_inventory().await?;
        let availability = VariantAvailability::from_inventory(&entries);
        let default_variant = pick_default_variant(self.preferred, availability);

        let changed = {
            let mut status = self.status.write().await;
            let changed = status.default_variant != default_variant;
            status.availability = availability;
            status.default_variant = default_variant;
            status.last_polled_at = Some(Utc::now());
            changed
        };

        debug!(?availability, default = %default_variant, "Model inventory polled");
        if changed {
            info!(variant = %default_variant, "Default model variant changed");
            self.event_bus.emit_lossy(StudioEvent::DefaultVariantChanged {
                variant: default_variant.to_string(),
                timestamp: Utc::now(),
            });
        }
        Ok(default_variant)
    }

    pub async fn tick_logged(&self) {
        if let Err(e) = self.tick().await {
            warn!(error = %e, "Model inventory poll failed; keeping previous availability");
        }
    }

    pub async fn availability(&self) -> VariantAvailability {
        self.status.read().await.availability
    }

    pub async fn default_variant(&self) -> ModelVariant {
        self.status.read().await.default_variant
    }

    pub async fn status(&self) -> InventoryStatus {
        self.status.read().await.clone()
    }
}
