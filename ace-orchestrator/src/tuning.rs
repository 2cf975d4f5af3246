//! Slider → model sampling parameter mapping
//!
//! Both sliders run 0-100 and are mapped once at submission time. The
//! coefficients must stay in sync with what the backend expects in
//! `metadata`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_WEIRDNESS: u8 = 40;
pub const DEFAULT_STYLE_INFLUENCE: u8 = 70;

/// LM sampling parameters derived from the weirdness slider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// 0.6 - 1.2
    pub lm_temperature: f64,
    /// 0.8 - 0.95
    pub lm_top_p: f64,
    /// 20 - 150
    pub lm_top_k: u32,
}

/// Map weirdness (0-100) to temperature / top-p / top-k
pub fn map_weirdness(value: u8) -> SamplingParams {
    let t = slider_fraction(value);
    SamplingParams {
        lm_temperature: round2(0.6 + t * 0.6),
        lm_top_p: round2(0.8 + t * 0.15),
        lm_top_k: (20.0 + t * 130.0).round() as u32,
    }
}

/// Map style influence (0-100) to guidance scale (3 - 12)
pub fn map_style_influence(value: u8) -> f64 {
    round2(3.0 + slider_fraction(value) * 9.0)
}

/// Write the slider values and their derived parameters into payload metadata
pub fn apply_to_metadata(metadata: &mut Map<String, Value>, weirdness: u8, style_influence: u8) {
    let weirdness = weirdness.min(100);
    let style_influence = style_influence.min(100);
    let params = map_weirdness(weirdness);

    metadata.insert("weirdness".into(), Value::from(weirdness));
    metadata.insert("style_influence".into(), Value::from(style_influence));
    metadata.insert(
        "guidance_scale".into(),
        Value::from(map_style_influence(style_influence)),
    );
    metadata.insert("lm_temperature".into(), Value::from(params.lm_temperature));
    metadata.insert("lm_top_p".into(), Value::from(params.lm_top_p));
    metadata.insert("lm_top_k".into(), Value::from(params.lm_top_k));
}

fn slider_fraction(value: u8) -> f64 {
    f64::from(value.min(100)) / 100.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
