use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use serde::Deserialize;

const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_INPUT_WIDTH: u32 = 448;
const DEFAULT_INPUT_HEIGHT: u32 = 448;

/// Labels of the fine-tuned traffic model, in class-index order.
const DEFAULT_LABELS: [&str; 7] = [
    "bicycle",
    "car",
    "motorcycle",
    "bus",
    "truck",
    "red",
    "green",
];

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    class_confidence: Option<HashMap<String, f32>>,
    class_iou: Option<HashMap<String, f32>>,
    labels: Option<Vec<String>>,
    model: Option<ModelConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    input_width: Option<u32>,
    input_height: Option<u32>,
}

/// Resolved pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Global confidence cut for the decoder.
    pub confidence_threshold: f32,
    /// Default IoU cut for suppression.
    pub iou_threshold: f32,
    /// Per-label confidence overrides; absent labels use the global value.
    pub class_confidence: HashMap<String, f32>,
    /// Per-label IoU overrides; absent labels use the default value.
    pub class_iou: HashMap<String, f32>,
    /// Class-index-ordered label list.
    pub labels: Vec<String>,
    /// Model input resolution used to normalize pixel-unit boxes.
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            class_confidence: HashMap::new(),
            class_iou: HashMap::new(),
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            input_width: DEFAULT_INPUT_WIDTH,
            input_height: DEFAULT_INPUT_HEIGHT,
        }
    }
}

impl PipelineConfig {
    /// Load from the JSON file named by `SIGNAL_CONFIG` (if set), apply env
    /// overrides, and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SIGNAL_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            confidence_threshold: file
                .confidence_threshold
                .unwrap_or(defaults.confidence_threshold),
            iou_threshold: file.iou_threshold.unwrap_or(defaults.iou_threshold),
            class_confidence: file.class_confidence.unwrap_or_default(),
            class_iou: file.class_iou.unwrap_or_default(),
            labels: file.labels.unwrap_or(defaults.labels),
            input_width: file
                .model
                .as_ref()
                .and_then(|m| m.input_width)
                .unwrap_or(defaults.input_width),
            input_height: file
                .model
                .and_then(|m| m.input_height)
                .unwrap_or(defaults.input_height),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("SIGNAL_CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = value
                .parse()
                .map_err(|_| anyhow!("SIGNAL_CONFIDENCE_THRESHOLD must be a float"))?;
        }
        if let Ok(value) = std::env::var("SIGNAL_IOU_THRESHOLD") {
            self.iou_threshold = value
                .parse()
                .map_err(|_| anyhow!("SIGNAL_IOU_THRESHOLD must be a float"))?;
        }
        if let Ok(value) = std::env::var("SIGNAL_LABELS") {
            let parsed = split_csv(&value);
            if !parsed.is_empty() {
                self.labels = parsed;
            }
        }
        if let Ok(value) = std::env::var("SIGNAL_INPUT_WIDTH") {
            self.input_width = value
                .parse()
                .map_err(|_| anyhow!("SIGNAL_INPUT_WIDTH must be an integer"))?;
        }
        if let Ok(value) = std::env::var("SIGNAL_INPUT_HEIGHT") {
            self.input_height = value
                .parse()
                .map_err(|_| anyhow!("SIGNAL_INPUT_HEIGHT must be an integer"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if !(0.0..1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.iou_threshold) {
            return Err(anyhow!("iou_threshold must be in [0, 1)"));
        }
        if self.input_width == 0 || self.input_height == 0 {
            return Err(anyhow!("model input size must be non-zero"));
        }
        if self.labels.is_empty() {
            return Err(anyhow!("label list must not be empty"));
        }

        for label in &mut self.labels {
            validate_label(label)?;
            *label = label.to_lowercase();
        }
        self.class_confidence = normalize_threshold_keys(&self.class_confidence)?;
        self.class_iou = normalize_threshold_keys(&self.class_iou)?;
        for value in self.class_confidence.values().chain(self.class_iou.values()) {
            if !(0.0..1.0).contains(value) {
                return Err(anyhow!("per-class thresholds must be in [0, 1)"));
            }
        }
        Ok(())
    }
}

/// A conforming label is a short lowercase identifier, not arbitrary text.
/// Positive allowlist to keep threshold-map keys and detector labels aligned.
pub fn validate_label(label: &str) -> Result<()> {
    static LABEL_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re =
        LABEL_RE.get_or_init(|| regex::Regex::new(r"^[a-z0-9][a-z0-9 _-]{0,31}$").unwrap());

    let normalized = label.to_lowercase();
    if !re.is_match(&normalized) {
        return Err(anyhow!(
            "label {:?} must match ^[a-z0-9][a-z0-9 _-]{{0,31}}$",
            label
        ));
    }
    Ok(())
}

fn normalize_threshold_keys(map: &HashMap<String, f32>) -> Result<HashMap<String, f32>> {
    let mut out = HashMap::with_capacity(map.len());
    for (label, value) in map {
        validate_label(label)?;
        out.insert(label.to_lowercase(), *value);
    }
    Ok(out)
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
