use serde::{Deserialize, Serialize};
use ttsbatch_common::config::{BatchConfig, DEFAULT_MODEL_PATH, DEFAULT_OUTPUT_PATH};
use ttsbatch_common::Result;

/// The part of every request body that does not depend on the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadTemplate {
    pub model_path: String,
    pub output_path: String,
    pub output_type: Option<String>,
}

impl Default for PayloadTemplate {
    fn default() -> Self {
        Self {
            model_path: DEFAULT_MODEL_PATH.to_string(),
            output_path: DEFAULT_OUTPUT_PATH.to_string(),
            output_type: None,
        }
    }
}

impl From<&BatchConfig> for PayloadTemplate {
    fn from(cfg: &BatchConfig) -> Self {
        Self {
            model_path: cfg.model_path.clone(),
            output_path: cfg.output_path.clone(),
            output_type: cfg.output_type.clone(),
        }
    }
}

/// One synthesis job as the TTS server expects it on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsPayload {
    #[serde(rename = "modelPath")]
    pub model_path: String,
    #[serde(rename = "outputPath")]
    pub output_path: String,
    pub output_file: String,
    pub sentence: String,
    #[serde(rename = "outputType", default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
}

impl TtsPayload {
    pub fn for_index(template: &PayloadTemplate, index: usize) -> Self {
        Self {
            model_path: template.model_path.clone(),
            output_path: template.output_path.clone(),
            output_file: format!("output_file_{index}"),
            sentence: format!("Test sentence {index}"),
            output_type: template.output_type.clone(),
        }
    }
}

/// Payloads `0..n` together with their JSON bodies, encoded once up front.
#[derive(Debug, Clone)]
pub struct Batch {
    payloads: Vec<TtsPayload>,
    bodies: Vec<String>,
}

impl Batch {
    pub fn generate(template: &PayloadTemplate, n: usize) -> Result<Self> {
        let payloads: Vec<TtsPayload> = (0..n).map(|i| TtsPayload::for_index(template, i)).collect();
        let bodies = payloads
            .iter()
            .map(serde_json::to_string)
            .collect::<core::result::Result<Vec<_>, _>>()?;
        Ok(Self { payloads, bodies })
    }

    pub fn len(&self) -> usize { self.payloads.len() }

    pub fn is_empty(&self) -> bool { self.payloads.is_empty() }

    pub fn payload(&self, index: usize) -> Option<&TtsPayload> { self.payloads.get(index) }

    pub fn body(&self, index: usize) -> Option<&str> { self.bodies.get(index).map(String::as_str) }

    /// `(index, body)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.bodies.iter().map(String::as_str).enumerate()
    }
}
