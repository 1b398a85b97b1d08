pub type Result<T> = core::result::Result<T, TtsBatchError>;

#[derive(thiserror::Error, Debug)]
pub enum TtsBatchError {
    /// Anything that went wrong during a single request's send/receive cycle.
    #[error("{0}")]
    RequestFailure(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

pub mod config {
    use serde::Deserialize;
    use std::env;

    use crate::{Result, TtsBatchError};

    pub const DEFAULT_URL: &str = "http://localhost:8080/tts";
    pub const DEFAULT_COUNT: usize = 30;
    pub const DEFAULT_MODEL_PATH: &str = "../models/Kristin.onnx";
    pub const DEFAULT_OUTPUT_PATH: &str = "../audio/";

    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    #[serde(default)]
    pub struct BatchConfig {
        pub url: String,
        pub count: usize,
        pub model_path: String,
        pub output_path: String,
        pub output_type: Option<String>,
    }

    impl Default for BatchConfig {
        fn default() -> Self {
            Self {
                url: DEFAULT_URL.to_string(),
                count: DEFAULT_COUNT,
                model_path: DEFAULT_MODEL_PATH.to_string(),
                output_path: DEFAULT_OUTPUT_PATH.to_string(),
                output_type: None,
            }
        }
    }

    impl BatchConfig {
        pub fn load() -> Result<Self> {
            let cfg = Self::read()?;
            cfg.validate()?;
            Ok(cfg)
        }

        /// `TTSBATCH_CONFIG` points at a YAML file; otherwise defaults plus `TTSBATCH_*` overrides.
        /// Not validated, so later overrides can still fix a bad value.
        pub fn read() -> Result<Self> {
            if let Ok(path) = env::var("TTSBATCH_CONFIG") {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| TtsBatchError::Config(format!("cannot read {path}: {e}")))?;
                return Self::parse_yaml(&text);
            }
            let mut cfg = Self::default();
            cfg.apply_overrides(|key| env::var(key).ok())?;
            Ok(cfg)
        }

        pub fn from_yaml_str(text: &str) -> Result<Self> {
            let cfg = Self::parse_yaml(text)?;
            cfg.validate()?;
            Ok(cfg)
        }

        pub fn parse_yaml(text: &str) -> Result<Self> {
            serde_yaml::from_str(text).map_err(|e| TtsBatchError::Config(e.to_string()))
        }

        pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
            if let Some(v) = lookup("TTSBATCH_URL") { self.url = v; }
            if let Some(v) = lookup("TTSBATCH_COUNT") {
                self.count = v
                    .parse()
                    .map_err(|_| TtsBatchError::Config(format!("TTSBATCH_COUNT is not a number: {v}")))?;
            }
            if let Some(v) = lookup("TTSBATCH_MODEL_PATH") { self.model_path = v; }
            if let Some(v) = lookup("TTSBATCH_OUTPUT_PATH") { self.output_path = v; }
            if let Some(v) = lookup("TTSBATCH_OUTPUT_TYPE") { self.output_type = Some(v); }
            Ok(())
        }

        pub fn validate(&self) -> Result<()> {
            if self.count == 0 {
                return Err(TtsBatchError::Config("count must be at least 1".into()));
            }
            if self.url.trim().is_empty() {
                return Err(TtsBatchError::Config("url must not be empty".into()));
            }
            Ok(())
        }
    }

}
