//! Batch generation and concurrent dispatch of TTS synthesis requests

pub mod payload;
pub mod requester;

pub use payload::{Batch, PayloadTemplate, TtsPayload};
pub use requester::{BatchRequester, Report};
