//! Service seams injected into executors.
//!
//! Executors never talk to backends directly; they go through the traits
//! here so the engine stays independent of any particular Python runtime,
//! speech synthesizer, or image model. Tests plug in scripted stubs.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use iosans_artifact::ArtifactStore;
use iosans_llm::ChatModel;

/// Error type for pluggable service backends.
#[derive(Debug, Error)]
pub enum ServiceError {
  /// No backend is configured or it cannot be reached.
  #[error("service unavailable: {0}")]
  Unavailable(String),

  /// The backend ran but failed.
  #[error("{0}")]
  Failed(String),
}

/// Pluggable Python interpreter.
#[async_trait]
pub trait PythonRuntime: Send + Sync {
  /// Run a script with `inputs` injected as a variable; returns the value of
  /// the script's result expression.
  async fn run(&self, code: &str, inputs: &Value) -> Result<Value, ServiceError>;
}

/// Pluggable text-to-speech backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
  /// Synthesize `text` to audio bytes (WAV container).
  async fn synthesize(&self, text: &str, options: &SpeechOptions) -> Result<Bytes, ServiceError>;
}

/// Voice configuration for speech synthesis.
#[derive(Debug, Clone, Default)]
pub struct SpeechOptions {
  pub voice: Option<String>,
  pub rate: Option<f64>,
  pub pitch: Option<f64>,
}

/// Pluggable image generation backend.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
  /// Produce a PNG image for the prompt.
  async fn generate(&self, prompt: &str, options: &ImageOptions) -> Result<Bytes, ServiceError>;
}

/// Image configuration for generation.
#[derive(Debug, Clone, Default)]
pub struct ImageOptions {
  pub width: Option<u32>,
  pub height: Option<u32>,
  pub style: Option<String>,
}

/// The bundle of services available to executors during a run.
///
/// The artifact store is always present; model-backed services are optional
/// and their executors fail with `ServiceUnavailable` when absent.
#[derive(Clone)]
pub struct Services {
  pub artifacts: Arc<dyn ArtifactStore>,
  pub chat_model: Option<Arc<dyn ChatModel>>,
  pub python: Option<Arc<dyn PythonRuntime>>,
  pub speech: Option<Arc<dyn SpeechSynthesizer>>,
  pub image: Option<Arc<dyn ImageGenerator>>,
}

impl Services {
  /// Services with only the artifact store wired.
  pub fn new(artifacts: Arc<dyn ArtifactStore>) -> Self {
    Self {
      artifacts,
      chat_model: None,
      python: None,
      speech: None,
      image: None,
    }
  }

  pub fn with_chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
    self.chat_model = Some(model);
    self
  }

  pub fn with_python(mut self, python: Arc<dyn PythonRuntime>) -> Self {
    self.python = Some(python);
    self
  }

  pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
    self.speech = Some(speech);
    self
  }

  pub fn with_image(mut self, image: Arc<dyn ImageGenerator>) -> Self {
    self.image = Some(image);
    self
  }
}

impl std::fmt::Debug for Services {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Services")
      .field("chat_model", &self.chat_model.is_some())
      .field("python", &self.python.is_some())
      .field("speech", &self.speech.is_some())
      .field("image", &self.image.is_some())
      .finish()
  }
}
