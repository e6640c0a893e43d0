//! Built-in node executors.
//!
//! One module per node family. The aiAgent executor is not here; it depends
//! on the tool-calling service and lives in its own crate, registered by the
//! embedder.

mod code;
mod condition;
mod delay;
mod http;
mod image;
mod llm;
mod merge;
mod python;
mod speech;
mod switch;
mod terminal;
mod transform;
mod trigger;

pub use code::CodeExecutor;
pub use condition::ConditionExecutor;
pub use delay::DelayExecutor;
pub use http::HttpRequestExecutor;
pub use image::ImageGenerationExecutor;
pub use llm::LlmExecutor;
pub use merge::{MergeExecutor, MergeStrategy};
pub use python::PythonExecutor;
pub use speech::TextToSpeechExecutor;
pub use switch::SwitchExecutor;
pub use terminal::TerminalExecutor;
pub use transform::TransformExecutor;
pub use trigger::TriggerExecutor;

use std::sync::Arc;

use iosans_workflow::NodeKind;

use crate::executor::ExecutorRegistry;

/// Register every built-in executor on a registry.
pub fn register_builtins(registry: &mut ExecutorRegistry) {
  let trigger = Arc::new(TriggerExecutor);
  registry.register(NodeKind::ManualTrigger, trigger.clone());
  registry.register(NodeKind::ScheduleTrigger, trigger.clone());
  registry.register(NodeKind::Start, trigger);

  let terminal = Arc::new(TerminalExecutor);
  registry.register(NodeKind::End, terminal.clone());
  registry.register(NodeKind::Output, terminal);

  registry.register(NodeKind::Merge, Arc::new(MergeExecutor));
  registry.register(NodeKind::Switch, Arc::new(SwitchExecutor));
  registry.register(NodeKind::IfElse, Arc::new(ConditionExecutor));
  registry.register(NodeKind::Delay, Arc::new(DelayExecutor));
  registry.register(NodeKind::Transform, Arc::new(TransformExecutor));
  registry.register(NodeKind::CodeExecutor, Arc::new(CodeExecutor));
  registry.register(NodeKind::HttpRequest, Arc::new(HttpRequestExecutor::new()));
  registry.register(NodeKind::Python, Arc::new(PythonExecutor));
  registry.register(NodeKind::TextToSpeech, Arc::new(TextToSpeechExecutor));
  registry.register(NodeKind::ImageGeneration, Arc::new(ImageGenerationExecutor));
  registry.register(NodeKind::Llm, Arc::new(LlmExecutor));
}
