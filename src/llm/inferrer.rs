use std::sync::Arc;

use super::{LlmError, TextModel};
use crate::sync::inference::{InferenceRequest, Inferred, ProjectInferrer, inference_prompt, parse_inferences};

const INFERENCE_MAX_TOKENS: u32 = 1024;

/// Project inference backed by a text model
#[derive(Clone)]
pub struct ModelInferrer {
    model: Arc<dyn TextModel>,
}

impl ModelInferrer {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        ModelInferrer { model }
    }
}

impl ProjectInferrer for ModelInferrer {
    fn infer(&self, request: &InferenceRequest) -> Result<Vec<Inferred>, LlmError> {
        let reply = self
            .model
            .complete(&inference_prompt(request), INFERENCE_MAX_TOKENS)?;
        let answers = parse_inferences(&reply)?;
        tracing::debug!(tasks = request.titles.len(), answers = answers.len(), "projects inferred");
        Ok(answers)
    }
}
