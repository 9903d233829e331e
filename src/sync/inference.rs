use serde::Deserialize;

use crate::llm::{LlmError, extract_json_array};

/// Untagged task titles and the projects they may go to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRequest {
    pub titles: Vec<String>,
    /// Existing project keys plus the fallback
    pub candidates: Vec<String>,
    pub fallback: String,
}

/// One answer: `taskIndex` is 1-based into the request's titles
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inferred {
    pub task_index: usize,
    pub project: String,
}

/// Picks a project for tasks that were captured without one
pub trait ProjectInferrer: Send + Sync {
    fn infer(&self, request: &InferenceRequest) -> Result<Vec<Inferred>, LlmError>;
}

/// Inferrer used when no model is configured: everything falls back
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInference;

impl ProjectInferrer for NoInference {
    fn infer(&self, _request: &InferenceRequest) -> Result<Vec<Inferred>, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

pub fn inference_prompt(request: &InferenceRequest) -> String {
    let tasks: Vec<String> = request
        .titles
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t))
        .collect();
    format!(
        "Given these tasks and available projects, match each task to the most appropriate project. \
         If no good match, use \"{fallback}\".\n\n\
         Available projects: {projects}\n\n\
         Tasks:\n{tasks}\n\n\
         Respond in JSON format only, no other text:\n\
         [\n  {{\"taskIndex\": 1, \"project\": \"{example}\"}},\n  {{\"taskIndex\": 2, \"project\": \"{fallback}\"}}\n]",
        fallback = request.fallback,
        projects = request.candidates.join(", "),
        tasks = tasks.join("\n"),
        example = request.candidates.first().unwrap_or(&request.fallback),
    )
}

/// Parse a model reply into answers
pub fn parse_inferences(text: &str) -> Result<Vec<Inferred>, LlmError> {
    let json = extract_json_array(text)
        .ok_or_else(|| LlmError::Malformed("no JSON array in inference reply".to_string()))?;
    serde_json::from_str(&json).map_err(|e| LlmError::Malformed(e.to_string()))
}

/// One project per title, in order. Inference failures, unknown projects and
/// missing answers all land on the fallback.
pub fn resolve_projects(inferrer: &dyn ProjectInferrer, request: &InferenceRequest) -> Vec<String> {
    let mut projects = vec![request.fallback.clone(); request.titles.len()];
    if request.titles.is_empty() {
        return projects;
    }

    let answers = match inferrer.infer(request) {
        Ok(answers) => answers,
        Err(LlmError::NotConfigured) => {
            tracing::warn!(
                tasks = request.titles.len(),
                fallback = %request.fallback,
                "no LLM configured, assigning tasks to fallback project"
            );
            return projects;
        }
        Err(e) => {
            tracing::warn!(error = %e, fallback = %request.fallback, "project inference failed");
            return projects;
        }
    };

    for answer in answers {
        let Some(slot) = answer
            .task_index
            .checked_sub(1)
            .and_then(|i| projects.get_mut(i))
        else {
            tracing::debug!(index = answer.task_index, "inference answer for unknown task index");
            continue;
        };
        let project = answer.project.trim().to_lowercase();
        if request.candidates.contains(&project) {
            *slot = project;
        } else {
            tracing::debug!(project = %answer.project, "inferred project is not a candidate");
        }
    }
    projects
}
