use std::fs;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::io::layout::{CAPTURE_FILE, DAILY_DIR, INBOX_FILE, PROJECTS_DIR};
use crate::llm::TextModel;

/// Directories searched recursively, relative to the data root
const SEARCH_DIRS: &[&str] = &[PROJECTS_DIR, DAILY_DIR, "inbox"];

/// Top-level files searched
const SEARCH_FILES: &[&str] = &[CAPTURE_FILE, INBOX_FILE];

const MAX_LINES_PER_FILE: usize = 5;
const ANSWER_MAX_TOKENS: u32 = 256;
const MAX_RESULTS: usize = 10;
/// How many hits feed the answer, canned or generated
pub const ANSWER_HITS: usize = 5;

const STOPWORDS: &[&str] = &[
    "the", "was", "had", "that", "about", "when", "did", "how", "what", "which", "where", "does",
    "have", "been", "this", "with", "from", "they", "were", "some", "something", "remember",
    "dont", "don't", "there", "wrote", "write", "said", "made", "like", "just", "also", "into",
    "than", "then", "them", "these", "those", "would", "could", "should", "will", "can", "for",
    "and", "but", "not", "you", "all", "any", "her", "his", "its", "our", "who", "get", "got",
    "has", "him", "why", "let",
];

pub const NO_MATCHES_ANSWER: &str = "No matching files found for your search.";

/// A markdown file loaded for searching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFile {
    /// Path relative to the data root, `/`-separated
    pub file: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    /// 1-based
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub file: String,
    pub matches: Vec<LineMatch>,
    pub match_count: usize,
    /// Fraction of query keywords found in the file
    pub relevance: f64,
    /// Context around the first few matches, for answer generation
    #[serde(skip)]
    pub snippet: String,
}

// ---------------------------------------------------------------------------
// Query handling
// ---------------------------------------------------------------------------

/// Lowercased query words worth searching for
pub fn keywords(query: &str) -> Vec<String> {
    let cleaned: String = query
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '?' | '.' | ',' | '!' | '\'' | '"'))
        .collect();
    let mut words: Vec<String> = Vec::new();
    for word in cleaned.split_whitespace() {
        if word.chars().count() > 2 && !STOPWORDS.contains(&word) && !words.iter().any(|w| w == word) {
            words.push(word.to_string());
        }
    }
    words
}

/// A case-insensitive regex matching any of `words`
fn any_of(words: &[&String]) -> Option<Regex> {
    if words.is_empty() {
        return None;
    }
    let pattern = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern).case_insensitive(true).build().ok()
}

// ---------------------------------------------------------------------------
// File collection
// ---------------------------------------------------------------------------

/// Every searchable markdown file under `root`, sorted by path
pub fn collect_files(root: &Path) -> Vec<SearchFile> {
    let mut files = Vec::new();
    for dir in SEARCH_DIRS {
        collect_dir(root, &root.join(dir), &mut files);
    }
    for name in SEARCH_FILES {
        let path = root.join(name);
        if let Ok(content) = fs::read_to_string(&path) {
            files.push(SearchFile {
                file: name.to_string(),
                content,
            });
        }
    }
    files.sort_by(|a, b| a.file.cmp(&b.file));
    files
}

fn collect_dir(root: &Path, dir: &Path, out: &mut Vec<SearchFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_dir(root, &path, out);
        } else if name.ends_with(".md") {
            let Ok(content) = fs::read_to_string(&path) else {
                tracing::debug!(path = %path.display(), "unreadable file skipped in search");
                continue;
            };
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let file = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push(SearchFile { file, content });
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Keyword search with relevance scoring.
///
/// A file is a hit when it contains at least one keyword. Hits are ordered by
/// relevance, then by number of matching lines; the best ten are returned.
pub fn search_files(files: &[SearchFile], keywords: &[String]) -> Vec<SearchResult> {
    if keywords.is_empty() {
        return Vec::new();
    }
    let mut results = Vec::new();

    for file in files {
        let lower = file.content.to_lowercase();
        let matched: Vec<&String> = keywords.iter().filter(|kw| lower.contains(kw.as_str())).collect();
        let Some(re) = any_of(&matched) else { continue };

        let lines: Vec<&str> = file.content.split('\n').collect();
        let matching: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| re.is_match(l))
            .map(|(i, _)| i)
            .collect();
        if matching.is_empty() {
            continue;
        }

        let snippet = matching
            .iter()
            .take(MAX_LINES_PER_FILE)
            .map(|&i| {
                let start = i.saturating_sub(2);
                let end = (i + 3).min(lines.len());
                lines[start..end].join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n...\n");

        results.push(SearchResult {
            file: file.file.clone(),
            matches: matching
                .iter()
                .take(MAX_LINES_PER_FILE)
                .map(|&i| LineMatch {
                    line: i + 1,
                    text: lines[i].trim().to_string(),
                })
                .collect(),
            match_count: matching.len(),
            relevance: matched.len() as f64 / keywords.len() as f64,
            snippet,
        });
    }

    results.sort_by(|a, b| {
        b.relevance
            .total_cmp(&a.relevance)
            .then_with(|| b.match_count.cmp(&a.match_count))
    });
    results.truncate(MAX_RESULTS);
    results
}

// ---------------------------------------------------------------------------
// Answers
// ---------------------------------------------------------------------------

/// Answer used when no model is configured or the model fails
pub fn canned_answer(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_MATCHES_ANSWER.to_string();
    }
    let names: Vec<&str> = results
        .iter()
        .take(ANSWER_HITS)
        .map(|r| r.file.as_str())
        .collect();
    format!(
        "Found matches in {} file(s): {}. Open a file to see the details.",
        results.len(),
        names.join(", ")
    )
}

/// Prompt asking a model to answer `query` from the top hits
pub fn answer_prompt(query: &str, results: &[SearchResult]) -> String {
    let context = results
        .iter()
        .take(ANSWER_HITS)
        .map(|r| format!("File: {}\n{}", r.file, r.snippet))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");
    format!(
        "You are a search assistant for a task management system. The user asked: \"{query}\"\n\n\
         Here are the relevant file contents found by searching:\n\n{context}\n\n\
         Based ONLY on the file contents above, write a brief 1-3 sentence answer to the user's question. \
         Be specific: mention dates, file names, and task titles from the results. \
         If the results don't clearly answer the question, say what you found and let the user explore further.\n\n\
         Return ONLY the answer text, no JSON, no formatting."
    )
}

/// Search outcome as the editor shows it
#[derive(Debug, Clone, Serialize)]
pub struct SearchAnswer {
    pub query: String,
    pub answer: String,
    pub results: Vec<SearchResult>,
}

/// Keyword search over the data directory, answered by `model` when one is
/// available and by a canned sentence otherwise
pub fn search(root: &Path, query: &str, model: Option<&dyn TextModel>) -> SearchAnswer {
    let words = keywords(query);
    let files = collect_files(root);
    let results = search_files(&files, &words);
    tracing::debug!(query, keywords = words.len(), files = files.len(), hits = results.len(), "search");

    let generated = match model {
        Some(model) if !results.is_empty() => {
            match model.complete(&answer_prompt(query, &results), ANSWER_MAX_TOKENS) {
                Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "search answer failed, using canned answer");
                    None
                }
            }
        }
        _ => None,
    };

    SearchAnswer {
        query: query.to_string(),
        answer: generated.unwrap_or_else(|| canned_answer(&results)),
        results,
    }
}
