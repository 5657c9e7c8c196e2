//! Task analysis
//!
//! Turns a [`TaskDescriptor`] into the capability set and complexity score
//! the scorer works from. Pure and deterministic.

use super::types::{CapabilitySource, TaskAnalysis, TaskDescriptor};

/// Capabilities inferred from words in the task text, in output order
///
/// A keyword matches any word it prefixes, so `test` also covers `testing`.
const CAPABILITY_KEYWORDS: &[(&str, &[&str])] = &[
    ("architecture", &["architecture", "design", "planning", "system"]),
    ("coding", &["code", "implement", "develop", "build"]),
    ("testing", &["test", "verify", "qa"]),
    ("review", &["review", "audit", "analyze"]),
    ("deployment", &["deploy", "release", "production"]),
    ("security", &["secure", "security", "vulnerab"]),
    ("orchestration", &["orchestrat", "coordinat", "manage"]),
    ("creative", &["creative", "innovat"]),
    ("analysis", &["analyze", "analysis", "research"]),
    ("documentation", &["document", "explain"]),
];

/// Fallback capability sets keyed by task type
const TASK_TYPE_CAPABILITIES: &[(&str, &[&str])] = &[
    ("feature", &["architecture", "coding", "testing"]),
    ("bug_fix", &["coding", "testing"]),
    ("bugfix", &["coding", "testing"]),
    ("hotfix", &["coding", "testing"]),
    ("refactor", &["coding", "review"]),
    ("refactoring", &["coding", "review"]),
    ("optimization", &["analysis", "coding"]),
    ("migration", &["architecture", "coding", "deployment"]),
    ("incident", &["analysis", "deployment"]),
    ("maintenance", &["coding"]),
    ("spike", &["analysis"]),
];

/// Derives required capabilities and complexity from a task
pub struct TaskAnalyzer;

impl TaskAnalyzer {
    pub fn analyze(task: &TaskDescriptor) -> TaskAnalysis {
        let task_type = Some(task.task_type.trim().to_lowercase()).filter(|t| !t.is_empty());

        let explicit = normalize(&task.required_capabilities);
        let (required_capabilities, capability_source) = if !explicit.is_empty() {
            (explicit, CapabilitySource::Explicit)
        } else {
            let text = format!("{} {}", task.task_type, task.description).to_lowercase();
            let from_keywords = Self::capabilities_from_text(&text);
            if !from_keywords.is_empty() {
                (from_keywords, CapabilitySource::Keywords)
            } else {
                match task_type.as_deref().and_then(Self::capabilities_for_task_type) {
                    Some(caps) => (caps, CapabilitySource::TaskType),
                    None => (Vec::new(), CapabilitySource::None),
                }
            }
        };

        TaskAnalysis {
            task_type,
            required_capabilities,
            capability_source,
            complexity: task.complexity,
            complexity_score: task.complexity.score(),
            priority: task.priority,
        }
    }

    /// Capabilities whose keywords occur in `text`
    pub fn capabilities_from_text(text: &str) -> Vec<String> {
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        CAPABILITY_KEYWORDS
            .iter()
            .filter(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|kw| words.iter().any(|word| word.starts_with(kw)))
            })
            .map(|(capability, _)| capability.to_string())
            .collect()
    }

    pub fn capabilities_for_task_type(task_type: &str) -> Option<Vec<String>> {
        TASK_TYPE_CAPABILITIES
            .iter()
            .find(|(name, _)| *name == task_type)
            .map(|(_, caps)| caps.iter().map(|c| c.to_string()).collect())
    }
}

/// Trim, lowercase and dedupe while keeping first-seen order
fn normalize(capabilities: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(capabilities.len());
    for capability in capabilities {
        let capability = capability.trim().to_lowercase();
        if !capability.is_empty() && !out.contains(&capability) {
            out.push(capability);
        }
    }
    out
}
