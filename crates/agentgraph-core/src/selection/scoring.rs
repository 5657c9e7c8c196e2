//! Per-agent scoring
//!
//! The score is a weighted sum of five factors, each in [0, 1]:
//!
//! | factor | weight |
//! |---|---|
//! | capability match | 0.4 |
//! | type relevance | 0.2 |
//! | performance | 0.2 |
//! | priority alignment | 0.1 |
//! | availability | 0.1 |
//!
//! Confidence is the mean of four independent indicators of how much the
//! score can be trusted.

use crate::domain::graph::{AgentProfile, AgentStatus, Node};

use super::types::{AgentScore, CapabilitySource, TaskAnalysis};

pub const CAPABILITY_WEIGHT: f64 = 0.4;
pub const TYPE_WEIGHT: f64 = 0.2;
pub const PERFORMANCE_WEIGHT: f64 = 0.2;
pub const PRIORITY_WEIGHT: f64 = 0.1;
pub const AVAILABILITY_WEIGHT: f64 = 0.1;

/// Used when a factor has nothing to go on
const NEUTRAL: f64 = 0.5;

/// Response time (seconds) at which the speed component reaches zero
const SLOW_RESPONSE_SECONDS: f64 = 60.0;

/// Task-type keywords relevant to each agent role
const ROLE_KEYWORDS: &[(&str, &[&str])] = &[
    ("architect", &["architecture", "design", "planning", "system"]),
    ("coder", &["code", "implement", "develop", "feature", "bug", "fix"]),
    ("tester", &["test", "qa", "verify", "validation"]),
    ("reviewer", &["review", "audit", "quality", "analyze"]),
    ("deployer", &["deploy", "release", "production", "infrastructure"]),
    ("orchestrator", &["orchestrate", "coordinate", "workflow", "manage"]),
];

/// Score an agent node against an analyzed task
///
/// Non-agent nodes score zero with zero confidence.
pub fn score_agent(node: &Node, analysis: &TaskAnalysis) -> AgentScore {
    let Some(profile) = node.as_agent() else {
        return AgentScore {
            agent_id: node.id.clone(),
            agent_name: node.name.clone(),
            score: 0.0,
            confidence: 0.0,
            reasoning: vec![format!("{} is not an agent", node.kind())],
        };
    };

    let capability = capability_match(profile, &analysis.required_capabilities);
    let type_relevance = type_relevance(profile, analysis.task_type.as_deref());
    let performance = performance(profile);
    let priority = priority_alignment(profile.priority, analysis.priority);
    let availability = availability(profile);

    let score = CAPABILITY_WEIGHT * capability
        + TYPE_WEIGHT * type_relevance
        + PERFORMANCE_WEIGHT * performance
        + PRIORITY_WEIGHT * priority
        + AVAILABILITY_WEIGHT * availability;

    let matched = analysis
        .required_capabilities
        .iter()
        .filter(|c| profile.has_capability(c))
        .count();

    AgentScore {
        agent_id: node.id.clone(),
        agent_name: node.name.clone(),
        score: clamp_unit(score),
        confidence: confidence(profile, analysis.capability_source),
        reasoning: vec![
            format!(
                "capability match {:.2} ({}/{} required)",
                capability,
                matched,
                analysis.required_capabilities.len()
            ),
            format!("type relevance {:.2} ({})", type_relevance, profile.agent_type),
            format!("performance {:.2}", performance),
            format!(
                "priority alignment {:.2} (agent {}, task {})",
                priority, profile.priority, analysis.priority
            ),
            format!("availability {:.2} ({})", availability, profile.status),
        ],
    }
}

/// Fraction of required capabilities the agent holds; neutral when none are required
pub fn capability_match(profile: &AgentProfile, required: &[String]) -> f64 {
    if required.is_empty() {
        return NEUTRAL;
    }
    let matched = required.iter().filter(|c| profile.has_capability(c)).count();
    matched as f64 / required.len() as f64
}

pub fn type_relevance(profile: &AgentProfile, task_type: Option<&str>) -> f64 {
    let Some(task_type) = task_type else {
        return 0.0;
    };
    let agent_type = profile.agent_type.to_lowercase();
    let Some((_, keywords)) = ROLE_KEYWORDS
        .iter()
        .find(|(role, _)| agent_type.contains(role))
    else {
        return NEUTRAL;
    };

    let task_type = task_type.to_lowercase();
    let found = keywords.iter().filter(|kw| task_type.contains(*kw)).count();
    found as f64 / keywords.len() as f64
}

/// `success_rate * 0.7 + speed * 0.3`, neutral without metrics
pub fn performance(profile: &AgentProfile) -> f64 {
    let metrics = &profile.performance_metrics;
    if metrics.is_empty() {
        return NEUTRAL;
    }

    let success_rate = metrics
        .get("success_rate")
        .map(|v| clamp_unit(*v))
        .unwrap_or(NEUTRAL);
    let speed = metrics
        .get("average_response_time")
        .map(|secs| clamp_unit(1.0 - secs / SLOW_RESPONSE_SECONDS))
        .unwrap_or(NEUTRAL);

    clamp_unit(success_rate * 0.7 + speed * 0.3)
}

pub fn priority_alignment(agent_priority: i32, task_priority: i32) -> f64 {
    let distance = (i64::from(agent_priority) - i64::from(task_priority)).abs() as f64;
    (1.0 - distance / 10.0).max(0.0)
}

pub fn availability(profile: &AgentProfile) -> f64 {
    match profile.status {
        AgentStatus::Idle => 1.0,
        AgentStatus::Busy if profile.current_tasks < profile.max_concurrent_tasks => {
            1.0 - profile.current_tasks as f64 / profile.max_concurrent_tasks as f64
        }
        _ => 0.0,
    }
}

/// Share of capacity in use; zero capacity counts as fully loaded
pub fn load_ratio(profile: &AgentProfile) -> f64 {
    if profile.max_concurrent_tasks == 0 {
        return 1.0;
    }
    (profile.current_tasks as f64 / profile.max_concurrent_tasks as f64).min(1.0)
}

pub fn confidence(profile: &AgentProfile, source: CapabilitySource) -> f64 {
    let capabilities = if profile.capabilities.is_empty() { 0.3 } else { 1.0 };

    let metrics = if profile.performance_metrics.contains_key("success_rate") {
        1.0
    } else if !profile.performance_metrics.is_empty() {
        0.8
    } else {
        0.5
    };

    let status = match profile.status {
        AgentStatus::Idle => 1.0,
        AgentStatus::Busy => 0.8,
        AgentStatus::Error => 0.3,
        AgentStatus::Disabled => 0.0,
    };

    let requirements = match source {
        CapabilitySource::Explicit => 1.0,
        CapabilitySource::Keywords => 0.8,
        CapabilitySource::TaskType => 0.5,
        CapabilitySource::None => 0.3,
    };

    clamp_unit((capabilities + metrics + status + requirements) / 4.0)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::TaskComplexity;

    fn analysis(task_type: Option<&str>, caps: &[&str], priority: i32) -> TaskAnalysis {
        TaskAnalysis {
            task_type: task_type.map(str::to_string),
            required_capabilities: caps.iter().map(|c| c.to_string()).collect(),
            capability_source: CapabilitySource::Explicit,
            complexity: TaskComplexity::Simple,
            complexity_score: 0.2,
            priority,
        }
    }

    #[test]
    fn test_generalist_with_matching_capability_scores_high() {
        let node = Node::agent(
            "x",
            AgentProfile::new("generalist").with_capabilities(["coding", "testing"]),
        );
        let score = score_agent(&node, &analysis(Some("feature"), &["coding"], 5));

        // 0.4 + 0.2*0.5 + 0.2*0.5 + 0.1 + 0.1
        assert!((score.score - 0.8).abs() < 1e-9, "score was {}", score.score);
        assert_eq!(score.reasoning.len(), 5);
    }

    #[test]
    fn test_partial_capability_match() {
        let profile = AgentProfile::new("coder").with_capabilities(["coding"]);
        let required = vec!["coding".to_string(), "testing".to_string()];
        assert_eq!(capability_match(&profile, &required), 0.5);
        assert_eq!(capability_match(&profile, &[]), 0.5);
    }

    #[test]
    fn test_no_required_capabilities_scores_neutral() {
        let node = Node::agent("x", AgentProfile::new("generalist").with_priority(5));
        let task = TaskAnalysis {
            capability_source: CapabilitySource::None,
            ..analysis(None, &[], 5)
        };
        let score = score_agent(&node, &task);

        // 0.4*0.5 + 0.2*0 + 0.2*0.5 + 0.1 + 0.1
        assert!((score.score - 0.5).abs() < 1e-9, "score was {}", score.score);
        assert!(score.reasoning[0].starts_with("capability match 0.50 (0/0"));
    }

    #[test]
    fn test_type_relevance() {
        let coder = AgentProfile::new("senior-coder");
        assert_eq!(type_relevance(&coder, None), 0.0);
        assert!((type_relevance(&coder, Some("bug_fix")) - 2.0 / 6.0).abs() < 1e-9);
        assert_eq!(type_relevance(&coder, Some("deployment")), 0.0);

        let poet = AgentProfile::new("poet");
        assert_eq!(type_relevance(&poet, Some("feature")), 0.5);
    }

    #[test]
    fn test_performance() {
        assert_eq!(performance(&AgentProfile::new("coder")), 0.5);

        let fast = AgentProfile::new("coder")
            .with_metric("success_rate", 1.0)
            .with_metric("average_response_time", 0.0);
        assert!((performance(&fast) - 1.0).abs() < 1e-9);

        let slow = AgentProfile::new("coder")
            .with_metric("success_rate", 0.5)
            .with_metric("average_response_time", 600.0);
        assert!((performance(&slow) - 0.35).abs() < 1e-9);

        let only_speed = AgentProfile::new("coder").with_metric("average_response_time", 30.0);
        assert!((performance(&only_speed) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_priority_alignment() {
        assert_eq!(priority_alignment(2, 2), 1.0);
        assert!((priority_alignment(9, 2) - 0.3).abs() < 1e-9);
        assert_eq!(priority_alignment(-20, 10), 0.0);
    }

    #[test]
    fn test_availability_and_load() {
        let idle = AgentProfile::new("coder");
        assert_eq!(availability(&idle), 1.0);
        assert_eq!(load_ratio(&idle), 0.0);

        let busy = AgentProfile::new("coder")
            .with_status(AgentStatus::Busy)
            .with_current_tasks(1)
            .with_max_concurrent_tasks(4);
        assert_eq!(availability(&busy), 0.75);
        assert_eq!(load_ratio(&busy), 0.25);

        let saturated = busy.clone().with_current_tasks(4);
        assert_eq!(availability(&saturated), 0.0);

        let no_capacity = AgentProfile::new("coder")
            .with_status(AgentStatus::Busy)
            .with_max_concurrent_tasks(0);
        assert_eq!(availability(&no_capacity), 0.0);
        assert_eq!(load_ratio(&no_capacity), 1.0);

        let disabled = AgentProfile::new("coder").with_status(AgentStatus::Disabled);
        assert_eq!(availability(&disabled), 0.0);
    }

    #[test]
    fn test_confidence_indicators() {
        let bare = AgentProfile::new("coder");
        assert!((confidence(&bare, CapabilitySource::None) - (0.3 + 0.5 + 1.0 + 0.3) / 4.0).abs() < 1e-9);

        let strong = AgentProfile::new("coder")
            .with_capabilities(["coding"])
            .with_metric("success_rate", 0.9);
        assert_eq!(confidence(&strong, CapabilitySource::Explicit), 1.0);

        let disabled = strong.clone().with_status(AgentStatus::Disabled);
        assert!((confidence(&disabled, CapabilitySource::Explicit) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_agents_stay_in_bounds() {
        let weird = Node::agent(
            "weird",
            AgentProfile::new("")
                .with_priority(i32::MAX)
                .with_max_concurrent_tasks(0)
                .with_status(AgentStatus::Error)
                .with_metric("success_rate", f64::NAN)
                .with_metric("average_response_time", -1000.0),
        );
        let task = analysis(None, &["coding"], i32::MIN);
        let score = score_agent(&weird, &task);
        assert!((0.0..=1.0).contains(&score.score));
        assert!((0.0..=1.0).contains(&score.confidence));
    }

    #[test]
    fn test_non_agent_scores_zero() {
        use crate::domain::graph::{CapabilityCategory, CapabilitySpec};
        let node = Node::capability("coding", CapabilitySpec::new(CapabilityCategory::Development));
        let score = score_agent(&node, &analysis(Some("feature"), &[], 5));
        assert_eq!(score.score, 0.0);
        assert_eq!(score.confidence, 0.0);
    }
}
