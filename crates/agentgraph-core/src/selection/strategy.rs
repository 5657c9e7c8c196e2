//! Team-forming strategies over ranked candidates

use std::collections::HashMap;

use tracing::warn;

use crate::domain::graph::{AgentProfile, GraphIndex, Node};

use super::scoring::{load_ratio, score_agent};
use super::types::{
    AgentScore, ExecutionPlan, LoadAssignment, SelectionStrategy, SequenceStep, TaskAnalysis,
};

/// Score deducted from a fully loaded agent under load balancing
pub const LOAD_PENALTY: f64 = 0.3;

/// A scored candidate still tied to its node in the index
#[derive(Debug, Clone)]
pub(crate) struct ScoredAgent<'a> {
    pub node: &'a Node,
    pub profile: &'a AgentProfile,
    pub score: AgentScore,
}

impl<'a> ScoredAgent<'a> {
    pub fn new(node: &'a Node, analysis: &TaskAnalysis) -> Option<Self> {
        let profile = node.as_agent()?;
        Some(Self {
            node,
            profile,
            score: score_agent(node, analysis),
        })
    }

    pub fn id(&self) -> &'a str {
        &self.node.id
    }
}

/// Agents picked by a strategy, plus how they should run
pub(crate) struct Outcome<'a> {
    pub selected: Vec<ScoredAgent<'a>>,
    pub plan: ExecutionPlan,
}

impl Outcome<'_> {
    fn empty() -> Self {
        Self {
            selected: Vec::new(),
            plan: ExecutionPlan::Empty,
        }
    }
}

/// Sort by score descending, then id ascending
pub(crate) fn rank(agents: &mut [ScoredAgent<'_>]) {
    agents.sort_by(|a, b| {
        b.score
            .score
            .total_cmp(&a.score.score)
            .then_with(|| a.node.id.cmp(&b.node.id))
    });
}

/// Strategy that ADAPTIVE resolves to for a complexity score
pub fn resolve_adaptive(complexity_score: f64) -> SelectionStrategy {
    if complexity_score < 0.3 {
        SelectionStrategy::Greedy
    } else if complexity_score < 0.7 {
        SelectionStrategy::OptimalSequence
    } else {
        SelectionStrategy::Collaborative
    }
}

pub(crate) fn greedy<'a>(ranked: &[ScoredAgent<'a>]) -> Outcome<'a> {
    match ranked.first() {
        Some(best) => Outcome {
            plan: ExecutionPlan::Single {
                agent_id: best.node.id.clone(),
            },
            selected: vec![best.clone()],
        },
        None => Outcome::empty(),
    }
}

/// Dependency-respecting order over every ranked candidate
///
/// Among agents whose dependencies are already placed, the best ranked goes
/// next. When only agents in a dependency cycle remain, the best of them is
/// placed anyway.
pub(crate) fn optimal_sequence<'a>(
    index: &GraphIndex,
    ranked: &[ScoredAgent<'a>],
    max_agents: usize,
) -> Outcome<'a> {
    let n = ranked.len();
    let position: HashMap<&str, usize> = ranked
        .iter()
        .enumerate()
        .map(|(i, agent)| (agent.id(), i))
        .collect();

    let dependencies: Vec<Vec<usize>> = ranked
        .iter()
        .map(|agent| {
            index
                .dependencies(agent.id())
                .into_iter()
                .filter_map(|dep| position.get(dep.id.as_str()).copied())
                .collect()
        })
        .collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, deps) in dependencies.iter().enumerate() {
        for &d in deps {
            dependents[d].push(i);
        }
    }

    let mut pending: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut placed = vec![false; n];
    let mut order: Vec<usize> = Vec::with_capacity(n);

    while order.len() < n {
        let next = (0..n)
            .find(|&i| !placed[i] && pending[i] == 0)
            .or_else(|| {
                let forced = (0..n).find(|&i| !placed[i]);
                if let Some(i) = forced {
                    warn!(
                        agent_id = %ranked[i].id(),
                        "Dependency cycle among candidates, placing best remaining agent"
                    );
                }
                forced
            });
        let Some(i) = next else { break };

        placed[i] = true;
        order.push(i);
        for &dependent in &dependents[i] {
            pending[dependent] = pending[dependent].saturating_sub(1);
        }
    }
    order.truncate(max_agents);

    let selected_ids: Vec<&str> = order.iter().map(|&i| ranked[i].id()).collect();
    let steps = order
        .iter()
        .enumerate()
        .map(|(step, &i)| SequenceStep {
            position: step + 1,
            agent_id: ranked[i].node.id.clone(),
            depends_on: dependencies[i]
                .iter()
                .map(|&d| ranked[d].id())
                .filter(|id| selected_ids.contains(id))
                .map(str::to_string)
                .collect(),
        })
        .collect();

    Outcome {
        selected: order.iter().map(|&i| ranked[i].clone()).collect(),
        plan: ExecutionPlan::Sequential { steps },
    }
}

/// Best agent plus its qualified collaborators
pub(crate) fn collaborative<'a>(
    index: &'a GraphIndex,
    analysis: &TaskAnalysis,
    ranked: &[ScoredAgent<'a>],
    max_agents: usize,
    min_confidence: f64,
) -> Outcome<'a> {
    let Some(anchor) = ranked.first() else {
        return Outcome::empty();
    };

    let mut collaborators: Vec<ScoredAgent<'a>> = index
        .collaborators(anchor.id())
        .into_iter()
        .filter_map(|node| ScoredAgent::new(node, analysis))
        .filter(|agent| agent.score.confidence >= min_confidence)
        .collect();
    rank(&mut collaborators);
    collaborators.truncate(max_agents.saturating_sub(1));

    let plan = ExecutionPlan::AnchorWithCollaborators {
        anchor_id: anchor.node.id.clone(),
        collaborator_ids: collaborators.iter().map(|c| c.node.id.clone()).collect(),
    };

    let mut selected = Vec::with_capacity(collaborators.len() + 1);
    selected.push(anchor.clone());
    selected.extend(collaborators);

    Outcome { selected, plan }
}

/// Ranking with busy agents pushed down
///
/// The reported score of each selected agent is its load-adjusted score.
pub(crate) fn load_balanced<'a>(ranked: &[ScoredAgent<'a>], max_agents: usize) -> Outcome<'a> {
    let mut adjusted: Vec<(ScoredAgent<'a>, LoadAssignment)> = ranked
        .iter()
        .map(|agent| {
            let ratio = load_ratio(agent.profile);
            let adjusted_score = (agent.score.score - ratio * LOAD_PENALTY).max(0.0);
            let assignment = LoadAssignment {
                agent_id: agent.node.id.clone(),
                base_score: agent.score.score,
                load_ratio: ratio,
                adjusted_score,
            };
            let mut agent = agent.clone();
            agent.score.score = adjusted_score;
            agent.score.reasoning.push(format!(
                "load penalty {:.2} ({}/{} tasks)",
                ratio * LOAD_PENALTY,
                agent.profile.current_tasks,
                agent.profile.max_concurrent_tasks
            ));
            (agent, assignment)
        })
        .collect();

    adjusted.sort_by(|(a, _), (b, _)| {
        b.score
            .score
            .total_cmp(&a.score.score)
            .then_with(|| a.node.id.cmp(&b.node.id))
    });
    adjusted.truncate(max_agents);

    let (selected, assignments): (Vec<_>, Vec<_>) = adjusted.into_iter().unzip();
    Outcome {
        selected,
        plan: ExecutionPlan::LoadBalanced { assignments },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::{AgentStatus, Relationship, RelationshipType, TaskComplexity};
    use crate::selection::types::CapabilitySource;

    fn analysis() -> TaskAnalysis {
        TaskAnalysis {
            task_type: Some("feature".into()),
            required_capabilities: vec!["coding".into()],
            capability_source: CapabilitySource::Explicit,
            complexity: TaskComplexity::Medium,
            complexity_score: 0.5,
            priority: 5,
        }
    }

    fn agent(id: &str, priority: i32) -> Node {
        Node::agent(
            id,
            crate::domain::graph::AgentProfile::new("generalist")
                .with_capabilities(["coding"])
                .with_priority(priority),
        )
        .with_id(id)
    }

    fn ranked<'a>(index: &'a GraphIndex, analysis: &TaskAnalysis) -> Vec<ScoredAgent<'a>> {
        let mut agents: Vec<_> = index
            .agents()
            .into_iter()
            .filter_map(|n| ScoredAgent::new(n, analysis))
            .collect();
        rank(&mut agents);
        agents
    }

    fn ids(outcome: &Outcome<'_>) -> Vec<String> {
        outcome.selected.iter().map(|a| a.node.id.clone()).collect()
    }

    #[test]
    fn test_rank_breaks_ties_by_id() {
        let index =
            GraphIndex::from_parts(vec![agent("b", 5), agent("a", 5), agent("c", 4)], vec![])
                .unwrap();
        let analysis = analysis();
        let outcome = greedy(&ranked(&index, &analysis));
        assert_eq!(ids(&outcome), vec!["a"]);
    }

    #[test]
    fn test_sequence_puts_dependencies_first() {
        // a depends on b, b depends on c; a ranks best, c worst
        let index = GraphIndex::from_parts(
            vec![agent("a", 5), agent("b", 4), agent("c", 3)],
            vec![
                Relationship::new("a", "b", RelationshipType::DependsOn),
                Relationship::new("b", "c", RelationshipType::DependsOn),
            ],
        )
        .unwrap();
        let analysis = analysis();
        let outcome = optimal_sequence(&index, &ranked(&index, &analysis), 10);

        assert_eq!(ids(&outcome), vec!["c", "b", "a"]);
        match outcome.plan {
            ExecutionPlan::Sequential { steps } => {
                assert_eq!(steps[0].depends_on, Vec::<String>::new());
                assert_eq!(steps[2].depends_on, vec!["b".to_string()]);
                assert_eq!(steps[2].position, 3);
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn test_sequence_survives_cycles() {
        let index = GraphIndex::from_parts(
            vec![agent("a", 5), agent("b", 4)],
            vec![
                Relationship::new("a", "b", RelationshipType::DependsOn),
                Relationship::new("b", "a", RelationshipType::DependsOn),
            ],
        )
        .unwrap();
        let analysis = analysis();
        let outcome = optimal_sequence(&index, &ranked(&index, &analysis), 10);
        assert_eq!(ids(&outcome), vec!["a", "b"]);
    }

    #[test]
    fn test_sequence_truncates() {
        let index =
            GraphIndex::from_parts(vec![agent("a", 5), agent("b", 4), agent("c", 3)], vec![])
                .unwrap();
        let analysis = analysis();
        let outcome = optimal_sequence(&index, &ranked(&index, &analysis), 2);
        assert_eq!(ids(&outcome), vec!["a", "b"]);
    }

    #[test]
    fn test_collaborative_anchor_and_filter() {
        let disabled = Node::agent(
            "d",
            crate::domain::graph::AgentProfile::new("generalist")
                .with_status(AgentStatus::Disabled),
        )
        .with_id("d");
        let index = GraphIndex::from_parts(
            vec![agent("a", 5), agent("b", 2), agent("c", 1), disabled],
            vec![
                Relationship::new("a", "c", RelationshipType::CollaboratesWith),
                Relationship::new("d", "a", RelationshipType::CollaboratesWith),
            ],
        )
        .unwrap();
        let analysis = analysis();
        let ranked = ranked(&index, &analysis);

        let outcome = collaborative(&index, &analysis, &ranked, 3, 0.6);
        // b is not a collaborator, d falls below the confidence floor
        assert_eq!(ids(&outcome), vec!["a", "c"]);
        assert_eq!(ids(&greedy(&ranked))[0], ids(&outcome)[0]);

        let outcome = collaborative(&index, &analysis, &ranked, 1, 0.0);
        assert_eq!(ids(&outcome), vec!["a"]);
    }

    #[test]
    fn test_load_balancing_prefers_idle_capacity() {
        let busy = Node::agent(
            "a",
            crate::domain::graph::AgentProfile::new("generalist")
                .with_capabilities(["coding"])
                .with_status(AgentStatus::Busy)
                .with_current_tasks(3)
                .with_max_concurrent_tasks(3),
        )
        .with_id("a");
        let index = GraphIndex::from_parts(vec![busy, agent("b", 5)], vec![]).unwrap();
        let analysis = analysis();
        let outcome = load_balanced(&ranked(&index, &analysis), 5);

        assert_eq!(ids(&outcome), vec!["b", "a"]);
        let scores: Vec<f64> = outcome.selected.iter().map(|a| a.score.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        match outcome.plan {
            ExecutionPlan::LoadBalanced { assignments } => {
                assert_eq!(assignments[1].load_ratio, 1.0);
                assert!(assignments[1].adjusted_score < assignments[1].base_score);
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn test_adaptive_resolution() {
        assert_eq!(resolve_adaptive(0.2), SelectionStrategy::Greedy);
        assert_eq!(resolve_adaptive(0.5), SelectionStrategy::OptimalSequence);
        assert_eq!(resolve_adaptive(0.7), SelectionStrategy::Collaborative);
        assert_eq!(resolve_adaptive(1.0), SelectionStrategy::Collaborative);
    }
}
