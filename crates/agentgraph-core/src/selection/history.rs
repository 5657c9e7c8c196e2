//! Bounded log of past selections and the analytics derived from it

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::types::{SelectionResult, SelectionStrategy, TaskDescriptor};

/// Records kept before the oldest are evicted
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// One completed selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub recorded_at: DateTime<Utc>,
    pub task_type: String,
    pub session_id: Option<String>,
    pub required_capabilities: Vec<String>,
    pub agent_ids: Vec<String>,
    pub strategy: SelectionStrategy,
    pub resolved_strategy: SelectionStrategy,
    pub total_confidence: f64,
}

impl SelectionRecord {
    pub fn new(task: &TaskDescriptor, result: &SelectionResult) -> Self {
        Self {
            recorded_at: Utc::now(),
            task_type: task.task_type.clone(),
            session_id: task.session_id.clone(),
            required_capabilities: result.metadata.required_capabilities.clone(),
            agent_ids: result.agents.iter().map(|a| a.id.clone()).collect(),
            strategy: result.strategy,
            resolved_strategy: result.resolved_strategy,
            total_confidence: result.total_confidence,
        }
    }
}

/// Aggregates over the retained history, keyed by resolved strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionAnalytics {
    pub total_selections: u64,
    pub empty_selections: u64,
    pub strategy_usage: BTreeMap<String, u64>,
    pub average_confidence_by_strategy: BTreeMap<String, f64>,
    /// How often each agent id was selected
    pub agent_usage: BTreeMap<String, u64>,
}

/// Ring buffer of selection records
#[derive(Debug)]
pub struct SelectionHistory {
    capacity: usize,
    records: Mutex<VecDeque<SelectionRecord>>,
}

impl SelectionHistory {
    /// A capacity of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn record(&self, record: SelectionRecord) {
        let mut records = self.records.lock().await;
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Most recent records, newest last
    pub async fn recent(&self, limit: usize) -> Vec<SelectionRecord> {
        let records = self.records.lock().await;
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    pub async fn analytics(&self) -> SelectionAnalytics {
        let records = self.records.lock().await;
        let mut analytics = SelectionAnalytics {
            total_selections: records.len() as u64,
            ..Default::default()
        };

        let mut confidence_sums: BTreeMap<String, f64> = BTreeMap::new();
        for record in records.iter() {
            let strategy = record.resolved_strategy.as_str().to_string();
            *analytics.strategy_usage.entry(strategy.clone()).or_insert(0) += 1;
            *confidence_sums.entry(strategy).or_insert(0.0) += record.total_confidence;

            if record.agent_ids.is_empty() {
                analytics.empty_selections += 1;
            }
            for agent_id in &record.agent_ids {
                *analytics.agent_usage.entry(agent_id.clone()).or_insert(0) += 1;
            }
        }

        analytics.average_confidence_by_strategy = confidence_sums
            .into_iter()
            .map(|(strategy, sum)| {
                let count = analytics.strategy_usage.get(&strategy).copied().unwrap_or(1);
                (strategy, sum / count as f64)
            })
            .collect();

        analytics
    }
}

impl Default for SelectionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
