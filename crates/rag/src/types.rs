//! Data model of the hybrid query pipeline.

use crate::merge::merge_hits;
use catalyst_core::{AppResult, ScoreOrder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single tool call as emitted by the planning model.
///
/// The name is kept verbatim here; it is checked against the known tools
/// when the plan is resolved for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    #[serde(rename = "tool", alias = "name")]
    pub name: String,

    pub arguments: BTreeMap<String, String>,
}

impl ToolInvocation {
    pub fn new<K, V>(name: impl Into<String>, arguments: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            arguments: arguments
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Ordered list of tool invocations produced by the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    #[serde(rename = "tool_calls")]
    pub invocations: Vec<ToolInvocation>,
}

impl ExecutionPlan {
    pub fn new(invocations: Vec<ToolInvocation>) -> Self {
        Self { invocations }
    }

    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }
}

/// A passage returned by a semantic-search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Backend that produced the hit (e.g. "mission_knowledge", "comments")
    pub source: String,

    pub text: String,

    /// Similarity in backend-defined units; see `ScoreOrder`
    pub score: f32,
}

impl SearchHit {
    pub fn new(source: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            score,
        }
    }
}

/// Kinds of structured fact the bundle has a slot for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Mission,
}

/// A structured record as stored, e.g. one mission's known facts.
pub type FactRecord = serde_json::Map<String, serde_json::Value>;

/// Evidence gathered for one request.
///
/// Fact slots are write-once. The passage list is kept merged: ranked by
/// score and bounded to the passage limit after every addition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceBundle {
    facts: BTreeMap<FactKind, FactRecord>,
    passages: Vec<SearchHit>,
}

impl EvidenceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill a fact slot. Returns `false` and keeps the existing value when
    /// the slot is already populated.
    pub fn set_fact(&mut self, kind: FactKind, record: FactRecord) -> bool {
        if self.facts.contains_key(&kind) {
            return false;
        }
        self.facts.insert(kind, record);
        true
    }

    pub fn fact(&self, kind: FactKind) -> Option<&FactRecord> {
        self.facts.get(&kind)
    }

    pub fn has_facts(&self) -> bool {
        !self.facts.is_empty()
    }

    /// Merge `hits` into the ranked passage list, keeping at most `limit`.
    pub fn add_passages(&mut self, hits: Vec<SearchHit>, order: ScoreOrder, limit: usize) {
        let existing = std::mem::take(&mut self.passages);
        self.passages = merge_hits([existing, hits], order, limit);
    }

    pub fn passages(&self) -> &[SearchHit] {
        &self.passages
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.passages.is_empty()
    }

    /// Pretty JSON of the populated fact slots keyed by kind, or `None`
    /// when no slot is populated.
    pub fn structured_data(&self) -> AppResult<Option<String>> {
        if self.facts.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_string_pretty(&self.facts)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(status: &str) -> FactRecord {
        match json!({"mission_name": "Apollo 11", "status": status}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_plan_deserializes_tool_field() {
        let plan: ExecutionPlan = serde_json::from_str(
            r#"{"tool_calls":[{"tool":"get_mission_facts","arguments":{"mission_name":"X"}}]}"#,
        )
        .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.invocations[0].name, "get_mission_facts");
        assert_eq!(plan.invocations[0].arguments["mission_name"], "X");
    }

    #[test]
    fn test_fact_slot_is_write_once() {
        let mut bundle = EvidenceBundle::new();
        assert!(bundle.set_fact(FactKind::Mission, record("complete")));
        assert!(!bundle.set_fact(FactKind::Mission, record("scrubbed")));
        assert_eq!(
            bundle.fact(FactKind::Mission).unwrap()["status"],
            json!("complete")
        );
    }

    #[test]
    fn test_structured_data_absent_when_no_facts() {
        let bundle = EvidenceBundle::new();
        assert!(bundle.is_empty());
        assert_eq!(bundle.structured_data().unwrap(), None);
    }

    #[test]
    fn test_structured_data_is_keyed_by_kind() {
        let mut bundle = EvidenceBundle::new();
        bundle.set_fact(FactKind::Mission, record("complete"));
        let data = bundle.structured_data().unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed["mission"]["status"], "complete");
    }

    #[test]
    fn test_passages_stay_bounded_across_additions() {
        let mut bundle = EvidenceBundle::new();
        for round in 0..4 {
            let hits = (0..3)
                .map(|i| SearchHit::new("comments", format!("{}-{}", round, i), i as f32))
                .collect();
            bundle.add_passages(hits, ScoreOrder::HigherIsBetter, 5);
        }
        assert_eq!(bundle.passages().len(), 5);
        assert!(bundle.passages().iter().all(|h| h.score >= 1.0));
    }
}
