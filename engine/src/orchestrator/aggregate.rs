//! Response aggregation rules
//!
//! Sequential and Parallel modes fold per-step responses into one merged
//! response: content concatenated with a blank-line separator, metadata keys
//! prefixed with the producing role's id to avoid collisions, and state
//! deltas merged last-write-wins in step order.

use sdk::context::StateMap;
use sdk::RoleResponse;

/// Merge a state delta into a target map, last write wins
pub fn merge_state(target: &mut StateMap, delta: &StateMap) {
    for (key, value) in delta {
        target.insert(key.clone(), value.clone());
    }
}

/// Accumulator for multi-step execution modes
pub struct Aggregate {
    parts: Vec<String>,
    metadata: StateMap,
    state: StateMap,
    complete: bool,
    steps: usize,
}

impl Aggregate {
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            metadata: StateMap::new(),
            state: StateMap::new(),
            complete: true,
            steps: 0,
        }
    }

    /// Fold one step's response into the aggregate
    ///
    /// Call order defines both the content order and the last-write-wins
    /// order for state deltas.
    pub fn absorb(&mut self, role_id: &str, response: &RoleResponse) {
        if !response.content.is_empty() {
            self.parts.push(response.content.clone());
        }

        for (key, value) in &response.metadata {
            self.metadata
                .insert(format!("{}.{}", role_id, key), value.clone());
        }

        merge_state(&mut self.state, &response.updated_state);
        self.complete = self.complete && response.is_complete;
        self.steps += 1;
    }

    /// Number of steps absorbed so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Build the merged response
    pub fn into_response(self) -> RoleResponse {
        RoleResponse {
            content: self.parts.join("\n\n"),
            is_complete: self.complete,
            updated_state: self.state,
            next_roles: Vec::new(),
            metadata: self.metadata,
        }
    }
}

impl Default for Aggregate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_state_last_write_wins() {
        let mut target = StateMap::from([("x".to_string(), json!(1))]);
        let delta = StateMap::from([
            ("x".to_string(), json!(2)),
            ("y".to_string(), json!("new")),
        ]);

        merge_state(&mut target, &delta);

        assert_eq!(target.get("x"), Some(&json!(2)));
        assert_eq!(target.get("y"), Some(&json!("new")));
    }

    #[test]
    fn test_content_joined_with_blank_line() {
        let mut agg = Aggregate::new();
        agg.absorb("a", &RoleResponse::complete("first"));
        agg.absorb("b", &RoleResponse::complete("second"));

        let merged = agg.into_response();
        assert_eq!(merged.content, "first\n\nsecond");
        assert!(merged.is_complete);
    }

    #[test]
    fn test_empty_content_is_skipped() {
        let mut agg = Aggregate::new();
        agg.absorb("a", &RoleResponse::complete("first"));
        agg.absorb("b", &RoleResponse::incomplete(""));
        agg.absorb("c", &RoleResponse::complete("third"));

        let merged = agg.into_response();
        assert_eq!(merged.content, "first\n\nthird");
        // One incomplete step marks the whole aggregate incomplete
        assert!(!merged.is_complete);
    }

    #[test]
    fn test_metadata_keys_are_id_prefixed() {
        let mut agg = Aggregate::new();
        agg.absorb(
            "summarizer",
            &RoleResponse::complete("s").with_metadata("elapsed_ms", json!(5)),
        );
        agg.absorb(
            "responder",
            &RoleResponse::complete("r").with_metadata("elapsed_ms", json!(9)),
        );

        let merged = agg.into_response();
        assert_eq!(merged.metadata.get("summarizer.elapsed_ms"), Some(&json!(5)));
        assert_eq!(merged.metadata.get("responder.elapsed_ms"), Some(&json!(9)));
    }

    #[test]
    fn test_state_merged_in_absorb_order() {
        let mut agg = Aggregate::new();
        agg.absorb("a", &RoleResponse::complete("").with_state("x", json!("from-a")));
        agg.absorb("b", &RoleResponse::complete("").with_state("x", json!("from-b")));

        let merged = agg.into_response();
        assert_eq!(merged.updated_state.get("x"), Some(&json!("from-b")));
    }
}
