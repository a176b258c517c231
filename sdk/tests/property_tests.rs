use proptest::prelude::*;
use sdk::errors::{EngineError, TroupeErrorExt};
use sdk::{ExecutionMode, OrchestrationConfig, RoleContext, RoleResponse};

// Error user hints must always be present and never leak internal detail,
// regardless of the message carried inside the variant.
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "\\PC*") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::UnknownImplementation(error_str.clone()),
            EngineError::DuplicateRoleId(error_str.clone()),
            EngineError::Role(error_str.clone()),
            EngineError::RoleNotFound(error_str.clone()),
            EngineError::State(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            // Hints are static strings and must not echo the raw payload
            prop_assert!(!hint.contains("errors.rs"));
        }
    }
}

// Execution mode names survive a display/parse round trip, and the parsed
// value matches what serde would produce for the same string.
proptest! {
    #[test]
    fn test_execution_mode_roundtrip(idx in 0usize..4) {
        let modes = [
            ExecutionMode::FirstMatch,
            ExecutionMode::Sequential,
            ExecutionMode::Parallel,
            ExecutionMode::Pipeline,
        ];
        let mode = modes[idx];

        let parsed: ExecutionMode = mode.to_string().parse().unwrap();
        prop_assert_eq!(parsed, mode);

        let json = format!("\"{}\"", mode);
        let from_serde: ExecutionMode = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(from_serde, mode);
    }
}

// Orchestration configs survive a serde round trip with all fields intact.
proptest! {
    #[test]
    fn test_orchestration_config_roundtrip(
        roles in proptest::collection::vec("[a-z][a-z0-9_.-]{0,16}", 0..4),
        tags in proptest::collection::vec("[a-z]{1,8}", 0..4),
        stop in any::<bool>(),
        max_concurrency in 1usize..32,
        timeout in 1u64..300,
    ) {
        let config = OrchestrationConfig {
            execution_mode: ExecutionMode::Sequential,
            specific_roles: roles,
            required_tags: tags.clone(),
            excluded_tags: tags,
            stop_on_first_failure: stop,
            max_concurrency,
            response_timeout_secs: timeout,
        };

        let json = serde_json::to_string(&config).unwrap();
        let back: OrchestrationConfig = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(back.execution_mode, config.execution_mode);
        prop_assert_eq!(back.specific_roles, config.specific_roles);
        prop_assert_eq!(back.required_tags, config.required_tags);
        prop_assert_eq!(back.excluded_tags, config.excluded_tags);
        prop_assert_eq!(back.stop_on_first_failure, config.stop_on_first_failure);
        prop_assert_eq!(back.max_concurrency, config.max_concurrency);
        prop_assert_eq!(back.response_timeout_secs, config.response_timeout_secs);
    }
}

// The context envelope never produces null containers, whatever the inputs.
proptest! {
    #[test]
    fn test_context_state_never_null(
        input in "\\PC{0,64}",
        conversation in "[a-z0-9-]{0,16}",
        keys in proptest::collection::vec("[a-z]{1,8}", 0..8),
    ) {
        let mut ctx = RoleContext::new(input).with_conversation(conversation);
        for (i, key) in keys.iter().enumerate() {
            ctx = ctx.with_state(key.clone(), serde_json::json!(i));
        }

        let json = serde_json::to_string(&ctx).unwrap();
        let back: RoleContext = serde_json::from_str(&json).unwrap();

        // State is a real map after the round trip, holding every distinct key
        let distinct: std::collections::HashSet<_> = keys.iter().collect();
        prop_assert_eq!(back.state.len(), distinct.len());
        prop_assert_eq!(back.input, ctx.input);
    }
}

// Response builders accumulate state deltas without dropping entries.
proptest! {
    #[test]
    fn test_response_builder_accumulates(
        entries in proptest::collection::btree_map("[a-z]{1,8}", 0i64..1000, 0..8),
    ) {
        let mut resp = RoleResponse::complete("ok");
        for (key, value) in &entries {
            resp = resp.with_state(key.clone(), serde_json::json!(value));
        }

        prop_assert_eq!(resp.updated_state.len(), entries.len());
        for (key, value) in &entries {
            prop_assert_eq!(resp.updated_state.get(key), Some(&serde_json::json!(value)));
        }
    }
}
