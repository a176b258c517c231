//! Orchestration engine
//!
//! This module implements the core orchestration pipeline. Every `process`
//! call runs the same sequence:
//!
//! 1. Hydrate conversation state from the state manager
//! 2. Compute the candidate role list (explicit ids > required tags >
//!    capability check, with excluded tags applied last)
//! 3. Dispatch to the configured execution mode
//! 4. Merge the final response's state delta into the context
//! 5. Persist state and return the response
//!
//! `process` is infallible at the type level: role failures, step timeouts,
//! and "no suitable role" all surface as a response with
//! `is_complete = false`, never as an error or panic reaching the caller.
//!
//! # Modes
//!
//! - **FirstMatch**: only the top candidate runs; its response is returned
//!   verbatim.
//! - **Sequential**: candidates run in order on the same context, so each
//!   step's state delta is visible to the next; results are aggregated.
//! - **Parallel**: candidates run concurrently against independent context
//!   snapshots, bounded by `max_concurrency`; results are merged in
//!   candidate-list order, never completion order, so the outcome is
//!   deterministic.
//! - **Pipeline**: candidates run in order; a step naming `next_roles`
//!   feeds its content forward as the next step's input. A step that is
//!   complete with no `next_roles` terminates the pipeline and its response
//!   is returned as-is — pipeline mode never aggregates.

use sdk::{BotRole, ExecutionMode, OrchestrationConfig, RoleContext, RoleResponse};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::registry::RoleRegistry;
use crate::state::StateManager;

pub mod aggregate;

use aggregate::{merge_state, Aggregate};

/// The orchestration engine: the sole entry point for request processing
pub struct BotOrchestrator {
    registry: Arc<RoleRegistry>,
    state: Arc<StateManager>,
}

impl BotOrchestrator {
    /// Create an orchestrator over the given registry and state manager
    pub fn new(registry: Arc<RoleRegistry>, state: Arc<StateManager>) -> Self {
        Self { registry, state }
    }

    /// The role registry backing this orchestrator
    pub fn registry(&self) -> &Arc<RoleRegistry> {
        &self.registry
    }

    /// The state manager backing this orchestrator
    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    /// Process a request and produce a single merged response
    ///
    /// Never returns an error: every failure mode is converted into a
    /// response with `is_complete = false`.
    pub async fn process(
        &self,
        context: &mut RoleContext,
        config: &OrchestrationConfig,
    ) -> RoleResponse {
        let started = Instant::now();

        if context.request_id.is_empty() {
            context.request_id = Uuid::new_v4().to_string();
        }

        self.state.load(context).await;

        let candidates = self.candidates(context, config);

        info!(
            "Processing request '{}' in {} mode with {} candidate(s)",
            context.request_id,
            config.execution_mode,
            candidates.len()
        );

        if candidates.is_empty() {
            warn!(
                "No suitable role for request '{}' (input: {} chars)",
                context.request_id,
                context.input.len()
            );
            // Nothing ran, so nothing is persisted
            return self.annotate(
                RoleResponse::incomplete("No suitable role is available to handle this request."),
                config.execution_mode,
                0,
                started,
            );
        }

        let candidate_count = candidates.len();
        let response = match config.execution_mode {
            ExecutionMode::FirstMatch => self.run_first_match(context, config, &candidates).await,
            ExecutionMode::Sequential => self.run_sequential(context, config, &candidates).await,
            ExecutionMode::Parallel => self.run_parallel(context, config, &candidates).await,
            ExecutionMode::Pipeline => self.run_pipeline(context, config, &candidates).await,
        };

        merge_state(&mut context.state, &response.updated_state);
        self.state.save(context).await;

        self.annotate(response, config.execution_mode, candidate_count, started)
    }

    /// Compute the candidate role list for this call
    ///
    /// Explicit ids bypass tag/capability filtering and preserve the given
    /// order; unresolvable ids are dropped silently. Excluded tags are
    /// applied last in every branch.
    fn candidates(
        &self,
        context: &RoleContext,
        config: &OrchestrationConfig,
    ) -> Vec<Arc<dyn BotRole>> {
        let mut candidates: Vec<Arc<dyn BotRole>> = if !config.specific_roles.is_empty() {
            config
                .specific_roles
                .iter()
                .filter_map(|id| {
                    let role = self.registry.get(id);
                    if role.is_none() {
                        debug!("Requested role '{}' is not registered, skipping", id);
                    }
                    role
                })
                .collect()
        } else if !config.required_tags.is_empty() {
            self.registry.get_by_tags(&config.required_tags)
        } else {
            self.registry.get_capable(context)
        };

        if !config.excluded_tags.is_empty() {
            candidates.retain(|role| {
                !role
                    .tags()
                    .iter()
                    .any(|tag| config.excluded_tags.contains(tag))
            });
        }

        candidates
    }

    /// Invoke only the top candidate and return its response verbatim
    async fn run_first_match(
        &self,
        context: &RoleContext,
        config: &OrchestrationConfig,
        candidates: &[Arc<dyn BotRole>],
    ) -> RoleResponse {
        self.invoke_step(&candidates[0], context, config).await
    }

    /// Invoke each candidate in order on the same context
    ///
    /// Each step's state delta is merged into the context before the next
    /// step runs, so later steps observe earlier mutations.
    async fn run_sequential(
        &self,
        context: &mut RoleContext,
        config: &OrchestrationConfig,
        candidates: &[Arc<dyn BotRole>],
    ) -> RoleResponse {
        let mut agg = Aggregate::new();

        for role in candidates {
            let response = self.invoke_step(role, context, config).await;
            merge_state(&mut context.state, &response.updated_state);

            let failed = !response.is_complete;
            agg.absorb(role.id(), &response);

            if failed && config.stop_on_first_failure {
                warn!(
                    "Stopping sequential chain after failed step '{}' ({} of {} steps run)",
                    role.id(),
                    agg.steps(),
                    candidates.len()
                );
                break;
            }
        }

        agg.into_response()
    }

    /// Invoke all candidates concurrently against independent snapshots
    ///
    /// No candidate observes another's state mutations mid-flight. Results
    /// are folded in candidate-list order regardless of completion order,
    /// and a failed or timed-out branch never blocks the others.
    async fn run_parallel(
        &self,
        context: &RoleContext,
        config: &OrchestrationConfig,
        candidates: &[Arc<dyn BotRole>],
    ) -> RoleResponse {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));

        let branches = candidates.iter().map(|role| {
            let snapshot = context.clone();
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.ok();
                self.invoke_step(role, &snapshot, config).await
            }
        });

        let responses = futures::future::join_all(branches).await;

        let mut agg = Aggregate::new();
        for (role, response) in candidates.iter().zip(responses) {
            agg.absorb(role.id(), &response);
        }

        agg.into_response()
    }

    /// Invoke candidates in order, feeding content forward between steps
    ///
    /// A step that is complete with empty `next_roles` terminates the
    /// pipeline early and its response is the final result. Exhausting the
    /// candidate list returns the last response produced; no aggregate is
    /// ever built here.
    async fn run_pipeline(
        &self,
        context: &mut RoleContext,
        config: &OrchestrationConfig,
        candidates: &[Arc<dyn BotRole>],
    ) -> RoleResponse {
        let mut last = RoleResponse::incomplete("");

        for role in candidates {
            let response = self.invoke_step(role, context, config).await;
            merge_state(&mut context.state, &response.updated_state);

            if response.is_complete && response.next_roles.is_empty() {
                debug!("Pipeline terminated early at role '{}'", role.id());
                return response;
            }

            if !response.next_roles.is_empty() {
                context.input = response.content.clone();
            }

            last = response;
        }

        last
    }

    /// Invoke a single role with the per-step timeout
    ///
    /// An execution error or an elapsed timer is converted into an
    /// incomplete response with `metadata.error` populated; it never
    /// propagates out of the orchestration run.
    async fn invoke_step(
        &self,
        role: &Arc<dyn BotRole>,
        context: &RoleContext,
        config: &OrchestrationConfig,
    ) -> RoleResponse {
        let step_timeout = Duration::from_secs(config.response_timeout_secs);
        debug!(
            "Invoking role '{}' (timeout: {}s)",
            role.id(),
            config.response_timeout_secs
        );

        let started = Instant::now();
        let result = timeout(step_timeout, role.execute(context)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(mut response)) => {
                debug!("Role '{}' responded in {}ms", role.id(), elapsed_ms);
                response
                    .metadata
                    .insert("elapsed_ms".to_string(), json!(elapsed_ms));
                response
            }
            Ok(Err(e)) => {
                warn!("Role '{}' failed: {}", role.id(), e);
                RoleResponse::incomplete(format!(
                    "Role '{}' failed to produce a response.",
                    role.id()
                ))
                .with_metadata("error", json!(e.to_string()))
                .with_metadata("elapsed_ms", json!(elapsed_ms))
            }
            Err(_) => {
                warn!(
                    "Role '{}' timed out after {}s",
                    role.id(),
                    config.response_timeout_secs
                );
                RoleResponse::incomplete(format!(
                    "Role '{}' failed to produce a response.",
                    role.id()
                ))
                .with_metadata(
                    "error",
                    json!(format!(
                        "timed out after {}s",
                        config.response_timeout_secs
                    )),
                )
                .with_metadata("elapsed_ms", json!(elapsed_ms))
            }
        }
    }

    /// Attach call-level diagnostic metadata to the outgoing response
    fn annotate(
        &self,
        mut response: RoleResponse,
        mode: ExecutionMode,
        candidates: usize,
        started: Instant,
    ) -> RoleResponse {
        response
            .metadata
            .insert("orchestrator.mode".to_string(), json!(mode.as_str()));
        response
            .metadata
            .insert("orchestrator.candidates".to_string(), json!(candidates));
        response.metadata.insert(
            "orchestrator.elapsed_ms".to_string(),
            json!(started.elapsed().as_millis() as u64),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sdk::RoleError;

    struct TaggedRole {
        id: String,
        tags: Vec<String>,
        priority: i32,
    }

    impl TaggedRole {
        fn new(id: &str, tags: &[&str], priority: i32) -> Arc<dyn BotRole> {
            Arc::new(Self {
                id: id.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                priority,
            })
        }
    }

    #[async_trait]
    impl BotRole for TaggedRole {
        fn id(&self) -> &str {
            &self.id
        }

        fn display_name(&self) -> &str {
            &self.id
        }

        fn tags(&self) -> &[String] {
            &self.tags
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn can_handle(&self, _context: &RoleContext) -> bool {
            true
        }

        async fn execute(&self, _context: &RoleContext) -> Result<RoleResponse, RoleError> {
            Ok(RoleResponse::complete(self.id.clone()))
        }
    }

    async fn orchestrator_with(roles: Vec<Arc<dyn BotRole>>) -> BotOrchestrator {
        let registry = Arc::new(RoleRegistry::new());
        for role in roles {
            registry.register(role, None).await.unwrap();
        }
        BotOrchestrator::new(registry, Arc::new(StateManager::in_memory()))
    }

    #[tokio::test]
    async fn test_specific_roles_preserve_order_and_drop_unresolvable() {
        let orchestrator = orchestrator_with(vec![
            TaggedRole::new("a", &[], 10),
            TaggedRole::new("b", &[], 90),
        ])
        .await;

        let config = OrchestrationConfig {
            specific_roles: vec!["b".to_string(), "ghost".to_string(), "a".to_string()],
            ..Default::default()
        };
        let context = RoleContext::new("hi");

        let candidates = orchestrator.candidates(&context, &config);
        let ids: Vec<&str> = candidates.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_required_tags_select_tagged_roles() {
        let orchestrator = orchestrator_with(vec![
            TaggedRole::new("summarizer", &["summarize"], 50),
            TaggedRole::new("echo", &["debug"], 50),
        ])
        .await;

        let config = OrchestrationConfig {
            required_tags: vec!["summarize".to_string()],
            ..Default::default()
        };
        let context = RoleContext::new("hi");

        let candidates = orchestrator.candidates(&context, &config);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id(), "summarizer");
    }

    #[tokio::test]
    async fn test_excluded_tags_applied_after_selection() {
        let orchestrator = orchestrator_with(vec![
            TaggedRole::new("loud", &["text", "noisy"], 90),
            TaggedRole::new("quiet", &["text"], 50),
        ])
        .await;

        let config = OrchestrationConfig {
            required_tags: vec!["text".to_string()],
            excluded_tags: vec!["noisy".to_string()],
            ..Default::default()
        };
        let context = RoleContext::new("hi");

        let candidates = orchestrator.candidates(&context, &config);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id(), "quiet");
    }

    #[tokio::test]
    async fn test_excluded_tags_also_apply_to_specific_roles() {
        let orchestrator =
            orchestrator_with(vec![TaggedRole::new("loud", &["noisy"], 50)]).await;

        let config = OrchestrationConfig {
            specific_roles: vec!["loud".to_string()],
            excluded_tags: vec!["noisy".to_string()],
            ..Default::default()
        };
        let context = RoleContext::new("hi");

        assert!(orchestrator.candidates(&context, &config).is_empty());
    }

    #[tokio::test]
    async fn test_empty_registry_yields_no_suitable_response() {
        let orchestrator = orchestrator_with(vec![]).await;

        let mut context = RoleContext::new("anything");
        let response = orchestrator
            .process(&mut context, &OrchestrationConfig::default())
            .await;

        assert!(!response.is_complete);
        assert!(!response.content.is_empty());
        assert_eq!(
            response.metadata.get("orchestrator.candidates"),
            Some(&json!(0))
        );
    }

    #[tokio::test]
    async fn test_process_generates_request_id_when_absent() {
        let orchestrator = orchestrator_with(vec![TaggedRole::new("echo", &[], 50)]).await;

        let mut context = RoleContext::new("hi");
        assert!(context.request_id.is_empty());

        orchestrator
            .process(&mut context, &OrchestrationConfig::default())
            .await;
        assert!(!context.request_id.is_empty());
    }
}
