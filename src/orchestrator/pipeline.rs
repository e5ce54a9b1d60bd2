//! The orchestrator: plan, dispatch, synthesize

use super::config::OrchestratorConfig;
use super::dispatcher::Dispatcher;
use super::planner::Planner;
use super::registry::SpecialistRegistry;
use super::result::{RequestMetadata, RequestResult, REQUEST_CANCELLED};
use super::synthesizer::Synthesizer;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Composition root owning the three phases. Holds no per-request state.
pub struct Orchestrator {
    planner: Planner,
    dispatcher: Dispatcher,
    synthesizer: Synthesizer,
    registry: SpecialistRegistry,
}

impl Orchestrator {
    pub fn new(
        planner: Planner,
        dispatcher: Dispatcher,
        synthesizer: Synthesizer,
        registry: SpecialistRegistry,
    ) -> Self {
        Self {
            planner,
            dispatcher,
            synthesizer,
            registry,
        }
    }

    /// Wire planner and synthesizer on `client` using `config`
    pub fn from_config(
        client: Arc<dyn LlmClient>,
        config: &OrchestratorConfig,
        registry: SpecialistRegistry,
    ) -> Result<Self> {
        let planner = Planner::from_client(client.clone(), &config.planner_model, config.planner_timeout())?;
        let synthesizer = Synthesizer::from_client(client, &config.synthesis_model, config.synthesis_timeout())?;
        let dispatcher = Dispatcher::new(config.dispatch_mode, config.specialist_timeout());
        Ok(Self::new(planner, dispatcher, synthesizer, registry))
    }

    pub fn registry(&self) -> &SpecialistRegistry {
        &self.registry
    }

    /// Answer one request.
    ///
    /// Errors only when the planner's engine is unreachable; every other
    /// failure is folded into the result.
    pub async fn handle_request(&self, user_message: &str) -> Result<RequestResult> {
        self.handle_request_with_cancel(user_message, &CancellationToken::new())
            .await
    }

    /// [`Orchestrator::handle_request`] with caller-driven cancellation.
    ///
    /// Cancelling during planning yields [`Error::Cancelled`]. Cancelling
    /// later skips synthesis and returns whatever specialist replies exist.
    pub async fn handle_request_with_cancel(
        &self,
        user_message: &str,
        cancel: &CancellationToken,
    ) -> Result<RequestResult> {
        let user_message = user_message.trim();
        if user_message.is_empty() {
            return Err(Error::InvalidInput("request is empty".to_string()));
        }

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("request", %request_id);
        self.run_phases(user_message, request_id, cancel)
            .instrument(span)
            .await
    }

    async fn run_phases(
        &self,
        user_message: &str,
        request_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<RequestResult> {
        let started = Instant::now();
        let mut metadata = RequestMetadata::new(request_id, self.dispatcher.mode());

        let plan = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!("request cancelled during planning");
                return Err(Error::Cancelled);
            }
            plan = self.planner.plan(user_message) => plan?,
        };
        metadata.planning_ms = millis(started.elapsed());

        let phase = Instant::now();
        let report = self.dispatcher.dispatch(&plan, &self.registry, cancel).await;
        metadata.dispatch_ms = millis(phase.elapsed());

        let phase = Instant::now();
        let final_answer = if report.cancelled || cancel.is_cancelled() {
            None
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                answer = self.synthesizer.synthesize(user_message, &report.responses) => Some(answer),
            }
        };
        metadata.synthesis_ms = millis(phase.elapsed());

        let final_answer = final_answer.unwrap_or_else(|| {
            tracing::warn!(completed = report.responses.len(), "request cancelled; skipping synthesis");
            metadata.cancelled = true;
            REQUEST_CANCELLED.to_string()
        });
        metadata.total_ms = millis(started.elapsed());

        tracing::info!(
            agents_used = ?report.attempted,
            cancelled = metadata.cancelled,
            total_ms = metadata.total_ms,
            "request complete"
        );

        Ok(RequestResult {
            final_answer,
            agents_used: report.attempted,
            per_agent_responses: report.responses,
            plan,
            metadata,
        })
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
