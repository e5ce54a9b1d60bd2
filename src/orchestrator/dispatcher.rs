//! Dispatcher: runs the planned specialists and collects their replies
//!
//! Every launched call ends in exactly one of: the specialist's text, or a
//! specialist-attributed error string (failure, panic or timeout). One
//! specialist failing never affects its siblings.

use super::plan::Plan;
use super::registry::SpecialistRegistry;
use crate::error::Error;
use crate::specialist::Specialist;
use crate::types::AgentName;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// How planned specialists are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// All at once, joined before returning
    #[default]
    Concurrent,
    /// One after another, in plan order
    Sequential,
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    /// Reply (or error string) per agent that finished
    pub responses: BTreeMap<AgentName, String>,
    /// Agents launched, in plan order
    pub attempted: Vec<AgentName>,
    /// Whether cancellation cut the dispatch short
    pub cancelled: bool,
}

/// Task text handed to a specialist. The planner's location is
/// authoritative over any place named in the sub-task.
pub fn specialist_task(location: &str, sub_task: &str) -> String {
    format!(
        "Location: {location}\n\n\
Task: {sub_task}\n\n\
Use exactly \"{location}\" as the location argument for every tool call that takes a \
location, even if the task mentions a different place."
    )
}

struct Job {
    name: AgentName,
    specialist: Arc<dyn Specialist>,
    task: String,
}

/// Executes plans against a [`SpecialistRegistry`]
#[derive(Debug, Clone)]
pub struct Dispatcher {
    mode: DispatchMode,
    timeout: Duration,
}

impl Dispatcher {
    /// `timeout` bounds each specialist call
    pub fn new(mode: DispatchMode, timeout: Duration) -> Self {
        Self { mode, timeout }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Run every planned specialist that is registered and has a sub-task.
    ///
    /// Waits for all launched calls. Cancellation aborts whatever is still
    /// running and returns the replies collected so far.
    pub async fn dispatch(
        &self,
        plan: &Plan,
        registry: &SpecialistRegistry,
        cancel: &CancellationToken,
    ) -> DispatchReport {
        let location = plan.dispatch_location();
        let jobs: Vec<Job> = plan
            .agents_needed()
            .iter()
            .filter_map(|&name| {
                let Some(specialist) = registry.get(name) else {
                    tracing::warn!(agent = %name, "no specialist registered; skipping");
                    return None;
                };
                let sub_task = plan.sub_task(name)?;
                Some(Job {
                    name,
                    specialist,
                    task: specialist_task(location, sub_task),
                })
            })
            .collect();

        if cancel.is_cancelled() {
            return DispatchReport {
                cancelled: true,
                ..DispatchReport::default()
            };
        }

        match self.mode {
            DispatchMode::Concurrent => self.run_concurrent(jobs, cancel).await,
            DispatchMode::Sequential => self.run_sequential(jobs, cancel).await,
        }
    }

    async fn run_concurrent(&self, jobs: Vec<Job>, cancel: &CancellationToken) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut set = JoinSet::new();

        for job in jobs {
            report.attempted.push(job.name);
            let timeout = self.timeout;
            set.spawn(async move {
                let text = invoke(job.name, job.specialist, job.task, timeout).await;
                (job.name, text)
            });
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(in_flight = set.len(), "dispatch cancelled");
                    set.abort_all();
                    report.cancelled = true;
                    break;
                }
                joined = set.join_next() => match joined {
                    Some(Ok((name, text))) => {
                        report.responses.insert(name, text);
                    }
                    Some(Err(e)) => tracing::error!(error = %e, "specialist task did not complete"),
                    None => break,
                },
            }
        }

        report
    }

    async fn run_sequential(&self, jobs: Vec<Job>, cancel: &CancellationToken) -> DispatchReport {
        let mut report = DispatchReport::default();

        for job in jobs {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            report.attempted.push(job.name);
            let name = job.name;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(agent = %name, "dispatch cancelled");
                    report.cancelled = true;
                    break;
                }
                text = invoke(name, job.specialist, job.task, self.timeout) => {
                    report.responses.insert(name, text);
                }
            }
        }

        report
    }
}

/// One guarded specialist call: errors, panics and timeouts become the
/// attributed error string
async fn invoke(
    name: AgentName,
    specialist: Arc<dyn Specialist>,
    task: String,
    timeout: Duration,
) -> String {
    tracing::debug!(agent = %name, "specialist launched");
    let started = Instant::now();
    let call = AssertUnwindSafe(specialist.process_task(&task)).catch_unwind();
    let outcome = tokio::time::timeout(timeout, call).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(Ok(text))) => {
            tracing::info!(agent = %name, elapsed_ms, "specialist completed");
            text
        }
        Ok(Ok(Err(e))) => {
            tracing::warn!(agent = %name, elapsed_ms, error = %e, "specialist failed");
            match &e {
                Error::SpecialistInvocation { agent, .. } if *agent == name => e.to_string(),
                _ => Error::specialist(name, e.to_string()).to_string(),
            }
        }
        Ok(Err(panic)) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(agent = %name, elapsed_ms, panic = %message, "specialist panicked");
            Error::specialist(name, format!("panicked: {}", message)).to_string()
        }
        Err(_) => {
            tracing::warn!(agent = %name, elapsed_ms, "specialist timed out");
            Error::specialist(name, format!("timed out after {}s", timeout.as_secs_f32())).to_string()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Behavior, FakeSpecialist};

    fn plan_for(agents: &[AgentName], location: &str) -> Plan {
        let tasks = agents
            .iter()
            .map(|a| (*a, format!("{} task", a.as_str())))
            .collect();
        Plan::new(agents.iter().copied(), tasks, location, "test")
    }

    fn registry(weather: Arc<FakeSpecialist>, attractions: Arc<FakeSpecialist>) -> SpecialistRegistry {
        SpecialistRegistry::new().with(weather).with(attractions)
    }

    #[tokio::test]
    async fn test_only_planned_agents_run() {
        let weather = Arc::new(FakeSpecialist::replying(AgentName::Weather, "sunny"));
        let attractions = Arc::new(FakeSpecialist::replying(AgentName::Attractions, "museums"));
        let registry = registry(weather.clone(), attractions.clone());

        let report = Dispatcher::new(DispatchMode::Concurrent, Duration::from_secs(5))
            .dispatch(&plan_for(&[AgentName::Weather], "Paris"), &registry, &CancellationToken::new())
            .await;

        assert_eq!(report.attempted, vec![AgentName::Weather]);
        assert_eq!(report.responses.len(), 1);
        assert_eq!(report.responses[&AgentName::Weather], "sunny");
        assert!(attractions.tasks().is_empty());

        let task = &weather.tasks()[0];
        assert!(task.starts_with("Location: Paris\n\nTask: weather task"));
        assert!(task.contains("Use exactly \"Paris\""));
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_agent() {
        for mode in [DispatchMode::Concurrent, DispatchMode::Sequential] {
            for behavior in [Behavior::Fail("quota exceeded".into()), Behavior::Panic] {
                let weather = Arc::new(FakeSpecialist::replying(AgentName::Weather, "rain later"));
                let attractions = Arc::new(FakeSpecialist::new(AgentName::Attractions, behavior));
                let report = Dispatcher::new(mode, Duration::from_secs(5))
                    .dispatch(
                        &plan_for(&AgentName::ALL, "Austin"),
                        &registry(weather, attractions),
                        &CancellationToken::new(),
                    )
                    .await;

                assert_eq!(report.responses[&AgentName::Weather], "rain later");
                assert!(report.responses[&AgentName::Attractions].starts_with("Attractions agent error:"));
                assert!(!report.cancelled);
            }
        }
    }

    #[tokio::test]
    async fn test_timeout_does_not_cancel_siblings() {
        let weather = Arc::new(FakeSpecialist::replying(AgentName::Weather, "clear"));
        let attractions = Arc::new(FakeSpecialist::new(
            AgentName::Attractions,
            Behavior::Sleep(Duration::from_secs(10), "too late".into()),
        ));
        let report = Dispatcher::new(DispatchMode::Concurrent, Duration::from_millis(50))
            .dispatch(&plan_for(&AgentName::ALL, "Rome"), &registry(weather, attractions), &CancellationToken::new())
            .await;

        assert_eq!(report.responses[&AgentName::Weather], "clear");
        assert!(report.responses[&AgentName::Attractions].contains("timed out"));
    }

    #[tokio::test]
    async fn test_cancellation_unblocks_join_with_partial_results() {
        let weather = Arc::new(FakeSpecialist::replying(AgentName::Weather, "windy"));
        let attractions = Arc::new(FakeSpecialist::new(
            AgentName::Attractions,
            Behavior::Sleep(Duration::from_secs(30), "never".into()),
        ));
        let registry = registry(weather, attractions);
        let plan = plan_for(&AgentName::ALL, "Chicago");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let report = Dispatcher::new(DispatchMode::Concurrent, Duration::from_secs(60))
            .dispatch(&plan, &registry, &cancel)
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(report.cancelled);
        assert_eq!(report.responses.get(&AgentName::Weather).map(String::as_str), Some("windy"));
        assert!(!report.responses.contains_key(&AgentName::Attractions));
    }

    #[tokio::test]
    async fn test_unregistered_and_empty_plans() {
        let weather = Arc::new(FakeSpecialist::replying(AgentName::Weather, "hot"));
        let registry = SpecialistRegistry::new().with(weather);
        let dispatcher = Dispatcher::new(DispatchMode::Sequential, Duration::from_secs(5));

        let report = dispatcher
            .dispatch(&plan_for(&AgentName::ALL, ""), &registry, &CancellationToken::new())
            .await;
        assert_eq!(report.attempted, vec![AgentName::Weather]);

        let empty = dispatcher
            .dispatch(&plan_for(&[], "Oslo"), &registry, &CancellationToken::new())
            .await;
        assert!(empty.responses.is_empty());
        assert!(empty.attempted.is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_location_uses_sentinel() {
        let weather = Arc::new(FakeSpecialist::replying(AgentName::Weather, "?"));
        let registry = SpecialistRegistry::new().with(weather.clone());
        Dispatcher::new(DispatchMode::Sequential, Duration::from_secs(5))
            .dispatch(&plan_for(&[AgentName::Weather], ""), &registry, &CancellationToken::new())
            .await;
        assert!(weather.tasks()[0].starts_with("Location: unspecified\n"));
    }
}
