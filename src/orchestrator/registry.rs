//! Explicit capability registry handed to the dispatcher

use crate::config::{AttractionsApiConfig, WeatherApiConfig};
use crate::error::Result;
use crate::llm_client::LlmClient;
use crate::specialist::{Specialist, SpecialistAgent, SpecialistSettings};
use crate::tools::{OpenWeatherClient, TripAdvisorClient};
use crate::types::AgentName;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maps each [`AgentName`] to the specialist that serves it
#[derive(Clone, Default)]
pub struct SpecialistRegistry {
    specialists: BTreeMap<AgentName, Arc<dyn Specialist>>,
}

impl SpecialistRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in weather and attractions specialists, data
    /// providers configured from the environment
    pub fn from_env(client: Arc<dyn LlmClient>, settings: &SpecialistSettings) -> Result<Self> {
        let weather = Arc::new(OpenWeatherClient::new(WeatherApiConfig::from_env()?)?);
        let attractions = Arc::new(TripAdvisorClient::new(AttractionsApiConfig::from_env()?)?);

        Ok(Self::new()
            .with(Arc::new(SpecialistAgent::weather(client.clone(), weather, settings)?))
            .with(Arc::new(SpecialistAgent::attractions(client, attractions, settings)?)))
    }

    /// Register a specialist under its own name, returning the one it replaced
    pub fn register(&mut self, specialist: Arc<dyn Specialist>) -> Option<Arc<dyn Specialist>> {
        self.specialists.insert(specialist.name(), specialist)
    }

    /// Builder form of [`SpecialistRegistry::register`]
    pub fn with(mut self, specialist: Arc<dyn Specialist>) -> Self {
        self.register(specialist);
        self
    }

    /// Specialist serving `name`
    pub fn get(&self, name: AgentName) -> Option<Arc<dyn Specialist>> {
        self.specialists.get(&name).cloned()
    }

    /// Whether `name` is served
    pub fn contains(&self, name: AgentName) -> bool {
        self.specialists.contains_key(&name)
    }

    /// Registered names in canonical order
    pub fn names(&self) -> Vec<AgentName> {
        self.specialists.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.specialists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specialists.is_empty()
    }
}

impl std::fmt::Debug for SpecialistRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecialistRegistry")
            .field("specialists", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSpecialist;

    #[test]
    fn test_register_keys_by_specialist_name() {
        let mut registry = SpecialistRegistry::new()
            .with(Arc::new(FakeSpecialist::replying(AgentName::Attractions, "museums")));
        assert!(registry.contains(AgentName::Attractions));
        assert!(!registry.contains(AgentName::Weather));

        let replaced = registry.register(Arc::new(FakeSpecialist::replying(AgentName::Attractions, "parks")));
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec![AgentName::Attractions]);
    }
}
