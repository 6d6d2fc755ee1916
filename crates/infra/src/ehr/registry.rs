//! Backend selection by [`EhrSystem`] tag.

use std::sync::Arc;

use medcode_core::lab::InMemoryEhr;
use medcode_core::{Clock, EhrConnector, EhrConnectorFactory, EventBus};
use medcode_domain::config::EhrConfig;
use medcode_domain::{EhrSystem, Result};
use tracing::debug;

use super::{EpicSandboxEhr, MeditechExpanseEhr, OracleHealthEhr};
use crate::connector::ConnectorEvent;

/// Builds every EHR backend from one [`EhrConfig`].
///
/// All remote backends report on the same event bus.
pub struct EhrRegistry {
    config: EhrConfig,
    clock: Arc<dyn Clock>,
    events: EventBus<ConnectorEvent>,
}

impl EhrRegistry {
    pub fn new(config: EhrConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock, events: EventBus::new() }
    }

    pub fn events(&self) -> &EventBus<ConnectorEvent> {
        &self.events
    }

    pub fn config(&self) -> &EhrConfig {
        &self.config
    }
}

impl EhrConnectorFactory for EhrRegistry {
    fn create(&self, system: EhrSystem) -> Result<Box<dyn EhrConnector>> {
        debug!(system = %system, "building EHR backend");
        let clock = Arc::clone(&self.clock);
        let events = self.events.clone();
        Ok(match system {
            EhrSystem::MeditechExpanse => {
                Box::new(MeditechExpanseEhr::new(&self.config.meditech, clock, events)?)
            }
            EhrSystem::EpicSandbox => {
                Box::new(EpicSandboxEhr::new(&self.config.epic, clock, events)?)
            }
            EhrSystem::OracleHealth => Box::new(OracleHealthEhr::new(&self.config.oracle, events)?),
            EhrSystem::InternalSimulator => Box::new(InMemoryEhr::new(clock)),
        })
    }
}
