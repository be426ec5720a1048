//! Computer-controlled participants
//!
//! Each bot force joins the session as its own client: it connects under a
//! display name, waits until the server has given it a player slot, then
//! pushes its player record and units. Every failure is reported and ends
//! this bot only; the rest of the session carries on.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::clock::Clock;
use super::deployment::inherit_deploy_round;
use super::events::{EventSink, LaunchIssue, LaunchStep, SessionEvent};
use super::force_label;
use super::registry::{BotState, BotSummary, SharedRegistry};
use crate::campaign::ForceDescriptor;
use crate::core::config::SessionConfig;
use crate::core::error::{Result, SortieError};
use crate::core::types::PlayerHandle;
use crate::engine::{EngineClient, EngineConnector, EngineEntity, PlayerInfo};

pub struct BotActor {
    name: String,
    state: BotState,
    client: Option<Arc<dyn EngineClient>>,
    handle: Option<PlayerHandle>,
    registry: SharedRegistry,
    events: EventSink,
}

impl BotActor {
    /// `name` must already be reserved in `registry`
    pub fn new(name: String, registry: SharedRegistry, events: EventSink) -> Self {
        Self {
            name,
            state: BotState::Unconnected,
            client: None,
            handle: None,
            registry,
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    fn transition(&mut self, state: BotState) {
        debug!(bot = %self.name, from = ?self.state, to = ?state, "bot transition");
        self.state = state;
        self.registry.lock().set_state(&self.name, state);
        self.events.emit(SessionEvent::BotState {
            name: self.name.clone(),
            state,
        });
    }

    fn fail(&mut self, reason: String) {
        warn!(bot = %self.name, stage = ?self.state, "{}", reason);
        self.state = BotState::Failed;
        self.registry.lock().mark_failed(&self.name, reason.clone());
        self.events.emit(SessionEvent::BotState {
            name: self.name.clone(),
            state: BotState::Failed,
        });
        self.events.emit(SessionEvent::Issue(LaunchIssue {
            step: LaunchStep::Bot(self.name.clone()),
            message: reason,
        }));
    }

    /// Open this bot's connection, retrying up to the configured count
    pub async fn connect(
        &mut self,
        connector: &dyn EngineConnector,
        config: &SessionConfig,
        clock: &dyn Clock,
    ) -> Result<()> {
        let attempts = config.bot_connect_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match connector
                .connect(&self.name, &config.server_host, config.server_port)
                .await
            {
                Ok(client) => {
                    info!(bot = %self.name, attempt, "bot connected");
                    self.registry.lock().attach_client(&self.name, client.clone());
                    self.client = Some(client);
                    self.transition(BotState::Connecting);
                    return Ok(());
                }
                Err(e) => {
                    debug!(bot = %self.name, attempt, error = %e, "bot connection attempt failed");
                    last_error = Some(e);
                    if attempt < attempts {
                        clock.sleep(config.bot_connect_delay()).await;
                    }
                }
            }
        }

        let error = last_error.unwrap_or_else(|| SortieError::Connect {
            host: config.server_host.clone(),
            port: config.server_port,
            reason: "no attempt made".into(),
        });
        self.fail(format!(
            "could not connect after {} attempts: {}",
            attempts, error
        ));
        Err(error)
    }

    /// Poll until the server reports this bot's player slot
    pub async fn await_ready(
        &mut self,
        max_retries: u32,
        retry_delay: Duration,
        clock: &dyn Clock,
    ) -> Result<PlayerHandle> {
        let Some(client) = self.client.clone().filter(|_| self.state == BotState::Connecting) else {
            return Err(SortieError::Engine(format!(
                "{} cannot wait for a player slot while {:?}",
                self.name, self.state
            )));
        };

        for _ in 0..max_retries {
            if let Some(handle) = client.local_player() {
                debug!(bot = %self.name, ?handle, "bot has a player slot");
                self.handle = Some(handle);
                return Ok(handle);
            }
            clock.sleep(retry_delay).await;
        }

        self.fail(format!(
            "no player slot assigned after {} polls",
            max_retries
        ));
        Err(SortieError::NotReady {
            name: self.name.clone(),
            attempts: max_retries,
        })
    }

    /// Push player record then units; returns how many units were submitted
    pub async fn configure(&mut self, force: &ForceDescriptor) -> Result<usize> {
        let (Some(client), Some(handle)) = (self.client.clone(), self.handle) else {
            let reason = format!("{} configured before it was ready", self.name);
            self.fail(reason.clone());
            return Err(SortieError::Engine(reason));
        };
        if self.state != BotState::Connecting {
            let reason = format!("{} cannot be configured while {:?}", self.name, self.state);
            self.fail(reason.clone());
            return Err(SortieError::Engine(reason));
        }

        let info = PlayerInfo {
            name: self.name.clone(),
            camouflage: force.camouflage.clone(),
            colour: force.colour.clone(),
            deployment: force.deployment.clone(),
        };
        if let Err(e) = client.send_player_info(&info).await {
            self.fail(format!("player info rejected: {e}"));
            return Err(e);
        }
        self.transition(BotState::Configured);

        let entities = stamp_bot_entities(&self.name, handle, force);
        let count = entities.len();
        if let Err(e) = client.send_entities(entities).await {
            self.fail(format!("units rejected: {e}"));
            return Err(e);
        }

        self.registry.lock().record_units(&self.name, count);
        self.events.emit(SessionEvent::EntitiesSubmitted {
            client: self.name.clone(),
            count,
        });
        self.transition(BotState::Active);
        info!(bot = %self.name, units = count, team = force.deployment.team, "bot active");
        Ok(count)
    }

    /// Whole connect / ready / configure sequence; never propagates a failure
    pub async fn run(
        mut self,
        force: ForceDescriptor,
        connector: Arc<dyn EngineConnector>,
        config: Arc<SessionConfig>,
        clock: Arc<dyn Clock>,
    ) -> BotSummary {
        if self
            .connect(connector.as_ref(), &config, clock.as_ref())
            .await
            .is_ok()
            && self
                .await_ready(config.bot_ready_retries, config.bot_ready_delay(), clock.as_ref())
                .await
                .is_ok()
        {
            if let Err(e) = self.configure(&force).await {
                debug!(bot = %self.name, error = %e, "bot abandoned during configuration");
            }
        }

        self.registry
            .lock()
            .summary(&self.name)
            .unwrap_or_else(|| BotSummary {
                name: self.name.clone(),
                force: force.name.clone(),
                state: self.state,
                units_submitted: 0,
                failure: None,
            })
    }
}

/// Units of a bot force, owned by the bot and carrying their deploy rounds
pub fn stamp_bot_entities(
    bot_name: &str,
    handle: PlayerHandle,
    force: &ForceDescriptor,
) -> Vec<EngineEntity> {
    let label = force_label(bot_name, &force.name);
    force
        .units
        .iter()
        .cloned()
        .map(|mut entity| {
            entity.owner = Some(handle);
            entity.force_label = label.clone();
            entity.deploy_round = inherit_deploy_round(entity.deploy_round, force.base_deploy_round);
            entity
        })
        .collect()
}
