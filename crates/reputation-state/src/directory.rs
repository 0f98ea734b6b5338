//! Agent directory state: id issuance and owner-gated record mutation.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{LedgerError, Role};
use crate::events::LedgerEvent;
use crate::schema::{AgentRecord, MetadataEntry};
use crate::types::{AgentId, Address};
use crate::LedgerResult;

/// Owns every [`AgentRecord`] and the id counter.
#[derive(Debug, Clone)]
pub struct AgentDirectory {
    next_id: AgentId,
    agents: BTreeMap<AgentId, AgentRecord>,
}

impl Default for AgentDirectory {
    fn default() -> Self {
        Self {
            next_id: AgentId::FIRST,
            agents: BTreeMap::new(),
        }
    }
}

impl AgentDirectory {
    pub(crate) fn from_parts(next_id: AgentId, agents: BTreeMap<AgentId, AgentRecord>) -> Self {
        Self { next_id, agents }
    }

    /// The id the next `register` call will issue.
    pub fn next_id(&self) -> AgentId {
        self.next_id
    }

    pub fn contains(&self, agent_id: AgentId) -> bool {
        self.agents.contains_key(&agent_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &AgentRecord> {
        self.agents.values()
    }

    pub fn resolve(&self, agent_id: AgentId) -> LedgerResult<&AgentRecord> {
        self.agents
            .get(&agent_id)
            .ok_or_else(|| LedgerError::not_found(format!("agent {agent_id}")))
    }

    pub fn register(
        &mut self,
        caller: Address,
        uri: &str,
        metadata: Vec<MetadataEntry>,
        events: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<AgentId> {
        let id = self.next_id;
        // the last id in the range stays unissued so the counter never wraps
        self.next_id = id
            .next()
            .ok_or(LedgerError::AgentIdsExhausted { last: id })?;

        events.push(LedgerEvent::Registered {
            agent_id: id,
            agent_uri: uri.to_string(),
            owner: caller,
        });

        let mut map = BTreeMap::new();
        for entry in metadata {
            events.push(LedgerEvent::MetadataSet {
                agent_id: id,
                key: entry.key.clone(),
                value: entry.value.clone(),
            });
            map.insert(entry.key, entry.value);
        }

        self.agents.insert(
            id,
            AgentRecord {
                id,
                owner: caller,
                wallet: Some(caller),
                uri: uri.to_string(),
                metadata: map,
            },
        );
        debug!(agent_id = %id, owner = %caller, "agent registered");
        Ok(id)
    }

    /// Resolve `agent_id` for mutation by `caller`, enforcing ownership.
    fn owned_mut(&mut self, caller: Address, agent_id: AgentId) -> LedgerResult<&mut AgentRecord> {
        let record = self
            .agents
            .get_mut(&agent_id)
            .ok_or_else(|| LedgerError::not_found(format!("agent {agent_id}")))?;
        if record.owner != caller {
            return Err(LedgerError::unauthorized(
                caller,
                Role::Owner,
                format!("agent {agent_id}"),
            ));
        }
        Ok(record)
    }

    pub fn set_uri(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        uri: &str,
        events: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<()> {
        let record = self.owned_mut(caller, agent_id)?;
        record.uri = uri.to_string();
        events.push(LedgerEvent::UriUpdated {
            agent_id,
            agent_uri: uri.to_string(),
            updated_by: caller,
        });
        Ok(())
    }

    pub fn set_metadata(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        key: &str,
        value: Vec<u8>,
        events: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<()> {
        let record = self.owned_mut(caller, agent_id)?;
        record.metadata.insert(key.to_string(), value.clone());
        events.push(LedgerEvent::MetadataSet {
            agent_id,
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    pub fn set_wallet(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        wallet: Option<Address>,
        events: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<()> {
        let record = self.owned_mut(caller, agent_id)?;
        record.wallet = wallet;
        events.push(LedgerEvent::WalletUpdated { agent_id, wallet });
        Ok(())
    }
}
