//! The single owned ledger state.
//!
//! `LedgerState` composes the agent directory, feedback book and validation
//! book with the event journal. Every mutating method validates all of its
//! preconditions before touching any component, so an `Err` always leaves the
//! state unchanged. Events are journaled only after the mutation succeeded.
//!
//! `LedgerSnapshot` is the durable form; [`LedgerState::restore`] checks the
//! durability-visible invariants before accepting one.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::AgentDirectory;
use crate::error::LedgerError;
use crate::events::{LedgerEvent, SequencedEvent};
use crate::feedback::FeedbackBook;
use crate::schema::{
    AgentRecord, FeedbackEntry, FeedbackInput, MetadataEntry, ResponseInput, ValidationRecord,
    MAX_SCORE, MAX_VALUE_DECIMALS,
};
use crate::types::{AgentId, Address, Hash32};
use crate::validation::ValidationBook;
use crate::LedgerResult;

/// Snapshot format version written by this crate.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable image of a [`LedgerState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub next_agent_id: AgentId,
    pub agents: Vec<AgentRecord>,
    pub feedback: Vec<FeedbackEntry>,
    /// Per-agent client enumeration order
    pub client_order: BTreeMap<AgentId, Vec<Address>>,
    /// Validation records in creation order
    pub validations: Vec<ValidationRecord>,
    pub events: Vec<SequencedEvent>,
}

/// Directory, feedback, validations and the event journal.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    directory: AgentDirectory,
    feedback: FeedbackBook,
    validations: ValidationBook,
    journal: Vec<SequencedEvent>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(&self) -> &AgentDirectory {
        &self.directory
    }

    pub fn feedback(&self) -> &FeedbackBook {
        &self.feedback
    }

    pub fn validations(&self) -> &ValidationBook {
        &self.validations
    }

    /// Journaled events with `seq > after`, oldest first.
    pub fn events_since(&self, after: u64) -> &[SequencedEvent] {
        // seq is contiguous from 1, so seq n lives at position n - 1
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(self.journal.len());
        &self.journal[start..]
    }

    pub fn last_seq(&self) -> u64 {
        self.journal.last().map(|e| e.seq).unwrap_or(0)
    }

    fn journal(&mut self, events: Vec<LedgerEvent>, now: DateTime<Utc>) -> Vec<SequencedEvent> {
        let mut seq = self.last_seq();
        let stamped: Vec<SequencedEvent> = events
            .into_iter()
            .map(|event| {
                seq += 1;
                SequencedEvent {
                    seq,
                    recorded_at: now,
                    event,
                }
            })
            .collect();
        self.journal.extend(stamped.iter().cloned());
        stamped
    }

    fn require_agent(&self, agent_id: AgentId) -> LedgerResult<()> {
        if self.directory.contains(agent_id) {
            Ok(())
        } else {
            Err(LedgerError::UnknownAgent { agent_id })
        }
    }

    // -- agent directory -----------------------------------------------------

    pub fn register(
        &mut self,
        caller: Address,
        uri: &str,
        metadata: Vec<MetadataEntry>,
        now: DateTime<Utc>,
    ) -> LedgerResult<(AgentId, Vec<SequencedEvent>)> {
        let mut events = Vec::new();
        let id = self.directory.register(caller, uri, metadata, &mut events)?;
        Ok((id, self.journal(events, now)))
    }

    pub fn set_agent_uri(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        uri: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<Vec<SequencedEvent>> {
        let mut events = Vec::new();
        self.directory.set_uri(caller, agent_id, uri, &mut events)?;
        Ok(self.journal(events, now))
    }

    pub fn set_metadata(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        key: &str,
        value: Vec<u8>,
        now: DateTime<Utc>,
    ) -> LedgerResult<Vec<SequencedEvent>> {
        let mut events = Vec::new();
        self.directory
            .set_metadata(caller, agent_id, key, value, &mut events)?;
        Ok(self.journal(events, now))
    }

    pub fn set_agent_wallet(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        wallet: Option<Address>,
        now: DateTime<Utc>,
    ) -> LedgerResult<Vec<SequencedEvent>> {
        let mut events = Vec::new();
        self.directory
            .set_wallet(caller, agent_id, wallet, &mut events)?;
        Ok(self.journal(events, now))
    }

    // -- feedback ------------------------------------------------------------

    pub fn give_feedback(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        input: FeedbackInput,
        now: DateTime<Utc>,
    ) -> LedgerResult<(u64, Vec<SequencedEvent>)> {
        self.require_agent(agent_id)?;
        let mut events = Vec::new();
        let index = self.feedback.give(caller, agent_id, input, &mut events)?;
        Ok((index, self.journal(events, now)))
    }

    pub fn revoke_feedback(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        index: u64,
        now: DateTime<Utc>,
    ) -> LedgerResult<Vec<SequencedEvent>> {
        let mut events = Vec::new();
        self.feedback.revoke(caller, agent_id, index, &mut events)?;
        Ok(self.journal(events, now))
    }

    // -- validation ----------------------------------------------------------

    pub fn validation_request(
        &mut self,
        validator: Address,
        agent_id: AgentId,
        request_uri: &str,
        request_hash: Hash32,
        now: DateTime<Utc>,
    ) -> LedgerResult<Vec<SequencedEvent>> {
        self.require_agent(agent_id)?;
        let mut events = Vec::new();
        self.validations
            .request(validator, agent_id, request_uri, request_hash, now, &mut events)?;
        Ok(self.journal(events, now))
    }

    pub fn validation_response(
        &mut self,
        caller: Address,
        request_hash: Hash32,
        input: ResponseInput,
        now: DateTime<Utc>,
    ) -> LedgerResult<Vec<SequencedEvent>> {
        let mut events = Vec::new();
        self.validations
            .respond(caller, request_hash, input, now, &mut events)?;
        Ok(self.journal(events, now))
    }

    // -- snapshots -----------------------------------------------------------

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            next_agent_id: self.directory.next_id(),
            agents: self.directory.records().cloned().collect(),
            feedback: self.feedback.entries().cloned().collect(),
            client_order: self
                .feedback
                .client_order()
                .iter()
                .map(|(agent, clients)| (*agent, clients.clone()))
                .collect(),
            validations: self.validations.records().cloned().collect(),
            events: self.journal.clone(),
        }
    }

    /// Rebuild state from a snapshot after checking its invariants.
    pub fn restore(snapshot: LedgerSnapshot) -> LedgerResult<Self> {
        let corrupt = |msg: String| Err(LedgerError::CorruptSnapshot(msg));

        if snapshot.version != SNAPSHOT_VERSION {
            return corrupt(format!("unsupported version {}", snapshot.version));
        }
        if snapshot.next_agent_id < AgentId::FIRST {
            return corrupt("next agent id must be at least 1".to_string());
        }

        // agents
        let mut agents = BTreeMap::new();
        for record in snapshot.agents {
            if record.id < AgentId::FIRST || record.id >= snapshot.next_agent_id {
                return corrupt(format!("agent id {} outside issued range", record.id));
            }
            if agents.insert(record.id, record).is_some() {
                return corrupt("duplicate agent id".to_string());
            }
        }

        // feedback: indices contiguous from 1 per (agent, client), client order
        // lists exactly the clients that have entries
        let mut per_client: HashMap<(AgentId, Address), Vec<u64>> = HashMap::new();
        for entry in &snapshot.feedback {
            if entry.value_decimals > MAX_VALUE_DECIMALS {
                return corrupt(format!("feedback decimals {} too large", entry.value_decimals));
            }
            per_client
                .entry((entry.agent_id, entry.client))
                .or_default()
                .push(entry.index);
        }
        for ((agent, client), indexes) in per_client.iter_mut() {
            indexes.sort_unstable();
            let contiguous = indexes
                .iter()
                .enumerate()
                .all(|(pos, index)| *index == pos as u64 + 1);
            if !contiguous {
                return corrupt(format!(
                    "feedback indices of {client} on agent {agent} are not contiguous from 1"
                ));
            }
        }
        let mut listed = HashSet::new();
        for (agent, clients) in &snapshot.client_order {
            for client in clients {
                if !listed.insert((*agent, *client)) {
                    return corrupt(format!("client {client} listed twice for agent {agent}"));
                }
            }
        }
        let with_entries: HashSet<(AgentId, Address)> = per_client.keys().copied().collect();
        if listed != with_entries {
            return corrupt("client order does not match feedback entries".to_string());
        }

        // validations
        let mut hashes = HashSet::new();
        for record in &snapshot.validations {
            if !hashes.insert(record.request.request_hash) {
                return corrupt(format!(
                    "duplicate request hash {}",
                    record.request.request_hash
                ));
            }
            if let Some(response) = &record.response {
                if response.score > MAX_SCORE {
                    return corrupt(format!("validation score {} too large", response.score));
                }
            }
        }

        // journal
        let contiguous = snapshot
            .events
            .iter()
            .enumerate()
            .all(|(pos, e)| e.seq == pos as u64 + 1);
        if !contiguous {
            return corrupt("event sequence is not contiguous from 1".to_string());
        }

        Ok(LedgerState {
            directory: AgentDirectory::from_parts(snapshot.next_agent_id, agents),
            feedback: FeedbackBook::from_parts(
                snapshot.feedback,
                snapshot.client_order.into_iter().collect(),
            ),
            validations: ValidationBook::from_records(snapshot.validations),
            journal: snapshot.events,
        })
    }
}
