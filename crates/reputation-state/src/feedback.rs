//! Feedback ledger state.
//!
//! Entries live in one flat `BTreeMap` keyed by `(agent, client, index)`, so
//! the entries of one client form a contiguous, index-ordered range. The
//! per-(agent, client) counter is a separate flat map; client enumeration
//! order is kept per agent in first-submission order.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::error::{LedgerError, Role};
use crate::events::LedgerEvent;
use crate::schema::{
    FeedbackBatch, FeedbackEntry, FeedbackFilter, FeedbackInput, FeedbackSummary,
    MAX_VALUE_DECIMALS,
};
use crate::types::{AgentId, Address, Hash32};
use crate::LedgerResult;

type EntryKey = (AgentId, Address, u64);

/// Owns every [`FeedbackEntry`] for every agent.
#[derive(Debug, Clone, Default)]
pub struct FeedbackBook {
    entries: BTreeMap<EntryKey, FeedbackEntry>,
    last_index: HashMap<(AgentId, Address), u64>,
    clients: HashMap<AgentId, Vec<Address>>,
}

impl FeedbackBook {
    /// Append a new entry and return its index. The caller must have
    /// checked that the agent exists.
    pub fn give(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        input: FeedbackInput,
        events: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<u64> {
        if input.value_decimals > MAX_VALUE_DECIMALS {
            return Err(LedgerError::InvalidDecimals {
                decimals: input.value_decimals,
            });
        }

        let counter = self.last_index.entry((agent_id, caller)).or_insert(0);
        if *counter == 0 {
            self.clients.entry(agent_id).or_default().push(caller);
        }
        *counter += 1;
        let index = *counter;

        events.push(LedgerEvent::NewFeedback {
            agent_id,
            client: caller,
            feedback_index: index,
            value: input.value,
            value_decimals: input.value_decimals,
            indexed_tag1: Hash32::digest(input.tag1.as_bytes()),
            tag1: input.tag1.clone(),
            tag2: input.tag2.clone(),
            endpoint: input.endpoint.clone(),
            feedback_uri: input.feedback_uri.clone(),
            feedback_hash: input.feedback_hash,
        });

        self.entries.insert(
            (agent_id, caller, index),
            FeedbackEntry {
                agent_id,
                client: caller,
                index,
                value: input.value,
                value_decimals: input.value_decimals,
                tag1: input.tag1,
                tag2: input.tag2,
                endpoint: input.endpoint,
                feedback_uri: input.feedback_uri,
                feedback_hash: input.feedback_hash,
                revoked: false,
            },
        );
        debug!(agent_id = %agent_id, client = %caller, index, "feedback appended");
        Ok(index)
    }

    /// Flip `revoked` on the caller's entry. Revoking twice is a no-op.
    pub fn revoke(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        index: u64,
        events: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<()> {
        let Some(entry) = self.entries.get_mut(&(agent_id, caller, index)) else {
            let owned_by_other = self
                .clients
                .get(&agent_id)
                .map(|clients| {
                    clients
                        .iter()
                        .any(|c| self.entries.contains_key(&(agent_id, *c, index)))
                })
                .unwrap_or(false);
            let subject = format!("feedback {index} on agent {agent_id}");
            return Err(if owned_by_other {
                LedgerError::unauthorized(caller, Role::Client, subject)
            } else {
                LedgerError::not_found(subject)
            });
        };

        if entry.revoked {
            return Ok(());
        }
        entry.revoked = true;
        events.push(LedgerEvent::FeedbackRevoked {
            agent_id,
            client: caller,
            feedback_index: index,
        });
        debug!(agent_id = %agent_id, client = %caller, index, "feedback revoked");
        Ok(())
    }

    pub fn read(
        &self,
        agent_id: AgentId,
        client: Address,
        index: u64,
    ) -> LedgerResult<&FeedbackEntry> {
        self.entries.get(&(agent_id, client, index)).ok_or_else(|| {
            LedgerError::not_found(format!(
                "feedback {index} from {client} on agent {agent_id}"
            ))
        })
    }

    pub fn clients(&self, agent_id: AgentId) -> &[Address] {
        self.clients.get(&agent_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn last_index(&self, agent_id: AgentId, client: Address) -> u64 {
        self.last_index.get(&(agent_id, client)).copied().unwrap_or(0)
    }

    /// Every entry, ordered by agent, client address and index.
    pub fn entries(&self) -> impl Iterator<Item = &FeedbackEntry> {
        self.entries.values()
    }

    pub(crate) fn client_order(&self) -> &HashMap<AgentId, Vec<Address>> {
        &self.clients
    }

    /// Entries of one client, index ascending.
    fn client_entries(
        &self,
        agent_id: AgentId,
        client: Address,
    ) -> impl Iterator<Item = &FeedbackEntry> {
        self.entries
            .range((agent_id, client, 1)..=(agent_id, client, u64::MAX))
            .map(|(_, entry)| entry)
    }

    /// Rows selected by `filter`, in client enumeration order then index.
    fn select<'a>(
        &'a self,
        agent_id: AgentId,
        filter: &'a FeedbackFilter,
        include_revoked: bool,
    ) -> impl Iterator<Item = &'a FeedbackEntry> + 'a {
        let clients: Vec<Address> = if filter.clients.is_empty() {
            self.clients(agent_id).to_vec()
        } else {
            let mut seen = HashSet::new();
            filter
                .clients
                .iter()
                .copied()
                .filter(|c| seen.insert(*c))
                .collect()
        };

        clients
            .into_iter()
            .flat_map(move |client| self.client_entries(agent_id, client))
            .filter(move |e| include_revoked || !e.revoked)
            .filter(move |e| e.matches_tags(&filter.tag1, &filter.tag2))
    }

    pub fn read_all(
        &self,
        agent_id: AgentId,
        filter: &FeedbackFilter,
        include_revoked: bool,
    ) -> FeedbackBatch {
        let mut batch = FeedbackBatch::default();
        for entry in self.select(agent_id, filter, include_revoked) {
            batch.push(entry);
        }
        batch
    }

    /// Sum of non-revoked values, each scaled to the largest decimals seen
    /// before being added.
    pub fn summary(
        &self,
        agent_id: AgentId,
        filter: &FeedbackFilter,
    ) -> LedgerResult<FeedbackSummary> {
        let selected: Vec<&FeedbackEntry> = self.select(agent_id, filter, false).collect();
        let Some(max_decimals) = selected.iter().map(|e| e.value_decimals).max() else {
            return Ok(FeedbackSummary::default());
        };

        let mut total: i128 = 0;
        for entry in &selected {
            let factor = 10i128
                .checked_pow(u32::from(max_decimals - entry.value_decimals))
                .ok_or(LedgerError::Overflow {
                    context: "scaling feedback decimals",
                })?;
            let scaled = entry.value.checked_mul(factor).ok_or(LedgerError::Overflow {
                context: "scaling feedback value",
            })?;
            total = total.checked_add(scaled).ok_or(LedgerError::Overflow {
                context: "summing feedback values",
            })?;
        }

        Ok(FeedbackSummary {
            count: selected.len() as u64,
            summary_value: total,
            summary_value_decimals: max_decimals,
        })
    }

    /// Rebuild from a snapshot. Entries must already be validated.
    pub(crate) fn from_parts(
        entries: Vec<FeedbackEntry>,
        clients: HashMap<AgentId, Vec<Address>>,
    ) -> Self {
        let mut book = FeedbackBook {
            clients,
            ..Default::default()
        };
        for entry in entries {
            let counter = book
                .last_index
                .entry((entry.agent_id, entry.client))
                .or_insert(0);
            *counter = (*counter).max(entry.index);
            book.entries
                .insert((entry.agent_id, entry.client, entry.index), entry);
        }
        book
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT: AgentId = AgentId(1);

    fn alice() -> Address {
        Address::new([0xa1; 20])
    }

    fn bob() -> Address {
        Address::new([0x0b; 20])
    }

    #[test]
    fn indices_are_independent_per_client() {
        let mut book = FeedbackBook::default();
        let mut ev = Vec::new();
        let mut give = |client, value| {
            book.give(client, AGENT, FeedbackInput::rating(value, "a", ""), &mut ev)
                .unwrap()
        };
        assert_eq!(give(alice(), 1), 1);
        assert_eq!(give(bob(), 2), 1);
        assert_eq!(give(alice(), 3), 2);
        assert_eq!(book.last_index(AGENT, alice()), 2);
        assert_eq!(book.last_index(AGENT, bob()), 1);
    }

    #[test]
    fn client_order_is_first_submission_not_address_order() {
        let mut book = FeedbackBook::default();
        let mut ev = Vec::new();
        // alice (0xa1..) sorts after bob (0x0b..) but submits first
        book.give(alice(), AGENT, FeedbackInput::rating(1, "", ""), &mut ev).unwrap();
        book.give(bob(), AGENT, FeedbackInput::rating(2, "", ""), &mut ev).unwrap();
        book.give(alice(), AGENT, FeedbackInput::rating(3, "", ""), &mut ev).unwrap();

        assert_eq!(book.clients(AGENT), &[alice(), bob()]);
        let batch = book.read_all(AGENT, &FeedbackFilter::all(), true);
        assert_eq!(batch.clients, vec![alice(), alice(), bob()]);
        assert_eq!(batch.indexes, vec![1, 2, 1]);
        assert_eq!(batch.values, vec![1, 3, 2]);
    }

    #[test]
    fn duplicate_clients_in_filter_are_counted_once() {
        let mut book = FeedbackBook::default();
        let mut ev = Vec::new();
        book.give(alice(), AGENT, FeedbackInput::rating(5, "", ""), &mut ev).unwrap();
        let filter = FeedbackFilter::all().clients([alice(), alice()]);
        let summary = book.summary(AGENT, &filter).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.summary_value, 5);
    }

    #[test]
    fn decimals_above_eighteen_rejected() {
        let mut book = FeedbackBook::default();
        let mut ev = Vec::new();
        let err = book
            .give(alice(), AGENT, FeedbackInput::rating(1, "", "").with_decimals(19), &mut ev)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDecimals { decimals: 19 }));
        assert_eq!(book.last_index(AGENT, alice()), 0);
        assert!(book.clients(AGENT).is_empty());
        assert!(ev.is_empty());
    }

    #[test]
    fn summary_overflow_is_an_error() {
        let mut book = FeedbackBook::default();
        let mut ev = Vec::new();
        book.give(alice(), AGENT, FeedbackInput::rating(i128::MAX, "", ""), &mut ev).unwrap();
        book.give(bob(), AGENT, FeedbackInput::rating(1, "", ""), &mut ev).unwrap();
        let err = book.summary(AGENT, &FeedbackFilter::all()).unwrap_err();
        assert!(matches!(err, LedgerError::Overflow { .. }));
    }

    #[test]
    fn revoke_by_other_client_is_unauthorized() {
        let mut book = FeedbackBook::default();
        let mut ev = Vec::new();
        book.give(alice(), AGENT, FeedbackInput::rating(5, "", ""), &mut ev).unwrap();
        let err = book.revoke(bob(), AGENT, 1, &mut ev).unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { role: Role::Client, .. }));
        let err = book.revoke(bob(), AGENT, 2, &mut ev).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}
