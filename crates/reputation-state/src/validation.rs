//! Validation workflow state: Pending → Resolved per request hash.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{LedgerError, Role};
use crate::events::LedgerEvent;
use crate::schema::{
    ResponseInput, ValidationRecord, ValidationRequest, ValidationResponse, ValidationSummary,
    MAX_SCORE,
};
use crate::types::{AgentId, Address, Hash32};
use crate::LedgerResult;

/// Owns every [`ValidationRecord`], keyed by request hash, plus creation-order
/// indexes by agent and by validator.
#[derive(Debug, Clone, Default)]
pub struct ValidationBook {
    records: HashMap<Hash32, ValidationRecord>,
    order: Vec<Hash32>,
    by_agent: HashMap<AgentId, Vec<Hash32>>,
    by_validator: HashMap<Address, Vec<Hash32>>,
}

impl ValidationBook {
    /// Open a Pending request. The caller must have checked that the agent
    /// exists.
    pub fn request(
        &mut self,
        validator: Address,
        agent_id: AgentId,
        request_uri: &str,
        request_hash: Hash32,
        now: DateTime<Utc>,
        events: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<()> {
        if self.records.contains_key(&request_hash) {
            return Err(LedgerError::DuplicateRequest { request_hash });
        }

        self.insert(ValidationRecord {
            request: ValidationRequest {
                request_hash,
                validator,
                agent_id,
                request_uri: request_uri.to_string(),
                created_at: now,
            },
            response: None,
        });
        events.push(LedgerEvent::ValidationRequest {
            validator,
            agent_id,
            request_uri: request_uri.to_string(),
            request_hash,
        });
        debug!(request_hash = %request_hash.short(), agent_id = %agent_id, "validation requested");
        Ok(())
    }

    /// Attach the single response. Checks run in order: unknown request,
    /// wrong validator, already resolved, score range.
    pub fn respond(
        &mut self,
        caller: Address,
        request_hash: Hash32,
        input: ResponseInput,
        now: DateTime<Utc>,
        events: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<()> {
        let record = self.records.get_mut(&request_hash).ok_or_else(|| {
            LedgerError::not_found(format!("validation request {request_hash}"))
        })?;
        if record.request.validator != caller {
            return Err(LedgerError::unauthorized(
                caller,
                Role::Validator,
                format!("validation request {request_hash}"),
            ));
        }
        if record.is_resolved() {
            return Err(LedgerError::AlreadyResolved { request_hash });
        }
        if input.score > MAX_SCORE {
            return Err(LedgerError::InvalidScore { score: input.score });
        }

        events.push(LedgerEvent::ValidationResponse {
            validator: caller,
            agent_id: record.request.agent_id,
            request_hash,
            response: input.score,
            response_uri: input.response_uri.clone(),
            response_hash: input.response_hash,
            tag: input.tag.clone(),
        });
        debug!(request_hash = %request_hash.short(), score = input.score, "validation resolved");
        record.response = Some(ValidationResponse {
            score: input.score,
            response_uri: input.response_uri,
            response_hash: input.response_hash,
            tag: input.tag,
            updated_at: now,
        });
        Ok(())
    }

    pub fn get(&self, request_hash: &Hash32) -> LedgerResult<&ValidationRecord> {
        self.records.get(request_hash).ok_or_else(|| {
            LedgerError::not_found(format!("validation request {request_hash}"))
        })
    }

    pub fn agent_requests(&self, agent_id: AgentId) -> &[Hash32] {
        self.by_agent.get(&agent_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn validator_requests(&self, validator: Address) -> &[Hash32] {
        self.by_validator
            .get(&validator)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Records for `agent_id` in creation order.
    pub fn agent_records(&self, agent_id: AgentId) -> impl Iterator<Item = &ValidationRecord> {
        self.agent_requests(agent_id)
            .iter()
            .filter_map(|hash| self.records.get(hash))
    }

    /// Every record in global creation order.
    pub fn records(&self) -> impl Iterator<Item = &ValidationRecord> {
        self.order.iter().filter_map(|hash| self.records.get(hash))
    }

    /// Truncating mean of resolved scores for `agent_id`, restricted to
    /// `validators` (empty = all) and `tag` (empty = all).
    pub fn summary(
        &self,
        agent_id: AgentId,
        validators: &[Address],
        tag: &str,
    ) -> ValidationSummary {
        let mut count: u64 = 0;
        let mut total: u64 = 0;
        for record in self.agent_records(agent_id) {
            let Some(response) = &record.response else {
                continue;
            };
            if !validators.is_empty() && !validators.contains(&record.request.validator) {
                continue;
            }
            if !tag.is_empty() && response.tag != tag {
                continue;
            }
            count += 1;
            total += u64::from(response.score);
        }

        if count == 0 {
            return ValidationSummary::default();
        }
        ValidationSummary {
            count,
            // mean of values <= 100 always fits
            average_response: (total / count) as u8,
        }
    }

    fn insert(&mut self, record: ValidationRecord) {
        let hash = record.request.request_hash;
        self.order.push(hash);
        self.by_agent
            .entry(record.request.agent_id)
            .or_default()
            .push(hash);
        self.by_validator
            .entry(record.request.validator)
            .or_default()
            .push(hash);
        self.records.insert(hash, record);
    }

    /// Rebuild from records in creation order. Records must already be
    /// validated.
    pub(crate) fn from_records(records: Vec<ValidationRecord>) -> Self {
        let mut book = ValidationBook::default();
        for record in records {
            book.insert(record);
        }
        book
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Address {
        Address::new([0x77; 20])
    }

    fn resolved(book: &mut ValidationBook, seed: &[u8], score: u8, tag: &str) {
        let mut ev = Vec::new();
        let hash = Hash32::digest(seed);
        book.request(validator(), AgentId(1), "ipfs://req", hash, Utc::now(), &mut ev)
            .unwrap();
        book.respond(validator(), hash, ResponseInput::new(score, tag), Utc::now(), &mut ev)
            .unwrap();
    }

    #[test]
    fn average_truncates_odd_sums() {
        let mut book = ValidationBook::default();
        resolved(&mut book, b"a", 90, "zkml");
        resolved(&mut book, b"b", 91, "zkml");
        let summary = book.summary(AgentId(1), &[], "zkml");
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average_response, 90);
    }

    #[test]
    fn pending_requests_do_not_count() {
        let mut book = ValidationBook::default();
        resolved(&mut book, b"a", 80, "");
        let mut ev = Vec::new();
        book.request(validator(), AgentId(1), "", Hash32::digest(b"p"), Utc::now(), &mut ev)
            .unwrap();
        let summary = book.summary(AgentId(1), &[], "");
        assert_eq!(summary.count, 1);
        assert_eq!(summary.average_response, 80);
    }

    #[test]
    fn score_checked_after_resolution_state() {
        let mut book = ValidationBook::default();
        resolved(&mut book, b"a", 50, "");
        let mut ev = Vec::new();
        let err = book
            .respond(
                validator(),
                Hash32::digest(b"a"),
                ResponseInput::new(200, ""),
                Utc::now(),
                &mut ev,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyResolved { .. }));
    }

    #[test]
    fn empty_summary_is_zero() {
        let book = ValidationBook::default();
        assert_eq!(book.summary(AgentId(1), &[], ""), ValidationSummary::default());
    }
}
