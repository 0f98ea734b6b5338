//! Reputation - agent identity, feedback and validation ledger CLI
//!
//! The `reputation` command runs one registry operation against a local
//! ledger snapshot and prints the result as JSON.
//!
//! ## Commands
//!
//! - `agent`: register and list agents, manage their URI, metadata and wallet
//! - `feedback`: give, revoke, read and aggregate client feedback
//! - `validation`: request validations, respond, read status and summaries
//! - `profile`: combined view of one agent
//! - `events`: the committed event journal

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, Level};

use reputation_core::{
    init_tracing, LedgerConfig, LedgerSession, OperationSpan, ReputationService, METRICS,
};
use reputation_state::{
    AgentId, Address, FeedbackFilter, FeedbackInput, Hash32, MetadataEntry, ResponseInput,
};

#[derive(Parser)]
#[command(name = "reputation")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Agent identity, reputation and validation ledger", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Address the operation is performed as
    #[arg(long, global = true, env = "REPUTATION_FROM")]
    from: Option<Address>,

    /// Ledger snapshot file (default: .reputation/ledger.json)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Append committed events to this JSONL file
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Agent directory operations
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },

    /// Client feedback operations
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },

    /// Validation request/response operations
    Validation {
        #[command(subcommand)]
        action: ValidationAction,
    },

    /// Show an agent with its feedback and validation aggregates
    Profile {
        /// Agent id
        agent: u64,
    },

    /// Print committed events
    Events {
        /// Only events with a sequence number greater than this
        #[arg(long, default_value = "0")]
        since: u64,
    },
}

#[derive(Subcommand)]
enum AgentAction {
    /// Register a new agent owned by --from
    Register {
        /// Agent card URI
        uri: String,

        /// Initial metadata as key=value (repeatable)
        #[arg(short, long = "metadata", value_parser = parse_metadata)]
        metadata: Vec<MetadataEntry>,
    },

    /// List every registered agent
    List,

    /// Show an agent record
    Show { agent: u64 },

    /// Replace the agent URI
    SetUri { agent: u64, uri: String },

    /// Set one metadata key
    SetMetadata {
        agent: u64,
        key: String,
        value: String,
    },

    /// Read one metadata key
    GetMetadata { agent: u64, key: String },

    /// Point the agent wallet at an address
    SetWallet { agent: u64, wallet: Address },

    /// Clear the agent wallet
    UnsetWallet { agent: u64 },

    /// Id the next registration will receive
    NextId,
}

#[derive(Subcommand)]
enum FeedbackAction {
    /// Give feedback to an agent as --from
    Give {
        agent: u64,

        /// Fixed-point value (may be negative)
        #[arg(allow_negative_numbers = true)]
        value: i128,

        /// Decimal places of VALUE (0..=18)
        #[arg(short, long, default_value = "0")]
        decimals: u8,

        #[arg(long, default_value = "")]
        tag1: String,

        #[arg(long, default_value = "")]
        tag2: String,

        /// Service endpoint the feedback is about
        #[arg(long, default_value = "")]
        endpoint: String,

        /// Off-chain feedback document
        #[arg(long, default_value = "")]
        uri: String,

        /// Hash of the feedback document
        #[arg(long)]
        hash: Option<Hash32>,
    },

    /// Revoke feedback previously given by --from
    Revoke { agent: u64, index: u64 },

    /// Read one feedback entry
    Read {
        agent: u64,
        client: Address,
        index: u64,
    },

    /// List feedback entries
    List {
        agent: u64,

        /// Restrict to these clients (repeatable, default: all)
        #[arg(long = "client")]
        clients: Vec<Address>,

        #[arg(long, default_value = "")]
        tag1: String,

        #[arg(long, default_value = "")]
        tag2: String,

        /// Include revoked entries
        #[arg(long)]
        include_revoked: bool,
    },

    /// Sum non-revoked feedback
    Summary {
        agent: u64,

        #[arg(long = "client")]
        clients: Vec<Address>,

        #[arg(long, default_value = "")]
        tag1: String,

        #[arg(long, default_value = "")]
        tag2: String,
    },

    /// Clients that gave feedback, in first-submission order
    Clients { agent: u64 },

    /// Highest feedback index of one client
    LastIndex { agent: u64, client: Address },
}

#[derive(Subcommand)]
enum ValidationAction {
    /// Ask a validator to validate agent work
    Request {
        agent: u64,
        validator: Address,

        /// Request hash
        #[arg(long, required_unless_present = "text", conflicts_with = "text")]
        hash: Option<Hash32>,

        /// Derive the request hash from this text
        #[arg(long)]
        text: Option<String>,

        /// Off-chain request document
        #[arg(long, default_value = "")]
        uri: String,
    },

    /// Respond to a request as its validator (--from)
    Respond {
        hash: Hash32,

        /// Score 0..=100
        score: u8,

        #[arg(long, default_value = "")]
        tag: String,

        #[arg(long, default_value = "")]
        uri: String,

        #[arg(long)]
        response_hash: Option<Hash32>,
    },

    /// Status of one request
    Status { hash: Hash32 },

    /// Request hashes for an agent
    Agent { agent: u64 },

    /// Request hashes assigned to a validator
    Validator { validator: Address },

    /// Average of resolved responses
    Summary {
        agent: u64,

        /// Restrict to these validators (repeatable, default: all)
        #[arg(long = "validator")]
        validators: Vec<Address>,

        #[arg(long, default_value = "")]
        tag: String,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Agent { action } => match action {
                AgentAction::Register { .. } => "agent.register",
                AgentAction::List => "agent.list",
                AgentAction::Show { .. } => "agent.show",
                AgentAction::SetUri { .. } => "agent.set_uri",
                AgentAction::SetMetadata { .. } => "agent.set_metadata",
                AgentAction::GetMetadata { .. } => "agent.get_metadata",
                AgentAction::SetWallet { .. } => "agent.set_wallet",
                AgentAction::UnsetWallet { .. } => "agent.unset_wallet",
                AgentAction::NextId => "agent.next_id",
            },
            Commands::Feedback { action } => match action {
                FeedbackAction::Give { .. } => "feedback.give",
                FeedbackAction::Revoke { .. } => "feedback.revoke",
                FeedbackAction::Read { .. } => "feedback.read",
                FeedbackAction::List { .. } => "feedback.list",
                FeedbackAction::Summary { .. } => "feedback.summary",
                FeedbackAction::Clients { .. } => "feedback.clients",
                FeedbackAction::LastIndex { .. } => "feedback.last_index",
            },
            Commands::Validation { action } => match action {
                ValidationAction::Request { .. } => "validation.request",
                ValidationAction::Respond { .. } => "validation.respond",
                ValidationAction::Status { .. } => "validation.status",
                ValidationAction::Agent { .. } => "validation.agent",
                ValidationAction::Validator { .. } => "validation.validator",
                ValidationAction::Summary { .. } => "validation.summary",
            },
            Commands::Profile { .. } => "profile",
            Commands::Events { .. } => "events",
        }
    }
}

fn parse_metadata(raw: &str) -> std::result::Result<MetadataEntry, String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => {
            Ok(MetadataEntry::new(key, value.as_bytes().to_vec()))
        }
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

fn require_caller(from: Option<Address>) -> Result<Address> {
    match from {
        Some(addr) => Ok(addr),
        None => bail!("this command changes the ledger: pass --from <ADDRESS>"),
    }
}

/// Pretty JSON straight from the typed value. Feedback values are `i128`,
/// which `serde_json::Value` cannot hold past the `i64`/`u64` range.
fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn feedback_filter(clients: Vec<Address>, tag1: String, tag2: String) -> FeedbackFilter {
    FeedbackFilter::all().clients(clients).tag1(tag1).tag2(tag2)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = LedgerConfig::from_env().context("invalid REPUTATION_* environment")?;
    if let Some(path) = &cli.state {
        config = config.with_state_path(path);
    }
    if let Some(path) = &cli.audit_log {
        config = config.with_audit_log(path);
    }
    let json_logs = cli.json || config.json_logs;
    config = config.with_json_logs(json_logs);

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(config.json_logs, level);

    let mut session = LedgerSession::open(&config)
        .await
        .with_context(|| format!("failed to open ledger at {}", config.state_path.display()))?;

    let output = {
        let _span = OperationSpan::enter(cli.command.name(), &cli.from.unwrap_or(Address::ZERO));
        run(cli.command, session.service(), cli.from).await?
    };

    if session
        .commit()
        .await
        .with_context(|| format!("failed to save ledger to {}", config.state_path.display()))?
    {
        debug!(path = %config.state_path.display(), "ledger saved");
    }

    println!("{output}");

    if cli.verbose {
        METRICS.flush();
    }
    Ok(())
}

async fn run(
    command: Commands,
    service: &ReputationService,
    from: Option<Address>,
) -> Result<String> {
    match command {
        Commands::Agent { action } => match action {
            AgentAction::Register { uri, metadata } => {
                cmd_agent_register(service, &require_caller(from)?, &uri, metadata).await
            }
            AgentAction::List => render(&service.list_agents().await?),
            AgentAction::Show { agent } => cmd_agent_show(service, AgentId(agent)).await,
            AgentAction::SetUri { agent, uri } => {
                cmd_agent_set_uri(service, &require_caller(from)?, AgentId(agent), &uri).await
            }
            AgentAction::SetMetadata { agent, key, value } => {
                let caller = require_caller(from)?;
                cmd_agent_set_metadata(service, &caller, AgentId(agent), &key, &value).await
            }
            AgentAction::GetMetadata { agent, key } => {
                cmd_agent_get_metadata(service, AgentId(agent), &key).await
            }
            AgentAction::SetWallet { agent, wallet } => {
                let caller = require_caller(from)?;
                cmd_agent_wallet(service, &caller, AgentId(agent), Some(wallet)).await
            }
            AgentAction::UnsetWallet { agent } => {
                cmd_agent_wallet(service, &require_caller(from)?, AgentId(agent), None).await
            }
            AgentAction::NextId => {
                render(&json!({ "next_agent_id": service.next_agent_id().await }))
            }
        },
        Commands::Feedback { action } => match action {
            FeedbackAction::Give {
                agent,
                value,
                decimals,
                tag1,
                tag2,
                endpoint,
                uri,
                hash,
            } => {
                let input = FeedbackInput::rating(value, tag1, tag2)
                    .with_decimals(decimals)
                    .with_endpoint(endpoint)
                    .with_uri(uri, hash.unwrap_or(Hash32::ZERO));
                cmd_feedback_give(service, &require_caller(from)?, AgentId(agent), input).await
            }
            FeedbackAction::Revoke { agent, index } => {
                cmd_feedback_revoke(service, &require_caller(from)?, AgentId(agent), index).await
            }
            FeedbackAction::Read {
                agent,
                client,
                index,
            } => {
                let entry = service.read_feedback(AgentId(agent), &client, index).await?;
                render(&entry)
            }
            FeedbackAction::List {
                agent,
                clients,
                tag1,
                tag2,
                include_revoked,
            } => {
                let filter = feedback_filter(clients, tag1, tag2);
                cmd_feedback_list(service, AgentId(agent), &filter, include_revoked).await
            }
            FeedbackAction::Summary {
                agent,
                clients,
                tag1,
                tag2,
            } => {
                let filter = feedback_filter(clients, tag1, tag2);
                let summary = service.get_feedback_summary(AgentId(agent), &filter).await?;
                render(&summary)
            }
            FeedbackAction::Clients { agent } => {
                render(&service.get_clients(AgentId(agent)).await?)
            }
            FeedbackAction::LastIndex { agent, client } => {
                let last = service.get_last_index(AgentId(agent), &client).await?;
                render(&json!({ "agent_id": agent, "client": client, "last_index": last }))
            }
        },
        Commands::Validation { action } => match action {
            ValidationAction::Request {
                agent,
                validator,
                hash,
                text,
                uri,
            } => {
                let request_hash = match (hash, text) {
                    (Some(hash), _) => hash,
                    (None, Some(text)) => Hash32::digest(text.as_bytes()),
                    (None, None) => bail!("one of --hash or --text is required"),
                };
                let caller = require_caller(from)?;
                cmd_validation_request(
                    service,
                    &caller,
                    &validator,
                    AgentId(agent),
                    &uri,
                    request_hash,
                )
                .await
            }
            ValidationAction::Respond {
                hash,
                score,
                tag,
                uri,
                response_hash,
            } => {
                let input = ResponseInput::new(score, tag)
                    .with_uri(uri, response_hash.unwrap_or(Hash32::ZERO));
                cmd_validation_respond(service, &require_caller(from)?, hash, input).await
            }
            ValidationAction::Status { hash } => {
                render(&service.get_validation_status(hash).await?)
            }
            ValidationAction::Agent { agent } => {
                render(&service.get_agent_validations(AgentId(agent)).await?)
            }
            ValidationAction::Validator { validator } => {
                render(&service.get_validator_requests(&validator).await?)
            }
            ValidationAction::Summary {
                agent,
                validators,
                tag,
            } => {
                let summary = service
                    .get_validation_summary(AgentId(agent), &validators, &tag)
                    .await?;
                render(&summary)
            }
        },
        Commands::Profile { agent } => {
            render(&service.agent_profile(AgentId(agent)).await?)
        }
        Commands::Events { since } => render(&service.events_since(since).await),
    }
}

/// Register an agent owned by `caller`
async fn cmd_agent_register(
    service: &ReputationService,
    caller: &Address,
    uri: &str,
    metadata: Vec<MetadataEntry>,
) -> Result<String> {
    let agent_id = service.register(caller, uri, metadata).await?;
    render(&json!({ "agent_id": agent_id, "owner": caller, "uri": uri }))
}

async fn cmd_agent_show(service: &ReputationService, agent: AgentId) -> Result<String> {
    let record = service.resolve(agent).await?;
    render(&record)
}

async fn cmd_agent_set_uri(
    service: &ReputationService,
    caller: &Address,
    agent: AgentId,
    uri: &str,
) -> Result<String> {
    service.set_agent_uri(caller, agent, uri).await?;
    render(&json!({ "agent_id": agent, "uri": uri }))
}

async fn cmd_agent_set_metadata(
    service: &ReputationService,
    caller: &Address,
    agent: AgentId,
    key: &str,
    value: &str,
) -> Result<String> {
    service
        .set_metadata(caller, agent, key, value.as_bytes().to_vec())
        .await?;
    render(&json!({ "agent_id": agent, "key": key, "value": value }))
}

/// Metadata values are bytes; print both a lossy text form and hex.
async fn cmd_agent_get_metadata(
    service: &ReputationService,
    agent: AgentId,
    key: &str,
) -> Result<String> {
    let value = service.get_metadata(agent, key).await?;
    render(&match value {
        Some(bytes) => json!({
            "agent_id": agent,
            "key": key,
            "value": String::from_utf8_lossy(&bytes),
            "hex": format!("0x{}", hex::encode(&bytes)),
        }),
        None => json!({ "agent_id": agent, "key": key, "value": null }),
    })
}

async fn cmd_agent_wallet(
    service: &ReputationService,
    caller: &Address,
    agent: AgentId,
    wallet: Option<Address>,
) -> Result<String> {
    service.set_agent_wallet(caller, agent, wallet).await?;
    render(&json!({ "agent_id": agent, "wallet": wallet }))
}

async fn cmd_feedback_give(
    service: &ReputationService,
    caller: &Address,
    agent: AgentId,
    input: FeedbackInput,
) -> Result<String> {
    let index = service.give_feedback(caller, agent, input).await?;
    render(&json!({ "agent_id": agent, "client": caller, "index": index }))
}

async fn cmd_feedback_revoke(
    service: &ReputationService,
    caller: &Address,
    agent: AgentId,
    index: u64,
) -> Result<String> {
    let newly_revoked = service.revoke_feedback(caller, agent, index).await?;
    render(&json!({
        "agent_id": agent,
        "client": caller,
        "index": index,
        "revoked": true,
        "newly_revoked": newly_revoked,
    }))
}

#[derive(Serialize)]
struct FeedbackRow<'a> {
    client: &'a Address,
    index: u64,
    value: i128,
    value_decimals: u8,
    tag1: &'a str,
    tag2: &'a str,
    revoked: bool,
}

/// Feedback as one JSON object per entry rather than parallel arrays.
async fn cmd_feedback_list(
    service: &ReputationService,
    agent: AgentId,
    filter: &FeedbackFilter,
    include_revoked: bool,
) -> Result<String> {
    let batch = service
        .read_all_feedback(agent, filter, include_revoked)
        .await?;
    let rows: Vec<FeedbackRow<'_>> = (0..batch.len())
        .map(|i| FeedbackRow {
            client: &batch.clients[i],
            index: batch.indexes[i],
            value: batch.values[i],
            value_decimals: batch.value_decimals[i],
            tag1: &batch.tag1s[i],
            tag2: &batch.tag2s[i],
            revoked: batch.revoked[i],
        })
        .collect();
    render(&rows)
}

async fn cmd_validation_request(
    service: &ReputationService,
    caller: &Address,
    validator: &Address,
    agent: AgentId,
    uri: &str,
    request_hash: Hash32,
) -> Result<String> {
    service
        .validation_request(caller, validator, agent, uri, request_hash)
        .await?;
    render(&json!({
        "request_hash": request_hash,
        "validator": validator,
        "agent_id": agent,
    }))
}

async fn cmd_validation_respond(
    service: &ReputationService,
    caller: &Address,
    request_hash: Hash32,
    input: ResponseInput,
) -> Result<String> {
    service
        .validation_response(caller, request_hash, input)
        .await?;
    let status = service.get_validation_status(request_hash).await?;
    render(&status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reputation_state::LedgerError;
    use serde_json::Value;

    fn parsed(out: &str) -> Value {
        serde_json::from_str(out).unwrap()
    }

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    async fn open(dir: &tempfile::TempDir) -> LedgerSession {
        LedgerSession::open(&LedgerConfig::new(dir.path().join("ledger.json")))
            .await
            .unwrap()
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "reputation",
            "feedback",
            "give",
            "1",
            "-5",
            "--tag1",
            "quality",
            "--from",
            "0x0101010101010101010101010101010101010101",
        ])
        .unwrap();
        assert_eq!(cli.from, Some(addr(1)));
        assert_eq!(cli.command.name(), "feedback.give");
        match cli.command {
            Commands::Feedback {
                action: FeedbackAction::Give { value, tag1, .. },
            } => {
                assert_eq!(value, -5);
                assert_eq!(tag1, "quality");
            }
            _ => panic!("expected feedback give"),
        }
    }

    #[test]
    fn validation_request_needs_hash_or_text() {
        let missing = Cli::try_parse_from([
            "reputation",
            "validation",
            "request",
            "1",
            "0x0202020202020202020202020202020202020202",
        ]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "reputation",
            "validation",
            "request",
            "1",
            "0x0202020202020202020202020202020202020202",
            "--text",
            "x",
            "--hash",
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn metadata_flag_parsing() {
        let entry = parse_metadata("agentName=weather=bot").unwrap();
        assert_eq!(entry.key, "agentName");
        assert_eq!(entry.value, b"weather=bot".to_vec());
        assert!(parse_metadata("novalue").is_err());
        assert!(parse_metadata("=x").is_err());
    }

    #[tokio::test]
    async fn test_register_and_feedback_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let owner = addr(1);
        let client = addr(2);

        let mut session = open(&dir).await;
        let out = cmd_agent_register(
            session.service(),
            &owner,
            "ipfs://QmAgent",
            vec![parse_metadata("agentName=demo").unwrap()],
        )
        .await
        .unwrap();
        let out = parsed(&out);
        assert_eq!(out["agent_id"], 1);
        assert!(session.commit().await.unwrap());

        let mut session = open(&dir).await;
        let input = FeedbackInput::rating(5, "quality", "");
        let out = cmd_feedback_give(session.service(), &client, AgentId(1), input)
            .await
            .unwrap();
        let out = parsed(&out);
        assert_eq!(out["index"], 1);
        session.commit().await.unwrap();

        let session = open(&dir).await;
        let meta = cmd_agent_get_metadata(session.service(), AgentId(1), "agentName")
            .await
            .unwrap();
        let meta = parsed(&meta);
        assert_eq!(meta["value"], "demo");
        assert_eq!(meta["hex"], "0x64656d6f");

        let rows = cmd_feedback_list(session.service(), AgentId(1), &FeedbackFilter::all(), true)
            .await
            .unwrap();
        let rows = parsed(&rows);
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["tag1"], "quality");
        assert_eq!(rows[0]["revoked"], false);
    }

    #[tokio::test]
    async fn test_read_only_commands_do_not_create_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = open(&dir).await;

        let out = run(
            Commands::Agent {
                action: AgentAction::NextId,
            },
            session.service(),
            None,
        )
        .await
        .unwrap();
        let out = parsed(&out);
        assert_eq!(out["next_agent_id"], 1);
        assert!(!session.commit().await.unwrap());
        assert!(!dir.path().join("ledger.json").exists());
    }

    #[tokio::test]
    async fn test_mutations_require_from() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(&dir).await;
        let err = run(
            Commands::Agent {
                action: AgentAction::Register {
                    uri: "ipfs://x".to_string(),
                    metadata: vec![],
                },
            },
            session.service(),
            None,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("--from"));
    }

    #[tokio::test]
    async fn test_validation_flow_via_text_hash() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(&dir).await;
        let owner = addr(1);
        let validator = addr(9);
        cmd_agent_register(session.service(), &owner, "", vec![])
            .await
            .unwrap();

        let out = run(
            Commands::Validation {
                action: ValidationAction::Request {
                    agent: 1,
                    validator,
                    hash: None,
                    text: Some("check output 42".to_string()),
                    uri: "ipfs://req".to_string(),
                },
            },
            session.service(),
            Some(owner),
        )
        .await
        .unwrap();
        let out = parsed(&out);
        let hash = Hash32::digest(b"check output 42");
        assert_eq!(out["request_hash"], hash.to_string());

        let status = cmd_validation_respond(
            session.service(),
            &validator,
            hash,
            ResponseInput::new(93, "zkml"),
        )
        .await
        .unwrap();
        let status = parsed(&status);
        assert_eq!(status["response"], 93);
        assert_eq!(status["tag"], "zkml");

        let err = cmd_validation_respond(
            session.service(),
            &validator,
            hash,
            ResponseInput::new(10, "zkml"),
        )
        .await
        .unwrap_err();
        let ledger_err = err
            .downcast_ref::<reputation_core::ReputationError>()
            .and_then(|e| e.as_ledger());
        assert!(matches!(
            ledger_err,
            Some(LedgerError::AlreadyResolved { .. })
        ));
    }

    #[tokio::test]
    async fn test_agent_list_and_repeat_revoke() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(&dir).await;
        let client = addr(2);
        cmd_agent_register(session.service(), &addr(1), "ipfs://one", vec![])
            .await
            .unwrap();
        cmd_agent_register(session.service(), &addr(3), "ipfs://two", vec![])
            .await
            .unwrap();

        let out = run(
            Commands::Agent {
                action: AgentAction::List,
            },
            session.service(),
            None,
        )
        .await
        .unwrap();
        let out = parsed(&out);
        let agents = out.as_array().unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0]["id"], 1);
        assert_eq!(agents[1]["uri"], "ipfs://two");

        let input = FeedbackInput::rating(5, "", "");
        cmd_feedback_give(session.service(), &client, AgentId(1), input)
            .await
            .unwrap();
        let first = cmd_feedback_revoke(session.service(), &client, AgentId(1), 1)
            .await
            .unwrap();
        let first = parsed(&first);
        assert_eq!(first["newly_revoked"], true);
        let again = cmd_feedback_revoke(session.service(), &client, AgentId(1), 1)
            .await
            .unwrap();
        let again = parsed(&again);
        assert_eq!(again["newly_revoked"], false);
        assert_eq!(again["revoked"], true);
    }

    #[tokio::test]
    async fn test_unset_wallet_prints_null() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(&dir).await;
        let owner = addr(1);
        cmd_agent_register(session.service(), &owner, "", vec![])
            .await
            .unwrap();
        let out = cmd_agent_wallet(session.service(), &owner, AgentId(1), None)
            .await
            .unwrap();
        let out = parsed(&out);
        assert!(out["wallet"].is_null());

        let shown = cmd_agent_show(session.service(), AgentId(1)).await.unwrap();
        let shown = parsed(&shown);
        assert!(shown["wallet"].is_null());
    }
}
