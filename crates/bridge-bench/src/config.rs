use bridge_bot::BotParams;
use bridge_core::model::cardset::{CardSet, parse_deal};
use bridge_core::model::contract::Contract;
use bridge_core::model::player::PlayerPosition;
use bridge_core::model::suit::Suit;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_REPETITIONS: usize = 1;
const DEFAULT_LATENCY_BUDGET_MS: u64 = 2_000;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub deals: DealConfig,
    pub agents: Vec<AgentConfig>,
    pub lineups: Vec<LineupConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.deals.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.metrics.validate()?;
        self.logging.normalize();
        validate_agents(&mut self.agents)?;
        validate_lineups(&self.lineups, &self.agents)?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
        }
    }

    pub fn agent(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|agent| agent.name == name)
    }
}

/// Boards to play and how often.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DealConfig {
    pub seed: Option<u64>,
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
    pub boards: Vec<BoardConfig>,
}

impl DealConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.boards.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "deals.boards".to_string(),
                message: "at least one board must be specified".to_string(),
            });
        }

        if self.repetitions == 0 {
            return Err(ValidationError::InvalidField {
                field: "deals.repetitions".to_string(),
                message: "repetitions must be at least 1".to_string(),
            });
        }

        for (index, board) in self.boards.iter().enumerate() {
            board.validate(index)?;
        }
        Ok(())
    }
}

fn default_repetitions() -> usize {
    DEFAULT_REPETITIONS
}

/// One board: a fixed deal (or a seeded random one), the final contract and
/// the suits each seat bid during the auction.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BoardConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub deal: Option<String>,
    pub contract: String,
    pub declarer: String,
    #[serde(default)]
    pub bids: BTreeMap<String, String>,
}

impl BoardConfig {
    pub fn label(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("board{index:03}"))
    }

    pub fn declarer_seat(&self) -> Result<PlayerPosition, ValidationError> {
        self.declarer
            .parse()
            .map_err(|_| invalid("declarer", format!("unknown seat '{}'", self.declarer)))
    }

    pub fn contract(&self) -> Result<Contract, ValidationError> {
        let declarer = self.declarer_seat()?;
        Contract::parse(&self.contract, declarer).map_err(|err| invalid("contract", err.to_string()))
    }

    /// The fixed deal, `None` when the board is dealt at random.
    pub fn hands(&self) -> Result<Option<[CardSet; 4]>, ValidationError> {
        let Some(text) = self.deal.as_deref() else {
            return Ok(None);
        };
        let hands = parse_deal(text).map_err(|err| invalid("deal", err.to_string()))?;
        if hands.iter().any(|hand| hand.len() != 13) {
            return Err(invalid("deal", "every hand must hold 13 cards".to_string()));
        }
        Ok(Some(hands))
    }

    pub fn bid_suits(&self) -> Result<Vec<(PlayerPosition, Suit)>, ValidationError> {
        self.bids
            .iter()
            .map(|(seat, suit)| {
                let seat = seat
                    .parse::<PlayerPosition>()
                    .map_err(|_| invalid("bids", format!("unknown seat '{seat}'")))?;
                let suit = suit
                    .parse::<Suit>()
                    .map_err(|_| invalid("bids", format!("unknown suit '{suit}'")))?;
                Ok((seat, suit))
            })
            .collect()
    }

    fn validate(&self, index: usize) -> Result<(), ValidationError> {
        let scoped = |err: ValidationError| match err {
            ValidationError::InvalidField { field, message } => ValidationError::InvalidField {
                field: format!("deals.boards[{index}].{field}"),
                message,
            },
        };
        self.contract().map_err(scoped)?;
        self.hands().map_err(scoped)?;
        self.bid_suits().map_err(scoped)?;
        Ok(())
    }
}

/// Definition of a card-play strategy.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub kind: AgentKind,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Naive,
    Minimax,
    Oracle,
}

/// Which agent plays the declaring side and which defends.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LineupConfig {
    pub declarer: String,
    pub defenders: String,
}

impl LineupConfig {
    pub fn label(&self) -> String {
        format!("{} vs {}", self.declarer, self.defenders)
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Metrics configuration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricsConfig {
    #[serde(default = "default_latency_budget_ms")]
    pub latency_budget_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            latency_budget_ms: DEFAULT_LATENCY_BUDGET_MS,
        }
    }
}

impl MetricsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.latency_budget_ms == 0 {
            return Err(ValidationError::InvalidField {
                field: "metrics.latency_budget_ms".to_string(),
                message: "latency budget must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn default_latency_budget_ms() -> u64 {
    DEFAULT_LATENCY_BUDGET_MS
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn invalid(field: &str, message: String) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        message,
    }
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_agents(agents: &mut [AgentConfig]) -> Result<(), ValidationError> {
    if agents.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "agents".to_string(),
            message: "at least one agent must be specified".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for agent in agents.iter_mut() {
        if agent.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "agents.name".to_string(),
                message: "agent name must not be empty".to_string(),
            });
        }

        if !agent.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(ValidationError::InvalidField {
                field: format!("agents[{}].name", agent.name),
                message: "agent name contains invalid characters".to_string(),
            });
        }

        if !seen.insert(agent.name.clone()) {
            return Err(ValidationError::InvalidField {
                field: "agents".to_string(),
                message: format!("agent name '{}' defined more than once", agent.name),
            });
        }

        if agent.params.is_null() {
            agent.params = serde_yaml::Value::Mapping(Default::default());
        }
        if !agent.params.is_mapping() {
            return Err(ValidationError::InvalidField {
                field: format!("agents[{}].params", agent.name),
                message: "params must be a mapping".to_string(),
            });
        }
        let params: BotParams = serde_yaml::from_value(agent.params.clone()).map_err(|err| {
            ValidationError::InvalidField {
                field: format!("agents[{}].params", agent.name),
                message: err.to_string(),
            }
        })?;
        params.validate().map_err(|err| ValidationError::InvalidField {
            field: format!("agents[{}].params", agent.name),
            message: err.to_string(),
        })?;
    }

    Ok(())
}

fn validate_lineups(lineups: &[LineupConfig], agents: &[AgentConfig]) -> Result<(), ValidationError> {
    if lineups.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "lineups".to_string(),
            message: "at least one lineup must be specified".to_string(),
        });
    }

    for (index, lineup) in lineups.iter().enumerate() {
        for (role, name) in [("declarer", &lineup.declarer), ("defenders", &lineup.defenders)] {
            if !agents.iter().any(|agent| &agent.name == name) {
                return Err(ValidationError::InvalidField {
                    field: format!("lineups[{index}].{role}"),
                    message: format!("agent '{name}' is not defined in agents list"),
                });
            }
        }
    }
    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "stage0_smoke"
deals:
  seed: 123
  boards:
    - name: "four_clubs"
      deal: "AJ4.T7.AT652.KJ2 K73.A985432.Q9.7 985..KJ84.AQT654 QT62.KQJ6.73.983"
      contract: "4C"
      declarer: "E"
      bids:
        E: "C"
        N: "D"
    - contract: "3NT"
      declarer: "N"
agents:
  - name: "naive"
    kind: "naive"
  - name: "csp"
    kind: "minimax"
    params:
      search_depth: 1
      assigner: "inference"
lineups:
  - declarer: "csp"
    defenders: "naive"
outputs:
  jsonl: "bench/out/{run_id}/deals.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.deals.repetitions, DEFAULT_REPETITIONS);
        assert_eq!(cfg.metrics.latency_budget_ms, DEFAULT_LATENCY_BUDGET_MS);
        assert!(cfg.logging.enable_structured);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));
        assert!(cfg.agent("naive").unwrap().params.is_mapping());

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("bench/out/stage0_smoke/deals.jsonl")
        );
    }

    #[test]
    fn boards_resolve_contracts_deals_and_bids() {
        let cfg: BenchmarkConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        let board = &cfg.deals.boards[0];
        assert_eq!(board.label(0), "four_clubs");
        assert_eq!(cfg.deals.boards[1].label(1), "board001");

        let contract = board.contract().unwrap();
        assert_eq!(contract.declarer(), PlayerPosition::East);
        assert_eq!(contract.trump(), Some(Suit::Clubs));
        assert!(board.hands().unwrap().is_some());
        assert!(cfg.deals.boards[1].hands().unwrap().is_none());
        assert_eq!(
            board.bid_suits().unwrap(),
            vec![
                (PlayerPosition::East, Suit::Clubs),
                (PlayerPosition::North, Suit::Diamonds)
            ]
        );
    }

    #[test]
    fn rejects_bad_contract() {
        let yaml = BASIC_YAML.replace("contract: \"4C\"", "contract: \"8C\"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("level 8 should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "deals.boards[0].contract"
        ));
    }

    #[test]
    fn rejects_short_deal() {
        let yaml = BASIC_YAML.replace("AJ4.T7.AT652.KJ2 ", "AJ4.T7.AT652.KJ ");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("12-card hand should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "deals.boards[0].deal"
        ));
    }

    #[test]
    fn rejects_unknown_lineup_agent() {
        let yaml = BASIC_YAML.replace("defenders: \"naive\"", "defenders: \"oracle\"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("unknown agent");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "lineups[0].defenders"
        ));
    }

    #[test]
    fn rejects_duplicate_agents() {
        let yaml = BASIC_YAML.replace("name: \"csp\"", "name: \"naive\"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("duplicate agents should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agents"
        ));
    }

    #[test]
    fn rejects_search_beyond_oracle_limit() {
        let yaml = BASIC_YAML.replace(
            "      search_depth: 1\n",
            "      search_depth: 1\n      search_max_cards: 9\n      oracle_max_cards: 6\n",
        );
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("search limit above oracle limit");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, message }
                if field == "agents[csp].params" && message.contains("oracle_max_cards")
        ));
    }

    #[test]
    fn rejects_unreadable_agent_params() {
        let yaml = BASIC_YAML.replace("assigner: \"inference\"", "assigner: \"psychic\"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("unknown assigner");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agents[csp].params"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("stage0_smoke", "stage 0 smoke");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace(
            "bench/out/{run_id}/summary.md",
            "bench/out/{run_id}/{run_id}/summary.md",
        );
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.summary_md,
            PathBuf::from("bench/out/stage0_smoke/stage0_smoke/summary.md")
        );
    }
}
