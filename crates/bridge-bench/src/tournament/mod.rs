mod table;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bridge_bot::{
    BotParams, CardPlayer, MinimaxPlayer, NaivePlayer, OraclePlayer, PlayerError, PlayerView,
};
use bridge_core::game::engine::PlayError;
use bridge_core::model::cardset::{CardSet, format_deal};
use bridge_core::model::deck::Deck;
use bridge_core::model::player::PlayerPosition;
use bridge_core::model::trick::TrickError;
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;

use crate::config::{AgentConfig, AgentKind, BenchmarkConfig, ResolvedOutputs, ValidationError};
use crate::logging::telemetry_path;
use crate::summary::SummaryCollector;

pub use table::{BoardOutcome, DecisionSummary, ResolvedBoard};

/// Primary entry point for playing out the configured boards.
pub struct TournamentRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    agents: Vec<AgentBlueprint>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub boards_played: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
}

impl TournamentRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let agents = AgentBlueprint::from_configs(&config.agents)?;
        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            agents,
        })
    }

    /// Play every board once per repetition and lineup, streaming JSONL rows
    /// to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.deals.seed.unwrap_or(0));
        let mut collector = SummaryCollector::new(&self.config);
        let mut rows_written = 0usize;
        let mut boards_played = 0usize;

        for (board_index, board_config) in self.config.deals.boards.iter().enumerate() {
            let label = board_config.label(board_index);
            let contract = board_config.contract()?;
            let fixed = board_config.hands()?;
            let bids = board_config.bid_suits()?;

            for repetition in 0..self.config.deals.repetitions {
                let deal_seed = rng.next_u64();
                let hands = fixed.unwrap_or_else(|| Deck::shuffled_with_seed(deal_seed).deal());
                let board = ResolvedBoard {
                    label: label.clone(),
                    hands,
                    contract,
                    bids: bids.clone(),
                };

                for (lineup_index, lineup) in self.config.lineups.iter().enumerate() {
                    let declarer = self.blueprint(&lineup.declarer)?;
                    let defenders = self.blueprint(&lineup.defenders)?;
                    let outcome = table::play_board(
                        &self.config.run_id,
                        &board,
                        declarer,
                        defenders,
                        deal_seed,
                    )?;
                    collector.record(lineup_index, &board.contract, &outcome);

                    let row = BoardLogRow {
                        run_id: self.config.run_id.clone(),
                        board_id: format!("{label}_R{repetition:02}"),
                        board: label.clone(),
                        board_index,
                        repetition,
                        lineup: lineup.label(),
                        declarer_agent: declarer.name.clone(),
                        defender_agent: defenders.name.clone(),
                        deal_seed,
                        deal: format_deal(&board.hands, PlayerPosition::North),
                        contract: contract.to_string(),
                        declarer_tricks: outcome.declarer_tricks,
                        tricks_needed: contract.tricks_needed(),
                        made: outcome.made(&contract),
                        north_south_tally: outcome.north_south_tally,
                        play: outcome
                            .plays
                            .iter()
                            .map(|card| card.to_string())
                            .collect::<Vec<_>>()
                            .join(" "),
                        speed_ms_turn: outcome.declarer_metrics.avg_ms_per_decision,
                        decisions: outcome.declarer_metrics.decisions
                            + outcome.defender_metrics.decisions,
                    };
                    serde_json::to_writer(&mut writer, &row)?;
                    writer.write_all(b"\n")?;
                    rows_written += 1;
                }
                boards_played += 1;
            }
        }

        writer.flush()?;
        collector.finish().write_markdown(&self.outputs.summary_md)?;

        Ok(RunSummary {
            boards_played,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path: self.logging_enabled.then(|| telemetry_path(&self.outputs)),
        })
    }

    fn blueprint(&self, name: &str) -> Result<&AgentBlueprint, RunnerError> {
        self.agents
            .iter()
            .find(|agent| agent.name == name)
            .ok_or_else(|| RunnerError::UnknownAgent(name.to_string()))
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct BoardLogRow {
    run_id: String,
    board_id: String,
    board: String,
    board_index: usize,
    repetition: usize,
    lineup: String,
    declarer_agent: String,
    defender_agent: String,
    deal_seed: u64,
    deal: String,
    contract: String,
    declarer_tricks: usize,
    tricks_needed: u8,
    made: bool,
    north_south_tally: f64,
    play: String,
    speed_ms_turn: f64,
    decisions: u32,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ValidationError),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("agent '{0}' is not configured")]
    UnknownAgent(String),
    #[error("{seat}: {source}")]
    Player {
        seat: PlayerPosition,
        #[source]
        source: PlayerError,
    },
    #[error("illegal play: {0}")]
    Play(#[from] PlayError),
    #[error("play history rejected a card: {0}")]
    History(#[from] TrickError),
    #[error("game execution failed: {message}")]
    Game { message: String },
}

impl RunnerError {
    fn game(message: String) -> Self {
        RunnerError::Game { message }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid parameters for agent '{name}': {message}")]
    InvalidParams { name: String, message: String },
}

struct AgentBlueprint {
    name: String,
    kind: AgentKind,
    params: BotParams,
}

impl AgentBlueprint {
    fn from_configs(configs: &[AgentConfig]) -> Result<Vec<Self>, AgentError> {
        configs.iter().map(Self::from_config).collect()
    }

    fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let params = if config.params.is_null() {
            BotParams::default()
        } else {
            serde_yaml::from_value(config.params.clone()).map_err(|err| {
                AgentError::InvalidParams {
                    name: config.name.clone(),
                    message: err.to_string(),
                }
            })?
        };
        params.validate().map_err(|err| AgentError::InvalidParams {
            name: config.name.clone(),
            message: err.to_string(),
        })?;

        Ok(Self {
            name: config.name.clone(),
            kind: config.kind,
            params,
        })
    }

    fn spawn(&self, view: PlayerView, deal: [CardSet; 4], seed: u64) -> Box<dyn CardPlayer> {
        let params = self.params.with_seed(self.params.seed ^ seed);
        match self.kind {
            AgentKind::Naive => Box::new(NaivePlayer::new(view, params.seed)),
            AgentKind::Minimax => Box::new(MinimaxPlayer::new(view, params)),
            AgentKind::Oracle => Box::new(OraclePlayer::new(view, deal, params)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_bot::AssignerMode;

    fn agent(kind: AgentKind, params: &str) -> AgentConfig {
        AgentConfig {
            name: "agent".to_string(),
            kind,
            params: serde_yaml::from_str(params).unwrap(),
        }
    }

    #[test]
    fn blueprint_reads_bot_params() {
        let blueprint = AgentBlueprint::from_config(&agent(
            AgentKind::Minimax,
            "{search_depth: 2, assigner: uniform}",
        ))
        .unwrap();
        assert_eq!(blueprint.params.search_depth, 2);
        assert_eq!(blueprint.params.assigner, AssignerMode::Uniform);
        assert_eq!(blueprint.params.search_max_cards, BotParams::default().search_max_cards);
    }

    #[test]
    fn blueprint_defaults_for_null_params() {
        let blueprint = AgentBlueprint::from_config(&agent(AgentKind::Naive, "~")).unwrap();
        assert_eq!(blueprint.params, BotParams::default());
    }

    #[test]
    fn blueprint_rejects_bad_params() {
        let err = AgentBlueprint::from_config(&agent(AgentKind::Minimax, "{search_depth: deep}"))
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::InvalidParams { .. }));
    }

    #[test]
    fn blueprint_rejects_inconsistent_card_limits() {
        let err = AgentBlueprint::from_config(&agent(AgentKind::Minimax, "{oracle_max_cards: 4}"))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            AgentError::InvalidParams { message, .. } if message.contains("search_max_cards")
        ));
    }

    #[test]
    fn oracle_table_plays_a_full_board() {
        let board = ResolvedBoard {
            label: "test".to_string(),
            hands: Deck::shuffled_with_seed(5).deal(),
            contract: bridge_core::model::contract::Contract::parse("2S", PlayerPosition::South)
                .unwrap(),
            bids: Vec::new(),
        };
        let oracle = AgentBlueprint::from_config(&agent(
            AgentKind::Oracle,
            "{oracle_max_cards: 3, search_max_cards: 3}",
        ))
        .unwrap();
        let naive = AgentBlueprint::from_config(&agent(AgentKind::Naive, "~")).unwrap();

        let outcome = table::play_board("unit", &board, &oracle, &naive, 9).unwrap();
        assert_eq!(outcome.plays.len(), 52);
        assert!(outcome.declarer_tricks <= 13);
        assert!(outcome.declarer_metrics.decisions >= 26);
        assert!(outcome.defender_metrics.decisions >= 26);
    }
}
