use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use bridge_bot::{CardPlayer, PlayerView};
use bridge_core::game::engine::TrickEngine;
use bridge_core::game::state::GameState;
use bridge_core::model::card::Card;
use bridge_core::model::cardset::CardSet;
use bridge_core::model::contract::Contract;
use bridge_core::model::history::PlayHistory;
use bridge_core::model::player::PlayerPosition;
use bridge_core::model::suit::Suit;
use tracing::{Level, event};

use super::{AgentBlueprint, RunnerError};

/// A board ready to play: the four hands, the contract and the auction's
/// bid suits.
#[derive(Debug, Clone)]
pub struct ResolvedBoard {
    pub label: String,
    pub hands: [CardSet; 4],
    pub contract: Contract,
    pub bids: Vec<(PlayerPosition, Suit)>,
}

pub struct BoardOutcome {
    pub declarer_tricks: usize,
    /// North-South tally kept by the trick engine, including deductions.
    pub north_south_tally: f64,
    pub plays: Vec<Card>,
    pub declarer_metrics: DecisionSummary,
    pub defender_metrics: DecisionSummary,
}

impl BoardOutcome {
    pub fn made(&self, contract: &Contract) -> bool {
        self.declarer_tricks >= usize::from(contract.tricks_needed())
    }
}

struct SeatState {
    agent_name: String,
    player: Box<dyn CardPlayer>,
    metrics: DecisionMetrics,
}

/// Plays `board` to the end with `declarer` on the declaring side and
/// `defenders` on the other. Dummy's cards are chosen by declarer. Player
/// seeds derive from `seed` so every lineup sees the same randomness.
pub(super) fn play_board(
    run_id: &str,
    board: &ResolvedBoard,
    declarer: &AgentBlueprint,
    defenders: &AgentBlueprint,
    seed: u64,
) -> Result<BoardOutcome, RunnerError> {
    let contract = board.contract;
    let dummy = contract.dummy();
    let engine = TrickEngine::for_contract(&contract);

    let mut seats: BTreeMap<PlayerPosition, SeatState> = PlayerPosition::LOOP
        .iter()
        .copied()
        .filter(|seat| *seat != dummy)
        .map(|seat| {
            let agent = if seat.side() == contract.declaring_side() {
                declarer
            } else {
                defenders
            };
            let view = PlayerView::new(seat, contract, board.hands[seat.index()])
                .with_bids(board.bids.iter().copied());
            let seat_seed = seed.wrapping_add(seat.index() as u64);
            let state = SeatState {
                agent_name: agent.name.clone(),
                player: agent.spawn(view, board.hands, seat_seed),
                metrics: DecisionMetrics::default(),
            };
            (seat, state)
        })
        .collect();

    let mut state = GameState::new(board.hands, contract.opening_leader());
    let mut history = PlayHistory::new(contract.trump(), contract.opening_leader());
    let mut plays = Vec::with_capacity(52);

    while !engine.is_terminal(&state) {
        let seat = state.current_player();
        let controller = if seat == dummy {
            contract.declarer()
        } else {
            seat
        };
        let Some(acting) = seats.get_mut(&controller) else {
            return Err(RunnerError::game(format!("no player controls {seat}")));
        };

        let start = Instant::now();
        let card = acting
            .player
            .choose_card(seat)
            .map_err(|source| RunnerError::Player { seat, source })?;
        let elapsed_ms = acting.metrics.record(start.elapsed());

        if tracing::enabled!(Level::DEBUG) {
            event!(
                target: "bridge_bench::play",
                Level::DEBUG,
                run_id,
                board = %board.label,
                seat = %seat,
                agent = %acting.agent_name,
                card = %card,
                trick = history.completed_tricks().len() as u32,
                elapsed_ms
            );
        }

        state = engine.apply(&state, card)?;
        history.record(seat, card)?;
        plays.push(card);

        for observer in seats.values_mut() {
            observer
                .player
                .observe_play(seat, card)
                .map_err(|source| RunnerError::Player { seat, source })?;
            if plays.len() == 1 {
                observer.player.observe_dummy(state.hand(dummy));
            }
        }
    }

    let declarer_tricks = history.tricks_won_by(contract.declarer());
    let mut declarer_metrics = DecisionMetrics::default();
    let mut defender_metrics = DecisionMetrics::default();
    for (seat, seat_state) in seats {
        if seat.side() == contract.declaring_side() {
            declarer_metrics.merge(seat_state.metrics);
        } else {
            defender_metrics.merge(seat_state.metrics);
        }
    }

    event!(
        target: "bridge_bench::play",
        Level::INFO,
        run_id,
        board = %board.label,
        contract = %contract,
        declarer = %declarer.name,
        defenders = %defenders.name,
        declarer_tricks = declarer_tricks as u32,
        north_south_tally = state.tricks_won(),
    );

    Ok(BoardOutcome {
        declarer_tricks,
        north_south_tally: state.tricks_won(),
        plays,
        declarer_metrics: declarer_metrics.finalize(),
        defender_metrics: defender_metrics.finalize(),
    })
}

#[derive(Default)]
struct DecisionMetrics {
    total: Duration,
    decisions: u32,
}

impl DecisionMetrics {
    fn record(&mut self, duration: Duration) -> f64 {
        self.total += duration;
        self.decisions += 1;
        duration.as_secs_f64() * 1000.0
    }

    fn merge(&mut self, other: DecisionMetrics) {
        self.total += other.total;
        self.decisions += other.decisions;
    }

    fn finalize(self) -> DecisionSummary {
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / f64::from(self.decisions)
        };

        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
            total_ms: self.total.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
    pub total_ms: f64,
}
