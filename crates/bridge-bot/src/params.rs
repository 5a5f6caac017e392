use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Parameter combinations rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("search_max_cards ({search}) may exceed oracle_max_cards ({oracle}) by at most one")]
    CardLimits { search: usize, oracle: usize },
}

/// How a minimax player fills in the hands it cannot see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignerMode {
    /// Deal unseen cards uniformly at random.
    Uniform,
    /// Always use bidding and play evidence.
    Inference,
    /// Use evidence on defence and uniform dealing as declarer.
    InferenceWhenDefending,
}

impl Default for AssignerMode {
    fn default() -> Self {
        Self::InferenceWhenDefending
    }
}

impl FromStr for AssignerMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "uniform" | "random" => Ok(AssignerMode::Uniform),
            "inference" | "csp" => Ok(AssignerMode::Inference),
            "defending" | "inference_when_defending" => Ok(AssignerMode::InferenceWhenDefending),
            other => Err(format!("unknown assigner '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotParams {
    /// Completed tricks searched before handing over to the oracle.
    pub search_depth: u32,
    /// Largest hand the minimax player searches; larger hands play the
    /// naive card.
    pub search_max_cards: usize,
    /// Largest hand the oracle is asked to solve. A one-trick search from
    /// `search_max_cards` hands the oracle one card fewer.
    pub oracle_max_cards: usize,
    pub assigner: AssignerMode,
    pub seed: u64,
}

impl Default for BotParams {
    fn default() -> Self {
        Self {
            search_depth: 1,
            search_max_cards: 13,
            oracle_max_cards: 13,
            assigner: AssignerMode::default(),
            seed: 0,
        }
    }
}

impl BotParams {
    /// Reads `BRIDGE_*` overrides on top of the defaults. Unparseable values
    /// keep their default; inconsistent card limits are an error.
    pub fn from_env() -> Result<Self, ParamsError> {
        Self::load(|key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.search_max_cards > self.oracle_max_cards + 1 {
            return Err(ParamsError::CardLimits {
                search: self.search_max_cards,
                oracle: self.oracle_max_cards,
            });
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn load<F>(read: F) -> Result<Self, ParamsError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let params = Self::from_reader(read);
        params.validate()?;
        Ok(params)
    }

    fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let search_depth = read("BRIDGE_SEARCH_DEPTH")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|depth| *depth >= 1)
            .unwrap_or(defaults.search_depth);

        let search_max_cards = read("BRIDGE_SEARCH_MAX_CARDS")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|cards| *cards <= 13)
            .unwrap_or(defaults.search_max_cards);

        let oracle_max_cards = read("BRIDGE_ORACLE_MAX_CARDS")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|cards| *cards <= 13)
            .unwrap_or(defaults.oracle_max_cards);

        let assigner = read("BRIDGE_ASSIGNER")
            .and_then(|raw| raw.parse::<AssignerMode>().ok())
            .unwrap_or(defaults.assigner);

        Self {
            search_depth,
            search_max_cards,
            oracle_max_cards,
            assigner,
            seed: defaults.seed,
        }
    }
}
