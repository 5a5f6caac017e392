pub mod params;
pub mod player;
pub mod search;
pub mod view;

pub use params::{AssignerMode, BotParams, ParamsError};
pub use player::{CardPlayer, MinimaxPlayer, NaivePlayer, OraclePlayer, PlayerError, naive_card};
pub use search::{MinimaxSearch, SearchError, SearchOutcome};
pub use view::PlayerView;
