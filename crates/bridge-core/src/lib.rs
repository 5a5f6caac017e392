pub mod game;
pub mod inference;
pub mod model;
pub mod oracle;

pub use game::engine::{PlayError, TrickEngine};
pub use game::state::GameState;
