//! A prediction-market trading core: order admission, cancellation, the
//! matching and liquidity-synthesis workers, event lifecycle transitions,
//! and resolution. See `api` for the public surface
//! (`place_bet`/`cancel_bet`/`get_bet`/`list_bets`) and `store` for the
//! transactional abstraction everything else is built on.

pub mod api;
pub mod config;
pub mod error;
pub mod ids;
pub mod metrics;
pub mod models;
pub mod money;
pub mod services;
pub mod store;
pub mod utils;
pub mod wallet;
pub mod workers;

pub use api::{cancel_bet, get_bet, list_bets, place_bet, CancelBetInput, Page, PlaceBetInput};
pub use error::CoreError;
