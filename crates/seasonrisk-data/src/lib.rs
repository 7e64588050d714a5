//! Seasonal risk data for SeasonRisk
//!
//! Loads the static `season<YEAR>.json` files, indexes them by date, and
//! keeps today's and tomorrow's records current.

pub mod client;
pub mod clock;
pub mod error;
pub mod gate;
pub mod service;
pub mod types;

pub use client::SeasonClient;
pub use clock::{Clock, FixedClock, LocalClock};
pub use error::SeasonError;
pub use gate::{DataLoadedSignal, DataReadyGate, StaticGate};
pub use service::{LoadOutcome, SeasonDataService, SeasonState};
pub use types::{SeasonDataMap, SeasonRecord, PENDING_RISK};
