pub mod attendance;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod face;
pub mod hamming;
pub mod matching;
pub mod orb;
pub mod pool;
pub mod region;
pub mod store;
pub mod trainer;
pub mod utils;
pub mod verifier;

#[cfg(test)]
mod testutil;

pub use attendance::{AttendanceDesk, CheckIn, Recognition};
pub use config::{Opts, WatermarkOptions};
pub use error::{Result, WatermarkError};
pub use matching::MatchResult;
pub use store::{FilePoolStore, MemoryPoolStore, PoolStore};
pub use trainer::{TrainReport, Trainer};
pub use verifier::Verifier;
