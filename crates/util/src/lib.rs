//! Core types and constants for the quiz platform.
//!
//! Shared vocabulary used by every other crate:
//!
//! - [`ID`] — Phantom-typed uuid newtype for entity identity
//! - [`Unique`] — Trait for identifiable records
//! - [`Mode`], [`SessionStatus`], [`Tier`] — Session enums in wire form
//! - [`Config`] — Tunables resolved from the environment
mod config;
mod id;
mod mode;
mod status;
mod tier;

pub use config::*;
pub use id::*;
pub use mode::*;
pub use status::*;
pub use tier::*;

/// dimensional analysis types
pub type Score = i32;
pub type Rating = i32;
pub type Millis = u64;

// scoring parameters
pub const POINTS_PER_CORRECT: Score = 10;
pub const FFF_POINT: Score = 1;

// lobby parameters
pub const ROOM_CODE_LEN: usize = 10;
pub const LOBBY_MIN_DEFAULT: usize = 2;
pub const LOBBY_MAX_CAP: usize = 8;
pub const LOBBY_DURATIONS_MIN: [u32; 4] = [1, 2, 5, 10];

// pacing parameters
pub const FFF_GRACE: std::time::Duration = std::time::Duration::from_secs(3);
pub const ADVANCE_AFTER_POINT: std::time::Duration = std::time::Duration::from_secs(2);
pub const ADVANCE_AFTER_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);
pub const TIME_ATTACK_POOL_SIZE: usize = 999;
/// Safety deadline for client-paced practice sessions.
pub const PRACTICE_MAX_MINUTES: u32 = 30;

// live-state retention slack past the whole-game deadline
pub const LIVE_TTL_SLACK_SECS: u64 = 60;

/// initialize logging and exit on ctrl-c
#[cfg(feature = "server")]
pub fn init() {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.unwrap();
        println!();
        log::warn!("forcing exit");
        std::process::exit(0);
    });
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
