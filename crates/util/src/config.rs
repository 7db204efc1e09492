use crate::Rating;

/// Tunables recognized by the core, resolved once at process start.
/// Every field falls back to its documented default when the variable is
/// absent or unparseable.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Matchmaking rating band (+/-) for pairing players.
    pub rating_band: Rating,
    /// Seconds a matchmaking ticket waits before falling back to a bot.
    pub matchmaking_timeout_secs: u64,
    /// Whole-game duration for FASTEST_FINGER_FIRST, in minutes.
    pub fff_duration_minutes: u32,
    /// Per-question time limit for FASTEST_FINGER_FIRST, in milliseconds.
    pub fff_question_ms: u64,
    /// Questions fetched per batch at session start.
    pub question_batch_size: usize,
    /// Lobby countdown length, in seconds.
    pub countdown_secs: u64,
    /// Elo K-factor.
    pub k_factor: Rating,
    /// Rating assigned to synthesized bot opponents.
    pub bot_rating: Rating,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rating_band: 200,
            matchmaking_timeout_secs: 30,
            fff_duration_minutes: 2,
            fff_question_ms: 30_000,
            question_batch_size: 50,
            countdown_secs: 10,
            k_factor: 32,
            bot_rating: 1200,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rating_band: env_or("QZ_RATING_BAND", defaults.rating_band),
            matchmaking_timeout_secs: env_or("QZ_MATCH_TIMEOUT_SECS", defaults.matchmaking_timeout_secs),
            fff_duration_minutes: env_or("QZ_FFF_DURATION_MINUTES", defaults.fff_duration_minutes),
            fff_question_ms: env_or("QZ_FFF_QUESTION_MS", defaults.fff_question_ms),
            question_batch_size: env_or("QZ_QUESTION_BATCH_SIZE", defaults.question_batch_size),
            countdown_secs: env_or("QZ_COUNTDOWN_SECS", defaults.countdown_secs),
            k_factor: env_or("QZ_K_FACTOR", defaults.k_factor),
            bot_rating: env_or("QZ_BOT_RATING", defaults.bot_rating),
        }
    }
    pub fn countdown(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.countdown_secs)
    }
    pub fn fff_question(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.fff_question_ms)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_match_contract() {
        let config = Config::default();
        assert_eq!(config.rating_band, 200);
        assert_eq!(config.matchmaking_timeout_secs, 30);
        assert_eq!(config.fff_duration_minutes, 2);
        assert_eq!(config.fff_question_ms, 30_000);
        assert_eq!(config.question_batch_size, 50);
        assert_eq!(config.countdown_secs, 10);
        assert_eq!(config.k_factor, 32);
        assert_eq!(config.bot_rating, 1200);
    }
}
