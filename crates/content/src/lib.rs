//! Question repository.
//!
//! Read-only within the core: questions are authored elsewhere and fetched
//! here in tier-filtered, optionally category-filtered batches.
//!
//! - [`Question`], [`Choice`], [`Category`] — Content records and DDL
//! - [`QuestionView`] — Client-facing projection with correctness stripped
//! - [`QuestionRepo`] — Batch fetching with a random contiguous window
//! - [`tier_for_rating`] — Fixed rating → tier map
mod question;
mod repository;

pub use question::*;
pub use repository::*;

use qz_core::Rating;
use qz_core::Tier;

/// Maps a numeric rating to a difficulty tier. Cutoffs 1300 and 1600.
pub fn tier_for_rating(rating: Rating) -> Tier {
    match rating {
        r if r < 1300 => Tier::Easy,
        r if r < 1600 => Tier::Medium,
        _ => Tier::Hard,
    }
}

/// Applies DDL for the content tables. Idempotent.
pub async fn migrate(
    client: &std::sync::Arc<tokio_postgres::Client>,
) -> Result<(), qz_store::PgErr> {
    use qz_store::Schema;
    client.batch_execute(Category::creates()).await?;
    client.batch_execute(Question::creates()).await?;
    client.batch_execute(Choice::creates()).await?;
    client.batch_execute(Tagging::creates()).await?;
    client.batch_execute(Question::indices()).await?;
    client.batch_execute(Choice::indices()).await?;
    client.batch_execute(Tagging::indices()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn tier_cutoffs() {
        assert_eq!(tier_for_rating(600), Tier::Easy);
        assert_eq!(tier_for_rating(1299), Tier::Easy);
        assert_eq!(tier_for_rating(1300), Tier::Medium);
        assert_eq!(tier_for_rating(1599), Tier::Medium);
        assert_eq!(tier_for_rating(1600), Tier::Hard);
        assert_eq!(tier_for_rating(2800), Tier::Hard);
    }
}
