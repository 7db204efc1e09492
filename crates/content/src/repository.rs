use super::*;
use const_format::concatcp;
use qz_core::ID;
use qz_core::Tier;
use qz_store::CATEGORIES;
use qz_store::CHOICES;
use qz_store::PgErr;
use qz_store::QUESTIONS;
use qz_store::QUESTION_CATEGORIES;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_postgres::Client;
use uuid::Uuid;

const FILTER: &str = concatcp!(
    "FROM ",
    QUESTIONS,
    " q
     WHERE q.tier = $1
       AND (cardinality($2::text[]) = 0 OR EXISTS (
           SELECT 1 FROM ",
    QUESTION_CATEGORIES,
    " t JOIN ",
    CATEGORIES,
    " c ON c.id = t.category_id
           WHERE t.question_id = q.id AND c.name = ANY($2::text[])))"
);

/// Tier- and category-filtered question fetching.
/// The filtered pool is ordered by creation time then id; when it exceeds
/// the requested count, the batch is a uniformly random contiguous window
/// of the pool, so adjacent sessions see varied but coherent runs.
#[derive(Clone)]
pub struct QuestionRepo {
    db: Arc<Client>,
}

impl QuestionRepo {
    pub fn new(db: Arc<Client>) -> Self {
        Self { db }
    }

    /// Fetches a question batch. An empty result means no question matches
    /// the filter; callers must treat that as a setup failure.
    pub async fn fetch_batch(
        &self,
        tier: Tier,
        categories: &[String],
        count: usize,
    ) -> Result<Vec<Question>, PgErr> {
        const COUNT: &str = concatcp!("SELECT count(*) ", FILTER);
        const PAGE: &str = concatcp!(
            "SELECT q.id, q.prompt, q.correct_choice_id, q.explanation, q.learning_tip ",
            FILTER,
            " ORDER BY q.created_at, q.id LIMIT $3 OFFSET $4"
        );
        let tags = categories.to_vec();
        let pool = self
            .db
            .query_one(COUNT, &[&tier.as_str(), &tags])
            .await?
            .get::<_, i64>(0) as usize;
        if pool == 0 {
            return Ok(Vec::new());
        }
        let offset = window_offset(pool, count, &mut rand::rng());
        let rows = self
            .db
            .query(
                PAGE,
                &[
                    &tier.as_str(),
                    &tags,
                    &(count.min(pool) as i64),
                    &(offset as i64),
                ],
            )
            .await?;
        log::debug!(
            "[content] batch of {} from pool of {} ({} {:?})",
            rows.len(),
            pool,
            tier,
            categories
        );
        let mut choices = self
            .choices(&rows.iter().map(|r| r.get("id")).collect::<Vec<Uuid>>())
            .await?;
        Ok(rows
            .iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                Question::new(
                    ID::from(id),
                    row.get("prompt"),
                    choices.remove(&id).unwrap_or_default(),
                    ID::from(row.get::<_, Uuid>("correct_choice_id")),
                    row.get("explanation"),
                    row.get("learning_tip"),
                )
            })
            .collect())
    }

    async fn choices(&self, questions: &[Uuid]) -> Result<HashMap<Uuid, Vec<Choice>>, PgErr> {
        const SQL: &str = concatcp!(
            "SELECT id, question_id, text FROM ",
            CHOICES,
            " WHERE question_id = ANY($1) ORDER BY question_id, position"
        );
        let mut grouped: HashMap<Uuid, Vec<Choice>> = HashMap::new();
        for row in self.db.query(SQL, &[&questions.to_vec()]).await? {
            grouped
                .entry(row.get("question_id"))
                .or_default()
                .push(Choice {
                    id: ID::from(row.get::<_, Uuid>("id")),
                    text: row.get("text"),
                });
        }
        Ok(grouped)
    }
}

/// Uniformly random contiguous window start. Zero when the pool fits.
fn window_offset<R: Rng>(pool: usize, count: usize, rng: &mut R) -> usize {
    if pool > count {
        rng.random_range(0..=pool - count)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    #[test]
    fn window_is_zero_when_pool_fits() {
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(window_offset(10, 10, &mut rng), 0);
        assert_eq!(window_offset(3, 50, &mut rng), 0);
    }
    #[test]
    fn window_stays_in_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let offset = window_offset(100, 30, &mut rng);
            assert!(offset <= 70);
        }
    }
}
