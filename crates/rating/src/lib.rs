//! Symmetric two-player rating updates.
//!
//! Standard Elo: the winner takes from the loser what the expected-score
//! curve says the result was worth. Both sides are written in one store
//! transaction by the caller, so the pool of rating points is conserved
//! up to rounding.
use qz_core::Rating;
use qz_core::Score;

/// Expected score of the first player against the second.
fn expected(a: Rating, b: Rating) -> f64 {
    1.0 / (1.0 + 10f64.powf((b - a) as f64 / 400.0))
}

/// Applies one rated result. `score_a` is the first player's normalized
/// outcome: 1 for a win, 0 for a loss, 0.5 for a draw.
pub fn update(a: Rating, b: Rating, score_a: f64, k: Rating) -> (Rating, Rating) {
    let e = expected(a, b);
    let new_a = (a as f64 + k as f64 * (score_a - e)).round() as Rating;
    let new_b = (b as f64 + k as f64 * ((1.0 - score_a) - (1.0 - e))).round() as Rating;
    (new_a, new_b)
}

/// Normalizes raw points into an Elo outcome for the first player.
pub fn normalize(a: Score, b: Score) -> f64 {
    match a.cmp(&b) {
        std::cmp::Ordering::Greater => 1.0,
        std::cmp::Ordering::Less => 0.0,
        std::cmp::Ordering::Equal => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn equal_ratings_split_the_stakes() {
        let (a, b) = update(1200, 1200, 1.0, 32);
        assert_eq!(a, 1216);
        assert_eq!(b, 1184);
    }
    #[test]
    fn draw_between_equals_changes_nothing() {
        let (a, b) = update(1500, 1500, 0.5, 32);
        assert_eq!(a, 1500);
        assert_eq!(b, 1500);
    }
    #[test]
    fn upset_pays_more_than_expected_win() {
        let (underdog, _) = update(1200, 1600, 1.0, 32);
        let (favorite, _) = update(1600, 1200, 1.0, 32);
        assert!(underdog - 1200 > favorite - 1600);
    }
    #[test]
    fn pool_is_conserved_up_to_rounding() {
        for (a, b, s) in [
            (1200, 1200, 1.0),
            (1200, 1600, 1.0),
            (1600, 1200, 0.0),
            (800, 2400, 0.5),
            (1234, 1567, 0.5),
        ] {
            let (na, nb) = update(a, b, s, 32);
            assert!(((na + nb) - (a + b)).abs() <= 1, "{}+{} -> {}+{}", a, b, na, nb);
        }
    }
    #[test]
    fn normalization() {
        assert_eq!(normalize(30, 10), 1.0);
        assert_eq!(normalize(10, 30), 0.0);
        assert_eq!(normalize(20, 20), 0.5);
    }
}
