use qz_core::ROOM_CODE_LEN;
use rand::Rng;
use rand::seq::IndexedRandom;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// One candidate room code: uppercase base-36, fixed length. Uniqueness
/// comes from rejection resampling against the session store.
pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| *CHARSET.choose(rng).expect("charset is non-empty") as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    #[test]
    fn codes_are_ten_uppercase_alphanumerics() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..100 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), 10);
            assert!(code.bytes().all(|b| CHARSET.contains(&b)));
        }
    }
    #[test]
    fn codes_vary() {
        let mut rng = SmallRng::seed_from_u64(42);
        let a = generate_code(&mut rng);
        let b = generate_code(&mut rng);
        assert_ne!(a, b);
    }
}
