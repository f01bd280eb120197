use rand::Rng;

/// Russian roulette for a low-weight packet.
///
/// The packet survives with probability `chance` and its weight is divided by
/// `chance`, so the expected weight is unchanged. Returns the new weight, or
/// None if the packet is terminated. A zero weight is always terminated.
pub fn roulette<R: Rng + ?Sized>(weight: f64, chance: f64, rng: &mut R) -> Option<f64> {
    if weight == 0.0 {
        return None;
    }
    if rng.r#gen::<f64>() < chance {
        Some(weight / chance)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_zero_weight_dies() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(roulette(0.0, 0.1, &mut rng).is_none());
        }
    }

    #[test]
    fn test_survivor_weight_is_rescaled() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut survivors = 0;
        for _ in 0..1000 {
            if let Some(w) = roulette(5e-5, 0.1, &mut rng) {
                assert!((w - 5e-4).abs() < 1e-18);
                survivors += 1;
            }
        }
        assert!(survivors > 50 && survivors < 150, "survivors = {survivors}");
    }

    #[test]
    fn test_roulette_is_unbiased() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let w = 7e-5;
        let n = 400_000;
        let total: f64 = (0..n)
            .map(|_| roulette(w, 0.1, &mut rng).unwrap_or(0.0))
            .sum();
        let mean = total / n as f64;
        assert!(
            ((mean - w) / w).abs() < 0.02,
            "mean weight after roulette = {mean}, expected {w}"
        );
    }
}
