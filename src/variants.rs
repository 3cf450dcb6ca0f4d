use rand::Rng;

/// Draws image variant indices, avoiding an immediate repeat of the
/// previously shown variant.
#[derive(Debug, Clone, Copy)]
pub struct VariantPicker {
    pub variant_count: usize,
    pub max_attempts: usize,
}

impl VariantPicker {
    pub fn new(variant_count: usize, max_attempts: usize) -> Self {
        Self {
            variant_count,
            max_attempts,
        }
    }

    pub fn pick(&self, excluding: Option<usize>) -> usize {
        self.pick_with(&mut rand::thread_rng(), excluding)
    }

    /// Uniform draw in `[0, variant_count)`, redrawn up to `max_attempts`
    /// times while it collides with `excluding`.
    ///
    /// If every draw collides (only reachable when `variant_count == 1`),
    /// the last draw is returned: repeating the sole variant beats
    /// failing the image update.
    pub fn pick_with<R: Rng>(&self, rng: &mut R, excluding: Option<usize>) -> usize {
        let mut draw = 0;
        for _ in 0..self.max_attempts.max(1) {
            draw = rng.gen_range(0..self.variant_count);
            if Some(draw) != excluding {
                return draw;
            }
        }
        draw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_never_repeats_excluded_variant() {
        let picker = VariantPicker::new(12, 100);
        let mut rng = StdRng::seed_from_u64(7);
        let mut last = None;
        for _ in 0..1000 {
            let drawn = picker.pick_with(&mut rng, last);
            assert_ne!(Some(drawn), last);
            assert!(drawn < 12);
            last = Some(drawn);
        }
    }

    #[test]
    fn test_two_variants_always_alternate() {
        let picker = VariantPicker::new(2, 100);
        let mut rng = StdRng::seed_from_u64(42);
        let mut last = Some(0);
        for _ in 0..100 {
            let drawn = picker.pick_with(&mut rng, last);
            assert_ne!(Some(drawn), last);
            last = Some(drawn);
        }
    }

    #[test]
    fn test_single_variant_degrades_to_repeat() {
        let picker = VariantPicker::new(1, 100);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(picker.pick_with(&mut rng, Some(0)), 0);
    }

    #[test]
    fn test_no_exclusion_returns_any_variant() {
        let picker = VariantPicker::new(12, 100);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            assert!(picker.pick_with(&mut rng, None) < 12);
        }
    }
}
