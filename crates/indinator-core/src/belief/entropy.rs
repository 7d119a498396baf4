/// Shannon entropy in bits. Zero-probability terms contribute nothing.
pub fn entropy(probs: &[f64]) -> f64 {
    let h: f64 = probs
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| -p * p.log2())
        .sum();
    h.max(0.0)
}

/// Entropy of the uniform distribution over `n` outcomes.
pub fn max_entropy(n: usize) -> f64 {
    if n <= 1 { 0.0 } else { (n as f64).log2() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_mass_has_zero_entropy() {
        assert_eq!(entropy(&[0.0, 1.0, 0.0]), 0.0);
    }

    #[test]
    fn uniform_reaches_the_bound() {
        let probs = [0.125; 8];
        assert!((entropy(&probs) - 3.0).abs() < 1e-12);
        assert!((max_entropy(8) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn skewed_distribution_stays_within_bounds() {
        let probs = [0.7, 0.2, 0.1];
        let h = entropy(&probs);
        assert!(h > 0.0 && h < max_entropy(3));
    }
}
