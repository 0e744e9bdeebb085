//! Seeded pseudo-random provider.
//!
//! Stands in for a hardware or webservice backend when reproducible data is
//! enough, e.g. for tests and offline runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Provider;
use crate::error::ProviderError;

/// Provider backed by a seeded `StdRng`, producing uniform values in [0, 1).
///
/// # Examples
///
/// ```rust
/// use rng_source::{PrngProvider, Provider};
///
/// let mut a = PrngProvider::from_seed(7);
/// let mut b = PrngProvider::from_seed(7);
///
/// let mut block_a = vec![0.0; 16];
/// let mut block_b = vec![0.0; 16];
/// a.fill(&mut block_a).unwrap();
/// b.fill(&mut block_b).unwrap();
/// assert_eq!(block_a, block_b);
/// ```
#[derive(Debug)]
pub struct PrngProvider {
    inner: StdRng,
    seed: u64,
}

impl PrngProvider {
    /// Creates a provider initialised with `seed`.
    #[inline]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Creates a provider with a seed drawn from the thread RNG.
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random())
    }

    /// Returns the seed used for initialisation.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Provider for PrngProvider {
    fn connect(&mut self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn fill(&mut self, block: &mut [f64]) -> Result<(), ProviderError> {
        for value in block.iter_mut() {
            *value = self.inner.gen();
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn description(&self) -> &str {
        "Seeded pseudo-random generator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_seed_is_recorded() {
        assert_eq!(PrngProvider::from_seed(42).seed(), 42);
    }

    #[test]
    fn test_fill_uniform_range() {
        let mut provider = PrngProvider::from_seed(42);
        let mut block = vec![0.0; 10_000];
        provider.fill(&mut block).unwrap();

        assert!(block.iter().all(|&v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn test_fill_uniform_moments() {
        let mut provider = PrngProvider::from_seed(2024);
        let mut block = vec![0.0; 100_000];
        provider.fill(&mut block).unwrap();

        let n = block.len() as f64;
        let mean = block.iter().sum::<f64>() / n;
        let variance = block.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        assert_abs_diff_eq!(mean, 0.5, epsilon = 0.01);
        assert_abs_diff_eq!(variance, 1.0 / 12.0, epsilon = 0.005);
    }

    #[test]
    fn test_consecutive_fills_differ() {
        let mut provider = PrngProvider::from_seed(1);
        let mut first = vec![0.0; 8];
        let mut second = vec![0.0; 8];
        provider.fill(&mut first).unwrap();
        provider.fill(&mut second).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_empty_block() {
        let mut provider = PrngProvider::from_seed(1);
        let mut empty: Vec<f64> = Vec::new();
        assert!(provider.fill(&mut empty).is_ok());
    }
}
