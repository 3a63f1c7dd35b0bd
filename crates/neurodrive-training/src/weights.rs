//! Gene vector operations for the evolution engine.
//!
//! Genes are policy weights. They are initialized uniformly in `[-1, 1]`, and
//! every operator that perturbs a gene clamps the result back into that range.
//!
//! # Operations
//!
//! - **Initialization**: [`random`] draws a fresh chromosome
//! - **Crossover**: [`single_point_crossover`] splices two parents at one index
//! - **Mutation**: [`mutate`] replaces or perturbs genes with a given probability
//!
//! See [`evolution`](crate::evolution) for how these are combined into a
//! generation.

use rand::Rng;
use rand_distr::Open01;

use crate::evolution::MutationParams;

/// Lower bound of every gene.
pub const GENE_MIN: f32 = -1.0;
/// Upper bound of every gene.
pub const GENE_MAX: f32 = 1.0;

/// Creates a gene vector by applying a function to each index.
///
/// ```
/// use neurodrive_training::weights;
///
/// let genes = weights::from_fn(|i| i as f32 * 0.5, 3);
/// assert_eq!(genes, vec![0.0, 0.5, 1.0]);
/// ```
pub fn from_fn<F>(f: F, len: usize) -> Vec<f32>
where
    F: FnMut(usize) -> f32,
{
    (0..len).map(f).collect()
}

/// Draws a single gene uniformly from `[-1, 1]`.
pub fn random_gene<R>(rng: &mut R) -> f32
where
    R: Rng + ?Sized,
{
    rng.random_range(GENE_MIN..=GENE_MAX)
}

/// Generates `len` genes, each drawn independently from `[-1, 1]`.
pub fn random<R>(rng: &mut R, len: usize) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    from_fn(|_| random_gene(rng), len)
}

/// Samples `N(0, std_dev²)` with the Box–Muller transform.
pub fn gaussian<R>(rng: &mut R, std_dev: f32) -> f32
where
    R: Rng + ?Sized,
{
    // open interval keeps ln() finite
    let u1: f32 = rng.sample(Open01);
    let u2: f32 = rng.sample(Open01);
    let z = (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos();
    z * std_dev
}

/// Splices two parents at a random index.
///
/// The child is `p1[..split] ++ p2[split..]` with `split` drawn uniformly from
/// `0..len`, so it always ends with at least one gene of `p2`.
///
/// # Panics
///
/// Panics if the parents have different lengths.
pub fn single_point_crossover<R>(p1: &[f32], p2: &[f32], rng: &mut R) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    assert_eq!(p1.len(), p2.len(), "parents must have the same length");
    if p1.is_empty() {
        return vec![];
    }
    let split = rng.random_range(0..p1.len());
    let mut child = Vec::with_capacity(p1.len());
    child.extend_from_slice(&p1[..split]);
    child.extend_from_slice(&p2[split..]);
    child
}

/// Mutates genes in place.
///
/// Each gene mutates with probability `params.rate`. A mutating gene is
/// replaced by a fresh uniform value with probability
/// `params.replacement_chance`, and otherwise receives Gaussian noise with
/// standard deviation `params.strength` before being clamped to `[-1, 1]`.
pub fn mutate<R>(genes: &mut [f32], params: MutationParams, rng: &mut R)
where
    R: Rng + ?Sized,
{
    let rate = f64::from(params.rate.clamp(0.0, 1.0));
    let replacement_chance = f64::from(params.replacement_chance.clamp(0.0, 1.0));
    for gene in genes {
        if !rng.random_bool(rate) {
            continue;
        }
        if rng.random_bool(replacement_chance) {
            *gene = random_gene(rng);
        } else {
            *gene = (*gene + gaussian(rng, params.strength)).clamp(GENE_MIN, GENE_MAX);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_random_genes_in_range() {
        let mut rng = Pcg32::seed_from_u64(3);
        let genes = random(&mut rng, 1000);
        assert_eq!(genes.len(), 1000);
        assert!(genes.iter().all(|g| (GENE_MIN..=GENE_MAX).contains(g)));
        assert!(genes.iter().any(|g| *g < 0.0) && genes.iter().any(|g| *g > 0.0));
    }

    #[test]
    fn test_crossover_splices_parents() {
        let mut rng = Pcg32::seed_from_u64(5);
        let p1 = vec![1.0; 8];
        let p2 = vec![-1.0; 8];
        for _ in 0..100 {
            let child = single_point_crossover(&p1, &p2, &mut rng);
            assert_eq!(child.len(), 8);
            let split = child.iter().position(|g| *g == -1.0).unwrap();
            assert!(child[..split].iter().all(|g| *g == 1.0));
            assert!(child[split..].iter().all(|g| *g == -1.0));
        }
    }

    #[test]
    fn test_crossover_of_empty_parents() {
        let mut rng = Pcg32::seed_from_u64(5);
        assert!(single_point_crossover(&[], &[], &mut rng).is_empty());
    }

    #[test]
    fn test_gaussian_moments() {
        let mut rng = Pcg32::seed_from_u64(11);
        let samples: Vec<f32> = (0..20_000).map(|_| gaussian(&mut rng, 0.5)).collect();
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / samples.len() as f32;
        assert!(mean.abs() < 0.02, "mean = {mean}");
        assert!((variance.sqrt() - 0.5).abs() < 0.02, "std = {}", variance.sqrt());
    }

    #[test]
    fn test_zero_rate_leaves_genes_untouched() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut genes = vec![0.3; 50];
        let params = MutationParams {
            rate: 0.0,
            strength: 0.8,
            replacement_chance: 0.5,
        };
        mutate(&mut genes, params, &mut rng);
        assert_eq!(genes, vec![0.3; 50]);
    }

    #[test]
    fn test_full_rate_mutation_stays_clamped() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut genes = vec![0.99; 500];
        let params = MutationParams {
            rate: 1.0,
            strength: 0.8,
            replacement_chance: 0.0,
        };
        mutate(&mut genes, params, &mut rng);
        assert!(genes.iter().all(|g| (GENE_MIN..=GENE_MAX).contains(g)));
        assert!(genes.iter().any(|g| *g != 0.99));
        assert!(genes.contains(&GENE_MAX));
    }
}
