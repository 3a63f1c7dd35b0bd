//! Fixed-topology feedforward policy and its chromosome encoding.
//!
//! A [`NeuralPolicy`] is described by its layer sizes `[d0, d1, ..., dk]`: `d0`
//! sensor inputs, `dk` control outputs and dense `tanh` layers in between. There
//! are no biases; every parameter is a weight.
//!
//! # Chromosome Layout
//!
//! The chromosome is the flat list of every weight, ordered layer by layer,
//! then by output neuron, then by input index:
//!
//! ```text
//! [ L0 o0 i0, L0 o0 i1, ..., L0 o1 i0, ..., L1 o0 i0, ... ]
//! ```
//!
//! It holds exactly `Σ d_i · d_{i+1}` genes. [`NeuralPolicy::chromosome`] and
//! [`NeuralPolicy::load_chromosome`] walk the same order, so a round trip
//! reproduces every weight bit for bit.

use neurodrive_engine::{Controls, Driver};
use rand::Rng;

use crate::fitness::RankableChromosome;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum InvalidDimensions {
    #[display("a policy needs at least an input and an output layer, got {_0} layer size(s)")]
    TooFewLayers(#[error(not(source))] usize),
    #[display("layer {_0} has no neurons")]
    EmptyLayer(#[error(not(source))] usize),
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum InvalidChromosome {
    #[display("gene {index} is not a finite number ({value})")]
    NonFinite { index: usize, value: f32 },
    #[display("chromosome holds {actual} genes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[display("policy dimensions {actual:?} do not match {expected:?}")]
    DimensionMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[display("{_0}")]
    #[from]
    Dimensions(InvalidDimensions),
}

/// Checks that `dimensions` describes a usable network.
pub fn validate_dimensions(dimensions: &[usize]) -> Result<(), InvalidDimensions> {
    if dimensions.len() < 2 {
        return Err(InvalidDimensions::TooFewLayers(dimensions.len()));
    }
    if let Some(index) = dimensions.iter().position(|d| *d == 0) {
        return Err(InvalidDimensions::EmptyLayer(index));
    }
    Ok(())
}

/// Number of genes in the chromosome of a policy with these dimensions.
#[must_use]
pub fn gene_count(dimensions: &[usize]) -> usize {
    dimensions.windows(2).map(|w| w[0] * w[1]).sum()
}

/// One dense `tanh` layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    input_count: usize,
    /// Row-major `output_count × input_count` matrix.
    weights: Vec<f32>,
    outputs: Vec<f32>,
}

impl Layer {
    fn from_fn<F>(output_count: usize, input_count: usize, f: F) -> Self
    where
        F: FnMut(usize) -> f32,
    {
        Self {
            input_count,
            weights: (0..output_count * input_count).map(f).collect(),
            outputs: vec![0.0; output_count],
        }
    }

    #[must_use]
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Weight from input `input` to output neuron `output`.
    #[must_use]
    pub fn weight(&self, output: usize, input: usize) -> f32 {
        self.weights[output * self.input_count + input]
    }

    /// Activations computed by the last feed-forward pass.
    #[must_use]
    pub fn outputs(&self) -> &[f32] {
        &self.outputs
    }

    fn feed_forward(&mut self, inputs: &[f32]) {
        for (output, row) in self
            .outputs
            .iter_mut()
            .zip(self.weights.chunks_exact(self.input_count))
        {
            // missing inputs contribute nothing
            let sum: f32 = row.iter().zip(inputs).map(|(w, x)| w * x).sum();
            *output = sum.tanh();
        }
    }
}

/// A feedforward network mapping sensor readings to controls.
///
/// # Example
///
/// ```
/// use neurodrive_evaluator::policy::NeuralPolicy;
///
/// let mut policy = NeuralPolicy::zeroed(&[5, 4, 2]).unwrap();
/// assert_eq!(policy.gene_count(), 5 * 4 + 4 * 2);
///
/// let genes = vec![0.25; policy.gene_count()];
/// policy.load_chromosome(&genes).unwrap();
/// assert_eq!(policy.chromosome(), genes);
///
/// let outputs = policy.feed_forward(&[1.0, 0.0, 0.0, 0.0, 0.0]);
/// assert_eq!(outputs.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NeuralPolicy {
    dimensions: Vec<usize>,
    layers: Vec<Layer>,
    inputs: Vec<f32>,
}

impl NeuralPolicy {
    fn from_fn<F>(dimensions: &[usize], mut f: F) -> Result<Self, InvalidDimensions>
    where
        F: FnMut(usize) -> f32,
    {
        validate_dimensions(dimensions)?;
        let layers = dimensions
            .windows(2)
            .map(|w| Layer::from_fn(w[1], w[0], &mut f))
            .collect();
        Ok(Self {
            dimensions: dimensions.to_vec(),
            layers,
            inputs: Vec::with_capacity(dimensions[0]),
        })
    }

    /// Creates a policy whose weights are all zero.
    pub fn zeroed(dimensions: &[usize]) -> Result<Self, InvalidDimensions> {
        Self::from_fn(dimensions, |_| 0.0)
    }

    /// Creates a policy with weights drawn uniformly from `[-1, 1]`.
    pub fn random<R>(dimensions: &[usize], rng: &mut R) -> Result<Self, InvalidDimensions>
    where
        R: Rng + ?Sized,
    {
        Self::from_fn(dimensions, |_| rng.random_range(-1.0..=1.0))
    }

    /// Builds a policy from an externally supplied chromosome.
    ///
    /// Unlike [`load_chromosome`](Self::load_chromosome), the gene count must
    /// match the dimensions exactly.
    pub fn from_chromosome(dimensions: &[usize], genes: &[f32]) -> Result<Self, InvalidChromosome> {
        let expected = gene_count(dimensions);
        let mut policy = Self::zeroed(dimensions)?;
        if genes.len() != expected {
            return Err(InvalidChromosome::LengthMismatch {
                expected,
                actual: genes.len(),
            });
        }
        policy.load_chromosome(genes)?;
        Ok(policy)
    }

    #[must_use]
    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Inputs of the last feed-forward pass.
    #[must_use]
    pub fn inputs(&self) -> &[f32] {
        &self.inputs
    }

    /// Outputs of the last feed-forward pass.
    #[must_use]
    pub fn outputs(&self) -> &[f32] {
        self.layers.last().map_or(&[], |l| l.outputs())
    }

    #[must_use]
    pub fn gene_count(&self) -> usize {
        gene_count(&self.dimensions)
    }

    /// Runs the network on `inputs` and returns the control vector.
    ///
    /// Inputs beyond `d0` are ignored and missing inputs read as 0. Every
    /// layer's activations stay available through [`layers`](Self::layers).
    pub fn feed_forward(&mut self, inputs: &[f32]) -> &[f32] {
        self.inputs.clear();
        self.inputs.extend_from_slice(inputs);

        let Some((first, rest)) = self.layers.split_first_mut() else {
            return &[];
        };
        first.feed_forward(inputs);
        let mut previous = first;
        for layer in rest {
            layer.feed_forward(&previous.outputs);
            previous = layer;
        }
        &previous.outputs
    }

    /// Flattens every weight into a chromosome.
    #[must_use]
    pub fn chromosome(&self) -> Vec<f32> {
        let mut genes = Vec::with_capacity(self.gene_count());
        for layer in &self.layers {
            genes.extend_from_slice(&layer.weights);
        }
        genes
    }

    /// Overwrites the weights from a chromosome.
    ///
    /// A short chromosome leaves the remaining weights untouched and extra
    /// genes are ignored. The chromosome is checked before anything is
    /// written, so on error the policy is unchanged.
    pub fn load_chromosome(&mut self, genes: &[f32]) -> Result<(), InvalidChromosome> {
        if let Some((index, &value)) = genes.iter().enumerate().find(|(_, g)| !g.is_finite()) {
            return Err(InvalidChromosome::NonFinite { index, value });
        }
        let mut genes = genes.iter();
        for weight in self.layers.iter_mut().flat_map(|l| l.weights.iter_mut()) {
            let Some(gene) = genes.next() else {
                break;
            };
            *weight = *gene;
        }
        Ok(())
    }

    /// Pairs the chromosome with the statistics of its run.
    #[must_use]
    pub fn to_rankable(&self, stats: neurodrive_engine::RunStats) -> RankableChromosome {
        RankableChromosome {
            chromosome: self.chromosome(),
            dimensions: self.dimensions.clone(),
            stats,
        }
    }
}

impl Driver for NeuralPolicy {
    fn drive(&mut self, inputs: &[f32]) -> Controls {
        Controls::from_outputs(self.feed_forward(inputs))
    }
}

/// Where a population slot gets its initial policy from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PolicySeed {
    /// Random initialization, possibly overwritten by stored chromosomes.
    #[default]
    Standard,
    /// A policy supplied from outside the training session.
    External {
        dimensions: Vec<usize>,
        chromosome: Vec<f32>,
    },
}

impl PolicySeed {
    /// Validates the seed against the population's dimensions.
    ///
    /// Returns `None` for [`PolicySeed::Standard`].
    pub fn into_policy(self, expected: &[usize]) -> Result<Option<NeuralPolicy>, InvalidChromosome> {
        match self {
            Self::Standard => Ok(None),
            Self::External {
                dimensions,
                chromosome,
            } => {
                validate_dimensions(&dimensions)?;
                if dimensions != expected {
                    return Err(InvalidChromosome::DimensionMismatch {
                        expected: expected.to_vec(),
                        actual: dimensions,
                    });
                }
                NeuralPolicy::from_chromosome(&dimensions, &chromosome).map(Some)
            }
        }
    }
}
