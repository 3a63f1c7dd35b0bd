//! Policies and fitness evaluation for evolved vehicle controllers.
//!
//! - [`policy`] - the feedforward [`NeuralPolicy`](policy::NeuralPolicy) that maps
//!   sensor readings to controls, and its flat chromosome encoding
//! - [`fitness`] - the fitness function over terminal run statistics and the
//!   ranking shared by selection and reporting
//!
//! # Example
//!
//! ```
//! use neurodrive_engine::RunStats;
//! use neurodrive_evaluator::{
//!     fitness::{FitnessWeights, rank},
//!     policy::NeuralPolicy,
//! };
//!
//! let policy = NeuralPolicy::zeroed(&[5, 4, 3]).unwrap();
//! let slow = policy.to_rankable(RunStats { distance_covered: 10.0, ..RunStats::new(200.0) });
//! let fast = policy.to_rankable(RunStats { distance_covered: 90.0, ..RunStats::new(200.0) });
//!
//! let population = [slow, fast];
//! let ranked = rank(&FitnessWeights::default(), &population);
//! assert_eq!(ranked[0].index, 1);
//! ```

pub mod fitness;
pub mod policy;
