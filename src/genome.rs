// Heritable data of a plant cell: decision weights and nutrient shares

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::{MutationConfig, SimulationConfig};
use crate::error::{Result, SimError};
use crate::network::Matrix;

/// Genome of one plant cell. Never modified after construction; offspring
/// get a fresh genome from [`Genome::mutate`].
#[derive(Clone, Debug, PartialEq)]
pub struct Genome {
    weights: Vec<Matrix>,
    nutrition: Vec<f64>,
    color: [u8; 3],
}

impl Genome {
    /// De-novo genome: weights uniform in [-1, 1], nutrition uniform in [0, 1]
    /// normalized to sum to one.
    pub fn create_random<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> Self {
        let weights = config
            .genome_layers
            .iter()
            .map(|&(rows, cols)| Matrix::from_fn(rows, cols, |_, _| rng.gen_range(-1.0..=1.0)))
            .collect();

        let mut nutrition: Vec<f64> = (0..config.num_nutrients)
            .map(|_| rng.gen_range(0.0..=1.0))
            .collect();
        let sum: f64 = nutrition.iter().sum();
        if sum > 0.0 {
            nutrition.iter_mut().for_each(|n| *n /= sum);
        } else {
            let share = 1.0 / nutrition.len() as f64;
            nutrition.iter_mut().for_each(|n| *n = share);
        }

        Self::from_parts(weights, nutrition)
    }

    /// Assemble a genome from explicit genes, deriving its color.
    pub fn from_parts(weights: Vec<Matrix>, nutrition: Vec<f64>) -> Self {
        let color = compute_color(&weights);
        Self {
            weights,
            nutrition,
            color,
        }
    }

    /// Offspring genome: Gaussian noise on every gene, an optional `1 - x`
    /// displacement of one element per weight matrix, and nutrition shares
    /// renormalized so their absolute values sum to one.
    pub fn mutate<R: Rng + ?Sized>(&self, mutation: &MutationConfig, rng: &mut R) -> Result<Self> {
        let noise = if mutation.noise_scale > 0.0 {
            Some(Normal::new(0.0, mutation.noise_scale).map_err(|e| {
                SimError::config(format!("invalid mutation noise scale: {}", e))
            })?)
        } else {
            None
        };

        let mut weights = self.weights.clone();
        for matrix in &mut weights {
            let genes = matrix.as_mut_slice();
            add_noise(genes, noise.as_ref(), rng);
            if !genes.is_empty() && rng.gen::<f64>() < mutation.displacement_probability {
                let idx = rng.gen_range(0..genes.len());
                // Unclamped: values outside [0, 1] may drift further out.
                genes[idx] = 1.0 - genes[idx];
            }
        }

        let mut nutrition = self.nutrition.clone();
        add_noise(&mut nutrition, noise.as_ref(), rng);
        normalize_abs(&mut nutrition)?;

        Ok(Self::from_parts(weights, nutrition))
    }

    /// Why this genome cannot run under `config`, or `None` if it fits.
    pub fn mismatch(&self, config: &SimulationConfig) -> Option<String> {
        let shapes: Vec<_> = self.weights.iter().map(Matrix::shape).collect();
        if shapes != config.genome_layers {
            return Some(format!(
                "layers {:?}, config expects {:?}",
                shapes, config.genome_layers
            ));
        }
        if self.nutrition.len() != config.num_nutrients {
            return Some(format!(
                "{} nutrition shares, config expects {}",
                self.nutrition.len(),
                config.num_nutrients
            ));
        }
        None
    }

    pub fn weights(&self) -> &[Matrix] {
        &self.weights
    }

    pub fn nutrition(&self) -> &[f64] {
        &self.nutrition
    }

    pub fn color(&self) -> [u8; 3] {
        self.color
    }
}

fn add_noise<R: Rng + ?Sized>(genes: &mut [f64], noise: Option<&Normal<f64>>, rng: &mut R) {
    if let Some(normal) = noise {
        for g in genes {
            *g += normal.sample(rng);
        }
    }
}

/// Divide by the sum of absolute values; refuses a zero or non-finite sum.
pub fn normalize_abs(values: &mut [f64]) -> Result<()> {
    let abs_sum: f64 = values.iter().map(|v| v.abs()).sum();
    if abs_sum == 0.0 || !abs_sum.is_finite() {
        return Err(SimError::Domain(format!(
            "cannot renormalize nutrition vector with absolute sum {}",
            abs_sum
        )));
    }
    values.iter_mut().for_each(|v| *v /= abs_sum);
    Ok(())
}

/// Split the flattened weights into three equal runs; each channel is
/// `floor(2 * mean(|run|) * 255) mod 256`.
fn compute_color(weights: &[Matrix]) -> [u8; 3] {
    let genes: Vec<f64> = weights
        .iter()
        .flat_map(|m| m.as_slice().iter().copied())
        .collect();
    let third = genes.len() / 3;
    let mut color = [0u8; 3];
    if third == 0 {
        return color;
    }
    for (channel, segment) in color.iter_mut().zip(genes.chunks_exact(third)) {
        let mean = segment.iter().map(|g| g.abs()).sum::<f64>() / third as f64;
        let value = (2.0 * mean * 255.0).floor();
        *channel = if value.is_finite() {
            value.rem_euclid(256.0) as u8
        } else {
            0
        };
    }
    color
}
