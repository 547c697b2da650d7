// Decision network: fixed-topology forward pass, tanh after every layer, no biases

use serde::{Deserialize, Serialize};

/// Dense weight matrix stored row-major. Rows index the layer inputs and
/// columns the layer outputs, so a layer computes `transpose(W) * x`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = String;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        let len = raw.data.len();
        Matrix::from_vec(raw.rows, raw.cols, raw.data)
            .ok_or_else(|| format!("{}x{} matrix cannot hold {} values", raw.rows, raw.cols, len))
    }
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self { rows, cols, data }
    }

    /// Build from row-major values; `None` if the length does not match.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (rows.checked_mul(cols) == Some(data.len())).then_some(Self { rows, cols, data })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// `transpose(self) * input`. Panics if `input.len() != rows`.
    pub fn transpose_mul(&self, input: &[f64]) -> Vec<f64> {
        assert_eq!(
            input.len(),
            self.rows,
            "layer expects {} inputs, got {}",
            self.rows,
            input.len()
        );
        let mut out = vec![0.0; self.cols];
        for (r, &x) in input.iter().enumerate() {
            let row = &self.data[r * self.cols..(r + 1) * self.cols];
            for (o, &w) in out.iter_mut().zip(row) {
                *o += w * x;
            }
        }
        out
    }
}

/// Run the input through every layer in order: `x = tanh(transpose(W) * x)`.
pub fn evaluate(weights: &[Matrix], input: &[f64]) -> Vec<f64> {
    let mut x = input.to_vec();
    for layer in weights {
        x = layer.transpose_mul(&x);
        for v in &mut x {
            *v = v.tanh();
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_length_matches_last_layer() {
        let weights = vec![
            Matrix::from_fn(10, 7, |r, c| (r as f64 - c as f64) * 0.1),
            Matrix::from_fn(7, 9, |r, c| (r * c) as f64 * 0.01),
        ];
        let out = evaluate(&weights, &[0.5; 10]);
        assert_eq!(out.len(), 9);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let weights = vec![Matrix::from_fn(10, 9, |r, c| ((r + 3 * c) % 5) as f64 - 2.0)];
        let input: Vec<f64> = (0..10).map(|i| i as f64 * 0.1).collect();
        assert_eq!(evaluate(&weights, &input), evaluate(&weights, &input));
    }

    #[test]
    fn layer_uses_transposed_weights() {
        // 2 inputs -> 3 outputs; output j = tanh(sum_i W[i][j] * x[i])
        let w = Matrix::from_vec(2, 3, vec![1.0, 0.0, -1.0, 0.5, 2.0, 0.0]).unwrap();
        let out = evaluate(&[w], &[1.0, 0.5]);
        assert!((out[0] - (1.25f64).tanh()).abs() < 1e-12);
        assert!((out[1] - (1.0f64).tanh()).abs() < 1e-12);
        assert!((out[2] - (-1.0f64).tanh()).abs() < 1e-12);
    }

    #[test]
    fn zero_weights_give_zero_output() {
        let weights = vec![Matrix::zeros(10, 9), Matrix::zeros(9, 9)];
        let out = evaluate(&weights, &[3.0; 10]);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        assert!(Matrix::from_vec(2, 2, vec![1.0; 3]).is_none());
    }

    #[test]
    fn deserializing_short_data_fails() {
        let good: Matrix =
            serde_json::from_str(r#"{"rows":1,"cols":2,"data":[0.5,-0.5]}"#).unwrap();
        assert_eq!(good.shape(), (1, 2));

        let short = serde_json::from_str::<Matrix>(r#"{"rows":10,"cols":9,"data":[0.5,0.5]}"#);
        assert!(short.is_err());
    }
}
