//! Minimal dense feed-forward regressor for home-win probability.
//!
//! Architecture is fixed: dense(16, relu) → dense(8, relu) → dense(1,
//! sigmoid), trained with binary cross-entropy via minibatch gradient
//! descent. Weights serialize with serde so they can be persisted and
//! reloaded across runs.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Input feature count: home win%, away win%, home PPG, away PPG,
/// home PAPG, away PAPG, constant home indicator.
pub const INPUT_DIM: usize = 7;
const HIDDEN_1: usize = 16;
const HIDDEN_2: usize = 8;

const PROB_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    /// HIDDEN_1 × INPUT_DIM
    w1: Vec<Vec<f64>>,
    b1: Vec<f64>,
    /// HIDDEN_2 × HIDDEN_1
    w2: Vec<Vec<f64>>,
    b2: Vec<f64>,
    /// 1 × HIDDEN_2
    w3: Vec<f64>,
    b3: f64,
}

/// Knobs for one training run.
#[derive(Debug, Clone, Copy)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Fraction of rows held out for validation
    pub validation_split: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.01,
            validation_split: 0.2,
        }
    }
}

/// Summary of a completed training run.
#[derive(Debug, Clone, Copy)]
pub struct TrainReport {
    pub rows: usize,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

fn bce_loss(p: f64, y: f64) -> f64 {
    let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}

/// He-uniform init bound for a layer with the given fan-in.
fn init_bound(fan_in: usize) -> f64 {
    (6.0 / fan_in as f64).sqrt()
}

/// Activations captured during a forward pass, reused by backprop.
struct ForwardTrace {
    a1: Vec<f64>,
    a2: Vec<f64>,
    output: f64,
}

impl Network {
    /// Fresh, untrained network with small random weights.
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let lim1 = init_bound(INPUT_DIM);
        let lim2 = init_bound(HIDDEN_1);
        let lim3 = init_bound(HIDDEN_2);
        Network {
            w1: (0..HIDDEN_1)
                .map(|_| (0..INPUT_DIM).map(|_| rng.gen_range(-lim1..lim1)).collect())
                .collect(),
            b1: vec![0.0; HIDDEN_1],
            w2: (0..HIDDEN_2)
                .map(|_| (0..HIDDEN_1).map(|_| rng.gen_range(-lim2..lim2)).collect())
                .collect(),
            b2: vec![0.0; HIDDEN_2],
            w3: (0..HIDDEN_2).map(|_| rng.gen_range(-lim3..lim3)).collect(),
            b3: 0.0,
        }
    }

    fn forward(&self, x: &[f64]) -> ForwardTrace {
        debug_assert_eq!(x.len(), INPUT_DIM);
        let a1: Vec<f64> = self
            .w1
            .iter()
            .zip(&self.b1)
            .map(|(row, b)| relu(dot(row, x) + b))
            .collect();
        let a2: Vec<f64> = self
            .w2
            .iter()
            .zip(&self.b2)
            .map(|(row, b)| relu(dot(row, &a1) + b))
            .collect();
        let output = sigmoid(dot(&self.w3, &a2) + self.b3);
        ForwardTrace { a1, a2, output }
    }

    /// Run the network on one feature vector. Output is in (0, 1).
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.forward(features).output
    }

    /// Mean binary cross-entropy over a labelled set.
    fn mean_loss(&self, rows: &[Vec<f64>], labels: &[f64]) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let total: f64 = rows
            .iter()
            .zip(labels)
            .map(|(x, y)| bce_loss(self.predict(x), *y))
            .sum();
        total / rows.len() as f64
    }

    /// Accumulate gradients for one sample into the given buffers.
    /// With a sigmoid output and cross-entropy loss the output delta
    /// collapses to `prediction − label`.
    #[allow(clippy::too_many_arguments)]
    fn accumulate_gradients(
        &self,
        x: &[f64],
        y: f64,
        gw1: &mut [Vec<f64>],
        gb1: &mut [f64],
        gw2: &mut [Vec<f64>],
        gb2: &mut [f64],
        gw3: &mut [f64],
        gb3: &mut f64,
    ) {
        let trace = self.forward(x);
        let d_out = trace.output - y;

        // Output layer
        for (g, a) in gw3.iter_mut().zip(&trace.a2) {
            *g += d_out * a;
        }
        *gb3 += d_out;

        // Second hidden layer: relu' gates the backflow
        let mut d2 = vec![0.0; HIDDEN_2];
        for j in 0..HIDDEN_2 {
            if trace.a2[j] > 0.0 {
                d2[j] = self.w3[j] * d_out;
            }
        }
        for j in 0..HIDDEN_2 {
            if d2[j] != 0.0 {
                for (g, a) in gw2[j].iter_mut().zip(&trace.a1) {
                    *g += d2[j] * a;
                }
                gb2[j] += d2[j];
            }
        }

        // First hidden layer
        let mut d1 = vec![0.0; HIDDEN_1];
        for i in 0..HIDDEN_1 {
            if trace.a1[i] > 0.0 {
                let mut back = 0.0;
                for j in 0..HIDDEN_2 {
                    back += self.w2[j][i] * d2[j];
                }
                d1[i] = back;
            }
        }
        for i in 0..HIDDEN_1 {
            if d1[i] != 0.0 {
                for (g, xv) in gw1[i].iter_mut().zip(x) {
                    *g += d1[i] * xv;
                }
                gb1[i] += d1[i];
            }
        }
    }

    fn apply_gradients(
        &mut self,
        scale: f64,
        gw1: &[Vec<f64>],
        gb1: &[f64],
        gw2: &[Vec<f64>],
        gb2: &[f64],
        gw3: &[f64],
        gb3: f64,
    ) {
        for (row, grow) in self.w1.iter_mut().zip(gw1) {
            for (w, g) in row.iter_mut().zip(grow) {
                *w -= scale * g;
            }
        }
        for (b, g) in self.b1.iter_mut().zip(gb1) {
            *b -= scale * g;
        }
        for (row, grow) in self.w2.iter_mut().zip(gw2) {
            for (w, g) in row.iter_mut().zip(grow) {
                *w -= scale * g;
            }
        }
        for (b, g) in self.b2.iter_mut().zip(gb2) {
            *b -= scale * g;
        }
        for (w, g) in self.w3.iter_mut().zip(gw3) {
            *w -= scale * g;
        }
        self.b3 -= scale * gb3;
    }

    fn is_finite(&self) -> bool {
        self.w1.iter().flatten().all(|w| w.is_finite())
            && self.b1.iter().all(|b| b.is_finite())
            && self.w2.iter().flatten().all(|w| w.is_finite())
            && self.b2.iter().all(|b| b.is_finite())
            && self.w3.iter().all(|w| w.is_finite())
            && self.b3.is_finite()
    }

    /// Train in place over labelled feature rows.
    ///
    /// Rows are shuffled once and split train/validation per the config,
    /// then iterated in minibatches for the configured epoch count.
    /// Returns `None` if there are no rows or the weights diverge to
    /// non-finite values (the caller should discard this network).
    pub fn fit<R: Rng>(
        &mut self,
        rows: &[Vec<f64>],
        labels: &[f64],
        cfg: &TrainConfig,
        rng: &mut R,
    ) -> Option<TrainReport> {
        debug_assert_eq!(rows.len(), labels.len());
        if rows.is_empty() {
            return None;
        }

        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.shuffle(rng);
        let holdout = ((rows.len() as f64) * cfg.validation_split) as usize;
        // Keep at least one training row
        let holdout = holdout.min(rows.len() - 1);
        let (val_idx, train_idx) = order.split_at(holdout);

        let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| rows[i].clone()).collect();
        let train_labels: Vec<f64> = train_idx.iter().map(|&i| labels[i]).collect();
        let val_rows: Vec<Vec<f64>> = val_idx.iter().map(|&i| rows[i].clone()).collect();
        let val_labels: Vec<f64> = val_idx.iter().map(|&i| labels[i]).collect();

        let batch = cfg.batch_size.max(1);
        let mut batch_order: Vec<usize> = (0..train_rows.len()).collect();

        for _ in 0..cfg.epochs.max(1) {
            batch_order.shuffle(rng);
            for chunk in batch_order.chunks(batch) {
                let mut gw1 = vec![vec![0.0; INPUT_DIM]; HIDDEN_1];
                let mut gb1 = vec![0.0; HIDDEN_1];
                let mut gw2 = vec![vec![0.0; HIDDEN_1]; HIDDEN_2];
                let mut gb2 = vec![0.0; HIDDEN_2];
                let mut gw3 = vec![0.0; HIDDEN_2];
                let mut gb3 = 0.0;
                for &i in chunk {
                    self.accumulate_gradients(
                        &train_rows[i],
                        train_labels[i],
                        &mut gw1,
                        &mut gb1,
                        &mut gw2,
                        &mut gb2,
                        &mut gw3,
                        &mut gb3,
                    );
                }
                let scale = cfg.learning_rate / chunk.len() as f64;
                self.apply_gradients(scale, &gw1, &gb1, &gw2, &gb2, &gw3, gb3);
            }
            if !self.is_finite() {
                return None;
            }
        }

        let validation_loss = if val_rows.is_empty() {
            None
        } else {
            Some(self.mean_loss(&val_rows, &val_labels))
        };
        Some(TrainReport {
            rows: rows.len(),
            train_loss: self.mean_loss(&train_rows, &train_labels),
            validation_loss,
        })
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn synthetic_rows(n: usize, rng: &mut StdRng) -> (Vec<Vec<f64>>, Vec<f64>) {
        // Home wins whenever its win% beats the away side's by any margin.
        let mut rows = Vec::with_capacity(n);
        let mut labels = Vec::with_capacity(n);
        for _ in 0..n {
            let home_pct: f64 = rng.gen_range(0.2..0.8);
            let away_pct: f64 = rng.gen_range(0.2..0.8);
            rows.push(vec![home_pct, away_pct, 1.1, 1.1, 1.1, 1.1, 1.0]);
            labels.push(if home_pct > away_pct { 1.0 } else { 0.0 });
        }
        (rows, labels)
    }

    #[test]
    fn fresh_network_outputs_probability() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = Network::new(&mut rng);
        let p = net.predict(&[0.5, 0.5, 1.1, 1.1, 1.1, 1.1, 1.0]);
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn training_reduces_loss_on_separable_data() {
        let mut rng = StdRng::seed_from_u64(42);
        let (rows, labels) = synthetic_rows(400, &mut rng);
        let mut net = Network::new(&mut rng);
        let before = net.mean_loss(&rows, &labels);
        let report = net
            .fit(&rows, &labels, &TrainConfig::default(), &mut rng)
            .expect("training should succeed");
        assert!(report.train_loss < before);
        assert!(report.validation_loss.is_some());
    }

    #[test]
    fn trained_network_orders_mismatched_teams() {
        let mut rng = StdRng::seed_from_u64(3);
        let (rows, labels) = synthetic_rows(600, &mut rng);
        let mut net = Network::new(&mut rng);
        net.fit(&rows, &labels, &TrainConfig::default(), &mut rng)
            .unwrap();
        let strong_home = net.predict(&[0.75, 0.30, 1.1, 1.1, 1.1, 1.1, 1.0]);
        let weak_home = net.predict(&[0.30, 0.75, 1.1, 1.1, 1.1, 1.1, 1.0]);
        assert!(
            strong_home > weak_home,
            "expected {strong_home:.3} > {weak_home:.3}"
        );
    }

    #[test]
    fn fit_refuses_empty_input() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut net = Network::new(&mut rng);
        assert!(net
            .fit(&[], &[], &TrainConfig::default(), &mut rng)
            .is_none());
    }

    #[test]
    fn weights_round_trip_through_serde() {
        let mut rng = StdRng::seed_from_u64(11);
        let net = Network::new(&mut rng);
        let json = serde_json::to_string(&net).unwrap();
        let restored: Network = serde_json::from_str(&json).unwrap();
        let x = [0.6, 0.4, 1.12, 1.08, 1.05, 1.1, 1.0];
        assert_eq!(net.predict(&x), restored.predict(&x));
    }
}
