//! LSTM regressor for next-step transaction amounts
//!
//! Reads a window of encoded transactions and predicts the scaled amount of
//! the transaction that follows.

use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Lstm, LstmConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};

/// Configuration for the LSTM regressor
#[derive(Debug, Clone)]
pub struct LSTMConfig {
    /// Encoded feature width
    pub input_dim: usize,
    /// LSTM hidden size
    pub hidden_size: usize,
    /// Dropout rate applied to the final hidden state
    pub dropout: f64,
}

impl LSTMConfig {
    pub fn new(input_dim: usize, hidden_size: usize, dropout: f64) -> Self {
        LSTMConfig {
            input_dim,
            hidden_size,
            dropout,
        }
    }
}

/// LSTM regressor
///
/// Architecture:
/// 1. LSTM over the window -> final hidden state
/// 2. ReLU -> Dropout
/// 3. Linear -> scalar prediction
///
/// burn's `Lstm` keeps tanh as its cell activation, so the ReLU applied to
/// the final hidden state approximates an LSTM layer with ReLU activation.
#[derive(Module, Debug)]
pub struct LSTMRegressor<B: Backend> {
    lstm: Lstm<B>,
    dropout: Dropout,
    output: Linear<B>,
    /// Config for reference
    hidden_size: usize,
}

impl<B: Backend> LSTMRegressor<B> {
    /// Create a new model
    pub fn new(device: &B::Device, config: &LSTMConfig) -> Self {
        LSTMRegressor {
            lstm: LstmConfig::new(config.input_dim, config.hidden_size, true).init(device),
            dropout: DropoutConfig::new(config.dropout).init(),
            output: LinearConfig::new(config.hidden_size, 1).init(device),
            hidden_size: config.hidden_size,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `windows` - Window features [batch, window_size, input_dim]
    ///
    /// # Returns
    /// Next-step predictions [batch, 1]
    pub fn forward(&self, windows: Tensor<B, 3>) -> Tensor<B, 2> {
        let batch_size = windows.dims()[0];

        let (_, state) = self.lstm.forward(windows, None);
        let hidden = state.hidden.reshape([batch_size, self.hidden_size]);

        let x = relu(hidden);
        let x = self.dropout.forward(x);
        self.output.forward(x)
    }

    /// Predict the step after a single window given as rows of features
    pub fn predict_window(&self, steps: &[Vec<f32>], device: &B::Device) -> f32 {
        let seq_len = steps.len();
        let feature_dim = steps.first().map(|s| s.len()).unwrap_or(0);
        let flat: Vec<f32> = steps.iter().flatten().copied().collect();

        let input = Tensor::<B, 1>::from_floats(flat.as_slice(), device)
            .reshape([1, seq_len, feature_dim]);
        let prediction: Tensor<B, 1> = self.forward(input).reshape([1]);

        prediction.into_scalar().elem::<f32>()
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Every weight and bias value, gate by gate, then the output layer
    #[cfg(test)]
    pub(crate) fn parameter_values(&self) -> Vec<f32> {
        let gates = [
            &self.lstm.input_gate,
            &self.lstm.forget_gate,
            &self.lstm.output_gate,
            &self.lstm.cell_gate,
        ];
        let mut layers: Vec<&Linear<B>> = Vec::new();
        for gate in gates {
            layers.push(&gate.input_transform);
            layers.push(&gate.hidden_transform);
        }
        layers.push(&self.output);

        let mut values = Vec::new();
        for layer in layers {
            values.extend(layer.weight.val().into_data().to_vec::<f32>().unwrap());
            if let Some(bias) = &layer.bias {
                values.extend(bias.val().into_data().to_vec::<f32>().unwrap());
            }
        }
        values
    }
}
