//! Windowing engine and burn Dataset implementation
//!
//! Slices the encoded feature matrix into fixed-length overlapping windows,
//! each paired with the scaled target value that follows it.

use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// A contiguous run of feature vectors and the next-step target
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Feature vectors, oldest first: [window_size][feature_dim]
    pub steps: Vec<Vec<f32>>,
    /// Scaled target channel of the step immediately after the window
    pub target: f32,
}

impl Window {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Feature dimension (0 for an empty window)
    pub fn feature_dim(&self) -> usize {
        self.steps.first().map(|s| s.len()).unwrap_or(0)
    }

    /// Row-major copy of the steps
    pub fn flatten(&self) -> Vec<f32> {
        self.steps.iter().flatten().copied().collect()
    }
}

/// Slice `rows` into `rows.len() - window_size` windows.
///
/// Window `i` covers rows `[i, i + window_size)` and its target is
/// `rows[i + window_size][target_index]`. Order is preserved. Returns an empty
/// vector when there are not more rows than the window size.
pub fn create_windows(rows: &[Vec<f32>], window_size: usize, target_index: usize) -> Vec<Window> {
    if window_size == 0 || rows.len() <= window_size {
        return Vec::new();
    }

    (0..rows.len() - window_size)
        .map(|i| Window {
            steps: rows[i..i + window_size].to_vec(),
            target: rows[i + window_size][target_index],
        })
        .collect()
}

/// Training windows in temporal order
#[derive(Debug, Clone, Default)]
pub struct WindowDataset {
    windows: Vec<Window>,
}

impl WindowDataset {
    pub fn new(windows: Vec<Window>) -> Self {
        WindowDataset { windows }
    }

    /// Window the feature matrix directly
    pub fn from_rows(rows: &[Vec<f32>], window_size: usize, target_index: usize) -> Self {
        Self::new(create_windows(rows, window_size, target_index))
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// The most recent window, if any
    pub fn last(&self) -> Option<&Window> {
        self.windows.last()
    }
}

impl Dataset<Window> for WindowDataset {
    fn get(&self, index: usize) -> Option<Window> {
        self.windows.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.windows.len()
    }
}

/// Batch of windows for training
#[derive(Debug, Clone)]
pub struct WindowBatch<B: Backend> {
    /// Window features: [batch, window_size, feature_dim]
    pub inputs: Tensor<B, 3>,
    /// Next-step targets: [batch]
    pub targets: Tensor<B, 1>,
}

/// Batcher for creating training batches
#[derive(Clone)]
pub struct WindowBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> WindowBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        WindowBatcher { device }
    }
}

impl<B: Backend> burn::data::dataloader::batcher::Batcher<B, Window, WindowBatch<B>>
    for WindowBatcher<B>
{
    fn batch(&self, items: Vec<Window>, _device: &B::Device) -> WindowBatch<B> {
        let batch_size = items.len();
        let seq_len = items.first().map(|w| w.len()).unwrap_or(0);
        let feature_dim = items.first().map(|w| w.feature_dim()).unwrap_or(0);

        let mut input_data = Vec::with_capacity(batch_size * seq_len * feature_dim);
        let mut target_data = Vec::with_capacity(batch_size);

        for window in &items {
            for step in &window.steps {
                input_data.extend_from_slice(step);
            }
            target_data.push(window.target);
        }

        let inputs = Tensor::<B, 1>::from_floats(input_data.as_slice(), &self.device)
            .reshape([batch_size, seq_len, feature_dim]);
        let targets = Tensor::<B, 1>::from_floats(target_data.as_slice(), &self.device);

        WindowBatch { inputs, targets }
    }
}
