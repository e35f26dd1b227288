//! Equal-frequency bins for relative depth differences.

/// Bin edges learned from training samples.
///
/// `edges` has `bin_count - 1` ascending entries; a value falls into the
/// number of edges that are `<=` it, so keys depend on quantized inputs only.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthBins {
    edges: Vec<f32>,
}

impl DepthBins {
    /// Learns quantile edges so each bin receives about the same share of
    /// `samples`. Returns `None` when there is nothing to learn from.
    pub fn from_samples(samples: &mut [f32], bin_count: usize) -> Option<Self> {
        if samples.is_empty() || bin_count == 0 {
            return None;
        }
        samples.sort_by(|a, b| a.total_cmp(b));
        let len = samples.len();
        let edges = (1..bin_count).map(|k| samples[k * len / bin_count]).collect();
        Some(Self { edges })
    }

    /// Creates bins from explicit ascending edges.
    pub fn from_edges(edges: Vec<f32>) -> Self {
        Self { edges }
    }

    pub fn bin_count(&self) -> usize {
        self.edges.len() + 1
    }

    pub fn edges(&self) -> &[f32] {
        &self.edges
    }

    /// Bin index of `value`.
    pub fn quantize(&self, value: f32) -> u8 {
        self.edges.partition_point(|&e| e <= value) as u8
    }
}
