use std::sync::Arc;

use crate::layers::descriptor::{LayerDescriptor, LayerKind};

/// The ordered, immutable list of layers every session visualizes.
///
/// Built once at startup and handed to each session by clone; the clone only
/// bumps a reference count.
#[derive(Debug, Clone)]
pub struct LayerRegistry {
    layers: Arc<[LayerDescriptor]>,
}

impl LayerRegistry {
    pub fn new(layers: Vec<LayerDescriptor>) -> Self {
        LayerRegistry { layers: layers.into() }
    }

    /// The demo network: two conv/pool stages feeding a dense head.
    pub fn standard() -> Self {
        LayerRegistry::new(vec![
            LayerDescriptor::new("Input", LayerKind::Input, vec![28, 28, 1], "Original image data"),
            LayerDescriptor::new(
                "Conv1",
                LayerKind::Conv { filters: 32, kernel_size: 3 },
                vec![26, 26, 32],
                "32 filters, 3×3 kernel",
            ),
            LayerDescriptor::new("Pool1", LayerKind::Pool { pool_size: 2 }, vec![13, 13, 32], "2×2 max pooling"),
            LayerDescriptor::new(
                "Conv2",
                LayerKind::Conv { filters: 64, kernel_size: 3 },
                vec![11, 11, 64],
                "64 filters, 3×3 kernel",
            ),
            LayerDescriptor::new("Pool2", LayerKind::Pool { pool_size: 2 }, vec![5, 5, 64], "2×2 max pooling"),
            LayerDescriptor::new("Dense", LayerKind::Dense { units: 128 }, vec![128], "128 neurons"),
            LayerDescriptor::new("Output", LayerKind::Output { classes: 10 }, vec![10], "10 classes (0-9)"),
        ])
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LayerDescriptor> {
        self.layers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerDescriptor> {
        self.layers.iter()
    }

    pub fn as_slice(&self) -> &[LayerDescriptor] {
        &self.layers
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        LayerRegistry::standard()
    }
}
