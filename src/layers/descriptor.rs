use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound on the number of activation values sent to the client for a
/// single layer.
pub const ACTIVATION_SAMPLE_CAP: usize = 64;

/// Upper bound on the number of per-filter activation events a convolution
/// layer produces during one processing run.
pub const FILTER_EVENT_CAP: usize = 16;

/// What a layer does.  Drives both engine behaviour and the client's choice
/// of visualization, so every consumer matches on it exhaustively.
///
/// On the wire the variant appears as a `type` tag with its parameters
/// alongside it, e.g. `{"type":"conv","filters":32,"kernelSize":3}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum LayerKind {
    Input,
    Conv { filters: usize, kernel_size: usize },
    Pool { pool_size: usize },
    Flatten,
    Dense { units: usize },
    Output { classes: usize },
    Dropout { rate: f64 },
}

impl LayerKind {
    /// Short lowercase tag, identical to the serialized `type` field.
    pub fn tag(&self) -> &'static str {
        match self {
            LayerKind::Input          => "input",
            LayerKind::Conv { .. }    => "conv",
            LayerKind::Pool { .. }    => "pool",
            LayerKind::Flatten        => "flatten",
            LayerKind::Dense { .. }   => "dense",
            LayerKind::Output { .. }  => "output",
            LayerKind::Dropout { .. } => "dropout",
        }
    }

    /// One-line, plain-language account of the layer's role.
    pub fn explanation(&self) -> &'static str {
        match self {
            LayerKind::Input          => "receives your original image data",
            LayerKind::Conv { .. }    => "scans for patterns like edges and shapes using filters",
            LayerKind::Pool { .. }    => "reduces image size while keeping important features",
            LayerKind::Flatten        => "converts 2D data into a 1D list for the final layers",
            LayerKind::Dense { .. }   => "makes connections between features to determine the final prediction",
            LayerKind::Output { .. }  => "produces the final prediction probabilities for each digit",
            LayerKind::Dropout { .. } => "randomly silences some neurons during training so the network does not over-rely on any one of them",
        }
    }

    /// Whether the layer carries trainable weights.
    pub fn has_weights(&self) -> bool {
        match self {
            LayerKind::Conv { .. } | LayerKind::Dense { .. } | LayerKind::Output { .. } => true,
            LayerKind::Input
            | LayerKind::Pool { .. }
            | LayerKind::Flatten
            | LayerKind::Dropout { .. } => false,
        }
    }
}

/// Static description of one stage of the visualized network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: LayerKind,
    /// Output dimensions without the batch axis, e.g. `[26, 26, 32]`.
    pub output_shape: Vec<usize>,
    pub description: String,
}

impl LayerDescriptor {
    pub fn new(
        name: impl Into<String>,
        kind: LayerKind,
        output_shape: Vec<usize>,
        description: impl Into<String>,
    ) -> Self {
        LayerDescriptor {
            name: name.into(),
            kind,
            output_shape,
            description: description.into(),
        }
    }

    /// Number of scalar outputs the layer produces.
    pub fn output_len(&self) -> usize {
        self.output_shape.iter().product()
    }

    /// How many activation values a processing run reports for this layer.
    pub fn activation_sample_len(&self) -> usize {
        let full = match &self.kind {
            LayerKind::Dense { units }    => *units,
            LayerKind::Output { classes } => *classes,
            LayerKind::Input
            | LayerKind::Conv { .. }
            | LayerKind::Pool { .. }
            | LayerKind::Flatten
            | LayerKind::Dropout { .. } => self.output_len(),
        };
        full.clamp(1, ACTIVATION_SAMPLE_CAP)
    }

    /// Number of `filter-activation` events this layer emits (zero for
    /// anything that is not a convolution).
    pub fn filter_event_count(&self) -> usize {
        match &self.kind {
            LayerKind::Conv { filters, .. } => (*filters).min(FILTER_EVENT_CAP),
            _ => 0,
        }
    }

    /// `(height, width)` of the spatial grid, if the layer has one.
    pub fn spatial_dims(&self) -> Option<(usize, usize)> {
        match self.output_shape.as_slice() {
            [h, w, _] => Some((*h, *w)),
            _ => None,
        }
    }

    /// Human-readable shape, e.g. `26×26×32`.
    pub fn shape_label(&self) -> String {
        self.output_shape
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("×")
    }
}

impl fmt::Display for LayerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.kind.tag(), self.shape_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conv_serializes_with_flat_type_tag() {
        let conv = LayerDescriptor::new(
            "Conv1",
            LayerKind::Conv { filters: 32, kernel_size: 3 },
            vec![26, 26, 32],
            "32 filters, 3×3 kernel",
        );
        let json = serde_json::to_value(&conv).unwrap();
        assert_eq!(json["type"], "conv");
        assert_eq!(json["filters"], 32);
        assert_eq!(json["kernelSize"], 3);
        assert_eq!(json["outputShape"], serde_json::json!([26, 26, 32]));

        let back: LayerDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, conv);
    }

    #[test]
    fn activation_sample_is_capped() {
        let pool = LayerDescriptor::new("Pool1", LayerKind::Pool { pool_size: 2 }, vec![13, 13, 32], "");
        assert_eq!(pool.activation_sample_len(), ACTIVATION_SAMPLE_CAP);

        let out = LayerDescriptor::new("Output", LayerKind::Output { classes: 10 }, vec![10], "");
        assert_eq!(out.activation_sample_len(), 10);
    }

    #[test]
    fn only_convolutions_emit_filter_events() {
        let conv = LayerDescriptor::new("C", LayerKind::Conv { filters: 64, kernel_size: 3 }, vec![11, 11, 64], "");
        let dense = LayerDescriptor::new("D", LayerKind::Dense { units: 128 }, vec![128], "");
        assert_eq!(conv.filter_event_count(), FILTER_EVENT_CAP);
        assert_eq!(dense.filter_event_count(), 0);
    }

    #[test]
    fn shape_label_joins_dims() {
        let input = LayerDescriptor::new("Input", LayerKind::Input, vec![28, 28, 1], "");
        assert_eq!(input.shape_label(), "28×28×1");
        assert_eq!(input.spatial_dims(), Some((28, 28)));
    }
}
