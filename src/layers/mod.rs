pub mod descriptor;
pub mod registry;

pub use descriptor::{LayerDescriptor, LayerKind};
pub use registry::LayerRegistry;
