pub mod registry;

pub use registry::GaugeRegistry;
