pub mod definition;
pub mod registry;
pub mod xml;

pub use definition::{ChartDefinition, ChartSource, GroupDefinition, LoadError};
pub use registry::{ChartDescriptor, ChartId, ChartKind, ChartRegistry};
pub use xml::XmlChartFile;
