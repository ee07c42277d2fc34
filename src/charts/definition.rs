//! Raw chart definitions as read from the chart file, before they are
//! resolved into descriptors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("chart file {path} is unreadable: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("chart file is malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupDefinition {
    /// Raw `numkey` attribute, if present.
    pub num_key: Option<String>,
    pub charts: Vec<ChartDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartDefinition {
    pub chart_type: String,
    pub caption: String,
    pub background: String,
    pub size_locked: bool,
    pub font_family: String,
    pub start_size: Option<String>,
    /// `(size label, row text)` in file order.
    pub rows: Vec<(String, String)>,
    pub source: String,
    pub scale: bool,
    pub layers: Vec<String>,
}

/// Provider of ordered chart groups.
pub trait ChartSource {
    fn groups(&self) -> Result<Vec<GroupDefinition>, LoadError>;
}

impl ChartSource for Vec<GroupDefinition> {
    fn groups(&self) -> Result<Vec<GroupDefinition>, LoadError> {
        Ok(self.clone())
    }
}
