//! Events published to the rendering layer.
//!
//! The renderer runs out of process and reads one JSON object per line from
//! stdout, e.g. `{"event":"size-changed","id":2,"sizePx":41.5}`.

use std::io::Write;

use log::{error, info};
use serde::Serialize;

use crate::{
    charts::{
        registry::{ChartKind, ChartKindTag},
        ChartDescriptor, ChartId,
    },
    scale::{DerivedScale, PhysicalConfig},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum KioskEvent {
    #[serde(rename_all = "camelCase")]
    ChartActivated {
        id: ChartId,
        name: String,
        kind: ChartKindTag,
        background: String,
        size_px: f64,
        #[serde(flatten)]
        content: ChartContent,
    },
    #[serde(rename_all = "camelCase")]
    SizeChanged { id: ChartId, size_px: f64 },
    #[serde(rename_all = "camelCase")]
    ConfigUpdated {
        #[serde(flatten)]
        scale: DerivedScale,
        hex_red: String,
        hex_green: String,
    },
}

/// What the renderer needs to draw a chart without reading the chart file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartContent {
    #[serde(rename_all = "camelCase")]
    Font {
        font_family: String,
        rows: Vec<RowContent>,
    },
    Svg {
        source: String,
        layers: Vec<String>,
        scale: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowContent {
    pub size: String,
    pub decimal: f64,
    pub text: String,
}

impl From<&ChartKind> for ChartContent {
    fn from(kind: &ChartKind) -> Self {
        match kind {
            ChartKind::Font {
                font_family, rows, ..
            } => ChartContent::Font {
                font_family: font_family.clone(),
                rows: rows
                    .iter()
                    .map(|row| RowContent {
                        size: row.size.label().to_string(),
                        decimal: row.size.decimal_acuity(),
                        text: row.text.clone(),
                    })
                    .collect(),
            },
            ChartKind::Svg {
                source,
                layers,
                scale,
            } => ChartContent::Svg {
                source: source.clone(),
                layers: layers.clone(),
                scale: *scale,
            },
        }
    }
}

impl KioskEvent {
    pub fn chart_activated(chart: &ChartDescriptor) -> Self {
        KioskEvent::ChartActivated {
            id: chart.id,
            name: chart.display_name.clone(),
            kind: chart.kind.tag(),
            background: chart.background.clone(),
            size_px: chart.current_size_px,
            content: ChartContent::from(&chart.kind),
        }
    }

    pub fn size_changed(chart: &ChartDescriptor) -> Self {
        KioskEvent::SizeChanged {
            id: chart.id,
            size_px: chart.current_size_px,
        }
    }

    pub fn config_updated(physical: &PhysicalConfig, scale: &DerivedScale) -> Self {
        KioskEvent::ConfigUpdated {
            scale: *scale,
            hex_red: physical.hex_red(),
            hex_green: physical.hex_green(),
        }
    }
}

pub trait Notifier {
    fn notify(&self, event: &KioskEvent);
}

/// Writes events as JSON lines to stdout.
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, event: &KioskEvent) {
        if let KioskEvent::ChartActivated { name, .. } = event {
            info!("Chart '{name}' activated!");
        }

        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(err) => {
                error!("Failed to serialize {event:?}: {err}");
                return;
            }
        };

        let mut stdout = std::io::stdout().lock();
        if let Err(err) = writeln!(stdout, "{line}").and_then(|_| stdout.flush()) {
            error!("Failed to publish event: {err}");
        }
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) events: std::rc::Rc<std::cell::RefCell<Vec<KioskEvent>>>,
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, event: &KioskEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
