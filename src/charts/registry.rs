//! The fixed, ordered set of charts shown by the kiosk.

use log::{info, warn};
use serde::Serialize;

use crate::scale::{pixel_size_for_row, row_size::size_vocabulary, DerivedScale, RowSize};

use super::definition::{ChartDefinition, ChartSource, GroupDefinition, LoadError};

/// Position of a chart in load order.
pub type ChartId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct FontRow {
    pub size: RowSize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    Font {
        font_family: String,
        rows: Vec<FontRow>,
        /// Sorted row-size vocabulary of `rows`.
        row_sizes: Vec<RowSize>,
        start_size: RowSize,
    },
    Svg {
        source: String,
        layers: Vec<String>,
        scale: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKindTag {
    Font,
    Svg,
}

impl ChartKind {
    pub fn tag(&self) -> ChartKindTag {
        match self {
            ChartKind::Font { .. } => ChartKindTag::Font,
            ChartKind::Svg { .. } => ChartKindTag::Svg,
        }
    }

    pub fn is_font(&self) -> bool {
        matches!(self, ChartKind::Font { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartDescriptor {
    pub id: ChartId,
    pub display_name: String,
    pub num_key: Option<u8>,
    pub size_locked: bool,
    pub background: String,
    pub current_size_px: f64,
    pub kind: ChartKind,
}

impl ChartDescriptor {
    /// Pixel size the chart opens with under `scale`. Svg charts carry no
    /// size of their own and report the 5 arc-minute unit.
    pub fn start_size_px(&self, scale: &DerivedScale) -> f64 {
        match &self.kind {
            ChartKind::Font { start_size, .. } => pixel_size_for_row(start_size, scale),
            ChartKind::Svg { .. } => scale.five_arc_minute_px * scale.distance_factor,
        }
    }

    pub fn reset_size(&mut self, scale: &DerivedScale) {
        self.current_size_px = self.start_size_px(scale);
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChartRegistry {
    charts: Vec<ChartDescriptor>,
}

impl ChartRegistry {
    /// Loads every group of `source` in order. Charts of unknown type are
    /// skipped; only an unreadable or malformed source fails.
    pub fn load(source: &dyn ChartSource, scale: &DerivedScale) -> Result<Self, LoadError> {
        let groups = source.groups()?;
        Ok(Self::from_groups(groups, scale))
    }

    pub fn from_groups(groups: Vec<GroupDefinition>, scale: &DerivedScale) -> Self {
        let mut charts = Vec::new();

        for group in groups {
            let num_key = parse_num_key(group.num_key.as_deref());
            info!("Parsing group: key {num_key:?}");

            for definition in group.charts {
                let Some(kind) = resolve_kind(&definition) else {
                    warn!(
                        "Chart type '{}' of '{}' was not recognized, skipping",
                        definition.chart_type, definition.caption
                    );
                    continue;
                };

                let mut chart = ChartDescriptor {
                    id: charts.len(),
                    display_name: definition.caption,
                    num_key,
                    // Size lock is only meaningful for font charts.
                    size_locked: definition.size_locked && kind.is_font(),
                    background: definition.background,
                    current_size_px: 0.0,
                    kind,
                };
                chart.reset_size(scale);
                info!(
                    "  Chart '{}' ({:?}), size lock: {}",
                    chart.display_name,
                    chart.kind.tag(),
                    chart.size_locked
                );
                charts.push(chart);
            }
        }

        Self { charts }
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn get(&self, id: ChartId) -> Option<&ChartDescriptor> {
        self.charts.get(id)
    }

    pub fn get_mut(&mut self, id: ChartId) -> Option<&mut ChartDescriptor> {
        self.charts.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChartDescriptor> {
        self.charts.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChartDescriptor> {
        self.charts.iter_mut()
    }

    /// First chart in load order, shown at startup.
    pub fn default_chart(&self) -> Option<ChartId> {
        self.charts.first().map(|chart| chart.id)
    }

    /// Ids of the charts bound to `digit`, in load order.
    pub fn pool_for_key(&self, digit: u8) -> Vec<ChartId> {
        self.charts
            .iter()
            .filter(|chart| chart.num_key == Some(digit))
            .map(|chart| chart.id)
            .collect()
    }

    pub fn reset_sizes(&mut self, scale: &DerivedScale) {
        for chart in &mut self.charts {
            chart.reset_size(scale);
        }
    }
}

fn parse_num_key(raw: Option<&str>) -> Option<u8> {
    let raw = raw?.trim();
    match raw.parse::<i64>() {
        Ok(key @ 0..=9) => Some(key as u8),
        Ok(key) => {
            warn!("Group key {key} is outside 0-9, group is unkeyed");
            None
        }
        Err(_) => None,
    }
}

fn resolve_kind(definition: &ChartDefinition) -> Option<ChartKind> {
    match definition.chart_type.as_str() {
        "font" => {
            let rows: Vec<FontRow> = definition
                .rows
                .iter()
                .map(|(size, text)| FontRow {
                    size: RowSize::parse(size),
                    text: text.clone(),
                })
                .collect();
            let row_sizes = size_vocabulary(definition.rows.iter().map(|(size, _)| size.as_str()));
            let start_size = definition
                .start_size
                .as_deref()
                .map(RowSize::parse)
                .or_else(|| row_sizes.first().cloned())
                .unwrap_or_else(|| RowSize::parse(""));

            Some(ChartKind::Font {
                font_family: definition.font_family.clone(),
                rows,
                row_sizes,
                start_size,
            })
        }
        "svg" => {
            let mut layers = Vec::new();
            for layer in &definition.layers {
                if layer.trim().is_empty() {
                    warn!("Couldn't add svg layer without id to '{}'", definition.caption);
                } else {
                    layers.push(layer.clone());
                }
            }
            Some(ChartKind::Svg {
                source: definition.source.clone(),
                layers,
                scale: definition.scale,
            })
        }
        _ => None,
    }
}
