//! XML chart file reader.
//!
//! ```xml
//! <charts>
//!   <group numkey="1">
//!     <chart type="font" caption="Letters" bgcolor="#ffffff" sizelock="true"
//!            fontfamily="Sloan" startsize="0.1">
//!       <row size="0.1">H</row>
//!       <row size="0.2">O Z</row>
//!     </chart>
//!     <chart type="svg" caption="Red/green" source="duochrome.svg" scale="true">
//!       <layer id="red"/>
//!     </chart>
//!   </group>
//! </charts>
//! ```
//!
//! Only well-formedness is checked; unknown elements and attributes are
//! ignored.

use std::{collections::HashMap, fs, path::PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::definition::{ChartDefinition, ChartSource, GroupDefinition, LoadError};

pub struct XmlChartFile {
    path: PathBuf,
}

impl XmlChartFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ChartSource for XmlChartFile {
    fn groups(&self) -> Result<Vec<GroupDefinition>, LoadError> {
        let xml = fs::read_to_string(&self.path).map_err(|source| LoadError::Unreadable {
            path: self.path.display().to_string(),
            source,
        })?;
        parse_groups(&xml)
    }
}

pub fn parse_groups(xml: &str) -> Result<Vec<GroupDefinition>, LoadError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut parser = GroupParser::default();
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                saw_root = true;
                parser.open(e)?;
            }
            Ok(Event::Empty(ref e)) => {
                saw_root = true;
                parser.open(e)?;
                parser.close(e.name().as_ref());
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                parser.close(e.name().as_ref());
            }
            Ok(Event::Text(ref t)) => {
                let text = t.unescape().map_err(|err| malformed(&reader, err))?;
                parser.text(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(malformed(&reader, err)),
        }
    }

    if !saw_root {
        return Err(LoadError::Malformed("document has no root element".into()));
    }
    if depth != 0 {
        return Err(LoadError::Malformed(format!(
            "document ends with {depth} unclosed element(s)"
        )));
    }

    Ok(parser.finish())
}

fn malformed(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> LoadError {
    LoadError::Malformed(format!("{err} (at byte {})", reader.buffer_position()))
}

#[derive(Default)]
struct GroupParser {
    groups: Vec<GroupDefinition>,
    group: Option<GroupDefinition>,
    chart: Option<ChartDefinition>,
    row: Option<(String, String)>,
}

impl GroupParser {
    fn open(&mut self, element: &BytesStart) -> Result<(), LoadError> {
        let mut attrs = attributes(element)?;
        let mut take = |key: &str| attrs.remove(key).unwrap_or_default();

        match element.name().as_ref() {
            b"group" => {
                self.finish_group();
                self.group = Some(GroupDefinition {
                    num_key: Some(take("numkey")).filter(|key| !key.is_empty()),
                    charts: Vec::new(),
                });
            }
            b"chart" if self.group.is_some() => {
                let start_size = take("startsize");
                self.chart = Some(ChartDefinition {
                    chart_type: take("type"),
                    caption: take("caption"),
                    background: take("bgcolor"),
                    size_locked: take("sizelock") == "true",
                    font_family: take("fontfamily"),
                    start_size: (!start_size.is_empty()).then_some(start_size),
                    source: take("source"),
                    scale: take("scale") == "true",
                    ..ChartDefinition::default()
                });
            }
            b"row" if self.chart.is_some() => {
                self.row = Some((take("size"), String::new()));
            }
            b"layer" => {
                if let Some(chart) = self.chart.as_mut() {
                    chart.layers.push(take("id"));
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"row" => {
                if let (Some(row), Some(chart)) = (self.row.take(), self.chart.as_mut()) {
                    chart.rows.push(row);
                }
            }
            b"chart" => {
                if let (Some(chart), Some(group)) = (self.chart.take(), self.group.as_mut()) {
                    group.charts.push(chart);
                }
            }
            b"group" => self.finish_group(),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, row_text)) = self.row.as_mut() {
            row_text.push_str(text);
        }
    }

    fn finish_group(&mut self) {
        if let Some(group) = self.group.take() {
            self.groups.push(group);
        }
    }

    fn finish(mut self) -> Vec<GroupDefinition> {
        self.finish_group();
        self.groups
    }
}

fn attributes(element: &BytesStart) -> Result<HashMap<String, String>, LoadError> {
    let mut attrs = HashMap::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|err| LoadError::Malformed(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| LoadError::Malformed(err.to_string()))?;
        attrs.insert(key, value.into_owned());
    }
    Ok(attrs)
}
