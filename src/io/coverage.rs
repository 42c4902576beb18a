//! Clover-XML coverage report parsing.
//!
//! The CRAP analyzer consumes per-callable coverage fractions derived from
//! a standard Clover report: `<file name="...">` elements containing
//! `<line num="..." count="..."/>` entries. Parsing is event-driven and
//! tolerant of unknown elements.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::info;

use crate::core::errors::{MetrikError, Result};
use crate::model::SourceSpan;

/// A parsed Clover coverage report: per-file line hit counts.
#[derive(Debug, Clone, Default)]
pub struct CloverReport {
    files: HashMap<PathBuf, BTreeMap<usize, u64>>,
}

impl CloverReport {
    /// Parse a Clover report from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|err| {
            MetrikError::io(
                format!("Failed to read coverage report at {}", path.display()),
                err,
            )
        })?;
        let report = Self::from_bytes(&bytes)?;
        info!(
            files = report.files.len(),
            "loaded clover coverage report from {}",
            path.display()
        );
        Ok(report)
    }

    /// Parse a Clover report from raw XML bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut current_file: Option<PathBuf> = None;
        let mut files: HashMap<PathBuf, BTreeMap<usize, u64>> = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(tag)) | Ok(Event::Empty(tag)) => match tag.name().as_ref() {
                    b"file" => {
                        current_file = attribute_value(&tag, b"name")
                            .or_else(|| attribute_value(&tag, b"path"))
                            .map(|name| normalize_report_path(&name));
                        if let Some(file) = &current_file {
                            files.entry(file.clone()).or_default();
                        }
                    }
                    b"line" => {
                        if let Some((file, (line, count))) =
                            current_file.clone().zip(extract_line(&tag))
                        {
                            let entry = files.entry(file).or_default();
                            let hits = entry.entry(line).or_insert(0);
                            *hits = (*hits).max(count);
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(tag)) => {
                    if tag.name().as_ref() == b"file" {
                        current_file = None;
                    }
                }
                Ok(Event::Eof) => break,
                Err(err) => {
                    return Err(MetrikError::parse(
                        "clover-xml",
                        format!("Failed to parse Clover coverage XML: {err}"),
                    ));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { files })
    }

    /// Hit count for one instrumented line, `None` if uninstrumented.
    pub fn line_hits(&self, file: &Path, line: usize) -> Option<u64> {
        self.files.get(file)?.get(&line).copied()
    }

    /// Whether the report contains the given file.
    pub fn covers_file(&self, file: &Path) -> bool {
        self.files.contains_key(file)
    }

    /// Coverage fraction (0..1) for a line span within a file.
    ///
    /// A file absent from the report is fully uncovered. A span containing
    /// no instrumented lines is fully covered: there is nothing left for a
    /// test to execute.
    pub fn coverage_for_span(&self, file: &Path, span: SourceSpan) -> f64 {
        let Some(lines) = self.files.get(file) else {
            return 0.0;
        };
        let instrumented: Vec<u64> = lines
            .range(span.start_line..=span.end_line.max(span.start_line))
            .map(|(_, hits)| *hits)
            .collect();
        if instrumented.is_empty() {
            return 1.0;
        }
        let covered = instrumented.iter().filter(|hits| **hits > 0).count();
        covered as f64 / instrumented.len() as f64
    }
}

fn attribute_value(tag: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    tag.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| String::from_utf8(attr.value.into_owned()).ok())
}

fn extract_line(tag: &BytesStart<'_>) -> Option<(usize, u64)> {
    let line = attribute_value(tag, b"num").and_then(|v| v.parse::<usize>().ok())?;
    let count = attribute_value(tag, b"count")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    Some((line, count))
}

fn normalize_report_path(path: &str) -> PathBuf {
    let trimmed = path.trim().trim_matches('"');
    let without_prefix = trimmed.strip_prefix("./").unwrap_or(trimmed);
    PathBuf::from(without_prefix.replace('\\', "/"))
}
