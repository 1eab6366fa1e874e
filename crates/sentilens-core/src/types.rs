//! Core types for Sentilens

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sentiment class, serialized as its integer id (0, 1, 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Label {
    Negative = 0,
    Neutral = 1,
    Positive = 2,
}

impl Label {
    /// All labels in class-id order
    pub const ALL: [Label; 3] = [Label::Negative, Label::Neutral, Label::Positive];

    /// Number of sentiment classes
    pub const COUNT: usize = 3;

    /// Class id of this label
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Position of this label in per-class arrays
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label for a class id, failing with `InvalidArgument` outside {0,1,2}
    pub fn from_id(id: i64) -> Result<Self> {
        match id {
            0 => Ok(Self::Negative),
            1 => Ok(Self::Neutral),
            2 => Ok(Self::Positive),
            other => Err(Error::invalid_argument(format!(
                "label must be 0, 1, or 2 (got {other})"
            ))),
        }
    }

    /// Label for a raw model class index; anything unrecognized maps to neutral
    pub fn from_model_index(idx: usize) -> Self {
        match idx {
            0 => Self::Negative,
            2 => Self::Positive,
            _ => Self::Neutral,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label.id()
    }
}

impl TryFrom<u8> for Label {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_id(i64::from(value))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Output of the classification engine for one text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Argmax class
    pub label: Label,

    /// Probability of the argmax class (0.0-1.0)
    pub confidence: f32,
}

impl Prediction {
    /// Create a prediction, clamping confidence into [0, 1]
    pub fn new(label: Label, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { label, confidence }
    }
}

/// One submitted text as materialized by the ingestion layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextInput {
    /// Text content; the key is required, a null cell is ingested as the
    /// empty string
    #[serde(deserialize_with = "nullable_cell")]
    pub text: Option<String>,

    /// Optional categorical origin tag
    #[serde(default, alias = "src", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl TextInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Text content, treating a missing value as empty
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Accept `null` for a present key. Unlike a plain `Option`, the key itself
/// stays mandatory.
fn nullable_cell<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

/// One row of a result table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable 0-based position within the table
    pub index: usize,

    /// Original submitted text
    pub text: String,

    /// Optional origin tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Predicted or corrected label
    pub label: Option<Label>,

    /// Top-class probability (0.0-1.0)
    pub confidence: f32,

    /// Set only by an explicit correction
    #[serde(default)]
    pub manually_corrected: bool,
}

/// Per-label counts over a result table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub total: usize,
    pub negative: usize,
    pub neutral: usize,
    pub positive: usize,
}

/// Export row with fixed column order: text, source, label, confidence, manually_corrected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub label: Option<Label>,
    pub confidence: f32,
    pub manually_corrected: bool,
}

/// Ordered, fixed-shape table of classified records.
///
/// The shape is frozen once built: records can be read and corrected in place
/// but never inserted or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    records: Vec<Record>,
}

impl ResultTable {
    /// Start building a table of the expected size
    pub fn builder(capacity: usize) -> ResultTableBuilder {
        ResultTableBuilder {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Current labels in table order (unset labels are skipped)
    pub fn labels(&self) -> Vec<Label> {
        self.records.iter().filter_map(|r| r.label).collect()
    }

    /// Override the label at `index` and flag it as manually corrected
    pub fn correct(&mut self, index: usize, label: Label) -> Result<&Record> {
        let len = self.records.len();
        let record = self.records.get_mut(index).ok_or_else(|| {
            Error::not_found(format!("record {index} out of range (table has {len} records)"))
        })?;
        record.label = Some(label);
        record.manually_corrected = true;
        Ok(record)
    }

    /// Count records per label
    pub fn label_counts(&self) -> LabelCounts {
        let mut counts = LabelCounts {
            total: self.records.len(),
            ..Default::default()
        };
        for record in &self.records {
            match record.label {
                Some(Label::Negative) => counts.negative += 1,
                Some(Label::Neutral) => counts.neutral += 1,
                Some(Label::Positive) => counts.positive += 1,
                None => {}
            }
        }
        counts
    }

    /// Whether any record carries a source tag
    pub fn has_sources(&self) -> bool {
        self.records.iter().any(|r| r.source.is_some())
    }

    /// Rows in export column order
    pub fn export_rows(&self) -> Vec<ExportRow> {
        self.records
            .iter()
            .map(|r| ExportRow {
                text: r.text.clone(),
                source: r.source.clone(),
                label: r.label,
                confidence: r.confidence,
                manually_corrected: r.manually_corrected,
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Append-only builder used while a job is classifying
#[derive(Debug, Default)]
pub struct ResultTableBuilder {
    records: Vec<Record>,
}

impl ResultTableBuilder {
    /// Append the classified form of `input`; the index is its position
    pub fn push(&mut self, input: TextInput, prediction: Prediction) {
        let index = self.records.len();
        let TextInput { text, source } = input;
        self.records.push(Record {
            index,
            text: text.unwrap_or_default(),
            source,
            label: Some(prediction.label),
            confidence: prediction.confidence,
            manually_corrected: false,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Freeze the table shape
    pub fn finish(self) -> ResultTable {
        ResultTable {
            records: self.records,
        }
    }
}

/// Opaque unique job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| Error::not_found(format!("job '{s}' not found")))
    }
}
