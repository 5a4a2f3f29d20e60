//! Document — the root record rendered through templates and sent to the AI
//! collaborator.
//!
//! The JSON shape is stable and shared by both consumers: personal fields at
//! the top level, then `sections`, each `{type, title, content}` where the
//! shape of `content` depends on `type` (string, array of records, or null).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A fully assembled resume, in editor order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub linkedin: String,
    pub sections: Vec<Section>,
}

impl Document {
    /// Copy of the document with personally identifying fields masked,
    /// used as the ATS scoring payload so the evaluation is content-only.
    pub fn redacted(&self) -> Document {
        let mut doc = self.clone();
        doc.name = "Candidate".to_string();
        doc.email = "[REDACTED]".to_string();
        doc.phone = "[REDACTED]".to_string();
        doc
    }
}

/// One titled resume block, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub title: String,
    pub content: SectionContent,
}

impl Section {
    pub fn new(kind: SectionKind, title: Option<String>, content: SectionContent) -> Self {
        let title = title.unwrap_or_else(|| kind.default_title());
        Section {
            kind,
            title,
            content,
        }
    }
}

/// The closed set of section kinds, plus `Other` for anything a newer (or
/// older) front end may hand us. Round-trips through its snake_case string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SectionKind {
    Summary,
    Skills,
    Custom,
    CustomTextarea,
    Experience,
    Education,
    CustomFields,
    Other(String),
}

impl SectionKind {
    pub fn as_str(&self) -> &str {
        match self {
            SectionKind::Summary => "summary",
            SectionKind::Skills => "skills",
            SectionKind::Custom => "custom",
            SectionKind::CustomTextarea => "custom_textarea",
            SectionKind::Experience => "experience",
            SectionKind::Education => "education",
            SectionKind::CustomFields => "custom_fields",
            SectionKind::Other(s) => s,
        }
    }

    /// `true` for kinds whose content is a single text block.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            SectionKind::Summary
                | SectionKind::Skills
                | SectionKind::Custom
                | SectionKind::CustomTextarea
        )
    }

    /// Display label used when the editor never assigned a title:
    /// `custom_fields` becomes `Custom Fields`.
    pub fn default_title(&self) -> String {
        titleize(self.as_str())
    }
}

impl From<String> for SectionKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "summary" => SectionKind::Summary,
            "skills" => SectionKind::Skills,
            "custom" => SectionKind::Custom,
            "custom_textarea" => SectionKind::CustomTextarea,
            "experience" => SectionKind::Experience,
            "education" => SectionKind::Education,
            "custom_fields" => SectionKind::CustomFields,
            _ => SectionKind::Other(s),
        }
    }
}

impl From<SectionKind> for String {
    fn from(kind: SectionKind) -> String {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn titleize(s: &str) -> String {
    s.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Kind-specific section payload. Serializes untagged so the wire shape stays
/// `string | array | null`, exactly what the templates iterate over.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SectionContent {
    Text(String),
    Jobs(Vec<Job>),
    Degrees(Vec<Degree>),
    /// custom_fields entries: user-defined field name → text, in the order
    /// the fields were declared.
    Items(Vec<Map<String, Value>>),
    /// Only an unrecognized kind with no text-bearing control ends up here.
    Absent,
}

impl SectionContent {
    /// Rebuilds the typed content from a raw JSON value, dispatched by kind.
    /// This is the single point where content shape is decided.
    pub fn from_kind_value(kind: &SectionKind, value: Option<Value>) -> Result<Self, String> {
        let value = match value {
            None | Some(Value::Null) => {
                return Ok(match kind {
                    k if k.is_text() => SectionContent::Text(String::new()),
                    SectionKind::Experience => SectionContent::Jobs(Vec::new()),
                    SectionKind::Education => SectionContent::Degrees(Vec::new()),
                    SectionKind::CustomFields => SectionContent::Items(Vec::new()),
                    SectionKind::Other(_) => SectionContent::Absent,
                    _ => unreachable!("is_text covers the remaining kinds"),
                });
            }
            Some(v) => v,
        };

        match kind {
            k if k.is_text() => match value {
                Value::String(s) => Ok(SectionContent::Text(s)),
                other => Err(format!(
                    "section '{kind}' expects string content, got {other}"
                )),
            },
            SectionKind::Experience => serde_json::from_value(value)
                .map(SectionContent::Jobs)
                .map_err(|e| format!("invalid experience content: {e}")),
            SectionKind::Education => serde_json::from_value(value)
                .map(SectionContent::Degrees)
                .map_err(|e| format!("invalid education content: {e}")),
            SectionKind::CustomFields => serde_json::from_value(value)
                .map(SectionContent::Items)
                .map_err(|e| format!("invalid custom_fields content: {e}")),
            SectionKind::Other(_) => match value {
                Value::String(s) => Ok(SectionContent::Text(s)),
                other => Err(format!(
                    "section '{kind}' expects string or null content, got {other}"
                )),
            },
            _ => unreachable!("is_text covers the remaining kinds"),
        }
    }
}

// Deserialization goes through a raw representation so content can be decoded
// against the section kind rather than guessed from its own shape.
#[derive(Deserialize)]
struct SectionRepr {
    #[serde(rename = "type")]
    kind: SectionKind,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<Value>,
}

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = SectionRepr::deserialize(deserializer)?;
        let content = SectionContent::from_kind_value(&repr.kind, repr.content)
            .map_err(serde::de::Error::custom)?;
        Ok(Section::new(repr.kind, repr.title, content))
    }
}

/// One job record under an experience section. Blank fields are kept as
/// empty strings; entries are never filtered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub title: String,
    pub company: String,
    pub location: String,
    pub years: String,
    pub description: String,
}

/// One degree record under an education section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Degree {
    pub degree: String,
    pub university: String,
    pub years: String,
}
