//! Form state — the editable, ordered source of truth for everything the
//! user has entered, plus the extractor that turns it into a `Document`.
//!
//! Front ends mutate `FormState` through its methods on every change
//! notification; extraction is then a pure read over already-structured
//! state. Extraction never fails: a malformed or half-built editor degrades
//! to "skipped" or "absent", never to an error that aborts the gather.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::{Degree, Document, Job, Section, SectionContent, SectionKind};

/// One text-bearing control inside an unrecognized section. Extraction
/// prefers a multi-line `Area` over a single-line `Line`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextControl {
    Line(String),
    Area(String),
}

/// A named text field inside an entry group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

impl FormField {
    pub fn new(name: impl Into<String>) -> Self {
        FormField {
            name: name.into(),
            value: String::new(),
        }
    }
}

/// One repeatable entry (a job, a degree, a custom-fields row).
/// `fields` is `None` when the group has no declared field set; such groups
/// are skipped at extraction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryGroup {
    pub fields: Option<Vec<FormField>>,
}

impl EntryGroup {
    pub fn with_fields(names: &[&str]) -> Self {
        EntryGroup {
            fields: Some(names.iter().map(|n| FormField::new(*n)).collect()),
        }
    }

    fn field(&self, name: &str) -> String {
        self.fields
            .as_ref()
            .and_then(|fs| fs.iter().find(|f| f.name == name))
            .map(|f| f.value.trim().to_string())
            .unwrap_or_default()
    }
}

const JOB_FIELDS: &[&str] = &["title", "company", "location", "years", "description"];
const DEGREE_FIELDS: &[&str] = &["degree", "university", "years"];

/// Kind-specific backing state of a section editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionState {
    /// Single text block (summary, skills, custom, custom_textarea).
    Text(String),
    /// Repeatable entry groups (experience, education, custom_fields).
    Groups(Vec<EntryGroup>),
    /// Controls discovered under a section of unknown kind.
    Opaque(Vec<TextControl>),
}

/// One section editor in on-screen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionEditor {
    pub kind: SectionKind,
    #[serde(default)]
    pub title: Option<String>,
    /// `None` models an editor slot with no backing state; it is skipped
    /// silently at extraction.
    #[serde(default)]
    pub state: Option<SectionState>,
}

/// The full editable form: personal details plus the ordered section list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormState {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub sections: Vec<SectionEditor>,
}

impl FormState {
    /// Empty form with the default section set the editor starts with.
    pub fn standard() -> Self {
        let mut form = FormState::default();
        form.add_section(SectionKind::Summary, None);
        form.add_section(SectionKind::Experience, None);
        form.add_section(SectionKind::Education, None);
        form.add_section(SectionKind::Skills, None);
        form
    }

    /// Appends a section seeded with the empty state its kind expects.
    /// Experience and education start with one blank entry, as the editor
    /// creates them.
    pub fn add_section(&mut self, kind: SectionKind, title: Option<String>) {
        let state = match &kind {
            k if k.is_text() => SectionState::Text(String::new()),
            SectionKind::Experience => {
                SectionState::Groups(vec![EntryGroup::with_fields(JOB_FIELDS)])
            }
            SectionKind::Education => {
                SectionState::Groups(vec![EntryGroup::with_fields(DEGREE_FIELDS)])
            }
            SectionKind::CustomFields => SectionState::Groups(Vec::new()),
            SectionKind::Other(_) => SectionState::Opaque(Vec::new()),
            _ => unreachable!("is_text covers the remaining kinds"),
        };
        self.sections.push(SectionEditor {
            kind,
            title,
            state: Some(state),
        });
    }

    /// Appends a custom-fields section whose entries carry the user-declared
    /// field names, seeded with one blank entry.
    pub fn add_custom_fields_section(&mut self, title: impl Into<String>, field_names: &[&str]) {
        self.sections.push(SectionEditor {
            kind: SectionKind::CustomFields,
            title: Some(title.into()),
            state: Some(SectionState::Groups(vec![EntryGroup::with_fields(
                field_names,
            )])),
        });
    }

    /// Adds one more entry group to a grouped section, copying the field
    /// names of the last entry (custom sections keep their declared fields).
    /// Silently ignored for out-of-range or non-grouped sections.
    pub fn add_entry(&mut self, section: usize) {
        let Some(editor) = self.sections.get_mut(section) else {
            return;
        };
        let kind = editor.kind.clone();
        if let Some(SectionState::Groups(groups)) = editor.state.as_mut() {
            let group = match &kind {
                SectionKind::Experience => EntryGroup::with_fields(JOB_FIELDS),
                SectionKind::Education => EntryGroup::with_fields(DEGREE_FIELDS),
                _ => groups
                    .last()
                    .map(|g| EntryGroup {
                        fields: g.fields.as_ref().map(|fs| {
                            fs.iter().map(|f| FormField::new(f.name.clone())).collect()
                        }),
                    })
                    .unwrap_or_default(),
            };
            groups.push(group);
        }
    }

    /// Removes a section. Out-of-range indices are silently ignored.
    pub fn remove_section(&mut self, section: usize) {
        if section < self.sections.len() {
            self.sections.remove(section);
        }
    }

    /// Moves a section up (`delta = -1`) or down (`delta = 1`), matching the
    /// editor's reorder buttons. A move past either end is a no-op.
    pub fn move_section(&mut self, section: usize, delta: isize) {
        let Some(target) = section.checked_add_signed(delta) else {
            return;
        };
        if section < self.sections.len() && target < self.sections.len() {
            self.sections.swap(section, target);
        }
    }

    /// Replaces the text buffer of a text section. Ignored for other shapes.
    pub fn set_text(&mut self, section: usize, text: impl Into<String>) {
        if let Some(SectionEditor {
            state: Some(SectionState::Text(buffer)),
            ..
        }) = self.sections.get_mut(section)
        {
            *buffer = text.into();
        }
    }

    /// Sets one named field of one entry group. Unknown section, entry, or
    /// field names are silently ignored.
    pub fn set_field(&mut self, section: usize, entry: usize, name: &str, value: impl Into<String>) {
        if let Some(SectionEditor {
            state: Some(SectionState::Groups(groups)),
            ..
        }) = self.sections.get_mut(section)
        {
            if let Some(fields) = groups.get_mut(entry).and_then(|g| g.fields.as_mut()) {
                if let Some(field) = fields.iter_mut().find(|f| f.name == name) {
                    field.value = value.into();
                }
            }
        }
    }

    /// Walks all section editors in their current order and produces the
    /// normalized `Document`. Read-only; a fresh Document per call.
    pub fn extract(&self) -> Document {
        let sections = self
            .sections
            .iter()
            .filter_map(extract_section)
            .collect::<Vec<_>>();
        debug!(sections = sections.len(), "gathered document from form state");

        Document {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            linkedin: self.linkedin.trim().to_string(),
            sections,
        }
    }
}

/// Extracts one section, dispatching on its kind. Returns `None` only for an
/// editor with no backing state.
fn extract_section(editor: &SectionEditor) -> Option<Section> {
    let state = editor.state.as_ref()?;

    let content = match (&editor.kind, state) {
        (k, SectionState::Text(buffer)) if k.is_text() => {
            SectionContent::Text(buffer.trim().to_string())
        }
        (SectionKind::Other(_), SectionState::Text(buffer)) => {
            SectionContent::Text(buffer.trim().to_string())
        }
        (SectionKind::Experience, SectionState::Groups(groups)) => SectionContent::Jobs(
            groups
                .iter()
                .filter(|g| g.fields.is_some())
                .map(|g| Job {
                    title: g.field("title"),
                    company: g.field("company"),
                    location: g.field("location"),
                    years: g.field("years"),
                    description: g.field("description"),
                })
                .collect(),
        ),
        (SectionKind::Education, SectionState::Groups(groups)) => SectionContent::Degrees(
            groups
                .iter()
                .filter(|g| g.fields.is_some())
                .map(|g| Degree {
                    degree: g.field("degree"),
                    university: g.field("university"),
                    years: g.field("years"),
                })
                .collect(),
        ),
        (SectionKind::CustomFields, SectionState::Groups(groups)) => SectionContent::Items(
            groups
                .iter()
                .filter_map(|g| g.fields.as_ref())
                .map(|fields| {
                    fields
                        .iter()
                        .map(|f| (f.name.clone(), Value::String(f.value.trim().to_string())))
                        .collect::<Map<String, Value>>()
                })
                .collect(),
        ),
        // Unknown kind: use any text-bearing control, preferring multi-line.
        (kind, SectionState::Opaque(controls)) => {
            let area = controls.iter().find_map(|c| match c {
                TextControl::Area(text) => Some(text),
                TextControl::Line(_) => None,
            });
            let line = controls.iter().find_map(|c| match c {
                TextControl::Line(text) => Some(text),
                TextControl::Area(_) => None,
            });
            match area.or(line) {
                Some(text) => {
                    warn!(kind = %kind, "treating unknown section as plain text");
                    SectionContent::Text(text.trim().to_string())
                }
                None => {
                    warn!(kind = %kind, "unknown section has no text control");
                    SectionContent::Absent
                }
            }
        }
        // Shape/kind mismatch: degrade rather than abort the gather.
        (kind, _) => {
            warn!(kind = %kind, "section state does not match its kind");
            SectionContent::Absent
        }
    };

    Some(Section::new(
        editor.kind.clone(),
        editor.title.clone(),
        content,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with(kind: SectionKind) -> FormState {
        let mut form = FormState::default();
        form.add_section(kind, None);
        form
    }

    #[test]
    fn test_trimming_strips_surrounding_whitespace_only() {
        let mut form = form_with(SectionKind::Summary);
        form.name = "  Jane  Doe \n".to_string();
        form.set_text(0, "  Systems engineer\nwith Rust focus  ");

        let doc = form.extract();
        assert_eq!(doc.name, "Jane  Doe");
        assert_eq!(
            doc.sections[0].content,
            SectionContent::Text("Systems engineer\nwith Rust focus".to_string())
        );
    }

    #[test]
    fn test_sections_extract_in_editor_order() {
        let form = FormState::standard();
        let kinds: Vec<_> = form.extract().sections.iter().map(|s| s.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Summary,
                SectionKind::Experience,
                SectionKind::Education,
                SectionKind::Skills,
            ]
        );
    }

    #[test]
    fn test_move_section_swaps_exactly_once_and_clamps_at_ends() {
        let mut form = FormState::standard();
        form.move_section(3, 1); // already last: no-op
        form.move_section(0, -1); // already first: no-op
        form.move_section(1, 1); // experience down

        let kinds: Vec<_> = form.extract().sections.iter().map(|s| s.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Summary,
                SectionKind::Education,
                SectionKind::Experience,
                SectionKind::Skills,
            ]
        );
    }

    #[test]
    fn test_blank_entries_are_emitted_not_filtered() {
        let mut form = form_with(SectionKind::Experience);
        form.add_entry(0);

        let doc = form.extract();
        match &doc.sections[0].content {
            SectionContent::Jobs(jobs) => {
                assert_eq!(jobs.len(), 2);
                assert_eq!(jobs[0], Job::default());
            }
            other => panic!("expected jobs, got {other:?}"),
        }
    }

    #[test]
    fn test_group_without_field_set_is_skipped() {
        let mut form = form_with(SectionKind::Education);
        if let Some(SectionState::Groups(groups)) = form.sections[0].state.as_mut() {
            groups.push(EntryGroup { fields: None });
        }
        form.set_field(0, 0, "degree", "BSc");

        let doc = form.extract();
        match &doc.sections[0].content {
            SectionContent::Degrees(degrees) => {
                assert_eq!(degrees.len(), 1);
                assert_eq!(degrees[0].degree, "BSc");
            }
            other => panic!("expected degrees, got {other:?}"),
        }
    }

    #[test]
    fn test_editor_without_state_is_skipped_silently() {
        let mut form = FormState::standard();
        form.sections[1].state = None;

        let doc = form.extract();
        assert_eq!(doc.sections.len(), 3);
        assert!(doc
            .sections
            .iter()
            .all(|s| s.kind != SectionKind::Experience));
    }

    #[test]
    fn test_opaque_section_prefers_multiline_control() {
        let mut form = FormState::default();
        form.sections.push(SectionEditor {
            kind: SectionKind::Other("publications".to_string()),
            title: None,
            state: Some(SectionState::Opaque(vec![
                TextControl::Line(" short ".to_string()),
                TextControl::Area(" long text ".to_string()),
            ])),
        });

        let doc = form.extract();
        assert_eq!(
            doc.sections[0].content,
            SectionContent::Text("long text".to_string())
        );
        assert_eq!(doc.sections[0].title, "Publications");
    }

    #[test]
    fn test_opaque_section_without_text_control_is_absent() {
        let mut form = FormState::default();
        form.add_section(SectionKind::Other("mystery".to_string()), None);

        let doc = form.extract();
        assert_eq!(doc.sections[0].content, SectionContent::Absent);
    }

    #[test]
    fn test_custom_fields_preserve_declared_field_order() {
        let mut form = FormState::default();
        form.add_custom_fields_section("Awards", &["award", "year", "issuer"]);
        form.set_field(0, 0, "award", " Best Paper ");
        form.set_field(0, 0, "year", "2024");
        form.add_entry(0);
        form.set_field(0, 1, "issuer", "ACM");

        let doc = form.extract();
        match &doc.sections[0].content {
            SectionContent::Items(items) => {
                assert_eq!(items.len(), 2);
                let keys: Vec<_> = items[0].keys().cloned().collect();
                assert_eq!(keys, vec!["award", "year", "issuer"]);
                assert_eq!(items[0]["award"], "Best Paper");
                assert_eq!(items[1]["issuer"], "ACM");
                assert_eq!(items[1]["award"], "");
            }
            other => panic!("expected items, got {other:?}"),
        }
    }

    #[test]
    fn test_three_section_gather_scenario() {
        let mut form = FormState::default();
        form.add_section(SectionKind::Summary, None);
        form.add_section(SectionKind::Experience, None);
        form.add_section(SectionKind::Education, None);
        form.set_text(0, "Engineer");
        // Empty out the seeded blank job entry to model "no jobs yet".
        if let Some(SectionState::Groups(groups)) = form.sections[1].state.as_mut() {
            groups.clear();
        }
        form.set_field(2, 0, "degree", "BSc");
        form.set_field(2, 0, "university", "X");
        form.set_field(2, 0, "years", "2020");

        let doc = form.extract();
        assert_eq!(doc.sections.len(), 3);
        assert_eq!(
            doc.sections[0].content,
            SectionContent::Text("Engineer".to_string())
        );
        assert_eq!(doc.sections[1].content, SectionContent::Jobs(vec![]));
        assert_eq!(
            doc.sections[2].content,
            SectionContent::Degrees(vec![Degree {
                degree: "BSc".to_string(),
                university: "X".to_string(),
                years: "2020".to_string(),
            }])
        );
    }

    #[test]
    fn test_out_of_range_edits_are_silent_noops() {
        let mut form = FormState::standard();
        let before = form.clone();
        form.set_text(99, "x");
        form.set_field(0, 7, "title", "x"); // summary has no groups
        form.remove_section(42);
        form.move_section(42, -1);
        assert_eq!(form, before);
    }

    #[test]
    fn test_form_state_round_trips_through_json() {
        let mut form = FormState::standard();
        form.name = "Jane".to_string();
        form.set_text(0, "Engineer");
        form.set_field(1, 0, "company", "Acme");

        let json = serde_json::to_string(&form).unwrap();
        let back: FormState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, form);
        assert_eq!(back.extract(), form.extract());
    }
}
