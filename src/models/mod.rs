// Normalized resume data. A Document is assembled fresh from form state for
// every render or AI call and discarded afterwards — the editable form state
// is the single source of truth, never this model.

pub mod document;

pub use document::{Degree, Document, Job, Section, SectionContent, SectionKind};
