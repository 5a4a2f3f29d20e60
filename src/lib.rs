//! resumake — resume document pipeline.
//!
//! Core pieces, leaves first:
//! - [`models`]: the normalized `Document` assembled from form state.
//! - [`form`]: editable form state and the section extractor.
//! - [`render`]: template rendering + external LaTeX compilation.
//! - [`preview`]: debounced live-preview regeneration.
//! - [`ai_client`]: targeted suggestions and ATS scoring over OpenRouter.
//!
//! A front end owns a [`form::FormState`] (or a [`preview::LivePreview`]
//! around one), feeds it edits, and consumes preview events; nothing in the
//! core depends on any particular UI toolkit.

pub mod ai_client;
pub mod config;
pub mod form;
pub mod models;
pub mod preview;
pub mod render;
