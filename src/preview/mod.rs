//! Debounced live preview — coalesces bursts of edit notifications into at
//! most one preview regeneration per quiet period.
//!
//! Flow: edit → `notify_edit()` restarts the countdown → on quiescence the
//! regeneration callback snapshots the current form state, extracts a fresh
//! `Document`, and runs a preview render off the caller's thread; the
//! outcome is marshaled back to the front end as a `PreviewEvent`.

pub mod debounce;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::form::FormState;
use crate::render::{RenderMode, RenderPipeline};

pub use debounce::Debouncer;

/// Quiet period the reference editor waits for before regenerating.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(1500);

/// Outcome of one debounced regeneration, delivered to the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewEvent {
    /// A new preview PDF is ready. `cache_buster` changes per render so
    /// viewers that cache by URL re-fetch the overwritten file.
    Updated { path: PathBuf, cache_buster: u64 },
    /// The render failed; the prior preview remains the one to show.
    Failed { error: String },
}

/// Binds form state, template selection, and the render pipeline behind a
/// debouncer. Every mutation goes through [`LivePreview::edit`] so the
/// countdown restarts on each change; the render always reflects the state
/// at the moment the timer actually fires, not when it was started.
pub struct LivePreview {
    form: Arc<Mutex<FormState>>,
    template: Arc<Mutex<String>>,
    debouncer: Debouncer,
}

impl LivePreview {
    /// Spawns the regeneration task. Returns the controller and the event
    /// stream the front end should drain.
    pub fn new(
        pipeline: Arc<RenderPipeline>,
        form: FormState,
        template: impl Into<String>,
        interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PreviewEvent>) {
        let form = Arc::new(Mutex::new(form));
        let template = Arc::new(Mutex::new(template.into()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let debouncer = {
            let form = Arc::clone(&form);
            let template = Arc::clone(&template);
            Debouncer::new(interval, move || {
                let pipeline = Arc::clone(&pipeline);
                let form = Arc::clone(&form);
                let template = Arc::clone(&template);
                let events = events_tx.clone();
                async move {
                    regenerate(&pipeline, &form, &template, &events).await;
                }
            })
        };

        (
            LivePreview {
                form,
                template,
                debouncer,
            },
            events_rx,
        )
    }

    /// Applies one edit to the form and restarts the preview countdown.
    pub fn edit(&self, apply: impl FnOnce(&mut FormState)) {
        {
            let mut form = self.form.lock().unwrap();
            apply(&mut form);
        }
        self.debouncer.notify_edit();
    }

    /// Switches the active template; counts as an edit.
    pub fn set_template(&self, name: impl Into<String>) {
        *self.template.lock().unwrap() = name.into();
        self.debouncer.notify_edit();
    }

    /// Restarts the countdown without changing state (structural changes
    /// already applied elsewhere, e.g. a watched file rewritten on disk).
    pub fn notify_edit(&self) {
        self.debouncer.notify_edit();
    }

    /// Replaces the whole form (watch mode reloads from disk) and restarts
    /// the countdown.
    pub fn replace_form(&self, form: FormState) {
        *self.form.lock().unwrap() = form;
        self.debouncer.notify_edit();
    }

    /// Snapshot of the document the next regeneration would render.
    pub fn document(&self) -> crate::models::Document {
        self.form.lock().unwrap().extract()
    }
}

async fn regenerate(
    pipeline: &RenderPipeline,
    form: &Mutex<FormState>,
    template: &Mutex<String>,
    events: &mpsc::UnboundedSender<PreviewEvent>,
) {
    info!("input quiesced; updating live preview");
    // Snapshot at expiry time, not at schedule time.
    let document = form.lock().unwrap().extract();
    let template = template.lock().unwrap().clone();

    let event = match pipeline
        .render(&document, &template, RenderMode::Preview)
        .await
    {
        Ok(path) => PreviewEvent::Updated {
            path,
            cache_buster: unix_seconds(),
        },
        Err(e) => {
            error!("live preview update failed: {e}");
            PreviewEvent::Failed {
                error: e.to_string(),
            }
        }
    };
    // The receiver may be gone during shutdown; nothing to do then.
    let _ = events.send(event);
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionKind;
    use std::fs;
    use tempfile::TempDir;

    const MINIMAL_TEMPLATE: &str = "\\name{ {{ name }} }\n";

    fn pipeline(compiler: &str) -> (Arc<RenderPipeline>, TempDir, TempDir) {
        let templates = TempDir::new().unwrap();
        fs::create_dir_all(templates.path().join("plain")).unwrap();
        fs::write(templates.path().join("plain/template.tex"), MINIMAL_TEMPLATE).unwrap();
        let output = TempDir::new().unwrap();
        let pipeline =
            Arc::new(RenderPipeline::new(templates.path(), output.path(), compiler).unwrap());
        (pipeline, templates, output)
    }

    #[cfg(unix)]
    fn fake_compiler(dir: &std::path::Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fakelatex");
        fs::write(
            &path,
            "#!/bin/sh\nout=$3\ntex=$4\nbase=$(basename \"$tex\" .tex)\necho ok > \"$out/$base.pdf\"\n",
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_burst_of_edits_yields_one_updated_event() {
        let bin = TempDir::new().unwrap();
        let compiler = fake_compiler(bin.path());
        let (pipeline, _t, _o) = pipeline(compiler.to_str().unwrap());

        let (preview, mut events) = LivePreview::new(
            pipeline,
            FormState::standard(),
            "plain",
            Duration::from_millis(200),
        );

        for ch in ["J", "Ja", "Jan", "Jane"] {
            preview.edit(|f| f.name = ch.to_string());
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("preview event within timeout")
            .expect("channel open");
        match event {
            PreviewEvent::Updated { path, .. } => {
                let source = fs::read_to_string(path.with_extension("tex")).unwrap();
                assert!(
                    source.contains("Jane"),
                    "render reflects state at expiry, got: {source}"
                );
            }
            PreviewEvent::Failed { error } => panic!("preview failed: {error}"),
        }
        assert!(
            events.try_recv().is_err(),
            "a burst coalesces into one render"
        );
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_render_surfaces_failure_event() {
        let bin = TempDir::new().unwrap();
        let compiler = fake_compiler(bin.path());
        let (pipeline, _t, _o) = pipeline(compiler.to_str().unwrap());

        let (preview, mut events) = LivePreview::new(
            pipeline,
            FormState::standard(),
            "no_such_template",
            Duration::from_millis(20),
        );
        preview.edit(|f| f.name = "Jane".to_string());

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("preview event within timeout")
            .expect("channel open");
        match event {
            PreviewEvent::Failed { error } => {
                assert!(error.contains("no_such_template"), "got: {error}")
            }
            PreviewEvent::Updated { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn test_document_snapshot_tracks_edits() {
        // No runtime needed for the snapshot accessor itself.
        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();
        let templates = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let pipeline = Arc::new(
            RenderPipeline::new(templates.path(), output.path(), "pdflatex").unwrap(),
        );
        let (preview, _events) = LivePreview::new(
            pipeline,
            FormState::standard(),
            "plain",
            DEBOUNCE_INTERVAL,
        );

        preview.edit(|f| {
            f.name = " Jane ".to_string();
            f.add_section(SectionKind::Custom, Some("Projects".to_string()));
        });

        let doc = preview.document();
        assert_eq!(doc.name, "Jane");
        assert_eq!(doc.sections.last().unwrap().title, "Projects");
    }
}
