//! Render Pipeline — turns a `Document` plus a template name into a compiled
//! PDF via minijinja and an external LaTeX compiler.
//!
//! Flow: resolve template → render source with remapped delimiters → write
//! `.tex` → run the compiler (once for preview, twice for final) → verify
//! the artifact exists → return its absolute path.
//!
//! The pipeline owns a single render slot: a preview render and a final
//! render are never interleaved, which also serializes writes to the shared
//! `_preview` output file.

use std::path::{Path, PathBuf};

use chrono::Local;
use minijinja::syntax::SyntaxConfig;
use minijinja::{path_loader, Environment, ErrorKind};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::models::Document;

/// Base name reused by every preview render; the viewer re-requests the same
/// path with a cache-busting query parameter.
pub const PREVIEW_BASENAME: &str = "_preview";

/// Entry file looked up inside each template directory.
const TEMPLATE_ENTRY: &str = "template.tex";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Overwrites the single `_preview` output for fast iteration.
    Preview,
    /// Fresh timestamped output, compiled twice so forward references (table
    /// of contents, cross-references) resolve.
    Final,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    #[error("template rendering failed: {0}")]
    Template(#[from] minijinja::Error),

    #[error("compiler exited with failure on pass {pass}")]
    Compilation { pass: u32, log: String },

    #[error("compiler reported success but no output at {path}")]
    OutputMissing { path: PathBuf, log: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The template-render + compile pipeline. Construct once, share via `Arc`.
pub struct RenderPipeline {
    env: Environment<'static>,
    output_dir: PathBuf,
    compiler: String,
    slot: Mutex<()>,
}

impl RenderPipeline {
    /// Builds the pipeline with a template loader rooted at `templates_dir`.
    ///
    /// LaTeX uses `{`, `}` and `%` heavily, so the template syntax is
    /// remapped to sequences that read as LaTeX macros and never occur in
    /// ordinary markup: blocks are `\block{…}`, comments `\#{…}`, line
    /// statements `%%`, line comments `%#`. Variables stay `{{ … }}`.
    /// Content is never auto-escaped; the output is LaTeX, not markup.
    pub fn new(
        templates_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        compiler: impl Into<String>,
    ) -> Result<Self, RenderError> {
        let syntax = SyntaxConfig::builder()
            .block_delimiters("\\block{", "}")
            .variable_delimiters("{{", "}}")
            .comment_delimiters("\\#{", "}")
            .line_statement_prefix("%%")
            .line_comment_prefix("%#")
            .build()?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        env.set_loader(path_loader(templates_dir.into()));

        Ok(RenderPipeline {
            env,
            output_dir: output_dir.into(),
            compiler: compiler.into(),
            slot: Mutex::new(()),
        })
    }

    /// Renders the document through the named template without compiling.
    /// Deterministic: the same document yields byte-identical source.
    pub fn render_source(
        &self,
        document: &Document,
        template_name: &str,
    ) -> Result<String, RenderError> {
        let path = format!("{template_name}/{TEMPLATE_ENTRY}");
        let template = match self.env.get_template(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::TemplateNotFound => {
                return Err(RenderError::TemplateNotFound(template_name.to_string()))
            }
            Err(e) => return Err(RenderError::Template(e)),
        };
        Ok(template.render(document)?)
    }

    /// Full render: template → `.tex` → compiler pass(es) → verified PDF.
    /// Blocking from the caller's perspective; returns the absolute artifact
    /// path or an explicit failure. A zero exit code alone is not trusted —
    /// the artifact must exist on disk.
    pub async fn render(
        &self,
        document: &Document,
        template_name: &str,
        mode: RenderMode,
    ) -> Result<PathBuf, RenderError> {
        let _slot = self.slot.lock().await;

        info!(template = template_name, ?mode, "starting PDF generation");
        let source = self.render_source(document, template_name)?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_dir = tokio::fs::canonicalize(&self.output_dir).await?;

        let base = match mode {
            RenderMode::Preview => PREVIEW_BASENAME.to_string(),
            RenderMode::Final => unique_final_base(&output_dir),
        };
        let tex_path = output_dir.join(format!("{base}.tex"));
        let pdf_path = output_dir.join(format!("{base}.pdf"));
        tokio::fs::write(&tex_path, &source).await?;

        // The second pass exists to resolve forward references; previews
        // trade that for speed.
        let passes = match mode {
            RenderMode::Preview => 1,
            RenderMode::Final => 2,
        };

        let mut last_log = String::new();
        for pass in 1..=passes {
            let output = Command::new(&self.compiler)
                .arg("-interaction=nonstopmode")
                .arg("-output-directory")
                .arg(&output_dir)
                .arg(&tex_path)
                .output()
                .await?;

            let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
            if !output.stderr.is_empty() {
                log.push('\n');
                log.push_str(&String::from_utf8_lossy(&output.stderr));
            }

            if !output.status.success() {
                error!(
                    template = template_name,
                    pass,
                    "LaTeX compilation failed:\n---BEGIN LATEX LOG---\n{log}\n---END LATEX LOG---"
                );
                return Err(RenderError::Compilation { pass, log });
            }
            last_log = log;
        }

        if !tokio::fs::try_exists(&pdf_path).await? {
            error!(
                path = %pdf_path.display(),
                "PDF not found after successful compilation:\n{last_log}"
            );
            return Err(RenderError::OutputMissing {
                path: pdf_path,
                log: last_log,
            });
        }

        info!(path = %pdf_path.display(), "PDF generated successfully");
        Ok(pdf_path)
    }
}

/// Timestamped base name for final outputs. Never reuses a name already on
/// disk, so every final render gets a distinct artifact even within one
/// second.
fn unique_final_base(output_dir: &Path) -> String {
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut base = format!("resume_{stamp}");
    let mut n = 1u32;
    while output_dir.join(format!("{base}.pdf")).exists()
        || output_dir.join(format!("{base}.tex")).exists()
    {
        n += 1;
        base = format!("resume_{stamp}_{n}");
    }
    base
}
