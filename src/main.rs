use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resumake::ai_client::{AiClient, JobContext, SuggestionField};
use resumake::config::Config;
use resumake::form::FormState;
use resumake::models::SectionContent;
use resumake::preview::{LivePreview, PreviewEvent};
use resumake::render::{RenderMode, RenderPipeline};

/// Headless driver for the resume pipeline: render a form file to PDF, ask
/// for AI suggestions, score against a job description, or keep a live
/// preview current while the form file changes on disk.
#[derive(Parser)]
#[command(name = "resumake", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the form file to a PDF.
    Render {
        /// Form state JSON file.
        form: PathBuf,
        #[arg(long, default_value = "moderncv")]
        template: String,
        /// Produce a permanent timestamped output instead of the preview.
        #[arg(long = "final")]
        finalize: bool,
    },
    /// Request an AI suggestion for one field.
    Suggest {
        form: PathBuf,
        #[arg(long)]
        field: FieldArg,
        /// Target job title the suggestion is tailored to.
        #[arg(long)]
        role: String,
        /// Job entry index (within the first experience section) for
        /// experience-description suggestions.
        #[arg(long, default_value_t = 0)]
        job: usize,
    },
    /// Score the resume against a job description like an ATS would.
    Ats {
        form: PathBuf,
        /// File containing the target job description text.
        #[arg(long)]
        job_description: PathBuf,
    },
    /// Watch the form file and keep the preview PDF up to date.
    Watch {
        form: PathBuf,
        #[arg(long, default_value = "moderncv")]
        template: String,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum FieldArg {
    Summary,
    Skills,
    Experience,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Render {
            form,
            template,
            finalize,
        } => render(&config, &form, &template, finalize).await,
        Command::Suggest {
            form,
            field,
            role,
            job,
        } => suggest(&config, &form, field, &role, job).await,
        Command::Ats {
            form,
            job_description,
        } => ats(&config, &form, &job_description).await,
        Command::Watch { form, template } => watch(&config, &form, &template).await,
    }
}

fn load_form(path: &Path) -> Result<FormState> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read form file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("'{}' is not a valid form state file", path.display()))
}

fn build_pipeline(config: &Config) -> Result<RenderPipeline> {
    RenderPipeline::new(&config.templates_dir, &config.output_dir, &config.compiler)
        .context("failed to build render pipeline")
}

async fn render(config: &Config, form: &Path, template: &str, finalize: bool) -> Result<()> {
    let document = load_form(form)?.extract();
    let pipeline = build_pipeline(config)?;
    let mode = if finalize {
        RenderMode::Final
    } else {
        RenderMode::Preview
    };

    let path = pipeline
        .render(&document, template, mode)
        .await
        .context("PDF generation failed")?;
    println!("{}", path.display());
    Ok(())
}

async fn suggest(
    config: &Config,
    form: &Path,
    field: FieldArg,
    role: &str,
    job: usize,
) -> Result<()> {
    let document = load_form(form)?.extract();
    let client = AiClient::new(config.require_api_key()?.to_string());

    let (field, context) = match field {
        FieldArg::Summary => (SuggestionField::Summary, None),
        FieldArg::Skills => (SuggestionField::Skills, None),
        FieldArg::Experience => {
            let jobs = document
                .sections
                .iter()
                .find_map(|s| match &s.content {
                    SectionContent::Jobs(jobs) => Some(jobs),
                    _ => None,
                })
                .context("the form has no experience section")?;
            let entry = jobs
                .get(job)
                .with_context(|| format!("experience section has no job entry {job}"))?;
            (
                SuggestionField::ExperienceDescription,
                Some(JobContext {
                    title: entry.title.clone(),
                    company: entry.company.clone(),
                }),
            )
        }
    };

    let suggestion = client
        .suggest(role, &document, field, context.as_ref())
        .await
        .context("could not get a suggestion")?;
    println!("{suggestion}");
    Ok(())
}

async fn ats(config: &Config, form: &Path, job_description: &Path) -> Result<()> {
    let document = load_form(form)?.extract();
    let jd = std::fs::read_to_string(job_description).with_context(|| {
        format!(
            "cannot read job description '{}'",
            job_description.display()
        )
    })?;
    let client = AiClient::new(config.require_api_key()?.to_string());

    let report = client
        .ats_feedback(&jd, &document)
        .await
        .context("ATS check failed")?;

    println!("ATS Score: {}/100", report.score);
    println!("\nSummary: {}", report.match_summary);
    for (heading, items) in [
        ("Strengths", &report.strengths),
        ("Weaknesses", &report.weaknesses),
        ("Missing keywords", &report.keyword_suggestions),
    ] {
        if !items.is_empty() {
            println!("\n{heading}:");
            for item in items {
                println!("  - {item}");
            }
        }
    }
    Ok(())
}

async fn watch(config: &Config, form_path: &Path, template: &str) -> Result<()> {
    let form = load_form(form_path)?;
    let pipeline = Arc::new(build_pipeline(config)?);
    let (preview, mut events) =
        LivePreview::new(pipeline, form, template, config.debounce);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                PreviewEvent::Updated { path, cache_buster } => {
                    println!("preview updated: {}?cache_buster={cache_buster}", path.display());
                }
                PreviewEvent::Failed { error } => {
                    warn!("preview not updated: {error}");
                }
            }
        }
    });

    // Kick off an initial render, then follow file modifications.
    preview.notify_edit();
    info!(file = %form_path.display(), "watching for changes; Ctrl-C to stop");

    let mut last_modified = std::fs::metadata(form_path).and_then(|m| m.modified()).ok();
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(250));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let modified = std::fs::metadata(form_path).and_then(|m| m.modified()).ok();
                if modified != last_modified {
                    last_modified = modified;
                    match load_form(form_path) {
                        Ok(form) => preview.replace_form(form),
                        // Mid-save or malformed edit: keep the old state.
                        Err(e) => warn!("ignoring unreadable form file: {e:#}"),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("stopping watch");
                return Ok(());
            }
        }
    }
}
