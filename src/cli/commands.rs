use std::path::Path;

use tracing::info;

use crate::browser::dom::Document;
use crate::matcher::ai_model::{ModelSettings, test_connection};
use crate::resume::flatten::flatten_resume;
use crate::resume::keywords::KeywordTables;
use crate::resume::resume_model::ResumeData;
use crate::screen::scanner::{ScanOptions, scan_page};
use crate::session::server::serve;
use crate::session::session::{Session, SessionConfig};
use crate::storage::store::{
    JsonFileStore, RESUME_DATA_KEY, RetryPolicy, StoredProfile, load_profile, save_with_retry,
};
use crate::trace::logger::TraceLogger;

// ============================================================================
// scan subcommand
// ============================================================================

pub fn cmd_scan(page: &str, options: &ScanOptions) -> Result<(), Box<dyn std::error::Error>> {
    let doc = Document::load(Path::new(page))?;
    let fields = scan_page(&doc, options);
    info!(count = fields.len(), page, "page scanned");
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

// ============================================================================
// flatten subcommand
// ============================================================================

pub fn cmd_flatten(resume: &str, tables: &KeywordTables) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_resume(resume)?;
    let fields = flatten_resume(&data, tables);
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

// ============================================================================
// fill subcommand
// ============================================================================

/// Smart-fill a page snapshot. The résumé comes from `resume`, else from
/// the store; stored model settings sit beneath the configured ones.
/// Returns whether the fill succeeded.
pub fn cmd_fill(
    page: &str,
    resume: Option<&str>,
    store: Option<&str>,
    output: Option<&str>,
    mut config: SessionConfig,
    trace_path: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let doc = Document::load(Path::new(page))?;
    let profile = read_profile(store)?;
    config.classifier = with_stored_settings(&config.classifier, &profile);

    let data = match (resume, profile.resume) {
        (Some(path), _) => read_resume(path)?,
        (None, Some(stored)) => stored,
        (None, None) => return Err("No resume: pass --resume or a --store holding resumeData".into()),
    };

    let mut session = Session::new(doc, config).with_tracer(build_tracer(trace_path));
    let response = session.smart_fill(&data, None);
    println!("{}", serde_json::to_string_pretty(&response)?);

    if let Some(path) = output {
        session.into_document().save(Path::new(path))?;
        info!(path, "filled page written");
    }
    Ok(response.is_success())
}

// ============================================================================
// serve subcommand
// ============================================================================

pub fn cmd_serve(
    page: &str,
    store: Option<&str>,
    output: Option<&str>,
    mut config: SessionConfig,
    trace_path: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = Document::load(Path::new(page))?;
    let profile = read_profile(store)?;
    config.classifier = with_stored_settings(&config.classifier, &profile);

    let mut session = Session::new(doc, config).with_tracer(build_tracer(trace_path));
    if let Some(resume) = profile.resume {
        session = session.with_default_resume(resume);
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let handled = serve(&mut session, stdin.lock(), stdout.lock())?;
    info!(handled, "input closed");

    if let Some(path) = output {
        session.into_document().save(Path::new(path))?;
    }
    Ok(())
}

// ============================================================================
// test-connection subcommand
// ============================================================================

/// Check the classifier connection. Returns whether it answered.
pub fn cmd_test_connection(
    settings: &ModelSettings,
    store: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let profile = read_profile(store)?;
    let settings = with_stored_settings(settings, &profile);

    let report = test_connection(&settings);
    info!(success = report.success, "connection checked");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.success)
}

// ============================================================================
// import subcommand
// ============================================================================

pub fn cmd_import(store: &str, resume: &str) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_resume(resume)?;
    let store = JsonFileStore::new(Path::new(store));
    save_with_retry(&store, RESUME_DATA_KEY, &serde_json::to_value(&data)?, RetryPolicy::default())?;
    println!("Resume saved to {}", store.path().display());
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

pub fn read_resume(path: &str) -> Result<ResumeData, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read resume '{}': {}", path, e))?;
    let data = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse resume '{}': {}", path, e))?;
    Ok(data)
}

/// Stored résumé and model settings; nothing when no store is given.
pub fn read_profile(store: Option<&str>) -> Result<StoredProfile, Box<dyn std::error::Error>> {
    match store {
        Some(path) => Ok(load_profile(&JsonFileStore::new(Path::new(path)))?),
        None => Ok(StoredProfile::default()),
    }
}

/// `settings` layered over the stored model settings.
pub fn with_stored_settings(settings: &ModelSettings, profile: &StoredProfile) -> ModelSettings {
    match &profile.model_settings {
        Some(stored) => settings.over(stored),
        None => settings.clone(),
    }
}

fn build_tracer(path: Option<&str>) -> TraceLogger {
    match path {
        Some(p) => TraceLogger::new(Path::new(p)),
        None => TraceLogger::disabled(),
    }
}
