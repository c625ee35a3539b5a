use serde_json::Value;
use tracing::{info, warn};

use crate::browser::dom::{Document, NodeId};
use crate::fill::executor::execute_fill;
use crate::fill::pointer::{PendingFill, PointerEvent, PointerMode, PointerResponse};
use crate::matcher::ai_model::{ChatCompletionBackend, ModelSettings, TextCompletion};
use crate::matcher::classifier::DelegatedMatcher;
use crate::matcher::heuristic::HeuristicMatcher;
use crate::matcher::mapping::{Mapping, MatchStrategy};
use crate::matcher::strategy::match_with_fallback;
use crate::resume::flatten::flatten_resume;
use crate::resume::keywords::KeywordTables;
use crate::resume::resume_model::{Category, ResumeData, ResumeField};
use crate::screen::scanner::{ScanOptions, scan_page};
use crate::screen::screen_model::PageField;
use crate::session::messages::{FieldMappingSpec, PointerEventKind, PointerEventSpec, PointerView, Request, Response};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

pub const NO_FIELDS_MESSAGE: &str = "No fillable form fields detected";
pub const EMPTY_RESUME_MESSAGE: &str = "Resume data is empty";

/// Which matcher a smart fill may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Analyzer {
    /// Local heuristic scoring only.
    Local,
    /// Delegate to the classifier when one is configured, else local.
    #[default]
    Llm,
}

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub scan: ScanOptions,
    pub tables: KeywordTables,
    pub classifier: ModelSettings,
    pub analyzer: Analyzer,
}

// ============================================================================
// Session
// ============================================================================

/// Per-page engine context: the live document, the fields cached by the
/// last scan or fill, and pointer-mode state. Requests are handled one at a
/// time.
pub struct Session {
    doc: Document,
    config: SessionConfig,
    page_fields: Vec<PageField>,
    resume_fields: Vec<ResumeField>,
    pointer: PointerMode,
    backend_override: Option<Box<dyn TextCompletion>>,
    default_resume: Option<ResumeData>,
    tracer: TraceLogger,
}

impl Session {
    pub fn new(doc: Document, config: SessionConfig) -> Self {
        Self {
            doc,
            config,
            page_fields: Vec::new(),
            resume_fields: Vec::new(),
            pointer: PointerMode::new(),
            backend_override: None,
            default_resume: None,
            tracer: TraceLogger::disabled(),
        }
    }

    /// Use `backend` for every delegated match, whatever the settings say.
    pub fn with_backend(mut self, backend: Box<dyn TextCompletion>) -> Self {
        self.backend_override = Some(backend);
        self
    }

    /// Résumé used by fill requests that carry no `data`.
    pub fn with_default_resume(mut self, resume: ResumeData) -> Self {
        self.default_resume = Some(resume);
        self
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn page_fields(&self) -> &[PageField] {
        &self.page_fields
    }

    pub fn resume_fields(&self) -> &[ResumeField] {
        &self.resume_fields
    }

    pub fn pointer(&self) -> &PointerMode {
        &self.pointer
    }

    /// Drop cached fields and leave pointer mode.
    pub fn reset(&mut self) {
        self.page_fields.clear();
        self.resume_fields.clear();
        self.pointer.teardown(&mut self.doc);
    }

    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Ping => Response::ok().with_message("content script loaded"),
            Request::GetPageFields | Request::Rescan => {
                self.rescan();
                Response {
                    fields: Some(self.page_fields.clone()),
                    ..Response::ok()
                }
            }
            Request::GetPageInfo => Response {
                url: Some(self.doc.url().to_string()),
                title: Some(self.doc.title().to_string()),
                hostname: Some(self.doc.hostname().to_string()),
                ..Default::default()
            },
            Request::SmartFillForm { data, model_config } => {
                let data = self.request_resume(data);
                self.smart_fill(&data, model_config.as_ref())
            }
            Request::FillForm { data } => {
                let data = self.request_resume(data);
                self.smart_fill(&data, None)
            }
            Request::FillFields { field_mappings } => self.fill_fields(&field_mappings),
            Request::StartFieldFillMode { field_data } => self.start_field_fill_mode(field_data.as_ref()),
            Request::PointerEvent { event } => self.pointer_event(&event),
            Request::AdvanceClock { ms } => {
                self.advance_clock(ms);
                Response {
                    pointer: Some(self.pointer_view(None)),
                    ..Response::ok()
                }
            }
        }
    }

    /// Scan the page and cache the result.
    pub fn rescan(&mut self) -> &[PageField] {
        self.page_fields = scan_page(&self.doc, &self.config.scan);
        &self.page_fields
    }

    // ---- Smart fill ----

    /// Scan, flatten, match and fill. `model` overrides the configured
    /// classifier settings for this call.
    pub fn smart_fill(&mut self, data: &ResumeData, model: Option<&ModelSettings>) -> Response {
        self.rescan();
        if self.page_fields.is_empty() {
            return Response::failure(NO_FIELDS_MESSAGE);
        }

        self.resume_fields = flatten_resume(data, &self.config.tables);
        if self.resume_fields.is_empty() {
            return Response::failure(EMPTY_RESUME_MESSAGE);
        }

        let settings = match model {
            Some(m) => m.over(&self.config.classifier),
            None => self.config.classifier.clone(),
        };

        let local = HeuristicMatcher::new(&self.config.tables);
        let wants_delegation = self.config.analyzer == Analyzer::Llm;
        let built_backend = if wants_delegation && self.backend_override.is_none() && settings.is_configured() {
            match ChatCompletionBackend::new(&settings) {
                Ok(backend) => Some(backend),
                Err(e) => {
                    warn!("classifier unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let backend: Option<&dyn TextCompletion> = match (&self.backend_override, &built_backend) {
            _ if !wants_delegation => None,
            (Some(custom), _) => Some(&**custom),
            (None, Some(built)) => Some(built),
            (None, None) => None,
        };
        let delegated = backend.map(DelegatedMatcher::new);

        let (mappings, strategy) =
            match_with_fallback(delegated.as_ref(), &local, &self.page_fields, &self.resume_fields);

        let report = execute_fill(&mut self.doc, &mappings);
        let message = match strategy {
            MatchStrategy::Delegated => format!("Filled {} fields", report.filled_count),
            MatchStrategy::Local | MatchStrategy::LocalFallback => {
                format!("Filled {} fields (local match)", report.filled_count)
            }
        };
        info!(%strategy, filled = report.filled_count, failed = report.failed_count, "smart fill done");

        if self.tracer.is_enabled() {
            self.tracer.log(
                &TraceEvent::now("smartFill", self.doc.url())
                    .with_field_counts(self.page_fields.len(), self.resume_fields.len())
                    .with_strategy(strategy)
                    .with_mappings(&mappings)
                    .with_report(&report)
                    .with_message(&message),
            );
        }

        Response {
            details: Some(report),
            strategy: Some(strategy),
            ..Response::ok().with_message(message)
        }
    }

    // ---- Caller-chosen mappings ----

    pub fn fill_fields(&mut self, specs: &[FieldMappingSpec]) -> Response {
        if self.page_fields.is_empty() {
            self.rescan();
        }

        let mut resolved: Vec<(usize, ResumeField, f32)> = Vec::new();
        for spec in specs {
            let Some(pos) = self.page_fields.iter().position(|p| p.index == spec.page_index) else {
                continue;
            };
            let resume = match (spec.resume_index, &spec.value) {
                (Some(i), _) => self.resume_fields.get(i).cloned(),
                (None, Some(value)) => Some(ResumeField {
                    key: spec.key.clone().unwrap_or_else(|| format!("field_{}", spec.page_index)),
                    value: value.clone(),
                    keywords: Vec::new(),
                    category: Category::Basic,
                    occurrence_index: None,
                }),
                (None, None) => None,
            };
            if let Some(resume) = resume {
                resolved.push((pos, resume, spec.confidence.unwrap_or(1.0)));
            }
        }

        let mappings: Vec<Mapping> = resolved
            .iter()
            .map(|(pos, resume, confidence)| Mapping::new(&self.page_fields[*pos], resume, *confidence))
            .collect();
        let report = execute_fill(&mut self.doc, &mappings);

        if self.tracer.is_enabled() {
            self.tracer.log(
                &TraceEvent::now("fillFields", self.doc.url())
                    .with_field_counts(self.page_fields.len(), resolved.len())
                    .with_mappings(&mappings)
                    .with_report(&report),
            );
        }

        let message = format!("Filled {} fields", report.filled_count);
        Response {
            details: Some(report),
            ..Response::ok().with_message(message)
        }
    }

    // ---- Pointer mode ----

    pub fn start_field_fill_mode(&mut self, field_data: Option<&Value>) -> Response {
        match PendingFill::from_payload(field_data) {
            Ok(pending) => {
                self.pointer.arm(&mut self.doc, pending);
                Response {
                    pointer: Some(self.pointer_view(None)),
                    ..Response::ok()
                }
            }
            Err(e) => Response::failure(e),
        }
    }

    pub fn pointer_event(&mut self, spec: &PointerEventSpec) -> Response {
        let event = match self.to_pointer_event(spec) {
            Ok(event) => event,
            Err(message) => return Response::failure(message),
        };
        let response = self.pointer.handle_event(&mut self.doc, event);
        Response {
            pointer: Some(self.pointer_view(Some(response))),
            ..Response::ok()
        }
    }

    /// Advance the virtual clock, running due timers and ending a pointer
    /// settle window that has elapsed.
    pub fn advance_clock(&mut self, ms: u64) {
        self.doc.advance(ms);
        self.pointer.tick(&mut self.doc);
    }

    /// Résumé carried by a fill request, or the default one when the
    /// request has no `data`.
    fn request_resume(&self, data: Option<Value>) -> ResumeData {
        match data {
            Some(payload) => resume_from_payload(Some(payload)),
            None => self.default_resume.clone().unwrap_or_default(),
        }
    }

    fn to_pointer_event(&self, spec: &PointerEventSpec) -> Result<PointerEvent, String> {
        Ok(match spec.kind {
            PointerEventKind::KeyDown => PointerEvent::KeyDown(spec.key.clone().unwrap_or_default()),
            PointerEventKind::MouseOver => PointerEvent::MouseOver(self.locate(spec)?),
            PointerEventKind::MouseOut => PointerEvent::MouseOut(self.locate(spec)?),
            PointerEventKind::Click => PointerEvent::Click(self.locate(spec)?),
        })
    }

    fn locate(&self, spec: &PointerEventSpec) -> Result<NodeId, String> {
        let locator = spec
            .locator
            .as_deref()
            .ok_or_else(|| "pointer event needs a locator".to_string())?;
        self.doc.resolve_locator(locator).map_err(|e| e.to_string())
    }

    fn pointer_view(&self, response: Option<PointerResponse>) -> PointerView {
        PointerView {
            state: self.pointer.state(),
            pending: self.pointer.pending().cloned(),
            status: self.pointer.status().cloned(),
            outcome: response.map(|r| r.outcome),
            default_prevented: response.map(|r| r.default_prevented),
        }
    }
}

/// Résumé from a message payload; anything that is not a résumé object is
/// treated as an empty résumé.
fn resume_from_payload(data: Option<Value>) -> ResumeData {
    data.and_then(|v| serde_json::from_value(v).ok()).unwrap_or_default()
}
