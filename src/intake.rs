//! Intake: turn one upload plus one filter choice into a stored artifact.
//!
//! ## Request lifecycle
//!
//! ```text
//! Idle ──(both inputs present)──▶ Validating ──▶ Processing ──▶ Done
//!   │                                  │              │
//!   └─ missing input: stays Idle       └──────────────┴────────▶ Failed
//! ```
//!
//! A request missing its upload or its filter is not an error: the outcome is
//! [`IntakeOutcome::Idle`] with the list of filters the caller can offer.
//! Validation (filter lookup, name safety) happens before any pixel work and
//! before anything touches disk, so a rejected request writes nothing.
//!
//! A failure in decode, encode or write leaves the images directory exactly
//! as it was. The write itself is atomic, see [`store::write_atomic`].
//!
//! ## Batches
//!
//! [`Intake::handle_batch`] runs independent requests on the rayon pool and
//! reports each one on an optional channel as it finishes. Requests share no
//! state; two requests resolving to the same artifact path race and the last
//! rename wins.

use crate::config::AppConfig;
use crate::imaging::{
    BackendError, ImageBackend, PipelineParams, RustBackend, format_name, run_pipeline,
};
use crate::naming::{DeclaredName, NameError, StoragePaths};
use crate::registry::{self, FilterKind};
use crate::store;
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("unknown filter '{0}'")]
    UnknownFilter(String),
    #[error("refusing file name '{name}': {reason}")]
    PathTraversalRejected {
        name: String,
        #[source]
        reason: NameError,
    },
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    Encode(String),
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IntakeError {
    /// Stable short identifier, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            IntakeError::UnknownFilter(_) => "unknown-filter",
            IntakeError::PathTraversalRejected { .. } => "path-traversal-rejected",
            IntakeError::Decode(_) => "decode",
            IntakeError::Encode(_) => "encode",
            IntakeError::Write { .. } => "write",
        }
    }
}

/// A request tried to move backwards or skip a step.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("illegal request transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: RequestState,
    pub to: RequestState,
}

impl From<BackendError> for IntakeError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode(_) => IntakeError::Decode(err.to_string()),
            BackendError::Encode { .. } => IntakeError::Encode(err.to_string()),
        }
    }
}

// ============================================================================
// Requests and outcomes
// ============================================================================

/// Bytes of one upload plus the name the caller gave it.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub declared_name: String,
    /// Content type the caller claimed. Informational; the bytes are sniffed.
    pub content_type: Option<String>,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>, declared_name: impl Into<String>) -> Self {
        Self {
            bytes,
            declared_name: declared_name.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntakeRequest {
    pub upload: Option<UploadedImage>,
    pub filter: Option<String>,
}

impl IntakeRequest {
    /// Split into upload and filter, or report what is missing.
    ///
    /// An upload with an empty declared name counts as no upload, the same
    /// as a form submitted without choosing a file.
    fn into_inputs(self) -> Result<(UploadedImage, String), MissingInput> {
        let upload = self.upload.filter(|u| !u.declared_name.is_empty());
        let filter = self.filter.filter(|f| !f.trim().is_empty());
        match (upload, filter) {
            (Some(upload), Some(filter)) => Ok((upload, filter)),
            (None, Some(_)) => Err(MissingInput::Upload),
            (Some(_), None) => Err(MissingInput::Filter),
            (None, None) => Err(MissingInput::Both),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingInput {
    Upload,
    Filter,
    Both,
}

/// A stored artifact and how to reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilteredImage {
    pub filter: FilterKind,
    pub declared_name: String,
    /// Relative reference, `{public_prefix}/{filter}-{declared_name}`.
    pub reference: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub source_width: u32,
    pub source_height: u32,
    pub format: &'static str,
    /// Hex SHA-256 of the stored bytes.
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum IntakeOutcome {
    /// Nothing to do yet; offer the filters.
    Idle {
        missing: MissingInput,
        filters: Vec<&'static str>,
    },
    Done(FilteredImage),
}

// ============================================================================
// Request state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestState {
    Idle,
    Validating,
    Processing,
    Done,
    Failed,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Done | RequestState::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Processing)
                | (Validating, Failed)
                | (Processing, Done)
                | (Processing, Failed)
        )
    }

    /// Move to `next`. An illegal transition leaves the state unchanged.
    pub fn advance(&mut self, next: RequestState) -> Result<(), IllegalTransition> {
        if !self.can_advance_to(next) {
            return Err(IllegalTransition {
                from: *self,
                to: next,
            });
        }
        debug!(from = ?*self, to = ?next, "request state");
        *self = next;
        Ok(())
    }
}

/// Advance `state`, logging rather than failing the request on a bad step.
fn step(state: &mut RequestState, next: RequestState) {
    if let Err(e) = state.advance(next) {
        error!("{e}");
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Reported once per finished request in a batch.
#[derive(Debug)]
pub enum IntakeEvent {
    Filtered {
        index: usize,
        image: FilteredImage,
    },
    Failed {
        index: usize,
        declared_name: String,
        error: String,
    },
}

/// Everything a request needs besides its own inputs.
pub struct Intake<B: ImageBackend = RustBackend> {
    backend: B,
    paths: StoragePaths,
    params: PipelineParams,
}

impl Intake<RustBackend> {
    /// Production intake rooted at `root`.
    pub fn from_config(root: &Path, config: &AppConfig) -> Self {
        Self::with_backend(
            RustBackend::new(),
            StoragePaths::from_config(root, &config.storage),
            PipelineParams::from_images_config(&config.images),
        )
    }
}

impl<B: ImageBackend> Intake<B> {
    pub fn with_backend(backend: B, paths: StoragePaths, params: PipelineParams) -> Self {
        Self {
            backend,
            paths,
            params,
        }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Handle one request.
    pub fn handle(&self, request: IntakeRequest) -> Result<IntakeOutcome, IntakeError> {
        let mut state = RequestState::Idle;
        self.run(request, &mut state)
    }

    fn run(
        &self,
        request: IntakeRequest,
        state: &mut RequestState,
    ) -> Result<IntakeOutcome, IntakeError> {
        let (upload, filter) = match request.into_inputs() {
            Ok(inputs) => inputs,
            Err(missing) => {
                debug!(?missing, "request incomplete, offering filters");
                return Ok(IntakeOutcome::Idle {
                    missing,
                    filters: registry::identifiers(),
                });
            }
        };

        step(state, RequestState::Validating);
        let result = self.process(upload, &filter, state);
        match &result {
            Ok(image) => {
                step(state, RequestState::Done);
                info!(
                    filter = %image.filter,
                    reference = %image.reference,
                    width = image.width,
                    height = image.height,
                    "stored filtered image"
                );
            }
            Err(e) => {
                step(state, RequestState::Failed);
                warn!(kind = e.kind(), "request failed: {e}");
            }
        }
        result.map(IntakeOutcome::Done)
    }

    fn process(
        &self,
        upload: UploadedImage,
        filter: &str,
        state: &mut RequestState,
    ) -> Result<FilteredImage, IntakeError> {
        let filter = registry::lookup(filter).map_err(|e| IntakeError::UnknownFilter(e.0))?;
        let name = DeclaredName::parse(&upload.declared_name).map_err(|reason| {
            IntakeError::PathTraversalRejected {
                name: upload.declared_name.clone(),
                reason,
            }
        })?;
        let target = self.paths.resolve(&name, filter);

        step(state, RequestState::Processing);
        let artifact = run_pipeline(&self.backend, &upload.bytes, filter, &self.params)?;

        if let Some(declared) = &upload.content_type
            && declared != artifact.source_format.to_mime_type()
        {
            debug!(
                declared = %declared,
                sniffed = artifact.source_format.to_mime_type(),
                "declared content type does not match upload bytes"
            );
        }

        store::write_atomic(&target.path, &artifact.bytes).map_err(|source| {
            IntakeError::Write {
                path: target.path.clone(),
                source,
            }
        })?;

        Ok(FilteredImage {
            filter,
            declared_name: name.to_string(),
            reference: self.paths.public_reference(&target),
            width: artifact.output.width,
            height: artifact.output.height,
            source_width: artifact.source.width,
            source_height: artifact.source.height,
            format: format_name(&artifact.format),
            sha256: hex_digest(&artifact.bytes),
            path: target.path,
        })
    }

    /// Handle independent requests in parallel, preserving input order in
    /// the returned results.
    pub fn handle_batch(
        &self,
        requests: Vec<IntakeRequest>,
        progress: Option<Sender<IntakeEvent>>,
    ) -> Vec<Result<IntakeOutcome, IntakeError>> {
        requests
            .into_par_iter()
            .enumerate()
            .map_with(progress, |progress, (index, request)| {
                let declared_name = request
                    .upload
                    .as_ref()
                    .map(|u| u.declared_name.clone())
                    .unwrap_or_default();
                let result = self.handle(request);
                if let Some(tx) = progress {
                    let event = match &result {
                        Ok(IntakeOutcome::Done(image)) => Some(IntakeEvent::Filtered {
                            index,
                            image: image.clone(),
                        }),
                        Ok(IntakeOutcome::Idle { .. }) => None,
                        Err(e) => Some(IntakeEvent::Failed {
                            index,
                            declared_name,
                            error: e.to_string(),
                        }),
                    };
                    // Receiver gone means nobody is listening; keep working.
                    if let Some(event) = event {
                        tx.send(event).ok();
                    }
                }
                result
            })
            .collect()
    }
}

/// Handle one request with the production backend.
pub fn handle(
    root: &Path,
    config: &AppConfig,
    request: IntakeRequest,
) -> Result<IntakeOutcome, IntakeError> {
    Intake::from_config(root, config).handle(request)
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::{decode, encode_gradient, upload_request};
    use image::{GenericImageView, ImageFormat};
    use std::fs;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn mock_intake(backend: MockBackend, dir: &Path) -> Intake<MockBackend> {
        Intake::with_backend(
            backend,
            StoragePaths::new(dir.join("static/images"), "static/images"),
            PipelineParams::default(),
        )
    }

    fn real_intake(dir: &Path) -> Intake {
        Intake::from_config(dir, &AppConfig::default())
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        match fs::read_dir(dir) {
            Ok(entries) => {
                let mut names: Vec<_> = entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                names
            }
            Err(_) => Vec::new(),
        }
    }

    // =========================================================================
    // Missing input
    // =========================================================================

    #[test]
    fn missing_upload_offers_filters() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::default(), tmp.path());
        let request = IntakeRequest {
            upload: None,
            filter: Some("blur".into()),
        };

        let outcome = intake.handle(request).unwrap();
        assert_eq!(
            outcome,
            IntakeOutcome::Idle {
                missing: MissingInput::Upload,
                filters: registry::identifiers(),
            }
        );
        assert!(intake.backend.get_operations().is_empty());
    }

    #[test]
    fn empty_declared_name_counts_as_missing_upload() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::default(), tmp.path());
        let outcome = intake.handle(upload_request(vec![1, 2, 3], "", "blur")).unwrap();
        assert!(matches!(
            outcome,
            IntakeOutcome::Idle {
                missing: MissingInput::Upload,
                ..
            }
        ));
    }

    #[test]
    fn blank_filter_counts_as_missing() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::default(), tmp.path());
        let outcome = intake.handle(upload_request(vec![1], "a.png", "  ")).unwrap();
        assert!(matches!(
            outcome,
            IntakeOutcome::Idle {
                missing: MissingInput::Filter,
                ..
            }
        ));
    }

    #[test]
    fn empty_request_is_missing_both() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::default(), tmp.path());
        let outcome = intake.handle(IntakeRequest::default()).unwrap();
        assert!(matches!(
            outcome,
            IntakeOutcome::Idle {
                missing: MissingInput::Both,
                ..
            }
        ));
    }

    #[test]
    fn missing_input_never_leaves_idle() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::default(), tmp.path());
        let mut state = RequestState::Idle;
        intake.run(IntakeRequest::default(), &mut state).unwrap();
        assert_eq!(state, RequestState::Idle);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn unknown_filter_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::decoding(10, 10, ImageFormat::Png), tmp.path());
        let mut state = RequestState::Idle;

        let result = intake.run(upload_request(vec![1], "a.png", "glitter"), &mut state);

        assert!(matches!(result, Err(IntakeError::UnknownFilter(ref f)) if f == "glitter"));
        assert_eq!(state, RequestState::Failed);
        assert!(intake.backend.get_operations().is_empty());
        assert!(dir_entries(&tmp.path().join("static/images")).is_empty());
    }

    #[test]
    fn filter_lookup_is_case_sensitive() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::decoding(10, 10, ImageFormat::Png), tmp.path());
        let result = intake.handle(upload_request(vec![1], "a.png", "Blur"));
        assert!(matches!(result, Err(IntakeError::UnknownFilter(_))));
    }

    #[test]
    fn traversal_name_is_rejected_before_processing() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::decoding(10, 10, ImageFormat::Png), tmp.path());

        let result = intake.handle(upload_request(vec![1], "../../etc/passwd", "blur"));

        match result {
            Err(IntakeError::PathTraversalRejected { name, reason }) => {
                assert_eq!(name, "../../etc/passwd");
                assert_eq!(reason, NameError::ParentReference);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(intake.backend.get_operations().is_empty());
        assert!(!tmp.path().join("etc").exists());
    }

    #[test]
    fn absolute_name_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::decoding(10, 10, ImageFormat::Png), tmp.path());
        let result = intake.handle(upload_request(vec![1], "/tmp/x.png", "blur"));
        assert!(matches!(
            result,
            Err(IntakeError::PathTraversalRejected { .. })
        ));
    }

    // =========================================================================
    // Pipeline (mock backend)
    // =========================================================================

    #[test]
    fn success_runs_pipeline_and_writes_artifact() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::decoding(800, 600, ImageFormat::Png), tmp.path());
        let mut state = RequestState::Idle;

        let outcome = intake
            .run(upload_request(b"png".to_vec(), "a.png", "sharpen"), &mut state)
            .unwrap();

        let IntakeOutcome::Done(image) = outcome else {
            panic!("expected Done");
        };
        assert_eq!(state, RequestState::Done);
        assert_eq!(image.reference, "static/images/sharpen-a.png");
        assert_eq!((image.width, image.height), (500, 375));
        assert_eq!((image.source_width, image.source_height), (800, 600));
        assert_eq!(image.format, "png");
        assert_eq!(fs::read(&image.path).unwrap(), b"500x375");
        assert_eq!(image.sha256, hex_digest(b"500x375"));
        assert!(
            intake
                .backend
                .get_operations()
                .contains(&RecordedOp::Filter(FilterKind::Sharpen))
        );
    }

    #[test]
    fn decode_failure_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::failing_decode(), tmp.path());
        let mut state = RequestState::Idle;

        let result = intake.run(upload_request(b"junk".to_vec(), "a.png", "blur"), &mut state);

        assert!(matches!(result, Err(IntakeError::Decode(_))));
        assert_eq!(state, RequestState::Failed);
        assert!(dir_entries(&tmp.path().join("static/images")).is_empty());
    }

    #[test]
    fn encode_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend {
            fail_encode: true,
            ..MockBackend::decoding(10, 10, ImageFormat::Png)
        };
        let intake = mock_intake(backend, tmp.path());
        let result = intake.handle(upload_request(vec![1], "a.png", "blur"));
        assert!(matches!(result, Err(IntakeError::Encode(_))));
    }

    #[test]
    fn unwritable_images_dir_is_a_write_error() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("static")).unwrap();
        fs::write(tmp.path().join("static/images"), b"not a directory").unwrap();
        let intake = mock_intake(MockBackend::decoding(10, 10, ImageFormat::Png), tmp.path());

        let result = intake.handle(upload_request(vec![1], "a.png", "blur"));

        let err = result.unwrap_err();
        assert_eq!(err.kind(), "write");
        assert!(err.to_string().contains("blur-a.png"));
    }

    // =========================================================================
    // Pipeline (real backend)
    // =========================================================================

    #[test]
    fn real_upload_is_bounded_and_stored() {
        let tmp = TempDir::new().unwrap();
        let intake = real_intake(tmp.path());
        let bytes = encode_gradient(800, 600, ImageFormat::Png);

        let IntakeOutcome::Done(image) = intake
            .handle(upload_request(bytes, "a.png", "sharpen"))
            .unwrap()
        else {
            panic!("expected Done");
        };

        assert_eq!(image.reference, "static/images/sharpen-a.png");
        let stored = decode(&fs::read(&image.path).unwrap());
        assert_eq!(stored.dimensions(), (500, 375));
        assert_eq!(dir_entries(&tmp.path().join("static/images")), vec!["sharpen-a.png"]);
    }

    #[test]
    fn jpeg_upload_stays_jpeg() {
        let tmp = TempDir::new().unwrap();
        let intake = real_intake(tmp.path());
        let bytes = encode_gradient(64, 48, ImageFormat::Jpeg);

        let IntakeOutcome::Done(image) = intake
            .handle(upload_request(bytes, "photo.jpg", "emboss"))
            .unwrap()
        else {
            panic!("expected Done");
        };

        assert_eq!(image.format, "jpg");
        let stored = fs::read(&image.path).unwrap();
        assert_eq!(image::guess_format(&stored).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn malformed_bytes_leave_existing_artifact_untouched() {
        let tmp = TempDir::new().unwrap();
        let intake = real_intake(tmp.path());
        intake
            .handle(upload_request(
                encode_gradient(20, 20, ImageFormat::Png),
                "a.png",
                "blur",
            ))
            .unwrap();
        let path = tmp.path().join("static/images/blur-a.png");
        let before = fs::read(&path).unwrap();

        let result = intake.handle(upload_request(b"not an image".to_vec(), "a.png", "blur"));

        assert!(matches!(result, Err(IntakeError::Decode(_))));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn same_input_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let intake = real_intake(tmp.path());
        let bytes = encode_gradient(120, 90, ImageFormat::Png);

        let first = intake
            .handle(upload_request(bytes.clone(), "a.png", "contour"))
            .unwrap();
        let second = intake
            .handle(upload_request(bytes, "a.png", "contour"))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(dir_entries(&tmp.path().join("static/images")).len(), 1);
    }

    #[test]
    fn same_name_different_filters_coexist() {
        let tmp = TempDir::new().unwrap();
        let intake = real_intake(tmp.path());
        let bytes = encode_gradient(30, 30, ImageFormat::Png);
        intake
            .handle(upload_request(bytes.clone(), "a.png", "blur"))
            .unwrap();
        intake
            .handle(upload_request(bytes, "a.png", "smooth"))
            .unwrap();
        assert_eq!(
            dir_entries(&tmp.path().join("static/images")),
            vec!["blur-a.png", "smooth-a.png"]
        );
    }

    // =========================================================================
    // State machine
    // =========================================================================

    #[test]
    fn forward_transitions_are_legal() {
        let mut state = RequestState::Idle;
        state.advance(RequestState::Validating).unwrap();
        state.advance(RequestState::Processing).unwrap();
        state.advance(RequestState::Done).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn validation_can_fail_directly() {
        assert!(RequestState::Validating.can_advance_to(RequestState::Failed));
        assert!(!RequestState::Validating.can_advance_to(RequestState::Done));
    }

    #[test]
    fn no_transition_leaves_a_terminal_state() {
        for from in [RequestState::Done, RequestState::Failed] {
            for to in [
                RequestState::Idle,
                RequestState::Validating,
                RequestState::Processing,
                RequestState::Done,
                RequestState::Failed,
            ] {
                assert!(!from.can_advance_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn backwards_transition_is_refused_without_moving() {
        let mut state = RequestState::Processing;
        let err = state.advance(RequestState::Validating).unwrap_err();
        assert_eq!(
            err,
            IllegalTransition {
                from: RequestState::Processing,
                to: RequestState::Validating,
            }
        );
        assert_eq!(state, RequestState::Processing);
        assert_eq!(
            err.to_string(),
            "illegal request transition Processing -> Validating"
        );
    }

    #[test]
    fn bad_step_is_logged_not_fatal() {
        let mut state = RequestState::Done;
        step(&mut state, RequestState::Idle);
        assert_eq!(state, RequestState::Done);
    }

    // =========================================================================
    // Batches
    // =========================================================================

    #[test]
    fn batch_preserves_order_and_reports_events() {
        let tmp = TempDir::new().unwrap();
        let intake = real_intake(tmp.path());
        let requests = vec![
            upload_request(encode_gradient(16, 16, ImageFormat::Png), "a.png", "blur"),
            upload_request(b"junk".to_vec(), "b.png", "blur"),
            IntakeRequest::default(),
            upload_request(encode_gradient(16, 16, ImageFormat::Png), "c.png", "detail"),
        ];
        let (tx, rx) = mpsc::channel();

        let results = intake.handle_batch(requests, Some(tx));

        assert_eq!(results.len(), 4);
        assert!(matches!(results[0], Ok(IntakeOutcome::Done(_))));
        assert!(matches!(results[1], Err(IntakeError::Decode(_))));
        assert!(matches!(results[2], Ok(IntakeOutcome::Idle { .. })));
        assert!(matches!(results[3], Ok(IntakeOutcome::Done(_))));

        let mut events: Vec<_> = rx.iter().collect();
        events.sort_by_key(|e| match e {
            IntakeEvent::Filtered { index, .. } | IntakeEvent::Failed { index, .. } => *index,
        });
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[1], IntakeEvent::Failed { index: 1, declared_name, .. } if declared_name == "b.png"));
    }

    #[test]
    fn same_target_in_one_batch_keeps_one_complete_artifact() {
        let tmp = TempDir::new().unwrap();
        let intake = real_intake(tmp.path());
        let requests = vec![
            upload_request(encode_gradient(120, 80, ImageFormat::Png), "a.png", "blur"),
            upload_request(encode_gradient(90, 140, ImageFormat::Png), "a.png", "blur"),
        ];

        let results = intake.handle_batch(requests, None);

        let digests: Vec<String> = results
            .into_iter()
            .map(|r| match r.unwrap() {
                IntakeOutcome::Done(image) => image.sha256,
                other => panic!("expected Done, got {other:?}"),
            })
            .collect();
        assert_ne!(digests[0], digests[1]);

        let images_dir = tmp.path().join("static/images");
        let stored = fs::read(images_dir.join("blur-a.png")).unwrap();
        let dims = decode(&stored).dimensions();
        assert!(dims == (120, 80) || dims == (90, 140), "{dims:?}");
        assert!(digests.contains(&hex_digest(&stored)));
        assert_eq!(dir_entries(&images_dir), vec!["blur-a.png"]);
    }

    #[cfg(unix)]
    #[test]
    fn stored_artifact_is_readable_by_others() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let intake = real_intake(tmp.path());
        let IntakeOutcome::Done(image) = intake
            .handle(upload_request(
                encode_gradient(20, 20, ImageFormat::Png),
                "a.png",
                "blur",
            ))
            .unwrap()
        else {
            panic!("expected Done");
        };
        let mode = fs::metadata(&image.path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn batch_without_listener() {
        let tmp = TempDir::new().unwrap();
        let intake = mock_intake(MockBackend::decoding(10, 10, ImageFormat::Png), tmp.path());
        let results = intake.handle_batch(
            vec![upload_request(vec![1], "a.png", "blur")],
            None,
        );
        assert!(results[0].is_ok());
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn backend_errors_map_to_intake_errors() {
        let decode: IntakeError = BackendError::Decode("bad header".into()).into();
        assert_eq!(decode.kind(), "decode");
        assert!(decode.to_string().contains("bad header"));

        let encode: IntakeError = BackendError::Encode {
            format: ImageFormat::Png,
            message: "full".into(),
        }
        .into();
        assert_eq!(encode.kind(), "encode");
        assert!(encode.to_string().contains("png"));
    }

    #[test]
    fn hex_digest_is_lowercase_sha256() {
        assert_eq!(
            hex_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
