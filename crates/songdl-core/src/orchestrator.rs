//! The download operation end to end: validate, make sure the tool exists,
//! run it, find the artifact, scrape metadata, schedule cleanup.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, instrument, warn};
use validator::ValidateUrl;

use crate::converter::{Converter, Invocation};
use crate::discovery;
use crate::error::DownloadError;
use crate::format::AudioFormat;
use crate::janitor::Janitor;
use crate::job::JobRegistry;
use crate::metadata::extract_track_info;

/// A validated download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source_url: String,
    pub format: AudioFormat,
}

impl DownloadRequest {
    /// Validate raw client input. `format` defaults to mp3 when absent.
    pub fn parse(url: Option<&str>, format: Option<&str>) -> Result<Self, DownloadError> {
        let url = match url {
            Some(u) if !u.is_empty() => u,
            _ => return Err(DownloadError::invalid_input("song URL is required")),
        };
        if !url.validate_url() {
            return Err(DownloadError::invalid_input("invalid URL"));
        }
        let format = match format {
            None => AudioFormat::default(),
            Some(f) => AudioFormat::from_str(f)
                .map_err(|_| DownloadError::invalid_input("unsupported format"))?,
        };
        Ok(Self {
            source_url: url.to_owned(),
            format,
        })
    }
}

/// What a successful download reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub title: String,
    pub artist: String,
    pub format: AudioFormat,
    pub filename: String,
    pub download_url: String,
    pub recovered: bool,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Directory the converter writes into; also its working directory.
    pub output_dir: PathBuf,
    /// Upper bound for one converter run.
    pub download_timeout: Duration,
    /// How recent a same-format file must be to be adopted by the fallback.
    pub fallback_window: Duration,
    /// Delay before a published artifact is deleted.
    pub cleanup_after: Duration,
    /// URL path artifacts are served under, without trailing slash.
    pub download_route: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            download_timeout: Duration::from_secs(120),
            fallback_window: Duration::from_secs(180),
            cleanup_after: Duration::from_secs(3600),
            download_route: "/downloads".to_owned(),
        }
    }
}

pub struct Orchestrator {
    settings: OrchestratorSettings,
    converter: Arc<dyn Converter>,
    registry: Arc<JobRegistry>,
    janitor: Janitor,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .field("converter", &self.converter.name())
            .field("janitor", &self.janitor)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(settings: OrchestratorSettings, converter: Arc<dyn Converter>) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let janitor = Janitor::with_registry(Arc::clone(&registry));
        Self {
            settings,
            converter,
            registry,
            janitor,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn janitor(&self) -> &Janitor {
        &self.janitor
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Produce one artifact for `request`.
    #[instrument(skip(self), fields(url = %request.source_url, format = %request.format))]
    pub async fn handle_download(
        &self,
        request: DownloadRequest,
    ) -> Result<DownloadOutcome, DownloadError> {
        self.ensure_tool().await?;

        let guard = self.registry.begin(&self.settings.output_dir, request.format);
        let job = guard.job().clone();
        let invocation = Invocation {
            source_url: request.source_url.clone(),
            output_template: job.output_template(self.converter.extension_placeholder()),
            format: request.format,
            working_dir: self.settings.output_dir.clone(),
            timeout: self.settings.download_timeout,
        };

        let output = match self.converter.download(&invocation).await {
            Ok(output) => output,
            Err(e) => {
                warn!(job = %job.token, error = %e, stderr = %e.stderr(), "download tool failed");
                discovery::discard_partial(&job).await;
                return Err(DownloadError::from(e));
            }
        };
        debug!(job = %job.token, stdout = %output.stdout, "download tool stdout");
        if !output.stderr.is_empty() {
            debug!(job = %job.token, stderr = %output.stderr, "download tool stderr");
        }

        let found = {
            let _scan = self.registry.discovery_lock().await;
            discovery::discover(
                &job,
                &self.registry,
                self.settings.fallback_window,
                SystemTime::now(),
            )
            .await
        };
        let artifact = match found {
            Ok(artifact) => artifact,
            Err(e) => {
                discovery::discard_partial(&job).await;
                return Err(e);
            }
        };

        let track = extract_track_info(&output.stdout);
        guard.publish();
        self.janitor
            .schedule(artifact.path.clone(), self.settings.cleanup_after);

        info!(
            job = %job.token,
            filename = %artifact.filename,
            recovered = artifact.recovered,
            "download complete"
        );
        Ok(DownloadOutcome {
            title: track.title,
            artist: track.artist,
            format: request.format,
            download_url: format!("{}/{}", self.settings.download_route, artifact.filename),
            filename: artifact.filename,
            recovered: artifact.recovered,
        })
    }

    /// Check the converter once; try installing it when missing.
    async fn ensure_tool(&self) -> Result<(), DownloadError> {
        if self.converter.check().await {
            return Ok(());
        }
        info!(tool = %self.converter.name(), "download tool missing; attempting install");
        match self.converter.install().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(tool = %self.converter.name(), error = %e, "download tool install failed");
                Err(DownloadError::ToolUnavailable)
            }
        }
    }
}
