//! External download tool integration.
//!
//! The orchestrator never spawns processes directly; it talks to a
//! [`Converter`]. [`SpotDl`] is the production implementation, tests plug in
//! fakes that write files into the output directory.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::format::AudioFormat;
use crate::process::{self, ProcessError};

/// Everything a converter needs to produce one artifact.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub source_url: String,
    /// Output path with the converter's extension placeholder still in it.
    pub output_template: String,
    pub format: AudioFormat,
    /// Working directory for the process (the output directory).
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

/// Text the converter printed while producing the artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl From<process::ProcessOutput> for ToolOutput {
    fn from(o: process::ProcessOutput) -> Self {
        Self {
            stdout: o.stdout,
            stderr: o.stderr,
        }
    }
}

#[async_trait]
pub trait Converter: Send + Sync {
    /// Human-readable tool name used in logs.
    fn name(&self) -> &str;

    /// Token the tool replaces with the produced file's extension.
    fn extension_placeholder(&self) -> &str;

    /// `true` when the tool can be invoked right now.
    async fn check(&self) -> bool;

    /// One-shot installation attempt.
    async fn install(&self) -> Result<(), ProcessError>;

    /// Run the download; the artifact lands on disk, the returned output is
    /// only used for metadata.
    async fn download(&self, invocation: &Invocation) -> Result<ToolOutput, ProcessError>;
}

/// Settings for the spotDL command line.
#[derive(Debug, Clone)]
pub struct SpotDlSettings {
    /// Program to run (`spotdl` unless overridden).
    pub program: String,
    /// Shell line executed when the program is missing.
    pub install_command: String,
    pub check_timeout: Duration,
    pub install_timeout: Duration,
}

impl Default for SpotDlSettings {
    fn default() -> Self {
        Self {
            program: "spotdl".to_owned(),
            install_command: "pip install spotdl".to_owned(),
            check_timeout: Duration::from_secs(15),
            install_timeout: Duration::from_secs(60),
        }
    }
}

/// spotDL invoked as a subprocess.
#[derive(Debug, Clone, Default)]
pub struct SpotDl {
    settings: SpotDlSettings,
}

impl SpotDl {
    pub fn new(settings: SpotDlSettings) -> Self {
        Self { settings }
    }

    /// Argument vector for one download, without the program name.
    pub fn download_args(invocation: &Invocation) -> Vec<String> {
        vec![
            invocation.source_url.clone(),
            "--output".to_owned(),
            invocation.output_template.clone(),
            "--format".to_owned(),
            invocation.format.extension().to_owned(),
            "--threads".to_owned(),
            "1".to_owned(),
        ]
    }
}

#[async_trait]
impl Converter for SpotDl {
    fn name(&self) -> &str {
        &self.settings.program
    }

    fn extension_placeholder(&self) -> &str {
        "{output-ext}"
    }

    async fn check(&self) -> bool {
        let mut command = Command::new(&self.settings.program);
        command.arg("--version");
        match process::run(command, self.settings.check_timeout).await {
            Ok(out) => {
                info!(
                    tool = %self.settings.program,
                    version = %out.stdout.trim(),
                    "download tool available"
                );
                true
            }
            Err(e) => {
                warn!(tool = %self.settings.program, error = %e, "download tool not invocable");
                false
            }
        }
    }

    async fn install(&self) -> Result<(), ProcessError> {
        info!(command = %self.settings.install_command, "installing download tool");
        process::run(
            process::shell(&self.settings.install_command),
            self.settings.install_timeout,
        )
        .await?;
        info!(tool = %self.settings.program, "download tool installed");
        Ok(())
    }

    async fn download(&self, invocation: &Invocation) -> Result<ToolOutput, ProcessError> {
        let mut command = Command::new(&self.settings.program);
        command
            .args(Self::download_args(invocation))
            .current_dir(&invocation.working_dir);

        info!(
            tool = %self.settings.program,
            url = %invocation.source_url,
            template = %invocation.output_template,
            format = %invocation.format,
            "running download"
        );
        let output = process::run(command, invocation.timeout).await?;
        Ok(output.into())
    }
}
