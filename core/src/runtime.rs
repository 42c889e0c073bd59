use crate::catalog::{Catalog, TargetSpec};
use crate::locator::{ToolError, ToolInvocation, ToolLocator};
use crate::process::{run_with_timeout, WaitError};
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Upper bound on each merge-tool invocation.
pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);

const BANNER_WIDTH: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Succeeded,
    Failed,
}

/// Outcome of one target, as reported by the external tool. The reporter
/// re-validates success against the output file on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub target: String,
    pub spec: TargetSpec,
    pub status: GenerationStatus,
    pub message: String,
    pub started_at: String,
    pub duration_ms: u128,
}

impl GenerationResult {
    fn succeeded(target: &str, spec: &TargetSpec, message: String, clock: &TargetClock) -> Self {
        Self {
            target: target.to_string(),
            spec: spec.clone(),
            status: GenerationStatus::Succeeded,
            message,
            started_at: clock.started_at.clone(),
            duration_ms: clock.timer.elapsed().as_millis(),
        }
    }

    fn failed(target: &str, spec: &TargetSpec, message: String, clock: &TargetClock) -> Self {
        Self {
            target: target.to_string(),
            spec: spec.clone(),
            status: GenerationStatus::Failed,
            message,
            started_at: clock.started_at.clone(),
            duration_ms: clock.timer.elapsed().as_millis(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == GenerationStatus::Succeeded
    }
}

struct TargetClock {
    started_at: String,
    timer: Instant,
}

impl TargetClock {
    fn start() -> Self {
        Self {
            started_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_else(|_| "unknown".to_string()),
            timer: Instant::now(),
        }
    }
}

/// Resolves one target's paths, invokes the merge tool and classifies the
/// outcome. The tool invocation is located lazily on first use and cached
/// for the rest of the batch.
#[derive(Debug)]
pub struct Generator {
    base_dir: PathBuf,
    deploy_dir: PathBuf,
    locator: ToolLocator,
    tool: OnceCell<ToolInvocation>,
    timeout: Duration,
}

impl Generator {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let deploy_dir = base_dir.join("deploy");
        let locator = ToolLocator::new(&base_dir);
        Self {
            base_dir,
            deploy_dir,
            locator,
            tool: OnceCell::new(),
            timeout: GENERATE_TIMEOUT,
        }
    }

    pub fn with_locator(mut self, locator: ToolLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Generate one target. Every per-target failure is folded into a failed
    /// `GenerationResult`; only an unlocatable tool escapes, since no target
    /// can proceed without it.
    pub fn generate(&self, target: &str, spec: &TargetSpec) -> Result<GenerationResult, ToolError> {
        let clock = TargetClock::start();
        let input = self.deploy_dir.join(&spec.input);
        let output = self.base_dir.join(&spec.output);

        // No process is spawned for a missing input, not even the probe.
        if !input.exists() {
            return Ok(GenerationResult::failed(
                target,
                spec,
                format!("✗ input file not found: {}", input.display()),
                &clock,
            ));
        }

        let tool = self.tool.get_or_try_init(|| self.locator.locate())?;
        let mut cmd = tool.command();
        cmd.arg("-i").arg(&input).arg("-o").arg(&output);

        let result = match run_with_timeout(&mut cmd, self.timeout) {
            Ok(captured) if captured.status.success() => GenerationResult::succeeded(
                target,
                spec,
                format!("✓ {} generated", spec.output),
                &clock,
            ),
            Ok(captured) => {
                // Some tools put their diagnostics on stdout instead.
                let stderr = String::from_utf8_lossy(&captured.stderr);
                let stdout = String::from_utf8_lossy(&captured.stdout);
                let detail = match (stderr.trim(), stdout.trim()) {
                    (diag, _) if !diag.is_empty() => diag,
                    (_, diag) if !diag.is_empty() => diag,
                    _ => "unknown error",
                };
                GenerationResult::failed(
                    target,
                    spec,
                    format!("✗ failed to generate {}: {detail}", spec.output),
                    &clock,
                )
            }
            Err(WaitError::TimedOut) => GenerationResult::failed(
                target,
                spec,
                format!("✗ timed out generating {}", spec.output),
                &clock,
            ),
            Err(WaitError::Io(err)) => GenerationResult::failed(
                target,
                spec,
                format!("✗ failed to generate {}: {err}", spec.output),
                &clock,
            ),
        };

        Ok(result)
    }
}

/// Drives the generator over a selection of catalog targets, strictly
/// sequentially, collecting one result per target.
#[derive(Debug)]
pub struct BatchRunner {
    catalog: Catalog,
    generator: Generator,
    progress: bool,
}

impl BatchRunner {
    pub fn new(catalog: Catalog, base_dir: impl Into<PathBuf>) -> Self {
        let generator = Generator::new(base_dir);
        Self {
            catalog,
            generator,
            progress: true,
        }
    }

    pub fn with_generator(mut self, generator: Generator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Run the selected targets in catalog order. A filter that matches
    /// nothing is a no-op with a diagnostic, not an error; one target's
    /// failure never prevents the next target's attempt.
    pub fn run(&self, selection: &[String]) -> Result<Vec<GenerationResult>, ToolError> {
        let selected = self.catalog.select(selection);
        if selected.is_empty() {
            if selection.is_empty() {
                eprintln!("[warn] the catalog defines no targets");
            } else {
                eprintln!("[warn] no matching targets: {}", selection.join(", "));
            }
            return Ok(Vec::new());
        }

        if self.progress {
            println!("{}", "=".repeat(BANNER_WIDTH));
            println!("GENERATING CONSOLIDATED DEPLOY SCRIPTS");
            println!("{}", "=".repeat(BANNER_WIDTH));
        }

        let mut results = Vec::with_capacity(selected.len());
        for (index, (target, spec)) in selected.into_iter().enumerate() {
            if self.progress {
                println!("\n{}. Generating {}...", index + 1, spec.description);
            }
            let result = self.generator.generate(target, spec)?;
            if self.progress {
                println!("   {}", result.message);
            }
            results.push(result);
        }

        Ok(results)
    }
}
