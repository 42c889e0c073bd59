use crate::process::run_with_timeout;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Upper bound on each capability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error(
        "could not find a working MergeSourceFile invocation; \
         install it with `pip install MergeSourceFile`"
    )]
    NotFound,
}

/// One way the merge tool might be invoked on this machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCandidate {
    program: String,
    args: Vec<String>,
}

impl ToolCandidate {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a shell-style command template into a candidate.
    pub fn parse(template: &str) -> Result<Self, String> {
        let mut parts = shell_words::split(template)
            .map_err(|err| format!("failed to parse command template '{template}': {err}"))?;
        if parts.is_empty() {
            return Err(format!("command template '{template}' is empty"));
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            args: parts,
        })
    }

    fn into_invocation(self) -> ToolInvocation {
        ToolInvocation {
            program: self.program,
            args: self.args,
        }
    }
}

/// A candidate that answered its capability probe. Resolved at most once per
/// run and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    program: String,
    args: Vec<String>,
}

impl ToolInvocation {
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        shell_words::join(&parts)
    }
}

/// Candidate invocations in fixed preference order: global binary, python
/// module, Windows py launcher, then the repository-local script.
pub fn default_candidates(base_dir: &Path) -> Vec<ToolCandidate> {
    let local_script = base_dir.join("scripts").join("mergeSourceFile.py");
    vec![
        ToolCandidate::new("MergeSourceFile"),
        ToolCandidate::with_args("python", ["-m", "MergeSourceFile"]),
        ToolCandidate::with_args("py", ["-m", "MergeSourceFile"]),
        ToolCandidate::with_args("python", [local_script.to_string_lossy().into_owned()]),
    ]
}

#[derive(Debug, Clone)]
pub struct ToolLocator {
    candidates: Vec<ToolCandidate>,
    probe_timeout: Duration,
}

impl ToolLocator {
    pub fn new(base_dir: &Path) -> Self {
        Self::with_candidates(default_candidates(base_dir))
    }

    pub fn with_candidates(candidates: Vec<ToolCandidate>) -> Self {
        Self {
            candidates,
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Accept the first candidate whose `--help` probe exits zero. A spawn
    /// error or probe timeout marks the candidate unavailable and the search
    /// moves on. One resolution attempt only; callers must not retry.
    pub fn locate(&self) -> Result<ToolInvocation, ToolError> {
        for candidate in &self.candidates {
            if self.probe(candidate) {
                return Ok(candidate.clone().into_invocation());
            }
        }
        Err(ToolError::NotFound)
    }

    fn probe(&self, candidate: &ToolCandidate) -> bool {
        let mut cmd = Command::new(&candidate.program);
        cmd.args(&candidate.args).arg("--help");
        match run_with_timeout(&mut cmd, self.probe_timeout) {
            Ok(captured) => captured.status.success(),
            Err(_) => false,
        }
    }
}
