use crate::catalog::{Catalog, TargetCategory};
use crate::runtime::GenerationResult;
use comfy_table::{presets::ASCII_FULL, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

const BANNER_WIDTH: usize = 64;
const INSTRUCTION_COLUMN: usize = 44;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub target: String,
    pub output: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstructionSection {
    heading: String,
    lines: Vec<String>,
}

/// Success/failure partition of a batch, re-validated against the files
/// actually present on disk. Advisory text only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub successful: Vec<SummaryEntry>,
    pub failed: Vec<SummaryEntry>,
    instructions: Vec<InstructionSection>,
}

impl Summary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn has_successes(&self) -> bool {
        !self.successful.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Reporter {
    catalog: Catalog,
    base_dir: PathBuf,
}

impl Reporter {
    pub fn new(catalog: Catalog, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            base_dir: base_dir.into(),
        }
    }

    /// Partition results into successful and failed. A target counts as
    /// successful only when the tool reported success AND its output file
    /// exists; a zero exit status without an artifact is still a failure.
    pub fn summarize(&self, results: &[GenerationResult]) -> Summary {
        let mut successful = Vec::new();
        let mut failed = Vec::new();

        for result in results {
            let entry = SummaryEntry {
                target: result.target.clone(),
                output: result.spec.output.clone(),
                description: result.spec.description.clone(),
                note: None,
            };
            let output_path = self.base_dir.join(&result.spec.output);
            if result.is_success() && output_path.exists() {
                successful.push(entry);
            } else if result.is_success() {
                failed.push(SummaryEntry {
                    note: Some(format!(
                        "tool reported success but {} was not created",
                        result.spec.output
                    )),
                    ..entry
                });
            } else {
                failed.push(entry);
            }
        }

        let instructions = if successful.is_empty() {
            Vec::new()
        } else {
            build_instructions(&self.catalog)
        };

        Summary {
            successful,
            failed,
            instructions,
        }
    }
}

fn build_instructions(catalog: &Catalog) -> Vec<InstructionSection> {
    let sections = [
        (TargetCategory::Install, "INSTALL:", "To install"),
        (TargetCategory::Test, "TESTS:", "To run"),
        (
            TargetCategory::Cleanup,
            "CLEANUP (REMOVES EVERYTHING):",
            "To remove",
        ),
    ];

    let mut number = 0usize;
    let mut out = Vec::new();
    for (category, heading, verb) in sections {
        let mut lines = Vec::new();
        for (_, spec) in catalog.iter().filter(|(_, s)| s.category == category) {
            number += 1;
            let label = format!("{verb} {}:", spec.description);
            lines.push(format!(
                "{number}. {label:<width$} @{}",
                spec.output,
                width = INSTRUCTION_COLUMN
            ));
        }
        if !lines.is_empty() {
            out.push(InstructionSection {
                heading: heading.to_string(),
                lines,
            });
        }
    }
    out
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let banner = "=".repeat(BANNER_WIDTH);

        writeln!(f, "{banner}")?;
        writeln!(f, "GENERATED FILES SUMMARY:")?;
        writeln!(f, "{banner}")?;

        for entry in &self.successful {
            writeln!(f, "✓ {} - {}", entry.output, entry.description)?;
        }

        if !self.failed.is_empty() {
            writeln!(f, "\nFILES NOT GENERATED:")?;
            for entry in &self.failed {
                match &entry.note {
                    Some(note) => {
                        writeln!(f, "✗ {} - {} ({note})", entry.output, entry.description)?
                    }
                    None => writeln!(f, "✗ {} - {}", entry.output, entry.description)?,
                }
            }
        }

        if !self.instructions.is_empty() {
            writeln!(f, "\n{banner}")?;
            writeln!(f, "USAGE INSTRUCTIONS:")?;
            writeln!(f, "{banner}")?;
            for (index, section) in self.instructions.iter().enumerate() {
                if index > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "{}", section.heading)?;
                for line in &section.lines {
                    writeln!(f, "{line}")?;
                }
            }
            writeln!(f, "{banner}")?;
        }

        Ok(())
    }
}

/// ASCII table of every catalog entry, for the listing flag.
pub fn render_catalog(catalog: &Catalog) -> String {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.set_header(vec!["target", "description", "input", "output", "category"]);

    for (target, spec) in catalog.iter() {
        table.add_row(vec![
            target,
            &spec.description,
            &spec.input,
            &spec.output,
            &spec.category.to_string(),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TargetSpec;
    use crate::runtime::GenerationStatus;
    use std::fs;

    fn spec(input: &str, output: &str, description: &str, category: TargetCategory) -> TargetSpec {
        TargetSpec {
            input: input.to_string(),
            output: output.to_string(),
            description: description.to_string(),
            category,
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_entries([
            (
                "database".to_string(),
                spec(
                    "deploy_database.sql",
                    "output_database.sql",
                    "Database logging system",
                    TargetCategory::Install,
                ),
            ),
            (
                "queue".to_string(),
                spec(
                    "deploy_queue.sql",
                    "output_queue.sql",
                    "Queue logging system",
                    TargetCategory::Install,
                ),
            ),
            (
                "cleanup_queue".to_string(),
                spec(
                    "deploy_cleanup_queue.sql",
                    "output_cleanup_queue.sql",
                    "Queue cleanup",
                    TargetCategory::Cleanup,
                ),
            ),
        ])
    }

    fn result_for(target: &str, status: GenerationStatus, catalog: &Catalog) -> GenerationResult {
        let spec = catalog.get(target).expect("known target").clone();
        GenerationResult {
            target: target.to_string(),
            message: String::new(),
            started_at: "unknown".to_string(),
            duration_ms: 0,
            status,
            spec,
        }
    }

    #[test]
    fn zero_exit_without_an_output_file_counts_as_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = catalog();
        let reporter = Reporter::new(catalog.clone(), dir.path());

        // The tool claimed success but nothing was written to disk.
        let results = vec![result_for(
            "database",
            GenerationStatus::Succeeded,
            &catalog,
        )];
        let summary = reporter.summarize(&results);

        assert!(summary.successful.is_empty());
        assert_eq!(summary.failed.len(), 1);
        let note = summary.failed[0].note.as_deref().unwrap_or_default();
        assert!(note.contains("was not created"));
    }

    #[test]
    fn instructions_render_only_when_something_succeeded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = catalog();
        let reporter = Reporter::new(catalog.clone(), dir.path());

        let failed = vec![result_for("database", GenerationStatus::Failed, &catalog)];
        let summary = reporter.summarize(&failed);
        assert!(!summary.has_successes());
        assert!(!format!("{summary}").contains("USAGE INSTRUCTIONS"));

        fs::write(dir.path().join("output_queue.sql"), "ok").expect("write output");
        let mixed = vec![
            result_for("database", GenerationStatus::Failed, &catalog),
            result_for("queue", GenerationStatus::Succeeded, &catalog),
        ];
        let summary = reporter.summarize(&mixed);
        assert!(summary.has_successes());
        assert!(!summary.all_succeeded());
        assert!(format!("{summary}").contains("USAGE INSTRUCTIONS"));
    }

    #[test]
    fn instructions_enumerate_the_catalog_in_order_grouped_by_category() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = catalog();
        fs::write(dir.path().join("output_database.sql"), "ok").expect("write output");
        let reporter = Reporter::new(catalog.clone(), dir.path());

        let results = vec![result_for(
            "database",
            GenerationStatus::Succeeded,
            &catalog,
        )];
        let rendered = format!("{}", reporter.summarize(&results));

        assert!(rendered.contains("INSTALL:"));
        assert!(rendered.contains("CLEANUP (REMOVES EVERYTHING):"));
        let db = rendered.find("@output_database.sql").expect("db line");
        let queue = rendered.find("@output_queue.sql").expect("queue line");
        let cleanup = rendered
            .find("@output_cleanup_queue.sql")
            .expect("cleanup line");
        assert!(db < queue && queue < cleanup);
        assert!(rendered.contains("1. To install Database logging system:"));
        assert!(rendered.contains("3. To remove Queue cleanup:"));
    }

    #[test]
    fn catalog_listing_names_every_target() {
        let rendered = render_catalog(&catalog());
        assert!(rendered.contains("database"));
        assert!(rendered.contains("cleanup_queue"));
        assert!(rendered.contains("deploy_queue.sql"));
        assert!(rendered.contains("cleanup"));
    }

    #[cfg(unix)]
    #[test]
    fn full_run_reports_both_outputs_in_the_instruction_block() {
        use crate::locator::{ToolCandidate, ToolLocator};
        use crate::runtime::{BatchRunner, Generator};
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let deploy = dir.path().join("deploy");
        fs::create_dir_all(&deploy).expect("create deploy dir");
        fs::write(deploy.join("deploy_database.sql"), "select 1;").expect("write input");
        fs::write(deploy.join("deploy_queue.sql"), "select 2;").expect("write input");

        let tool = dir.path().join("touch.sh");
        fs::write(
            &tool,
            "#!/bin/sh\nif [ \"$1\" = \"--help\" ]; then exit 0; fi\n: > \"$4\"\n",
        )
        .expect("write stub tool");
        let mut perms = fs::metadata(&tool).expect("stat stub tool").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&tool, perms).expect("chmod stub tool");

        let catalog = Catalog::from_entries([
            (
                "database".to_string(),
                spec(
                    "deploy_database.sql",
                    "output_database.sql",
                    "Database logging system",
                    TargetCategory::Install,
                ),
            ),
            (
                "queue".to_string(),
                spec(
                    "deploy_queue.sql",
                    "output_queue.sql",
                    "Queue logging system",
                    TargetCategory::Install,
                ),
            ),
        ]);

        let locator = ToolLocator::with_candidates(vec![ToolCandidate::new(
            tool.to_string_lossy().into_owned(),
        )]);
        let generator = Generator::new(dir.path()).with_locator(locator);
        let runner = BatchRunner::new(catalog.clone(), dir.path())
            .with_generator(generator)
            .with_progress(false);

        let results = runner.run(&[]).expect("batch runs");
        assert_eq!(results.len(), 2);

        let summary = Reporter::new(catalog, dir.path()).summarize(&results);
        assert_eq!(summary.successful.len(), 2);
        assert!(summary.all_succeeded());

        let rendered = format!("{summary}");
        assert!(rendered.contains("output_database.sql"));
        assert!(rendered.contains("output_queue.sql"));
        assert!(rendered.contains("USAGE INSTRUCTIONS"));
    }
}
