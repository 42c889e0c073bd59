use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetCategory {
    Install,
    Test,
    Cleanup,
}

impl fmt::Display for TargetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TargetCategory::Install => "install",
            TargetCategory::Test => "test",
            TargetCategory::Cleanup => "cleanup",
        };
        write!(f, "{label}")
    }
}

/// One named unit of work: an input file under the deploy directory merged
/// into an output file under the base directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSpec {
    pub input: String,
    pub output: String,
    pub description: String,
    pub category: TargetCategory,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse catalog file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("catalog file {path} defines no targets")]
    Empty { path: PathBuf },
}

/// Registry of all known targets. Iteration order is insertion order and
/// drives both the default processing order and the numbered usage
/// instructions in the final report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: IndexMap<String, TargetSpec>,
}

impl Catalog {
    /// The builtin logging-system catalog.
    pub fn builtin() -> Self {
        let mut entries = IndexMap::new();
        let mut add = |id: &str, input: &str, output: &str, desc: &str, category| {
            entries.insert(
                id.to_string(),
                TargetSpec {
                    input: input.to_string(),
                    output: output.to_string(),
                    description: desc.to_string(),
                    category,
                },
            );
        };

        add(
            "database",
            "deploy_database_logger.sql",
            "output_database.sql",
            "Database logging system",
            TargetCategory::Install,
        );
        add(
            "database_with_tests",
            "deploy_database_with_tests.sql",
            "output_database_with_tests.sql",
            "Database logging system + tests",
            TargetCategory::Install,
        );
        add(
            "queue",
            "deploy_queue_logger.sql",
            "output_queue.sql",
            "Queue logging system",
            TargetCategory::Install,
        );
        add(
            "queue_with_tests",
            "deploy_queue_with_tests.sql",
            "output_queue_with_tests.sql",
            "Queue logging system + tests",
            TargetCategory::Install,
        );
        add(
            "tests_database",
            "deploy_tests_database.sql",
            "output_tests_database.sql",
            "Database tests only",
            TargetCategory::Test,
        );
        add(
            "tests_queue",
            "deploy_tests_queue.sql",
            "output_tests_queue.sql",
            "Queue tests only",
            TargetCategory::Test,
        );
        add(
            "cleanup_database",
            "deploy_cleanup_database.sql",
            "output_cleanup_database.sql",
            "Database cleanup",
            TargetCategory::Cleanup,
        );
        add(
            "cleanup_queue",
            "deploy_cleanup_queue.sql",
            "output_cleanup_queue.sql",
            "Queue cleanup",
            TargetCategory::Cleanup,
        );

        Self { entries }
    }

    /// Load an externally supplied catalog from a JSON object. Key order in
    /// the file becomes catalog order.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog: Self =
            serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if catalog.is_empty() {
            return Err(CatalogError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(catalog)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, TargetSpec)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, target: &str) -> Option<&TargetSpec> {
        self.entries.get(target)
    }

    pub fn contains(&self, target: &str) -> bool {
        self.entries.contains_key(target)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TargetSpec)> {
        self.entries.iter().map(|(id, spec)| (id.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Intersect a caller-supplied selection with the catalog, preserving
    /// catalog order rather than caller order. An empty selection selects
    /// the entire catalog.
    pub fn select<'a>(&'a self, requested: &[String]) -> Vec<(&'a str, &'a TargetSpec)> {
        if requested.is_empty() {
            return self.iter().collect();
        }
        self.iter()
            .filter(|(id, _)| requested.iter().any(|r| r == id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_preserves_insertion_order() {
        let catalog = Catalog::builtin();
        let ids: Vec<&str> = catalog.iter().map(|(id, _)| id).collect();
        assert_eq!(
            ids,
            vec![
                "database",
                "database_with_tests",
                "queue",
                "queue_with_tests",
                "tests_database",
                "tests_queue",
                "cleanup_database",
                "cleanup_queue",
            ]
        );
    }

    #[test]
    fn empty_selection_selects_the_whole_catalog() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.select(&[]).len(), catalog.len());
    }

    #[test]
    fn select_preserves_catalog_order_not_caller_order() {
        let catalog = Catalog::builtin();
        let requested = vec!["queue".to_string(), "database".to_string()];
        let ids: Vec<&str> = catalog
            .select(&requested)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["database", "queue"]);
    }

    #[test]
    fn select_with_unknown_ids_yields_no_targets() {
        let catalog = Catalog::builtin();
        let requested = vec!["nope".to_string(), "also_missing".to_string()];
        assert!(catalog.select(&requested).is_empty());
    }

    #[test]
    fn json_catalog_keeps_file_order() {
        let source = r#"{
            "second_on_disk": {
                "input": "b.sql",
                "output": "out_b.sql",
                "description": "B",
                "category": "install"
            },
            "first_alphabetically": {
                "input": "a.sql",
                "output": "out_a.sql",
                "description": "A",
                "category": "cleanup"
            }
        }"#;
        let catalog: Catalog = serde_json::from_str(source).expect("catalog should parse");
        let ids: Vec<&str> = catalog.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["second_on_disk", "first_alphabetically"]);
        assert_eq!(
            catalog.get("first_alphabetically").map(|s| s.category),
            Some(TargetCategory::Cleanup)
        );
    }

    #[test]
    fn loading_an_empty_catalog_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "{}").expect("write catalog");
        let err = Catalog::load(&path).expect_err("empty catalog must be rejected");
        assert!(matches!(err, CatalogError::Empty { .. }));
    }
}
