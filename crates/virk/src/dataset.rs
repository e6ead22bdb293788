//! The datasets produced from the registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use virk_output::export::{COMPANY_BASE, STATEMENT_DETAILS_BASE, STATEMENTS_BASE};

/// One of the three registry datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Company records from the CVR index
    Companies,

    /// Published financial statements with their document URLs
    Statements,

    /// XBRL facts of annual reports, one wide table per year
    StatementDetails,
}

impl Dataset {
    /// Returns all datasets in pipeline order.
    pub const fn all() -> [Self; 3] {
        [Self::Companies, Self::Statements, Self::StatementDetails]
    }

    /// Base file name of the dataset.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Companies => COMPANY_BASE,
            Self::Statements => STATEMENTS_BASE,
            Self::StatementDetails => STATEMENT_DETAILS_BASE,
        }
    }

    /// Environment variable naming the dataset's folder.
    pub const fn folder_env(&self) -> &'static str {
        match self {
            Self::Companies => "COMPANY_DATA_FOLDER_PATH",
            Self::Statements => "FS_FOLDER_PATH",
            Self::StatementDetails => "EFS_FOLDER_PATH",
        }
    }

    /// Folder used under the data root when nothing else is configured.
    pub const fn default_subdir(&self) -> &'static str {
        match self {
            Self::Companies => "companies",
            Self::Statements => "financial_statements",
            Self::StatementDetails => "statement_details",
        }
    }

    /// Parse a dataset from its base file name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|d| d.name() == name)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Table layout of the company dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Main table plus one table per sub-structure
    #[default]
    Panel,

    /// One flat table, lists kept as JSON text
    Wide,
}

impl OutputMode {
    /// Mode name as used on the command line.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Panel => "panel",
            Self::Wide => "wide",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "panel" => Ok(Self::Panel),
            "wide" => Ok(Self::Wide),
            other => Err(format!("unknown output mode `{other}`, expected panel or wide")),
        }
    }
}

/// Folder of `dataset`: an explicit path first, then the value of its
/// environment variable, then `<root>/<default subdir>`.
///
/// Empty values count as unset.
pub fn resolve_folder(
    dataset: Dataset,
    explicit: Option<PathBuf>,
    env_value: Option<String>,
    root: &Path,
) -> PathBuf {
    explicit
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| env_value.filter(|v| !v.trim().is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| root.join(dataset.default_subdir()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Dataset::Companies, "virksomhed", "COMPANY_DATA_FOLDER_PATH")]
    #[case(Dataset::Statements, "financial_statements", "FS_FOLDER_PATH")]
    #[case(Dataset::StatementDetails, "companies_all_tags", "EFS_FOLDER_PATH")]
    fn test_dataset_names(#[case] dataset: Dataset, #[case] name: &str, #[case] env: &str) {
        assert_eq!(dataset.name(), name);
        assert_eq!(dataset.folder_env(), env);
        assert_eq!(Dataset::from_name(name), Some(dataset));
    }

    #[rstest]
    #[case("panel", OutputMode::Panel)]
    #[case("Wide", OutputMode::Wide)]
    fn test_parse_mode(#[case] input: &str, #[case] expected: OutputMode) {
        assert_eq!(input.parse::<OutputMode>().unwrap(), expected);
        assert_eq!(expected.to_string(), input.to_ascii_lowercase());
    }

    #[test]
    fn test_unknown_mode() {
        assert!("long".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::default(), OutputMode::Panel);
    }

    #[test]
    fn test_resolve_folder_precedence() {
        let root = Path::new("/data/virk");
        let flag = Some(PathBuf::from("/tmp/out"));
        let env = Some("/srv/fs".to_string());

        assert_eq!(
            resolve_folder(Dataset::Statements, flag, env.clone(), root),
            PathBuf::from("/tmp/out")
        );
        assert_eq!(
            resolve_folder(Dataset::Statements, None, env, root),
            PathBuf::from("/srv/fs")
        );
        assert_eq!(
            resolve_folder(Dataset::Statements, None, Some("  ".to_string()), root),
            PathBuf::from("/data/virk/financial_statements")
        );
    }
}
