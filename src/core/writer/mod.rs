//! Paginated schema-validating writer
//!
//! Records are accumulated in one envelope per category and written to a
//! numbered file every `nodes_per_file` records. Each envelope is checked
//! against the structural rules before anything touches the filesystem,
//! and files are written to a temporary name then renamed.

pub mod records;
pub mod schema;

pub use records::{
    GarRecord, GroupRecord, PupilRecord, ResponsibleRecord, SchoolRecord, TeacherRecord,
};

use crate::config::OutputConfig;
use crate::core::helper::CodeHelper;
use crate::domain::{GarError, Result};
use records::Envelope;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Run-wide output settings shared by every writer
#[derive(Debug, Clone)]
pub struct WriterSettings {
    pub directory: PathBuf,
    pub namespace: String,
    pub version: String,
    pub nodes_per_file: usize,
    pub dry_run: bool,
    /// Run timestamp embedded in file names
    pub timestamp: String,
}

impl WriterSettings {
    pub fn from_config(output: &OutputConfig, dry_run: bool, timestamp: impl Into<String>) -> Self {
        Self {
            directory: PathBuf::from(&output.directory),
            namespace: output.namespace.clone(),
            version: output.version.clone(),
            nodes_per_file: output.nodes_per_file.max(1),
            dry_run,
            timestamp: timestamp.into(),
        }
    }
}

/// One envelope handed to the filesystem (or planned, in dry run)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub category: String,
    pub page: usize,
    pub increment: usize,
    pub records: usize,
    pub bytes: usize,
    pub sha256: String,
    /// False in dry run
    pub written: bool,
}

/// Writer for one category and one page
///
/// Owned by exactly one builder pass; the node counter and the current
/// envelope are not shared.
pub struct PaginatedWriter<R: GarRecord> {
    helper: Arc<CodeHelper>,
    settings: Arc<WriterSettings>,
    page: usize,
    increment: usize,
    nodes: usize,
    records: Vec<R>,
    files: Vec<WrittenFile>,
}

impl<R: GarRecord> PaginatedWriter<R> {
    pub fn new(helper: Arc<CodeHelper>, settings: Arc<WriterSettings>, page: usize) -> Self {
        Self {
            helper,
            settings,
            page,
            increment: 1,
            nodes: 0,
            records: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Adds one record, writing the envelope when the threshold is reached
    ///
    /// # Errors
    ///
    /// A schema violation or an I/O failure is fatal for the run.
    pub async fn add(&mut self, record: R) -> Result<()> {
        self.records.push(record);
        self.nodes += 1;

        if self.nodes % self.settings.nodes_per_file == 0 {
            self.write_envelope().await?;
        }
        Ok(())
    }

    /// Writes the remainder and returns every file of this page
    ///
    /// An empty envelope is still written when the page produced no file,
    /// so each page always ends with one terminal file.
    pub async fn flush(mut self) -> Result<Vec<WrittenFile>> {
        if !self.records.is_empty() || self.files.is_empty() {
            self.write_envelope().await?;
        }
        Ok(self.files)
    }

    /// Records added so far
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Files written so far
    pub fn files(&self) -> &[WrittenFile] {
        &self.files
    }

    async fn write_envelope(&mut self) -> Result<()> {
        let file_name = self.helper.file_name(
            R::CATEGORY,
            &self.settings.timestamp,
            self.page,
            self.increment,
        );

        for (position, record) in self.records.iter().enumerate() {
            record.check().map_err(|message| GarError::Schema {
                file: file_name.clone(),
                message: format!("record {}: {}", position + 1, message),
            })?;
        }

        let envelope = Envelope {
            xmlns: &self.settings.namespace,
            version: &self.settings.version,
            records: &self.records,
        };
        let body = quick_xml::se::to_string_with_root(R::ROOT, &envelope).map_err(|e| {
            GarError::Serialization(format!("Failed to serialize {file_name}: {e}"))
        })?;
        let xml = format!("{XML_DECLARATION}{body}\n");
        let sha256 = format!("{:x}", Sha256::digest(xml.as_bytes()));

        let path = self.settings.directory.join(&file_name);
        if self.settings.dry_run {
            tracing::info!(
                file = %file_name,
                records = self.records.len(),
                "DRY RUN: Would write envelope"
            );
        } else {
            write_atomically(&path, xml.as_bytes()).await?;
            tracing::info!(
                file = %path.display(),
                records = self.records.len(),
                bytes = xml.len(),
                "Envelope written"
            );
        }

        self.files.push(WrittenFile {
            path,
            category: R::CATEGORY.to_string(),
            page: self.page,
            increment: self.increment,
            records: self.records.len(),
            bytes: xml.len(),
            sha256,
            written: !self.settings.dry_run,
        });
        self.records.clear();
        self.increment += 1;
        Ok(())
    }
}

async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            GarError::Io(format!(
                "Failed to create output directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    tokio::fs::write(&partial, contents)
        .await
        .map_err(|e| GarError::Io(format!("Failed to write {}: {}", partial.display(), e)))?;
    tokio::fs::rename(&partial, path).await.map_err(|e| {
        GarError::Io(format!(
            "Failed to move {} to {}: {}",
            partial.display(),
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndexConfig, IndexKind, ProfileConfig, RetryConfig};
    use crate::domain::entities::{Division, School};
    use tempfile::TempDir;

    fn helper() -> Arc<CodeHelper> {
        let index = IndexConfig {
            kind: IndexKind::File,
            base_url: None,
            path: Some("aaf.json".to_string()),
            username: None,
            password: None,
            timeout_seconds: 30,
            territory: "rennes".to_string(),
            alias_template: "{territory}-{object}".to_string(),
            agricultural_alias_template: "{territory}-agri-{object}".to_string(),
            agricultural_pattern: "agri".to_string(),
            code_field: "identifiant".to_string(),
            label_field: "libelle".to_string(),
            max_concurrent_queries: 4,
            retry: RetryConfig::default(),
        };
        Arc::new(
            CodeHelper::new(&ProfileConfig::default(), &index, &OutputConfig::default()).unwrap(),
        )
    }

    fn settings(dir: &TempDir, nodes_per_file: usize, dry_run: bool) -> Arc<WriterSettings> {
        Arc::new(WriterSettings {
            directory: dir.path().to_path_buf(),
            namespace: "http://data.education.fr/ns/gar".to_string(),
            version: "1.7".to_string(),
            nodes_per_file,
            dry_run,
            timestamp: "20260101_120000".to_string(),
        })
    }

    fn division(code: &str) -> GroupRecord {
        GroupRecord::Division(Division {
            uai: "0350063D".to_string(),
            code: code.to_string(),
            label: format!("Division {code}"),
        })
    }

    fn files_on_disk(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_intermediate_and_final_files() {
        let dir = TempDir::new().unwrap();
        let mut writer = PaginatedWriter::new(helper(), settings(&dir, 3, false), 1);

        for i in 0..7 {
            writer.add(division(&format!("D{i}"))).await.unwrap();
        }
        assert_eq!(writer.files().len(), 2);

        let files = writer.flush().await.unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(
            files.iter().map(|f| f.records).collect::<Vec<_>>(),
            vec![3, 3, 1]
        );
        assert_eq!(
            files_on_disk(&dir),
            vec![
                "Groupe_20260101_120000_1_1.xml",
                "Groupe_20260101_120000_1_2.xml",
                "Groupe_20260101_120000_1_3.xml",
            ]
        );
    }

    #[tokio::test]
    async fn test_exact_multiple_adds_no_terminal_file() {
        let dir = TempDir::new().unwrap();
        let mut writer = PaginatedWriter::new(helper(), settings(&dir, 2, false), 1);

        for i in 0..4 {
            writer.add(division(&format!("D{i}"))).await.unwrap();
        }
        let files = writer.flush().await.unwrap();
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_writer_writes_one_file() {
        let dir = TempDir::new().unwrap();
        let writer: PaginatedWriter<SchoolRecord> =
            PaginatedWriter::new(helper(), settings(&dir, 10, false), 2);

        let files = writer.flush().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].records, 0);

        let xml = std::fs::read_to_string(&files[0].path).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<GAR-ENT-Etab"));
        assert!(xml.contains("Version=\"1.7\""));
        assert!(files_on_disk(&dir)[0].ends_with("_2_1.xml"));
    }

    #[tokio::test]
    async fn test_envelope_content() {
        let dir = TempDir::new().unwrap();
        let mut writer = PaginatedWriter::new(helper(), settings(&dir, 10, false), 1);
        writer
            .add(SchoolRecord::School(School {
                uai: "0350063D".to_string(),
                name: "Collège Anne de Bretagne".to_string(),
                contract: Some("PU".to_string()),
                phone: None,
                mail: None,
            }))
            .await
            .unwrap();

        let files = writer.flush().await.unwrap();
        let xml = std::fs::read_to_string(&files[0].path).unwrap();
        assert!(xml.contains("xmlns=\"http://data.education.fr/ns/gar\""));
        assert!(xml.contains("<GAREtab>"));
        assert!(xml.contains("<GARStructureUAI>0350063D</GARStructureUAI>"));
        assert!(xml.contains("<GARStructureContrat>PU</GARStructureContrat>"));
        assert!(!xml.contains("GARStructureTelephone"));

        let digest = format!("{:x}", Sha256::digest(xml.as_bytes()));
        assert_eq!(files[0].sha256, digest);
    }

    #[tokio::test]
    async fn test_schema_violation_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut writer = PaginatedWriter::new(helper(), settings(&dir, 2, false), 1);

        writer.add(division("6A")).await.unwrap();
        let err = writer.add(division("  ")).await.unwrap_err();

        assert!(matches!(err, GarError::Schema { .. }));
        assert!(err.to_string().contains("record 2"));
        assert!(files_on_disk(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut writer = PaginatedWriter::new(helper(), settings(&dir, 1, true), 1);

        writer.add(division("6A")).await.unwrap();
        let files = writer.flush().await.unwrap();

        assert_eq!(files.len(), 1);
        assert!(!files[0].written);
        assert!(files_on_disk(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_still_validates() {
        let dir = TempDir::new().unwrap();
        let mut writer = PaginatedWriter::new(helper(), settings(&dir, 1, true), 1);
        assert!(writer.add(division("")).await.is_err());
    }
}
