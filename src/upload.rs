//! Upload coordinator: validate, package and send a file selection
//!
//! Validation runs entirely on the client and collects every violated rule
//! before any network call. A successful upload hands the server's session
//! and full history to the [`SessionStore`]; a failed one leaves the store
//! untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use crate::config::UploadConfig;
use crate::error::{GatewayError, PortalError, ValidationError};
use crate::gateway::{Endpoint, Gateway, Payload};
use crate::session::SessionStore;
use crate::types::{ConversationHistory, SessionId, TurnResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum FileSource {
    Path(PathBuf),
    Memory(Bytes),
}

/// One selected file: its name, size, and where its bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// File name as shown to the user and sent to the server
    pub name: String,
    /// Size in bytes
    pub size: u64,
    source: FileSource,
}

impl SelectedFile {
    /// A file held in memory
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            source: FileSource::Memory(data),
        }
    }

    /// A file on disk; only its metadata is read here.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the path has no metadata or no file name.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                )
            })?;

        Ok(Self {
            name,
            size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Lowercased extension including the leading dot, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
    }

    /// Read the file contents
    pub async fn read(&self) -> std::io::Result<Bytes> {
        match &self.source {
            FileSource::Memory(data) => Ok(data.clone()),
            FileSource::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
        }
    }
}

/// Ordered sequence of selected files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelection {
    files: Vec<SelectedFile>,
}

impl FileSelection {
    /// Wrap a list of files, keeping their order
    pub fn new(files: Vec<SelectedFile>) -> Self {
        Self { files }
    }

    /// Build a selection from paths on disk
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> std::io::Result<Self> {
        let files = paths
            .iter()
            .map(SelectedFile::from_path)
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self { files })
    }

    /// The selected files
    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    /// Selected file names, in order
    pub fn names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Check a selection against the upload rules.
///
/// Returns every violated rule; an empty vector means the selection is
/// acceptable.
///
/// # Examples
///
/// ```
/// use docportal::config::UploadConfig;
/// use docportal::upload::{validate, FileSelection, SelectedFile};
///
/// let selection = FileSelection::new(vec![SelectedFile::from_bytes("report.pdf", vec![1u8; 64])]);
/// assert!(validate(&selection, &UploadConfig::default()).is_empty());
/// ```
pub fn validate(selection: &FileSelection, rules: &UploadConfig) -> Vec<ValidationError> {
    if selection.is_empty() {
        return vec![ValidationError::Empty];
    }

    let mut errors = Vec::new();
    if selection.len() > rules.max_files {
        errors.push(ValidationError::TooManyFiles {
            count: selection.len(),
            max: rules.max_files,
        });
    }

    for file in selection.files() {
        let allowed = file.extension().map_or(false, |ext| {
            rules
                .allowed_extensions
                .iter()
                .any(|a| a.eq_ignore_ascii_case(&ext))
        });
        if !allowed {
            errors.push(ValidationError::UnsupportedExtension {
                name: file.name.clone(),
                allowed: rules.allowed_extensions.join(", "),
            });
        }

        if file.size == 0 {
            errors.push(ValidationError::EmptyFile {
                name: file.name.clone(),
            });
        } else if file.size > rules.max_file_size_bytes {
            errors.push(ValidationError::FileTooLarge {
                name: file.name.clone(),
                size: file.size,
                max: rules.max_file_size_bytes,
            });
        }
    }

    errors
}

/// Validate `selection` and package it under `field` for transfer.
///
/// # Errors
///
/// [`PortalError::Validation`] if any rule is violated, [`PortalError::Io`] if
/// a file cannot be read.
pub async fn package(
    selection: &FileSelection,
    field: &str,
    rules: &UploadConfig,
) -> Result<Payload, PortalError> {
    let errors = validate(selection, rules);
    if !errors.is_empty() {
        return Err(PortalError::Validation(errors));
    }

    let mut payload = Payload::empty();
    for file in selection.files() {
        let data = file.read().await?;
        payload = payload.with_file(field, &file.name, data);
    }
    Ok(payload)
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    /// Session now active
    pub session: SessionId,
    /// Full, authoritative history of that session
    pub history: ConversationHistory,
    /// Names of the stored files
    pub uploaded_filenames: Vec<String>,
    /// Answer, when the upload carried a question
    pub latest_answer: Option<String>,
}

/// Sends file selections to the qa-turn endpoint and adopts the result.
#[derive(Debug, Clone)]
pub struct UploadCoordinator {
    gateway: Arc<dyn Gateway>,
    store: SessionStore,
    rules: UploadConfig,
}

impl UploadCoordinator {
    /// Create a coordinator sharing `gateway` and `store`
    pub fn new(gateway: Arc<dyn Gateway>, store: SessionStore, rules: UploadConfig) -> Self {
        Self {
            gateway,
            store,
            rules,
        }
    }

    /// Rules the coordinator enforces
    pub fn rules(&self) -> &UploadConfig {
        &self.rules
    }

    /// Check a selection without sending it
    pub fn validate(&self, selection: &FileSelection) -> Vec<ValidationError> {
        validate(selection, &self.rules)
    }

    /// Upload `selection` into a (new) session
    pub async fn upload(&self, selection: &FileSelection) -> Result<UploadOutcome, PortalError> {
        self.send(selection, None).await
    }

    /// Upload `selection` and ask `question` in the same request
    pub async fn upload_with_question(
        &self,
        selection: &FileSelection,
        question: &str,
    ) -> Result<UploadOutcome, PortalError> {
        self.send(selection, Some(question)).await
    }

    async fn send(
        &self,
        selection: &FileSelection,
        question: Option<&str>,
    ) -> Result<UploadOutcome, PortalError> {
        let mut payload = package(selection, "files", &self.rules).await?;
        if let Some(question) = question {
            payload = payload.with_field("question", question);
        }

        tracing::info!(files = selection.len(), "Uploading documents");
        let envelope = self.gateway.call(Endpoint::QaTurn, payload).await?;
        let result: TurnResult = envelope.into_result()?;
        let session = result.session.ok_or_else(|| {
            GatewayError::Protocol("upload response without a session".to_string())
        })?;

        self.store
            .adopt(Some(session.clone()), result.conversation_history.clone());
        tracing::info!(session = %session, "Upload adopted");

        let uploaded_filenames = if result.uploaded_files.is_empty() {
            selection.names()
        } else {
            result.uploaded_files
        };

        Ok(UploadOutcome {
            session,
            history: result.conversation_history,
            uploaded_filenames,
            latest_answer: result.latest_answer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_file, temp_dir};

    fn file(name: &str, size: usize) -> SelectedFile {
        SelectedFile::from_bytes(name, vec![b'x'; size])
    }

    fn selection(files: Vec<SelectedFile>) -> FileSelection {
        FileSelection::new(files)
    }

    #[test]
    fn test_valid_selection_has_no_errors() {
        let rules = UploadConfig::default();
        let sel = selection(vec![
            file("a.pdf", 10),
            file("b.DOCX", 10),
            file("c.doc", 10),
            file("d.txt", 10),
            file("e.pdf", 10),
        ]);
        assert!(validate(&sel, &rules).is_empty());
    }

    #[test]
    fn test_file_at_exact_size_limit_is_valid() {
        let rules = UploadConfig {
            max_file_size_bytes: 16,
            ..UploadConfig::default()
        };
        assert!(validate(&selection(vec![file("a.txt", 16)]), &rules).is_empty());
    }

    #[test]
    fn test_empty_selection() {
        assert_eq!(
            validate(&FileSelection::default(), &UploadConfig::default()),
            vec![ValidationError::Empty]
        );
    }

    #[test]
    fn test_all_violations_are_collected() {
        let rules = UploadConfig {
            max_files: 2,
            max_file_size_bytes: 8,
            ..UploadConfig::default()
        };
        let sel = selection(vec![
            file("big.pdf", 9),
            file("image.png", 1),
            file("blank.txt", 0),
        ]);

        let errors = validate(&sel, &rules);
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::TooManyFiles { count: 3, max: 2 }));
        assert!(errors.contains(&ValidationError::FileTooLarge {
            name: "big.pdf".to_string(),
            size: 9,
            max: 8
        }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnsupportedExtension { name, .. } if name == "image.png")));
        assert!(errors.contains(&ValidationError::EmptyFile {
            name: "blank.txt".to_string()
        }));
    }

    #[test]
    fn test_file_without_extension_is_unsupported() {
        let errors = validate(&selection(vec![file("README", 3)]), &UploadConfig::default());
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::UnsupportedExtension { .. }]
        ));
    }

    #[test]
    fn test_from_path_reads_metadata() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "notes.txt", "hello");
        let selected = SelectedFile::from_path(&path).unwrap();
        assert_eq!(selected.name, "notes.txt");
        assert_eq!(selected.size, 5);
        assert_eq!(selected.extension().as_deref(), Some(".txt"));
    }

    #[test]
    fn test_from_paths_missing_file_errors() {
        let result = FileSelection::from_paths(&["/nonexistent/docportal/a.pdf"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_package_reads_file_contents() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "notes.txt", "hello");
        let sel = FileSelection::from_paths(&[path]).unwrap();

        let payload = package(&sel, "files_a", &UploadConfig::default())
            .await
            .unwrap();
        assert_eq!(payload.files.len(), 1);
        assert_eq!(payload.files[0].field, "files_a");
        assert_eq!(payload.files[0].file_name, "notes.txt");
        assert_eq!(payload.files[0].data, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_package_rejects_invalid_selection() {
        let result = package(&FileSelection::default(), "files", &UploadConfig::default()).await;
        assert!(matches!(result, Err(PortalError::Validation(errors)) if errors == vec![ValidationError::Empty]));
    }
}
