//! Review-comment notifications built from a compare document.
//!
//! The compare API of the code-hosting service returns the commits and the
//! changed files between two revisions. [`CommentNotification`] combines that
//! document with a comment on one line of one file and produces the chat
//! message announcing it: who commented, on whose change, a link to the line,
//! and the highlighted excerpt.
use crate::{HighlightError, HighlightOptions, PatchAnnotator};
use log::{debug, info};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// --- Error Types ---

/// Represents errors that can occur while composing a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The file change carries no textual patch, which is the case for binary
    /// files and for diffs too large to be inlined.
    #[error("File '{filename}' has no textual patch")]
    MissingPatch { filename: String },
    /// No file with the given name is part of the comparison.
    #[error("File '{0}' is not part of the comparison")]
    UnknownFile(String),
    /// The comparison lists no commits, so there is no author to credit.
    #[error("The comparison contains no commits")]
    NoCommits,
    /// The commented line cannot be highlighted.
    #[error(transparent)]
    Highlight(#[from] HighlightError),
}

/// Represents errors that can occur while loading a compare document.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The document could not be read.
    #[error("I/O error while reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The document is not a valid compare response.
    #[error("Invalid compare document {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// --- Data Structures ---

/// A user account of the code-hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub login: String,
    /// The display name, which users may leave unset.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Account {
    /// The name to show for this account: its display name if set, its login otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use diffnote::Account;
    /// let account = Account { login: "octocat".to_string(), ..Default::default() };
    /// assert_eq!(account.display_name(), "octocat");
    /// ```
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.login)
    }
}

/// The git-level author of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
}

/// The git-level data of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetail {
    pub author: Signature,
}

/// One commit of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// The account the commit is attributed to. Absent when the author's email
    /// is not linked to any account.
    #[serde(default)]
    pub author: Option<Account>,
    pub commit: CommitDetail,
}

/// One changed file of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub filename: String,
    pub blob_url: String,
    /// The unified-diff hunks of the change. Absent for binary files.
    #[serde(default)]
    pub patch: Option<String>,
}

impl FileChange {
    /// Builds the annotator for this file's patch.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingPatch`] if the file has no textual patch.
    pub fn annotate(&self) -> Result<PatchAnnotator, NotifyError> {
        self.annotate_with(HighlightOptions::default())
    }

    /// Builds the annotator for this file's patch with explicit options.
    pub fn annotate_with(&self, options: HighlightOptions) -> Result<PatchAnnotator, NotifyError> {
        let patch = self
            .patch
            .as_deref()
            .ok_or_else(|| NotifyError::MissingPatch {
                filename: self.filename.clone(),
            })?;
        Ok(PatchAnnotator::with_options(patch, options))
    }

    /// A link to `head_line` in the head version of the file.
    ///
    /// # Example
    ///
    /// ```
    /// # use diffnote::FileChange;
    /// let file = FileChange {
    ///     filename: "src/app.js".to_string(),
    ///     blob_url: "https://example.com/blob/abc/src/app.js".to_string(),
    ///     patch: None,
    /// };
    /// assert_eq!(file.deep_link(75), "https://example.com/blob/abc/src/app.js#L75");
    /// ```
    pub fn deep_link(&self, head_line: usize) -> String {
        format!("{}#L{}", self.blob_url, head_line)
    }
}

/// The response of the compare API for two revisions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompareDiff {
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

impl CompareDiff {
    /// Parses a compare document. Fields this crate does not use are ignored.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads and parses a compare document from disk.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let diff = Self::from_json(&content).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "Loaded compare document {:?}: {} commit(s), {} file(s).",
            path,
            diff.commits.len(),
            diff.files.len()
        );
        Ok(diff)
    }

    /// Finds a changed file by name.
    pub fn file(&self, filename: &str) -> Option<&FileChange> {
        self.files.iter().find(|file| file.filename == filename)
    }
}

/// Builds the annotators of many files.
///
/// With the `parallel` feature the files are processed on the rayon thread
/// pool. The result has one entry per file, in input order.
pub fn annotate_files(files: &[FileChange]) -> Vec<Result<PatchAnnotator, NotifyError>> {
    #[cfg(feature = "parallel")]
    let annotators: Vec<_> = files.par_iter().map(FileChange::annotate).collect();
    #[cfg(not(feature = "parallel"))]
    let annotators: Vec<_> = files.iter().map(FileChange::annotate).collect();

    debug!("Annotated {} file(s).", annotators.len());
    annotators
}

// --- Message Composition ---

/// A review comment on one line of a comparison.
#[derive(Debug, Clone, Copy)]
pub struct CommentNotification<'a> {
    /// Who wrote the comment.
    pub reviewer: &'a Account,
    pub diff: &'a CompareDiff,
    pub file: &'a FileChange,
    /// The 0-based index of the commented line in the file's patch.
    pub line: usize,
    /// The comment, in chat markdown.
    pub text: &'a str,
}

impl<'a> CommentNotification<'a> {
    /// Creates a notification for a comment on `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::UnknownFile`] if `filename` is not part of `diff`.
    pub fn for_file(
        reviewer: &'a Account,
        diff: &'a CompareDiff,
        filename: &str,
        line: usize,
        text: &'a str,
    ) -> Result<Self, NotifyError> {
        let file = diff
            .file(filename)
            .ok_or_else(|| NotifyError::UnknownFile(filename.to_string()))?;
        Ok(CommentNotification {
            reviewer,
            diff,
            file,
            line,
            text,
        })
    }

    /// Builds the chat message as a list of layout blocks.
    ///
    /// The message has a context row with the reviewer and the author of the
    /// first commit, the comment, a divider, a link to the commented line in
    /// the head version, and the excerpt in a code block. Avatars that are
    /// unknown are left out of the context row.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::MissingPatch`] if the file has no textual patch.
    /// - [`NotifyError::Highlight`] if the line cannot be highlighted.
    /// - [`NotifyError::NoCommits`] if the comparison has no commits.
    pub fn to_message(&self, options: &HighlightOptions) -> Result<Value, NotifyError> {
        let annotator = self.file.annotate_with(*options)?;
        let code = annotator.highlight(self.line)?;
        let head_line = annotator.head_line(self.line)?;

        let commit = self.diff.commits.first().ok_or(NotifyError::NoCommits)?;
        let author_name = commit.commit.author.name.as_str();
        let author_avatar = commit
            .author
            .as_ref()
            .and_then(|author| author.avatar_url.as_deref());

        let mut people = Vec::new();
        push_person(
            &mut people,
            self.reviewer.display_name(),
            self.reviewer.avatar_url.as_deref(),
        );
        push_person(&mut people, author_name, author_avatar);

        info!(
            "Composed notification for {} line {} (head line {}).",
            self.file.filename, self.line, head_line
        );

        Ok(json!({
            "blocks": [
                {
                    "type": "context",
                    "elements": people,
                },
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": self.text,
                    },
                },
                {
                    "type": "divider",
                },
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": format!(
                            "<{}|{}>",
                            self.file.deep_link(head_line),
                            self.file.filename
                        ),
                    },
                },
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": format!("```{}```", code),
                    },
                },
            ],
        }))
    }
}

fn push_person(elements: &mut Vec<Value>, name: &str, avatar_url: Option<&str>) {
    if let Some(url) = avatar_url {
        elements.push(json!({
            "type": "image",
            "image_url": url,
            "alt_text": name,
        }));
    }
    elements.push(json!({
        "type": "plain_text",
        "text": name,
    }));
}
