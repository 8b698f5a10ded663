use crate::models::ExtractionMetadata;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Minimal handle on a document in the review queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: String,
}

impl DocumentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Reviewer decision on a single extracted field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Flagged,
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldStatus::Pending => "pending",
            FieldStatus::Approved => "approved",
            FieldStatus::Rejected => "rejected",
            FieldStatus::Flagged => "flagged",
        };
        f.write_str(label)
    }
}

/// One AI-extracted field awaiting review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewField {
    pub name: String,
    pub value: String,
    /// Page the value was read from, for jump-to-source
    #[serde(default)]
    pub source_page: Option<u32>,
}

/// A document in the review queue with its extraction metadata and fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDocument {
    pub id: String,
    pub name: String,
    pub metadata: ExtractionMetadata,
    #[serde(default)]
    pub fields: Vec<ReviewField>,
}

impl ReviewDocument {
    pub fn to_ref(&self) -> DocumentRef {
        DocumentRef::new(self.id.clone())
    }
}

/// Manifest entries that would make two decisions share one slot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Document id '{0}' appears more than once")]
    DuplicateDocument(String),

    #[error("Field '{field}' appears more than once in document '{document}'")]
    DuplicateField { document: String, field: String },
}

/// Document manifest (`ReviewFlow Documents.yaml`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DocumentManifest {
    #[serde(default)]
    pub documents: Vec<ReviewDocument>,
}

impl DocumentManifest {
    /// Decisions are keyed by document id and field name, so both must be unique
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut ids = HashSet::new();
        for document in &self.documents {
            if !ids.insert(document.id.as_str()) {
                return Err(ManifestError::DuplicateDocument(document.id.clone()));
            }
            let mut names = HashSet::new();
            for field in &document.fields {
                if !names.insert(field.name.as_str()) {
                    return Err(ManifestError::DuplicateField {
                        document: document.id.clone(),
                        field: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The reviewer's decisions on one document.
///
/// Decisions keep manifest field order when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReviewDraft {
    pub document_id: String,
    pub decisions: IndexMap<String, FieldStatus>,
}

impl ReviewDraft {
    /// Fresh draft with every field pending
    pub fn for_document(document: &ReviewDocument) -> Self {
        Self {
            document_id: document.id.clone(),
            decisions: document
                .fields
                .iter()
                .map(|f| (f.name.clone(), FieldStatus::Pending))
                .collect(),
        }
    }

    /// Number of fields that still need a decision
    pub fn pending_count(&self) -> usize {
        self.decisions
            .values()
            .filter(|s| **s == FieldStatus::Pending)
            .count()
    }
}

/// Everything autosave persists for a review session: one draft per document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReviewSnapshot {
    #[serde(default)]
    pub drafts: IndexMap<String, ReviewDraft>,
}

impl ReviewSnapshot {
    /// Fresh snapshot with every field of every document pending
    pub fn for_documents(documents: &[ReviewDocument]) -> Self {
        Self {
            drafts: documents
                .iter()
                .map(|d| (d.id.clone(), ReviewDraft::for_document(d)))
                .collect(),
        }
    }

    /// Merge decisions from a previously persisted snapshot.
    ///
    /// Only documents and fields that still exist are carried over.
    pub fn restore_from(&mut self, saved: &ReviewSnapshot) {
        for (doc_id, draft) in &mut self.drafts {
            let Some(saved_draft) = saved.drafts.get(doc_id) else {
                continue;
            };
            for (field, status) in &mut draft.decisions {
                if let Some(saved_status) = saved_draft.decisions.get(field) {
                    *status = *saved_status;
                }
            }
        }
    }

    pub fn draft(&self, document_id: &str) -> Option<&ReviewDraft> {
        self.drafts.get(document_id)
    }

    /// Record a decision. Returns true if the stored status changed.
    pub fn set_status(&mut self, document_id: &str, field: &str, status: FieldStatus) -> bool {
        let Some(slot) = self
            .drafts
            .get_mut(document_id)
            .and_then(|d| d.decisions.get_mut(field))
        else {
            return false;
        };
        if *slot == status {
            return false;
        }
        *slot = status;
        true
    }

    pub fn pending_count(&self) -> usize {
        self.drafts.values().map(ReviewDraft::pending_count).sum()
    }
}
