//! First-run import of resident records from the JSON seed file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use mongodb::bson::{self, Document};
use serde_json::{Map, Value};

use crate::SeedError;
use crate::schema::translate_resident;
use crate::store::{DocumentStore, RESIDENTS, StoreError};

/// Identifier field of a seed record. It is not subject to translation and
/// becomes the stored `_id`.
pub const SOURCE_ID_FIELD: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Number of residents written (zero when no seed record had an id).
    Imported(usize),
    /// The collection already held this many residents; nothing was read.
    AlreadyPresent(u64),
    /// The seed file does not exist.
    SourceMissing(PathBuf),
    /// Another run inserted the same residents between our count and our write.
    LostRace,
}

impl std::fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportOutcome::Imported(n) => write!(f, "{n} residents imported"),
            ImportOutcome::AlreadyPresent(n) => {
                write!(f, "{n} residents already present, import skipped")
            }
            ImportOutcome::SourceMissing(path) => {
                write!(f, "Seed file not found: {}", path.display())
            }
            ImportOutcome::LostRace => {
                write!(f, "Residents imported concurrently by another run")
            }
        }
    }
}

/// Import residents from `path` unless the collection already has documents.
pub async fn ensure_residents_data(
    store: &dyn DocumentStore,
    path: &Path,
) -> Result<ImportOutcome, SeedError> {
    let existing = store.count(RESIDENTS).await?;
    if existing > 0 {
        tracing::info!(count = existing, "Residents already present, skipping import");
        return Ok(ImportOutcome::AlreadyPresent(existing));
    }

    if !path.is_file() {
        tracing::warn!(path = %path.display(), "Residents seed file not found, skipping import");
        return Ok(ImportOutcome::SourceMissing(path.to_path_buf()));
    }

    let documents = load_seed_documents(path).await?;
    if documents.is_empty() {
        tracing::info!(path = %path.display(), "No seed record carries an id, nothing to import");
        return Ok(ImportOutcome::Imported(0));
    }

    let imported = documents.len();
    match store.insert_many(RESIDENTS, documents).await {
        Ok(()) => {
            tracing::info!(count = imported, path = %path.display(), "Residents imported");
            Ok(ImportOutcome::Imported(imported))
        }
        Err(StoreError::DuplicateKey { .. }) => {
            tracing::warn!("Residents inserted concurrently by another run, skipping");
            Ok(ImportOutcome::LostRace)
        }
        Err(e) => Err(e.into()),
    }
}

/// Read and parse the seed file, returning storage-ready documents.
pub async fn load_seed_documents(path: &Path) -> Result<Vec<Document>, SeedError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: Value = serde_json::from_slice(&bytes).map_err(|source| SeedError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    normalize_documents(root)
}

/// Turn the parsed seed root (one object or an array of objects) into
/// resident documents.
///
/// Records without an `id` (or with a null one) are dropped. The rest are
/// translated to storage field names and keyed by the string form of their id.
pub fn normalize_documents(root: Value) -> Result<Vec<Document>, SeedError> {
    let records = match root {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut seen = HashSet::new();
    let mut documents = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(SeedError::MalformedSeed(format!(
                "record #{index} is not a JSON object"
            )));
        };
        // Take the id out before BSON conversion: it is stored as a string,
        // whatever its JSON shape.
        let mut id = None;
        let rest: Map<String, Value> = fields
            .into_iter()
            .filter_map(|(key, value)| {
                if key == SOURCE_ID_FIELD {
                    id = Some(value);
                    None
                } else {
                    Some((key, value))
                }
            })
            .collect();

        let Some(id) = id.as_ref().and_then(identifier_to_string) else {
            tracing::debug!(record = index, "Dropping seed record without id");
            continue;
        };
        if !seen.insert(id.clone()) {
            return Err(SeedError::MalformedSeed(format!(
                "duplicate id \"{id}\" (record #{index})"
            )));
        }

        let mut document = Document::new();
        document.insert("_id", id);
        for (key, value) in translate_resident(&bson::to_document(&rest)?) {
            document.insert(key, value);
        }
        documents.push(document);
    }
    Ok(documents)
}

/// String form of a seed identifier, `None` for a null id.
///
/// Strings are kept verbatim and numbers keep their JSON digits, so ids beyond
/// the 64-bit range survive. Booleans read `True` / `False`; arrays and
/// objects become their compact JSON text.
pub fn identifier_to_string(id: &Value) -> Option<String> {
    match id {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".to_owned()),
        Value::Bool(false) => Some("False".to_owned()),
        other => Some(other.to_string()),
    }
}
