//! Loan-type and application-type lists maintained by the admin.

use tracing::info;

use super::models::{CatalogEntry, CatalogKind};
use crate::backend::LocalBackend;
use crate::errors::{BackendError, OfficeError};

fn clean_name(name: &str) -> Result<String, OfficeError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OfficeError::MissingField("name"));
    }
    Ok(name.to_string())
}

fn not_found(kind: CatalogKind, id: &str) -> OfficeError {
    BackendError::NotFound {
        table: kind.table(),
        id: id.to_string(),
    }
    .into()
}

pub async fn list_entries(
    backend: &LocalBackend,
    kind: CatalogKind,
) -> Result<Vec<CatalogEntry>, OfficeError> {
    backend
        .db()
        .call(move |db| db.list_catalog_entries(kind))
        .await
        .map_err(|e| BackendError::Database(e).into())
}

/// Add an entry under its trimmed name.
pub async fn create_entry(
    backend: &LocalBackend,
    kind: CatalogKind,
    name: &str,
) -> Result<CatalogEntry, OfficeError> {
    let name = clean_name(name)?;
    let entry = backend
        .db()
        .call(move |db| db.insert_catalog_entry(kind, &name))
        .await
        .map_err(BackendError::Database)?;
    info!(kind = kind.label(), id = %entry.id, name = %entry.name, "Catalog entry created");
    Ok(entry)
}

pub async fn rename_entry(
    backend: &LocalBackend,
    kind: CatalogKind,
    id: &str,
    name: &str,
) -> Result<CatalogEntry, OfficeError> {
    let name = clean_name(name)?;
    let entry_id = id.to_string();
    backend
        .db()
        .call(move |db| db.rename_catalog_entry(kind, &entry_id, &name))
        .await
        .map_err(BackendError::Database)?
        .ok_or_else(|| not_found(kind, id))
}

pub async fn delete_entry(
    backend: &LocalBackend,
    kind: CatalogKind,
    id: &str,
) -> Result<(), OfficeError> {
    let entry_id = id.to_string();
    let deleted = backend
        .db()
        .call(move |db| db.delete_catalog_entry(kind, &entry_id))
        .await
        .map_err(BackendError::Database)?;
    if !deleted {
        return Err(not_found(kind, id));
    }
    info!(kind = kind.label(), id, "Catalog entry deleted");
    Ok(())
}
