//! Gallery image management: uploads, titles, deletion, and re-adopting
//! bucket files that have no table row.

use std::path::Path;

use tracing::{info, warn};

use super::models::{Attachment, GalleryImage};
use crate::backend::LocalBackend;
use crate::errors::{BackendError, OfficeError};

pub const GALLERY_BUCKET: &str = "gallery";

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

fn is_image(file_name: &str) -> bool {
    mime_guess::from_path(file_name)
        .first()
        .is_some_and(|m| m.type_() == mime_guess::mime::IMAGE)
}

/// File name stem used as the default title.
fn title_from(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_string()
}

/// `<millis>_<name>` with everything outside `[A-Za-z0-9.-]` replaced.
fn storage_name(file_name: &str) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", chrono::Utc::now().timestamp_millis(), sanitized)
}

/// Upload an image and record it. Without an explicit `display_order` the
/// image goes after the current last one.
pub async fn upload_image(
    backend: &LocalBackend,
    file: Attachment,
    display_order: Option<i64>,
) -> Result<GalleryImage, OfficeError> {
    if file.bytes.is_empty() {
        return Err(OfficeError::MissingField("image file"));
    }
    if !is_image(&file.file_name) {
        return Err(OfficeError::UnsupportedFile(file.file_name));
    }

    let storage = backend.storage();
    let path = storage_name(&file.file_name);
    storage.upload(GALLERY_BUCKET, &path, &file.bytes).await?;
    let url = storage.public_url(GALLERY_BUCKET, &path);
    let title = title_from(&file.file_name);

    let row_path = path.clone();
    let result = backend
        .db()
        .call(move |db| {
            let order = match display_order {
                Some(order) => order,
                None => db.max_gallery_order()? + 1,
            };
            db.insert_gallery_image(&title, &row_path, &url, order)
        })
        .await;

    match result {
        Ok(image) => {
            info!(id = %image.id, path = %image.storage_path, "Gallery image uploaded");
            Ok(image)
        }
        Err(e) => {
            if let Err(cleanup) = storage.delete(GALLERY_BUCKET, &path).await {
                warn!(path = %path, error = %cleanup, "Failed to remove orphaned gallery file");
            }
            Err(BackendError::Database(e).into())
        }
    }
}

pub async fn list_images(backend: &LocalBackend) -> Result<Vec<GalleryImage>, OfficeError> {
    backend
        .db()
        .call(|db| db.list_gallery_images())
        .await
        .map_err(|e| BackendError::Database(e).into())
}

pub async fn rename_image(
    backend: &LocalBackend,
    id: &str,
    title: &str,
) -> Result<GalleryImage, OfficeError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(OfficeError::MissingField("title"));
    }
    let image_id = id.to_string();
    let updated = backend
        .db()
        .call(move |db| db.update_gallery_title(&image_id, &title))
        .await
        .map_err(BackendError::Database)?;
    updated.ok_or_else(|| {
        BackendError::NotFound {
            table: "gallery_images",
            id: id.to_string(),
        }
        .into()
    })
}

/// Delete the stored file, then the row.
pub async fn delete_image(backend: &LocalBackend, id: &str) -> Result<(), OfficeError> {
    let image_id = id.to_string();
    let image = backend
        .db()
        .call(move |db| db.get_gallery_image(&image_id))
        .await
        .map_err(BackendError::Database)?
        .ok_or_else(|| BackendError::NotFound {
            table: "gallery_images",
            id: id.to_string(),
        })?;

    let existed = backend
        .storage()
        .delete(GALLERY_BUCKET, &image.storage_path)
        .await?;
    if !existed {
        warn!(path = %image.storage_path, "Gallery file already missing from storage");
    }

    let image_id = image.id.clone();
    backend
        .db()
        .call(move |db| db.delete_gallery_image(&image_id))
        .await
        .map_err(BackendError::Database)?;
    info!(id = %image.id, "Gallery image deleted");
    Ok(())
}

/// Add a row for every image file in the bucket that has none. Returns the
/// new rows.
pub async fn sync_from_storage(backend: &LocalBackend) -> Result<Vec<GalleryImage>, OfficeError> {
    let files = backend.storage().list(GALLERY_BUCKET).await?;
    let images: Vec<String> = files
        .into_iter()
        .filter(|name| {
            Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();

    let urls: Vec<(String, String)> = images
        .into_iter()
        .map(|name| {
            let url = backend.storage().public_url(GALLERY_BUCKET, &name);
            (name, url)
        })
        .collect();

    let added = backend
        .db()
        .call(move |db| {
            let known = db.list_gallery_images()?;
            let mut order = db.max_gallery_order()?;
            let mut added = Vec::new();
            for (name, url) in urls {
                if known.iter().any(|img| img.storage_path == name) {
                    continue;
                }
                order += 1;
                added.push(db.insert_gallery_image(&title_from(&name), &name, &url, order)?);
            }
            Ok(added)
        })
        .await
        .map_err(BackendError::Database)?;

    if !added.is_empty() {
        info!(count = added.len(), "Synced gallery files into the table");
    }
    Ok(added)
}
