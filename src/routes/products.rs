use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    errors::{bad_request, db_error, ApiRejection},
    models::{
        auth::AuthenticatedUser,
        product::{Product, ProductQuery, ProductRequest},
    },
    services::products::ProductService,
    AppState,
};

/// Largest accepted product image.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// GET /api/v1/products?search=
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiRejection> {
    ProductService::find(&state.db, query.search.as_deref())
        .await
        .map(Json)
        .map_err(db_error)
}

/// GET /api/v1/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiRejection> {
    ProductService::get(&state.db, id)
        .await
        .map(Json)
        .map_err(db_error)
}

/// POST /api/v1/products
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Value>), ApiRejection> {
    body.validate().map_err(bad_request)?;
    let product_id = ProductService::insert(&state.db, &body, &user.identity)
        .await
        .map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "product_id": product_id }))))
}

/// PUT /api/v1/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ProductRequest>,
) -> Result<Json<Product>, ApiRejection> {
    body.validate().map_err(bad_request)?;
    ProductService::edit(&state.db, id, &body)
        .await
        .map(Json)
        .map_err(db_error)
}

/// DELETE /api/v1/products/{id} (ADMIN)
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiRejection> {
    ProductService::delete(&state.db, id)
        .await
        .map_err(db_error)?;
    Ok(Json(json!({ "message": format!("product {id} deleted") })))
}

/// POST /api/v1/products/{id}/image, multipart field `image`.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<Product>, ApiRejection> {
    // 404 before touching the disk
    let previous = ProductService::get(&state.db, id).await.map_err(db_error)?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("File upload failed: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("File upload failed: {e}")))?;
        upload = Some((filename, bytes.to_vec()));
    }

    let (filename, bytes) = upload.ok_or_else(|| bad_request("Missing image field"))?;
    let ext = image_extension(&filename).ok_or_else(|| bad_request("File extension not supported"))?;
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(bad_request("File size cannot exceed 2MB"));
    }

    let relative = format!("image/product/{id}.{ext}");
    let target: PathBuf = FsPath::new(&state.config.static_dir).join(&relative);
    if let Some(dir) = target.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(io_error)?;
    }
    tokio::fs::write(&target, &bytes).await.map_err(io_error)?;

    let product = ProductService::set_image(&state.db, id, &relative)
        .await
        .map_err(db_error)?;

    if let Some(stale) = stale_image(previous.image.as_deref(), &relative) {
        let path = FsPath::new(&state.config.static_dir).join(stale);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("could not remove old image {}: {e}", path.display());
        }
    }

    Ok(Json(product))
}

/// The previous image path, if a new upload no longer overwrites it.
fn stale_image<'a>(previous: Option<&'a str>, current: &str) -> Option<&'a str> {
    previous.filter(|p| !p.is_empty() && *p != current)
}

/// Lower-cased extension if it is one we accept.
fn image_extension(filename: &str) -> Option<String> {
    let ext = FsPath::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn io_error(e: std::io::Error) -> ApiRejection {
    tracing::error!("image write failed: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "File upload failed" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("kopi.JPG").as_deref(), Some("jpg"));
        assert_eq!(image_extension("kopi.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(image_extension("a/b/kopi.png").as_deref(), Some("png"));
        assert_eq!(image_extension("kopi.gif"), None);
        assert_eq!(image_extension("kopi"), None);
        assert_eq!(image_extension(""), None);
    }

    #[test]
    fn test_stale_image_only_when_path_changes() {
        assert_eq!(
            stale_image(Some("image/product/7.png"), "image/product/7.jpg"),
            Some("image/product/7.png")
        );
        assert_eq!(stale_image(Some("image/product/7.jpg"), "image/product/7.jpg"), None);
        assert_eq!(stale_image(None, "image/product/7.jpg"), None);
        assert_eq!(stale_image(Some(""), "image/product/7.jpg"), None);
    }
}
