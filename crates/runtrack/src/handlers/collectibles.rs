//! Collectible item handlers: listing, creation, and CSV bulk import.

use axum::{
    Extension,
    extract::Multipart,
    response::Json,
};
use axum_extra::headers::{ContentType, HeaderMapExt, Mime};
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    collectible_import::{self, RejectedRow},
    database::Database,
    errors::AppError,
    geodesic,
    models::CollectibleItem,
};

/// Collectible creation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCollectibleRequest {
    pub name: String,
    pub uid: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub value: i32,
}

/// Bulk import report.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub rejected: Vec<RejectedRow>,
}

/// List all collectible items.
#[utoipa::path(
    get,
    path = "/collectibles",
    tag = "collectibles",
    responses(
        (status = 200, description = "All collectible items", body = Vec<CollectibleItem>)
    )
)]
pub async fn list_collectibles(
    Extension(db): Extension<Database>,
) -> Result<Json<Vec<CollectibleItem>>, AppError> {
    let items = db.all_collectibles().await?;
    Ok(Json(items))
}

/// Create one collectible item.
#[utoipa::path(
    post,
    path = "/collectibles",
    tag = "collectibles",
    request_body = CreateCollectibleRequest,
    responses(
        (status = 200, description = "Collectible created", body = CollectibleItem),
        (status = 400, description = "Out-of-range coordinates")
    )
)]
pub async fn create_collectible(
    Extension(db): Extension<Database>,
    Json(req): Json<CreateCollectibleRequest>,
) -> Result<Json<CollectibleItem>, AppError> {
    geodesic::validate_latitude(req.latitude)?;
    geodesic::validate_longitude(req.longitude)?;
    if req.name.is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    if req.uid.is_empty() {
        return Err(AppError::Validation("uid must not be empty".to_string()));
    }

    let item = CollectibleItem {
        id: Uuid::new_v4(),
        name: req.name,
        uid: req.uid,
        latitude: geodesic::round_coordinate(req.latitude, 4),
        longitude: geodesic::round_coordinate(req.longitude, 4),
        picture: req.picture,
        value: req.value,
    };
    db.create_collectible(&item).await?;

    Ok(Json(item))
}

/// Bulk-import collectibles from an uploaded CSV file.
///
/// Rows with malformed values or out-of-range coordinates are reported back;
/// rows whose uid already exists are counted as duplicates.
#[utoipa::path(
    post,
    path = "/collectibles/upload",
    tag = "collectibles",
    request_body(content_type = "multipart/form-data", description = "CSV file upload"),
    responses(
        (status = 200, description = "Import report", body = ImportReport),
        (status = 400, description = "No file provided or unreadable CSV")
    )
)]
pub async fn upload_collectibles(
    Extension(db): Extension<Database>,
    mut multipart: Multipart,
) -> Result<Json<ImportReport>, AppError> {
    let mut file_bytes = BytesMut::new();
    let mut mime_hdr = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("Failed to process multipart data".to_string()))?
    {
        if field.name() == Some("file") {
            mime_hdr = field.headers().typed_get::<ContentType>();
            let chunk = field
                .bytes()
                .await
                .map_err(|_| AppError::Validation("Failed to read file data".to_string()))?;
            file_bytes.extend(chunk);
        } else {
            tracing::warn!("Unexpected field: {:?}", field.name());
        }
    }

    if file_bytes.is_empty() {
        return Err(AppError::Validation("No file provided".to_string()));
    }

    if let Some(ct) = mime_hdr {
        let mime = Mime::from(ct);
        let subtype = mime.subtype().as_str();
        if subtype != "csv" && subtype != "plain" && subtype != "octet-stream" {
            return Err(AppError::Validation(format!(
                "unsupported content type {mime}, expected CSV"
            )));
        }
    }

    let parsed = collectible_import::parse_collectible_csv(&file_bytes)?;

    let items: Vec<CollectibleItem> = parsed
        .rows
        .into_iter()
        .map(|row| CollectibleItem {
            id: Uuid::new_v4(),
            name: row.name,
            uid: row.uid,
            latitude: geodesic::round_coordinate(row.latitude, 4),
            longitude: geodesic::round_coordinate(row.longitude, 4),
            picture: row.picture,
            value: row.value,
        })
        .collect();

    // One transaction for the whole batch: an error commits nothing.
    let (imported, skipped_duplicates) = db.import_collectibles(&items).await?;

    Ok(Json(ImportReport {
        imported,
        skipped_duplicates,
        rejected: parsed.rejected,
    }))
}
