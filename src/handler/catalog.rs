//! Catalog endpoints
//!
//! Cameras and accessories share one set of handlers. The router mounts
//! them twice and tags each mount with its [`Category`] through an
//! [`Extension`], so `/api/cameras/...` and `/api/accessories/...` only
//! ever see their own table.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AdminClaims;
use crate::database::{self, AppState};
use crate::error::{AppError, AppResult};
use crate::model::{CatalogItem, CatalogItemInput, Category};

#[derive(Serialize, Debug)]
pub struct DeletedResponse {
    pub message: String,
}

fn not_found(category: Category) -> AppError {
    AppError::NotFound(format!("{} not found", category.label()))
}

/// Lists every item of the category, oldest first
pub async fn list_items(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    Ok(Json(database::list_items(&state.db, category)?))
}

pub async fn get_item(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    Path(id): Path<String>,
) -> AppResult<Json<CatalogItem>> {
    database::get_item(&state.db, category, &id)?
        .map(Json)
        .ok_or_else(|| not_found(category))
}

/// Adds an item to the catalog (admin only)
///
/// # Response
///
/// - **201 Created** - the stored item, with generated `_id`
/// - **400 Bad Request** - missing name, non-positive price, or an offer
///   price that is not below the regular price
/// - **401 Unauthorized** - missing or invalid bearer token
pub async fn create_item(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    admin: AdminClaims,
    payload: Result<Json<CatalogItemInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CatalogItem>)> {
    let Json(input) = payload?;
    input.check().map_err(AppError::Validation)?;

    let item = CatalogItem::new(Uuid::new_v4().to_string(), category, input);
    database::put_item(&state.db, &item)?;

    tracing::info!(admin = %admin.sub, category = category.label(), id = %item.id, name = %item.name, "Catalog item created");
    Ok((StatusCode::CREATED, Json(item)))
}

/// Replaces an item's editable fields (admin only)
pub async fn update_item(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    admin: AdminClaims,
    Path(id): Path<String>,
    payload: Result<Json<CatalogItemInput>, JsonRejection>,
) -> AppResult<Json<CatalogItem>> {
    let Json(input) = payload?;
    input.check().map_err(AppError::Validation)?;

    let mut item = database::get_item(&state.db, category, &id)?.ok_or_else(|| not_found(category))?;
    item.apply(input);
    database::put_item(&state.db, &item)?;

    tracing::info!(admin = %admin.sub, category = category.label(), id = %item.id, "Catalog item updated");
    Ok(Json(item))
}

/// Removes an item (admin only)
///
/// Bookings that reference the item keep the id; it is skipped when they
/// are populated.
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(category): Extension<Category>,
    admin: AdminClaims,
    Path(id): Path<String>,
) -> AppResult<Json<DeletedResponse>> {
    if !database::delete_item(&state.db, category, &id)? {
        return Err(not_found(category));
    }

    tracing::info!(admin = %admin.sub, category = category.label(), %id, "Catalog item deleted");
    Ok(Json(DeletedResponse {
        message: format!("{} deleted", category.label()),
    }))
}
