//! Store management handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ecopoints_core::{Store, StoreId};

use crate::error::ApiError;
use crate::handlers::products::ProductResponse;
use crate::state::AppState;

/// Store response.
#[derive(Debug, Serialize)]
pub struct StoreResponse {
    /// Store ID.
    pub id: String,
    /// Store name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Registration timestamp.
    pub created_at: String,
}

impl From<&Store> for StoreResponse {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id.to_string(),
            name: store.name.clone(),
            address: store.address.clone(),
            created_at: store.created_at.to_rfc3339(),
        }
    }
}

/// Create store request.
#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    /// Store name.
    pub name: String,
    /// Street address.
    pub address: String,
}

/// Register a new participating store.
pub async fn create_store(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateStoreRequest>,
) -> Result<Json<StoreResponse>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name must not be empty".into()));
    }

    let store = Store::new(StoreId::generate(), body.name.trim(), body.address.trim());
    state.store.put_store(&store).await?;

    tracing::info!(store_id = %store.id, "Store registered");

    Ok(Json(StoreResponse::from(&store)))
}

/// List active stores.
pub async fn list_stores(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StoreResponse>>, ApiError> {
    let stores = state.store.list_stores().await?;
    Ok(Json(stores.iter().map(StoreResponse::from).collect()))
}

/// Get a store by id.
pub async fn get_store(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<String>,
) -> Result<Json<StoreResponse>, ApiError> {
    let store_id: StoreId = store_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid store ID".into()))?;

    let store = state
        .store
        .get_store(&store_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".into()))?;

    Ok(Json(StoreResponse::from(&store)))
}

/// List the available products of one store.
pub async fn list_store_products(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<String>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let store_id: StoreId = store_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid store ID".into()))?;

    // 404 for an unknown store rather than an empty list.
    state
        .store
        .get_store(&store_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".into()))?;

    let products = state.store.list_available_products(Some(&store_id)).await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}
