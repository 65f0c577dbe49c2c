//! Recyclable item type handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use ecopoints_core::{ItemType, ItemTypeId};

use crate::error::ApiError;
use crate::state::AppState;

/// Item type response.
#[derive(Debug, Serialize)]
pub struct ItemTypeResponse {
    /// Item type ID.
    pub id: String,
    /// Material name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Points credited per kilogram.
    pub points_per_unit: f64,
}

impl From<&ItemType> for ItemTypeResponse {
    fn from(item_type: &ItemType) -> Self {
        Self {
            id: item_type.id.to_string(),
            name: item_type.name.clone(),
            description: item_type.description.clone(),
            points_per_unit: item_type.points_per_unit,
        }
    }
}

/// Create item type request.
#[derive(Debug, Deserialize)]
pub struct CreateItemTypeRequest {
    /// Material name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Points credited per kilogram. Must be positive and finite.
    pub points_per_unit: f64,
}

/// Register a recyclable item type with its points rate.
pub async fn create_item_type(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateItemTypeRequest>,
) -> Result<Json<ItemTypeResponse>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name must not be empty".into()));
    }
    if !body.points_per_unit.is_finite() || body.points_per_unit <= 0.0 {
        return Err(ApiError::BadRequest(
            "Points per unit must be a positive number".into(),
        ));
    }

    let mut item_type = ItemType::new(
        ItemTypeId::generate(),
        body.name.trim(),
        body.points_per_unit,
    );
    item_type.description = body.description;

    state.store.put_item_type(&item_type).await?;

    tracing::info!(
        item_type_id = %item_type.id,
        points_per_unit = item_type.points_per_unit,
        "Item type created"
    );

    Ok(Json(ItemTypeResponse::from(&item_type)))
}

/// List active item types.
pub async fn list_item_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ItemTypeResponse>>, ApiError> {
    let item_types = state.store.list_item_types().await?;
    Ok(Json(item_types.iter().map(ItemTypeResponse::from).collect()))
}
