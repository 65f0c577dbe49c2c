//! Product catalog handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ecopoints_core::{Product, ProductId, StoreId};

use crate::error::ApiError;
use crate::state::AppState;

/// Product response.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    /// Product ID.
    pub id: String,
    /// Owning store ID.
    pub store_id: String,
    /// Product name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price of one unit, in points.
    pub cost_in_points: i64,
    /// Units available.
    pub stock: i64,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            store_id: product.store_id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            cost_in_points: product.cost_in_points,
            stock: product.stock,
            created_at: product.created_at.to_rfc3339(),
        }
    }
}

/// Create product request.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// Owning store ID.
    pub store_id: String,
    /// Product name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Price of one unit, in points. Must be positive.
    pub cost_in_points: i64,
    /// Initial stock. Must not be negative.
    pub stock: i64,
}

/// Add a product to a store's catalog.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let store_id: StoreId = body
        .store_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid store ID".into()))?;

    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name must not be empty".into()));
    }
    if body.cost_in_points < 1 {
        return Err(ApiError::BadRequest(
            "Cost in points must be at least 1".into(),
        ));
    }
    if body.stock < 0 {
        return Err(ApiError::BadRequest("Stock must not be negative".into()));
    }

    let mut product = Product::new(
        ProductId::generate(),
        store_id,
        body.name.trim(),
        body.cost_in_points,
        body.stock,
    );
    product.description = body.description;

    state.store.put_product(&product).await?;

    tracing::info!(
        product_id = %product.id,
        store_id = %store_id,
        cost_in_points = product.cost_in_points,
        "Product created"
    );

    Ok(Json(ProductResponse::from(&product)))
}

/// List available products across all stores.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.store.list_available_products(None).await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

/// Product search parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search term, matched case-insensitively against name and description.
    pub q: Option<String>,
}

/// Search available products by name or description.
pub async fn search_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let term = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Search term is required".into()))?;

    let products = state.store.search_products(term).await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

/// Get a product by id.
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id: ProductId = product_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid product ID".into()))?;

    let product = state
        .store
        .get_product(&product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    Ok(Json(ProductResponse::from(&product)))
}
