//! Menu API endpoints.

use api_types::menu::{Category as ApiCategory, MenuItemNew, MenuItemUpdate, MenuItemView, MenuResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use ledger::{Category, MenuItem, MoneyCents};

fn map_category(category: Category) -> ApiCategory {
    match category {
        Category::Main => ApiCategory::Main,
        Category::Snack => ApiCategory::Snack,
        Category::Drink => ApiCategory::Drink,
        Category::Dessert => ApiCategory::Dessert,
    }
}

fn unmap_category(category: ApiCategory) -> Category {
    match category {
        ApiCategory::Main => Category::Main,
        ApiCategory::Snack => Category::Snack,
        ApiCategory::Drink => Category::Drink,
        ApiCategory::Dessert => Category::Dessert,
    }
}

pub(crate) fn view(item: MenuItem) -> MenuItemView {
    MenuItemView {
        id: item.id,
        name: item.name,
        price_minor: item.price.cents(),
        category: map_category(item.category),
        available: item.available,
        stock: item.stock,
    }
}

/// Parents see what they can order; admins see the whole catalog.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<MenuResponse>, ServerError> {
    let items = state.ledger.list_menu(!user.is_admin()).await?;
    Ok(Json(MenuResponse {
        items: items.into_iter().map(view).collect(),
    }))
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<MenuItemNew>,
) -> Result<Json<MenuItemView>, ServerError> {
    if !user.is_admin() {
        return Err(ServerError::Forbidden(
            "only admins manage the menu".to_string(),
        ));
    }

    let item = MenuItem::new(
        payload.name,
        MoneyCents::new(payload.price_minor),
        unmap_category(payload.category),
        payload.stock,
    )?;
    state.ledger.add_menu_item(&item).await?;
    Ok(Json(view(item)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MenuItemUpdate>,
) -> Result<Json<MenuItemView>, ServerError> {
    if !user.is_admin() {
        return Err(ServerError::Forbidden(
            "only admins manage the menu".to_string(),
        ));
    }

    let item = state
        .ledger
        .update_menu_item(
            id,
            payload.price_minor.map(MoneyCents::new),
            payload.available,
            payload.stock,
        )
        .await?;
    Ok(Json(view(item)))
}
