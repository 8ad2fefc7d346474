//! CRUD endpoints for assets.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    app_state::lock_connection,
    asset::{
        AssetState,
        core::{
            Asset, AssetForm, AssetId, AssetQuery, create_asset, deactivate_asset, get_asset,
            get_assets, update_asset,
        },
    },
    extract::{ApiJson, ApiQuery},
};

/// A route handler for listing assets, newest first.
pub async fn list_assets_endpoint(
    State(state): State<AssetState>,
    ApiQuery(query): ApiQuery<AssetQuery>,
) -> Result<Json<Vec<Asset>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_assets(&query, &connection).map(Json)
}

/// A route handler for getting a single asset.
pub async fn get_asset_endpoint(
    State(state): State<AssetState>,
    Path(asset_id): Path<AssetId>,
) -> Result<Json<Asset>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_asset(asset_id, &connection).map(Json)
}

/// A route handler for creating an asset, responds with the new asset.
pub async fn create_asset_endpoint(
    State(state): State<AssetState>,
    ApiJson(form): ApiJson<AssetForm>,
) -> Result<(StatusCode, Json<Asset>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let asset = create_asset(&form, &connection)?;
    tracing::info!("Created asset {} \"{}\"", asset.id, asset.name);

    Ok((StatusCode::CREATED, Json(asset)))
}

/// A route handler for replacing an asset's attributes.
pub async fn update_asset_endpoint(
    State(state): State<AssetState>,
    Path(asset_id): Path<AssetId>,
    ApiJson(form): ApiJson<AssetForm>,
) -> Result<Json<Asset>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_asset(asset_id, &form, &connection).map(Json)
}

/// A route handler for soft deleting an asset.
pub async fn delete_asset_endpoint(
    State(state): State<AssetState>,
    Path(asset_id): Path<AssetId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    deactivate_asset(asset_id, &connection)?;
    tracing::info!("Deactivated asset {asset_id}");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        http::StatusCode,
        routing::get,
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        asset::{
            Asset, AssetCategory, AssetState, create_asset_endpoint, delete_asset_endpoint,
            get_asset_endpoint, list_assets_endpoint, update_asset_endpoint,
        },
        db::initialize,
        endpoints::{self, format_endpoint},
    };

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let state = AssetState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let app = Router::new()
            .route(
                endpoints::ASSETS,
                get(list_assets_endpoint).post(create_asset_endpoint),
            )
            .route(
                endpoints::ASSET,
                get(get_asset_endpoint)
                    .put(update_asset_endpoint)
                    .delete(delete_asset_endpoint),
            )
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn create_then_get() {
        let server = get_test_server();

        let response = server
            .post(endpoints::ASSETS)
            .json(&json!({
                "name": "Fiat Panda",
                "category": "vehicle",
                "purchase_date": "2020-01-01",
                "purchase_price": 12000.0,
                "fuel_type": "petrol",
                "consumption_per_100km": 5.5
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created = response.json::<Asset>();

        let got = server
            .get(&format_endpoint(endpoints::ASSET, created.id))
            .await
            .json::<Asset>();

        assert_eq!(got, created);
        assert_eq!(got.category, AssetCategory::Vehicle);
    }

    #[tokio::test]
    async fn create_with_unknown_category_is_rejected() {
        let server = get_test_server();

        let response = server
            .post(endpoints::ASSETS)
            .json(&json!({"name": "Boat", "category": "yacht"}))
            .await;

        response.assert_status_not_ok();
        assert!(response.json::<serde_json::Value>()["error"].is_string());
    }

    #[tokio::test]
    async fn deleted_assets_are_hidden_unless_requested() {
        let server = get_test_server();
        let created = server
            .post(endpoints::ASSETS)
            .json(&json!({"name": "Drill", "category": "equipment"}))
            .await
            .json::<Asset>();

        server
            .delete(&format_endpoint(endpoints::ASSET, created.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let visible = server.get(endpoints::ASSETS).await.json::<Vec<Asset>>();
        let all = server
            .get(endpoints::ASSETS)
            .add_query_param("include_inactive", true)
            .await
            .json::<Vec<Asset>>();
        assert!(visible.is_empty());
        assert_eq!(all.len(), 1);
        assert!(!all[0].active);
    }

    #[tokio::test]
    async fn update_missing_asset_is_404() {
        let server = get_test_server();

        server
            .put(&format_endpoint(endpoints::ASSET, 404))
            .json(&json!({"name": "Ghost", "category": "other"}))
            .await
            .assert_status_not_found();
    }
}
