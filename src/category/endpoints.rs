use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    app_state::lock_connection,
    category::{
        CategoryState,
        core::{
            Category, CategoryForm, CategoryId, CategoryListing, CategoryQuery, CategoryUpdate,
            CategoryUsage, create_category, delete_category, get_categories, get_category,
            get_category_usage, update_category,
        },
    },
    extract::{ApiJson, ApiQuery},
};

pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> Result<Json<Vec<CategoryListing>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_categories(&query, &connection).map(Json)
}

pub async fn get_category_endpoint(
    State(state): State<CategoryState>,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Category>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_category(category_id, &connection).map(Json)
}

/// A route handler for the number of records using a category.
pub async fn get_category_usage_endpoint(
    State(state): State<CategoryState>,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<CategoryUsage>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_category_usage(category_id, &connection).map(Json)
}

pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    ApiJson(form): ApiJson<CategoryForm>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let category = create_category(&form, &connection)?;
    tracing::info!("Created {} category \"{}\"", category.kind, category.name);

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    Path(category_id): Path<CategoryId>,
    ApiJson(update): ApiJson<CategoryUpdate>,
) -> Result<Json<Category>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_category(category_id, &update, &connection).map(Json)
}

/// A route handler for deleting a category that is not a system category and is not in use.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Path(category_id): Path<CategoryId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_category(category_id, &connection).inspect_err(|error| {
        tracing::debug!("Refused to delete category {category_id}: {error}");
    })?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{
        category::{
            Category, CategoryState, create_category_endpoint, delete_category_endpoint,
            get_category_endpoint, get_category_usage_endpoint, list_categories_endpoint,
            update_category_endpoint,
        },
        db::initialize,
        endpoints::{self, format_endpoint},
    };

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let state = CategoryState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let app = Router::new()
            .route(
                endpoints::CATEGORIES,
                get(list_categories_endpoint).post(create_category_endpoint),
            )
            .route(
                endpoints::CATEGORY,
                get(get_category_endpoint)
                    .put(update_category_endpoint)
                    .delete(delete_category_endpoint),
            )
            .route(endpoints::CATEGORY_USAGE, get(get_category_usage_endpoint))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn create_then_delete() {
        let server = get_test_server();

        let response = server
            .post(endpoints::CATEGORIES)
            .json(&json!({"name": "Pets", "kind": "expense", "colour": "#aa7733"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let category = response.json::<Category>();
        assert_eq!(category.colour.as_deref(), Some("#aa7733"));
        assert!(!category.is_system);

        let usage = server
            .get(&format_endpoint(endpoints::CATEGORY_USAGE, category.id))
            .await
            .json::<Value>();
        assert_eq!(
            usage,
            json!({"transaction_count": 0, "budget_count": 0, "recurring_count": 0, "can_delete": true})
        );

        server
            .delete(&format_endpoint(endpoints::CATEGORY, category.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format_endpoint(endpoints::CATEGORY, category.id))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn system_category_is_forbidden() {
        let server = get_test_server();
        let categories = server
            .get(endpoints::CATEGORIES)
            .add_query_param("kind", "income")
            .await
            .json::<Vec<Value>>();
        let system_id = categories
            .iter()
            .find(|category| category["is_system"] == true)
            .and_then(|category| category["id"].as_i64())
            .expect("no income system category");

        server
            .delete(&format_endpoint(endpoints::CATEGORY, system_id))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .put(&format_endpoint(endpoints::CATEGORY, system_id))
            .json(&json!({"name": "Wages"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn duplicate_is_conflict() {
        let server = get_test_server();

        server
            .post(endpoints::CATEGORIES)
            .json(&json!({"name": "Groceries", "kind": "expense"}))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn usage_is_listed_on_request() {
        let server = get_test_server();

        let listed = server
            .get(endpoints::CATEGORIES)
            .add_query_param("include_usage", true)
            .await
            .json::<Vec<Value>>();
        let without_usage = server.get(endpoints::CATEGORIES).await.json::<Vec<Value>>();

        assert!(listed.iter().all(|category| category["usage"].is_object()));
        assert!(without_usage.iter().all(|category| category.get("usage").is_none()));
    }

    #[tokio::test]
    async fn unknown_kind_is_bad_request() {
        let server = get_test_server();

        server
            .get(endpoints::CATEGORIES)
            .add_query_param("kind", "gift")
            .await
            .assert_status_bad_request();
    }
}
