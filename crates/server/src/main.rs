use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header::HeaderName, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use server_api::{create_post, delete_post, get_post, list_posts, update_post, ApiContext};
use shared::{
    domain::{Post, PostId},
    error::{ApiError, ErrorCode},
    protocol::{CreatePostRequest, ListPostsQuery, UpdatePostRequest},
};
use storage::Storage;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

// Lowercase form of `TOTAL_COUNT_HEADER`; `from_static` rejects uppercase.
const TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "posts service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/posts", get(http_list_posts).post(http_create_post))
        .route(
            "/posts/:post_id",
            get(http_get_post)
                .patch(http_update_post)
                .delete(http_delete_post),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive().expose_headers([TOTAL_COUNT]))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> ApiResult<&'static str> {
    state
        .api
        .storage
        .health_check()
        .await
        .map_err(|e| api_error(ApiError::internal(e.to_string())))?;
    Ok("ok")
}

async fn http_list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListPostsQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = list_posts(&state.api, &query).await.map_err(api_error)?;
    let mut headers = HeaderMap::new();
    headers.insert(TOTAL_COUNT, HeaderValue::from(page.total));
    Ok((headers, Json(page.data)))
}

async fn http_get_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<Post>> {
    let post = get_post(&state.api, PostId(post_id))
        .await
        .map_err(api_error)?;
    Ok(Json(post))
}

async fn http_create_post(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let post = create_post(&state.api, req).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn http_update_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
    Json(req): Json<UpdatePostRequest>,
) -> ApiResult<Json<Post>> {
    let post = update_post(&state.api, PostId(post_id), req)
        .await
        .map_err(api_error)?;
    Ok(Json(post))
}

async fn http_delete_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    delete_post(&state.api, PostId(post_id))
        .await
        .map_err(api_error)?;
    Ok(Json(serde_json::json!({})))
}

fn api_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(message = %err.message, "request failed");
    }
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
