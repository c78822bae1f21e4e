use chrono::Utc;
use shared::{
    domain::{Post, PostField, PostId, SortOrder},
    error::{ApiError, ValidationError},
    protocol::{CreatePostRequest, ListPostsQuery, PostPage, UpdatePostRequest},
};
use storage::{PostQuery, Storage};
use tracing::info;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn list_posts(ctx: &ApiContext, query: &ListPostsQuery) -> Result<PostPage, ApiError> {
    let query = resolve_query(query)?;
    ctx.storage.list_posts(&query).await.map_err(internal)
}

pub async fn get_post(ctx: &ApiContext, post_id: PostId) -> Result<Post, ApiError> {
    ctx.storage
        .get_post(post_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(post_id))
}

/// Creates a post. The client's `lastUpdated` is ignored; the service
/// stamps every write itself.
pub async fn create_post(ctx: &ApiContext, req: CreatePostRequest) -> Result<Post, ApiError> {
    let post = req.into_new_post();
    post.validate()?;
    let created = ctx
        .storage
        .create_post(&post, Utc::now())
        .await
        .map_err(internal)?;
    info!(post_id = %created.id, "post created");
    Ok(created)
}

pub async fn update_post(
    ctx: &ApiContext,
    post_id: PostId,
    req: UpdatePostRequest,
) -> Result<Post, ApiError> {
    req.patch.validate()?;
    let updated = ctx
        .storage
        .update_post(post_id, &req.patch, Utc::now())
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(post_id))?;
    info!(post_id = %post_id, "post updated");
    Ok(updated)
}

pub async fn delete_post(ctx: &ApiContext, post_id: PostId) -> Result<(), ApiError> {
    let removed = ctx.storage.delete_post(post_id).await.map_err(internal)?;
    if !removed {
        return Err(not_found(post_id));
    }
    info!(post_id = %post_id, "post deleted");
    Ok(())
}

fn resolve_query(query: &ListPostsQuery) -> Result<PostQuery, ValidationError> {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    if page == 0 {
        return Err(ValidationError::NotPositive("_page"));
    }
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        return Err(ValidationError::NotPositive("_limit"));
    }
    let sort = match query.sort.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<PostField>()?,
        _ => PostField::Id,
    };
    let order = match query.order.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<SortOrder>()?,
        _ => SortOrder::Asc,
    };
    Ok(PostQuery {
        page,
        limit,
        sort,
        order,
        search: query.search.clone().unwrap_or_default(),
    })
}

fn not_found(post_id: PostId) -> ApiError {
    ApiError::not_found(format!("post {post_id} not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{
        domain::{NewPost, PostPatch},
        error::ErrorCode,
    };

    async fn setup() -> ApiContext {
        let storage = Storage::new("sqlite::memory:").await.expect("db");
        ApiContext { storage }
    }

    fn create_request(title: &str) -> CreatePostRequest {
        CreatePostRequest {
            title: title.into(),
            author: "alice".into(),
            body: "body".into(),
            last_updated: None,
        }
    }

    #[test]
    fn missing_list_parameters_fall_back_to_defaults() {
        let resolved = resolve_query(&ListPostsQuery::default()).expect("defaults");
        assert_eq!(resolved.page, DEFAULT_PAGE);
        assert_eq!(resolved.limit, DEFAULT_LIMIT);
        assert_eq!(resolved.sort, PostField::Id);
        assert_eq!(resolved.order, SortOrder::Asc);
        assert!(resolved.search.is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_sort_field() {
        let ctx = setup().await;
        let query = ListPostsQuery {
            sort: Some("password".into()),
            ..ListPostsQuery::default()
        };
        let err = list_posts(&ctx, &query).await.expect_err("should fail");
        assert!(matches!(err.code, ErrorCode::Validation));
    }

    #[tokio::test]
    async fn rejects_zero_page() {
        let ctx = setup().await;
        let query = ListPostsQuery {
            page: Some(0),
            ..ListPostsQuery::default()
        };
        let err = list_posts(&ctx, &query).await.expect_err("should fail");
        assert!(matches!(err.code, ErrorCode::Validation));
    }

    #[tokio::test]
    async fn create_ignores_client_timestamp() {
        let ctx = setup().await;
        let stale = "2001-01-01T00:00:00Z".parse().expect("timestamp");
        let mut req = create_request("Hello");
        req.last_updated = Some(stale);
        let post = create_post(&ctx, req).await.expect("create");
        assert!(post.last_updated > stale);
    }

    #[tokio::test]
    async fn create_requires_title() {
        let ctx = setup().await;
        let err = create_post(&ctx, create_request("   "))
            .await
            .expect_err("should fail");
        assert!(matches!(err.code, ErrorCode::Validation));
        assert_eq!(err.message, "title is required");
    }

    #[tokio::test]
    async fn update_missing_post_is_not_found() {
        let ctx = setup().await;
        let err = update_post(&ctx, PostId(42), UpdatePostRequest::default())
            .await
            .expect_err("should fail");
        assert!(matches!(err.code, ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn update_then_get_returns_patched_post() {
        let ctx = setup().await;
        let created = ctx
            .storage
            .create_post(&NewPost::new("A", "B", "C"), Utc::now())
            .await
            .expect("create");
        let req = UpdatePostRequest {
            patch: PostPatch {
                author: Some("Z".into()),
                ..PostPatch::default()
            },
            last_updated: None,
        };
        update_post(&ctx, created.id, req).await.expect("update");
        let loaded = get_post(&ctx, created.id).await.expect("get");
        assert_eq!(loaded.author, "Z");
        assert!(loaded.last_updated >= created.last_updated);
    }

    #[tokio::test]
    async fn deleting_twice_reports_not_found() {
        let ctx = setup().await;
        let created = create_post(&ctx, create_request("gone")).await.expect("create");
        delete_post(&ctx, created.id).await.expect("delete");
        let err = delete_post(&ctx, created.id).await.expect_err("second delete");
        assert!(matches!(err.code, ErrorCode::NotFound));
    }
}
