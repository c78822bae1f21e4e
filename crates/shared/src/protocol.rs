use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{NewPost, Post, PostField, PostPatch, SortOrder};

/// Response header carrying the number of posts matching a list query.
pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

pub const POSTS_ROUTE: &str = "/posts";

/// Query string of `GET /posts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPostsQuery {
    #[serde(rename = "_page", default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(rename = "_limit", default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(rename = "_sort", default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(rename = "_order", default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(rename = "q", default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl ListPostsQuery {
    pub fn new(page: u32, limit: u32, sort: PostField, order: SortOrder, search: &str) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            sort: Some(sort.as_str().to_string()),
            order: Some(order.as_str().to_string()),
            search: Some(search.to_string()),
        }
    }
}

/// One page of posts plus the total number of matches across all pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPage {
    pub data: Vec<Post>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: String,
    pub author: String,
    pub body: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::timestamp::deserialize_option"
    )]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CreatePostRequest {
    pub fn stamped(post: &NewPost, last_updated: DateTime<Utc>) -> Self {
        Self {
            title: post.title.clone(),
            author: post.author.clone(),
            body: post.body.clone(),
            last_updated: Some(last_updated),
        }
    }

    pub fn into_new_post(self) -> NewPost {
        NewPost {
            title: self.title,
            author: self.author,
            body: self.body,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[serde(flatten)]
    pub patch: PostPatch,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::timestamp::deserialize_option"
    )]
    pub last_updated: Option<DateTime<Utc>>,
}

impl UpdatePostRequest {
    pub fn stamped(patch: &PostPatch, last_updated: DateTime<Utc>) -> Self {
        Self {
            patch: patch.clone(),
            last_updated: Some(last_updated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_uses_collection_parameter_names() {
        let query = ListPostsQuery::new(2, 10, PostField::LastUpdated, SortOrder::Desc, "rust");
        let json = serde_json::to_value(&query).expect("serialize");
        assert_eq!(json["_page"], 2);
        assert_eq!(json["_limit"], 10);
        assert_eq!(json["_sort"], "lastUpdated");
        assert_eq!(json["_order"], "desc");
        assert_eq!(json["q"], "rust");
    }

    #[test]
    fn update_request_only_carries_changed_fields() {
        let patch = PostPatch {
            title: Some("New".into()),
            ..PostPatch::default()
        };
        let stamp = "2024-05-01T00:00:00Z".parse().expect("timestamp");
        let json = serde_json::to_value(UpdatePostRequest::stamped(&patch, stamp)).expect("json");
        assert_eq!(json["title"], "New");
        assert!(json.get("author").is_none());
        assert_eq!(json["lastUpdated"], "2024-05-01T00:00:00Z");
    }

    #[test]
    fn write_requests_accept_loose_or_missing_stamps() {
        let update: UpdatePostRequest =
            serde_json::from_str(r#"{"body":"x","lastUpdated":"2024-05-01T08:00:00"}"#)
                .expect("update");
        assert_eq!(update.patch.body.as_deref(), Some("x"));
        assert_eq!(
            update.last_updated,
            Some("2024-05-01T08:00:00Z".parse().expect("timestamp"))
        );

        let create: CreatePostRequest =
            serde_json::from_str(r#"{"title":"t","author":"a","body":"b"}"#).expect("create");
        assert_eq!(create.last_updated, None);
    }
}
