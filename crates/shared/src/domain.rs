use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(PostId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub author: String,
    pub body: String,
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    pub last_updated: DateTime<Utc>,
}

impl Post {
    /// Text rendering of a single column, used by table views.
    pub fn field_text(&self, field: PostField) -> String {
        match field {
            PostField::Id => self.id.to_string(),
            PostField::Title => self.title.clone(),
            PostField::Author => self.author.clone(),
            PostField::Body => self.body.clone(),
            PostField::LastUpdated => self.last_updated.to_rfc3339(),
        }
    }
}

/// Fields a caller supplies when creating a post. The server assigns
/// `id` and `lastUpdated`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub author: String,
    pub body: String,
}

impl NewPost {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            body: body.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(PostField::Title, &self.title)?;
        require_text(PostField::Author, &self.author)?;
        require_text(PostField::Body, &self.body)
    }
}

/// Partial update. Absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.body.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require_text(PostField::Title, title)?;
        }
        if let Some(author) = &self.author {
            require_text(PostField::Author, author)?;
        }
        if let Some(body) = &self.body {
            require_text(PostField::Body, body)?;
        }
        Ok(())
    }
}

impl From<NewPost> for PostPatch {
    fn from(value: NewPost) -> Self {
        Self {
            title: Some(value.title),
            author: Some(value.author),
            body: Some(value.body),
        }
    }
}

fn require_text(field: PostField, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostField {
    Id,
    Title,
    Author,
    Body,
    LastUpdated,
}

impl PostField {
    pub const ALL: [PostField; 5] = [
        PostField::Id,
        PostField::Title,
        PostField::Author,
        PostField::Body,
        PostField::LastUpdated,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Author => "author",
            Self::Body => "body",
            Self::LastUpdated => "lastUpdated",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Title => "Title",
            Self::Author => "Author",
            Self::Body => "Content",
            Self::LastUpdated => "Last Updated",
        }
    }
}

impl fmt::Display for PostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::UnknownField(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(ValidationError::UnknownSortOrder(other.to_string())),
        }
    }
}

pub type ColumnSet = BTreeSet<PostField>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_uses_camel_case_wire_names() {
        let post = Post {
            id: PostId(4),
            title: "t".into(),
            author: "a".into(),
            body: "b".into(),
            last_updated: "2024-03-01T10:00:00Z".parse().expect("timestamp"),
        };
        let json = serde_json::to_value(&post).expect("serialize");
        assert_eq!(json["id"], 4);
        assert_eq!(json["lastUpdated"], "2024-03-01T10:00:00Z");
    }

    #[test]
    fn post_accepts_timestamps_without_offset() {
        for (raw, expected) in [
            ("2024-01-15T10:30:00", "2024-01-15T10:30:00Z"),
            ("2024-01-15T10:30:00.000", "2024-01-15T10:30:00Z"),
            ("2024-01-15", "2024-01-15T00:00:00Z"),
        ] {
            let json = format!(
                r#"{{"id":1,"title":"t","author":"a","body":"b","lastUpdated":"{raw}"}}"#
            );
            let post: Post = serde_json::from_str(&json).expect(raw);
            assert_eq!(post.last_updated, expected.parse::<DateTime<Utc>>().expect("expected"));
        }
        let bad = r#"{"id":1,"title":"t","author":"a","body":"b","lastUpdated":"soon"}"#;
        assert!(serde_json::from_str::<Post>(bad).is_err());
    }

    #[test]
    fn parses_field_names_case_insensitively() {
        assert_eq!("lastupdated".parse::<PostField>().unwrap(), PostField::LastUpdated);
        assert_eq!(" title ".parse::<PostField>().unwrap(), PostField::Title);
        assert!("password".parse::<PostField>().is_err());
    }

    #[test]
    fn new_post_requires_every_field() {
        let err = NewPost::new("A", "  ", "C").validate().expect_err("blank author");
        assert!(matches!(err, ValidationError::MissingField(PostField::Author)));
        NewPost::new("A", "B", "C").validate().expect("valid");
    }

    #[test]
    fn patch_only_checks_present_fields() {
        let patch = PostPatch {
            body: Some("updated".into()),
            ..PostPatch::default()
        };
        patch.validate().expect("valid");
        let blank = PostPatch {
            title: Some(String::new()),
            ..PostPatch::default()
        };
        assert!(blank.validate().is_err());
    }
}
