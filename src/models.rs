use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Status every article receives on creation.
pub const DEFAULT_STATUS: &str = "published";

/// Position tag applied when a new article does not name any.
pub const DEFAULT_POSITION: &str = "normal";

// --- Core Record ---

/// Article
///
/// A stored news article. `id` and `created_at` are assigned by the store and never change
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    // Short lead shown under the headline ("spot" on the wire).
    pub lead: Option<String>,
    pub content: String,
    pub category: String,
    pub summary: Option<String>,
    // Public-relative URL, usually one returned by the upload endpoint.
    pub image: Option<String>,
    // Ordered display slots such as "manset" or "son_dakika".
    pub positions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub publish_date: DateTime<Utc>,
    pub status: String,
    pub views: i64,
}

/// NewArticle
///
/// Validated fields for an insert. The store stamps the id; everything else, including
/// the timestamps, is decided before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub lead: Option<String>,
    pub content: String,
    pub category: String,
    pub summary: Option<String>,
    pub image: Option<String>,
    pub positions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub publish_date: DateTime<Utc>,
    pub status: String,
    pub views: i64,
}

/// ArticleChanges
///
/// Validated fields for an update. `image` and `status` are only applied when `Some`;
/// the rest always overwrite the stored values.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleChanges {
    pub title: String,
    pub lead: Option<String>,
    pub content: String,
    pub category: String,
    pub summary: Option<String>,
    pub positions: Vec<String>,
    pub image: Option<String>,
    pub status: Option<String>,
}

impl Article {
    /// Builds the stored record from an insert payload and the id the store assigned.
    pub fn from_new(id: i64, new: NewArticle) -> Self {
        Self {
            id,
            title: new.title,
            lead: new.lead,
            content: new.content,
            category: new.category,
            summary: new.summary,
            image: new.image,
            positions: new.positions,
            created_at: new.created_at,
            publish_date: new.publish_date,
            status: new.status,
            views: new.views,
        }
    }

    /// Applies update semantics in place. `id`, `created_at`, `publish_date` and `views`
    /// are untouched.
    pub fn apply(&mut self, changes: ArticleChanges) {
        self.title = changes.title;
        self.lead = changes.lead;
        self.content = changes.content;
        self.category = changes.category;
        self.summary = changes.summary;
        self.positions = changes.positions;
        if let Some(image) = changes.image {
            self.image = Some(image);
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// ArticleRequest
///
/// Body of `POST /api/news` and `PUT /api/news/{id}`. Every field is optional on the wire
/// so that a missing required field produces a 400 with a readable message.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleRequest {
    pub title: Option<String>,
    #[serde(rename = "spot")]
    pub lead: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub summary: Option<String>,
    pub image: Option<String>,
    pub status: Option<String>,
    pub positions: Option<Vec<String>>,
}

/// RequiredFields
///
/// The three fields every article must carry, checked once for both create and update.
struct RequiredFields {
    title: String,
    content: String,
    category: String,
}

impl ArticleRequest {
    fn required(&mut self) -> Result<RequiredFields, String> {
        Ok(RequiredFields {
            title: take_required(&mut self.title, "title")?,
            content: take_required(&mut self.content, "content")?,
            category: take_required(&mut self.category, "category")?,
        })
    }

    /// into_new_article
    ///
    /// Turns a create request into an insert payload: both timestamps set to `now`,
    /// status forced to "published", views zeroed, positions defaulted to `["normal"]`.
    /// A client-supplied `status` is ignored on create.
    pub fn into_new_article(mut self, now: DateTime<Utc>) -> Result<NewArticle, String> {
        let RequiredFields {
            title,
            content,
            category,
        } = self.required()?;

        Ok(NewArticle {
            title,
            lead: self.lead,
            content,
            category,
            summary: self.summary,
            image: self.image,
            positions: self
                .positions
                .unwrap_or_else(|| vec![DEFAULT_POSITION.to_string()]),
            created_at: now,
            publish_date: now,
            status: DEFAULT_STATUS.to_string(),
            views: 0,
        })
    }

    /// into_changes
    ///
    /// Turns an update request into the overwrite set. An omitted `positions` clears the
    /// list; an omitted `image` or `status` leaves the stored value alone.
    pub fn into_changes(mut self) -> Result<ArticleChanges, String> {
        let RequiredFields {
            title,
            content,
            category,
        } = self.required()?;

        Ok(ArticleChanges {
            title,
            lead: self.lead,
            content,
            category,
            summary: self.summary,
            positions: self.positions.unwrap_or_default(),
            image: self.image,
            status: self.status,
        })
    }
}

fn take_required(field: &mut Option<String>, name: &str) -> Result<String, String> {
    match field.take() {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(format!("{name} is required")),
    }
}

/// LoginRequest
///
/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[schema(example = "admin")]
    pub username: String,
    pub password: String,
}

// --- Response Payloads (Output Schemas) ---

/// LoginResponse
///
/// The bearer token to send as `Authorization: Bearer <token>` on write requests.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
}

/// ArticleResponse
///
/// Wire shape of an article. Timestamps are RFC 3339 text.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    #[serde(rename = "spot")]
    pub lead: Option<String>,
    pub content: String,
    pub category: String,
    pub summary: Option<String>,
    pub image: Option<String>,
    #[schema(example = "2025-01-01T09:30:00.000Z")]
    pub created_at: String,
    pub publish_date: String,
    pub status: String,
    pub views: i64,
    pub positions: Vec<String>,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            lead: article.lead,
            content: article.content,
            category: article.category,
            summary: article.summary,
            image: article.image,
            created_at: article.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            publish_date: article
                .publish_date
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            status: article.status,
            views: article.views,
            positions: article.positions,
        }
    }
}
