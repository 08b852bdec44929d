//! Hosted store gateway (PostgREST dialect)
//!
//! Every table lives under `{base}/rest/v1/<table>`; filters are query
//! parameters such as `id=eq.42`. Writes ask for the stored rows back with
//! `Prefer: return=representation`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{
    Artwork, ArtworkCreate, ArtworkImage, ArtworkImageCreate, ArtworkUpdate, ContactMessage,
    ContactMessageCreate, Profile, Rating, RatingUpsert, Review, ReviewCreate, ReviewUpdate,
};

use super::{BackendKind, StoreGateway};
use crate::error::{ClientError, ClientResult};

const ARTWORK_SELECT: &str =
    "*,artwork_images(id,artwork_id,image_url,display_order,created_at,updated_at)";
const RETURN_REPRESENTATION: &str = "return=representation";
const UPSERT_REPRESENTATION: &str = "return=representation,resolution=merge-duplicates";
const HELPFUL_VOTE_ATTEMPTS: usize = 3;

/// Error body returned by the store
#[derive(serde::Deserialize)]
struct StoreErrorBody {
    message: String,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RemoteGateway {
    client: Client,
    base_url: String,
}

impl RemoteGateway {
    /// Build a gateway for `base_url` authenticated with the anon key
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(anon_key)
            .map_err(|_| ClientError::Config("anon key is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", anon_key))
            .map_err(|_| ClientError::Config("anon key is not a valid header value".into()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
    }

    fn rpc(&self, function: &str) -> RequestBuilder {
        self.client
            .post(format!("{}/rest/v1/rpc/{}", self.base_url, function))
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(request: RequestBuilder) -> ClientResult<()> {
        let response = request.send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Insert one row and return its stored representation
    async fn insert<T: DeserializeOwned, B: Serialize + ?Sized + Sync>(
        &self,
        table: &str,
        body: &B,
    ) -> ClientResult<T> {
        let rows: Vec<T> = Self::send(
            self.table(Method::POST, table)
                .header("Prefer", RETURN_REPRESENTATION)
                .json(body),
        )
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ClientError::InvalidResponse(format!("insert into {} returned no row", table)))
    }

    /// Patch one row by id; an empty representation means the id does not exist
    async fn patch<T: DeserializeOwned, B: Serialize + ?Sized + Sync>(
        &self,
        table: &str,
        id: &str,
        body: &B,
    ) -> ClientResult<T> {
        let rows: Vec<T> = Self::send(
            self.table(Method::PATCH, table)
                .query(&[("id", format!("eq.{}", id))])
                .header("Prefer", RETURN_REPRESENTATION)
                .json(body),
        )
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(format!("{} {}", table, id)))
    }

    /// Delete rows by id; zero matching rows is still success
    async fn delete_by_id(&self, table: &str, id: &str) -> ClientResult<()> {
        let result = Self::send_empty(
            self.table(Method::DELETE, table)
                .query(&[("id", format!("eq.{}", id))]),
        )
        .await;
        match result {
            Err(ClientError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn check_status(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<StoreErrorBody>(&text) {
            Ok(body) => match body.details {
                Some(details) => format!("{} ({})", body.message, details),
                None => body.message,
            },
            Err(_) => text,
        };

        tracing::debug!(status = status.as_u16(), message = %message, "Store request failed");

        Err(match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::Validation(message)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ClientError::PermissionDenied(message)
            }
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                ClientError::Timeout(message)
            }
            s if s.is_server_error() => ClientError::RemoteUnavailable(message),
            s => ClientError::Remote {
                status: s.as_u16(),
                message,
            },
        })
    }

    async fn fetch_artwork(&self, id: &str) -> ClientResult<Artwork> {
        let filter = format!("eq.{}", id);
        let rows: Vec<Artwork> = Self::send(
            self.table(Method::GET, "artworks")
                .query(&[("select", ARTWORK_SELECT), ("id", filter.as_str())]),
        )
        .await?;
        let mut artwork = rows
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(format!("artwork {}", id)))?;
        artwork.sort_images();
        Ok(artwork)
    }
}

#[async_trait]
impl StoreGateway for RemoteGateway {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn fetch_artworks(&self) -> ClientResult<Vec<Artwork>> {
        let mut artworks: Vec<Artwork> = Self::send(
            self.table(Method::GET, "artworks")
                .query(&[("select", ARTWORK_SELECT), ("order", "created_at.desc")]),
        )
        .await?;
        for artwork in &mut artworks {
            artwork.sort_images();
        }
        tracing::debug!(count = artworks.len(), "Fetched artworks");
        Ok(artworks)
    }

    async fn create_artwork(&self, fields: &ArtworkCreate) -> ClientResult<Artwork> {
        fields.validate_fields()?;

        let mut artwork: Artwork = self.insert("artworks", fields).await?;

        for (order, url) in fields.images.iter().enumerate() {
            match self.upload_image(&artwork.id, url, order as i32).await {
                Ok(image) => artwork.images.push(image),
                Err(e) => {
                    // leave no half-created artwork behind
                    if let Err(cleanup) = self.delete_artwork(&artwork.id).await {
                        tracing::warn!(
                            id = %artwork.id,
                            error = %cleanup,
                            "Failed to remove artwork after image upload error"
                        );
                    }
                    return Err(e);
                }
            }
        }

        artwork.sort_images();
        tracing::info!(id = %artwork.id, images = artwork.images.len(), "Artwork created");
        Ok(artwork)
    }

    async fn update_artwork(&self, id: &str, update: &ArtworkUpdate) -> ClientResult<Artwork> {
        update.validate_fields()?;
        let _: Artwork = self.patch("artworks", id, update).await?;
        // refetch so the nested images come back with the row
        self.fetch_artwork(id).await
    }

    async fn delete_artwork(&self, id: &str) -> ClientResult<()> {
        // artwork_images rows cascade on the store side
        self.delete_by_id("artworks", id).await
    }

    async fn increment_views(&self, id: &str) -> ClientResult<()> {
        Self::send_empty(
            self.rpc("increment_views")
                .json(&serde_json::json!({ "artwork_id": id })),
        )
        .await
    }

    async fn upload_image(
        &self,
        artwork_id: &str,
        image_url: &str,
        display_order: i32,
    ) -> ClientResult<ArtworkImage> {
        let row = ArtworkImageCreate {
            artwork_id: artwork_id.to_string(),
            image_url: image_url.to_string(),
            display_order,
        };
        self.insert("artwork_images", &row).await
    }

    async fn fetch_reviews(&self) -> ClientResult<Vec<Review>> {
        Self::send(
            self.table(Method::GET, "reviews")
                .query(&[("select", "*"), ("order", "created_at.desc")]),
        )
        .await
    }

    async fn create_review(&self, review: &ReviewCreate) -> ClientResult<Review> {
        review.validate_fields()?;
        self.insert("reviews", review).await
    }

    async fn update_review(&self, id: &str, update: &ReviewUpdate) -> ClientResult<Review> {
        self.patch("reviews", id, update).await
    }

    /// Read the stored count, then write count + 1 only if it is unchanged
    async fn increment_helpful(&self, id: &str) -> ClientResult<Review> {
        let id_filter = format!("eq.{}", id);

        for _ in 0..HELPFUL_VOTE_ATTEMPTS {
            let rows: Vec<Review> = Self::send(
                self.table(Method::GET, "reviews")
                    .query(&[("select", "*"), ("id", id_filter.as_str())]),
            )
            .await?;
            let current = rows
                .into_iter()
                .next()
                .ok_or_else(|| ClientError::NotFound(format!("reviews {}", id)))?;

            let count_filter = format!("eq.{}", current.helpful_count);
            let rows: Vec<Review> = Self::send(
                self.table(Method::PATCH, "reviews")
                    .query(&[("id", id_filter.as_str()), ("helpful_count", count_filter.as_str())])
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&serde_json::json!({ "helpful_count": current.helpful_count + 1 })),
            )
            .await?;
            if let Some(updated) = rows.into_iter().next() {
                return Ok(updated);
            }
            tracing::debug!(id = %id, "Helpful count moved underneath us, retrying");
        }

        Err(ClientError::Remote {
            status: StatusCode::CONFLICT.as_u16(),
            message: format!("helpful vote on review {} kept conflicting", id),
        })
    }

    async fn delete_review(&self, id: &str) -> ClientResult<()> {
        self.delete_by_id("reviews", id).await
    }

    async fn fetch_ratings(&self) -> ClientResult<Vec<Rating>> {
        Self::send(
            self.table(Method::GET, "ratings")
                .query(&[("select", "*"), ("order", "created_at.desc")]),
        )
        .await
    }

    async fn upsert_rating(&self, rating: &RatingUpsert) -> ClientResult<Rating> {
        rating.validate_fields()?;
        let rows: Vec<Rating> = Self::send(
            self.table(Method::POST, "ratings")
                .query(&[("on_conflict", "artwork_id,user_id")])
                .header("Prefer", UPSERT_REPRESENTATION)
                .json(rating),
        )
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ClientError::InvalidResponse("rating upsert returned no row".into()))
    }

    async fn delete_rating(&self, id: &str) -> ClientResult<()> {
        self.delete_by_id("ratings", id).await
    }

    async fn fetch_contact_messages(&self) -> ClientResult<Vec<ContactMessage>> {
        Self::send(
            self.table(Method::GET, "contact_messages")
                .query(&[("select", "*"), ("order", "created_at.desc")]),
        )
        .await
    }

    async fn create_contact_message(
        &self,
        message: &ContactMessageCreate,
    ) -> ClientResult<ContactMessage> {
        message.validate_fields()?;
        self.insert("contact_messages", message).await
    }

    async fn mark_message_read(&self, id: &str) -> ClientResult<ContactMessage> {
        self.patch("contact_messages", id, &serde_json::json!({ "read": true }))
            .await
    }

    async fn delete_contact_message(&self, id: &str) -> ClientResult<()> {
        self.delete_by_id("contact_messages", id).await
    }

    async fn fetch_profile(&self, user_id: &str) -> ClientResult<Option<Profile>> {
        let filter = format!("eq.{}", user_id);
        let rows: Vec<Profile> = Self::send(
            self.table(Method::GET, "profiles")
                .query(&[("select", "id,email,role"), ("id", filter.as_str())]),
        )
        .await?;
        Ok(rows.into_iter().next())
    }
}
