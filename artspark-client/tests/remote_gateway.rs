//! Remote gateway against an in-process mock of the hosted REST API

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use artspark_client::models::{
    Artwork, ArtworkUpdate, ContactMessage, RatingUpsert, ReviewUpdate,
};
use artspark_client::{
    BackendKind, BootstrapOutcome, ClientConfig, ClientError, DataLayer, EntityKind,
    LocalGateway, LocalStore, RemoteGateway, StoreGateway,
};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use common::*;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tempfile::TempDir;

const ANON_KEY: &str = "test-anon-key";

#[derive(Default)]
struct MockStore {
    artworks: Vec<Value>,
    images: Vec<Value>,
    ratings: Vec<Value>,
    reviews: Vec<Value>,
    messages: Vec<Value>,
    profiles: Vec<Value>,
    next_id: i64,
    profile_delay: Duration,
}

impl MockStore {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

type Db = Arc<Mutex<MockStore>>;
type Params = Query<HashMap<String, String>>;

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_id(row: &Value) -> String {
    cell_text(&row["id"])
}

fn eq_filter<'a>(params: &'a HashMap<String, String>, column: &str) -> Option<&'a str> {
    params.get(column).and_then(|f| f.strip_prefix("eq."))
}

/// Every `column=eq.value` parameter holds for `row`
fn matches_filters(row: &Value, params: &HashMap<String, String>) -> bool {
    params.iter().all(|(column, filter)| match filter.strip_prefix("eq.") {
        Some(value) => cell_text(&row[column.as_str()]) == value,
        None => true,
    })
}

fn list_rows(rows: &[Value], params: &HashMap<String, String>) -> Response {
    let mut rows: Vec<Value> = rows
        .iter()
        .filter(|r| matches_filters(r, params))
        .cloned()
        .collect();
    rows.reverse();
    Json(rows).into_response()
}

/// PATCH semantics: update every matching row and return them (possibly none)
fn patch_rows(rows: &mut [Value], params: &HashMap<String, String>, patch: &Value) -> Response {
    let mut patched = Vec::new();
    for row in rows.iter_mut().filter(|r| matches_filters(r, params)) {
        if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
            for (k, v) in patch {
                row.insert(k.clone(), v.clone());
            }
        }
        patched.push(row.clone());
    }
    Json(patched).into_response()
}

fn stamp(row: &mut Value, id: i64) {
    let now = chrono::Utc::now().to_rfc3339();
    row["id"] = json!(id);
    row["created_at"] = json!(now);
    row["updated_at"] = json!(now);
}

fn store_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message, "details": null }))).into_response()
}

async fn list_artworks(State(db): State<Db>, headers: HeaderMap, Query(params): Params) -> Response {
    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(ANON_KEY) {
        return store_error(StatusCode::UNAUTHORIZED, "Invalid API key");
    }

    let db = db.lock();
    let id = eq_filter(&params, "id");
    let mut rows: Vec<Value> = db
        .artworks
        .iter()
        .filter(|a| id.is_none_or(|id| row_id(a) == id))
        .map(|a| {
            let mut row = a.clone();
            // nested rows come back in insertion order
            let images: Vec<Value> = db
                .images
                .iter()
                .filter(|i| i["artwork_id"] == json!(row_id(a)))
                .cloned()
                .collect();
            row["artwork_images"] = json!(images);
            row
        })
        .collect();
    rows.reverse();
    Json(rows).into_response()
}

async fn insert_artwork(State(db): State<Db>, Json(mut row): Json<Value>) -> Response {
    let mut db = db.lock();
    let id = db.next_id();
    stamp(&mut row, id);
    if row.get("available").is_none() {
        row["available"] = json!(true);
    }
    if row.get("featured").is_none() {
        row["featured"] = json!(false);
    }
    row["views"] = json!(0);
    db.artworks.push(row.clone());
    (StatusCode::CREATED, Json(vec![row])).into_response()
}

async fn patch_artwork(
    State(db): State<Db>,
    Query(params): Params,
    Json(patch): Json<Value>,
) -> Response {
    let mut db = db.lock();
    let id = eq_filter(&params, "id").unwrap_or_default();
    let Some(row) = db.artworks.iter_mut().find(|a| row_id(a) == id) else {
        return Json(Vec::<Value>::new()).into_response();
    };
    if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
        for (k, v) in patch {
            row.insert(k.clone(), v.clone());
        }
    }
    Json(vec![row.clone()]).into_response()
}

async fn delete_artwork(State(db): State<Db>, Query(params): Params) -> Response {
    let mut db = db.lock();
    let id = eq_filter(&params, "id").unwrap_or_default().to_string();
    db.artworks.retain(|a| row_id(a) != id);
    db.images.retain(|i| i["artwork_id"] != json!(id));
    StatusCode::NO_CONTENT.into_response()
}

async fn insert_image(State(db): State<Db>, Json(mut row): Json<Value>) -> Response {
    let mut db = db.lock();
    if row["image_url"].as_str().is_none_or(str::is_empty) {
        return store_error(StatusCode::BAD_REQUEST, "image_url must not be empty");
    }
    if !db.artworks.iter().any(|a| json!(row_id(a)) == row["artwork_id"]) {
        return store_error(StatusCode::CONFLICT, "violates foreign key constraint");
    }
    let duplicate = db.images.iter().any(|i| {
        i["artwork_id"] == row["artwork_id"] && i["display_order"] == row["display_order"]
    });
    if duplicate {
        return store_error(
            StatusCode::CONFLICT,
            "duplicate key value violates unique constraint",
        );
    }
    let id = db.next_id();
    stamp(&mut row, id);
    db.images.push(row.clone());
    (StatusCode::CREATED, Json(vec![row])).into_response()
}

async fn increment_views(State(db): State<Db>, Json(body): Json<Value>) -> Response {
    let mut db = db.lock();
    let id = body["artwork_id"].as_str().unwrap_or_default().to_string();
    if let Some(row) = db.artworks.iter_mut().find(|a| row_id(a) == id) {
        let views = row["views"].as_i64().unwrap_or(0);
        row["views"] = json!(views + 1);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_ratings(State(db): State<Db>) -> Response {
    let mut rows = db.lock().ratings.clone();
    rows.reverse();
    Json(rows).into_response()
}

async fn upsert_rating(State(db): State<Db>, Json(mut row): Json<Value>) -> Response {
    let mut db = db.lock();
    let existing = db.ratings.iter_mut().find(|r| {
        r["artwork_id"] == row["artwork_id"] && r["user_id"] == row["user_id"]
    });
    if let Some(existing) = existing {
        existing["rating"] = row["rating"].clone();
        existing["updated_at"] = json!(chrono::Utc::now().to_rfc3339());
        return Json(vec![existing.clone()]).into_response();
    }
    let id = db.next_id();
    stamp(&mut row, id);
    db.ratings.push(row.clone());
    (StatusCode::CREATED, Json(vec![row])).into_response()
}

async fn list_reviews(State(db): State<Db>, Query(params): Params) -> Response {
    list_rows(&db.lock().reviews, &params)
}

async fn insert_review(State(db): State<Db>, Json(mut row): Json<Value>) -> Response {
    let mut db = db.lock();
    let id = db.next_id();
    stamp(&mut row, id);
    row["helpful_count"] = json!(0);
    row["approved"] = json!(false);
    db.reviews.push(row.clone());
    (StatusCode::CREATED, Json(vec![row])).into_response()
}

async fn patch_review(
    State(db): State<Db>,
    Query(params): Params,
    Json(patch): Json<Value>,
) -> Response {
    patch_rows(&mut db.lock().reviews, &params, &patch)
}

async fn delete_review(State(db): State<Db>, Query(params): Params) -> Response {
    db.lock().reviews.retain(|r| !matches_filters(r, &params));
    StatusCode::NO_CONTENT.into_response()
}

async fn list_messages(State(db): State<Db>, Query(params): Params) -> Response {
    list_rows(&db.lock().messages, &params)
}

async fn insert_message(State(db): State<Db>, Json(mut row): Json<Value>) -> Response {
    let mut db = db.lock();
    let id = db.next_id();
    stamp(&mut row, id);
    row["read"] = json!(false);
    db.messages.push(row.clone());
    (StatusCode::CREATED, Json(vec![row])).into_response()
}

async fn patch_message(
    State(db): State<Db>,
    Query(params): Params,
    Json(patch): Json<Value>,
) -> Response {
    patch_rows(&mut db.lock().messages, &params, &patch)
}

async fn delete_message(State(db): State<Db>, Query(params): Params) -> Response {
    db.lock().messages.retain(|m| !matches_filters(m, &params));
    StatusCode::NO_CONTENT.into_response()
}

async fn get_profile(State(db): State<Db>, Query(params): Params) -> Response {
    let delay = db.lock().profile_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let id = eq_filter(&params, "id").unwrap_or_default();
    let rows: Vec<Value> = db
        .lock()
        .profiles
        .iter()
        .filter(|p| p["id"] == json!(id))
        .cloned()
        .collect();
    Json(rows).into_response()
}

async fn spawn_mock() -> (String, Db) {
    let db: Db = Arc::new(Mutex::new(MockStore::default()));
    let app = Router::new()
        .route(
            "/rest/v1/artworks",
            get(list_artworks)
                .post(insert_artwork)
                .patch(patch_artwork)
                .delete(delete_artwork),
        )
        .route("/rest/v1/artwork_images", post(insert_image))
        .route("/rest/v1/rpc/increment_views", post(increment_views))
        .route("/rest/v1/ratings", get(list_ratings).post(upsert_rating))
        .route(
            "/rest/v1/reviews",
            get(list_reviews)
                .post(insert_review)
                .patch(patch_review)
                .delete(delete_review),
        )
        .route(
            "/rest/v1/contact_messages",
            get(list_messages)
                .post(insert_message)
                .patch(patch_message)
                .delete(delete_message),
        )
        .route("/rest/v1/profiles", get(get_profile))
        .with_state(db.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), db)
}

fn remote(url: &str) -> RemoteGateway {
    RemoteGateway::new(url, ANON_KEY, Duration::from_secs(5)).unwrap()
}

/// Artwork fields that do not depend on how ids and timestamps are generated
fn shape(artwork: &Artwork) -> (String, String, String, bool, bool, i64, Vec<(String, i32)>) {
    (
        artwork.title.clone(),
        artwork.category.clone(),
        artwork.description.clone(),
        artwork.available,
        artwork.featured,
        artwork.views,
        artwork
            .images
            .iter()
            .map(|i| (i.image_url.clone(), i.display_order))
            .collect(),
    )
}

#[tokio::test]
async fn test_images_are_sorted_by_display_order() {
    let (url, _db) = spawn_mock().await;
    let gw = remote(&url);

    let created = gw
        .create_artwork(&artwork("Dunes", "Photographie"))
        .await
        .unwrap();
    for (url, order) in [("c.jpg", 2), ("a.jpg", 0), ("b.jpg", 1)] {
        gw.upload_image(&created.id, url, order).await.unwrap();
    }

    let fetched = gw.fetch_artworks().await.unwrap();
    let orders: Vec<i32> = fetched[0].images.iter().map(|i| i.display_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
    assert_eq!(fetched[0].primary_image(), Some("a.jpg"));
}

#[tokio::test]
async fn test_create_uploads_images_in_order() {
    let (url, _db) = spawn_mock().await;
    let gw = remote(&url);

    let created = gw
        .create_artwork(&artwork("A", "Aquarelle").with_images(["img1.png", "img2.png"]))
        .await
        .unwrap();
    let orders: Vec<i32> = created.images.iter().map(|i| i.display_order).collect();
    assert_eq!(orders, vec![0, 1]);
    assert!(created.images.iter().all(|i| i.artwork_id == created.id));
}

#[tokio::test]
async fn test_failed_image_upload_removes_artwork() {
    let (url, _db) = spawn_mock().await;
    let gw = remote(&url);

    let err = gw
        .create_artwork(&artwork("Brisé", "Mixte").with_images(["ok.png", ""]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(gw.fetch_artworks().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_display_order_is_rejected() {
    let (url, _db) = spawn_mock().await;
    let gw = remote(&url);
    let created = gw
        .create_artwork(&artwork("E", "Huile").with_images(["e0.jpg"]))
        .await
        .unwrap();

    let err = gw.upload_image(&created.id, "again.jpg", 0).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)), "{err:?}");
}

#[tokio::test]
async fn test_update_of_missing_artwork_is_not_found() {
    let (url, _db) = spawn_mock().await;
    let err = remote(&url)
        .update_artwork("999", &ArtworkUpdate::available(false))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (url, _db) = spawn_mock().await;
    let gw = remote(&url);
    let created = gw.create_artwork(&artwork("F", "Fusain")).await.unwrap();

    gw.delete_artwork(&created.id).await.unwrap();
    gw.delete_artwork(&created.id).await.unwrap();
    assert!(gw.fetch_artworks().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rating_upsert_keeps_one_row() {
    let (url, _db) = spawn_mock().await;
    let gw = remote(&url);
    let upsert = |rating| RatingUpsert {
        artwork_id: "7".into(),
        user_id: "visitor-1".into(),
        rating,
    };

    let first = gw.upsert_rating(&upsert(3)).await.unwrap();
    let second = gw.upsert_rating(&upsert(5)).await.unwrap();
    assert_eq!(first.id, second.id);

    let ratings = gw.fetch_ratings().await.unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].rating, 5);
}

#[tokio::test]
async fn test_review_moderation_round_trip() {
    let (url, _db) = spawn_mock().await;
    let gw = remote(&url);

    let created = gw.create_review(&review("7", 4)).await.unwrap();
    assert!(!created.approved);
    assert_eq!(created.helpful_count, 0);
    gw.create_review(&review("7", 2)).await.unwrap();

    let approve = ReviewUpdate {
        approved: Some(true),
        ..Default::default()
    };
    let approved = gw.update_review(&created.id, &approve).await.unwrap();
    assert!(approved.approved);
    assert!(gw.update_review("999", &approve).await.unwrap_err().is_not_found());

    let reviews = gw.fetch_reviews().await.unwrap();
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[1].id, created.id);
    assert!(reviews[1].approved);

    gw.delete_review(&created.id).await.unwrap();
    gw.delete_review(&created.id).await.unwrap();
    assert_eq!(gw.fetch_reviews().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_helpful_vote_never_lowers_stored_count() {
    let (url, db) = spawn_mock().await;
    let gw = remote(&url);
    let created = gw.create_review(&review("7", 5)).await.unwrap();
    db.lock().reviews[0]["helpful_count"] = json!(10);

    let voted = gw.increment_helpful(&created.id).await.unwrap();
    assert_eq!(voted.helpful_count, 11);
    assert_eq!(db.lock().reviews[0]["helpful_count"], json!(11));

    assert!(gw.increment_helpful("999").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_contact_inbox_round_trip() {
    let (url, _db) = spawn_mock().await;
    let gw = remote(&url);

    let sent = gw.create_contact_message(&contact_message()).await.unwrap();
    assert!(!sent.read);

    let read = gw.mark_message_read(&sent.id).await.unwrap();
    assert!(read.read);
    assert_eq!(read.id, sent.id);
    assert!(gw.mark_message_read("999").await.unwrap_err().is_not_found());

    let inbox: Vec<ContactMessage> = gw.fetch_contact_messages().await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(inbox[0].read);

    gw.delete_contact_message(&sent.id).await.unwrap();
    gw.delete_contact_message(&sent.id).await.unwrap();
    assert!(gw.fetch_contact_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_key_is_permission_denied() {
    let (url, _db) = spawn_mock().await;
    let gw = RemoteGateway::new(&url, "someone-elses-key", Duration::from_secs(5)).unwrap();
    let err = gw.fetch_artworks().await.unwrap_err();
    assert!(matches!(err, ClientError::PermissionDenied(_)));
}

#[tokio::test]
async fn test_local_and_remote_produce_the_same_collection() {
    let (url, _db) = spawn_mock().await;
    let dir = TempDir::new().unwrap();
    let local = LocalGateway::new(LocalStore::open(dir.path()).unwrap());
    let remote = remote(&url);
    let gateways: [&dyn StoreGateway; 2] = [&local, &remote];

    let mut collections = Vec::new();
    for gw in gateways {
        let a = gw
            .create_artwork(&artwork("A", "Aquarelle").with_images(["img1.png", "img2.png"]))
            .await
            .unwrap();
        let b = gw.create_artwork(&artwork("B", "Huile")).await.unwrap();
        let c = gw.create_artwork(&artwork("C", "Portrait")).await.unwrap();

        gw.update_artwork(&a.id, &ArtworkUpdate::available(false))
            .await
            .unwrap();
        gw.update_artwork(&b.id, &ArtworkUpdate::featured(true))
            .await
            .unwrap();
        gw.upload_image(&b.id, "b0.png", 0).await.unwrap();
        gw.increment_views(&b.id).await.unwrap();
        gw.delete_artwork(&c.id).await.unwrap();

        let mut shapes: Vec<_> = gw.fetch_artworks().await.unwrap().iter().map(shape).collect();
        shapes.sort();
        collections.push(shapes);
    }

    assert_eq!(collections[0].len(), 2);
    assert_eq!(collections[0], collections[1]);
}

#[tokio::test]
async fn test_data_layer_over_remote_store() {
    let (url, db) = spawn_mock().await;
    db.lock().profiles.push(json!({
        "id": ADMIN_ID,
        "email": ADMIN_EMAIL,
        "role": "admin",
    }));

    let dir = TempDir::new().unwrap();
    let config = ClientConfig::new(dir.path())
        .with_store(&url, ANON_KEY)
        .with_bootstrap_timeout(Duration::from_secs(3));
    let layer = DataLayer::connect(config, Some(admin_identity()))
        .await
        .unwrap();
    assert_eq!(layer.backend(), BackendKind::Remote);
    assert_eq!(
        layer.session().outcome(),
        BootstrapOutcome::SignedIn { admin: true }
    );

    let created = layer
        .artworks()
        .create(artwork("A", "Aquarelle").with_images(["img1.png", "img2.png"]))
        .await
        .unwrap();
    assert!(!created.id.starts_with("pending-"));
    assert!(layer.artworks().increment_views(&created.id).await.unwrap());

    layer.artworks().load().await.unwrap();
    let cached = layer.artworks().get(&created.id).unwrap();
    assert_eq!(cached.views, 1);
    assert_eq!(cached.images.len(), 2);

    // successful reads are mirrored on the device
    let mirrored: Vec<Artwork> = LocalStore::open(dir.path())
        .unwrap()
        .load(EntityKind::Artworks)
        .unwrap();
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0].id, created.id);

    // the inbox is read but never written to the device
    layer.contact().submit(contact_message()).await.unwrap();
    layer.contact().load().await.unwrap();
    assert_eq!(layer.contact().unread_count(), 1);
    let inbox: Vec<ContactMessage> = LocalStore::open(dir.path())
        .unwrap()
        .load(EntityKind::ContactMessages)
        .unwrap();
    assert!(inbox.is_empty());
}

#[tokio::test]
async fn test_slow_profile_degrades_bootstrap() {
    let (url, db) = spawn_mock().await;
    {
        let mut db = db.lock();
        db.profiles.push(json!({
            "id": ADMIN_ID,
            "email": ADMIN_EMAIL,
            "role": "admin",
        }));
        db.profile_delay = Duration::from_secs(5);
    }

    let dir = TempDir::new().unwrap();
    let config = ClientConfig::new(dir.path())
        .with_store(&url, ANON_KEY)
        .with_bootstrap_timeout(Duration::from_millis(300));

    let started = std::time::Instant::now();
    let layer = DataLayer::connect(config, Some(admin_identity()))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(
        layer.session().outcome(),
        BootstrapOutcome::Degraded { .. }
    ));
    assert!(!layer.session().is_admin());
}
