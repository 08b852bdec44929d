//! Data layer over on-device storage

mod common;

use std::sync::Arc;
use std::time::Duration;

use artspark_client::models::ArtworkUpdate;
use artspark_client::{
    BackendKind, BootstrapOutcome, ClientError, DataLayer, LoadState, ResolvedTheme, ThemeMode,
};
use common::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_aquarelle_end_to_end() {
    let dir = TempDir::new().unwrap();
    let layer = local_admin_layer(dir.path()).await;
    assert_eq!(layer.backend(), BackendKind::Local);
    layer.load_all().await.unwrap();

    let created = layer
        .artworks()
        .create(artwork("A", "Aquarelle").with_images(["img1.png", "img2.png"]))
        .await
        .unwrap();

    let cached = layer.artworks().artworks();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].id, created.id);
    let orders: Vec<i32> = cached[0].images.iter().map(|i| i.display_order).collect();
    assert_eq!(orders, vec![0, 1]);
    assert_eq!(cached[0].primary_image(), Some("img1.png"));

    let gallery = layer.galleries().gallery_by_category("Aquarelle").unwrap();
    assert_eq!(gallery.artwork_count, 1);
    assert_eq!(gallery.available_count, 1);
    assert_eq!(gallery.featured_image, "img1.png");

    layer
        .artworks()
        .update(&created.id, ArtworkUpdate::available(false))
        .await
        .unwrap();

    let gallery = layer.galleries().gallery_by_slug("aquarelle").unwrap();
    assert_eq!(gallery.available_count, 0);
    assert_eq!(gallery.artwork_count, 1);
    let raw = layer.artworks().get(&created.id).unwrap();
    assert!(!raw.available);
    assert!(layer.artworks().available().is_empty());
}

#[tokio::test]
async fn test_collections_survive_restart() {
    let dir = TempDir::new().unwrap();
    let created = {
        let layer = local_admin_layer(dir.path()).await;
        layer
            .artworks()
            .create(artwork("Médina", "Huile").with_images(["medina.jpg"]))
            .await
            .unwrap()
    };

    let layer = DataLayer::connect(local_config(dir.path()), None)
        .await
        .unwrap();
    assert_eq!(layer.session().outcome(), BootstrapOutcome::Anonymous);
    layer.artworks().load().await.unwrap();

    let reloaded = layer.artworks().get(&created.id).unwrap();
    assert_eq!(reloaded.title, "Médina");
    assert_eq!(reloaded.images.len(), 1);
    assert_eq!(layer.artworks().cache().state(), LoadState::Ready);
}

#[tokio::test]
async fn test_rating_upsert_keeps_one_row() {
    let dir = TempDir::new().unwrap();
    let layer = local_admin_layer(dir.path()).await;
    layer.load_all().await.unwrap();
    let art = layer.artworks().create(artwork("B", "Fusain")).await.unwrap();

    layer.ratings().add_rating(&art.id, 2).await.unwrap();
    layer.ratings().add_rating(&art.id, 5).await.unwrap();

    assert_eq!(layer.ratings().rating_count(&art.id), 1);
    assert_eq!(layer.ratings().user_rating(&art.id), Some(5));
    assert_eq!(layer.ratings().average_rating(&art.id), 5.0);

    layer.ratings().load().await.unwrap();
    assert_eq!(layer.ratings().rating_count(&art.id), 1);
    assert_eq!(layer.ratings().user_rating(&art.id), Some(5));
}

#[tokio::test]
async fn test_rating_out_of_range_is_rejected() {
    let dir = TempDir::new().unwrap();
    let layer = local_admin_layer(dir.path()).await;
    let err = layer.ratings().add_rating("a1", 6).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(layer.ratings().rating_count("a1"), 0);
}

#[tokio::test]
async fn test_delete_twice_is_ok() {
    let dir = TempDir::new().unwrap();
    let layer = local_admin_layer(dir.path()).await;
    let art = layer.artworks().create(artwork("C", "Mixte")).await.unwrap();

    layer.artworks().delete(&art.id).await.unwrap();
    layer.artworks().delete(&art.id).await.unwrap();
    assert!(layer.artworks().get(&art.id).is_none());
    assert!(layer.galleries().galleries().is_empty());
}

#[tokio::test]
async fn test_views_counted_once_per_session() {
    let dir = TempDir::new().unwrap();
    let layer = local_admin_layer(dir.path()).await;
    let art = layer.artworks().create(artwork("D", "Portrait")).await.unwrap();

    assert!(layer.artworks().increment_views(&art.id).await.unwrap());
    assert!(!layer.artworks().increment_views(&art.id).await.unwrap());
    assert_eq!(layer.artworks().get(&art.id).unwrap().views, 1);

    layer.artworks().load().await.unwrap();
    assert_eq!(layer.artworks().get(&art.id).unwrap().views, 1);
}

#[tokio::test]
async fn test_image_upload_appends_after_last() {
    let dir = TempDir::new().unwrap();
    let layer = local_admin_layer(dir.path()).await;
    let art = layer
        .artworks()
        .create(artwork("E", "Photographie").with_images(["e0.jpg"]))
        .await
        .unwrap();

    let image = layer.artworks().upload_image(&art.id, "e1.jpg").await.unwrap();
    assert_eq!(image.display_order, 1);

    let cached = layer.artworks().get(&art.id).unwrap();
    let urls: Vec<&str> = cached.images.iter().map(|i| i.image_url.as_str()).collect();
    assert_eq!(urls, vec!["e0.jpg", "e1.jpg"]);
    assert!(cached.images.iter().all(|i| !i.id.starts_with("pending-")));
}

#[tokio::test]
async fn test_bulk_availability() {
    let dir = TempDir::new().unwrap();
    let layer = local_admin_layer(dir.path()).await;
    for title in ["F1", "F2", "F3"] {
        layer.artworks().create(artwork(title, "Huile")).await.unwrap();
    }

    assert_eq!(layer.artworks().set_all_available(false).await.unwrap(), 3);
    assert!(layer.artworks().available().is_empty());
    assert_eq!(layer.artworks().set_all_available(false).await.unwrap(), 0);

    let first = layer.artworks().artworks()[0].clone();
    let toggled = layer.artworks().toggle_featured(&first.id).await.unwrap();
    assert!(toggled.featured);
    assert_eq!(layer.artworks().featured().len(), 1);
}

#[tokio::test]
async fn test_review_visibility_follows_approval() {
    let dir = TempDir::new().unwrap();
    let admin = local_admin_layer(dir.path()).await;
    let art = admin.artworks().create(artwork("G", "Abstrait")).await.unwrap();

    let visitor = DataLayer::connect(local_config(dir.path()), Some(visitor_identity()))
        .await
        .unwrap();
    assert_eq!(
        visitor.session().outcome(),
        BootstrapOutcome::SignedIn { admin: false }
    );
    let submitted = visitor.reviews().add_review(review(&art.id, 4)).await.unwrap();
    assert!(!submitted.approved);
    assert!(visitor.reviews().artwork_reviews(&art.id).is_empty());
    assert!(matches!(
        visitor.reviews().pending_reviews(),
        Err(ClientError::PermissionDenied(_))
    ));

    admin.reviews().load().await.unwrap();
    assert_eq!(admin.reviews().pending_reviews().unwrap().len(), 1);
    admin.reviews().approve(&submitted.id).await.unwrap();

    visitor.reviews().load().await.unwrap();
    let visible = visitor.reviews().artwork_reviews(&art.id);
    assert_eq!(visible.len(), 1);
    let rating = visitor.reviews().artwork_rating(&art.id);
    assert_eq!(rating.count, 1);
    assert_eq!(rating.average, 4.0);
    assert_eq!(rating.distribution, [0, 0, 0, 1, 0]);

    let helpful = visitor.reviews().mark_helpful(&submitted.id).await.unwrap();
    assert_eq!(helpful.helpful_count, 1);

    admin.reviews().delete(&submitted.id).await.unwrap();
    visitor.reviews().load().await.unwrap();
    assert!(visitor.reviews().artwork_reviews(&art.id).is_empty());
}

#[tokio::test]
async fn test_contact_flow() {
    let dir = TempDir::new().unwrap();
    let admin = local_admin_layer(dir.path()).await;
    let visitor = DataLayer::connect(local_config(dir.path()), None)
        .await
        .unwrap();

    let sent = visitor.contact().submit(contact_message()).await.unwrap();
    assert!(!sent.read);
    assert!(visitor.contact().messages().is_empty());
    assert!(matches!(
        visitor.contact().load().await,
        Err(ClientError::PermissionDenied(_))
    ));

    admin.contact().load().await.unwrap();
    assert_eq!(admin.contact().unread_count(), 1);
    admin.contact().mark_read(&sent.id).await.unwrap();
    assert_eq!(admin.contact().unread_count(), 0);
    admin.contact().delete(&sent.id).await.unwrap();
    assert!(admin.contact().messages().is_empty());

    let mut bad = contact_message();
    bad.email = "not-an-email".into();
    assert!(matches!(
        visitor.contact().submit(bad).await,
        Err(ClientError::Validation(_))
    ));
}

#[tokio::test]
async fn test_admin_mutations_require_admin() {
    let dir = TempDir::new().unwrap();
    seed_admin_profile(dir.path());
    let visitor = DataLayer::connect(local_config(dir.path()), Some(visitor_identity()))
        .await
        .unwrap();

    let err = visitor
        .artworks()
        .create(artwork("H", "Huile"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::PermissionDenied(_)));
    assert!(visitor.artworks().artworks().is_empty());
}

#[tokio::test]
async fn test_admin_email_mismatch_is_not_admin() {
    let dir = TempDir::new().unwrap();
    seed_admin_profile(dir.path());
    let layer = DataLayer::connect(
        local_config(dir.path()),
        Some(artspark_client::Identity::new(ADMIN_ID, "someone@else.ma")),
    )
    .await
    .unwrap();
    assert!(!layer.session().is_admin());
}

#[tokio::test]
async fn test_create_rejects_missing_fields() {
    let dir = TempDir::new().unwrap();
    let layer = local_admin_layer(dir.path()).await;
    let err = layer
        .artworks()
        .create(artwork("", "Aquarelle"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(layer.artworks().artworks().is_empty());
}

#[tokio::test]
async fn test_theme_persists_across_layers() {
    let dir = TempDir::new().unwrap();
    {
        let layer = DataLayer::connect(local_config(dir.path()), None)
            .await
            .unwrap();
        assert_eq!(layer.theme().state().mode, ThemeMode::Auto);
        layer.theme().set_mode(ThemeMode::Dark);
    }

    let layer = DataLayer::connect(local_config(dir.path()), None)
        .await
        .unwrap();
    let state = layer.theme().state();
    assert_eq!(state.mode, ThemeMode::Dark);
    assert_eq!(state.resolved, ResolvedTheme::Dark);

    layer.theme().set_mode(ThemeMode::Auto);
    layer.theme().set_system_theme(ResolvedTheme::Dark);
    assert_eq!(layer.theme().state().resolved, ResolvedTheme::Dark);
    layer.theme().set_mode(ThemeMode::Light);
    layer.theme().set_system_theme(ResolvedTheme::Dark);
    assert_eq!(layer.theme().state().resolved, ResolvedTheme::Light);
}

#[tokio::test]
async fn test_refresh_task_reloads_stale_caches_until_dropped() {
    let dir = TempDir::new().unwrap();
    {
        let admin = local_admin_layer(dir.path()).await;
        admin.artworks().create(artwork("I", "Huile")).await.unwrap();
    }

    let config = local_config(dir.path())
        .with_stale_after(Duration::from_millis(10))
        .with_refresh_interval(Duration::from_millis(50));
    let layer = Arc::new(DataLayer::connect(config, None).await.unwrap());
    assert_eq!(layer.artworks().cache().state(), LoadState::Uninitialized);

    let handle = layer.spawn_refresh_task();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(layer.artworks().cache().state(), LoadState::Ready);
    assert_eq!(layer.artworks().artworks().len(), 1);
    assert_eq!(layer.reviews().cache().state(), LoadState::Ready);
    // visitors hold no inbox
    assert_eq!(layer.contact().cache().state(), LoadState::Uninitialized);

    drop(layer);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}
