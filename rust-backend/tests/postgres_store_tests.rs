//! Exercises `PgStore` against a live database. Run with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use zentube_backend::models::{Category, Comment, User, Video};
use zentube_backend::store::{PgStore, Store, StoreError, VideoFilter, VideoQuery, VideoSort};

fn video(owner: Uuid, title: &str, category: Category, views: i64) -> Video {
    let now = Utc::now();
    Video {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: String::new(),
        video_url: String::new(),
        video_public_id: String::new(),
        thumbnail: String::new(),
        thumbnail_public_id: String::new(),
        duration: 12.0,
        category,
        tags: vec!["live".to_string()],
        owner_id: owner,
        views,
        likes: Vec::new(),
        dislikes: Vec::new(),
        is_short: false,
        is_published: true,
        is_reported: false,
        comment_count: 0,
        created_at: now,
        updated_at: now,
    }
}

#[ignore]
#[sqlx::test(migrations = "./migrations")]
async fn users_are_unique_by_email(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = User::new("Pat", "pat@example.com", "hash".into());
    store.insert_user(&user).await.unwrap();

    let err = store
        .insert_user(&User::new("Pat Again", "pat@example.com", "hash".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let found = store.find_user_by_email("pat@example.com").await.unwrap().unwrap();
    assert_eq!(found.id, user.id);
}

#[ignore]
#[sqlx::test(migrations = "./migrations")]
async fn video_filters_sorts_and_views(pool: PgPool) {
    let store = PgStore::new(pool);
    let owner = User::new("Owner", "owner@example.com", "hash".into());
    store.insert_user(&owner).await.unwrap();
    let music = video(owner.id, "Music 100%", Category::Music, 10);
    let gaming = video(owner.id, "Gaming", Category::Gaming, 99);
    store.insert_video(&music).await.unwrap();
    store.insert_video(&gaming).await.unwrap();

    let filter = VideoFilter {
        published: Some(true),
        category: Some("Music".into()),
        ..VideoFilter::default()
    };
    assert_eq!(store.count_videos(&filter).await.unwrap(), 1);

    // LIKE wildcards in the search term are literal
    let filter = VideoFilter {
        text: Some("100%".into()),
        ..VideoFilter::default()
    };
    let hits = store.find_videos(&VideoQuery::new(filter, VideoSort::Newest, 10)).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, music.id);

    let all = store
        .find_videos(&VideoQuery::new(VideoFilter::default(), VideoSort::MostViewed, 10))
        .await
        .unwrap();
    assert_eq!(all[0].id, gaming.id);

    let bumped = store.increment_views(music.id).await.unwrap().unwrap();
    assert_eq!(bumped.views, 11);
}

#[ignore]
#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_user_drops_subscription_edges(pool: PgPool) {
    let store = PgStore::new(pool);
    let channel = User::new("Channel", "channel@example.com", "hash".into());
    let fan = User::new("Fan", "fan@example.com", "hash".into());
    store.insert_user(&channel).await.unwrap();
    store.insert_user(&fan).await.unwrap();
    store.set_subscription(fan.id, channel.id, true).await.unwrap();
    assert_eq!(store.subscriber_counts(&[channel.id]).await.unwrap()[&channel.id], 1);

    let clip = video(channel.id, "Clip", Category::Vlogs, 0);
    store.insert_video(&clip).await.unwrap();
    let parent = Comment::new("parent", fan.id, clip.id, None);
    store.insert_comment(&parent).await.unwrap();
    store
        .insert_comment(&Comment::new("reply", channel.id, clip.id, Some(parent.id)))
        .await
        .unwrap();
    assert_eq!(store.delete_replies(parent.id).await.unwrap(), 1);

    assert!(store.delete_user(channel.id).await.unwrap());
    assert!(store.subscriptions_of(fan.id).await.unwrap().is_empty());
}
