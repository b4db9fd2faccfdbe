use log::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::feed::{build_feed_filter, with_owners};
use crate::models::{OwnerSummary, Video, VideoView};
use crate::store::{Similarity, Store, VideoFilter, VideoQuery, VideoSort};

pub const RECOMMENDATION_LIMIT: u64 = 12;
/// Below this many similar videos the list is topped up with popular ones.
pub const BACKFILL_THRESHOLD: usize = 8;

fn similar_filter(source: &Video) -> VideoFilter {
    VideoFilter {
        exclude: vec![source.id],
        similar_to: Some(Similarity {
            category: source.category.as_str().to_string(),
            tags: source.tags.clone(),
        }),
        ..build_feed_filter(None, false)
    }
}

/// Sidebar videos for `source_id`: same category or a shared tag, by views, then popular
/// backfill. Only a missing source is an error; every later step degrades to what it has.
pub async fn recommend(store: &dyn Store, source_id: Uuid) -> Result<Vec<VideoView>, AppError> {
    let source = store
        .find_video(source_id)
        .await?
        .ok_or_else(|| AppError::not_found("Video not found"))?;

    let primary = VideoQuery::new(similar_filter(&source), VideoSort::MostViewed, RECOMMENDATION_LIMIT);
    let mut picked = match store.find_videos(&primary).await {
        Ok(videos) => videos,
        Err(e) => {
            warn!("Similar-video lookup for {} failed: {}", source.id, e);
            Vec::new()
        }
    };

    if picked.len() < BACKFILL_THRESHOLD {
        let mut exclude = vec![source.id];
        exclude.extend(picked.iter().map(|v| v.id));
        let filter = VideoFilter {
            exclude,
            ..build_feed_filter(None, false)
        };
        let remaining = RECOMMENDATION_LIMIT - picked.len() as u64;
        match store
            .find_videos(&VideoQuery::new(filter, VideoSort::Popular, remaining))
            .await
        {
            Ok(more) => picked.extend(more),
            Err(e) => warn!("Popular backfill for {} failed: {}", source.id, e),
        }
    }

    picked.retain(|v| v.id != source.id);
    picked.truncate(RECOMMENDATION_LIMIT as usize);

    match with_owners(store, picked.clone()).await {
        Ok(views) => Ok(views),
        Err(e) => {
            warn!("Owner lookup for recommendations of {} failed: {}", source.id, e);
            Ok(picked
                .into_iter()
                .map(|video| VideoView {
                    owner: OwnerSummary::deleted(video.owner_id),
                    like_count: video.like_count(),
                    video,
                })
                .collect())
        }
    }
}
