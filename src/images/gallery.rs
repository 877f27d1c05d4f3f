//! Gallery ordering for stored images.

use std::cmp::Ordering;

use imgshelf_common::{Result, StoredImage};

use super::storage::ImageStore;

/// List the store newest first, ties broken by filename ascending.
pub async fn listing(store: &ImageStore) -> Result<Vec<StoredImage>> {
    let mut images = store.list().await?;
    sort_for_gallery(&mut images);
    Ok(images)
}

/// Sort in gallery order: `upload_time` descending, then `filename` ascending.
pub fn sort_for_gallery(images: &mut [StoredImage]) {
    images.sort_by(gallery_order);
}

fn gallery_order(a: &StoredImage, b: &StoredImage) -> Ordering {
    b.upload_time
        .cmp(&a.upload_time)
        .then_with(|| a.filename.cmp(&b.filename))
}
