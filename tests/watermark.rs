use std::sync::Arc;

use opencv::core::{self, Mat, Rect, Scalar};
use opencv::imgproc;
use opencv::prelude::*;
use rand::prelude::*;
use roomstamp::{
    FilePoolStore, MatchResult, MemoryPoolStore, PoolStore, Trainer, Verifier, WatermarkError,
};

fn classroom(seed: u64) -> Mat {
    let mut rng = StdRng::seed_from_u64(seed);
    let (width, height) = (1000, 750);
    let mut img =
        Mat::new_rows_cols_with_default(height, width, core::CV_8UC3, Scalar::all(0.)).unwrap();
    for y in (0..height).step_by(16) {
        for x in (0..width).step_by(16) {
            let color = Scalar::new(
                rng.random_range(0..=255) as f64,
                rng.random_range(0..=255) as f64,
                rng.random_range(0..=255) as f64,
                0.,
            );
            imgproc::rectangle(&mut img, Rect::new(x, y, 16, 16), color, -1, imgproc::LINE_8, 0)
                .unwrap();
        }
    }
    img
}

fn blank() -> Mat {
    Mat::new_rows_cols_with_default(750, 1000, core::CV_8UC3, Scalar::all(255.)).unwrap()
}

fn train(store: Arc<dyn PoolStore>, seeds: &[u64]) {
    let images = seeds.iter().map(|&s| Some(classroom(s))).collect();
    Trainer::new(store, Default::default()).train(images).unwrap();
}

#[test]
fn train_then_verify() {
    let store = Arc::new(MemoryPoolStore::new());
    train(store.clone(), &[1, 2, 3]);
    let verifier = Verifier::new(store, Default::default());

    let result = verifier.verify_default(&classroom(2));
    assert!(result.accepted, "{result:?}");
    assert!(result.score >= 15);
    assert_eq!(verifier.verify_default(&classroom(2)), result);

    assert_eq!(verifier.verify_default(&blank()), MatchResult::rejected());
}

#[test]
fn min_matches_only_moves_the_threshold() {
    let store = Arc::new(MemoryPoolStore::new());
    train(store.clone(), &[4, 5]);
    let verifier = Verifier::new(store, Default::default());

    let img = classroom(4);
    let score = verifier.verify(&img, 0).score;
    assert!(score > 0);
    assert_eq!(verifier.verify(&img, score), MatchResult { accepted: true, score });
    assert_eq!(verifier.verify(&img, score + 1), MatchResult { accepted: false, score });
}

#[test]
fn untrained_store_rejects_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FilePoolStore::new(dir.path().join("watermark.pool")));
    let verifier = Verifier::new(store, Default::default());
    assert_eq!(verifier.verify(&classroom(1), 0), MatchResult::rejected());
}

#[test]
fn failed_training_keeps_the_previous_pool() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("watermark.pool");
    let store = Arc::new(FilePoolStore::new(&path));
    train(store.clone(), &[7]);
    let before = std::fs::read(&path).unwrap();

    let trainer = Trainer::new(store.clone(), Default::default());
    let err = trainer.train_bytes(&[b"not an image".to_vec(), vec![]]).unwrap_err();
    assert!(matches!(err, WatermarkError::NoUsableTrainingData));
    assert!(matches!(
        trainer.train(vec![Some(blank())]),
        Err(WatermarkError::NoUsableTrainingData)
    ));

    assert_eq!(std::fs::read(&path).unwrap(), before);
    let verifier = Verifier::new(store, Default::default());
    assert!(verifier.verify_default(&classroom(7)).accepted);
}

#[test]
fn retraining_replaces_the_pool() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FilePoolStore::new(dir.path().join("watermark.pool")));
    train(store.clone(), &[8]);
    let first = store.load().unwrap().unwrap();

    train(store.clone(), &[8]);
    assert_eq!(store.load().unwrap().unwrap(), first);

    train(store.clone(), &[9, 10]);
    let verifier = Verifier::new(store, Default::default());
    assert!(verifier.verify_default(&classroom(9)).accepted);
}

#[test]
fn corrupt_pool_file_is_treated_as_untrained() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("watermark.pool");
    std::fs::write(&path, b"RSWP garbage").unwrap();

    let store = Arc::new(FilePoolStore::new(&path));
    assert!(matches!(store.load(), Err(WatermarkError::CorruptPool(_))));
    let verifier = Verifier::new(store, Default::default());
    assert_eq!(verifier.verify(&classroom(1), 0), MatchResult::rejected());
}

#[test]
fn train_from_files_skips_unreadable_paths() {
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("room.png");
    opencv::imgcodecs::imwrite_def(&photo.to_string_lossy(), &classroom(11)).unwrap();

    let store = Arc::new(MemoryPoolStore::new());
    let trainer = Trainer::new(store.clone(), Default::default());
    let report = trainer.train_files(&[dir.path().join("missing.jpg"), photo]).unwrap();
    assert_eq!(report.images_used, 1);
    assert_eq!(report.images_skipped, 1);
    assert_eq!(report.total_descriptors, store.load().unwrap().unwrap().len());

    let verifier = Verifier::new(store, Default::default());
    assert!(verifier.verify_default(&classroom(11)).accepted);
}
