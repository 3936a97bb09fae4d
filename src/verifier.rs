use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info};
use opencv::core::Mat;

use crate::config::WatermarkOptions;
use crate::matching::{MatchResult, count_good_matches};
use crate::orb::{Extraction, Extractor};
use crate::store::PoolStore;

/// 水印校验器
///
/// 任何失败都会表现为 `(false, 0)`，不会向调用方返回错误
pub struct Verifier {
    store: Arc<dyn PoolStore>,
    opts: WatermarkOptions,
}

impl Verifier {
    pub fn new(store: Arc<dyn PoolStore>, opts: WatermarkOptions) -> Self {
        Self { store, opts }
    }

    pub fn options(&self) -> &WatermarkOptions {
        &self.opts
    }

    /// 使用默认的最少匹配数量进行校验
    pub fn verify_default(&self, image: &Mat) -> MatchResult {
        self.verify(image, self.opts.matching.min_matches)
    }

    pub fn verify(&self, image: &Mat, min_matches: usize) -> MatchResult {
        self.verify_with(min_matches, |extractor| extractor.extract(image))
    }

    pub fn verify_bytes(&self, bytes: &[u8], min_matches: usize) -> MatchResult {
        self.verify_with(min_matches, |extractor| extractor.extract_bytes(bytes))
    }

    fn verify_with<F>(&self, min_matches: usize, extract: F) -> MatchResult
    where
        F: FnOnce(&mut Extractor) -> Extraction,
    {
        // 每次调用独立读取一份快照，训练过程中替换特征池不影响本次校验
        let pool = match self.store.load() {
            Ok(Some(pool)) => pool,
            Ok(None) => {
                info!("watermark has not been trained yet");
                return MatchResult::rejected();
            }
            Err(e) => {
                error!("failed to load reference pool, treating as untrained: {e}");
                return MatchResult::rejected();
            }
        };

        let mut extractor = match Extractor::new(&self.opts.orb) {
            Ok(extractor) => extractor,
            Err(e) => {
                error!("failed to create ORB extractor: {e}");
                return MatchResult::rejected();
            }
        };
        let query = match extract(&mut extractor) {
            Extraction::Descriptors(des) => des,
            Extraction::InsufficientTexture => {
                info!("query image has insufficient texture");
                return MatchResult::rejected();
            }
        };

        let start = Instant::now();
        let score = count_good_matches(&query, pool.descriptors(), self.opts.matching.ratio);
        debug!(
            "matched {} query descriptors against {} in {:.2}ms",
            query.len(),
            pool.len(),
            start.elapsed().as_secs_f32() * 1000.
        );

        let result = MatchResult::new(score, min_matches);
        info!("found {} good matches, accepted: {}", result.score, result.accepted);
        result
    }
}

#[cfg(test)]
mod tests {
    use opencv::core::{self, Scalar};
    use opencv::prelude::*;

    use super::*;
    use crate::error::{Result, WatermarkError};
    use crate::orb::DESCRIPTOR_SIZE;
    use crate::pool::DescriptorPool;
    use crate::store::MemoryPoolStore;
    use crate::testutil::textured_image;

    struct BrokenStore;

    impl PoolStore for BrokenStore {
        fn load(&self) -> Result<Option<Arc<DescriptorPool>>> {
            Err(WatermarkError::CorruptPool("bad magic".into()))
        }

        fn replace(&self, _pool: DescriptorPool) -> Result<()> {
            Ok(())
        }
    }

    fn pool_from(img: &Mat) -> DescriptorPool {
        let mut ex = Extractor::new(&Default::default()).unwrap();
        DescriptorPool::new(ex.extract(img).into_descriptors().unwrap())
    }

    #[test]
    fn untrained_is_rejected() {
        let verifier = Verifier::new(Arc::new(MemoryPoolStore::new()), Default::default());
        let img = textured_image(1, 640, 480);
        assert_eq!(verifier.verify_default(&img), MatchResult::rejected());
    }

    #[test]
    fn corrupt_pool_is_rejected() {
        let verifier = Verifier::new(Arc::new(BrokenStore), Default::default());
        let img = textured_image(1, 640, 480);
        assert_eq!(verifier.verify(&img, 0), MatchResult::rejected());
    }

    #[test]
    fn tiny_pool_does_not_crash() {
        let store = Arc::new(MemoryPoolStore::new());
        store.replace(DescriptorPool::new(vec![[0u8; DESCRIPTOR_SIZE]])).unwrap();
        let verifier = Verifier::new(store, Default::default());
        let img = textured_image(2, 640, 480);
        assert_eq!(verifier.verify(&img, 15), MatchResult::new(0, 15));
    }

    #[test]
    fn same_image_is_accepted_and_stable() {
        let img = textured_image(5, 1024, 768);
        let store = Arc::new(MemoryPoolStore::new());
        let mut descriptors = pool_from(&img).descriptors().to_vec();
        descriptors.extend_from_slice(pool_from(&textured_image(6, 1024, 768)).descriptors());
        store.replace(DescriptorPool::new(descriptors)).unwrap();

        let verifier = Verifier::new(store, Default::default());
        let first = verifier.verify_default(&img);
        assert!(first.accepted);
        assert!(first.score >= 15);
        assert_eq!(verifier.verify_default(&img), first);
    }

    #[test]
    fn blank_image_is_rejected() {
        let store = Arc::new(MemoryPoolStore::new());
        store.replace(pool_from(&textured_image(5, 1024, 768))).unwrap();
        let verifier = Verifier::new(store, Default::default());
        let blank =
            Mat::new_rows_cols_with_default(768, 1024, core::CV_8UC3, Scalar::all(255.)).unwrap();
        assert_eq!(verifier.verify_default(&blank), MatchResult::rejected());
        assert_eq!(verifier.verify_bytes(b"not an image", 0), MatchResult::rejected());
    }
}
