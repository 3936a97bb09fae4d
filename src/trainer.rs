use std::path::PathBuf;
use std::sync::Arc;

use indicatif::ProgressBar;
use log::{info, warn};
use opencv::core::Mat;
use opencv::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::WatermarkOptions;
use crate::error::{Result, WatermarkError};
use crate::orb::{DescriptorSet, Extraction, Extractor};
use crate::pool::DescriptorPool;
use crate::store::PoolStore;
use crate::utils;

/// 训练结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainReport {
    pub status: &'static str,
    /// 特征池中的描述符总数
    pub total_descriptors: usize,
    /// 成功提取特征的图片数量
    pub images_used: usize,
    /// 被跳过的图片数量
    pub images_skipped: usize,
}

/// 水印训练器，从同一教室的多张照片中构建参考特征池
pub struct Trainer {
    store: Arc<dyn PoolStore>,
    opts: WatermarkOptions,
}

impl Trainer {
    pub fn new(store: Arc<dyn PoolStore>, opts: WatermarkOptions) -> Self {
        Self { store, opts }
    }

    /// 使用一批已解码的图片训练，`None` 或空图片会被跳过
    pub fn train(&self, images: Vec<Option<Mat>>) -> Result<TrainReport> {
        let mut extractor = Extractor::new(&self.opts.orb)?;
        let sets = images
            .into_iter()
            .map(|image| match image {
                Some(image) => self.extract_one(&mut extractor, &image),
                None => Extraction::InsufficientTexture,
            })
            .collect();
        self.finish(sets)
    }

    /// 使用一批未解码的图片数据训练，无法解码的数据会被跳过
    pub fn train_bytes(&self, images: &[Vec<u8>]) -> Result<TrainReport> {
        let sets = self.extract_parallel(images, None, |bytes| utils::imdecode(bytes))?;
        self.finish(sets)
    }

    /// 使用一批图片文件训练，无法读取的文件会被跳过
    pub fn train_files(&self, paths: &[PathBuf]) -> Result<TrainReport> {
        let sets = self.extract_parallel(paths, None, |path| utils::imread(path))?;
        self.finish(sets)
    }

    /// 与 [`Trainer::train_files`] 相同，每处理完一张图片推进一次进度条
    pub fn train_files_with_progress(
        &self,
        paths: &[PathBuf],
        pb: &ProgressBar,
    ) -> Result<TrainReport> {
        let sets = self.extract_parallel(paths, Some(pb), |path| {
            let image = utils::imread(path);
            if image.as_ref().is_ok_and(|m| m.empty()) {
                pb.println(format!("无法读取: {}", path.display()));
            }
            image
        })?;
        self.finish(sets)
    }

    fn extract_parallel<T, F>(
        &self,
        items: &[T],
        pb: Option<&ProgressBar>,
        decode: F,
    ) -> Result<Vec<Extraction>>
    where
        T: Sync,
        F: Fn(&T) -> opencv::Result<Mat> + Sync,
    {
        // 提前创建一次，确保参数错误能作为错误返回而不是被当作纹理不足
        Extractor::new(&self.opts.orb)?;
        Ok(items
            .par_iter()
            .map_init(
                || Extractor::new(&self.opts.orb),
                |extractor, item| {
                    let extraction = match (extractor, decode(item)) {
                        (Ok(extractor), Ok(image)) => self.extract_one(extractor, &image),
                        (Err(_), _) => Extraction::InsufficientTexture,
                        (_, Err(e)) => {
                            warn!("failed to decode training image: {e}");
                            Extraction::InsufficientTexture
                        }
                    };
                    if let Some(pb) = pb {
                        pb.inc(1);
                    }
                    extraction
                },
            )
            .collect())
    }

    /// 先缩放到训练宽度，再交给提取器
    fn extract_one(&self, extractor: &mut Extractor, image: &Mat) -> Extraction {
        if image.empty() {
            return Extraction::InsufficientTexture;
        }
        let Some(width) = self.opts.orb.train_width() else {
            return extractor.extract(image);
        };
        match utils::resize_to_width(image, width) {
            Ok(resized) => extractor.extract(&resized),
            Err(e) => {
                warn!("failed to resize training image: {e}");
                Extraction::InsufficientTexture
            }
        }
    }

    /// 按批次顺序拼接所有描述符并替换特征池
    fn finish(&self, sets: Vec<Extraction>) -> Result<TrainReport> {
        let total = sets.len();
        let usable: Vec<DescriptorSet> =
            sets.into_iter().filter_map(Extraction::into_descriptors).collect();
        if usable.is_empty() {
            warn!("none of the {total} training images yielded enough descriptors");
            return Err(WatermarkError::NoUsableTrainingData);
        }

        let images_used = usable.len();
        let descriptors: Vec<_> = usable.into_iter().flatten().collect();
        let report = TrainReport {
            status: "ok",
            total_descriptors: descriptors.len(),
            images_used,
            images_skipped: total - images_used,
        };

        self.store.replace(DescriptorPool::new(descriptors))?;
        info!(
            "trained watermark with {} descriptors from {} images ({} skipped)",
            report.total_descriptors, report.images_used, report.images_skipped
        );
        Ok(report)
    }
}
