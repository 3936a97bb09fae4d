use log::{debug, warn};
use opencv::core::{KeyPoint, Mat, Ptr, Vector};
use opencv::features2d::{ORB, ORB_ScoreType};
use opencv::prelude::*;

use crate::config::OrbOptions;
use crate::utils;

/// ORB 描述符的字节数
pub const DESCRIPTOR_SIZE: usize = 32;

/// 256 位的 ORB 二进制描述符
pub type Descriptor = [u8; DESCRIPTOR_SIZE];

/// 从单张图片中提取的描述符，按检测顺序排列
pub type DescriptorSet = Vec<Descriptor>;

// 以下参数与 OpenCV ORB 的默认值一致
const EDGE_THRESHOLD: i32 = 31;
const FIRST_LEVEL: i32 = 0;
const WTA_K: i32 = 2;
const PATCH_SIZE: i32 = 31;

/// 一次特征提取的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Descriptors(DescriptorSet),
    /// 图片为空、无法解码或纹理过少
    InsufficientTexture,
}

impl Extraction {
    pub fn into_descriptors(self) -> Option<DescriptorSet> {
        match self {
            Self::Descriptors(des) => Some(des),
            Self::InsufficientTexture => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Descriptors(des) => des.len(),
            Self::InsufficientTexture => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// ORB 特征提取器
///
/// 先将图片缩放到固定宽度并转为灰度图，再提取 ORB 描述符。
/// 提取器本身不访问磁盘和任何共享状态，相同的图片总是得到相同的描述符。
pub struct Extractor {
    orb: Ptr<ORB>,
    width: i32,
    min_descriptors: usize,
}

impl Extractor {
    pub fn new(opts: &OrbOptions) -> opencv::Result<Self> {
        let orb = ORB::create(
            opts.orb_nfeatures as i32,
            opts.orb_scale_factor,
            opts.orb_nlevels as i32,
            EDGE_THRESHOLD,
            FIRST_LEVEL,
            WTA_K,
            ORB_ScoreType::HARRIS_SCORE,
            PATCH_SIZE,
            opts.orb_fast_threshold as i32,
        )?;
        Ok(Self { orb, width: opts.extract_width, min_descriptors: opts.min_descriptors })
    }

    /// 归一化图片尺寸并检测特征点
    ///
    /// 返回归一化后的灰度图、特征点和描述符
    pub fn detect_and_compute(
        &mut self,
        image: &Mat,
    ) -> opencv::Result<(Mat, Vector<KeyPoint>, DescriptorSet)> {
        let resized = utils::resize_to_width(image, self.width)?;
        let gray = utils::to_gray(&resized)?;

        let mask = Mat::default();
        let mut kps = Vector::<KeyPoint>::new();
        let mut des = Mat::default();
        self.orb.detect_and_compute(&gray, &mask, &mut kps, &mut des, false)?;

        let des = if des.rows() == 0 {
            vec![]
        } else {
            if des.cols() as usize != DESCRIPTOR_SIZE {
                return Err(opencv::Error::new(
                    opencv::core::StsBadSize,
                    format!("unexpected descriptor size: {}", des.cols()),
                ));
            }
            bytemuck::cast_slice::<u8, Descriptor>(des.data_bytes()?).to_vec()
        };
        Ok((gray, kps, des))
    }

    /// 提取描述符，描述符过少或处理失败时返回 [`Extraction::InsufficientTexture`]
    pub fn extract(&mut self, image: &Mat) -> Extraction {
        if image.empty() || image.cols() <= 0 || image.rows() <= 0 {
            debug!("empty image, skip extraction");
            return Extraction::InsufficientTexture;
        }
        match self.detect_and_compute(image) {
            Ok((_, _, des)) if des.len() >= self.min_descriptors => Extraction::Descriptors(des),
            Ok((_, _, des)) => {
                debug!("insufficient texture: {} descriptors", des.len());
                Extraction::InsufficientTexture
            }
            Err(e) => {
                warn!("feature extraction failed: {e}");
                Extraction::InsufficientTexture
            }
        }
    }

    /// 解码并提取描述符，无法解码的数据视为纹理不足
    pub fn extract_bytes(&mut self, bytes: &[u8]) -> Extraction {
        match utils::imdecode(bytes) {
            Ok(image) => self.extract(&image),
            Err(e) => {
                warn!("failed to decode image: {e}");
                Extraction::InsufficientTexture
            }
        }
    }
}
