//! 从教室照片中挑选纹理最丰富的区域作为水印样张

use log::debug;
use opencv::core::{self, Mat, Rect};
use opencv::imgproc;
use opencv::prelude::*;

use crate::utils;

/// 在步长为 `stride` 的网格上搜索 `size × size` 窗口，返回梯度幅值总和最大的一个
///
/// 梯度为 Sobel(dx=1, dy=1) 的绝对值。窗口只在完全位于图片内部、
/// 且左上角严格小于 `宽/高 - size` 的位置上滑动；得分相同时保留先扫描到的窗口。
/// 图片小于窗口时返回从左上角开始、被图片边界截断的区域。
pub fn richest_window(img: &Mat, size: i32, stride: i32) -> opencv::Result<Rect> {
    let (width, height) = (img.cols(), img.rows());
    if width <= 0 || height <= 0 {
        return Err(opencv::Error::new(core::StsBadArg, "empty image"));
    }
    if size <= 0 || stride <= 0 {
        return Err(opencv::Error::new(core::StsBadArg, "size and stride must be positive"));
    }

    let gray = utils::to_gray(img)?;
    let mut edges = Mat::default();
    imgproc::sobel_def(&gray, &mut edges, core::CV_64F, 1, 1)?;
    let magnitude = core::abs(&edges)?.to_mat()?;

    // 积分图比原图多一行一列，窗口和 = 右下 - 右上 - 左下 + 左上
    let mut sum = Mat::default();
    imgproc::integral(&magnitude, &mut sum, core::CV_64F)?;
    let at = |y: i32, x: i32| sum.at_2d::<f64>(y, x).copied();

    let mut best: Option<(f64, i32, i32)> = None;
    for y in (0..height - size).step_by(stride as usize) {
        for x in (0..width - size).step_by(stride as usize) {
            let score = at(y + size, x + size)? - at(y, x + size)? - at(y + size, x)? + at(y, x)?;
            if best.is_none_or(|(s, _, _)| score > s) {
                best = Some((score, x, y));
            }
        }
    }

    let rect = match best {
        Some((score, x, y)) => {
            debug!("richest {size}x{size} window at ({x}, {y}), score {score:.0}");
            Rect::new(x, y, size, size)
        }
        None => Rect::new(0, 0, size.min(width), size.min(height)),
    };
    Ok(rect)
}

/// 裁剪出纹理最丰富的窗口
pub fn crop_richest(img: &Mat, size: i32, stride: i32) -> opencv::Result<(Rect, Mat)> {
    let rect = richest_window(img, size, stride)?;
    let crop = Mat::roi(img, rect)?.try_clone()?;
    Ok((rect, crop))
}
