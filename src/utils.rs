use std::path::Path;

use indicatif::ProgressStyle;
use opencv::core::{self, KeyPoint, Mat, Vector};
use opencv::prelude::*;
use opencv::{features2d, imgcodecs, imgproc};

/// 读取图片，读取失败时返回空的 Mat
pub fn imread(path: impl AsRef<Path>) -> opencv::Result<Mat> {
    imgcodecs::imread(&path.as_ref().to_string_lossy(), imgcodecs::IMREAD_COLOR)
}

/// 从内存中解码图片，解码失败时返回空的 Mat
pub fn imdecode(bytes: &[u8]) -> opencv::Result<Mat> {
    if bytes.is_empty() {
        return Ok(Mat::default());
    }
    let mat = Mat::from_slice(bytes)?;
    imgcodecs::imdecode(&mat, imgcodecs::IMREAD_COLOR)
}

pub fn imwrite(path: impl AsRef<Path>, img: &impl core::ToInputArray) -> opencv::Result<bool> {
    imgcodecs::imwrite_def(&path.as_ref().to_string_lossy(), img)
}

/// 按宽度等比缩放后的高度，四舍五入且至少为 1
pub fn scaled_height(width: i32, height: i32, target_width: i32) -> i32 {
    let h = (height as f64 * target_width as f64 / width as f64).round() as i32;
    h.max(1)
}

/// 将图片缩放到指定宽度，高度等比缩放
///
/// 宽度小于目标宽度的图片同样会被放大，保证描述符的尺度一致
pub fn resize_to_width(img: &Mat, target_width: i32) -> opencv::Result<Mat> {
    let size = core::Size::new(target_width, scaled_height(img.cols(), img.rows(), target_width));
    let mut output = Mat::default();
    imgproc::resize(img, &mut output, size, 0., 0., imgproc::INTER_LINEAR)?;
    Ok(output)
}

/// 转换为单通道灰度图
pub fn to_gray(img: &Mat) -> opencv::Result<Mat> {
    let code = match img.channels() {
        1 => return img.try_clone(),
        4 => imgproc::COLOR_BGRA2GRAY,
        _ => imgproc::COLOR_BGR2GRAY,
    };
    let mut output = Mat::default();
    imgproc::cvt_color_def(img, &mut output, code)?;
    Ok(output)
}

pub fn draw_keypoints(
    image: &impl core::ToInputArray,
    keypoints: &Vector<KeyPoint>,
) -> opencv::Result<Mat> {
    let mut output = Mat::default();
    features2d::draw_keypoints(
        image,
        keypoints,
        &mut output,
        core::Scalar::all(-1.0),
        features2d::DrawMatchesFlags::DEFAULT,
    )?;
    Ok(output)
}

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .expect("invalid progress bar template")
        .progress_chars("##-")
}
