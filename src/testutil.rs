use opencv::core::{self, Mat, Rect, Scalar};
use opencv::imgproc;
use rand::prelude::*;

fn fill_blocks(img: &mut Mat, area: Rect, rng: &mut StdRng) {
    let block = 16;
    for y in (area.y..area.y + area.height).step_by(block) {
        for x in (area.x..area.x + area.width).step_by(block) {
            let color = Scalar::new(
                rng.random_range(0..=255) as f64,
                rng.random_range(0..=255) as f64,
                rng.random_range(0..=255) as f64,
                0.,
            );
            let w = (block as i32).min(area.x + area.width - x);
            let h = (block as i32).min(area.y + area.height - y);
            imgproc::rectangle(&mut *img, Rect::new(x, y, w, h), color, -1, imgproc::LINE_8, 0)
                .unwrap();
        }
    }
}

/// 生成由随机色块组成的纹理图片，相同的种子总是得到相同的图片
pub fn textured_image(seed: u64, width: i32, height: i32) -> Mat {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img =
        Mat::new_rows_cols_with_default(height, width, core::CV_8UC3, Scalar::all(0.)).unwrap();
    fill_blocks(&mut img, Rect::new(0, 0, width, height), &mut rng);
    img
}

/// 白色背景上只有 `patch` 区域带有纹理
pub fn textured_patch(seed: u64, width: i32, height: i32, patch: Rect) -> Mat {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img =
        Mat::new_rows_cols_with_default(height, width, core::CV_8UC3, Scalar::all(255.)).unwrap();
    fill_blocks(&mut img, patch, &mut rng);
    img
}
