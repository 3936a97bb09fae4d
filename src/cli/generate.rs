use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use opencv::prelude::*;
use serde_json::json;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{DEFAULT_REGION_SIZE, DEFAULT_REGION_STRIDE, Opts};
use crate::region::crop_richest;
use crate::utils;

#[derive(Parser, Debug, Clone)]
pub struct GenerateCommand {
    /// 教室照片
    pub image: PathBuf,
    /// 水印样张的保存路径
    #[arg(short, long, value_name = "FILE", default_value = "watermark.jpg")]
    pub output: PathBuf,
    /// 样张边长
    #[arg(long, value_name = "PIXELS", default_value_t = DEFAULT_REGION_SIZE)]
    pub size: i32,
    /// 搜索网格步长
    #[arg(long, value_name = "PIXELS", default_value_t = DEFAULT_REGION_STRIDE)]
    pub stride: i32,
}

impl SubCommandExtend for GenerateCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        block_in_place(|| {
            let image = utils::imread(&self.image)?;
            if image.empty() {
                anyhow::bail!("无法读取图片: {}", self.image.display());
            }
            let (rect, crop) = crop_richest(&image, self.size, self.stride)?;
            if !utils::imwrite(&self.output, &crop)? {
                anyhow::bail!("无法保存图片: {}", self.output.display());
            }
            let value = json!({
                "status": "ok",
                "x": rect.x,
                "y": rect.y,
                "width": rect.width,
                "height": rect.height,
                "output": self.output,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        })
    }
}
