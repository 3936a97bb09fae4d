use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use opencv::prelude::*;
use serde_json::json;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, OrbOptions};
use crate::orb::Extractor;
use crate::utils;

#[derive(Parser, Debug, Clone)]
pub struct ExtractCommand {
    #[command(flatten)]
    pub orb: OrbOptions,
    /// 图片路径
    pub image: PathBuf,
    /// 将特征点绘制到该文件
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl SubCommandExtend for ExtractCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        block_in_place(|| {
            let image = utils::imread(&self.image)?;
            let mut extractor = Extractor::new(&self.orb)?;

            if let Some(output) = &self.output {
                if image.empty() {
                    anyhow::bail!("无法读取图片: {}", self.image.display());
                }
                let (gray, kps, _) = extractor.detect_and_compute(&image)?;
                let drawn = utils::draw_keypoints(&gray, &kps)?;
                utils::imwrite(output, &drawn)?;
            }

            let extraction = extractor.extract(&image);
            let value = match extraction.into_descriptors() {
                Some(des) => json!({ "status": "ok", "descriptors": des.len() }),
                None => json!({ "status": "insufficient_texture", "descriptors": 0 }),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        })
    }
}
