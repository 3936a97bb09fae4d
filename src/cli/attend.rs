use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::{SubCommandExtend, load_embedding, open_desk};
use crate::config::{FaceOptions, MatchOptions, Opts, OrbOptions, WatermarkOptions};

/// 点名：先比对人脸，再校验教室水印
#[derive(Parser, Debug, Clone)]
pub struct AttendCommand {
    #[command(flatten)]
    pub orb: OrbOptions,
    #[command(flatten)]
    pub matching: MatchOptions,
    #[command(flatten)]
    pub face: FaceOptions,
    /// 用户名
    pub username: String,
    /// 点名时拍摄的照片
    pub image: PathBuf,
    /// 照片中检测到的人脸特征向量，缺省表示没有检测到人脸
    #[arg(short, long, value_name = "FILE")]
    pub embedding: Option<PathBuf>,
}

impl SubCommandExtend for AttendCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let probe = self.embedding.as_deref().map(load_embedding).transpose()?;
        let image = std::fs::read(&self.image)
            .with_context(|| format!("读取图片失败: {}", self.image.display()))?;

        let wm = WatermarkOptions { orb: self.orb.clone(), matching: self.matching.clone() };
        let desk = open_desk(&opts.conf_dir, wm, self.face.clone()).await?;
        let result = desk
            .check_in(&self.username, probe.as_ref(), &image, self.matching.min_matches)
            .await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    }
}
