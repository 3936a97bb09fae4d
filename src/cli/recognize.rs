use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::{SubCommandExtend, load_embedding, open_desk};
use crate::config::{FaceOptions, Opts};

#[derive(Parser, Debug, Clone)]
pub struct RecognizeCommand {
    #[command(flatten)]
    pub face: FaceOptions,
    /// 人脸特征向量文件（.npy 或 JSON 数组）
    pub embedding: PathBuf,
}

impl SubCommandExtend for RecognizeCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let embedding = load_embedding(&self.embedding)?;
        let desk = open_desk(&opts.conf_dir, Default::default(), self.face.clone()).await?;
        let recognition = desk.recognize(&embedding).await?;
        println!("{}", serde_json::to_string_pretty(&recognition)?);
        Ok(())
    }
}
