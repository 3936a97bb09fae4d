use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde_json::json;

use crate::cli::{SubCommandExtend, load_embedding, open_desk};
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct EnrollCommand {
    /// 用户名
    pub username: String,
    /// 人脸特征向量文件（.npy 或 JSON 数组）
    pub embedding: PathBuf,
}

impl SubCommandExtend for EnrollCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let embedding = load_embedding(&self.embedding)?;
        let desk = open_desk(&opts.conf_dir, Default::default(), Default::default()).await?;
        let id = desk.enroll(&self.username, &embedding).await?;
        let value = json!({ "status": "ok", "id": id, "username": self.username });
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }
}
