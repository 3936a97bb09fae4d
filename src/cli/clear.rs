use anyhow::Result;
use clap::Parser;
use serde_json::json;

use crate::cli::{SubCommandExtend, open_desk};
use crate::config::Opts;

/// 清空所有已登记的人脸
#[derive(Parser, Debug, Clone)]
pub struct ClearEncodingsCommand {}

impl SubCommandExtend for ClearEncodingsCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let desk = open_desk(&opts.conf_dir, Default::default(), Default::default()).await?;
        let deleted = desk.clear_encodings().await?;
        let value = json!({ "status": "ok", "deleted": deleted });
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }
}
