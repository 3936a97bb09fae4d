use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{MatchOptions, Opts, OrbOptions, WatermarkOptions};
use crate::store::FilePoolStore;
use crate::utils;
use crate::verifier::Verifier;

#[derive(Parser, Debug, Clone)]
pub struct VerifyCommand {
    #[command(flatten)]
    pub orb: OrbOptions,
    #[command(flatten)]
    pub matching: MatchOptions,
    /// 待校验的图片
    pub image: PathBuf,
}

impl SubCommandExtend for VerifyCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let wm = WatermarkOptions { orb: self.orb.clone(), matching: self.matching.clone() };
        let verifier = Verifier::new(Arc::new(FilePoolStore::new(opts.conf_dir.pool())), wm);
        let result = block_in_place(|| -> Result<_> {
            let image = utils::imread(&self.image)?;
            Ok(verifier.verify_default(&image))
        })?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    }
}
