use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{MatchOptions, Opts, OrbOptions};
use crate::matching::{MatchResult, count_good_matches};
use crate::orb::Extractor;
use crate::utils;

/// 直接比较两张图片，不读写特征池
#[derive(Parser, Debug, Clone)]
pub struct CompareCommand {
    #[command(flatten)]
    pub orb: OrbOptions,
    #[command(flatten)]
    pub matching: MatchOptions,
    /// 作为参考的图片
    pub reference: PathBuf,
    /// 待校验的图片
    pub query: PathBuf,
}

impl SubCommandExtend for CompareCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        block_in_place(|| {
            let mut extractor = Extractor::new(&self.orb)?;
            let reference = extractor.extract(&utils::imread(&self.reference)?);
            let query = extractor.extract(&utils::imread(&self.query)?);

            let result = match (reference.into_descriptors(), query.into_descriptors()) {
                (Some(reference), Some(query)) => MatchResult::new(
                    count_good_matches(&query, &reference, self.matching.ratio),
                    self.matching.min_matches,
                ),
                _ => MatchResult::rejected(),
            };
            let value = json!({ "accepted": result.accepted, "score": result.score });
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        })
    }
}
