use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use indicatif::ProgressBar;
use log::info;
use regex::Regex;
use tokio::task::block_in_place;
use walkdir::WalkDir;

use crate::cli::SubCommandExtend;
use crate::config::{MatchOptions, Opts, OrbOptions, WatermarkOptions};
use crate::store::FilePoolStore;
use crate::trainer::Trainer;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct TrainCommand {
    #[command(flatten)]
    pub orb: OrbOptions,
    /// 教室照片，可以是单个文件或目录
    #[arg(required = true)]
    pub path: Vec<PathBuf>,
    /// 扫描目录时的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,jpeg,png,webp")]
    pub suffix: String,
}

impl TrainCommand {
    /// 展开目录，按路径排序以保证特征池的顺序稳定
    fn collect_images(&self) -> Result<Vec<PathBuf>> {
        let re_suf = Regex::new(&format!("(?i)^({})$", self.suffix.replace(',', "|")))?;
        let mut images = vec![];
        for path in &self.path {
            if path.is_file() {
                images.push(path.clone());
                continue;
            }
            let mut found: Vec<_> = WalkDir::new(path)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| {
                    p.extension().is_some_and(|ext| re_suf.is_match(&ext.to_string_lossy()))
                })
                .collect();
            found.sort();
            images.extend(found);
        }
        Ok(images)
    }
}

impl SubCommandExtend for TrainCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let images = self.collect_images()?;
        info!("找到 {} 张训练图片", images.len());

        let wm = WatermarkOptions { orb: self.orb.clone(), matching: MatchOptions::default() };
        let store = Arc::new(FilePoolStore::new(opts.conf_dir.pool()));
        let trainer = Trainer::new(store, wm);

        let pb = ProgressBar::new(images.len() as u64).with_style(pb_style());
        let report = block_in_place(|| trainer.train_files_with_progress(&images, &pb))?;
        pb.finish_with_message("训练完成");

        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
