mod attend;
mod clear;
mod compare;
mod enroll;
mod extract;
mod generate;
mod recognize;
mod train;
mod verify;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ndarray::Array1;
use ndarray_npy::read_npy;

pub use attend::*;
pub use clear::*;
pub use compare::*;
pub use enroll::*;
pub use extract::*;
pub use generate::*;
pub use recognize::*;
pub use train::*;
pub use verify::*;

use crate::attendance::AttendanceDesk;
use crate::config::{ConfDir, FaceOptions, Opts, WatermarkOptions};
use crate::db::init_db;
use crate::face::Embedding;
use crate::store::FilePoolStore;
use crate::verifier::Verifier;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 读取人脸特征向量，支持 `.npy` 和 JSON 数组
pub fn load_embedding(path: &Path) -> Result<Embedding> {
    let values = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("npy")) {
        let arr: Array1<f32> =
            read_npy(path).with_context(|| format!("读取 npy 失败: {}", path.display()))?;
        arr.to_vec()
    } else {
        let data = std::fs::read(path)
            .with_context(|| format!("读取文件失败: {}", path.display()))?;
        serde_json::from_slice(&data)
            .with_context(|| format!("解析 JSON 失败: {}", path.display()))?
    };
    let embedding = Embedding(values);
    if embedding.0.is_empty() {
        anyhow::bail!("特征向量为空: {}", path.display());
    }
    Ok(embedding)
}

/// 打开配置目录下的点名服务
async fn open_desk(
    conf_dir: &ConfDir,
    watermark: WatermarkOptions,
    face: FaceOptions,
) -> Result<AttendanceDesk> {
    let db = init_db(conf_dir.database()).await?;
    let verifier = Verifier::new(Arc::new(FilePoolStore::new(conf_dir.pool())), watermark);
    Ok(AttendanceDesk::new(db, verifier, face))
}
