use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use log::debug;

use crate::error::Result;
use crate::pool::DescriptorPool;

/// 参考特征池的存储
///
/// 读取方每次调用 `load` 都会得到一份独立且完整的快照，
/// 写入方通过 `replace` 整体替换特征池，不会出现写了一半的状态。
pub trait PoolStore: Send + Sync {
    /// 读取当前的特征池，尚未训练时返回 `None`
    fn load(&self) -> Result<Option<Arc<DescriptorPool>>>;

    /// 原子地替换特征池
    fn replace(&self, pool: DescriptorPool) -> Result<()>;
}

/// 以单个文件保存特征池，写入临时文件后 rename 覆盖
pub struct FilePoolStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    tmp_counter: AtomicU64,
}

impl FilePoolStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()), tmp_counter: AtomicU64::new(0) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".tmp.{}.{}", std::process::id(), n));
        self.path.with_file_name(name)
    }
}

impl PoolStore for FilePoolStore {
    fn load(&self) -> Result<Option<Arc<DescriptorPool>>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let pool = DescriptorPool::decode(&data)?;
        debug!("loaded {} descriptors from {}", pool.len(), self.path.display());
        Ok(Some(Arc::new(pool)))
    }

    fn replace(&self, pool: DescriptorPool) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.tmp_path();
        let result = (|| -> Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(&pool.encode())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)?;
            sync_parent(&self.path)?;
            Ok(())
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

/// 同步所在目录，保证 rename 落盘
fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => File::open(parent)?.sync_all(),
        None => File::open(".")?.sync_all(),
    }
}

/// 保存在内存中的特征池，主要用于测试
#[derive(Default)]
pub struct MemoryPoolStore {
    pool: RwLock<Option<Arc<DescriptorPool>>>,
}

impl MemoryPoolStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PoolStore for MemoryPoolStore {
    fn load(&self) -> Result<Option<Arc<DescriptorPool>>> {
        Ok(self.pool.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn replace(&self, pool: DescriptorPool) -> Result<()> {
        *self.pool.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(pool));
        Ok(())
    }
}
