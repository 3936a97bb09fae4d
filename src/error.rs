use thiserror::Error;

/// 水印子系统的错误类型
///
/// 特征点不足、尚未训练、匹配数量不足都属于正常的否定结果，不会出现在这里
#[derive(Error, Debug)]
pub enum WatermarkError {
    /// 训练批次中没有任何一张图片能提取出足够的特征点
    #[error("no usable training data: no image yielded enough descriptors")]
    NoUsableTrainingData,
    /// 持久化的参考特征池已损坏
    #[error("corrupt reference pool: {0}")]
    CorruptPool(String),
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub type Result<T, E = WatermarkError> = std::result::Result<T, E>;
