use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;

/// ORB 特征点最大保留数量
pub const DEFAULT_NFEATURES: u32 = 2000;
/// ORB 特征金字塔缩放因子
pub const DEFAULT_SCALE_FACTOR: f32 = 1.2;
/// ORB 特征金字塔层数
pub const DEFAULT_NLEVELS: u32 = 8;
/// ORB FAST 角点检测器阈值
pub const DEFAULT_FAST_THRESHOLD: u32 = 20;
/// 提取特征前图片被缩放到的宽度
pub const DEFAULT_EXTRACT_WIDTH: i32 = 1024;
/// 训练时预先缩放到的宽度
pub const DEFAULT_TRAIN_WIDTH: i32 = 1000;
/// 描述符少于该数量的图片视为纹理不足
pub const DEFAULT_MIN_DESCRIPTORS: usize = 20;
/// Lowe's ratio test 阈值
pub const DEFAULT_RATIO: f32 = 0.85;
/// 判定水印匹配所需的最少匹配数量
pub const DEFAULT_MIN_MATCHES: usize = 15;
/// 实时识别的相似度阈值
pub const DEFAULT_RECOGNIZE_THRESHOLD: f32 = 0.5;
/// 点名时人脸比对的相似度阈值
pub const DEFAULT_ATTEND_THRESHOLD: f32 = 0.6;
/// 水印样张的边长
pub const DEFAULT_REGION_SIZE: i32 = 400;
/// 搜索水印样张时的网格步长
pub const DEFAULT_REGION_STRIDE: i32 = 20;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs =
        ProjectDirs::from("", "roomstamp", "roomstamp").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap_or(".")
}

#[derive(Parser, Debug, Clone)]
pub struct OrbOptions {
    /// ORB 特征点最大保留数量
    #[arg(short = 'n', value_name = "N", long, default_value_t = DEFAULT_NFEATURES)]
    pub orb_nfeatures: u32,
    /// ORB 特征金字塔缩放因子
    #[arg(long, value_name = "SCALE", default_value_t = DEFAULT_SCALE_FACTOR)]
    pub orb_scale_factor: f32,
    /// ORB 特征金字塔层数
    #[arg(long, value_name = "N", default_value_t = DEFAULT_NLEVELS)]
    pub orb_nlevels: u32,
    /// ORB FAST 角点检测器阈值
    #[arg(long, value_name = "THRESHOLD", default_value_t = DEFAULT_FAST_THRESHOLD)]
    pub orb_fast_threshold: u32,
    /// 提取特征前将图片缩放到的宽度，高度等比缩放
    #[arg(long, value_name = "WIDTH", default_value_t = DEFAULT_EXTRACT_WIDTH)]
    pub extract_width: i32,
    /// 训练时预先缩放到的宽度
    #[arg(long, value_name = "WIDTH", default_value_t = DEFAULT_TRAIN_WIDTH)]
    pub train_width: i32,
    /// 训练时跳过预缩放，只按 extract_width 缩放一次
    #[arg(long)]
    pub no_train_resize: bool,
    /// 描述符少于该数量的图片视为纹理不足
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MIN_DESCRIPTORS)]
    pub min_descriptors: usize,
}

impl Default for OrbOptions {
    fn default() -> Self {
        Self {
            orb_nfeatures: DEFAULT_NFEATURES,
            orb_scale_factor: DEFAULT_SCALE_FACTOR,
            orb_nlevels: DEFAULT_NLEVELS,
            orb_fast_threshold: DEFAULT_FAST_THRESHOLD,
            extract_width: DEFAULT_EXTRACT_WIDTH,
            train_width: DEFAULT_TRAIN_WIDTH,
            no_train_resize: false,
            min_descriptors: DEFAULT_MIN_DESCRIPTORS,
        }
    }
}

impl OrbOptions {
    /// 训练时的预缩放宽度，关闭预缩放时返回 None
    pub fn train_width(&self) -> Option<i32> {
        (!self.no_train_resize).then_some(self.train_width)
    }
}

#[derive(Parser, Debug, Clone)]
pub struct MatchOptions {
    /// Lowe's ratio test 阈值，最佳距离必须严格小于 ratio * 次佳距离
    #[arg(long, value_name = "RATIO", default_value_t = DEFAULT_RATIO)]
    pub ratio: f32,
    /// 判定水印匹配所需的最少匹配数量
    #[arg(short = 'm', long, value_name = "N", default_value_t = DEFAULT_MIN_MATCHES)]
    pub min_matches: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self { ratio: DEFAULT_RATIO, min_matches: DEFAULT_MIN_MATCHES }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct FaceOptions {
    /// 实时识别的相似度阈值
    #[arg(long, value_name = "SIM", default_value_t = DEFAULT_RECOGNIZE_THRESHOLD)]
    pub recognize_threshold: f32,
    /// 点名时人脸比对的相似度阈值
    #[arg(long, value_name = "SIM", default_value_t = DEFAULT_ATTEND_THRESHOLD)]
    pub attend_threshold: f32,
}

impl Default for FaceOptions {
    fn default() -> Self {
        Self {
            recognize_threshold: DEFAULT_RECOGNIZE_THRESHOLD,
            attend_threshold: DEFAULT_ATTEND_THRESHOLD,
        }
    }
}

/// 水印训练与校验共用的参数
#[derive(Debug, Clone, Default)]
pub struct WatermarkOptions {
    pub orb: OrbOptions,
    pub matching: MatchOptions,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "roomstamp", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// roomstamp 配置文件目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 提取一张图片的特征点
    Extract(ExtractCommand),
    /// 从教室照片中裁剪纹理最丰富的区域作为水印样张
    Generate(GenerateCommand),
    /// 使用教室照片训练水印参考特征池
    Train(TrainCommand),
    /// 校验一张图片是否拍摄于已训练的教室
    Verify(VerifyCommand),
    /// 计算两张图片之间通过 ratio test 的匹配数量
    Compare(CompareCommand),
    /// 登记人脸特征向量
    Enroll(EnrollCommand),
    /// 识别人脸特征向量属于哪个用户
    Recognize(RecognizeCommand),
    /// 点名：人脸与水印双重校验
    Attend(AttendCommand),
    /// 清空所有已登记的人脸特征向量
    ClearEncodings(ClearEncodingsCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回参考特征池文件的路径
    pub fn pool(&self) -> PathBuf {
        self.path.join("watermark.pool")
    }

    /// 返回人脸数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("attendance.db")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli() {
        let opts = Opts::parse_from(["roomstamp", "-c", "/tmp/x", "verify", "a.jpg"]);
        let SubCommand::Verify(cmd) = opts.subcmd else { panic!("expected verify") };
        assert_eq!(cmd.matching.min_matches, MatchOptions::default().min_matches);
        assert_eq!(cmd.matching.ratio, MatchOptions::default().ratio);
        assert_eq!(cmd.orb.orb_nfeatures, OrbOptions::default().orb_nfeatures);
        assert_eq!(opts.conf_dir.pool(), PathBuf::from("/tmp/x/watermark.pool"));
    }

    #[test]
    fn train_width_can_be_disabled() {
        let mut orb = OrbOptions::default();
        assert_eq!(orb.train_width(), Some(DEFAULT_TRAIN_WIDTH));
        orb.no_train_resize = true;
        assert_eq!(orb.train_width(), None);
    }
}
