use log::warn;
use serde::{Deserialize, Serialize};

/// 人脸特征向量，由外部的人脸识别模型给出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    /// 余弦相似度，范围 [-1, 1]，任一向量为零向量时返回 0
    ///
    /// 维度不同的向量无法比较，返回 `None`
    pub fn similarity(&self, other: &Embedding) -> Option<f32> {
        if self.dim() != other.dim() {
            return None;
        }
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        let denom = norm_a.sqrt() * norm_b.sqrt();
        Some(if denom > 0.0 { dot / denom } else { 0.0 })
    }

    /// 按小端序 f32 打包，用于存入数据库
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() % 4 != 0 {
            return None;
        }
        let values = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Some(Self(values))
    }
}

/// 已登记的人脸
#[derive(Debug, Clone)]
pub struct EnrolledFace {
    pub username: String,
    pub embedding: Embedding,
}

/// 最相似的已登记人脸
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceMatch {
    pub username: String,
    pub similarity: f32,
}

/// 线性扫描所有已登记的人脸，返回相似度最高的一个
///
/// 相似度相同时保留先出现的记录，维度不一致的记录会被跳过。
/// 没有任何可比较的记录时返回 `None`
pub fn best_match(probe: &Embedding, gallery: &[EnrolledFace]) -> Option<FaceMatch> {
    let mut best: Option<FaceMatch> = None;
    for face in gallery {
        let Some(similarity) = probe.similarity(&face.embedding) else {
            warn!(
                "skip {}: embedding has {} dimensions, probe has {}",
                face.username,
                face.embedding.dim(),
                probe.dim()
            );
            continue;
        };
        if best.as_ref().is_none_or(|b| similarity > b.similarity) {
            best = Some(FaceMatch { username: face.username.clone(), similarity });
        }
    }
    best
}
