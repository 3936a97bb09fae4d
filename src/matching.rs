use rayon::prelude::*;
use serde::Serialize;

use crate::hamming::{Neighbor, knn_hamming};
use crate::orb::Descriptor;

/// 一次水印校验的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub accepted: bool,
    /// 通过 ratio test 的匹配数量
    pub score: usize,
}

impl MatchResult {
    /// `accepted` 始终等于 `score >= min_matches`
    pub fn new(score: usize, min_matches: usize) -> Self {
        Self { accepted: score >= min_matches, score }
    }

    pub fn rejected() -> Self {
        Self { accepted: false, score: 0 }
    }
}

/// Lowe's ratio test：最佳距离必须严格小于 ratio 倍的次佳距离
///
/// 少于两个邻居时无法判断，视为不通过
#[inline]
pub fn passes_ratio_test(neighbors: &[Neighbor], ratio: f32) -> bool {
    match neighbors {
        [best, second, ..] => (best.distance as f32) < ratio * second.distance as f32,
        _ => false,
    }
}

/// 为每个查询描述符在参考集合中搜索 2 个最近邻，统计通过 ratio test 的数量
pub fn count_good_matches(query: &[Descriptor], reference: &[Descriptor], ratio: f32) -> usize {
    if reference.len() < 2 {
        return 0;
    }
    query
        .par_iter()
        .filter(|q| passes_ratio_test(&knn_hamming(q, reference, 2), ratio))
        .count()
}
