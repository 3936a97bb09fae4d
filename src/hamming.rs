use bytemuck::pod_read_unaligned;

/// 单次 KNN 搜索支持的最大邻居数量
pub const MAX_K: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    /// 在参考集合中的下标
    pub index: usize,
    /// 汉明距离
    pub distance: u32,
}

/// 计算两个 N 字节描述符的汉明距离
#[inline(always)]
pub fn hamming<const N: usize>(va: &[u8; N], vb: &[u8; N]) -> u32 {
    match N {
        32 => hamming_32(va, vb),
        _ => hamming_naive(va, vb),
    }
}

#[inline(always)]
pub fn hamming_naive(va: &[u8], vb: &[u8]) -> u32 {
    va.iter().zip(vb).map(|(a, b)| (a ^ b).count_ones()).sum()
}

#[inline(always)]
pub fn hamming_32(va: &[u8], vb: &[u8]) -> u32 {
    // Vec<[u8; 32]> 只保证 1 字节对齐，不能直接 cast_slice 成 u64
    let va: [u64; 4] = pod_read_unaligned(&va[..32]);
    let vb: [u64; 4] = pod_read_unaligned(&vb[..32]);
    (va[0] ^ vb[0]).count_ones()
        + (va[1] ^ vb[1]).count_ones()
        + (va[2] ^ vb[2]).count_ones()
        + (va[3] ^ vb[3]).count_ones()
}

/// 在 vb 中暴力搜索与 va 汉明距离最小的 k 个向量
///
/// 返回结果按距离升序排列，距离相同时下标较小者在前。
/// 当 vb 中的向量少于 k 个时，返回的结果也会少于 k 个。
pub fn knn_hamming<const N: usize>(va: &[u8; N], vb: &[[u8; N]], k: usize) -> Vec<Neighbor> {
    assert!(k <= MAX_K, "k must be less than or equal to 8");
    if k == 0 {
        return vec![];
    }
    // 维护一个长度为 k 的单调递增数组，最差的候选位于末尾
    let mut dis = [u32::MAX; MAX_K];
    let mut idx = [0usize; MAX_K];
    for (i, code) in vb.iter().enumerate() {
        let d = hamming::<N>(va, code);
        if d >= dis[k - 1] {
            continue;
        }
        let mut j = k - 1;
        while j > 0 && d < dis[j - 1] {
            dis[j] = dis[j - 1];
            idx[j] = idx[j - 1];
            j -= 1;
        }
        dis[j] = d;
        idx[j] = i;
    }
    idx.into_iter()
        .zip(dis)
        .take(k)
        .filter(|(_, d)| *d != u32::MAX)
        .map(|(index, distance)| Neighbor { index, distance })
        .collect()
}
