/// 人脸特征向量记录
#[derive(Debug, sqlx::FromRow)]
pub struct EncodingRecord {
    pub id: i64,
    /// 所属用户名
    pub username: String,
    /// 小端序 f32 数组
    pub embedding: Vec<u8>,
}
