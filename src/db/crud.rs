use sqlx::{Executor, Result, Sqlite};

use super::EncodingRecord;

/// 添加人脸特征向量记录
pub async fn add_encoding<'c, E>(executor: E, username: &str, embedding: &[u8]) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO encodings (username, embedding)
        VALUES (?, ?)
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(embedding)
    .fetch_one(executor)
    .await
}

/// 按登记顺序获取所有人脸特征向量
pub async fn all_encodings<'c, E>(executor: E) -> Result<Vec<EncodingRecord>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as(
        r#"
        SELECT id, username, embedding FROM encodings ORDER BY id
        "#,
    )
    .fetch_all(executor)
    .await
}

/// 删除所有人脸特征向量，返回删除的数量
pub async fn clear_encodings<'c, E>(executor: E) -> Result<u64>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM encodings").execute(executor).await?;
    Ok(result.rows_affected())
}
