use log::{info, warn};
use serde::Serialize;
use tokio::task::block_in_place;

use crate::config::FaceOptions;
use crate::db::{Database, crud};
use crate::face::{Embedding, EnrolledFace, best_match};
use crate::verifier::Verifier;

/// 实时识别的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Recognition {
    Recognized { username: String, similarity: f32 },
    /// 没有任何登记记录时相似度为 -1
    Unknown { similarity: f32 },
}

/// 点名的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckIn {
    /// 图片中没有检测到人脸
    NoFace,
    /// 最相似的人脸也没有达到阈值
    FaceMismatch { similarity: f32 },
    /// 人脸属于另一个用户
    WrongPerson { recognized: String, similarity: f32 },
    /// 人脸通过，但教室水印不匹配
    WatermarkRejected { score: usize },
    Success { similarity: f32, score: usize },
}

impl CheckIn {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// 点名服务：先比对人脸，再校验教室水印
pub struct AttendanceDesk {
    db: Database,
    verifier: Verifier,
    opts: FaceOptions,
}

impl AttendanceDesk {
    pub fn new(db: Database, verifier: Verifier, opts: FaceOptions) -> Self {
        Self { db, verifier, opts }
    }

    /// 登记一个人脸特征向量
    pub async fn enroll(&self, username: &str, embedding: &Embedding) -> anyhow::Result<i64> {
        let id = crud::add_encoding(&self.db, username, &embedding.to_bytes()).await?;
        info!("enrolled face #{id} for {username}");
        Ok(id)
    }

    pub async fn clear_encodings(&self) -> anyhow::Result<u64> {
        let n = crud::clear_encodings(&self.db).await?;
        info!("cleared {n} face encodings");
        Ok(n)
    }

    async fn gallery(&self) -> anyhow::Result<Vec<EnrolledFace>> {
        let records = crud::all_encodings(&self.db).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match Embedding::from_bytes(&record.embedding) {
                Some(embedding) => Some(EnrolledFace { username: record.username, embedding }),
                None => {
                    warn!("skip malformed face encoding #{}", record.id);
                    None
                }
            })
            .collect())
    }

    /// 识别人脸属于哪个已登记的用户
    pub async fn recognize(&self, probe: &Embedding) -> anyhow::Result<Recognition> {
        let gallery = self.gallery().await?;
        Ok(match best_match(probe, &gallery) {
            Some(m) if m.similarity >= self.opts.recognize_threshold => {
                Recognition::Recognized { username: m.username, similarity: m.similarity }
            }
            Some(m) => Recognition::Unknown { similarity: m.similarity },
            None => Recognition::Unknown { similarity: -1. },
        })
    }

    /// 点名
    ///
    /// `probe` 为上传图片中检测到的人脸特征向量，`None` 表示没有检测到人脸。
    /// 只有人脸校验通过后才会进行水印校验。
    pub async fn check_in(
        &self,
        username: &str,
        probe: Option<&Embedding>,
        image: &[u8],
        min_matches: usize,
    ) -> anyhow::Result<CheckIn> {
        let Some(probe) = probe else {
            return Ok(CheckIn::NoFace);
        };

        let gallery = self.gallery().await?;
        let m = match best_match(probe, &gallery) {
            Some(m) if m.similarity >= self.opts.attend_threshold => m,
            Some(m) => return Ok(CheckIn::FaceMismatch { similarity: m.similarity }),
            None => return Ok(CheckIn::FaceMismatch { similarity: -1. }),
        };
        if m.username != username {
            return Ok(CheckIn::WrongPerson { recognized: m.username, similarity: m.similarity });
        }

        let result = block_in_place(|| self.verifier.verify_bytes(image, min_matches));
        if !result.accepted {
            info!("{username}: watermark rejected with score {}", result.score);
            return Ok(CheckIn::WatermarkRejected { score: result.score });
        }

        info!("{username}: checked in, similarity {:.3}, score {}", m.similarity, result.score);
        Ok(CheckIn::Success { similarity: m.similarity, score: result.score })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use opencv::core::Vector;
    use opencv::imgcodecs;

    use super::*;
    use crate::db::init_db;
    use crate::store::{MemoryPoolStore, PoolStore};
    use crate::testutil::textured_image;
    use crate::trainer::Trainer;

    fn png(seed: u64) -> Vec<u8> {
        let mut buf = Vector::<u8>::new();
        imgcodecs::imencode_def(".png", &textured_image(seed, 1000, 750), &mut buf).unwrap();
        buf.to_vec()
    }

    async fn desk(store: Arc<dyn PoolStore>) -> (tempfile::TempDir, AttendanceDesk) {
        let dir = tempfile::tempdir().unwrap();
        let db = init_db(dir.path().join("attendance.db")).await.unwrap();
        let verifier = Verifier::new(store, Default::default());
        (dir, AttendanceDesk::new(db, verifier, FaceOptions::default()))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn recognize_uses_threshold() {
        let (_dir, desk) = desk(Arc::new(MemoryPoolStore::new())).await;
        let probe = Embedding(vec![1.0, 0.0]);
        assert_eq!(desk.recognize(&probe).await.unwrap(), Recognition::Unknown { similarity: -1. });

        desk.enroll("alice", &Embedding(vec![0.0, 1.0])).await.unwrap();
        assert!(matches!(desk.recognize(&probe).await.unwrap(), Recognition::Unknown { .. }));

        desk.enroll("bob", &Embedding(vec![1.0, 0.1])).await.unwrap();
        let Recognition::Recognized { username, .. } = desk.recognize(&probe).await.unwrap() else {
            panic!("bob should be recognized");
        };
        assert_eq!(username, "bob");

        assert_eq!(desk.clear_encodings().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn probe_with_other_dimension_never_matches() {
        let store = Arc::new(MemoryPoolStore::new());
        let (_dir, desk) = desk(store.clone()).await;
        let mut alice = vec![1.0, 0.0, 0.0];
        alice.extend([0.3; 509]);
        desk.enroll("alice", &Embedding(alice)).await.unwrap();

        let room = png(23);
        Trainer::new(store, Default::default()).train_bytes(&[room.clone()]).unwrap();

        let prefix = Embedding(vec![1.0, 0.0, 0.0]);
        let recognition = desk.recognize(&prefix).await.unwrap();
        assert_eq!(recognition, Recognition::Unknown { similarity: -1. });
        assert_eq!(
            desk.check_in("alice", Some(&prefix), &room, 15).await.unwrap(),
            CheckIn::FaceMismatch { similarity: -1. }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn check_in_gates_in_order() {
        let store = Arc::new(MemoryPoolStore::new());
        let (_dir, desk) = desk(store.clone()).await;
        desk.enroll("alice", &Embedding(vec![1.0, 0.0, 0.0])).await.unwrap();
        desk.enroll("bob", &Embedding(vec![0.0, 1.0, 0.0])).await.unwrap();
        let alice = Embedding(vec![0.95, 0.05, 0.0]);
        let room = png(21);

        assert_eq!(desk.check_in("alice", None, &room, 15).await.unwrap(), CheckIn::NoFace);

        let stranger = Embedding(vec![0.0, 0.0, 1.0]);
        assert!(matches!(
            desk.check_in("alice", Some(&stranger), &room, 15).await.unwrap(),
            CheckIn::FaceMismatch { .. }
        ));

        let CheckIn::WrongPerson { recognized, .. } =
            desk.check_in("bob", Some(&alice), &room, 15).await.unwrap()
        else {
            panic!("expected wrong person");
        };
        assert_eq!(recognized, "alice");

        // 尚未训练水印
        assert_eq!(
            desk.check_in("alice", Some(&alice), &room, 15).await.unwrap(),
            CheckIn::WatermarkRejected { score: 0 }
        );

        Trainer::new(store, Default::default()).train_bytes(&[room.clone(), png(22)]).unwrap();
        let result = desk.check_in("alice", Some(&alice), &room, 15).await.unwrap();
        assert!(result.is_success(), "{result:?}");
    }
}
