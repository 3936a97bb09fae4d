//! 参考特征池及其持久化格式
//!
//! 文件布局（小端序）：
//!
//! | 字段     | 长度         | 说明                  |
//! |----------|--------------|-----------------------|
//! | magic    | 4            | `RSWP`                |
//! | version  | 2            | 格式版本，当前为 1    |
//! | dim      | 2            | 单个描述符的字节数    |
//! | count    | 8            | 描述符数量            |
//! | checksum | 32           | payload 的 blake3     |
//! | payload  | count * dim  | 紧密排列的描述符      |

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Result, WatermarkError};
use crate::orb::{DESCRIPTOR_SIZE, Descriptor};

pub const MAGIC: &[u8; 4] = b"RSWP";
pub const VERSION: u16 = 1;
const HEADER_SIZE: usize = 4 + 2 + 2 + 8 + 32;

/// 从同一个教室的所有训练图片中提取出的描述符集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorPool {
    descriptors: Vec<Descriptor>,
}

impl DescriptorPool {
    pub fn new(descriptors: Vec<Descriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// 序列化为带版本号的二进制格式
    pub fn encode(&self) -> Vec<u8> {
        let payload: &[u8] = self.descriptors.as_flattened();
        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&VERSION.to_le_bytes());
        buf.extend_from_slice(&(DESCRIPTOR_SIZE as u16).to_le_bytes());
        buf.extend_from_slice(&(self.descriptors.len() as u64).to_le_bytes());
        buf.extend_from_slice(blake3::hash(payload).as_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    /// 从二进制数据中恢复特征池，任何不一致都视为损坏
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(corrupt(format!("file too short: {} bytes", data.len())));
        }
        let mut rdr = Cursor::new(data);
        let mut magic = [0u8; 4];
        rdr.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = rdr.read_u16::<LittleEndian>()?;
        if version != VERSION {
            return Err(corrupt(format!("unsupported version {version}")));
        }
        let dim = rdr.read_u16::<LittleEndian>()? as usize;
        if dim != DESCRIPTOR_SIZE {
            return Err(corrupt(format!("descriptor size {dim}, expected {DESCRIPTOR_SIZE}")));
        }
        let count = rdr.read_u64::<LittleEndian>()? as usize;
        if count == 0 {
            return Err(corrupt("empty pool"));
        }
        let mut checksum = [0u8; 32];
        rdr.read_exact(&mut checksum)?;

        let payload = &data[HEADER_SIZE..];
        if count.checked_mul(dim) != Some(payload.len()) {
            return Err(corrupt(format!(
                "payload is {} bytes, expected {count} descriptors",
                payload.len()
            )));
        }
        if blake3::hash(payload).as_bytes() != &checksum {
            return Err(corrupt("checksum mismatch"));
        }
        let descriptors = bytemuck::cast_slice::<u8, Descriptor>(payload).to_vec();
        Ok(Self { descriptors })
    }
}

fn corrupt(msg: impl Into<String>) -> WatermarkError {
    WatermarkError::CorruptPool(msg.into())
}
