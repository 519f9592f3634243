//! # Blob 引用模块
//!
//! ## 设计思路
//!
//! 默认输出形态是“内存 URL”：编码结果不直接交给调用方，而是登记进
//! 进程内存储，换取一个 `blob:` 引用。引用是瞬态的：可随时解引用取字节，
//! 也可显式撤销释放内存；存储随归一化器一起销毁。
//!
//! ## 实现思路
//!
//! - `Mutex<HashMap>` 保存 URL 到字节的映射；锁中毒在登记时报错，
//!   解引用/撤销时按“不存在”处理。
//! - URL 由毫秒时间戳与进程内序号拼成，同一存储内不会重复。

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::NormalizeError;

/// 进程内 blob 存储。
#[derive(Debug, Default)]
pub(crate) struct BlobStore {
    entries: Mutex<HashMap<String, StoredBlob>>,
    next_id: AtomicU64,
}

#[derive(Debug)]
struct StoredBlob {
    media_type: &'static str,
    bytes: Vec<u8>,
}

impl BlobStore {
    /// 登记一段编码结果，返回可解引用、可撤销的引用。
    pub(crate) fn register(
        store: &Arc<Self>,
        bytes: Vec<u8>,
        media_type: &'static str,
    ) -> Result<BlobUrl, NormalizeError> {
        let id = store.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!(
            "blob:photo-normalizer/{}-{}",
            chrono::Utc::now().timestamp_millis(),
            id
        );

        let mut entries = store
            .entries
            .lock()
            .map_err(|_| NormalizeError::ResourceLimit("blob 存储锁已中毒".to_string()))?;
        entries.insert(url.clone(), StoredBlob { media_type, bytes });
        drop(entries);

        log::debug!("🧷 已登记 blob URL: {}", url);
        Ok(BlobUrl {
            url,
            store: Arc::clone(store),
        })
    }

    fn bytes_of(&self, url: &str) -> Option<Vec<u8>> {
        let entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(_) => return None,
        };
        entries.get(url).map(|blob| blob.bytes.clone())
    }

    fn media_type_of(&self, url: &str) -> Option<&'static str> {
        let entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(_) => return None,
        };
        entries.get(url).map(|blob| blob.media_type)
    }

    fn revoke(&self, url: &str) -> bool {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        entries.remove(url).is_some()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

/// 内存 blob 引用。
///
/// 克隆共享同一条目；任意克隆撤销后，其余克隆解引用得到 `None`。
#[derive(Clone)]
pub struct BlobUrl {
    url: String,
    store: Arc<BlobStore>,
}

impl BlobUrl {
    /// 引用 URL 字符串。
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// 解引用出存储的编码字节；已撤销时为 `None`。
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.store.bytes_of(&self.url)
    }

    /// 存储条目的 MIME 类型；已撤销时为 `None`。
    pub fn media_type(&self) -> Option<&'static str> {
        self.store.media_type_of(&self.url)
    }

    /// 撤销引用并释放字节。重复撤销返回 `false`。
    pub fn revoke(&self) -> bool {
        let revoked = self.store.revoke(&self.url);
        if revoked {
            log::debug!("🗑️ 已撤销 blob URL: {}", self.url);
        }
        revoked
    }
}

impl fmt::Debug for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobUrl").field("url", &self.url).finish_non_exhaustive()
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
