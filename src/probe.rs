//! # 解码能力探测模块
//!
//! ## 设计思路
//!
//! 不同解码环境对 EXIF 方向的处理不一致：有的在解码时就按方向标签旋转像素，
//! 有的原样返回。若环境已自动旋转而流水线再旋转一次，图片会被转过头。
//! 因此在构造归一化器时解码一张内嵌探测图，按报告尺寸判定环境行为，
//! 结果作为显式值存入归一化器，供每个条目的方向解析只读使用。
//!
//! ## 实现思路
//!
//! 探测图为 3x2 黑白 JPEG，EXIF 方向标签为 6：
//! 原始像素布局（B=黑，F=白）：
//!
//! ```text
//! BFF
//! BBB
//! ```
//!
//! 自动旋转的解码器会报告 2x3（已转正），原样解码的报告 3x2。
//! 探测图本身解码失败时按“不自动旋转”处理并告警，该方向是安全侧。

use base64::{Engine as _, engine::general_purpose};
use image::GenericImageView;

use crate::error::NormalizeError;

/// 探测图的 base64 载荷（350 字节 JPEG）。
const ORIENTATION_PROBE_JPEG_BASE64: &str = concat!(
    "/9j/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAA",
    "AAAD/2wCEAAEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBA",
    "QEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE",
    "BAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAf/AABEIAAIAAwMBEQACEQEDEQH/x",
    "ABRAAEAAAAAAAAAAAAAAAAAAAAKEAEBAQADAQEAAAAAAAAAAAAGBQQDCAkCBwEBAAAAAAA",
    "AAAAAAAAAAAAAABEBAAAAAAAAAAAAAAAAAAAAAP/aAAwDAQACEQMRAD8AG8T9NfSMEVMhQ",
    "voP3fFiRZ+MTHDifa/95OFSZU5OzRzxkyejv8ciEfhSceSXGjS8eSdLnZc2HDm4M3BxcXw",
    "H/9k=",
);

/// 解码环境能力。
///
/// 构造后只读；归一化器每处理一个条目读取一次 `auto_orients`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderCapabilities {
    /// 解码器是否在解码时自动应用 EXIF 方向。
    pub auto_orients: bool,
}

impl DecoderCapabilities {
    /// 解码内嵌探测图，判定解码环境是否自动旋转。
    ///
    /// # 示例
    /// ```rust
    /// use photo_normalizer::DecoderCapabilities;
    ///
    /// // `image` crate 解码时不应用 EXIF 方向，流水线负责手动旋转。
    /// let capabilities = DecoderCapabilities::probe();
    /// assert!(!capabilities.auto_orients);
    /// ```
    pub fn probe() -> Self {
        let auto_orients = match Self::decode_probe_dimensions() {
            Ok((width, height)) => Self::reports_auto_rotation(width, height),
            Err(err) => {
                log::warn!("⚠️ 方向探测图解码失败，按手动旋转处理：{}", err);
                false
            }
        };

        log::info!("🧭 解码器自动旋转探测结果: {}", auto_orients);
        Self { auto_orients }
    }

    /// 探测图报告 2x3 即已被自动转正；报告原始 3x2 则未处理方向。
    const fn reports_auto_rotation(width: u32, height: u32) -> bool {
        width == 2 && height == 3
    }

    fn decode_probe_dimensions() -> Result<(u32, u32), NormalizeError> {
        let bytes = general_purpose::STANDARD
            .decode(ORIENTATION_PROBE_JPEG_BASE64)
            .map_err(|e| NormalizeError::Decode(format!("探测图 base64 解码失败：{}", e)))?;

        let image = image::load_from_memory(&bytes)
            .map_err(|e| NormalizeError::Decode(format!("探测图解码失败：{}", e)))?;

        Ok(image.dimensions())
    }

    /// 返回探测图原始字节，供测试构造带方向标签的输入。
    #[cfg(test)]
    pub(crate) fn probe_asset_bytes() -> Vec<u8> {
        general_purpose::STANDARD
            .decode(ORIENTATION_PROBE_JPEG_BASE64)
            .expect("decode probe asset failed")
    }
}
