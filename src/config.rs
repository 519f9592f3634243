//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `NormalizeConfig`，单次批处理内配置不可变，
//! 保证同一批次所有条目使用一致参数。输出形态与编码格式使用封闭枚举，
//! 未知字符串在解析入口就被拒绝，而不是悄悄退化到默认编码器。
//!
//! ## 实现思路
//!
//! - `Default` 即上传场景的常用配置：不压缩、PNG、输出 blob 引用 URL。
//! - `OutputFormat` / `OutputTarget` 提供字符串解析入口
//!   （"png" / "jpeg" / "webp"；"path" / "file" / "base64"）。
//! - 体积与像素上限在完整解码前生效，尽快失败。

use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;

/// 图片归一化配置。
///
/// 压缩作用于旋转前的原始宽高；方向交换在压缩后的尺寸上进行。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// 输出形态。
    pub output: OutputTarget,
    /// 输出编码格式。
    pub format: OutputFormat,
    /// 压缩启用时允许的长边最大值（像素）。
    pub max_pixel: u32,
    /// 是否压缩。关闭时尺寸原样保留，`max_pixel` 不生效。
    pub compress: bool,
    /// 输入原始字节体积上限（字节）。
    pub max_input_bytes: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            output: OutputTarget::BlobUrl,
            format: OutputFormat::Png,
            max_pixel: 1920,
            compress: false,
            max_input_bytes: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
        }
    }
}

/// 输出编码格式（封闭枚举）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    /// 从外部字符串解析格式。
    ///
    /// # 示例
    /// ```rust
    /// use photo_normalizer::OutputFormat;
    ///
    /// let format = OutputFormat::parse("jpeg").expect("parse format failed");
    /// assert_eq!(format.media_type(), "image/jpeg");
    /// assert!(OutputFormat::parse("bmp").is_err());
    /// ```
    pub fn parse(format: &str) -> Result<Self, NormalizeError> {
        match format.trim().to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            other => Err(NormalizeError::InvalidFormat(format!(
                "未知输出格式：{}（可选：png / jpeg / webp）",
                other
            ))),
        }
    }

    /// 将格式输出为稳定字符串。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }

    /// 对应的 MIME 类型，用于 Data URL 前缀与文件元信息。
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

/// 输出形态。
///
/// `BlobUrl`（字符串词汇 "path"）为默认值：编码结果存入内存 blob 存储，
/// 返回可解引用、可撤销的 `blob:` URL。该分支固定 PNG 编码，不受
/// [`NormalizeConfig::format`] 影响。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputTarget {
    /// Data URL 字符串（`data:<mime>;base64,...`）。
    Base64,
    /// 文件对象：字节 + 毫秒时间戳文件名。
    File,
    /// 内存 blob 引用 URL。
    #[serde(rename = "path")]
    BlobUrl,
}

impl OutputTarget {
    /// 从外部字符串解析输出形态；"path" 映射到 [`OutputTarget::BlobUrl`]。
    pub fn parse(target: &str) -> Result<Self, NormalizeError> {
        match target.trim().to_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "file" => Ok(Self::File),
            "path" => Ok(Self::BlobUrl),
            other => Err(NormalizeError::InvalidFormat(format!(
                "未知输出形态：{}（可选：path / file / base64）",
                other
            ))),
        }
    }
}
