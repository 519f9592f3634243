//! # 输入输出与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入形态”“流水线中间结果”和“输出形态”解耦：
//! - `ImageInput` 表示外部来源语义，来源类型由条目自身携带，而非配置字段
//! - `Base64Payload` 表示解码段输出的统一 base64 载荷
//! - `Dimensions` 表示浮点宽高，压缩可能产生小数，下游按画布语义截断
//! - `NormalizedImage` / `OutputFile` 表示最终输出

use image::{DynamicImage, GenericImageView};

use crate::blob::BlobUrl;

/// 图片输入来源。
pub enum ImageInput {
    /// 本地文件路径来源。
    Path(String),
    /// 内存文件字节来源。
    File(Vec<u8>),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
}

/// 解码段输出：统一的 base64 载荷与来源标识。
pub(crate) struct Base64Payload {
    /// Data URL 或纯 base64 字符串。
    pub(crate) data: String,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 浮点宽高。
///
/// 压缩规划按浮点乘法缩放，不做取整；小数结果原样向下游传递。
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Dimensions {
    pub(crate) width: f64,
    pub(crate) height: f64,
}

impl Dimensions {
    pub(crate) fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub(crate) fn of_image(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width as f64, height as f64)
    }
}

/// 归一化输出条目，形态由 [`crate::OutputTarget`] 决定。
#[derive(Debug, Clone)]
pub enum NormalizedImage {
    /// Data URL 字符串（`data:<mime>;base64,...`）。
    Base64(String),
    /// 文件对象。
    File(OutputFile),
    /// 内存 blob 引用 URL，可解引用、可撤销。
    BlobUrl(BlobUrl),
}

/// 文件形态输出。
///
/// 文件名固定为毫秒时间戳加 ".png" 后缀；`media_type` 反映真实编码格式。
#[derive(Debug, Clone)]
pub struct OutputFile {
    /// 文件名，如 `1724400000000.png`。
    pub name: String,
    /// 实际编码的 MIME 类型。
    pub media_type: &'static str,
    /// 编码后的字节。
    pub bytes: Vec<u8>,
}
