//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageNormalizer` 只负责流程编排与能力状态管理，不做具体像素工作。
//! 批处理链路固定为两段：
//! 1. 解码段：按来源把每个条目统一为 base64 载荷
//! 2. 变换段：解析载荷、读取方向、规划压缩、渲染并编码输出
//!
//! ## 实现思路
//!
//! - 解码能力在构造时探测一次，此后只读，不引入隐式全局状态。
//! - 两段都按输入顺序串行执行，输出顺序与输入顺序一致。
//! - 任一条目失败立即中止整批，调用方拿到第一个错误，不产生部分结果。
//! - 记录 `decode/transform/total` 阶段耗时，便于性能诊断。

use std::sync::Arc;
use std::time::Instant;

use crate::blob::BlobStore;
use crate::config::NormalizeConfig;
use crate::error::NormalizeError;
use crate::orientation::{container_carries_exif, read_orientation_tag, resolve_rotation};
use crate::planner::plan_dimensions;
use crate::probe::DecoderCapabilities;
use crate::render::render;
use crate::source::{Base64Payload, Dimensions, ImageInput, NormalizedImage};

/// 图片归一化器。
///
/// 持有解码能力探测结果与 blob 存储，并编排各子模块实现完整流程。
pub struct ImageNormalizer {
    pub(crate) capabilities: DecoderCapabilities,
    pub(crate) blob_store: Arc<BlobStore>,
}

impl ImageNormalizer {
    /// 创建归一化器，构造时探测一次解码环境能力。
    ///
    /// # 示例
    /// ```rust
    /// use photo_normalizer::ImageNormalizer;
    ///
    /// let normalizer = ImageNormalizer::new();
    /// assert!(!normalizer.capabilities().auto_orients);
    /// ```
    pub fn new() -> Self {
        Self::with_capabilities(DecoderCapabilities::probe())
    }

    /// 以指定能力值创建归一化器，跳过探测。
    pub fn with_capabilities(capabilities: DecoderCapabilities) -> Self {
        Self {
            capabilities,
            blob_store: Arc::new(BlobStore::default()),
        }
    }

    /// 当前生效的解码能力。
    pub fn capabilities(&self) -> DecoderCapabilities {
        self.capabilities
    }

    /// 批处理主入口：归一化一批图片输入。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use photo_normalizer::{ImageInput, ImageNormalizer, NormalizeConfig};
    ///
    /// # async fn demo() -> Result<(), photo_normalizer::NormalizeError> {
    /// let normalizer = ImageNormalizer::new();
    /// let outputs = normalizer
    ///     .normalize_batch(
    ///         vec![ImageInput::Path("/tmp/photo.jpg".into())],
    ///         &NormalizeConfig::default(),
    ///     )
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn normalize_batch(
        &self,
        items: Vec<ImageInput>,
        config: &NormalizeConfig,
    ) -> Result<Vec<NormalizedImage>, NormalizeError> {
        log::info!("🧺 开始批量处理 - {} 张图片", items.len());
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let mut payloads = Vec::with_capacity(items.len());
        for item in items {
            payloads.push(self.decode_item(item, config).await?);
        }
        let decode_elapsed = decode_start.elapsed();

        let transform_start = Instant::now();
        let mut outputs = Vec::with_capacity(payloads.len());
        for payload in payloads {
            outputs.push(self.transform_payload(payload, config)?);
        }
        let transform_elapsed = transform_start.elapsed();

        let total_elapsed = total_start.elapsed();
        log::info!(
            "✅ 批量处理完成 - decode={}ms transform={}ms total={}ms count={}",
            decode_elapsed.as_millis(),
            transform_elapsed.as_millis(),
            total_elapsed.as_millis(),
            outputs.len()
        );

        Ok(outputs)
    }

    /// 变换段：载荷 → 方向解析 → 压缩规划 → 渲染 → 输出编码。
    fn transform_payload(
        &self,
        payload: Base64Payload,
        config: &NormalizeConfig,
    ) -> Result<NormalizedImage, NormalizeError> {
        let bytes = Self::parse_base64_payload(&payload.data, config.max_input_bytes)?;
        let kind = Self::validate_image_signature(&bytes)?;

        let (header_width, header_height) = Self::inspect_dimensions(&bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;

        // 无法携带 EXIF 的容器直接按无标签处理。
        let orientation = if container_carries_exif(kind.mime_type()) {
            read_orientation_tag(&bytes)?.unwrap_or(1)
        } else {
            1
        };

        log::debug!(
            "🧭 方向标签: {}（解码器自动旋转: {}，来源: {}）",
            orientation,
            self.capabilities.auto_orients,
            payload.source_hint
        );

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| NormalizeError::Decode(format!("图片解码失败：{}", e)))?;

        let source = Dimensions::of_image(&decoded);
        let draw = plan_dimensions(source, config.max_pixel, config.compress);
        let plan = resolve_rotation(draw, orientation, self.capabilities.auto_orients);

        let surface = render(&decoded, &plan, draw)?;

        log::info!(
            "✅ 条目归一化完成 - 来源: {} 原始尺寸: {}x{} 画布尺寸: {}x{}",
            payload.source_hint,
            source.width,
            source.height,
            surface.width(),
            surface.height()
        );

        self.encode_output(surface, config)
    }
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
