//! # 表示形态适配模块
//!
//! ## 设计思路
//!
//! 统一处理不同输入来源（路径 / 文件字节 / base64）到 base64 载荷的转换，
//! 以及渲染结果到输出形态（Data URL / 文件对象 / blob 引用）的编码。
//! 输入校验在“尽可能早”的阶段执行，尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - 路径：存在性 + metadata 体积限制 + 读取 + 签名校验 + 像素限制，
//!   再经 RGBA 画布重编码为 PNG Data URL（元数据不随重编码保留）。
//! - 文件字节：体积限制 + 签名校验 + 按嗅探 MIME 拼 Data URL。
//! - base64：原样透传，校验推迟到变换段的载荷解析。
//! - 输出：PNG 走 `write_to`，JPEG 以质量 90 编码 RGB，WebP 无损编码。
//!   blob 分支固定 PNG 编码。

use base64::{Engine as _, engine::general_purpose};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;

use crate::blob::BlobStore;
use crate::config::{NormalizeConfig, OutputFormat, OutputTarget};
use crate::error::NormalizeError;
use crate::handler::ImageNormalizer;
use crate::source::{Base64Payload, ImageInput, NormalizedImage, OutputFile};

/// JPEG 编码质量（百分制）。
const JPEG_QUALITY: u8 = 90;

impl ImageNormalizer {
    /// 解码段：把输入条目统一为 base64 载荷。
    pub(crate) async fn decode_item(
        &self,
        item: ImageInput,
        config: &NormalizeConfig,
    ) -> Result<Base64Payload, NormalizeError> {
        match item {
            ImageInput::Path(path) => self.decode_path(&path, config).await,
            ImageInput::File(bytes) => self.decode_file(bytes, config),
            ImageInput::Base64(data) => {
                log::info!("📝 开始处理 base64 图片");

                Ok(Base64Payload {
                    data,
                    source_hint: "base64",
                })
            }
        }
    }

    /// 路径输入：读取并经 RGBA 画布重编码为 PNG Data URL。
    async fn decode_path(
        &self,
        path: &str,
        config: &NormalizeConfig,
    ) -> Result<Base64Payload, NormalizeError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path);

        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NormalizeError::Decode(format!("文件不存在：{}", path))
            } else {
                NormalizeError::Decode(format!("无法读取文件信息：{}", e))
            }
        })?;

        if metadata.len() > config.max_input_bytes {
            return Err(NormalizeError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                config.max_input_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| NormalizeError::Decode(format!("无法读取图片文件：{}", e)))?;
        Self::validate_image_signature(&bytes)?;

        // 重编码前先按头信息做像素限制检查，小体积解压炸弹在完整解码前拦截。
        let (width, height) = Self::inspect_dimensions(&bytes)?;
        Self::validate_pixel_limits(config, width, height)?;

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| NormalizeError::Decode(format!("图片解码失败：{}", e)))?;

        Ok(Base64Payload {
            data: Self::rgba_to_data_url(decoded.to_rgba8(), OutputFormat::Png)?,
            source_hint: "path",
        })
    }

    /// 文件字节输入：按嗅探 MIME 拼 Data URL，字节不动。
    fn decode_file(
        &self,
        bytes: Vec<u8>,
        config: &NormalizeConfig,
    ) -> Result<Base64Payload, NormalizeError> {
        log::info!("📄 开始处理文件字节图片 - {} bytes", bytes.len());

        if bytes.len() as u64 > config.max_input_bytes {
            return Err(NormalizeError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_input_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        let kind = Self::validate_image_signature(&bytes)?;

        Ok(Base64Payload {
            data: format!(
                "data:{};base64,{}",
                kind.mime_type(),
                general_purpose::STANDARD.encode(&bytes)
            ),
            source_hint: "file",
        })
    }

    /// 编码段：把渲染好的画布序列化为配置要求的输出形态。
    pub(crate) fn encode_output(
        &self,
        surface: RgbaImage,
        config: &NormalizeConfig,
    ) -> Result<NormalizedImage, NormalizeError> {
        match config.output {
            OutputTarget::Base64 => Ok(NormalizedImage::Base64(Self::rgba_to_data_url(
                surface,
                config.format,
            )?)),
            OutputTarget::File => {
                let bytes = Self::encode_surface(surface, config.format)?;
                Ok(NormalizedImage::File(OutputFile {
                    name: format!("{}.png", chrono::Utc::now().timestamp_millis()),
                    media_type: config.format.media_type(),
                    bytes,
                }))
            }
            // blob 分支固定 PNG，不随 config.format 变化。
            OutputTarget::BlobUrl => {
                let bytes = Self::encode_surface(surface, OutputFormat::Png)?;
                let url = BlobStore::register(&self.blob_store, bytes, "image/png")?;
                Ok(NormalizedImage::BlobUrl(url))
            }
        }
    }

    /// 画布序列化为 Data URL 字符串。
    pub(crate) fn rgba_to_data_url(
        surface: RgbaImage,
        format: OutputFormat,
    ) -> Result<String, NormalizeError> {
        let media_type = format.media_type();
        let bytes = Self::encode_surface(surface, format)?;

        Ok(format!(
            "data:{};base64,{}",
            media_type,
            general_purpose::STANDARD.encode(bytes)
        ))
    }

    fn encode_surface(surface: RgbaImage, format: OutputFormat) -> Result<Vec<u8>, NormalizeError> {
        match format {
            OutputFormat::Png => {
                let mut cursor = Cursor::new(Vec::new());
                DynamicImage::ImageRgba8(surface)
                    .write_to(&mut cursor, ImageFormat::Png)
                    .map_err(|e| NormalizeError::Encode(format!("PNG 编码失败：{}", e)))?;
                Ok(cursor.into_inner())
            }
            OutputFormat::Jpeg => {
                // JPEG 无透明通道，丢弃 alpha 后按 RGB 编码。
                let rgb = DynamicImage::ImageRgba8(surface).to_rgb8();
                let mut buffer = Vec::new();
                let mut encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
                encoder
                    .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                    .map_err(|e| NormalizeError::Encode(format!("JPEG 编码失败：{}", e)))?;
                Ok(buffer)
            }
            OutputFormat::Webp => {
                let mut cursor = Cursor::new(Vec::new());
                let encoder = WebPEncoder::new_lossless(&mut cursor);
                encoder
                    .encode(
                        surface.as_raw(),
                        surface.width(),
                        surface.height(),
                        ExtendedColorType::Rgba8,
                    )
                    .map_err(|e| NormalizeError::Encode(format!("WebP 编码失败：{}", e)))?;
                Ok(cursor.into_inner())
            }
        }
    }

    /// 解析 base64 载荷（支持 Data URL / 纯 Base64），解码前先按体积上限估算。
    pub(crate) fn parse_base64_payload(
        data: &str,
        max_input_bytes: u64,
    ) -> Result<Vec<u8>, NormalizeError> {
        let normalized = data.trim();

        let base64_data = if normalized.starts_with("data:image/") {
            let base64_start = normalized
                .find(";base64,")
                .ok_or_else(|| NormalizeError::InvalidFormat("缺少 base64 标记".to_string()))?;
            &normalized[base64_start + 8..]
        } else {
            normalized
        };

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(base64_data)?;
        if estimated_len > max_input_bytes {
            return Err(NormalizeError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_input_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(base64_data)
            .map_err(|e| NormalizeError::Decode(format!("Base64 解码失败：{}", e)))
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, NormalizeError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| NormalizeError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| NormalizeError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片，返回嗅探结果。
    pub(crate) fn validate_image_signature(bytes: &[u8]) -> Result<infer::Type, NormalizeError> {
        if bytes.is_empty() {
            return Err(NormalizeError::InvalidFormat("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| NormalizeError::InvalidFormat("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(NormalizeError::InvalidFormat(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(kind)
    }

    /// 仅通过内存中的图片头信息读取宽高，用于完整解码前的像素限制检查。
    pub(crate) fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), NormalizeError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| NormalizeError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| NormalizeError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    pub(crate) fn validate_pixel_limits(
        config: &NormalizeConfig,
        width: u32,
        height: u32,
    ) -> Result<(), NormalizeError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| NormalizeError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(NormalizeError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::DecoderCapabilities;
    use base64::{Engine as _, engine::general_purpose};
    use image::{ImageBuffer, Rgba};

    fn normalizer() -> ImageNormalizer {
        ImageNormalizer::with_capabilities(DecoderCapabilities { auto_orients: false })
    }

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255])
        });

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn parse_base64_payload_handles_data_url_and_bare_base64() {
        let png = create_png_bytes(4, 4);
        let encoded = general_purpose::STANDARD.encode(&png);
        let data_url = format!("data:image/png;base64,{}", encoded);

        let from_url = ImageNormalizer::parse_base64_payload(&data_url, u64::MAX)
            .expect("parse data url failed");
        let from_bare = ImageNormalizer::parse_base64_payload(&encoded, u64::MAX)
            .expect("parse bare base64 failed");

        assert_eq!(from_url, png);
        assert_eq!(from_bare, png);
    }

    #[test]
    fn parse_base64_payload_rejects_data_url_without_marker() {
        let result = ImageNormalizer::parse_base64_payload("data:image/png;AAAA", u64::MAX);

        assert!(matches!(result, Err(NormalizeError::InvalidFormat(_))));
    }

    #[test]
    fn parse_base64_payload_rejects_large_payload_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = ImageNormalizer::parse_base64_payload(&huge, 32);

        assert!(matches!(result, Err(NormalizeError::ResourceLimit(_))));
    }

    #[test]
    fn signature_rejects_non_image_payload() {
        let result = ImageNormalizer::validate_image_signature(b"hello world, not an image");

        assert!(matches!(result, Err(NormalizeError::InvalidFormat(_))));
    }

    #[test]
    fn signature_sniffs_png_mime() {
        let png = create_png_bytes(2, 2);
        let kind = ImageNormalizer::validate_image_signature(&png).expect("sniff png failed");

        assert_eq!(kind.mime_type(), "image/png");
    }

    #[test]
    fn pixel_limits_reject_oversized_headers() {
        let mut config = NormalizeConfig::default();
        config.max_decoded_pixels = 1_000_000;

        let result = ImageNormalizer::validate_pixel_limits(&config, 2000, 2000);

        assert!(matches!(result, Err(NormalizeError::ResourceLimit(_))));
    }

    #[tokio::test]
    async fn decode_file_wraps_bytes_as_sniffed_data_url() {
        let normalizer = normalizer();
        let png = create_png_bytes(4, 4);

        let payload = normalizer
            .decode_item(ImageInput::File(png.clone()), &NormalizeConfig::default())
            .await
            .expect("decode file failed");

        assert_eq!(payload.source_hint, "file");
        assert!(payload.data.starts_with("data:image/png;base64,"));

        let decoded = ImageNormalizer::parse_base64_payload(&payload.data, u64::MAX)
            .expect("re-parse payload failed");
        assert_eq!(decoded, png);
    }

    #[tokio::test]
    async fn decode_file_rejects_oversized_bytes() {
        let normalizer = normalizer();
        let mut config = NormalizeConfig::default();
        config.max_input_bytes = 16;

        let result = normalizer
            .decode_item(ImageInput::File(create_png_bytes(8, 8)), &config)
            .await;

        assert!(matches!(result, Err(NormalizeError::ResourceLimit(_))));
    }

    #[tokio::test]
    async fn decode_path_reencodes_as_png_data_url() {
        let normalizer = normalizer();
        let path = std::env::temp_dir().join(format!(
            "photo-normalizer-adapter-{}.png",
            std::process::id()
        ));
        std::fs::write(&path, create_png_bytes(6, 3)).expect("write temp image failed");

        let payload = normalizer
            .decode_item(
                ImageInput::Path(path.to_string_lossy().into_owned()),
                &NormalizeConfig::default(),
            )
            .await
            .expect("decode path failed");

        let _ = std::fs::remove_file(&path);

        assert_eq!(payload.source_hint, "path");
        assert!(payload.data.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn decode_path_checks_pixel_limit_before_full_decode() {
        let normalizer = normalizer();
        let mut config = NormalizeConfig::default();
        config.max_decoded_pixels = 16;

        let path = std::env::temp_dir().join(format!(
            "photo-normalizer-pixel-limit-{}.png",
            std::process::id()
        ));
        std::fs::write(&path, create_png_bytes(64, 64)).expect("write temp image failed");

        let result = normalizer
            .decode_item(ImageInput::Path(path.to_string_lossy().into_owned()), &config)
            .await;

        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(NormalizeError::ResourceLimit(_))));
    }

    #[tokio::test]
    async fn decode_path_fails_for_missing_file() {
        let normalizer = normalizer();

        let result = normalizer
            .decode_item(
                ImageInput::Path("/definitely/not/here.png".to_string()),
                &NormalizeConfig::default(),
            )
            .await;

        assert!(matches!(result, Err(NormalizeError::Decode(_))));
    }

    #[test]
    fn base64_output_uses_configured_format_in_data_url() {
        let normalizer = normalizer();
        let surface = ImageBuffer::from_pixel(2, 2, Rgba([120, 30, 220, 255]));
        let mut config = NormalizeConfig::default();
        config.output = OutputTarget::Base64;
        config.format = OutputFormat::Jpeg;

        let output = normalizer
            .encode_output(surface, &config)
            .expect("encode output failed");

        match output {
            NormalizedImage::Base64(data_url) => {
                assert!(data_url.starts_with("data:image/jpeg;base64,"));
            }
            other => panic!("unexpected output variant: {:?}", other),
        }
    }

    #[test]
    fn file_output_keeps_timestamp_png_name_and_real_media_type() {
        let normalizer = normalizer();
        let surface = ImageBuffer::from_pixel(3, 5, Rgba([8, 16, 32, 255]));
        let mut config = NormalizeConfig::default();
        config.output = OutputTarget::File;
        config.format = OutputFormat::Jpeg;

        let output = normalizer
            .encode_output(surface, &config)
            .expect("encode output failed");

        match output {
            NormalizedImage::File(file) => {
                assert!(file.name.ends_with(".png"));
                assert_eq!(file.media_type, "image/jpeg");

                let decoded = image::load_from_memory(&file.bytes).expect("decode output failed");
                assert_eq!(image::guess_format(&file.bytes).expect("guess failed"), ImageFormat::Jpeg);
                assert_eq!((decoded.width(), decoded.height()), (3, 5));
            }
            other => panic!("unexpected output variant: {:?}", other),
        }
    }

    #[test]
    fn blob_output_is_always_png_and_resolvable() {
        let normalizer = normalizer();
        let surface = ImageBuffer::from_pixel(4, 2, Rgba([64, 128, 192, 255]));
        let mut config = NormalizeConfig::default();
        config.format = OutputFormat::Jpeg;

        let output = normalizer
            .encode_output(surface, &config)
            .expect("encode output failed");

        match output {
            NormalizedImage::BlobUrl(url) => {
                assert!(url.as_str().starts_with("blob:photo-normalizer/"));
                assert_eq!(url.media_type(), Some("image/png"));

                let bytes = url.bytes().expect("blob bytes missing");
                assert_eq!(image::guess_format(&bytes).expect("guess failed"), ImageFormat::Png);
            }
            other => panic!("unexpected output variant: {:?}", other),
        }
    }

    #[test]
    fn webp_output_encodes_losslessly() {
        let surface = ImageBuffer::from_pixel(2, 3, Rgba([11, 22, 33, 255]));

        let data_url = ImageNormalizer::rgba_to_data_url(surface, OutputFormat::Webp)
            .expect("encode webp failed");

        assert!(data_url.starts_with("data:image/webp;base64,"));

        let bytes = ImageNormalizer::parse_base64_payload(&data_url, u64::MAX)
            .expect("re-parse webp failed");
        let decoded = image::load_from_memory(&bytes).expect("decode webp failed");
        assert_eq!((decoded.width(), decoded.height()), (2, 3));
    }
}
