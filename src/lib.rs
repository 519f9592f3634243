//! # 照片归一化库 — 库入口
//!
//! 修正用户上传照片的 EXIF 方向，并按需等比压缩，输出为 Data URL、
//! 文件对象或内存 blob 引用。
//!
//! ## 架构总览
//!
//! ```text
//! ImageInput (Path / File / Base64)
//!        │
//! ┌──────┼──────────────────────────────────────────────┐
//! │      ▼      ImageNormalizer（两段式批处理）          │
//! │                                                      │
//! │  解码段 ─ adapter      来源 → 统一 base64 载荷       │
//! │                                                      │
//! │  变换段 ─ adapter      载荷解析 + 签名/资源校验      │
//! │     ├─── orientation   EXIF 方向标签 → 旋转计划      │
//! │     ├─── planner       最长边压缩规划（浮点尺寸）    │
//! │     ├─── render        旋转 + 缩放画布渲染（RGBA）   │
//! │     └─── adapter       画布 → 输出形态编码           │
//! └──────┼──────────────────────────────────────────────┘
//!        ▼
//! NormalizedImage (Base64 / File / BlobUrl)
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | `error` | 统一错误类型 `NormalizeError` |
//! | `config` | 归一化配置与输出格式/形态枚举 |
//! | `source` | 输入、输出与流水线中间数据模型 |
//! | `probe` | 解码器自动旋转能力探测（内嵌探测图） |
//! | `adapter` | 来源解码与输出编码（Data URL / 文件 / blob） |
//! | `orientation` | EXIF 方向读取与旋转计划解析 |
//! | `planner` | 最长边等比压缩规划 |
//! | `render` | 旋转画布渲染引擎 |
//! | `blob` | 内存 blob 存储与可撤销 URL 引用 |
//! | `handler` | `ImageNormalizer` 批量编排 |

mod adapter;
mod blob;
mod config;
mod error;
mod handler;
mod orientation;
mod planner;
mod probe;
mod render;
mod source;

pub use blob::BlobUrl;
pub use config::{NormalizeConfig, OutputFormat, OutputTarget};
pub use error::NormalizeError;
pub use handler::ImageNormalizer;
pub use probe::DecoderCapabilities;
pub use source::{ImageInput, NormalizedImage, OutputFile};
