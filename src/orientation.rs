//! # 方向解析模块
//!
//! ## 设计思路
//!
//! 把“读 EXIF 方向标签”与“标签到旋转方案的映射”分开：前者只关心元数据
//! 容器，后者是纯函数，给定宽高与方向码产出确定的旋转方案。
//! 缺失标签按方向码 1 处理；元数据段存在但损坏则整批失败。
//!
//! ## 实现思路
//!
//! 画布绕原点旋转，旋转后图像落在可见区域之外，必须按自身宽高平移回来。
//! 方向码到（角度、画布宽高、绘制偏移）的映射固定如下，(w, h) 为压缩后的
//! 源尺寸，渲染按字面使用该偏移：
//!
//! | 方向码 | 角度  | 画布    | 偏移       |
//! |--------|-------|---------|------------|
//! | 1      | 0°    | (w, h)  | (0, 0)     |
//! | 6      | 90°   | (h, w)  | (0, -h)    |
//! | 8      | -90°  | (h, w)  | (-w, 0)    |
//! | 3      | 180°  | (w, h)  | (-w, -h)   |
//! | 其他   | 0°    | (w, h)  | (0, 0)     |
//!
//! 镜像方向码 2 / 4 / 5 / 7 不在处理范围内，落入“其他”分支原样输出。
//! 解码环境已自动旋转时，一律按方向码 1 处理，避免二次旋转。

use std::io::Cursor;

use crate::error::NormalizeError;
use crate::source::Dimensions;

/// 旋转角度。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rotation {
    Identity,
    Clockwise90,
    CounterClockwise90,
    Rotate180,
}

impl Rotation {
    /// 角度数值，用于日志。
    pub(crate) fn degrees(self) -> i32 {
        match self {
            Self::Identity => 0,
            Self::Clockwise90 => 90,
            Self::CounterClockwise90 => -90,
            Self::Rotate180 => 180,
        }
    }
}

/// 方向解析结果：画布尺寸、旋转角度与绘制偏移。
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RotationPlan {
    /// 画布宽高（方向码 6 / 8 时宽高互换）。
    pub(crate) canvas: Dimensions,
    pub(crate) angle: Rotation,
    /// 绕原点旋转后把图像平移回画布的偏移。
    pub(crate) offset_x: f64,
    pub(crate) offset_y: f64,
}

/// 按方向码解析旋转方案。
///
/// `auto_orients` 为真时强制按方向码 1 处理（解码器已经转正过像素）。
pub(crate) fn resolve_rotation(
    dims: Dimensions,
    orientation: u32,
    auto_orients: bool,
) -> RotationPlan {
    let code = if auto_orients { 1 } else { orientation };

    match code {
        6 => RotationPlan {
            canvas: Dimensions::new(dims.height, dims.width),
            angle: Rotation::Clockwise90,
            offset_x: 0.0,
            offset_y: -dims.height,
        },
        8 => RotationPlan {
            canvas: Dimensions::new(dims.height, dims.width),
            angle: Rotation::CounterClockwise90,
            offset_x: -dims.width,
            offset_y: 0.0,
        },
        3 => RotationPlan {
            canvas: dims,
            angle: Rotation::Rotate180,
            offset_x: -dims.width,
            offset_y: -dims.height,
        },
        _ => RotationPlan {
            canvas: dims,
            angle: Rotation::Identity,
            offset_x: 0.0,
            offset_y: 0.0,
        },
    }
}

/// 读取 EXIF 方向标签。
///
/// - 容器无 EXIF 或无方向标签：`Ok(None)`，上游按方向码 1 处理
/// - 元数据段存在但损坏：`Err(Metadata)`，整批失败
pub(crate) fn read_orientation_tag(bytes: &[u8]) -> Result<Option<u32>, NormalizeError> {
    let mut cursor = Cursor::new(bytes);

    match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(parsed) => Ok(parsed
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))),
        Err(exif::Error::NotFound(_)) => Ok(None),
        Err(err) => Err(NormalizeError::Metadata(format!("EXIF 解析失败：{}", err))),
    }
}

/// 判断容器是否可能携带 EXIF。
///
/// 不支持 EXIF 的容器（如 BMP）直接跳过读取，按无元数据处理，
/// 避免把“容器不认识”误报成元数据损坏。
pub(crate) fn container_carries_exif(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/jpeg" | "image/png" | "image/webp" | "image/tiff" | "image/heif" | "image/heic"
    )
}
