//! # 压缩规划模块
//!
//! ## 设计思路
//!
//! 只做尺寸决策，不碰像素：给定旋转前的源宽高、长边上限与开关，
//! 产出目标宽高。长边超限时把长边压到上限，短边按同一比例浮点缩放，
//! 不做取整，宽高比严格保持。
//!
//! ## 实现思路
//!
//! - 关闭压缩：原样返回，上限不生效。
//! - 宽严格大于高走宽分支；宽高相等并入高分支。
//! - 长边未超限时尺寸不变。

use crate::source::Dimensions;

/// 计算压缩后的目标尺寸。
pub(crate) fn plan_dimensions(source: Dimensions, max_pixel: u32, compress: bool) -> Dimensions {
    if !compress {
        return source;
    }

    let limit = max_pixel as f64;

    if source.width > source.height {
        if source.width > limit {
            return Dimensions::new(limit, (limit / source.width) * source.height);
        }
        source
    } else if source.height > limit {
        Dimensions::new((limit / source.height) * source.width, limit)
    } else {
        source
    }
}
