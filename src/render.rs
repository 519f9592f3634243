//! # 渲染模块
//!
//! ## 设计思路
//!
//! 在一块 RGBA 画布上完成“缩放 + 旋转”两步：先把源图缩放到规划尺寸，
//! 再把每个像素经“绕原点旋转 + 方案偏移”落到画布上。旋转角度只会是
//! 90° 的倍数，坐标映射用精确分支而非三角函数，保证整数尺寸下逐像素精确。
//!
//! ## 实现思路
//!
//! - 画布与缩放目标按浮点尺寸向下取整分配（画布语义），最小为 1。
//! - 缩放优先走 `fast_image_resize`（Bilinear），失败回退
//!   `image::resize_exact`。
//! - 方案偏移量按取整后的绘制尺寸对齐，小数部分不会把边缘行列旋出画布。
//! - 像素按中心（+0.5）采样后旋转落格，越界像素剪裁丢弃。

use fast_image_resize as fr;
use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};

use crate::error::NormalizeError;
use crate::orientation::{Rotation, RotationPlan};
use crate::source::Dimensions;

impl Rotation {
    /// 像素中心绕原点的精确旋转映射（不经三角函数）。
    fn rotate_point(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::Identity => (x, y),
            Self::Clockwise90 => (-y, x),
            Self::CounterClockwise90 => (y, -x),
            Self::Rotate180 => (-x, -y),
        }
    }
}

/// 按旋转方案与绘制尺寸渲染源图。
///
/// `draw` 是压缩规划给出的旋转前尺寸；方向交换由 `plan.canvas` 承担。
pub(crate) fn render(
    source: &DynamicImage,
    plan: &RotationPlan,
    draw: Dimensions,
) -> Result<RgbaImage, NormalizeError> {
    let canvas_width = (plan.canvas.width.floor() as u32).max(1);
    let canvas_height = (plan.canvas.height.floor() as u32).max(1);
    let draw_width = (draw.width.floor() as u32).max(1);
    let draw_height = (draw.height.floor() as u32).max(1);

    log::debug!(
        "🧩 渲染：绘制 {}x{} -> 画布 {}x{}（角度 {}°）",
        draw_width,
        draw_height,
        canvas_width,
        canvas_height,
        plan.angle.degrees()
    );

    let scaled = scale_to_draw_size(source, draw_width, draw_height)?;
    let mut canvas = RgbaImage::new(canvas_width, canvas_height);

    // 方案偏移量取自旋转前（可能含小数）的尺寸，绘制却在取整后的网格上进行；
    // 偏移量同步取整，否则小数部分会把最外侧行列整排旋出画布。
    let offset_x = if plan.offset_x < 0.0 { -(draw_width as f64) } else { 0.0 };
    let offset_y = if plan.offset_y < 0.0 { -(draw_height as f64) } else { 0.0 };

    for (u, v, pixel) in scaled.enumerate_pixels() {
        let sample_x = offset_x + u as f64 + 0.5;
        let sample_y = offset_y + v as f64 + 0.5;
        let (x, y) = plan.angle.rotate_point(sample_x, sample_y);

        if x >= 0.0 && y >= 0.0 {
            let (x, y) = (x as u32, y as u32);
            if x < canvas_width && y < canvas_height {
                canvas.put_pixel(x, y, *pixel);
            }
        }
    }

    Ok(canvas)
}

fn scale_to_draw_size(
    source: &DynamicImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbaImage, NormalizeError> {
    let src = source.to_rgba8();
    if src.dimensions() == (target_width, target_height) {
        return Ok(src);
    }

    match resize_with_fast_image_resize(src, target_width, target_height) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}", err);
            Ok(source
                .resize_exact(target_width, target_height, image::imageops::FilterType::Triangle)
                .to_rgba8())
        }
    }
}

fn resize_with_fast_image_resize(
    src: RgbaImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbaImage, NormalizeError> {
    let (src_width, src_height) = src.dimensions();

    let src_image =
        fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
            .map_err(|e| NormalizeError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| NormalizeError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| NormalizeError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))
}
