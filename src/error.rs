//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载归一化链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//! 批处理语义为快速失败：任意阶段任意条目出错，整批以第一个错误终止。

/// 图片归一化统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// 输入无法加载或解析（路径不存在、文件损坏、base64 畸形等）。
    #[error("解码错误：{0}")]
    Decode(String),

    /// EXIF 元数据段存在但解析失败。缺失元数据不属于此类，按方向码 1 处理。
    #[error("元数据错误：{0}")]
    Metadata(String),

    /// 输出序列化失败。
    #[error("编码错误：{0}")]
    Encode(String),

    /// 非图片签名、畸形 Data URL，或不在封闭枚举内的格式/输出字符串。
    #[error("格式错误：{0}")]
    InvalidFormat(String),

    /// 资源上限触发（输入体积、解码像素、锁中毒）。
    #[error("资源限制：{0}")]
    ResourceLimit(String),
}
