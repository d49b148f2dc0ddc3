//! 图形协议后端。两种协议差异很大，用封闭枚举分派。

pub mod kitty;
pub mod overlay;

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::info;

use crate::config::{ArtworkConfig, BackendKind};
use crate::error::{ArtError, Result};
use crate::geometry::{CellAnchor, Placement};
use crate::model::{CacheKey, CacheValue};

pub use kitty::EscapeSequenceBackend;
pub use overlay::OverlayBackend;

pub enum ProtocolBackend {
    Overlay(OverlayBackend),
    EscapeSequence(EscapeSequenceBackend),
}

impl ProtocolBackend {
    /// 按配置构造后端；`Auto` 优先 Kitty，不支持时退回 overlay 进程
    pub fn from_config(config: &ArtworkConfig) -> Result<Self> {
        let backend = match config.backend {
            BackendKind::Kitty => Self::EscapeSequence(EscapeSequenceBackend::detect()?),
            BackendKind::Overlay => Self::Overlay(OverlayBackend::spawn(
                &config.overlay_command,
                &config.overlay_scaler,
            )?),
            BackendKind::Auto if kitty::is_supported() => {
                Self::EscapeSequence(EscapeSequenceBackend::new(kitty::DEFAULT_IMAGE_ID))
            }
            BackendKind::Auto => Self::Overlay(OverlayBackend::spawn(
                &config.overlay_command,
                &config.overlay_scaler,
            )?),
        };
        info!("artwork backend: {}", backend.name());
        Ok(backend)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Overlay(_) => "overlay",
            Self::EscapeSequence(_) => "kitty",
        }
    }

    /// 缩放到放置尺寸并编码成协议就绪的负载（写入缓存）
    pub fn encode(&self, image: &DynamicImage, placement: &Placement) -> Result<Vec<u8>> {
        match self {
            Self::Overlay(b) => b.encode(image, placement),
            Self::EscapeSequence(b) => b.encode(image, placement),
        }
    }

    /// 显示一份缓存值，返回需要 UI 写入终端的字节（overlay 为空）
    pub fn show(&mut self, key: &CacheKey, value: &CacheValue, anchor: &CellAnchor) -> Result<Vec<u8>> {
        match self {
            Self::Overlay(b) => b.show(key, value, anchor).map(|_| Vec::new()),
            Self::EscapeSequence(b) => Ok(b.show(key, value, anchor)),
        }
    }

    /// 像素已在目标端时只移动位置；`None` 表示需要完整重绘
    pub fn reposition(&mut self, key: &CacheKey, anchor: &CellAnchor) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Overlay(b) => Ok(b.reposition(key, anchor)?.then(Vec::new)),
            Self::EscapeSequence(b) => Ok(b.reposition(key, anchor)),
        }
    }

    pub fn remove(&mut self) -> Result<Vec<u8>> {
        match self {
            Self::Overlay(b) => b.remove().map(|_| Vec::new()),
            Self::EscapeSequence(b) => Ok(b.remove()),
        }
    }

    /// 丢弃记录的放置状态，下次显示从头开始
    pub fn reset(&mut self) {
        match self {
            Self::Overlay(b) => b.reset(),
            Self::EscapeSequence(b) => b.reset(),
        }
    }

    /// 上一次返回的输出被撤回，没有写入终端
    pub fn undelivered(&mut self) {
        if let Self::EscapeSequence(b) = self {
            b.forget_resident();
        }
    }
}

fn scaled_png(image: &DynamicImage, placement: &Placement) -> Result<Vec<u8>> {
    let resized;
    let image = if image.dimensions() == (placement.width, placement.height) {
        image
    } else {
        resized = image.resize_exact(placement.width, placement.height, FilterType::Lanczos3);
        &resized
    };

    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).map_err(ArtError::Encode)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    #[test]
    fn encoded_png_has_placement_size() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([200, 10, 10])));
        let placement = Placement { width: 16, height: 8, x_offset: 0, y_offset: 0 };
        let png = scaled_png(&image, &placement).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (16, 8));
    }

    #[test]
    fn kitty_encode_wraps_png_in_transmission() {
        let backend = ProtocolBackend::EscapeSequence(EscapeSequenceBackend::new(3));
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let placement = Placement { width: 4, height: 4, x_offset: 0, y_offset: 0 };
        let out = backend.encode(&image, &placement).unwrap();
        assert!(out.starts_with(b"\x1b_Ga=t,f=100,t=d,i=3,"));
        assert!(out.ends_with(b"\x1b\\"));
    }
}
