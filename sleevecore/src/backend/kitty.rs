//! Kitty 图形协议：图片经 APC 序列直接写入终端输出流，不需要外部进程。

use base64::Engine;
use image::DynamicImage;

use crate::error::{ArtError, Result};
use crate::geometry::{CellAnchor, Placement};
use crate::model::{CacheKey, CacheValue};

/// 单个 APC 序列内 base64 负载的最大长度
pub const CHUNK_SIZE: usize = 4096;

pub const DEFAULT_IMAGE_ID: u32 = 0x5_1eeb;
const PLACEMENT_ID: u32 = 1;

/// 检测终端是否支持 Kitty 图形协议
pub fn is_supported() -> bool {
    detect(|key| std::env::var(key).ok())
}

fn detect(var: impl Fn(&str) -> Option<String>) -> bool {
    if var("KITTY_WINDOW_ID").is_some() {
        return true;
    }
    if let Some(program) = var("TERM_PROGRAM") {
        if matches!(program.as_str(), "kitty" | "ghostty" | "WezTerm") {
            return true;
        }
    }
    var("TERM").is_some_and(|term| term.contains("kitty") || term.contains("ghostty"))
}

/// 生成上传 PNG 的 APC 序列（分块 base64，f=100，a=t 纯上传，q=2 静默）。
///
/// 首块携带完整控制键，后续块只带 `m`；最后一块 `m=0`。
pub fn transmit_png(id: u32, png: &[u8]) -> Vec<u8> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(png);
    let chunks: Vec<&[u8]> = encoded.as_bytes().chunks(CHUNK_SIZE).collect();
    let total = chunks.len();
    let mut out = Vec::with_capacity(encoded.len() + total * 32);

    for (i, chunk) in chunks.iter().enumerate() {
        let m = if i + 1 == total { 0 } else { 1 };
        if i == 0 {
            out.extend_from_slice(format!("\x1b_Ga=t,f=100,t=d,i={id},q=2,m={m};").as_bytes());
        } else {
            out.extend_from_slice(format!("\x1b_Gm={m},q=2;").as_bytes());
        }
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\x1b\\");
    }
    out
}

/// 在当前光标处放置已上传的图片，X/Y 为单元格内像素偏移，C=1 不移动光标
pub fn place_at_cursor(id: u32, pixel_x: u32, pixel_y: u32) -> Vec<u8> {
    format!("\x1b_Ga=p,i={id},p={PLACEMENT_ID},X={pixel_x},Y={pixel_y},C=1,q=2;\x1b\\").into_bytes()
}

/// 删除图片的所有 placement（d=i：保留 image data，可再次 place）
pub fn delete_placement(id: u32) -> Vec<u8> {
    format!("\x1b_Ga=d,d=i,i={id},q=2;\x1b\\").into_bytes()
}

/// 完全删除图片（d=I：同时释放 image data）
pub fn delete_image(id: u32) -> Vec<u8> {
    format!("\x1b_Ga=d,d=I,i={id},q=2;\x1b\\").into_bytes()
}

pub struct EscapeSequenceBackend {
    image_id: u32,
    /// 终端图片存储中当前 image id 对应的内容
    resident: Option<CacheKey>,
    placed: bool,
}

impl EscapeSequenceBackend {
    /// 终端不支持时返回 `BackendUnavailable`
    pub fn detect() -> Result<Self> {
        if !is_supported() {
            return Err(ArtError::BackendUnavailable(
                "terminal does not support the kitty graphics protocol".to_string(),
            ));
        }
        Ok(Self::new(DEFAULT_IMAGE_ID))
    }

    pub fn new(image_id: u32) -> Self {
        Self {
            image_id,
            resident: None,
            placed: false,
        }
    }

    pub fn encode(&self, image: &DynamicImage, placement: &Placement) -> Result<Vec<u8>> {
        let png = super::scaled_png(image, placement)?;
        Ok(transmit_png(self.image_id, &png))
    }

    /// 显示缓存值；终端里已有相同像素时不重传
    pub fn show(&mut self, key: &CacheKey, value: &CacheValue, anchor: &CellAnchor) -> Vec<u8> {
        let mut out = Vec::new();
        if self.placed {
            out.extend(delete_placement(self.image_id));
        }
        let resident = self.resident.as_ref().is_some_and(|r| r.same_pixels(key));
        if !resident {
            out.extend_from_slice(&value.payload);
        }
        out.extend(place_at_cursor(self.image_id, anchor.pixel_x, anchor.pixel_y));
        self.resident = Some(key.clone());
        self.placed = true;
        out
    }

    /// 仅重新放置，不重传像素；终端中没有相同像素时返回 `None`
    pub fn reposition(&mut self, key: &CacheKey, anchor: &CellAnchor) -> Option<Vec<u8>> {
        let resident = self.resident.as_mut()?;
        if !resident.same_pixels(key) {
            return None;
        }
        *resident = key.clone();
        let mut out = delete_placement(self.image_id);
        out.extend(place_at_cursor(self.image_id, anchor.pixel_x, anchor.pixel_y));
        self.placed = true;
        Some(out)
    }

    /// 始终发送删除；图片不存在时终端静默忽略（q=2）
    pub fn remove(&mut self) -> Vec<u8> {
        self.resident = None;
        self.placed = false;
        delete_image(self.image_id)
    }

    pub fn reset(&mut self) {
        self.resident = None;
        self.placed = false;
    }

    /// 上一次输出未写入终端，终端里的内容不可信
    pub fn forget_resident(&mut self) {
        self.resident = None;
    }
}
