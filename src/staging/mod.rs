//! 画像ステージング
//!
//! 報告書の写真（第1頁・第2頁）を読み込み、解析送信前までメモリ上に保持する。
//! 画像は永続化しない。

use crate::error::{SafetyLensError, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// 1回の解析で送信できる最大枚数
pub const MAX_PAGES: usize = 2;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "heif", "gif", "bmp"];

/// 送信待ちの画像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl StagedImage {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// 第1頁・第2頁のスロット
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSlots {
    slots: [Option<StagedImage>; MAX_PAGES],
}

impl ImageSlots {
    /// スロットに画像を設定（同じスロットは最後に選んだ画像で置換）
    pub fn set(&mut self, slot: usize, image: StagedImage) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry) => {
                *entry = Some(image);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, slot: usize) -> Option<StagedImage> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    pub fn get(&self, slot: usize) -> Option<&StagedImage> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// 設定済みの画像（頁順）
    pub fn staged(&self) -> Vec<StagedImage> {
        self.slots.iter().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }
}

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// 画像ファイルを読み込み
///
/// 長辺が `max_size` を超える場合はJPEGに縮小して送信量を抑える。
/// 縮小できない形式（HEIC等）はそのまま送る。
pub fn load_image(path: &Path, max_size: u32) -> Result<StagedImage> {
    if !path.exists() {
        return Err(SafetyLensError::FileNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    if !is_image_extension(&ext) {
        return Err(SafetyLensError::ImageLoad(format!(
            "不支援的圖片格式: {}",
            path.display()
        )));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let data = std::fs::read(path)?;

    let format = image::guess_format(&data).ok();
    let mime_type = format
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|| mime_from_extension(&ext).to_string());

    if let Some(format) = format {
        let img = image::load_from_memory_with_format(&data, format)
            .map_err(|e| SafetyLensError::ImageLoad(format!("{}: {}", file_name, e)))?;
        if let Some(resized) = downscale(&img, max_size)? {
            debug!(file = %file_name, from = data.len(), to = resized.len(), "image downscaled");
            return Ok(StagedImage::new(file_name, ImageFormat::Jpeg.to_mime_type(), resized));
        }
    }

    Ok(StagedImage::new(file_name, mime_type, data))
}

/// 長辺が上限を超える場合のみ縮小したJPEGを返す
fn downscale(img: &DynamicImage, max_size: u32) -> Result<Option<Vec<u8>>> {
    let (width, height) = img.dimensions();
    if max_size == 0 || width.max(height) <= max_size {
        return Ok(None);
    }

    let resized = img.resize(max_size, max_size, FilterType::Triangle);
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut buffer = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .map_err(|e| SafetyLensError::ImageLoad(format!("JPEG encode: {}", e)))?;
    Ok(Some(buffer))
}

fn mime_from_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "image/jpeg",
    }
}
