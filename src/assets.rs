//! Asset loading.
//!
//! Everything loads on a background thread, fire-and-forget: decoded
//! images are delivered over a channel and the render loop drains it once
//! per frame, swapping each placeholder for the real asset as it arrives.
//! A missing or undecodable file logs a warning and keeps its placeholder
//! forever; loading never fails the program.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use image::RgbaImage;

use crate::session::TEXTURE_NAMES;

/// A decoded asset delivered from the loader thread.
pub enum AssetEvent {
    /// Block texture for `TEXTURE_NAMES[index]`.
    Texture { index: usize, image: RgbaImage },
    /// Equirectangular environment map, tone-mapped to 8-bit sRGB.
    Environment { image: RgbaImage },
}

/// Handle to the background loader; dropping it is fine, the thread runs
/// to completion regardless.
pub struct AssetLoader {
    receiver: mpsc::Receiver<AssetEvent>,
}

impl AssetLoader {
    /// Start loading every asset under `dir`.
    pub fn spawn(dir: PathBuf) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            for (index, name) in TEXTURE_NAMES.iter().enumerate() {
                let path = dir.join(format!("{}.png", name));
                match image::open(&path) {
                    Ok(decoded) => {
                        let image = decoded.to_rgba8();
                        if sender.send(AssetEvent::Texture { index, image }).is_err() {
                            return;
                        }
                    }
                    Err(e) => log::warn!("texture {} unavailable: {}", path.display(), e),
                }
            }

            let hdr_path = dir.join("hdr.hdr");
            match load_environment(&hdr_path) {
                Ok(image) => {
                    let _ = sender.send(AssetEvent::Environment { image });
                    log::info!("environment map ready");
                }
                Err(e) => log::warn!("environment {} unavailable: {}", hdr_path.display(), e),
            }
        });
        Self { receiver }
    }

    /// Drain every asset that finished since the last poll.
    pub fn poll(&self) -> Vec<AssetEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Decode the Radiance HDR environment and tone-map it down to 8-bit.
fn load_environment(path: &Path) -> anyhow::Result<RgbaImage> {
    let decoded = image::open(path)?;
    let hdr = decoded.to_rgb32f();
    let (width, height) = (hdr.width(), hdr.height());
    let mut out = RgbaImage::new(width, height);
    for (x, y, pixel) in hdr.enumerate_pixels() {
        let mapped = pixel.0.map(tone_map);
        out.put_pixel(x, y, image::Rgba([mapped[0], mapped[1], mapped[2], 255]));
    }
    Ok(out)
}

/// Reinhard curve plus gamma, to a display byte.
fn tone_map(channel: f32) -> u8 {
    let c = channel.max(0.0);
    let mapped = (c / (1.0 + c)).powf(1.0 / 2.2);
    (mapped * 255.0 + 0.5).min(255.0) as u8
}

/// Magenta/black checkerboard shown until a real texture arrives.
pub fn placeholder_texture() -> RgbaImage {
    let size = 16u32;
    let mut image = RgbaImage::new(size, size);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let on = (x / 4 + y / 4) % 2 == 0;
        *pixel = if on {
            image::Rgba([228, 0, 228, 255])
        } else {
            image::Rgba([12, 12, 12, 255])
        };
    }
    image
}

/// Dark vertical gradient shown until the environment map arrives.
pub fn placeholder_environment() -> RgbaImage {
    let (width, height) = (64u32, 32u32);
    let mut image = RgbaImage::new(width, height);
    for (_, y, pixel) in image.enumerate_pixels_mut() {
        let t = y as f32 / (height - 1) as f32;
        let sky = 40.0 + (1.0 - t) * 60.0;
        *pixel = image::Rgba([sky as u8, sky as u8, (sky * 1.4) as u8, 255]);
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_map_stays_in_byte_range() {
        assert_eq!(tone_map(0.0), 0);
        assert!(tone_map(1.0) > 100);
        assert!(tone_map(1000.0) <= 255);
        assert_eq!(tone_map(-5.0), 0);
    }

    #[test]
    fn placeholders_are_nonempty() {
        let texture = placeholder_texture();
        assert_eq!(texture.width(), 16);
        let env = placeholder_environment();
        assert!(env.width() > 0 && env.height() > 0);
    }

    #[test]
    fn missing_assets_produce_no_events() {
        let dir = std::env::temp_dir().join("cubeclick-missing-assets-test");
        let loader = AssetLoader::spawn(dir);
        // Wait for the loader thread to finish by observing disconnect.
        loop {
            match loader.receiver.recv_timeout(std::time::Duration::from_secs(5)) {
                Ok(_) => panic!("no assets expected from an empty directory"),
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => panic!("loader thread hung"),
            }
        }
    }
}
