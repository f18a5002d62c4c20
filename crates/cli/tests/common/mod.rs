// Shared helpers for the photokit CLI tests.
#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::process::Command;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

/// `photokit` run from `dir`, isolated from the user's settings and AWS profile.
pub fn photokit(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_photokit"));
    cmd.current_dir(dir)
        .env_remove("PHOTOKIT_CONFIG")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", dir.join(".xdg"))
        .env("HOME", dir);
    cmd
}

/// JPEG header plus an APP1 Exif block whose only tag is IFD0 DateTime.
/// Enough for metadata readers; not decodable as an image.
pub fn exif_jpeg(datetime: &str) -> Vec<u8> {
    assert_eq!(datetime.len(), 19, "EXIF date/time is 19 chars");
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\0\x2a\0\0\0\x08");
    tiff.extend_from_slice(&1u16.to_be_bytes());
    // 0x0132 DateTime, ASCII, count 20, value at offset 26
    tiff.extend_from_slice(&[0x01, 0x32, 0x00, 0x02, 0, 0, 0, 20, 0, 0, 0, 26]);
    tiff.extend_from_slice(&[0, 0, 0, 0]);
    tiff.extend_from_slice(datetime.as_bytes());
    tiff.push(0);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// A real, decodable JPEG filled with one colour.
pub fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, 90)
        .encode_image(&img)
        .unwrap();
    out.into_inner()
}

pub fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {stdout}"))
}
