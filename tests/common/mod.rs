//! Fixtures shared by the integration tests: real JPEG files, optionally
//! carrying IPTC title and keywords in an APP13 segment.

#![allow(dead_code)]

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use std::path::{Path, PathBuf};

/// A gradient JPEG of the given size.
pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 85)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

fn dataset(out: &mut Vec<u8>, number: u8, value: &str) {
    out.extend_from_slice(&[0x1C, 0x02, number]);
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value.as_bytes());
}

/// A JPEG whose APP13 segment carries an IPTC object name and keywords.
pub fn tagged_jpeg(width: u32, height: u32, title: Option<&str>, keywords: &[&str]) -> Vec<u8> {
    let mut iim = Vec::new();
    if let Some(title) = title {
        dataset(&mut iim, 5, title);
    }
    for keyword in keywords {
        dataset(&mut iim, 25, keyword);
    }

    let mut resource = Vec::new();
    resource.extend_from_slice(b"Photoshop 3.0\0");
    resource.extend_from_slice(b"8BIM");
    resource.extend_from_slice(&0x0404u16.to_be_bytes());
    resource.extend_from_slice(&[0, 0]);
    resource.extend_from_slice(&(iim.len() as u32).to_be_bytes());
    resource.extend_from_slice(&iim);
    if resource.len() % 2 == 1 {
        resource.push(0);
    }

    let plain = jpeg(width, height);
    let mut out = plain[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xED]);
    out.extend_from_slice(&((resource.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&resource);
    out.extend_from_slice(&plain[2..]);
    out
}

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

/// Files directly inside `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
