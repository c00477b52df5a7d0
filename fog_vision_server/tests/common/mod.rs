#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;

use fog_vision_server::{ServerConfig, start_server};
use image::{ImageFormat, RgbImage};

/// Start a server on an ephemeral localhost port and return its base URL.
pub async fn spawn_server(config: ServerConfig) -> String {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        ..config
    };
    let (addr, _server): (SocketAddr, _) = start_server(config).await.expect("server starts");
    format!("http://{addr}")
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("png encoding");
    out.into_inner()
}

pub fn uniform_png(width: u32, height: u32, value: u8) -> Vec<u8> {
    png_bytes(&RgbImage::from_pixel(
        width,
        height,
        image::Rgb([value, value, value]),
    ))
}

pub fn checkerboard_png(width: u32, height: u32, cell: u32) -> Vec<u8> {
    png_bytes(&RgbImage::from_fn(width, height, |x, y| {
        let v = if ((x / cell) + (y / cell)) % 2 == 0 { 32 } else { 220 };
        image::Rgb([v, v, v])
    }))
}

pub fn file_form(bytes: Vec<u8>) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name("frame.png")
        .mime_str("image/png")
        .expect("valid mime");
    reqwest::multipart::Form::new().part("file", part)
}
