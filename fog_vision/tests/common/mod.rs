#![allow(dead_code)]

pub mod mock_capture;
pub mod synthetic_image;
