// THEORY:
// Frame sources the client can be pointed at. A live camera is the real thing; the
// synthetic patterns and the still image exist so the full capture loop can be exercised
// on a machine without one. All of them are chosen at runtime from a `SourceSpec`
// string and handed to the loop as a `Box<dyn FrameSource>`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use fog_vision::frame::RGB_CHANNELS;
use fog_vision::{CaptureError, Frame, FrameSource, FrameSourceProvider};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CHECKER_CELL: u32 = 40;
const UNIFORM_LEVEL: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticPattern {
    /// Flat mid-gray. Reads as heavy fog.
    Uniform,
    /// Fresh random noise every frame. Reads as clear.
    Noise,
    /// Static high-contrast checkerboard. Reads as clear.
    Checkerboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Synthetic(SyntheticPattern),
    Image(PathBuf),
    Camera(i32),
}

impl FromStr for SourceSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = s.split_once(':').unwrap_or((s, ""));
        match kind {
            "synthetic" => match arg {
                "uniform" => Ok(SourceSpec::Synthetic(SyntheticPattern::Uniform)),
                "noise" => Ok(SourceSpec::Synthetic(SyntheticPattern::Noise)),
                "checkerboard" => Ok(SourceSpec::Synthetic(SyntheticPattern::Checkerboard)),
                other => Err(format!(
                    "unknown synthetic pattern {other:?} (expected uniform, noise or checkerboard)"
                )),
            },
            "image" if !arg.is_empty() => Ok(SourceSpec::Image(PathBuf::from(arg))),
            "camera" => {
                let index = if arg.is_empty() { "0" } else { arg };
                index
                    .parse()
                    .map(SourceSpec::Camera)
                    .map_err(|_| format!("invalid camera index {index:?}"))
            }
            _ => Err(format!(
                "invalid source {s:?} (expected synthetic:<pattern>, image:<path> or camera:<index>)"
            )),
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Synthetic(SyntheticPattern::Uniform) => write!(f, "synthetic:uniform"),
            SourceSpec::Synthetic(SyntheticPattern::Noise) => write!(f, "synthetic:noise"),
            SourceSpec::Synthetic(SyntheticPattern::Checkerboard) => {
                write!(f, "synthetic:checkerboard")
            }
            SourceSpec::Image(path) => write!(f, "image:{}", path.display()),
            SourceSpec::Camera(index) => write!(f, "camera:{index}"),
        }
    }
}

/// Generated frames at a fixed size.
pub struct SyntheticSource {
    pattern: SyntheticPattern,
    width: u32,
    height: u32,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(pattern: SyntheticPattern, width: u32, height: u32, seed: u64) -> Self {
        Self {
            pattern,
            width,
            height,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn render(&mut self) -> Vec<u8> {
        let len = self.width as usize * self.height as usize * RGB_CHANNELS;
        match self.pattern {
            SyntheticPattern::Uniform => vec![UNIFORM_LEVEL; len],
            SyntheticPattern::Noise => {
                let mut data = vec![0u8; len];
                self.rng.fill(data.as_mut_slice());
                data
            }
            SyntheticPattern::Checkerboard => {
                let mut data = Vec::with_capacity(len);
                for y in 0..self.height {
                    for x in 0..self.width {
                        let v = if ((x / CHECKER_CELL) + (y / CHECKER_CELL)) % 2 == 0 {
                            32
                        } else {
                            220
                        };
                        data.extend_from_slice(&[v; RGB_CHANNELS]);
                    }
                }
                data
            }
        }
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> String {
        format!("synthetic {:?} {}x{}", self.pattern, self.width, self.height).to_lowercase()
    }

    fn current_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let data = self.render();
        Ok(Some(Frame::new(self.width, self.height, data)))
    }
}

/// A single decoded picture, served as every frame.
pub struct StillImageSource {
    path: PathBuf,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl StillImageSource {
    pub fn open(path: PathBuf) -> Result<Self, CaptureError> {
        let rgb = image::open(&path)
            .map_err(|err| {
                CaptureError::DeviceUnavailable(format!("cannot open {}: {err}", path.display()))
            })?
            .to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Self {
            path,
            width,
            height,
            data: rgb.into_raw(),
        })
    }
}

impl FrameSource for StillImageSource {
    fn name(&self) -> String {
        format!("image {}", self.path.display())
    }

    fn current_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        Ok(Some(Frame::new(self.width, self.height, self.data.clone())))
    }
}

/// Opens whatever a `SourceSpec` names.
#[derive(Debug, Clone)]
pub struct SpecProvider {
    spec: SourceSpec,
    width: u32,
    height: u32,
}

impl SpecProvider {
    /// `width` and `height` size synthetic frames; other sources keep their native size.
    pub fn new(spec: SourceSpec, width: u32, height: u32) -> Self {
        Self {
            spec,
            width,
            height,
        }
    }
}

impl FrameSourceProvider for SpecProvider {
    type Source = Box<dyn FrameSource>;

    fn acquire(&self) -> Result<Self::Source, CaptureError> {
        match &self.spec {
            SourceSpec::Synthetic(pattern) => Ok(Box::new(SyntheticSource::new(
                *pattern,
                self.width,
                self.height,
                rand::random(),
            ))),
            SourceSpec::Image(path) => Ok(Box::new(StillImageSource::open(path.clone())?)),
            SourceSpec::Camera(index) => open_camera(*index),
        }
    }
}

#[cfg(feature = "camera")]
fn open_camera(index: i32) -> Result<Box<dyn FrameSource>, CaptureError> {
    Ok(Box::new(crate::camera::CameraSource::open(index)?))
}

#[cfg(not(feature = "camera"))]
fn open_camera(index: i32) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::DeviceUnavailable(format!(
        "camera {index} requested but fog_capture was built without the `camera` feature"
    )))
}
