use rand::rngs::StdRng;
use rand::Rng;

use super::error::DataLoaderError;

/// Channels of every tensor the CIFAR-10 and image-folder datasets produce.
pub const RGB_CHANNELS: usize = 3;

/// Per-channel mean of the CIFAR-10 training set.
pub const CIFAR10_MEAN: [f32; 3] = [0.4914, 0.4822, 0.4465];
/// Per-channel standard deviation of the CIFAR-10 training set.
pub const CIFAR10_STD: [f32; 3] = [0.2023, 0.1994, 0.2010];

/// Image tensor in `C x H x W` order, as passed between transforms.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageTensor {
    pub data: Vec<f32>,
    pub shape: [usize; 3],
}

pub trait Transform: Send + Sync {
    fn apply(&self, tensor: ImageTensor, rng: &mut StdRng) -> Result<ImageTensor, DataLoaderError>;
}

/// Converts interleaved `H x W x C` bytes to a `C x H x W` tensor in `[0, 1]`.
pub fn to_tensor(pixels: &[u8], width: u32, height: u32, channels: u32) -> Result<ImageTensor, DataLoaderError> {
    let (w, h, c) = (width as usize, height as usize, channels as usize);
    if pixels.len() != w * h * c {
        return Err(DataLoaderError::Transform(format!(
            "expected {} bytes for a {}x{}x{} image, got {}",
            w * h * c,
            w,
            h,
            c,
            pixels.len()
        )));
    }

    let plane = w * h;
    let mut data = vec![0.0f32; pixels.len()];
    for (i, px) in pixels.chunks_exact(c).enumerate() {
        for (ch, &value) in px.iter().enumerate() {
            data[ch * plane + i] = value as f32 / 255.0;
        }
    }

    Ok(ImageTensor { data, shape: [c, h, w] })
}

pub struct Normalize {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl Normalize {
    pub fn new(mean: &[f32], std: &[f32]) -> Result<Self, DataLoaderError> {
        if mean.len() != std.len() {
            return Err(DataLoaderError::Transform(format!(
                "mean has {} channels but std has {}",
                mean.len(),
                std.len()
            )));
        }
        if std.iter().any(|&s| s == 0.0) {
            return Err(DataLoaderError::Transform("std must be non-zero".into()));
        }
        Ok(Normalize { mean: mean.to_vec(), std: std.to_vec() })
    }

    pub fn cifar10() -> Self {
        Normalize { mean: CIFAR10_MEAN.to_vec(), std: CIFAR10_STD.to_vec() }
    }
}

impl Transform for Normalize {
    fn apply(&self, mut tensor: ImageTensor, _rng: &mut StdRng) -> Result<ImageTensor, DataLoaderError> {
        let [c, h, w] = tensor.shape;
        if c != self.mean.len() {
            return Err(DataLoaderError::ChannelMismatch {
                expected: self.mean.len(),
                actual: c,
            });
        }

        for (ch, plane) in tensor.data.chunks_exact_mut(h * w).enumerate() {
            let (mean, std) = (self.mean[ch], self.std[ch]);
            for value in plane {
                *value = (*value - mean) / std;
            }
        }

        Ok(tensor)
    }
}

pub struct RandomHorizontalFlip {
    pub p: f64,
}

impl Transform for RandomHorizontalFlip {
    fn apply(&self, mut tensor: ImageTensor, rng: &mut StdRng) -> Result<ImageTensor, DataLoaderError> {
        if !rng.gen_bool(self.p.clamp(0.0, 1.0)) {
            return Ok(tensor);
        }

        let w = tensor.shape[2];
        for row in tensor.data.chunks_exact_mut(w) {
            row.reverse();
        }

        Ok(tensor)
    }
}

pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Compose { transforms }
    }

    pub fn identity() -> Self {
        Compose { transforms: Vec::new() }
    }

    /// `ToTensor` is applied by the datasets, so evaluation only needs normalization.
    pub fn normalized(mean: &[f32], std: &[f32]) -> Result<Self, DataLoaderError> {
        Ok(Compose::new(vec![Box::new(Normalize::new(mean, std)?)]))
    }
}

impl Transform for Compose {
    fn apply(&self, tensor: ImageTensor, rng: &mut StdRng) -> Result<ImageTensor, DataLoaderError> {
        self.transforms
            .iter()
            .try_fold(tensor, |tensor, transform| transform.apply(tensor, rng))
    }
}
