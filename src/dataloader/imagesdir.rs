use std::collections::HashSet;
use std::path::{Path, PathBuf};

use image::GenericImageView;
use log::{debug, info};
use rand::rngs::StdRng;

use super::dataset::{Dataset, Sample};
use super::error::DataLoaderError;
use super::transform::{to_tensor, Transform, RGB_CHANNELS};

/// Labeled images laid out as `root/<class name>/<image file>`.
///
/// Class directories are sorted by name to assign label indices, so the same
/// tree always produces the same labels.
pub struct ImageFolderDataset {
    dir: PathBuf,
    classes: Vec<Box<str>>,
    dataset: Vec<(Box<str>, usize)>,
    valid_extensions: HashSet<String>,
    image_width: u32,
    image_height: u32,
    transform: Box<dyn Transform>,
}

impl ImageFolderDataset {
    pub fn new(dir: &Path, transform: Box<dyn Transform>) -> Result<Self, DataLoaderError> {
        if !dir.is_dir() {
            return Err(DataLoaderError::DirectoryNotFound(dir.display().to_string()));
        }

        let valid_extensions = image::ImageFormat::all()
            .flat_map(|format| format.extensions_str())
            .map(|ext| ext.to_string())
            .collect();

        let mut loader = ImageFolderDataset {
            dir: dir.to_owned(),
            classes: Vec::new(),
            dataset: Vec::new(),
            valid_extensions,
            image_width: 0,
            image_height: 0,
            transform,
        };

        loader.load_dataset()?;
        loader.scan_first_image()?;

        info!(
            "Found {} images in {} classes under {} ({}x{})",
            loader.dataset.len(),
            loader.classes.len(),
            loader.dir.display(),
            loader.image_width,
            loader.image_height
        );

        Ok(loader)
    }

    pub fn classes(&self) -> &[Box<str>] {
        &self.classes
    }

    fn load_dataset(&mut self) -> Result<(), DataLoaderError> {
        let mut class_dirs: Vec<(Box<str>, PathBuf)> = std::fs::read_dir(&self.dir)?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|s| (s.to_owned().into_boxed_str(), entry.path()))
            })
            .collect();

        // read_dir does not guarantee consistancy or sorting of any kind since filesystems don't either
        class_dirs.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        for (label, (class, path)) in class_dirs.into_iter().enumerate() {
            let mut files: Vec<Box<str>> = std::fs::read_dir(&path)?
                .filter_map(Result::ok)
                .filter(|entry| self.is_valid_extension(&entry.path()))
                .filter_map(|entry| {
                    entry
                        .file_name()
                        .to_str()
                        .map(|s| format!("{}/{}", class, s).into_boxed_str())
                })
                .collect();
            files.sort_unstable();

            debug!("Class {} ({}) has {} images", label, class, files.len());
            self.dataset.extend(files.into_iter().map(|f| (f, label)));
            self.classes.push(class);
        }

        if self.dataset.is_empty() {
            return Err(DataLoaderError::EmptyDataset);
        }

        Ok(())
    }

    fn scan_first_image(&mut self) -> Result<(), DataLoaderError> {
        let first_image_path = self.dir.join(&*self.dataset[0].0);
        let (width, height) = image::open(first_image_path)?.dimensions();
        self.image_width = width;
        self.image_height = height;
        Ok(())
    }

    fn is_valid_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.valid_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Dataset for ImageFolderDataset {
    fn len(&self) -> usize {
        self.dataset.len()
    }

    fn get(&self, index: usize, rng: &mut StdRng) -> Result<Sample, DataLoaderError> {
        let (file, label) = self
            .dataset
            .get(index)
            .ok_or(DataLoaderError::IndexOutOfRange { index, len: self.dataset.len() })?;

        let path = self.dir.join(&**file);
        let img = image::open(&path)?.to_rgb8();
        if img.dimensions() != (self.image_width, self.image_height) {
            return Err(DataLoaderError::ImageSizeMismatch {
                path: path.display().to_string(),
                expected_width: self.image_width,
                expected_height: self.image_height,
                actual_width: img.width(),
                actual_height: img.height(),
            });
        }

        let tensor = to_tensor(img.as_raw(), img.width(), img.height(), RGB_CHANNELS as u32)?;
        let tensor = self.transform.apply(tensor, rng)?;

        Ok(Sample::new(tensor.data, tensor.shape, *label))
    }
}
