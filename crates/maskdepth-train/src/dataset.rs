//! Dataset of fgbg/mask/depth triplets.
//!
//! Expected layout, triplets matched by file stem:
//!
//! ```text
//! <root>/fgbg/<stem>.<ext>
//! <root>/mask/<stem>.<ext>
//! <root>/depth/<stem>.<ext>
//! ```
//!
//! The dataset returns raw `f32` pixels; [`MaskDepthBatcher`] builds tensors
//! on the target device.

use std::{
    collections::BTreeMap,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    tensor::{backend::Backend, Tensor},
};
use image::{DynamicImage, ImageFormat};
use maskdepth_model::MaskDepthBatch;
use maskdepth_util::ImageUtils;
use walkdir::WalkDir;

use crate::{
    augmentation::{resize_triplet, AugmentationConfig, PairAugmentor},
    error::{DatasetError, DatasetResult},
};

/// One preprocessed triplet.
#[derive(Debug, Clone)]
pub struct MaskDepthItem {
    /// RGB input, HWC, values in `[0, 1]`.
    pub fgbg: Vec<f32>,
    /// Mask, HW, values in `[0, 1]`.
    pub mask: Vec<f32>,
    /// Depth map, HW, values in `[0, 1]`.
    pub depth: Vec<f32>,
    pub height: usize,
    pub width: usize,
}

#[derive(Debug, Clone)]
struct TripletPaths {
    fgbg: PathBuf,
    mask: PathBuf,
    depth: PathBuf,
}

/// Triplets found under a dataset root.
#[derive(Debug)]
pub struct MaskDepthDataset {
    items: Vec<TripletPaths>,
    image_size: (u32, u32),
    augmentor: Option<PairAugmentor>,
}

impl MaskDepthDataset {
    /// Index every complete triplet under `root`, resizing samples to
    /// `image_size` (width, height).
    pub fn new<P: AsRef<Path>>(root: P, image_size: (u32, u32)) -> DatasetResult<Self> {
        let (width, height) = image_size;
        if width == 0 || height == 0 {
            return Err(DatasetError::InvalidImageSize { width, height });
        }

        let items = Self::collect_triplets(root.as_ref())?;
        Ok(Self {
            items,
            image_size,
            augmentor: None,
        })
    }

    /// Enable random paired augmentation (training split).
    pub fn with_augmentation(mut self, config: &AugmentationConfig) -> Self {
        self.augmentor = Some(PairAugmentor::new(config));
        self
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.image_size
    }

    fn collect_triplets(root: &Path) -> DatasetResult<Vec<TripletPaths>> {
        let fgbg = Self::list_images(root, "fgbg")?;
        let masks = Self::list_images(root, "mask")?;
        let depths = Self::list_images(root, "depth")?;

        let mut items = Vec::with_capacity(fgbg.len());
        for (stem, fgbg_path) in fgbg {
            match (masks.get(&stem), depths.get(&stem)) {
                (Some(mask), Some(depth)) => items.push(TripletPaths {
                    fgbg: fgbg_path,
                    mask: mask.clone(),
                    depth: depth.clone(),
                }),
                (mask, depth) => tracing::warn!(
                    path = %fgbg_path.display(),
                    has_mask = mask.is_some(),
                    has_depth = depth.is_some(),
                    "skipping fgbg image without complete targets"
                ),
            }
        }

        if items.is_empty() {
            return Err(DatasetError::NoValidTriplets {
                path: root.to_path_buf(),
            });
        }

        tracing::info!(count = items.len(), root = %root.display(), "indexed triplets");
        Ok(items)
    }

    /// Image files of `<root>/<kind>` keyed by stem, in sorted order.
    fn list_images(root: &Path, kind: &'static str) -> DatasetResult<BTreeMap<String, PathBuf>> {
        let dir = root.join(kind);
        if !dir.is_dir() {
            return Err(DatasetError::DirectoryNotFound { kind, path: dir });
        }

        let mut images = BTreeMap::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|source| DatasetError::DirectoryReadFailed {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || !Self::is_supported_image(path) {
                continue;
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| DatasetError::InvalidUtf8Path {
                    path: path.to_path_buf(),
                })?;
            images.insert(stem.to_owned(), path.to_path_buf());
        }

        Ok(images)
    }

    fn is_supported_image(path: &Path) -> bool {
        ImageFormat::from_path(path).is_ok_and(|format| format.reading_enabled())
    }

    /// Load, augment and resize one triplet.
    pub fn load(&self, index: usize) -> DatasetResult<Option<MaskDepthItem>> {
        let Some(paths) = self.items.get(index) else {
            return Ok(None);
        };

        let fgbg = open(&paths.fgbg)?;
        let mask = open(&paths.mask)?;
        let depth = open(&paths.depth)?;

        let (fgbg, mask, depth) = resize_triplet(fgbg, mask, depth, self.image_size);
        let (fgbg, mask, depth) = match &self.augmentor {
            Some(augmentor) => augmentor.augment(fgbg, mask, depth),
            None => (fgbg, mask, depth),
        };

        let (width, height) = self.image_size;
        Ok(Some(MaskDepthItem {
            fgbg: fgbg.to_rgb32f().into_raw(),
            mask: mask.to_luma32f().into_raw(),
            depth: depth.to_luma32f().into_raw(),
            height: height as usize,
            width: width as usize,
        }))
    }
}

fn open(path: &Path) -> DatasetResult<DynamicImage> {
    image::open(path).map_err(|source| DatasetError::ImageOpenFailed {
        path: path.to_path_buf(),
        source,
    })
}

impl Dataset<MaskDepthItem> for MaskDepthDataset {
    fn get(&self, index: usize) -> Option<MaskDepthItem> {
        match self.load(index) {
            Ok(item) => item,
            Err(err) => {
                tracing::error!(index, error = %err, "failed to load triplet");
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Per-channel statistics applied to the fgbg input.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    mean: [f32; 3],
    std: [f32; 3],
}

impl Normalization {
    pub fn new(mean: [f32; 3], std: [f32; 3]) -> DatasetResult<Self> {
        if std.iter().any(|s| *s <= 0.0) {
            return Err(DatasetError::InvalidNormalization {
                reason: format!("standard deviations must be positive, got {std:?}"),
            });
        }
        Ok(Self { mean, std })
    }
}

/// Converts [`MaskDepthItem`]s into a [`MaskDepthBatch`].
#[derive(Clone, Debug, Default)]
pub struct MaskDepthBatcher<B: Backend> {
    normalization: Option<Normalization>,
    _phantom: PhantomData<B>,
}

impl<B: Backend> MaskDepthBatcher<B> {
    pub const fn new() -> Self {
        Self {
            normalization: None,
            _phantom: PhantomData,
        }
    }

    pub fn with_normalization(normalization: Normalization) -> Self {
        Self {
            normalization: Some(normalization),
            _phantom: PhantomData,
        }
    }
}

impl<B: Backend> Batcher<B, MaskDepthItem, MaskDepthBatch<B>> for MaskDepthBatcher<B> {
    fn batch(&self, items: Vec<MaskDepthItem>, device: &B::Device) -> MaskDepthBatch<B> {
        let batch_size = items.len();
        let mut fgbg = Vec::with_capacity(batch_size);
        let mut masks = Vec::with_capacity(batch_size);
        let mut depths = Vec::with_capacity(batch_size);

        for item in items {
            let (height, width) = (item.height, item.width);
            fgbg.push(ImageUtils::hwc_to_tensor(item.fgbg, height, width, 3, device));
            masks.push(ImageUtils::hwc_to_tensor(item.mask, height, width, 1, device));
            depths.push(ImageUtils::hwc_to_tensor(item.depth, height, width, 1, device));
        }

        let fgbg = Tensor::cat(fgbg, 0);
        let fgbg = match &self.normalization {
            Some(norm) => match ImageUtils::normalize_channels(fgbg.clone(), &norm.mean, &norm.std) {
                Ok(normalized) => normalized,
                Err(err) => {
                    tracing::warn!(error = %err, "fgbg normalization skipped");
                    fgbg
                }
            },
            None => fgbg,
        };

        MaskDepthBatch::new(fgbg, Tensor::cat(masks, 0), Tensor::cat(depths, 0))
    }
}
