//! TensorBoard logging.
//!
//! Scalars and image grids are written to a TensorBoard event file
//! (`events.out.tfevents.*`) under the log directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::tensor::{backend::Backend, Tensor};
use image::RgbImage;
use maskdepth_util::{GridOptions, ImageGrid};
use tensorboard_rs::summary_writer::SummaryWriter as EventWriter;

use crate::error::{TrainerError, TrainerResult};

/// Writes scalars and images of a run to a TensorBoard log directory.
pub struct SummaryWriter {
    log_dir: PathBuf,
    writer: EventWriter,
}

impl SummaryWriter {
    pub fn new(log_dir: impl Into<PathBuf>) -> TrainerResult<Self> {
        let log_dir = log_dir.into();
        fs::create_dir_all(&log_dir).map_err(|e| TrainerError::io(&log_dir, e))?;
        let writer = EventWriter::new(&log_dir);

        tracing::debug!(log_dir = %log_dir.display(), "summary writer opened");
        Ok(Self { log_dir, writer })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn add_scalar(&mut self, tag: &str, value: f64, step: usize) {
        self.writer.add_scalar(tag, value as f32, step);
    }

    /// Log `images` (`[N, C, H, W]`, 1 or 3 channels) as one grid.
    pub fn add_image<B: Backend>(
        &mut self,
        tag: &str,
        images: Tensor<B, 4>,
        step: usize,
        options: &GridOptions,
    ) -> TrainerResult<()> {
        let grid = ImageGrid::make_grid(images, options)?;
        let (width, height) = grid.dimensions();
        self.writer.add_image(
            tag,
            &planar(&grid),
            &[3, height as usize, width as usize],
            step,
        );
        Ok(())
    }

    pub fn flush(&mut self) {
        self.writer.flush();
    }

    pub fn close(mut self) {
        self.flush();
    }
}

/// Interleaved RGB to `[3, H, W]` channel planes.
fn planar(image: &RgbImage) -> Vec<u8> {
    let plane = (image.width() * image.height()) as usize;
    let mut data = vec![0; 3 * plane];
    for (index, pixel) in image.pixels().enumerate() {
        for (channel, value) in pixel.0.iter().enumerate() {
            data[channel * plane + index] = *value;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;
    use crate::tests::{read_events, TestBackend};

    #[test]
    fn scalars_are_written_to_an_event_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SummaryWriter::new(dir.path()).unwrap();

        writer.add_scalar("loss/train", 0.5, 0);
        writer.add_scalar("loss/train", 0.25, 500);
        writer.close();

        let events = read_events(dir.path());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tag, "loss/train");
        assert_eq!(events[0].step, 0);
        assert_eq!(events[0].value, Some(0.5));
        assert_eq!(events[1].step, 500);
        assert_eq!(events[1].value, Some(0.25));
    }

    #[test]
    fn images_are_logged_as_grids() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SummaryWriter::new(dir.path()).unwrap();
        let images = Tensor::<TestBackend, 4>::ones([2, 1, 4, 4], &Default::default());

        writer
            .add_image("imagesmask", images, 29, &GridOptions::new())
            .unwrap();
        writer.close();

        let events = read_events(dir.path());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tag, "imagesmask");
        assert_eq!(events[0].step, 29);
        assert_eq!(events[0].value, None);
    }

    #[test]
    fn unsupported_channel_count_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SummaryWriter::new(dir.path()).unwrap();
        let images = Tensor::<TestBackend, 4>::ones([1, 2, 4, 4], &Default::default());

        let result = writer.add_image("bad", images, 0, &GridOptions::new());

        assert!(matches!(result, Err(TrainerError::Image(_))));
    }

    #[test]
    fn planar_splits_channels() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([1, 2, 3]));
        image.put_pixel(1, 0, Rgb([4, 5, 6]));

        assert_eq!(planar(&image), vec![1, 4, 2, 5, 3, 6]);
    }
}
