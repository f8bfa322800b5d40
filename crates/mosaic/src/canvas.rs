use std::path::Path;

use image::RgbaImage;

use crate::component::{RenderBackend, RenderError};
use crate::shading::shade_fragment;
use crate::surface::SurfaceSize;
use crate::uniforms::MosaicUniforms;

/// CPU render target running [`shading`](crate::shading) per pixel.
///
/// Pixels are stored top row first as straight-alpha RGBA8, the way PNG
/// expects them. Fragment coordinates keep the bottom-left origin of the GPU
/// path so both backends produce the same picture.
#[derive(Debug, Default)]
pub struct SoftwareCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    reallocations: usize,
    draws: usize,
    released: bool,
}

impl SoftwareCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    pub fn draws(&self) -> usize {
        self.draws
    }

    /// RGBA of the pixel at `(x, y)`, top-left origin.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let slice = self.pixels.get(offset..offset + 4)?;
        Some([slice[0], slice[1], slice[2], slice[3]])
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        let image = self
            .to_image()
            .ok_or_else(|| RenderError::Backend("canvas has no pixels to save".into()))?;
        image.save_with_format(path, image::ImageFormat::Png)?;
        tracing::info!(
            path = %path.display(),
            width = self.width,
            height = self.height,
            "wrote mosaic frame"
        );
        Ok(())
    }
}

impl RenderBackend for SoftwareCanvas {
    fn reallocate(&mut self, size: SurfaceSize) -> Result<SurfaceSize, RenderError> {
        let len = (size.width as usize)
            .checked_mul(size.height as usize)
            .and_then(|count| count.checked_mul(4))
            .ok_or(RenderError::OutOfMemory)?;
        let mut pixels = Vec::new();
        if let Err(err) = pixels.try_reserve_exact(len) {
            tracing::warn!(
                width = size.width,
                height = size.height,
                error = %err,
                "software canvas allocation failed"
            );
            return Err(RenderError::OutOfMemory);
        }
        pixels.resize(len, 0);
        self.width = size.width;
        self.height = size.height;
        self.pixels = pixels;
        self.reallocations += 1;
        Ok(size)
    }

    fn draw(&mut self, uniforms: &MosaicUniforms) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        let width = self.width as usize;
        let height = self.height;
        for (index, texel) in self.pixels.chunks_exact_mut(4).enumerate() {
            let x = (index % width) as u32;
            let row = (index / width) as u32;
            let frag = [x as f32 + 0.5, (height - 1 - row) as f32 + 0.5];
            let Some(fragment) = shade_fragment(frag, uniforms) else {
                texel.fill(0);
                continue;
            };
            texel[0] = to_byte(fragment.color[0]);
            texel[1] = to_byte(fragment.color[1]);
            texel[2] = to_byte(fragment.color[2]);
            texel[3] = to_byte(fragment.alpha);
        }
        self.draws += 1;
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            tracing::trace!(draws = self.draws, "software canvas released");
        }
    }
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::CssColorResolver;
    use crate::component::{ComponentStatus, MosaicComponent};
    use crate::config::RenderConfiguration;
    use crate::frame::ManualFrames;
    use crate::uniforms::UniformSyncer;

    fn uniforms(width: u32, height: u32) -> MosaicUniforms {
        let syncer = UniformSyncer::new(CssColorResolver::default());
        let mut block = syncer.stage(&RenderConfiguration::default());
        block.set_resolution(width, height);
        block.set_time(3.0);
        block
    }

    #[test]
    fn draw_fills_every_pixel() {
        let mut canvas = SoftwareCanvas::new();
        canvas.reallocate(SurfaceSize::new(24, 16, 1.0)).expect("alloc");
        canvas.draw(&uniforms(24, 16)).expect("draw");
        assert_eq!(canvas.pixels().len(), 24 * 16 * 4);
        assert_eq!(canvas.draws(), 1);
        // Corners sit on the feathered edge, the centre is fully opaque.
        let corner = canvas.pixel(0, 0).expect("corner");
        let centre = canvas.pixel(12, 8).expect("centre");
        assert!(corner[3] < centre[3]);
        assert_eq!(centre[3], 255);
    }

    #[test]
    fn cells_share_one_colour() {
        let mut canvas = SoftwareCanvas::new();
        canvas.reallocate(SurfaceSize::new(36, 36, 1.0)).expect("alloc");
        let mut block = uniforms(36, 36);
        block.pixel_size = 6.0;
        canvas.draw(&block).expect("draw");
        // Rows 12..18 from the top map to one cell row because 36 divides by 6.
        let reference = canvas.pixel(12, 12);
        for y in 12..18 {
            for x in 12..18 {
                assert_eq!(canvas.pixel(x, y), reference, "({x}, {y})");
            }
        }
    }

    #[test]
    fn empty_canvas_draw_is_a_no_op() {
        let mut canvas = SoftwareCanvas::new();
        canvas.reallocate(SurfaceSize::ZERO).expect("alloc");
        canvas.draw(&uniforms(0, 0)).expect("draw");
        assert!(canvas.to_image().is_some_and(|image| image.width() == 0));
        assert_eq!(canvas.draws(), 0);
    }

    #[test]
    fn out_of_range_pixel_is_none() {
        let canvas = SoftwareCanvas::new();
        assert!(canvas.pixel(0, 0).is_none());
    }

    #[test]
    fn oversized_surface_is_out_of_memory() {
        let mut canvas = SoftwareCanvas::new();
        canvas.reallocate(SurfaceSize::new(16, 16, 1.0)).expect("alloc");
        let err = canvas
            .reallocate(SurfaceSize::new(2_000_000, 2_000_000, 2.0))
            .expect_err("16 TB canvas");
        assert!(matches!(err, RenderError::OutOfMemory));
        // The previous buffer survives a failed reallocation.
        assert_eq!((canvas.width(), canvas.height()), (16, 16));
        assert_eq!(canvas.pixels().len(), 16 * 16 * 4);
        assert_eq!(canvas.reallocations(), 1);
    }

    #[test]
    fn oversized_surface_degrades_component() {
        let mut component = MosaicComponent::mount(
            Ok(SoftwareCanvas::new()),
            &RenderConfiguration::default(),
            CssColorResolver::default(),
            ManualFrames::new(),
            0.0,
        );
        component.observe_resize(1_000_000.0, 1_000_000.0, 2.0);
        assert_eq!(component.status(), ComponentStatus::Degraded);
        assert!(component.backend().is_none());
        assert!(component.pending_frame().is_none());
    }
}
