//! Offscreen pixel surface for the layout engine.
//!
//! [`RgbaCanvas`] implements the core [`Surface`] seam on top of an
//! [`image::RgbaImage`], so frames can be painted headless and exported as PNG
//! or handed to a host as raw RGBA bytes.

use std::io::Cursor;
use std::path::Path;

use epigrid_core::{
    EngineError, Fractions, LayoutConfig, LayoutEngine, ParamsSeed, PointerUpdate, Rgba, Surface,
};
use image::{ImageBuffer, ImageFormat, RgbaImage};
use thiserror::Error;
use tracing::debug;

/// Errors produced while rendering or encoding frames.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("canvas dimensions must be non-zero (got {width}x{height})")]
    InvalidSize { width: u32, height: u32 },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// RGBA pixel buffer the engine paints into.
#[derive(Debug, Clone)]
pub struct RgbaCanvas {
    image: RgbaImage,
}

impl RgbaCanvas {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }
        Ok(Self {
            image: ImageBuffer::new(width, height),
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Colour at `(x, y)`, `None` outside the canvas.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.image.get_pixel_checked(x, y).map(|p| Rgba(p.0))
    }

    /// Row-major RGBA bytes.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Number of pixels painted exactly `color`.
    #[must_use]
    pub fn count(&self, color: Rgba) -> usize {
        self.image.pixels().filter(|p| p.0 == color.0).count()
    }

    /// Encode the current contents as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut bytes = Vec::new();
        {
            let mut cursor = Cursor::new(&mut bytes);
            self.image.write_to(&mut cursor, ImageFormat::Png)?;
        }
        Ok(bytes)
    }

    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        self.image.save_with_format(path, ImageFormat::Png)?;
        debug!(path = %path.display(), width = self.width(), height = self.height(), "wrote frame");
        Ok(())
    }
}

impl Surface for RgbaCanvas {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn fill(&mut self, color: Rgba) {
        for pixel in self.image.pixels_mut() {
            pixel.0 = color.0;
        }
    }

    fn set_pixel_block(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgba) {
        let (w, h) = self.image.dimensions();
        let x_end = x.saturating_add(width).min(w);
        let y_end = y.saturating_add(height).min(h);
        for py in y..y_end {
            for px in x..x_end {
                self.image.get_pixel_mut(px, py).0 = color.0;
            }
        }
    }
}

/// Seed a fresh engine, paint a single frame and return it as PNG bytes.
pub fn render_png_offscreen(
    config: &LayoutConfig,
    params: ParamsSeed,
    proportions: Fractions,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, RenderError> {
    let canvas = RgbaCanvas::new(width, height)?;
    let mut engine = LayoutEngine::new(config.clone(), canvas)?;
    engine.on_params(params);
    engine.on_update(&PointerUpdate::inline(proportions));
    engine.surface().encode_png()
}
