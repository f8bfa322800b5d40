use mosaic::MosaicFile;

/// Default preview window size in logical pixels.
pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (960, 540);

/// Everything the preview window needs to start.
#[derive(Clone, Debug)]
pub struct WindowOptions {
    pub title: String,
    /// Initial inner size in logical pixels.
    pub size: (u32, u32),
    /// Initial mosaic settings and theme variables.
    pub file: MosaicFile,
}

impl WindowOptions {
    pub fn new(file: MosaicFile) -> Self {
        Self {
            title: "Pixel Mosaic".to_string(),
            size: DEFAULT_WINDOW_SIZE,
            file,
        }
    }

    pub fn with_size(mut self, size: (u32, u32)) -> Self {
        self.size = size;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}
