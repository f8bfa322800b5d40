use crate::config::Quality;

/// Backing-store dimensions in device pixels plus the ratio they were derived
/// from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
}

impl SurfaceSize {
    pub const ZERO: SurfaceSize = SurfaceSize {
        width: 0,
        height: 0,
        scale: 1.0,
    };

    pub fn new(width: u32, height: u32, scale: f64) -> Self {
        Self {
            width,
            height,
            scale,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Host content box in CSS (logical) pixels together with the platform ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ObservedBox {
    css_width: f64,
    css_height: f64,
    device_pixel_ratio: f64,
}

/// Turns content-box observations into backing-store sizes.
///
/// The reconciler only reports a size when it differs from the last one it
/// handed out, so callers can reallocate unconditionally on `Some`. Disposal
/// ends the subscription: later observations are dropped.
#[derive(Debug)]
pub struct ResizeReconciler {
    quality: Quality,
    observed: Option<ObservedBox>,
    applied: Option<SurfaceSize>,
    disposed: bool,
}

impl ResizeReconciler {
    pub fn new(quality: Quality) -> Self {
        Self {
            quality,
            observed: None,
            applied: None,
            disposed: false,
        }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Size most recently handed out, if any.
    pub fn applied(&self) -> Option<SurfaceSize> {
        self.applied
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Records a content-box observation.
    ///
    /// Returns the new backing size when it changed. Non-finite or negative
    /// extents are treated as zero.
    pub fn observe(
        &mut self,
        css_width: f64,
        css_height: f64,
        device_pixel_ratio: f64,
    ) -> Option<SurfaceSize> {
        if self.disposed {
            tracing::trace!("resize observation after dispose ignored");
            return None;
        }
        self.observed = Some(ObservedBox {
            css_width: extent(css_width),
            css_height: extent(css_height),
            device_pixel_ratio,
        });
        self.reconcile(false)
    }

    /// Switches the density policy.
    ///
    /// A different quality always yields a size (if a box has been observed),
    /// even when the rounded dimensions happen to match.
    pub fn set_quality(&mut self, quality: Quality) -> Option<SurfaceSize> {
        if self.disposed || quality == self.quality {
            return None;
        }
        self.quality = quality;
        self.reconcile(true)
    }

    /// Ends the subscription. Safe to call more than once.
    pub fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            tracing::trace!("resize reconciler disposed");
        }
    }

    fn reconcile(&mut self, force: bool) -> Option<SurfaceSize> {
        let observed = self.observed?;
        let scale = self.quality.scale(observed.device_pixel_ratio);
        let size = SurfaceSize::new(
            backing_extent(observed.css_width, scale),
            backing_extent(observed.css_height, scale),
            scale,
        );
        if !force && self.applied == Some(size) {
            return None;
        }
        self.applied = Some(size);
        Some(size)
    }
}

fn extent(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn backing_extent(css: f64, scale: f64) -> u32 {
    let device = (css * scale).round();
    if device.is_finite() && device > 0.0 {
        device.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_quality_caps_ratio_at_two() {
        let mut reconciler = ResizeReconciler::new(Quality::Auto);
        let size = reconciler.observe(100.0, 50.0, 3.0).expect("size");
        assert_eq!((size.width, size.height), (200, 100));
        assert_eq!(size.scale, 2.0);
    }

    #[test]
    fn backing_size_rounds_per_axis() {
        let mut reconciler = ResizeReconciler::new(Quality::Fixed(1.5));
        let size = reconciler.observe(101.0, 33.0, 1.0).expect("size");
        assert_eq!((size.width, size.height), (152, 50));
    }

    #[test]
    fn invalid_ratio_falls_back_to_one() {
        let mut reconciler = ResizeReconciler::new(Quality::Auto);
        let size = reconciler.observe(80.0, 60.0, f64::NAN).expect("size");
        assert_eq!((size.width, size.height), (80, 60));
    }

    #[test]
    fn unchanged_box_is_a_no_op() {
        let mut reconciler = ResizeReconciler::new(Quality::Auto);
        assert!(reconciler.observe(320.0, 240.0, 1.0).is_some());
        for _ in 0..5 {
            assert!(reconciler.observe(320.0, 240.0, 1.0).is_none());
        }
        // Different CSS box, same device size.
        assert!(reconciler.observe(320.2, 240.0, 1.0).is_none());
    }

    #[test]
    fn quality_change_forces_reallocation() {
        let mut reconciler = ResizeReconciler::new(Quality::Fixed(1.0));
        assert!(reconciler.set_quality(Quality::Fixed(2.0)).is_none());
        reconciler.observe(100.0, 100.0, 2.0);
        let size = reconciler.set_quality(Quality::Auto).expect("forced");
        // Auto at ratio 2 lands on the same pixel count but still reports.
        assert_eq!((size.width, size.height), (200, 200));
        assert!(reconciler.set_quality(Quality::Auto).is_none());
    }

    #[test]
    fn zero_and_negative_boxes_are_recorded() {
        let mut reconciler = ResizeReconciler::new(Quality::Auto);
        let size = reconciler.observe(0.0, 240.0, 1.0).expect("size");
        assert!(size.is_empty());
        let size = reconciler.observe(-5.0, f64::INFINITY, 1.0).expect("size");
        assert_eq!((size.width, size.height), (0, 0));
    }

    #[test]
    fn dispose_is_idempotent_and_final() {
        let mut reconciler = ResizeReconciler::new(Quality::Auto);
        reconciler.dispose();
        reconciler.dispose();
        assert!(reconciler.is_disposed());
        assert!(reconciler.observe(10.0, 10.0, 1.0).is_none());
        assert!(reconciler.set_quality(Quality::Fixed(2.0)).is_none());
    }
}
