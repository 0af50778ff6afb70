use std::sync::Arc;

use parking_lot::RwLock;

/// Read-only view of the host page: drawable size and vertical scroll offset.
pub trait ViewportProvider {
    fn viewport_size(&self) -> (u32, u32);

    /// Distance scrolled from the top of the page, in CSS pixels.
    fn scroll_top(&self) -> f64 {
        0.0
    }

    fn aspect(&self) -> f32 {
        let (width, height) = self.viewport_size();
        if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        }
    }
}

/// Viewport that always reports the same resolution and never scrolls.
#[derive(Debug, Clone, Copy)]
pub struct StaticViewport {
    pub width: u32,
    pub height: u32,
    pub top: f64,
}

impl StaticViewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            top: 0.0,
        }
    }

    pub const fn scrolled(mut self, top: f64) -> Self {
        self.top = top;
        self
    }
}

impl ViewportProvider for StaticViewport {
    fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn scroll_top(&self) -> f64 {
        self.top
    }
}

/// Viewport fed by window resize and scroll events.
#[derive(Debug)]
pub struct SharedViewport {
    size: RwLock<(u32, u32)>,
    top: RwLock<f64>,
}

impl SharedViewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: RwLock::new((width.max(1), height.max(1))),
            top: RwLock::new(0.0),
        }
    }

    pub fn update(&self, width: u32, height: u32) {
        *self.size.write() = (width.max(1), height.max(1));
    }

    pub fn set_scroll_top(&self, top: f64) {
        *self.top.write() = top;
    }
}

impl ViewportProvider for SharedViewport {
    fn viewport_size(&self) -> (u32, u32) {
        *self.size.read()
    }

    fn scroll_top(&self) -> f64 {
        *self.top.read()
    }
}

impl<T> ViewportProvider for Arc<T>
where
    T: ViewportProvider + ?Sized,
{
    fn viewport_size(&self) -> (u32, u32) {
        (**self).viewport_size()
    }

    fn scroll_top(&self) -> f64 {
        (**self).scroll_top()
    }
}
