//! Per-tick driver: visibility cull, camera orbit easing, scene animation and
//! the render call.

use glam::Vec2;

use crate::camera::{orbit_target, CameraSettings, OrbitCamera};
use crate::error::FxError;
use crate::interaction::{Interaction, WheelDelta};
use crate::viewport::ViewportProvider;

/// Scene state advanced once per visible frame.
pub trait Animated {
    /// `elapsed_ms` counts from driver start; `camera` has already been moved
    /// for this frame.
    fn advance(&mut self, elapsed_ms: f64, camera: &OrbitCamera);
}

/// Output surface that follows the viewport size.
pub trait RenderSurface {
    /// Resizes the output. Zero sizes are ignored.
    fn resize(&mut self, width: u32, height: u32);
}

/// Draws a scene of type `S`.
pub trait FrameRenderer<S>: RenderSurface {
    fn render(&mut self, scene: &S, camera: &OrbitCamera) -> Result<(), FxError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The scene is scrolled out of view; nothing was touched.
    Culled,
    Rendered,
}

/// Owns the interaction state and camera of one animated canvas.
#[derive(Debug, Clone)]
pub struct FrameDriver {
    interaction: Interaction,
    camera: OrbitCamera,
    start_ms: f64,
}

impl FrameDriver {
    pub fn new(
        settings: CameraSettings,
        interaction: Interaction,
        viewport: &impl ViewportProvider,
        start_ms: f64,
    ) -> Self {
        Self {
            interaction,
            camera: OrbitCamera::new(settings, viewport.aspect()),
            start_ms,
        }
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn pointer_down(&mut self, client: Vec2, viewport: &impl ViewportProvider) {
        self.interaction
            .pointer_down(client, viewport.viewport_size());
    }

    pub fn pointer_move(&mut self, client: Vec2, viewport: &impl ViewportProvider) {
        self.interaction
            .pointer_move(client, viewport.viewport_size());
    }

    pub fn pointer_up(&mut self) {
        self.interaction.pointer_up();
    }

    pub fn wheel(&mut self, delta: WheelDelta) {
        self.interaction.wheel(delta);
    }

    /// Matches renderer output and camera aspect to the viewport. Safe to
    /// call repeatedly and before the first frame.
    pub fn resize(&mut self, viewport: &impl ViewportProvider, renderer: &mut impl RenderSurface) {
        let (width, height) = viewport.viewport_size();
        if width == 0 || height == 0 {
            return;
        }
        renderer.resize(width, height);
        self.camera.set_aspect(viewport.aspect());
    }

    pub fn tick<S, R>(
        &mut self,
        scene: &mut S,
        viewport: &impl ViewportProvider,
        now_ms: f64,
        renderer: &mut R,
    ) -> Result<FrameOutcome, FxError>
    where
        S: Animated,
        R: FrameRenderer<S>,
    {
        let (_, height) = viewport.viewport_size();
        if viewport.scroll_top() > height as f64 {
            return Ok(FrameOutcome::Culled);
        }

        let target = orbit_target(self.interaction.mouse());
        self.camera.ease_toward(target);
        scene.advance(now_ms - self.start_ms, &self.camera);
        renderer.render(scene, &self.camera)?;
        Ok(FrameOutcome::Rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::star::{StarScene, StarSettings, TIME};
    use crate::viewport::StaticViewport;
    use glam::Vec3;

    #[derive(Default)]
    struct RecordingRenderer {
        renders: usize,
        sizes: Vec<(u32, u32)>,
        fail: bool,
    }

    impl RenderSurface for RecordingRenderer {
        fn resize(&mut self, width: u32, height: u32) {
            self.sizes.push((width, height));
        }
    }

    impl<S> FrameRenderer<S> for RecordingRenderer {
        fn render(&mut self, _scene: &S, _camera: &OrbitCamera) -> Result<(), FxError> {
            if self.fail {
                return Err(FxError::Surface("lost".to_string()));
            }
            self.renders += 1;
            Ok(())
        }
    }

    fn driver(viewport: &StaticViewport) -> FrameDriver {
        FrameDriver::new(
            CameraSettings::default(),
            Interaction::default(),
            viewport,
            1_000.0,
        )
    }

    #[test]
    fn scrolled_away_frames_do_nothing() {
        let viewport = StaticViewport::new(800, 600).scrolled(601.0);
        let mut driver = driver(&viewport);
        let mut scene = StarScene::new(StarSettings::default());
        let mut renderer = RecordingRenderer::default();
        let camera_before = driver.camera().clone();
        let uniforms_before = scene.sphere_uniforms().snapshot();

        let outcome = driver
            .tick(&mut scene, &viewport, 5_000.0, &mut renderer)
            .unwrap();

        assert_eq!(outcome, FrameOutcome::Culled);
        assert_eq!(renderer.renders, 0);
        assert_eq!(driver.camera(), &camera_before);
        assert_eq!(scene.sphere_uniforms().snapshot(), uniforms_before);
        assert_eq!(scene.halo_model(), glam::Mat4::IDENTITY);
    }

    #[test]
    fn visible_frames_advance_time_and_render() {
        let viewport = StaticViewport::new(800, 600).scrolled(600.0);
        let mut driver = driver(&viewport);
        let mut scene = StarScene::new(StarSettings::default());
        let mut renderer = RecordingRenderer::default();

        let outcome = driver
            .tick(&mut scene, &viewport, 1_016.0, &mut renderer)
            .unwrap();

        assert_eq!(outcome, FrameOutcome::Rendered);
        assert_eq!(renderer.renders, 1);
        assert_eq!(scene.sphere_uniforms().float(TIME), Some(16.0));
        // First eased step from (0, 0, 10) toward (-4, 0, 0).
        assert!(driver.camera().position().distance(Vec3::new(-1.0, 0.0, 7.5)) < 1e-5);
    }

    #[test]
    fn camera_converges_on_held_drag() {
        let viewport = StaticViewport::new(800, 600);
        let mut driver = driver(&viewport);
        let mut scene = StarScene::new(StarSettings::default());
        let mut renderer = RecordingRenderer::default();

        driver.pointer_down(Vec2::new(400.0, 300.0), &viewport);
        driver.pointer_move(Vec2::new(600.0, 150.0), &viewport);
        driver.pointer_up();
        let target = orbit_target(driver.interaction().mouse());

        let mut error = driver.camera().position().distance(target);
        for frame in 0..20 {
            driver
                .tick(&mut scene, &viewport, 1_000.0 + frame as f64 * 16.0, &mut renderer)
                .unwrap();
            let next = driver.camera().position().distance(target);
            assert!(next <= error * 0.7501);
            error = next;
        }
        assert_eq!(renderer.renders, 20);
    }

    #[test]
    fn render_failures_propagate() {
        let viewport = StaticViewport::new(800, 600);
        let mut driver = driver(&viewport);
        let mut scene = StarScene::new(StarSettings::default());
        let mut renderer = RecordingRenderer {
            fail: true,
            ..RecordingRenderer::default()
        };
        let result = driver.tick(&mut scene, &viewport, 1_000.0, &mut renderer);
        assert!(matches!(result, Err(FxError::Surface(_))));
    }

    #[test]
    fn resize_updates_renderer_and_aspect() {
        let viewport = StaticViewport::new(800, 600);
        let mut driver = driver(&viewport);
        let mut renderer = RecordingRenderer::default();
        let wide = StaticViewport::new(1600, 400);

        driver.resize(&wide, &mut renderer);
        driver.resize(&wide, &mut renderer);
        driver.resize(&StaticViewport::new(0, 0), &mut renderer);

        assert_eq!(renderer.sizes, vec![(1600, 400), (1600, 400)]);
        assert_eq!(driver.camera().aspect(), 4.0);
    }
}
