#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = desktop::run() {
        log::error!("{err:#}");
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod desktop {
    use std::any::Any;
    use std::env;
    use std::fmt;
    use std::fs;
    use std::panic::{self, AssertUnwindSafe};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Instant;

    use anyhow::{anyhow, Context, Result};
    use glam::Vec2;
    use log::info;
    use pollster::block_on;
    use winit::application::ApplicationHandler;
    use winit::dpi::LogicalSize;
    use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
    use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
    use winit::window::{Window, WindowId};

    use celestial_fx::planet::SUN_POSITION;
    use celestial_fx::render::{GpuContext, GpuFaceBaker, PlanetRenderer, StarRenderer};
    use celestial_fx::{
        Animated, Config, FrameDriver, FrameRenderer, LightHandle, Mode, Planet, PlanetScene,
        ShaderLibrary, SharedViewport, SoftwareFaceBaker, StarScene, Theme, WheelDelta,
    };

    pub fn run() -> Result<()> {
        let options = CliOptions::parse()?;
        let config = options.load_config()?;

        println!(
            "Loaded {} configuration: {} palette, {}px faces",
            config.mode.name(),
            config.star.theme.name(),
            config.planet.resolution
        );

        if options.bake_only {
            return run_headless(&config);
        }
        match run_interactive(config.clone()) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --bake-only mode (set DISPLAY or install a GPU driver to enable rendering)."
                    );
                    run_headless(&config)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Bakes the planet on the CPU and prints what the renderers would upload.
    fn run_headless(config: &Config) -> Result<()> {
        let mut baker = SoftwareFaceBaker::new();
        let light = LightHandle::new(SUN_POSITION);
        let planet = block_on(Planet::generate(&mut baker, &light, &config.planet))
            .context("headless bake failed")?;

        let resolution = config.planet.resolution;
        println!(
            "Baked {} faces at {resolution}x{resolution}",
            planet.materials.len()
        );
        for material in planet.materials.iter() {
            let map = &material.normal_map;
            println!(
                " - face {} ({}): normal map {}x{} ({} bytes)",
                material.face.index(),
                material.face.label(),
                map.width(),
                map.height(),
                map.as_bytes().len()
            );
        }
        println!(
            "Planet mesh: {} vertices, {} faces in {} groups",
            planet.mesh.vertices.len(),
            planet.mesh.faces.len(),
            planet.mesh.groups().len()
        );

        let star = StarScene::new(config.star);
        println!(
            "Star scene: {} palette, sphere {} vertices, halo {} vertices, {} uniforms",
            config.star.theme.name(),
            star.sphere.vertices.len(),
            star.halo.vertices.len(),
            star.sphere_uniforms().snapshot().len()
        );
        Ok(())
    }

    fn run_interactive(config: Config) -> Result<()> {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
        panic::set_hook(default_hook);
        let event_loop = event_loop
            .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
            .map_err(|err| WindowInitError::from_error("event loop", err))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = DesktopApp {
            config,
            clock: Instant::now(),
            session: None,
            error: None,
        };
        event_loop
            .run_app(&mut app)
            .map_err(|err| anyhow!("event loop failed: {err}"))?;

        match app.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    struct DesktopApp {
        config: Config,
        clock: Instant,
        session: Option<Box<dyn WindowSession>>,
        error: Option<anyhow::Error>,
    }

    impl DesktopApp {
        fn now_ms(&self) -> f64 {
            self.clock.elapsed().as_secs_f64() * 1000.0
        }

        fn open_session(&self, event_loop: &ActiveEventLoop) -> Result<Box<dyn WindowSession>> {
            let window = Arc::new(
                event_loop
                    .create_window(
                        Window::default_attributes()
                            .with_title("celestial-fx")
                            .with_inner_size(LogicalSize::new(1280.0, 720.0)),
                    )
                    .map_err(|err| WindowInitError::from_error("window", err))?,
            );
            let size = window.inner_size();
            let (width, height) = (size.width.max(1), size.height.max(1));
            let viewport = Arc::new(SharedViewport::new(width, height));
            let shaders = ShaderLibrary::builtin();
            let context = block_on(GpuContext::new(Arc::clone(&window), (width, height)))
                .context("failed to set up the GPU")?;
            let now = self.now_ms();

            match self.config.mode {
                Mode::Star => {
                    let scene = StarScene::new(self.config.star);
                    let renderer = StarRenderer::new(context, &shaders, &scene)?;
                    Ok(Box::new(Session::new(
                        window, viewport, &self.config, scene, renderer, now,
                    )))
                }
                Mode::Planet => {
                    let light = LightHandle::new(SUN_POSITION);
                    let mut baker = GpuFaceBaker::new(context.device(), context.queue(), &shaders)?;
                    let planet = block_on(Planet::generate(&mut baker, &light, &self.config.planet))?;
                    let textures = baker.into_textures();
                    let renderer = PlanetRenderer::new(context, &shaders, &planet, textures)?;
                    let scene =
                        PlanetScene::new(planet, light, self.config.planet.light_orbit_speed);
                    Ok(Box::new(Session::new(
                        window, viewport, &self.config, scene, renderer, now,
                    )))
                }
            }
        }
    }

    impl ApplicationHandler for DesktopApp {
        fn resumed(&mut self, event_loop: &ActiveEventLoop) {
            if self.session.is_some() {
                return;
            }
            match self.open_session(event_loop) {
                Ok(session) => {
                    info!("{} effect running", self.config.mode.name());
                    self.session = Some(session);
                }
                Err(err) => {
                    self.error = Some(err);
                    event_loop.exit();
                }
            }
        }

        fn window_event(
            &mut self,
            event_loop: &ActiveEventLoop,
            window_id: WindowId,
            event: WindowEvent,
        ) {
            let now = self.now_ms();
            let Some(session) = self.session.as_mut() else {
                return;
            };
            if session.window_id() != window_id {
                return;
            }
            if matches!(event, WindowEvent::CloseRequested) {
                event_loop.exit();
                return;
            }
            if let Err(err) = session.handle(event, now) {
                self.error = Some(err);
                event_loop.exit();
            }
        }

        fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
            if let Some(session) = self.session.as_ref() {
                session.request_redraw();
            }
        }
    }

    trait WindowSession {
        fn window_id(&self) -> WindowId;
        fn handle(&mut self, event: WindowEvent, now_ms: f64) -> Result<()>;
        fn request_redraw(&self);
    }

    /// One window showing one effect.
    struct Session<S, R> {
        window: Arc<Window>,
        viewport: Arc<SharedViewport>,
        driver: FrameDriver,
        scene: S,
        renderer: R,
        cursor: Vec2,
    }

    impl<S, R> Session<S, R>
    where
        S: Animated,
        R: FrameRenderer<S>,
    {
        fn new(
            window: Arc<Window>,
            viewport: Arc<SharedViewport>,
            config: &Config,
            scene: S,
            mut renderer: R,
            now_ms: f64,
        ) -> Self {
            let mut driver =
                FrameDriver::new(config.camera, config.interaction(), &viewport, now_ms);
            driver.resize(&viewport, &mut renderer);
            Self {
                window,
                viewport,
                driver,
                scene,
                renderer,
                cursor: Vec2::ZERO,
            }
        }
    }

    impl<S, R> WindowSession for Session<S, R>
    where
        S: Animated,
        R: FrameRenderer<S>,
    {
        fn window_id(&self) -> WindowId {
            self.window.id()
        }

        fn handle(&mut self, event: WindowEvent, now_ms: f64) -> Result<()> {
            match event {
                WindowEvent::Resized(size) => {
                    self.viewport.update(size.width, size.height);
                    self.driver.resize(&self.viewport, &mut self.renderer);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    self.cursor = Vec2::new(position.x as f32, position.y as f32);
                    self.driver.pointer_move(self.cursor, &self.viewport);
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => match state {
                    ElementState::Pressed => self.driver.pointer_down(self.cursor, &self.viewport),
                    ElementState::Released => self.driver.pointer_up(),
                },
                WindowEvent::MouseWheel { delta, .. } => {
                    // winit reports scrolling up as positive, the page convention is the reverse.
                    let delta = match delta {
                        MouseScrollDelta::LineDelta(_, y) => WheelDelta::Lines(-y),
                        MouseScrollDelta::PixelDelta(position) => {
                            WheelDelta::Pixels(-position.y as f32)
                        }
                    };
                    self.driver.wheel(delta);
                }
                WindowEvent::RedrawRequested => {
                    self.driver
                        .tick(&mut self.scene, &self.viewport, now_ms, &mut self.renderer)
                        .context("frame failed")?;
                }
                _ => {}
            }
            Ok(())
        }

        fn request_redraw(&self) {
            self.window.request_redraw();
        }
    }

    #[derive(Debug)]
    struct WindowInitError {
        message: String,
    }

    impl WindowInitError {
        fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {}", panic_message(panic)),
            }
        }

        fn from_error(stage: &str, err: impl fmt::Display) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {err}"),
            }
        }
    }

    impl fmt::Display for WindowInitError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for WindowInitError {}

    fn panic_message(panic: Box<dyn Any + Send>) -> String {
        match panic.downcast::<String>() {
            Ok(msg) => *msg,
            Err(panic) => match panic.downcast::<&'static str>() {
                Ok(msg) => (*msg).to_string(),
                Err(_) => "unknown panic".into(),
            },
        }
    }

    const USAGE: &str = "Usage: celestial-fx [--config <file>] [--mode star|planet] \
                         [--palette red|blue|green] [--resolution N] [--bake-only]";

    struct CliOptions {
        config: Option<PathBuf>,
        mode: Option<Mode>,
        palette: Option<Theme>,
        resolution: Option<u32>,
        bake_only: bool,
    }

    impl CliOptions {
        fn parse() -> Result<Self> {
            Self::parse_from(env::args().skip(1))
        }

        fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self> {
            let mut options = Self {
                config: None,
                mode: None,
                palette: None,
                resolution: None,
                bake_only: false,
            };
            let mut args = args.into_iter();
            while let Some(arg) = args.next() {
                let mut value = |flag: &str| {
                    args.next()
                        .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
                };
                match arg.as_str() {
                    "--config" => options.config = Some(PathBuf::from(value("--config")?)),
                    "--mode" => options.mode = Some(value("--mode")?.parse()?),
                    "--palette" => options.palette = Some(value("--palette")?.parse::<Theme>()?),
                    "--resolution" => {
                        let raw = value("--resolution")?;
                        let resolution = raw
                            .parse::<u32>()
                            .map_err(|err| anyhow!("invalid --resolution `{raw}`: {err}"))?;
                        options.resolution = Some(resolution);
                    }
                    "--bake-only" => options.bake_only = true,
                    "-h" | "--help" => return Err(anyhow!(USAGE)),
                    other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
                }
            }
            Ok(options)
        }

        /// Reads the configuration file, if any, then applies flag overrides.
        fn load_config(&self) -> Result<Config> {
            let mut config = match &self.config {
                Some(path) => {
                    let xml = fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    Config::from_xml(&xml)
                        .with_context(|| format!("failed to parse {}", path.display()))?
                }
                None => Config::default(),
            };
            if let Some(mode) = self.mode {
                config.mode = mode;
            }
            if let Some(theme) = self.palette {
                config.star.theme = theme;
            }
            if let Some(resolution) = self.resolution {
                config.planet.resolution = resolution;
            }
            config.validate()?;
            Ok(config)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn parse(args: &[&str]) -> Result<CliOptions> {
            CliOptions::parse_from(args.iter().map(|arg| arg.to_string()))
        }

        #[test]
        fn flags_override_defaults() {
            let options = parse(&["--mode", "planet", "--palette", "blue", "--resolution", "64"])
                .unwrap();
            let config = options.load_config().unwrap();
            assert_eq!(config.mode, Mode::Planet);
            assert_eq!(config.star.theme, Theme::Blue);
            assert_eq!(config.planet.resolution, 64);
            assert!(!options.bake_only);
        }

        #[test]
        fn missing_values_are_reported() {
            let err = parse(&["--resolution"]).err().unwrap();
            assert!(err.to_string().contains("--resolution expects a value"));
        }

        #[test]
        fn zero_resolution_is_rejected() {
            let options = parse(&["--resolution", "0", "--bake-only"]).unwrap();
            assert!(options.load_config().is_err());
        }
    }
}
