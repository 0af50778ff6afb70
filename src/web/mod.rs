#![cfg(target_arch = "wasm32")]

mod input;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlCanvasElement, Performance};

use crate::config::{Config, Mode};
use crate::error::FxError;
use crate::frame::{Animated, FrameDriver, FrameRenderer};
use crate::host::FrameSlot;
use crate::interaction::WheelDelta;
use crate::planet::{LightHandle, Planet, PlanetScene, SUN_POSITION};
use crate::render::{GpuContext, GpuFaceBaker, PlanetRenderer, StarRenderer};
use crate::shaders::ShaderLibrary;
use crate::star::StarScene;
use crate::viewport::SharedViewport;

use self::input::{PageEvents, PageListeners};

/// Canvas offset per pixel scrolled.
const PARALLAX: f64 = 0.40;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Handle to a running effect, returned to the page.
#[wasm_bindgen]
pub struct EffectHandle {
    app: Rc<RefCell<dyn Effect>>,
}

#[wasm_bindgen]
impl EffectHandle {
    /// Stops the animation loop and detaches every page listener.
    pub fn stop(&self) {
        self.app.borrow_mut().stop();
    }
}

/// Starts the effect described by `config_xml` (defaults when absent) on the
/// configured canvas.
#[wasm_bindgen]
pub async fn start(config_xml: Option<String>) -> Result<EffectHandle, JsValue> {
    let config = match config_xml {
        Some(xml) => Config::from_xml(&xml).map_err(to_js)?,
        None => Config::default(),
    };
    launch(config).await.map_err(|err| {
        log::error!("effect failed to start: {err:#}");
        to_js(err)
    })
}

fn to_js(err: anyhow::Error) -> JsValue {
    js_sys::Error::new(&format!("{err:#}")).into()
}

async fn launch(config: Config) -> Result<EffectHandle> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow!("document not available"))?;
    let performance = window
        .performance()
        .ok_or_else(|| anyhow!("performance timer not available"))?;
    let canvas = document
        .query_selector(&config.canvas)
        .map_err(|err| anyhow!("invalid canvas selector: {err:?}"))?
        .ok_or_else(|| FxError::MissingCanvas(config.canvas.clone()))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| anyhow!("`{}` is not a canvas", config.canvas))?;

    let (width, height) = window_size(&window)?;
    canvas.set_width(width);
    canvas.set_height(height);
    let viewport = Arc::new(SharedViewport::new(width, height));
    viewport.set_scroll_top(window.scroll_y().unwrap_or(0.0));

    let shaders = ShaderLibrary::builtin();
    let context = GpuContext::new(wgpu::SurfaceTarget::Canvas(canvas.clone()), (width, height))
        .await
        .context("failed to set up the GPU")?;
    log::info!("starting {} effect on `{}`", config.mode.name(), config.canvas);

    match config.mode {
        Mode::Star => {
            let scene = StarScene::new(config.star);
            let renderer = StarRenderer::new(context, &shaders, &scene)?;
            run(config, scene, renderer, canvas, viewport, performance)
        }
        Mode::Planet => {
            let light = LightHandle::new(SUN_POSITION);
            let mut baker = GpuFaceBaker::new(context.device(), context.queue(), &shaders)?;
            let planet = Planet::generate(&mut baker, &light, &config.planet).await?;
            let textures = baker.into_textures();
            let renderer = PlanetRenderer::new(context, &shaders, &planet, textures)?;
            let scene = PlanetScene::new(planet, light, config.planet.light_orbit_speed);
            run(config, scene, renderer, canvas, viewport, performance)
        }
    }
}

fn run<S, R>(
    config: Config,
    scene: S,
    renderer: R,
    canvas: HtmlCanvasElement,
    viewport: Arc<SharedViewport>,
    performance: Performance,
) -> Result<EffectHandle>
where
    S: Animated + 'static,
    R: FrameRenderer<S> + 'static,
{
    let driver = FrameDriver::new(
        config.camera,
        config.interaction(),
        &viewport,
        performance.now(),
    );
    let app = Rc::new(RefCell::new(WebApp {
        driver,
        scene,
        renderer,
        canvas,
        viewport,
        performance,
        listeners: None,
        frame_slot: FrameSlot::new(),
        pending_frame: None,
        running: true,
    }));

    {
        let mut state = app.borrow_mut();
        state.resized();
        state.scrolled();
    }
    let sink: Rc<RefCell<dyn PageEvents>> = app.clone();
    app.borrow_mut().listeners = Some(PageListeners::attach(sink)?);
    schedule_animation_loop(Rc::clone(&app))?;

    Ok(EffectHandle { app })
}

trait Effect {
    fn stop(&mut self);
}

struct WebApp<S, R> {
    driver: FrameDriver,
    scene: S,
    renderer: R,
    canvas: HtmlCanvasElement,
    viewport: Arc<SharedViewport>,
    performance: Performance,
    listeners: Option<PageListeners>,
    frame_slot: FrameSlot<FrameCallback>,
    pending_frame: Option<i32>,
    running: bool,
}

impl<S, R> WebApp<S, R>
where
    S: Animated,
    R: FrameRenderer<S>,
{
    fn frame(&mut self) -> Result<(), FxError> {
        let now = self.performance.now();
        self.driver
            .tick(&mut self.scene, &self.viewport, now, &mut self.renderer)?;
        Ok(())
    }
}

impl<S, R> Effect for WebApp<S, R> {
    fn stop(&mut self) {
        self.running = false;
        if let Some(listeners) = self.listeners.as_mut() {
            listeners.detach();
        }
        self.listeners = None;
        if let Some(id) = self.pending_frame.take() {
            if let Some(window) = window() {
                if let Err(err) = window.cancel_animation_frame(id) {
                    log::warn!("failed to cancel animation frame: {err:?}");
                }
            }
        }
        // The loop callback holds this effect; dropping it frees both.
        drop(self.frame_slot.release());
        log::info!("effect stopped");
    }
}

impl<S, R> PageEvents for WebApp<S, R>
where
    S: Animated,
    R: FrameRenderer<S>,
{
    fn pointer_down(&mut self, client: Vec2) {
        self.driver.pointer_down(client, &self.viewport);
    }

    fn pointer_move(&mut self, client: Vec2) {
        self.driver.pointer_move(client, &self.viewport);
    }

    fn pointer_up(&mut self) {
        self.driver.pointer_up();
    }

    fn wheel(&mut self, delta: WheelDelta) {
        self.driver.wheel(delta);
    }

    fn resized(&mut self) {
        let Some(window) = window() else {
            return;
        };
        let Ok((width, height)) = window_size(&window) else {
            return;
        };
        self.viewport.update(width, height);
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.driver.resize(&self.viewport, &mut self.renderer);
    }

    fn scrolled(&mut self) {
        let top = window()
            .and_then(|window| window.scroll_y().ok())
            .unwrap_or(0.0);
        self.viewport.set_scroll_top(top);
        let transform = format!("translateY({}px) translateZ(0)", top * PARALLAX);
        if let Err(err) = self.canvas.style().set_property("transform", &transform) {
            log::warn!("failed to move canvas: {err:?}");
        }
    }
}

type FrameCallback = Closure<dyn FnMut()>;

/// Drives `app` from `requestAnimationFrame` until it stops or a frame fails.
/// The callback re-requests itself through the app's frame slot, which
/// [`Effect::stop`] empties.
fn schedule_animation_loop<S, R>(app: Rc<RefCell<WebApp<S, R>>>) -> Result<()>
where
    S: Animated + 'static,
    R: FrameRenderer<S> + 'static,
{
    let slot = app.borrow().frame_slot.clone();
    let next = slot.clone();
    let state = Rc::clone(&app);

    slot.fill(Closure::wrap(Box::new(move || {
        let result = {
            let mut app = state.borrow_mut();
            app.pending_frame = None;
            if !app.running {
                return;
            }
            app.frame()
        };
        if let Err(err) = result {
            log::error!("frame failed, halting animation: {err}");
            state.borrow_mut().stop();
            return;
        }
        match request_frame(&next) {
            Ok(id) => state.borrow_mut().pending_frame = id,
            Err(err) => log::error!("{err:#}"),
        }
    }) as Box<dyn FnMut()>));

    let id = request_frame(&slot)?;
    app.borrow_mut().pending_frame = id;
    Ok(())
}

/// Requests the next frame, returning its id, or `None` once the slot was
/// released.
fn request_frame(slot: &FrameSlot<FrameCallback>) -> Result<Option<i32>> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    slot.with(|closure| window.request_animation_frame(closure.as_ref().unchecked_ref()))
        .transpose()
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))
}

fn window_size(window: &web_sys::Window) -> Result<(u32, u32)> {
    let dimension = |value: Result<JsValue, JsValue>, name: &str| -> Result<u32> {
        value
            .ok()
            .and_then(|value| value.as_f64())
            .map(|value| value.max(0.0) as u32)
            .ok_or_else(|| anyhow!("window {name} unavailable"))
    };
    Ok((
        dimension(window.inner_width(), "width")?,
        dimension(window.inner_height(), "height")?,
    ))
}
