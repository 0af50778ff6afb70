use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use glam::Vec2;
use gloo_events::EventListener;
use wasm_bindgen::JsCast;
use web_sys::{window, MouseEvent, WheelEvent};

use crate::host::dispatch;
use crate::interaction::WheelDelta;

/// Receives page events for one running effect.
pub(super) trait PageEvents {
    fn pointer_down(&mut self, client: Vec2);
    fn pointer_move(&mut self, client: Vec2);
    fn pointer_up(&mut self);
    fn wheel(&mut self, delta: WheelDelta);
    fn resized(&mut self);
    fn scrolled(&mut self);
}

/// DOM listeners feeding a [`PageEvents`] sink. Dropping this detaches them.
pub(super) struct PageListeners {
    listeners: Vec<EventListener>,
}

impl PageListeners {
    pub(super) fn attach(sink: Rc<RefCell<dyn PageEvents>>) -> Result<Self> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| anyhow!("document not available"))?;

        let mut listeners = Vec::new();

        // Pointer events on the whole document so drags keep orbiting past the canvas.
        {
            let sink = Rc::clone(&sink);
            listeners.push(EventListener::new(&document, "mousedown", move |event| {
                if let Some(event) = event.dyn_ref::<MouseEvent>() {
                    dispatch(&*sink, "mousedown", |sink| {
                        sink.pointer_down(client_position(event))
                    });
                }
            }));
        }

        {
            let sink = Rc::clone(&sink);
            listeners.push(EventListener::new(&document, "mousemove", move |event| {
                if let Some(event) = event.dyn_ref::<MouseEvent>() {
                    dispatch(&*sink, "mousemove", |sink| {
                        sink.pointer_move(client_position(event))
                    });
                }
            }));
        }

        {
            let sink = Rc::clone(&sink);
            listeners.push(EventListener::new(&document, "mouseup", move |_| {
                dispatch(&*sink, "mouseup", |sink| sink.pointer_up());
            }));
        }

        {
            let sink = Rc::clone(&sink);
            listeners.push(EventListener::new(&document, "wheel", move |event| {
                if let Some(event) = event.dyn_ref::<WheelEvent>() {
                    let delta = if event.delta_mode() == WheelEvent::DOM_DELTA_LINE {
                        WheelDelta::Lines(event.delta_y() as f32)
                    } else {
                        WheelDelta::Pixels(event.delta_y() as f32)
                    };
                    dispatch(&*sink, "wheel", |sink| sink.wheel(delta));
                }
            }));
        }

        {
            let sink = Rc::clone(&sink);
            listeners.push(EventListener::new(&window, "resize", move |_| {
                dispatch(&*sink, "resize", |sink| sink.resized());
            }));
        }

        {
            let sink = Rc::clone(&sink);
            listeners.push(EventListener::new(&window, "scroll", move |_| {
                dispatch(&*sink, "scroll", |sink| sink.scrolled());
            }));
        }

        Ok(Self { listeners })
    }

    pub(super) fn detach(&mut self) {
        self.listeners.clear();
    }
}

fn client_position(event: &MouseEvent) -> Vec2 {
    Vec2::new(event.client_x() as f32, event.client_y() as f32)
}
