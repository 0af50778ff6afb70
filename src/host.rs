//! Plumbing for single-threaded hosts, such as a browser page, that own a
//! running effect behind `Rc<RefCell<..>>` and drive it from callbacks.

use std::cell::RefCell;
use std::rc::Rc;

/// Holds the callback of a self-rescheduling frame loop. The callback keeps a
/// clone of the slot so it can request the next frame, which makes the loop a
/// reference cycle until [`FrameSlot::release`] empties it.
pub struct FrameSlot<C> {
    callback: Rc<RefCell<Option<C>>>,
}

impl<C> FrameSlot<C> {
    pub fn new() -> Self {
        Self {
            callback: Rc::new(RefCell::new(None)),
        }
    }

    pub fn fill(&self, callback: C) {
        *self.callback.borrow_mut() = Some(callback);
    }

    /// Runs `f` on the stored callback, if there still is one.
    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        self.callback.borrow().as_ref().map(f)
    }

    /// Takes the callback out, breaking the cycle through it.
    pub fn release(&self) -> Option<C> {
        self.callback.borrow_mut().take()
    }

    pub fn is_empty(&self) -> bool {
        self.callback.borrow().is_none()
    }
}

impl<C> Clone for FrameSlot<C> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<C> Default for FrameSlot<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `handle` on `target` unless it is already borrowed, returning whether
/// it ran. Page events arrive as separate tasks, never while a frame holds the
/// borrow, so a busy target means a handler re-entered the effect.
pub fn dispatch<T: ?Sized>(target: &RefCell<T>, event: &str, handle: impl FnOnce(&mut T)) -> bool {
    match target.try_borrow_mut() {
        Ok(mut target) => {
            handle(&mut *target);
            true
        }
        Err(_) => {
            log::warn!("effect busy; dropped {event} event");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Effect {
        frames: u32,
    }

    #[test]
    fn releasing_the_slot_frees_what_the_callback_captured() {
        let effect = Rc::new(RefCell::new(Effect { frames: 0 }));
        let slot: FrameSlot<Box<dyn Fn() -> bool>> = FrameSlot::new();

        let captured = Rc::clone(&effect);
        let next = slot.clone();
        slot.fill(Box::new(move || {
            captured.borrow_mut().frames += 1;
            !next.is_empty()
        }));
        assert_eq!(Rc::strong_count(&effect), 2);
        assert_eq!(slot.with(|callback| callback()), Some(true));
        assert_eq!(effect.borrow().frames, 1);

        drop(slot.release());
        assert!(slot.is_empty());
        assert_eq!(slot.with(|callback| callback()), None);
        assert_eq!(Rc::strong_count(&effect), 1);
    }

    #[test]
    fn busy_target_drops_the_event() {
        let target = RefCell::new(Effect { frames: 0 });
        {
            let _frame = target.borrow_mut();
            assert!(!dispatch(&target, "mouseup", |effect| effect.frames += 1));
        }
        assert!(dispatch(&target, "mouseup", |effect| effect.frames += 1));
        assert_eq!(target.borrow().frames, 1);
    }

    #[test]
    fn dispatch_reaches_trait_objects() {
        trait Counter {
            fn bump(&mut self);
        }
        impl Counter for Effect {
            fn bump(&mut self) {
                self.frames += 1;
            }
        }

        let effect: Rc<RefCell<dyn Counter>> = Rc::new(RefCell::new(Effect { frames: 0 }));
        assert!(dispatch(&*effect, "wheel", |counter| counter.bump()));
    }
}
