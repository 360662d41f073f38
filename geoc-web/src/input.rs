use std::f32::consts::TAU;

use glam::Vec2;

/// Canvas bounding box in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasRect {
    pub origin: Vec2,
    pub size: Vec2,
}

/// What a pointer move means for the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// One pointer down: orbit towards this client position.
    Drag(Vec2),
    /// Two pointers down: zoom delta for `setZoom`.
    Pinch(f32),
    None,
}

/// Pointers currently pressed on the canvas, keyed by `pointerId`, plus the
/// last two-finger distance while a pinch is in progress.
#[derive(Debug, Default)]
pub struct InputState {
    pointers: Vec<(i32, Vec2)>,
    pinch_distance: Option<f32>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pressed(&self) -> usize {
        self.pointers.len()
    }

    fn two_finger_distance(&self) -> Option<f32> {
        match self.pointers.as_slice() {
            [(_, a), (_, b)] => Some(a.distance(*b)),
            _ => None,
        }
    }

    pub fn press(&mut self, id: i32, at: Vec2) {
        match self.pointers.iter_mut().find(|(p, _)| *p == id) {
            Some(entry) => entry.1 = at,
            None => self.pointers.push((id, at)),
        }
        self.pinch_distance = self.two_finger_distance();
    }

    pub fn release(&mut self, id: i32) {
        self.pointers.retain(|(p, _)| *p != id);
        self.pinch_distance = None;
    }

    /// Track a move of pointer `id`. Moves of pointers that are not pressed
    /// are ignored.
    pub fn move_to(&mut self, id: i32, at: Vec2, pinch_sensitivity: f32) -> Gesture {
        let Some(entry) = self.pointers.iter_mut().find(|(p, _)| *p == id) else {
            return Gesture::None;
        };
        entry.1 = at;

        match self.pointers.len() {
            1 => Gesture::Drag(at),
            2 => {
                let Some(current) = self.two_finger_distance() else {
                    return Gesture::None;
                };
                let previous = self.pinch_distance.replace(current);
                match previous {
                    Some(previous) => Gesture::Pinch(pinch_zoom(previous, current, pinch_sensitivity)),
                    None => Gesture::None,
                }
            }
            _ => Gesture::None,
        }
    }
}

/// Map a pointer position to `(pitch, yaw)`: a full turn across the canvas
/// height for pitch and across its width for yaw. `None` for a collapsed canvas.
pub fn drag_angles(pointer: Vec2, rect: &CanvasRect) -> Option<(f32, f32)> {
    if rect.size.x <= 0.0 || rect.size.y <= 0.0 {
        return None;
    }
    let rel = (pointer - rect.origin) * TAU / rect.size;
    Some((rel.y, rel.x))
}

/// Zoom delta for a wheel event; scrolling down zooms out.
pub fn wheel_zoom(delta_y: f32, sensitivity: f32) -> f32 {
    -delta_y / sensitivity
}

/// Zoom delta for a change in two-finger distance. Spreading the fingers
/// yields a negative delta, matching a downward wheel scroll.
pub fn pinch_zoom(previous: f32, current: f32, sensitivity: f32) -> f32 {
    -(current - previous) / sensitivity
}

#[cfg(target_arch = "wasm32")]
pub use listeners::attach;

#[cfg(target_arch = "wasm32")]
mod listeners {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{PointerEvent, WheelEvent};

    use super::{drag_angles, wheel_zoom, CanvasRect, Gesture, InputState};
    use crate::host::Host;

    fn listen<E, F>(host: &Rc<Host>, event: &str, mut handler: F) -> Result<(), JsValue>
    where
        E: wasm_bindgen::convert::FromWasmAbi + 'static,
        F: FnMut(&Host, E) + 'static,
    {
        let target = host.clone();
        let closure = Closure::wrap(Box::new(move |e: E| handler(&target, e)) as Box<dyn FnMut(E)>);
        host.canvas()
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    fn client_pos(e: &PointerEvent) -> Vec2 {
        Vec2::new(e.client_x() as f32, e.client_y() as f32)
    }

    /// Install drag, pinch and wheel listeners on the host canvas.
    pub fn attach(host: &Rc<Host>) -> Result<(), JsValue> {
        let state = Rc::new(RefCell::new(InputState::new()));

        let s = state.clone();
        listen(host, "pointerdown", move |_host, e: PointerEvent| {
            s.borrow_mut().press(e.pointer_id(), client_pos(&e));
        })?;
        for event in ["pointerup", "pointerleave", "pointercancel"] {
            let s = state.clone();
            listen(host, event, move |_host, e: PointerEvent| {
                s.borrow_mut().release(e.pointer_id());
            })?;
        }

        let s = state.clone();
        listen(host, "pointermove", move |host, e: PointerEvent| {
            let sensitivity = host.config().input.pinch_sensitivity;
            let gesture = s.borrow_mut().move_to(e.pointer_id(), client_pos(&e), sensitivity);
            match gesture {
                Gesture::Drag(pointer) => {
                    let r = host.canvas().get_bounding_client_rect();
                    let rect = CanvasRect {
                        origin: Vec2::new(r.left() as f32, r.top() as f32),
                        size: Vec2::new(r.width() as f32, r.height() as f32),
                    };
                    if let Some((pitch, yaw)) = drag_angles(pointer, &rect) {
                        host.set_angles(pitch, yaw);
                    }
                }
                Gesture::Pinch(delta) => host.set_zoom(delta),
                Gesture::None => {}
            }
        })?;

        listen(host, "wheel", move |host, e: WheelEvent| {
            let sensitivity = host.config().input.zoom_sensitivity;
            host.set_zoom(wheel_zoom(e.delta_y() as f32, sensitivity));
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> CanvasRect {
        CanvasRect {
            origin: Vec2::new(10.0, 20.0),
            size: Vec2::new(400.0, 200.0),
        }
    }

    #[test]
    fn test_drag_maps_full_canvas_to_full_turn() {
        let (pitch, yaw) = drag_angles(Vec2::new(10.0, 20.0), &rect()).unwrap();
        assert_eq!((pitch, yaw), (0.0, 0.0));

        let (pitch, yaw) = drag_angles(Vec2::new(210.0, 70.0), &rect()).unwrap();
        assert!((yaw - TAU / 2.0).abs() < 1e-6);
        assert!((pitch - TAU / 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_collapsed_canvas_has_no_angles() {
        let collapsed = CanvasRect {
            origin: Vec2::ZERO,
            size: Vec2::new(100.0, 0.0),
        };
        assert_eq!(drag_angles(Vec2::ONE, &collapsed), None);
    }

    #[test]
    fn test_wheel_zoom_inverts_and_scales() {
        assert_eq!(wheel_zoom(10.0, 0.5), -20.0);
        assert_eq!(wheel_zoom(-5.0, 0.5), 10.0);
    }

    #[test]
    fn test_pinch_zoom_divides_distance_change() {
        assert_eq!(pinch_zoom(100.0, 300.0, 2000.0), -0.1);
        assert_eq!(pinch_zoom(300.0, 100.0, 2000.0), 0.1);
        assert_eq!(pinch_zoom(50.0, 50.0, 2000.0), 0.0);
    }

    // ── pointer tracking ──

    #[test]
    fn test_single_pointer_drags() {
        let mut input = InputState::new();
        assert_eq!(input.move_to(1, Vec2::new(5.0, 5.0), 2000.0), Gesture::None);

        input.press(1, Vec2::ZERO);
        assert_eq!(
            input.move_to(1, Vec2::new(5.0, 6.0), 2000.0),
            Gesture::Drag(Vec2::new(5.0, 6.0))
        );
        input.release(1);
        assert_eq!(input.pressed(), 0);
        assert_eq!(input.move_to(1, Vec2::ONE, 2000.0), Gesture::None);
    }

    #[test]
    fn test_two_pointers_pinch_instead_of_drag() {
        let mut input = InputState::new();
        input.press(1, Vec2::new(0.0, 0.0));
        input.press(2, Vec2::new(100.0, 0.0));

        assert_eq!(
            input.move_to(2, Vec2::new(500.0, 0.0), 2000.0),
            Gesture::Pinch(-0.2)
        );
        // Distance is tracked from the last move, not the initial press.
        assert_eq!(
            input.move_to(1, Vec2::new(100.0, 0.0), 2000.0),
            Gesture::Pinch(0.05)
        );
    }

    #[test]
    fn test_lifting_one_finger_ends_pinch() {
        let mut input = InputState::new();
        input.press(1, Vec2::ZERO);
        input.press(2, Vec2::new(10.0, 0.0));
        input.release(2);

        assert_eq!(
            input.move_to(1, Vec2::new(3.0, 4.0), 2000.0),
            Gesture::Drag(Vec2::new(3.0, 4.0))
        );

        input.press(3, Vec2::new(3.0, 14.0));
        assert_eq!(
            input.move_to(3, Vec2::new(3.0, 24.0), 1.0),
            Gesture::Pinch(-10.0)
        );
    }
}
