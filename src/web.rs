use std::cell::{ Cell, RefCell };
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Event,
    EventTarget,
    HtmlCanvasElement,
    MouseEvent,
    TouchEvent,
    WebGl2RenderingContext,
    Window,
};
use crate::config::SimulationConfig;
use crate::engine::Simulation;
use crate::error::FluidError;
use crate::field::{ scale_by_pixel_ratio, FieldLayout };
use crate::pointer::MOUSE_ID;
use crate::renderer::WebGlFluid;

type Listener = Closure<dyn FnMut(Event)>;

/// Where an input listener is registered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputTarget {
    Window,
    /// `document.documentElement`; `mouseleave` is only dispatched to elements
    Document,
}

const INPUT_EVENTS: [(InputTarget, &str); 7] = [
    (InputTarget::Window, "mousedown"),
    (InputTarget::Window, "mousemove"),
    (InputTarget::Window, "mouseup"),
    (InputTarget::Document, "mouseleave"),
    (InputTarget::Window, "touchstart"),
    (InputTarget::Window, "touchmove"),
    (InputTarget::Window, "touchend"),
];

/// State shared by the animation frame callback and the input listeners
struct Shared {
    window: Window,
    canvas: HtmlCanvasElement,
    simulation: RefCell<Simulation<WebGlFluid>>,
    frame_callback: RefCell<Option<Closure<dyn FnMut()>>>,
    frame_handle: Cell<Option<i32>>,
}

impl Shared {
    fn pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio()
    }

    /// Match the drawing buffer to the displayed size of the canvas
    fn fit_canvas(&self) -> (u32, u32) {
        let ratio = self.pixel_ratio();
        let width = scale_by_pixel_ratio(self.canvas.client_width() as f64, ratio);
        let height = scale_by_pixel_ratio(self.canvas.client_height() as f64, ratio);
        if self.canvas.width() != width || self.canvas.height() != height {
            self.canvas.set_width(width);
            self.canvas.set_height(height);
        }
        (width, height)
    }

    /// Client coordinates to drawing buffer pixels
    fn to_pixels(&self, x: i32, y: i32) -> (f32, f32) {
        let ratio = self.pixel_ratio();
        (
            scale_by_pixel_ratio(x as f64, ratio) as f32,
            scale_by_pixel_ratio(y as f64, ratio) as f32,
        )
    }

    fn schedule(&self) {
        if self.frame_handle.get().is_some() {
            return;
        }

        let callback = self.frame_callback.borrow();
        if let Some(callback) = callback.as_ref() {
            match self.window.request_animation_frame(callback.as_ref().unchecked_ref()) {
                Ok(handle) => self.frame_handle.set(Some(handle)),
                Err(error) => log::error!("Could not request an animation frame: {:?}", error),
            }
        }
    }

    fn frame(&self) {
        self.frame_handle.set(None);

        let canvas = self.fit_canvas();
        let result = self.simulation.borrow_mut().frame(js_sys::Date::now(), canvas);
        match result {
            Ok(true) => self.schedule(),
            Ok(false) => {}
            Err(error) => log::error!("Frame failed: {}", error),
        }
    }

    /// Keep the loop alive once input has started the simulation
    fn wake(&self) {
        if self.simulation.borrow().is_running() {
            self.schedule();
        }
    }

    fn mouse_down(&self, event: &MouseEvent) {
        let (x, y) = self.to_pixels(event.client_x(), event.client_y());
        if let Err(error) = self.simulation.borrow_mut().mouse_down(x, y) {
            log::error!("Click splat failed: {}", error);
        }
    }

    fn mouse_move(&self, event: &MouseEvent) {
        let (x, y) = self.to_pixels(event.client_x(), event.client_y());
        self.simulation.borrow_mut().pointer_move(MOUSE_ID, x, y);
        self.wake();
    }

    fn mouse_up(&self) {
        self.simulation.borrow_mut().pointer_up(MOUSE_ID);
    }

    fn touches(&self, event: &TouchEvent) -> Vec<(i32, f32, f32)> {
        let touches = event.changed_touches();
        (0..touches.length())
            .filter_map(|i| touches.get(i))
            .map(|touch| {
                let (x, y) = self.to_pixels(touch.client_x(), touch.client_y());
                (touch.identifier(), x, y)
            })
            .collect()
    }

    fn touch_start(&self, event: &TouchEvent) {
        let touches = self.touches(event);
        {
            let mut simulation = self.simulation.borrow_mut();
            for (id, x, y) in touches {
                simulation.touch_start(id, x, y);
            }
        }
        self.wake();
    }

    fn touch_move(&self, event: &TouchEvent) {
        let touches = self.touches(event);
        {
            let mut simulation = self.simulation.borrow_mut();
            for (id, x, y) in touches {
                simulation.pointer_move(id, x, y);
            }
        }
        self.wake();
    }

    fn handle(&self, name: &str, event: &Event) {
        match name {
            "mouseup" | "mouseleave" => self.mouse_up(),
            "mousedown" | "mousemove" => {
                if let Some(event) = event.dyn_ref::<MouseEvent>() {
                    if name == "mousedown" { self.mouse_down(event) } else { self.mouse_move(event) }
                }
            }
            "touchstart" | "touchmove" | "touchend" => {
                if let Some(event) = event.dyn_ref::<TouchEvent>() {
                    match name {
                        "touchstart" => self.touch_start(event),
                        "touchmove" => self.touch_move(event),
                        _ => self.touch_end(event),
                    }
                }
            }
            _ => {}
        }
    }

    fn touch_end(&self, event: &TouchEvent) {
        let mut simulation = self.simulation.borrow_mut();
        for (id, _, _) in self.touches(event) {
            simulation.pointer_up(id);
        }
    }
}

#[wasm_bindgen]
/// A fluid that follows the mouse and touches over a canvas
///
/// The simulation sits idle until the first move or touch and is driven by
/// `requestAnimationFrame` from then on.
pub struct SplashCursor {
    shared: Rc<Shared>,
    listeners: Vec<(EventTarget, &'static str, Listener)>,
}

#[wasm_bindgen]
impl SplashCursor {
    /// Attach the effect to a canvas
    ///
    /// # Arguments
    /// * `canvas_id` - id of the canvas element
    /// * `config` - An object with any of the `SCREAMING_SNAKE_CASE` options, or `undefined` for the defaults
    ///
    /// # Returns
    /// The running effect, or an error if the canvas is missing, the options are invalid or WebGL 2 is unavailable.
    pub fn mount(canvas_id: &str, config: JsValue) -> Result<SplashCursor, JsValue> {
        console_error_panic_hook::set_once();
        // A second mount finds the logger already installed
        let _ = console_log::init_with_level(log::Level::Info);

        let config = SimulationConfig::from_js(config)?;

        let window = web_sys::window().ok_or(FluidError::Unsupported("no window".into()))?;
        let document = window.document().ok_or(FluidError::Unsupported("no document".into()))?;
        let root: EventTarget = document.document_element()
            .ok_or(FluidError::Unsupported("no document element".into()))?
            .into();
        let canvas = document.get_element_by_id(canvas_id)
            .ok_or_else(|| FluidError::Config(format!("no element with id '{}'", canvas_id)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| FluidError::Config(format!("'{}' is not a canvas", canvas_id)))?;

        let context_options = js_sys::Object::new();
        js_sys::Reflect::set(&context_options, &"alpha".into(), &JsValue::TRUE)?;
        js_sys::Reflect::set(&context_options, &"depth".into(), &JsValue::FALSE)?;
        js_sys::Reflect::set(&context_options, &"stencil".into(), &JsValue::FALSE)?;
        js_sys::Reflect::set(&context_options, &"antialias".into(), &JsValue::FALSE)?;
        js_sys::Reflect::set(&context_options, &"preserveDrawingBuffer".into(), &JsValue::FALSE)?;

        let gl = match canvas.get_context_with_context_options("webgl2", &context_options) {
            Ok(Some(gl)) => gl.dyn_into::<WebGl2RenderingContext>()
                .map_err(|_| FluidError::Unsupported("WebGL 2".into()))?,
            _ => return Err(FluidError::Unsupported("WebGL 2".into()).into()),
        };

        let ratio = window.device_pixel_ratio();
        let size = (
            scale_by_pixel_ratio(canvas.client_width() as f64, ratio),
            scale_by_pixel_ratio(canvas.client_height() as f64, ratio),
        );
        canvas.set_width(size.0);
        canvas.set_height(size.1);

        let backend = WebGlFluid::new(gl, &FieldLayout::new(&config, size))?;
        let now = js_sys::Date::now();
        let simulation = Simulation::new(config, backend, size, now, now.to_bits())?;

        let shared = Rc::new(Shared {
            window,
            canvas,
            simulation: RefCell::new(simulation),
            frame_callback: RefCell::new(None),
            frame_handle: Cell::new(None),
        });

        let weak = Rc::downgrade(&shared);
        *shared.frame_callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.frame();
            }
        }) as Box<dyn FnMut()>));

        let window: EventTarget = shared.window.clone().into();
        let mut cursor = SplashCursor {
            shared,
            listeners: Vec::new(),
        };

        for (target, name) in INPUT_EVENTS {
            let target = match target {
                InputTarget::Window => &window,
                InputTarget::Document => &root,
            };
            cursor.listen(target, name, move |shared, event| shared.handle(name, &event))?;
        }

        log::info!("Splash cursor mounted on '{}'", canvas_id);
        Ok(cursor)
    }

    /// Whether the animation loop has started
    pub fn running(&self) -> bool {
        self.shared.simulation.borrow().is_running()
    }

    /// Stop the simulation, cancel the pending frame and detach every listener
    pub fn destroy(&mut self) {
        self.shared.simulation.borrow_mut().stop();

        if let Some(handle) = self.shared.frame_handle.take() {
            if let Err(error) = self.shared.window.cancel_animation_frame(handle) {
                log::warn!("Could not cancel animation frame: {:?}", error);
            }
        }

        for (target, name, listener) in self.listeners.drain(..) {
            if let Err(error) = target
                .remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
            {
                log::warn!("Could not remove {} listener: {:?}", name, error);
            }
        }

        self.shared.frame_callback.borrow_mut().take();
        log::info!("Splash cursor destroyed");
    }
}

impl SplashCursor {
    fn listen<F>(&mut self, target: &EventTarget, name: &'static str, mut handler: F) -> Result<(), JsValue>
    where
        F: FnMut(&Shared, Event) + 'static,
    {
        let weak = Rc::downgrade(&self.shared);
        let listener: Listener = Closure::wrap(Box::new(move |event: Event| {
            if let Some(shared) = weak.upgrade() {
                handler(&shared, event);
            }
        }) as Box<dyn FnMut(Event)>);

        target.add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())?;
        self.listeners.push((target.clone(), name, listener));
        Ok(())
    }
}

impl Drop for SplashCursor {
    fn drop(&mut self) {
        if !self.listeners.is_empty() {
            self.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_leave_listens_on_the_document() {
        let targets: Vec<_> = INPUT_EVENTS.iter()
            .filter(|(_, name)| *name == "mouseleave")
            .map(|(target, _)| *target)
            .collect();
        assert_eq!(targets, vec![InputTarget::Document]);
    }

    #[test]
    fn every_input_is_registered_once() {
        let mut names: Vec<_> = INPUT_EVENTS.iter().map(|(_, name)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), INPUT_EVENTS.len());
    }
}
