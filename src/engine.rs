use rand::{ rngs::SmallRng, Rng, SeedableRng };
use crate::backend::{ FluidBackend, Splat };
use crate::color::{ generate_color, wrap, Rgb };
use crate::config::SimulationConfig;
use crate::error::FluidError;
use crate::field::FieldLayout;
use crate::pointer::{ Pointer, MOUSE_ID };

/// Longest time step a frame may integrate, in seconds
pub const MAX_DELTA_TIME: f32 = 1.0 / 60.0;
/// Dye boost of the splat made by a click
const CLICK_COLOR_BOOST: f32 = 10.0;

/// Lifecycle of a [Simulation]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Waiting for the first move or touch
    NotStarted,
    Running,
    /// Torn down; frames and input are ignored
    Stopped,
}

/// Drives a [FluidBackend] from pointer input, one frame at a time
///
/// The host forwards input events and calls [frame](Simulation::frame) from
/// its animation callback; both run on the same thread, so a move is always
/// complete before the frame that consumes it.
pub struct Simulation<B> {
    config: SimulationConfig,
    backend: B,
    layout: FieldLayout,
    pointers: Vec<Pointer>,
    state: EngineState,
    last_time: f64,
    color_timer: f32,
    rng: SmallRng,
}

impl<B: FluidBackend> Simulation<B> {
    /// Wrap `backend`, downgrading `config` to what the backend supports
    ///
    /// `now` is a timestamp in milliseconds on the clock later passed to
    /// [frame](Simulation::frame).
    pub fn new(
        config: SimulationConfig,
        mut backend: B,
        canvas: (u32, u32),
        now: f64,
        seed: u64,
    ) -> Result<Simulation<B>, FluidError> {
        config.validate()?;
        let capabilities = backend.capabilities();
        let config = config.with_capabilities(&capabilities);

        let layout = FieldLayout::new(&config, canvas);
        backend.resize(&layout)?;

        let mut rng = SmallRng::seed_from_u64(seed);
        let pointers = vec![Pointer::new(MOUSE_ID, generate_color(&mut rng))];

        Ok(Simulation {
            config,
            backend,
            layout,
            pointers,
            state: EngineState::NotStarted,
            last_time: now,
            color_timer: 0.0,
            rng,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    pub fn pointers(&self) -> &[Pointer] {
        &self.pointers
    }

    pub fn pointer(&self, id: i32) -> Option<&Pointer> {
        self.pointers.iter().find(|pointer| pointer.id == id)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn stop(&mut self) {
        self.state = EngineState::Stopped;
    }

    fn start(&mut self) {
        if self.state == EngineState::NotStarted {
            log::debug!("First input, starting the simulation");
            self.state = EngineState::Running;
        }
    }

    /// Index of the pointer tracking `id`
    ///
    /// A new touch takes over a released touch pointer before a new one is
    /// allocated, so the list never outgrows the most simultaneous contacts.
    fn pointer_index(&mut self, id: i32) -> usize {
        if let Some(index) = self.pointers.iter().position(|pointer| pointer.id == id) {
            return index;
        }

        let released = self.pointers.iter()
            .position(|pointer| pointer.id != MOUSE_ID && !pointer.down);
        match released {
            Some(index) if id != MOUSE_ID => {
                self.pointers[index].id = id;
                index
            }
            _ => {
                let color = generate_color(&mut self.rng);
                self.pointers.push(Pointer::new(id, color));
                self.pointers.len() - 1
            }
        }
    }

    /// Mouse button down at canvas pixel `(x, y)`: a strong splat right away
    pub fn mouse_down(&mut self, x: f32, y: f32) -> Result<(), FluidError> {
        if self.state == EngineState::Stopped {
            return Ok(());
        }

        let color = generate_color(&mut self.rng);
        let index = self.pointer_index(MOUSE_ID);
        self.pointers[index].press(MOUSE_ID, x, y, self.layout.canvas, color);
        self.click_splat(index)
    }

    /// A touch begins; the first one starts the simulation
    pub fn touch_start(&mut self, id: i32, x: f32, y: f32) {
        if self.state == EngineState::Stopped {
            return;
        }

        self.start();
        let color = generate_color(&mut self.rng);
        let index = self.pointer_index(id);
        self.pointers[index].press(id, x, y, self.layout.canvas, color);
    }

    /// Pointer `id` moved to canvas pixel `(x, y)`; the first move starts the simulation
    pub fn pointer_move(&mut self, id: i32, x: f32, y: f32) {
        if self.state == EngineState::Stopped {
            return;
        }

        self.start();
        let index = self.pointer_index(id);
        self.pointers[index].track(x, y, self.layout.canvas);
    }

    pub fn pointer_up(&mut self, id: i32) {
        if let Some(pointer) = self.pointers.iter_mut().find(|pointer| pointer.id == id) {
            pointer.release();
        }
    }

    /// Run one frame at timestamp `now` (milliseconds) for a canvas of `canvas` pixels
    ///
    /// Returns whether a frame was simulated.
    pub fn frame(&mut self, now: f64, canvas: (u32, u32)) -> Result<bool, FluidError> {
        if self.state != EngineState::Running {
            return Ok(false);
        }

        let delta_time = self.delta_time(now);
        if canvas != self.layout.canvas {
            self.resize(canvas)?;
        }
        self.update_colors(delta_time);
        self.apply_inputs()?;
        self.backend.step(delta_time, &self.config)?;
        self.backend.render(&self.config)?;

        Ok(true)
    }

    /// Seconds since the last frame, at most [MAX_DELTA_TIME]
    fn delta_time(&mut self, now: f64) -> f32 {
        let delta_time = ((now - self.last_time) / 1000.0) as f32;
        self.last_time = now;
        delta_time.clamp(0.0, MAX_DELTA_TIME)
    }

    fn resize(&mut self, canvas: (u32, u32)) -> Result<(), FluidError> {
        let layout = FieldLayout::new(&self.config, canvas);
        log::debug!("Canvas resized to {:?}, fields {:?} / {:?}", canvas, layout.sim, layout.dye);
        self.backend.resize(&layout)?;
        self.layout = layout;
        Ok(())
    }

    fn update_colors(&mut self, delta_time: f32) {
        self.color_timer += delta_time * self.config.color_update_speed;
        if self.color_timer >= 1.0 {
            self.color_timer = wrap(self.color_timer, 0.0, 1.0);
            for pointer in &mut self.pointers {
                pointer.color = generate_color(&mut self.rng);
            }
        }
    }

    fn apply_inputs(&mut self) -> Result<(), FluidError> {
        for index in 0..self.pointers.len() {
            if self.pointers[index].take_move() {
                let pointer = &self.pointers[index];
                let force = [
                    pointer.delta[0] * self.config.splat_force,
                    pointer.delta[1] * self.config.splat_force,
                ];
                let (position, color) = (pointer.texcoord, pointer.color);
                self.splat(position, force, color)?;
            }
        }
        Ok(())
    }

    fn click_splat(&mut self, index: usize) -> Result<(), FluidError> {
        let pointer = &self.pointers[index];
        let (position, color) = (pointer.texcoord, pointer.color.scaled(CLICK_COLOR_BOOST));
        let force = [
            10.0 * (self.rng.gen::<f32>() - 0.5),
            30.0 * (self.rng.gen::<f32>() - 0.5),
        ];
        self.splat(position, force, color)
    }

    /// Inject velocity `force` and dye `color` around texture coordinate `position`
    pub fn splat(&mut self, position: [f32; 2], force: [f32; 2], color: Rgb) -> Result<(), FluidError> {
        let aspect_ratio = self.layout.aspect_ratio();
        let splat = Splat {
            position,
            force,
            color,
            radius: correct_radius(self.config.splat_radius / 100.0, aspect_ratio),
            aspect_ratio,
        };
        self.backend.splat(&splat)
    }
}

/// Stretch the splat radius on wide canvases
pub fn correct_radius(radius: f32, aspect_ratio: f32) -> f32 {
    if aspect_ratio > 1.0 { radius * aspect_ratio } else { radius }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Capabilities;

    #[derive(Default)]
    struct Recorder {
        splats: Vec<Splat>,
        steps: Vec<f32>,
        renders: usize,
        layouts: Vec<FieldLayout>,
        linear_filtering: bool,
    }

    impl FluidBackend for Recorder {
        fn capabilities(&self) -> Capabilities {
            Capabilities { linear_filtering: self.linear_filtering, float_targets: true }
        }

        fn resize(&mut self, layout: &FieldLayout) -> Result<(), FluidError> {
            self.layouts.push(*layout);
            Ok(())
        }

        fn splat(&mut self, splat: &Splat) -> Result<(), FluidError> {
            self.splats.push(*splat);
            Ok(())
        }

        fn step(&mut self, delta_time: f32, _: &SimulationConfig) -> Result<(), FluidError> {
            self.steps.push(delta_time);
            Ok(())
        }

        fn render(&mut self, _: &SimulationConfig) -> Result<(), FluidError> {
            self.renders += 1;
            Ok(())
        }
    }

    fn simulation(canvas: (u32, u32)) -> Simulation<Recorder> {
        let backend = Recorder { linear_filtering: true, ..Default::default() };
        Simulation::new(SimulationConfig::default(), backend, canvas, 0.0, 1).unwrap()
    }

    #[test]
    fn waits_for_first_move() {
        let mut simulation = simulation((100, 100));
        assert_eq!(simulation.state(), EngineState::NotStarted);
        assert!(!simulation.frame(16.0, (100, 100)).unwrap());
        assert!(simulation.backend().steps.is_empty());

        simulation.pointer_move(MOUSE_ID, 10.0, 10.0);
        assert!(simulation.is_running());
        assert!(simulation.frame(32.0, (100, 100)).unwrap());
        assert_eq!(simulation.backend().steps.len(), 1);
        assert_eq!(simulation.backend().renders, 1);
    }

    #[test]
    fn touch_starts_but_click_does_not() {
        let mut simulation = simulation((100, 100));
        simulation.mouse_down(50.0, 50.0).unwrap();
        assert_eq!(simulation.state(), EngineState::NotStarted);
        // the click splat lands immediately
        assert_eq!(simulation.backend().splats.len(), 1);

        simulation.touch_start(7, 20.0, 20.0);
        assert!(simulation.is_running());
        assert!(simulation.pointer(7).unwrap().down);
    }

    #[test]
    fn click_splat_is_boosted_and_small() {
        let mut simulation = simulation((100, 100));
        simulation.mouse_down(25.0, 75.0).unwrap();

        let pointer = simulation.pointer(MOUSE_ID).unwrap().clone();
        let splat = simulation.backend().splats[0];
        assert_eq!(splat.position, [0.25, 0.25]);
        assert_eq!(splat.color, pointer.color.scaled(CLICK_COLOR_BOOST));
        assert!(splat.force[0].abs() <= 5.0);
        assert!(splat.force[1].abs() <= 15.0);
    }

    #[test]
    fn stopped_ignores_everything() {
        let mut simulation = simulation((100, 100));
        simulation.pointer_move(MOUSE_ID, 10.0, 10.0);
        simulation.stop();

        simulation.pointer_move(MOUSE_ID, 30.0, 30.0);
        simulation.mouse_down(30.0, 30.0).unwrap();
        assert!(!simulation.frame(16.0, (100, 100)).unwrap());
        assert!(simulation.backend().splats.is_empty());
        assert_eq!(simulation.state(), EngineState::Stopped);
    }

    #[test]
    fn delta_time_is_clamped() {
        let mut simulation = simulation((100, 100));
        simulation.pointer_move(MOUSE_ID, 10.0, 10.0);

        simulation.frame(1000.0, (100, 100)).unwrap();
        simulation.frame(1008.0, (100, 100)).unwrap();
        simulation.frame(1000.0, (100, 100)).unwrap();

        let steps = &simulation.backend().steps;
        assert_eq!(steps[0], MAX_DELTA_TIME);
        assert!((steps[1] - 0.008).abs() < 1e-6);
        assert_eq!(steps[2], 0.0);
    }

    #[test]
    fn moves_splat_once() {
        let mut simulation = simulation((100, 100));
        simulation.pointer_move(MOUSE_ID, 50.0, 50.0);
        simulation.frame(16.0, (100, 100)).unwrap();
        let first = simulation.backend().splats.len();

        simulation.pointer_move(MOUSE_ID, 55.0, 50.0);
        simulation.frame(32.0, (100, 100)).unwrap();
        simulation.frame(48.0, (100, 100)).unwrap();
        simulation.frame(64.0, (100, 100)).unwrap();

        let splats = &simulation.backend().splats;
        assert_eq!(splats.len(), first + 1);
        let splat = splats[splats.len() - 1];
        assert!((splat.force[0] - 0.05 * 6000.0).abs() < 1e-2);
        assert!(splat.force[1].abs() < 1e-3);
        assert!((splat.radius - 0.002).abs() < 1e-7);
    }

    #[test]
    fn resize_reallocates_only_on_change() {
        let mut simulation = simulation((800, 600));
        simulation.pointer_move(MOUSE_ID, 1.0, 1.0);
        simulation.frame(16.0, (800, 600)).unwrap();
        assert_eq!(simulation.backend().layouts.len(), 1);

        simulation.frame(32.0, (600, 800)).unwrap();
        let layouts = &simulation.backend().layouts;
        assert_eq!(layouts.len(), 2);
        assert_eq!(layouts[1].sim, (128, 171));
        assert_eq!(simulation.layout().canvas, (600, 800));
    }

    #[test]
    fn colors_cycle_with_timer() {
        let mut simulation = simulation((100, 100));
        simulation.pointer_move(MOUSE_ID, 1.0, 1.0);
        let before = simulation.pointer(MOUSE_ID).unwrap().color;

        // 10 colors per second at 60 frames per second: a change within 6 frames
        let mut changed = false;
        for frame in 1..=7 {
            simulation.frame(frame as f64 * 1000.0 / 60.0, (100, 100)).unwrap();
            changed |= simulation.pointer(MOUSE_ID).unwrap().color != before;
        }
        assert!(changed);
        assert!(simulation.color_timer < 1.0);
    }

    #[test]
    fn wide_canvas_stretches_radius() {
        let mut simulation = simulation((200, 100));
        simulation.splat([0.5, 0.5], [0.0, 0.0], Rgb::default()).unwrap();
        let splat = simulation.backend().splats[0];
        assert!((splat.radius - 0.004).abs() < 1e-7);
        assert!((splat.aspect_ratio - 2.0).abs() < 1e-6);
        assert_eq!(correct_radius(0.002, 0.5), 0.002);
    }

    #[test]
    fn capabilities_downgrade_config() {
        let backend = Recorder { linear_filtering: false, ..Default::default() };
        let simulation = Simulation::new(SimulationConfig::default(), backend, (100, 100), 0.0, 1).unwrap();
        assert!(!simulation.config().shading);
        assert_eq!(simulation.config().dye_resolution, 256);
        assert_eq!(simulation.backend().layouts[0].dye, (256, 256));
    }

    #[test]
    fn released_touches_are_reused() {
        let mut simulation = simulation((100, 100));
        for id in 0..1000 {
            simulation.touch_start(id, 50.0, 50.0);
            simulation.pointer_move(id, 60.0, 50.0);
            simulation.pointer_up(id);
        }
        assert_eq!(simulation.pointers().len(), 2);
        assert_eq!(simulation.pointer(999).unwrap().id, 999);

        // two fingers down at once need two touch pointers
        simulation.touch_start(1000, 10.0, 10.0);
        simulation.touch_start(1001, 90.0, 90.0);
        assert_eq!(simulation.pointers().len(), 3);
        assert!(simulation.pointer(1000).unwrap().down);
        assert!(simulation.pointer(1001).unwrap().down);
        assert!(simulation.pointer(MOUSE_ID).is_some());
    }

    #[test]
    fn each_touch_gets_a_pointer() {
        let mut simulation = simulation((100, 100));
        simulation.touch_start(1, 10.0, 10.0);
        simulation.touch_start(2, 90.0, 90.0);
        simulation.pointer_up(1);

        assert_eq!(simulation.pointers().len(), 3);
        assert!(!simulation.pointer(1).unwrap().down);
        assert!(simulation.pointer(2).unwrap().down);
    }
}
