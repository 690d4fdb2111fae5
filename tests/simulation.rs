use splash_cursor::pointer::MOUSE_ID;
use splash_cursor::{ CpuFluid, EngineState, FieldLayout, Rgb, Simulation, SimulationConfig };

/// Odd resolutions put a cell center exactly on the middle of the canvas
fn config() -> SimulationConfig {
    SimulationConfig {
        sim_resolution: 33,
        dye_resolution: 33,
        ..Default::default()
    }
}

fn simulation(config: SimulationConfig, canvas: (u32, u32)) -> Simulation<CpuFluid> {
    let backend = CpuFluid::new(&FieldLayout::new(&config, canvas));
    Simulation::new(config, backend, canvas, 0.0, 7).unwrap()
}

#[test]
fn pointer_move_splat_profile() {
    let mut simulation = simulation(config(), (100, 100));
    simulation.pointer_move(MOUSE_ID, 45.0, 50.0);
    simulation.pointer_move(MOUSE_ID, 50.0, 50.0);

    let pointer = simulation.pointer(MOUSE_ID).unwrap().clone();
    assert!((pointer.delta[0] - 0.05).abs() < 1e-6);

    let force = [pointer.delta[0] * 6000.0, pointer.delta[1] * 6000.0];
    simulation.splat(pointer.texcoord, force, pointer.color).unwrap();

    let velocity = simulation.backend().velocity();
    let center = velocity.get(16, 16);
    assert!((center[0] - 300.0).abs() < 0.1);
    assert!(center[1].abs() < 1e-3);

    // gaussian falloff with radius 0.2 / 100
    let next = velocity.get(17, 16)[0];
    let expected = 300.0 * (-(1.0_f32 / 33.0).powi(2) / 0.002).exp();
    assert!((next - expected).abs() < 0.1);
    assert!(velocity.get(0, 0)[0].abs() < 1e-3);
}

#[test]
fn idle_until_first_move() {
    let mut simulation = simulation(config(), (33, 33));
    assert!(!simulation.frame(16.0, (33, 33)).unwrap());
    assert_eq!(simulation.state(), EngineState::NotStarted);
    assert!(simulation.backend().pixels().iter().all(|&channel| channel == 0));

    simulation.pointer_move(MOUSE_ID, 10.0, 10.0);
    assert!(simulation.frame(32.0, (33, 33)).unwrap());
    assert!(simulation.backend().dye().total_magnitude() > 0.0);
}

#[test]
fn dye_decays_exponentially_at_rest() {
    let mut simulation = simulation(config(), (33, 33));
    simulation.touch_start(0, 16.5, 16.5);
    simulation.splat([0.5, 0.5], [0.0, 0.0], Rgb::new(1.0, 0.0, 0.0)).unwrap();
    assert!((simulation.backend().dye().get(16, 16)[0] - 1.0).abs() < 1e-6);

    // more than a frame apart, clamped to 1/60 s
    simulation.frame(1000.0, (33, 33)).unwrap();

    let expected = 1.0 / (1.0 + 3.5 / 60.0);
    assert!((simulation.backend().dye().get(16, 16)[0] - expected).abs() < 1e-5);
    assert_eq!(simulation.backend().velocity().total_magnitude(), 0.0);
}

#[test]
fn zero_dissipation_keeps_resting_dye() {
    let config = SimulationConfig { density_dissipation: 0.0, ..config() };
    let mut simulation = simulation(config, (33, 33));
    simulation.touch_start(0, 16.5, 16.5);
    simulation.splat([0.5, 0.5], [0.0, 0.0], Rgb::new(0.0, 0.5, 0.0)).unwrap();
    let before = simulation.backend().dye().clone();

    for frame in 1..=5 {
        simulation.frame(frame as f64 * 16.0, (33, 33)).unwrap();
    }
    let after = simulation.backend().dye();
    for (a, b) in after.cells().iter().zip(before.cells()) {
        for i in 0..4 {
            assert!((a[i] - b[i]).abs() < 1e-5);
        }
    }
}

#[test]
fn resize_with_same_aspect_changes_nothing() {
    let config = SimulationConfig { sim_resolution: 16, dye_resolution: 32, ..Default::default() };
    let mut small = simulation(config.clone(), (80, 60));
    let mut large = simulation(config, (80, 60));

    for simulation in [&mut small, &mut large] {
        simulation.pointer_move(MOUSE_ID, 20.0, 30.0);
        simulation.frame(16.0, (80, 60)).unwrap();
        simulation.pointer_move(MOUSE_ID, 40.0, 30.0);
    }

    small.frame(32.0, (80, 60)).unwrap();
    large.frame(32.0, (160, 120)).unwrap();

    assert_eq!(large.layout().canvas, (160, 120));
    assert_eq!(large.layout().dye, small.layout().dye);
    assert_eq!(large.backend().dye(), small.backend().dye());
    assert_eq!(large.backend().pixels().len(), 160 * 120 * 4);
}

#[test]
fn resize_to_new_aspect_carries_dye_over() {
    let config = SimulationConfig { sim_resolution: 16, dye_resolution: 32, ..Default::default() };
    let mut simulation = simulation(config, (80, 60));
    simulation.touch_start(0, 40.0, 30.0);
    simulation.splat([0.5, 0.5], [0.0, 0.0], Rgb::new(1.0, 1.0, 1.0)).unwrap();

    simulation.frame(16.0, (60, 80)).unwrap();

    let dye = simulation.backend().dye();
    assert_eq!(dye.size(), (32, 43));
    assert_eq!(simulation.backend().velocity().size(), (16, 21));
    assert!(dye.sample([0.5, 0.5])[0] > 0.5);
}

#[test]
fn opaque_background_shows_around_dye() {
    let config = SimulationConfig {
        transparent: false,
        back_color: Rgb::new(255.0, 0.0, 0.0),
        shading: false,
        ..config()
    };
    let mut simulation = simulation(config, (33, 33));
    simulation.touch_start(0, 16.5, 16.5);
    simulation.splat([0.5, 0.5], [0.0, 0.0], Rgb::new(0.0, 1.0, 0.0)).unwrap();
    simulation.frame(16.0, (33, 33)).unwrap();

    let pixels = simulation.backend().pixels();
    assert_eq!(&pixels[0..4], &[255, 0, 0, 255]);

    let center = (16 * 33 + 16) * 4;
    assert!(pixels[center + 1] > 200);
    assert!(pixels[center] < 50);
    assert_eq!(pixels[center + 3], 255);
}

#[test]
fn stopped_simulation_freezes() {
    let mut simulation = simulation(config(), (33, 33));
    simulation.pointer_move(MOUSE_ID, 10.0, 10.0);
    simulation.frame(16.0, (33, 33)).unwrap();
    simulation.stop();

    let dye = simulation.backend().dye().clone();
    simulation.pointer_move(MOUSE_ID, 20.0, 20.0);
    assert!(!simulation.frame(32.0, (33, 33)).unwrap());
    assert_eq!(simulation.backend().dye(), &dye);
}

#[test]
fn invalid_config_is_rejected() {
    let config = SimulationConfig { pressure_iterations: 0, ..config() };
    let backend = CpuFluid::new(&FieldLayout::new(&config, (10, 10)));
    assert!(Simulation::new(config, backend, (10, 10), 0.0, 0).is_err());
}
