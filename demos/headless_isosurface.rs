#![allow(clippy::cast_precision_loss)]
//! Headless isosurface rendering demo.
//!
//! Demonstrates:
//! - A procedural volume (a torus field) with a central-difference gradient
//! - Gradient-shaded rendering on the GPU, saved to a PNG
//! - Falling back to the CPU reference raycaster when no GPU is available
//! - A step-size sweep with per-frame timings
//!
//! Usage: `cargo run --example headless_isosurface -- [output.png] [options.json]`

use isoray::{
    run_step_size_sweep, synthetic, Camera, CpuIsoRaycaster, DisplayScaling, Options, UVec3,
    Vec3, VolumeGrid, VolumeRenderer, VolumeSource,
};

fn torus(resolution: u32) -> VolumeGrid {
    let n = resolution as f32;
    let voxel = Vec3::splat(2.0 / n);
    VolumeGrid::from_fn(UVec3::splat(resolution), voxel, |i, j, k| {
        let p = Vec3::new(i as f32, j as f32, k as f32) / n * 2.0 - 1.0 + 1.0 / n;
        let ring = (p.x * p.x + p.z * p.z).sqrt() - 0.55;
        let d = (ring * ring + p.y * p.y).sqrt() - 0.25;
        // 0.5 on the torus surface, rising inside.
        (0.5 - d).clamp(0.0, 1.0)
    })
    .expect("demo grid resolution is valid")
}

fn main() {
    isoray::init_logging();

    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "isosurface.png".to_string());
    let mut options = match args.next() {
        Some(path) => Options::load(&path).expect("failed to load options"),
        None => Options::default(),
    };
    options.settings.screen_width = 800;
    options.settings.screen_height = 600;
    options.settings.display_scaling = DisplayScaling::Supersample(2);
    options.parameters.set_step_size(0.02);
    options.parameters.set_gradient_shading(true);

    let data = synthetic::volume_data(torus(96), true).expect("gradient matches the grid");

    let mut camera = Camera::for_viewport(800, 600);
    if let Some(grid) = data.scalar_field() {
        camera.look_at_volume(&grid);
    }
    camera.orbit(0.4, 0.5);
    let state = camera.state();

    match isoray::render_to_file(&output, &data, &state, &options) {
        Ok(()) => println!("GPU render saved to {output}"),
        Err(e) => {
            eprintln!("GPU render failed ({e}), using the CPU reference raycaster");
            let image = isoray::render_to_image_cpu(&data, &state, &options)
                .expect("CPU render failed");
            image.save(&output).expect("failed to save image");
            println!(
                "CPU render ({}x{}) saved to {output}",
                image.width, image.height
            );
        }
    }

    // Sweep the step size on a smaller CPU frame.
    let mut renderer = CpuIsoRaycaster::new();
    renderer.set_parameters(options.parameters);
    renderer
        .initialize(&data, 200, 150)
        .expect("volume data is present");
    let mut settings = options.settings;
    settings.screen_width = 200;
    settings.screen_height = 150;
    settings.display_scaling = DisplayScaling::Native;

    let report = run_step_size_sweep(&mut renderer, &state, &settings).expect("sweep failed");
    println!("{} sweep, {} frames:", report.parameter, report.samples.len());
    for sample in &report.samples {
        println!("  {:>5.2}  {:>8.2?}", sample.value, sample.elapsed);
    }
    if let Some(fastest) = report.fastest() {
        println!("fastest: {:.2} in {:.2?}", fastest.value, fastest.elapsed);
    }
}
