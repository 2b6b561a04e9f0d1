//! Property tests over orbiting cameras, on the CPU reference raycaster.

use isoray::*;
use proptest::prelude::*;

fn sphere_data() -> VolumeData {
    let grid = synthetic::sphere(UVec3::splat(16), Vec3::splat(0.125)).unwrap();
    synthetic::volume_data(grid, true).unwrap()
}

fn options(gradient_shading: bool) -> Options {
    let mut options = Options {
        settings: RenderSettings::with_screen(16, 16),
        ..Options::default()
    };
    options.parameters.set_step_size(0.1);
    options.parameters.set_gradient_shading(gradient_shading);
    options
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// The centered sphere covers the middle of the frame and leaves the
    /// corners empty from every orbit position.
    #[test]
    fn prop_sphere_visible_from_any_orbit(
        dx in -6.0f32..6.0,
        dy in -1.2f32..1.2,
        gradient_shading in any::<bool>(),
    ) {
        let mut camera = Camera::for_viewport(16, 16);
        camera.orbit(dx, dy);
        let image = render_to_image_cpu(&sphere_data(), &camera.state(), &options(gradient_shading)).unwrap();

        prop_assert_eq!((image.width, image.height), (16, 16));
        prop_assert_eq!(image.pixel(8, 8).map(|px| px[3]), Some(255));
        for (x, y) in [(0, 0), (15, 0), (0, 15), (15, 15)] {
            prop_assert_eq!(image.pixel(x, y), Some([0, 0, 0, 0]));
        }
    }

    /// Rendering the same view twice gives the same bytes.
    #[test]
    fn prop_orbit_frames_are_deterministic(dx in -6.0f32..6.0, dy in -1.2f32..1.2) {
        let mut camera = Camera::for_viewport(16, 16);
        camera.orbit(dx, dy);
        let data = sphere_data();
        let first = render_to_image_cpu(&data, &camera.state(), &options(true)).unwrap();
        let second = render_to_image_cpu(&data, &camera.state(), &options(true)).unwrap();
        prop_assert_eq!(first, second);
    }
}
