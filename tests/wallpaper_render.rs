use rand::rngs::StdRng;
use rand::SeedableRng;
use waves::canvas::RecordingCanvas;
use waves::color::Rgba;
use waves::noise_field::PerlinField;
use waves::raster::PixmapCanvas;
use waves::scene::Scene;
use waves::schema::{Poem, SceneConfigFile, WaveColor, WaveSceneConfig, DARK_BACKGROUND};

fn reference_config() -> WaveSceneConfig {
    WaveSceneConfig::from_file(&SceneConfigFile {
        is_dark_mode: true,
        wave_color: WaveColor {
            color: "#f9f4dc".into(),
            name: "乳白".into(),
        },
        poem: Some(Poem {
            content: "床前明月光".into(),
            title: "静夜思".into(),
            author: "李白".into(),
        }),
    })
    .expect("reference config should validate")
}

fn decode(png: &[u8]) -> image::RgbaImage {
    image::load_from_memory(png)
        .expect("png should decode")
        .to_rgba8()
}

#[test]
fn export_resolution_ignores_the_smaller_on_screen_canvas() {
    let scene: Scene = Scene::initialize(320, 200, 2.0, reference_config(), None)
        .expect("scene should initialize");

    let png = pollster::block_on(scene.render_offscreen(1280, 720)).expect("export");
    let image = decode(&png);
    assert_eq!(image.dimensions(), (1280, 720));
    assert_eq!(
        (scene.surface().pixmap().width(), scene.surface().pixmap().height()),
        (320, 200)
    );
}

#[test]
fn export_layers_background_over_terrain() {
    let scene: Scene = Scene::initialize(400, 300, 1.0, reference_config(), None)
        .expect("scene should initialize");
    let image = decode(&pollster::block_on(scene.render_offscreen(400, 300)).unwrap());

    // Sky stays background; nothing is drawn there without a font.
    let sky = image.get_pixel(10, 10).0;
    assert_eq!(sky, [DARK_BACKGROUND.r, DARK_BACKGROUND.g, DARK_BACKGROUND.b, 255]);

    // The bottom row is covered by the opaque front layer blended with the
    // translucent ones, all in the wave color.
    let ground = image.get_pixel(200, 299).0;
    assert_eq!(ground[3], 255);
    assert!(
        ground[0] > 0xe0 && ground[1] > 0xe0 && ground[2] > 0xc8,
        "ground pixel {ground:?} should be close to the wave color"
    );
}

#[test]
fn concurrent_exports_are_independent() {
    let scene: Scene = Scene::initialize(200, 150, 1.0, reference_config(), None)
        .expect("scene should initialize");

    let first = scene.render_offscreen(200, 150);
    let second = scene.render_offscreen(100, 80);
    let (a, b) = pollster::block_on(async { (first.await, second.await) });

    assert_eq!(decode(&a.unwrap()).dimensions(), (200, 150));
    assert_eq!(decode(&b.unwrap()).dimensions(), (100, 80));
}

#[test]
fn export_reads_the_config_at_call_time() {
    let mut scene: Scene<RecordingCanvas> = Scene::initialize_with(
        300,
        200,
        1.0,
        reference_config(),
        None,
        PerlinField::new(5),
        StdRng::seed_from_u64(5),
    )
    .unwrap();

    let dark = scene.render_offscreen(120, 300);
    let mut light = reference_config();
    light.is_dark_mode = false;
    light.background_color = Rgba::rgb(0xe6, 0xe6, 0xe6);
    scene.update(light);
    let light_export = scene.render_offscreen(120, 300);

    let dark_px = decode(&pollster::block_on(dark).unwrap()).get_pixel(1, 1).0;
    let light_px = decode(&pollster::block_on(light_export).unwrap())
        .get_pixel(1, 1)
        .0;
    assert_eq!(dark_px, [0x32, 0x32, 0x32, 255]);
    assert_eq!(light_px, [0xe6, 0xe6, 0xe6, 255]);
}

#[test]
fn pixmap_scene_redraw_is_pure_for_fixed_randomness() {
    let build = || -> Scene<PixmapCanvas> {
        Scene::initialize_with(
            240,
            160,
            1.0,
            reference_config(),
            None,
            PerlinField::new(9),
            StdRng::seed_from_u64(9),
        )
        .unwrap()
    };
    let a = build();
    let b = build();
    assert_eq!(a.surface().to_rgba(), b.surface().to_rgba());
}
