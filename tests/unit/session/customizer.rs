use super::*;
use crate::model::garment::{GarmentModel, MeshSurface};
use crate::sink::texture::InMemoryTextureSink;

fn png_upload(name: &str, w: u32, h: u32, rgba: [u8; 4]) -> Upload {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    Upload::new(name, "image/png", bytes)
}

fn template() -> Arc<DecodedImage> {
    Arc::new(DecodedImage::solid(40, 20, [200, 200, 200, 255]).unwrap())
}

fn ready_session() -> Customizer<InMemoryTextureSink> {
    let mut c = Customizer::new(CustomizerOpts::default(), InMemoryTextureSink::new());
    c.load_template(template()).unwrap();
    c.mark_model_ready().unwrap();
    c
}

fn with_layer() -> Customizer<InMemoryTextureSink> {
    let mut c = ready_session();
    c.upload(&png_upload("red.png", 4, 4, [255, 0, 0, 255]))
        .unwrap();
    c
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn upload_before_ready_is_rejected() {
    let mut c = Customizer::new(CustomizerOpts::default(), InMemoryTextureSink::new());
    let err = c
        .upload(&png_upload("a.png", 2, 2, [0, 0, 0, 255]))
        .unwrap_err();
    assert!(matches!(err, DecalError::MissingPrerequisite(_)));

    c.load_template(template()).unwrap();
    let err = c
        .upload(&png_upload("a.png", 2, 2, [0, 0, 0, 255]))
        .unwrap_err();
    assert!(matches!(err, DecalError::MissingPrerequisite(_)));
    assert!(c.layers().is_empty());
    assert_eq!(c.sink().bind_count(), 0);
    assert!(c.last_preview().is_some());
}

#[test]
fn non_image_upload_is_rejected() {
    let mut c = ready_session();
    let binds = c.sink().bind_count();
    let err = c
        .upload(&Upload::new("notes.txt", "text/plain", b"hello".to_vec()))
        .unwrap_err();
    assert!(matches!(err, DecalError::InvalidInput(_)));
    assert!(c.layers().is_empty());
    assert_eq!(c.sink().bind_count(), binds);
}

#[test]
fn corrupt_image_leaves_stack_unchanged() {
    let mut c = ready_session();
    let err = c
        .upload(&Upload::new("bad.png", "image/png", vec![1, 2, 3]))
        .unwrap_err();
    assert!(matches!(err, DecalError::Decode(_)));
    assert!(c.layers().is_empty());
}

#[test]
fn ready_session_binds_fill_texture_at_template_size() {
    let c = ready_session();
    assert_eq!(c.sink().bind_count(), 1);
    let update = c.sink().latest().unwrap();
    assert_eq!(update.revision, 1);
    assert_eq!(update.fill, Rgb8::WHITE);
    assert_eq!((update.texture.width, update.texture.height), (40, 20));
    assert!(update.texture.is_uniform([255, 255, 255, 255]));
    assert!(Arc::ptr_eq(&update.texture, c.last_texture().unwrap()));
}

#[test]
fn upload_adds_active_layer_and_rebinds() {
    let c = with_layer();
    assert_eq!(c.layers().len(), 1);
    assert_eq!(c.layers().active_index(), Some(0));
    assert_eq!(c.layers().get(0).unwrap().transform, DecalTransform::default());
    assert_eq!(c.sink().bind_count(), 2);
    assert_eq!(c.revision(), 2);

    let tex = &c.sink().latest().unwrap().texture;
    let px = tex.pixel(20, 10).unwrap();
    assert!(px[0] >= 250 && px[1] <= 5, "{px:?}");
}

#[test]
fn no_op_calls_skip_rendering() {
    let mut c = with_layer();
    let binds = c.sink().bind_count();

    assert!(!c.select(0).unwrap());
    assert!(!c.select(9).unwrap());
    assert!(!c.remove(3).unwrap());
    assert!(!c.set_fill(Rgb8::WHITE).unwrap());
    assert!(!c.apply_patch(&TransformPatch::default()).unwrap());
    assert!(
        !c.apply_patch(&TransformPatch {
            scale: Some(1.0),
            ..TransformPatch::default()
        })
        .unwrap()
    );
    assert!(!c.pointer_move(Point::new(5.0, 5.0)).unwrap());
    assert_eq!(c.sink().bind_count(), binds);
}

#[test]
fn duplicate_and_remove_track_active_layer() {
    let mut c = with_layer();
    assert_eq!(c.duplicate().unwrap(), Some(1));
    let (a, b) = (c.layers().get(0).unwrap(), c.layers().get(1).unwrap());
    assert!(Arc::ptr_eq(&a.image, &b.image));
    assert!(approx(b.transform.x, 0.1) && approx(b.transform.y, 0.1));
    assert_eq!(c.layers().active_index(), Some(1));

    assert!(c.remove(1).unwrap());
    assert_eq!(c.layers().active_index(), Some(0));
    assert!(c.remove(0).unwrap());
    assert_eq!(c.layers().active_index(), None);
    assert_eq!(c.duplicate().unwrap(), None);

    let tex = &c.sink().latest().unwrap().texture;
    assert!(tex.is_uniform([255, 255, 255, 255]));
}

#[test]
fn slider_scale_is_clamped() {
    let mut c = with_layer();
    assert!(
        c.apply_patch(&TransformPatch {
            scale: Some(5.0),
            rotation: Some(45.0),
            ..TransformPatch::default()
        })
        .unwrap()
    );
    let t = c.layers().active().unwrap().transform;
    assert_eq!(t.scale, 2.0);
    assert_eq!(t.rotation, 45.0);
}

#[test]
fn drag_move_normalizes_by_preview_size() {
    let mut c = with_layer();
    assert!(c.pointer_down(Point::new(10.0, 10.0)));
    assert!(c.pointer_move(Point::new(14.0, 12.0)).unwrap());
    let t = c.layers().active().unwrap().transform;
    assert!(approx(t.x, 0.1) && approx(t.y, 0.1), "{t:?}");

    c.pointer_up();
    assert!(!c.pointer_move(Point::new(30.0, 30.0)).unwrap());
}

#[test]
fn drag_scale_and_rotate_use_gains() {
    let mut c = with_layer();

    c.set_mode(GestureMode::Scale);
    c.pointer_down(Point::new(0.0, 0.0));
    c.pointer_move(Point::new(2.0, 1.0)).unwrap();
    // (0.05 + 0.05) * 2
    assert!(approx(c.layers().active().unwrap().transform.scale, 1.2));
    c.pointer_move(Point::new(400.0, 1.0)).unwrap();
    assert_eq!(c.layers().active().unwrap().transform.scale, 2.0);
    c.pointer_up();

    c.set_mode(GestureMode::Rotate);
    c.pointer_down(Point::new(0.0, 0.0));
    c.pointer_move(Point::new(4.0, 2.0)).unwrap();
    assert!(approx(c.layers().active().unwrap().transform.rotation, 36.0));
}

#[test]
fn pointer_down_without_layers_is_ignored() {
    let mut c = ready_session();
    assert!(!c.pointer_down(Point::new(1.0, 1.0)));
    assert!(!c.pointer_move(Point::new(5.0, 5.0)).unwrap());
}

#[test]
fn resize_preview_fits_template_aspect() {
    let mut c = with_layer();

    let l = c.resize_preview(100.0, 100.0).unwrap();
    assert_eq!(l.size, SurfaceSize::new(100, 50).unwrap());
    assert_eq!((l.offset_x, l.offset_y), (0.0, 25.0));
    let preview = c.last_preview().unwrap();
    assert_eq!((preview.width, preview.height), (100, 50));

    let l = c.resize_preview(300.0, 100.0).unwrap();
    assert_eq!(l.size, SurfaceSize::new(200, 100).unwrap());
    assert_eq!((l.offset_x, l.offset_y), (50.0, 0.0));
    assert_eq!(c.preview_size(), Some(l.size));

    // Drags now normalize by the laid-out size.
    c.pointer_down(Point::new(0.0, 0.0));
    c.pointer_move(Point::new(20.0, 0.0)).unwrap();
    assert!(approx(c.layers().active().unwrap().transform.x, 0.1));
}

#[test]
fn resize_preview_requires_template() {
    let mut c = Customizer::new(CustomizerOpts::default(), InMemoryTextureSink::new());
    assert!(matches!(
        c.resize_preview(10.0, 10.0),
        Err(DecalError::MissingPrerequisite(_))
    ));
    let mut c = ready_session();
    assert!(matches!(
        c.resize_preview(0.0, 10.0),
        Err(DecalError::Validation(_))
    ));
}

#[test]
fn texture_never_shows_highlight_but_preview_does() {
    let mut c = with_layer();
    c.apply_patch(&TransformPatch {
        scale: Some(0.5),
        ..TransformPatch::default()
    })
    .unwrap();
    let tex = c.last_texture().unwrap();
    assert!(!tex.data.chunks_exact(4).any(|p| p[2] > p[0] && p[2] > 200));

    let preview = c.last_preview().unwrap();
    assert!(preview.data.chunks_exact(4).any(|p| p[2] > 200 && p[0] < 100));
}

#[test]
fn fill_hex_updates_texture() {
    let mut c = ready_session();
    assert!(matches!(
        c.set_fill_hex("not-a-color"),
        Err(DecalError::InvalidInput(_))
    ));
    assert!(c.set_fill_hex("#336699").unwrap());
    assert_eq!(c.fill(), Rgb8::new(0x33, 0x66, 0x99));
    let update = c.sink().latest().unwrap();
    assert_eq!(update.fill, Rgb8::new(0x33, 0x66, 0x99));
    assert!(update.texture.is_uniform([0x33, 0x66, 0x99, 255]));
}

#[test]
fn garment_model_receives_every_texture() {
    let model = GarmentModel::new(vec![
        MeshSurface::new("body", vec![Point::new(0.5, 0.5)]),
        MeshSurface::new("sleeve", vec![Point::new(0.1, 0.1)]),
    ]);
    let mut c = Customizer::new(CustomizerOpts::default(), model);
    c.sink_mut().flip_uvs_vertically();
    c.load_template(template()).unwrap();
    c.mark_model_ready().unwrap();
    c.upload(&png_upload("blue.png", 2, 2, [0, 0, 255, 255]))
        .unwrap();

    let latest = Arc::clone(c.last_texture().unwrap());
    let model = c.into_sink();
    assert_eq!(model.bind_count(), 2);
    for mesh in model.meshes() {
        assert!(Arc::ptr_eq(&mesh.material().unwrap().texture, &latest));
    }
    let center = model.sample_vertex(0, 0).unwrap().unwrap();
    assert!(center[2] >= 250 && center[0] <= 5, "{center:?}");
}

#[derive(Default)]
struct FlakySink {
    refuse: bool,
    binds: u64,
}

impl TextureSink for FlakySink {
    fn bind(&mut self, _update: TextureUpdate) -> DecalResult<()> {
        if self.refuse {
            return Err(DecalError::render("texture upload refused"));
        }
        self.binds += 1;
        Ok(())
    }
}

#[test]
fn failed_bind_restores_previous_state() {
    let mut c = Customizer::new(CustomizerOpts::default(), FlakySink::default());
    c.load_template(template()).unwrap();
    c.mark_model_ready().unwrap();
    c.upload(&png_upload("red.png", 4, 4, [255, 0, 0, 255]))
        .unwrap();
    c.upload(&png_upload("green.png", 4, 4, [0, 255, 0, 255]))
        .unwrap();

    let transform = c.layers().active().unwrap().transform;
    let preview = Arc::clone(c.last_preview().unwrap());
    let texture = Arc::clone(c.last_texture().unwrap());
    let revision = c.revision();

    c.sink_mut().refuse = true;
    let err = c
        .upload(&png_upload("blue.png", 2, 2, [0, 0, 255, 255]))
        .unwrap_err();
    assert!(matches!(err, DecalError::Render(_)));
    assert!(c.duplicate().is_err());
    assert!(c.select(0).is_err());
    assert!(c.remove(1).is_err());
    assert!(c.set_fill(Rgb8::new(0, 0, 0)).is_err());
    let nudge = TransformPatch {
        x: Some(0.3),
        ..TransformPatch::default()
    };
    assert!(c.apply_patch(&nudge).is_err());

    assert_eq!(c.layers().len(), 2);
    assert_eq!(c.layers().active_index(), Some(1));
    assert_eq!(c.layers().active().unwrap().transform, transform);
    assert_eq!(c.fill(), Rgb8::WHITE);
    assert_eq!(c.revision(), revision);
    assert_eq!(c.sink().binds, revision);
    assert!(Arc::ptr_eq(c.last_preview().unwrap(), &preview));
    assert!(Arc::ptr_eq(c.last_texture().unwrap(), &texture));

    c.sink_mut().refuse = false;
    assert!(c.apply_patch(&nudge).unwrap());
    assert_eq!(c.revision(), revision + 1);
    assert!(approx(c.layers().active().unwrap().transform.x, 0.3));
}

#[test]
fn template_too_large_to_render_is_not_kept() {
    let huge = Arc::new(DecodedImage::solid(70_000, 1, [0, 0, 0, 255]).unwrap());

    let mut c = Customizer::new(CustomizerOpts::default(), InMemoryTextureSink::new());
    let err = c.load_template(Arc::clone(&huge)).unwrap_err();
    assert!(matches!(err, DecalError::Render(_)));
    assert!(c.template().is_none());
    assert!(c.last_preview().is_none());

    let mut c = with_layer();
    let current = Arc::clone(c.template().unwrap());
    let revision = c.revision();
    assert!(c.load_template(huge).is_err());
    assert!(Arc::ptr_eq(c.template().unwrap(), &current));
    assert_eq!(c.revision(), revision);
    assert_eq!(c.layers().len(), 1);
    assert!(
        c.upload(&png_upload("b.png", 2, 2, [0, 0, 255, 255]))
            .is_ok()
    );
}

#[test]
fn failed_preview_resize_keeps_layout_and_cached_surface() {
    let mut c = with_layer();
    let layout = c.resize_preview(80.0, 80.0).unwrap();
    let cached = c.preview_surface.as_ref().unwrap().cached_images();
    assert!(cached > 0);

    let err = c.resize_preview(300_000.0, 150_000.0).unwrap_err();
    assert!(matches!(err, DecalError::Render(_)));
    assert_eq!(c.preview_layout(), Some(layout));
    assert_eq!(
        c.preview_surface.as_ref().unwrap().cached_images(),
        cached
    );
}

#[test]
fn non_finite_slider_values_are_ignored() {
    let mut c = with_layer();
    let before = c.layers().active().unwrap().transform;
    let revision = c.revision();

    let nan = TransformPatch {
        x: Some(f64::NAN),
        rotation: Some(f64::INFINITY),
        ..TransformPatch::default()
    };
    assert!(!c.apply_patch(&nan).unwrap());
    assert!(!c.apply_patch(&nan).unwrap());
    assert_eq!(c.layers().active().unwrap().transform, before);
    assert_eq!(c.revision(), revision);
}
