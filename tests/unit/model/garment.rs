use super::*;
use crate::foundation::core::SurfaceSize;

// 2x2 texture: top row red, blue; bottom row green, transparent.
fn quad_texture() -> Arc<Bitmap> {
    let data = [
        [255, 0, 0, 255],
        [0, 0, 255, 255],
        [0, 255, 0, 255],
        [0, 0, 0, 0],
    ]
    .concat();
    Arc::new(Bitmap::from_premul(SurfaceSize::new(2, 2).unwrap(), data).unwrap())
}

fn model() -> GarmentModel {
    GarmentModel::new(vec![
        MeshSurface::new("front", vec![Point::new(0.25, 0.25), Point::new(0.75, 0.75)]),
        MeshSurface::new("back", vec![Point::new(0.0, 1.0)]),
    ])
}

fn bind(model: &mut GarmentModel, revision: u64) -> Arc<Bitmap> {
    let texture = quad_texture();
    model
        .bind(TextureUpdate {
            texture: Arc::clone(&texture),
            fill: Rgb8::new(9, 8, 7),
            revision,
        })
        .unwrap();
    texture
}

#[test]
fn bind_shares_one_texture_across_meshes() {
    let mut m = model();
    let tex = bind(&mut m, 3);

    assert_eq!(m.bind_count(), 1);
    for mesh in m.meshes() {
        let mat = mesh.material().unwrap();
        assert!(Arc::ptr_eq(&mat.texture, &tex));
        assert_eq!(mat.tint, Rgb8::new(9, 8, 7));
        assert_eq!(mat.revision, 3);
    }
}

#[test]
fn rebind_replaces_previous_texture() {
    let mut m = model();
    let first = bind(&mut m, 1);
    let second = bind(&mut m, 2);
    let mat = m.mesh("back").unwrap().material().unwrap();
    assert!(Arc::ptr_eq(&mat.texture, &second));
    assert!(!Arc::ptr_eq(&mat.texture, &first));
    assert_eq!(m.bind_count(), 2);
}

#[test]
fn flip_runs_once_per_mesh() {
    let mut m = model();
    assert_eq!(m.flip_uvs_vertically(), 2);
    assert_eq!(m.mesh("front").unwrap().uvs()[0], Point::new(0.25, 0.75));
    assert_eq!(m.mesh("back").unwrap().uvs()[0], Point::new(0.0, 0.0));

    assert_eq!(m.flip_uvs_vertically(), 0);
    assert_eq!(m.mesh("front").unwrap().uvs()[0], Point::new(0.25, 0.75));
}

#[test]
fn sampling_uses_bottom_up_v() {
    let mut m = model();
    assert_eq!(m.sample_texel(0, Point::new(0.1, 0.9)).unwrap(), None);
    bind(&mut m, 1);

    assert_eq!(
        m.sample_texel(0, Point::new(0.1, 0.9)).unwrap(),
        Some([255, 0, 0, 255])
    );
    assert_eq!(
        m.sample_texel(0, Point::new(0.9, 0.9)).unwrap(),
        Some([0, 0, 255, 255])
    );
    assert_eq!(
        m.sample_texel(0, Point::new(0.1, 0.1)).unwrap(),
        Some([0, 255, 0, 255])
    );
    // Edges clamp.
    assert_eq!(
        m.sample_texel(0, Point::new(1.0, 0.0)).unwrap(),
        Some([0, 0, 0, 0])
    );
    assert_eq!(
        m.sample_texel(0, Point::new(-3.0, 7.0)).unwrap(),
        Some([255, 0, 0, 255])
    );
}

#[test]
fn flipped_model_uvs_address_canvas_rows_top_down() {
    let mut m = model();
    m.flip_uvs_vertically();
    bind(&mut m, 1);
    // Vertex authored at (0.25, 0.25), i.e. the top-left quadrant of the canvas.
    assert_eq!(m.sample_vertex(0, 0).unwrap(), Some([255, 0, 0, 255]));
    assert_eq!(m.sample_vertex(0, 1).unwrap(), Some([0, 0, 0, 0]));
    assert_eq!(m.sample_vertex(0, 9).unwrap(), None);
}

#[test]
fn alpha_test_discards_transparent_texels() {
    let mut m = model();
    bind(&mut m, 1);
    assert!(m.is_opaque_at(0, Point::new(0.1, 0.9)).unwrap());
    assert!(!m.is_opaque_at(0, Point::new(0.9, 0.1)).unwrap());
}

#[test]
fn unknown_mesh_index_is_invalid_input() {
    let m = model();
    let err = m.sample_texel(5, Point::new(0.5, 0.5)).unwrap_err();
    assert!(matches!(err, DecalError::InvalidInput(_)));
}
