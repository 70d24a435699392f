//! Frame-level scene tests.
//!
//! Each test builds a small host scene, runs frames through the recording
//! backend and checks the GPU resources and draw calls the bridge produced.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use rstest::rstest;

use common::{init_test_logging, Scene, EPSILON};
use scene_bridge::backend::{AddressMode, RecordingBackend, ResourceKind, VertexChannels};
use scene_bridge::host::{AttributeValue, HostNodeKind, MeshData};
use scene_bridge::resources::{SIMPLE_MESH, TEXTURED_MESH};
use scene_bridge::{
    BridgeConfig, BridgeError, GraphRegistry, HostEvent, MemoryHost, ShaderLibrary, ShadingPath,
};

fn write_test_image(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("scene_bridge_{}_{}.png", name, std::process::id()));
    image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 40, 40, 255]))
        .save(&path)
        .expect("write test image");
    path
}

// ============================================================================
// Session
// ============================================================================

#[test]
fn test_registry_requires_a_device() {
    let host = MemoryHost::with_default_shading_group("initialShadingGroup");
    let mut backend = RecordingBackend::new();
    let shaders = ShaderLibrary::with_builtin(&mut backend).unwrap();

    let unavailable = RecordingBackend::unavailable();
    let result = GraphRegistry::new(BridgeConfig::default(), shaders, &host, &unavailable);

    assert!(matches!(result, Err(BridgeError::DeviceUnavailable)));
}

#[test]
fn test_registry_requires_the_default_technique() {
    let host = MemoryHost::with_default_shading_group("initialShadingGroup");
    let mut backend = RecordingBackend::new();
    let shaders = ShaderLibrary::with_builtin(&mut backend).unwrap();
    let config = BridgeConfig::default().with_default_technique("Missing");

    let result = GraphRegistry::new(config, shaders, &host, &backend);

    assert!(matches!(result, Err(BridgeError::MissingDefaultShader(name)) if name == "Missing"));
}

#[test]
fn test_shutdown_releases_everything() {
    init_test_logging();
    let mut scene = Scene::new();
    let (sg, shader) = scene.create_material("tex", TEXTURED_MESH);
    scene.create_mesh_under("quad", sg);
    let file = scene.host.create_file_texture("file1");
    let path = write_test_image("shutdown");
    scene
        .host
        .set_attribute(file, "fileTextureName", AttributeValue::String(path.display().to_string()));
    scene.host.connect(file, "outColor", shader, "Texture0");
    scene.frame();
    assert!(scene.backend.live_count(ResourceKind::Texture) > 0);

    let Scene {
        mut backend,
        registry,
        ..
    } = scene;
    registry.shutdown(&mut backend);

    assert_eq!(backend.live_resource_count(), 0);
    assert_eq!(backend.invalid_destroys(), 0);
    let _ = std::fs::remove_file(path);
}

// ============================================================================
// Geometry
// ============================================================================

#[test]
fn test_transform_move_updates_uniform_without_rebuild() {
    let mut scene = Scene::new();
    let (sg, _) = scene.create_material("A", SIMPLE_MESH);
    let (t1, m1) = scene.create_mesh_under("T1", sg);

    let stats = scene.frame();
    assert_eq!(stats.draw_calls, 1);
    let mesh = scene.mesh(m1);
    assert_eq!(mesh.rebuild_count(), 1);
    assert_eq!(mesh.instance_count(), 1);
    assert_eq!(mesh.submeshes().len(), 1);
    assert_eq!(
        mesh.submeshes()[0].channels(),
        VertexChannels::POSITION | VertexChannels::NORMAL
    );
    assert_eq!(mesh.submeshes()[0].index_count(), 6);
    let buffers = scene.backend.created_count(ResourceKind::Buffer);

    scene.host.set_translation(t1, Vec3::new(1.0, 0.0, 0.0));
    let stats = scene.frame();

    assert_eq!(stats.draw_calls, 1);
    assert_eq!(scene.mesh(m1).rebuild_count(), 1);
    assert_eq!(scene.backend.created_count(ResourceKind::Buffer), buffers);
    let expected = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
    assert!(scene.uniform_matrix(m1, t1).abs_diff_eq(expected, EPSILON));
    assert!(scene
        .mesh(m1)
        .instance(scene.id(t1))
        .unwrap()
        .local_to_world()
        .abs_diff_eq(expected, EPSILON));
}

#[test]
fn test_material_switch_adds_texcoord_channel() {
    let mut scene = Scene::new();
    let (sg_a, _) = scene.create_material("A", SIMPLE_MESH);
    let (sg_b, _) = scene.create_material("B", TEXTURED_MESH);
    let (_t1, m1) = scene.create_mesh_under("T1", sg_a);
    scene.frame();
    assert!(!scene.mesh(m1).submeshes()[0]
        .channels()
        .contains(VertexChannels::TEXCOORD0));

    scene.host.assign_material(m1, sg_b);
    let stats = scene.frame();

    let mesh = scene.mesh(m1);
    assert_eq!(mesh.rebuild_count(), 2);
    assert_eq!(mesh.submeshes().len(), 1);
    assert_eq!(mesh.submeshes()[0].material(), scene.id(sg_b));
    assert_eq!(
        mesh.submeshes()[0].channels(),
        VertexChannels::POSITION | VertexChannels::NORMAL | VertexChannels::TEXCOORD0
    );
    assert_eq!(stats.draw_calls, 1);
    let m1_id = scene.id(m1);
    assert!(!scene.node(sg_a).base().is_connected(m1_id));
    assert!(scene.node(sg_b).base().is_connected(m1_id));
}

#[test]
fn test_technique_change_rebuilds_connected_meshes() {
    let mut scene = Scene::new();
    let (sg, shader) = scene.create_material("A", SIMPLE_MESH);
    let (_t1, m1) = scene.create_mesh_under("T1", sg);
    scene.frame();

    scene.host.set_attribute(
        shader,
        "technique",
        AttributeValue::String(TEXTURED_MESH.to_string()),
    );
    scene.frame();

    assert_eq!(scene.material(sg).technique(), TEXTURED_MESH);
    let mesh = scene.mesh(m1);
    assert_eq!(mesh.rebuild_count(), 2);
    assert!(mesh.submeshes()[0]
        .channels()
        .contains(VertexChannels::TEXCOORD0));
}

#[test]
fn test_deformation_rebuilds_geometry() {
    let mut scene = Scene::new();
    let sg = scene.default_shading_group();
    let (_t, mesh) = scene.create_mesh_under("quad", sg);
    scene.frame();

    let moved = MeshData::plane(2.0, 2.0, 1).positions;
    scene.host.deform_mesh(mesh, moved);
    scene.frame();

    assert_eq!(scene.mesh(mesh).rebuild_count(), 2);
    assert_eq!(scene.backend.invalid_destroys(), 0);
}

#[test]
fn test_multiple_materials_build_one_submesh_each() {
    let mut scene = Scene::new();
    let (sg_a, _) = scene.create_material("A", SIMPLE_MESH);
    let (sg_b, _) = scene.create_material("B", TEXTURED_MESH);
    let transform = scene.host.create_transform("T");
    let mesh = scene.host.create_mesh("shape", MeshData::plane(1.0, 1.0, 2));
    scene.host.parent(mesh, transform);
    scene.host.assign_faces(mesh, sg_a, &[0, 1]);
    scene.host.assign_faces(mesh, sg_b, &[2, 3]);

    let stats = scene.frame();

    let submeshes = scene.mesh(mesh).submeshes();
    assert_eq!(submeshes.len(), 2);
    assert_eq!(submeshes[0].material(), scene.id(sg_a));
    assert_eq!(submeshes[1].material(), scene.id(sg_b));
    assert_eq!(submeshes[0].index_count(), 12);
    assert_eq!(submeshes[1].index_count(), 12);
    assert_eq!(stats.draw_calls, 2);
}

#[test]
fn test_failed_group_discards_the_whole_mesh() {
    let mut scene = Scene::new();
    let (sg_a, _) = scene.create_material("A", SIMPLE_MESH);
    let (sg_b, _) = scene.create_material("B", SIMPLE_MESH);
    let transform = scene.host.create_transform("T");
    let mesh = scene.host.create_mesh("shape", MeshData::plane(1.0, 1.0, 2));
    scene.host.parent(mesh, transform);
    scene.host.assign_faces(mesh, sg_a, &[0, 1]);
    scene.host.assign_faces(mesh, sg_b, &[2, 3]);
    scene.frame();
    assert_eq!(scene.mesh(mesh).submeshes().len(), 2);

    // Second group loses its material
    let (m, b) = (scene.id(mesh), scene.id(sg_b));
    scene.registry.disconnect(m, b).unwrap();
    scene.host.mark_dirty(mesh, "inMesh");
    let stats = scene.frame();

    assert!(scene.mesh(mesh).submeshes().is_empty());
    assert_eq!(stats.draw_calls, 0);
    // Only the instance uniform survives
    assert_eq!(scene.backend.live_count(ResourceKind::Buffer), 1);
    assert_eq!(scene.backend.invalid_destroys(), 0);
}

#[test]
fn test_broken_geometry_recovers_after_next_change() {
    let mut scene = Scene::new();
    let sg = scene.default_shading_group();
    let (_t, mesh) = scene.create_mesh_under("quad", sg);
    scene.frame();

    scene.host.break_geometry(mesh, true);
    scene.host.mark_dirty(mesh, "inMesh");
    assert_eq!(scene.frame().draw_calls, 0);
    assert!(scene.mesh(mesh).submeshes().is_empty());

    scene.host.break_geometry(mesh, false);
    scene.host.mark_dirty(mesh, "inMesh");
    assert_eq!(scene.frame().draw_calls, 1);
    assert_eq!(scene.mesh(mesh).rebuild_count(), 3);
}

#[test]
fn test_hidden_mesh_defers_rebuild() {
    let mut scene = Scene::new();
    let sg = scene.default_shading_group();
    let (transform, mesh) = scene.create_mesh_under("quad", sg);
    scene.host.set_visibility(transform, false);

    assert_eq!(scene.frame().draw_calls, 0);
    assert_eq!(scene.mesh(mesh).rebuild_count(), 0);

    scene.host.set_visibility(transform, true);
    assert_eq!(scene.frame().draw_calls, 1);
    assert_eq!(scene.mesh(mesh).rebuild_count(), 1);
}

#[test]
fn test_hidden_ancestor_hides_mesh() {
    let mut scene = Scene::new();
    let sg = scene.default_shading_group();
    let root = scene.host.create_transform("root");
    let (transform, _mesh) = scene.create_mesh_under("quad", sg);
    scene.host.parent(transform, root);
    assert_eq!(scene.frame().draw_calls, 1);

    // Display layers do not notify; visibility is re-read every frame
    scene.host.set_layer_hidden(root, true);
    assert_eq!(scene.frame().draw_calls, 0);

    scene.host.set_layer_hidden(root, false);
    assert_eq!(scene.frame().draw_calls, 1);
}

#[rstest]
#[case::with_time_change(true, Vec3::new(2.0, 0.0, 0.0))]
#[case::without_time_change(false, Vec3::ZERO)]
fn test_animation_is_read_on_time_change(#[case] advance: bool, #[case] expected: Vec3) {
    let mut scene = Scene::new();
    let sg = scene.default_shading_group();
    let (transform, mesh) = scene.create_mesh_under("quad", sg);
    scene.frame();

    scene.host.set_attribute_silently(
        transform,
        "translate",
        AttributeValue::Float3(Vec3::new(2.0, 0.0, 0.0)),
    );
    if advance {
        scene.host.advance_time();
    }
    scene.frame();

    assert!(!scene.registry.time_changed());
    assert!(scene
        .uniform_matrix(mesh, transform)
        .abs_diff_eq(Mat4::from_translation(expected), EPSILON));
}

#[test]
fn test_ui_path_draws_nothing() {
    let mut scene = Scene::new();
    let sg = scene.default_shading_group();
    scene.create_mesh_under("quad", sg);
    scene.frame();

    scene.backend.clear_commands();
    let stats = scene.registry.draw_all(&mut scene.backend, ShadingPath::Ui);

    assert_eq!(stats.draw_calls, 0);
    assert_eq!(scene.backend.draw_calls(), 0);
}

#[test]
fn test_draw_binds_instance_uniform_and_buffers() {
    let mut scene = Scene::new();
    let sg = scene.default_shading_group();
    let (transform, mesh) = scene.create_mesh_under("quad", sg);
    scene.frame();

    let draws = scene.backend.draws();
    assert_eq!(draws.len(), 1);
    let node = scene.mesh(mesh);
    let submesh = &node.submeshes()[0];
    let instance = node.instance(scene.id(transform)).unwrap();
    assert_eq!(draws[0].object_uniform, instance.uniform());
    assert_eq!(draws[0].index_count, 6);
    assert_eq!(draws[0].vertex_buffers.len(), 2);
    assert_eq!(
        draws[0].shaders,
        Some((submesh.shader().vertex, submesh.shader().fragment))
    );
    let layout = draws[0].input_layout.unwrap();
    assert_eq!(scene.backend.input_layout_streams(layout).unwrap().len(), 2);
}

#[test]
fn test_removed_mesh_resources_released_next_update() {
    let mut scene = Scene::new();
    let sg = scene.default_shading_group();
    let (_transform, mesh) = scene.create_mesh_under("quad", sg);
    scene.frame();
    let live = scene.backend.live_count(ResourceKind::Buffer);
    assert_eq!(live, 4);

    scene.host.delete_node(mesh);
    scene.sync();
    assert_eq!(scene.registry.pending_releases(), live);
    assert_eq!(scene.backend.live_count(ResourceKind::Buffer), live);

    scene.frame();
    assert_eq!(scene.registry.pending_releases(), 0);
    assert_eq!(scene.backend.live_count(ResourceKind::Buffer), 0);
    assert_eq!(scene.backend.invalid_destroys(), 0);
}

// ============================================================================
// Materials
// ============================================================================

#[test]
fn test_default_shading_group_is_mirrored() {
    let mut scene = Scene::new();
    let sg = scene.default_shading_group();
    let (_t, mesh) = scene.create_mesh_under("quad", sg);

    assert_eq!(scene.frame().draw_calls, 1);
    let material = scene.material(sg);
    assert!(material.surface_shader().is_some());
    assert_eq!(material.shader().unwrap().name, SIMPLE_MESH);
    assert_eq!(scene.mesh(mesh).submeshes()[0].material(), scene.id(sg));
}

#[test]
fn test_missing_default_shading_group_is_tolerated() {
    let scene = Scene::with_config(BridgeConfig::default().with_default_shading_group("missing"));

    assert!(scene.registry.materials().is_empty());
}

#[rstest]
#[case::unknown_technique("NoSuchTechnique")]
#[case::empty_technique("")]
fn test_unresolved_technique_uses_default_shader(#[case] technique: &str) {
    let mut scene = Scene::new();
    let (sg, _) = scene.create_material("odd", technique);
    scene.create_mesh_under("quad", sg);

    assert_eq!(scene.frame().draw_calls, 1);
    assert_eq!(scene.material(sg).shader().unwrap().name, SIMPLE_MESH);
}

#[test]
fn test_surface_shader_disconnect_falls_back_to_default() {
    let mut scene = Scene::new();
    let (sg, shader) = scene.create_material("A", TEXTURED_MESH);
    let (_t, mesh) = scene.create_mesh_under("quad", sg);
    scene.frame();

    scene.host.disconnect(shader, "outColor", sg, "surfaceShader");
    scene.frame();

    let material = scene.material(sg);
    assert_eq!(material.surface_shader(), None);
    assert_eq!(material.shader().unwrap().name, SIMPLE_MESH);
    assert_eq!(scene.registry.subscribers(shader).count(), 0);
    assert_eq!(
        scene.mesh(mesh).submeshes()[0].channels(),
        VertexChannels::POSITION | VertexChannels::NORMAL
    );
}

#[test]
fn test_removed_surface_shader_falls_back_to_default() {
    let mut scene = Scene::new();
    let (sg, shader) = scene.create_material("A", TEXTURED_MESH);
    let (_t, mesh) = scene.create_mesh_under("quad", sg);
    scene.frame();
    assert_eq!(scene.registry.subscribers(shader).count(), 1);

    // A host may report the removal without breaking the connection first
    scene
        .registry
        .handle_event(&scene.host, &HostEvent::NodeRemoved(shader));
    let stats = scene.frame();

    let material = scene.material(sg);
    assert_eq!(material.surface_shader(), None);
    assert_eq!(material.shader().unwrap().name, SIMPLE_MESH);
    assert_eq!(scene.registry.subscribers(shader).count(), 0);
    assert_eq!(
        scene.mesh(mesh).submeshes()[0].channels(),
        VertexChannels::POSITION | VertexChannels::NORMAL
    );
    assert_eq!(stats.draw_calls, 1);
}

#[test]
fn test_vertex_source_attribute_selects_named_set() {
    let mut scene = Scene::new();
    let (sg, shader) = scene.create_material("A", TEXTURED_MESH);
    let (_t, mesh) = scene.create_mesh_under("quad", sg);
    scene.frame();

    scene.host.set_attribute(
        shader,
        "TexCoord0_Source",
        AttributeValue::String("uv:map1".to_string()),
    );
    scene.frame();

    assert_eq!(scene.material(sg).sources().texcoords[0], "map1");
    assert_eq!(scene.mesh(mesh).rebuild_count(), 2);
}

#[test]
fn test_textured_material_binds_texture_and_sampler() {
    let mut scene = Scene::new();
    let (sg, shader) = scene.create_material("tex", TEXTURED_MESH);
    let (_t, mesh) = scene.create_mesh_under("quad", sg);
    let file = scene.host.create_file_texture("file1");
    let path = write_test_image("bind");
    scene
        .host
        .set_attribute(file, "fileTextureName", AttributeValue::String(path.display().to_string()));
    scene.host.connect(file, "outColor", shader, "Texture0");

    let stats = scene.frame();

    assert_eq!(stats.draw_calls, 1);
    assert_eq!(scene.material(sg).texture(0), Some(scene.id(file)));
    let texture = scene.node(file).as_texture().unwrap();
    let handle = texture.texture().unwrap().handle;
    assert!(texture.sampler().is_some());
    assert_eq!(texture.address(), (AddressMode::Repeat, AddressMode::Repeat));
    let draws = scene.backend.draws();
    assert_eq!(draws[0].textures.get(&0), Some(&handle));
    assert!(scene.mesh(mesh).submeshes()[0]
        .channels()
        .contains(VertexChannels::TEXCOORD0));

    scene.host.set_attribute(file, "mirrorU", AttributeValue::Bool(true));
    scene.host.set_attribute(file, "wrapV", AttributeValue::Bool(false));
    scene.frame();

    let texture = scene.node(file).as_texture().unwrap();
    assert_eq!(
        texture.address(),
        (AddressMode::MirrorRepeat, AddressMode::ClampToEdge)
    );
    assert_eq!(scene.backend.live_count(ResourceKind::Sampler), 1);

    scene.host.disconnect(file, "outColor", shader, "Texture0");
    scene.frame();

    assert_eq!(scene.material(sg).texture(0), None);
    assert!(scene.backend.draws()[0].textures.is_empty());
    let _ = std::fs::remove_file(path);
}

#[test]
fn test_removed_texture_is_unbound_and_released() {
    let mut scene = Scene::new();
    let (sg, shader) = scene.create_material("tex", TEXTURED_MESH);
    scene.create_mesh_under("quad", sg);
    let file = scene.host.create_file_texture("file1");
    let path = write_test_image("remove");
    scene
        .host
        .set_attribute(file, "fileTextureName", AttributeValue::String(path.display().to_string()));
    scene.host.connect(file, "outColor", shader, "Texture0");
    scene.frame();
    assert_eq!(scene.backend.live_count(ResourceKind::Texture), 1);

    scene.host.delete_node(file);
    let stats = scene.frame();

    assert_eq!(scene.material(sg).texture(0), None);
    assert_eq!(scene.backend.live_count(ResourceKind::Texture), 0);
    assert_eq!(scene.backend.live_count(ResourceKind::Sampler), 0);
    assert_eq!(stats.draw_calls, 1);
    let _ = std::fs::remove_file(path);
}

#[test]
fn test_missing_texture_file_leaves_slot_unbound() {
    let mut scene = Scene::new();
    let (sg, shader) = scene.create_material("tex", TEXTURED_MESH);
    scene.create_mesh_under("quad", sg);
    let file = scene.host.create_file_texture("file1");
    scene.host.set_attribute(
        file,
        "fileTextureName",
        AttributeValue::String("/nonexistent/scene_bridge.png".to_string()),
    );
    scene.host.connect(file, "outColor", shader, "Texture0");

    let stats = scene.frame();

    assert_eq!(stats.draw_calls, 1);
    assert!(scene.node(file).as_texture().unwrap().texture().is_none());
    assert!(scene.backend.draws()[0].textures.is_empty());
}

#[test]
fn test_shader_reload_rebuilds_meshes() {
    let mut scene = Scene::new();
    let (sg, _) = scene.create_material("tex", TEXTURED_MESH);
    let (_t, mesh) = scene.create_mesh_under("quad", sg);
    scene.frame();
    let shaders = scene.backend.live_count(ResourceKind::Shader);

    let library = ShaderLibrary::with_builtin(&mut scene.backend).unwrap();
    scene
        .registry
        .reload_shaders(&mut scene.backend, library)
        .unwrap();
    assert!(scene.mesh(mesh).submeshes().is_empty());
    let stats = scene.frame();

    assert_eq!(stats.draw_calls, 1);
    assert_eq!(scene.mesh(mesh).rebuild_count(), 2);
    assert_eq!(scene.backend.live_count(ResourceKind::Shader), shaders);
    let current = scene.registry.shaders().find(TEXTURED_MESH).unwrap();
    assert!(Arc::ptr_eq(scene.material(sg).shader().unwrap(), &current));
    assert_eq!(scene.backend.invalid_destroys(), 0);
}

#[test]
fn test_shader_reload_without_default_is_rejected() {
    let mut scene = Scene::new();
    let sg = scene.default_shading_group();
    scene.create_mesh_under("quad", sg);
    scene.frame();

    let result = scene
        .registry
        .reload_shaders(&mut scene.backend, ShaderLibrary::new());

    assert!(matches!(result, Err(BridgeError::MissingDefaultShader(_))));
    assert_eq!(scene.frame().draw_calls, 1);
}

// ============================================================================
// Lights and settings
// ============================================================================

#[test]
fn test_point_light_follows_its_transform() {
    let mut scene = Scene::new();
    let transform = scene.host.create_transform("lampT");
    let light = scene.host.create_light("lamp", HostNodeKind::PointLight);
    scene.host.parent(light, transform);
    scene.host.set_translation(transform, Vec3::new(1.0, 2.0, 3.0));
    scene.host.set_attribute(light, "intensity", AttributeValue::Float(3.0));
    scene.host.set_attribute(light, "range", AttributeValue::Float(10.0));
    scene.frame();

    let data = scene.registry.light_data();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].position, Vec4::new(1.0, 2.0, 3.0, 10.0));
    assert_eq!(data[0].color_intensity, Vec4::new(1.0, 1.0, 1.0, 3.0));

    scene.host.set_translation(transform, Vec3::new(0.0, 5.0, 0.0));
    scene.frame();
    assert_eq!(
        scene.registry.light_data()[0].position,
        Vec4::new(0.0, 5.0, 0.0, 10.0)
    );

    scene.host.set_visibility(transform, false);
    scene.frame();
    assert!(scene.registry.light_data().is_empty());
}

#[test]
fn test_directional_light_points_down_negative_z() {
    let mut scene = Scene::new();
    let transform = scene.host.create_transform("sunT");
    let light = scene.host.create_light("sun", HostNodeKind::DirectionalLight);
    scene.host.parent(light, transform);
    scene
        .host
        .set_rotation(transform, Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
    scene.frame();

    let data = scene.registry.light_data();
    assert_eq!(data.len(), 1);
    let direction = data[0].direction_type.truncate();
    assert!(direction.abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), EPSILON));
    assert_eq!(data[0].direction_type.w, 2.0);
    assert!(data[0].position.w.is_infinite());
}

#[test]
fn test_settings_node_reads_fxaa_toggle() {
    let mut scene = Scene::new();
    assert!(scene.registry.settings().fxaa_enable);

    let globals = scene
        .host
        .create_node(HostNodeKind::Plugin, "customViewportGlobals", "globals", "");
    scene
        .host
        .set_attribute_silently(globals, "fxaaEnable", AttributeValue::Bool(false));
    scene.frame();
    assert!(!scene.registry.settings().fxaa_enable);

    scene
        .host
        .set_attribute(globals, "fxaaEnable", AttributeValue::Bool(true));
    scene.frame();
    assert!(scene.registry.settings().fxaa_enable);
}

#[test]
fn test_referenced_settings_node_is_ignored() {
    let mut scene = Scene::new();
    let referenced = scene.host.create_node(
        HostNodeKind::Plugin,
        "customViewportGlobals",
        "ref:globals",
        "ref",
    );
    let other = scene
        .host
        .create_node(HostNodeKind::Plugin, "someOtherPlugin", "plugin1", "");
    scene.frame();

    assert_eq!(scene.registry.find_node(referenced), None);
    assert_eq!(scene.registry.find_node(other), None);

    let first = scene
        .host
        .create_node(HostNodeKind::Plugin, "customViewportGlobals", "globals", "");
    let second = scene
        .host
        .create_node(HostNodeKind::Plugin, "customViewportGlobals", "globals2", "");
    scene.frame();
    assert!(scene.registry.find_node(first).is_some());
    assert_eq!(scene.registry.find_node(second), None);
}
