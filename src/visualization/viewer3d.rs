use bevy::prelude::*;
use bevy::math::primitives::Sphere;
use bevy::window::PrimaryWindow;

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::simulation::background::BackgroundSolver;
use crate::simulation::binders::Geometry;
use crate::simulation::display::DisplaySink;
use crate::simulation::engine::Solver;
use crate::simulation::interaction::InteractionContext;
use crate::simulation::states::NVec3;

/// World-space → screen-space scaling factor for positions
const SCALE3D: f32 = 20.0;

/// Radius of a node sphere, in screen units
const NODE_RADIUS: f32 = 0.15 * SCALE3D;

/// Distance of the camera from the origin
const CAMERA_DISTANCE: f32 = 400.0;

/// Component tagging each sphere with its node index
#[derive(Component)]
struct NodeIndex(pub usize);

// =========================================================================================
// Solver <-> viewer hand-off
// =========================================================================================

/// Snapshot of what the viewer draws, taken while the worker holds the solver
#[derive(Debug, Clone, Default)]
struct Frame {
    positions: Vec<NVec3>,
    speeds: Vec<f32>,
    geometries: Vec<Vec<Geometry>>,
    handle: Option<usize>,
    nearest: Option<usize>,
}

/// Display sink holding the latest undrawn frame
#[derive(Default)]
struct FrameBuffer {
    pending: Mutex<Option<Frame>>,
    consumed: Condvar,
}

impl FrameBuffer {
    fn lock(&self) -> MutexGuard<'_, Option<Frame>> {
        self.pending.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn take(&self) -> Option<Frame> {
        let frame = self.lock().take();
        self.consumed.notify_all();
        frame
    }
}

impl DisplaySink for FrameBuffer {
    fn render(&self, solver: &Solver, _fast: bool) {
        let frame = Frame {
            positions: solver.node_positions(),
            speeds: solver.node_velocities().iter().map(|v| v.norm()).collect(),
            geometries: solver.geometries(),
            handle: solver.handle_node_index(),
            nearest: solver.nearest_node_index(),
        };
        *self.lock() = Some(frame);
    }

    fn clear(&self) {
        self.take();
    }

    fn flush(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (_guard, result) = self
            .consumed
            .wait_timeout_while(guard, timeout, |pending| pending.is_some())
            .unwrap_or_else(|p| p.into_inner());
        !result.timed_out()
    }
}

#[derive(Resource)]
struct Viewer {
    runner: BackgroundSolver,
    frame: Arc<FrameBuffer>,
    last: Frame,
}

// Solver space is z-up, bevy is y-up
fn to_bevy(p: NVec3) -> Vec3 {
    Vec3::new(p.x, p.z, -p.y) * SCALE3D
}

fn from_bevy(v: Vec3) -> NVec3 {
    NVec3::new(v.x, -v.z, v.y)
}

/// Open a window, run `solver` in the background and let the user drag nodes
pub fn run_viewer(mut solver: Solver) {
    println!("run_viewer: starting Bevy 3D viewer with {} nodes", solver.nodes().len());

    let frame = Arc::new(FrameBuffer::default());
    solver.attach_display(frame.clone());
    solver.render();

    let mut runner = BackgroundSolver::new(solver);
    if let Err(e) = runner.start() {
        eprintln!("run_viewer: could not start solver: {e}");
        return;
    }

    App::new()
        .insert_resource(Viewer { runner, frame, last: Frame::default() })
        .add_plugins(DefaultPlugins)
        .add_systems(Startup, setup_3d)
        .add_systems(Update, (pointer_input, sync_transforms_3d, draw_geometries).chain())
        .run();
}

/// Startup system: spawn camera, light, and one sphere per node
fn setup_3d(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut viewer: ResMut<Viewer>,
) {
    commands.spawn(Camera3dBundle {
        camera: Camera {
            clear_color: ClearColorConfig::Custom(Color::srgb(0.0, 0.0, 0.0)),
            ..Default::default()
        },
        transform: Transform::from_xyz(CAMERA_DISTANCE * 0.3, CAMERA_DISTANCE * 0.4, CAMERA_DISTANCE)
            .looking_at(Vec3::ZERO, Vec3::Y),
        ..Default::default()
    });

    commands.spawn(PointLightBundle {
        point_light: PointLight {
            intensity: 1500.0,
            range: 1000.0,
            ..Default::default()
        },
        transform: Transform::from_xyz(100.0, 100.0, CAMERA_DISTANCE),
        ..Default::default()
    });

    if let Some(frame) = viewer.frame.take() {
        viewer.last = frame;
    }

    let mesh = meshes.add(Sphere::new(NODE_RADIUS).mesh());
    for (i, p) in viewer.last.positions.iter().enumerate() {
        commands.spawn((
            PbrBundle {
                mesh: mesh.clone(),
                material: materials.add(StandardMaterial {
                    base_color: Color::srgb(1.0, 1.0, 1.0),
                    unlit: true,
                    ..Default::default()
                }),
                transform: Transform::from_translation(to_bevy(*p)),
                ..Default::default()
            },
            NodeIndex(i),
        ));
    }
}

/// Forward mouse events to the solver as pointer notifications
fn pointer_input(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    viewer: Res<Viewer>,
) {
    if buttons.just_released(MouseButton::Left) {
        viewer.runner.with_solver(|s| s.on_pointer_up());
        return;
    }

    let Ok(window) = windows.get_single() else { return };
    let Some(cursor) = window.cursor_position() else { return };
    let Ok((camera, camera_transform)) = cameras.get_single() else { return };
    let Some(ray) = camera.viewport_to_world(camera_transform, cursor) else { return };

    let ctx = InteractionContext {
        ray_origin: from_bevy(ray.origin / SCALE3D),
        ray_direction: from_bevy(Vec3::from(ray.direction)),
        camera_look: from_bevy(Vec3::from(camera_transform.forward())),
        camera_up: from_bevy(Vec3::from(camera_transform.up())),
    };

    let pressed = buttons.pressed(MouseButton::Left);
    if buttons.just_pressed(MouseButton::Left) {
        viewer.runner.with_solver(|s| s.on_pointer_down(&ctx));
    } else {
        viewer.runner.with_solver(|s| s.on_pointer_move(&ctx, pressed));
    }
}

fn speed_to_color(speed: f32, max_speed: f32) -> Color {
    if max_speed <= 0.0 {
        // all stationary -> pick a default
        return Color::srgb(1.0, 1.0, 1.0);
    }

    let t = (speed / max_speed).clamp(0.0, 1.0);

    // Simple blue -> red gradient
    Color::srgb(t, 0.0, 1.0 - t)
}

fn sync_transforms_3d(
    mut viewer: ResMut<Viewer>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut query: Query<(&NodeIndex, &mut Transform, &Handle<StandardMaterial>)>,
) {
    if let Some(frame) = viewer.frame.take() {
        viewer.last = frame;
    }
    let frame = &viewer.last;
    let max_speed = frame.speeds.iter().copied().fold(0.0, f32::max);

    for (NodeIndex(i), mut transform, mat_handle) in &mut query {
        let Some(p) = frame.positions.get(*i) else { continue };
        transform.translation = to_bevy(*p);

        let color = if frame.handle == Some(*i) {
            Color::srgb(1.0, 1.0, 0.0)
        } else if frame.nearest == Some(*i) {
            Color::srgb(0.0, 1.0, 0.0)
        } else {
            speed_to_color(frame.speeds[*i], max_speed)
        };

        if let Some(mat) = materials.get_mut(mat_handle) {
            mat.base_color = color;
        }
    }
}

fn draw_geometries(viewer: Res<Viewer>, mut gizmos: Gizmos) {
    let color = Color::srgb(0.8, 0.8, 0.8);
    for geometry in viewer.last.geometries.iter().flatten() {
        match geometry {
            Geometry::Point(p) => {
                gizmos.sphere(to_bevy(*p), Quat::IDENTITY, NODE_RADIUS * 1.5, color);
            }
            Geometry::Line(a, b) => gizmos.line(to_bevy(*a), to_bevy(*b), color),
            Geometry::Polyline { vertices, closed } => {
                let mut points: Vec<Vec3> = vertices.iter().map(|p| to_bevy(*p)).collect();
                if *closed {
                    if let Some(first) = points.first().copied() {
                        points.push(first);
                    }
                }
                gizmos.linestrip(points, color);
            }
        }
    }
}
