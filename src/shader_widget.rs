//! Shader widget that draws the puzzle and owns the orbit camera.
//!
//! The application hands the widget a borrowed view of the world each frame. The widget
//! snapshots the position buffer into its primitive, and the primitive pushes it to the
//! GPU during `prepare`.

use std::sync::Arc;

use iced::widget::shader::{self, wgpu};
use iced::{Point, Rectangle, event, mouse};
use log::warn;
use nalgebra::Matrix4;

use crate::Message;
use crate::camera::{Camera, CameraController, DEFAULT_DISTANCE, Projection, model_matrix};
use crate::renderer::Renderer;
use crate::world::World;

/// Everything the GPU side needs for one frame.
#[derive(Debug, Clone)]
pub(crate) struct KubePrimitive {
    pub(crate) positions: Arc<[i32]>,
    pub(crate) colors: Arc<[i32]>,
    pub(crate) indices: Arc<[u16]>,
    pub(crate) camera: Camera,
    pub(crate) projection: Projection,
    pub(crate) model: Matrix4<f32>,
}

impl shader::Primitive for KubePrimitive {
    fn prepare(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        storage: &mut shader::Storage,
        bounds: &Rectangle,
        viewport: &shader::Viewport,
    ) {
        let bounds = *bounds * viewport.scale_factor() as f32;
        if !storage.has::<Renderer>() {
            let renderer = pollster::block_on(Renderer::new(
                device,
                format,
                bounds,
                viewport.physical_size(),
                &self.positions,
                &self.colors,
                &self.indices,
            ));
            storage.store(renderer);
        }
        let Some(renderer) = storage.get_mut::<Renderer>() else {
            warn!("renderer missing from shader storage");
            return;
        };
        renderer.resize(device, bounds, viewport.physical_size());
        renderer.update_positions(queue, &self.positions);
        renderer.update_camera(queue, &self.camera, &self.projection, &self.model);
    }

    fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        storage: &shader::Storage,
        target: &wgpu::TextureView,
        _clip_bounds: &Rectangle<u32>,
    ) {
        let Some(renderer) = storage.get::<Renderer>() else {
            warn!("renderer missing from shader storage");
            return;
        };
        renderer.render(encoder, target);
    }
}

/// Camera state kept by the widget between frames.
#[derive(Debug)]
pub(crate) struct KubeShaderState {
    camera: Camera,
    camera_controller: CameraController,
    projection: Projection,
    last_mouse_pos: Option<Point>,
}

impl Default for KubeShaderState {
    fn default() -> Self {
        let camera_controller = CameraController::new(DEFAULT_DISTANCE);
        let mut camera = Camera::default();
        camera_controller.update_camera(&mut camera);

        Self {
            camera,
            camera_controller,
            projection: Projection::default(),
            last_mouse_pos: None,
        }
    }
}

/// Draws one frame of a world, spun by the puzzle's view angle.
pub(crate) struct KubeShaderProgram<'a> {
    world: &'a World,
    colors: Arc<[i32]>,
    indices: Arc<[u16]>,
    view_angle: f32,
}

impl<'a> KubeShaderProgram<'a> {
    /// # Arguments
    /// * `world` - The world whose current positions are drawn
    /// * `colors`, `indices` - Snapshots of the world's buffers that never change
    /// * `view_angle` - Spin of the whole puzzle, in degrees
    pub(crate) fn new(
        world: &'a World,
        colors: Arc<[i32]>,
        indices: Arc<[u16]>,
        view_angle: f32,
    ) -> Self {
        Self {
            world,
            colors,
            indices,
            view_angle,
        }
    }
}

impl shader::Program<Message> for KubeShaderProgram<'_> {
    type State = KubeShaderState;
    type Primitive = KubePrimitive;

    fn update(
        &self,
        state: &mut Self::State,
        event: shader::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
        _shell: &mut iced::advanced::Shell<'_, Message>,
    ) -> (event::Status, Option<Message>) {
        if bounds.width > 0.0 && bounds.height > 0.0 {
            state.projection.aspect = bounds.width / bounds.height;
        }

        let status = match event {
            shader::Event::Mouse(mouse_event) => {
                Self::handle_mouse_event(state, mouse_event, bounds, cursor)
            }
            _ => event::Status::Ignored,
        };
        state.camera_controller.update_camera(&mut state.camera);

        (status, None)
    }

    fn draw(
        &self,
        state: &Self::State,
        _cursor: mouse::Cursor,
        _bounds: Rectangle,
    ) -> Self::Primitive {
        KubePrimitive {
            positions: Arc::from(self.world.positions()),
            colors: Arc::clone(&self.colors),
            indices: Arc::clone(&self.indices),
            camera: state.camera.clone(),
            projection: state.projection,
            model: model_matrix(self.view_angle),
        }
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        _bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if state.camera_controller.is_dragging() {
            mouse::Interaction::Grabbing
        } else {
            mouse::Interaction::default()
        }
    }
}

impl KubeShaderProgram<'_> {
    /// Right-drag orbits the camera, the wheel zooms.
    fn handle_mouse_event(
        state: &mut KubeShaderState,
        mouse_event: mouse::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> event::Status {
        match mouse_event {
            mouse::Event::CursorMoved { .. } => {
                let Some(position) = cursor.position_in(bounds) else {
                    state.last_mouse_pos = None;
                    return event::Status::Ignored;
                };
                if let Some(last_pos) = state.last_mouse_pos {
                    state
                        .camera_controller
                        .process_mouse_motion(position.x - last_pos.x, position.y - last_pos.y);
                }
                state.last_mouse_pos = Some(position);
                if state.camera_controller.is_dragging() {
                    return event::Status::Captured;
                }
            }
            mouse::Event::ButtonPressed(button) => {
                if cursor.position_in(bounds).is_some() && button == mouse::Button::Right {
                    state.camera_controller.process_mouse_press(button);
                    return event::Status::Captured;
                }
            }
            mouse::Event::ButtonReleased(button) => {
                if button == mouse::Button::Right && state.camera_controller.is_dragging() {
                    state.camera_controller.process_mouse_release(button);
                    return event::Status::Captured;
                }
            }
            mouse::Event::WheelScrolled { delta } => {
                if cursor.position_in(bounds).is_some() {
                    let scroll_delta = match delta {
                        mouse::ScrollDelta::Lines { y, .. } => y,
                        mouse::ScrollDelta::Pixels { y, .. } => y * 0.01,
                    };
                    state.camera_controller.process_scroll(scroll_delta);
                    return event::Status::Captured;
                }
            }
            mouse::Event::CursorEntered | mouse::Event::CursorLeft => {}
        }

        event::Status::Ignored
    }
}
