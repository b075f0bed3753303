//! Per-frame glue between input, camera and model drawing.

use glam::Mat4;
use overdrive_gpu::{GraphicsContext, HeadlessContext};
use overdrive_input::{InputEvent, InputState, KeyBindings};
use overdrive_render::{Camera, Model, Shader};

use crate::config::{ViewerConfig, Viewport};
use crate::script::FlyScript;

/// Outcome of a headless fly-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlyReport {
    pub frames: u32,
    pub draw_calls: usize,
}

pub struct Viewer {
    camera: Camera,
    input: InputState,
    bindings: KeyBindings,
    viewport: Viewport,
    gamma: bool,
}

impl Viewer {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            camera: Camera::from_config(&config.camera),
            input: InputState::new(),
            bindings: config.bindings.clone(),
            viewport: config.viewport,
            gamma: config.gamma,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn handle(&mut self, event: InputEvent) {
        self.input.handle(event);
    }

    /// Apply this frame's input to the camera. Returns `false` once quit is
    /// requested.
    pub fn update(&mut self, delta_seconds: f32) -> bool {
        let frame = self.input.end_frame(&self.bindings);
        if frame.quit_requested() {
            tracing::info!("quit requested");
            return false;
        }
        for movement in frame.actions.iter().filter_map(|a| a.movement()) {
            self.camera.process_keyboard(movement, delta_seconds);
        }
        let (dx, dy) = frame.look;
        self.camera.process_mouse_movement(dx, dy, true);
        if frame.scroll != 0.0 {
            self.camera.process_mouse_scroll(frame.scroll);
        }
        true
    }

    pub fn render(&self, ctx: &mut dyn GraphicsContext, shader: &Shader, model: &Model) {
        let projection =
            self.camera
                .projection_matrix(self.viewport.aspect(), self.viewport.near, self.viewport.far);
        shader.use_program(ctx);
        shader.set_mat4(ctx, "projection", &projection);
        shader.set_mat4(ctx, "view", &self.camera.view_matrix());
        shader.set_mat4(ctx, "model", &Mat4::IDENTITY);
        shader.set_bool(ctx, "gamma", self.gamma);
        model.draw(ctx, shader);
    }

    /// Run up to `frames` scripted frames, stopping early on quit. The
    /// context's command log is drained after every frame.
    pub fn fly(
        &mut self,
        ctx: &mut HeadlessContext,
        shader: &Shader,
        model: &Model,
        script: &FlyScript,
        frames: u32,
        delta_seconds: f32,
    ) -> FlyReport {
        let mut report = FlyReport {
            frames: 0,
            draw_calls: 0,
        };
        for frame in 0..frames {
            for event in script.events_at(frame) {
                self.handle(event);
            }
            if !self.update(delta_seconds) {
                break;
            }
            self.render(ctx, shader, model);
            report.draw_calls += ctx.draw_calls();
            ctx.clear_commands();
            report.frames += 1;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptStep;
    use crate::shaders::{MODEL_FS, MODEL_VS};
    use overdrive_assets::{FileImporter, ImageFileDecoder};
    use overdrive_gpu::UniformValue;
    use overdrive_input::Key;
    use std::path::Path;

    fn triangle_model(ctx: &mut HeadlessContext, dir: &Path) -> Model {
        let path = dir.join("tri.obj");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        Model::load(ctx, &FileImporter, &ImageFileDecoder::default(), &path, false).unwrap()
    }

    #[test]
    fn holding_forward_moves_by_speed() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        viewer.handle(InputEvent::KeyPressed(Key::W));
        assert!(viewer.update(0.5));
        assert!(viewer.update(0.5));
        let z = viewer.camera().position.z;
        assert!((z - 0.5).abs() < 1e-5, "z = {z}");
    }

    #[test]
    fn escape_stops_the_loop() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        viewer.handle(InputEvent::KeyPressed(Key::Escape));
        assert!(!viewer.update(0.016));
    }

    #[test]
    fn cursor_motion_turns_camera() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        viewer.handle(InputEvent::CursorMoved { x: 0.0, y: 0.0 });
        viewer.handle(InputEvent::CursorMoved { x: 100.0, y: 0.0 });
        viewer.update(0.016);
        assert!((viewer.camera().yaw() - (-80.0)).abs() < 1e-4);
    }

    #[test]
    fn render_sets_matrices_and_draws() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = HeadlessContext::new();
        let model = triangle_model(&mut ctx, dir.path());
        let shader = Shader::from_source(&mut ctx, MODEL_VS, MODEL_FS).unwrap();
        assert!(shader.is_valid());

        let viewer = Viewer::new(&ViewerConfig::default());
        viewer.render(&mut ctx, &shader, &model);

        assert_eq!(ctx.draw_calls(), 1);
        let view = viewer.camera().view_matrix().to_cols_array();
        assert_eq!(ctx.uniform(shader.id(), "view"), Some(&UniformValue::Mat4(view)));
        assert_eq!(ctx.uniform(shader.id(), "gamma"), Some(&UniformValue::Int(0)));
        model.destroy(&mut ctx);
    }

    #[test]
    fn fly_counts_draws_and_drains_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = HeadlessContext::new();
        let model = triangle_model(&mut ctx, dir.path());
        let shader = Shader::from_source(&mut ctx, MODEL_VS, MODEL_FS).unwrap();

        let mut viewer = Viewer::new(&ViewerConfig::default());
        let report = viewer.fly(
            &mut ctx,
            &shader,
            &model,
            &FlyScript::walk_and_pan(50),
            50,
            0.016,
        );
        assert_eq!(
            report,
            FlyReport {
                frames: 50,
                draw_calls: 50
            }
        );
        assert!(ctx.commands().is_empty());
        assert!(viewer.camera().position.z < 3.0);
        model.destroy(&mut ctx);
    }

    #[test]
    fn fly_stops_at_scripted_quit() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = HeadlessContext::new();
        let model = triangle_model(&mut ctx, dir.path());
        let shader = Shader::from_source(&mut ctx, MODEL_VS, MODEL_FS).unwrap();

        let script = FlyScript::from_steps(vec![ScriptStep {
            frame: 3,
            event: InputEvent::KeyPressed(Key::Escape),
        }]);
        let mut viewer = Viewer::new(&ViewerConfig::default());
        let report = viewer.fly(&mut ctx, &shader, &model, &script, 10, 0.016);
        assert_eq!(report.frames, 3);
        assert_eq!(report.draw_calls, 3);
        model.destroy(&mut ctx);
    }
}
