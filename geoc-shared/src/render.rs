use crate::config::RenderConfig;
use crate::error::Result;
use crate::gl::GraphicsContext;
use crate::resources::GlResources;
use crate::scene::Guest;

/// The drawing surface as seen by the frame loop.
pub trait FrameSurface {
    /// The layout size changed: resize the backing store and projection.
    fn resize(&mut self, width: u32, height: u32);
    fn viewport(&mut self, width: u32, height: u32);
}

impl<G: GraphicsContext> FrameSurface for GlResources<G> {
    fn resize(&mut self, width: u32, height: u32) {
        GlResources::resize(self, width, height);
    }

    fn viewport(&mut self, width: u32, height: u32) {
        GlResources::viewport(self, width, height);
    }
}

/// Per-frame driver started by the guest's `run(scenePtr, drawFnPtr)`.
#[derive(Debug)]
pub struct RenderLoop {
    entity: u32,
    draw_fn: u32,
    size: Option<(u32, u32)>,
    throttle_ms: u32,
    frames: u64,
    failed: u64,
}

impl RenderLoop {
    pub fn new(entity: u32, draw_fn: u32, config: &RenderConfig) -> Self {
        Self {
            entity,
            draw_fn,
            size: None,
            throttle_ms: config.throttle_ms,
            frames: 0,
            failed: 0,
        }
    }

    /// Render one frame at the surface's current layout size. A failing
    /// draw is logged and counted; the loop keeps going.
    pub fn frame<S, G>(&mut self, layout_size: (u32, u32), surface: &mut S, guest: &mut G)
    where
        S: FrameSurface + ?Sized,
        G: Guest + ?Sized,
    {
        match self.draw(layout_size, surface, guest) {
            Ok(()) => self.frames += 1,
            Err(e) => {
                self.failed += 1;
                log::error!("frame {} failed: {e}", self.frames + self.failed);
            }
        }
    }

    fn draw<S, G>(&mut self, (width, height): (u32, u32), surface: &mut S, guest: &mut G) -> Result<()>
    where
        S: FrameSurface + ?Sized,
        G: Guest + ?Sized,
    {
        if self.size != Some((width, height)) {
            log::debug!("surface resized to {width}x{height}");
            surface.resize(width, height);
            self.size = Some((width, height));
        }
        surface.viewport(width, height);
        guest.call_export("draw", &[self.entity as f64, self.draw_fn as f64])?;
        Ok(())
    }

    /// Delay before requesting the next frame, if throttled.
    pub fn next_delay_ms(&self) -> Option<u32> {
        (self.throttle_ms > 0).then_some(self.throttle_ms)
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    pub fn frames_failed(&self) -> u64 {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Perspective;
    use crate::gl::PROJECTION_UNIFORM;
    use crate::testing::{GlCall, MockGl, MockGuest};

    fn resources() -> GlResources<MockGl> {
        let mut res = GlResources::new(MockGl::default(), Perspective::default());
        let vs = res
            .init_shader(0, "attribute vec3 coords;\nuniform mat4 projection_matrix;\n")
            .unwrap();
        let fs = res.init_shader(1, "void main() {}\n").unwrap();
        res.init_program(vs, fs).unwrap();
        res
    }

    fn projection_uploads(res: &GlResources<MockGl>) -> usize {
        res.context()
            .calls()
            .iter()
            .filter(|c| matches!(c, GlCall::UniformMatrix4 { name, .. } if name == PROJECTION_UNIFORM))
            .count()
    }

    #[test]
    fn test_frame_draws_with_registered_pointers() {
        let mut res = resources();
        let mut guest = MockGuest::new(64);
        let mut render = RenderLoop::new(48, 3, &RenderConfig::default());

        render.frame((640, 480), &mut res, &mut guest);
        render.frame((640, 480), &mut res, &mut guest);
        assert_eq!(guest.calls_to("draw"), vec![vec![48.0, 3.0]; 2]);
        assert_eq!(render.frames_drawn(), 2);
        assert_eq!(render.next_delay_ms(), None);
    }

    #[test]
    fn test_resize_reuploads_projection_once() {
        let mut res = resources();
        let mut guest = MockGuest::new(64);
        let mut render = RenderLoop::new(0, 0, &RenderConfig::default());
        let baseline = projection_uploads(&res);

        render.frame((800, 400), &mut res, &mut guest);
        assert_eq!(projection_uploads(&res), baseline + 1);
        assert_eq!(res.perspective().aspect_ratio, 2.0);

        render.frame((800, 400), &mut res, &mut guest);
        assert_eq!(projection_uploads(&res), baseline + 1);

        render.frame((400, 400), &mut res, &mut guest);
        assert_eq!(projection_uploads(&res), baseline + 2);
        let viewports = res
            .context()
            .calls()
            .iter()
            .filter(|c| matches!(c, GlCall::Viewport(..)))
            .count();
        assert!(viewports >= 3);
    }

    #[test]
    fn test_failed_frame_does_not_stop_loop() {
        let mut res = resources();
        let mut guest = MockGuest::new(64);
        let mut render = RenderLoop::new(0, 0, &RenderConfig { throttle_ms: 33 });

        guest.fail_next("draw");
        render.frame((10, 10), &mut res, &mut guest);
        render.frame((10, 10), &mut res, &mut guest);
        assert_eq!(render.frames_failed(), 1);
        assert_eq!(render.frames_drawn(), 1);
        assert_eq!(render.next_delay_ms(), Some(33));
    }
}
