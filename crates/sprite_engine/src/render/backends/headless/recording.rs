//! Recording graphics device
//!
//! Implements [`GfxDevice`] without a GPU. Every call is appended to a call
//! log and every draw captures the state it ran with and the triangles it
//! covered, so tests can assert on exact state-change counts and compare
//! vertex streams between runs.

use std::collections::HashMap;

use super::introspect::introspect;
use crate::foundation::math::{Mat4, Mat4Ext, Rect};
use crate::render::device::{DeviceError, DeviceResult, GfxDevice};
use crate::render::primitives::{Vertex, VertexData, VertexLayoutId};
use crate::render::resources::{
    BlendMode, LoadMode, ProgramId, ProgramInterface, ShaderSource, TextureId, UniformSet,
};

/// One call received by the device
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    /// `link_program`
    LinkProgram(ProgramId),
    /// `bind_program`
    BindProgram(ProgramId),
    /// `bind_texture`
    BindTexture(Option<TextureId>),
    /// `set_blend_mode`
    SetBlendMode(BlendMode),
    /// `set_vertex_layout`
    SetVertexLayout(VertexLayoutId),
    /// `upload_uniforms`
    UploadUniforms {
        /// Target program
        program: ProgramId,
        /// Number of values uploaded
        count: usize,
    },
    /// `upload_instance_uniforms`
    UploadInstanceUniforms {
        /// Target program
        program: ProgramId,
        /// Number of instances uploaded
        instances: usize,
    },
    /// `upload_vertices`
    UploadVertices {
        /// Vertex count
        vertices: usize,
        /// Index count
        indices: usize,
    },
    /// `draw_indexed`
    Draw {
        /// Indices drawn
        index_count: u32,
    },
    /// `present`
    Present,
}

/// State and geometry captured for a single draw call
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Bound program
    pub program: Option<ProgramId>,
    /// Bound texture
    pub texture: Option<TextureId>,
    /// Active blend mode
    pub blend_mode: Option<BlendMode>,
    /// Active vertex layout
    pub vertex_layout: Option<VertexLayoutId>,
    /// Uniform values last uploaded to the bound program
    pub uniforms: UniformSet,
    /// Per-instance uniform arrays last uploaded to the bound program
    pub instance_uniforms: Vec<UniformSet>,
    /// De-indexed triangle list that was drawn
    pub triangles: Vec<Vertex>,
}

/// A [`GfxDevice`] that records instead of rendering
#[derive(Debug)]
pub struct RecordingDevice {
    width: u32,
    height: u32,
    calls: Vec<DeviceCall>,
    draws: Vec<DrawRecord>,
    program: Option<ProgramId>,
    texture: Option<TextureId>,
    blend_mode: Option<BlendMode>,
    vertex_layout: Option<VertexLayoutId>,
    uniforms: HashMap<ProgramId, UniformSet>,
    instance_uniforms: HashMap<ProgramId, Vec<UniformSet>>,
    pending: Option<VertexData>,
    fail_next_link: Option<String>,
    fail_next_upload: bool,
    context_lost: bool,
    frames_presented: u64,
}

impl RecordingDevice {
    /// Device with a `width` x `height` pixel viewport
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: Vec::new(),
            draws: Vec::new(),
            program: None,
            texture: None,
            blend_mode: None,
            vertex_layout: None,
            uniforms: HashMap::new(),
            instance_uniforms: HashMap::new(),
            pending: None,
            fail_next_link: None,
            fail_next_upload: false,
            context_lost: false,
            frames_presented: 0,
        }
    }

    /// Every call received since the last [`Self::clear_log`]
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Every draw since the last [`Self::clear_log`]
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Number of logged calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Concatenated triangles of every recorded draw
    pub fn triangle_stream(&self) -> Vec<Vertex> {
        self.draws.iter().flat_map(|draw| draw.triangles.iter().copied()).collect()
    }

    /// Number of frames presented
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Forget logged calls and draws; bound state is kept, as on a GPU
    pub fn clear_log(&mut self) {
        self.calls.clear();
        self.draws.clear();
    }

    /// Change the viewport size
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Make the next `link_program` call fail with `log`
    pub fn fail_next_link(&mut self, log: impl Into<String>) {
        self.fail_next_link = Some(log.into());
    }

    /// Make the next `upload_vertices` call fail
    pub fn fail_next_upload(&mut self) {
        self.fail_next_upload = true;
    }

    /// Simulate a lost context; every later call fails
    pub fn lose_context(&mut self) {
        self.context_lost = true;
    }

    /// Recover from a lost context with all bound state reset
    pub fn restore_context(&mut self) {
        self.context_lost = false;
        self.program = None;
        self.texture = None;
        self.blend_mode = None;
        self.vertex_layout = None;
        self.uniforms.clear();
        self.instance_uniforms.clear();
        self.pending = None;
    }

    fn check_context(&self) -> DeviceResult<()> {
        if self.context_lost {
            Err(DeviceError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn read_sources(program: ProgramId, source: &ShaderSource) -> DeviceResult<(String, String)> {
        match source.mode {
            LoadMode::String => Ok((source.vertex.clone(), source.fragment.clone())),
            LoadMode::File => {
                let read = |path: &str| {
                    std::fs::read_to_string(path).map_err(|e| DeviceError::LinkFailed {
                        program,
                        log: format!("cannot read '{path}': {e}"),
                    })
                };
                Ok((read(&source.vertex)?, read(&source.fragment)?))
            }
        }
    }
}

impl GfxDevice for RecordingDevice {
    fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }

    fn projection(&self) -> Mat4 {
        Mat4::orthographic_2d(self.width as f32, self.height as f32, -1000.0, 1000.0)
    }

    fn link_program(&mut self, program: ProgramId, source: &ShaderSource) -> DeviceResult<ProgramInterface> {
        self.check_context()?;
        self.calls.push(DeviceCall::LinkProgram(program));
        if let Some(log) = self.fail_next_link.take() {
            return Err(DeviceError::LinkFailed { program, log });
        }
        let (vertex, fragment) = Self::read_sources(program, source)?;
        Ok(introspect(&vertex, &fragment))
    }

    fn bind_program(&mut self, program: ProgramId) -> DeviceResult<()> {
        self.check_context()?;
        self.calls.push(DeviceCall::BindProgram(program));
        self.program = Some(program);
        Ok(())
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) -> DeviceResult<()> {
        self.check_context()?;
        self.calls.push(DeviceCall::BindTexture(texture));
        self.texture = texture;
        Ok(())
    }

    fn set_blend_mode(&mut self, mode: BlendMode) -> DeviceResult<()> {
        self.check_context()?;
        self.calls.push(DeviceCall::SetBlendMode(mode));
        self.blend_mode = Some(mode);
        Ok(())
    }

    fn set_vertex_layout(&mut self, layout: VertexLayoutId) -> DeviceResult<()> {
        self.check_context()?;
        self.calls.push(DeviceCall::SetVertexLayout(layout));
        self.vertex_layout = Some(layout);
        Ok(())
    }

    fn upload_uniforms(&mut self, program: ProgramId, uniforms: &UniformSet) -> DeviceResult<()> {
        self.check_context()?;
        self.calls.push(DeviceCall::UploadUniforms { program, count: uniforms.len() });
        self.uniforms.insert(program, uniforms.clone());
        Ok(())
    }

    fn upload_instance_uniforms(&mut self, program: ProgramId, instances: &[UniformSet]) -> DeviceResult<()> {
        self.check_context()?;
        self.calls.push(DeviceCall::UploadInstanceUniforms { program, instances: instances.len() });
        self.instance_uniforms.insert(program, instances.to_vec());
        Ok(())
    }

    fn upload_vertices(&mut self, data: &VertexData) -> DeviceResult<()> {
        self.check_context()?;
        if std::mem::take(&mut self.fail_next_upload) {
            self.pending = None;
            return Err(DeviceError::UploadFailed("simulated upload failure".to_string()));
        }
        self.calls.push(DeviceCall::UploadVertices { vertices: data.vertices.len(), indices: data.indices.len() });
        self.pending = Some(data.clone());
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32) -> DeviceResult<()> {
        self.check_context()?;
        let pending = self
            .pending
            .as_ref()
            .ok_or_else(|| DeviceError::UploadFailed("draw without a vertex buffer".to_string()))?;
        let triangles = pending.triangle_stream().take(index_count as usize).collect();
        self.calls.push(DeviceCall::Draw { index_count });

        let program = self.program;
        self.draws.push(DrawRecord {
            program,
            texture: self.texture,
            blend_mode: self.blend_mode,
            vertex_layout: self.vertex_layout,
            uniforms: program.and_then(|p| self.uniforms.get(&p).cloned()).unwrap_or_default(),
            instance_uniforms: program
                .and_then(|p| self.instance_uniforms.get(&p).cloned())
                .unwrap_or_default(),
            triangles,
        });
        Ok(())
    }

    fn present(&mut self) -> DeviceResult<()> {
        self.check_context()?;
        self.calls.push(DeviceCall::Present);
        self.frames_presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::foundation::math::Point3;

    #[test]
    fn test_projection_maps_viewport_to_clip_space() {
        let device = RecordingDevice::new(800, 600);
        let projection = device.projection();

        let corner = projection.transform_point(&Point3::new(800.0, 600.0, 0.0));
        assert_relative_eq!(corner.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(corner.y, 1.0, epsilon = 1e-5);
        let origin = projection.transform_point(&Point3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(origin.x, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_draw_records_bound_state() {
        let mut device = RecordingDevice::new(64, 64);
        let mut data = VertexData::default();
        data.push_quad([Vertex::default(); 4]);

        device.bind_program(ProgramId::SPRITE).unwrap();
        device.bind_texture(Some(TextureId(3))).unwrap();
        device.upload_vertices(&data).unwrap();
        device.draw_indexed(6).unwrap();

        let draw = &device.draws()[0];
        assert_eq!(draw.program, Some(ProgramId::SPRITE));
        assert_eq!(draw.texture, Some(TextureId(3)));
        assert_eq!(draw.triangles.len(), 6);
        assert_eq!(device.count_calls(|c| matches!(c, DeviceCall::Draw { .. })), 1);
    }

    #[test]
    fn test_draw_without_upload_fails() {
        let mut device = RecordingDevice::new(64, 64);
        assert!(matches!(device.draw_indexed(3), Err(DeviceError::UploadFailed(_))));
    }

    #[test]
    fn test_lost_context_fails_every_call() {
        let mut device = RecordingDevice::new(64, 64);
        device.lose_context();
        assert_eq!(device.present(), Err(DeviceError::ContextLost));
        assert_eq!(device.bind_program(ProgramId::SPRITE), Err(DeviceError::ContextLost));

        device.restore_context();
        assert!(device.present().is_ok());
        assert_eq!(device.frames_presented(), 1);
    }

    #[test]
    fn test_link_from_missing_file_fails() {
        let mut device = RecordingDevice::new(64, 64);
        let source = ShaderSource::from_files("/nonexistent/sprite.vs", "/nonexistent/sprite.fs");
        assert!(matches!(
            device.link_program(ProgramId(16), &source),
            Err(DeviceError::LinkFailed { .. })
        ));
    }
}
