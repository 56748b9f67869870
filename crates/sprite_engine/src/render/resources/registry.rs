//! Resource registry
//!
//! Keeps the texture handles handed in by the loader and the shader programs
//! linked through the device. Resources are read-only while a frame renders;
//! they change only between frames (registration, [`ResourceRegistry::relink_all`]).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::material::MaterialDescriptor;
use super::shader::{ProgramId, Shader, ShaderSource};
use super::texture::{TextureId, TextureInfo};
use super::{ResourceError, ResourceResult};
use crate::render::device::{DeviceError, DeviceResult, GfxDevice};

/// Outcome of relinking every custom program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelinkReport {
    /// Programs that linked again
    pub relinked: usize,
    /// Programs that failed and kept their previous tables
    pub failed: Vec<ProgramId>,
}

/// Registered textures and custom shader programs
#[derive(Debug)]
pub struct ResourceRegistry {
    textures: HashMap<TextureId, TextureInfo>,
    shaders: BTreeMap<ProgramId, Arc<Shader>>,
    next_program: u32,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            shaders: BTreeMap::new(),
            next_program: ProgramId::FIRST_CUSTOM.0,
        }
    }

    /// Register a texture handed out by the loader
    pub fn register_texture(&mut self, texture: TextureInfo) -> TextureInfo {
        log::debug!("Registered texture {:?} ({}x{})", texture.id, texture.width, texture.height);
        self.textures.insert(texture.id, texture);
        texture
    }

    /// Forget a texture; drawables still using it are dropped from later frames
    pub fn unregister_texture(&mut self, id: TextureId) -> Option<TextureInfo> {
        self.textures.remove(&id)
    }

    /// Look up a texture
    pub fn texture(&self, id: TextureId) -> Option<&TextureInfo> {
        self.textures.get(&id)
    }

    /// Link a new custom program
    ///
    /// A link failure still returns a shader, whose [`Shader::is_linked`]
    /// reports `false`; materials refuse to use it. Only fatal device errors
    /// are returned as `Err`.
    pub fn create_shader(
        &mut self,
        device: &mut dyn GfxDevice,
        label: &str,
        source: ShaderSource,
    ) -> DeviceResult<Arc<Shader>> {
        let program = ProgramId(self.next_program);
        self.next_program += 1;

        let shader = match device.link_program(program, &source) {
            Ok(interface) => {
                log::info!("Linked shader '{}' as {:?}", label, program);
                Shader::linked(program, label, source, &interface)
            }
            Err(DeviceError::LinkFailed { log, .. }) => {
                log::error!("Shader '{}' failed to link: {}", label, log);
                Shader::failed(program, label, source, log)
            }
            Err(err) => return Err(err),
        };

        let shader = Arc::new(shader);
        self.shaders.insert(program, Arc::clone(&shader));
        Ok(shader)
    }

    /// Look up a custom program
    pub fn shader(&self, program: ProgramId) -> Option<&Arc<Shader>> {
        self.shaders.get(&program)
    }

    /// Number of custom programs, linked or not
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Check that every resource a descriptor references is usable
    pub fn validate(&self, descriptor: &MaterialDescriptor) -> ResourceResult<()> {
        descriptor.validity()?;
        if let Some(texture) = descriptor.texture {
            if !self.textures.contains_key(&texture) {
                return Err(ResourceError::UnknownTexture(texture));
            }
        }
        let program = descriptor.program;
        if !program.is_builtin() && !self.shaders.get(&program).is_some_and(|shader| shader.is_linked()) {
            return Err(ResourceError::UnknownProgram(program));
        }
        Ok(())
    }

    /// Relink every custom program from its source
    ///
    /// Must only run between frames. A program that fails to relink keeps
    /// its previous tables. Fatal device errors abort the reload.
    pub fn relink_all(&mut self, device: &mut dyn GfxDevice) -> DeviceResult<RelinkReport> {
        let mut report = RelinkReport::default();
        for (program, shader) in &mut self.shaders {
            match device.link_program(*program, shader.source()) {
                Ok(interface) => {
                    *shader = Arc::new(shader.relinked(&interface));
                    report.relinked += 1;
                }
                Err(DeviceError::LinkFailed { log, .. }) => {
                    log::error!("Relinking '{}' failed, keeping previous program: {}", shader.label(), log);
                    report.failed.push(*program);
                }
                Err(err) => return Err(err),
            }
        }
        log::info!("Relinked {} program(s), {} failure(s)", report.relinked, report.failed.len());
        Ok(report)
    }
}
