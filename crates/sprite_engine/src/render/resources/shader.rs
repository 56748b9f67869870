//! Shader programs
//!
//! A [`Shader`] is a linked GPU program plus the lookup tables produced by
//! introspecting it at link time. Uniform and attribute names are resolved
//! to slots exactly once, here; everything downstream works with slots.

use std::collections::HashMap;

use super::uniform::{UniformSlot, UniformType};

/// Identifier of a GPU shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

impl ProgramId {
    /// Built-in program for sprites
    pub const SPRITE: ProgramId = ProgramId(1);
    /// Built-in program for mesh sprites
    pub const MESH_SPRITE: ProgramId = ProgramId(2);
    /// Built-in program for text
    pub const TEXT: ProgramId = ProgramId(3);
    /// Built-in program for particles
    pub const PARTICLE: ProgramId = ProgramId(4);
    /// First id handed out to user programs
    pub const FIRST_CUSTOM: ProgramId = ProgramId(16);

    /// Whether the device provides this program without linking
    pub fn is_builtin(self) -> bool {
        (Self::SPRITE.0..=Self::PARTICLE.0).contains(&self.0)
    }
}

/// How the shader source strings are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// The strings are GLSL source text
    String,
    /// The strings are file paths resolved by the device
    File,
}

/// Vertex and fragment stage sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Interpretation of `vertex` and `fragment`
    pub mode: LoadMode,
    /// Vertex stage
    pub vertex: String,
    /// Fragment stage
    pub fragment: String,
}

impl ShaderSource {
    /// Inline GLSL sources
    pub fn from_strings(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self { mode: LoadMode::String, vertex: vertex.into(), fragment: fragment.into() }
    }

    /// Paths to GLSL files
    pub fn from_files(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self { mode: LoadMode::File, vertex: vertex.into(), fragment: fragment.into() }
    }
}

/// A uniform discovered by program introspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    /// Enclosing uniform block, `None` for a free uniform
    pub block: Option<String>,
    /// Uniform name
    pub name: String,
    /// Declared type
    pub ty: UniformType,
}

/// A vertex attribute discovered by program introspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    /// Attribute name
    pub name: String,
    /// Number of float components
    pub components: u8,
}

/// Everything introspection reports about a linked program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramInterface {
    /// Uniforms in declaration order
    pub uniforms: Vec<UniformDecl>,
    /// Vertex attributes in declaration order
    pub attributes: Vec<AttributeDecl>,
}

/// Link state of a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// Linking succeeded and the program is usable
    Linked,
    /// Linking failed; the device's info log is kept for diagnostics
    LinkingFailed(String),
}

/// Resolved uniform entry of the name-to-slot table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformInfo {
    /// Slot used for storage and upload
    pub slot: UniformSlot,
    /// Declared type
    pub ty: UniformType,
}

/// Resolved attribute entry of the name-to-location table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Attribute location
    pub location: u32,
    /// Number of float components
    pub components: u8,
}

/// A shader program and its introspection tables
#[derive(Debug, Clone)]
pub struct Shader {
    program: ProgramId,
    label: String,
    source: ShaderSource,
    status: LinkStatus,
    uniforms: HashMap<String, UniformInfo>,
    blocks: HashMap<String, HashMap<String, UniformInfo>>,
    attributes: HashMap<String, AttributeInfo>,
}

impl Shader {
    /// Build a linked shader, resolving every declared name to a slot
    ///
    /// Slots follow declaration order so relinking the same source yields
    /// the same slots.
    pub fn linked(program: ProgramId, label: impl Into<String>, source: ShaderSource, interface: &ProgramInterface) -> Self {
        let mut shader = Self {
            program,
            label: label.into(),
            source,
            status: LinkStatus::Linked,
            uniforms: HashMap::new(),
            blocks: HashMap::new(),
            attributes: HashMap::new(),
        };
        shader.build_tables(interface);
        shader
    }

    /// Build a shader that failed to link
    pub fn failed(program: ProgramId, label: impl Into<String>, source: ShaderSource, log: impl Into<String>) -> Self {
        Self {
            program,
            label: label.into(),
            source,
            status: LinkStatus::LinkingFailed(log.into()),
            uniforms: HashMap::new(),
            blocks: HashMap::new(),
            attributes: HashMap::new(),
        }
    }

    fn build_tables(&mut self, interface: &ProgramInterface) {
        for (slot, decl) in interface.uniforms.iter().enumerate() {
            let info = UniformInfo { slot: UniformSlot(slot as u32), ty: decl.ty };
            match &decl.block {
                Some(block) => {
                    self.blocks
                        .entry(block.clone())
                        .or_default()
                        .insert(decl.name.clone(), info);
                }
                None => {
                    self.uniforms.insert(decl.name.clone(), info);
                }
            }
        }
        for (location, decl) in interface.attributes.iter().enumerate() {
            self.attributes.insert(
                decl.name.clone(),
                AttributeInfo { location: location as u32, components: decl.components },
            );
        }
        log::debug!(
            "Shader '{}' ({:?}): {} uniform(s), {} block(s), {} attribute(s)",
            self.label,
            self.program,
            interface.uniforms.len(),
            self.blocks.len(),
            self.attributes.len()
        );
    }

    /// Returns true if the shader is linked and can therefore be used
    pub fn is_linked(&self) -> bool {
        self.status == LinkStatus::Linked
    }

    /// Link status, including the failure log
    pub fn status(&self) -> &LinkStatus {
        &self.status
    }

    /// Program identifier
    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// Debug label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Source the program was linked from
    pub fn source(&self) -> &ShaderSource {
        &self.source
    }

    /// Resolve a uniform, optionally inside a named block
    pub fn uniform(&self, block: Option<&str>, name: &str) -> Option<UniformInfo> {
        match block {
            Some(block) => self.blocks.get(block)?.get(name).copied(),
            None => self.uniforms.get(name).copied(),
        }
    }

    /// Whether a uniform block with this name exists
    pub fn has_block(&self, block: &str) -> bool {
        self.blocks.contains_key(block)
    }

    /// Resolve a vertex attribute
    pub fn attribute(&self, name: &str) -> Option<AttributeInfo> {
        self.attributes.get(name).copied()
    }

    /// Replace the tables after a successful relink
    pub(crate) fn relinked(&self, interface: &ProgramInterface) -> Self {
        Self::linked(self.program, self.label.clone(), self.source.clone(), interface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface() -> ProgramInterface {
        ProgramInterface {
            uniforms: vec![
                UniformDecl { block: None, name: "uTexture".into(), ty: UniformType::Sampler2D },
                UniformDecl { block: Some("SpriteBlock".into()), name: "color".into(), ty: UniformType::Vec4 },
                UniformDecl { block: Some("SpriteBlock".into()), name: "spriteSize".into(), ty: UniformType::Vec2 },
            ],
            attributes: vec![
                AttributeDecl { name: "aPosition".into(), components: 2 },
                AttributeDecl { name: "aTexCoords".into(), components: 2 },
            ],
        }
    }

    #[test]
    fn test_slots_follow_declaration_order() {
        let shader = Shader::linked(ProgramId(20), "sprite", ShaderSource::from_strings("", ""), &interface());

        assert!(shader.is_linked());
        assert_eq!(shader.uniform(None, "uTexture").unwrap().slot, UniformSlot(0));
        assert_eq!(shader.uniform(Some("SpriteBlock"), "spriteSize").unwrap().slot, UniformSlot(2));
        assert!(shader.has_block("SpriteBlock"));
        assert!(!shader.has_block("MeshSpriteBlock"));
        assert!(shader.uniform(None, "color").is_none());
        assert!(shader.uniform(Some("Missing"), "color").is_none());
        assert_eq!(shader.attribute("aTexCoords").unwrap().location, 1);
    }

    #[test]
    fn test_failed_shader_is_not_linked() {
        let shader = Shader::failed(ProgramId(21), "broken", ShaderSource::from_strings("", ""), "syntax error");
        assert!(!shader.is_linked());
        assert_eq!(shader.status(), &LinkStatus::LinkingFailed("syntax error".to_string()));
    }

    #[test]
    fn test_builtin_range() {
        assert!(ProgramId::SPRITE.is_builtin());
        assert!(ProgramId::PARTICLE.is_builtin());
        assert!(!ProgramId::FIRST_CUSTOM.is_builtin());
    }
}
