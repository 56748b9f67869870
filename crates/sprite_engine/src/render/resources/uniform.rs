//! Uniform values
//!
//! Uniform values are stored by resolved slot, never by name, so that
//! comparing and uploading them costs no string hashing per draw call.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Data type of a uniform as declared in a shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    /// `int`
    Int,
    /// `ivec2`
    IVec2,
    /// `ivec3`
    IVec3,
    /// `ivec4`
    IVec4,
    /// `float`
    Float,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `mat4`
    Mat4,
    /// `sampler2D`, set through an integer texture unit
    Sampler2D,
}

impl UniformType {
    /// Parse a GLSL type name
    pub fn from_glsl(name: &str) -> Option<Self> {
        Some(match name {
            "int" => Self::Int,
            "ivec2" => Self::IVec2,
            "ivec3" => Self::IVec3,
            "ivec4" => Self::IVec4,
            "float" => Self::Float,
            "vec2" => Self::Vec2,
            "vec3" => Self::Vec3,
            "vec4" => Self::Vec4,
            "mat4" => Self::Mat4,
            "sampler2D" => Self::Sampler2D,
            _ => return None,
        })
    }

    /// Number of scalar components
    pub fn components(self) -> usize {
        match self {
            Self::Int | Self::Float | Self::Sampler2D => 1,
            Self::IVec2 | Self::Vec2 => 2,
            Self::IVec3 | Self::Vec3 => 3,
            Self::IVec4 | Self::Vec4 => 4,
            Self::Mat4 => 16,
        }
    }

    /// Whether values are integers
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::IVec2 | Self::IVec3 | Self::IVec4 | Self::Sampler2D)
    }
}

/// Resolved location of a uniform inside a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformSlot(pub u32);

/// A uniform value with value semantics
///
/// Floats compare and hash by bit pattern so that descriptors have a lawful
/// `Eq`/`Hash` and identical snapshots always land in the same batch.
#[derive(Debug, Clone, Copy)]
pub enum UniformValue {
    /// Integer vector of 1-4 components
    Int {
        /// Component storage, unused tail is zero
        values: [i32; 4],
        /// Number of used components
        len: u8,
    },
    /// Float vector of 1-4 components
    Float {
        /// Component storage, unused tail is zero
        values: [f32; 4],
        /// Number of used components
        len: u8,
    },
    /// Column-major 4x4 matrix
    Mat4([f32; 16]),
}

impl UniformValue {
    /// Build an integer value from 1-4 components
    pub fn ints(components: &[i32]) -> Option<Self> {
        if components.is_empty() || components.len() > 4 {
            return None;
        }
        let mut values = [0; 4];
        values[..components.len()].copy_from_slice(components);
        Some(Self::Int { values, len: components.len() as u8 })
    }

    /// Build a float value from 1-4 components, or 16 for a matrix
    pub fn floats(components: &[f32]) -> Option<Self> {
        match components.len() {
            1..=4 => {
                let mut values = [0.0; 4];
                values[..components.len()].copy_from_slice(components);
                Some(Self::Float { values, len: components.len() as u8 })
            }
            16 => {
                let mut values = [0.0; 16];
                values.copy_from_slice(components);
                Some(Self::Mat4(values))
            }
            _ => None,
        }
    }

    /// Number of scalar components
    pub fn components(&self) -> usize {
        match self {
            Self::Int { len, .. } | Self::Float { len, .. } => usize::from(*len),
            Self::Mat4(_) => 16,
        }
    }

    /// Whether this value can be written to a uniform of type `ty`
    pub fn matches(&self, ty: UniformType) -> bool {
        let integer = matches!(self, Self::Int { .. });
        integer == ty.is_integer() && self.components() == ty.components()
    }

    fn bits(&self) -> (u8, [u32; 16]) {
        let mut bits = [0_u32; 16];
        match self {
            Self::Int { values, len } => {
                for (dst, src) in bits.iter_mut().zip(&values[..usize::from(*len)]) {
                    *dst = u32::from_ne_bytes(src.to_ne_bytes());
                }
                (*len, bits)
            }
            Self::Float { values, len } => {
                for (dst, src) in bits.iter_mut().zip(&values[..usize::from(*len)]) {
                    *dst = src.to_bits();
                }
                (4 + *len, bits)
            }
            Self::Mat4(values) => {
                for (dst, src) in bits.iter_mut().zip(values) {
                    *dst = src.to_bits();
                }
                (16, bits)
            }
        }
    }
}

impl PartialEq for UniformValue {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for UniformValue {}

impl Hash for UniformValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// Uniform values of one material, keyed and ordered by slot
pub type UniformSet = BTreeMap<UniformSlot, UniformValue>;
