use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;

use crate::symbols::symbols::StructId;

lazy_static! {
    pub static ref TYPE_LOOKUP: HashMap<&'static str, TypeSpecifier> = {
        let mut map = HashMap::new();
        map.insert("void", TypeSpecifier::Void);
        map.insert("bool", TypeSpecifier::Bool);
        map.insert("bvec2", TypeSpecifier::BVec2);
        map.insert("bvec3", TypeSpecifier::BVec3);
        map.insert("bvec4", TypeSpecifier::BVec4);
        map.insert("int", TypeSpecifier::Int);
        map.insert("ivec2", TypeSpecifier::IVec2);
        map.insert("ivec3", TypeSpecifier::IVec3);
        map.insert("ivec4", TypeSpecifier::IVec4);
        map.insert("float", TypeSpecifier::Float);
        map.insert("vec2", TypeSpecifier::Vec2);
        map.insert("vec3", TypeSpecifier::Vec3);
        map.insert("vec4", TypeSpecifier::Vec4);
        map.insert("mat2", TypeSpecifier::Mat2);
        map.insert("mat3", TypeSpecifier::Mat3);
        map.insert("mat4", TypeSpecifier::Mat4);
        map.insert("sampler1D", TypeSpecifier::Sampler1D);
        map.insert("sampler2D", TypeSpecifier::Sampler2D);
        map.insert("sampler3D", TypeSpecifier::Sampler3D);
        map.insert("samplerCube", TypeSpecifier::SamplerCube);
        map.insert("sampler1DShadow", TypeSpecifier::Sampler1DShadow);
        map.insert("sampler2DShadow", TypeSpecifier::Sampler2DShadow);
        map
    };
}

/// Storage/role class of a variable or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeQualifier {
    None,
    Const,
    Attribute,
    Varying,
    Uniform,
    Out,
    InOut,
    FixedInput,
    FixedOutput,
}

impl TypeQualifier {
    /// How an argument bound to a parameter with this qualifier is passed.
    pub fn passing(&self) -> ParameterPassing {
        match self {
            TypeQualifier::Out => ParameterPassing::Out,
            TypeQualifier::InOut => ParameterPassing::InOut,
            _ => ParameterPassing::In,
        }
    }

    /// True when the actual argument must be an addressable location.
    pub fn is_by_reference(&self) -> bool {
        matches!(self, TypeQualifier::Out | TypeQualifier::InOut)
    }
}

impl Display for TypeQualifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeQualifier::None => "",
            TypeQualifier::Const => "const",
            TypeQualifier::Attribute => "attribute",
            TypeQualifier::Varying => "varying",
            TypeQualifier::Uniform => "uniform",
            TypeQualifier::Out => "out",
            TypeQualifier::InOut => "inout",
            TypeQualifier::FixedInput => "__fixed_input",
            TypeQualifier::FixedOutput => "__fixed_output",
        };
        write!(f, "{}", name)
    }
}

/// Part of a function's overload identity contributed by each parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterPassing {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSpecifier {
    Void,
    Bool,
    BVec2,
    BVec3,
    BVec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Sampler1DShadow,
    Sampler2DShadow,
    Struct(StructId),
    /// Element type and length; `None` while the length is unknown.
    Array(Box<TypeSpecifier>, Option<u32>),
}

impl TypeSpecifier {
    pub fn from_name(name: &str) -> Option<TypeSpecifier> {
        TYPE_LOOKUP.get(name).cloned()
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeSpecifier::Void)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TypeSpecifier::Bool | TypeSpecifier::Int | TypeSpecifier::Float
        )
    }

    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            TypeSpecifier::BVec2
                | TypeSpecifier::BVec3
                | TypeSpecifier::BVec4
                | TypeSpecifier::IVec2
                | TypeSpecifier::IVec3
                | TypeSpecifier::IVec4
                | TypeSpecifier::Vec2
                | TypeSpecifier::Vec3
                | TypeSpecifier::Vec4
        )
    }

    pub fn is_matrix(&self) -> bool {
        matches!(
            self,
            TypeSpecifier::Mat2 | TypeSpecifier::Mat3 | TypeSpecifier::Mat4
        )
    }

    pub fn is_sampler(&self) -> bool {
        matches!(
            self,
            TypeSpecifier::Sampler1D
                | TypeSpecifier::Sampler2D
                | TypeSpecifier::Sampler3D
                | TypeSpecifier::SamplerCube
                | TypeSpecifier::Sampler1DShadow
                | TypeSpecifier::Sampler2DShadow
        )
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeSpecifier::Array(..))
    }

    /// Built-in types with a constructor of the same name.
    pub fn is_constructible(&self) -> bool {
        self.is_scalar() || self.is_vector() || self.is_matrix()
    }

    /// Number of components of a scalar or vector, columns of a matrix.
    pub fn components(&self) -> u32 {
        match self {
            TypeSpecifier::BVec2 | TypeSpecifier::IVec2 | TypeSpecifier::Vec2 => 2,
            TypeSpecifier::BVec3 | TypeSpecifier::IVec3 | TypeSpecifier::Vec3 => 3,
            TypeSpecifier::BVec4 | TypeSpecifier::IVec4 | TypeSpecifier::Vec4 => 4,
            TypeSpecifier::Mat2 => 2,
            TypeSpecifier::Mat3 => 3,
            TypeSpecifier::Mat4 => 4,
            _ => 1,
        }
    }

    /// Scalar type of the components of a scalar, vector or matrix.
    pub fn base_type(&self) -> Option<TypeSpecifier> {
        match self {
            TypeSpecifier::Bool
            | TypeSpecifier::BVec2
            | TypeSpecifier::BVec3
            | TypeSpecifier::BVec4 => Some(TypeSpecifier::Bool),
            TypeSpecifier::Int
            | TypeSpecifier::IVec2
            | TypeSpecifier::IVec3
            | TypeSpecifier::IVec4 => Some(TypeSpecifier::Int),
            TypeSpecifier::Float
            | TypeSpecifier::Vec2
            | TypeSpecifier::Vec3
            | TypeSpecifier::Vec4
            | TypeSpecifier::Mat2
            | TypeSpecifier::Mat3
            | TypeSpecifier::Mat4 => Some(TypeSpecifier::Float),
            _ => None,
        }
    }

    /// The scalar or vector type with `components` elements of `base`.
    pub fn vector_of(base: &TypeSpecifier, components: u32) -> Option<TypeSpecifier> {
        let spec = match (base, components) {
            (TypeSpecifier::Bool, 1) => TypeSpecifier::Bool,
            (TypeSpecifier::Bool, 2) => TypeSpecifier::BVec2,
            (TypeSpecifier::Bool, 3) => TypeSpecifier::BVec3,
            (TypeSpecifier::Bool, 4) => TypeSpecifier::BVec4,
            (TypeSpecifier::Int, 1) => TypeSpecifier::Int,
            (TypeSpecifier::Int, 2) => TypeSpecifier::IVec2,
            (TypeSpecifier::Int, 3) => TypeSpecifier::IVec3,
            (TypeSpecifier::Int, 4) => TypeSpecifier::IVec4,
            (TypeSpecifier::Float, 1) => TypeSpecifier::Float,
            (TypeSpecifier::Float, 2) => TypeSpecifier::Vec2,
            (TypeSpecifier::Float, 3) => TypeSpecifier::Vec3,
            (TypeSpecifier::Float, 4) => TypeSpecifier::Vec4,
            _ => return None,
        };
        Some(spec)
    }

    /// Column type of a matrix.
    pub fn column_type(&self) -> Option<TypeSpecifier> {
        if self.is_matrix() {
            TypeSpecifier::vector_of(&TypeSpecifier::Float, self.components())
        } else {
            None
        }
    }

    /// Name of the built-in type, if it has one.
    pub fn builtin_name(&self) -> Option<&'static str> {
        TYPE_LOOKUP
            .iter()
            .find(|(_, spec)| *spec == self)
            .map(|(name, _)| *name)
    }
}

impl Display for TypeSpecifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeSpecifier::Struct(id) => write!(f, "struct#{}", id.0),
            TypeSpecifier::Array(element, Some(len)) => write!(f, "{}[{}]", element, len),
            TypeSpecifier::Array(element, None) => write!(f, "{}[]", element),
            other => write!(f, "{}", other.builtin_name().unwrap_or("?")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullySpecifiedType {
    pub qualifier: TypeQualifier,
    pub specifier: TypeSpecifier,
}

impl FullySpecifiedType {
    pub fn new(qualifier: TypeQualifier, specifier: TypeSpecifier) -> Self {
        FullySpecifiedType {
            qualifier,
            specifier,
        }
    }

    pub fn unqualified(specifier: TypeSpecifier) -> Self {
        FullySpecifiedType::new(TypeQualifier::None, specifier)
    }
}
