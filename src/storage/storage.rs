use std::fmt::Display;

use crate::type_checker::swizzle::Swizzle;

/// Register file of the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterFile {
    Temporary,
    Constant,
    Uniform,
    /// Built-in state such as the transformation matrices.
    StateVariable,
    Input,
    Output,
    Sampler,
}

impl Display for RegisterFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RegisterFile::Temporary => "TEMP",
            RegisterFile::Constant => "CONST",
            RegisterFile::Uniform => "UNIFORM",
            RegisterFile::StateVariable => "STATE",
            RegisterFile::Input => "INPUT",
            RegisterFile::Output => "OUTPUT",
            RegisterFile::Sampler => "SAMPLER",
        };
        write!(f, "{}", name)
    }
}

/// Where a value lives: register file, first register, component count and
/// the components of the first register it occupies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Storage {
    pub file: RegisterFile,
    pub index: u32,
    pub size: u32,
    pub swizzle: Swizzle,
}

impl Storage {
    pub fn new(file: RegisterFile, index: u32, size: u32, swizzle: Swizzle) -> Self {
        Storage {
            file,
            index,
            size,
            swizzle,
        }
    }

    /// Storage of `size` components starting at register-file component
    /// `position`. Scalars replicate their component, larger values start at
    /// a register boundary.
    pub fn at_component(file: RegisterFile, position: u32, size: u32) -> Self {
        let swizzle = if size == 1 {
            Swizzle::replicate((position % 4) as u8)
        } else {
            Swizzle::identity(size.min(4))
        };
        Storage::new(file, position / 4, size, swizzle)
    }

    /// Whole registers starting at `index`.
    pub fn registers(file: RegisterFile, index: u32, size: u32) -> Self {
        Storage::new(file, index, size, Swizzle::identity(size.min(4)))
    }

    /// Number of registers spanned.
    pub fn register_count(&self) -> u32 {
        self.size.div_ceil(4).max(1)
    }

    /// Sub-location `offset` components into this value.
    pub fn field(&self, offset: u32, size: u32) -> Storage {
        if self.size <= 1 {
            return Storage { size, ..*self };
        }
        let base = self.swizzle.component(0) as u32 + offset;
        Storage::at_component(self.file, self.index * 4 + base, size)
    }

    /// The same location seen through `swizzle`.
    pub fn swizzled(&self, swizzle: &Swizzle) -> Storage {
        Storage {
            size: swizzle.size(),
            swizzle: self.swizzle.compose(swizzle),
            ..*self
        }
    }
}

impl Display for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}].{}", self.file, self.index, self.swizzle)
    }
}
