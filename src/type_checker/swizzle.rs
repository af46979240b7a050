use std::fmt::Display;

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::errors::{Error, ErrorImpl};

lazy_static! {
    // One naming group per swizzle, at most four selectors.
    static ref SWIZZLE_PATTERN: Regex = Regex::new("^([xyzw]{1,4}|[rgba]{1,4}|[stpq]{1,4})$").unwrap();
}

const COMPONENT_NAMES: [char; 4] = ['x', 'y', 'z', 'w'];

/// Component selector: up to four source component indices.
///
/// Components past `size` replicate the last used component so that a
/// swizzle always reads as a full four-wide source selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle {
    size: u8,
    components: [u8; 4],
}

impl Swizzle {
    /// Builds a swizzle from one to four component indices.
    pub fn new(components: &[u8]) -> Swizzle {
        let size = components.len().clamp(1, 4);
        let mut padded = [0u8; 4];
        for (i, slot) in padded.iter_mut().enumerate() {
            *slot = components
                .get(i.min(size - 1))
                .copied()
                .unwrap_or(0)
                .min(3);
        }

        Swizzle {
            size: size as u8,
            components: padded,
        }
    }

    /// `.x`, `.xy`, `.xyz` or `.xyzw`.
    pub fn identity(size: u32) -> Swizzle {
        let size = size.clamp(1, 4) as u8;
        Swizzle::new(&[0, 1, 2, 3][..size as usize])
    }

    /// One component read everywhere, e.g. `.yyyy`.
    pub fn replicate(component: u8) -> Swizzle {
        Swizzle::new(&[component])
    }

    pub fn size(&self) -> u32 {
        self.size as u32
    }

    pub fn component(&self, index: usize) -> u8 {
        self.components[index.min(3)]
    }

    /// The selected components, without padding.
    pub fn selected(&self) -> &[u8] {
        &self.components[..self.size as usize]
    }

    /// All four selectors including padding.
    pub fn padded(&self) -> [u8; 4] {
        self.components
    }

    /// Parses a field selector such as `xy`, `bgr` or `stq`.
    ///
    /// # Arguments
    ///
    /// * `field` - The selector text after the dot
    /// * `available` - Component count of the swizzled value
    ///
    /// # Returns
    ///
    /// The swizzle, `InvalidSwizzle` when the text mixes naming groups or is
    /// too long, `SwizzleOutOfRange` when a selector exceeds `available`.
    pub fn parse(field: &str, available: u32, type_name: &str) -> Result<Swizzle, Error> {
        if !SWIZZLE_PATTERN.is_match(field) {
            return Err(Error::new(
                ErrorImpl::InvalidSwizzle {
                    swizzle: field.to_string(),
                    type_: type_name.to_string(),
                },
                None,
            ));
        }

        let mut components = vec![];
        for c in field.chars() {
            let index = match c {
                'x' | 'r' | 's' => 0,
                'y' | 'g' | 't' => 1,
                'z' | 'b' | 'p' => 2,
                _ => 3,
            };

            if index >= available {
                return Err(Error::new(
                    ErrorImpl::SwizzleOutOfRange {
                        swizzle: field.to_string(),
                        size: available,
                    },
                    None,
                ));
            }
            components.push(index as u8);
        }

        Ok(Swizzle::new(&components))
    }

    /// True when no component is selected twice, so the swizzle can be a
    /// write target.
    pub fn is_mask(&self) -> bool {
        let selected = self.selected();
        selected
            .iter()
            .enumerate()
            .all(|(i, c)| !selected[..i].contains(c))
    }

    /// True for `.x`, `.xy`, `.xyz` and `.xyzw`.
    pub fn is_simple(&self) -> bool {
        self.selected()
            .iter()
            .enumerate()
            .all(|(i, c)| *c as usize == i)
    }

    /// Destination components written through this swizzle.
    pub fn writemask(&self) -> WriteMask {
        WriteMask(self.selected().iter().fold(0, |mask, c| mask | (1 << c)))
    }

    /// Inverse permutation of a mask swizzle.
    ///
    /// Position `self[i]` of the result reads component `i`; unselected
    /// positions keep the identity. Applying it to a value makes a plain
    /// positional copy through `self.writemask()` equivalent to assigning
    /// through the swizzle.
    pub fn inverse(&self) -> Swizzle {
        let mut result = [0u8, 1, 2, 3];
        for (i, c) in self.selected().iter().enumerate() {
            result[*c as usize] = i as u8;
        }

        Swizzle {
            size: 4,
            components: result,
        }
    }

    /// Swizzle equivalent to applying `over` to a value already swizzled by
    /// `self`: `result[i] = self[over[i]]`.
    pub fn compose(&self, over: &Swizzle) -> Swizzle {
        let components: Vec<u8> = over
            .selected()
            .iter()
            .map(|c| self.components[*c as usize])
            .collect();
        Swizzle::new(&components)
    }
}

impl Display for Swizzle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in self.padded() {
            write!(f, "{}", COMPONENT_NAMES[c as usize])?;
        }
        Ok(())
    }
}

/// Set of destination components written by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteMask(pub u8);

impl WriteMask {
    pub const X: WriteMask = WriteMask(1);
    pub const Y: WriteMask = WriteMask(2);
    pub const Z: WriteMask = WriteMask(4);
    pub const W: WriteMask = WriteMask(8);
    pub const XYZW: WriteMask = WriteMask(15);

    /// The first `size` components.
    pub fn first(size: u32) -> WriteMask {
        WriteMask(((1u32 << size.min(4)) - 1) as u8)
    }

    pub fn contains(&self, component: u8) -> bool {
        self.0 & (1 << component) != 0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }
}

impl Display for WriteMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, name) in COMPONENT_NAMES.iter().enumerate() {
            if self.contains(i as u8) {
                write!(f, "{}", name)?;
            }
        }
        Ok(())
    }
}
