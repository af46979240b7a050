use crate::errors::errors::{Error, ErrorImpl};

use super::storage::{RegisterFile, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Free,
    Var,
    Temp,
}

#[derive(Debug, Clone)]
struct Table {
    slots: Vec<Slot>,
    /// Variables allocated while this table was on top: (position, size).
    vars: Vec<(u32, u32)>,
}

/// Stack of temporary-register allocation tables.
///
/// Each entry tracks every component of the temporary file. Pushing copies
/// the current state; popping releases the variables declared since the
/// matching push, so components freed by a scope are available to the
/// following code again.
#[derive(Debug, Clone)]
pub struct VarTable {
    tables: Vec<Table>,
    max_temporaries: u32,
    high_water: u32,
}

impl VarTable {
    pub fn new(max_temporaries: u32) -> Self {
        VarTable {
            tables: vec![Table {
                slots: vec![Slot::Free; (max_temporaries * 4) as usize],
                vars: vec![],
            }],
            max_temporaries,
            high_water: 0,
        }
    }

    pub fn push(&mut self) {
        let slots = self.current().slots.clone();
        self.tables.push(Table { slots, vars: vec![] });
    }

    /// Leaves the current allocation scope.
    ///
    /// Variables declared in it are released. A temporary still held, or a
    /// variable the scope did not declare, over a component the parent
    /// considers free means the table stack is out of step with the code
    /// that drove it.
    pub fn pop(&mut self) -> Result<(), Error> {
        if self.tables.len() < 2 {
            log::debug!("allocation table pop at root ignored");
            return Ok(());
        }
        let Some(popped) = self.tables.pop() else {
            return Ok(());
        };

        let declared = |component: u32| {
            popped
                .vars
                .iter()
                .any(|(position, size)| (*position..position + size).contains(&component))
        };
        let parent = self.current_mut();
        for (component, (slot, parent_slot)) in popped.slots.iter().zip(parent.slots.iter()).enumerate() {
            let component = component as u32;
            let leaked = match (slot, parent_slot) {
                (Slot::Temp, Slot::Free) => true,
                (Slot::Var, Slot::Free) => !declared(component),
                _ => false,
            };
            if leaked {
                return Err(Error::new(ErrorImpl::AllocationLeak { component }, None));
            }
        }

        for (slot, parent_slot) in popped.slots.iter().zip(parent.slots.iter_mut()) {
            if *slot == Slot::Free && *parent_slot == Slot::Temp {
                *parent_slot = Slot::Free;
            }
        }
        Ok(())
    }

    /// Allocates a variable of `size` components in the current scope.
    pub fn alloc_var(&mut self, size: u32) -> Result<Storage, Error> {
        let position = self.alloc(size, Slot::Var)?;
        self.current_mut().vars.push((position, size));
        log::debug!("variable of size {} at component {}", size, position);
        Ok(Storage::at_component(RegisterFile::Temporary, position, size))
    }

    /// Allocates an anonymous temporary; released with [`VarTable::free_temp`].
    pub fn alloc_temp(&mut self, size: u32) -> Result<(u32, Storage), Error> {
        let position = self.alloc(size, Slot::Temp)?;
        Ok((position, Storage::at_component(RegisterFile::Temporary, position, size)))
    }

    pub fn free_temp(&mut self, position: u32, size: u32) {
        let table = self.current_mut();
        for slot in table
            .slots
            .iter_mut()
            .skip(position as usize)
            .take(size as usize)
        {
            if *slot == Slot::Temp {
                *slot = Slot::Free;
            }
        }
    }

    pub fn is_free(&self, component: u32) -> bool {
        self.current()
            .slots
            .get(component as usize)
            .is_some_and(|slot| *slot == Slot::Free)
    }

    /// Components currently in use.
    pub fn used(&self) -> usize {
        self.current()
            .slots
            .iter()
            .filter(|slot| **slot != Slot::Free)
            .count()
    }

    /// Highest number of registers ever touched.
    pub fn registers_used(&self) -> u32 {
        self.high_water.div_ceil(4)
    }

    fn current(&self) -> &Table {
        &self.tables[self.tables.len() - 1]
    }

    fn current_mut(&mut self) -> &mut Table {
        let last = self.tables.len() - 1;
        &mut self.tables[last]
    }

    fn alloc(&mut self, size: u32, kind: Slot) -> Result<u32, Error> {
        let size = size.max(1);
        let position = self.find_free(size).ok_or_else(|| {
            Error::new(
                ErrorImpl::RegisterFileExhausted {
                    file: RegisterFile::Temporary.to_string(),
                    size: self.max_temporaries,
                },
                None,
            )
        })?;

        for slot in &mut self.current_mut().slots[position as usize..(position + size) as usize] {
            *slot = kind;
        }
        self.high_water = self.high_water.max(position + size);
        Ok(position)
    }

    /// Scalars take the first free component anywhere; anything larger
    /// starts on a register boundary.
    fn find_free(&self, size: u32) -> Option<u32> {
        let slots = &self.current().slots;
        let total = slots.len() as u32;

        if size == 1 {
            return slots
                .iter()
                .position(|slot| *slot == Slot::Free)
                .map(|position| position as u32);
        }

        (0..total)
            .step_by(4)
            .take_while(|start| start + size <= total)
            .find(|start| {
                slots[*start as usize..(start + size) as usize]
                    .iter()
                    .all(|slot| *slot == Slot::Free)
            })
    }
}
