use crate::jvm::FrameErrorKind;
use crate::util::Width;
use std::collections::BTreeMap;
use std::fmt;

/// Local variables of a frame, indexed by word slot
///
/// Only the slots that have been written are stored. A category-2 value written at `slot` is
/// a single entry, and it makes `slot + 1` unaddressable: reading `slot + 1` fails and writing
/// `slot + 1` invalidates the wide value underneath.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Locals<T> {
    slots: BTreeMap<u16, T>,
}

impl<T> Default for Locals<T> {
    fn default() -> Self {
        Locals {
            slots: BTreeMap::new(),
        }
    }
}

impl<T: Width> Locals<T> {
    pub fn new() -> Locals<T> {
        Locals::default()
    }

    /// Number of entries (a category-2 value counts once)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of words spanned by the locals (what counts towards `max_locals`)
    pub fn word_len(&self) -> usize {
        self.slots
            .iter()
            .next_back()
            .map_or(0, |(slot, value)| *slot as usize + value.width())
    }

    /// Read the value stored at a slot
    pub fn get(&self, slot: u16) -> Result<&T, FrameErrorKind> {
        self.slots.get(&slot).ok_or(FrameErrorKind::InvalidLocal(slot))
    }

    /// Overwrite the value stored at a slot
    pub fn set(&mut self, slot: u16, value: T) -> Result<(), FrameErrorKind> {
        let width = value.width();
        if slot as usize + width > u16::MAX as usize + 1 {
            return Err(FrameErrorKind::InvalidLocal(slot));
        }

        // Writing into the upper half of a wide value destroys it
        if let Some(below) = slot.checked_sub(1) {
            if self.slots.get(&below).map_or(false, |prev| prev.width() == 2) {
                let _ = self.slots.remove(&below);
            }
        }

        // The upper half of a wide value can't hold anything else
        if width == 2 {
            let _ = self.slots.remove(&(slot + 1));
        }

        let _ = self.slots.insert(slot, value);
        Ok(())
    }

    /// Drop every local at or above `slot`
    pub fn remove_from(&mut self, slot: u16) {
        let _ = self.slots.split_off(&slot);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (u16, &T)> {
        self.slots.iter().map(|(slot, value)| (*slot, value))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.values_mut()
    }

    /// Flatten into the list of entries the class file expects, filling gaps with `filler`
    ///
    /// A category-2 entry covers its own upper half, so no filler is added after it. Trailing
    /// gaps are never materialized.
    pub fn to_dense(&self, filler: impl Fn() -> T) -> Vec<T>
    where
        T: Clone,
    {
        let mut dense = vec![];
        let mut next_slot = 0;
        for (slot, value) in self.iter() {
            while next_slot < slot as usize {
                dense.push(filler());
                next_slot += 1;
            }
            dense.push(value.clone());
            next_slot += value.width();
        }
        dense
    }
}

impl<T: Width> FromIterator<(u16, T)> for Locals<T> {
    fn from_iter<I: IntoIterator<Item = (u16, T)>>(entries: I) -> Self {
        Locals {
            slots: entries.into_iter().collect(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Locals<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (slot, value) in &self.slots {
            list.entry(&format_args!("#{} = {:?}", slot, value));
        }
        list.finish()
    }
}
