//! State differ: which leaves changed between two decoded states.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::state::{FIELD_COUNT, Field, FieldValue, Group, WheelInputState};

/// Leaves whose value differs between two states, with their new values.
///
/// Fixed-size and `Copy`; iteration follows tree order, so fields of one
/// group are always adjacent. Serializes as `{group: {field: value}}`,
/// omitting groups with no changes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChangeSet {
    values: [Option<FieldValue>; FIELD_COUNT],
    len: usize,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// New value of `field`, if it changed.
    pub fn get(&self, field: Field) -> Option<FieldValue> {
        self.values.get(field.index()).copied().flatten()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    /// Whether any field of `group` changed.
    pub fn touches(&self, group: Group) -> bool {
        self.iter().any(|(field, _)| field.group() == group)
    }

    /// Changed fields and their new values, in tree order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, FieldValue)> + '_ {
        Field::ALL
            .into_iter()
            .zip(self.values.iter())
            .filter_map(|(field, value)| value.map(|v| (field, v)))
    }

    /// Changed fields of one group, in tree order.
    pub fn group(&self, group: Group) -> impl Iterator<Item = (Field, FieldValue)> + '_ {
        self.iter().filter(move |(field, _)| field.group() == group)
    }

    /// Groups with at least one change, in tree order.
    pub fn groups(&self) -> impl Iterator<Item = Group> + '_ {
        Group::ALL.into_iter().filter(|g| self.touches(*g))
    }

    fn insert(&mut self, field: Field, value: FieldValue) {
        if let Some(slot) = self.values.get_mut(field.index()) {
            if slot.replace(value).is_none() {
                self.len += 1;
            }
        }
    }
}

/// Compare two states leaf by leaf.
///
/// Equality is exact: continuous leaves are already quantized to the
/// protocol's native resolution by the decoder.
pub fn diff(previous: &WheelInputState, next: &WheelInputState) -> ChangeSet {
    let mut changes = ChangeSet::default();
    for field in Field::ALL {
        let new_value = next.get(field);
        if previous.get(field) != new_value {
            changes.insert(field, new_value);
        }
    }
    changes
}

struct GroupChanges<'a>(&'a ChangeSet, Group);

impl Serialize for GroupChanges<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (field, value) in self.0.group(self.1) {
            map.serialize_entry(field.name(), &value)?;
        }
        map.end()
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for group in self.groups() {
            map.serialize_entry(group.name(), &GroupChanges(self, group))?;
        }
        map.end()
    }
}
