// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Identity tables behind the null / new / backreference decision.
//!
//! Identity is the address of a shared allocation (`Rc::as_ptr`, `Arc::as_ptr`).
//! The write and copy tables hold a clone of every pointer they track, so an
//! address cannot be handed to another allocation until the table is cleared,
//! even for objects the caller produces and drops mid-operation.

use crate::buffer::{Reader, Writer};
use crate::error::Error;
use crate::serializer::{downcast_rc, DynObject, Serializer};
use crate::types::{RefDecision, RefFlag, RefRead, FIRST_REF_ID};
use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// Address of the allocation behind a (possibly unsized) pointer.
#[inline(always)]
pub fn address_of<T: ?Sized>(ptr: *const T) -> usize {
    ptr as *const () as usize
}

/// A pointer tracked by identity.
pub trait Tracked: Clone + 'static {
    fn address(&self) -> usize;
}

impl<T: ?Sized + 'static> Tracked for Rc<T> {
    #[inline(always)]
    fn address(&self) -> usize {
        address_of(Rc::as_ptr(self))
    }
}

impl<T: ?Sized + 'static> Tracked for Arc<T> {
    #[inline(always)]
    fn address(&self) -> usize {
        address_of(Arc::as_ptr(self))
    }
}

/// Views an `Rc<T>` stored as `dyn Any` as `Rc<dyn DynObject>`.
type DynView = fn(&dyn Any) -> Option<Rc<dyn DynObject>>;

fn rc_as_dyn<T: Serializer>(value: &dyn Any) -> Option<Rc<dyn DynObject>> {
    value
        .downcast_ref::<Rc<T>>()
        .map(|shared| shared.clone() as Rc<dyn DynObject>)
}

/// An object published under an id, with its runtime-typed view when it has one.
///
/// One allocation may be reached both as `Rc<T>` and as `Rc<dyn DynObject>`;
/// whichever form comes first is stored and the other is derived from it.
struct Slot {
    value: Box<dyn Any>,
    dyn_view: Option<DynView>,
}

impl Slot {
    fn plain<T: 'static>(value: T) -> Slot {
        Slot {
            value: Box::new(value),
            dyn_view: None,
        }
    }

    fn rc<T: Serializer>(value: Rc<T>) -> Slot {
        Slot {
            value: Box::new(value),
            dyn_view: Some(rc_as_dyn::<T>),
        }
    }

    fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }

    fn get_rc<T: Serializer>(&self) -> Option<Rc<T>> {
        self.get::<Rc<T>>().or_else(|| {
            self.get::<Rc<dyn DynObject>>()
                .and_then(|shared| downcast_rc::<T>(shared).ok())
        })
    }

    fn get_dyn_rc(&self) -> Option<Rc<dyn DynObject>> {
        self.get::<Rc<dyn DynObject>>()
            .or_else(|| self.dyn_view.and_then(|view| view(&*self.value)))
    }
}

/// Write-side table: address -> id, ids handed out in first-seen order.
pub struct RefWriter {
    refs: HashMap<usize, (u32, Box<dyn Any>)>,
    next_ref_id: u32,
}

impl Default for RefWriter {
    fn default() -> Self {
        RefWriter {
            refs: HashMap::new(),
            next_ref_id: FIRST_REF_ID,
        }
    }
}

impl RefWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `shared`; `None` is a null slot.
    pub fn decide<P: Tracked>(&mut self, shared: Option<&P>, tracked: bool) -> RefDecision {
        let Some(shared) = shared else {
            return RefDecision::Null;
        };
        if !tracked {
            return RefDecision::Immutable;
        }
        match self.refs.entry(shared.address()) {
            Entry::Occupied(entry) => RefDecision::ExistingId(entry.get().0),
            Entry::Vacant(entry) => {
                let id = self.next_ref_id;
                self.next_ref_id += 1;
                entry.insert((id, Box::new(shared.clone())));
                RefDecision::NewId(id)
            }
        }
    }

    /// Writes the tag for `decision`. Returns whether the object's data must follow.
    pub fn write_tag(
        writer: &mut Writer,
        decision: RefDecision,
        nullable: bool,
    ) -> Result<bool, Error> {
        match decision {
            RefDecision::Null => {
                writer.write_var_u32(RefFlag::Null.into())?;
                Ok(false)
            }
            RefDecision::Immutable => {
                if nullable {
                    writer.write_var_u32(RefFlag::NotNull.into())?;
                }
                Ok(true)
            }
            RefDecision::NewId(id) => {
                log::trace!("new reference {id}");
                writer.write_var_u32(RefFlag::NotNull.into())?;
                Ok(true)
            }
            RefDecision::ExistingId(id) => {
                log::trace!("backreference {id}");
                writer.write_var_u32(id)?;
                Ok(false)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn clear(&mut self) {
        self.refs.clear();
        self.next_ref_id = FIRST_REF_ID;
    }
}

/// Read-side table: id -> reconstructed object.
///
/// A slot is reserved as soon as the tag of a new object is read, before any of
/// its fields, so ids line up with the writer's first-seen order even when a
/// field refers back to an ancestor.
#[derive(Default)]
pub struct RefReader {
    refs: Vec<Option<Slot>>,
}

impl RefReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the tag of one slot. Untracked non-nullable slots carry no tag.
    pub fn read_tag(
        &mut self,
        reader: &mut Reader,
        tracked: bool,
        nullable: bool,
    ) -> Result<RefRead, Error> {
        if !tracked && !nullable {
            return Ok(RefRead::Value);
        }
        let tag = reader.read_var_u32()?;
        match RefFlag::try_from(tag) {
            Ok(RefFlag::Null) => Ok(RefRead::Null),
            Ok(RefFlag::NotNull) if tracked => Ok(RefRead::New(self.reserve())),
            Ok(RefFlag::NotNull) => Ok(RefRead::Value),
            Err(_) if tracked => Ok(RefRead::Existing(tag)),
            Err(_) => Err(Error::invalid_data(format!(
                "reference tag {tag} for an untracked value; was the graph written with references enabled?"
            ))),
        }
    }

    /// Reserves the next id for an object under construction.
    pub fn reserve(&mut self) -> u32 {
        let id = self.refs.len() as u32 + FIRST_REF_ID;
        self.refs.push(None);
        id
    }

    fn publish(&mut self, id: u32, slot: Slot) -> Result<(), Error> {
        let entry = id
            .checked_sub(FIRST_REF_ID)
            .and_then(|index| self.refs.get_mut(index as usize))
            .ok_or_else(|| Error::unresolved_reference(format!("id {id} was never reserved")))?;
        *entry = Some(slot);
        Ok(())
    }

    /// Publishes the object for a reserved id.
    pub fn set<T: 'static>(&mut self, id: u32, value: T) -> Result<(), Error> {
        self.publish(id, Slot::plain(value))
    }

    /// Publishes an `Rc<T>`, which a later backreference may also read as
    /// `Rc<dyn DynObject>`.
    pub fn set_rc<T: Serializer>(&mut self, id: u32, value: Rc<T>) -> Result<(), Error> {
        self.publish(id, Slot::rc(value))
    }

    pub fn set_arc<T: 'static>(&mut self, id: u32, value: Arc<T>) -> Result<(), Error> {
        self.set(id, value)
    }

    fn slot(&self, id: u32) -> Result<&Slot, Error> {
        let entry = id
            .checked_sub(FIRST_REF_ID)
            .and_then(|index| self.refs.get(index as usize))
            .ok_or_else(|| {
                Error::unresolved_reference(format!(
                    "id {id} not found among {} read object(s)",
                    self.refs.len()
                ))
            })?;
        entry.as_ref().ok_or_else(|| {
            Error::unresolved_reference(format!(
                "id {id} refers to an object that is still being read"
            ))
        })
    }

    fn mismatch<T>(id: u32) -> Error {
        Error::type_mismatch(std::any::type_name::<T>(), format!("object of reference {id}"))
    }

    /// Clones the object stored under `id`.
    pub fn get<T: Clone + 'static>(&self, id: u32) -> Result<T, Error> {
        self.slot(id)?.get::<T>().ok_or_else(|| Self::mismatch::<T>(id))
    }

    /// The `Rc<T>` stored under `id`, also when it was read as `Rc<dyn DynObject>`.
    pub fn get_rc<T: Serializer>(&self, id: u32) -> Result<Rc<T>, Error> {
        self.slot(id)?
            .get_rc::<T>()
            .ok_or_else(|| Self::mismatch::<Rc<T>>(id))
    }

    pub fn get_arc<T: 'static>(&self, id: u32) -> Result<Arc<T>, Error> {
        self.get::<Arc<T>>(id)
    }

    /// The object under `id` as `Rc<dyn DynObject>`, also when it was read as `Rc<T>`.
    pub fn get_dyn_rc(&self, id: u32) -> Result<Rc<dyn DynObject>, Error> {
        self.slot(id)?
            .get_dyn_rc()
            .ok_or_else(|| Self::mismatch::<Rc<dyn DynObject>>(id))
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn clear(&mut self) {
        self.refs.clear();
    }
}

/// Copy-side table: source object -> its copy.
///
/// The source pointer is kept next to its copy so its address stays unique.
#[derive(Default)]
pub struct CopyRefs {
    copies: HashMap<usize, (Box<dyn Any>, Slot)>,
}

impl CopyRefs {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot<P: Tracked>(&self, source: &P) -> Option<&Slot> {
        self.copies.get(&source.address()).map(|(_, slot)| slot)
    }

    fn mismatch<T>() -> Error {
        Error::type_mismatch(std::any::type_name::<T>(), "a copy of another type")
    }

    pub fn get<P: Tracked>(&self, source: &P) -> Result<Option<P>, Error> {
        match self.slot(source) {
            None => Ok(None),
            Some(slot) => slot.get::<P>().map(Some).ok_or_else(Self::mismatch::<P>),
        }
    }

    pub fn get_rc<T: Serializer>(&self, source: &Rc<T>) -> Result<Option<Rc<T>>, Error> {
        match self.slot(source) {
            None => Ok(None),
            Some(slot) => slot.get_rc::<T>().map(Some).ok_or_else(Self::mismatch::<Rc<T>>),
        }
    }

    pub fn get_arc<T: 'static>(&self, source: &Arc<T>) -> Result<Option<Arc<T>>, Error> {
        self.get(source)
    }

    pub fn get_dyn_rc(
        &self,
        source: &Rc<dyn DynObject>,
    ) -> Result<Option<Rc<dyn DynObject>>, Error> {
        match self.slot(source) {
            None => Ok(None),
            Some(slot) => slot
                .get_dyn_rc()
                .map(Some)
                .ok_or_else(Self::mismatch::<Rc<dyn DynObject>>),
        }
    }

    fn put<P: Tracked>(&mut self, source: &P, slot: Slot) {
        self.copies
            .insert(source.address(), (Box::new(source.clone()), slot));
    }

    pub fn insert<P: Tracked>(&mut self, source: &P, copy: P) {
        self.put(source, Slot::plain(copy));
    }

    pub fn insert_rc<T: Serializer>(&mut self, source: &Rc<T>, copy: Rc<T>) {
        self.put(source, Slot::rc(copy));
    }

    pub fn insert_arc<T: 'static>(&mut self, source: &Arc<T>, copy: Arc<T>) {
        self.insert(source, copy);
    }

    pub fn len(&self) -> usize {
        self.copies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    pub fn clear(&mut self) {
        self.copies.clear();
    }
}
