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

//! Type registry: Rust type <-> small integer id <-> serializer.
//!
//! Statically typed fields never consult the registry; it is only needed where
//! the concrete type is not known at compile time (`Box<dyn DynObject>`,
//! `Rc<dyn DynObject>`) and for the closed-world registration check.

use crate::error::Error;
use crate::resolver::context::{CopyContext, ReadContext, WriteContext};
use crate::serializer::{CustomSerializer, DynObject, Serializer};
use crate::types::NAME_ID;
use lazy_static::lazy_static;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

pub type WriteFn = fn(&dyn Any, &mut WriteContext) -> Result<(), Error>;
pub type ReadFn = fn(&mut ReadContext) -> Result<Box<dyn DynObject>, Error>;
pub type CopyFn = fn(&dyn Any, &mut CopyContext) -> Result<Box<dyn DynObject>, Error>;

/// Type-erased entry points of one serializer.
#[derive(Clone, Copy)]
pub struct Harness {
    write_fn: WriteFn,
    read_fn: ReadFn,
    copy_fn: CopyFn,
}

impl Harness {
    pub fn new(write_fn: WriteFn, read_fn: ReadFn, copy_fn: CopyFn) -> Harness {
        Harness {
            write_fn,
            read_fn,
            copy_fn,
        }
    }

    /// Dispatches to `T`'s own [`Serializer`] implementation.
    pub fn of<T: Serializer>() -> Harness {
        fn write<T: Serializer>(this: &dyn Any, context: &mut WriteContext) -> Result<(), Error> {
            match this.downcast_ref::<T>() {
                Some(value) => context.write_object(value),
                None => Err(cast_error::<T>()),
            }
        }

        fn read<T: Serializer>(context: &mut ReadContext) -> Result<Box<dyn DynObject>, Error> {
            Ok(Box::new(context.read_object::<T>()?))
        }

        fn copy<T: Serializer>(
            this: &dyn Any,
            context: &mut CopyContext,
        ) -> Result<Box<dyn DynObject>, Error> {
            match this.downcast_ref::<T>() {
                Some(value) => Ok(Box::new(context.copy_object(value)?)),
                None => Err(cast_error::<T>()),
            }
        }

        Harness::new(write::<T>, read::<T>, copy::<T>)
    }

    /// Dispatches to the static functions of `S` instead of `T`'s own implementation.
    pub fn custom<T: Serializer, S: CustomSerializer<T>>() -> Harness {
        fn write<T: Serializer, S: CustomSerializer<T>>(
            this: &dyn Any,
            context: &mut WriteContext,
        ) -> Result<(), Error> {
            match this.downcast_ref::<T>() {
                Some(value) => S::write(value, context),
                None => Err(cast_error::<T>()),
            }
        }

        fn read<T: Serializer, S: CustomSerializer<T>>(
            context: &mut ReadContext,
        ) -> Result<Box<dyn DynObject>, Error> {
            Ok(Box::new(S::read(context)?))
        }

        fn copy<T: Serializer, S: CustomSerializer<T>>(
            this: &dyn Any,
            context: &mut CopyContext,
        ) -> Result<Box<dyn DynObject>, Error> {
            match this.downcast_ref::<T>() {
                Some(value) => Ok(Box::new(S::copy(value, context)?)),
                None => Err(cast_error::<T>()),
            }
        }

        Harness::new(write::<T, S>, read::<T, S>, copy::<T, S>)
    }

    #[inline(always)]
    pub fn write(&self, value: &dyn Any, context: &mut WriteContext) -> Result<(), Error> {
        (self.write_fn)(value, context)
    }

    #[inline(always)]
    pub fn read(&self, context: &mut ReadContext) -> Result<Box<dyn DynObject>, Error> {
        (self.read_fn)(context)
    }

    #[inline(always)]
    pub fn copy(
        &self,
        value: &dyn Any,
        context: &mut CopyContext,
    ) -> Result<Box<dyn DynObject>, Error> {
        (self.copy_fn)(value, context)
    }
}

#[cold]
fn cast_error<T>() -> Error {
    Error::type_mismatch(std::any::type_name::<T>(), "value handed to its harness")
}

/// Binding of a Rust type, an id and a serializer.
pub struct Registration {
    id: i32,
    type_id: TypeId,
    type_name: String,
    harness: Harness,
    order: usize,
}

impl Registration {
    /// Registration id; [`NAME_ID`] for types identified by name only.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    /// Position in registration order, used as the import cutoff.
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn is_named(&self) -> bool {
        self.id == NAME_ID
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("order", &self.order)
            .finish()
    }
}

/// Which registrations [`TypeResolver::import_from`] copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportPolicy {
    All,
    None,
    /// Registrations whose [`Registration::order`] is below the cutoff.
    Before(usize),
}

impl ImportPolicy {
    fn admits(&self, order: usize) -> bool {
        match self {
            ImportPolicy::All => true,
            ImportPolicy::None => false,
            ImportPolicy::Before(cutoff) => order < *cutoff,
        }
    }
}

lazy_static! {
    static ref BASE_RESOLVER: TypeResolver = TypeResolver::with_builtins();
}

/// Registry of one engine.
///
/// Registrations are shared through `Arc`, so cloning a resolver is cheap and a
/// frozen resolver can seed any number of engines.
#[derive(Clone)]
pub struct TypeResolver {
    by_id: HashMap<i32, Arc<Registration>>,
    by_type: HashMap<TypeId, Arc<Registration>>,
    by_name: HashMap<String, Arc<Registration>>,
    default_harnesses: HashMap<TypeId, Harness>,
    default_names: HashMap<String, TypeId>,
    next_id: i32,
    next_order: usize,
}

impl Default for TypeResolver {
    fn default() -> Self {
        TypeResolver::base()
    }
}

impl TypeResolver {
    /// A resolver without any registration, built-ins included.
    pub fn empty() -> TypeResolver {
        TypeResolver {
            by_id: HashMap::new(),
            by_type: HashMap::new(),
            by_name: HashMap::new(),
            default_harnesses: HashMap::new(),
            default_names: HashMap::new(),
            next_id: 0,
            next_order: 0,
        }
    }

    /// A copy of the process-wide base resolver holding the built-in types.
    pub fn base() -> TypeResolver {
        BASE_RESOLVER.clone()
    }

    fn with_builtins() -> TypeResolver {
        let mut resolver = TypeResolver::empty();
        resolver.insert_builtin::<bool>();
        resolver.insert_builtin::<i8>();
        resolver.insert_builtin::<i16>();
        resolver.insert_builtin::<i32>();
        resolver.insert_builtin::<i64>();
        resolver.insert_builtin::<u8>();
        resolver.insert_builtin::<u16>();
        resolver.insert_builtin::<u32>();
        resolver.insert_builtin::<u64>();
        resolver.insert_builtin::<f32>();
        resolver.insert_builtin::<f64>();
        resolver.insert_builtin::<char>();
        resolver.insert_builtin::<String>();
        resolver
    }

    fn insert_builtin<T: Serializer>(&mut self) {
        self.insert(TypeId::of::<T>(), T::knot_type_name().to_string(), None, Harness::of::<T>());
    }

    /// Registers `T` under the next free id, or re-registers it in place.
    pub fn register<T: Serializer>(&mut self) -> Result<Arc<Registration>, Error> {
        Ok(self.insert(TypeId::of::<T>(), T::knot_type_name().to_string(), None, Harness::of::<T>()))
    }

    /// Registers `T` under `id`. A different type holding `id` loses its registration.
    pub fn register_with_id<T: Serializer>(&mut self, id: i32) -> Result<Arc<Registration>, Error> {
        check_id(id)?;
        Ok(self.insert(
            TypeId::of::<T>(),
            T::knot_type_name().to_string(),
            Some(id),
            Harness::of::<T>(),
        ))
    }

    /// Registers `T` without an id; it is always written by `name`.
    pub fn register_by_name<T: Serializer>(
        &mut self,
        name: impl Into<String>,
    ) -> Result<Arc<Registration>, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_data("type name must not be empty"));
        }
        Ok(self.insert(TypeId::of::<T>(), name, Some(NAME_ID), Harness::of::<T>()))
    }

    /// Registers `T` with the serializer `S` under the next free id.
    pub fn register_serializer<T: Serializer, S: CustomSerializer<T>>(
        &mut self,
    ) -> Result<Arc<Registration>, Error> {
        Ok(self.insert(
            TypeId::of::<T>(),
            T::knot_type_name().to_string(),
            None,
            Harness::custom::<T, S>(),
        ))
    }

    /// Registers `T` with the serializer `S` under `id`.
    pub fn register_serializer_with_id<T: Serializer, S: CustomSerializer<T>>(
        &mut self,
        id: i32,
    ) -> Result<Arc<Registration>, Error> {
        check_id(id)?;
        Ok(self.insert(
            TypeId::of::<T>(),
            T::knot_type_name().to_string(),
            Some(id),
            Harness::custom::<T, S>(),
        ))
    }

    /// Serializer used when `T` is written without a registration in open-world mode.
    pub fn register_default_serializer<T: Serializer, S: CustomSerializer<T>>(&mut self) {
        self.default_harnesses
            .insert(TypeId::of::<T>(), Harness::custom::<T, S>());
        self.default_names
            .insert(T::knot_type_name().to_string(), TypeId::of::<T>());
    }

    fn insert(
        &mut self,
        type_id: TypeId,
        type_name: String,
        id: Option<i32>,
        harness: Harness,
    ) -> Arc<Registration> {
        let existing = self.by_type.get(&type_id).cloned();
        let id = match (id, &existing) {
            (Some(id), _) => id,
            (None, Some(old)) => old.id,
            (None, None) => self.next_free_id(),
        };
        let order = match &existing {
            Some(old) => {
                self.remove(old);
                old.order
            }
            None => {
                self.next_order += 1;
                self.next_order - 1
            }
        };
        if id != NAME_ID {
            if let Some(other) = self.by_id.get(&id).cloned() {
                log::warn!(
                    "id {} moves from {} to {}",
                    id,
                    other.type_name,
                    type_name
                );
                self.remove(&other);
            }
        }
        if let Some(other) = self.by_name.get(&type_name).cloned() {
            log::warn!("name {} now refers to another type", type_name);
            self.remove(&other);
        }
        let registration = Arc::new(Registration {
            id,
            type_id,
            type_name,
            harness,
            order,
        });
        if id != NAME_ID {
            self.by_id.insert(id, registration.clone());
            if id >= self.next_id {
                self.next_id = id.saturating_add(1);
            }
        }
        self.by_type.insert(type_id, registration.clone());
        self.by_name
            .insert(registration.type_name.clone(), registration.clone());
        log::debug!(
            "registered {} with id {}",
            registration.type_name,
            registration.id
        );
        registration
    }

    fn remove(&mut self, registration: &Registration) {
        if registration.id != NAME_ID {
            self.by_id.remove(&registration.id);
        }
        self.by_type.remove(&registration.type_id);
        self.by_name.remove(&registration.type_name);
    }

    fn next_free_id(&self) -> i32 {
        let mut id = self.next_id;
        while self.by_id.contains_key(&id) {
            id += 1;
        }
        id
    }

    /// Transient name-based registration for a type written in open-world mode.
    pub fn implicit_registration(
        &self,
        type_id: TypeId,
        type_name: &str,
        own_harness: Harness,
    ) -> Registration {
        Registration {
            id: NAME_ID,
            type_id,
            type_name: type_name.to_string(),
            harness: self
                .default_harnesses
                .get(&type_id)
                .copied()
                .unwrap_or(own_harness),
            order: usize::MAX,
        }
    }

    /// Resolves a class name read from a stream: any registration under that
    /// name, else a type with a default serializer.
    pub fn resolve_name(&self, name: &str) -> Option<Arc<Registration>> {
        if let Some(registration) = self.by_name.get(name) {
            return Some(registration.clone());
        }
        let type_id = self.default_names.get(name)?;
        let harness = self.default_harnesses.get(type_id)?;
        Some(Arc::new(Registration {
            id: NAME_ID,
            type_id: *type_id,
            type_name: name.to_string(),
            harness: *harness,
            order: usize::MAX,
        }))
    }

    pub fn get<T: 'static>(&self) -> Option<&Arc<Registration>> {
        self.by_type.get(&TypeId::of::<T>())
    }

    pub fn get_by_type(&self, type_id: TypeId) -> Option<&Arc<Registration>> {
        self.by_type.get(&type_id)
    }

    pub fn get_by_id(&self, id: i32) -> Option<&Arc<Registration>> {
        self.by_id.get(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Arc<Registration>> {
        self.by_name.get(name)
    }

    #[inline(always)]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.by_type.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Number of registrations ever made; the next one gets this order.
    pub fn registration_count(&self) -> usize {
        self.next_order
    }

    /// Registrations sorted by registration order.
    pub fn registrations(&self) -> Vec<Arc<Registration>> {
        let mut all: Vec<_> = self.by_type.values().cloned().collect();
        all.sort_by_key(|registration| registration.order);
        all
    }

    /// Copies registrations of `other` admitted by `policy`, keeping their ids.
    /// Types already registered here are left alone.
    pub fn import_from(&mut self, other: &TypeResolver, policy: ImportPolicy) {
        for registration in other.registrations() {
            if !policy.admits(registration.order) || self.contains(registration.type_id) {
                continue;
            }
            self.insert(
                registration.type_id,
                registration.type_name.clone(),
                Some(registration.id),
                registration.harness,
            );
        }
        if policy != ImportPolicy::None {
            for (type_id, harness) in &other.default_harnesses {
                self.default_harnesses.entry(*type_id).or_insert(*harness);
            }
            for (name, type_id) in &other.default_names {
                self.default_names.entry(name.clone()).or_insert(*type_id);
            }
        }
    }
}

fn check_id(id: i32) -> Result<(), Error> {
    if id < 0 {
        return Err(Error::invalid_data(format!(
            "registration id {id} is negative; negative ids are reserved"
        )));
    }
    Ok(())
}
