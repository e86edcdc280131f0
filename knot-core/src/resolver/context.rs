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

//! Per-operation state of one write, read or copy.
//!
//! [`Knot`](crate::Knot) builds a context for every operation around a pooled
//! buffer. The reference tables, the graph context and the continuation stack
//! die with it; only the buffer goes back to the pool, and the class-name
//! tables are handed back to the engine when it does not reset between calls.

use crate::buffer::{Reader, Writer};
use crate::config::Config;
use crate::continuation::{Continuation, Progress};
use crate::error::Error;
use crate::resolver::ref_resolver::{CopyRefs, RefReader, RefWriter, Tracked};
use crate::resolver::type_resolver::{Registration, TypeResolver};
use crate::serializer::{DynObject, Serializer};
use crate::types::{ClassFlag, RefRead, CLASS_ID_OFFSET};
use lazy_static::lazy_static;
use std::any::{Any, TypeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

lazy_static! {
    /// Resolver of contexts built outside an engine.
    static ref DETACHED: Arc<TypeResolver> = Arc::new(TypeResolver::empty());
}

#[inline(always)]
fn field_segment(field: &str, owner: &str) -> String {
    format!("{field} ({owner})")
}

/// Values serializers share while one graph is processed, by key.
#[derive(Default)]
pub struct GraphContext {
    values: HashMap<String, Box<dyn Any>>,
}

impl GraphContext {
    /// Stores `value` under `key`, replacing any earlier value.
    pub fn insert<T: 'static>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// The value under `key`, if there is one of type `T`.
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|value| value.downcast_ref::<T>())
    }

    pub fn get_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.values
            .get_mut(key)
            .and_then(|value| value.downcast_mut::<T>())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Class names a writer has introduced, with the name id each was given.
#[derive(Default)]
pub struct WriteClassNames {
    ids: HashMap<TypeId, u32>,
    implicit: HashMap<TypeId, Arc<Registration>>,
}

impl WriteClassNames {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Registrations a reader has resolved by name, indexed by name id.
#[derive(Default)]
pub struct ReadClassNames {
    names: Vec<Arc<Registration>>,
}

impl ReadClassNames {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// State of one write.
///
/// The reference table holds `Rc`s of the caller's graph, so a context stays
/// on the thread that built it:
///
/// ```compile_fail
/// fn assert_send<T: Send>() {}
/// assert_send::<knot_core::WriteContext>();
/// ```
pub struct WriteContext {
    pub writer: Writer,
    pub ref_writer: RefWriter,
    type_resolver: Arc<TypeResolver>,
    config: Config,
    class_names: WriteClassNames,
    graph: GraphContext,
    continuations: Vec<Box<dyn Continuation>>,
    defer_root: bool,
    depth: u32,
}

impl Default for WriteContext {
    fn default() -> Self {
        WriteContext::new(Writer::default())
    }
}

impl WriteContext {
    pub fn new(writer: Writer) -> WriteContext {
        WriteContext {
            writer,
            ref_writer: RefWriter::new(),
            type_resolver: DETACHED.clone(),
            config: Config::default(),
            class_names: WriteClassNames::default(),
            graph: GraphContext::default(),
            continuations: Vec::new(),
            defer_root: false,
            depth: 0,
        }
    }

    /// Binds the context to an engine's registry and configuration.
    pub fn attach(&mut self, type_resolver: &Arc<TypeResolver>, config: &Config) {
        self.type_resolver = type_resolver.clone();
        self.config = config.clone();
    }

    /// Continues the class-name numbering of earlier graphs.
    pub fn retain_class_names(&mut self, class_names: WriteClassNames) {
        self.class_names = class_names;
    }

    pub fn take_class_names(&mut self) -> WriteClassNames {
        std::mem::take(&mut self.class_names)
    }

    /// Ends the operation, keeping only the buffer.
    pub fn into_writer(self) -> Writer {
        self.writer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn type_resolver(&self) -> &TypeResolver {
        &self.type_resolver
    }

    pub fn graph_context(&self) -> &GraphContext {
        &self.graph
    }

    pub fn graph_context_mut(&mut self) -> &mut GraphContext {
        &mut self.graph
    }

    #[inline(always)]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Continuations pushed by the next root object stay queued for
    /// [`WriteContext::step`] instead of being drained on return.
    pub(crate) fn defer_root_continuations(&mut self) {
        self.defer_root = true;
    }

    fn enter<T: Serializer>(&mut self) -> Result<(), Error> {
        if self.depth >= self.config.max_depth {
            return Err(Error::depth_exceed(format!(
                "maximum depth {} exceeded while writing {}",
                self.config.max_depth,
                T::knot_type_name()
            )));
        }
        if self.config.registration_required
            && T::knot_requires_registration()
            && !self.type_resolver.contains(TypeId::of::<T>())
        {
            return Err(Error::unregistered_class(T::knot_type_name()));
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T: Serializer>(
        &mut self,
        write: impl FnOnce(&mut Self) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let defer = std::mem::take(&mut self.defer_root) && self.depth == 0;
        self.enter::<T>()?;
        let height = self.continuations.len();
        let result = write(self);
        self.depth -= 1;
        result?;
        if !defer {
            self.drain(height)?;
        }
        Ok(())
    }

    /// Writes one node of the graph through `T`'s serializer.
    ///
    /// Continuations the node pushed are drained before this returns, so the
    /// bytes they produce directly follow the node's own.
    pub fn write_object<T: Serializer>(&mut self, value: &T) -> Result<(), Error> {
        self.nested::<T>(|context| value.knot_write(context))
    }

    /// Writes a slot that may hold no value.
    pub fn write_nullable<T: Serializer>(&mut self, value: Option<&T>) -> Result<(), Error> {
        self.nested::<T>(|context| T::knot_write_nullable(value, context))
    }

    /// [`WriteContext::write_object`] with `field (owner)` added to the trace of any error.
    pub fn write_field<T: Serializer>(
        &mut self,
        value: &T,
        field: &str,
        owner: &str,
    ) -> Result<(), Error> {
        self.write_object(value)
            .map_err(|err| err.with_trace(field_segment(field, owner)))
    }

    /// Writes the reference tag for `shared` (`None` is null).
    /// Returns whether the object's data must follow.
    pub fn write_ref_or_null<P: Tracked>(
        &mut self,
        shared: Option<&P>,
        nullable: bool,
    ) -> Result<bool, Error> {
        let decision = self.ref_writer.decide(shared, self.config.references);
        RefWriter::write_tag(&mut self.writer, decision, nullable)
    }

    /// Writes the class tag of `value`, `0` for `None`. Returns the registration
    /// whose serializer must write the object.
    pub fn write_class(
        &mut self,
        value: Option<&dyn DynObject>,
    ) -> Result<Option<Arc<Registration>>, Error> {
        let Some(value) = value else {
            self.writer.write_var_u32(ClassFlag::Null.into())?;
            return Ok(None);
        };
        let type_id = value.as_any().type_id();
        let registration = match self.type_resolver.get_by_type(type_id) {
            Some(registration) => registration.clone(),
            None => self.implicit_registration(value)?,
        };
        if registration.is_named() {
            self.writer.write_var_u32(ClassFlag::Name.into())?;
            let next = self.class_names.ids.len() as u32;
            match self.class_names.ids.entry(type_id) {
                Entry::Occupied(entry) => {
                    self.writer.write_var_u32(*entry.get())?;
                }
                Entry::Vacant(entry) => {
                    entry.insert(next);
                    self.writer.write_var_u32(next)?;
                    self.writer.write_str(registration.type_name())?;
                }
            }
            log::trace!("class {} by name", registration.type_name());
        } else {
            self.writer
                .write_var_u32(registration.id() as u32 + CLASS_ID_OFFSET)?;
            log::trace!("class {} as id {}", registration.type_name(), registration.id());
        }
        Ok(Some(registration))
    }

    fn implicit_registration(&mut self, value: &dyn DynObject) -> Result<Arc<Registration>, Error> {
        let type_id = value.as_any().type_id();
        if self.config.registration_required {
            return Err(Error::unregistered_class(value.knot_dyn_type_name()));
        }
        if let Some(registration) = self.class_names.implicit.get(&type_id) {
            return Ok(registration.clone());
        }
        let registration = Arc::new(self.type_resolver.implicit_registration(
            type_id,
            value.knot_dyn_type_name(),
            value.knot_dyn_harness(),
        ));
        log::debug!("implicit registration of {}", registration.type_name());
        self.class_names.implicit.insert(type_id, registration.clone());
        Ok(registration)
    }

    /// Writes the class tag of `value` followed by its data.
    pub fn write_class_and_object(&mut self, value: Option<&dyn DynObject>) -> Result<(), Error> {
        if let (Some(registration), Some(value)) = (self.write_class(value)?, value) {
            registration.harness().write(value.as_any(), self)?;
        }
        Ok(())
    }

    pub fn push_continuation(&mut self, continuation: Box<dyn Continuation>) {
        self.continuations.push(continuation);
    }

    pub fn pending_continuations(&self) -> usize {
        self.continuations.len()
    }

    /// Runs one step of the most recently pushed continuation.
    ///
    /// A continuation that is not done goes back to its old position, below
    /// whatever it pushed during the step.
    pub fn step(&mut self) -> Result<Progress, Error> {
        let Some(mut continuation) = self.continuations.pop() else {
            return Ok(Progress::Done);
        };
        let index = self.continuations.len();
        log::trace!("continuation step at stack height {index}");
        match continuation.process_write(self)? {
            Progress::Pending => {
                self.continuations.insert(index, continuation);
                Ok(Progress::Pending)
            }
            Progress::Done => Ok(Progress::Done),
        }
    }

    /// Steps continuations until the stack is back to `height`.
    pub fn drain(&mut self, height: usize) -> Result<(), Error> {
        while self.continuations.len() > height {
            self.step()?;
        }
        Ok(())
    }
}

/// State of one read; like [`WriteContext`], it never leaves its thread.
///
/// ```compile_fail
/// fn assert_send<T: Send>() {}
/// assert_send::<knot_core::ReadContext>();
/// ```
pub struct ReadContext {
    pub reader: Reader,
    pub ref_reader: RefReader,
    type_resolver: Arc<TypeResolver>,
    config: Config,
    class_names: ReadClassNames,
    graph: GraphContext,
    depth: u32,
}

impl Default for ReadContext {
    fn default() -> Self {
        ReadContext::new(Reader::default())
    }
}

impl ReadContext {
    pub fn new(reader: Reader) -> ReadContext {
        ReadContext {
            reader,
            ref_reader: RefReader::new(),
            type_resolver: DETACHED.clone(),
            config: Config::default(),
            class_names: ReadClassNames::default(),
            graph: GraphContext::default(),
            depth: 0,
        }
    }

    pub fn attach(&mut self, type_resolver: &Arc<TypeResolver>, config: &Config) {
        self.type_resolver = type_resolver.clone();
        self.config = config.clone();
    }

    pub fn retain_class_names(&mut self, class_names: ReadClassNames) {
        self.class_names = class_names;
    }

    pub fn take_class_names(&mut self) -> ReadClassNames {
        std::mem::take(&mut self.class_names)
    }

    pub fn into_reader(self) -> Reader {
        self.reader
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn type_resolver(&self) -> &TypeResolver {
        &self.type_resolver
    }

    pub fn graph_context(&self) -> &GraphContext {
        &self.graph
    }

    pub fn graph_context_mut(&mut self) -> &mut GraphContext {
        &mut self.graph
    }

    #[inline(always)]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    fn nested<T: Serializer, R>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<R, Error>,
    ) -> Result<R, Error> {
        if self.depth >= self.config.max_depth {
            return Err(Error::depth_exceed(format!(
                "maximum depth {} exceeded while reading {}",
                self.config.max_depth,
                T::knot_type_name()
            )));
        }
        if self.config.registration_required
            && T::knot_requires_registration()
            && !self.type_resolver.contains(TypeId::of::<T>())
        {
            return Err(Error::unregistered_class(T::knot_type_name()));
        }
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }

    pub fn read_object<T: Serializer>(&mut self) -> Result<T, Error> {
        self.nested::<T, _>(T::knot_read)
    }

    pub fn read_nullable<T: Serializer>(&mut self) -> Result<Option<T>, Error> {
        self.nested::<T, _>(T::knot_read_nullable)
    }

    pub fn read_field<T: Serializer>(&mut self, field: &str, owner: &str) -> Result<T, Error> {
        self.read_object()
            .map_err(|err| err.with_trace(field_segment(field, owner)))
    }

    pub fn read_ref_or_null(&mut self, nullable: bool) -> Result<RefRead, Error> {
        self.ref_reader
            .read_tag(&mut self.reader, self.config.references, nullable)
    }

    pub fn read_class(&mut self) -> Result<Option<Arc<Registration>>, Error> {
        let tag = self.reader.read_var_u32()?;
        match ClassFlag::try_from(tag) {
            Ok(ClassFlag::Null) => Ok(None),
            Ok(ClassFlag::Name) => self.read_class_name().map(Some),
            Err(_) => {
                let id = (tag - CLASS_ID_OFFSET) as i32;
                match self.type_resolver.get_by_id(id) {
                    Some(registration) => Ok(Some(registration.clone())),
                    None => Err(Error::unregistered_class(format!(
                        "no registration for class id {id}"
                    ))),
                }
            }
        }
    }

    fn read_class_name(&mut self) -> Result<Arc<Registration>, Error> {
        let name_id = self.reader.read_var_u32()? as usize;
        if let Some(registration) = self.class_names.names.get(name_id) {
            return Ok(registration.clone());
        }
        if name_id != self.class_names.len() {
            return Err(Error::invalid_data(format!(
                "class name id {name_id} skips ahead of the {} name(s) read so far",
                self.class_names.len()
            )));
        }
        let name = self.reader.read_str()?;
        let registration = self
            .type_resolver
            .resolve_name(&name)
            .ok_or_else(|| Error::unknown_class(name))?;
        self.class_names.names.push(registration.clone());
        Ok(registration)
    }

    /// Reads a class tag and the object it introduces; `None` for a null tag.
    pub fn read_class_and_object(&mut self) -> Result<Option<Box<dyn DynObject>>, Error> {
        match self.read_class()? {
            Some(registration) => registration.harness().read(self).map(Some),
            None => Ok(None),
        }
    }
}

/// State of one copy; like [`WriteContext`], it never leaves its thread.
///
/// ```compile_fail
/// fn assert_send<T: Send>() {}
/// assert_send::<knot_core::CopyContext>();
/// ```
pub struct CopyContext {
    pub refs: CopyRefs,
    type_resolver: Arc<TypeResolver>,
    config: Config,
    graph: GraphContext,
    shallow: bool,
    depth: u32,
}

impl CopyContext {
    pub fn new(type_resolver: &Arc<TypeResolver>, config: &Config, shallow: bool) -> CopyContext {
        CopyContext {
            refs: CopyRefs::new(),
            type_resolver: type_resolver.clone(),
            config: config.clone(),
            graph: GraphContext::default(),
            shallow,
            depth: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph_context(&self) -> &GraphContext {
        &self.graph
    }

    pub fn graph_context_mut(&mut self) -> &mut GraphContext {
        &mut self.graph
    }

    pub fn is_shallow(&self) -> bool {
        self.shallow
    }

    #[inline(always)]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Whether shared pointers met at this depth are aliased instead of copied:
    /// true below the root of a shallow copy.
    #[inline(always)]
    pub fn aliases_nested(&self) -> bool {
        self.shallow && self.depth > 1
    }

    pub fn copy_object<T: Serializer>(&mut self, value: &T) -> Result<T, Error> {
        if self.depth >= self.config.max_depth {
            return Err(Error::depth_exceed(format!(
                "maximum depth {} exceeded while copying {}",
                self.config.max_depth,
                T::knot_type_name()
            )));
        }
        self.depth += 1;
        let result = value.knot_copy(self);
        self.depth -= 1;
        result
    }

    pub fn copy_field<T: Serializer>(
        &mut self,
        value: &T,
        field: &str,
        owner: &str,
    ) -> Result<T, Error> {
        self.copy_object(value)
            .map_err(|err| err.with_trace(field_segment(field, owner)))
    }

    /// Copies a value of a type known only at runtime, through the registered
    /// serializer when there is one.
    pub fn copy_dyn(&mut self, value: &dyn DynObject) -> Result<Box<dyn DynObject>, Error> {
        let harness = match self.type_resolver.get_by_type(value.as_any().type_id()) {
            Some(registration) => *registration.harness(),
            None => value.knot_dyn_harness(),
        };
        harness.copy(value.as_any(), self)
    }
}
