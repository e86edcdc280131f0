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

use crate::buffer::{Reader, Writer};
use crate::config::Config;
use crate::continuation::Progress;
use crate::error::Error;
use crate::resolver::context::{
    CopyContext, ReadClassNames, ReadContext, WriteClassNames, WriteContext,
};
use crate::resolver::pool::Pool;
use crate::resolver::type_resolver::{ImportPolicy, Registration, TypeResolver};
use crate::serializer::{CustomSerializer, Serializer};
use crate::types::{
    decode_header, encode_header, WireVersion, CURRENT_WIRE_VERSION, HEADER_REFERENCES,
    HEADER_VARIABLE_FLOATS,
};
use crate::util::Spinlock;
use std::sync::Arc;

/// The serialization engine.
///
/// A `Knot` owns a registry, a configuration and pools of buffers. Every
/// operation (`serialize`, `deserialize`, `copy`, ...) is synchronous and
/// independent; the reference table lives for one call only, and so does the
/// class-name table unless [`Knot::auto_reset`] is disabled.
///
/// # Examples
///
/// ```rust
/// use knot_core::Knot;
/// use std::rc::Rc;
///
/// let knot = Knot::default();
/// let shared = Rc::new(String::from("shared"));
/// let bytes = knot.serialize(&vec![shared.clone(), shared]).unwrap();
/// let back: Vec<Rc<String>> = knot.deserialize(&bytes).unwrap();
/// assert!(Rc::ptr_eq(&back[0], &back[1]));
/// ```
///
/// Configuration is set through builder methods:
///
/// ```rust
/// use knot_core::Knot;
///
/// let knot = Knot::default()
///     .references(false)
///     .registration_required(true)
///     .max_depth(64);
/// ```
pub struct Knot {
    config: Config,
    type_resolver: Arc<TypeResolver>,
    writer_pool: Pool<Writer>,
    reader_pool: Pool<Reader>,
    write_names: Spinlock<WriteClassNames>,
    read_names: Spinlock<ReadClassNames>,
}

impl Default for Knot {
    fn default() -> Self {
        Knot::with_config(Config::default())
    }
}

fn writer_pool(config: &Config) -> Pool<Writer> {
    let initial = config.initial_buffer_size;
    let max = config.max_buffer_size;
    Pool::new(move || Writer::with_capacity(initial, max))
}

impl Knot {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine with `config` and the built-in registrations.
    pub fn with_config(config: Config) -> Self {
        Knot {
            writer_pool: writer_pool(&config),
            reader_pool: Pool::new(Reader::default),
            type_resolver: Arc::new(TypeResolver::base()),
            write_names: Spinlock::new(WriteClassNames::default()),
            read_names: Spinlock::new(ReadClassNames::default()),
            config,
        }
    }

    /// Enables or disables reference tracking of shared pointers.
    ///
    /// Disabled, a pointer reachable twice is written twice and read back as two
    /// distinct allocations. A cyclic graph then never terminates.
    pub fn references(mut self, references: bool) -> Self {
        self.config.references = references;
        self
    }

    /// Closed-world mode: every derived type must be registered on both sides
    /// and unregistered runtime-typed values are rejected instead of being
    /// written by name.
    pub fn registration_required(mut self, registration_required: bool) -> Self {
        self.config.registration_required = registration_required;
        self
    }

    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Writes `f32`/`f64` as `value * precision` varints where that is lossless.
    pub fn float_precision(mut self, precision: Option<f64>) -> Self {
        self.config.float_precision = precision;
        self
    }

    /// Sizes the pooled output buffers. With `max` set, `serialize` fails with
    /// `BufferOverflow` instead of growing past it.
    pub fn buffer_size(mut self, initial: usize, max: Option<usize>) -> Self {
        self.config.initial_buffer_size = initial;
        self.config.max_buffer_size = max;
        self.writer_pool = writer_pool(&self.config);
        self
    }

    /// With `false`, class names written by one call are referred to by id in
    /// the following ones, until [`Knot::reset`]. Reference tables still start
    /// empty for every graph.
    pub fn auto_reset(mut self, auto_reset: bool) -> Self {
        self.config.auto_reset = auto_reset;
        self
    }

    /// Forgets the class names kept between calls.
    pub fn reset(&self) {
        *self.write_names.lock() = WriteClassNames::default();
        *self.read_names.lock() = ReadClassNames::default();
    }

    /// Shares a frozen registry with other engines.
    pub fn with_type_resolver(mut self, type_resolver: Arc<TypeResolver>) -> Self {
        self.type_resolver = type_resolver;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn type_resolver(&self) -> &TypeResolver {
        &self.type_resolver
    }

    /// The registry as a shareable handle. Registering on this engine afterwards
    /// detaches it from the returned handle.
    pub fn shared_type_resolver(&self) -> Arc<TypeResolver> {
        self.type_resolver.clone()
    }

    /// Replaces the registry, importing this engine's registrations admitted by
    /// `policy` so ids already agreed on stay valid.
    pub fn set_type_resolver(&mut self, mut type_resolver: TypeResolver, policy: ImportPolicy) {
        type_resolver.import_from(&self.type_resolver, policy);
        log::debug!(
            "type resolver replaced, {} registration(s) after import",
            type_resolver.len()
        );
        self.type_resolver = Arc::new(type_resolver);
    }

    fn type_resolver_mut(&mut self) -> &mut TypeResolver {
        Arc::make_mut(&mut self.type_resolver)
    }

    pub fn register<T: Serializer>(&mut self) -> Result<Arc<Registration>, Error> {
        self.type_resolver_mut().register::<T>()
    }

    pub fn register_with_id<T: Serializer>(&mut self, id: i32) -> Result<Arc<Registration>, Error> {
        self.type_resolver_mut().register_with_id::<T>(id)
    }

    pub fn register_by_name<T: Serializer>(
        &mut self,
        name: impl Into<String>,
    ) -> Result<Arc<Registration>, Error> {
        self.type_resolver_mut().register_by_name::<T>(name)
    }

    pub fn register_serializer<T: Serializer, S: CustomSerializer<T>>(
        &mut self,
    ) -> Result<Arc<Registration>, Error> {
        self.type_resolver_mut().register_serializer::<T, S>()
    }

    pub fn register_serializer_with_id<T: Serializer, S: CustomSerializer<T>>(
        &mut self,
        id: i32,
    ) -> Result<Arc<Registration>, Error> {
        self.type_resolver_mut()
            .register_serializer_with_id::<T, S>(id)
    }

    pub fn register_default_serializer<T: Serializer, S: CustomSerializer<T>>(&mut self) {
        self.type_resolver_mut()
            .register_default_serializer::<T, S>()
    }

    fn header_flags(&self) -> u8 {
        let mut flags = 0;
        if self.config.references {
            flags |= HEADER_REFERENCES;
        }
        if self.config.float_precision.is_some() {
            flags |= HEADER_VARIABLE_FLOATS;
        }
        flags
    }

    fn write_header(&self, writer: &mut Writer) -> Result<(), Error> {
        writer.write_u8(encode_header(CURRENT_WIRE_VERSION, self.header_flags()))?;
        if let Some(precision) = self.config.float_precision {
            writer.write_var_f64(precision, 1.0, true)?;
        }
        Ok(())
    }

    fn read_header(&self, reader: &mut Reader) -> Result<(), Error> {
        let (version, flags) = decode_header(reader.read_u8()?);
        if WireVersion::try_from(version).is_err() {
            return Err(Error::invalid_data(format!(
                "unsupported wire version {version}"
            )));
        }
        let expected = self.header_flags();
        if flags & HEADER_REFERENCES != expected & HEADER_REFERENCES {
            return Err(Error::invalid_data(format!(
                "graph written with references {}, reader has references {}",
                flags & HEADER_REFERENCES != 0,
                self.config.references
            )));
        }
        if flags & HEADER_VARIABLE_FLOATS != expected & HEADER_VARIABLE_FLOATS {
            return Err(Error::invalid_data(
                "writer and reader disagree on the float encoding",
            ));
        }
        if let Some(precision) = self.config.float_precision {
            let written = reader.read_var_f64(1.0, true)?;
            if written.to_bits() != precision.to_bits() {
                return Err(Error::invalid_data(format!(
                    "graph written with float precision {written}, reader has {precision}"
                )));
            }
        }
        Ok(())
    }

    fn write_context(&self, writer: Writer) -> WriteContext {
        let mut context = WriteContext::new(writer);
        context.attach(&self.type_resolver, &self.config);
        if !self.config.auto_reset {
            context.retain_class_names(std::mem::take(&mut *self.write_names.lock()));
        }
        context
    }

    /// Keeps the class names of a completed write for the next call. After a
    /// failure the engine starts over from an empty table.
    fn end_write(&self, context: &mut WriteContext, completed: bool) {
        if !self.config.auto_reset && completed {
            *self.write_names.lock() = context.take_class_names();
        }
    }

    fn read_context(&self, reader: Reader) -> ReadContext {
        let mut context = ReadContext::new(reader);
        context.attach(&self.type_resolver, &self.config);
        if !self.config.auto_reset {
            context.retain_class_names(std::mem::take(&mut *self.read_names.lock()));
        }
        context
    }

    fn end_read(&self, context: &mut ReadContext, completed: bool) {
        if !self.config.auto_reset && completed {
            *self.read_names.lock() = context.take_class_names();
        }
    }

    /// Serializes `value` and everything reachable from it.
    pub fn serialize<T: Serializer>(&self, value: &T) -> Result<Vec<u8>, Error> {
        let mut context = self.write_context(self.writer_pool.checkout());
        let result = self
            .serialize_with_context(value, &mut context)
            .map(|_| context.writer.dump());
        self.end_write(&mut context, result.is_ok());
        let mut writer = context.into_writer();
        writer.reset();
        self.writer_pool.checkin(writer);
        result
    }

    /// Serializes into a caller-provided buffer, e.g. one backed by a sink.
    /// The caller flushes or closes `writer` afterwards.
    pub fn serialize_into<T: Serializer>(&self, value: &T, writer: &mut Writer) -> Result<(), Error> {
        let mut context = self.write_context(std::mem::take(writer));
        let result = self.serialize_with_context(value, &mut context);
        self.end_write(&mut context, result.is_ok());
        *writer = context.into_writer();
        result
    }

    pub fn serialize_with_context<T: Serializer>(
        &self,
        value: &T,
        context: &mut WriteContext,
    ) -> Result<(), Error> {
        log::debug!("writing graph of {}", T::knot_type_name());
        self.write_header(&mut context.writer)?;
        context.write_object(value)?;
        log::debug!(
            "wrote {} object(s) by reference, {} byte(s) buffered",
            context.ref_writer.len(),
            context.writer.len()
        );
        Ok(())
    }

    pub fn deserialize<T: Serializer>(&self, bytes: &[u8]) -> Result<T, Error> {
        let mut reader = self.reader_pool.checkout();
        reader.init(bytes);
        let mut context = self.read_context(reader);
        let result = self.deserialize_with_context(&mut context);
        self.end_read(&mut context, result.is_ok());
        let mut reader = context.into_reader();
        reader.reset();
        self.reader_pool.checkin(reader);
        result
    }

    /// Reads one graph from a caller-provided buffer, leaving it positioned
    /// after the graph.
    pub fn deserialize_from<T: Serializer>(&self, reader: &mut Reader) -> Result<T, Error> {
        let mut context = self.read_context(std::mem::take(reader));
        let result = self.deserialize_with_context(&mut context);
        self.end_read(&mut context, result.is_ok());
        *reader = context.into_reader();
        result
    }

    pub fn deserialize_with_context<T: Serializer>(
        &self,
        context: &mut ReadContext,
    ) -> Result<T, Error> {
        log::debug!("reading graph of {}", T::knot_type_name());
        self.read_header(&mut context.reader)?;
        let value = context.read_object::<T>()?;
        log::debug!("read {} object(s) by reference", context.ref_reader.len());
        Ok(value)
    }

    /// Deep copy: shared pointers are duplicated, keeping the graph's topology.
    pub fn copy<T: Serializer>(&self, value: &T) -> Result<T, Error> {
        CopyContext::new(&self.type_resolver, &self.config, false).copy_object(value)
    }

    /// Copies the root only; shared pointers below it alias the original's.
    pub fn copy_shallow<T: Serializer>(&self, value: &T) -> Result<T, Error> {
        CopyContext::new(&self.type_resolver, &self.config, true).copy_object(value)
    }

    /// Starts an incremental write of `value` into `writer`.
    ///
    /// Everything `value` writes eagerly is in `writer` when this returns; the
    /// continuations it pushed run as the session is driven with
    /// [`WriteSession::process_write`]. If the header or the root fails to
    /// write, `writer` keeps the bytes written before the failure.
    pub fn write_session<'a, T: Serializer>(
        &'a self,
        value: &T,
        writer: &'a mut Writer,
    ) -> Result<WriteSession<'a>, Error> {
        let context = self.write_context(std::mem::take(writer));
        let mut session = WriteSession {
            knot: self,
            context,
            target: writer,
            completed: false,
        };
        self.write_header(&mut session.context.writer)?;
        session.context.defer_root_continuations();
        session.context.write_object(value)?;
        Ok(session)
    }
}

/// An incremental write driven by its caller.
///
/// The session works on the caller's writer and puts it back when it is
/// finished or dropped; dropping an unfinished session leaves a partial graph.
pub struct WriteSession<'a> {
    knot: &'a Knot,
    context: WriteContext,
    target: &'a mut Writer,
    completed: bool,
}

impl WriteSession<'_> {
    /// Runs at most `max_steps` continuation steps.
    pub fn process_write(&mut self, max_steps: usize) -> Result<Progress, Error> {
        for _ in 0..max_steps {
            if self.context.pending_continuations() == 0 {
                break;
            }
            self.context.step()?;
        }
        Ok(self.progress())
    }

    pub fn progress(&self) -> Progress {
        if self.context.pending_continuations() == 0 {
            Progress::Done
        } else {
            Progress::Pending
        }
    }

    pub fn writer(&self) -> &Writer {
        &self.context.writer
    }

    /// Writer access between steps, e.g. to flush a sink-backed writer.
    pub fn writer_mut(&mut self) -> &mut Writer {
        &mut self.context.writer
    }

    /// Runs the remaining steps and hands the writer back.
    pub fn finish(mut self) -> Result<(), Error> {
        self.context.drain(0)?;
        self.completed = true;
        Ok(())
    }
}

impl Drop for WriteSession<'_> {
    fn drop(&mut self) {
        self.knot.end_write(&mut self.context, self.completed);
        std::mem::swap(self.target, &mut self.context.writer);
    }
}

/// Engines for concurrent use, one per thread at a time.
pub struct KnotPool {
    pool: Pool<Knot>,
}

impl KnotPool {
    /// `factory` builds and registers a new engine whenever none is idle.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Knot + Send + Sync + 'static,
    {
        KnotPool {
            pool: Pool::new(factory),
        }
    }

    /// Keeps at most `idle_cap` idle engines per pool segment.
    pub fn with_capacity<F>(idle_cap: usize, factory: F) -> Self
    where
        F: Fn() -> Knot + Send + Sync + 'static,
    {
        KnotPool {
            pool: Pool::with_capacity(idle_cap, factory),
        }
    }

    pub fn checkout(&self) -> Knot {
        self.pool.checkout()
    }

    pub fn checkin(&self, knot: Knot) {
        self.pool.checkin(knot)
    }

    /// Runs `handler` with an engine checked out for its duration.
    pub fn with<R>(&self, handler: impl FnOnce(&Knot) -> R) -> R {
        self.pool.borrow_mut(|knot| handler(knot))
    }

    pub fn idle(&self) -> usize {
        self.pool.idle()
    }
}
