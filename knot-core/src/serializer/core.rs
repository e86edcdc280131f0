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

use crate::error::Error;
use crate::resolver::context::{CopyContext, ReadContext, WriteContext};
use crate::resolver::type_resolver::Harness;
use crate::types::RefFlag;
use std::any::Any;
use std::rc::Rc;

/// Placeholder values for objects whose real content is read after their
/// identity has been published.
pub trait KnotDefault: Sized {
    fn knot_default() -> Self;
}

pub trait Serializer: Sized + 'static {
    /// Writes the object's content, without any framing.
    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error>;

    /// Reads what [`Serializer::knot_write_data`] wrote.
    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error>;

    /// Duplicates the object, routing nested objects through `context`.
    fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error>;

    /// Entry point for a slot that always holds a value.
    ///
    /// Plain values write their data only; shared pointers override this to
    /// write a reference tag first.
    #[inline(always)]
    fn knot_write(&self, context: &mut WriteContext) -> Result<(), Error> {
        self.knot_write_data(context)
    }

    #[inline(always)]
    fn knot_read(context: &mut ReadContext) -> Result<Self, Error> {
        Self::knot_read_data(context)
    }

    /// Entry point for a slot that may be empty (`Option<Self>`): a `0`/`1`
    /// flag, then the value.
    fn knot_write_nullable(value: Option<&Self>, context: &mut WriteContext) -> Result<(), Error> {
        match value {
            None => {
                context.writer.write_var_u32(RefFlag::Null.into())?;
                Ok(())
            }
            Some(value) => {
                context.writer.write_var_u32(RefFlag::NotNull.into())?;
                value.knot_write(context)
            }
        }
    }

    fn knot_read_nullable(context: &mut ReadContext) -> Result<Option<Self>, Error> {
        let flag = context.reader.read_var_u32()?;
        match RefFlag::try_from(flag) {
            Ok(RefFlag::Null) => Ok(None),
            Ok(RefFlag::NotNull) => Self::knot_read(context).map(Some),
            Err(_) => Err(Error::invalid_data(format!(
                "null flag {flag} in front of a {}",
                Self::knot_type_name()
            ))),
        }
    }

    /// Whether the type is tracked by identity when references are enabled.
    #[inline(always)]
    fn knot_tracks_refs() -> bool {
        false
    }

    /// Whether closed-world mode rejects the type when it is not registered.
    #[inline(always)]
    fn knot_requires_registration() -> bool {
        false
    }

    fn knot_type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// An empty object that can be shared before its content is known, for types
    /// with interior mutability. Cycles through a shared pointer resolve to it.
    #[inline(always)]
    fn knot_shell() -> Option<Self> {
        None
    }

    /// Moves the content of `filled` into a shell made by [`Serializer::knot_shell`].
    fn knot_fill(&self, _filled: Self) -> Result<(), Error> {
        Err(Error::unsupported(format!(
            "{} cannot be filled in place",
            Self::knot_type_name()
        )))
    }
}

/// Object of a type known only at runtime.
pub trait DynObject: Any {
    fn as_any(&self) -> &dyn Any;

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;

    fn knot_dyn_type_name(&self) -> &'static str;

    fn knot_dyn_harness(&self) -> Harness;
}

impl<T: Serializer> DynObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn knot_dyn_type_name(&self) -> &'static str {
        T::knot_type_name()
    }

    fn knot_dyn_harness(&self) -> Harness {
        Harness::of::<T>()
    }
}

impl dyn DynObject {
    pub fn is<T: 'static>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Converts a shared runtime-typed object back to its concrete type.
pub fn downcast_rc<T: 'static>(value: Rc<dyn DynObject>) -> Result<Rc<T>, Rc<dyn DynObject>> {
    DynObject::into_any_rc(value.clone())
        .downcast::<T>()
        .map_err(|_| value)
}

/// Serializer registered in place of `T`'s own implementation.
///
/// It takes effect wherever `T` is written through the registry, i.e. behind
/// `Box<dyn DynObject>` and `Rc<dyn DynObject>`.
pub trait CustomSerializer<T: Serializer>: 'static {
    fn write(value: &T, context: &mut WriteContext) -> Result<(), Error>;

    fn read(context: &mut ReadContext) -> Result<T, Error>;

    fn copy(value: &T, context: &mut CopyContext) -> Result<T, Error> {
        context.copy_object(value)
    }
}
