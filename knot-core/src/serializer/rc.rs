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

//! Shared pointers: the only values tracked by identity.
//!
//! A pointer whose target can be emptied and refilled (`RefCell`, `Mutex`) is
//! published to the reference table before its content is read or copied, so
//! a cycle back to it resolves to the same allocation.

use crate::error::Error;
use crate::resolver::context::{CopyContext, ReadContext, WriteContext};
use crate::serializer::{DynObject, KnotDefault, Serializer};
use crate::types::RefRead;
use std::rc::Rc;

macro_rules! impl_shared_pointer {
    ($ptr:ident) => {
        paste::paste! {
            fn [<read_ $ptr:lower>]<T: Serializer>(
                context: &mut ReadContext,
                nullable: bool,
            ) -> Result<Option<$ptr<T>>, Error> {
                match context.read_ref_or_null(nullable)? {
                    RefRead::Null => Ok(None),
                    RefRead::Value => Ok(Some($ptr::new(context.read_object::<T>()?))),
                    RefRead::Existing(id) => context.ref_reader.[<get_ $ptr:lower>]::<T>(id).map(Some),
                    RefRead::New(id) => {
                        let shared = match T::knot_shell() {
                            Some(shell) => {
                                let shared = $ptr::new(shell);
                                context.ref_reader.[<set_ $ptr:lower>](id, shared.clone())?;
                                let filled = context.read_object::<T>()?;
                                T::knot_fill(&shared, filled)?;
                                shared
                            }
                            None => {
                                let shared = $ptr::new(context.read_object::<T>()?);
                                context.ref_reader.[<set_ $ptr:lower>](id, shared.clone())?;
                                shared
                            }
                        };
                        Ok(Some(shared))
                    }
                }
            }

            impl<T: Serializer> Serializer for $ptr<T> {
                fn knot_write(&self, context: &mut WriteContext) -> Result<(), Error> {
                    if context.write_ref_or_null(Some(self), false)? {
                        Self::knot_write_data(self, context)?;
                    }
                    Ok(())
                }

                fn knot_write_nullable(
                    value: Option<&Self>,
                    context: &mut WriteContext,
                ) -> Result<(), Error> {
                    match value {
                        Some(shared) if context.write_ref_or_null(value, true)? => {
                            Self::knot_write_data(shared, context)
                        }
                        Some(_) => Ok(()),
                        None => context.write_ref_or_null(value, true).map(|_| ()),
                    }
                }

                fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
                    context.write_object::<T>(self)
                }

                fn knot_read(context: &mut ReadContext) -> Result<Self, Error> {
                    [<read_ $ptr:lower>](context, false)?.ok_or_else(|| {
                        Error::invalid_data(format!(
                            "null {} in a slot that cannot be empty",
                            Self::knot_type_name()
                        ))
                    })
                }

                fn knot_read_nullable(context: &mut ReadContext) -> Result<Option<Self>, Error> {
                    [<read_ $ptr:lower>](context, true)
                }

                fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
                    context.read_object::<T>().map($ptr::new)
                }

                fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error> {
                    if context.aliases_nested() {
                        return Ok(self.clone());
                    }
                    if let Some(copy) = context.refs.[<get_ $ptr:lower>](self)? {
                        return Ok(copy);
                    }
                    let copy = match T::knot_shell() {
                        Some(shell) => {
                            let copy = $ptr::new(shell);
                            context.refs.[<insert_ $ptr:lower>](self, copy.clone());
                            let filled = context.copy_object::<T>(self)?;
                            T::knot_fill(&copy, filled)?;
                            copy
                        }
                        None => {
                            let copy = $ptr::new(context.copy_object::<T>(self)?);
                            context.refs.[<insert_ $ptr:lower>](self, copy.clone());
                            copy
                        }
                    };
                    Ok(copy)
                }

                #[inline(always)]
                fn knot_tracks_refs() -> bool {
                    true
                }
            }

            impl<T: KnotDefault> KnotDefault for $ptr<T> {
                fn knot_default() -> Self {
                    $ptr::new(T::knot_default())
                }
            }
        }
    };
}

pub(crate) use impl_shared_pointer;

impl_shared_pointer!(Rc);

fn read_dyn_rc(
    context: &mut ReadContext,
    nullable: bool,
) -> Result<Option<Rc<dyn DynObject>>, Error> {
    match context.read_ref_or_null(nullable)? {
        RefRead::Null => Ok(None),
        RefRead::Value => Ok(context.read_class_and_object()?.map(Rc::from)),
        RefRead::Existing(id) => context.ref_reader.get_dyn_rc(id).map(Some),
        RefRead::New(id) => {
            let shared: Rc<dyn DynObject> = match context.read_class_and_object()? {
                Some(value) => Rc::from(value),
                None => {
                    return Err(Error::invalid_data(format!(
                        "null class tag behind reference {id}"
                    )))
                }
            };
            context.ref_reader.set(id, shared.clone())?;
            Ok(Some(shared))
        }
    }
}

/// Shared object of a type known only at runtime: reference tag, class tag, data.
impl Serializer for Rc<dyn DynObject> {
    fn knot_write(&self, context: &mut WriteContext) -> Result<(), Error> {
        if context.write_ref_or_null(Some(self), false)? {
            Self::knot_write_data(self, context)?;
        }
        Ok(())
    }

    fn knot_write_nullable(value: Option<&Self>, context: &mut WriteContext) -> Result<(), Error> {
        match value {
            Some(shared) if context.write_ref_or_null(value, true)? => {
                Self::knot_write_data(shared, context)
            }
            Some(_) => Ok(()),
            None => context.write_ref_or_null(value, true).map(|_| ()),
        }
    }

    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        context.write_class_and_object(Some(&**self))
    }

    fn knot_read(context: &mut ReadContext) -> Result<Self, Error> {
        read_dyn_rc(context, false)?
            .ok_or_else(|| Error::invalid_data("null Rc<dyn DynObject> in a slot that cannot be empty"))
    }

    fn knot_read_nullable(context: &mut ReadContext) -> Result<Option<Self>, Error> {
        read_dyn_rc(context, true)
    }

    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        match context.read_class_and_object()? {
            Some(value) => Ok(Rc::from(value)),
            None => Err(Error::invalid_data("null class tag for Rc<dyn DynObject>")),
        }
    }

    fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error> {
        if context.aliases_nested() {
            return Ok(self.clone());
        }
        if let Some(copy) = context.refs.get_dyn_rc(self)? {
            return Ok(copy);
        }
        let copy: Rc<dyn DynObject> = Rc::from(context.copy_dyn(&**self)?);
        context.refs.insert(self, copy.clone());
        Ok(copy)
    }

    #[inline(always)]
    fn knot_tracks_refs() -> bool {
        true
    }
}

impl KnotDefault for Rc<dyn DynObject> {
    fn knot_default() -> Self {
        Rc::new(())
    }
}
