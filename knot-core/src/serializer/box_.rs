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
use crate::serializer::{KnotDefault, Serializer};

/// Boxing is invisible on the wire.
impl<T: Serializer> Serializer for Box<T> {
    #[inline(always)]
    fn knot_write(&self, context: &mut WriteContext) -> Result<(), Error> {
        context.write_object::<T>(self)
    }

    #[inline(always)]
    fn knot_read(context: &mut ReadContext) -> Result<Self, Error> {
        context.read_object::<T>().map(Box::new)
    }

    fn knot_write_nullable(value: Option<&Self>, context: &mut WriteContext) -> Result<(), Error> {
        context.write_nullable::<T>(value.map(|boxed| &**boxed))
    }

    fn knot_read_nullable(context: &mut ReadContext) -> Result<Option<Self>, Error> {
        Ok(context.read_nullable::<T>()?.map(Box::new))
    }

    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        T::knot_write_data(self, context)
    }

    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        T::knot_read_data(context).map(Box::new)
    }

    fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error> {
        context.copy_object::<T>(self).map(Box::new)
    }

    fn knot_tracks_refs() -> bool {
        T::knot_tracks_refs()
    }
}

impl<T: KnotDefault> KnotDefault for Box<T> {
    fn knot_default() -> Self {
        Box::new(T::knot_default())
    }
}
