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

impl<T: Serializer> Serializer for Option<T> {
    #[inline(always)]
    fn knot_write(&self, context: &mut WriteContext) -> Result<(), Error> {
        context.write_nullable(self.as_ref())
    }

    #[inline(always)]
    fn knot_read(context: &mut ReadContext) -> Result<Self, Error> {
        context.read_nullable()
    }

    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        match self {
            Some(value) => value.knot_write_data(context),
            None => Err(Error::invalid_data(format!(
                "no data to write for an empty {}",
                Self::knot_type_name()
            ))),
        }
    }

    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        T::knot_read_data(context).map(Some)
    }

    fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error> {
        match self {
            Some(value) => context.copy_object(value).map(Some),
            None => Ok(None),
        }
    }
}

impl<T> KnotDefault for Option<T> {
    fn knot_default() -> Self {
        None
    }
}
