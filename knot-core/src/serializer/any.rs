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
use crate::serializer::{DynObject, KnotDefault, Serializer};

/// Owned object of a type known only at runtime: class tag, then data.
/// The class tag `0` doubles as the null flag.
impl Serializer for Box<dyn DynObject> {
    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        context.write_class_and_object(Some(&**self))
    }

    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        context
            .read_class_and_object()?
            .ok_or_else(|| Error::invalid_data("null class tag for Box<dyn DynObject>"))
    }

    fn knot_write_nullable(value: Option<&Self>, context: &mut WriteContext) -> Result<(), Error> {
        context.write_class_and_object(value.map(|boxed| &**boxed))
    }

    fn knot_read_nullable(context: &mut ReadContext) -> Result<Option<Self>, Error> {
        context.read_class_and_object()
    }

    fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error> {
        context.copy_dyn(&**self)
    }
}

impl KnotDefault for Box<dyn DynObject> {
    fn knot_default() -> Self {
        Box::new(())
    }
}
