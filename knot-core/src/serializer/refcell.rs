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
use std::cell::{Ref, RefCell};

fn borrow<T: Serializer>(cell: &RefCell<T>) -> Result<Ref<'_, T>, Error> {
    cell.try_borrow().map_err(|_| {
        Error::invalid_data(format!(
            "RefCell<{}> is mutably borrowed",
            T::knot_type_name()
        ))
    })
}

impl<T: Serializer + KnotDefault> Serializer for RefCell<T> {
    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        context.write_object::<T>(&*borrow(self)?)
    }

    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        context.read_object::<T>().map(RefCell::new)
    }

    fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error> {
        context.copy_object::<T>(&*borrow(self)?).map(RefCell::new)
    }

    fn knot_shell() -> Option<Self> {
        Some(RefCell::new(T::knot_default()))
    }

    fn knot_fill(&self, filled: Self) -> Result<(), Error> {
        let mut slot = self.try_borrow_mut().map_err(|_| {
            Error::invalid_data(format!(
                "RefCell<{}> is borrowed while being filled",
                T::knot_type_name()
            ))
        })?;
        *slot = filled.into_inner();
        Ok(())
    }
}

impl<T: KnotDefault> KnotDefault for RefCell<T> {
    fn knot_default() -> Self {
        RefCell::new(T::knot_default())
    }
}
