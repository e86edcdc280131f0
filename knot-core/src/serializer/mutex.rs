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
use std::sync::{Mutex, MutexGuard};

fn lock<T: Serializer>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, Error> {
    mutex
        .lock()
        .map_err(|_| Error::invalid_data(format!("Mutex<{}> is poisoned", T::knot_type_name())))
}

impl<T: Serializer + KnotDefault> Serializer for Mutex<T> {
    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        context.write_object::<T>(&*lock(self)?)
    }

    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        context.read_object::<T>().map(Mutex::new)
    }

    fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error> {
        context.copy_object::<T>(&*lock(self)?).map(Mutex::new)
    }

    fn knot_shell() -> Option<Self> {
        Some(Mutex::new(T::knot_default()))
    }

    fn knot_fill(&self, filled: Self) -> Result<(), Error> {
        let value = filled
            .into_inner()
            .map_err(|_| Error::invalid_data("filled Mutex is poisoned"))?;
        *lock(self)? = value;
        Ok(())
    }
}

impl<T: KnotDefault> KnotDefault for Mutex<T> {
    fn knot_default() -> Self {
        Mutex::new(T::knot_default())
    }
}
