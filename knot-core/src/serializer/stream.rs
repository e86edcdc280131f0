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

use crate::continuation::SequenceContinuation;
use crate::error::Error;
use crate::resolver::context::{CopyContext, ReadContext, WriteContext};
use crate::serializer::{KnotDefault, Serializer};
use std::rc::Rc;

type IterFactory<T> = Rc<dyn Fn() -> Box<dyn Iterator<Item = T>>>;

/// A sequence produced on demand, possibly too long to hold in memory.
///
/// Writing pushes a continuation that pulls one item per step, so the items
/// never exist all at once on the write side. Reading collects them into memory.
pub struct Generated<T> {
    factory: IterFactory<T>,
}

impl<T> Clone for Generated<T> {
    fn clone(&self) -> Self {
        Generated {
            factory: self.factory.clone(),
        }
    }
}

impl<T: Serializer> Generated<T> {
    /// `factory` is called once per write, copy or iteration.
    pub fn new<F, I>(factory: F) -> Self
    where
        F: Fn() -> I + 'static,
        I: Iterator<Item = T> + 'static,
    {
        Generated {
            factory: Rc::new(move || Box::new(factory()) as Box<dyn Iterator<Item = T>>),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = T>> {
        (self.factory)()
    }
}

impl<T: Serializer + Clone> Generated<T> {
    pub fn from_vec(items: Vec<T>) -> Self {
        Generated::new(move || items.clone().into_iter())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: Serializer + Clone> Serializer for Generated<T> {
    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        context.push_continuation(Box::new(SequenceContinuation::new(self.iter())));
        Ok(())
    }

    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        let mut items = Vec::new();
        while context.reader.read_bool()? {
            let item = context
                .read_object::<T>()
                .map_err(|err| err.with_trace(format!("[{}]", items.len())))?;
            items.push(item);
        }
        Ok(Generated::from_vec(items))
    }

    fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error> {
        let items = self
            .iter()
            .map(|item| context.copy_object(&item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Generated::from_vec(items))
    }
}

impl<T: Serializer + Clone> KnotDefault for Generated<T> {
    fn knot_default() -> Self {
        Generated::from_vec(Vec::new())
    }
}
