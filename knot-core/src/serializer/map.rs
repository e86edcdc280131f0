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
use crate::serializer::list::capacity_hint;
use crate::serializer::{KnotDefault, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

fn write_entries<'a, K, V>(
    len: usize,
    entries: impl Iterator<Item = (&'a K, &'a V)>,
    context: &mut WriteContext,
) -> Result<(), Error>
where
    K: Serializer,
    V: Serializer,
{
    context.writer.write_var_u32(len as u32)?;
    for (index, (key, value)) in entries.enumerate() {
        context
            .write_object(key)
            .and_then(|_| context.write_object(value))
            .map_err(|err| err.with_trace(format!("entry {index}")))?;
    }
    Ok(())
}

fn read_entries<K, V>(
    context: &mut ReadContext,
    len: usize,
    mut insert: impl FnMut(K, V),
) -> Result<(), Error>
where
    K: Serializer,
    V: Serializer,
{
    for index in 0..len {
        let key = context
            .read_object()
            .map_err(|err| err.with_trace(format!("entry {index}")))?;
        let value = context
            .read_object()
            .map_err(|err| err.with_trace(format!("entry {index}")))?;
        insert(key, value);
    }
    Ok(())
}

impl<K, V> Serializer for HashMap<K, V>
where
    K: Serializer + Eq + Hash,
    V: Serializer,
{
    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        write_entries(self.len(), self.iter(), context)
    }

    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        let len = context.reader.read_var_u32()? as usize;
        let mut map = HashMap::with_capacity(capacity_hint(len, context));
        read_entries(context, len, |key, value| {
            map.insert(key, value);
        })?;
        Ok(map)
    }

    fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error> {
        let mut map = HashMap::with_capacity(self.len());
        for (key, value) in self {
            map.insert(context.copy_object(key)?, context.copy_object(value)?);
        }
        Ok(map)
    }
}

impl<K, V> KnotDefault for HashMap<K, V> {
    fn knot_default() -> Self {
        HashMap::new()
    }
}

impl<K, V> Serializer for BTreeMap<K, V>
where
    K: Serializer + Ord,
    V: Serializer,
{
    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        write_entries(self.len(), self.iter(), context)
    }

    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        let len = context.reader.read_var_u32()? as usize;
        let mut map = BTreeMap::new();
        read_entries(context, len, |key, value| {
            map.insert(key, value);
        })?;
        Ok(map)
    }

    fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error> {
        let mut map = BTreeMap::new();
        for (key, value) in self {
            map.insert(context.copy_object(key)?, context.copy_object(value)?);
        }
        Ok(map)
    }
}

impl<K, V> KnotDefault for BTreeMap<K, V> {
    fn knot_default() -> Self {
        BTreeMap::new()
    }
}
