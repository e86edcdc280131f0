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

#[inline(always)]
fn element_segment(index: usize) -> String {
    format!("[{index}]")
}

/// Allocation hint for a length read from the stream, bounded by what the
/// reader still holds so corrupt input cannot reserve arbitrary memory.
pub(crate) fn capacity_hint(len: usize, context: &ReadContext) -> usize {
    len.min(context.reader.remaining())
}

impl<T: Serializer> Serializer for Vec<T> {
    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        context.writer.write_var_u32(self.len() as u32)?;
        for (index, item) in self.iter().enumerate() {
            context
                .write_object(item)
                .map_err(|err| err.with_trace(element_segment(index)))?;
        }
        Ok(())
    }

    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        let len = context.reader.read_var_u32()? as usize;
        let mut items = Vec::with_capacity(capacity_hint(len, context));
        for index in 0..len {
            items.push(
                context
                    .read_object()
                    .map_err(|err| err.with_trace(element_segment(index)))?,
            );
        }
        Ok(items)
    }

    fn knot_copy(&self, context: &mut CopyContext) -> Result<Self, Error> {
        self.iter()
            .enumerate()
            .map(|(index, item)| {
                context
                    .copy_object(item)
                    .map_err(|err| err.with_trace(element_segment(index)))
            })
            .collect()
    }
}

impl<T> KnotDefault for Vec<T> {
    fn knot_default() -> Self {
        Vec::new()
    }
}
