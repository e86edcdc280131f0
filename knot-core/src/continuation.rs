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

//! Resumable units of write work.
//!
//! A serializer that cannot write all of its content eagerly pushes a
//! [`Continuation`] instead. The engine steps continuations iteratively: nested
//! ones before the enclosing write returns, the root's one step per
//! [`WriteSession::process_write`](crate::WriteSession::process_write) budget unit.

use crate::error::Error;
use crate::resolver::context::WriteContext;
use crate::serializer::Serializer;

/// Outcome of one continuation step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    Pending,
    Done,
}

pub trait Continuation {
    fn process_write(&mut self, context: &mut WriteContext) -> Result<Progress, Error>;
}

impl<F> Continuation for F
where
    F: FnMut(&mut WriteContext) -> Result<Progress, Error>,
{
    fn process_write(&mut self, context: &mut WriteContext) -> Result<Progress, Error> {
        self(context)
    }
}

/// Writes the items of an iterator one per step: `1` and the item, then a `0`
/// terminator once the iterator is exhausted.
pub struct SequenceContinuation<T> {
    items: Box<dyn Iterator<Item = T>>,
    written: usize,
}

impl<T: Serializer> SequenceContinuation<T> {
    pub fn new(items: Box<dyn Iterator<Item = T>>) -> Self {
        SequenceContinuation { items, written: 0 }
    }
}

impl<T: Serializer> Continuation for SequenceContinuation<T> {
    fn process_write(&mut self, context: &mut WriteContext) -> Result<Progress, Error> {
        match self.items.next() {
            Some(item) => {
                context.writer.write_bool(true)?;
                context
                    .write_object(&item)
                    .map_err(|err| err.with_trace(format!("[{}]", self.written)))?;
                self.written += 1;
                Ok(Progress::Pending)
            }
            None => {
                context.writer.write_bool(false)?;
                log::trace!("sequence of {} item(s) finished", self.written);
                Ok(Progress::Done)
            }
        }
    }
}
