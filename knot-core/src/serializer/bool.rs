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

impl Serializer for bool {
    #[inline(always)]
    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
        context.writer.write_bool(*self)
    }

    #[inline(always)]
    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
        context.reader.read_bool()
    }

    #[inline(always)]
    fn knot_copy(&self, _: &mut CopyContext) -> Result<Self, Error> {
        Ok(*self)
    }
}

impl KnotDefault for bool {
    fn knot_default() -> Self {
        false
    }
}
