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

/// Configuration of a [`Knot`](crate::knot::Knot) engine.
///
/// Writer and reader must agree on `references` and `float_precision`; both are
/// recorded in the graph header (the precision factor right after the header
/// byte) and checked on read.
#[derive(Clone, Debug)]
pub struct Config {
    /// Whether shared pointers (`Rc`, `Arc`) are tracked by identity.
    /// Disabled, every pointer is written as a fresh value and cyclic graphs
    /// never terminate.
    pub references: bool,
    /// Closed-world mode: every user type must be registered.
    pub registration_required: bool,
    /// Maximum nesting depth of one graph.
    pub max_depth: u32,
    /// Initial capacity of the engine's pooled output buffers.
    pub initial_buffer_size: usize,
    /// Capacity bound of the engine's pooled output buffers.
    pub max_buffer_size: Option<usize>,
    /// Precision factor of the fixed-point float encoding; `None` keeps the
    /// 4/8-byte IEEE-754 form.
    pub float_precision: Option<f64>,
    /// Whether class-name tables start empty for every graph. Disabled, a name
    /// is written once per engine until [`Knot::reset`](crate::Knot::reset), and
    /// the reading engine must read the graphs in the order they were written.
    pub auto_reset: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            references: true,
            registration_required: false,
            max_depth: u32::MAX,
            initial_buffer_size: 256,
            max_buffer_size: None,
            float_precision: None,
            auto_reset: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn is_references(&self) -> bool {
        self.references
    }

    #[inline(always)]
    pub fn is_registration_required(&self) -> bool {
        self.registration_required
    }

    #[inline(always)]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[inline(always)]
    pub fn float_precision(&self) -> Option<f64> {
        self.float_precision
    }

    #[inline(always)]
    pub fn is_auto_reset(&self) -> bool {
        self.auto_reset
    }
}
