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

//! Wire-format constants shared by writers and readers.
//!
//! These values are versioned together with [`WireVersion`]; changing any of
//! them requires a new version.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Version nibble written in the graph header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum WireVersion {
    V1 = 1,
}

pub const CURRENT_WIRE_VERSION: WireVersion = WireVersion::V1;

/// Header bit: shared pointers carry reference tags.
pub const HEADER_REFERENCES: u8 = 1;
/// Header bit: `f32`/`f64` use the fixed-point variable-length encoding.
pub const HEADER_VARIABLE_FLOATS: u8 = 1 << 1;
const HEADER_FLAGS_MASK: u8 = 0x0F;

#[inline(always)]
pub fn encode_header(version: WireVersion, flags: u8) -> u8 {
    (u8::from(version) << 4) | (flags & HEADER_FLAGS_MASK)
}

/// Splits a header byte into its version nibble and flag bits.
#[inline(always)]
pub fn decode_header(header: u8) -> (u8, u8) {
    (header >> 4, header & HEADER_FLAGS_MASK)
}

/// Reserved values of the reference tag. Any tag `>= FIRST_REF_ID` is a
/// backreference to that id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum RefFlag {
    Null = 0,
    /// A value follows. With reference tracking the reader gives it the next id.
    NotNull = 1,
}

/// First id handed out to a tracked object.
pub const FIRST_REF_ID: u32 = 2;

/// Reserved values of the class tag. Any tag `>= CLASS_ID_OFFSET` is the
/// registration id plus `CLASS_ID_OFFSET`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum ClassFlag {
    Null = 0,
    /// A per-graph name id follows, then the type name on its first occurrence.
    Name = 1,
}

pub const CLASS_ID_OFFSET: u32 = 2;

/// Registration id of types known only by name.
pub const NAME_ID: i32 = -1;

/// Outcome of the write-side identity lookup for one object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefDecision {
    Null,
    /// Not tracked; written as a fresh value every time.
    Immutable,
    /// First occurrence; the object now owns this id.
    NewId(u32),
    /// Already written under this id.
    ExistingId(u32),
}

/// Outcome of reading a reference tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefRead {
    Null,
    /// An untracked value follows.
    Value,
    /// A tracked value follows and must be stored under this reserved id.
    New(u32),
    Existing(u32),
}
