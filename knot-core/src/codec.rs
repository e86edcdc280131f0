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

//! Stateless helpers behind the variable-length encodings of [`crate::buffer`].
//!
//! The buffer methods do the actual byte shuffling; this module owns the value
//! transforms (zig-zag, fixed-point floats) and the size functions used to
//! reserve room and to predict wire sizes without writing anything.

/// Maximum encoded length of a 32-bit varint.
pub const MAX_VAR_INT_SIZE: usize = 5;
/// Maximum encoded length of a 64-bit varint. The ninth byte carries a full 8 bits.
pub const MAX_VAR_LONG_SIZE: usize = 9;

/// Length prefix written for a `None` string.
pub const NULL_STRING_LENGTH: u32 = 0;

#[inline(always)]
pub const fn zigzag_i32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline(always)]
pub const fn unzigzag_i32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[inline(always)]
pub const fn zigzag_i64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline(always)]
pub const fn unzigzag_i64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Maps a signed value onto the unsigned varint payload.
///
/// With `optimize_positive` the raw bit pattern is kept, so small non-negative
/// values are short and every negative value takes the maximum length.
/// Otherwise the zig-zag transform keeps small magnitudes of either sign short.
#[inline(always)]
pub const fn encode_i32(value: i32, optimize_positive: bool) -> u32 {
    if optimize_positive {
        value as u32
    } else {
        zigzag_i32(value)
    }
}

#[inline(always)]
pub const fn decode_i32(raw: u32, optimize_positive: bool) -> i32 {
    if optimize_positive {
        raw as i32
    } else {
        unzigzag_i32(raw)
    }
}

#[inline(always)]
pub const fn encode_i64(value: i64, optimize_positive: bool) -> u64 {
    if optimize_positive {
        value as u64
    } else {
        zigzag_i64(value)
    }
}

#[inline(always)]
pub const fn decode_i64(raw: u64, optimize_positive: bool) -> i64 {
    if optimize_positive {
        raw as i64
    } else {
        unzigzag_i64(raw)
    }
}

#[inline(always)]
pub const fn var_u32_size(value: u32) -> usize {
    if value >> 7 == 0 {
        1
    } else if value >> 14 == 0 {
        2
    } else if value >> 21 == 0 {
        3
    } else if value >> 28 == 0 {
        4
    } else {
        5
    }
}

#[inline(always)]
pub const fn var_u64_size(value: u64) -> usize {
    if value >> 56 != 0 {
        MAX_VAR_LONG_SIZE
    } else {
        1 + (63 - (value | 1).leading_zeros() as usize) / 7
    }
}

/// Encodes `value` into `out`, returning the number of bytes used.
#[inline(always)]
pub fn encode_var_u32(value: u32, out: &mut [u8; MAX_VAR_INT_SIZE]) -> usize {
    let size = var_u32_size(value);
    let mut v = value;
    for byte in out.iter_mut().take(size - 1) {
        *byte = (v as u8 & 0x7F) | 0x80;
        v >>= 7;
    }
    out[size - 1] = v as u8;
    size
}

/// Encodes `value` into `out`, returning the number of bytes used.
///
/// Up to eight 7-bit groups carry a continuation bit; a ninth byte, when
/// present, holds the remaining 8 bits as-is.
#[inline(always)]
pub fn encode_var_u64(value: u64, out: &mut [u8; MAX_VAR_LONG_SIZE]) -> usize {
    let size = var_u64_size(value);
    let mut v = value;
    for byte in out.iter_mut().take(size - 1) {
        *byte = (v as u8 & 0x7F) | 0x80;
        v >>= 7;
    }
    out[size - 1] = v as u8;
    size
}

/// Number of bytes `Writer::write_var_i32(value, optimize_positive)` emits.
#[inline(always)]
pub const fn var_i32_size(value: i32, optimize_positive: bool) -> usize {
    var_u32_size(encode_i32(value, optimize_positive))
}

/// Number of bytes `Writer::write_var_i64(value, optimize_positive)` emits.
#[inline(always)]
pub const fn var_i64_size(value: i64, optimize_positive: bool) -> usize {
    var_u64_size(encode_i64(value, optimize_positive))
}

/// Encoded width of one UTF-16 code unit in the string encoding.
#[inline(always)]
pub const fn utf16_unit_size(unit: u16) -> usize {
    if unit <= 0x7F {
        1
    } else if unit <= 0x7FF {
        2
    } else {
        3
    }
}

/// Number of bytes `Writer::write_string(value)` emits, length prefix included.
pub fn string_size(value: Option<&str>) -> usize {
    match value {
        None => var_u32_size(NULL_STRING_LENGTH),
        Some(s) if s.is_ascii() => var_u32_size(s.len() as u32 + 1) + s.len(),
        Some(s) => {
            let (units, bytes) = s
                .encode_utf16()
                .fold((0u32, 0usize), |(n, b), u| (n + 1, b + utf16_unit_size(u)));
            var_u32_size(units + 1) + bytes
        }
    }
}

#[inline(always)]
fn valid_precision(precision: f64) -> bool {
    precision.is_finite() && precision > 0.0
}

/// Fixed-point form of `value`, if decoding it with [`fixed_to_f32`] yields the
/// exact same bits.
pub fn f32_to_fixed(value: f32, precision: f32) -> Option<i32> {
    let precision64 = precision as f64;
    if !value.is_finite() || !valid_precision(precision64) {
        return None;
    }
    let scaled = (value as f64 * precision64).round();
    if scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
        return None;
    }
    let fixed = scaled as i32;
    (fixed_to_f32(fixed, precision).to_bits() == value.to_bits()).then_some(fixed)
}

#[inline(always)]
pub fn fixed_to_f32(fixed: i32, precision: f32) -> f32 {
    (fixed as f64 / precision as f64) as f32
}

/// Fixed-point form of `value`, if decoding it with [`fixed_to_f64`] yields the
/// exact same bits.
pub fn f64_to_fixed(value: f64, precision: f64) -> Option<i64> {
    if !value.is_finite() || !valid_precision(precision) {
        return None;
    }
    let scaled = (value * precision).round();
    // i64::MAX is not representable as f64; stay strictly inside the range.
    if scaled <= i64::MIN as f64 || scaled >= i64::MAX as f64 {
        return None;
    }
    let fixed = scaled as i64;
    (fixed_to_f64(fixed, precision).to_bits() == value.to_bits()).then_some(fixed)
}

#[inline(always)]
pub fn fixed_to_f64(fixed: i64, precision: f64) -> f64 {
    fixed as f64 / precision
}
