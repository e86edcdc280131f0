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

/// Little-endian fixed-width integers.
macro_rules! impl_fixed_serializer {
    ($($ty:ident),+) => {
        $(
            paste::paste! {
                impl Serializer for $ty {
                    #[inline(always)]
                    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
                        context.writer.[<write_ $ty>](*self)
                    }

                    #[inline(always)]
                    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
                        context.reader.[<read_ $ty>]()
                    }

                    #[inline(always)]
                    fn knot_copy(&self, _: &mut CopyContext) -> Result<Self, Error> {
                        Ok(*self)
                    }
                }
            }

            impl KnotDefault for $ty {
                #[inline(always)]
                fn knot_default() -> Self {
                    0
                }
            }
        )+
    };
}

/// Variable-length integers; signed types are zig-zag encoded.
macro_rules! impl_var_serializer {
    ($($ty:ty => $write:ident($($opt:expr)?), $read:ident($($ropt:expr)?);)+) => {
        $(
            impl Serializer for $ty {
                #[inline(always)]
                fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
                    context.writer.$write(*self $(, $opt)?)?;
                    Ok(())
                }

                #[inline(always)]
                fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
                    context.reader.$read($($ropt)?)
                }

                #[inline(always)]
                fn knot_copy(&self, _: &mut CopyContext) -> Result<Self, Error> {
                    Ok(*self)
                }
            }

            impl KnotDefault for $ty {
                #[inline(always)]
                fn knot_default() -> Self {
                    0
                }
            }
        )+
    };
}

/// IEEE-754 by default; fixed-point varints when the engine has a float precision.
macro_rules! impl_float_serializer {
    ($($ty:ident),+) => {
        $(
            paste::paste! {
                impl Serializer for $ty {
                    #[inline(always)]
                    fn knot_write_data(&self, context: &mut WriteContext) -> Result<(), Error> {
                        match context.config().float_precision {
                            Some(precision) => {
                                context.writer.[<write_var_ $ty>](*self, precision as $ty, false)?;
                                Ok(())
                            }
                            None => context.writer.[<write_ $ty>](*self),
                        }
                    }

                    #[inline(always)]
                    fn knot_read_data(context: &mut ReadContext) -> Result<Self, Error> {
                        match context.config().float_precision {
                            Some(precision) => context.reader.[<read_var_ $ty>](precision as $ty, false),
                            None => context.reader.[<read_ $ty>](),
                        }
                    }

                    #[inline(always)]
                    fn knot_copy(&self, _: &mut CopyContext) -> Result<Self, Error> {
                        Ok(*self)
                    }
                }
            }

            impl KnotDefault for $ty {
                #[inline(always)]
                fn knot_default() -> Self {
                    0.0
                }
            }
        )+
    };
}

impl_fixed_serializer!(i8, u8, i16, u16);

impl_var_serializer! {
    i32 => write_var_i32(false), read_var_i32(false);
    i64 => write_var_i64(false), read_var_i64(false);
    u32 => write_var_u32(), read_var_u32();
    u64 => write_var_u64(), read_var_u64();
}

impl_float_serializer!(f32, f64);
