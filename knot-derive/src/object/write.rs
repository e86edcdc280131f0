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

use crate::util::SourceField;
use proc_macro2::TokenStream;
use quote::quote;

/// One `write_field` call per field, binding each field to `target`.
pub fn gen_write_fields(
    fields: &[SourceField],
    owner: &str,
    target: impl Fn(&SourceField) -> TokenStream,
) -> TokenStream {
    let writes = fields.iter().filter(|field| !field.skip).map(|field| {
        let name = &field.name;
        let value = target(field);
        quote! {
            context.write_field(#value, #name, #owner)?;
        }
    });
    quote! { #(#writes)* }
}

pub fn gen_write_data(fields: &[SourceField], owner: &str) -> TokenStream {
    let writes = gen_write_fields(fields, owner, |field| {
        let member = &field.member;
        quote! { &self.#member }
    });
    quote! {
        #writes
        Ok(())
    }
}
