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

//! Enums: the variant ordinal as a varint, then the variant's fields.

use crate::object::{copy, read, write};
use crate::util::{has_knot_flag, source_fields, SourceField};
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{DataEnum, Variant};

fn variant_owner(owner: &str, variant: &Variant) -> String {
    format!("{owner}::{}", variant.ident)
}

/// `{ a: a, 0: field_0, .. }` for the fields that are written.
fn bind_pattern(fields: &[SourceField]) -> TokenStream {
    let bindings = fields.iter().filter(|field| !field.skip).map(|field| {
        let member = &field.member;
        let binding = field.binding();
        quote! { #member: #binding }
    });
    quote! { { #(#bindings,)* .. } }
}

fn bound_value(field: &SourceField) -> TokenStream {
    let binding = field.binding();
    quote! { #binding }
}

pub fn gen_write_data(data_enum: &DataEnum, owner: &str) -> syn::Result<TokenStream> {
    let mut arms = Vec::new();
    for (ordinal, variant) in data_enum.variants.iter().enumerate() {
        let ident = &variant.ident;
        let ordinal = ordinal as u32;
        let fields = source_fields(&variant.fields)?;
        let pattern = bind_pattern(&fields);
        let writes = write::gen_write_fields(&fields, &variant_owner(owner, variant), bound_value);
        arms.push(quote! {
            Self::#ident #pattern => {
                context.writer.write_var_u32(#ordinal)?;
                #writes
            }
        });
    }
    Ok(quote! {
        match self {
            #(#arms)*
        }
        Ok(())
    })
}

pub fn gen_read_data(data_enum: &DataEnum, owner: &str) -> syn::Result<TokenStream> {
    let mut arms = Vec::new();
    for (ordinal, variant) in data_enum.variants.iter().enumerate() {
        let ident = &variant.ident;
        let ordinal = ordinal as u32;
        let fields = source_fields(&variant.fields)?;
        let inits = read::gen_read_fields(&fields, &variant_owner(owner, variant));
        arms.push(quote! {
            #ordinal => Ok(Self::#ident { #(#inits),* }),
        });
    }
    Ok(quote! {
        match context.reader.read_var_u32()? {
            #(#arms)*
            other => Err(::knot_core::error::Error::invalid_data(::std::format!(
                "unknown variant ordinal {} for {}",
                other,
                #owner
            ))),
        }
    })
}

pub fn gen_copy(data_enum: &DataEnum, owner: &str) -> syn::Result<TokenStream> {
    let mut arms = Vec::new();
    for variant in &data_enum.variants {
        let ident = &variant.ident;
        let fields = source_fields(&variant.fields)?;
        let pattern = bind_pattern(&fields);
        let inits = copy::gen_copy_fields(&fields, &variant_owner(owner, variant), bound_value);
        arms.push(quote! {
            Self::#ident #pattern => Self::#ident { #(#inits),* },
        });
    }
    Ok(quote! {
        Ok(match self {
            #(#arms)*
        })
    })
}

/// The `#[knot(default)]` variant, else the first one.
pub fn gen_default(data_enum: &DataEnum) -> syn::Result<TokenStream> {
    let mut chosen = None;
    for variant in &data_enum.variants {
        if has_knot_flag(&variant.attrs, "default")? {
            if chosen.is_some() {
                return Err(syn::Error::new_spanned(
                    variant,
                    "only one variant can be marked #[knot(default)]",
                ));
            }
            chosen = Some(variant);
        }
    }
    let Some(variant) = chosen.or_else(|| data_enum.variants.first()) else {
        return Err(syn::Error::new(
            Span::call_site(),
            "an enum without variants has no default",
        ));
    };
    let ident = &variant.ident;
    let fields = source_fields(&variant.fields)?;
    let inits = read::gen_default_fields(&fields);
    Ok(quote! {
        Self::#ident { #(#inits),* }
    })
}
