//! Procedural macros for mailrpc
//!
//! # `#[derive(RpcParams)]`
//!
//! Implements `mailrpc_core::RpcParams` for a struct with named fields, so it
//! can be used as a method's argument type. The generated field table tells
//! the param binder which members to look for and what JSON kind each one
//! expects.
//!
//! The struct must also implement `Default`, `Serialize` and `Deserialize`;
//! member names follow its serde attributes.
//!
//! ```ignore
//! use chrono::{DateTime, FixedOffset};
//! use mailrpc_macros::RpcParams;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize, Deserialize, RpcParams)]
//! #[serde(rename_all = "camelCase")]
//! struct ScheduleMail {
//!     message: String,
//!     send_at: Option<DateTime<FixedOffset>>,
//! }
//!
//! // Generates approximately:
//! impl mailrpc_core::RpcParams for ScheduleMail {
//!     const FIELDS: &'static [mailrpc_core::Field] = &[
//!         mailrpc_core::Field::new("message", mailrpc_core::FieldKind::String),
//!         mailrpc_core::Field::new("sendAt", mailrpc_core::FieldKind::Timestamp),
//!     ];
//! }
//! ```
//!
//! The generated code names `::mailrpc_core`, so the using crate must depend
//! on it directly.

mod params;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive the field table for a params struct
///
/// Field attributes:
///
/// - `#[serde(rename = "...")]`, `#[serde(skip)]` and the container-level
///   `#[serde(rename_all = "...")]` are honoured.
/// - `#[param(kind = "...")]` overrides the inferred kind. Accepted values are
///   `string`, `bool`, `integer`, `float`, `timestamp`, `sequence`, `map`
///   and `any`.
#[proc_macro_derive(RpcParams, attributes(param))]
pub fn derive_rpc_params(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    params::derive_impl(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
