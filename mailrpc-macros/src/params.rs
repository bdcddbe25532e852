//! `#[derive(RpcParams)]` implementation
//!
//! Generates the field table the param binder walks. The member name of each
//! field follows serde (`rename`, `rename_all`, `skip`), and its kind is read
//! from the field type:
//!
//! | Type | Kind |
//! |---|---|
//! | `String`, `char` | `String` |
//! | `bool` | `Bool` |
//! | integer primitives | `Integer` |
//! | `f32`, `f64` | `Float` |
//! | `DateTime<_>` | `Timestamp` |
//! | `Vec`, sets, arrays, tuples | `Sequence` |
//! | `HashMap`, `BTreeMap`, `Map` | `Map` |
//! | anything else | `Any` |
//!
//! `Option<T>` and `Box<T>` take the kind of `T`. `#[param(kind = "...")]`
//! overrides the inferred kind.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{Attribute, Data, DeriveInput, Fields, GenericArgument, LitStr, PathArguments, Type};

pub fn derive_impl(input: DeriveInput) -> syn::Result<TokenStream> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            Fields::Unit => return Ok(expand(&input, Vec::new(), Vec::new())),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "RpcParams requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "RpcParams can only be derived for structs",
            ))
        }
    };

    let container = SerdeAttrs::parse(&input.attrs)?;
    let mut entries = Vec::with_capacity(fields.len());
    let mut fills = Vec::new();

    for field in fields {
        let attrs = SerdeAttrs::parse(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let ident = match &field.ident {
            Some(ident) => ident,
            None => continue,
        };
        let rust_name = ident.to_string();
        let rust_name = rust_name.strip_prefix("r#").unwrap_or(&rust_name);

        let name = match (attrs.rename, &container.rename_all) {
            (Some(rename), _) => rename,
            (None, Some(rule)) => rule.apply(rust_name),
            (None, None) => rust_name.to_string(),
        };

        let kind = match kind_override(&field.attrs)? {
            Some(kind) => kind,
            None => infer_kind(&field.ty).to_string(),
        };

        if attrs.skip_serializing {
            fills.push((name.clone(), ident.clone()));
        }
        entries.push((name, format_ident!("{}", kind)));
    }

    Ok(expand(&input, entries, fills))
}

fn expand(
    input: &DeriveInput,
    entries: Vec<(String, syn::Ident)>,
    fills: Vec<(String, syn::Ident)>,
) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = entries.iter().map(|(member, kind)| {
        quote! {
            ::mailrpc_core::Field::new(#member, ::mailrpc_core::FieldKind::#kind)
        }
    });

    // Members dropped by skip_serializing(_if) still need a zero value
    let zero_members = (!fills.is_empty()).then(|| {
        let fills = fills.iter().map(|(member, ident)| {
            quote! {
                ::mailrpc_core::params::fill_member(&mut members, #member, &zero.#ident)?;
            }
        });
        quote! {
            fn zero_members() -> ::std::result::Result<
                ::mailrpc_core::params::Members,
                ::std::string::String,
            > {
                let zero = <Self as ::std::default::Default>::default();
                let mut members = ::mailrpc_core::params::serialize_members(&zero)?;
                #(#fills)*
                ::std::result::Result::Ok(members)
            }
        }
    });

    quote! {
        impl #impl_generics ::mailrpc_core::RpcParams for #name #ty_generics #where_clause {
            const FIELDS: &'static [::mailrpc_core::Field] = &[#(#fields),*];
            #zero_members
        }
    }
}

/// The subset of serde attributes that affects member names
#[derive(Default)]
struct SerdeAttrs {
    rename: Option<String>,
    rename_all: Option<RenameRule>,
    skip: bool,
    skip_serializing: bool,
}

impl SerdeAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = SerdeAttrs::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    parsed.rename = directional_name(&meta)?;
                } else if meta.path.is_ident("rename_all") {
                    if let Some(rule) = directional_name(&meta)? {
                        parsed.rename_all = Some(RenameRule::parse(&rule, meta.path.span())?);
                    }
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing") {
                    parsed.skip = true;
                } else if meta.path.is_ident("skip_serializing")
                    || meta.path.is_ident("skip_serializing_if")
                {
                    parsed.skip_serializing = true;
                    skip_value(&meta)?;
                } else {
                    skip_value(&meta)?;
                }
                Ok(())
            })?;
        }

        Ok(parsed)
    }
}

/// `= "name"` or `(deserialize = "name", ...)`; the deserialize side wins
fn directional_name(meta: &syn::meta::ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(syn::Token![=]) {
        let lit: LitStr = meta.value()?.parse()?;
        return Ok(Some(lit.value()));
    }

    let mut name = None;
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("deserialize") {
            let lit: LitStr = inner.value()?.parse()?;
            name = Some(lit.value());
        } else {
            skip_value(&inner)?;
        }
        Ok(())
    })?;
    Ok(name)
}

/// Consume whatever follows a serde key we do not care about
fn skip_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: TokenStream = content.parse()?;
    }
    Ok(())
}

fn kind_override(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut kind = None;

    for attr in attrs.iter().filter(|a| a.path().is_ident("param")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("kind") {
                let lit: LitStr = meta.value()?.parse()?;
                kind = Some(kind_variant(&lit)?);
                Ok(())
            } else {
                Err(meta.error("expected `kind = \"...\"`"))
            }
        })?;
    }

    Ok(kind)
}

fn kind_variant(lit: &LitStr) -> syn::Result<String> {
    let variant = match lit.value().as_str() {
        "string" => "String",
        "bool" => "Bool",
        "integer" => "Integer",
        "float" => "Float",
        "timestamp" => "Timestamp",
        "sequence" => "Sequence",
        "map" => "Map",
        "any" => "Any",
        other => {
            return Err(syn::Error::new(
                lit.span(),
                format!("unknown param kind {:?}", other),
            ))
        }
    };
    Ok(variant.to_string())
}

fn infer_kind(ty: &Type) -> &'static str {
    match ty {
        Type::Tuple(tuple) if tuple.elems.is_empty() => "Any",
        Type::Array(_) | Type::Slice(_) | Type::Tuple(_) => "Sequence",
        Type::Group(group) => infer_kind(&group.elem),
        Type::Paren(paren) => infer_kind(&paren.elem),
        Type::Path(path) => {
            let segment = match path.path.segments.last() {
                Some(segment) => segment,
                None => return "Any",
            };
            match segment.ident.to_string().as_str() {
                "Option" | "Box" => first_type_arg(&segment.arguments)
                    .map(infer_kind)
                    .unwrap_or("Any"),
                "String" | "char" => "String",
                "bool" => "Bool",
                "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32"
                | "u64" | "u128" | "usize" => "Integer",
                "f32" | "f64" => "Float",
                "DateTime" => "Timestamp",
                "Vec" | "VecDeque" | "HashSet" | "BTreeSet" => "Sequence",
                "HashMap" | "BTreeMap" | "Map" => "Map",
                _ => "Any",
            }
        }
        _ => "Any",
    }
}

fn first_type_arg(arguments: &PathArguments) -> Option<&Type> {
    match arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        }),
        _ => None,
    }
}

/// serde's `rename_all` conventions
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(rule: &str, span: proc_macro2::Span) -> syn::Result<Self> {
        Ok(match rule {
            "lowercase" => RenameRule::Lower,
            "UPPERCASE" => RenameRule::Upper,
            "PascalCase" => RenameRule::Pascal,
            "camelCase" => RenameRule::Camel,
            "snake_case" => RenameRule::Snake,
            "SCREAMING_SNAKE_CASE" => RenameRule::ScreamingSnake,
            "kebab-case" => RenameRule::Kebab,
            "SCREAMING-KEBAB-CASE" => RenameRule::ScreamingKebab,
            other => {
                return Err(syn::Error::new(
                    span,
                    format!("unknown rename_all rule {:?}", other),
                ))
            }
        })
    }

    /// Rename a snake_case field name
    fn apply(&self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
            RenameRule::Pascal | RenameRule::Camel => {
                let mut out = String::with_capacity(field.len());
                let mut capitalize = matches!(self, RenameRule::Pascal);
                for c in field.chars() {
                    if c == '_' {
                        capitalize = true;
                    } else if capitalize {
                        out.push(c.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        out.push(c);
                    }
                }
                out
            }
        }
    }
}
