extern crate proc_macro;
extern crate syn;
#[macro_use]
extern crate quote;

use proc_macro::TokenStream;
use syn::parse_macro_input;

/// Derives the CSV record shape of a named-field struct.
///
/// Generates `Logging::header`, `Logging::from_record` and a `Display` impl
/// that renders one comma separated row (newline terminated). Columns follow
/// the field declaration order and are named after the fields.
#[proc_macro_derive(Logging)]
pub fn logging_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as syn::DeriveInput);
    impl_logging(&ast).unwrap_or_else(|err| err.to_compile_error().into())
}

fn impl_logging(ast: &syn::DeriveInput) -> syn::Result<TokenStream> {
    let name = &ast.ident;
    let fields = match &ast.data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(syn::FieldsNamed { ref named, .. }),
            ..
        }) => named,
        _ => {
            return Err(syn::Error::new_spanned(
                ast,
                "Logging can only be derived for structs with named fields",
            ))
        }
    };
    let field_names = fields
        .iter()
        .filter_map(|field| field.ident.as_ref())
        .collect::<Vec<_>>();
    let field_types = fields.iter().map(|field| &field.ty).collect::<Vec<_>>();
    let column_names = field_names
        .iter()
        .map(|field_name| field_name.to_string())
        .collect::<Vec<_>>();

    let log_format = field_names
        .iter()
        .map(|_| "{}".to_string())
        .collect::<Vec<_>>()
        .join(",");
    let header_format = column_names.join(",");

    let expanded = quote! {
        impl Logging for #name {
            fn header() -> String {
                concat!{#header_format,"\n"}.to_string()
            }

            fn from_record(line: &str) -> anyhow::Result<Self> {
                let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
                let mut columns = line.split(',');
                let record = Self {
                    #(
                        #field_names: {
                            let raw = columns.next().ok_or_else(|| {
                                anyhow::anyhow!("missing column `{}` in {:?}", #column_names, line)
                            })?;
                            raw.trim().parse::<#field_types>().map_err(|e| {
                                anyhow::anyhow!("invalid value {:?} for column `{}`: {}", raw, #column_names, e)
                            })?
                        },
                    )*
                };
                if columns.next().is_some() {
                    anyhow::bail!("too many columns in {:?}", line);
                }
                Ok(record)
            }
        }

        impl std::fmt::Display for #name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(#log_format,"\n"), #(self.#field_names),*)
            }
        }
    };
    Ok(expanded.into())
}
