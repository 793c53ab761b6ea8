use crate::attributes::{ComponentAttributes, DefaultDefinition, FieldAttributes};
use convert_case::{Case, Casing};
use itertools::Itertools;
use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DataStruct, DeriveInput, Error, Expr, Field, Fields, FieldsNamed,
    FieldsUnnamed, LitStr, Result, Type,
};

const COMPONENT: &str = "component";

fn get_injected_instance(ty: &Type, name: Option<&LitStr>) -> TokenStream {
    let qualifier = match name {
        Some(name) => quote!(Some(#name)),
        None => quote!(None),
    };

    quote! {
        <#ty as hartshorn_di::component::Injected>::inject(instance_provider, #qualifier)?
    }
}

fn is_vec(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map_or(false, |segment| segment.ident == "Vec"),
        _ => false,
    }
}

fn generate_construction(field: &Field) -> Result<TokenStream> {
    let mut name = None;
    for attr in &field.attrs {
        if attr.path().is_ident(COMPONENT) {
            let attributes = FieldAttributes::try_from(attr)?;
            match &attributes.default {
                Some(DefaultDefinition::Expr(path)) => return Ok(quote!(#path())),
                Some(DefaultDefinition::Default) => {
                    return Ok(quote!(std::default::Default::default()))
                }
                _ => {}
            }

            name = attributes.name;
        }
    }

    if let Some(name) = &name {
        if is_vec(&field.ty) {
            return Err(Error::new(
                name.span(),
                "Vec fields receive all bindings of their type and cannot be named!",
            ));
        }
    }

    Ok(get_injected_instance(&field.ty, name.as_ref()))
}

fn make_named_struct(fields: &FieldsNamed) -> Result<TokenStream> {
    let fields: Vec<_> = fields
        .named
        .iter()
        .map(|field| -> Result<TokenStream> {
            let ident = field
                .ident
                .as_ref()
                .ok_or_else(|| Error::new(field.span(), "Missing field name!"))?;
            let instance = generate_construction(field)?;
            Ok(quote! {
                #ident: #instance
            })
        })
        .try_collect()?;

    Ok(quote! {
        Self {
            #(#fields),*
        }
    })
}

fn make_unnamed_struct(fields: &FieldsUnnamed) -> Result<TokenStream> {
    let fields: Vec<_> = fields
        .unnamed
        .iter()
        .map(generate_construction)
        .try_collect()?;

    Ok(quote! {
        Self(#(#fields),*)
    })
}

fn extract_component_attributes(attributes: &[Attribute]) -> Result<ComponentAttributes> {
    attributes
        .iter()
        .find(|attribute| attribute.path().is_ident(COMPONENT))
        .map(ComponentAttributes::try_from)
        .unwrap_or_else(|| Ok(ComponentAttributes::default()))
}

fn generate_scope(scope: Option<&LitStr>) -> Result<TokenStream> {
    let Some(scope) = scope else {
        return Ok(quote!(hartshorn_di::scope::Scope::Singleton));
    };

    match scope.value().to_lowercase().as_str() {
        "singleton" => Ok(quote!(hartshorn_di::scope::Scope::Singleton)),
        "factory" | "prototype" => Ok(quote!(hartshorn_di::scope::Scope::Factory)),
        _ => Err(Error::new(
            scope.span(),
            "Unrecognized component scope! Use \"singleton\" or \"factory\".",
        )),
    }
}

fn parse_types(types: &[LitStr]) -> Result<Vec<Type>> {
    types.iter().map(|ty| ty.parse::<Type>()).try_collect()
}

fn generate_condition(condition: Option<&LitStr>) -> Result<TokenStream> {
    let Some(condition) = condition else {
        return Ok(quote!());
    };

    // plain function paths are wrapped, other expressions must evaluate to a condition
    match condition.parse::<Expr>()? {
        Expr::Path(path) => Ok(quote! {
            .with_condition(std::sync::Arc::new(#path))
        }),
        expr => Ok(quote! {
            .with_condition(#expr)
        }),
    }
}

fn generate_descriptor(ident: &Ident, attributes: &ComponentAttributes) -> Result<TokenStream> {
    let id = attributes
        .id
        .as_ref()
        .map(LitStr::value)
        .unwrap_or_else(|| ident.to_string().to_case(Case::Snake));
    let scope = generate_scope(attributes.scope.as_ref())?;

    let disposer = if attributes.is_disposable {
        quote!(.disposable::<#ident>())
    } else {
        quote!()
    };

    let name = attributes
        .name
        .as_ref()
        .map(|name| quote!(.with_name(#name)));
    let description = attributes
        .description
        .as_ref()
        .map(|description| quote!(.with_description(#description)));
    let enabled = attributes
        .enabled
        .as_ref()
        .map(|enabled| quote!(.with_enabled(#enabled)));
    let priority = attributes
        .priority
        .as_ref()
        .map(|priority| quote!(.with_priority(#priority)));
    let condition = generate_condition(attributes.condition.as_ref())?;
    let authors = &attributes.authors;

    let provides = parse_types(&attributes.provides)?;
    let provides_method = if attributes.is_primary {
        quote!(provides_primary)
    } else {
        quote!(provides)
    };
    let requires = parse_types(&attributes.requires)?;

    Ok(quote! {
        hartshorn_di::component_registry::ComponentDescriptor::new(#id)
            .binds(
                hartshorn_di::key::Key::of::<#ident>(),
                hartshorn_di::provider::Provider::constructor(
                    #scope,
                    <#ident as hartshorn_di::component::Component>::create,
                )#disposer,
            )
            #name
            #description
            #(.with_author(#authors))*
            #enabled
            #priority
            #condition
            #(.#provides_method::<#provides, #ident, _>(
                |instance: hartshorn_di::instance_provider::InstancePtr<#ident>| {
                    instance as hartshorn_di::instance_provider::InstancePtr<#provides>
                }
            ))*
            #(.requires_type::<#requires>())*
    })
}

pub fn expand_component(input: &DeriveInput) -> Result<TokenStream> {
    if let Data::Struct(DataStruct { fields, .. }) = &input.data {
        let ident = &input.ident;
        let generation = match fields {
            Fields::Named(fields) => make_named_struct(fields)?,
            Fields::Unnamed(fields) => make_unnamed_struct(fields)?,
            Fields::Unit => quote! { Self },
        };

        let attributes = extract_component_attributes(&input.attrs)?;
        let descriptor = generate_descriptor(ident, &attributes)?;

        Ok(quote! {
            #[automatically_derived]
            impl hartshorn_di::component::Component for #ident {
                #[allow(unused_variables)]
                fn create(
                    instance_provider: &mut dyn hartshorn_di::instance_provider::InstanceProvider,
                ) -> Result<Self, hartshorn_di::instance_provider::ErrorPtr> {
                    Ok(#generation)
                }
            }

            const _: () = {
                fn register() -> hartshorn_di::component_registry::ComponentDescriptor {
                    #descriptor
                }

                hartshorn_di::component_registry::internal::submit! {
                    hartshorn_di::component_registry::internal::ComponentRegisterer {
                        register
                    }
                };
            };
        })
    } else {
        Err(Error::new(
            input.span(),
            "Can only derive Component on structs!",
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::component::generate_construction;
    use quote::quote;
    use syn::parse::Parser;
    use syn::Field;

    fn field(tokens: proc_macro2::TokenStream) -> Field {
        Field::parse_named.parse2(tokens).unwrap()
    }

    #[test]
    fn should_reject_named_vec_field() {
        let error = generate_construction(&field(quote! {
            #[component(name = "primary")]
            all: Vec<hartshorn_di::instance_provider::InstancePtr<u8>>
        }))
        .unwrap_err();

        assert!(error.to_string().contains("cannot be named"));
    }

    #[test]
    fn should_accept_named_instance_field() {
        assert!(generate_construction(&field(quote! {
            #[component(name = "primary")]
            one: hartshorn_di::instance_provider::InstancePtr<u8>
        }))
        .is_ok());

        assert!(generate_construction(&field(quote! {
            all: Vec<hartshorn_di::instance_provider::InstancePtr<u8>>
        }))
        .is_ok());
    }
}
