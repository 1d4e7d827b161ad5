//! `#[derive(Injectable)]` 实现

use crate::utils::{
    extract_generic_type, field_has_attribute, find_field_attribute, is_arc_type,
    is_injected_type,
};
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parse;
use syn::{
    Attribute, Data, DeriveInput, Error, Expr, Fields, Ident, LitInt, LitStr, Meta, Result, Token,
    Type,
};

/// `#[service_provider(...)]` 参数
#[derive(Debug, Default)]
struct ProviderArgs {
    name: Option<String>,
    lifetime: Option<Ident>,
    priority: Option<i32>,
}

/// `#[injectable(...)]` 参数
#[derive(Default)]
struct TypeArgs {
    implements: Vec<Type>,
    tags: Vec<String>,
}

/// 字段的生成方式
enum FieldKind {
    /// 构造函数参数，从注册表解析
    Param { contract: Type, provider: Option<String> },
    /// 构造函数参数，由调用方按位置提供
    Arg { ty: Type },
    /// 注入字段，构造后赋值
    Slot { contract: Type, provider: Option<String> },
    /// 使用初始化表达式
    Init(Expr),
    /// 使用 `Default::default()`
    Default,
}

pub fn derive_injectable_impl(input: DeriveInput) -> TokenStream {
    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(input: &DeriveInput) -> Result<TokenStream> {
    let ident = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Injectable 暂不支持泛型类型",
        ));
    }
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(Error::new_spanned(
                ident,
                "Injectable 只能用于结构体",
            ))
        }
    };

    let provider = parse_provider_args(&input.attrs)?;
    let type_args = parse_type_args(&input.attrs)?;

    let mut params = Vec::new();
    let mut slots = Vec::new();
    let body = match fields {
        Fields::Unit => quote! { Self },
        Fields::Unnamed(_) => {
            return Err(Error::new_spanned(
                fields,
                "Injectable 不支持元组结构体, 请使用具名字段",
            ))
        }
        Fields::Named(named) => {
            let mut inits = Vec::new();
            for field in &named.named {
                let Some(name) = field.ident.as_ref() else {
                    continue;
                };
                let name_str = name.to_string();
                let value = match classify_field(field)? {
                    FieldKind::Param { contract, provider } => {
                        params.push(match provider {
                            Some(provider) => quote! {
                                .named_param::<#contract>(#name_str, #provider)
                            },
                            None => quote! { .param::<#contract>(#name_str) },
                        });
                        quote! { args.service::<#contract>()? }
                    }
                    FieldKind::Arg { ty } => {
                        params.push(quote! { .param::<#ty>(#name_str) });
                        quote! { args.value::<#ty>()? }
                    }
                    FieldKind::Slot { contract, provider } => {
                        let slot = quote! {
                            {
                                fn slot(this: &#ident) -> &::di_abstractions::Injected<#contract> {
                                    &this.#name
                                }
                                slot
                            }
                        };
                        slots.push(match provider {
                            Some(provider) => quote! {
                                .named_field::<#contract>(#name_str, #provider, #slot)
                            },
                            None => quote! { .field::<#contract>(#name_str, #slot) },
                        });
                        quote! { ::di_abstractions::Injected::new() }
                    }
                    FieldKind::Init(expr) => quote! { (#expr)() },
                    FieldKind::Default => quote! { ::std::default::Default::default() },
                };
                inits.push(quote! { #name: #value });
            }
            quote! { Self { #(#inits),* } }
        }
    };

    let implements = type_args.implements.iter().map(|contract| {
        quote! {
            .implements::<#contract>(
                |this: ::std::sync::Arc<Self>| -> ::std::sync::Arc<#contract> { this }
            )
        }
    });
    let tags = type_args.tags.iter().map(|tag| quote! { .tag(#tag) });
    let metadata = provider.map(|args| {
        let lifetime = match &args.lifetime {
            Some(ident) if ident == "singleton" => {
                quote! { ::di_abstractions::Lifetime::Singleton }
            }
            _ => quote! { ::di_abstractions::Lifetime::Transient },
        };
        let name = args.name.map(|name| quote! { .with_name(#name) });
        let priority = args.priority.map(|p| quote! { .with_priority(#p) });
        quote! {
            .service_provider(
                ::di_abstractions::ProviderMetadata::new(#lifetime) #name #priority
            )
        }
    });

    Ok(quote! {
        impl ::di_abstractions::Injectable for #ident {
            fn descriptor() -> ::di_abstractions::TypeDescriptor {
                ::di_abstractions::TypeDescriptor::builder::<Self>()
                    #(#implements)*
                    #(#tags)*
                    #metadata
                    .constructor(
                        ::di_abstractions::Constructor::new(
                            |args: &mut ::di_abstractions::Arguments| {
                                let _ = &args;
                                ::std::result::Result::Ok(#body)
                            },
                        )
                        #(#params)*
                        .dependency_injection(),
                    )
                    #(#slots)*
                    .build()
            }
        }
    })
}

fn classify_field(field: &syn::Field) -> Result<FieldKind> {
    if let Some(attr) = find_field_attribute(field, "inject") {
        let provider = parse_inject_provider(attr)?;
        let contract = extract_generic_type(&field.ty).cloned();
        return match contract {
            Some(contract) if is_arc_type(&field.ty) => Ok(FieldKind::Param { contract, provider }),
            Some(contract) if is_injected_type(&field.ty) => {
                Ok(FieldKind::Slot { contract, provider })
            }
            _ => Err(Error::new_spanned(
                &field.ty,
                "#[inject] 字段的类型必须是 Arc<T> 或 Injected<T>",
            )),
        };
    }
    if field_has_attribute(field, "arg") {
        return Ok(FieldKind::Arg {
            ty: field.ty.clone(),
        });
    }
    if let Some(attr) = find_field_attribute(field, "init") {
        return Ok(FieldKind::Init(attr.parse_args::<Expr>()?));
    }
    Ok(FieldKind::Default)
}

fn parse_inject_provider(attr: &Attribute) -> Result<Option<String>> {
    if matches!(attr.meta, Meta::Path(_)) {
        return Ok(None);
    }
    let mut provider = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("provider") {
            let value: LitStr = meta.value()?.parse()?;
            provider = Some(value.value());
            Ok(())
        } else {
            Err(meta.error("#[inject] 只支持 provider = \"...\" 参数"))
        }
    })?;
    Ok(provider)
}

fn parse_provider_args(attrs: &[Attribute]) -> Result<Option<ProviderArgs>> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("service_provider")) else {
        return Ok(None);
    };
    let mut args = ProviderArgs::default();
    if matches!(attr.meta, Meta::Path(_)) {
        return Ok(Some(args));
    }
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            let value: LitStr = meta.value()?.parse()?;
            args.name = Some(value.value());
            Ok(())
        } else if meta.path.is_ident("lifetime") {
            let input = meta.value()?;
            let (value, span) = if input.peek(LitStr) {
                let lit: LitStr = input.parse()?;
                (lit.value().to_lowercase(), lit.span())
            } else {
                let ident: Ident = input.parse()?;
                (ident.to_string(), ident.span())
            };
            if value != "singleton" && value != "transient" {
                return Err(Error::new(span, "lifetime 只能是 singleton 或 transient"));
            }
            args.lifetime = Some(Ident::new(&value, span));
            Ok(())
        } else if meta.path.is_ident("priority") {
            let input = meta.value()?;
            let negative = input.parse::<Option<Token![-]>>()?.is_some();
            let value: LitInt = input.parse()?;
            let priority: i32 = value.base10_parse()?;
            args.priority = Some(if negative { -priority } else { priority });
            Ok(())
        } else {
            Err(meta.error("#[service_provider] 只支持 name / lifetime / priority 参数"))
        }
    })?;
    Ok(Some(args))
}

fn parse_type_args(attrs: &[Attribute]) -> Result<TypeArgs> {
    let mut args = TypeArgs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("injectable")) {
        if matches!(attr.meta, Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("implements") {
                let content;
                syn::parenthesized!(content in meta.input);
                let types = content.parse_terminated(Type::parse, Token![,])?;
                args.implements.extend(types);
                Ok(())
            } else if meta.path.is_ident("tag") {
                let value: LitStr = meta.value()?.parse()?;
                args.tags.push(value.value());
                Ok(())
            } else {
                Err(meta.error("#[injectable] 只支持 implements(...) / tag = \"...\" 参数"))
            }
        })?;
    }
    Ok(args)
}
