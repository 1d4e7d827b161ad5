//! 宏工具函数

use syn::{Field, Type};

/// 从类型中提取第一个泛型参数
pub fn extract_generic_type(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner_type)) = args.args.first() {
                    return Some(inner_type);
                }
            }
        }
    }
    None
}

/// 类型路径最后一段是否为指定名称，例如 `std::sync::Arc<T>` 对应 `Arc`
pub fn is_wrapper_type(ty: &Type, wrapper: &str) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident == wrapper)
            .unwrap_or(false),
        _ => false,
    }
}

/// 检查类型是否为 `Arc<T>`
pub fn is_arc_type(ty: &Type) -> bool {
    is_wrapper_type(ty, "Arc")
}

/// 检查类型是否为 `Injected<T>`
pub fn is_injected_type(ty: &Type) -> bool {
    is_wrapper_type(ty, "Injected")
}

/// 检查字段是否有特定属性
pub fn field_has_attribute(field: &Field, attr_name: &str) -> bool {
    field.attrs.iter().any(|attr| attr.path().is_ident(attr_name))
}

/// 查找字段上的特定属性
pub fn find_field_attribute<'a>(field: &'a Field, attr_name: &str) -> Option<&'a syn::Attribute> {
    field.attrs.iter().find(|attr| attr.path().is_ident(attr_name))
}
