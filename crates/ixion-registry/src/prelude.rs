//! The default host universe.
//!
//! A small slice of the platform library: the classes the language refers to
//! implicitly (strings, wrappers, exceptions, `System.out`) plus the runtime's
//! `ixion/runtime/functions/Function<N>` lambda interfaces.

use ixion_core::{Modifiers, PrimitiveKind, SemanticType};

use crate::HostRegistry;
use crate::host::HostClassDescriptor;

/// Interface a lambda of `arity` parameters implements by default.
pub fn function_interface(arity: usize) -> String {
    format!("ixion/runtime/functions/Function{arity}")
}

/// Highest arity with a runtime function interface.
pub const MAX_FUNCTION_ARITY: usize = 3;

pub(crate) fn register_prelude(registry: &mut HostRegistry) {
    let string = SemanticType::string();

    registry.register(
        HostClassDescriptor::class("java/lang/Object")
            .constructor(vec![])
            .method("equals", "(Ljava/lang/Object;)Z")
            .method("hashCode", "()I")
            .method("toString", "()Ljava/lang/String;"),
    );

    registry.register(
        HostClassDescriptor::interface("java/lang/CharSequence")
            .abstract_method("length", "()I")
            .abstract_method("charAt", "(I)C"),
    );

    registry.register(
        HostClassDescriptor::class("java/lang/String")
            .implements("java/lang/CharSequence")
            .with_modifiers(Modifiers::FINAL)
            .constructor(vec![])
            .constructor(vec![string.clone()])
            .method("length", "()I")
            .method("charAt", "(I)C")
            .method("isEmpty", "()Z")
            .method("concat", "(Ljava/lang/String;)Ljava/lang/String;")
            .method("repeat", "(I)Ljava/lang/String;")
            .method("equals", "(Ljava/lang/Object;)Z")
            .method("substring", "(I)Ljava/lang/String;")
            .method("substring", "(II)Ljava/lang/String;")
            .method("toUpperCase", "()Ljava/lang/String;")
            .method("toLowerCase", "()Ljava/lang/String;")
            .method("trim", "()Ljava/lang/String;")
            .method("contains", "(Ljava/lang/CharSequence;)Z")
            .static_method("valueOf", "(I)Ljava/lang/String;")
            .static_method("valueOf", "(D)Ljava/lang/String;")
            .static_method("valueOf", "(Ljava/lang/Object;)Ljava/lang/String;"),
    );

    registry.register(
        HostClassDescriptor::class("java/lang/Number")
            .with_modifiers(Modifiers::ABSTRACT)
            .constructor(vec![])
            .abstract_method("intValue", "()I")
            .abstract_method("longValue", "()J")
            .abstract_method("floatValue", "()F")
            .abstract_method("doubleValue", "()D"),
    );

    register_wrappers(registry);

    registry.register(
        HostClassDescriptor::class("java/lang/Math")
            .with_modifiers(Modifiers::FINAL)
            .static_method("abs", "(I)I")
            .static_method("abs", "(J)J")
            .static_method("abs", "(D)D")
            .static_method("max", "(II)I")
            .static_method("max", "(DD)D")
            .static_method("min", "(II)I")
            .static_method("min", "(DD)D")
            .static_method("sqrt", "(D)D")
            .static_method("pow", "(DD)D")
            .field(
                "PI",
                SemanticType::DOUBLE,
                Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL,
            ),
    );

    let mut print_stream = HostClassDescriptor::class("java/io/PrintStream").method("println", "()V");
    for descriptor in ["I", "J", "F", "D", "Z", "C", "Ljava/lang/String;", "Ljava/lang/Object;"] {
        print_stream = print_stream
            .method("print", &format!("({descriptor})V"))
            .method("println", &format!("({descriptor})V"));
    }
    registry.register(print_stream);

    registry.register(
        HostClassDescriptor::class("java/lang/System")
            .with_modifiers(Modifiers::FINAL)
            .field(
                "out",
                SemanticType::reference("java/io/PrintStream"),
                Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL,
            )
            .static_method("currentTimeMillis", "()J"),
    );

    registry.register(
        HostClassDescriptor::class("java/lang/Throwable")
            .constructor(vec![])
            .constructor(vec![string.clone()])
            .method("getMessage", "()Ljava/lang/String;"),
    );
    for (name, parent) in [
        ("java/lang/Exception", "java/lang/Throwable"),
        ("java/lang/RuntimeException", "java/lang/Exception"),
        ("java/lang/NullPointerException", "java/lang/RuntimeException"),
        ("java/lang/IllegalArgumentException", "java/lang/RuntimeException"),
        ("java/lang/IllegalStateException", "java/lang/RuntimeException"),
    ] {
        registry.register(
            HostClassDescriptor::class(name)
                .extends(parent)
                .constructor(vec![])
                .constructor(vec![string.clone()]),
        );
    }

    registry.register(HostClassDescriptor::interface("java/lang/Runnable").abstract_method("run", "()V"));
    registry.register(
        HostClassDescriptor::interface("java/util/function/Function")
            .abstract_method("apply", "(Ljava/lang/Object;)Ljava/lang/Object;"),
    );
    registry.register(
        HostClassDescriptor::interface("java/util/function/Supplier")
            .abstract_method("get", "()Ljava/lang/Object;"),
    );

    registry.register(
        HostClassDescriptor::class("java/util/ArrayList")
            .constructor(vec![])
            .constructor(vec![SemanticType::INT])
            .method("add", "(Ljava/lang/Object;)Z")
            .method("get", "(I)Ljava/lang/Object;")
            .method("size", "()I")
            .method("isEmpty", "()Z"),
    );

    registry.register(HostClassDescriptor::interface("ixion/runtime/functions/Function"));
    for arity in 0..=MAX_FUNCTION_ARITY {
        let params = "Ljava/lang/Object;".repeat(arity);
        registry.register(
            HostClassDescriptor::interface(&function_interface(arity))
                .implements("ixion/runtime/functions/Function")
                .abstract_method("invoke", &format!("({params})Ljava/lang/Object;")),
        );
    }
}

fn register_wrappers(registry: &mut HostRegistry) {
    let kinds = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Char,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];
    for kind in kinds {
        let Some(wrapper) = kind.wrapper_class() else {
            continue;
        };
        let prim = kind.descriptor();
        let mut class = HostClassDescriptor::class(wrapper)
            .with_modifiers(Modifiers::FINAL)
            .static_method("valueOf", &format!("({prim})L{wrapper};"))
            .method(kind.unbox_method(), &format!("(){prim}"))
            .method("equals", "(Ljava/lang/Object;)Z")
            .method("toString", "()Ljava/lang/String;");
        if kind.is_numeric() && kind != PrimitiveKind::Char {
            class = class.extends("java/lang/Number");
            for other in ["intValue:I", "longValue:J", "floatValue:F", "doubleValue:D"] {
                let Some((name, ret)) = other.split_once(':') else {
                    continue;
                };
                if name != kind.unbox_method() {
                    class = class.method(name, &format!("(){ret}"));
                }
            }
        }
        class = match kind {
            PrimitiveKind::Int => class
                .static_method("parseInt", "(Ljava/lang/String;)I")
                .field("MAX_VALUE", SemanticType::INT, Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL)
                .field("MIN_VALUE", SemanticType::INT, Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL),
            PrimitiveKind::Double => class.static_method("parseDouble", "(Ljava/lang/String;)D"),
            PrimitiveKind::Boolean => class.static_method("parseBoolean", "(Ljava/lang/String;)Z"),
            PrimitiveKind::Long => class.static_method("parseLong", "(Ljava/lang/String;)J"),
            _ => class,
        };
        registry.register(class);
    }
}
