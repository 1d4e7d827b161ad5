//! di-impl 单元测试


pub(crate) mod fixtures {
    use crate::{Provider, Service, ServiceRegistry};
    use di_abstractions::{Constructor, Injectable, Injected, TypeDescriptor};
    use infrastructure_common::{Lifetime, ProviderMetadata};
    use std::sync::{Arc, Once};
    use uuid::Uuid;

    static INIT: Once = Once::new();

    /// 初始化测试日志
    pub fn init_test_logging() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_env_filter("debug")
                .with_test_writer()
                .try_init()
                .ok();
        });
    }

    pub trait Greeter: Send + Sync {
        fn id(&self) -> Uuid;
        fn greet(&self) -> String;
    }

    pub trait Counter: Send + Sync {
        fn count(&self) -> usize;
    }

    macro_rules! greeter {
        ($name:ident, $text:expr) => {
            pub struct $name {
                id: Uuid,
            }

            impl $name {
                pub fn new() -> Self {
                    Self { id: Uuid::new_v4() }
                }
            }

            impl Greeter for $name {
                fn id(&self) -> Uuid {
                    self.id
                }

                fn greet(&self) -> String {
                    $text.to_string()
                }
            }
        };
    }

    greeter!(PlainGreeter, "hello");
    greeter!(NamedGreeter, "hello, named");
    greeter!(LoudGreeter, "HELLO");
    greeter!(SingletonGreeter, "hello, once");

    pub struct SimpleCounter;

    impl Counter for SimpleCounter {
        fn count(&self) -> usize {
            1
        }
    }

    pub fn greeter_contract() -> TypeDescriptor {
        TypeDescriptor::contract::<dyn Greeter>().build()
    }

    pub fn counter_contract() -> TypeDescriptor {
        TypeDescriptor::contract::<dyn Counter>().build()
    }

    pub fn plain_greeter() -> TypeDescriptor {
        TypeDescriptor::builder::<PlainGreeter>()
            .implements::<dyn Greeter>(|this| this)
            .constructor(Constructor::new(|_| Ok(PlainGreeter::new())))
            .build()
    }

    pub fn named_greeter(name: &str, priority: i32) -> TypeDescriptor {
        TypeDescriptor::builder::<NamedGreeter>()
            .implements::<dyn Greeter>(|this| this)
            .service_provider(
                ProviderMetadata::new(Lifetime::Transient)
                    .with_name(name)
                    .with_priority(priority),
            )
            .constructor(Constructor::new(|_| Ok(NamedGreeter::new())))
            .build()
    }

    pub fn loud_greeter(name: &str, priority: i32) -> TypeDescriptor {
        TypeDescriptor::builder::<LoudGreeter>()
            .implements::<dyn Greeter>(|this| this)
            .service_provider(
                ProviderMetadata::new(Lifetime::Transient)
                    .with_name(name)
                    .with_priority(priority),
            )
            .constructor(Constructor::new(|_| Ok(LoudGreeter::new())))
            .build()
    }

    pub fn singleton_greeter(name: &str) -> TypeDescriptor {
        TypeDescriptor::builder::<SingletonGreeter>()
            .implements::<dyn Greeter>(|this| this)
            .service_provider(ProviderMetadata::new(Lifetime::Singleton).with_name(name))
            .constructor(Constructor::new(|_| Ok(SingletonGreeter::new())))
            .build()
    }

    pub fn simple_counter() -> TypeDescriptor {
        TypeDescriptor::builder::<SimpleCounter>()
            .implements::<dyn Counter>(|this| this)
            .constructor(Constructor::new(|_| Ok(SimpleCounter)))
            .build()
    }

    /// 直接登记一个服务及其提供者
    pub fn register(
        registry: &Arc<ServiceRegistry>,
        contract: TypeDescriptor,
        providers: Vec<TypeDescriptor>,
    ) -> Arc<Service> {
        let service = Service::new(contract, registry);
        for descriptor in providers {
            service.append_provider(Provider::new(&service, descriptor).unwrap());
        }
        registry.append_service(service.clone());
        service
    }

    /// 注册了 Greeter（PlainGreeter）和 Counter 的注册表
    pub fn populated_registry() -> Arc<ServiceRegistry> {
        init_test_logging();
        let registry = ServiceRegistry::new();
        register(&registry, greeter_contract(), vec![plain_greeter()]);
        register(&registry, counter_contract(), vec![simple_counter()]);
        registry
    }

    /// 字段注入示例
    pub struct Combo {
        pub greeter: Arc<dyn Greeter>,
        pub counter: Injected<dyn Counter>,
        pub loud: Injected<dyn Greeter>,
    }

    impl Injectable for Combo {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::builder::<Self>()
                .constructor(
                    Constructor::new(|args| {
                        Ok(Combo {
                            greeter: args.service::<dyn Greeter>()?,
                            counter: Injected::new(),
                            loud: Injected::new(),
                        })
                    })
                    .param::<dyn Greeter>("greeter"),
                )
                .field::<dyn Counter>("counter", |this| &this.counter)
                .named_field::<dyn Greeter>("loud", "loud", |this| &this.loud)
                .build()
        }
    }

    /// 混合参数构造示例
    pub struct Echo {
        pub greeter: Arc<dyn Greeter>,
        pub name: String,
        pub repeat: i32,
    }

    impl Echo {
        pub fn echo_name(&self) -> String {
            (0..self.repeat).map(|_| format!("{}\n", self.name)).collect()
        }
    }

    impl Injectable for Echo {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::builder::<Self>()
                .constructor(
                    Constructor::new(|args| {
                        Ok(Echo {
                            greeter: args.service::<dyn Greeter>()?,
                            name: args.value::<String>()?,
                            repeat: args.value::<i32>()?,
                        })
                    })
                    .param::<dyn Greeter>("greeter")
                    .param::<String>("name")
                    .param::<i32>("repeat")
                    .dependency_injection(),
                )
                .build()
        }
    }
}
