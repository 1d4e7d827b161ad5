//! 组合层测试


pub(crate) mod fixtures {
    use di_abstractions::{Constructor, TypeDescriptor};
    use di_impl::{ModuleDescriptor, StaticModules};
    use infrastructure_common::{Lifetime, ProviderMetadata};
    use std::sync::{Arc, Once};

    static INIT: Once = Once::new();

    /// 初始化测试日志（只初始化一次）
    pub fn init_test_logging() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_env_filter("debug")
                .with_test_writer()
                .try_init()
                .ok();
        });
    }

    pub trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    pub trait Storage: Send + Sync {
        fn kind(&self) -> &'static str;
    }

    pub struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            42
        }
    }

    pub struct MemoryStorage;

    impl Storage for MemoryStorage {
        fn kind(&self) -> &'static str {
            "memory"
        }
    }

    pub struct DiskStorage;

    impl Storage for DiskStorage {
        fn kind(&self) -> &'static str {
            "disk"
        }
    }

    pub fn clock_contract() -> TypeDescriptor {
        TypeDescriptor::contract::<dyn Clock>().build()
    }

    pub fn storage_contract() -> TypeDescriptor {
        TypeDescriptor::contract::<dyn Storage>().build()
    }

    pub fn fixed_clock() -> TypeDescriptor {
        TypeDescriptor::builder::<FixedClock>()
            .implements::<dyn Clock>(|this| this)
            .constructor(Constructor::new(|_| Ok(FixedClock)))
            .build()
    }

    pub fn memory_storage() -> TypeDescriptor {
        TypeDescriptor::builder::<MemoryStorage>()
            .implements::<dyn Storage>(|this| this)
            .constructor(Constructor::new(|_| Ok(MemoryStorage)))
            .build()
    }

    pub fn disk_storage() -> TypeDescriptor {
        TypeDescriptor::builder::<DiskStorage>()
            .implements::<dyn Storage>(|this| this)
            .service_provider(
                ProviderMetadata::new(Lifetime::Singleton)
                    .with_name("disk")
                    .with_priority(10),
            )
            .constructor(Constructor::new(|_| Ok(DiskStorage)))
            .build()
    }

    /// Clock 与 Storage 两个模块
    pub fn modules() -> Arc<StaticModules> {
        Arc::new(StaticModules::new(vec![
            ModuleDescriptor::new("clock").provides(clock_contract(), [fixed_clock()]),
            ModuleDescriptor::new("storage")
                .provides(storage_contract(), [memory_storage(), disk_storage()]),
        ]))
    }
}
