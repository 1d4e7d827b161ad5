//! 服务注册表集成测试
//!
//! 模块通过分布式切片链接进测试程序，清单归档在临时目录中生成。

use di_abstractions::{ClassFilter, Constructor, Injectable, Injected, TypeDescriptor};
use di_impl::{
    Injector, ModuleDescriptor, ServiceRegistry, MANIFEST_SCANNER, MODULE_SCANNER,
    SERVICE_MANIFEST_DIR,
};
use infrastructure_common::{DependencyError, Lifetime, ProviderMetadata};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Once};
use uuid::Uuid;

static INIT: Once = Once::new();

fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub trait Storage: Send + Sync {
    fn id(&self) -> Uuid;
    fn kind(&self) -> &'static str;
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;
}

pub struct MemoryStorage {
    id: Uuid,
}

impl Storage for MemoryStorage {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

pub struct SharedStorage {
    id: Uuid,
}

impl Storage for SharedStorage {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> &'static str {
        "shared"
    }
}

pub struct AuditPlugin;

impl Plugin for AuditPlugin {
    fn name(&self) -> &'static str {
        "audit"
    }
}

pub struct MetricsPlugin;

impl Plugin for MetricsPlugin {
    fn name(&self) -> &'static str {
        "metrics"
    }
}

/// 依赖存储并通过字段获得插件
pub struct Archive {
    storage: Arc<dyn Storage>,
    plugin: Injected<dyn Plugin>,
}

impl Injectable for Archive {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(
                Constructor::new(|args| {
                    Ok(Archive {
                        storage: args.service::<dyn Storage>()?,
                        plugin: Injected::new(),
                    })
                })
                .param::<dyn Storage>("storage")
                .dependency_injection(),
            )
            .field::<dyn Plugin>("plugin", |this| &this.plugin)
            .build()
    }
}

fn storage_contract() -> TypeDescriptor {
    TypeDescriptor::contract::<dyn Storage>().build()
}

fn plugin_contract() -> TypeDescriptor {
    TypeDescriptor::contract::<dyn Plugin>().build()
}

fn memory_storage() -> TypeDescriptor {
    TypeDescriptor::builder::<MemoryStorage>()
        .implements::<dyn Storage>(|this| this)
        .constructor(Constructor::new(|_| Ok(MemoryStorage { id: Uuid::new_v4() })))
        .build()
}

fn shared_storage() -> TypeDescriptor {
    TypeDescriptor::builder::<SharedStorage>()
        .implements::<dyn Storage>(|this| this)
        .service_provider(
            ProviderMetadata::new(Lifetime::Singleton)
                .with_name("shared")
                .with_priority(10),
        )
        .constructor(Constructor::new(|_| Ok(SharedStorage { id: Uuid::new_v4() })))
        .build()
}

fn audit_plugin() -> TypeDescriptor {
    TypeDescriptor::builder::<AuditPlugin>()
        .implements::<dyn Plugin>(|this| this)
        .service_provider(ProviderMetadata::new(Lifetime::Transient).with_name("audit"))
        .constructor(Constructor::new(|_| Ok(AuditPlugin)))
        .build()
}

fn metrics_plugin() -> TypeDescriptor {
    TypeDescriptor::builder::<MetricsPlugin>()
        .implements::<dyn Plugin>(|this| this)
        .constructor(Constructor::new(|_| Ok(MetricsPlugin)))
        .build()
}

#[linkme::distributed_slice(di_impl::MODULES)]
static STORAGE_MODULE: fn() -> ModuleDescriptor = storage_module;

fn storage_module() -> ModuleDescriptor {
    ModuleDescriptor::new("integration-storage")
        .provides(storage_contract(), [memory_storage(), shared_storage()])
}

// 插件只导出类型，由清单声明提供关系
#[linkme::distributed_slice(di_impl::MODULES)]
static PLUGIN_MODULE: fn() -> ModuleDescriptor = plugin_module;

fn plugin_module() -> ModuleDescriptor {
    ModuleDescriptor::new("integration-plugins")
        .exports(plugin_contract())
        .exports(audit_plugin())
        .exports(metrics_plugin())
}

fn write_plugin_archive(path: &Path) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    zip.start_file(
        format!("{}/{}", SERVICE_MANIFEST_DIR, plugin_contract().name()),
        options,
    )
    .unwrap();
    let manifest = format!(
        "# plugins\n{}\n{}\n",
        audit_plugin().name(),
        metrics_plugin().name().replace("::", ".")
    );
    zip.write_all(manifest.as_bytes()).unwrap();
    zip.finish().unwrap();
}

#[test]
fn test_linked_modules_are_discovered() {
    init_test_logging();
    let registry = ServiceRegistry::new();
    assert!(registry.load());
    assert!(registry.is_scanner_loaded(MODULE_SCANNER));
    assert!(registry.is_scanner_loaded(MANIFEST_SCANNER));

    // 内置的 di-impl 模块提供注入器
    assert!(registry.has_service::<Injector>());
    let service = registry.find_service::<dyn Storage>().unwrap();
    assert_eq!(service.provider_count(), 2);
    // 只导出的类型不是服务
    assert!(!registry.has_service::<dyn Plugin>());

    let default = registry.load_service_provider::<dyn Storage>().unwrap();
    assert_eq!(default.kind(), "shared");
    let again = registry.load_service_provider::<dyn Storage>().unwrap();
    assert_eq!(default.id(), again.id());

    let memory_name = std::any::type_name::<MemoryStorage>();
    let a = registry
        .load_service_provider_named::<dyn Storage>(memory_name)
        .unwrap();
    let b = registry
        .load_service_provider_named::<dyn Storage>(memory_name)
        .unwrap();
    assert_eq!(a.kind(), "memory");
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_manifest_archive_end_to_end() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("plugins.jar");
    write_plugin_archive(&archive);

    let registry = ServiceRegistry::builder().manifest_root(&archive).build();
    assert!(registry.load());

    let plugins: Vec<&str> = registry
        .load_all_service_providers::<dyn Plugin>()
        .unwrap()
        .iter()
        .map(|plugin| plugin.name())
        .collect();
    assert_eq!(plugins, vec!["audit", "metrics"]);
    assert_eq!(
        registry.load_service_provider::<dyn Plugin>().unwrap().name(),
        "audit"
    );

    let archive_service = registry.load_class::<Archive>().unwrap();
    assert_eq!(archive_service.storage.kind(), "shared");
    assert_eq!(archive_service.plugin.get().unwrap().name(), "audit");
}

#[test]
fn test_manifest_roots_merge_with_modules() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let services = dir.path().join(SERVICE_MANIFEST_DIR);
    std::fs::create_dir_all(&services).unwrap();
    // 模块已提供的实现不会重复追加
    std::fs::write(
        services.join(storage_contract().name()),
        format!("{}\n", memory_storage().name()),
    )
    .unwrap();

    let registry = ServiceRegistry::builder().manifest_root(dir.path()).build();
    assert!(registry.load());
    assert_eq!(
        registry
            .find_service::<dyn Storage>()
            .unwrap()
            .provider_count(),
        2
    );
}

#[test]
fn test_reload_with_filters() {
    init_test_logging();
    let registry = ServiceRegistry::new();
    assert!(registry.load());
    assert!(registry.reload_with(
        &ClassFilter::implements::<dyn Storage>(),
        &ClassFilter::has_provider_metadata(),
    ));
    assert_eq!(registry.service_count(), 1);
    assert_eq!(
        registry
            .find_service::<dyn Storage>()
            .unwrap()
            .provider_count(),
        1
    );
    // 注入器被过滤后使用临时注入器
    assert!(!registry.has_service::<Injector>());
    assert!(registry.load_class::<Archive>().is_err());

    assert!(registry.reload());
    assert!(registry.has_service::<Injector>());
}

#[test]
fn test_missing_services_report_errors() {
    let registry = ServiceRegistry::new();
    assert!(registry.load());
    assert!(matches!(
        registry.load_service_provider::<dyn Plugin>(),
        Err(DependencyError::ServiceNotFound { .. })
    ));
    assert!(matches!(
        registry.load_service_provider_named::<dyn Storage>("missing"),
        Err(DependencyError::ProviderNotFound { .. })
    ));
}

#[test]
fn test_concurrent_resolution_shares_singleton() {
    init_test_logging();
    let registry = ServiceRegistry::new();
    assert!(registry.load());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                registry
                    .load_service_provider_named::<dyn Storage>("shared")
                    .unwrap()
                    .id()
            })
        })
        .collect();
    let ids: Vec<Uuid> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
}
