//! 启动流程集成测试：配置文件 → 启动选项 → 注册表 → 服务管理器

use di_abstractions::{ClassFilter, Constructor, TypeDescriptor};
use di_impl::{ModuleDescriptor, DEFINITION_SCANNER, MODULE_SCANNER};
use infrastructure_composition::{
    BootstrapOptions, BootstrapSettings, RegistryBootstrap, ServiceManager,
};
use parking_lot::{const_mutex, Mutex};
use std::sync::Arc;

static GUARD: Mutex<()> = const_mutex(());

pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

pub trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        7
    }
}

pub struct EmailNotifier;

impl Notifier for EmailNotifier {
    fn channel(&self) -> &'static str {
        "email"
    }
}

fn clock_contract() -> TypeDescriptor {
    TypeDescriptor::contract::<dyn Clock>().build()
}

fn notifier_contract() -> TypeDescriptor {
    TypeDescriptor::contract::<dyn Notifier>().build()
}

fn system_clock() -> TypeDescriptor {
    TypeDescriptor::builder::<SystemClock>()
        .implements::<dyn Clock>(|this| this)
        .constructor(Constructor::new(|_| Ok(SystemClock)))
        .build()
}

fn email_notifier() -> TypeDescriptor {
    TypeDescriptor::builder::<EmailNotifier>()
        .implements::<dyn Notifier>(|this| this)
        .constructor(Constructor::new(|_| Ok(EmailNotifier)))
        .build()
}

#[linkme::distributed_slice(di_impl::MODULES)]
static CLOCK_MODULE: fn() -> ModuleDescriptor = clock_module;

fn clock_module() -> ModuleDescriptor {
    ModuleDescriptor::new("bootstrap-clock").provides(clock_contract(), [system_clock()])
}

#[test]
fn test_settings_file_to_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bootstrap.toml");
    std::fs::write(
        &path,
        "enforce_assignability = true\nservice_module_prefix = \"bootstrap_integration\"\n",
    )
    .unwrap();

    let settings = BootstrapSettings::load_with_prefix(Some(&path), "SERVICE_DI_IT").unwrap();
    assert!(settings.enforce_assignability);

    let options = settings
        .to_options_builder()
        .append_service(notifier_contract(), email_notifier())
        .build()
        .unwrap();
    let registry = RegistryBootstrap::load(options).unwrap();
    assert!(registry.is_loaded());
    assert!(registry.enforce_assignability());
    assert!(registry.is_scanner_loaded(DEFINITION_SCANNER));

    assert_eq!(registry.load_service_provider::<dyn Clock>().unwrap().now(), 7);
    assert_eq!(
        registry.load_service_provider::<dyn Notifier>().unwrap().channel(),
        "email"
    );
    // 模块前缀过滤掉了注入器
    assert!(!registry.has_service::<di_impl::Injector>());
}

#[test]
fn test_service_manager_lifecycle() {
    let _guard = GUARD.lock();
    ServiceManager::reset();

    let options = BootstrapOptions::builder()
        .append_service(notifier_contract(), email_notifier())
        .build()
        .unwrap();
    let registry = ServiceManager::new_instance(options).unwrap();
    assert!(Arc::ptr_eq(&registry, &ServiceManager::registry()));
    assert!(ServiceManager::is_loaded());
    assert!(ServiceManager::scanners().contains(&MODULE_SCANNER.to_string()));

    assert_eq!(ServiceManager::load_service::<dyn Clock>().unwrap().now(), 7);
    assert_eq!(ServiceManager::load_all_services::<dyn Notifier>().unwrap().len(), 1);

    assert!(ServiceManager::reload_registry_with(
        &ClassFilter::implements::<dyn Notifier>(),
        &ClassFilter::accept_all(),
    ));
    assert!(!ServiceManager::has_service::<dyn Clock>());
    assert!(ServiceManager::has_service::<dyn Notifier>());

    let previous = ServiceManager::reset();
    assert!(previous.is_some());
    assert!(!ServiceManager::is_installed());
}

#[test]
fn test_service_manager_default_uses_linked_modules() {
    let _guard = GUARD.lock();
    ServiceManager::reset();
    assert!(ServiceManager::load_service::<dyn Clock>().is_ok());
    assert!(ServiceManager::load_service::<dyn Notifier>().is_err());
    ServiceManager::reset();
}
