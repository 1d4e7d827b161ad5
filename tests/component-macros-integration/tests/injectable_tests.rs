//! `#[derive(Injectable)]` 集成测试

use component_macros::Injectable;
use di_abstractions::{ClassFilter, ExtraArg, Injectable as _, Injected, Lifetime, TypeDescriptor};
use di_impl::{DefinitionScanner, ScannerConfig, ServiceDefinition, ServiceRegistry};
use infrastructure_common::DependencyError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub trait Dummy: Send + Sync {
    fn label(&self) -> String;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Injectable)]
#[injectable(implements(dyn Dummy))]
pub struct PlainDummy;

impl Dummy for PlainDummy {
    fn label(&self) -> String {
        "plain".to_string()
    }
}

#[derive(Injectable)]
#[service_provider(name = "NamedDummy", lifetime = singleton, priority = 100)]
#[injectable(implements(dyn Dummy), tag = "named")]
pub struct NamedDummy {
    #[init(Uuid::new_v4)]
    id: Uuid,
}

impl Dummy for NamedDummy {
    fn label(&self) -> String {
        format!("named-{}", self.id)
    }
}

#[derive(Injectable)]
#[service_provider(name = "LowDummy", priority = -1)]
#[injectable(implements(dyn Dummy))]
pub struct LowDummy;

impl Dummy for LowDummy {
    fn label(&self) -> String {
        "low".to_string()
    }
}

#[derive(Injectable)]
#[service_provider]
#[injectable(implements(dyn Clock))]
pub struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        42
    }
}

/// 构造函数注入与字段注入混合
#[derive(Injectable)]
pub struct Combo {
    #[inject]
    clock: Arc<dyn Clock>,
    #[inject(provider = "LowDummy")]
    low: Arc<dyn Dummy>,
    #[inject]
    dummy: Injected<dyn Dummy>,
    #[inject(provider = "NamedDummy")]
    named: Injected<dyn Dummy>,
    label: String,
}

/// 混合参数
#[derive(Injectable)]
pub struct Echo {
    #[inject]
    clock: Arc<dyn Clock>,
    #[arg]
    prefix: String,
    #[arg]
    repeat: usize,
}

impl Echo {
    fn render(&self) -> String {
        format!("{}{}", self.prefix, self.clock.now()).repeat(self.repeat)
    }
}

static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

fn next_sequence() -> usize {
    SEQUENCE.fetch_add(1, Ordering::SeqCst) + 1
}

#[derive(Injectable)]
pub struct Sequenced {
    #[init(next_sequence)]
    sequence: usize,
    #[init(Vec::new)]
    history: Vec<String>,
}

fn dummy_contract() -> TypeDescriptor {
    TypeDescriptor::contract::<dyn Dummy>().build()
}

fn clock_contract() -> TypeDescriptor {
    TypeDescriptor::contract::<dyn Clock>().build()
}

fn registry() -> Arc<ServiceRegistry> {
    let registry = ServiceRegistry::with_enforcement(true);
    let definitions = vec![
        ServiceDefinition::new(dummy_contract())
            .with::<PlainDummy>()
            .with::<NamedDummy>()
            .with::<LowDummy>(),
        ServiceDefinition::new(clock_contract()).with::<FixedClock>(),
    ];
    let scanner = DefinitionScanner::new(Arc::new(definitions), ScannerConfig::default());
    assert!(registry.load_from(&scanner));
    registry
}

#[test]
fn test_descriptor_contracts_and_metadata() {
    let descriptor = NamedDummy::descriptor();
    assert!(descriptor.is_assignable_to_type::<dyn Dummy>());
    assert!(descriptor.is_assignable_to_type::<NamedDummy>());
    assert!(!descriptor.is_assignable_to_type::<dyn Clock>());
    assert!(descriptor.has_tag("named"));

    let metadata = descriptor.metadata().unwrap();
    assert_eq!(metadata.name.as_deref(), Some("NamedDummy"));
    assert_eq!(metadata.lifetime, Lifetime::Singleton);
    assert_eq!(metadata.priority, 100);
    assert_eq!(LowDummy::descriptor().metadata().unwrap().priority, -1);

    // 不写参数时使用默认元数据
    let clock = FixedClock::descriptor();
    assert_eq!(clock.metadata().unwrap().lifetime, Lifetime::Transient);
    assert!(clock.metadata().unwrap().name.is_none());
    assert!(PlainDummy::descriptor().metadata().is_none());
}

#[test]
fn test_generated_constructor_shape() {
    let descriptor = Combo::descriptor();
    assert_eq!(descriptor.constructors().len(), 1);
    let constructor = &descriptor.constructors()[0];
    assert!(constructor.is_dependency_injection());
    let params: Vec<_> = constructor.params().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["clock", "low"]);
    assert_eq!(constructor.params()[1].provider_name.as_deref(), Some("LowDummy"));

    let fields: Vec<_> = descriptor.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["dummy", "named"]);
    assert_eq!(descriptor.fields()[1].provider_name.as_deref(), Some("NamedDummy"));
}

#[test]
fn test_default_provider_follows_priority() {
    let registry = registry();
    let dummy = registry.load_service_provider::<dyn Dummy>().unwrap();
    assert!(dummy.label().starts_with("named-"));

    let low = registry
        .load_service_provider_named::<dyn Dummy>("LowDummy")
        .unwrap();
    assert_eq!(low.label(), "low");

    // 没有名称的提供者使用类型的完全限定名
    let plain_name = std::any::type_name::<PlainDummy>();
    let plain = registry
        .load_service_provider_named::<dyn Dummy>(plain_name)
        .unwrap();
    assert_eq!(plain.label(), "plain");
}

#[test]
fn test_singleton_provider_is_shared() {
    let registry = registry();
    let a = registry
        .load_service_provider_named::<dyn Dummy>("NamedDummy")
        .unwrap();
    let b = registry
        .load_service_provider_named::<dyn Dummy>("NamedDummy")
        .unwrap();
    assert_eq!(a.label(), b.label());

    let c = registry
        .load_service_provider_named::<dyn Dummy>("LowDummy")
        .unwrap();
    let d = registry
        .load_service_provider_named::<dyn Dummy>("LowDummy")
        .unwrap();
    assert!(!Arc::ptr_eq(&c, &d));
}

#[test]
fn test_constructor_and_field_injection() {
    let registry = registry();
    let combo = registry.load_class::<Combo>().unwrap();
    assert_eq!(combo.clock.now(), 42);
    assert_eq!(combo.low.label(), "low");
    assert!(combo.dummy.get().unwrap().label().starts_with("named-"));
    assert_eq!(
        combo.named.get().unwrap().label(),
        combo.dummy.get().unwrap().label()
    );
    assert!(combo.label.is_empty());
}

#[test]
fn test_missing_dependency_reported() {
    let registry = ServiceRegistry::new();
    assert!(registry.load_from(&DefinitionScanner::new(
        Arc::new(vec![ServiceDefinition::new(clock_contract()).with::<FixedClock>()]),
        ScannerConfig::default(),
    )));
    assert!(registry.load_class::<Combo>().is_err());
}

#[test]
fn test_mixed_arguments() {
    let registry = registry();
    let echo = registry
        .load_class_with_args::<Echo>(vec![ExtraArg::new("t=".to_string()), ExtraArg::new(2usize)])
        .unwrap();
    assert_eq!(echo.render(), "t=42t=42");

    let missing = registry.load_class_with_args::<Echo>(vec![ExtraArg::new("t=".to_string())]);
    assert!(matches!(
        missing,
        Err(DependencyError::MissingArgument { ref param, .. }) if param == "repeat"
    ));

    let mismatch =
        registry.load_class_with_args::<Echo>(vec![ExtraArg::new(1i32), ExtraArg::new(2usize)]);
    assert!(matches!(
        mismatch,
        Err(DependencyError::ArgumentTypeMismatch { ref param, .. }) if param == "prefix"
    ));
}

#[test]
fn test_init_expressions() {
    let registry = registry();
    let first = registry.load_class::<Sequenced>().unwrap();
    let second = registry.load_class::<Sequenced>().unwrap();
    assert!(second.sequence > first.sequence);
    assert!(first.history.is_empty());
}

#[test]
fn test_filters_see_derived_metadata() {
    let with_metadata = ClassFilter::has_provider_metadata();
    assert!(with_metadata.accept(&NamedDummy::descriptor()));
    assert!(!with_metadata.accept(&PlainDummy::descriptor()));
    assert!(ClassFilter::has_tag("named").accept(&NamedDummy::descriptor()));

    let registry = ServiceRegistry::new();
    let scanner = DefinitionScanner::new(
        Arc::new(vec![ServiceDefinition::new(dummy_contract())
            .with::<PlainDummy>()
            .with::<NamedDummy>()
            .with::<LowDummy>()]),
        ScannerConfig::new(ClassFilter::accept_all(), with_metadata, false),
    );
    assert!(registry.load_from(&scanner));
    assert_eq!(
        registry.find_service::<dyn Dummy>().unwrap().provider_count(),
        2
    );
}
