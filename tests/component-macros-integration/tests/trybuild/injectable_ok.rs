use component_macros::Injectable;
use di_abstractions::{Injectable as _, Injected};
use std::sync::Arc;

pub trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

#[derive(Injectable)]
#[service_provider(name = "english", lifetime = "singleton")]
#[injectable(implements(dyn Greeter), tag = "lang")]
pub struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

#[derive(Injectable)]
pub struct Host {
    #[inject]
    greeter: Arc<dyn Greeter>,
    #[inject(provider = "english")]
    fallback: Injected<dyn Greeter>,
    #[arg]
    name: String,
    visits: u32,
}

fn main() {
    let descriptor = Host::descriptor();
    assert_eq!(descriptor.constructors().len(), 1);
    assert_eq!(descriptor.fields().len(), 1);
    assert!(English::descriptor().is_assignable_to_type::<dyn Greeter>());
}
