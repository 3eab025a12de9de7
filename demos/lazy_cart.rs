//! Lazily load a module, then watch which store updates reach a consumer.
//!
//! Run with `RUST_LOG=modinject=trace cargo run --example lazy_cart`.

use std::sync::Arc;

use modinject::{create_inject, Dependency, InjectOptions, MemoryStore, Module, ModuleStore};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = MemoryStore::new();
    store.register_lazy("cart", || async {
        Ok(Module::builder()
            .state_from(json!({ "items": [], "coupon": null }))
            .map("count", 0)
            .action("clear", |_| json!({ "items": [] }).into())
            .build())
    });
    store.register_lazy("flaky", || async { Err(anyhow::anyhow!("backend unavailable")) });

    let shared: Arc<dyn ModuleStore> = Arc::new(store.clone());
    let injector = create_inject(move || Arc::clone(&shared), InjectOptions::flat());
    let mut consumer = injector.consumer();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    consumer.on_settled(move || {
        let _ = tx.send(());
    });

    // Only the item count matters to this consumer.
    let dep = Dependency::new().maps("count");

    let first = consumer.inject("cart", Some(&dep));
    println!("cart: loading={} value={}", first.loading, first.value.is_some());
    consumer.inject("flaky", None);

    for _ in 0..2 {
        rx.recv().await;
    }

    let loaded = consumer.inject("cart", Some(&dep));
    let flaky = consumer.inject("flaky", None);
    println!("cart: loading={} keys={:?}", loaded.loading, loaded.flat().map(|f| f.keys().collect::<Vec<_>>()));
    println!("flaky: loading={} error={:?}", flaky.loading, flaky.error.map(|e| e.to_string()));

    let mut renders = 0;
    let previous = loaded.value.clone();
    store.update_module("cart", |m| {
        m.state.insert("coupon".into(), "SAVE10".into());
    });
    let after_coupon = consumer.inject("cart", Some(&dep)).value;
    if !matches!((&previous, &after_coupon), (Some(a), Some(b)) if a.ptr_eq(b)) {
        renders += 1;
    }

    store.update_module("cart", |m| {
        m.state.insert("items".into(), json!(["apple"]).into());
        m.maps.insert("count".into(), 1.into());
    });
    let after_item = consumer.inject("cart", Some(&dep)).value;
    if !matches!((&after_coupon, &after_item), (Some(a), Some(b)) if a.ptr_eq(b)) {
        renders += 1;
    }

    println!("re-renders after two updates: {}", renders);
    Ok(())
}
