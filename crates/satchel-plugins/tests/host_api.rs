//! Host API tests: capability validation, registration and queries.

use std::sync::Arc;

use satchel_plugins::{
    CapabilityContract, DEFAULT_SYMBOL, FactoryLoader, INTERNAL_ROOT, InstanceHandle,
    PluginError, PluginHost, PluginInstance, downcast_arc,
};
use satchel_test::{
    ArchiveBuilder, MockInstance, MockLoader, TestDirs, init_test_tracing, test_plugin_config,
    write_cached_plugin,
};

fn add_plugin(dirs: &TestDirs, name: &str, capability: &str) {
    ArchiveBuilder::new()
        .with_folder(name)
        .with_metadata(&test_plugin_config(name, capability))
        .unwrap()
        .write_to(&dirs.archive(name))
        .unwrap();
}

fn host(dirs: &TestDirs, loader: MockLoader) -> PluginHost {
    init_test_tracing();
    PluginHost::new(&dirs.archives, &dirs.cache, loader).with_contracts([
        CapabilityContract::new("greeter", ["greet"]),
        CapabilityContract::new("middleware", ["wrap", "serve"]),
    ])
}

#[test]
fn plugins_are_queryable_by_name_and_type() {
    let dirs = TestDirs::new().unwrap();
    add_plugin(&dirs, "hello", "greeter");
    add_plugin(&dirs, "howdy", "greeter");
    add_plugin(&dirs, "gzip", "middleware");

    let loader = MockLoader::new()
        .with_plugin("example.com/hello", ["greet"])
        .with_plugin("example.com/howdy", ["greet", "wave"])
        .with_plugin("example.com/gzip", ["serve", "wrap"]);
    let mut host = host(&dirs, loader);
    host.load_plugins().unwrap();

    assert_eq!(
        host.list().into_iter().collect::<Vec<_>>(),
        vec!["gzip", "hello", "howdy"]
    );
    assert_eq!(
        host.list_by_type("greeter").into_iter().collect::<Vec<_>>(),
        vec!["hello", "howdy"]
    );
    assert!(host.list_by_type("codec").is_empty());

    let howdy = host.plugin("howdy").unwrap();
    let mock = howdy.downcast_ref::<MockInstance>().unwrap();
    assert_eq!(mock.import, "example.com/howdy");
    assert!(mock.root.starts_with(&dirs.cache));

    let owned = downcast_arc::<MockInstance>(host.plugin("gzip").unwrap()).unwrap();
    assert!(owned.operations.contains(&"wrap".to_string()));
}

#[test]
fn missing_plugin_is_an_error() {
    let dirs = TestDirs::new().unwrap();
    let host = host(&dirs, MockLoader::new());
    assert!(host.get("ghost").is_none());
    assert!(matches!(
        host.plugin("ghost").unwrap_err(),
        PluginError::NoSuchPlugin(name) if name == "ghost"
    ));
}

#[test]
fn incomplete_instance_is_rejected() {
    let dirs = TestDirs::new().unwrap();
    add_plugin(&dirs, "a-good", "middleware");
    add_plugin(&dirs, "b-half", "middleware");

    let loader = MockLoader::new()
        .with_plugin("example.com/a-good", ["serve", "wrap"])
        .with_plugin("example.com/b-half", ["serve"]);
    let mut host = host(&dirs, loader);

    let err = host.load_plugins().unwrap_err();
    match err {
        PluginError::CapabilityNotImplemented {
            plugin,
            capability,
            missing,
        } => {
            assert_eq!(plugin, "b-half");
            assert_eq!(capability, "middleware");
            assert_eq!(missing, vec!["wrap"]);
        },
        other => panic!("unexpected error: {other}"),
    }

    // Registered before the failure, so still visible.
    assert!(host.get("a-good").is_some());
    assert!(host.get("b-half").is_none());
}

#[test]
fn unknown_capability_type_is_rejected() {
    let dirs = TestDirs::new().unwrap();
    add_plugin(&dirs, "mystery", "teleporter");

    let loader = MockLoader::new().with_plugin("example.com/mystery", ["beam"]);
    let mut host = host(&dirs, loader);

    let err = host.load_plugins().unwrap_err();
    assert!(matches!(err, PluginError::UnknownCapabilityType(t) if t == "teleporter"));
    assert!(host.list().is_empty());

    // Registering the type afterwards lets the next pass succeed.
    host.register_type("teleporter", ["beam"]);
    let report = host.load_plugins().unwrap();
    assert_eq!(report.registered, vec!["mystery"]);
}

#[test]
fn loader_failure_aborts_the_pass() {
    let dirs = TestDirs::new().unwrap();
    add_plugin(&dirs, "a-fine", "greeter");
    add_plugin(&dirs, "b-broken", "greeter");
    add_plugin(&dirs, "c-never", "greeter");

    let loader = MockLoader::new()
        .with_plugin("example.com/a-fine", ["greet"])
        .with_failure("example.com/b-broken")
        .with_plugin("example.com/c-never", ["greet"]);
    let calls = loader.clone();
    let mut host = host(&dirs, loader);

    assert!(matches!(
        host.load_plugins().unwrap_err(),
        PluginError::Load { .. }
    ));
    assert_eq!(calls.calls().len(), 2);
    assert_eq!(
        host.list().into_iter().collect::<Vec<_>>(),
        vec!["a-fine"]
    );
}

#[test]
fn loader_receives_root_import_and_symbol() {
    let dirs = TestDirs::new().unwrap();
    add_plugin(&dirs, "hello", "greeter");

    let loader = MockLoader::new().with_plugin("example.com/hello", ["greet"]);
    let calls = loader.clone();
    let mut host = host(&dirs, loader);
    host.load_plugins().unwrap();

    let mut host = host.with_symbol("Entry");
    host.load_plugins().unwrap();

    let calls = calls.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].symbol, DEFAULT_SYMBOL);
    assert_eq!(calls[1].symbol, "Entry");
    assert_eq!(calls[0].import, "example.com/hello");
    assert_eq!(calls[0].root, host.record("hello").unwrap().root);
    assert!(calls[0].root.join("plugin.yml").is_file());
}

#[test]
fn internal_plugins_bypass_the_filesystem() {
    init_test_tracing();
    let mut host = PluginHost::new("", "", MockLoader::new())
        .with_contracts([CapabilityContract::new("greeter", ["greet"])]);

    host.register_internal(
        MockInstance::new("builtin", ["greet"]).into_handle(),
        test_plugin_config("builtin", "greeter"),
    )
    .unwrap();

    let record = host.record("builtin").unwrap();
    assert!(record.is_internal());
    assert_eq!(record.root, std::path::Path::new(INTERNAL_ROOT).join("builtin"));
    assert_eq!(
        host.list_by_type("greeter").into_iter().collect::<Vec<_>>(),
        vec!["builtin"]
    );

    // A pass still requires both directories.
    assert!(matches!(
        host.load_plugins().unwrap_err(),
        PluginError::MissingDirectoryConfig(_)
    ));
    assert!(host.get("builtin").is_some());
}

#[test]
fn internal_plugins_survive_load_passes() {
    let dirs = TestDirs::new().unwrap();
    add_plugin(&dirs, "hello", "greeter");
    let loader = MockLoader::new().with_plugin("example.com/hello", ["greet"]);
    let mut host = host(&dirs, loader);

    host.register_internal(
        MockInstance::new("builtin", ["greet"]).into_handle(),
        test_plugin_config("builtin", "greeter"),
    )
    .unwrap();

    let report = host.load_plugins().unwrap();
    assert_eq!(report.registered, vec!["hello"]);
    assert!(report.pruned.is_empty());
    assert_eq!(host.list().len(), 2);
    assert!(dirs.cached_dirs().unwrap().iter().all(|d| d.starts_with("hello-")));
}

#[test]
fn internal_plugin_returns_when_its_archive_override_is_removed() {
    let dirs = TestDirs::new().unwrap();
    add_plugin(&dirs, "hello", "greeter");
    let loader = MockLoader::new().with_plugin("example.com/hello", ["greet"]);
    let mut host = host(&dirs, loader);

    host.register_internal(
        MockInstance::new("hello", ["greet"]).into_handle(),
        test_plugin_config("hello", "greeter"),
    )
    .unwrap();

    host.load_plugins().unwrap();
    assert!(!host.record("hello").unwrap().is_internal());

    std::fs::remove_file(dirs.archive("hello")).unwrap();
    let report = host.load_plugins().unwrap();
    assert_eq!(report.pruned, vec!["hello"]);

    let record = host.record("hello").unwrap();
    assert!(record.is_internal());
    assert_eq!(record.root, std::path::Path::new(INTERNAL_ROOT).join("hello"));
}

#[test]
fn internal_plugins_are_validated() {
    let mut host = PluginHost::new("", "", MockLoader::new());
    host.register_type("middleware", ["wrap", "serve"]);

    let err = host
        .register_internal(
            MockInstance::new("lazy", ["serve"]).into_handle(),
            test_plugin_config("lazy", "middleware"),
        )
        .unwrap_err();
    assert!(matches!(err, PluginError::CapabilityNotImplemented { .. }));
    assert!(host.list().is_empty());
}

#[test]
fn local_cache_plugin_is_loaded_in_place() {
    let dirs = TestDirs::new().unwrap();
    let metadata = write_cached_plugin(
        &dirs.cache,
        "dev",
        &test_plugin_config("dev", "greeter").with_local(true),
    )
    .unwrap();
    let before = std::fs::read(&metadata).unwrap();

    let mut host = host(&dirs, MockLoader::new().with_plugin("example.com/dev", ["greet"]));
    let report = host.load_plugins().unwrap();

    assert!(report.extracted.is_empty());
    assert_eq!(report.registered, vec!["dev"]);
    // Local metadata is never stamped.
    assert_eq!(std::fs::read(&metadata).unwrap(), before);
}

struct Clock;

impl PluginInstance for Clock {
    fn operations(&self) -> Vec<String> {
        vec!["now".into()]
    }
}

#[test]
fn factory_loader_drives_a_full_pass() {
    let dirs = TestDirs::new().unwrap();
    add_plugin(&dirs, "clock", "timer");

    let loader = FactoryLoader::new()
        .with_default("example.com/clock", |_| Ok(Arc::new(Clock) as InstanceHandle));
    let mut host = PluginHost::new(&dirs.archives, &dirs.cache, loader);
    host.register_type("timer", ["now"]);

    host.load_plugins().unwrap();
    assert!(host.plugin("clock").unwrap().is::<Clock>());
}
