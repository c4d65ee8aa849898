//! Demo registry
//!
//! An in-memory `Widget` class served by the daemon: static CRUD entry
//! points under `/widgets` and instance methods behind `/widgets/:id`.

use bindery_core::application::RemoteObjects;
use bindery_core::domain::{
    ArgMap, ArgumentSpec, HttpSource, MethodDescriptor, RemoteError, RemoteValue, ReturnSpec,
    SharedClass, ValueType,
};
use bindery_core::port::{FnInvoker, Receiver};
use bindery_core::Result;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct WidgetStore {
    next_id: i64,
    widgets: BTreeMap<i64, Value>,
}

type Store = Arc<Mutex<WidgetStore>>;

fn lock(store: &Store) -> std::result::Result<std::sync::MutexGuard<'_, WidgetStore>, RemoteError> {
    store
        .lock()
        .map_err(|_| RemoteError::new("Widget store is unavailable"))
}

fn arg(args: &ArgMap, name: &str) -> RemoteValue {
    args.get(name).cloned().unwrap_or_default()
}

fn not_found(id: &RemoteValue) -> RemoteError {
    RemoteError::new(format!("Unknown widget {}", id.to_text()))
        .with_name("NotFoundError")
        .with_status_code(404)
}

fn invoker<F>(store: &Store, f: F) -> Arc<FnInvoker>
where
    F: Fn(&Store, Receiver, ArgMap) -> std::result::Result<RemoteValue, RemoteError>
        + Send
        + Sync
        + 'static,
{
    let store = Arc::clone(store);
    Arc::new(FnInvoker::sync(move |receiver, args| f(&store, receiver, args)))
}

/// Registry holding the `Widget` class
pub fn registry() -> Result<RemoteObjects> {
    let store: Store = Arc::default();

    let ctor = MethodDescriptor::new(
        "sharedCtor",
        invoker(&store, |store, _, args| {
            let id = &arg(&args, "id");
            let widgets = lock(store)?;
            id.as_i64()
                .and_then(|id| widgets.widgets.get(&id))
                .map(RemoteValue::from)
                .ok_or_else(|| not_found(id))
        }),
    )
    .with_arg(
        ArgumentSpec::new("id", ValueType::Number)
            .from_source(HttpSource::Path)
            .with_description("Widget id"),
    )
    .with_route("ALL", "/:id");

    let create = MethodDescriptor::new(
        "create",
        invoker(&store, |store, _, args| {
            let mut data = match arg(&args, "data").to_json() {
                Value::Object(fields) => fields,
                _ => {
                    return Err(RemoteError::new("Widget data must be an object")
                        .with_name("ValidationError")
                        .with_status(422))
                }
            };
            let mut widgets = lock(store)?;
            widgets.next_id += 1;
            let id = widgets.next_id;
            data.insert("id".to_string(), json!(id));
            let widget = Value::Object(data);
            widgets.widgets.insert(id, widget.clone());
            Ok(widget.into())
        }),
    )
    .with_arg(ArgumentSpec::new("data", ValueType::Object).from_source(HttpSource::Body))
    .with_return(ReturnSpec::new("data", ValueType::Object).root())
    .with_route("POST", "/")
    .with_status(201)
    .with_description("Create a widget");

    let find = MethodDescriptor::new(
        "find",
        invoker(&store, |store, _, args| {
            let widgets = lock(store)?;
            let filter = arg(&args, "filter").to_json();
            let matches = widgets
                .widgets
                .values()
                .filter(|widget| matches_filter(widget, &filter))
                .cloned()
                .collect::<Vec<_>>();
            Ok(Value::Array(matches).into())
        }),
    )
    .with_arg(ArgumentSpec::new("filter", ValueType::Object).from_source(HttpSource::Query))
    .with_return(ReturnSpec::new("data", ValueType::Array).root())
    .with_route("GET", "/")
    .with_description("Find widgets matching every field of a filter");

    let count = MethodDescriptor::new(
        "count",
        invoker(&store, |store, _, _| {
            let widgets = lock(store)?;
            Ok(RemoteValue::from(widgets.widgets.len() as i64))
        }),
    )
    .with_return(ReturnSpec::new("count", ValueType::Number))
    .with_route("GET", "/count");

    let get = MethodDescriptor::new(
        "get",
        invoker(&store, |_, receiver, _| match receiver {
            Receiver::Instance(widget) => Ok(widget),
            Receiver::Static => Err(RemoteError::new("get needs a widget")),
        }),
    )
    .instance()
    .with_return(ReturnSpec::new("data", ValueType::Object).root())
    .with_route("GET", "/");

    let destroy = MethodDescriptor::new(
        "destroy",
        invoker(&store, |store, receiver, _| {
            let id = match &receiver {
                Receiver::Instance(widget) => widget.get("id").and_then(RemoteValue::as_i64),
                Receiver::Static => None,
            };
            let mut widgets = lock(store)?;
            match id.and_then(|id| widgets.widgets.remove(&id)) {
                Some(_) => Ok(RemoteValue::Undefined),
                None => Err(RemoteError::new("Widget already removed").with_status(410)),
            }
        }),
    )
    .instance()
    .with_return(ReturnSpec::new("data", ValueType::Any).root())
    .with_route("DELETE", "/");

    let mut class = SharedClass::new("Widget")
        .with_route("ALL", "/widgets")
        .with_shared_ctor(ctor);
    class.add_method(create)?;
    class.add_method(find)?;
    class.add_method(count)?;
    class.add_method(get)?;
    class.add_method(destroy)?;
    class.alias("count", "size")?;

    RemoteObjects::new().with_class(class)
}

fn matches_filter(widget: &Value, filter: &Value) -> bool {
    match filter {
        Value::Object(fields) => fields
            .iter()
            .all(|(key, expected)| widget.get(key) == Some(expected)),
        _ => true,
    }
}
