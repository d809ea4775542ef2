//! Integration tests for the `funcall_library` crate.

use chrono::{DateTime, NaiveDate, Utc};
use funcall_library::convert::ConvertError;
use funcall_library::{
    AsyncChatClient, CallContext, ChatClient, Converter, ConverterRegistry, DispatchError,
    FunctionDeclaration, FunctionError, FunctionLibrary, ImportMode, InvocationRequest, Library,
    LibraryConfig, Literal, NativeType, RegistrationError, ReplyStatus, SingleCall,
    SingleCallError, ToolCall, ToolChoice, function, library,
};
use regex::Regex;
use serde_json::{Map, Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex};

// ─────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────

struct Calendar;

#[library]
impl Calendar {
    /// Schedule a reminder on a date.
    #[function]
    fn remind_on(
        &self,
        /// Day of the reminder.
        date: NaiveDate,
        /// What to be reminded of.
        #[default("something".to_string())]
        topic: String,
    ) -> String {
        format!("{topic} on {date}")
    }

    /// Return the UTC date of an instant.
    #[function(name = "utc_date")]
    fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.date_naive()
    }

    /// Greet someone, with an optional title.
    #[function(force_words = ["greet", "hello"])]
    fn greet(&self, name: String, title: Option<String>) -> String {
        match title {
            Some(title) => format!("Hello, {title} {name}"),
            None => format!("Hello, {name}"),
        }
    }

    /// A function the model never sees.
    #[function(enabled = false)]
    fn hidden(&self) -> String {
        "hidden".to_string()
    }
}

/// Divide two numbers.
#[function]
fn divide(a: f64, b: f64) -> Result<f64, FunctionError> {
    if b == 0.0 {
        return Err(FunctionError::failed("division by zero"));
    }
    Ok(a / b)
}

fn calendar() -> FunctionLibrary {
    FunctionLibrary::new(Calendar).unwrap()
}

fn call(library: &FunctionLibrary, name: &str, arguments: &str) -> funcall_library::Reply {
    library
        .resolve_and_call(&InvocationRequest::new(name, arguments), &CallContext::default())
        .unwrap()
}

// ─────────────────────────────────────────────────────────────────────
// 1. Schema export
// ─────────────────────────────────────────────────────────────────────

struct Clock;

#[library]
impl Clock {
    /// Get the current time.
    #[function(name = "get_time")]
    fn get_time(
        &self,
        /// A comment to attach to the time.
        comment: String,
    ) -> String {
        format!("12:00 ({comment})")
    }
}

#[test]
fn get_time_schema_and_dispatch() {
    let library = FunctionLibrary::new(Clock).unwrap();
    let schema = serde_json::to_value(library.get_schema()).unwrap();
    assert_eq!(
        schema,
        json!([{
            "name": "get_time",
            "description": "Get the current time.",
            "parameters": {
                "type": "object",
                "properties": {
                    "comment": {"type": "string", "description": "A comment to attach to the time."},
                },
                "required": ["comment"],
            },
        }])
    );

    let reply = library
        .call_by_dict(&json!({"name": "get_time", "arguments": {"comment": "hi"}}))
        .unwrap();
    assert_eq!(reply.content, "12:00 (hi)");
}

#[test]
fn schema_lists_enabled_functions_in_order() {
    let library = calendar();
    let names: Vec<_> = library.get_schema().into_iter().map(|s| s.name).collect();
    assert_eq!(names, ["remind_on", "utc_date", "greet"]);
    assert!(library.contains("hidden"));
}

#[test]
fn schema_renders_parameters() {
    let library = calendar();
    let schema = library.get("remind_on").unwrap().schema().to_value();
    assert_eq!(
        schema,
        json!({
            "name": "remind_on",
            "description": "Schedule a reminder on a date.",
            "parameters": {
                "type": "object",
                "properties": {
                    "date": {"type": "string", "format": "date", "description": "Day of the reminder."},
                    "topic": {"type": "string", "description": "What to be reminded of.", "default": "something"},
                },
                "required": ["date"],
            },
        })
    );
}

#[test]
fn optional_parameters_are_not_required() {
    let library = calendar();
    let greet = library.get("greet").unwrap();
    assert_eq!(greet.required(), ["name"]);
    assert_eq!(greet.schema().parameters.properties.len(), 2);
}

#[test]
fn tool_schema_wraps_functions() {
    let library = calendar();
    let tools = serde_json::to_value(library.get_tool_schema()).unwrap();
    assert_eq!(tools[0]["type"], "function");
    assert_eq!(tools[0]["function"]["name"], "remind_on");
}

#[test]
fn force_words_select_function() {
    let library = calendar();
    let schema = library.force_word_check("Say HELLO to Ada").unwrap();
    assert_eq!(schema.name, "greet");
    assert!(library.force_word_check("hellothere").is_none());
}

// ─────────────────────────────────────────────────────────────────────
// 2. Dispatch
// ─────────────────────────────────────────────────────────────────────

#[test]
fn dispatch_applies_default() {
    let reply = call(&calendar(), "remind_on", r#"{"date": "2018-11-13"}"#);
    assert!(reply.is_success());
    assert_eq!(reply.content, "something on 2018-11-13");
}

#[test]
fn dispatch_normalizes_date_time() {
    let reply = call(&calendar(), "utc_date", r#"{"at": "2018-11-13T09:30:00+02:00"}"#);
    assert_eq!(reply.content, "2018-11-13");
    assert_eq!(reply.value, json!("2018-11-13"));
}

#[test]
fn dispatch_option_parameters() {
    let library = calendar();
    assert_eq!(call(&library, "greet", r#"{"name": "Ada"}"#).content, "Hello, Ada");
    assert_eq!(
        call(&library, "greet", r#"{"name": "Ada", "title": "Countess"}"#).content,
        "Hello, Countess Ada"
    );
}

#[test]
fn dispatch_accepts_argument_maps() {
    let mut arguments = Map::new();
    arguments.insert("name".to_string(), json!("Grace"));
    let reply = calendar()
        .resolve_and_call(&InvocationRequest::new("greet", arguments), &CallContext::default())
        .unwrap();
    assert_eq!(reply.content, "Hello, Grace");
}

#[test]
fn unknown_function_falls_back() {
    let reply = call(&calendar(), "get_weather", r#"{"city": "Paris"}"#);
    assert!(matches!(reply.status, ReplyStatus::Fallback));
    assert_eq!(
        reply.content,
        "get_weather is not a valid function.\n```{\"city\": \"Paris\"}```"
    );
}

#[test]
fn missing_argument_is_rejected() {
    let reply = call(&calendar(), "greet", "{}");
    assert!(matches!(
        reply.error(),
        Some(DispatchError::MissingArgument { parameter, .. }) if parameter == "name"
    ));
}

#[test]
fn bad_date_is_rejected() {
    let reply = call(&calendar(), "remind_on", r#"{"date": "13/11/2018"}"#);
    assert!(matches!(reply.error(), Some(DispatchError::Conversion { .. })));
}

#[test]
fn raw_control_characters_are_repaired() {
    let reply = call(&calendar(), "remind_on", "{\"date\": \"2018-11-13\", \"topic\": \"line\tbreak\"}");
    assert_eq!(reply.content, "line\tbreak on 2018-11-13");
}

#[test]
fn free_function_declaration() {
    let library = FunctionLibrary::builder()
        .function(divide_declaration())
        .build()
        .unwrap();
    let reply = call(&library, "divide", r#"{"a": 6, "b": 4}"#);
    assert_eq!(reply.value, json!(1.5));

    let err = library
        .resolve_and_call(
            &InvocationRequest::new("divide", r#"{"a": 1, "b": 0}"#),
            &CallContext::default(),
        )
        .unwrap_err();
    assert!(matches!(err, DispatchError::Execution { .. }));
    assert!(err.to_string().contains("division by zero"));
}

#[test]
fn arithmetic_expressions_are_evaluated_when_enabled() {
    let library = FunctionLibrary::builder()
        .with_config(LibraryConfig::new().with_evaluate_expressions(true))
        .function(divide_declaration())
        .build()
        .unwrap();
    let reply = call(&library, "divide", r#"{"a": 3 * 4, "b": 2}"#);
    assert_eq!(reply.value, json!(6.0));
}

#[test]
fn deeply_nested_expressions_stay_recoverable() {
    let library = FunctionLibrary::builder()
        .with_config(LibraryConfig::new().with_evaluate_expressions(true))
        .function(divide_declaration())
        .build()
        .unwrap();
    let chained = format!(r#"{{"a": {}1+1, "b": 2}}"#, "-".repeat(20_000));
    assert_eq!(call(&library, "divide", &chained).value, json!(1.0));

    let nested = format!(r#"{{"a": {}1+1{}, "b": 2}}"#, "(".repeat(20_000), ")".repeat(20_000));
    let reply = call(&library, "divide", &nested);
    assert!(matches!(reply.error(), Some(DispatchError::ArgumentDecode { .. })));
}

struct Alarms;

#[library]
impl Alarms {
    /// Set an alarm.
    #[function(required = ["label"])]
    fn set_alarm(&self, hour: u8, #[default("alarm".to_string())] label: String) -> String {
        format!("{label} at {hour}:00")
    }
}

#[test]
fn required_list_omitting_undefaulted_parameter_is_rejected() {
    let err = FunctionLibrary::new(Alarms).unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::UnlistedRequired { function, parameter }
            if function == "set_alarm" && parameter == "hour"
    ));
}

// ─────────────────────────────────────────────────────────────────────
// 3. Invocation envelopes
// ─────────────────────────────────────────────────────────────────────

#[test]
fn call_by_dict_accepts_function_call() {
    let reply = calendar()
        .call_by_dict(&json!({"name": "greet", "arguments": "{\"name\": \"Linus\"}"}))
        .unwrap();
    assert_eq!(reply.content, "Hello, Linus");
}

#[test]
fn call_by_dict_accepts_tool_call() {
    let reply = calendar()
        .call_by_dict(&json!({
            "id": "call_1",
            "type": "function",
            "function": {"name": "greet", "arguments": {"name": "Linus"}},
        }))
        .unwrap();
    assert_eq!(reply.content, "Hello, Linus");
}

#[test]
fn call_by_dict_rejects_malformed_invocation() {
    let reply = calendar().call_by_dict(&json!({"arguments": "{}"})).unwrap();
    assert!(matches!(reply.error(), Some(DispatchError::MalformedInvocation(_))));
}

#[test]
fn call_by_tool_carries_id() {
    let call = ToolCall::new("call_42", InvocationRequest::new("greet", r#"{"name": "Ada"}"#));
    let output = calendar().call_by_tool(&call).unwrap();
    assert_eq!(
        output.to_message(),
        json!({"role": "tool", "name": "greet", "content": "Hello, Ada", "tool_call_id": "call_42"})
    );
}

// ─────────────────────────────────────────────────────────────────────
// 4. Custom converters and literals
// ─────────────────────────────────────────────────────────────────────

static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<@!?(\d+)>").unwrap());

#[derive(Debug, Clone, PartialEq)]
struct User {
    id: u64,
}

impl NativeType for User {}

struct UserConverter;

impl Converter for UserConverter {
    type Native = User;

    fn schema_type(&self) -> &'static str {
        "string"
    }

    fn from_value(&self, raw: &Value, _schema: &Map<String, Value>) -> Result<User, ConvertError> {
        let text = raw
            .as_str()
            .ok_or_else(|| ConvertError::type_mismatch("string", raw))?;
        MENTION
            .captures(text)
            .and_then(|caps| caps[1].parse().ok())
            .map(|id| User { id })
            .ok_or_else(|| ConvertError::custom(format!("`{text}` is not a user mention")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Literal)]
enum Shade {
    #[literal(rename = "a")]
    Light,
    #[literal(rename = "b")]
    Dark,
}

struct Users;

#[library]
impl Users {
    /// Return the id of a mentioned user.
    #[function]
    fn user_id(
        &self,
        /// The user.
        user: User,
    ) -> String {
        user.id.to_string()
    }

    /// Echo a shade.
    #[function]
    fn shade(&self, shade: Shade) -> Shade {
        shade
    }
}

fn users() -> FunctionLibrary {
    let mut converters = ConverterRegistry::default();
    converters.register(UserConverter);
    FunctionLibrary::builder()
        .with_converters(converters)
        .library(Users)
        .build()
        .unwrap()
}

#[test]
fn custom_converter_reconstructs_domain_type() {
    let library = users();
    let reply = call(&library, "user_id", r#"{"user": "<@!1234567890>"}"#);
    assert_eq!(reply.content, "1234567890");

    let reply = call(&library, "user_id", r#"{"user": "someone"}"#);
    assert!(matches!(reply.error(), Some(DispatchError::Conversion { .. })));
}

#[test]
fn unregistered_type_fails_registration() {
    let err = FunctionLibrary::new(Users).unwrap_err();
    assert!(err.to_string().contains("user"));
}

#[test]
fn literal_parameters() {
    let library = users();
    let schema = library.get("shade").unwrap().schema().clone();
    assert_eq!(schema.parameters.properties["shade"]["enum"], json!(["a", "b"]));

    let reply = call(&library, "shade", r#"{"shade": "b"}"#);
    assert_eq!(reply.value, json!("b"));
    assert_eq!(Shade::from_literal("a"), Some(Shade::Light));

    let reply = call(&library, "shade", r#"{"shade": "c"}"#);
    assert!(matches!(reply.error(), Some(DispatchError::Conversion { .. })));
}

// ─────────────────────────────────────────────────────────────────────
// 5. Coroutines and context
// ─────────────────────────────────────────────────────────────────────

struct Counter {
    calls: Arc<AtomicUsize>,
}

#[library]
impl Counter {
    /// Count, eventually.
    #[function]
    async fn bump(&self, by: usize) -> usize {
        self.calls.fetch_add(by, Ordering::SeqCst) + by
    }

    /// Report who is calling.
    #[function]
    fn whoami(&self, ctx: &CallContext) -> String {
        ctx.host::<String>().cloned().unwrap_or_default()
    }
}

#[test]
fn sync_call_on_coroutine_does_not_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let library = FunctionLibrary::new(Counter {
        calls: Arc::clone(&calls),
    })
    .unwrap();

    let err = library
        .resolve_and_call(&InvocationRequest::new("bump", r#"{"by": 1}"#), &CallContext::default())
        .unwrap_err();
    assert!(matches!(err, DispatchError::SyncCallOnCoroutine(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn async_dispatch_awaits_coroutines() {
    let calls = Arc::new(AtomicUsize::new(0));
    let library = FunctionLibrary::new(Counter {
        calls: Arc::clone(&calls),
    })
    .unwrap();

    let reply = library
        .resolve_and_call_async(&InvocationRequest::new("bump", r#"{"by": 2}"#), &CallContext::default())
        .await
        .unwrap();
    assert_eq!(reply.value, json!(2));
    assert_eq!(reply.content, "2");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn async_dispatch_runs_blocking_functions() {
    let reply = calendar()
        .call_by_dict_async(&json!({"name": "greet", "arguments": "{\"name\": \"Ada\"}"}))
        .await
        .unwrap();
    assert_eq!(reply.content, "Hello, Ada");
}

#[test]
fn context_is_injected_and_hidden_from_schema() {
    let library = FunctionLibrary::new(Counter {
        calls: Arc::new(AtomicUsize::new(0)),
    })
    .unwrap();
    assert!(library.get("whoami").unwrap().parameters().is_empty());

    let ctx = CallContext::with_host("alice".to_string());
    let reply = library
        .resolve_and_call(&InvocationRequest::new("whoami", ""), &ctx)
        .unwrap();
    assert_eq!(reply.content, "alice");
}

// ─────────────────────────────────────────────────────────────────────
// 6. Imports
// ─────────────────────────────────────────────────────────────────────

fn mixed_callables() -> Vec<FunctionDeclaration> {
    vec![
        FunctionDeclaration::blocking("bare", |_, _| Ok(Value::Null)),
        divide_declaration(),
    ]
}

#[test]
fn lenient_import_skips_unannotated() {
    let mut library = FunctionLibrary::default();
    let imported = library.import_callables(&mixed_callables(), None).unwrap();
    assert_eq!(imported, 1);
    assert_eq!(library.names(), ["divide"]);
}

#[test]
fn strict_import_rejects_unannotated() {
    let mut library = FunctionLibrary::builder()
        .with_config(LibraryConfig::new().with_import_mode(ImportMode::Strict))
        .build()
        .unwrap();
    let err = library.import_callables(&mixed_callables(), None).unwrap_err();
    assert!(err.is_unannotated());
}

#[test]
fn import_filter() {
    let mut library = FunctionLibrary::default();
    let keep = |decl: &FunctionDeclaration| decl.native_name() != "divide";
    let imported = library
        .import_callables(&mixed_callables(), Some(&keep))
        .unwrap();
    assert_eq!(imported, 0);
    assert!(library.is_empty());
}

#[test]
fn duplicate_names_are_rejected() {
    let mut library = FunctionLibrary::default();
    library.register(divide_declaration()).unwrap();
    assert!(library.register(divide_declaration()).is_err());
}

#[test]
fn library_trait_yields_declarations() {
    let declarations = Calendar.declarations();
    let names: Vec<_> = declarations.iter().map(FunctionDeclaration::native_name).collect();
    assert_eq!(names, ["remind_on", "date_of", "greet", "hidden"]);
}

// ─────────────────────────────────────────────────────────────────────
// 7. SingleCall
// ─────────────────────────────────────────────────────────────────────

fn completion(tool_calls: Value) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "tool_calls": tool_calls}}]})
}

struct MockClient {
    response: Value,
    requests: Mutex<Vec<Value>>,
}

impl MockClient {
    fn new(response: Value) -> Self {
        Self {
            response,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ChatClient for &MockClient {
    fn create(&self, request: &Value) -> Result<Value, SingleCallError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.response.clone())
    }
}

impl AsyncChatClient for MockClient {
    fn create<'a>(
        &'a self,
        request: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, SingleCallError>> + Send + 'a>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        })
    }
}

#[test]
fn single_call_dispatches_tool_calls() {
    let library = calendar();
    let client = MockClient::new(completion(json!([{
        "id": "call_a",
        "type": "function",
        "function": {"name": "greet", "arguments": "{\"name\": \"Ada\"}"},
    }])));

    let outputs = SingleCall::new(&library, &client)
        .with_model("test-model")
        .call_single("greet Ada", &ToolChoice::Function("greet".into()))
        .unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].tool_call_id.as_deref(), Some("call_a"));
    assert_eq!(outputs[0].reply.content, "Hello, Ada");

    let requests = client.requests.lock().unwrap();
    assert_eq!(requests[0]["model"], "test-model");
    assert_eq!(requests[0]["messages"][1]["content"], "greet Ada");
    assert_eq!(requests[0]["tool_choice"]["function"]["name"], "greet");
    assert_eq!(requests[0]["tools"].as_array().unwrap().len(), 3);
}

#[test]
fn single_call_without_tool_calls_fails() {
    let library = calendar();
    let client = MockClient::new(completion(json!([])));
    let err = SingleCall::new(&library, &client)
        .call_single("hi", &ToolChoice::Auto)
        .unwrap_err();
    assert!(matches!(err, SingleCallError::NoToolCalls));
}

#[tokio::test]
async fn single_call_async_awaits_coroutines() {
    let calls = Arc::new(AtomicUsize::new(0));
    let library = FunctionLibrary::new(Counter {
        calls: Arc::clone(&calls),
    })
    .unwrap();
    let client = MockClient::new(completion(json!([
        {"id": "1", "type": "function", "function": {"name": "bump", "arguments": "{\"by\": 3}"}},
        {"id": "2", "type": "function", "function": {"name": "missing", "arguments": "{}"}},
    ])));

    let outputs = SingleCall::new(&library, client)
        .call_single_async("count", &ToolChoice::Required)
        .await
        .unwrap();
    assert_eq!(outputs[0].reply.content, "3");
    assert!(matches!(outputs[1].reply.status, ReplyStatus::Fallback));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
