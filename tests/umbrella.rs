//! Macros used through the `funcall` umbrella crate.

use funcall::prelude::*;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Literal)]
enum Mood {
    #[literal(rename = "happy")]
    Happy,
    #[literal(rename = "grumpy")]
    Grumpy,
}

struct Moods;

#[library]
impl Moods {
    /// Describe a mood.
    #[function]
    fn describe(&self, mood: Mood) -> &'static str {
        match mood {
            Mood::Happy => "smiling",
            Mood::Grumpy => "frowning",
        }
    }

    /// Describe a mood later.
    #[function]
    async fn describe_later(&self, mood: Mood) -> String {
        format!("later: {}", mood.as_literal())
    }
}

/// Echo a value.
#[function]
fn echo(value: String) -> String {
    value
}

fn library() -> FunctionLibrary {
    FunctionLibrary::builder()
        .library(Moods)
        .function(echo_declaration())
        .build()
        .unwrap()
}

#[test]
fn umbrella_paths_resolve() {
    let library = library();
    let reply = library
        .call_by_dict(&json!({"name": "describe", "arguments": "{\"mood\": \"grumpy\"}"}))
        .unwrap();
    assert_eq!(reply.content, "frowning");

    let reply = library
        .call_by_dict(&json!({"name": "echo", "arguments": {"value": "hi"}}))
        .unwrap();
    assert_eq!(reply.content, "hi");
}

#[tokio::test]
async fn umbrella_async_dispatch() {
    let reply = library()
        .call_by_dict_async(&json!({"name": "describe_later", "arguments": {"mood": "happy"}}))
        .await
        .unwrap();
    assert_eq!(reply.content, "later: happy");
}

#[test]
fn tracing_is_reexported() {
    let config = TracingConfig::new().with_format(TracingFormat::Compact);
    assert_eq!(config.format, TracingFormat::Compact);
}
