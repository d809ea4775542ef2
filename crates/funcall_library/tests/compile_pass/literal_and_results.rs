use core::fmt;
use funcall_library::{FunctionLibrary, Literal, function};

#[derive(Debug, Clone, Copy, Literal)]
enum Priority {
    Low,
    #[literal(rename = "urgent")]
    High,
}

#[derive(Debug)]
struct QueueFull;

impl fmt::Display for QueueFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is full")
    }
}

/// Enqueue a task.
#[function]
fn enqueue(
    /// Task type.
    r#type: String,
    /// Task priority.
    priority: Priority,
    /// Optional retries.
    #[schema(minimum = 0, maximum = 5)]
    retries: Option<u8>,
) -> Result<String, QueueFull> {
    if retries == Some(5) {
        return Err(QueueFull);
    }
    Ok(format!("{} {}", r#type, priority.as_literal()))
}

fn main() {
    assert_eq!(Priority::VALUES, ["Low", "urgent"]);
    let library = FunctionLibrary::builder()
        .function(enqueue_declaration())
        .build()
        .unwrap();
    let enqueue = library.get("enqueue").unwrap();
    assert_eq!(enqueue.required(), ["type", "priority"]);
}
