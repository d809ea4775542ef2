use funcall_library::{CallContext, FunctionDeclaration, function};

/// Look up a value, asynchronously.
#[function(name = "lookup", required = ["key"])]
async fn lookup_value(ctx: &CallContext, key: String, #[default(1)] times: u32) -> String {
    let _ = ctx.has_host();
    key.repeat(times as usize)
}

fn main() {
    let declaration: FunctionDeclaration = lookup_value_declaration();
    assert!(declaration.is_coroutine());
    assert_eq!(declaration.display_name(), "lookup");
}
