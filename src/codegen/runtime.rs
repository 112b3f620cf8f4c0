//! QuickJS sandbox for generated functions
//!
//! Each invocation builds a fresh runtime and context, evaluates the
//! generated source, and calls the entry point with JSON-marshalled
//! arguments. QuickJS execution is blocking, so it runs inside
//! `spawn_blocking` with a wall-clock timeout and a hard memory limit.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use rquickjs::{Context, Runtime};
use std::time::Duration;

/// Memory limit per sandbox context
pub const MAX_MEMORY_BYTES: usize = 10 * 1024 * 1024;

/// Wall-clock limit per invocation
pub const MAX_EXECUTION_MS: u64 = 1_000;

/// Evaluate `code`, then call `entry(...args)` and return its result.
///
/// The entry point must be defined by the evaluated source as a
/// function; its return value is marshalled back through JSON.
pub async fn run_function(code: &str, entry: &str, args: Vec<JsonValue>) -> Result<JsonValue> {
    let code = code.to_string();
    let entry = entry.to_string();

    let handle =
        tokio::task::spawn_blocking(move || run_function_blocking(&code, &entry, &args));

    tokio::time::timeout(Duration::from_millis(MAX_EXECUTION_MS), handle)
        .await
        .map_err(|_| Error::sandbox(format!("execution timed out after {MAX_EXECUTION_MS}ms")))?
        .map_err(|e| Error::sandbox(format!("sandbox task failed: {e}")))?
}

fn run_function_blocking(code: &str, entry: &str, args: &[JsonValue]) -> Result<JsonValue> {
    if !is_plain_identifier(entry) {
        return Err(Error::sandbox(format!("invalid entry point name: {entry}")));
    }

    let runtime =
        Runtime::new().map_err(|e| Error::sandbox(format!("failed to create runtime: {e}")))?;
    runtime.set_memory_limit(MAX_MEMORY_BYTES);

    let context = Context::full(&runtime)
        .map_err(|e| Error::sandbox(format!("failed to create context: {e}")))?;

    let args_json = serde_json::to_string(args)?;

    context.with(|ctx| {
        ctx.globals()
            .set("__args", args_json.as_str())
            .map_err(|e| Error::sandbox(format!("failed to set arguments: {e}")))?;

        ctx.eval::<(), _>(code.as_bytes())
            .map_err(|e| Error::sandbox(describe_js_error(&ctx, e, "evaluation")))?;

        let defined: bool = ctx
            .eval(format!("typeof {entry} === 'function'").as_bytes())
            .map_err(|e| Error::sandbox(describe_js_error(&ctx, e, "entry check")))?;
        if !defined {
            return Err(Error::code_validation(format!(
                "generated code does not define function `{entry}`"
            )));
        }

        let call = format!("JSON.stringify({entry}.apply(null, JSON.parse(__args)) ?? null)");
        let result_json: String = ctx
            .eval(call.as_bytes())
            .map_err(|e| Error::sandbox(describe_js_error(&ctx, e, "invocation")))?;

        serde_json::from_str(&result_json).map_err(Error::from)
    })
}

/// Entry points are interpolated into the call expression, so only bare
/// identifiers are accepted.
fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

/// Pull the pending JS exception message out of the context, if any
fn describe_js_error(ctx: &rquickjs::Ctx<'_>, error: rquickjs::Error, stage: &str) -> String {
    if matches!(error, rquickjs::Error::Exception) {
        let caught = ctx.catch();
        let message = caught
            .as_object()
            .and_then(|obj| obj.get::<_, String>("message").ok());
        if let Some(message) = message {
            return format!("{stage} threw: {message}");
        }
        return format!("{stage} threw an exception");
    }
    format!("{stage} failed: {error}")
}
