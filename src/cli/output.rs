use serde::Serialize;
use serde_json::{json, Value};

use crate::modules::ModuleResult;

/// Pretty JSON for stdout.
pub fn render<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Result document for a failed task, shaped like a module result.
pub fn failure(msg: &str) -> Value {
    json!({
        "changed": false,
        "failed": true,
        "msg": msg,
    })
}

pub fn print_module_result(result: &ModuleResult) -> Result<(), serde_json::Error> {
    println!("{}", render(result)?);
    Ok(())
}
