//! Restricted evaluation backend: `POST /execute_code {code}`
//!
//! Snippets run as Lua in a fresh VM per request. Only `math`, `string`,
//! `table` and a handful of pure base functions are reachable: the chunk's
//! environment is a new table, so `print`, `load`, `require` and the other
//! globals do not exist for it. The answer is read back from the `result`
//! variable (then `output`).
//!
//! Two bounds keep a snippet from outliving its request. An instruction
//! hook raises an error once the deadline passes, so the blocking thread
//! stops even after the caller got its 408. The hook cannot fire inside a
//! C function, so the `string` pattern functions are wrapped and refuse
//! patterns whose worst-case backtracking over the subject exceeds
//! [`PATTERN_BUDGET`].

use super::error::BackendApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use mlua::prelude::*;
use mlua::{HookTriggers, LuaOptions, StdLib};
use relay_domain::codes;
use relay_domain::tool::builtin::EVAL_ENDPOINT;
use serde::Deserialize;
use serde_json::{Map, Number, Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Rejected before execution, as plain substrings
pub const DENYLIST: &[&str] = &[
    "import", "require", "os.", "io.", "debug.", "package", "load", "dofile", "_G", "_ENV",
    "setmetatable", "getmetatable", "rawset", "collectgarbage", "while", "for ", "repeat",
    "function", "goto", "def ", "open(", "sys.", "__",
];

/// Returned when the snippet leaves neither `result` nor `output` behind
pub const NO_RESULT_MESSAGE: &str = "Code executed but no explicit 'result' variable found.";

const EXPOSED_LIBS: &[&str] = &["math", "string", "table"];
const EXPOSED_FUNCTIONS: &[&str] = &[
    "tostring", "tonumber", "type", "pairs", "ipairs", "next", "select", "pcall", "error",
    "assert",
];
const MAX_DEPTH: usize = 16;

/// VM instructions between deadline checks
const HOOK_INTERVAL: u32 = 1000;

/// Worst-case match steps a pattern call may cost: `(len + 1) ^ quantifiers`
pub const PATTERN_BUDGET: f64 = 1e9;

/// `string` functions that take a pattern as their second argument
const PATTERN_FUNCTIONS: &[&str] = &["find", "match", "gmatch", "gsub"];

#[derive(Debug, Clone, PartialEq)]
pub struct EvalSettings {
    pub timeout: Duration,
    /// Bytes the VM may allocate
    pub memory_limit: usize,
    pub extra_denylist: Vec<String>,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            memory_limit: 16 * 1024 * 1024,
            extra_denylist: Vec::new(),
        }
    }
}

impl EvalSettings {
    /// First denylisted token found in `code`
    pub fn denied_token<'a>(&'a self, code: &str) -> Option<&'a str> {
        DENYLIST
            .iter()
            .copied()
            .chain(self.extra_denylist.iter().map(String::as_str))
            .find(|token| !token.is_empty() && code.contains(token))
    }
}

#[derive(Debug, Deserialize)]
pub struct EvalRequest {
    pub code: String,
}

pub fn router(settings: EvalSettings) -> Router {
    Router::new()
        .route(EVAL_ENDPOINT, post(execute_code))
        .with_state(Arc::new(settings))
}

async fn execute_code(
    State(settings): State<Arc<EvalSettings>>,
    payload: Result<Json<EvalRequest>, JsonRejection>,
) -> Result<Json<Value>, BackendApiError> {
    let Json(request) = payload?;
    let output = evaluate(&request.code, &settings).await?;
    Ok(Json(json!({ "status": "success", "output": output })))
}

pub async fn evaluate(code: &str, settings: &EvalSettings) -> Result<Value, BackendApiError> {
    if let Some(token) = settings.denied_token(code) {
        warn!("eval: rejected snippet containing '{}'", token);
        return Err(BackendApiError::forbidden(
            codes::DENYLISTED_TOKEN,
            format!("restricted token '{}' found; only expressions and assignments are allowed", token),
        ));
    }

    debug!("eval: {} byte snippet", code.len());

    let code = code.to_string();
    let memory_limit = settings.memory_limit;
    let timeout = settings.timeout;
    let task = tokio::task::spawn_blocking(move || run_snippet(&code, memory_limit, timeout));

    match tokio::time::timeout(settings.timeout, task).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(BackendApiError::bad_request(
            codes::EXECUTION_ERROR,
            format!("execution error: {}", e),
        )),
        Ok(Err(e)) => Err(BackendApiError::internal(format!("eval task failed: {}", e))),
        Err(_) => Err(BackendApiError::timeout(format!(
            "evaluation exceeded {} seconds",
            settings.timeout.as_secs_f64()
        ))),
    }
}

fn run_snippet(code: &str, memory_limit: usize, timeout: Duration) -> LuaResult<Value> {
    let lua = Lua::new_with(
        StdLib::MATH | StdLib::STRING | StdLib::TABLE,
        LuaOptions::default(),
    )?;
    lua.set_memory_limit(memory_limit)?;

    let deadline = Instant::now() + timeout;
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
        move |_, _| {
            if Instant::now() >= deadline {
                Err(LuaError::runtime("evaluation deadline exceeded"))
            } else {
                Ok(LuaVmState::Continue)
            }
        },
    );

    let globals = lua.globals();
    guard_pattern_functions(&lua, &globals.get::<LuaTable>("string")?)?;

    let env = lua.create_table()?;
    for name in EXPOSED_LIBS.iter().chain(EXPOSED_FUNCTIONS) {
        let value: LuaValue = globals.get(*name)?;
        env.set(*name, value)?;
    }

    lua.load(code)
        .set_name("snippet")
        .set_environment(env.clone())
        .exec()?;

    for name in ["result", "output"] {
        let value: LuaValue = env.get(name)?;
        if !value.is_nil() {
            return lua_to_json(&value, 0);
        }
    }
    Ok(Value::String(NO_RESULT_MESSAGE.to_string()))
}

/// Replace the pattern functions in the shared `string` table (also the
/// string metatable's `__index`, so `s:find(p)` is covered) with wrappers
/// that check the cost before calling the original.
fn guard_pattern_functions(lua: &Lua, string: &LuaTable) -> LuaResult<()> {
    for name in PATTERN_FUNCTIONS {
        let original: LuaFunction = string.get(*name)?;
        let key = format!("relay.string.{}", name);
        lua.set_named_registry_value(&key, original)?;

        let plain_flag = *name == "find";
        let wrapper = lua.create_function(move |lua, args: LuaMultiValue| {
            let plain = plain_flag
                && args
                    .get(3)
                    .is_some_and(|v| !matches!(v, LuaValue::Nil | LuaValue::Boolean(false)));
            if !plain
                && let (Some(LuaValue::String(subject)), Some(LuaValue::String(pattern))) =
                    (args.front(), args.get(1))
            {
                check_pattern_cost(subject.as_bytes().len(), &pattern.as_bytes())?;
            }
            let original: LuaFunction = lua.named_registry_value(&key)?;
            original.call::<LuaMultiValue>(args)
        })?;
        string.set(*name, wrapper)?;
    }
    Ok(())
}

fn check_pattern_cost(subject_len: usize, pattern: &[u8]) -> LuaResult<()> {
    let quantifiers = pattern_quantifiers(pattern);
    if quantifiers < 2 {
        return Ok(());
    }
    let cost = (subject_len as f64 + 1.0).powi(quantifiers as i32);
    if cost > PATTERN_BUDGET {
        return Err(LuaError::runtime(format!(
            "pattern with {} repetition operators is too expensive for a {} byte subject",
            quantifiers, subject_len
        )));
    }
    Ok(())
}

/// Repetition operators (`*`, `+`, `-`) outside `%` escapes and `[...]` sets.
fn pattern_quantifiers(pattern: &[u8]) -> u32 {
    let mut count = 0;
    let mut in_set = false;
    let mut i = 0;
    while i < pattern.len() {
        match pattern[i] {
            b'%' => {
                i += 2;
                continue;
            }
            b'[' if !in_set => in_set = true,
            b']' if in_set => in_set = false,
            b'*' | b'+' | b'-' if !in_set && i > 0 => count += 1,
            _ => {}
        }
        i += 1;
    }
    count
}

fn lua_to_json(value: &LuaValue, depth: usize) -> LuaResult<Value> {
    Ok(match value {
        LuaValue::Nil => Value::Null,
        LuaValue::Boolean(b) => Value::Bool(*b),
        LuaValue::Integer(i) => Value::from(*i),
        LuaValue::Number(n) => Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(n.to_string())),
        LuaValue::String(s) => Value::String(String::from(s.to_string_lossy())),
        LuaValue::Table(table) if depth < MAX_DEPTH => table_to_json(table, depth + 1)?,
        other => Value::String(format!("<{}>", other.type_name())),
    })
}

/// Sequences become arrays, anything else an object with stringified keys.
fn table_to_json(table: &LuaTable, depth: usize) -> LuaResult<Value> {
    let mut entries: Vec<(LuaValue, LuaValue)> = Vec::new();
    table.for_each(|key: LuaValue, value: LuaValue| {
        entries.push((key, value));
        Ok(())
    })?;

    let len = table.raw_len();
    if len > 0 && entries.len() == len {
        let items = (1..=len)
            .map(|i| {
                let value: LuaValue = table.raw_get(i)?;
                lua_to_json(&value, depth)
            })
            .collect::<LuaResult<Vec<_>>>()?;
        return Ok(Value::Array(items));
    }

    let mut object = Map::new();
    for (key, value) in &entries {
        let key = match key {
            LuaValue::String(s) => String::from(s.to_string_lossy()),
            LuaValue::Integer(i) => i.to_string(),
            LuaValue::Number(n) => n.to_string(),
            LuaValue::Boolean(b) => b.to_string(),
            other => format!("<{}>", other.type_name()),
        };
        object.insert(key, lua_to_json(value, depth)?);
    }
    Ok(Value::Object(object))
}
