//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Runtime hosting client handlers written in Rust
//!
//! Values and tables follow the familiar dynamic-language model: tables are shared by
//! reference, a table may fall back to another for keys it does not hold, and every value has
//! a `tostring`-style text form. A script is a [`NativeScript`] state machine; each call to
//! [`NativeScript::resume`] runs it up to its next yield.

use super::{NativeFunction, ScriptRuntime, ScriptValue, TaskStatus};
use crate::{ConnectionHandle, ScriptError, ScriptResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::info;

/// A value in the native runtime
#[derive(Clone)]
pub enum NativeValue {
    /// Absence of a value
    Nil,
    /// Boolean
    Boolean(bool),
    /// Integer number
    Integer(i64),
    /// Floating point number
    Number(f64),
    /// Immutable string
    String(Rc<str>),
    /// Shared table
    Table(NativeTable),
    /// Host function
    Function(NativeFunction<NativeRuntime>),
    /// Opaque connection handle
    Connection(ConnectionHandle),
}

impl NativeValue {
    /// Wrap a closure as a function value
    pub fn function<F>(function: F) -> Self
    where
        F: Fn(&mut NativeRuntime, Vec<NativeValue>) -> ScriptResult<Vec<NativeValue>> + 'static,
    {
        NativeValue::Function(Rc::new(function))
    }

    /// Name of the value's type
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Nil => "nil",
            NativeValue::Boolean(_) => "boolean",
            NativeValue::Integer(_) | NativeValue::Number(_) => "number",
            NativeValue::String(_) => "string",
            NativeValue::Table(_) => "table",
            NativeValue::Function(_) => "function",
            NativeValue::Connection(_) => "userdata",
        }
    }

    /// Check for nil
    pub fn is_nil(&self) -> bool {
        matches!(self, NativeValue::Nil)
    }

    /// Everything except nil and false is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, NativeValue::Nil | NativeValue::Boolean(false))
    }

    /// Borrow the string contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(text) => Some(&text[..]),
            _ => None,
        }
    }

    /// Integer value, converting floats with no fractional part
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            NativeValue::Integer(value) => Some(value),
            NativeValue::Number(value) if value.fract() == 0.0 && value.is_finite() => {
                Some(value as i64)
            }
            _ => None,
        }
    }

    /// Borrow the connection handle
    pub fn as_connection(&self) -> Option<&ConnectionHandle> {
        match self {
            NativeValue::Connection(handle) => Some(handle),
            _ => None,
        }
    }
}

impl ScriptValue for NativeValue {
    fn from_text(text: &str) -> Self {
        NativeValue::String(Rc::from(text))
    }

    fn as_primitive_string(&self) -> Option<String> {
        match self {
            NativeValue::Nil => Some("nil".to_string()),
            NativeValue::Boolean(value) => Some(value.to_string()),
            NativeValue::Integer(value) => Some(value.to_string()),
            NativeValue::Number(value) => Some(format_number(*value)),
            NativeValue::String(text) => Some(text.to_string()),
            _ => None,
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        String::from(if value > 0.0 { "inf" } else { "-inf" })
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NativeValue::Nil, NativeValue::Nil) => true,
            (NativeValue::Boolean(a), NativeValue::Boolean(b)) => a == b,
            (NativeValue::Integer(a), NativeValue::Integer(b)) => a == b,
            (NativeValue::Number(a), NativeValue::Number(b)) => a == b,
            (NativeValue::Integer(a), NativeValue::Number(b))
            | (NativeValue::Number(b), NativeValue::Integer(a)) => *a as f64 == *b,
            (NativeValue::String(a), NativeValue::String(b)) => a == b,
            (NativeValue::Table(a), NativeValue::Table(b)) => a.ptr_eq(b),
            (NativeValue::Function(a), NativeValue::Function(b)) => Rc::ptr_eq(a, b),
            (NativeValue::Connection(a), NativeValue::Connection(b)) => a.same_connection(b),
            _ => false,
        }
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Nil => write!(f, "nil"),
            NativeValue::Boolean(value) => write!(f, "{}", value),
            NativeValue::Integer(value) => write!(f, "{}", value),
            NativeValue::Number(value) => write!(f, "{}", format_number(*value)),
            NativeValue::String(text) => write!(f, "{:?}", text),
            NativeValue::Table(table) => write!(f, "{:?}", table),
            NativeValue::Function(function) => write!(f, "function: {:#x}", function_addr(function)),
            NativeValue::Connection(handle) => write!(f, "connection: {}", handle.id()),
        }
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::String(Rc::from(value))
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::String(Rc::from(value))
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        NativeValue::Integer(value)
    }
}

impl From<f64> for NativeValue {
    fn from(value: f64) -> Self {
        NativeValue::Number(value)
    }
}

impl From<bool> for NativeValue {
    fn from(value: bool) -> Self {
        NativeValue::Boolean(value)
    }
}

impl From<NativeTable> for NativeValue {
    fn from(value: NativeTable) -> Self {
        NativeValue::Table(value)
    }
}

fn function_addr(function: &NativeFunction<NativeRuntime>) -> usize {
    Rc::as_ptr(function) as *const () as usize
}

/// Shared string-keyed table with an optional fallback table.
///
/// Reads of a missing key continue in the fallback. Writes of a key the table does not hold
/// also land in the fallback, so a sandbox shares new globals with every other sandbox built
/// on the same fallback. [`NativeTable::raw_set`] always writes to the table itself.
#[derive(Clone, Default)]
pub struct NativeTable(Rc<RefCell<TableData>>);

#[derive(Default)]
struct TableData {
    entries: HashMap<String, NativeValue>,
    fallback: Option<NativeTable>,
}

impl NativeTable {
    /// Empty table without fallback
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table falling back to `fallback`
    pub fn with_fallback(fallback: &NativeTable) -> Self {
        NativeTable(Rc::new(RefCell::new(TableData {
            entries: HashMap::new(),
            fallback: Some(fallback.clone()),
        })))
    }

    /// Look a key up here, then in the fallback chain
    pub fn get(&self, key: &str) -> NativeValue {
        let fallback = {
            let data = self.0.borrow();
            if let Some(value) = data.entries.get(key) {
                return value.clone();
            }
            data.fallback.clone()
        };
        match fallback {
            Some(fallback) => fallback.get(key),
            None => NativeValue::Nil,
        }
    }

    /// Look a key up in this table only
    pub fn raw_get(&self, key: &str) -> NativeValue {
        self.0
            .borrow()
            .entries
            .get(key)
            .cloned()
            .unwrap_or(NativeValue::Nil)
    }

    /// Assign a key, delegating to the fallback when this table does not hold it
    pub fn set(&self, key: &str, value: NativeValue) {
        let fallback = {
            let data = self.0.borrow();
            if data.entries.contains_key(key) {
                None
            } else {
                data.fallback.clone()
            }
        };
        match fallback {
            Some(fallback) => fallback.set(key, value),
            None => self.raw_set(key, value),
        }
    }

    /// Assign a key in this table only. Assigning nil removes the key.
    pub fn raw_set(&self, key: impl Into<String>, value: NativeValue) {
        let mut data = self.0.borrow_mut();
        if value.is_nil() {
            data.entries.remove(&key.into());
        } else {
            data.entries.insert(key.into(), value);
        }
    }

    /// Number of keys held by this table itself
    pub fn len(&self) -> usize {
        self.0.borrow().entries.len()
    }

    /// Check whether this table itself holds no keys
    pub fn is_empty(&self) -> bool {
        self.0.borrow().entries.is_empty()
    }

    /// Check whether both values are the same table
    pub fn ptr_eq(&self, other: &NativeTable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for NativeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table: {:#x}", self.addr())
    }
}

/// Result of running a script up to its next stopping point
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Suspend, handing these values to the resumer
    Yield(Vec<NativeValue>),
    /// Finish with these values
    Return(Vec<NativeValue>),
}

/// A client handler script written in Rust.
///
/// The first resume receives the task's start arguments, later ones the values passed to
/// [`ScriptRuntime::resume`]. Returning an error ends the task.
pub trait NativeScript {
    /// Run until the next yield or return
    fn resume(&mut self, cx: &mut ScriptContext<'_>, args: Vec<NativeValue>)
    -> ScriptResult<Step>;
}

impl<S: NativeScript + ?Sized> NativeScript for Box<S> {
    fn resume(
        &mut self,
        cx: &mut ScriptContext<'_>,
        args: Vec<NativeValue>,
    ) -> ScriptResult<Step> {
        (**self).resume(cx, args)
    }
}

/// Script built from a closure; see [`script_fn`]
pub struct FnScript<F>(F);

/// Use a closure as a script. The closure is called once per resume.
pub fn script_fn<F>(function: F) -> FnScript<F>
where
    F: FnMut(&mut ScriptContext<'_>, Vec<NativeValue>) -> ScriptResult<Step>,
{
    FnScript(function)
}

impl<F> NativeScript for FnScript<F>
where
    F: FnMut(&mut ScriptContext<'_>, Vec<NativeValue>) -> ScriptResult<Step>,
{
    fn resume(
        &mut self,
        cx: &mut ScriptContext<'_>,
        args: Vec<NativeValue>,
    ) -> ScriptResult<Step> {
        (self.0)(cx, args)
    }
}

/// What a running script sees: its global namespace and the runtime.
pub struct ScriptContext<'a> {
    runtime: &'a mut NativeRuntime,
    env: &'a NativeTable,
}

impl ScriptContext<'_> {
    /// The task's global namespace
    pub fn env(&self) -> &NativeTable {
        self.env
    }

    /// Read a global
    pub fn get(&self, key: &str) -> NativeValue {
        self.env.get(key)
    }

    /// Assign a global
    pub fn set(&self, key: &str, value: impl Into<NativeValue>) {
        self.env.set(key, value.into())
    }

    /// Call the global function `name`
    pub fn call(&mut self, name: &str, args: Vec<NativeValue>) -> ScriptResult<Vec<NativeValue>> {
        let function = self.env.get(name);
        self.runtime.call(&function, args)
    }

    /// Call a function value
    pub fn call_value(
        &mut self,
        function: &NativeValue,
        args: Vec<NativeValue>,
    ) -> ScriptResult<Vec<NativeValue>> {
        self.runtime.call(function, args)
    }

    /// Call the global `print` with one argument
    pub fn print(&mut self, value: impl Into<NativeValue>) -> ScriptResult<()> {
        self.call("print", vec![value.into()]).map(|_| ())
    }

    /// Text form of a value
    pub fn to_display(&mut self, value: &NativeValue) -> ScriptResult<String> {
        self.runtime.to_display(value)
    }
}

/// A registered script, ready to start as a task
#[derive(Clone)]
pub struct NativeChunk {
    name: Rc<str>,
    factory: Rc<dyn Fn() -> Box<dyn NativeScript>>,
}

impl NativeChunk {
    /// Name the script was registered under
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for NativeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeChunk")
            .field("name", &self.name)
            .finish()
    }
}

/// A running instance of a script
pub struct NativeTask {
    name: Rc<str>,
    env: NativeTable,
    script: Box<dyn NativeScript>,
    dead: bool,
}

impl NativeTask {
    /// Name of the script the task runs
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for NativeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeTask")
            .field("name", &self.name)
            .field("env", &self.env)
            .field("dead", &self.dead)
            .finish()
    }
}

/// Runtime whose scripts are registered Rust handlers.
///
/// The globals start out with `print` (writes to the server log), `tostring` and `type`.
pub struct NativeRuntime {
    globals: NativeTable,
    scripts: HashMap<String, NativeChunk>,
}

impl Default for NativeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeRuntime {
    /// Runtime with the base functions and no scripts
    pub fn new() -> Self {
        let globals = NativeTable::new();
        globals.raw_set(
            "print",
            NativeValue::function(|runtime, args| {
                let text = super::format_print_args(runtime, &args)?;
                info!(target: "whatmud::script", "{}", text.trim_end_matches('\n'));
                Ok(Vec::new())
            }),
        );
        globals.raw_set(
            "tostring",
            NativeValue::function(|runtime, args| {
                let value = args.into_iter().next().unwrap_or(NativeValue::Nil);
                Ok(vec![NativeValue::from(runtime.to_display(&value)?)])
            }),
        );
        globals.raw_set(
            "type",
            NativeValue::function(|_, args| {
                let name = args.first().map_or("nil", NativeValue::type_name);
                Ok(vec![NativeValue::from(name)])
            }),
        );
        Self {
            globals,
            scripts: HashMap::new(),
        }
    }

    /// Register a script. `factory` builds a fresh instance for every task.
    pub fn register_script<F, S>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> S + 'static,
        S: NativeScript + 'static,
    {
        let name = name.into();
        let chunk = NativeChunk {
            name: Rc::from(name.as_str()),
            factory: Rc::new(move || Box::new(factory()) as Box<dyn NativeScript>),
        };
        self.scripts.insert(name, chunk);
    }

    /// Check whether a script is registered
    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    /// Call a function value
    pub fn call(
        &mut self,
        function: &NativeValue,
        args: Vec<NativeValue>,
    ) -> ScriptResult<Vec<NativeValue>> {
        match function {
            NativeValue::Function(function) => {
                let function = Rc::clone(function);
                function(self, args)
            }
            other => Err(ScriptError::Type {
                expected: "function",
                found: other.type_name(),
            }),
        }
    }
}

impl ScriptRuntime for NativeRuntime {
    type Value = NativeValue;
    type Function = NativeChunk;
    type Table = NativeTable;
    type Task = NativeTask;

    fn load(&mut self, name: &str) -> ScriptResult<NativeChunk> {
        self.scripts
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::NotFound(name.to_string()))
    }

    fn globals(&self) -> NativeTable {
        self.globals.clone()
    }

    fn new_sandbox(&mut self, fallback: &NativeTable) -> ScriptResult<NativeTable> {
        Ok(NativeTable::with_fallback(fallback))
    }

    fn raw_set(&mut self, table: &NativeTable, key: &str, value: NativeValue) -> ScriptResult<()> {
        table.raw_set(key, value);
        Ok(())
    }

    fn create_function(
        &mut self,
        function: NativeFunction<NativeRuntime>,
    ) -> ScriptResult<NativeValue> {
        Ok(NativeValue::Function(function))
    }

    fn connection_value(&mut self, handle: ConnectionHandle) -> ScriptResult<NativeValue> {
        Ok(NativeValue::Connection(handle))
    }

    fn create_task(&mut self, function: &NativeChunk, env: &NativeTable) -> ScriptResult<NativeTask> {
        Ok(NativeTask {
            name: function.name.clone(),
            env: env.clone(),
            script: (function.factory)(),
            dead: false,
        })
    }

    fn resume(
        &mut self,
        task: &mut NativeTask,
        args: Vec<NativeValue>,
    ) -> ScriptResult<TaskStatus<NativeValue>> {
        if task.dead {
            return Err(ScriptError::DeadTask);
        }
        let env = task.env.clone();
        let mut cx = ScriptContext {
            runtime: self,
            env: &env,
        };
        match task.script.resume(&mut cx, args) {
            Ok(Step::Yield(values)) => Ok(TaskStatus::Suspended(values)),
            Ok(Step::Return(values)) => {
                task.dead = true;
                Ok(TaskStatus::Finished(values))
            }
            Err(err) => {
                task.dead = true;
                Err(err)
            }
        }
    }

    fn is_suspended(&self, task: &NativeTask) -> bool {
        !task.dead
    }

    fn to_display(&mut self, value: &NativeValue) -> ScriptResult<String> {
        match value {
            NativeValue::Table(table) => {
                let hook = table.raw_get("__tostring");
                if hook.is_nil() {
                    return Ok(format!("table: {:#x}", table.addr()));
                }
                match self.call(&hook, vec![value.clone()])?.into_iter().next() {
                    Some(NativeValue::String(text)) => Ok(text.to_string()),
                    other => Err(ScriptError::Type {
                        expected: "string",
                        found: other.as_ref().map_or("nil", NativeValue::type_name),
                    }),
                }
            }
            NativeValue::Function(function) => {
                Ok(format!("function: {:#x}", function_addr(function)))
            }
            NativeValue::Connection(handle) => Ok(format!("connection: {}", handle.id())),
            primitive => Ok(primitive.as_primitive_string().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_script() -> impl NativeScript {
        let mut total = 0;
        script_fn(move |_cx, args| {
            total += args.first().and_then(NativeValue::as_integer).unwrap_or(0);
            if total >= 10 {
                Ok(Step::Return(vec![NativeValue::Integer(total)]))
            } else {
                Ok(Step::Yield(vec![NativeValue::Integer(total)]))
            }
        })
    }

    #[test]
    fn test_task_suspends_and_finishes() {
        let mut runtime = NativeRuntime::new();
        runtime.register_script("counter", counter_script);
        let chunk = runtime.load("counter").unwrap();
        let env = runtime.new_sandbox(&runtime.globals()).unwrap();
        let mut task = runtime.create_task(&chunk, &env).unwrap();
        assert_eq!(task.name(), "counter");
        assert!(runtime.is_suspended(&task));

        assert_eq!(
            runtime.resume(&mut task, vec![NativeValue::Integer(4)]).unwrap(),
            TaskStatus::Suspended(vec![NativeValue::Integer(4)])
        );
        assert_eq!(
            runtime.resume(&mut task, vec![NativeValue::Integer(6)]).unwrap(),
            TaskStatus::Finished(vec![NativeValue::Integer(10)])
        );
        assert!(!runtime.is_suspended(&task));
        assert_eq!(
            runtime.resume(&mut task, Vec::new()),
            Err(ScriptError::DeadTask)
        );
    }

    #[test]
    fn test_error_ends_task() {
        let mut runtime = NativeRuntime::new();
        runtime.register_script("broken", || {
            script_fn(|cx, _| {
                cx.call("no_such_function", Vec::new())?;
                Ok(Step::Yield(Vec::new()))
            })
        });
        let chunk = runtime.load("broken").unwrap();
        let mut task = runtime.create_task(&chunk, &runtime.globals()).unwrap();
        assert_eq!(
            runtime.resume(&mut task, Vec::new()),
            Err(ScriptError::Type {
                expected: "function",
                found: "nil"
            })
        );
        assert!(!runtime.is_suspended(&task));
    }

    #[test]
    fn test_unknown_script() {
        let mut runtime = NativeRuntime::new();
        assert!(matches!(
            runtime.load("missing"),
            Err(ScriptError::NotFound(name)) if name == "missing"
        ));
        assert!(!runtime.has_script("missing"));
    }

    #[test]
    fn test_sandbox_delegates_to_globals() {
        let mut runtime = NativeRuntime::new();
        let globals = runtime.globals();
        let first = runtime.new_sandbox(&globals).unwrap();
        let second = runtime.new_sandbox(&globals).unwrap();

        // Unmatched writes land in the shared globals.
        first.set("visitors", NativeValue::Integer(1));
        assert_eq!(second.get("visitors"), NativeValue::Integer(1));
        assert_eq!(globals.raw_get("visitors"), NativeValue::Integer(1));
        assert!(first.is_empty());

        // Raw writes shadow the globals for one sandbox only.
        runtime.raw_set(&first, "print", NativeValue::from("mine")).unwrap();
        assert_eq!(first.get("print"), NativeValue::from("mine"));
        assert_eq!(second.get("print").type_name(), "function");

        // Keys the sandbox holds are written in place.
        first.set("print", NativeValue::from("still mine"));
        assert_eq!(first.raw_get("print"), NativeValue::from("still mine"));
        assert_eq!(globals.get("print").type_name(), "function");
    }

    #[test]
    fn test_to_display() {
        let mut runtime = NativeRuntime::new();
        assert_eq!(runtime.to_display(&NativeValue::Number(2.0)).unwrap(), "2.0");
        assert_eq!(runtime.to_display(&NativeValue::Number(0.5)).unwrap(), "0.5");
        assert_eq!(runtime.to_display(&NativeValue::Nil).unwrap(), "nil");

        let table = NativeTable::new();
        assert!(
            runtime
                .to_display(&NativeValue::Table(table.clone()))
                .unwrap()
                .starts_with("table: 0x")
        );
        table.raw_set("__tostring", NativeValue::Integer(3));
        assert!(runtime.to_display(&NativeValue::Table(table)).is_err());

        let tostring = runtime.globals().get("tostring");
        assert_eq!(
            runtime.call(&tostring, vec![NativeValue::Boolean(true)]).unwrap(),
            vec![NativeValue::from("true")]
        );
        let type_of = runtime.globals().get("type");
        assert_eq!(
            runtime.call(&type_of, vec![NativeValue::Number(1.5)]).unwrap(),
            vec![NativeValue::from("number")]
        );
    }
}
