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

//! Scripting boundary
//!
//! The engine does not implement a scripting language. It drives one through
//! [`ScriptRuntime`], which needs only a handful of operations: load a script by name, build
//! a sandboxed namespace that falls back to the shared globals, create and resume a
//! cooperative task, and turn any value into text.
//!
//! [`ClientTask`] binds one task to one connection. [`NativeRuntime`] is an in-tree runtime
//! hosting handlers written in Rust.

mod binding;
mod native;

pub use self::binding::ClientTask;
pub use self::native::{
    FnScript, NativeChunk, NativeRuntime, NativeScript, NativeTable, NativeTask, NativeValue,
    ScriptContext, Step, script_fn,
};

use crate::{ConnectionHandle, ScriptResult};
use std::rc::Rc;

/// Values crossing the scripting boundary
pub trait ScriptValue: Clone + std::fmt::Debug + 'static {
    /// Build a string value
    fn from_text(text: &str) -> Self;

    /// Text of a primitive value (nil, boolean, number or string), without calling back into
    /// the runtime. `None` for everything else.
    fn as_primitive_string(&self) -> Option<String>;
}

/// Outcome of resuming a task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus<V> {
    /// The task yielded these values and can be resumed again
    Suspended(Vec<V>),
    /// The task returned these values and is finished
    Finished(Vec<V>),
}

/// Host function callable from scripts.
///
/// Receives the runtime itself, so a host function can convert or call values while a task
/// is being resumed.
pub type NativeFunction<R> = Rc<
    dyn Fn(
        &mut R,
        Vec<<R as ScriptRuntime>::Value>,
    ) -> ScriptResult<Vec<<R as ScriptRuntime>::Value>>,
>;

/// Operations the engine needs from an embedded scripting runtime.
///
/// Runtimes are single-threaded and are only ever touched from the event loop.
pub trait ScriptRuntime: Sized + 'static {
    /// Any script value
    type Value: ScriptValue;
    /// A loaded script, ready to become a task
    type Function: Clone;
    /// A namespace table
    type Table: Clone;
    /// A cooperative task
    type Task;

    /// Load the script registered under `name`
    fn load(&mut self, name: &str) -> ScriptResult<Self::Function>;

    /// The shared global namespace
    fn globals(&self) -> Self::Table;

    /// A new empty table whose unmatched reads and writes go to `fallback`
    fn new_sandbox(&mut self, fallback: &Self::Table) -> ScriptResult<Self::Table>;

    /// Set a key on `table` itself, bypassing its fallback
    fn raw_set(&mut self, table: &Self::Table, key: &str, value: Self::Value) -> ScriptResult<()>;

    /// Wrap a host function as a script value
    fn create_function(&mut self, function: NativeFunction<Self>) -> ScriptResult<Self::Value>;

    /// Opaque script value standing for a connection
    fn connection_value(&mut self, handle: ConnectionHandle) -> ScriptResult<Self::Value>;

    /// Create a task running `function` with `env` as its global namespace
    fn create_task(
        &mut self,
        function: &Self::Function,
        env: &Self::Table,
    ) -> ScriptResult<Self::Task>;

    /// Resume a task. Errors raised by the script are returned and end the task.
    fn resume(
        &mut self,
        task: &mut Self::Task,
        args: Vec<Self::Value>,
    ) -> ScriptResult<TaskStatus<Self::Value>>;

    /// Check whether a task can be resumed
    fn is_suspended(&self, task: &Self::Task) -> bool;

    /// Convert any value to text, using the runtime's conversion hooks
    fn to_display(&mut self, value: &Self::Value) -> ScriptResult<String>;
}

/// Format `print` arguments: tab separated, newline terminated.
pub fn format_print_args<R: ScriptRuntime>(
    runtime: &mut R,
    args: &[R::Value],
) -> ScriptResult<String> {
    let mut text = String::new();
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            text.push('\t');
        }
        match arg.as_primitive_string() {
            Some(primitive) => text.push_str(&primitive),
            None => text.push_str(&runtime.to_display(arg)?),
        }
    }
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_print_args() {
        let mut runtime = NativeRuntime::new();
        let args = vec![
            NativeValue::from("hp"),
            NativeValue::Integer(12),
            NativeValue::Boolean(true),
            NativeValue::Nil,
        ];
        assert_eq!(
            format_print_args(&mut runtime, &args).unwrap(),
            "hp\t12\ttrue\tnil\n"
        );
        assert_eq!(format_print_args(&mut runtime, &[]).unwrap(), "\n");
    }

    #[test]
    fn test_format_print_args_uses_conversion_hook() {
        let mut runtime = NativeRuntime::new();
        let table = NativeTable::new();
        table.raw_set(
            "__tostring",
            NativeValue::function(|_: &mut NativeRuntime, _| Ok(vec![NativeValue::from("sword")])),
        );
        let args = vec![NativeValue::from("you see"), NativeValue::Table(table)];
        assert_eq!(
            format_print_args(&mut runtime, &args).unwrap(),
            "you see\tsword\n"
        );
    }
}
