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

//! Binding between a connection and its client task

use super::{NativeFunction, ScriptRuntime, ScriptValue, TaskStatus, format_print_args};
use crate::{ConnectionHandle, ConnectionId, EngineError, ScriptError, ScriptResult};
use metrics::counter;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, error, instrument, trace};

/// The cooperative task bound to one connection.
///
/// The task runs with a sandboxed global namespace that falls back to the runtime's shared
/// globals. The sandbox overrides `print` so output goes to the connection, and adds `send`,
/// `disconnect` and `connection`. The task and its sandbox live as long as the connection.
pub struct ClientTask<R: ScriptRuntime> {
    runtime: Rc<RefCell<R>>,
    task: R::Task,
    env: R::Table,
    connection_id: ConnectionId,
    script: String,
}

impl<R: ScriptRuntime> ClientTask<R> {
    /// Load `script` and create its task for the connection behind `handle`.
    ///
    /// The task is created but not started; see [`ClientTask::start`].
    #[instrument(skip(runtime, handle), fields(connection_id = %handle.id()))]
    pub fn spawn(
        runtime: Rc<RefCell<R>>,
        script: &str,
        handle: &ConnectionHandle,
    ) -> ScriptResult<Self> {
        let (task, env) = {
            let mut rt = runtime.try_borrow_mut().map_err(|_| busy())?;
            let function = rt.load(script)?;
            let globals = rt.globals();
            let env = rt.new_sandbox(&globals)?;
            install_bindings(&mut *rt, &env, handle)?;
            let task = rt.create_task(&function, &env)?;
            (task, env)
        };
        debug!("Created client task");
        Ok(Self {
            runtime,
            task,
            env,
            connection_id: handle.id(),
            script: script.to_string(),
        })
    }

    /// Resume the task for the first time, with no arguments.
    pub fn start(&mut self) {
        self.resume(Vec::new());
    }

    /// Hand one line of input to the task.
    ///
    /// The task is resumed with the line as its only argument when it is suspended waiting
    /// for input. Otherwise the line is dropped. Returns whether the line was delivered.
    pub fn deliver(&mut self, line: &str) -> bool {
        if !self.is_suspended() {
            debug!(
                connection_id = %self.connection_id,
                script = %self.script,
                "Client task is not waiting for input; dropping line"
            );
            return false;
        }
        self.resume(vec![R::Value::from_text(line)]);
        true
    }

    /// Check whether the task can be resumed
    pub fn is_suspended(&self) -> bool {
        self.runtime
            .try_borrow()
            .map(|runtime| runtime.is_suspended(&self.task))
            .unwrap_or(false)
    }

    /// The task's sandboxed global namespace
    pub fn env(&self) -> &R::Table {
        &self.env
    }

    fn resume(&mut self, args: Vec<R::Value>) {
        let result = match self.runtime.try_borrow_mut() {
            Ok(mut runtime) => runtime.resume(&mut self.task, args),
            Err(_) => Err(busy()),
        };
        match result {
            Ok(TaskStatus::Suspended(_)) => {
                trace!(connection_id = %self.connection_id, "Client task suspended");
            }
            Ok(TaskStatus::Finished(_)) => {
                debug!(
                    connection_id = %self.connection_id,
                    script = %self.script,
                    "Client task finished"
                );
            }
            Err(err) => {
                counter!("whatmud.errors.script").increment(1);
                error!(
                    connection_id = %self.connection_id,
                    script = %self.script,
                    error = %err,
                    "Client task raised an error"
                );
            }
        }
    }
}

fn busy() -> ScriptError {
    ScriptError::runtime("script runtime is already in use")
}

fn closed(err: EngineError) -> ScriptError {
    ScriptError::runtime(err.to_string())
}

fn native<R, F>(function: F) -> NativeFunction<R>
where
    R: ScriptRuntime,
    F: Fn(&mut R, Vec<R::Value>) -> ScriptResult<Vec<R::Value>> + 'static,
{
    Rc::new(function)
}

fn install_bindings<R: ScriptRuntime>(
    runtime: &mut R,
    env: &R::Table,
    handle: &ConnectionHandle,
) -> ScriptResult<()> {
    let connection = handle.clone();
    let print = runtime.create_function(native(move |runtime: &mut R, args| {
        let text = format_print_args(runtime, &args)?;
        connection.send_text(text).map_err(closed)?;
        Ok(Vec::new())
    }))?;
    runtime.raw_set(env, "print", print)?;

    let connection = handle.clone();
    let send = runtime.create_function(native(move |runtime: &mut R, args| {
        let mut text = String::new();
        for arg in &args {
            match arg.as_primitive_string() {
                Some(primitive) => text.push_str(&primitive),
                None => text.push_str(&runtime.to_display(arg)?),
            }
        }
        connection.send_text(text).map_err(closed)?;
        Ok(Vec::new())
    }))?;
    runtime.raw_set(env, "send", send)?;

    let connection = handle.clone();
    let disconnect = runtime.create_function(native(move |_: &mut R, _| {
        if connection.close().is_err() {
            trace!(connection_id = %connection.id(), "Connection already closing");
        }
        Ok(Vec::new())
    }))?;
    runtime.raw_set(env, "disconnect", disconnect)?;

    let value = runtime.connection_value(handle.clone())?;
    runtime.raw_set(env, "connection", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Outbound;
    use crate::script::{NativeRuntime, NativeValue, Step, script_fn};
    use std::net::SocketAddr;
    use tokio::sync::mpsc;

    fn connection() -> (ConnectionHandle, mpsc::UnboundedReceiver<Outbound>) {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        ConnectionHandle::channel(ConnectionId::new(1), addr)
    }

    fn sent_text(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<String> {
        let mut texts = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let Outbound::Text(text) = message {
                texts.push(text);
            }
        }
        texts
    }

    fn runtime_with(
        name: &str,
        script: impl Fn() -> Box<dyn crate::script::NativeScript> + 'static,
    ) -> Rc<RefCell<NativeRuntime>> {
        let mut runtime = NativeRuntime::new();
        runtime.register_script(name, script);
        Rc::new(RefCell::new(runtime))
    }

    #[test]
    fn test_print_goes_to_connection() {
        let runtime = runtime_with("client_handler", || {
            Box::new(script_fn(|cx, args| {
                if args.is_empty() {
                    cx.call(
                        "print",
                        vec![NativeValue::from("Welcome"), NativeValue::Integer(1)],
                    )?;
                } else {
                    cx.call("send", vec![NativeValue::from("> ")])?;
                }
                Ok(Step::Yield(Vec::new()))
            }))
        });
        let (handle, mut rx) = connection();
        let mut client = ClientTask::spawn(runtime, "client_handler", &handle).unwrap();
        client.start();
        assert!(client.deliver("look"));
        assert_eq!(sent_text(&mut rx), vec!["Welcome\t1\n", "> "]);
    }

    #[test]
    fn test_sandbox_bindings_are_per_connection() {
        let runtime = runtime_with("client_handler", || {
            Box::new(script_fn(|_, _| Ok(Step::Yield(Vec::new()))))
        });
        let (first_handle, _rx1) = connection();
        let (second_handle, _rx2) = connection();
        let first = ClientTask::spawn(runtime.clone(), "client_handler", &first_handle).unwrap();
        let second = ClientTask::spawn(runtime.clone(), "client_handler", &second_handle).unwrap();

        assert_eq!(
            first.env().get("connection"),
            NativeValue::Connection(first_handle.clone())
        );
        assert_ne!(
            first.env().get("connection"),
            second.env().get("connection")
        );
        assert_ne!(first.env().get("print"), runtime.borrow().globals().get("print"));
        assert_eq!(first.env().get("tostring"), second.env().get("tostring"));
    }

    #[test]
    fn test_lines_dropped_after_task_finishes() {
        let runtime = runtime_with("client_handler", || {
            Box::new(script_fn(|cx, args| match args.first() {
                None => Ok(Step::Yield(Vec::new())),
                Some(line) => {
                    cx.call("print", vec![line.clone()])?;
                    Ok(Step::Return(Vec::new()))
                }
            }))
        });
        let (handle, mut rx) = connection();
        let mut client = ClientTask::spawn(runtime, "client_handler", &handle).unwrap();
        client.start();
        assert!(client.deliver("first"));
        assert!(!client.is_suspended());
        assert!(!client.deliver("second"));
        assert_eq!(sent_text(&mut rx), vec!["first\n"]);
    }

    #[test]
    fn test_disconnect_queues_close() {
        let runtime = runtime_with("client_handler", || {
            Box::new(script_fn(|cx, _| {
                cx.call("disconnect", Vec::new())?;
                cx.call("disconnect", Vec::new())?;
                Ok(Step::Return(Vec::new()))
            }))
        });
        let (handle, mut rx) = connection();
        let mut client = ClientTask::spawn(runtime, "client_handler", &handle).unwrap();
        client.start();
        assert!(matches!(rx.try_recv(), Ok(Outbound::Close)));
    }

    #[test]
    fn test_missing_script() {
        let runtime = Rc::new(RefCell::new(NativeRuntime::new()));
        let (handle, _rx) = connection();
        assert!(matches!(
            ClientTask::spawn(runtime, "client_handler", &handle),
            Err(ScriptError::NotFound(_))
        ));
    }
}
