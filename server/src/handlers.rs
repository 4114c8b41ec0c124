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

//! Built-in client handlers

use whatmud_service::{
    NativeRuntime, NativeScript, NativeValue, ScriptContext, ScriptResult, Step,
};

/// Register every built-in handler with the runtime.
pub fn register(runtime: &mut NativeRuntime) {
    runtime.register_script("client_handler", ClientHandler::default);
}

/// Greets the player, echoes what they type and disconnects them on `quit`.
///
/// The visitor count lives in the shared globals, so every connection sees the same tally.
#[derive(Debug, Default)]
struct ClientHandler {
    started: bool,
}

impl ClientHandler {
    fn prompt(cx: &mut ScriptContext<'_>) -> ScriptResult<Step> {
        cx.call("send", vec![NativeValue::from("> ")])?;
        Ok(Step::Yield(Vec::new()))
    }
}

impl NativeScript for ClientHandler {
    fn resume(
        &mut self,
        cx: &mut ScriptContext<'_>,
        args: Vec<NativeValue>,
    ) -> ScriptResult<Step> {
        if !self.started {
            self.started = true;
            let visitors = cx.get("visitors").as_integer().unwrap_or(0) + 1;
            cx.set("visitors", visitors);
            cx.print(format!(
                "Welcome to WhatMUD! You are visitor #{}.",
                visitors
            ))?;
            return Self::prompt(cx);
        }

        let line = args.first().and_then(NativeValue::as_str).unwrap_or_default();
        match line.trim() {
            "quit" => {
                cx.print("Goodbye.")?;
                cx.call("disconnect", Vec::new())?;
                Ok(Step::Return(Vec::new()))
            }
            "" => Self::prompt(cx),
            said => {
                cx.print(format!("You said: {}", said))?;
                Self::prompt(cx)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use whatmud_service::{NativeTable, ScriptRuntime, TaskStatus};

    /// Sandbox recording output instead of sending it anywhere.
    fn sandbox(runtime: &mut NativeRuntime, output: &Rc<RefCell<Vec<String>>>) -> NativeTable {
        let env = runtime.new_sandbox(&runtime.globals()).unwrap();
        for name in ["print", "send", "disconnect"] {
            let output = output.clone();
            env.raw_set(
                name,
                NativeValue::function(move |runtime, args| {
                    let mut text = name.to_string();
                    for arg in &args {
                        text.push(' ');
                        text.push_str(&runtime.to_display(arg)?);
                    }
                    output.borrow_mut().push(text);
                    Ok(Vec::new())
                }),
            );
        }
        env
    }

    #[test]
    fn test_greeting_counts_visitors() {
        let mut runtime = NativeRuntime::new();
        register(&mut runtime);
        let chunk = runtime.load("client_handler").unwrap();
        let output = Rc::new(RefCell::new(Vec::new()));

        for _ in 0..2 {
            let env = sandbox(&mut runtime, &output);
            let mut task = runtime.create_task(&chunk, &env).unwrap();
            runtime.resume(&mut task, Vec::new()).unwrap();
        }

        assert_eq!(
            *output.borrow(),
            vec![
                "print Welcome to WhatMUD! You are visitor #1.",
                "send > ",
                "print Welcome to WhatMUD! You are visitor #2.",
                "send > ",
            ]
        );
        assert_eq!(runtime.globals().get("visitors"), NativeValue::Integer(2));
    }

    #[test]
    fn test_echo_and_quit() {
        let mut runtime = NativeRuntime::new();
        register(&mut runtime);
        let chunk = runtime.load("client_handler").unwrap();
        let output = Rc::new(RefCell::new(Vec::new()));
        let env = sandbox(&mut runtime, &output);
        let mut task = runtime.create_task(&chunk, &env).unwrap();
        runtime.resume(&mut task, Vec::new()).unwrap();
        output.borrow_mut().clear();

        let status = runtime
            .resume(&mut task, vec![NativeValue::from("hello there")])
            .unwrap();
        assert_eq!(status, TaskStatus::Suspended(Vec::new()));
        let status = runtime
            .resume(&mut task, vec![NativeValue::from(" quit ")])
            .unwrap();
        assert_eq!(status, TaskStatus::Finished(Vec::new()));
        assert!(!runtime.is_suspended(&task));

        assert_eq!(
            *output.borrow(),
            vec![
                "print You said: hello there",
                "send > ",
                "print Goodbye.",
                "disconnect",
            ]
        );
    }
}
