// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{isolated_config, Captured};
use gale_control::{CoreEngine, CoreError, FunctionId, ModuleCallbacks, ModuleId, SHELL_MODULE};
use gale_core::{Var, VarType};
use gale_telemetry::ShellLevel;

struct Fixture {
    engine: Arc<CoreEngine>,
    module: ModuleId,
    calls: Arc<AtomicUsize>,
    output: Captured,
    _dir: tempfile::TempDir,
}

/// Module "m" with `add(int,int)->int` and `tag(int,string)->string`.
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let engine = CoreEngine::new(isolated_config(dir.path()));
    let output = Captured::install(&engine);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let module = engine
        .declare_module(
            "m",
            ModuleCallbacks::new().on_shell(move |_, call| {
                counter.fetch_add(1, Ordering::SeqCst);
                match call.name.as_str() {
                    "add" => {
                        let sum = call.int_arg(0).unwrap() + call.int_arg(1).unwrap();
                        call.ret = Var::from(sum);
                    }
                    "tag" => {
                        let text = format!("{}:{}", call.int_arg(0).unwrap(), call.str_arg(1).unwrap());
                        call.ret = Var::from(text);
                    }
                    "sloppy" => call.ret = Var::from(1.5),
                    _ => {}
                }
            }),
        )
        .unwrap();
    engine
        .declare_shell_function(module, "add", VarType::Int, &[VarType::Int, VarType::Int])
        .unwrap();
    engine
        .declare_shell_function(module, "tag", VarType::String, &[VarType::Int, VarType::String])
        .unwrap();
    output.clear();

    Fixture {
        engine,
        module,
        calls,
        output,
        _dir: dir,
    }
}

#[test]
fn qualified_call_returns_module_result() {
    let f = fixture();
    let result = f.engine.shell_exec("m.add(2,3)").unwrap();
    assert_eq!(result.var_type(), VarType::Int);
    assert_eq!(result.as_int(), Some(5));

    let tagged = f.engine.shell_exec("m.tag(1,\"x\")").unwrap();
    assert_eq!(tagged.as_str(), Some("1:x"));
    assert_eq!(f.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn wrong_argument_order_is_rejected_before_the_call() {
    let f = fixture();
    let err = f.engine.shell_exec("m.tag(\"x\",1)").unwrap_err();
    assert!(matches!(err, CoreError::ParameterType { position: 1, .. }), "{err:?}");
    assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    assert!(f.output.contains(ShellLevel::Error, "Parameter number 1 of wrong type"));
}

#[test]
fn out_of_range_argument_aborts_the_call() {
    let f = fixture();
    let err = f.engine.shell_exec("m.add(3000000000,1)").unwrap_err();
    assert!(matches!(err, CoreError::Var(_)), "{err:?}");
    assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    assert!(f.output.contains(ShellLevel::Error, "bad number '3000000000'"));
}

#[test]
fn arity_errors_are_reported() {
    let f = fixture();
    assert!(matches!(
        f.engine.shell_exec("m.add(1)"),
        Err(CoreError::TooFewParameters(_))
    ));
    assert!(matches!(
        f.engine.shell_exec("m.add"),
        Err(CoreError::TooFewParameters(_))
    ));
    assert!(matches!(
        f.engine.shell_exec("m.add(1,2,3)"),
        Err(CoreError::TooManyParameters(_))
    ));
    assert!(matches!(
        f.engine.shell_exec("m.add(1,2"),
        Err(CoreError::UnexpectedEnd(2))
    ));
    assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    assert!(f.output.contains(ShellLevel::Error, "Too few parameters for function 'int add(int,int)'."));
}

#[test]
fn lookup_failures() {
    let f = fixture();
    assert!(matches!(
        f.engine.shell_exec("nope.add(1,2)"),
        Err(CoreError::ModuleNotFound(name)) if name == "nope"
    ));
    assert!(matches!(
        f.engine.shell_exec("m.sub(1,2)"),
        Err(CoreError::FunctionNotInModule { .. })
    ));
    assert!(matches!(
        f.engine.shell_exec("sub(1,2)"),
        Err(CoreError::FunctionNotFound(_))
    ));
    assert!(matches!(
        f.engine.shell_exec("42"),
        Err(CoreError::BadCommand(_))
    ));
    assert!(f.output.contains(ShellLevel::Error, "Function 'sub' not found in any module."));
}

#[test]
fn bare_name_resolves_to_first_declared_module() {
    let f = fixture();
    let other = f
        .engine
        .declare_module(
            "other",
            ModuleCallbacks::new().on_shell(|_, call| call.ret = Var::from(-1)),
        )
        .unwrap();
    f.engine
        .declare_shell_function(other, "add", VarType::Int, &[VarType::Int, VarType::Int])
        .unwrap();

    assert_eq!(f.engine.shell_exec("add(2,3)").unwrap().as_int(), Some(5));
    assert_eq!(f.engine.shell_exec("other.add(2,3)").unwrap().as_int(), Some(-1));
}

#[test]
fn nested_calls_feed_arguments() {
    let f = fixture();
    let result = f.engine.shell_exec("m.add(m.add(1,2),add(3,4))").unwrap();
    assert_eq!(result.as_int(), Some(10));
    assert_eq!(f.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn duplicate_declarations_fail() {
    let f = fixture();
    assert!(matches!(
        f.engine.declare_module("m", ModuleCallbacks::new()),
        Err(CoreError::ModuleExists(_))
    ));
    assert!(matches!(
        f.engine
            .declare_shell_function(f.module, "add", VarType::Void, &[]),
        Err(CoreError::FunctionExists { .. })
    ));
    assert!(matches!(
        f.engine
            .declare_shell_function(ModuleId(99), "x", VarType::Void, &[]),
        Err(CoreError::UnknownModule(99))
    ));
    assert!(f.output.contains(
        ShellLevel::Error,
        "Trying to declare an already existing function \"add\" for m module."
    ));
}

#[test]
fn module_without_shell_callback_cannot_be_called() {
    let f = fixture();
    let mute = f.engine.declare_module("mute", ModuleCallbacks::new()).unwrap();
    assert_eq!(
        f.engine
            .declare_shell_function(mute, "hello", VarType::Void, &[])
            .unwrap(),
        FunctionId(0)
    );
    assert!(matches!(
        f.engine.shell_exec("mute.hello()"),
        Err(CoreError::NoShellCallback(_))
    ));
}

#[test]
fn return_type_mismatch_is_a_warning() {
    let f = fixture();
    f.engine
        .declare_shell_function(f.module, "sloppy", VarType::Int, &[])
        .unwrap();
    let result = f.engine.shell_exec("m.sloppy()").unwrap();
    assert_eq!(result.as_float(), Some(1.5));
    assert!(f.output.contains(ShellLevel::Info, "Function 'int sloppy()' returned a float value."));
}

#[test]
fn command_results_are_printed() {
    let f = fixture();
    let result = f.engine.shell_exec_command("m.add(20,22)").unwrap();
    assert_eq!(result.as_int(), Some(42));
    assert!(f
        .output
        .user_lines()
        .contains(&"Shell execution returned: 42".to_owned()));

    f.output.clear();
    let void = f.engine.shell_exec_command("print(\"hello\")").unwrap();
    assert_eq!(void.var_type(), VarType::Void);
    assert_eq!(f.output.user_lines(), vec!["hello".to_owned()]);
}

#[test]
fn shell_builtins() {
    let f = fixture();
    let joined = f.engine.shell_exec("shell.cat(\"gale\",\"-core\")").unwrap();
    assert_eq!(joined.as_str(), Some("gale-core"));

    f.engine.shell_exec("setlevel(2)").unwrap();
    assert_eq!(f.engine.shell().level(), ShellLevel::Info);
    f.engine.shell_exec("setlevel(99)").unwrap();
    assert_eq!(f.engine.shell().level(), ShellLevel::HardDebug);
    f.engine.shell_exec("setlevel(-4)").unwrap();
    assert_eq!(f.engine.shell().level(), ShellLevel::User);
    assert_eq!(f.engine.module_name(SHELL_MODULE).as_deref(), Some("shell"));
}

#[test]
fn core_listing_builtins() {
    let f = fixture();
    f.engine.shell_exec("lsmod()").unwrap();
    assert_eq!(
        f.output.user_lines(),
        vec!["Declared modules:", " shell", " core", " m"]
    );

    f.output.clear();
    f.engine.shell_exec("lsfunc(\"m\")").unwrap();
    assert_eq!(
        f.output.user_lines(),
        vec![
            "Declared functions for m module:",
            " int add(int,int)",
            " string tag(int,string)"
        ]
    );

    f.output.clear();
    f.engine.shell_exec("lsfunc(\"ghost\")").unwrap();
    assert!(f.output.contains(ShellLevel::Error, "Module ghost not found."));

    let score = f
        .engine
        .create_resource(f.module, "score", VarType::Int, false)
        .unwrap();
    f.engine
        .set_resource_value(f.module, score, &Var::from(7))
        .unwrap();
    f.output.clear();
    f.engine.shell_exec("lsres()").unwrap();
    f.engine.shell_exec("echores(\"score\")").unwrap();
    f.engine.shell_exec("echores(\"missing\")").unwrap();
    assert_eq!(
        f.output.user_lines(),
        vec!["Declared resources:", " score", "#score=7"]
    );
    assert!(f.output.contains(ShellLevel::Error, "Ressource 'missing' not found."));
}

#[test]
fn completion_covers_declared_names() {
    let f = fixture();
    f.engine
        .create_resource(f.module, "latency", VarType::Float, false)
        .unwrap();

    let mut cursor = f.engine.complete("l");
    assert_eq!(cursor.results(), ["latency", "lsfunc", "lsmod", "lsres"]);
    assert_eq!(cursor.next_result(false), Some("latency"));

    assert_eq!(f.engine.complete("m").results(), ["m"]);
    assert_eq!(f.engine.complete("ta").results(), ["tag"]);
    assert!(f.engine.complete("zz").results().is_empty());
}
