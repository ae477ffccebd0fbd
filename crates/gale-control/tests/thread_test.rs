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
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{isolated_config, wait_until};
use gale_control::{
    CoreEngine, CoreError, CoreEvent, CoreState, ModuleCallbacks, ModuleId, ThreadId,
    ThreadState, CORE_MODULE, MAIN_THREAD,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn ticking_module(engine: &CoreEngine, name: &str, ticks: &Arc<AtomicUsize>) -> ModuleId {
    let ticks = Arc::clone(ticks);
    engine
        .declare_module(
            name,
            ModuleCallbacks::new().on_thread(move |_, _, _| {
                ticks.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap()
}

fn engine() -> (Arc<CoreEngine>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    (CoreEngine::new(isolated_config(dir.path())), dir)
}

fn wait_dead(engine: &CoreEngine, thread: ThreadId) -> bool {
    wait_until(TIMEOUT, || engine.thread_state(thread) == Some(ThreadState::Dead))
}

#[test]
fn worker_runs_until_terminated() {
    let (engine, _dir) = engine();
    let ticks = Arc::new(AtomicUsize::new(0));
    let owner = ticking_module(&engine, "worker", &ticks);

    let thread = engine.create_thread(owner, "physics", false).unwrap();
    assert_eq!(thread, ThreadId(1));
    assert_eq!(engine.thread_id(Some("physics")), Some(thread));
    engine
        .set_thread_timer(owner, thread, Duration::from_millis(1))
        .unwrap();

    assert!(wait_until(TIMEOUT, || ticks.load(Ordering::SeqCst) >= 3));
    assert_ne!(engine.thread_state(thread), Some(ThreadState::Dead));

    engine.term_thread(owner, thread).unwrap();
    assert!(wait_dead(&engine, thread));
    let after = ticks.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(ticks.load(Ordering::SeqCst), after);

    // Terminating a dead thread is harmless.
    engine.term_thread(owner, thread).unwrap();
}

#[test]
fn slots_share_the_owner_iteration() {
    let (engine, _dir) = engine();
    let owner_ticks = Arc::new(AtomicUsize::new(0));
    let guest_ticks = Arc::new(AtomicUsize::new(0));
    let owner = ticking_module(&engine, "owner", &owner_ticks);
    let guest = ticking_module(&engine, "guest", &guest_ticks);

    let durations = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&durations);
    let timed = engine
        .declare_module(
            "timed",
            ModuleCallbacks::new().on_thread(move |_, thread, elapsed| {
                sink.lock().unwrap().push((thread, elapsed));
            }),
        )
        .unwrap();

    let public = engine.create_thread(owner, "audio", true).unwrap();
    assert_eq!(engine.require_slot(guest, public).unwrap(), public);
    engine.require_slot(timed, public).unwrap();
    engine
        .set_thread_timer(owner, public, Duration::from_millis(2))
        .unwrap();

    assert!(wait_until(TIMEOUT, || guest_ticks.load(Ordering::SeqCst) >= 3));
    engine.term_thread(CORE_MODULE, public).unwrap();
    assert!(wait_dead(&engine, public));

    // The owner may have iterated alone before the slots were required.
    assert!(owner_ticks.load(Ordering::SeqCst) >= guest_ticks.load(Ordering::SeqCst));
    assert!(durations
        .lock()
        .unwrap()
        .iter()
        .all(|(thread, _)| *thread == public));
}

#[test]
fn private_threads_refuse_foreign_slots() {
    let (engine, _dir) = engine();
    let ticks = Arc::new(AtomicUsize::new(0));
    let owner = ticking_module(&engine, "owner", &ticks);
    let guest = ticking_module(&engine, "guest", &ticks);
    let silent = engine.declare_module("silent", ModuleCallbacks::new()).unwrap();

    let private = engine.create_thread(owner, "secret", false).unwrap();
    assert!(matches!(
        engine.require_slot(guest, private),
        Err(CoreError::PrivateThread { .. })
    ));
    assert!(matches!(
        engine.require_slot(silent, MAIN_THREAD),
        Err(CoreError::NoThreadCallback(_))
    ));
    assert!(matches!(
        engine.require_slot(guest, ThreadId(9)),
        Err(CoreError::UnknownThread { .. })
    ));
    assert_eq!(engine.require_slot(guest, MAIN_THREAD).unwrap(), MAIN_THREAD);

    engine.term_thread(owner, private).unwrap();
    assert!(wait_dead(&engine, private));
}

#[test]
fn only_owners_control_their_threads() {
    let (engine, _dir) = engine();
    let ticks = Arc::new(AtomicUsize::new(0));
    let owner = ticking_module(&engine, "owner", &ticks);
    let intruder = ticking_module(&engine, "intruder", &ticks);

    let thread = engine.create_thread(owner, "net", false).unwrap();
    for result in [
        engine.term_thread(intruder, thread),
        engine.pause_thread(intruder, thread),
        engine.resume_thread(intruder, thread),
        engine.kill_thread(intruder, thread),
        engine.set_thread_timer(intruder, thread, Duration::from_millis(5)),
    ] {
        assert!(matches!(result, Err(CoreError::NotThreadOwner { .. })), "{result:?}");
    }

    // The main thread can be retimed by anyone but never paused or killed.
    engine
        .set_thread_timer(intruder, MAIN_THREAD, Duration::from_millis(5))
        .unwrap();
    assert!(matches!(
        engine.pause_thread(CORE_MODULE, MAIN_THREAD),
        Err(CoreError::MainThread(_))
    ));
    assert!(matches!(
        engine.kill_thread(CORE_MODULE, MAIN_THREAD),
        Err(CoreError::MainThread(_))
    ));

    engine.term_thread(CORE_MODULE, thread).unwrap();
    assert!(wait_dead(&engine, thread));
}

#[test]
fn creation_checks() {
    let dir = tempfile::tempdir().unwrap();
    let config = gale_control::EngineConfig {
        max_threads: 2,
        ..isolated_config(dir.path())
    };
    let engine = CoreEngine::new(config);
    let ticks = Arc::new(AtomicUsize::new(0));
    let owner = ticking_module(&engine, "owner", &ticks);
    let mute = engine.declare_module("mute", ModuleCallbacks::new()).unwrap();

    assert!(matches!(
        engine.create_thread(mute, "x", true),
        Err(CoreError::NoThreadCallback(_))
    ));
    assert!(matches!(
        engine.create_thread(ModuleId(77), "x", true),
        Err(CoreError::UnknownModule(77))
    ));
    assert!(matches!(
        engine.create_thread(owner, "main", true),
        Err(CoreError::ThreadExists { .. })
    ));

    let only = engine.create_thread(owner, "only", true).unwrap();
    assert!(matches!(
        engine.create_thread(owner, "extra", true),
        Err(CoreError::TooManyThreads(2))
    ));
    assert_eq!(engine.thread_count(), 2);
    assert_eq!(engine.thread_id(None), Some(MAIN_THREAD));
    assert_eq!(engine.thread_id(Some("main")), Some(MAIN_THREAD));
    assert_eq!(engine.thread_id(Some("nope")), None);

    engine.term_thread(owner, only).unwrap();
    assert!(wait_dead(&engine, only));
}

#[test]
fn paused_thread_skips_callbacks_until_resumed() {
    let (engine, _dir) = engine();
    let ticks = Arc::new(AtomicUsize::new(0));
    let owner = ticking_module(&engine, "owner", &ticks);
    let thread = engine.create_thread(owner, "anim", false).unwrap();
    engine
        .set_thread_timer(owner, thread, Duration::from_millis(1))
        .unwrap();
    assert!(wait_until(TIMEOUT, || ticks.load(Ordering::SeqCst) >= 1));

    engine.pause_thread(owner, thread).unwrap();
    assert!(wait_until(TIMEOUT, || {
        engine.thread_state(thread) == Some(ThreadState::Paused)
    }));
    let frozen = ticks.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(ticks.load(Ordering::SeqCst), frozen);

    engine.resume_thread(owner, thread).unwrap();
    assert!(wait_until(TIMEOUT, || ticks.load(Ordering::SeqCst) > frozen));

    engine.term_thread(owner, thread).unwrap();
    assert!(wait_dead(&engine, thread));
    assert!(matches!(
        engine.pause_thread(owner, thread),
        Err(CoreError::DeadThread { .. })
    ));
}

#[test]
fn killed_thread_is_dead_at_once() {
    let (engine, _dir) = engine();
    let ticks = Arc::new(AtomicUsize::new(0));
    let owner = ticking_module(&engine, "owner", &ticks);
    let thread = engine.create_thread(owner, "doomed", false).unwrap();
    engine
        .set_thread_timer(owner, thread, Duration::from_millis(1))
        .unwrap();

    engine.kill_thread(owner, thread).unwrap();
    assert_eq!(engine.thread_state(thread), Some(ThreadState::Dead));
    assert!(matches!(
        engine.set_thread_timer(owner, thread, Duration::ZERO),
        Err(CoreError::DeadThread { .. })
    ));
}

#[test]
fn start_runs_main_loop_and_global_pause() {
    let (engine, _dir) = engine();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let iterations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&iterations);

    let director = engine
        .declare_module(
            "director",
            ModuleCallbacks::new()
                .on_event(move |_, event| sink.lock().unwrap().push(event))
                .on_thread(move |engine, thread, _| {
                    assert_eq!(thread, MAIN_THREAD);
                    match counter.fetch_add(1, Ordering::SeqCst) {
                        2 => engine.pause(),
                        6 => engine.resume(),
                        10 => engine.stop(),
                        _ => {}
                    }
                }),
        )
        .unwrap();
    engine.require_slot(director, MAIN_THREAD).unwrap();

    let worker_ticks = Arc::new(AtomicUsize::new(0));
    let worker = ticking_module(&engine, "worker", &worker_ticks);
    let background = engine.create_thread(worker, "background", false).unwrap();
    engine
        .set_thread_timer(worker, background, Duration::from_millis(1))
        .unwrap();

    engine.start().unwrap();

    assert_eq!(engine.thread_state(MAIN_THREAD), Some(ThreadState::Dead));
    assert_eq!(engine.thread_state(background), Some(ThreadState::Dead));
    assert_eq!(engine.state(), CoreState::Running);
    assert_eq!(
        *events.lock().unwrap(),
        vec![CoreEvent::Ready, CoreEvent::Pause, CoreEvent::Resume]
    );
    assert!(matches!(engine.start(), Err(CoreError::AlreadyStarted)));
}

#[test]
fn shutdown_waits_for_workers_without_start() {
    let (engine, _dir) = engine();
    let entered = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let (enter, finish) = (Arc::clone(&entered), Arc::clone(&finished));
    let owner = engine
        .declare_module(
            "slow",
            ModuleCallbacks::new().on_thread(move |_, _, _| {
                enter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(200));
                finish.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
    let thread = engine.create_thread(owner, "slow", false).unwrap();
    assert!(wait_until(TIMEOUT, || entered.load(Ordering::SeqCst) > 0));

    engine.stop();
    engine.shutdown().unwrap();

    assert_eq!(engine.thread_state(thread), Some(ThreadState::Dead));
    assert_eq!(engine.thread_state(MAIN_THREAD), Some(ThreadState::Dead));
    assert_eq!(
        entered.load(Ordering::SeqCst),
        finished.load(Ordering::SeqCst),
        "a callback was still running after shutdown"
    );
}
