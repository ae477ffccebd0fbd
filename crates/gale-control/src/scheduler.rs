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

//! Cooperative thread scheduler.
//!
//! Every scheduler thread runs the same loop: wait until its timer elapsed
//! since the previous iteration, then call its owner's thread callback
//! followed by the callbacks of the modules holding a slot in it. The main
//! thread runs on the caller of [`CoreEngine::start`] and drives the global
//! pause and resume events instead of an owner callback.
//!
//! Requests from other threads update the shared state right away and wake
//! the target through its command channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use gale_core::Stopwatch;

use crate::engine::{CoreEngine, CORE_MODULE};
use crate::error::CoreError;
use crate::ids::{ModuleId, ThreadId, MAIN_THREAD};
use crate::module::CoreEvent;

/// Execution state of a scheduler thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadState {
    /// Created, loop not entered yet.
    Here,
    /// Iterating.
    Running,
    /// Pause requested, effective at the next iteration.
    WillPause,
    /// Callbacks are not called.
    Paused,
    /// Termination requested, effective at the next iteration.
    WillTerm,
    /// Loop exited. Terminal.
    Dead,
}

/// Control message sent to a scheduler thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadCommand {
    /// Stop calling callbacks.
    Pause,
    /// Call callbacks again.
    Resume,
    /// Leave the loop.
    Terminate,
    /// Change the minimum iteration interval.
    SetTimer(Duration),
}

#[derive(Debug)]
struct ThreadShared {
    state: ThreadState,
    timer: Duration,
    slots: Vec<ModuleId>,
}

impl ThreadShared {
    fn apply(&mut self, command: ThreadCommand) {
        match (command, self.state) {
            (_, ThreadState::Dead) => {}
            (ThreadCommand::Terminate, _) => self.state = ThreadState::WillTerm,
            (_, ThreadState::WillTerm) => {}
            (ThreadCommand::Pause, ThreadState::Here | ThreadState::Running) => {
                self.state = ThreadState::WillPause
            }
            (ThreadCommand::Resume, ThreadState::Paused | ThreadState::WillPause) => {
                self.state = ThreadState::Running
            }
            (ThreadCommand::SetTimer(timer), _) => self.timer = timer,
            _ => {}
        }
    }
}

#[derive(Debug)]
pub(crate) struct ThreadRecord {
    id: ThreadId,
    owner: ModuleId,
    name: String,
    public: bool,
    shared: Mutex<ThreadShared>,
    commands: Sender<ThreadCommand>,
    cancel: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadRecord {
    fn new(
        id: ThreadId,
        owner: ModuleId,
        name: &str,
        public: bool,
        timer: Duration,
    ) -> (Self, Receiver<ThreadCommand>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let record = Self {
            id,
            owner,
            name: name.to_owned(),
            public,
            shared: Mutex::new(ThreadShared {
                state: ThreadState::Here,
                timer,
                slots: Vec::new(),
            }),
            commands: tx,
            cancel: AtomicBool::new(false),
            handle: Mutex::new(None),
        };
        (record, rx)
    }

    fn shared(&self) -> MutexGuard<'_, ThreadShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> ThreadState {
        self.shared().state
    }

    /// Applies `command` now and wakes the thread so it sees it.
    fn request(&self, command: ThreadCommand) {
        self.shared().apply(command);
        // The loop may already be gone; the state is authoritative anyway.
        let _ = self.commands.send(command);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

/// Thread table of an engine.
#[derive(Debug)]
pub(crate) struct Scheduler {
    threads: RwLock<Vec<Arc<ThreadRecord>>>,
    main_commands: Mutex<Option<Receiver<ThreadCommand>>>,
    capacity: usize,
}

impl Scheduler {
    /// Creates the table holding only the main thread.
    pub(crate) fn new(main_owner: ModuleId, main_timer: Duration, capacity: usize) -> Self {
        let (main, rx) = ThreadRecord::new(MAIN_THREAD, main_owner, "main", true, main_timer);
        Self {
            threads: RwLock::new(vec![Arc::new(main)]),
            main_commands: Mutex::new(Some(rx)),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, id: ThreadId) -> Option<Arc<ThreadRecord>> {
        self.threads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.index())
            .cloned()
    }

    fn all(&self) -> Vec<Arc<ThreadRecord>> {
        self.threads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.threads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn find(&self, name: &str) -> Option<ThreadId> {
        self.threads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.id)
    }

    fn take_main_commands(&self) -> Option<Receiver<ThreadCommand>> {
        self.main_commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Waits for every worker to exit and marks it dead. A worker calling
    /// this is skipped.
    fn join_workers(&self) {
        for record in self.all().iter().skip(1) {
            let handle = {
                let mut slot = record.handle.lock().unwrap_or_else(PoisonError::into_inner);
                if matches!(&*slot, Some(h) if h.thread().id() == thread::current().id()) {
                    continue;
                }
                slot.take()
            };
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    log::error!("Thread '{}' panicked.", record.name);
                }
            }
            record.shared().state = ThreadState::Dead;
        }
    }
}

impl CoreEngine {
    /// Creates a scheduler thread owned by `owner` and starts it.
    ///
    /// The thread iterates as fast as possible until a timer is set with
    /// [`set_thread_timer`](Self::set_thread_timer). A public thread accepts
    /// slots from every module.
    pub fn create_thread(
        &self,
        owner: ModuleId,
        name: &str,
        public: bool,
    ) -> Result<ThreadId, CoreError> {
        let owner_name = {
            let modules = self.modules();
            let Some(module) = modules.get(owner) else {
                return Err(self.fail(CoreError::UnknownModule(owner.index())));
            };
            if module.callbacks.thread.is_none() {
                return Err(self.fail(CoreError::NoThreadCallback(module.name.clone())));
            }
            module.name.clone()
        };

        let (record, rx) = {
            let mut threads = self
                .scheduler
                .threads
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if threads.len() >= self.scheduler.capacity {
                drop(threads);
                return Err(self.fail(CoreError::TooManyThreads(self.scheduler.capacity)));
            }
            if threads.iter().any(|t| t.name == name) {
                drop(threads);
                return Err(self.fail(CoreError::ThreadExists {
                    module: owner_name,
                    thread: name.to_owned(),
                }));
            }
            let (record, rx) =
                ThreadRecord::new(ThreadId(threads.len()), owner, name, public, Duration::ZERO);
            let record = Arc::new(record);
            threads.push(Arc::clone(&record));
            (record, rx)
        };

        let Some(engine) = self.arc() else {
            record.shared().state = ThreadState::Dead;
            return Err(self.fail(CoreError::Spawn {
                thread: name.to_owned(),
                source: std::io::Error::other("engine is shutting down"),
            }));
        };
        let worker = Arc::clone(&record);
        let spawned = thread::Builder::new()
            .name(format!("gale-{name}"))
            .spawn(move || engine.run_thread(&worker, &rx));
        match spawned {
            Ok(handle) => {
                *record.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                log::debug!("Thread '{name}' ({}) started for module '{owner_name}'.", record.id);
                Ok(record.id)
            }
            Err(source) => {
                record.shared().state = ThreadState::Dead;
                Err(self.fail(CoreError::Spawn {
                    thread: name.to_owned(),
                    source,
                }))
            }
        }
    }

    fn thread_for(
        &self,
        module: ModuleId,
        thread: ThreadId,
        action: &'static str,
    ) -> Result<Arc<ThreadRecord>, CoreError> {
        self.scheduler.get(thread).ok_or_else(|| {
            self.fail(CoreError::UnknownThread {
                module: self.modules().name_of(module),
                action,
                thread,
            })
        })
    }

    fn not_owner(&self, module: ModuleId, record: &ThreadRecord, action: &'static str) -> CoreError {
        self.fail(CoreError::NotThreadOwner {
            module: self.modules().name_of(module),
            action,
            thread: record.name.clone(),
        })
    }

    fn dead_thread(&self, module: ModuleId, record: &ThreadRecord, action: &'static str) -> CoreError {
        self.fail(CoreError::DeadThread {
            module: self.modules().name_of(module),
            action,
            thread: record.name.clone(),
        })
    }

    /// Asks a thread to leave its loop at the next iteration.
    ///
    /// Allowed to the owner and to the core module.
    pub fn term_thread(&self, module: ModuleId, thread: ThreadId) -> Result<(), CoreError> {
        let record = self.thread_for(module, thread, "term")?;
        if record.owner != module && module != CORE_MODULE {
            return Err(self.not_owner(module, &record, "term"));
        }
        record.request(ThreadCommand::Terminate);
        Ok(())
    }

    /// Marks a thread dead immediately.
    ///
    /// The native thread stops before its next callback; a callback in
    /// progress runs to completion.
    pub fn kill_thread(&self, module: ModuleId, thread: ThreadId) -> Result<(), CoreError> {
        let record = self.thread_for(module, thread, "kill")?;
        if record.owner != module {
            return Err(self.not_owner(module, &record, "kill"));
        }
        if thread == MAIN_THREAD {
            return Err(self.fail(CoreError::MainThread("be killed")));
        }
        record.cancel.store(true, Ordering::Release);
        record.shared().state = ThreadState::Dead;
        let _ = record.commands.send(ThreadCommand::Terminate);
        Ok(())
    }

    /// Stops calling the callbacks of a thread, from its next iteration.
    pub fn pause_thread(&self, module: ModuleId, thread: ThreadId) -> Result<(), CoreError> {
        let record = self.thread_for(module, thread, "pause")?;
        if record.owner != module {
            return Err(self.not_owner(module, &record, "pause"));
        }
        if thread == MAIN_THREAD {
            return Err(self.fail(CoreError::MainThread("be paused")));
        }
        if record.state() == ThreadState::Dead {
            return Err(self.dead_thread(module, &record, "pause"));
        }
        record.request(ThreadCommand::Pause);
        Ok(())
    }

    /// Resumes a paused thread.
    pub fn resume_thread(&self, module: ModuleId, thread: ThreadId) -> Result<(), CoreError> {
        let record = self.thread_for(module, thread, "resume")?;
        if record.owner != module {
            return Err(self.not_owner(module, &record, "resume"));
        }
        if record.state() == ThreadState::Dead {
            return Err(self.dead_thread(module, &record, "resume"));
        }
        record.request(ThreadCommand::Resume);
        Ok(())
    }

    /// Sets the minimum interval between two iterations of a thread.
    ///
    /// Any module may retime the main thread.
    pub fn set_thread_timer(
        &self,
        module: ModuleId,
        thread: ThreadId,
        timer: Duration,
    ) -> Result<(), CoreError> {
        if self.modules().get(module).is_none() {
            return Err(self.fail(CoreError::UnknownModule(module.index())));
        }
        let record = self.thread_for(module, thread, "retime")?;
        if record.owner != module && thread != MAIN_THREAD {
            return Err(self.not_owner(module, &record, "retime"));
        }
        if record.state() == ThreadState::Dead {
            return Err(self.dead_thread(module, &record, "retime"));
        }
        record.request(ThreadCommand::SetTimer(timer));
        Ok(())
    }

    /// Runs `module`'s thread callback on `thread` too, after the owner's.
    pub fn require_slot(&self, module: ModuleId, thread: ThreadId) -> Result<ThreadId, CoreError> {
        let module_name = {
            let modules = self.modules();
            let Some(m) = modules.get(module) else {
                return Err(self.fail(CoreError::UnknownModule(module.index())));
            };
            m.name.clone()
        };
        let record = self.thread_for(module, thread, "require a slot in")?;
        if record.owner != module && !record.public {
            return Err(self.fail(CoreError::PrivateThread {
                module: module_name,
                thread: record.name.clone(),
            }));
        }
        let has_callback = self
            .modules()
            .get(module)
            .is_some_and(|m| m.callbacks.thread.is_some());
        if !has_callback {
            return Err(self.fail(CoreError::NoThreadCallback(module_name)));
        }
        record.shared().slots.push(module);
        Ok(thread)
    }

    /// Looks a thread up by name; `None` and `"main"` give the main thread.
    pub fn thread_id(&self, name: Option<&str>) -> Option<ThreadId> {
        match name {
            None | Some("main") => Some(MAIN_THREAD),
            Some(name) => self.scheduler.find(name),
        }
    }

    /// Current state of a thread.
    pub fn thread_state(&self, thread: ThreadId) -> Option<ThreadState> {
        self.scheduler.get(thread).map(|t| t.state())
    }

    /// Number of threads ever created, the main thread included.
    pub fn thread_count(&self) -> usize {
        self.scheduler.len()
    }

    /// Runs the main thread until it is terminated, then waits for every
    /// worker.
    pub(crate) fn run_main_thread(&self) {
        let Some(rx) = self.scheduler.take_main_commands() else {
            return;
        };
        if let Some(main) = self.scheduler.get(MAIN_THREAD) {
            self.run_thread(&main, &rx);
        }
        self.scheduler.join_workers();
    }

    /// Asks every thread to terminate on behalf of the core module.
    pub(crate) fn term_all_threads(&self) {
        for record in self.scheduler.all() {
            record.request(ThreadCommand::Terminate);
        }
    }

    /// Terminates every thread and blocks until the workers are dead. A main
    /// thread that never ran is marked dead as well.
    pub(crate) fn stop_all_threads(&self) {
        self.term_all_threads();
        self.scheduler.join_workers();
        if self.scheduler.take_main_commands().is_some() {
            if let Some(main) = self.scheduler.get(MAIN_THREAD) {
                main.shared().state = ThreadState::Dead;
            }
        }
    }

    fn run_thread(&self, record: &ThreadRecord, commands: &Receiver<ThreadCommand>) {
        let mut watch = Stopwatch::new();
        {
            let mut shared = record.shared();
            if shared.state == ThreadState::Here {
                shared.state = ThreadState::Running;
            }
        }

        loop {
            loop {
                match commands.try_recv() {
                    Ok(command) => record.shared().apply(command),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        record.shared().apply(ThreadCommand::Terminate);
                        break;
                    }
                }
            }
            if record.is_cancelled() {
                return;
            }

            let (state, timer) = {
                let mut shared = record.shared();
                if shared.state == ThreadState::WillPause {
                    shared.state = ThreadState::Paused;
                }
                (shared.state, shared.timer)
            };
            match state {
                ThreadState::WillTerm | ThreadState::Dead => break,
                ThreadState::Paused => {
                    match commands.recv() {
                        Ok(command) => record.shared().apply(command),
                        Err(_) => record.shared().apply(ThreadCommand::Terminate),
                    }
                    watch.lap();
                    continue;
                }
                _ => {}
            }

            if !timer.is_zero() {
                match commands.recv_deadline(watch.deadline(timer)) {
                    Ok(command) => {
                        record.shared().apply(command);
                        continue;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        record.shared().apply(ThreadCommand::Terminate);
                        continue;
                    }
                }
            }
            let elapsed = watch.lap();

            if record.is_cancelled() {
                return;
            }
            if record.id == MAIN_THREAD {
                self.step_global_state();
            } else {
                let callback = self
                    .modules()
                    .get(record.owner)
                    .and_then(|m| m.callbacks.thread.clone());
                if let Some(callback) = callback {
                    callback(self, record.id, elapsed);
                }
            }

            let slots = record.shared().slots.clone();
            let callbacks: Vec<_> = {
                let modules = self.modules();
                slots
                    .iter()
                    .filter_map(|&m| modules.get(m).and_then(|m| m.callbacks.thread.clone()))
                    .collect()
            };
            for callback in callbacks {
                if record.is_cancelled() {
                    return;
                }
                callback(self, record.id, elapsed);
            }
        }

        record.shared().state = ThreadState::Dead;
        log::debug!("Thread '{}' ({}) terminated.", record.name, record.id);
    }

    /// Fires a pending global pause or resume.
    fn step_global_state(&self) {
        if let Some(event) = self.advance_state() {
            self.dispatch_event(event);
        }
    }
}

/// Process-wide state driven by the main thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreState {
    /// Normal operation.
    Running,
    /// Pause requested.
    WillPause,
    /// [`CoreEvent::Pause`] was delivered.
    Paused,
    /// Resume requested.
    WillResume,
}

impl CoreState {
    /// Next state after one main-thread iteration, with the event it fires.
    pub(crate) fn step(self) -> (Self, Option<CoreEvent>) {
        match self {
            CoreState::WillPause => (CoreState::Paused, Some(CoreEvent::Pause)),
            CoreState::WillResume => (CoreState::Running, Some(CoreEvent::Resume)),
            other => (other, None),
        }
    }
}
