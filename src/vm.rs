// File: src/vm.rs
//
// Multi-threaded execution of Push interpreters.
// A fixed pool of workers pulls submitted interpreters off a queue and
// runs each to completion or to the step budget. The Mutex around every
// interpreter is its execution lock; the live-process list lets callers
// wait for quiescence or interrupt everything in flight without touching
// those locks.

use crate::interpreter::{Interpreter, InterruptHandle, INTERRUPT_KILL};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// Callback invoked after a submitted interpreter finishes running
pub type DoneCallback = Arc<dyn Fn(&Arc<Mutex<Interpreter>>) + Send + Sync>;

struct Process {
    interp: Arc<Mutex<Interpreter>>,
    interrupt: InterruptHandle,
}

struct Shared {
    receiver: Mutex<Receiver<Arc<Mutex<Interpreter>>>>,
    live: Mutex<Vec<Process>>,
    idle: Condvar,
    done_callback: Option<DoneCallback>,
    max_steps: u64,
}

/// Bounded thread pool that runs interpreters to completion
pub struct Vm {
    shared: Arc<Shared>,
    sender: Option<Sender<Arc<Mutex<Interpreter>>>>,
    workers: Vec<JoinHandle<()>>,
}

impl Vm {
    /// Pool of `num_threads` workers; each submitted interpreter runs for
    /// at most `max_steps` steps (0 = until its exec stack empties)
    pub fn new(num_threads: usize, max_steps: u64, done_callback: Option<DoneCallback>) -> Vm {
        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(Shared {
            receiver: Mutex::new(receiver),
            live: Mutex::new(Vec::new()),
            idle: Condvar::new(),
            done_callback,
            max_steps,
        });

        let workers = (0..num_threads.max(1))
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || worker_loop(shared))
            })
            .collect();

        Vm { shared, sender: Some(sender), workers }
    }

    /// Queue an interpreter for execution. It joins the live list
    /// immediately, so `wait` covers it even before a worker picks it up.
    pub fn submit(&self, interp: Arc<Mutex<Interpreter>>) {
        let interrupt = interp.lock().unwrap().interrupt_handle();
        {
            let mut live = self.shared.live.lock().unwrap();
            live.push(Process { interp: interp.clone(), interrupt });
        }
        if let Some(sender) = &self.sender {
            let _ = sender.send(interp);
        }
    }

    /// Block until every submitted interpreter has finished
    pub fn wait(&self) {
        let mut live = self.shared.live.lock().unwrap();
        while !live.is_empty() {
            live = self.shared.idle.wait(live).unwrap();
        }
    }

    /// Number of interpreters queued or running
    pub fn num_processes(&self) -> usize {
        self.shared.live.lock().unwrap().len()
    }

    /// Set the interrupt flag on every live interpreter. Lock-free with
    /// respect to the interpreters themselves, so a stuck run cannot
    /// block this call.
    pub fn interrupt_all(&self, flag: i64) {
        let live = self.shared.live.lock().unwrap();
        for process in live.iter() {
            process.interrupt.set(flag);
        }
    }

    /// Interrupt every live interpreter with the kill flag
    pub fn kill_all(&self) {
        self.interrupt_all(INTERRUPT_KILL);
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        // closing the channel lets the workers drain the queue and exit
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let receiver = shared.receiver.lock().unwrap();
            receiver.recv()
        };
        match job {
            Ok(interp) => run_process(&shared, interp),
            Err(_) => break,
        }
    }
}

fn run_process(shared: &Shared, interp: Arc<Mutex<Interpreter>>) {
    {
        let mut guard = interp.lock().unwrap();
        guard.run(shared.max_steps);
    }
    {
        let mut live = shared.live.lock().unwrap();
        live.retain(|p| !Arc::ptr_eq(&p.interp, &interp));
        shared.idle.notify_all();
    }
    if let Some(callback) = &shared.done_callback {
        callback(&interp);
    }
}
