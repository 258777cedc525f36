use std::sync::mpsc;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum ExecutorMessage {
    Run(Job),
    Barrier(mpsc::Sender<()>),
    Shutdown,
}

/// Single worker thread that runs submitted jobs one after another in
/// submission order. Blocking planner calls and intent batches run here so
/// the caller (event dispatch) never waits on them.
#[derive(Debug)]
pub struct SerialExecutor {
    name: String,
    tx: mpsc::Sender<ExecutorMessage>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SerialExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<ExecutorMessage>();

        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(format!("Executor-{}", name))
            .spawn(move || {
                log::debug!("Executor {} started.", thread_name);
                Self::run_loop(rx);
                log::debug!("Executor {} stopped.", thread_name);
            })
            .map_err(|e| log::error!("Failed to spawn executor thread {}: {}", name, e))
            .ok();

        Self { name, tx, handle }
    }

    fn run_loop(rx: mpsc::Receiver<ExecutorMessage>) {
        while let Ok(msg) = rx.recv() {
            match msg {
                ExecutorMessage::Run(job) => job(),
                ExecutorMessage::Barrier(reply_to) => {
                    let _ = reply_to.send(());
                }
                ExecutorMessage::Shutdown => break,
            }
        }
    }

    /// Queues `job` behind everything submitted so far.
    ///
    /// # Returns
    /// Returns false if the worker thread is gone and the job was dropped.
    pub fn execute<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(ExecutorMessage::Run(Box::new(job))).is_err() {
            log::error!("Executor {} is not running, job dropped.", self.name);
            return false;
        }
        true
    }

    /// Blocks until every job queued before this call has finished.
    pub fn flush(&self) {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.tx.send(ExecutorMessage::Barrier(reply_tx)).is_ok() {
            let _ = reply_rx.recv();
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SerialExecutor {
    fn drop(&mut self) {
        let _ = self.tx.send(ExecutorMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            // A job may drop the last handle to its own executor.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn jobs_run_in_submission_order() {
        let executor = SerialExecutor::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let seen = seen.clone();
            executor.execute(move || seen.lock().unwrap().push(i));
        }
        executor.flush();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4], "Should run jobs in FIFO order");
    }
}
