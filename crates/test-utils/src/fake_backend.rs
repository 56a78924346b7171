use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use deploydag::errors::Result;
use deploydag::exec::{OperationContext, ProvisionerBackend};
use deploydag::manifest::StackDescriptor;
use deploydag::Method;

/// A fake provisioner backend that:
/// - records which stacks were operated on, in start order
/// - completes immediately unless a stack is gated or a delay is configured
/// - fails stacks scripted via `fail_stack`
/// - tracks the high-water mark of concurrently running operations.
///
/// Clones share all state, so tests keep a clone and hand the original to
/// the project.
#[derive(Clone)]
pub struct FakeBackend {
    executed: Arc<Mutex<Vec<(String, Method)>>>,
    failures: Arc<Mutex<HashSet<String>>>,
    gates: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            executed: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashSet::new())),
            gates: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(AtomicUsize::new(0)),
            max_running: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Make every operation take at least `delay` before settling.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Script the named stack's operation to fail.
    pub fn fail_stack(&self, name: &str) {
        self.failures.lock().unwrap().insert(name.to_string());
    }

    /// Require an explicit [`release`](Self::release) before the named
    /// stack's operation completes.
    pub fn gate_stack(&self, name: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::new(Notify::new()));
    }

    /// Allow a gated stack to complete.
    pub fn release(&self, name: &str) {
        if let Some(notify) = self.gates.lock().unwrap().get(name) {
            notify.notify_one();
        }
    }

    /// Names of stacks whose operations started, in start order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Full (name, method) operation log.
    pub fn operations(&self) -> Vec<(String, Method)> {
        self.executed.lock().unwrap().clone()
    }

    /// Highest number of operations observed running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    fn run_op(
        &self,
        stack: Arc<StackDescriptor>,
        method: Method,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        let executed = Arc::clone(&self.executed);
        let failures = Arc::clone(&self.failures);
        let gates = Arc::clone(&self.gates);
        let running = Arc::clone(&self.running);
        let max_running = Arc::clone(&self.max_running);
        let delay = self.delay;

        Box::pin(async move {
            let name = stack.name.clone();

            {
                let mut guard = executed.lock().unwrap();
                guard.push((name.clone(), method));
            }

            let now_running = running.fetch_add(1, Ordering::SeqCst) + 1;
            max_running.fetch_max(now_running, Ordering::SeqCst);

            let gate = gates.lock().unwrap().get(&name).cloned();
            if let Some(notify) = gate {
                notify.notified().await;
            } else if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            running.fetch_sub(1, Ordering::SeqCst);

            if failures.lock().unwrap().contains(&name) {
                Err(anyhow::anyhow!("injected failure for stack '{name}'").into())
            } else {
                Ok(())
            }
        })
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisionerBackend for FakeBackend {
    fn deploy(
        &self,
        stack: Arc<StackDescriptor>,
        _ctx: OperationContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        self.run_op(stack, Method::Deploy)
    }

    fn destroy(
        &self,
        stack: Arc<StackDescriptor>,
        _ctx: OperationContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        self.run_op(stack, Method::Destroy)
    }
}
