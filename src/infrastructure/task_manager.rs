use tokio::task::{AbortHandle, JoinHandle};

/// Tracks background tasks so they can be cancelled together.
///
/// Finished tasks are pruned whenever a new one is tracked.
pub struct TaskManager {
    handles: Vec<AbortHandle>,
}

impl TaskManager {
    /// Create a new empty task manager
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Spawn a task and track it
    pub fn spawn<F>(&mut self, future: F) -> JoinHandle<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.track(handle.abort_handle());
        handle
    }

    fn track(&mut self, handle: AbortHandle) {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle);
    }

    /// Abort all tasks without waiting
    pub fn abort_all(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
        self.handles.clear();
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_abort_all_cancels_running_tasks() {
        let mut tasks = TaskManager::new();
        let handle = tasks.spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        assert_eq!(tasks.handles.len(), 1);

        tasks.abort_all();
        let result = handle.await;
        assert!(result.unwrap_err().is_cancelled());
        assert!(tasks.handles.is_empty());
    }

    #[tokio::test]
    async fn test_finished_tasks_are_pruned() {
        let mut tasks = TaskManager::new();
        let first = tasks.spawn(async {});
        first.await.unwrap();

        tasks.spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        assert_eq!(tasks.handles.len(), 1);
        tasks.abort_all();
    }
}
