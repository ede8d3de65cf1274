use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::{ItemId, SaveContext};

/// Identifier handed out for a registered save hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

pub type SaveHook = Arc<dyn Fn(ItemId, Arc<SaveContext>) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Default)]
struct Registered {
    hooks: Mutex<Vec<(HookId, SaveHook)>>,
    next_id: AtomicU64,
}

/// Save-event subscriptions, dispatched in registration order. Clones share
/// the same registrations.
#[derive(Clone, Default)]
pub struct HookRegistry {
    inner: Arc<Registered>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, hook: F) -> HookId
    where
        F: Fn(ItemId, Arc<SaveContext>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let id = HookId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.hooks.lock().unwrap().push((id, Arc::new(hook)));
        id
    }

    pub fn deregister(&self, id: HookId) -> Option<SaveHook> {
        let mut hooks = self.inner.hooks.lock().unwrap();
        let index = hooks.iter().position(|(hook_id, _)| *hook_id == id)?;
        Some(hooks.remove(index).1)
    }

    pub fn is_registered(&self, id: HookId) -> bool {
        self.inner
            .hooks
            .lock()
            .unwrap()
            .iter()
            .any(|(hook_id, _)| *hook_id == id)
    }

    /// Temporarily removes a hook; it is put back when the returned guard
    /// drops, on every exit path. Suspending an unknown id is a no-op.
    pub fn suspend(&self, id: HookId) -> HookSuspension {
        HookSuspension {
            entry: self.deregister(id).map(|hook| (id, hook)),
            registry: self.clone(),
        }
    }

    /// Runs every registered hook for one save event. The handler list is
    /// snapshotted up front, so hooks may touch the registry while running.
    pub async fn dispatch(&self, id: ItemId, ctx: Arc<SaveContext>) {
        let hooks: Vec<SaveHook> = {
            let hooks = self.inner.hooks.lock().unwrap();
            hooks.iter().map(|(_, hook)| Arc::clone(hook)).collect()
        };
        for hook in hooks {
            hook(id, Arc::clone(&ctx)).await;
        }
    }
}

/// Scoped removal of one save hook. Restores the registration on drop.
pub struct HookSuspension {
    registry: HookRegistry,
    entry: Option<(HookId, SaveHook)>,
}

impl Drop for HookSuspension {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.registry.inner.hooks.lock().unwrap().push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;

    fn counting_hook(
        counter: Arc<AtomicUsize>,
    ) -> impl Fn(ItemId, Arc<SaveContext>) -> BoxFuture<'static, ()> + Send + Sync + 'static {
        move |_, _| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn dispatch_runs_registered_hooks() {
        let registry = HookRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = registry.register(counting_hook(Arc::clone(&counter)));

        registry
            .dispatch(ItemId(1), Arc::new(SaveContext::internal()))
            .await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(registry.is_registered(id));
    }

    #[tokio::test]
    async fn suspended_hook_is_skipped_then_restored() {
        let registry = HookRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = registry.register(counting_hook(Arc::clone(&counter)));

        {
            let _muted = registry.suspend(id);
            assert!(!registry.is_registered(id));
            registry
                .dispatch(ItemId(1), Arc::new(SaveContext::internal()))
                .await;
            assert_eq!(counter.load(Ordering::SeqCst), 0);
        }

        assert!(registry.is_registered(id));
        registry
            .dispatch(ItemId(1), Arc::new(SaveContext::internal()))
            .await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn suspension_restores_on_the_error_path() {
        fn failing_update(registry: &HookRegistry, id: HookId) -> Result<(), ()> {
            let _muted = registry.suspend(id);
            Err(())
        }

        let registry = HookRegistry::new();
        let id = registry.register(counting_hook(Arc::new(AtomicUsize::new(0))));

        assert!(failing_update(&registry, id).is_err());
        assert!(registry.is_registered(id));
    }

    #[tokio::test]
    async fn suspending_an_unknown_hook_is_a_no_op() {
        let registry = HookRegistry::new();
        let id = registry.register(counting_hook(Arc::new(AtomicUsize::new(0))));
        registry.deregister(id);

        let _muted = registry.suspend(id);
        assert!(!registry.is_registered(id));
    }

    #[tokio::test]
    async fn other_hooks_still_run_while_one_is_suspended() {
        let registry = HookRegistry::new();
        let muted_counter = Arc::new(AtomicUsize::new(0));
        let other_counter = Arc::new(AtomicUsize::new(0));
        let muted = registry.register(counting_hook(Arc::clone(&muted_counter)));
        registry.register(counting_hook(Arc::clone(&other_counter)));

        let _muted = registry.suspend(muted);
        registry
            .dispatch(ItemId(1), Arc::new(SaveContext::internal()))
            .await;

        assert_eq!(muted_counter.load(Ordering::SeqCst), 0);
        assert_eq!(other_counter.load(Ordering::SeqCst), 1);
    }
}
