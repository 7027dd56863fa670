use std::cell::Cell;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::vector::{Factory, Renderer};

use super::Drawable;

/// One registered drawable.
///
/// `live` is held for the duration of a draw. Removal flips it under the same
/// lock, so once removal returns the drawable is never invoked again.
struct Entry {
    key: usize,
    drawable: Weak<dyn Drawable>,
    live: ReentrantMutex<Cell<bool>>,
}

#[inline]
fn key_of(drawable: &Arc<dyn Drawable>) -> usize {
    Arc::as_ptr(drawable) as *const () as usize
}

/// Active factory and live drawables of one bridge.
///
/// Factory access is a read lock on every render call and a write lock only at
/// backend initialize/teardown. The drawable list mutex covers list mutation
/// only; it is never held while a drawable draws.
#[derive(Default)]
pub struct RenderRegistry {
    factory: RwLock<Option<Weak<dyn Factory>>>,
    drawables: Mutex<Vec<Arc<Entry>>>,
}

impl RenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a factory on `reg`; drawing stays enabled while it lives.
    #[cfg(test)]
    #[allow(dead_code)]
    fn activate(reg: &RenderRegistry) -> Arc<dyn Factory> {
        let f: Arc<dyn Factory> = Arc::new(tests::NoopFactory);
        reg.set_factory(&f);
        f
    }

    // ── factory ───────────────────────────────────────────────────────────

    /// Publishes the factory of a freshly initialized backend.
    pub fn set_factory(&self, factory: &Arc<dyn Factory>) {
        let mut slot = self.factory.write();
        debug_assert!(
            slot.as_ref().and_then(Weak::upgrade).is_none(),
            "a factory is already active; tear the previous backend down first"
        );
        *slot = Some(Arc::downgrade(factory));
    }

    pub fn clear_factory(&self) {
        *self.factory.write() = None;
    }

    /// The active factory, if a backend is initialized and its context alive.
    pub fn factory(&self) -> Option<Arc<dyn Factory>> {
        self.factory.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn has_factory(&self) -> bool {
        self.factory().is_some()
    }

    // ── drawables ─────────────────────────────────────────────────────────

    /// Adds a drawable at the end of the draw order. Duplicates are ignored.
    /// Returns true when the drawable was added.
    pub fn add_drawable(&self, drawable: &Arc<dyn Drawable>) -> bool {
        let key = key_of(drawable);
        let mut list = self.drawables.lock();
        list.retain(|e| e.drawable.strong_count() > 0);
        if list.iter().any(|e| e.key == key) {
            return false;
        }
        list.push(Arc::new(Entry {
            key,
            drawable: Arc::downgrade(drawable),
            live: ReentrantMutex::new(Cell::new(true)),
        }));
        true
    }

    /// Removes a drawable. Blocks while that drawable is being drawn on another
    /// thread; afterwards it is never drawn again. Returns true when it was registered.
    pub fn remove_drawable(&self, drawable: &Arc<dyn Drawable>) -> bool {
        self.remove_key(key_of(drawable))
    }

    fn remove_key(&self, key: usize) -> bool {
        let removed = {
            let mut list = self.drawables.lock();
            list.iter().position(|e| e.key == key).map(|i| list.remove(i))
        };
        match removed {
            Some(entry) => {
                entry.live.lock().set(false);
                true
            }
            None => false,
        }
    }

    /// Adds a drawable for the lifetime of the returned guard.
    pub fn register(self: &Arc<Self>, drawable: &Arc<dyn Drawable>) -> Registration {
        self.add_drawable(drawable);
        Registration {
            registry: Arc::downgrade(self),
            key: key_of(drawable),
            _drawable: Arc::downgrade(drawable),
        }
    }

    /// Number of registered drawables that are still alive.
    pub fn len(&self) -> usize {
        self.drawables
            .lock()
            .iter()
            .filter(|e| e.drawable.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draws every registered drawable in insertion order. Does nothing while
    /// no factory is active.
    ///
    /// Works on a snapshot of the list, so drawables may be added or removed
    /// from any thread (including from inside a draw) while this runs.
    pub fn draw_all(&self, renderer: &mut dyn Renderer) {
        if !self.has_factory() {
            return;
        }
        let snapshot: Vec<Arc<Entry>> = self.drawables.lock().clone();
        for entry in snapshot {
            // Upgraded before locking so a final drop happens after unlock.
            let Some(drawable) = entry.drawable.upgrade() else {
                continue;
            };
            let live = entry.live.lock();
            if live.get() {
                drawable.draw(renderer);
            }
        }
    }
}

impl Drawable for RenderRegistry {
    fn draw(&self, renderer: &mut dyn Renderer) {
        self.draw_all(renderer);
    }
}

/// Keeps a drawable registered until dropped.
#[must_use = "dropping the registration removes the drawable immediately"]
pub struct Registration {
    registry: Weak<RenderRegistry>,
    key: usize,
    // Pins the allocation so `key` cannot be reused by another drawable.
    _drawable: Weak<dyn Drawable>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_key(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::coords::Mat2D;
    use crate::paint::Paint;
    use crate::registry::DrawFn;
    use crate::vector::{Path, RenderImage};

    struct Sink;

    impl Renderer for Sink {
        fn save(&mut self) {}
        fn restore(&mut self) {}
        fn transform(&mut self, _: &Mat2D) {}
        fn draw_path(&mut self, _: &Path, _: &Paint) {}
        fn clip_path(&mut self, _: &Path) {}
        fn draw_image(&mut self, _: &dyn RenderImage, _: f32) {}
    }

    struct Counting {
        id: usize,
        log: Arc<Mutex<Vec<usize>>>,
    }

    impl Drawable for Counting {
        fn draw(&self, _: &mut dyn Renderer) {
            self.log.lock().push(self.id);
        }
    }

    fn counting(id: usize, log: &Arc<Mutex<Vec<usize>>>) -> Arc<dyn Drawable> {
        Arc::new(Counting { id, log: log.clone() })
    }

    pub(super) struct NoopFactory;

    impl Factory for NoopFactory {
        fn decode_image(&self, _: &[u8]) -> Option<Arc<dyn RenderImage>> {
            None
        }
    }

    /// Publishes a factory on `reg`; drawing stays enabled while it lives.
    fn activate(reg: &RenderRegistry) -> Arc<dyn Factory> {
        let f: Arc<dyn Factory> = Arc::new(NoopFactory);
        reg.set_factory(&f);
        f
    }

    // ── factory ───────────────────────────────────────────────────────────

    #[test]
    fn factory_is_empty_until_set() {
        let reg = RenderRegistry::new();
        assert!(!reg.has_factory());
        let f: Arc<dyn Factory> = Arc::new(NoopFactory);
        reg.set_factory(&f);
        assert!(reg.has_factory());
        reg.clear_factory();
        assert!(reg.factory().is_none());
    }

    #[test]
    fn factory_expires_with_its_context() {
        let reg = RenderRegistry::new();
        let f: Arc<dyn Factory> = Arc::new(NoopFactory);
        reg.set_factory(&f);
        drop(f);
        assert!(reg.factory().is_none());
    }

    // ── draw order ────────────────────────────────────────────────────────

    #[test]
    fn draws_in_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = RenderRegistry::new();
        let _factory = activate(&reg);
        let a = counting(1, &log);
        let b = counting(2, &log);
        let c = counting(3, &log);
        reg.add_drawable(&a);
        reg.add_drawable(&b);
        reg.add_drawable(&c);
        reg.remove_drawable(&b);
        reg.draw_all(&mut Sink);
        assert_eq!(*log.lock(), vec![1, 3]);
    }

    #[test]
    fn duplicate_add_is_ignored() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = RenderRegistry::new();
        let _factory = activate(&reg);
        let a = counting(7, &log);
        assert!(reg.add_drawable(&a));
        assert!(!reg.add_drawable(&a));
        reg.draw_all(&mut Sink);
        assert_eq!(*log.lock(), vec![7]);
    }

    #[test]
    fn registry_does_not_keep_drawables_alive() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = RenderRegistry::new();
        let _factory = activate(&reg);
        let a = counting(1, &log);
        reg.add_drawable(&a);
        assert_eq!(Arc::strong_count(&a), 1);
        drop(a);
        assert!(reg.is_empty());
        reg.draw_all(&mut Sink);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn registration_guard_deregisters_on_drop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = Arc::new(RenderRegistry::new());
        let a = counting(1, &log);
        let guard = reg.register(&a);
        assert_eq!(reg.len(), 1);
        drop(guard);
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn drawable_may_remove_itself_while_drawing() {
        let reg = Arc::new(RenderRegistry::new());
        let _factory = activate(&reg);
        let hits = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Arc<dyn Drawable>>>> = Arc::new(Mutex::new(None));

        let (r, h, s) = (reg.clone(), hits.clone(), slot.clone());
        let d: Arc<dyn Drawable> = Arc::new(DrawFn(move |_: &mut dyn Renderer| {
            h.fetch_add(1, Ordering::SeqCst);
            if let Some(me) = s.lock().take() {
                r.remove_drawable(&me);
            }
        }));
        *slot.lock() = Some(d.clone());
        reg.add_drawable(&d);

        reg.draw_all(&mut Sink);
        reg.draw_all(&mut Sink);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn draw_all_without_drawables_is_noop() {
        let reg = RenderRegistry::new();
        let _factory = activate(&reg);
        reg.draw_all(&mut Sink);
    }

    #[test]
    fn draw_all_without_factory_draws_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = RenderRegistry::new();
        let a = counting(1, &log);
        reg.add_drawable(&a);
        reg.draw_all(&mut Sink);
        assert!(log.lock().is_empty());

        let factory = activate(&reg);
        reg.draw_all(&mut Sink);
        assert_eq!(*log.lock(), vec![1]);

        // A factory whose context is gone disables drawing again.
        drop(factory);
        reg.draw_all(&mut Sink);
        assert_eq!(*log.lock(), vec![1]);
    }

    // ── concurrency ───────────────────────────────────────────────────────

    struct Tracked {
        removed: AtomicBool,
        late_draws: Arc<AtomicUsize>,
    }

    impl Drawable for Tracked {
        fn draw(&self, _: &mut dyn Renderer) {
            if self.removed.load(Ordering::SeqCst) {
                self.late_draws.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn concurrent_churn_never_draws_after_removal() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 250;

        let reg = Arc::new(RenderRegistry::new());
        let _factory = activate(&reg);
        let late = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let drawer = {
            let (reg, stop) = (reg.clone(), stop.clone());
            thread::spawn(move || {
                let mut passes = 0usize;
                loop {
                    reg.draw_all(&mut Sink);
                    passes += 1;
                    if stop.load(Ordering::SeqCst) {
                        break passes;
                    }
                }
            })
        };

        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let (reg, late) = (reg.clone(), late.clone());
                thread::spawn(move || {
                    for _ in 0..PER_THREAD {
                        let t = Arc::new(Tracked { removed: AtomicBool::new(false), late_draws: late.clone() });
                        let d: Arc<dyn Drawable> = t.clone();
                        reg.add_drawable(&d);
                        thread::yield_now();
                        assert!(reg.remove_drawable(&d));
                        t.removed.store(true, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for w in workers {
            w.join().unwrap();
        }
        stop.store(true, Ordering::SeqCst);
        let passes = drawer.join().unwrap();

        assert!(passes > 0);
        assert_eq!(late.load(Ordering::SeqCst), 0);
        assert!(reg.is_empty());
    }
}
