//! Debug-build registry of live machines, for introspection.
//!
//! Every machine constructed in a debug build is recorded under its name as
//! a weak reference; the registry never keeps a machine alive. In release
//! builds registration is a no-op and lookups find nothing.

use crate::engine::Fsm;

#[cfg(debug_assertions)]
mod live {
    use crate::engine::machine::Inner;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::{Arc, OnceLock, Weak};

    fn table() -> &'static Mutex<HashMap<String, Weak<Inner>>> {
        static LIVE: OnceLock<Mutex<HashMap<String, Weak<Inner>>>> = OnceLock::new();
        LIVE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    pub(crate) fn register(name: &str, inner: &Arc<Inner>) {
        let mut live = table().lock();
        live.retain(|_, weak| weak.strong_count() > 0);
        live.insert(name.to_string(), Arc::downgrade(inner));
    }

    pub(crate) fn lookup(name: &str) -> Option<Arc<Inner>> {
        table().lock().get(name).and_then(Weak::upgrade)
    }

    pub(crate) fn names() -> Vec<String> {
        let mut names: Vec<String> = table()
            .lock()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

pub(crate) fn register(fsm: &Fsm) {
    #[cfg(debug_assertions)]
    live::register(fsm.name(), fsm.inner());
    #[cfg(not(debug_assertions))]
    let _ = fsm;
}

/// Find a live machine by name. Later machines with the same name shadow
/// earlier ones.
pub fn lookup(name: &str) -> Option<Fsm> {
    #[cfg(debug_assertions)]
    {
        live::lookup(name).map(Fsm::from_inner)
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = name;
        None
    }
}

/// Names of all live registered machines, sorted.
pub fn names() -> Vec<String> {
    #[cfg(debug_assertions)]
    {
        live::names()
    }
    #[cfg(not(debug_assertions))]
    {
        Vec::new()
    }
}
