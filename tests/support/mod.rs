use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use stalecfg_rs::{ChunkVersion, RoutingRefresher};

#[derive(Debug, thiserror::Error)]
#[error("config server unavailable")]
pub struct Unavailable;

/// Router-side routing cache backed by an in-memory config server.
///
/// The cache is shared so an operation under retry observes refreshes.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct FakeRouter {
    pub authority: HashMap<String, ChunkVersion>,
    pub cache: Rc<RefCell<HashMap<String, ChunkVersion>>>,
    pub calls: Vec<String>,
    pub fail_refresh: bool,
}

#[allow(dead_code)]
impl FakeRouter {
    pub fn with_namespace(ns: &str, cached: ChunkVersion, authority: ChunkVersion) -> Self {
        let mut router = Self::default();
        router.cache.borrow_mut().insert(ns.to_string(), cached);
        router.authority.insert(ns.to_string(), authority);
        router
    }

    pub fn cached(&self, ns: &str) -> ChunkVersion {
        lookup(&self.cache, ns)
    }

    pub fn cache_handle(&self) -> Rc<RefCell<HashMap<String, ChunkVersion>>> {
        Rc::clone(&self.cache)
    }

    fn fetch(&self, ns: &str) -> ChunkVersion {
        self.authority
            .get(ns)
            .copied()
            .unwrap_or(ChunkVersion::UNSET)
    }
}

impl RoutingRefresher for FakeRouter {
    type Error = Unavailable;

    fn resync_connection(&mut self, ns: &str) -> Result<(), Self::Error> {
        self.calls.push(format!("resync:{}", ns));
        Ok(())
    }

    fn refresh_namespace(&mut self, ns: &str, full: bool) -> Result<(), Self::Error> {
        self.calls
            .push(format!("{}:{}", if full { "reload" } else { "refresh" }, ns));
        if self.fail_refresh {
            return Err(Unavailable);
        }
        let fresh = self.fetch(ns);
        self.cache.borrow_mut().insert(ns.to_string(), fresh);
        Ok(())
    }

    fn reload_all(&mut self) -> Result<(), Self::Error> {
        self.calls.push("reload_all".to_string());
        if self.fail_refresh {
            return Err(Unavailable);
        }
        *self.cache.borrow_mut() = self.authority.clone();
        Ok(())
    }
}

#[allow(dead_code)]
pub fn lookup(cache: &RefCell<HashMap<String, ChunkVersion>>, ns: &str) -> ChunkVersion {
    cache.borrow().get(ns).copied().unwrap_or(ChunkVersion::UNSET)
}
