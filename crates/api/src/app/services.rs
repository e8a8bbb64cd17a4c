//! Backend wiring shared by every handler.

use std::collections::BTreeSet;
use std::sync::Arc;

use hearth_infra::{Backend, FlagToggler};

pub struct AppServices {
    backend: Arc<dyn Backend>,
    flags: FlagToggler<Arc<dyn Backend>>,
    remote_functions: BTreeSet<String>,
}

impl AppServices {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            flags: FlagToggler::new(backend.clone()),
            backend,
            remote_functions: BTreeSet::new(),
        }
    }

    /// Names the `/rpc` and `/functions` routes may forward. None by default.
    pub fn with_remote_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remote_functions = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn remote_allowed(&self, name: &str) -> bool {
        self.remote_functions.contains(name)
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn flags(&self) -> &FlagToggler<Arc<dyn Backend>> {
        &self.flags
    }
}
