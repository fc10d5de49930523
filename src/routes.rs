use std::fmt;

/// Views reachable through the navigation shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Videos,
    Download,
}

const TABLE: [(&str, Route); 3] = [
    ("", Route::Dashboard),
    ("videos", Route::Videos),
    ("download", Route::Download),
];

impl Route {
    /// Exact match against the route table. Query string and fragment are ignored.
    pub fn match_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = path.trim_matches('/');
        TABLE.iter().find(|(p, _)| *p == path).map(|(_, r)| *r)
    }

    /// Like [`match_path`](Self::match_path), but unmatched paths redirect to the dashboard.
    pub fn resolve(path: &str) -> Route {
        Self::match_path(path).unwrap_or_else(|| {
            tracing::debug!(path, "no route, redirecting to /");
            Route::Dashboard
        })
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Videos => "/videos",
            Route::Download => "/download",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.path()) }
}
