/// Data layer: core types and loading.
///
/// Architecture:
/// ```text
///  <core>_settings.txt   <core>_<n>.out   <core>_proxies.csv
///          │                    │                  │
///          ▼                    ▼                  ▼
///   ┌───────────────────────────────────────────────────┐
///   │  loader   parse files → DepthGrid, ensemble, table │
///   └───────────────────────────────────────────────────┘
///          │
///          ▼
///   ┌──────────────────┐      ┌────────────┐
///   │ AgeDepthEnsemble │      │ ProxyTable │   (model)
///   └──────────────────┘      └────────────┘
/// ```

pub mod loader;
pub mod model;
