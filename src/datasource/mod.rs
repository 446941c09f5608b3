//! Datasource plugins
//!
//! ```text
//! datasource/
//! ├── plugin    # DatasourcePlugin trait, DatasourceError
//! ├── registry  # PluginRegistry (alias -> plugin)
//! ├── table     # ModelTable / ModelResolver, ConfiguredTable
//! └── model     # ModelPlugin, the `model` alias
//! ```

pub mod model;
pub mod plugin;
pub mod registry;
pub mod table;

pub use model::ModelPlugin;
pub use plugin::{DatasourceError, DatasourcePlugin, DatasourceResult, ErrorKind};
pub use registry::PluginRegistry;
pub use table::{ConfiguredTable, ModelRegistry, ModelResolver, ModelTable};
