/// Ref prefix for every YAML file in a directory under the module root.
pub const MODULE_DIR_PREFIX: &str = "module_dir://";
/// Ref prefix for a single file under the module root.
pub const MODULE_FILE_PREFIX: &str = "module_file://";
/// Ref prefix for a filesystem file, or every YAML file in a filesystem directory.
pub const FILE_PREFIX: &str = "file://";
/// Base directory for `module_dir://` and `module_file://` refs when an instance sets none.
pub const DEFAULT_MODULE_ROOT: &str = "resources";
/// Source name of the model embedded in the instance configuration.
pub const ROOT_MODEL_SOURCE: &str = "conf.yaml";
/// File extensions picked up when a ref names a directory.
pub const MODEL_EXTENSIONS: &[&str] = &["yaml", "yml"];
