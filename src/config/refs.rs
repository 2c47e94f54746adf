// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resolution of `refs` into an ordered list of ETL models.
//!
//! Refs are followed depth first and flattened in post-order: every model a
//! ref pulls in is placed before the model that referenced it. A root model
//! with `refs: [a, b]` where `b` refers to `c` processes as `[a, c, b, root]`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::consts::{FILE_PREFIX, MODEL_EXTENSIONS, MODULE_DIR_PREFIX, MODULE_FILE_PREFIX};
use crate::config::loader::{load_model, Etl};
use crate::errors::ConfigError;
use crate::observability::messages::config::ModelLoaded;
use crate::observability::messages::StructuredLog;

/// Follows refs relative to a module root.
#[derive(Debug, Clone)]
pub struct ModelLoader {
    module_root: PathBuf,
}

impl ModelLoader {
    pub fn new(module_root: impl Into<PathBuf>) -> Self {
        Self {
            module_root: module_root.into(),
        }
    }

    /// Flatten `root` and everything it references into processing order.
    pub fn load(&self, root: Etl) -> Result<Vec<Etl>, ConfigError> {
        let mut stack = Vec::new();
        self.expand(root, &mut stack)
    }

    fn expand(&self, model: Etl, stack: &mut Vec<String>) -> Result<Vec<Etl>, ConfigError> {
        let mut models = Vec::new();
        for etl_ref in &model.refs {
            for path in self.ref_paths(etl_ref)? {
                models.extend(self.load_file(&path, stack)?);
            }
        }
        models.push(model);
        Ok(models)
    }

    fn load_file(&self, path: &Path, stack: &mut Vec<String>) -> Result<Vec<Etl>, ConfigError> {
        let key = fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string();
        if stack.contains(&key) {
            let mut cycle = stack.clone();
            cycle.push(key);
            return Err(ConfigError::CyclicRef(cycle));
        }

        let model = load_model(path)?;
        ModelLoaded {
            source: &model.source,
            datasources: model.datasources.len(),
            queries: model.queries.len(),
            templates: model.template_count(),
        }
        .log();

        stack.push(key);
        let result = self.expand(model, stack);
        stack.pop();
        result
    }

    /// Files a single ref stands for, in load order.
    pub fn ref_paths(&self, etl_ref: &str) -> Result<Vec<PathBuf>, ConfigError> {
        if let Some(module) = etl_ref.strip_prefix(MODULE_DIR_PREFIX) {
            model_files(&self.module_root.join(module_path(module)))
        } else if let Some(file) = etl_ref.strip_prefix(MODULE_FILE_PREFIX) {
            Ok(vec![self.module_root.join(file)])
        } else if let Some(target) = etl_ref.strip_prefix(FILE_PREFIX) {
            let target = PathBuf::from(target);
            if target.is_file() {
                Ok(vec![target])
            } else {
                model_files(&target)
            }
        } else {
            Err(ConfigError::UnsupportedRef(etl_ref.to_string()))
        }
    }
}

/// Dotted module names map onto nested directories.
fn module_path(module: &str) -> PathBuf {
    if module.contains('/') {
        PathBuf::from(module)
    } else {
        module.split('.').collect()
    }
}

fn model_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let is_model = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| MODEL_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if is_model && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, refs: &[String]) -> PathBuf {
        let path = dir.join(name);
        let refs = refs
            .iter()
            .map(|r| format!("\"{}\"", r))
            .collect::<Vec<_>>()
            .join(", ");
        fs::write(&path, format!("etl:\n  refs: [{}]\n", refs)).unwrap();
        path
    }

    fn file_ref(path: &Path) -> String {
        format!("file://{}", path.display())
    }

    fn sources(models: &[Etl]) -> Vec<String> {
        models
            .iter()
            .map(|m| {
                Path::new(&m.source)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| m.source.clone())
            })
            .collect()
    }

    #[test]
    fn test_refs_load_depth_first_post_order() {
        let dir = TempDir::new().unwrap();
        let c = write(dir.path(), "c.yaml", &[]);
        let a = write(dir.path(), "a.yaml", &[]);
        let b = write(dir.path(), "b.yaml", &[file_ref(&c)]);

        let root = Etl {
            refs: vec![file_ref(&a), file_ref(&b)],
            source: "conf.yaml".to_string(),
            ..Etl::default()
        };
        let models = ModelLoader::new(dir.path()).load(root).unwrap();

        assert_eq!(sources(&models), vec!["a.yaml", "c.yaml", "b.yaml", "conf.yaml"]);
    }

    #[test]
    fn test_shared_ref_loads_once_per_path() {
        let dir = TempDir::new().unwrap();
        let c = write(dir.path(), "c.yaml", &[]);
        let a = write(dir.path(), "a.yaml", &[file_ref(&c)]);
        let b = write(dir.path(), "b.yaml", &[file_ref(&c)]);

        let root = Etl {
            refs: vec![file_ref(&a), file_ref(&b)],
            source: "conf.yaml".to_string(),
            ..Etl::default()
        };
        let models = ModelLoader::new(dir.path()).load(root).unwrap();

        assert_eq!(
            sources(&models),
            vec!["c.yaml", "a.yaml", "c.yaml", "b.yaml", "conf.yaml"]
        );
    }

    #[test]
    fn test_directory_refs_are_sorted() {
        let dir = TempDir::new().unwrap();
        let templates = dir.path().join("templates").join("nutanix");
        fs::create_dir_all(&templates).unwrap();
        write(&templates, "20-vms.yaml", &[]);
        write(&templates, "10-hosts.yml", &[]);
        fs::write(templates.join("README.md"), "not a model").unwrap();

        let loader = ModelLoader::new(dir.path());
        let module_dir = loader.ref_paths("module_dir://templates.nutanix").unwrap();
        let names: Vec<_> = module_dir
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["10-hosts.yml", "20-vms.yaml"]);

        let file_dir = loader.ref_paths(&file_ref(&templates)).unwrap();
        assert_eq!(file_dir, module_dir);

        let single = loader.ref_paths("module_file://templates/nutanix/20-vms.yaml").unwrap();
        assert_eq!(single, vec![dir.path().join("templates/nutanix/20-vms.yaml")]);
    }

    #[test]
    fn test_unsupported_and_cyclic_refs() {
        let dir = TempDir::new().unwrap();
        let loader = ModelLoader::new(dir.path());
        assert!(matches!(
            loader.ref_paths("http://example.com/etl.yaml"),
            Err(ConfigError::UnsupportedRef(_))
        ));

        let a = dir.path().join("a.yaml");
        let b = write(dir.path(), "b.yaml", &[file_ref(&a)]);
        write(dir.path(), "a.yaml", &[file_ref(&b)]);

        let root = Etl {
            refs: vec![file_ref(&a)],
            ..Etl::default()
        };
        let err = loader.load(root).unwrap_err();
        match err {
            ConfigError::CyclicRef(chain) => assert_eq!(chain.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }
}
