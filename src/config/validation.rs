// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Validation of merged ETL models.
//!
//! Template bodies are checked when a document is parsed. What remains needs
//! every model at once: each query's `template_refs` must name a template
//! defined somewhere in the merged set.
//!
//! All problems are collected before reporting so a broken configuration
//! shows every dangling reference in one run.
//!
//! # Example
//! ```rust
//! use topology_etl::config::{validate_models, Etl, QuerySpec, TemplateLookup};
//! use topology_etl::errors::ValidationError;
//!
//! let etl = Etl {
//!     queries: vec![QuerySpec {
//!         name: "vms".to_string(),
//!         query: "[]".to_string(),
//!         processor: None,
//!         template_refs: vec!["vm".to_string()],
//!     }],
//!     ..Etl::default()
//! };
//! let models = vec![etl];
//! let lookup = TemplateLookup::from_models(&models);
//!
//! let errors = validate_models(&models, &lookup).unwrap_err();
//! assert!(matches!(
//!     &errors[0],
//!     ValidationError::UnresolvedTemplateRef { template, .. } if template == "vm"
//! ));
//! ```

use crate::config::loader::Etl;
use crate::config::template_lookup::TemplateLookup;
use crate::errors::ValidationError;

/// Check every query's template refs against the merged lookup.
pub fn validate_models(models: &[Etl], lookup: &TemplateLookup) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for model in models {
        for query in &model.queries {
            for template in &query.template_refs {
                if !lookup.contains(template) {
                    errors.push(ValidationError::UnresolvedTemplateRef {
                        query: query.name.clone(),
                        template: template.clone(),
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::EtlDocument;

    fn parse(yaml: &str) -> Etl {
        let document: EtlDocument = serde_yaml::from_str(yaml).unwrap();
        document.etl.unwrap()
    }

    #[test]
    fn test_refs_resolve_across_models() {
        let templates = parse("etl:\n  template:\n    metrics:\n      - name: cpu\n        code: \"x\"\n");
        let queries = parse(
            "etl:\n  queries:\n    - name: vms\n      query: \"[]\"\n      template_refs: [cpu]\n",
        );
        let models = vec![templates, queries];
        let lookup = TemplateLookup::from_models(&models);

        assert!(validate_models(&models, &lookup).is_ok());
    }

    #[test]
    fn test_all_unresolved_refs_reported() {
        let models = vec![parse(
            "etl:\n  queries:\n    - name: vms\n      query: \"[]\"\n      template_refs: [vm, vm_cpu]\n    - name: hosts\n      query: \"[]\"\n      template_refs: [host]\n",
        )];
        let lookup = TemplateLookup::from_models(&models);

        let errors = validate_models(&models, &lookup).unwrap_err();
        let missing: Vec<_> = errors
            .iter()
            .map(|e| match e {
                ValidationError::UnresolvedTemplateRef { query, template } => {
                    format!("{}:{}", query, template)
                }
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(missing, vec!["vms:vm", "vms:vm_cpu", "hosts:host"]);
    }
}
