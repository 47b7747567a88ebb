/*
Copyright 2020 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use thiserror::Error;
use tracing::debug;

pub const OPTION_PREFIX: &str = "stiletto.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationType {
    None,
    Warning,
    Error,
}

impl ValidationType {
    /// `None` when validation is turned off.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            ValidationType::None => None,
            ValidationType::Warning => Some(Severity::Warning),
            ValidationType::Error => Some(Severity::Error),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionError {
    #[error("Processor option -A{key} may only have the values {allowed} (case insensitive), found: {value}")]
    InvalidValue {
        key: String,
        allowed: String,
        value: String,
    },
    #[error(
        "Only one of the equivalent options ({}) should be used; prefer -A{preferred}",
        .keys.iter().map(|k| format!("-A{}", k)).collect::<Vec<_>>().join(", ")
    )]
    EquivalentOptions {
        keys: Vec<String>,
        preferred: String,
        conflicting: bool,
    },
}

impl OptionError {
    pub fn severity(&self) -> Severity {
        match self {
            OptionError::EquivalentOptions {
                conflicting: false, ..
            } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    pub full_binding_graph_validation: ValidationType,
    pub ignore_provision_key_wildcards: bool,
    pub validate_transitive_component_dependencies: bool,
    pub strict_multibinding_validation: bool,
    pub scope_cycle_validation: ValidationType,
    pub inter_component_scope_validation: ValidationType,
    pub explicit_binding_conflicts_with_inject: ValidationType,
    pub nullable_validation: ValidationType,
    pub module_has_different_scopes_validation: ValidationType,
    pub plugins_visit_full_binding_graphs: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            full_binding_graph_validation: ValidationType::None,
            ignore_provision_key_wildcards: true,
            validate_transitive_component_dependencies: true,
            strict_multibinding_validation: false,
            scope_cycle_validation: ValidationType::Error,
            inter_component_scope_validation: ValidationType::Error,
            explicit_binding_conflicts_with_inject: ValidationType::Error,
            nullable_validation: ValidationType::Error,
            module_has_different_scopes_validation: ValidationType::Error,
            plugins_visit_full_binding_graphs: false,
        }
    }
}

const VALIDATION_VALUES: [(&str, ValidationType); 3] = [
    ("NONE", ValidationType::None),
    ("WARNING", ValidationType::Warning),
    ("ERROR", ValidationType::Error),
];
const NULLABLE_VALUES: [(&str, ValidationType); 2] = [
    ("ERROR", ValidationType::Error),
    ("WARNING", ValidationType::Warning),
];
const FEATURE_VALUES: [(&str, bool); 2] = [("ENABLED", true), ("DISABLED", false)];

const FULL_BINDING_GRAPH_VALIDATION: &str = "fullBindingGraphValidation";
const MODULE_BINDING_VALIDATION: &str = "moduleBindingValidation";

struct OptionReader<'a> {
    raw: &'a HashMap<String, String>,
    errors: Vec<OptionError>,
}

impl OptionReader<'_> {
    fn lookup<T: Copy>(&mut self, name: &str, values: &[(&str, T)]) -> Option<T> {
        let key = format!("{}{}", OPTION_PREFIX, name);
        let value = self.raw.get(&key)?;
        let upper = value.trim().to_uppercase();
        match values.iter().find(|(name, _)| *name == upper) {
            Some((_, parsed)) => Some(*parsed),
            None => {
                self.errors.push(OptionError::InvalidValue {
                    key,
                    allowed: format!(
                        "[{}]",
                        values
                            .iter()
                            .map(|(name, _)| *name)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    value: value.clone(),
                });
                None
            }
        }
    }

    fn read<T: Copy>(&mut self, name: &str, values: &[(&str, T)], default: T) -> T {
        self.lookup(name, values).unwrap_or(default)
    }
}

impl CompilerOptions {
    /// Parses `stiletto.*` processor options. Problems are returned alongside
    /// the options; the default is used for every option that had one.
    pub fn parse(raw: &HashMap<String, String>) -> (CompilerOptions, Vec<OptionError>) {
        let defaults = CompilerOptions::default();
        let mut reader = OptionReader {
            raw,
            errors: Vec::new(),
        };

        let full = reader.lookup(FULL_BINDING_GRAPH_VALIDATION, &VALIDATION_VALUES);
        let module = reader.lookup(MODULE_BINDING_VALIDATION, &VALIDATION_VALUES);
        let full_binding_graph_validation = match (full, module) {
            (Some(full), Some(module)) => {
                let conflicting = full != module;
                reader.errors.push(OptionError::EquivalentOptions {
                    keys: vec![
                        format!("{}{}", OPTION_PREFIX, FULL_BINDING_GRAPH_VALIDATION),
                        format!("{}{}", OPTION_PREFIX, MODULE_BINDING_VALIDATION),
                    ],
                    preferred: format!("{}{}", OPTION_PREFIX, FULL_BINDING_GRAPH_VALIDATION),
                    conflicting,
                });
                if conflicting {
                    defaults.full_binding_graph_validation
                } else {
                    full
                }
            }
            (Some(value), None) | (None, Some(value)) => value,
            (None, None) => defaults.full_binding_graph_validation,
        };

        let options = CompilerOptions {
            full_binding_graph_validation,
            ignore_provision_key_wildcards: reader.read(
                "ignoreProvisionKeyWildcards",
                &FEATURE_VALUES,
                defaults.ignore_provision_key_wildcards,
            ),
            validate_transitive_component_dependencies: reader.read(
                "validateTransitiveComponentDependencies",
                &FEATURE_VALUES,
                defaults.validate_transitive_component_dependencies,
            ),
            strict_multibinding_validation: reader.read(
                "strictMultibindingValidation",
                &FEATURE_VALUES,
                defaults.strict_multibinding_validation,
            ),
            scope_cycle_validation: reader.read(
                "scopeCycleValidation",
                &VALIDATION_VALUES,
                defaults.scope_cycle_validation,
            ),
            inter_component_scope_validation: reader.read(
                "disableInterComponentScopeValidation",
                &VALIDATION_VALUES,
                defaults.inter_component_scope_validation,
            ),
            explicit_binding_conflicts_with_inject: reader.read(
                "explicitBindingConflictsWithInject",
                &VALIDATION_VALUES,
                defaults.explicit_binding_conflicts_with_inject,
            ),
            nullable_validation: reader.read(
                "nullableValidation",
                &NULLABLE_VALUES,
                defaults.nullable_validation,
            ),
            module_has_different_scopes_validation: reader.read(
                "moduleHasDifferentScopesValidation",
                &NULLABLE_VALUES,
                defaults.module_has_different_scopes_validation,
            ),
            plugins_visit_full_binding_graphs: reader.read(
                "pluginsVisitFullBindingGraphs",
                &FEATURE_VALUES,
                defaults.plugins_visit_full_binding_graphs,
            ),
        };
        debug!("compiler options: {:?}", options);
        (options, reader.errors)
    }

    pub fn full_binding_graph_validation_enabled(&self) -> bool {
        self.full_binding_graph_validation != ValidationType::None
    }
}
