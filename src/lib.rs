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

//! Binding graph resolution and validation for compile time dependency
//! injection.
//!
//! A front-end describes the declarations it found (components, modules,
//! `@Inject` types, assisted factories) as a [Manifest]. Stiletto resolves
//! the binding graph of every root component, validates it, and hands back
//! either the resolved graphs or the [Diagnostic]s explaining what is wrong.
//!
//! ```
//! use std::collections::HashMap;
//!
//! let result = stiletto::process_json(
//!     r#"{
//!         "injectables": [{"name": "test.Foo"}],
//!         "components": [{"name": "test.C", "entry_points": [
//!             {"method": "foo", "return_type": "test.Foo"}
//!         ]}]
//!     }"#,
//!     &HashMap::new(),
//! )
//! .unwrap();
//! assert!(!result.has_errors());
//! assert_eq!(result.graphs[0].root, "test.C");
//! ```
//!
//! # Processor options
//!
//! Options use the `stiletto.` prefix, e.g. `stiletto.fullBindingGraphValidation=ERROR`.
//! [parse_processor_args] turns `-A` style arguments into the map [process]
//! expects.
//!
//! # Plugins
//!
//! Additional checks implement [ValidationPlugin] and are installed with
//! [Processor::with_plugin]. They see the same graphs as the built-in checks.

mod manifest_loader;

use anyhow::{Context, Result};
use std::collections::HashMap;

pub use manifest_loader::{load_manifest, parse_processor_args};
pub use stiletto_common::key::{Key, RequestKind};
pub use stiletto_common::manifest::Manifest;
pub use stiletto_common::options::{CompilerOptions, Severity};
pub use stiletto_common::type_data::TypeData;
pub use stiletto_processor::diagnostics::reporter::GraphReporter;
pub use stiletto_processor::error::Diagnostic;
pub use stiletto_processor::graph::{BindingGraph, ResolvedGraph};
pub use stiletto_processor::validation::{ValidationContext, ValidationPlugin};
pub use stiletto_processor::{process, ProcessingResult, Processor};

#[doc(hidden)]
pub use stiletto_common as common;
#[doc(hidden)]
pub use stiletto_processor as processor;

/// Parses `json` as a [Manifest] and processes it with the built-in checks.
pub fn process_json(json: &str, options: &HashMap<String, String>) -> Result<ProcessingResult> {
    let manifest = Manifest::from_json(json).context("cannot parse stiletto manifest")?;
    Ok(process(&manifest, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_json_rejects_malformed_manifest() {
        let error = process_json("{\"components\": 1}", &HashMap::new()).unwrap_err();
        assert_eq!(error.to_string(), "cannot parse stiletto manifest");
    }

    #[test]
    fn process_json_reports_missing_binding() {
        let result = process_json(
            r#"{"components": [{"name": "test.C", "entry_points": [
                {"method": "foo", "return_type": "test.Foo"}
            ]}]}"#,
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(result.error_count(), 1);
        assert!(result.diagnostics[0]
            .formatted_message()
            .starts_with("[Stiletto/MissingBinding] Foo cannot be provided"));
    }
}
