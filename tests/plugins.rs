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

mod common;

use common::{init_logging, options};
use serde_json::json;
use stiletto::{BindingGraph, GraphReporter, Manifest, Processor, Severity, ValidationContext, ValidationPlugin};

/// Flags every binding of a type named `*Impl` that is exposed directly.
struct NoImplsPlugin;

impl ValidationPlugin for NoImplsPlugin {
    fn plugin_name(&self) -> &str {
        "Test/NoImpls"
    }

    fn visit_graph(&self, _context: &ValidationContext, graph: &BindingGraph, reporter: &mut GraphReporter) {
        for (_, binding) in graph.binding_nodes() {
            if binding.key.type_.path.ends_with("Impl") {
                reporter.report_component(Severity::Warning, &format!("{} is bound directly", binding.key));
            }
        }
    }
}

fn manifest() -> Manifest {
    serde_json::from_value(json!({
        "injectables": [{"name": "test.FooImpl"}],
        "modules": [{"name": "test.M", "is_abstract": true, "declarations": [
            {"kind": "Binds", "method": "bindFoo", "return_type": "test.Foo", "is_abstract": true,
             "parameters": [{"name": "impl", "type": "test.FooImpl"}]}
        ]}],
        "components": [{"name": "test.C", "modules": ["test.M"], "entry_points": [
            {"method": "foo", "return_type": "test.Foo"}
        ]}]
    }))
    .unwrap()
}

#[test]
pub fn external_plugin_sees_regular_graph() {
    init_logging();
    let processor = Processor::new().with_plugin(Box::new(NoImplsPlugin));
    let result = processor.process(&manifest(), &options(&[]));
    assert!(!result.has_errors(), "{:?}", result.diagnostics);
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0]
        .formatted_message()
        .starts_with("[Test/NoImpls] FooImpl is bound directly"));
    assert_eq!(result.graphs.len(), 1);
}

#[test]
pub fn external_plugin_visits_full_graphs_when_asked() {
    init_logging();
    let processor = Processor::new().with_plugin(Box::new(NoImplsPlugin));
    let result = processor.process(&manifest(), &options(&[("pluginsVisitFullBindingGraphs", "ENABLED")]));
    let elements: Vec<Option<&str>> = result
        .diagnostics
        .iter()
        .map(|d| d.element.as_deref())
        .collect();
    assert!(elements.contains(&Some("test.M")), "{:?}", result.diagnostics);
    assert!(elements.contains(&Some("test.C")), "{:?}", result.diagnostics);
}

#[test]
pub fn plugin_errors_drop_the_graph() {
    struct RejectAll;
    impl ValidationPlugin for RejectAll {
        fn plugin_name(&self) -> &str {
            "Test/RejectAll"
        }

        fn visit_graph(&self, _context: &ValidationContext, graph: &BindingGraph, reporter: &mut GraphReporter) {
            reporter.report_component(Severity::Error, &format!("{} is rejected", graph.root().descriptor.name));
        }
    }

    init_logging();
    let result = Processor::new()
        .with_plugin(Box::new(RejectAll))
        .process(&manifest(), &options(&[]));
    assert_eq!(result.error_count(), 1);
    assert!(result.graphs.is_empty());
}
