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

use crate::diagnostics::reporter::GraphReporter;
use crate::graph::BindingGraph;
use crate::validation::{builtin_plugin, ValidationContext};
use stiletto_common::key::RequestKind;

/// A `@Nullable` binding injected directly into a request that is not
/// `@Nullable`.
pub struct NullableBindingValidator;
builtin_plugin!(NullableBindingValidator, "Stiletto/Nullable");

impl NullableBindingValidator {
    fn visit(&self, context: &ValidationContext, graph: &BindingGraph, reporter: &mut GraphReporter) {
        let severity = match context.env.options.nullable_validation.severity() {
            Some(severity) => severity,
            None => return,
        };
        for (index, binding) in graph.binding_nodes() {
            if !binding.nullable {
                continue;
            }
            let provided_by = binding
                .declaration
                .as_ref()
                .map(|d| d.element.clone())
                .unwrap_or_else(|| binding.key.to_string());
            for edge in graph.requests_of(index) {
                if edge.request.nullable || edge.request.kind != RequestKind::Instance {
                    continue;
                }
                let message = format!(
                    "{} is not nullable, but is being provided by {}",
                    binding.key, provided_by
                );
                reporter.report_dependency(severity, &edge, &message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use crate::validation::testing::Fixture;
    use serde_json::json;

    fn manifest(nullable_parameter: bool) -> serde_json::Value {
        json!({
            "injectables": [{"name": "test.Bar", "parameters": [
                {"name": "foo", "type": "test.Foo", "nullable": nullable_parameter}
            ]}],
            "modules": [{"name": "test.M", "declarations": [
                {"kind": "Provides", "method": "foo", "return_type": "test.Foo",
                 "is_static": true, "nullable": true}
            ]}],
            "components": [{"name": "test.C", "modules": ["test.M"], "entry_points": [
                {"method": "bar", "return_type": "test.Bar"},
                {"method": "fooProvider", "return_type": "javax.inject.Provider<test.Foo>"}
            ]}]
        })
    }

    #[test]
    fn nullable_into_non_nullable_parameter() {
        let fixture = Fixture::new(manifest(false));
        let diagnostics = fixture.check(Box::new(NullableBindingValidator), "test.C");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with(
            "Foo is not nullable, but is being provided by @Provides Foo M.foo()\n\
             \x20   Foo is injected at\n\
             \x20       [C] Bar(foo)"
        ));
    }

    #[test]
    fn nullable_parameter_is_fine() {
        let fixture = Fixture::new(manifest(true));
        assert!(fixture.check(Box::new(NullableBindingValidator), "test.C").is_empty());
    }

    #[test]
    fn warning_when_configured() {
        let fixture = Fixture::with_options(manifest(false), &[("nullableValidation", "WARNING")]);
        let diagnostics = fixture.check(Box::new(NullableBindingValidator), "test.C");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }
}
