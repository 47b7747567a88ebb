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
use std::fmt::{Display, Formatter};
pub use stiletto_common::manifest::SourceLocation;
pub use stiletto_common::options::Severity;

/// A single finding. Diagnostics are collected, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Name of the check that produced this, e.g. `Stiletto/DuplicateBindings`.
    pub plugin: Option<String>,
    pub message: String,
    /// The element the diagnostic is attached to, e.g. `test.MyComponent`.
    pub element: Option<String>,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: &str) -> Self {
        Diagnostic {
            severity,
            plugin: None,
            message: message.to_owned(),
            element: None,
            location: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Diagnostic::new(Severity::Error, message)
    }

    pub fn warning(message: &str) -> Self {
        Diagnostic::new(Severity::Warning, message)
    }

    pub fn with_plugin(mut self, plugin: &str) -> Self {
        self.plugin = Some(plugin.to_owned());
        self
    }

    pub fn with_element(mut self, element: &str) -> Self {
        self.element = Some(element.to_owned());
        self
    }

    pub fn with_location(mut self, location: Option<&SourceLocation>) -> Self {
        self.location = location.cloned();
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Message as shown to the user, with the plugin prefix.
    pub fn formatted_message(&self) -> String {
        match &self.plugin {
            Some(plugin) => format!("[{}] {}", plugin, self.message),
            None => self.message.clone(),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(ref location) = self.location {
            write!(f, "{}: ", location)?;
        }
        write!(f, "{}: {}", self.severity, self.formatted_message())
    }
}

pub trait CompileError<T> {
    fn map_compile_error(self, message: &str) -> Result<T, Diagnostic>;
}

impl<T> CompileError<T> for Option<T> {
    fn map_compile_error(self, message: &str) -> Result<T, Diagnostic> {
        self.ok_or_else(|| Diagnostic::error(message))
    }
}

impl<T, E> CompileError<T> for Result<T, E> {
    fn map_compile_error(self, message: &str) -> Result<T, Diagnostic> {
        self.map_err(|_| Diagnostic::error(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_message_has_plugin_prefix() {
        let diagnostic = Diagnostic::error("Found a dependency cycle:").with_plugin("Stiletto/DependencyCycle");
        assert_eq!(
            diagnostic.formatted_message(),
            "[Stiletto/DependencyCycle] Found a dependency cycle:"
        );
    }

    #[test]
    fn display_includes_location() {
        let location = SourceLocation {
            file: "test/Foo.java".to_owned(),
            line: 3,
        };
        let diagnostic = Diagnostic::warning("careful").with_location(Some(&location));
        assert_eq!(diagnostic.to_string(), "test/Foo.java:3: warning: careful");
    }

    #[test]
    fn map_compile_error_on_none() {
        let result: Result<i32, Diagnostic> = None.map_compile_error("missing");
        assert_eq!(result.unwrap_err().message, "missing");
    }
}
