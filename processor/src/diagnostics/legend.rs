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

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

lazy_static! {
    /// A package prefix followed by the top level class name.
    static ref QUALIFIED_NAME: Regex =
        Regex::new(r"\b((?:[a-z_$][a-z0-9_$]*\.)+)([A-Z][A-Za-z0-9_$]*)").unwrap();
}

/// Packages that are stripped silently, without a legend entry.
const WELL_KNOWN_PACKAGES: [&str; 9] = [
    "java.lang.",
    "java.util.",
    "javax.inject.",
    "jakarta.inject.",
    "dagger.",
    "dagger.multibindings.",
    "dagger.producers.",
    "dagger.assisted.",
    "com.google.common.util.concurrent.",
];

/// `name` without its package when that package is a well known one, so
/// `javax.inject.Singleton` reads `Singleton` but `test.TestScope` is kept.
pub fn strip_well_known_package(name: &str) -> &str {
    WELL_KNOWN_PACKAGES
        .iter()
        .filter_map(|package| name.strip_prefix(package))
        .find(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
        .unwrap_or(name)
}

/// Message text with package names removed, plus the legend needed to undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedText {
    pub text: String,
    /// short name -> fully qualified name
    pub legend: BTreeMap<String, String>,
}

/// Replaces `pkg.Outer.Inner` with `Outer.Inner` everywhere in `text`.
///
/// When two packages share a top level name, both are left qualified so the
/// stripped text stays unambiguous.
pub fn strip_common_type_prefixes(text: &str) -> StrippedText {
    let mut candidates: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for captures in QUALIFIED_NAME.captures_iter(text) {
        let package = &captures[1];
        let name = &captures[2];
        candidates
            .entry(name.to_owned())
            .or_default()
            .insert(format!("{}{}", package, name));
    }

    let mut legend = BTreeMap::new();
    let stripped = QUALIFIED_NAME.replace_all(text, |captures: &regex::Captures| {
        let package = &captures[1];
        let name = &captures[2];
        let ambiguous = candidates
            .get(name)
            .map(|full_names| full_names.len() > 1)
            .unwrap_or(false);
        if ambiguous {
            return format!("{}{}", package, name);
        }
        if !WELL_KNOWN_PACKAGES.contains(&package) {
            legend.insert(name.to_owned(), format!("{}{}", package, name));
        }
        name.to_owned()
    });
    StrippedText {
        text: stripped.into_owned(),
        legend,
    }
}

/// Formats the legend block appended to full binding graph diagnostics.
///
/// Returns an empty string when nothing was shortened.
pub fn format_legend(legend: &BTreeMap<String, String>) -> String {
    if legend.is_empty() {
        return String::new();
    }
    let width = legend.keys().map(|alias| alias.len()).max().unwrap_or(0) + 1;
    let mut result = String::from(
        "\n\n======================\nFull classname legend:\n======================\n",
    );
    for (alias, full_name) in legend {
        result.push_str(&format!(
            "{:width$} {}\n",
            format!("{}:", alias),
            full_name,
            width = width
        ));
    }
    result.push_str("========================\nEnd of classname legend:\n========================");
    result
}
