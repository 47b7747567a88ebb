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

#![allow(dead_code)]

use serde_json::Value;
use std::collections::HashMap;
use stiletto::{Manifest, ProcessingResult, Severity};
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output to the test harness. `RUST_LOG=debug` shows the
/// pipeline stages.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn options(options: &[(&str, &str)]) -> HashMap<String, String> {
    options
        .iter()
        .map(|(k, v)| (format!("stiletto.{}", k), v.to_string()))
        .collect()
}

pub fn process(manifest: Value) -> ProcessingResult {
    process_with(manifest, &[])
}

pub fn process_with(manifest: Value, raw_options: &[(&str, &str)]) -> ProcessingResult {
    init_logging();
    let manifest: Manifest = serde_json::from_value(manifest).unwrap();
    stiletto::process(&manifest, &options(raw_options))
}

/// Messages of every error, with the plugin prefix.
pub fn errors(result: &ProcessingResult) -> Vec<String> {
    result
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.formatted_message())
        .collect()
}

pub fn warnings(result: &ProcessingResult) -> Vec<String> {
    result
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .map(|d| d.formatted_message())
        .collect()
}
