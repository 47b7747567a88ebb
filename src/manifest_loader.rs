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

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use stiletto_common::manifest::Manifest;
use tracing::{debug, warn};

lazy_static! {
    static ref PROCESSOR_ARG: Regex = Regex::new(r"^-A([^=\s]+)(?:=(.*))?$").unwrap();
}

/// Reads every manifest in `paths` and merges them into one.
///
/// Front-ends usually write one manifest per compilation unit; dependencies
/// contribute their own.
pub fn load_manifest<P: AsRef<Path>>(paths: &[P]) -> Result<Manifest> {
    let mut manifest = Manifest::new();
    for path in paths {
        let path = path.as_ref();
        debug!("reading manifest {}", path.display());
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read manifest {}", path.display()))?;
        let part = Manifest::from_json(&json)
            .with_context(|| format!("malformed manifest {}", path.display()))?;
        manifest.merge_from(&part);
    }
    Ok(manifest)
}

/// Collects `-Akey=value` processor arguments. `-Akey` alone maps to an
/// empty value. Anything else is skipped.
pub fn parse_processor_args<I, S>(args: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = HashMap::new();
    for arg in args {
        let arg = arg.as_ref();
        match PROCESSOR_ARG.captures(arg) {
            Some(captures) => {
                let value = captures.get(2).map_or("", |m| m.as_str());
                options.insert(captures[1].to_owned(), value.to_owned());
            }
            None => warn!("ignoring argument {}", arg),
        }
    }
    options
}
