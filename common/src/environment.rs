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

use crate::key::KeyFactory;
use crate::options::{CompilerOptions, OptionError};
use std::collections::HashMap;

/// Everything a processing pass needs to know about its surroundings.
///
/// Created once and passed by reference to each stage.
#[derive(Debug, Clone)]
pub struct ProcessingEnv {
    pub options: CompilerOptions,
    pub key_factory: KeyFactory,
}

impl ProcessingEnv {
    pub fn new(options: CompilerOptions) -> Self {
        let key_factory = KeyFactory::new(options.ignore_provision_key_wildcards);
        ProcessingEnv {
            options,
            key_factory,
        }
    }

    pub fn from_processor_options(raw: &HashMap<String, String>) -> (Self, Vec<OptionError>) {
        let (options, errors) = CompilerOptions::parse(raw);
        (ProcessingEnv::new(options), errors)
    }
}

impl Default for ProcessingEnv {
    fn default() -> Self {
        ProcessingEnv::new(CompilerOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_factory_follows_wildcard_option() {
        let mut raw = HashMap::new();
        raw.insert(
            "stiletto.ignoreProvisionKeyWildcards".to_owned(),
            "DISABLED".to_owned(),
        );
        let (env, errors) = ProcessingEnv::from_processor_options(&raw);
        assert!(errors.is_empty());
        assert!(!env.key_factory.ignore_wildcards);
        assert!(ProcessingEnv::default().key_factory.ignore_wildcards);
    }
}
