// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::validation::Validator;

/// Named task contract: input/output validators plus optional per-key context
/// validators.
///
/// A spec is created once per task and is immutable for the process lifetime.
/// The generated `uid` is its stable identity: the local backend keys its
/// dispatch table on it, so two specs with the same name remain distinct
/// registrations. `name` is the wire key for distributed dispatch.
pub struct Spec {
    uid: Uuid,
    name: String,
    input: Arc<dyn Validator>,
    output: Arc<dyn Validator>,
    context: HashMap<String, Arc<dyn Validator>>,
}

impl Spec {
    pub fn new(
        name: impl Into<String>,
        input: Arc<dyn Validator>,
        output: Arc<dyn Validator>,
    ) -> Arc<Self> {
        Self::with_context(name, input, output, HashMap::new())
    }

    pub fn with_context(
        name: impl Into<String>,
        input: Arc<dyn Validator>,
        output: Arc<dyn Validator>,
        context: HashMap<String, Arc<dyn Validator>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            uid: Uuid::new_v4(),
            name: name.into(),
            input,
            output,
            context,
        })
    }

    /// Stable identity used by the local dispatch table.
    pub fn uid(&self) -> Uuid {
        self.uid
    }

    /// Wire key for distributed dispatch (one logical queue per name).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> &Arc<dyn Validator> {
        &self.input
    }

    pub fn output(&self) -> &Arc<dyn Validator> {
        &self.output
    }

    pub fn context(&self) -> &HashMap<String, Arc<dyn Validator>> {
        &self.context
    }
}

impl fmt::Debug for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spec")
            .field("uid", &self.uid)
            .field("name", &self.name)
            .field("context_keys", &self.context.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::any;

    #[test]
    fn specs_with_the_same_name_keep_distinct_identities() {
        let a = Spec::new("add", any(), any());
        let b = Spec::new("add", any(), any());
        assert_ne!(a.uid(), b.uid());
        assert_eq!(a.name(), b.name());
    }
}
