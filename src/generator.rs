//! Batch generation driver.
//!
//! A [`Generator`] walks a list of top-level targets and fills its
//! [`CodePattern`] with the artifacts each one needs. Failures are isolated
//! per element: a capsule with an unresolvable connector is recorded against
//! that capsule and the remaining targets still generate. The returned
//! [`GenerationStatus`] lists every element with its outcome.

use std::fmt;

use anyhow::Context as _;
use serde::Serialize;
use tracing::{debug_span, info, warn};

use capsule_model::{
    CapsuleId, Model, ProtocolId, SignalIdTable, TypeId, FIRST_PROTOCOL_SIGNAL_ID,
};

use crate::errors::GenerationError;
use crate::pattern::CodePattern;

/// Knobs for one generation run.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// First id handed to user-defined protocol signals. Runtimes that
    /// reserve more notification ids raise this.
    pub first_signal_id: u32,
    /// Abort the batch on the first failing element instead of continuing
    /// with the remaining ones.
    pub strict: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            first_signal_id: FIRST_PROTOCOL_SIGNAL_ID,
            strict: false,
        }
    }
}

impl GeneratorConfig {
    pub fn with_first_signal_id(mut self, id: u32) -> Self {
        self.first_signal_id = id;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

/// One independently generated top-level element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Capsule(CapsuleId),
    Protocol(ProtocolId),
    StructType(TypeId),
}

/// Outcome for one element of the batch: the number of artifacts generated,
/// or the failure attributed to it.
#[derive(Debug)]
pub struct ElementOutcome {
    pub element: String,
    pub result: Result<usize, anyhow::Error>,
}

/// Per-element results of a batch run.
#[derive(Debug, Default)]
pub struct GenerationStatus {
    pub outcomes: Vec<ElementOutcome>,
}

impl GenerationStatus {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn outcome_for(&self, element: &str) -> Option<&ElementOutcome> {
        self.outcomes.iter().find(|o| o.element == element)
    }

    /// A serializable snapshot of the run.
    pub fn report(&self) -> StatusReport {
        StatusReport {
            elements: self
                .outcomes
                .iter()
                .map(|o| match &o.result {
                    Ok(artifacts) => ElementReport {
                        element: o.element.clone(),
                        ok: true,
                        artifacts: *artifacts,
                        error: None,
                    },
                    Err(err) => ElementReport {
                        element: o.element.clone(),
                        ok: false,
                        artifacts: 0,
                        error: Some(format!("{err:#}")),
                    },
                })
                .collect(),
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "generated {}/{} elements",
            self.succeeded(),
            self.outcomes.len()
        )?;
        for outcome in &self.outcomes {
            if let Err(err) = &outcome.result {
                writeln!(f, "  {}: {err:#}", outcome.element)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub elements: Vec<ElementReport>,
}

#[derive(Debug, Serialize)]
pub struct ElementReport {
    pub element: String,
    pub ok: bool,
    pub artifacts: usize,
    pub error: Option<String>,
}

/// Drives a batch over the model, accumulating artifacts in its pattern.
#[derive(Debug, Default)]
pub struct Generator {
    config: GeneratorConfig,
    pattern: CodePattern,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            pattern: CodePattern::new(),
        }
    }

    pub fn pattern(&self) -> &CodePattern {
        &self.pattern
    }

    pub fn into_pattern(self) -> CodePattern {
        self.pattern
    }

    /// Generate artifacts for every target, one element at a time.
    pub fn generate(&mut self, model: &Model, targets: &[Target]) -> GenerationStatus {
        let span = debug_span!("generate", targets = targets.len());
        let _guard = span.enter();

        let mut status = GenerationStatus::default();
        for &target in targets {
            let element = self.element_name(model, target);
            let result = self
                .generate_one(model, target)
                .with_context(|| format!("generating `{element}`"));
            match &result {
                Ok(artifacts) => info!(%element, artifacts, "element generated"),
                Err(err) => warn!(%element, error = %format!("{err:#}"), "element failed"),
            }
            let failed = result.is_err();
            status.outcomes.push(ElementOutcome { element, result });
            if failed && self.config.strict {
                break;
            }
        }
        status
    }

    fn element_name(&self, model: &Model, target: Target) -> String {
        match target {
            Target::Capsule(id) => model.capsule(id).name.clone(),
            Target::Protocol(id) => model.protocol(id).name.clone(),
            Target::StructType(id) => model.rt_type(id).name.clone(),
        }
    }

    fn generate_one(&mut self, model: &Model, target: Target) -> Result<usize, GenerationError> {
        match target {
            Target::Capsule(id) => {
                self.pattern.wiring_for(model, id)?;
                Ok(1)
            }
            Target::Protocol(id) => {
                let name = model.protocol(id).name.clone();
                let table = SignalIdTable::build_with_base(model, id, self.config.first_signal_id);
                let mut artifacts = 0;
                for (signal_id, _, signal) in table.iter() {
                    self.pattern.payload_for(model, &name, signal, signal_id)?;
                    artifacts += 1;
                }
                Ok(artifacts)
            }
            Target::StructType(id) => {
                self.pattern.descriptor_for(model, id)?;
                Ok(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsule_model::{Capsule, Protocol, Signal, SignalDirection};

    #[test]
    fn test_strict_mode_stops_at_first_failure() {
        let mut model = Model::standard();
        let int_ty = model.find_type("int").unwrap();
        let good = model.add_capsule(Capsule::new("Good"));

        // A capsule-typed parameter makes this protocol unserializable.
        let bad_cap = model.add_capsule(Capsule::new("Bad"));
        let bad_ty = model.add_type(capsule_model::RtType::capsule_backed("Bad", bad_cap));
        let mut proto = Protocol::new("Broken");
        proto.add_signal(Signal::new("send", SignalDirection::In).param("w", bad_ty));
        let proto_id = model.add_protocol(proto);

        let mut ok_proto = Protocol::new("Fine");
        ok_proto.add_signal(Signal::new("ping", SignalDirection::In).param("n", int_ty));
        let ok_proto_id = model.add_protocol(ok_proto);

        let targets = [
            Target::Protocol(proto_id),
            Target::Capsule(good),
            Target::Protocol(ok_proto_id),
        ];

        let mut strict = Generator::new(GeneratorConfig::default().strict());
        let status = strict.generate(&model, &targets);
        assert_eq!(status.outcomes.len(), 1);
        assert_eq!(status.failed(), 1);

        let mut lenient = Generator::new(GeneratorConfig::default());
        let status = lenient.generate(&model, &targets);
        assert_eq!(status.outcomes.len(), 3);
        assert_eq!(status.succeeded(), 2);
    }

    #[test]
    fn test_custom_signal_base_shifts_payload_ids() {
        let mut model = Model::standard();
        let int_ty = model.find_type("int").unwrap();
        let mut proto = Protocol::new("P");
        proto.add_signal(Signal::new("m", SignalDirection::In).param("n", int_ty));
        let proto_id = model.add_protocol(proto);

        let mut generator = Generator::new(GeneratorConfig::default().with_first_signal_id(8));
        let status = generator.generate(&model, &[Target::Protocol(proto_id)]);
        assert!(status.is_success());

        let (_, artifact) = generator.pattern().iter().next().unwrap();
        match artifact {
            crate::pattern::Artifact::SignalPayload(payload) => {
                assert_eq!(payload.signal_id, 8);
            }
            _ => panic!("expected a payload artifact"),
        }
    }

    #[test]
    fn test_status_display_lists_failures() {
        let mut model = Model::standard();
        let bad_cap = model.add_capsule(Capsule::new("Bad"));
        let bad_ty = model.add_type(capsule_model::RtType::capsule_backed("Bad", bad_cap));
        let mut proto = Protocol::new("Broken");
        proto.add_signal(Signal::new("send", SignalDirection::In).param("w", bad_ty));
        let proto_id = model.add_protocol(proto);

        let mut generator = Generator::new(GeneratorConfig::default());
        let status = generator.generate(&model, &[Target::Protocol(proto_id)]);
        let text = status.to_string();
        assert!(text.contains("generated 0/1 elements"));
        assert!(text.contains("Broken"));
    }
}
