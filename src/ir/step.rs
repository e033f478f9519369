use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default liquid class used when a transfer does not name one.
pub const DEFAULT_LIQUID_CLASS: &str = "Water";

/// Default wash scheme.
pub const DEFAULT_WASH_SCHEME: u32 = 1;

/// Arguments of a transfer step.
///
/// Every field is optional so a step can always be constructed from whatever
/// the planner produced; the validator and compiler report what is missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transfer {
    pub source_labware: Option<String>,
    pub source_well: Option<String>,
    pub dest_labware: Option<String>,
    pub dest_well: Option<String>,
    pub volume_ul: Option<f64>,
    pub liquid_class: Option<String>,
}

impl Transfer {
    /// A fully specified transfer using the default liquid class.
    pub fn new(
        source_labware: impl Into<String>,
        source_well: impl Into<String>,
        dest_labware: impl Into<String>,
        dest_well: impl Into<String>,
        volume_ul: f64,
    ) -> Self {
        Self {
            source_labware: Some(source_labware.into()),
            source_well: Some(source_well.into()),
            dest_labware: Some(dest_labware.into()),
            dest_well: Some(dest_well.into()),
            volume_ul: Some(volume_ul),
            liquid_class: None,
        }
    }

    pub fn with_liquid_class(mut self, liquid_class: impl Into<String>) -> Self {
        self.liquid_class = Some(liquid_class.into());
        self
    }

    /// The liquid class, falling back to [`DEFAULT_LIQUID_CLASS`].
    pub fn liquid_class(&self) -> &str {
        self.liquid_class.as_deref().unwrap_or(DEFAULT_LIQUID_CLASS)
    }
}

/// The operation a step performs.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Transfer(Transfer),
    Wash { scheme: u32 },
    Decontaminate,
    /// Any operation name outside the supported set. Kept verbatim so the
    /// validator can report it.
    Unknown { op: String, args: Map<String, Value> },
}

/// Coarse operation category, exposed for external risk classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Transfer,
    Wash,
    Decontaminate,
    Unknown,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Transfer => write!(f, "transfer"),
            StepKind::Wash => write!(f, "wash"),
            StepKind::Decontaminate => write!(f, "decontaminate"),
            StepKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// An argument present on the wire whose value has the wrong type or range,
/// e.g. `"scheme": "3"`. Its field in [`Operation`] holds the default, so a
/// step with any malformed argument must not be compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedArgument {
    pub name: &'static str,
    pub value: Value,
}

impl fmt::Display for MalformedArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "argument {} has invalid value {}", self.name, self.value)
    }
}

/// One atomic operation in a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawStep", into = "RawStep")]
pub struct Step {
    pub id: String,
    pub operation: Operation,
    /// State expressions such as `robot.homed == true`. Stored, not evaluated.
    pub preconditions: Vec<String>,
    /// Arguments that could not be read. Reported by preflight, refused by
    /// the compiler and simulator.
    pub malformed: Vec<MalformedArgument>,
}

impl Step {
    pub fn new(id: impl Into<String>, operation: Operation) -> Self {
        Self {
            id: id.into(),
            operation,
            preconditions: Vec::new(),
            malformed: Vec::new(),
        }
    }

    pub fn transfer(id: impl Into<String>, transfer: Transfer) -> Self {
        Self::new(id, Operation::Transfer(transfer))
    }

    pub fn wash(id: impl Into<String>, scheme: u32) -> Self {
        Self::new(id, Operation::Wash { scheme })
    }

    pub fn decontaminate(id: impl Into<String>) -> Self {
        Self::new(id, Operation::Decontaminate)
    }

    pub fn unknown(id: impl Into<String>, op: impl Into<String>) -> Self {
        Self::new(
            id,
            Operation::Unknown {
                op: op.into(),
                args: Map::new(),
            },
        )
    }

    pub fn with_preconditions<I, S>(mut self, preconditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preconditions = preconditions.into_iter().map(Into::into).collect();
        self
    }

    pub fn kind(&self) -> StepKind {
        match self.operation {
            Operation::Transfer(_) => StepKind::Transfer,
            Operation::Wash { .. } => StepKind::Wash,
            Operation::Decontaminate => StepKind::Decontaminate,
            Operation::Unknown { .. } => StepKind::Unknown,
        }
    }

    /// Whether the wire value for `argument` could not be read.
    pub fn is_malformed(&self, argument: &str) -> bool {
        self.malformed.iter().any(|m| m.name == argument)
    }

    /// The operation name as it appears on the wire.
    pub fn op_name(&self) -> &str {
        match &self.operation {
            Operation::Transfer(_) => "transfer",
            Operation::Wash { .. } => "wash",
            Operation::Decontaminate => "decontaminate",
            Operation::Unknown { op, .. } => op,
        }
    }
}

// Wire form: `{"id", "op", "args", "preconditions"}` with an untyped argument map.
#[derive(Debug, Serialize, Deserialize)]
struct RawStep {
    #[serde(default)]
    id: String,
    #[serde(default)]
    op: String,
    #[serde(default)]
    args: Map<String, Value>,
    #[serde(default)]
    preconditions: Vec<String>,
}

// Reads typed arguments, keeping absent (or null) apart from unreadable.
struct ArgReader<'a> {
    args: &'a Map<String, Value>,
    malformed: Vec<MalformedArgument>,
}

impl<'a> ArgReader<'a> {
    fn new(args: &'a Map<String, Value>) -> Self {
        Self {
            args,
            malformed: Vec::new(),
        }
    }

    fn read<T>(
        &mut self,
        name: &'static str,
        parse: impl FnOnce(&Value) -> Option<T>,
    ) -> Option<T> {
        let value = self.args.get(name).filter(|v| !v.is_null())?;
        let parsed = parse(value);
        if parsed.is_none() {
            self.malformed.push(MalformedArgument {
                name,
                value: value.clone(),
            });
        }
        parsed
    }

    fn string(&mut self, name: &'static str) -> Option<String> {
        self.read(name, |value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    fn volume(&mut self, name: &'static str) -> Option<f64> {
        self.read(name, Value::as_f64)
    }

    fn scheme(&mut self, name: &'static str) -> Option<u32> {
        self.read(name, |value| value.as_u64().and_then(|s| u32::try_from(s).ok()))
    }
}

impl From<RawStep> for Step {
    fn from(raw: RawStep) -> Self {
        let mut reader = ArgReader::new(&raw.args);
        let operation = match raw.op.to_ascii_lowercase().as_str() {
            "transfer" => Operation::Transfer(Transfer {
                source_labware: reader.string("source_labware"),
                source_well: reader.string("source_well"),
                dest_labware: reader.string("dest_labware"),
                dest_well: reader.string("dest_well"),
                volume_ul: reader.volume("volume_uL"),
                liquid_class: reader.string("liquid_class"),
            }),
            "wash" => Operation::Wash {
                scheme: reader.scheme("scheme").unwrap_or(DEFAULT_WASH_SCHEME),
            },
            "decontaminate" => Operation::Decontaminate,
            _ => Operation::Unknown {
                op: raw.op.clone(),
                args: raw.args.clone(),
            },
        };
        let malformed = reader.malformed;

        Step {
            id: raw.id,
            operation,
            preconditions: raw.preconditions,
            malformed,
        }
    }
}

impl From<Step> for RawStep {
    fn from(step: Step) -> Self {
        let op = step.op_name().to_string();
        let mut args = match step.operation {
            Operation::Transfer(t) => {
                let mut args = Map::new();
                let mut put = |key: &str, value: Option<Value>| {
                    if let Some(value) = value {
                        args.insert(key.to_string(), value);
                    }
                };
                put("source_labware", t.source_labware.map(Value::String));
                put("source_well", t.source_well.map(Value::String));
                put("dest_labware", t.dest_labware.map(Value::String));
                put("dest_well", t.dest_well.map(Value::String));
                put("volume_uL", t.volume_ul.map(Value::from));
                put("liquid_class", t.liquid_class.map(Value::String));
                args
            }
            Operation::Wash { scheme } => {
                let mut args = Map::new();
                args.insert("scheme".to_string(), Value::from(scheme));
                args
            }
            Operation::Decontaminate => Map::new(),
            Operation::Unknown { args, .. } => args,
        };
        for MalformedArgument { name, value } in step.malformed {
            args.insert(name.to_string(), value);
        }

        RawStep {
            id: step.id,
            op,
            args,
            preconditions: step.preconditions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_transfer_from_wire_form() {
        let step: Step = serde_json::from_value(json!({
            "id": "s1",
            "op": "transfer",
            "args": {
                "source_labware": "S1",
                "source_well": "A1",
                "dest_labware": "D1",
                "dest_well": "B1",
                "volume_uL": 50
            },
            "preconditions": ["robot.homed == true", "tip.attached == true"]
        }))
        .unwrap();

        assert_eq!(step.kind(), StepKind::Transfer);
        assert_eq!(step.preconditions.len(), 2);
        let Operation::Transfer(t) = &step.operation else {
            panic!("expected transfer");
        };
        assert_eq!(t.source_labware.as_deref(), Some("S1"));
        assert_eq!(t.volume_ul, Some(50.0));
        assert_eq!(t.liquid_class(), "Water");
    }

    #[test]
    fn missing_arguments_do_not_fail_construction() {
        let step: Step = serde_json::from_value(json!({
            "id": "s1",
            "op": "transfer",
            "args": {}
        }))
        .unwrap();
        assert_eq!(step.operation, Operation::Transfer(Transfer::default()));
    }

    #[test]
    fn op_name_is_case_insensitive() {
        let step: Step = serde_json::from_value(json!({"id": "w", "op": "Wash"})).unwrap();
        assert_eq!(step.operation, Operation::Wash { scheme: 1 });
    }

    #[test]
    fn wash_scheme_is_read() {
        let step: Step =
            serde_json::from_value(json!({"id": "w", "op": "wash", "args": {"scheme": 3}}))
                .unwrap();
        assert_eq!(step.operation, Operation::Wash { scheme: 3 });
    }

    #[test]
    fn unreadable_wash_scheme_is_marked_malformed() {
        for scheme in [json!("3"), json!(3.5), json!(-2), json!(5_000_000_000u64)] {
            let step: Step = serde_json::from_value(
                json!({"id": "w", "op": "wash", "args": {"scheme": scheme.clone()}}),
            )
            .unwrap();
            assert!(step.is_malformed("scheme"), "scheme {scheme}");
            assert_eq!(step.malformed[0].value, scheme);
        }
    }

    #[test]
    fn null_argument_counts_as_absent() {
        let step: Step =
            serde_json::from_value(json!({"id": "w", "op": "wash", "args": {"scheme": null}}))
                .unwrap();
        assert!(step.malformed.is_empty());
        assert_eq!(step.operation, Operation::Wash { scheme: 1 });
    }

    #[test]
    fn non_string_liquid_class_is_marked_malformed() {
        let step: Step = serde_json::from_value(json!({
            "id": "s1",
            "op": "transfer",
            "args": {"volume_uL": "lots", "liquid_class": {"name": "DMSO"}}
        }))
        .unwrap();
        let names: Vec<_> = step.malformed.iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["volume_uL", "liquid_class"]);
        let Operation::Transfer(t) = &step.operation else {
            panic!("expected transfer");
        };
        assert_eq!(t.liquid_class, None);
    }

    #[test]
    fn malformed_values_survive_serialization() {
        let step: Step =
            serde_json::from_value(json!({"id": "w", "op": "wash", "args": {"scheme": "3"}}))
                .unwrap();
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["args"]["scheme"], "3");
    }

    #[test]
    fn unknown_op_is_kept_verbatim() {
        let step: Step =
            serde_json::from_value(json!({"id": "m", "op": "mix", "args": {"cycles": 3}}))
                .unwrap();
        assert_eq!(step.kind(), StepKind::Unknown);
        assert_eq!(step.op_name(), "mix");
    }

    #[test]
    fn serializes_back_to_wire_form() {
        let step = Step::transfer("s1", Transfer::new("S1", "A1", "D1", "B1", 20.0))
            .with_preconditions(["robot.homed == true"]);
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["op"], "transfer");
        assert_eq!(value["args"]["volume_uL"], 20.0);
        assert!(value["args"].get("liquid_class").is_none());
        assert_eq!(value["preconditions"][0], "robot.homed == true");
    }

    #[test]
    fn step_kind_display() {
        assert_eq!(StepKind::Transfer.to_string(), "transfer");
        assert_eq!(StepKind::Unknown.to_string(), "unknown");
    }
}
