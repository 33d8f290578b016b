//! Query parameter compiler
//!
//! Compiles a whitespace separated `key:value` string into typed
//! [`CompiledParam`]s. Each key resolves to a [`ParamDef`] in a fixed
//! table that carries its multiplicity, whether it can be negated, and
//! the function that validates its value.
//!
//! ```text
//! action:block-break !source:Steve object:minecraft:stone range:10 after:1w2d
//! ```
//!
//! Negation is written as a leading `!` on the token (`!source:Steve`) or
//! on the value (`source:!Steve`).

use crate::error::{CompileError, CompileResult};
use crate::record::{strip_namespace, Interaction};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Relative duration: any subset of w/d/h/m/s in that order
static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)w)?(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$")
        .expect("Invalid duration regex")
});

/// Symbolic action names. `None` marks names that are recognized but
/// have no interaction code to filter on.
const ACTIONS: &[(&str, Option<Interaction>)] = &[
    ("block-break", Some(Interaction::Break)),
    ("block-place", Some(Interaction::Place)),
    ("container-open", None),
    ("container-take", None),
    ("container-put", None),
    ("entity-killed", None),
    ("item-drop", None),
    ("item-pickup", None),
    ("player-chat", None),
    ("player-command", None),
    ("player-session", None),
    ("sign-edit", None),
    ("username-change", None),
];

/// Kind of a query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Action,
    World,
    Object,
    Source,
    Range,
    Before,
    After,
}

/// Validated parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Interaction to match
    Action(Interaction),
    /// Partition name
    World(String),
    /// Subject identifier without namespace
    Object(String),
    /// Case-folded actor name
    Source(String),
    /// Search radius
    Range(i64),
    /// Inclusive upper bound on UNIX time
    Before(i64),
    /// Inclusive lower bound on UNIX time
    After(i64),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Action(_) => ParamKind::Action,
            ParamValue::World(_) => ParamKind::World,
            ParamValue::Object(_) => ParamKind::Object,
            ParamValue::Source(_) => ParamKind::Source,
            ParamValue::Range(_) => ParamKind::Range,
            ParamValue::Before(_) => ParamKind::Before,
            ParamValue::After(_) => ParamKind::After,
        }
    }
}

/// One compiled filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledParam {
    pub value: ParamValue,
    pub negated: bool,
}

impl CompiledParam {
    pub fn kind(&self) -> ParamKind {
        self.value.kind()
    }
}

/// Inputs a validator may depend on
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
    /// Configured partition names
    pub partitions: &'a [String],
    /// Current UNIX time
    pub now: i64,
}

impl<'a> CompileContext<'a> {
    /// Context using the system clock
    pub fn new(partitions: &'a [String]) -> Self {
        Self {
            partitions,
            now: chrono::Utc::now().timestamp(),
        }
    }
}

/// Why a value was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    Invalid(String),
    Unsupported,
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::Invalid(reason) => f.write_str(reason),
            ValueError::Unsupported => f.write_str("not supported"),
        }
    }
}

type Validator = fn(&str, &CompileContext<'_>) -> Result<ParamValue, ValueError>;

/// Definition of a query parameter
#[derive(Clone, Copy)]
pub struct ParamDef {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    /// May appear more than once
    pub multiple: bool,
    /// Accepts the `!` marker
    pub negatable: bool,
    validate: Validator,
}

impl fmt::Debug for ParamDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("multiple", &self.multiple)
            .field("negatable", &self.negatable)
            .finish()
    }
}

impl ParamDef {
    /// Validate a raw value
    pub fn validate(&self, value: &str, ctx: &CompileContext<'_>) -> Result<ParamValue, ValueError> {
        (self.validate)(value, ctx)
    }
}

pub const PARAM_TABLE: &[ParamDef] = &[
    ParamDef {
        name: "action",
        kind: ParamKind::Action,
        description: "Interaction: block-break or block-place",
        multiple: true,
        negatable: true,
        validate: validate_action,
    },
    ParamDef {
        name: "world",
        kind: ParamKind::World,
        description: "Partition to search",
        multiple: true,
        negatable: true,
        validate: validate_world,
    },
    ParamDef {
        name: "object",
        kind: ParamKind::Object,
        description: "Block identifier, namespace optional",
        multiple: true,
        negatable: true,
        validate: validate_object,
    },
    ParamDef {
        name: "source",
        kind: ParamKind::Source,
        description: "Player name (case-insensitive)",
        multiple: true,
        negatable: true,
        validate: validate_source,
    },
    ParamDef {
        name: "range",
        kind: ParamKind::Range,
        description: "Search radius in blocks (> 1, default 1)",
        multiple: false,
        negatable: false,
        validate: validate_range,
    },
    ParamDef {
        name: "before",
        kind: ParamKind::Before,
        description: "Only events at least this long ago (e.g. 1w2d3h4m5s)",
        multiple: false,
        negatable: false,
        validate: validate_before,
    },
    ParamDef {
        name: "after",
        kind: ParamKind::After,
        description: "Only events at most this long ago (e.g. 12h)",
        multiple: false,
        negatable: false,
        validate: validate_after,
    },
];

/// Look up a parameter by key
pub fn param_def(name: &str) -> Option<&'static ParamDef> {
    PARAM_TABLE.iter().find(|p| p.name == name)
}

/// Compile a parameter string
pub fn compile(input: &str, ctx: &CompileContext<'_>) -> CompileResult<Vec<CompiledParam>> {
    let mut compiled: Vec<CompiledParam> = Vec::new();

    for (i, token) in input.split_whitespace().enumerate() {
        let position = i + 1;

        let (negated_key, rest) = match token.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, token),
        };

        let (key, raw_value) = rest.split_once(':').ok_or_else(|| CompileError::MalformedToken {
            position,
            token: token.to_string(),
        })?;

        let def = param_def(key).ok_or_else(|| CompileError::UnknownKey {
            position,
            key: key.to_string(),
        })?;

        let (negated_value, value) = match raw_value.strip_prefix('!') {
            Some(v) => (true, v),
            None => (false, raw_value),
        };
        let negated = negated_key || negated_value;

        if negated && !def.negatable {
            return Err(CompileError::NotNegatable {
                position,
                key: key.to_string(),
            });
        }

        if !def.multiple && compiled.iter().any(|c| c.kind() == def.kind) {
            return Err(CompileError::Repeated {
                position,
                key: key.to_string(),
            });
        }

        let value = def.validate(value, ctx).map_err(|e| match e {
            ValueError::Unsupported => CompileError::UnsupportedAction {
                position,
                value: value.to_string(),
            },
            ValueError::Invalid(reason) => CompileError::InvalidValue {
                position,
                key: key.to_string(),
                value: value.to_string(),
                reason,
            },
        })?;

        compiled.push(CompiledParam { value, negated });
    }

    Ok(compiled)
}

/// Convert a relative duration such as `1w2d3h4m5s` to seconds
pub fn parse_duration(value: &str) -> Result<i64, ValueError> {
    let caps = DURATION_REGEX
        .captures(value)
        .ok_or_else(|| ValueError::Invalid("expected a duration like 1w2d3h4m5s".into()))?;

    if caps.iter().skip(1).all(|c| c.is_none()) {
        return Err(ValueError::Invalid("empty duration".into()));
    }

    let overflow = || ValueError::Invalid("duration too large".into());
    let unit = |i: usize| -> Result<i64, ValueError> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<i64>().map_err(|_| overflow()),
            None => Ok(0),
        }
    };

    // Carry each unit into the next smaller one
    let mut total = unit(1)?;
    for (i, factor) in [(2, 7), (3, 24), (4, 60), (5, 60)] {
        total = total
            .checked_mul(factor)
            .and_then(|t| t.checked_add(unit(i).ok()?))
            .ok_or_else(overflow)?;
    }
    Ok(total)
}

fn validate_action(value: &str, _: &CompileContext<'_>) -> Result<ParamValue, ValueError> {
    match ACTIONS.iter().find(|(name, _)| *name == value) {
        Some((_, Some(kind))) => Ok(ParamValue::Action(*kind)),
        Some((_, None)) => Err(ValueError::Unsupported),
        None => Err(ValueError::Invalid(format!(
            "unknown action; expected one of {}",
            ACTIONS.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", ")
        ))),
    }
}

fn validate_world(value: &str, ctx: &CompileContext<'_>) -> Result<ParamValue, ValueError> {
    if ctx.partitions.iter().any(|p| p == value) {
        Ok(ParamValue::World(value.to_string()))
    } else {
        Err(ValueError::Invalid(format!(
            "expected one of {}",
            ctx.partitions.join(", ")
        )))
    }
}

fn validate_object(value: &str, _: &CompileContext<'_>) -> Result<ParamValue, ValueError> {
    let name = strip_namespace(value);
    if name.is_empty() {
        return Err(ValueError::Invalid("empty identifier".into()));
    }
    Ok(ParamValue::Object(name.to_string()))
}

fn validate_source(value: &str, _: &CompileContext<'_>) -> Result<ParamValue, ValueError> {
    if value.is_empty() {
        return Err(ValueError::Invalid("empty player name".into()));
    }
    Ok(ParamValue::Source(value.to_lowercase()))
}

fn validate_range(value: &str, _: &CompileContext<'_>) -> Result<ParamValue, ValueError> {
    let n: i64 = value
        .parse()
        .map_err(|_| ValueError::Invalid("expected integer".into()))?;
    if n <= 1 {
        return Err(ValueError::Invalid("range must be greater than 1".into()));
    }
    if n.checked_mul(n).is_none() {
        return Err(ValueError::Invalid("range too large".into()));
    }
    Ok(ParamValue::Range(n))
}

fn relative_time(value: &str, ctx: &CompileContext<'_>) -> Result<i64, ValueError> {
    let secs = parse_duration(value)?;
    ctx.now
        .checked_sub(secs)
        .ok_or_else(|| ValueError::Invalid("duration too large".into()))
}

fn validate_before(value: &str, ctx: &CompileContext<'_>) -> Result<ParamValue, ValueError> {
    relative_time(value, ctx).map(ParamValue::Before)
}

fn validate_after(value: &str, ctx: &CompileContext<'_>) -> Result<ParamValue, ValueError> {
    relative_time(value, ctx).map(ParamValue::After)
}
