// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::fmt;

use crate::report::{self as tr, StepKind, WsjfError};
use crate::wsjf;
use tr::{CompOp, StepStatus};

/// A value together with the display format the producer attached to it.
/// The format is carried verbatim and never affects comparisons.
#[derive(Debug, Clone, PartialEq)]
pub struct Formatted<T> {
    pub value: T,
    pub format: Option<String>,
}

impl<T> Formatted<T> {
    pub fn new(value: T) -> Self {
        Formatted {
            value,
            format: None,
        }
    }

    pub fn with_format(value: T, format: &str) -> Self {
        Formatted {
            value,
            format: Some(format.to_owned()),
        }
    }
}

impl<T> From<T> for Formatted<T> {
    fn from(value: T) -> Self {
        Formatted::new(value)
    }
}

/// Comparison operator as carried by a measurement. Decoded payloads may
/// hold operator text this library does not recognize; it is kept as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Known(CompOp),
    Raw(String),
}

impl Comparison {
    pub fn code(&self) -> &str {
        match self {
            Comparison::Known(op) => op.code(),
            Comparison::Raw(raw) => raw,
        }
    }

    pub fn known(&self) -> Option<CompOp> {
        match self {
            Comparison::Known(op) => Some(*op),
            Comparison::Raw(_) => None,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<CompOp> for Comparison {
    fn from(op: CompOp) -> Self {
        Comparison::Known(op)
    }
}

/// Ties a measurement type to the leaf step kind that owns it and to the
/// input used to create it.
pub trait Measure: Sized {
    /// What the caller hands to `add_single_test` / `add_named_test`.
    type Test;

    fn create(test: Self::Test, index: usize, name: Option<String>) -> Result<Self, WsjfError>;

    fn index(&self) -> usize;
    fn name(&self) -> Option<&str>;
    fn status(&self) -> StepStatus;

    #[doc(hidden)]
    fn leaf(kind: &StepKind) -> Option<&tr::LeafData<Self>>;
    #[doc(hidden)]
    fn leaf_mut(kind: &mut StepKind) -> Option<&mut tr::LeafData<Self>>;
}

/// Input for a numeric limit measurement.
///
/// # Examples
///
/// ```rust
/// # use tdm::report::*;
/// let test = NumericTest::new(3.3, CompOp::GeLe)
///     .limits(3.0, 3.6)
///     .unit("V");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTest {
    value: Formatted<f64>,
    comp_op: CompOp,
    low_limit: Option<Formatted<f64>>,
    high_limit: Option<Formatted<f64>>,
    unit: Option<String>,
}

impl NumericTest {
    pub fn new<V: Into<Formatted<f64>>>(value: V, comp_op: CompOp) -> Self {
        NumericTest {
            value: value.into(),
            comp_op,
            low_limit: None,
            high_limit: None,
            unit: None,
        }
    }

    /// A measurement that is only logged, never compared.
    pub fn log<V: Into<Formatted<f64>>>(value: V) -> Self {
        Self::new(value, CompOp::Log)
    }

    pub fn low_limit<V: Into<Formatted<f64>>>(mut self, value: V) -> Self {
        self.low_limit = Some(value.into());
        self
    }

    pub fn high_limit<V: Into<Formatted<f64>>>(mut self, value: V) -> Self {
        self.high_limit = Some(value.into());
        self
    }

    pub fn limits<L, H>(self, low: L, high: H) -> Self
    where
        L: Into<Formatted<f64>>,
        H: Into<Formatted<f64>>,
    {
        self.low_limit(low).high_limit(high)
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_owned());
        self
    }
}

/// Input for a string value measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct StringTest {
    value: String,
    comp_op: CompOp,
    limit: Option<String>,
}

impl StringTest {
    pub fn new(value: &str, comp_op: CompOp) -> Self {
        StringTest {
            value: value.to_owned(),
            comp_op,
            limit: None,
        }
    }

    pub fn log(value: &str) -> Self {
        Self::new(value, CompOp::Log)
    }

    pub fn limit(mut self, limit: &str) -> Self {
        self.limit = Some(limit.to_owned());
        self
    }
}

fn require<T: Clone>(op: CompOp, bound: &'static str, limit: &Option<T>) -> Result<T, WsjfError> {
    limit.clone().ok_or(WsjfError::MissingLimit {
        op: op.code().to_owned(),
        bound,
    })
}

fn status_of(passed: bool) -> StepStatus {
    if passed {
        StepStatus::Passed
    } else {
        StepStatus::Failed
    }
}

/// Applies `op` to `value`. Single limit operators read the low limit.
/// `GT..`/`GE..` dual operators test inside the range, `LT..`/`LE..` dual
/// operators test outside of it.
pub(crate) fn compare_numeric(
    op: CompOp,
    value: f64,
    low: Option<f64>,
    high: Option<f64>,
) -> Result<bool, WsjfError> {
    if !op.is_numeric() {
        return Err(WsjfError::InvalidOperator {
            op: op.code().to_owned(),
            context: "not applicable to numeric measurements".to_owned(),
        });
    }

    let (low_required, high_required) = op.limit_requirement();
    let low = if low_required {
        require(op, "low", &low)?
    } else {
        f64::NAN
    };
    let high = if high_required {
        require(op, "high", &high)?
    } else {
        f64::NAN
    };

    let passed = match op {
        CompOp::Log => true,
        CompOp::Eq => value == low,
        CompOp::Ne => value != low,
        CompOp::Gt => value > low,
        CompOp::Ge => value >= low,
        CompOp::Lt => value < low,
        CompOp::Le => value <= low,
        CompOp::GtLt => value > low && value < high,
        CompOp::GtLe => value > low && value <= high,
        CompOp::GeLt => value >= low && value < high,
        CompOp::GeLe => value >= low && value <= high,
        CompOp::LtGt => value < low || value > high,
        CompOp::LtGe => value < low || value >= high,
        CompOp::LeGt => value <= low || value > high,
        CompOp::LeGe => value <= low || value >= high,
        // rejected above
        CompOp::IgnoreCase | CompOp::CaseSensitive => false,
    };
    Ok(passed)
}

pub(crate) fn compare_string(op: CompOp, value: &str, limit: Option<&str>) -> Result<bool, WsjfError> {
    let limit = || {
        limit.ok_or(WsjfError::MissingLimit {
            op: op.code().to_owned(),
            bound: "limit",
        })
    };

    if !op.is_string() {
        return Err(WsjfError::InvalidOperator {
            op: op.code().to_owned(),
            context: "not applicable to string measurements".to_owned(),
        });
    }

    match op {
        CompOp::Log => Ok(true),
        CompOp::Ne => Ok(value != limit()?),
        CompOp::IgnoreCase => Ok(value.to_lowercase() == limit()?.to_lowercase()),
        _ => Ok(value == limit()?),
    }
}

/// Numeric limit measurement, owned by a numeric limit step.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericMeasurement {
    pub(crate) index: usize,
    pub(crate) name: Option<String>,
    pub(crate) status: StepStatus,
    pub(crate) value: Formatted<f64>,
    pub(crate) comparison: Comparison,
    pub(crate) low_limit: Option<Formatted<f64>>,
    pub(crate) high_limit: Option<Formatted<f64>>,
    pub(crate) unit: Option<String>,
    pub(crate) extensions: wsjf::Extensions,
}

impl NumericMeasurement {
    pub fn value(&self) -> f64 {
        self.value.value
    }

    pub fn formatted_value(&self) -> &Formatted<f64> {
        &self.value
    }

    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }

    pub fn low_limit(&self) -> Option<&Formatted<f64>> {
        self.low_limit.as_ref()
    }

    pub fn high_limit(&self) -> Option<&Formatted<f64>> {
        self.high_limit.as_ref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn extensions(&self) -> &wsjf::Extensions {
        &self.extensions
    }
}

impl Measure for NumericMeasurement {
    type Test = NumericTest;

    fn create(test: NumericTest, index: usize, name: Option<String>) -> Result<Self, WsjfError> {
        let passed = compare_numeric(
            test.comp_op,
            test.value.value,
            test.low_limit.as_ref().map(|l| l.value),
            test.high_limit.as_ref().map(|h| h.value),
        )?;

        Ok(NumericMeasurement {
            index,
            name,
            status: status_of(passed),
            value: test.value,
            comparison: Comparison::Known(test.comp_op),
            low_limit: test.low_limit,
            high_limit: test.high_limit,
            unit: test.unit,
            extensions: wsjf::Extensions::new(),
        })
    }

    fn index(&self) -> usize {
        self.index
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn status(&self) -> StepStatus {
        self.status
    }

    fn leaf(kind: &StepKind) -> Option<&tr::LeafData<Self>> {
        match kind {
            StepKind::NumericLimit(leaf) => Some(leaf),
            _ => None,
        }
    }

    fn leaf_mut(kind: &mut StepKind) -> Option<&mut tr::LeafData<Self>> {
        match kind {
            StepKind::NumericLimit(leaf) => Some(leaf),
            _ => None,
        }
    }
}

/// Pass/fail measurement, owned by a pass/fail step.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanMeasurement {
    pub(crate) index: usize,
    pub(crate) name: Option<String>,
    pub(crate) status: StepStatus,
    pub(crate) value: bool,
    pub(crate) extensions: wsjf::Extensions,
}

impl BooleanMeasurement {
    pub fn value(&self) -> bool {
        self.value
    }

    pub fn extensions(&self) -> &wsjf::Extensions {
        &self.extensions
    }
}

impl Measure for BooleanMeasurement {
    type Test = bool;

    fn create(value: bool, index: usize, name: Option<String>) -> Result<Self, WsjfError> {
        Ok(BooleanMeasurement {
            index,
            name,
            status: status_of(value),
            value,
            extensions: wsjf::Extensions::new(),
        })
    }

    fn index(&self) -> usize {
        self.index
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn status(&self) -> StepStatus {
        self.status
    }

    fn leaf(kind: &StepKind) -> Option<&tr::LeafData<Self>> {
        match kind {
            StepKind::PassFail(leaf) => Some(leaf),
            _ => None,
        }
    }

    fn leaf_mut(kind: &mut StepKind) -> Option<&mut tr::LeafData<Self>> {
        match kind {
            StepKind::PassFail(leaf) => Some(leaf),
            _ => None,
        }
    }
}

/// String value measurement, owned by a string value step.
#[derive(Debug, Clone, PartialEq)]
pub struct StringMeasurement {
    pub(crate) index: usize,
    pub(crate) name: Option<String>,
    pub(crate) status: StepStatus,
    pub(crate) value: String,
    pub(crate) comparison: Comparison,
    pub(crate) limit: Option<String>,
    pub(crate) extensions: wsjf::Extensions,
}

impl StringMeasurement {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }

    pub fn limit(&self) -> Option<&str> {
        self.limit.as_deref()
    }

    pub fn extensions(&self) -> &wsjf::Extensions {
        &self.extensions
    }
}

impl Measure for StringMeasurement {
    type Test = StringTest;

    fn create(test: StringTest, index: usize, name: Option<String>) -> Result<Self, WsjfError> {
        let passed = compare_string(test.comp_op, &test.value, test.limit.as_deref())?;

        Ok(StringMeasurement {
            index,
            name,
            status: status_of(passed),
            value: test.value,
            comparison: Comparison::Known(test.comp_op),
            limit: test.limit,
            extensions: wsjf::Extensions::new(),
        })
    }

    fn index(&self) -> usize {
        self.index
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn status(&self) -> StepStatus {
        self.status
    }

    fn leaf(kind: &StepKind) -> Option<&tr::LeafData<Self>> {
        match kind {
            StepKind::StringValue(leaf) => Some(leaf),
            _ => None,
        }
    }

    fn leaf_mut(kind: &mut StepKind) -> Option<&mut tr::LeafData<Self>> {
        match kind {
            StepKind::StringValue(leaf) => Some(leaf),
            _ => None,
        }
    }
}
