// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::report::{trait_ext::VecExt, WsjfError};
use crate::wsjf;

/// Wire step type of steps created by `add_chart_step`.
pub const CHART_STEP_CODE: &str = "WATS_XYGMNLT";

const XY_DATA_TYPE: &str = "XYG";

/// Chart attached to a step, e.g. a temperature profile.
///
/// # Examples
///
/// ```rust
/// # use tdm::report::*;
/// let chart = Chart::new("Line")
///     .label("Temperature vs time")
///     .x_axis("Time", "s")
///     .y_axis("Temperature", "C")
///     .series(ChartSeries::new("oven", &[0.0, 1.0, 2.0], &[21.0, 40.5, 60.0]));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chart {
    /// "Line", "LineLogX", "LineLogY" or "LineLogXY"; other values are
    /// passed through.
    pub chart_type: Option<String>,
    pub label: Option<String>,
    pub x_label: Option<String>,
    pub x_unit: Option<String>,
    pub y_label: Option<String>,
    pub y_unit: Option<String>,
    pub(crate) series: Vec<ChartSeries>,
    pub(crate) extensions: wsjf::Extensions,
}

impl Chart {
    pub fn new(chart_type: &str) -> Self {
        Chart {
            chart_type: Some(chart_type.to_owned()),
            ..Default::default()
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_owned());
        self
    }

    pub fn x_axis(mut self, label: &str, unit: &str) -> Self {
        self.x_label = Some(label.to_owned());
        self.x_unit = Some(unit.to_owned());
        self
    }

    pub fn y_axis(mut self, label: &str, unit: &str) -> Self {
        self.y_label = Some(label.to_owned());
        self.y_unit = Some(unit.to_owned());
        self
    }

    pub fn series(mut self, series: ChartSeries) -> Self {
        self.series.push(series);
        self
    }

    pub fn all_series(&self) -> &[ChartSeries] {
        &self.series
    }

    pub(crate) fn to_wsjf(&self) -> wsjf::Chart {
        wsjf::Chart {
            chart_type: self.chart_type.clone(),
            label: self.label.clone(),
            x_label: self.x_label.clone(),
            x_unit: self.x_unit.clone(),
            y_label: self.y_label.clone(),
            y_unit: self.y_unit.clone(),
            series: self.series.map_option(ChartSeries::to_wsjf),
            extensions: self.extensions.clone(),
        }
    }

    pub(crate) fn from_wsjf(wire: wsjf::Chart) -> Self {
        Chart {
            chart_type: wire.chart_type,
            label: wire.label,
            x_label: wire.x_label,
            x_unit: wire.x_unit,
            y_label: wire.y_label,
            y_unit: wire.y_unit,
            series: wire
                .series
                .unwrap_or_default()
                .into_iter()
                .map(ChartSeries::from_wsjf)
                .collect(),
            extensions: wire.extensions,
        }
    }
}

/// One series of a chart. Coordinates are kept in their `;` separated
/// wire text so decoded charts encode back unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSeries {
    pub data_type: Option<String>,
    pub name: Option<String>,
    pub x_data: Option<String>,
    pub y_data: Option<String>,
    pub(crate) extensions: wsjf::Extensions,
}

impl ChartSeries {
    pub fn new(name: &str, xs: &[f64], ys: &[f64]) -> Self {
        ChartSeries {
            data_type: Some(XY_DATA_TYPE.to_owned()),
            name: Some(name.to_owned()),
            x_data: Some(join(xs)),
            y_data: Some(join(ys)),
            extensions: wsjf::Extensions::new(),
        }
    }

    pub fn x_values(&self) -> Result<Vec<f64>, WsjfError> {
        split(self.x_data.as_deref())
    }

    pub fn y_values(&self) -> Result<Vec<f64>, WsjfError> {
        split(self.y_data.as_deref())
    }

    fn to_wsjf(&self) -> wsjf::ChartSeries {
        wsjf::ChartSeries {
            data_type: self.data_type.clone(),
            name: self.name.clone(),
            x_data: self.x_data.clone(),
            y_data: self.y_data.clone(),
            extensions: self.extensions.clone(),
        }
    }

    fn from_wsjf(wire: wsjf::ChartSeries) -> Self {
        ChartSeries {
            data_type: wire.data_type,
            name: wire.name,
            x_data: wire.x_data,
            y_data: wire.y_data,
            extensions: wire.extensions,
        }
    }
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

fn split(data: Option<&str>) -> Result<Vec<f64>, WsjfError> {
    data.unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<f64>().map_err(|e| {
                WsjfError::SchemaViolation(format!("invalid chart coordinate '{v}': {e}"))
            })
        })
        .collect()
}
