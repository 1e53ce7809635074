//! CoverageJSON documents for gridded query responses.
//!
//! See: <https://covjson.org/>

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A CoverageJSON document containing coverage data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageJson {
    /// Document type (always "Coverage" for single coverage).
    #[serde(rename = "type")]
    pub type_: CoverageType,

    /// The domain defining the coverage's spatial/temporal extent.
    pub domain: Domain,

    /// Extent of the grid cells, `[minx, miny, maxx, maxy]` in the domain CRS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    /// Parameter definitions.
    pub parameters: HashMap<String, CovJsonParameter>,

    /// Data ranges for each parameter.
    pub ranges: HashMap<String, NdArray>,
}

impl CoverageJson {
    /// Create an empty coverage over a domain.
    pub fn new(domain: Domain) -> Self {
        Self {
            type_: CoverageType::Coverage,
            domain,
            bbox: None,
            parameters: HashMap::new(),
            ranges: HashMap::new(),
        }
    }

    /// Add a parameter with its values.
    pub fn with_parameter(mut self, name: &str, param: CovJsonParameter, values: NdArray) -> Self {
        self.parameters.insert(name.to_string(), param);
        self.ranges.insert(name.to_string(), values);
        self
    }
}

/// Coverage type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CoverageType {
    Coverage,
}

/// The domain of a coverage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Domain {
    /// Domain type (always "Domain").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(rename = "domainType")]
    pub domain_type: DomainType,

    /// Axis definitions keyed by axis label.
    pub axes: HashMap<String, Axis>,

    pub referencing: Vec<ReferenceSystemConnection>,
}

impl Domain {
    /// Create a grid domain from regular spatial axes.
    ///
    /// `crs` is the PROJ definition of the axes' coordinate system. A
    /// timestamp adds a single-valued `t` axis.
    pub fn grid(
        x_label: &str,
        x: Axis,
        y_label: &str,
        y: Axis,
        crs: &str,
        time: Option<String>,
    ) -> Self {
        let mut axes = HashMap::new();
        axes.insert(x_label.to_string(), x);
        axes.insert(y_label.to_string(), y);

        let mut referencing = vec![ReferenceSystemConnection {
            coordinates: vec![x_label.to_string(), y_label.to_string()],
            system: ReferenceSystem::Projected { id: crs.to_string() },
        }];

        if let Some(t) = time {
            axes.insert(
                "t".to_string(),
                Axis::Values {
                    values: vec![AxisValue::String(t)],
                },
            );
            referencing.push(ReferenceSystemConnection {
                coordinates: vec!["t".to_string()],
                system: ReferenceSystem::Temporal {
                    calendar: "Gregorian".to_string(),
                },
            });
        }

        Self {
            type_: "Domain".to_string(),
            domain_type: DomainType::Grid,
            axes,
            referencing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DomainType {
    Grid,
}

/// An axis in the domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Axis {
    /// Explicit list of values.
    Values { values: Vec<AxisValue> },
    /// Regular axis defined by start, stop, and number of points.
    Regular { start: f64, stop: f64, num: usize },
}

impl Axis {
    pub fn len(&self) -> usize {
        match self {
            Axis::Values { values } => values.len(),
            Axis::Regular { num, .. } => *num,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value on an axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AxisValue {
    Float(f64),
    String(String),
}

/// Connection between axes and their reference system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceSystemConnection {
    pub coordinates: Vec<String>,
    pub system: ReferenceSystem,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ReferenceSystem {
    /// Projected CRS identified by its PROJ definition.
    #[serde(rename = "ProjectedCRS")]
    Projected { id: String },

    #[serde(rename = "TemporalRS")]
    Temporal { calendar: String },
}

/// A parameter in CoverageJSON format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CovJsonParameter {
    /// Type (always "Parameter").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<HashMap<String, String>>,

    #[serde(rename = "observedProperty")]
    pub observed_property: ObservedProperty,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl CovJsonParameter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            type_: "Parameter".to_string(),
            description: None,
            observed_property: ObservedProperty {
                id: None,
                label: english(label.into()),
            },
            unit: None,
        }
    }

    pub fn with_unit(mut self, symbol: impl Into<String>) -> Self {
        self.unit = Some(Unit {
            symbol: symbol.into(),
        });
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(english(desc.into()));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservedProperty {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    pub symbol: String,
}

fn english(text: String) -> HashMap<String, String> {
    HashMap::from([("en".to_string(), text)])
}

/// N-dimensional array containing data values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NdArray {
    /// Type (always "NdArray").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(rename = "dataType")]
    pub data_type: String,

    /// Names of axes in order.
    #[serde(rename = "axisNames")]
    pub axis_names: Vec<String>,

    pub shape: Vec<usize>,

    /// Row-major values; null marks a masked pixel.
    pub values: Vec<Option<f32>>,
}

impl NdArray {
    pub fn with_missing(values: Vec<Option<f32>>, shape: Vec<usize>, axis_names: Vec<String>) -> Self {
        Self {
            type_: "NdArray".to_string(),
            data_type: "float".to_string(),
            axis_names,
            shape,
            values,
        }
    }
}
