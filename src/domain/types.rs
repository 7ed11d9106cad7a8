//! Shared vocabulary: calibration results, rename maps, condition sets and plot sources.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Fitted RFU → MEFL conversion.
///
/// `signals[i]` (background-subtracted mean RFU) pairs with `molecules[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub signals: Vec<f64>,
    pub molecules: Vec<f64>,
}

impl CalibrationCurve {
    pub fn convert(&self, rfu: f64) -> f64 {
        rfu * self.slope + self.intercept
    }
}

/// Ordered mapping from well identifier to condition/sample name.
///
/// Several wells may map to the same name; they are then replicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    entries: Vec<(String, String)>,
}

impl RenameMap {
    /// Build from pairs. Later duplicates of a key are rejected.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = RenameMap::default();
        for (k, v) in pairs {
            map.insert(k.into(), v.into())?;
        }
        Ok(map)
    }

    fn insert(&mut self, key: String, value: String) -> Result<(), String> {
        if self.get(&key).is_some() {
            return Err(format!("duplicate rename_map key '{key}'"));
        }
        self.entries.push((key, value));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for RenameMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RenameMapVisitor;

        impl<'de> Visitor<'de> for RenameMapVisitor {
            type Value = RenameMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of well names to condition names")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = RenameMap::default();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    map.insert(key, value).map_err(serde::de::Error::custom)?;
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(RenameMapVisitor)
    }
}

/// Insertion-ordered, de-duplicated condition names used for replicate grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSet {
    names: Vec<String>,
}

impl ConditionSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !out.contains(&name) {
                out.push(name);
            }
        }
        Self { names: out }
    }

    /// Conditions in the order they first appear as rename-map targets.
    pub fn from_rename_map(map: &RenameMap) -> Self {
        Self::from_names(map.iter().map(|(_, v)| v))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Pairs `(shorter, longer)` where `longer` starts with `shorter`.
    ///
    /// Prefix grouping will count `longer`'s columns as replicates of `shorter` too.
    pub fn prefix_overlaps(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        for a in &self.names {
            for b in &self.names {
                if a != b && b.starts_with(a.as_str()) {
                    out.push((a.as_str(), b.as_str()));
                }
            }
        }
        out
    }
}

/// The tables the pipeline exposes to plot specifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlotSource {
    #[serde(rename = "normalized MEFL average")]
    NormalizedMeflAverage,
    #[serde(rename = "normalized MEFL replicates")]
    NormalizedMeflReplicates,
    #[serde(rename = "MEFL average")]
    MeflAverage,
    #[serde(rename = "MEFL replicates")]
    MeflReplicates,
    #[serde(rename = "normalized RFU average")]
    NormalizedRfuAverage,
    #[serde(rename = "normalized RFU replicates")]
    NormalizedRfuReplicates,
    #[serde(rename = "RFU average")]
    RfuAverage,
    #[serde(rename = "RFU replicates")]
    RfuReplicates,
    #[serde(rename = "OD average")]
    OdAverage,
    #[serde(rename = "OD replicates")]
    OdReplicates,
}

impl PlotSource {
    pub const ALL: [PlotSource; 10] = [
        PlotSource::NormalizedMeflAverage,
        PlotSource::NormalizedMeflReplicates,
        PlotSource::MeflAverage,
        PlotSource::MeflReplicates,
        PlotSource::NormalizedRfuAverage,
        PlotSource::NormalizedRfuReplicates,
        PlotSource::RfuAverage,
        PlotSource::RfuReplicates,
        PlotSource::OdAverage,
        PlotSource::OdReplicates,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PlotSource::NormalizedMeflAverage => "normalized MEFL average",
            PlotSource::NormalizedMeflReplicates => "normalized MEFL replicates",
            PlotSource::MeflAverage => "MEFL average",
            PlotSource::MeflReplicates => "MEFL replicates",
            PlotSource::NormalizedRfuAverage => "normalized RFU average",
            PlotSource::NormalizedRfuReplicates => "normalized RFU replicates",
            PlotSource::RfuAverage => "RFU average",
            PlotSource::RfuReplicates => "RFU replicates",
            PlotSource::OdAverage => "OD average",
            PlotSource::OdReplicates => "OD replicates",
        }
    }

    /// MEFL sources only exist when a calibration is configured.
    pub fn needs_calibration(self) -> bool {
        matches!(
            self,
            PlotSource::NormalizedMeflAverage
                | PlotSource::NormalizedMeflReplicates
                | PlotSource::MeflAverage
                | PlotSource::MeflReplicates
        )
    }

    /// Average sources only exist when conditions are configured.
    pub fn needs_conditions(self) -> bool {
        matches!(
            self,
            PlotSource::NormalizedMeflAverage
                | PlotSource::MeflAverage
                | PlotSource::NormalizedRfuAverage
                | PlotSource::RfuAverage
                | PlotSource::OdAverage
        )
    }
}

impl fmt::Display for PlotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
