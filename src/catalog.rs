//! Public datasets the dashboards know how to load.

use std::fmt;
use std::str::FromStr;

use crate::parser::SchemaHints;

/// Columns that hold categories even when their values look numeric.
const CATEGORICAL: &[&str] = &["borough", "day_type", "trip_type", "route_id", "period"];

/// Named public dataset on the New York State open data portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetId {
    /// MTA Bus Speeds: Beginning 2020.
    BusSpeeds,
    /// MTA Bus Customer Journey-Focused Metrics: Beginning 2020.
    CustomerJourney,
}

/// Catalog entry for a [`DatasetId`].
#[derive(Debug, Clone)]
pub struct DatasetInfo {
    pub id: DatasetId,
    pub name: &'static str,
    pub socrata_id: &'static str,
    pub description: &'static str,
}

impl DatasetId {
    pub const ALL: [DatasetId; 2] = [DatasetId::BusSpeeds, DatasetId::CustomerJourney];

    pub fn slug(self) -> &'static str {
        match self {
            DatasetId::BusSpeeds => "bus-speeds",
            DatasetId::CustomerJourney => "customer-journey",
        }
    }

    pub fn info(self) -> DatasetInfo {
        match self {
            DatasetId::BusSpeeds => DatasetInfo {
                id: self,
                name: "MTA Bus Speeds: Beginning 2020",
                socrata_id: "6ksi-7cxr",
                description: "Total mileage and operating time per route, trip type, \
                              period and month",
            },
            DatasetId::CustomerJourney => DatasetInfo {
                id: self,
                name: "MTA Bus Customer Journey-Focused Metrics: Beginning 2020",
                socrata_id: "wrt8-4b59",
                description: "Additional bus stop time, additional travel time and \
                              customer journey time performance per route, trip type, \
                              period and month",
            },
        }
    }

    /// Full CSV snapshot download URL on `base_url`
    /// (e.g. `https://data.ny.gov`).
    pub fn download_url(self, base_url: &str) -> String {
        format!(
            "{}/api/views/{}/rows.csv?accessType=DOWNLOAD&sorting=true",
            base_url.trim_end_matches('/'),
            self.info().socrata_id
        )
    }

    pub fn schema_hints(self) -> SchemaHints {
        SchemaHints::default().with_categorical(CATEGORICAL)
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for DatasetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetId::ALL
            .into_iter()
            .find(|id| id.slug() == s || id.info().socrata_id == s)
            .ok_or_else(|| format!("unknown dataset '{s}'"))
    }
}
