//! Structures of the upstream warning feed.
//!
//! A feed is a JSON array of CAP (Common Alerting Protocol) alerts. Only the fields
//! the bot displays or matches on are modelled; everything else is ignored.
//!
//! ```json
//! [
//!   {
//!     "identifier": "mow.DE-BY-A-W083-20200828-000",
//!     "info": [{
//!       "headline": "Gefahrendurchsage",
//!       "description": "...",
//!       "instruction": "...",
//!       "severity": "Minor",
//!       "effective": "2020-08-28T11:00:00+02:00",
//!       "expires": "2020-08-28T17:00:00+02:00",
//!       "area": [{ "areaDesc": "Stadt Würzburg", "polygon": ["9.9,49.7 9.95,49.8 9.9,49.8 9.9,49.7"] }]
//!     }]
//!   }
//! ]
//! ```

use std::fmt;

use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub identifier: String,
    #[serde(default)]
    pub info: Vec<InfoRecord>,
}

impl fmt::Display for AlertRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "identifier={}, infos={}", self.identifier, self.info.len())
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct InfoRecord {
    pub headline: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub severity: Option<String>,
    pub effective: Option<String>,
    pub expires: Option<String>,
    #[serde(default)]
    pub area: Vec<AreaRecord>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AreaRecord {
    #[serde(default)]
    pub area_desc: String,
    /// Space separated `lon,lat` pairs, one string per polygon.
    #[serde(default)]
    pub polygon: Vec<String>,
}
