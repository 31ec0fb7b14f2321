//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::time::Duration;

use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use serde::Serialize;

/// A collectd value list with a single data source.
///
/// https://collectd.org/wiki/index.php/Value_list
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueList {
    pub host: String,
    pub plugin: String,
    pub plugin_instance: Option<String>,
    #[serde(rename = "type")]
    pub type_str: String,
    pub type_instance: Option<String>,
    pub time: DateTime<Utc>,
    pub interval: Duration,
    pub value: f64,
}

impl ValueList {
    /// `host/plugin[-plugin_instance]/type[-type_instance]`
    ///
    /// https://collectd.org/wiki/index.php/Identifier
    pub fn identifier(&self) -> Result<String> {
        Self::check_part("host", &self.host, true)?;
        Self::check_part("plugin", &self.plugin, false)?;
        Self::check_part("type", &self.type_str, false)?;

        let mut identifier = format!("{}/{}", self.host, self.plugin);
        if let Some(plugin_instance) = Self::instance("plugin instance", &self.plugin_instance)? {
            identifier.push('-');
            identifier.push_str(plugin_instance);
        }
        identifier.push('/');
        identifier.push_str(&self.type_str);
        if let Some(type_instance) = Self::instance("type instance", &self.type_instance)? {
            identifier.push('-');
            identifier.push_str(type_instance);
        }
        Ok(identifier)
    }

    fn instance<'a>(name: &str, instance: &'a Option<String>) -> Result<Option<&'a str>> {
        match instance.as_deref() {
            None | Some("") => Ok(None),
            Some(instance) => {
                Self::check_part(name, instance, true)?;
                Ok(Some(instance))
            }
        }
    }

    /// Collectd splits plugin and type from their instance at the first dash.
    fn check_part(name: &str, part: &str, allow_dash: bool) -> Result<()> {
        if part.is_empty() {
            return Err(eyre!("Empty {} in value list", name));
        }
        if part.contains(['/', '"']) || (!allow_dash && part.contains('-')) {
            return Err(eyre!("Invalid {} in value list: {}", name, part));
        }
        Ok(())
    }
}
