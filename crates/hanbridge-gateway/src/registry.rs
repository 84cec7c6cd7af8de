//! Service registry.
//!
//! Every configured service becomes one [`ServiceEntry`] held in a vector,
//! in configuration order. Entries are addressed by [`ServiceId`], an index
//! into that vector, so queue entries and the pending request can refer to
//! their service without borrowing it.
//!
//! The set of services is fixed after load. Only the poll counter and the
//! change-detection cache of an entry change at runtime.

use hanbridge_core::{
    Address, Channel, Error, HanCommand, Result, Unit,
    constants::{MAX_POLL_INTERVAL, SENSOR_CLASS},
};
use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use tracing::debug;

use crate::config::ServiceDefinition;

/// Index of a service in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceId(usize);

impl ServiceId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One configured virtual device or sensor.
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub name: String,
    pub instance_id: String,
    instance_hash: u64,
    pub address: Address,
    pub command: HanCommand,
    pub channel: Channel,
    pub units: Unit,
    pub is_sensor: bool,

    /// Seconds between polls, 0 when polling is off
    pub polling_interval: u32,

    /// Ticks left until the next poll
    pub(crate) poll_counter: u32,

    /// Last polled integer reading
    pub(crate) last_int: Option<i32>,

    /// Last polled floating point reading
    pub(crate) last_float: Option<f32>,

    /// Bus schema class the service answers to
    pub class: String,

    /// Bus schema type the service answers to
    pub schema_type: String,
}

impl ServiceEntry {
    /// Build an entry from its definition, applying the load rules.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the service for any missing or
    /// out-of-range key.
    pub fn from_definition(def: &ServiceDefinition) -> Result<Self> {
        let missing = |key: &str| Error::MissingConfig {
            service: def.name.clone(),
            key: key.to_string(),
        };

        if def.name.is_empty() {
            return Err(Error::config("service without a name"));
        }
        if def.instance.is_empty() {
            return Err(missing("instance"));
        }

        let address = Address::new(def.address.ok_or_else(|| missing("address"))?)?;
        let class = def.class.clone().ok_or_else(|| missing("class"))?;
        let schema_type = def.service_type.clone().ok_or_else(|| missing("type"))?;
        let command = HanCommand::parse(
            def.han_command
                .as_deref()
                .ok_or_else(|| missing("han-command"))?,
        )?;

        let is_sensor = class == SENSOR_CLASS;
        let units = match (&def.units, is_sensor) {
            (Some(keyword), _) => Unit::parse(keyword)?,
            (None, true) => return Err(missing("units")),
            (None, false) => command.default_unit(),
        };

        let polling_interval = match def.polling_interval {
            Some(_) if !is_sensor => {
                return Err(Error::config(format!(
                    "In service {}, a polling-interval is specified for non-sensor service",
                    def.name
                )));
            }
            Some(interval) if interval > MAX_POLL_INTERVAL => {
                return Err(Error::config(format!(
                    "In service {}, polling-interval must be between 0 and {MAX_POLL_INTERVAL}",
                    def.name
                )));
            }
            Some(interval) => interval,
            None => 0,
        };

        let channel = match def.channel {
            Some(channel) => Channel::new(channel)?,
            None => Channel::default(),
        };

        Ok(Self {
            name: def.name.clone(),
            instance_hash: hash_instance(&def.instance),
            instance_id: def.instance.clone(),
            address,
            command,
            channel,
            units,
            is_sensor,
            polling_interval,
            poll_counter: 0,
            last_int: None,
            last_float: None,
            class,
            schema_type,
        })
    }

    fn matches(&self, hash: u64, instance_id: &str) -> bool {
        self.instance_hash == hash && self.instance_id == instance_id
    }
}

fn hash_instance(instance_id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    instance_id.hash(&mut hasher);
    hasher.finish()
}

/// All configured services, in configuration order.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Vec<ServiceEntry>,
}

impl ServiceRegistry {
    /// Build and validate the registry.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found. Every error from this
    /// function is fatal at start-up.
    pub fn from_definitions(defs: &[ServiceDefinition]) -> Result<Self> {
        let mut names = HashSet::new();
        let mut instances = HashSet::new();
        let mut services = Vec::with_capacity(defs.len());

        for def in defs {
            if !names.insert(def.name.as_str()) {
                return Err(Error::Duplicate {
                    what: "service name",
                    value: def.name.clone(),
                });
            }
            if !instances.insert(def.instance.as_str()) {
                return Err(Error::Duplicate {
                    what: "instance id",
                    value: def.instance.clone(),
                });
            }

            let entry = ServiceEntry::from_definition(def)?;
            debug!(
                service = %entry.name,
                instance = %entry.instance_id,
                address = %entry.address,
                command = %entry.command,
                "Loaded service"
            );
            services.push(entry);
        }

        let registry = Self { services };
        registry.validate()?;
        Ok(registry)
    }

    /// Check every sensor's units against its command's valid units.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnitMismatch` for the first sensor that fails.
    pub fn validate(&self) -> Result<()> {
        for entry in self.services.iter().filter(|e| e.is_sensor) {
            if !entry.command.accepts_unit(entry.units) {
                return Err(Error::UnitMismatch {
                    instance: entry.instance_id.clone(),
                    command: entry.command.to_string(),
                    unit: entry.units.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Find a service by bus instance ID.
    pub fn lookup(&self, instance_id: &str) -> Option<ServiceId> {
        let hash = hash_instance(instance_id);
        self.services
            .iter()
            .position(|entry| entry.matches(hash, instance_id))
            .map(ServiceId)
    }

    pub fn get(&self, id: ServiceId) -> Option<&ServiceEntry> {
        self.services.get(id.0)
    }

    pub fn get_mut(&mut self, id: ServiceId) -> Option<&mut ServiceEntry> {
        self.services.get_mut(id.0)
    }

    /// Services with their IDs, in configuration order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (ServiceId, &ServiceEntry)> {
        self.services
            .iter()
            .enumerate()
            .map(|(i, entry)| (ServiceId(i), entry))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (ServiceId, &mut ServiceEntry)> {
        self.services
            .iter_mut()
            .enumerate()
            .map(|(i, entry)| (ServiceId(i), entry))
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sensor(name: &str, command: &str, units: &str) -> ServiceDefinition {
        ServiceDefinition {
            name: name.to_string(),
            instance: format!("{name}-id"),
            address: Some(10),
            class: Some("sensor".to_string()),
            service_type: Some("basic".to_string()),
            han_command: Some(command.to_string()),
            units: Some(units.to_string()),
            polling_interval: None,
            channel: None,
        }
    }

    fn control(name: &str, command: &str) -> ServiceDefinition {
        ServiceDefinition {
            class: Some("control".to_string()),
            units: None,
            ..sensor(name, command, "")
        }
    }

    #[test]
    fn test_load_and_lookup() {
        let registry = ServiceRegistry::from_definitions(&[
            sensor("porch", "gtmp", "celsius"),
            control("lamp", "gout"),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        let lamp = registry.lookup("lamp-id").unwrap();
        assert_eq!(lamp.index(), 1);

        let entry = registry.get(lamp).unwrap();
        assert!(!entry.is_sensor);
        assert_eq!(entry.units, Unit::Output);
        assert_eq!(entry.channel.as_u8(), 0);

        assert!(registry.lookup("nobody").is_none());
        assert!(registry.lookup("LAMP-ID").is_none());
    }

    #[test]
    fn test_non_sensor_defaults_to_first_valid_unit() {
        let registry = ServiceRegistry::from_definitions(&[control("meter", "gacd")]).unwrap();
        assert_eq!(registry.iter().next().unwrap().1.units, Unit::Volts);
    }

    #[test]
    fn test_sensor_requires_units() {
        let mut def = sensor("porch", "gtmp", "celsius");
        def.units = None;
        assert!(matches!(
            ServiceRegistry::from_definitions(&[def]),
            Err(Error::MissingConfig { key, .. }) if key == "units"
        ));
    }

    #[rstest]
    #[case("gtmp", "volts")]
    #[case("gwsp", "mm.")]
    #[case("grgc", "kmh")]
    fn test_unit_mismatch_is_fatal(#[case] command: &str, #[case] units: &str) {
        let err = ServiceRegistry::from_definitions(&[sensor("s", command, units)]).unwrap_err();
        assert!(matches!(err, Error::UnitMismatch { .. }));
        assert!(err.is_fatal());
    }

    #[rstest]
    #[case("gtmp", "celsius")]
    #[case("gtmp", "fahrenheit")]
    #[case("gacd", "hertz")]
    #[case("ghum", "%rh")]
    #[case("gwdr", "wdirmap")]
    #[case("grgc", "in.")]
    fn test_valid_sensor_units(#[case] command: &str, #[case] units: &str) {
        assert!(ServiceRegistry::from_definitions(&[sensor("s", command, units)]).is_ok());
    }

    #[test]
    fn test_duplicates_rejected() {
        let a = sensor("porch", "gtmp", "celsius");
        let mut b = sensor("porch", "gtmp", "celsius");
        b.instance = "other".to_string();
        assert!(matches!(
            ServiceRegistry::from_definitions(&[a.clone(), b]),
            Err(Error::Duplicate { what: "service name", .. })
        ));

        let mut c = sensor("garage", "gtmp", "celsius");
        c.instance = a.instance.clone();
        assert!(matches!(
            ServiceRegistry::from_definitions(&[a, c]),
            Err(Error::Duplicate { what: "instance id", .. })
        ));
    }

    #[rstest]
    #[case(Some(255), None, None)]
    #[case(None, None, None)]
    #[case(Some(1), Some(16), None)]
    #[case(Some(1), None, Some(604_801))]
    fn test_range_checks(
        #[case] address: Option<u32>,
        #[case] channel: Option<u32>,
        #[case] polling_interval: Option<u32>,
    ) {
        let def = ServiceDefinition {
            address,
            channel,
            polling_interval,
            ..sensor("s", "gtmp", "celsius")
        };
        assert!(ServiceRegistry::from_definitions(&[def]).unwrap_err().is_fatal());
    }

    #[test]
    fn test_polling_interval_only_for_sensors() {
        let def = ServiceDefinition {
            polling_interval: Some(10),
            ..control("lamp", "gout")
        };
        assert!(matches!(
            ServiceRegistry::from_definitions(&[def]),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_unknown_command_and_unit() {
        assert!(matches!(
            ServiceRegistry::from_definitions(&[sensor("s", "gfoo", "celsius")]),
            Err(Error::UnknownCommand { .. })
        ));
        assert!(matches!(
            ServiceRegistry::from_definitions(&[sensor("s", "gtmp", "kelvin")]),
            Err(Error::UnknownUnit { .. })
        ));
    }

    #[test]
    fn test_missing_class_and_type() {
        let def = ServiceDefinition {
            class: None,
            ..sensor("s", "gtmp", "celsius")
        };
        assert!(matches!(
            ServiceRegistry::from_definitions(&[def]),
            Err(Error::MissingConfig { key, .. }) if key == "class"
        ));

        let def = ServiceDefinition {
            service_type: None,
            ..sensor("s", "gtmp", "celsius")
        };
        assert!(matches!(
            ServiceRegistry::from_definitions(&[def]),
            Err(Error::MissingConfig { key, .. }) if key == "type"
        ));
    }
}
