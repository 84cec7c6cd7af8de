//! Validation of bus requests.
//!
//! Each HAN command accepts a slightly different set of request fields.
//! A request that fails validation is dropped; nothing is queued.

use hanbridge_core::{
    Error, HanCommand, OutputLevel, Result,
    constants::{MAX_HAN_DEVICE, REQUEST_CURRENT},
    parse_decimal,
};
use hanbridge_protocol::HanRequest;

use crate::bus::BusRequest;
use crate::registry::ServiceEntry;

/// Work out what `request` asks of `service`.
///
/// # Errors
///
/// Returns `Error::MissingField` or `Error::InvalidField` naming the first
/// field that fails.
///
/// # Example
///
/// ```
/// use hanbridge_gateway::{BusRequest, ServiceDefinition, ServiceEntry, request};
/// use hanbridge_core::OutputLevel;
/// use hanbridge_protocol::HanRequest;
///
/// let lamp = ServiceEntry::from_definition(&ServiceDefinition {
///     name: "lamp".into(),
///     instance: "lamp".into(),
///     address: Some(10),
///     class: Some("control".into()),
///     service_type: Some("basic".into()),
///     han_command: Some("gout".into()),
///     ..Default::default()
/// })
/// .unwrap();
///
/// let on = BusRequest::new("lamp", "control", "basic")
///     .with_field("device", "1")
///     .with_field("type", "output")
///     .with_field("current", "high");
/// assert_eq!(request::validate(&lamp, &on).unwrap(), HanRequest::SetOutput(OutputLevel::High));
/// ```
pub fn validate(service: &ServiceEntry, request: &BusRequest) -> Result<HanRequest> {
    match service.command {
        HanCommand::Gout => output_request(service, request),
        HanCommand::Gacd => {
            require_current(request)?;
            Ok(HanRequest::Read)
        }
        _ => {
            let req = required(request, "request")?;
            if let Some(device) = request.field("device")
                && parse_decimal(device) != Some(0)
            {
                return Err(Error::invalid_field("device", "device=0 is required"));
            }
            expect_current(req)?;
            Ok(HanRequest::Read)
        }
    }
}

fn output_request(service: &ServiceEntry, request: &BusRequest) -> Result<HanRequest> {
    let device = required(request, "device")?;
    match parse_decimal(device) {
        Some(dev) if dev <= MAX_HAN_DEVICE => {}
        _ => {
            return Err(Error::invalid_field(
                "device",
                format!("bad device number: {device}"),
            ));
        }
    }

    if service.is_sensor {
        require_current(request)?;
        return Ok(HanRequest::Read);
    }

    let output_type = required(request, "type")?;
    let current = required(request, "current")?;

    if output_type != "output" {
        return Err(Error::invalid_field("type", "type must be 'output'"));
    }

    OutputLevel::parse(current)
        .map(HanRequest::SetOutput)
        .ok_or_else(|| Error::invalid_field("current", "current must be one of: high, low"))
}

fn required<'a>(request: &'a BusRequest, name: &str) -> Result<&'a str> {
    request
        .field(name)
        .ok_or_else(|| Error::MissingField(name.to_string()))
}

fn require_current(request: &BusRequest) -> Result<()> {
    expect_current(required(request, "request")?)
}

fn expect_current(value: &str) -> Result<()> {
    if value != REQUEST_CURRENT {
        return Err(Error::invalid_field(
            "request",
            "only the 'current' request is supported",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceDefinition;
    use rstest::rstest;

    fn service(command: &str, class: &str, units: Option<&str>) -> ServiceEntry {
        ServiceEntry::from_definition(&ServiceDefinition {
            name: "svc".to_string(),
            instance: "svc".to_string(),
            address: Some(1),
            class: Some(class.to_string()),
            service_type: Some("basic".to_string()),
            han_command: Some(command.to_string()),
            units: units.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    fn req(fields: &[(&str, &str)]) -> BusRequest {
        fields
            .iter()
            .fold(BusRequest::new("svc", "x", "basic"), |r, (k, v)| {
                r.with_field(*k, *v)
            })
    }

    #[rstest]
    #[case(&[("device", "0"), ("type", "output"), ("current", "low")], HanRequest::SetOutput(OutputLevel::Low))]
    #[case(&[("device", "16"), ("type", "output"), ("current", "high")], HanRequest::SetOutput(OutputLevel::High))]
    fn test_output_control(#[case] fields: &[(&str, &str)], #[case] expected: HanRequest) {
        let lamp = service("gout", "control", None);
        assert_eq!(validate(&lamp, &req(fields)).unwrap(), expected);
    }

    #[rstest]
    #[case(&[("type", "output"), ("current", "high")])]
    #[case(&[("device", "17"), ("type", "output"), ("current", "high")])]
    #[case(&[("device", "+1"), ("type", "output"), ("current", "high")])]
    #[case(&[("device", "1"), ("current", "high")])]
    #[case(&[("device", "1"), ("type", "output")])]
    #[case(&[("device", "1"), ("type", "relay"), ("current", "high")])]
    #[case(&[("device", "1"), ("type", "output"), ("current", "on")])]
    fn test_output_control_rejected(#[case] fields: &[(&str, &str)]) {
        let lamp = service("gout", "control", None);
        assert!(validate(&lamp, &req(fields)).is_err());
    }

    #[test]
    fn test_output_sensor_reads_status() {
        let input = service("gout", "sensor", Some("output"));
        let ok = req(&[("device", "1"), ("request", "current")]);
        assert_eq!(validate(&input, &ok).unwrap(), HanRequest::Read);

        let write = req(&[("device", "1"), ("type", "output"), ("current", "high")]);
        assert!(matches!(
            validate(&input, &write),
            Err(Error::MissingField(field)) if field == "request"
        ));
    }

    #[test]
    fn test_ac_line_ignores_device() {
        let meter = service("gacd", "sensor", Some("volts"));
        let ok = req(&[("request", "current"), ("device", "7")]);
        assert_eq!(validate(&meter, &ok).unwrap(), HanRequest::Read);
        assert!(validate(&meter, &req(&[])).is_err());
    }

    #[rstest]
    #[case(&[("request", "current")], true)]
    #[case(&[("request", "current"), ("device", "0")], true)]
    #[case(&[("request", "current"), ("device", "1")], false)]
    #[case(&[("request", "current"), ("device", "zero")], false)]
    #[case(&[("request", "last")], false)]
    #[case(&[("device", "0")], false)]
    fn test_sensor_read(#[case] fields: &[(&str, &str)], #[case] accepted: bool) {
        let porch = service("gtmp", "sensor", Some("celsius"));
        assert_eq!(validate(&porch, &req(fields)).is_ok(), accepted);
    }
}
