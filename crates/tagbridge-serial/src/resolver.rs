//! Serial port discovery for the reader.
//!
//! The Tappy presents as an ordinary USB serial adapter, so discovery is
//! heuristic: prefer ports whose manufacturer string names a known vendor,
//! fall back to USB-looking port paths, and finally to the first
//! enumerated port. Selection is a pure function over pre-enumerated
//! candidates; only [`resolve`] touches the host environment.

use serialport::{SerialPortInfo, SerialPortType};
use tagbridge_core::{
    Error, Result,
    constants::{USB_PATH_PATTERNS, VENDOR_TOKENS},
};
use tracing::debug;

/// One enumerated port, reduced to the fields the heuristics need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    /// Platform port path, e.g. `/dev/tty.usbserial-0001` or `COM3`.
    pub path: String,

    /// USB manufacturer string, when the platform reports one.
    pub manufacturer: Option<String>,
}

impl PortCandidate {
    pub fn new(path: impl Into<String>, manufacturer: Option<String>) -> Self {
        Self {
            path: path.into(),
            manufacturer,
        }
    }
}

impl From<SerialPortInfo> for PortCandidate {
    fn from(info: SerialPortInfo) -> Self {
        let manufacturer = match info.port_type {
            SerialPortType::UsbPort(usb) => usb.manufacturer,
            _ => None,
        };
        PortCandidate {
            path: info.port_name,
            manufacturer,
        }
    }
}

/// Enumerate the host's serial ports and pick the reader.
///
/// # Errors
///
/// - `Error::ConnectionFailed` if the platform enumeration call itself
///   fails (surfaced, not retried here).
/// - `Error::DeviceNotFound` if no port is available at all.
pub fn resolve() -> Result<String> {
    let ports = serialport::available_ports()
        .map_err(|e| Error::ConnectionFailed(format!("port enumeration failed: {e}")))?;

    debug!(
        ports = ?ports.iter().map(|p| p.port_name.as_str()).collect::<Vec<_>>(),
        "enumerated serial ports"
    );

    let candidates: Vec<PortCandidate> = ports.into_iter().map(PortCandidate::from).collect();

    select_port(&candidates)
        .ok_or_else(|| Error::DeviceNotFound("no serial ports available".to_string()))
}

/// Apply the selection heuristics to a candidate list.
///
/// Priority order:
/// 1. manufacturer string contains a known vendor token (case-insensitive)
/// 2. port path contains a USB serial adapter pattern
/// 3. the first enumerated port, if any
#[must_use]
pub fn select_port(candidates: &[PortCandidate]) -> Option<String> {
    let by_vendor = candidates.iter().find(|c| {
        c.manufacturer.as_deref().is_some_and(|m| {
            let m = m.to_lowercase();
            VENDOR_TOKENS.iter().any(|token| m.contains(token))
        })
    });
    if let Some(found) = by_vendor {
        return Some(found.path.clone());
    }

    let by_path = candidates
        .iter()
        .find(|c| USB_PATH_PATTERNS.iter().any(|p| c.path.contains(p)));
    if let Some(found) = by_path {
        return Some(found.path.clone());
    }

    candidates.first().map(|c| c.path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn candidate(path: &str, manufacturer: Option<&str>) -> PortCandidate {
        PortCandidate::new(path, manufacturer.map(String::from))
    }

    #[test]
    fn test_empty_list_yields_none() {
        assert_eq!(select_port(&[]), None);
    }

    #[rstest]
    #[case("FTDI")]
    #[case("ftdi")]
    #[case("Future Technology Devices (FTDI)")]
    #[case("TapTrack")]
    #[case("TAPTRACK LTD")]
    fn test_vendor_match_is_case_insensitive(#[case] manufacturer: &str) {
        let candidates = vec![
            candidate("/dev/ttyS0", Some("Acme Modems")),
            candidate("/dev/ttyUSB3", Some(manufacturer)),
        ];

        assert_eq!(select_port(&candidates), Some("/dev/ttyUSB3".to_string()));
    }

    #[test]
    fn test_vendor_beats_path_pattern() {
        let candidates = vec![
            candidate("/dev/tty.usbserial-0001", None),
            candidate("/dev/ttyS1", Some("FTDI")),
        ];

        assert_eq!(select_port(&candidates), Some("/dev/ttyS1".to_string()));
    }

    #[rstest]
    #[case("/dev/tty.usbserial-0001")]
    #[case("/dev/ttyUSB0")]
    fn test_usb_path_fallback(#[case] path: &str) {
        let candidates = vec![
            candidate("/dev/ttyS0", None),
            candidate(path, Some("Unrelated Corp")),
        ];

        assert_eq!(select_port(&candidates), Some(path.to_string()));
    }

    #[test]
    fn test_first_port_fallback() {
        let candidates = vec![
            candidate("/dev/ttyS0", None),
            candidate("/dev/ttyS1", Some("Acme Modems")),
        ];

        assert_eq!(select_port(&candidates), Some("/dev/ttyS0".to_string()));
    }

    #[test]
    fn test_candidate_from_non_usb_port_has_no_manufacturer() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: SerialPortType::PciPort,
        };

        let candidate = PortCandidate::from(info);
        assert_eq!(candidate.manufacturer, None);
        assert_eq!(candidate.path, "/dev/ttyS0");
    }
}
