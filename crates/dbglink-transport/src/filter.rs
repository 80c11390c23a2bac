use serde::Serialize;

/// Interface class advertised by the debug interface (vendor specific).
pub const DEBUG_CLASS: u8 = 0xFF;
/// Interface subclass advertised by the debug interface.
pub const DEBUG_SUBCLASS: u8 = 0xFF;
/// Interface protocol advertised by the debug interface.
pub const DEBUG_PROTOCOL: u8 = 0x51;

/// Selects which attached device and interface to claim.
///
/// The class/subclass/protocol triple identifies the protocol. Vendor and
/// product ids differ between device builds and are optional narrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self {
            vendor_id: None,
            product_id: None,
            class: DEBUG_CLASS,
            subclass: DEBUG_SUBCLASS,
            protocol: DEBUG_PROTOCOL,
        }
    }
}

impl DeviceFilter {
    /// True if a device descriptor passes the optional id filters.
    pub fn matches_ids(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id.is_none_or(|vid| vid == vendor_id)
            && self.product_id.is_none_or(|pid| pid == product_id)
    }

    /// True if an interface descriptor carries the debug class triple.
    pub fn matches_interface(&self, class: u8, subclass: u8, protocol: u8) -> bool {
        class == self.class && subclass == self.subclass && protocol == self.protocol
    }
}

/// A device exposing the debug interface, as found during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub bus: u8,
    pub address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_accepts_any_ids() {
        let filter = DeviceFilter::default();
        assert!(filter.matches_ids(0x05ac, 0x1280));
        assert!(filter.matches_ids(0x0525, 0x1280));
    }

    #[test]
    fn id_filters_narrow_selection() {
        let filter = DeviceFilter {
            vendor_id: Some(0x0525),
            ..DeviceFilter::default()
        };
        assert!(filter.matches_ids(0x0525, 0x1280));
        assert!(!filter.matches_ids(0x05ac, 0x1280));

        let filter = DeviceFilter {
            vendor_id: Some(0x0525),
            product_id: Some(0x1280),
            ..DeviceFilter::default()
        };
        assert!(!filter.matches_ids(0x0525, 0x1281));
    }

    #[test]
    fn interface_triple_must_match_exactly() {
        let filter = DeviceFilter::default();
        assert!(filter.matches_interface(0xFF, 0xFF, 0x51));
        assert!(!filter.matches_interface(0xFF, 0xFF, 0x50));
        assert!(!filter.matches_interface(0xFF, 0x00, 0x51));
        assert!(!filter.matches_interface(0x08, 0xFF, 0x51));
    }
}
